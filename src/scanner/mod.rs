pub mod filename;

use futures::stream::Stream;
use std::path::PathBuf;
use tokio::sync::mpsc;
use walkdir::WalkDir;

use crate::archive::is_comic_archive;

/// Scans `root` for comic archives.
///
/// Supported extensions: cbz, cbr, cb7, cbt (case-insensitive).
/// A file path yields itself when it is an archive; directories are
/// descended only when `recursive` is set, otherwise just their direct
/// children are listed. Returns a Stream of PathBufs.
pub fn scan(root: PathBuf, recursive: bool) -> impl Stream<Item = PathBuf> {
    let (tx, rx) = mpsc::channel(100);

    // Spawn a blocking task to perform the synchronous file system traversal
    tokio::task::spawn_blocking(move || {
        let walker = if recursive {
            WalkDir::new(root)
        } else {
            WalkDir::new(root).max_depth(1)
        };
        for entry in walker.sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() && is_comic_archive(entry.path()) {
                // Receiver dropped: stop scanning
                if tx.blocking_send(entry.path().to_path_buf()).is_err() {
                    break;
                }
            }
        }
    });

    // Convert the mpsc Receiver into a Stream
    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|path| (path, rx))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::fs::File;
    use tempfile::tempdir;

    fn file_names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(|s| s.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_scan_comic_archives() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        File::create(root.join("Example Comic 001.cbz")).unwrap();
        File::create(root.join("Example Comic 002.cbr")).unwrap();
        File::create(root.join("cover.jpg")).unwrap(); // Should be ignored
        File::create(root.join("UPPERCASE.CB7")).unwrap(); // Should be found (case-insensitive)

        let subdir = root.join("subdir");
        std::fs::create_dir(&subdir).unwrap();
        File::create(subdir.join("Nested 001.cbz")).unwrap();
        File::create(subdir.join("notes.txt")).unwrap(); // Should be ignored

        let paths: Vec<PathBuf> = scan(root.to_path_buf(), true).collect().await;
        let names = file_names(&paths);

        assert_eq!(paths.len(), 4);
        assert!(names.contains(&"Example Comic 001.cbz".to_string()));
        assert!(names.contains(&"UPPERCASE.CB7".to_string()));
        assert!(names.contains(&"Nested 001.cbz".to_string()));
        assert!(!names.contains(&"cover.jpg".to_string()));
    }

    #[tokio::test]
    async fn test_scan_non_recursive() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        File::create(root.join("Top 001.cbz")).unwrap();
        let subdir = root.join("subdir");
        std::fs::create_dir(&subdir).unwrap();
        File::create(subdir.join("Nested 001.cbz")).unwrap();

        let paths: Vec<PathBuf> = scan(root.to_path_buf(), false).collect().await;
        assert_eq!(file_names(&paths), vec!["Top 001.cbz".to_string()]);
    }

    #[tokio::test]
    async fn test_scan_single_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("Example Comic 001.cbz");
        File::create(&file).unwrap();

        let paths: Vec<PathBuf> = scan(file.clone(), false).collect().await;
        assert_eq!(paths, vec![file]);
    }
}
