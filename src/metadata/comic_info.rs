//! `ComicInfo.xml` rendering and parsing.
//!
//! Follows the ComicInfo schema (element order of the `xs:sequence`), so
//! Komga, Kavita, ComicRack and friends read the result:
//!
//! ```xml
//! <ComicInfo>
//!   <Title>Origins</Title>
//!   <Series>Example Comic</Series>
//!   <Number>1</Number>
//!   <Notes>Tagged with ComicMinder 0.1.0 [metron:42]</Notes>
//!   <Year>2020</Year><Month>1</Month><Day>15</Day>
//!   <Writer>Jane Doe</Writer>
//!   <Genre>Superhero, Horror</Genre>
//! </ComicInfo>
//! ```
//!
//! Credits go into the per-role elements (`Writer`, `Penciller`, ...), list
//! fields are comma separated and provider identifiers ride along in
//! `Notes`. The schema has no room for a cover URL or for credit roles
//! outside its fixed set; those live only in the sidecar. Every other field
//! survives a render/parse round trip as long as list values contain no
//! commas.
//!
//! Absent fields are not written. Unknown elements are ignored on parse, and
//! the `-1` placeholder other taggers write for unset numbers reads as
//! absent.

use std::io::Cursor;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;

use super::TagError;
use crate::model::{CanonicalIssue, Credit, IssueFormat, IssueNumber};

/// Archive entry name
pub const ENTRY_NAME: &str = "ComicInfo.xml";

const ROOT: &str = "ComicInfo";

const NOTES_PREFIX: &str = concat!("Tagged with ComicMinder ", env!("CARGO_PKG_VERSION"));

/// Credit elements in schema order: (element, canonical role, accepted roles)
const CREDIT_ELEMENTS: [(&str, &str, &[&str]); 8] = [
    (
        "Writer",
        "Writer",
        &["writer", "script", "scripter", "story", "plot", "author"],
    ),
    (
        "Penciller",
        "Penciller",
        &["penciller", "penciler", "pencils", "artist", "breakdowns"],
    ),
    ("Inker", "Inker", &["inker", "inks", "finishes"]),
    (
        "Colorist",
        "Colorist",
        &["colorist", "colourist", "colors", "colours", "color"],
    ),
    ("Letterer", "Letterer", &["letterer", "letters"]),
    ("CoverArtist", "Cover Artist", &["cover", "cover artist", "coverartist"]),
    ("Editor", "Editor", &["editor", "editor in chief", "editorinchief"]),
    ("Translator", "Translator", &["translator"]),
];

/// `[provider:id]` tokens in `Notes`
static NOTE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([a-z][a-z0-9_]*):([^\]\s]+)\]").expect("valid identifier pattern")
});

/// ComicTagger's Comic Vine marker, `[CVDB1234]`
static CVDB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[CVDB(\d+)\]").expect("valid CVDB pattern"));

fn xml_err(e: impl std::fmt::Display) -> TagError {
    TagError::Xml(e.to_string())
}

/// Schema element a credit role is written to, if any.
fn credit_element(role: &str) -> Option<&'static str> {
    let role = role.trim().to_lowercase();
    CREDIT_ELEMENTS
        .iter()
        .find(|(_, _, accepted)| accepted.contains(&role.as_str()))
        .map(|(element, _, _)| *element)
}

fn join(values: &[String]) -> Option<String> {
    (!values.is_empty()).then(|| values.join(", "))
}

fn notes(issue: &CanonicalIssue) -> String {
    let mut notes = NOTES_PREFIX.to_string();
    for (provider, id) in &issue.identifiers {
        notes.push_str(&format!(" [{provider}:{id}]"));
    }
    notes
}

/// Render a canonical issue as a `ComicInfo.xml` document.
pub fn render(issue: &CanonicalIssue) -> Result<Vec<u8>, TagError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(xml_err)?;
    let root = BytesStart::new(ROOT).with_attributes([
        ("xmlns:xsd", "http://www.w3.org/2001/XMLSchema"),
        ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
    ]);
    writer.write_event(Event::Start(root)).map_err(xml_err)?;

    let volume = issue.series_volume.map(|v| v.to_string());
    let date = issue
        .release_date
        .map(|d| (d.year().to_string(), d.month().to_string(), d.day().to_string()));
    let credits: Vec<(&str, Option<String>)> = CREDIT_ELEMENTS
        .iter()
        .map(|(element, _, _)| {
            let names: Vec<String> = issue
                .credits
                .iter()
                .filter(|c| credit_element(&c.role) == Some(*element))
                .map(|c| c.name.clone())
                .collect();
            (*element, join(&names))
        })
        .collect();

    let mut elements: Vec<(&str, Option<String>)> = vec![
        ("Title", issue.issue_title.clone()),
        ("Series", issue.series_title.clone()),
        ("Number", issue.issue_number.as_str().map(String::from)),
        ("Volume", volume),
        ("Summary", issue.summary.clone()),
        ("Notes", Some(notes(issue))),
        ("Year", date.as_ref().map(|d| d.0.clone())),
        ("Month", date.as_ref().map(|d| d.1.clone())),
        ("Day", date.as_ref().map(|d| d.2.clone())),
    ];
    elements.extend(credits);
    elements.extend([
        ("Publisher", issue.publisher.clone()),
        ("Genre", join(&issue.genres)),
        ("Web", issue.web_url.clone()),
        ("Format", issue.format.map(|f| f.as_str().to_string())),
        ("Characters", join(&issue.characters)),
        ("Teams", join(&issue.teams)),
        ("Locations", join(&issue.locations)),
        ("StoryArc", join(&issue.story_arcs)),
        ("AgeRating", issue.rating.clone()),
    ]);

    for (name, value) in elements {
        if let Some(value) = value {
            write_text(&mut writer, name, &value)?;
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new(ROOT)))
        .map_err(xml_err)?;
    Ok(writer.into_inner().into_inner())
}

fn write_text(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    text: &str,
) -> Result<(), TagError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)
}

/// Parse a `ComicInfo.xml` document, ours or another tagger's.
pub fn parse(xml: &[u8]) -> Result<CanonicalIssue, TagError> {
    let text = std::str::from_utf8(xml).map_err(xml_err)?;
    let mut reader = Reader::from_str(text);

    let mut issue = CanonicalIssue::default();
    let mut path: Vec<String> = Vec::new();
    let mut buffer = String::new();
    let mut date = DateParts::default();
    let mut saw_root = false;

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => {
                let name = std::str::from_utf8(e.name().as_ref())
                    .map_err(xml_err)?
                    .to_string();
                if path.is_empty() {
                    if name != ROOT {
                        return Err(TagError::Malformed(format!(
                            "expected <{ROOT}> root, found <{name}>"
                        )));
                    }
                    saw_root = true;
                }
                path.push(name);
                buffer.clear();
            }
            Event::Empty(e) if path.is_empty() => {
                if e.name().as_ref() != ROOT.as_bytes() {
                    return Err(TagError::Malformed(format!("expected <{ROOT}> root")));
                }
                saw_root = true;
            }
            Event::Text(e) => buffer.push_str(&e.unescape().map_err(xml_err)?),
            Event::CData(e) => {
                buffer.push_str(std::str::from_utf8(&e.into_inner()).map_err(xml_err)?)
            }
            Event::End(_) => {
                let Some(name) = path.pop() else {
                    return Err(TagError::Malformed("unbalanced end tag".to_string()));
                };
                let value = std::mem::take(&mut buffer);
                if path.len() == 1 && !value.is_empty() {
                    apply(&mut issue, &name, value, &mut date)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(TagError::Malformed(format!("missing <{ROOT}> element")));
    }

    if let Some(year) = date.year {
        issue.release_date = NaiveDate::from_ymd_opt(
            year as i32,
            date.month.unwrap_or(1),
            date.day.unwrap_or(1),
        );
    }
    Ok(issue)
}

#[derive(Default)]
struct DateParts {
    year: Option<u32>,
    month: Option<u32>,
    day: Option<u32>,
}

/// Positive number, `None` for the `0`/`-1` "unset" placeholders.
fn positive(name: &str, value: &str) -> Result<Option<u32>, TagError> {
    let parsed: i64 = value
        .trim()
        .parse()
        .map_err(|_| TagError::Malformed(format!("<{name}> is not a number: {value:?}")))?;
    Ok(u32::try_from(parsed).ok().filter(|n| *n > 0))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

fn apply(
    issue: &mut CanonicalIssue,
    name: &str,
    value: String,
    date: &mut DateParts,
) -> Result<(), TagError> {
    match name {
        "Title" => issue.issue_title = Some(value),
        "Series" => issue.series_title = Some(value),
        "Number" => issue.issue_number = IssueNumber::Known(value),
        "Volume" => issue.series_volume = positive(name, &value)?,
        "Summary" => issue.summary = Some(value),
        "Notes" => {
            for capture in NOTE_ID.captures_iter(&value) {
                issue
                    .identifiers
                    .insert(capture[1].to_string(), capture[2].to_string());
            }
            if let Some(capture) = CVDB_ID.captures(&value) {
                issue
                    .identifiers
                    .entry("comicvine".to_string())
                    .or_insert_with(|| capture[1].to_string());
            }
        }
        "Year" => date.year = positive(name, &value)?,
        "Month" => date.month = positive(name, &value)?,
        "Day" => date.day = positive(name, &value)?,
        "Publisher" => issue.publisher = Some(value),
        "Genre" => issue.genres = split_list(&value),
        "Web" => issue.web_url = Some(value),
        "Format" => issue.format = IssueFormat::parse(&value),
        "Characters" => issue.characters = split_list(&value),
        "Teams" => issue.teams = split_list(&value),
        "Locations" => issue.locations = split_list(&value),
        "StoryArc" => issue.story_arcs = split_list(&value),
        "AgeRating" if value.trim() != "Unknown" => issue.rating = Some(value),
        element => {
            if let Some((_, role, _)) = CREDIT_ELEMENTS.iter().find(|(e, _, _)| *e == element) {
                issue.credits.extend(
                    split_list(&value)
                        .into_iter()
                        .map(|name| Credit::new(*role, name)),
                );
            }
        }
    }
    Ok(())
}
