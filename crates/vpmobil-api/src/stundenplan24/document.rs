//! `TimetableDocument` - normalized view of one `PlanKl` XML payload.
//!
//! The upstream format serializes a tag that occurs once as a single node and
//! a repeated tag as a list. Every collection below is read through
//! [`as_sequence`]. Only the root element and each class's code are required;
//! all other sections degrade to empty values when absent.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::types::{ClassEntry, Lesson};
use super::view::ClassTimetableView;
use super::xml::{XmlNode, as_sequence, parse};
use crate::error::TimetableError;

/// Root element of a class plan.
const ROOT_TAG: &str = "VpMobil";

/// Off-day tokens: `<FreieTage><ft>YYMMDD</ft>...</FreieTage>`.
const OFF_DAYS_PATH: &[&str] = &["FreieTage", "ft"];

/// Notice lines: `<ZusatzInfo><ZiZeile>...</ZiZeile>...</ZusatzInfo>`.
const NOTICE_PATH: &[&str] = &["ZusatzInfo", "ZiZeile"];

/// Classes: `<Klassen><Kl>...</Kl>...</Klassen>`.
const CLASSES_PATH: &[&str] = &["Klassen", "Kl"];

/// Lessons inside a class: `<Pl><Std>...</Std>...</Pl>`.
const LESSONS_PATH: &[&str] = &["Pl", "Std"];

/// Class code tag.
const CLASS_CODE_TAG: &str = "Kurz";

/// Date format of off-day tokens.
const OFF_DAY_FORMAT: &str = "%y%m%d";

/// Timetable of one school for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableDocument {
    off_days: Vec<NaiveDate>,
    extra_info: Option<String>,
    classes: Vec<ClassEntry>,
    /// Lowercased class code -> index into `classes`.
    index: HashMap<String, usize>,
}

impl TimetableDocument {
    /// Parses and normalizes a raw `PlanKl` XML document.
    ///
    /// # Errors
    ///
    /// - [`TimetableError::MalformedDocument`] if the text is not well-formed XML.
    /// - [`TimetableError::UnexpectedDocumentShape`] if a required tag is missing.
    pub fn from_xml(raw: &str) -> Result<Self, TimetableError> {
        let tree = parse(raw)?;
        Self::from_node(&tree)
    }

    /// Builds a document from a parsed tree.
    ///
    /// `tree` is the value returned by [`parse`]: a mapping that holds the
    /// `VpMobil` root element.
    ///
    /// # Errors
    ///
    /// Returns [`TimetableError::UnexpectedDocumentShape`] if the root element
    /// or a class code is missing.
    pub fn from_node(tree: &XmlNode) -> Result<Self, TimetableError> {
        let root = tree.get(ROOT_TAG).ok_or_else(|| {
            TimetableError::UnexpectedDocumentShape(format!("missing <{ROOT_TAG}> root element"))
        })?;

        let off_days = extract_off_days(root);
        let extra_info = extract_extra_info(root);

        let mut classes: Vec<ClassEntry> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        if let Some(nodes) = root.path(CLASSES_PATH) {
            for node in as_sequence(nodes) {
                let entry = extract_class(node)?;
                let key = entry.code.to_lowercase();
                if let Some(&existing) = index.get(&key)
                    && let Some(slot) = classes.get_mut(existing)
                {
                    tracing::warn!(code = %entry.code, "Duplicate class code, keeping the last entry");
                    *slot = entry;
                } else {
                    index.insert(key, classes.len());
                    classes.push(entry);
                }
            }
        }

        tracing::debug!(
            classes = classes.len(),
            off_days = off_days.len(),
            has_extra_info = extra_info.is_some(),
            "Timetable document normalized"
        );

        Ok(Self {
            off_days,
            extra_info,
            classes,
            index,
        })
    }

    /// Off-days (holidays) in source order.
    #[must_use]
    pub fn off_days(&self) -> &[NaiveDate] {
        &self.off_days
    }

    /// Returns `true` if `date` is listed as an off-day.
    #[must_use]
    pub fn is_off_day(&self, date: NaiveDate) -> bool {
        self.off_days.contains(&date)
    }

    /// Notice lines joined with `\n`; `None` when the document has no notices.
    #[must_use]
    pub fn extra_info(&self) -> Option<&str> {
        self.extra_info.as_deref()
    }

    /// Class codes as written in the source, in source order.
    #[must_use]
    pub fn class_codes(&self) -> Vec<&str> {
        self.classes.iter().map(|c| c.code.as_str()).collect()
    }

    /// All classes in source order.
    #[must_use]
    pub fn classes(&self) -> &[ClassEntry] {
        &self.classes
    }

    /// Looks up a class by code (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`TimetableError::UnknownClass`] if no class has this code.
    pub fn lookup(&self, class_code: &str) -> Result<ClassTimetableView<'_>, TimetableError> {
        self.index
            .get(&class_code.to_lowercase())
            .and_then(|&i| self.classes.get(i))
            .map(ClassTimetableView::new)
            .ok_or_else(|| TimetableError::UnknownClass(String::from(class_code)))
    }
}

/// Parses an off-day token (`YYMMDD`, two-digit year).
///
/// Returns `None` for anything that is not exactly six digits forming a valid
/// calendar date.
#[must_use]
pub fn parse_off_day(token: &str) -> Option<NaiveDate> {
    let token = token.trim();
    if token.len() != 6 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(token, OFF_DAY_FORMAT).ok()
}

fn extract_off_days(root: &XmlNode) -> Vec<NaiveDate> {
    let Some(tokens) = root.path(OFF_DAYS_PATH) else {
        return Vec::new();
    };
    as_sequence(tokens)
        .iter()
        .filter_map(|node| {
            let token = node.text().unwrap_or_default();
            let date = parse_off_day(token);
            if date.is_none() {
                tracing::debug!(token, "Skipping unparsable off-day token");
            }
            date
        })
        .collect()
}

fn extract_extra_info(root: &XmlNode) -> Option<String> {
    let lines = root.path(NOTICE_PATH)?;
    Some(
        as_sequence(lines)
            .iter()
            .map(|line| line.text().unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

fn extract_class(node: &XmlNode) -> Result<ClassEntry, TimetableError> {
    let code = node
        .get(CLASS_CODE_TAG)
        .and_then(XmlNode::text)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| {
            TimetableError::UnexpectedDocumentShape(format!(
                "class entry without <{CLASS_CODE_TAG}> code"
            ))
        })?;

    let lessons = node
        .path(LESSONS_PATH)
        .map(|lessons| as_sequence(lessons).iter().map(extract_lesson).collect())
        .unwrap_or_default();

    Ok(ClassEntry {
        code: String::from(code),
        lessons,
    })
}

fn extract_lesson(node: &XmlNode) -> Lesson {
    let field = |tag: &str| {
        node.get(tag)
            .and_then(XmlNode::text)
            .map_or_else(String::new, String::from)
    };
    let changed = |tag: &str, marker: &str| node.get(tag).is_some_and(|n| n.has_attribute(marker));

    Lesson {
        period: field("St"),
        start_time: field("Beginn"),
        end_time: field("Ende"),
        subject: field("Fa"),
        teacher: field("Le"),
        room: field("Ra"),
        note: field("If"),
        subject_changed: changed("Fa", "FaAe"),
        teacher_changed: changed("Le", "LeAe"),
        room_changed: changed("Ra", "RaAe"),
    }
}
