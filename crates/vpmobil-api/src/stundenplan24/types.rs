//! Stundenplan24 domain value types.

use serde::Serialize;

/// A single lesson slot of a class.
///
/// Every text field is empty when the source tag is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Lesson {
    /// Period label (`St`), e.g. `"3"`.
    pub period: String,
    /// Start time (`Beginn`), e.g. `"09:30"`.
    pub start_time: String,
    /// End time (`Ende`).
    pub end_time: String,
    /// Subject (`Fa`).
    pub subject: String,
    /// Teacher abbreviation (`Le`).
    pub teacher: String,
    /// Room (`Ra`).
    pub room: String,
    /// Free-text remark (`If`), e.g. substitution details.
    pub note: String,
    /// Subject differs from the regular plan (`FaAe` marker).
    pub subject_changed: bool,
    /// Teacher differs from the regular plan (`LeAe` marker).
    pub teacher_changed: bool,
    /// Room differs from the regular plan (`RaAe` marker).
    pub room_changed: bool,
}

impl Lesson {
    /// Returns `true` if any field is marked as changed from the regular plan.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.subject_changed || self.teacher_changed || self.room_changed
    }
}

/// One class and its lessons, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    /// Class code as written in the source (`Kurz`).
    pub code: String,
    /// Lessons in source order.
    pub lessons: Vec<Lesson>,
}
