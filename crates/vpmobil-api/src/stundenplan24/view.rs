//! `ClassTimetableView` - read-only queries over one class's lessons.

use super::types::{ClassEntry, Lesson};

/// Borrowed view of a single class in a [`TimetableDocument`].
///
/// [`TimetableDocument`]: super::TimetableDocument
#[derive(Debug, Clone, Copy)]
#[allow(clippy::module_name_repetitions)]
pub struct ClassTimetableView<'a> {
    entry: &'a ClassEntry,
}

impl<'a> ClassTimetableView<'a> {
    pub(crate) const fn new(entry: &'a ClassEntry) -> Self {
        Self { entry }
    }

    /// Class code as written in the source.
    #[must_use]
    pub fn code(&self) -> &'a str {
        &self.entry.code
    }

    /// All lessons in source order.
    #[must_use]
    pub fn all_lessons(&self) -> &'a [Lesson] {
        &self.entry.lessons
    }

    /// Lessons whose period label equals `period` exactly.
    #[must_use]
    pub fn lessons_for_period(&self, period: &str) -> Vec<&'a Lesson> {
        self.entry
            .lessons
            .iter()
            .filter(|lesson| lesson.period == period)
            .collect()
    }

    /// Lessons whose subject contains `needle`, ignoring case.
    #[must_use]
    pub fn lessons_for_subject(&self, needle: &str) -> Vec<&'a Lesson> {
        let needle = needle.to_lowercase();
        self.entry
            .lessons
            .iter()
            .filter(|lesson| lesson.subject.to_lowercase().contains(&needle))
            .collect()
    }

    /// Lessons flagged as changed from the regular plan.
    #[must_use]
    pub fn changed_lessons(&self) -> Vec<&'a Lesson> {
        self.entry
            .lessons
            .iter()
            .filter(|lesson| lesson.has_changes())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::indexing_slicing)]

    use super::*;

    fn lesson(period: &str, subject: &str) -> Lesson {
        Lesson {
            period: String::from(period),
            subject: String::from(subject),
            ..Lesson::default()
        }
    }

    fn entry() -> ClassEntry {
        ClassEntry {
            code: String::from("7a"),
            lessons: vec![
                lesson("1", "Mathematics"),
                lesson("2", "Art"),
                lesson("2", "MATHE-Förder"),
                Lesson {
                    teacher_changed: true,
                    ..lesson("3", "Biologie")
                },
            ],
        }
    }

    #[test]
    fn test_lessons_for_subject_is_case_insensitive_substring() {
        // Arrange
        let entry = ClassEntry {
            code: String::from("7a"),
            lessons: vec![lesson("1", "Mathematics"), lesson("2", "Art")],
        };
        let view = ClassTimetableView::new(&entry);

        // Act
        let found = view.lessons_for_subject("math");

        // Assert
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].subject, "Mathematics");
    }

    #[test]
    fn test_lessons_for_subject_keeps_order() {
        // Arrange
        let entry = entry();
        let view = ClassTimetableView::new(&entry);

        // Act
        let found = view.lessons_for_subject("MATH");

        // Assert
        let subjects: Vec<_> = found.iter().map(|l| l.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Mathematics", "MATHE-Förder"]);
    }

    #[test]
    fn test_lessons_for_period_exact_match() {
        // Arrange
        let entry = entry();
        let view = ClassTimetableView::new(&entry);

        // Act
        let second = view.lessons_for_period("2");
        let none = view.lessons_for_period("2 ");

        // Assert
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].subject, "Art");
        assert_eq!(second[1].subject, "MATHE-Förder");
        assert!(none.is_empty());
    }

    #[test]
    fn test_all_lessons_and_changes() {
        // Arrange
        let entry = entry();
        let view = ClassTimetableView::new(&entry);

        // Act & Assert
        assert_eq!(view.code(), "7a");
        assert_eq!(view.all_lessons().len(), 4);
        assert_eq!(view.changed_lessons().len(), 1);
        assert_eq!(view.changed_lessons()[0].subject, "Biologie");
    }
}
