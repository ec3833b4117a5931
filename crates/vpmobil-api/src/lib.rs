//! API client library for vpmobil.
//!
//! Fetches class timetables from the Stundenplan24 (`VpMobil`) service and
//! normalizes the XML payload into a typed model.

/// Error taxonomy shared by all operations.
pub mod error;

/// Stundenplan24 timetable client.
pub mod stundenplan24;

pub use error::TimetableError;
