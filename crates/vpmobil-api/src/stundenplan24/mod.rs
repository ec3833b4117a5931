//! Stundenplan24 (`VpMobil`) client module.
//!
//! Fetches `PlanKl<YYYYMMDD>.xml` class plans and normalizes them into
//! [`TimetableDocument`]s with per-class [`ClassTimetableView`]s.

mod api;
mod client;
mod document;
mod params;
mod types;
mod view;
pub mod xml;

pub use api::{Fetcher, LocalFetcher};
#[allow(clippy::module_name_repetitions)]
pub use client::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT, HttpFetcher, NOT_FOUND_MARKER, Stundenplan24Client,
    Stundenplan24ClientBuilder,
};
pub use document::{TimetableDocument, parse_off_day};
pub use params::{Credentials, PlanRequest, parse_plan_date};
pub use types::{ClassEntry, Lesson};
pub use view::ClassTimetableView;
