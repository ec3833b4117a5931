//! Stundenplan24 request parameter types.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use url::Url;

use crate::error::TimetableError;

/// Login for a school's plan area.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Creates credentials.
    ///
    /// # Errors
    ///
    /// Returns [`TimetableError::InvalidArgument`] if either value is empty.
    pub fn new(username: &str, password: &str) -> Result<Self, TimetableError> {
        if username.is_empty() || password.is_empty() {
            return Err(TimetableError::InvalidArgument(String::from(
                "username and password cannot be empty",
            )));
        }
        Ok(Self {
            username: String::from(username),
            password: String::from(password),
        })
    }

    /// Username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// `Authorization` header value (`Basic base64(username:password)`).
    #[must_use]
    pub fn authorization_header(&self) -> String {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {encoded}")
    }
}

/// A validated request for one school's class plan on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    /// Plan date.
    pub date: NaiveDate,
    /// Stundenplan24 school number.
    pub school_code: u32,
    /// Login.
    pub credentials: Credentials,
}

impl PlanRequest {
    /// Validates and builds a request.
    ///
    /// # Errors
    ///
    /// Returns [`TimetableError::InvalidArgument`] if `school_code` is zero or
    /// a credential is empty.
    pub fn new(
        date: NaiveDate,
        school_code: u32,
        username: &str,
        password: &str,
    ) -> Result<Self, TimetableError> {
        if school_code == 0 {
            return Err(TimetableError::InvalidArgument(String::from(
                "school code must be a positive integer",
            )));
        }
        let credentials = Credentials::new(username, password)?;
        Ok(Self {
            date,
            school_code,
            credentials,
        })
    }

    /// Path of the plan file relative to the service root.
    ///
    /// Example: `"10000000/mobil/mobdaten/PlanKl20240108.xml"`
    #[must_use]
    pub fn plan_path(&self) -> String {
        format!(
            "{}/mobil/mobdaten/PlanKl{}.xml",
            self.school_code,
            self.date.format("%Y%m%d")
        )
    }

    /// Full plan URL under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TimetableError::InvalidArgument`] if the URL cannot be joined.
    pub fn plan_url(&self, base_url: &Url) -> Result<Url, TimetableError> {
        base_url.join(&self.plan_path()).map_err(|e| {
            TimetableError::InvalidArgument(format!("cannot build plan URL from {base_url}: {e}"))
        })
    }
}

/// Parses a plan date given as `YYYY-MM-DD`.
///
/// # Errors
///
/// Returns [`TimetableError::InvalidArgument`] if the string is not a valid
/// calendar date.
pub fn parse_plan_date(s: &str) -> Result<NaiveDate, TimetableError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| TimetableError::InvalidArgument(format!("invalid date '{s}': {e}")))
}
