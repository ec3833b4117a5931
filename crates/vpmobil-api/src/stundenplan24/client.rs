//! `Stundenplan24Client` - fetch-then-parse pipeline for class plans.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use tracing::instrument;
use url::Url;

use super::api::LocalFetcher;
use super::document::TimetableDocument;
use super::params::PlanRequest;
use crate::error::TimetableError;

/// Default base URL of the Stundenplan24 service.
pub const DEFAULT_BASE_URL: &str = "https://www.stundenplan24.de/";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Text the server returns (with HTTP 200) when a plan is unavailable or the
/// login is wrong.
pub const NOT_FOUND_MARKER: &str = "Seite nicht gefunden";

/// reqwest-backed [`LocalFetcher`] with a bounded timeout.
#[derive(Debug)]
pub struct HttpFetcher {
    /// HTTP client (reqwest, gzip enabled).
    http_client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher.
    ///
    /// # Errors
    ///
    /// - [`TimetableError::InvalidArgument`] if `timeout` is zero.
    /// - [`TimetableError::Transport`] if the `reqwest::Client` build fails.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, TimetableError> {
        if timeout.is_zero() {
            return Err(TimetableError::InvalidArgument(String::from(
                "timeout must be greater than zero",
            )));
        }
        let http_client = Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .timeout(timeout)
            .build()
            .map_err(|e| TimetableError::transport("failed to build HTTP client", e))?;
        Ok(Self { http_client })
    }
}

impl LocalFetcher for HttpFetcher {
    #[instrument(skip_all)]
    async fn fetch(&self, url: &Url, auth_header: &str) -> Result<String, TimetableError> {
        tracing::debug!(%url, "Requesting plan document");

        let send_result = self
            .http_client
            .get(url.clone())
            .header(AUTHORIZATION, auth_header)
            .send()
            .await;
        let response = send_result
            .map_err(|e| TimetableError::transport(format!("request to {url} failed"), e))?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(TimetableError::DataNotFound(format!(
                "HTTP {status} for {url}: the plan is not published or the credentials are invalid"
            )));
        }
        if !status.is_success() {
            return Err(TimetableError::Transport {
                message: format!("HTTP {status} for {url}"),
                source: None,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| TimetableError::transport("failed to read response body", e))?;

        tracing::debug!(
            code = status.as_u16(),
            body_len = body.len(),
            "Response body received"
        );
        tracing::trace!(
            body_preview = &body[..body.floor_char_boundary(500)],
            "Response body preview"
        );

        Ok(body)
    }
}

/// Stundenplan24 class plan client.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct Stundenplan24Client<F = HttpFetcher> {
    /// Document transport.
    fetcher: F,
    /// Service root (always ends with `/`).
    base_url: Url,
}

/// Builder for `Stundenplan24Client`.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct Stundenplan24ClientBuilder {
    base_url: Option<Url>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
}

impl Stundenplan24ClientBuilder {
    /// Creates a new builder.
    const fn new() -> Self {
        Self {
            base_url: None,
            user_agent: None,
            timeout: None,
        }
    }

    /// Overrides the base URL (for wiremock in tests or mirrors).
    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the User-Agent (required).
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the request timeout (default: 10s).
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// - `user_agent` is not set or the timeout is zero ([`TimetableError::InvalidArgument`]).
    /// - `reqwest::Client` build fails ([`TimetableError::Transport`]).
    pub fn build(self) -> Result<Stundenplan24Client, TimetableError> {
        let user_agent = self.user_agent.ok_or_else(|| {
            TimetableError::InvalidArgument(String::from("user_agent is required"))
        })?;

        let base_url = if let Some(url) = self.base_url {
            url
        } else {
            Url::parse(DEFAULT_BASE_URL).map_err(|e| {
                TimetableError::InvalidArgument(format!("invalid default base URL: {e}"))
            })?
        };

        let fetcher = HttpFetcher::new(&user_agent, self.timeout.unwrap_or(DEFAULT_TIMEOUT))?;

        Ok(Stundenplan24Client::with_fetcher(fetcher, base_url))
    }
}

impl Stundenplan24Client {
    /// Creates a new builder.
    #[must_use]
    pub const fn builder() -> Stundenplan24ClientBuilder {
        Stundenplan24ClientBuilder::new()
    }
}

impl<F: LocalFetcher> Stundenplan24Client<F> {
    /// Creates a client around a custom transport.
    #[must_use]
    pub fn with_fetcher(fetcher: F, base_url: Url) -> Self {
        Self {
            fetcher,
            base_url: with_trailing_slash(base_url),
        }
    }

    /// Service root URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Validates the inputs, then fetches and normalizes the class plan.
    ///
    /// Validation happens before any network call.
    ///
    /// # Errors
    ///
    /// - [`TimetableError::InvalidArgument`] for a zero school code or empty
    ///   credentials.
    /// - Any error of [`Self::fetch_plan`].
    #[allow(clippy::future_not_send)]
    pub async fn fetch_timetable(
        &self,
        date: NaiveDate,
        school_code: u32,
        username: &str,
        password: &str,
    ) -> Result<TimetableDocument, TimetableError> {
        let request = PlanRequest::new(date, school_code, username, password)?;
        self.fetch_plan(&request).await
    }

    /// Fetches and normalizes the class plan for a validated request.
    ///
    /// # Errors
    ///
    /// - [`TimetableError::Transport`] / [`TimetableError::DataNotFound`] from
    ///   the fetcher.
    /// - [`TimetableError::DataNotFound`] if the body carries the
    ///   "page not found" marker.
    /// - [`TimetableError::MalformedDocument`] /
    ///   [`TimetableError::UnexpectedDocumentShape`] from normalization.
    #[allow(clippy::future_not_send)]
    #[instrument(
        skip_all,
        fields(
            school = request.school_code,
            date = %request.date,
            user = request.credentials.username()
        )
    )]
    pub async fn fetch_plan(
        &self,
        request: &PlanRequest,
    ) -> Result<TimetableDocument, TimetableError> {
        let url = request.plan_url(&self.base_url)?;
        let auth_header = request.credentials.authorization_header();

        let body = self.fetcher.fetch(&url, &auth_header).await?;

        if body.contains(NOT_FOUND_MARKER) {
            return Err(TimetableError::DataNotFound(String::from(
                "the server reported 'Seite nicht gefunden': no school on the given date, \
                 the plan is not published yet, or the credentials are invalid",
            )));
        }

        let document = TimetableDocument::from_xml(&body)?;
        tracing::info!(classes = document.classes().len(), "Timetable fetched");
        Ok(document)
    }
}

/// `Url::join` replaces the last path segment unless the base ends with `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const FIXTURE: &str = include_str!("../../../../fixtures/vpmobil/PlanKl20240108.xml");
    const PLAN_PATH: &str = "/10000000/mobil/mobdaten/PlanKl20240108.xml";

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
    }

    /// Records calls instead of touching the network.
    #[derive(Debug, Default)]
    struct RecordingFetcher {
        calls: AtomicUsize,
        last_request: Mutex<Option<(String, String)>>,
        body: String,
    }

    impl LocalFetcher for RecordingFetcher {
        async fn fetch(&self, url: &Url, auth_header: &str) -> Result<String, TimetableError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() =
                Some((url.to_string(), String::from(auth_header)));
            Ok(self.body.clone())
        }
    }

    fn recording_client(body: &str) -> Stundenplan24Client<RecordingFetcher> {
        let fetcher = RecordingFetcher {
            body: String::from(body),
            ..RecordingFetcher::default()
        };
        Stundenplan24Client::with_fetcher(fetcher, Url::parse(DEFAULT_BASE_URL).unwrap())
    }

    fn mock_client(mock_server: &wiremock::MockServer) -> Stundenplan24Client {
        Stundenplan24Client::builder()
            .base_url(mock_server.uri().parse().unwrap())
            .user_agent("test/0.0.0")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_user_agent() {
        // Arrange & Act
        let result = Stundenplan24Client::builder().build();

        // Assert
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("user_agent is required")
        );
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        // Arrange & Act
        let result = Stundenplan24Client::builder()
            .user_agent("test/0.0.0")
            .timeout(Duration::ZERO)
            .build();

        // Assert
        assert!(matches!(result, Err(TimetableError::InvalidArgument(_))));
    }

    #[test]
    fn test_builder_default_base_url() {
        // Arrange & Act
        let client = Stundenplan24Client::builder()
            .user_agent("test/0.0.0")
            .build()
            .unwrap();

        // Assert
        assert_eq!(client.base_url().as_str(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        // Arrange
        let custom_url = Url::parse("http://localhost:8080/mirror").unwrap();

        // Act
        let client = Stundenplan24Client::builder()
            .base_url(custom_url)
            .user_agent("test/0.0.0")
            .build()
            .unwrap();

        // Assert
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/mirror/");
    }

    #[tokio::test]
    async fn test_invalid_arguments_do_not_fetch() {
        // Arrange
        let client = recording_client(FIXTURE);

        // Act
        let zero_school = client.fetch_timetable(day(), 0, "user", "pw").await;
        let no_user = client.fetch_timetable(day(), 10_000_000, "", "pw").await;
        let no_password = client.fetch_timetable(day(), 10_000_000, "user", "").await;

        // Assert
        assert!(matches!(zero_school, Err(TimetableError::InvalidArgument(_))));
        assert!(matches!(no_user, Err(TimetableError::InvalidArgument(_))));
        assert!(matches!(no_password, Err(TimetableError::InvalidArgument(_))));
        assert_eq!(client.fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_passes_url_and_auth_header() {
        // Arrange
        let client = recording_client(FIXTURE);

        // Act
        let doc = client
            .fetch_timetable(day(), 10_000_000, "schueler", "geheim")
            .await
            .unwrap();

        // Assert
        assert_eq!(doc.class_codes().len(), 3);
        assert_eq!(client.fetcher.calls.load(Ordering::SeqCst), 1);
        let (url, auth) = client.fetcher.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(
            url,
            "https://www.stundenplan24.de/10000000/mobil/mobdaten/PlanKl20240108.xml"
        );
        assert_eq!(auth, "Basic c2NodWVsZXI6Z2VoZWlt");
    }

    #[tokio::test]
    async fn test_not_found_marker_in_body() {
        // Arrange
        let client = recording_client(
            "<html><head><title>Fehler</title></head><body>Seite nicht gefunden</body></html>",
        );

        // Act
        let result = client.fetch_timetable(day(), 10_000_000, "user", "pw").await;

        // Assert
        assert!(matches!(result, Err(TimetableError::DataNotFound(_))));
    }

    #[tokio::test]
    async fn test_fetch_via_http() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(PLAN_PATH))
            .and(wiremock::matchers::header(
                "Authorization",
                "Basic c2NodWVsZXI6Z2VoZWlt",
            ))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(FIXTURE))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = mock_client(&mock_server);

        // Act
        let doc = client
            .fetch_timetable(day(), 10_000_000, "schueler", "geheim")
            .await
            .unwrap();

        // Assert
        let view = doc.lookup("7a").unwrap();
        assert_eq!(view.code(), "7A");
        assert_eq!(view.lessons_for_period("1").len(), 1);
    }

    #[tokio::test]
    async fn test_user_agent_is_sent() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::header("User-Agent", "vpmobil/0.1.0"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<VpMobil/>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = Stundenplan24Client::builder()
            .base_url(mock_server.uri().parse().unwrap())
            .user_agent("vpmobil/0.1.0")
            .build()
            .unwrap();

        // Act & Assert (mock expect(1) verifies User-Agent header)
        client.fetch_timetable(day(), 1, "user", "pw").await.unwrap();
    }

    #[tokio::test]
    async fn test_not_found_marker_via_http() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<html><body><h1>Seite nicht gefunden</h1></body></html>"),
            )
            .mount(&mock_server)
            .await;
        let client = mock_client(&mock_server);

        // Act
        let result = client.fetch_timetable(day(), 10_000_000, "user", "pw").await;

        // Assert
        assert!(matches!(result, Err(TimetableError::DataNotFound(_))));
    }

    #[tokio::test]
    async fn test_http_404_and_401_are_data_not_found() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(PLAN_PATH))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/2/mobil/mobdaten/PlanKl20240108.xml"))
            .respond_with(wiremock::ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;
        let client = mock_client(&mock_server);

        // Act
        let missing = client.fetch_timetable(day(), 10_000_000, "user", "pw").await;
        let unauthorized = client.fetch_timetable(day(), 2, "user", "pw").await;

        // Assert
        assert!(matches!(missing, Err(TimetableError::DataNotFound(_))));
        assert!(matches!(unauthorized, Err(TimetableError::DataNotFound(_))));
    }

    #[tokio::test]
    async fn test_http_500_is_transport_error() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;
        let client = mock_client(&mock_server);

        // Act
        let result = client.fetch_timetable(day(), 10_000_000, "user", "pw").await;

        // Assert
        assert!(matches!(result, Err(TimetableError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string("<VpMobil><Klassen>"),
            )
            .mount(&mock_server)
            .await;
        let client = mock_client(&mock_server);

        // Act
        let result = client.fetch_timetable(day(), 10_000_000, "user", "pw").await;

        // Assert
        assert!(matches!(result, Err(TimetableError::MalformedDocument(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string(FIXTURE)
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let client = Stundenplan24Client::builder()
            .base_url(mock_server.uri().parse().unwrap())
            .user_agent("test/0.0.0")
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();

        // Act
        let result = client.fetch_timetable(day(), 10_000_000, "user", "pw").await;

        // Assert
        assert!(matches!(result, Err(TimetableError::Transport { .. })));
    }
}
