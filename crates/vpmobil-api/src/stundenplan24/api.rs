//! `Fetcher` trait definition.
#![allow(clippy::future_not_send)]

use url::Url;

use crate::error::TimetableError;

/// Raw document transport.
///
/// Performs an authenticated GET and returns the body text. Abstracted so the
/// client can be driven by test doubles.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(Fetcher: Send)]
pub trait LocalFetcher {
    /// Fetches `url` with the given `Authorization` header value.
    ///
    /// # Errors
    ///
    /// - [`TimetableError::DataNotFound`] if the server answers 401, 403 or 404.
    /// - [`TimetableError::Transport`] on network failure, timeout, or any
    ///   other non-success status.
    async fn fetch(&self, url: &Url, auth_header: &str) -> Result<String, TimetableError>;
}
