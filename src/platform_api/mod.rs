/// Data structures and traits for talking to the video platform's API.
///
/// This module provides the credential and episode types produced by the
/// platform, as well as the trait that series resolution is written against.
mod tver;
mod tver_types;

pub use tver::TverClient;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the platform API.
#[derive(Debug, Error)]
pub enum PlatformApiError {
    /// Token issuance failed; nothing else can be fetched without a token
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The API answered with a non-success status or a body that could not
    /// be decoded
    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// The request never produced a response (connection error, timeout)
    #[error("Request failed: {0}")]
    Request(String),
}

/// The token pair issued by the platform's session endpoint.
///
/// Produced once by [`PlatformApi::authenticate`] and passed by reference to
/// every later call. There is no refresh; a caller that needs a new session
/// authenticates again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub platform_uid: String,
    pub platform_token: String,
}

impl Credentials {
    /// Shortened uid for display, never the full identifier
    pub fn uid_preview(&self) -> String {
        let prefix: String = self.platform_uid.chars().take(8).collect();
        format!("{}...", prefix)
    }
}

/// A single episode entry as returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeEntry {
    /// Entry kind, always "video" for platform episodes
    #[serde(rename = "_type")]
    pub entry_type: String,
    /// Free-text episode title
    pub title: String,
    /// Canonical playback URL on the website
    pub webpage_url: String,
    /// Opaque episode identifier
    pub id: String,
    /// Name of the source that produced this entry
    pub extractor: String,
    /// End of availability as a unix timestamp, 0 when not provided
    #[serde(default)]
    pub end_at: i64,
}

/// Trait for clients that can walk the platform's series hierarchy.
///
/// Implementors fetch a session token and then season and episode listings
/// scoped to it. All calls are blocking.
pub trait PlatformApi {
    /// Acquires a new session token.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformApiError::Authentication`] for any failure.
    fn authenticate(&self) -> Result<Credentials, PlatformApiError>;

    /// Lists the season identifiers of a series, in server order.
    fn list_seasons(
        &self,
        credentials: &Credentials,
        series_id: &str,
    ) -> Result<Vec<String>, PlatformApiError>;

    /// Lists the episodes of a season, in server order.
    fn list_episodes(
        &self,
        credentials: &Credentials,
        season_id: &str,
    ) -> Result<Vec<EpisodeEntry>, PlatformApiError>;
}
