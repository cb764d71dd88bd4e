//! Series resolution
//!
//! Walks the platform's series → seasons → episodes hierarchy and flattens it
//! into a single playlist of episode entries.

use crate::ProgressEvent;
use crate::platform_api::{EpisodeEntry, PlatformApi, PlatformApiError};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Title given to playlists assembled from the platform API
const PLAYLIST_TITLE: &str = "TVerシリーズ";

/// Errors that abort a series resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The URL has no `series/<id>` segment
    #[error("Could not extract a series id from URL: {0}")]
    UrlFormat(String),

    /// No session token could be obtained
    #[error("Failed to acquire session token: {0}")]
    Authentication(#[source] PlatformApiError),

    /// The season listing of the series could not be fetched
    #[error("Failed to list seasons of series {series_id}: {source}")]
    Seasons {
        series_id: String,
        source: PlatformApiError,
    },
}

/// A series flattened into one playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesInfo {
    /// Series identifier taken from the URL
    pub id: String,
    pub title: String,
    /// Episodes of every season that could be fetched, season by season
    pub entries: Vec<EpisodeEntry>,
}

static SERIES_ID_PATTERN: OnceLock<Regex> = OnceLock::new();

fn series_id_pattern() -> &'static Regex {
    SERIES_ID_PATTERN
        .get_or_init(|| Regex::new(r"series/([a-zA-Z0-9]+)").expect("compile series id pattern"))
}

/// Extracts the series identifier from a series URL
///
/// # Examples
///
/// ```
/// use tver_dl::extract_series_id;
///
/// assert_eq!(extract_series_id("https://tver.jp/series/srrazrs5j2").unwrap(), "srrazrs5j2");
/// assert!(extract_series_id("https://tver.jp/episodes/epuk32qiqy").is_err());
/// ```
pub fn extract_series_id(series_url: &str) -> Result<String, ResolveError> {
    series_id_pattern()
        .captures(series_url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ResolveError::UrlFormat(series_url.to_string()))
}

/// Resolves series URLs into playlists using a platform API client.
pub struct SeriesResolver<A>
where
    A: PlatformApi,
{
    api: A,
}

impl<A> SeriesResolver<A>
where
    A: PlatformApi,
{
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Resolves a series URL into a flat list of episode entries
    ///
    /// Steps, strictly sequential: extract the series id, authenticate, list
    /// the seasons, then list the episodes of every season in the order the
    /// server returned them.
    ///
    /// A season whose episode listing fails is logged, reported through
    /// [`ProgressEvent::SeasonSkipped`] and left out; the other seasons still
    /// contribute. Failures before the per-season loop abort the resolution.
    pub fn resolve<F>(&self, series_url: &str, mut progress: F) -> Result<SeriesInfo, ResolveError>
    where
        F: FnMut(ProgressEvent),
    {
        progress(ProgressEvent::ResolvingSeries {
            url: series_url.to_string(),
        });

        let series_id = extract_series_id(series_url)?;
        progress(ProgressEvent::SeriesIdentified {
            series_id: series_id.clone(),
        });

        let credentials = self
            .api
            .authenticate()
            .map_err(ResolveError::Authentication)?;
        progress(ProgressEvent::Authenticated {
            uid_preview: credentials.uid_preview(),
        });

        let seasons = self
            .api
            .list_seasons(&credentials, &series_id)
            .map_err(|source| ResolveError::Seasons {
                series_id: series_id.clone(),
                source,
            })?;
        tracing::info!(%series_id, season_count = seasons.len(), "seasons listed");
        progress(ProgressEvent::SeasonsFound {
            count: seasons.len(),
        });

        let mut entries = Vec::new();
        for season_id in &seasons {
            match self.api.list_episodes(&credentials, season_id) {
                Ok(episodes) => {
                    tracing::debug!(%season_id, episode_count = episodes.len(), "season listed");
                    entries.extend(episodes);
                }
                Err(e) => {
                    tracing::warn!(%season_id, error = %e, "skipping season, episode listing failed");
                    progress(ProgressEvent::SeasonSkipped {
                        season_id: season_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        progress(ProgressEvent::EpisodesCollected {
            count: entries.len(),
        });

        Ok(SeriesInfo {
            id: series_id,
            title: PLAYLIST_TITLE.to_string(),
            entries,
        })
    }
}
