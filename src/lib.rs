//! tver_dl - Resolve TVer series into episode lists and download them
//!
//! This library provides the core functionality for walking a series on the
//! platform API, numbering and ordering its episodes, and handing each one
//! to an external downloader.

mod config;
mod downloader;
mod episode_list;
mod episode_number;
mod platform_api;
mod series_file;
mod series_resolver;

use std::time::{Duration, Instant};
use thiserror::Error;

// Re-export error types
pub use downloader::DownloadError;
pub use platform_api::PlatformApiError;
pub use series_file::SeriesFileError;
pub use series_resolver::ResolveError;

// Re-export configuration
pub use config::{DEFAULT_OUTPUT_DIR, DownloaderConfig, PlatformConfig};

// Re-export pipeline building blocks
pub use downloader::{Downloader, VideoInfo, YtDlp, episode_id_from_url};
pub use episode_list::{
    EpisodeRange, ParsedEpisode, extract_episode_id, filter_episodes, parse_episodes,
    sort_episodes,
};
pub use episode_number::extract_episode_number;
pub use platform_api::{Credentials, EpisodeEntry, PlatformApi, TverClient};
pub use series_file::{SERIES_FILE_NAME, load_series, save_series};
pub use series_resolver::{SeriesInfo, SeriesResolver, extract_series_id};

/// Progress event emitted while resolving or downloading a series
///
/// These events allow library users to track progress and provide feedback
/// without the library printing anything itself.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Resolution of a series URL started
    ResolvingSeries { url: String },

    /// The series identifier was extracted from the URL
    SeriesIdentified { series_id: String },

    /// A session token was issued
    Authenticated { uid_preview: String },

    /// The season listing was fetched
    SeasonsFound { count: usize },

    /// A season could not be listed and was left out
    SeasonSkipped { season_id: String, reason: String },

    /// All reachable seasons were listed
    EpisodesCollected { count: usize },

    /// Downloading a specific episode
    DownloadingEpisode {
        index: usize,
        total: usize,
        title: String,
    },

    /// An episode finished downloading
    EpisodeDownloaded { title: String, elapsed: Duration },

    /// An episode failed to download; the batch continues
    EpisodeFailed {
        episode_number: u64,
        title: String,
        reason: String,
    },

    /// The batch is done
    DownloadsComplete { succeeded: usize, failed: usize },
}

/// Top-level error type for tver_dl operations
#[derive(Debug, Error)]
pub enum TverDlError {
    /// Error while resolving a series
    #[error("Series resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Error setting up the platform API client
    #[error("Platform API error: {0}")]
    PlatformApi(#[from] PlatformApiError),
}

/// Outcome of a download batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub succeeded: usize,
    /// Numbers of the episodes that failed, in download order
    pub failed: Vec<u64>,
}

/// Resolves a series URL into its ordered, optionally range-filtered episodes
///
/// Walks the series on the platform API, extracts episode numbers from the
/// titles and sorts the result. With `range` set, episodes outside the range
/// and episodes without a number are dropped; with `None` every episode is
/// kept, unnumbered ones last.
///
/// Progress events are emitted through the provided callback.
///
/// # Examples
///
/// ```no_run
/// use tver_dl::{EpisodeRange, PlatformConfig, TverClient, collect_episodes};
///
/// let client = TverClient::new(PlatformConfig::default()).unwrap();
/// let episodes = collect_episodes(
///     client,
///     "https://tver.jp/series/srrazrs5j2",
///     Some(EpisodeRange::new(10, 15)),
///     |_| {},
/// )
/// .unwrap();
///
/// for episode in &episodes {
///     println!("{}: {}", episode.episode_number, episode.title);
/// }
/// ```
pub fn collect_episodes<A, F>(
    api: A,
    series_url: &str,
    range: Option<EpisodeRange>,
    progress_callback: F,
) -> Result<Vec<ParsedEpisode>, TverDlError>
where
    A: PlatformApi,
    F: FnMut(ProgressEvent),
{
    let resolver = SeriesResolver::new(api);
    let series = resolver.resolve(series_url, progress_callback)?;

    let episodes = parse_episodes(&series.entries);

    Ok(match range {
        Some(range) => filter_episodes(&episodes, range),
        None => episodes,
    })
}

/// Resolves a series URL against the TVer platform API
///
/// Builds a [`TverClient`] from `config` and runs [`collect_episodes`] with it.
pub fn fetch_series<F>(
    config: PlatformConfig,
    series_url: &str,
    range: Option<EpisodeRange>,
    progress_callback: F,
) -> Result<Vec<ParsedEpisode>, TverDlError>
where
    F: FnMut(ProgressEvent),
{
    let client = TverClient::new(config)?;
    collect_episodes(client, series_url, range, progress_callback)
}

/// Downloads each episode in order, one at a time
///
/// A failing episode is logged and reported through
/// [`ProgressEvent::EpisodeFailed`]; the remaining episodes are still
/// attempted.
pub fn download_episodes<D, F>(
    downloader: &D,
    episodes: &[ParsedEpisode],
    mut progress_callback: F,
) -> DownloadSummary
where
    D: Downloader + ?Sized,
    F: FnMut(ProgressEvent),
{
    let mut summary = DownloadSummary::default();

    for (index, episode) in episodes.iter().enumerate() {
        progress_callback(ProgressEvent::DownloadingEpisode {
            index,
            total: episodes.len(),
            title: episode.title.clone(),
        });

        let started = Instant::now();
        match downloader.download(&episode.url) {
            Ok(()) => {
                summary.succeeded += 1;
                progress_callback(ProgressEvent::EpisodeDownloaded {
                    title: episode.title.clone(),
                    elapsed: started.elapsed(),
                });
            }
            Err(e) => {
                tracing::warn!(
                    episode_number = episode.episode_number,
                    episode_id = %episode.id,
                    error = %e,
                    "episode download failed"
                );
                summary.failed.push(episode.episode_number);
                progress_callback(ProgressEvent::EpisodeFailed {
                    episode_number: episode.episode_number,
                    title: episode.title.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    progress_callback(ProgressEvent::DownloadsComplete {
        succeeded: summary.succeeded,
        failed: summary.failed.len(),
    });

    summary
}
