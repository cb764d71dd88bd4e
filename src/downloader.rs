//! yt-dlp based downloader
//!
//! Media retrieval is delegated to the external `yt-dlp` program. This module
//! builds its command lines, runs it and interprets the exit status.

use crate::config::DownloaderConfig;
use crate::episode_list::extract_episode_id;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

/// Output file template handed to yt-dlp
const OUTPUT_TEMPLATE: &str = "%(series)s - %(episode)s - %(uploader)s.%(ext)s";

/// Errors that can occur while driving the external downloader
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The URL has no `episodes/<id>` segment
    #[error("Could not extract an episode id from URL: {0}")]
    UrlFormat(String),

    /// The downloader program is missing or not working
    #[error("{program} is not available, please install it: {reason}")]
    ToolUnavailable { program: String, reason: String },

    /// The downloader process could not be started
    #[error("Failed to run {program}: {source}")]
    SpawnFailed { program: String, source: io::Error },

    /// The downloader ran but reported failure
    #[error("{program} failed for {url} with exit code {code:?}: {stderr}")]
    Failed {
        program: String,
        url: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The metadata printed by the downloader could not be parsed
    #[error("Failed to parse video info: {0}")]
    InfoParse(#[from] serde_json::Error),

    /// Failed to create the output directory or write an info file
    #[error("Failed to write {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },
}

/// Trait for anything that can fetch the media behind a playback URL
///
/// The caller only looks at success or failure.
pub trait Downloader {
    /// Downloads the media at `url`.
    fn download(&self, url: &str) -> Result<(), DownloadError>;
}

/// Metadata reported by `yt-dlp --dump-json`, reduced to the fields we show.
///
/// yt-dlp prints `null` for fields it does not know; those read as defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub uploader: String,
    #[serde(deserialize_with = "null_as_default")]
    pub uploader_id: String,
    /// Upload date as `YYYYMMDD`
    #[serde(deserialize_with = "null_as_default")]
    pub upload_date: String,
    /// Duration in seconds
    #[serde(deserialize_with = "null_as_default")]
    pub duration: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub series: String,
    #[serde(deserialize_with = "null_as_default")]
    pub season: String,
    #[serde(deserialize_with = "null_as_default")]
    pub episode: String,
    #[serde(deserialize_with = "null_as_default")]
    pub episode_number: u32,
    #[serde(rename = "webpage_url", deserialize_with = "null_as_default")]
    pub webpage: String,
    #[serde(deserialize_with = "null_as_default")]
    pub extractor: String,
    #[serde(deserialize_with = "null_as_default")]
    pub extractor_key: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Validates that a URL points at a single episode and returns its id
///
/// # Examples
///
/// ```
/// use tver_dl::episode_id_from_url;
///
/// assert_eq!(episode_id_from_url("https://tver.jp/episodes/epuk32qiqy").unwrap(), "epuk32qiqy");
/// assert!(episode_id_from_url("https://tver.jp/series/srrazrs5j2").is_err());
/// ```
pub fn episode_id_from_url(url: &str) -> Result<String, DownloadError> {
    extract_episode_id(url).ok_or_else(|| DownloadError::UrlFormat(url.to_string()))
}

/// Downloader backed by the `yt-dlp` command line tool
pub struct YtDlp {
    config: DownloaderConfig,
}

impl YtDlp {
    pub fn new(config: DownloaderConfig) -> Self {
        Self { config }
    }

    fn program_name(&self) -> String {
        self.config.program.display().to_string()
    }

    fn command(&self) -> Command {
        Command::new(&self.config.program)
    }

    /// Directory downloads and info files are written to
    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Full output path template passed via `-o`
    pub fn output_template(&self) -> PathBuf {
        self.config.output_dir.join(OUTPUT_TEMPLATE)
    }

    /// Checks that the program runs and returns its reported version
    pub fn version(&self) -> Result<String, DownloadError> {
        let output = self
            .command()
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| DownloadError::ToolUnavailable {
                program: self.program_name(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(DownloadError::ToolUnavailable {
                program: self.program_name(),
                reason: format!("--version exited with {:?}", output.status.code()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Creates the output directory if it does not exist yet
    pub fn ensure_output_dir(&self) -> Result<(), DownloadError> {
        fs::create_dir_all(&self.config.output_dir).map_err(|e| DownloadError::WriteFailed {
            path: self.config.output_dir.clone(),
            source: e,
        })
    }

    /// Fetches metadata for a URL without downloading the media
    pub fn video_info(&self, url: &str) -> Result<VideoInfo, DownloadError> {
        tracing::info!(%url, "fetching video info");

        let output = self
            .command()
            .arg("--dump-json")
            .arg("--no-download")
            .arg(url)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| DownloadError::SpawnFailed {
                program: self.program_name(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(DownloadError::Failed {
                program: self.program_name(),
                url: url.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    /// Writes video info to `<output_dir>/<id>_info.json` and returns the path
    pub fn save_info(&self, info: &VideoInfo) -> Result<PathBuf, DownloadError> {
        let path = self
            .config
            .output_dir
            .join(format!("{}_info.json", info.id));

        let mut content = serde_json::to_string_pretty(info)?;
        content.push('\n');

        fs::write(&path, content).map_err(|e| DownloadError::WriteFailed {
            path: path.clone(),
            source: e,
        })?;

        tracing::info!(path = %path.display(), "video info saved");
        Ok(path)
    }
}

impl Downloader for YtDlp {
    fn download(&self, url: &str) -> Result<(), DownloadError> {
        tracing::info!(%url, "starting download");

        // Progress output of the child goes straight to our terminal
        let status = self
            .command()
            .args(&self.config.options)
            .arg("-o")
            .arg(self.output_template())
            .arg(url)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| DownloadError::SpawnFailed {
                program: self.program_name(),
                source: e,
            })?;

        if !status.success() {
            return Err(DownloadError::Failed {
                program: self.program_name(),
                url: url.to_string(),
                code: status.code(),
                stderr: String::new(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};

    /// Serializes tests that spawn processes, so no child inherits the write
    /// handle of a stub script that is about to be executed
    static SPAWN_LOCK: Mutex<()> = Mutex::new(());

    fn spawn_lock() -> MutexGuard<'static, ()> {
        SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_episode_id_from_url() {
        assert_eq!(
            episode_id_from_url("https://tver.jp/episodes/epuk32qiqy").unwrap(),
            "epuk32qiqy"
        );
        assert!(matches!(
            episode_id_from_url("https://tver.jp/"),
            Err(DownloadError::UrlFormat(_))
        ));
    }

    #[test]
    fn test_output_template() {
        let ytdlp = YtDlp::new(DownloaderConfig {
            output_dir: PathBuf::from("/tmp/out"),
            ..DownloaderConfig::default()
        });
        assert_eq!(
            ytdlp.output_template(),
            PathBuf::from("/tmp/out/%(series)s - %(episode)s - %(uploader)s.%(ext)s")
        );
    }

    #[test]
    fn test_video_info_defaults_missing_fields() {
        let info: VideoInfo =
            serde_json::from_str(r#"{"id": "ep1", "title": "第1話", "duration": 1440.5}"#)
                .unwrap();
        assert_eq!(info.id, "ep1");
        assert_eq!(info.duration, 1440.5);
        assert_eq!(info.episode_number, 0);
        assert!(info.uploader.is_empty());
    }

    #[test]
    fn test_video_info_null_fields() {
        let info: VideoInfo = serde_json::from_str(
            r#"{"id": "ep1", "series": null, "episode_number": null, "duration": null}"#,
        )
        .unwrap();
        assert_eq!(info.id, "ep1");
        assert!(info.series.is_empty());
        assert_eq!(info.episode_number, 0);
        assert_eq!(info.duration, 0.0);
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let _guard = spawn_lock();
        let ytdlp = YtDlp::new(DownloaderConfig {
            program: PathBuf::from("/nonexistent/bin/yt-dlp"),
            ..DownloaderConfig::default()
        });
        assert!(matches!(
            ytdlp.version(),
            Err(DownloadError::ToolUnavailable { .. })
        ));
        assert!(matches!(
            ytdlp.download("https://tver.jp/episodes/ep1"),
            Err(DownloadError::SpawnFailed { .. })
        ));
    }

    #[test]
    fn test_save_info() {
        let dir = tempfile::tempdir().unwrap();
        let ytdlp = YtDlp::new(DownloaderConfig {
            output_dir: dir.path().to_path_buf(),
            ..DownloaderConfig::default()
        });
        let info = VideoInfo {
            id: "epabc".to_string(),
            title: "第5話".to_string(),
            webpage: "https://tver.jp/episodes/epabc".to_string(),
            ..VideoInfo::default()
        };

        let path = ytdlp.save_info(&info).unwrap();

        assert_eq!(path, dir.path().join("epabc_info.json"));
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["title"], "第5話");
        assert_eq!(value["webpage_url"], "https://tver.jp/episodes/epabc");
    }

    #[cfg(unix)]
    mod stub {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// Writes an executable yt-dlp stand-in that records its arguments
        fn write_stub(dir: &Path, exit_code: i32) -> PathBuf {
            let script = format!(
                r#"#!/bin/sh
printf '%s\n' "$@" > "$(dirname "$0")/args.txt"
case "$1" in
  --version) echo "2025.06.30" ;;
  --dump-json) echo '{{"id":"ep1","title":"第1話","series":"Show","episode_number":1,"duration":1440.0}}' ;;
esac
exit {}
"#,
                exit_code
            );
            let path = dir.join("yt-dlp-stub");
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn recorded_args(dir: &Path) -> Vec<String> {
            fs::read_to_string(dir.join("args.txt"))
                .unwrap()
                .lines()
                .map(|l| l.to_string())
                .collect()
        }

        fn ytdlp_with_stub(dir: &Path, exit_code: i32) -> YtDlp {
            YtDlp::new(DownloaderConfig {
                program: write_stub(dir, exit_code),
                output_dir: dir.join("out"),
                ..DownloaderConfig::default()
            })
        }

        #[test]
        fn test_version() {
            let _guard = spawn_lock();
            let dir = tempfile::tempdir().unwrap();
            let ytdlp = ytdlp_with_stub(dir.path(), 0);

            assert_eq!(ytdlp.version().unwrap(), "2025.06.30");
        }

        #[test]
        fn test_download_arguments() {
            let _guard = spawn_lock();
            let dir = tempfile::tempdir().unwrap();
            let ytdlp = ytdlp_with_stub(dir.path(), 0);

            ytdlp.download("https://tver.jp/episodes/ep1").unwrap();

            let template = dir
                .path()
                .join("out")
                .join(OUTPUT_TEMPLATE)
                .display()
                .to_string();
            assert_eq!(
                recorded_args(dir.path()),
                vec![
                    "-N".to_string(),
                    "10".to_string(),
                    "--write-info-json".to_string(),
                    "-o".to_string(),
                    template,
                    "https://tver.jp/episodes/ep1".to_string(),
                ]
            );
        }

        #[test]
        fn test_download_failure_reports_exit_code() {
            let _guard = spawn_lock();
            let dir = tempfile::tempdir().unwrap();
            let ytdlp = ytdlp_with_stub(dir.path(), 3);

            match ytdlp.download("https://tver.jp/episodes/ep1") {
                Err(DownloadError::Failed { code, url, .. }) => {
                    assert_eq!(code, Some(3));
                    assert_eq!(url, "https://tver.jp/episodes/ep1");
                }
                other => panic!("expected download failure, got {:?}", other),
            }
        }

        #[test]
        fn test_video_info() {
            let _guard = spawn_lock();
            let dir = tempfile::tempdir().unwrap();
            let ytdlp = ytdlp_with_stub(dir.path(), 0);

            let info = ytdlp.video_info("https://tver.jp/episodes/ep1").unwrap();

            assert_eq!(info.id, "ep1");
            assert_eq!(info.series, "Show");
            assert_eq!(info.episode_number, 1);
            assert_eq!(
                recorded_args(dir.path()),
                vec!["--dump-json", "--no-download", "https://tver.jp/episodes/ep1"]
            );
        }
    }
}
