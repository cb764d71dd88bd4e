use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use tver_dl::{
    DEFAULT_OUTPUT_DIR, Downloader, DownloaderConfig, EpisodeRange, ParsedEpisode,
    PlatformConfig, ProgressEvent, SERIES_FILE_NAME, VideoInfo, YtDlp, download_episodes,
    episode_id_from_url, fetch_series, save_series,
};

#[derive(Parser)]
#[command(name = "tver-dl")]
#[command(author, version, about = "TVer series downloader built on yt-dlp")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// yt-dlp executable to run
    #[arg(long = "yt-dlp", global = true, default_value = "yt-dlp")]
    yt_dlp: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch video information only
    Info {
        /// Episode URL, e.g. https://tver.jp/episodes/epuk32qiqy
        url: String,

        /// Output directory
        #[arg(default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,
    },

    /// Download a single episode
    Download {
        /// Episode URL
        url: String,

        /// Output directory
        #[arg(default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,
    },

    /// Fetch video information and download the episode
    Both {
        /// Episode URL
        url: String,

        /// Output directory
        #[arg(default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,
    },

    /// Resolve a whole series and download its episodes
    Series {
        /// Series URL, e.g. https://tver.jp/series/srrazrs5j2
        url: String,

        /// Output directory
        #[arg(default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Only list the episodes, do not download
        #[arg(long)]
        list: bool,

        /// First episode number to include
        #[arg(long, default_value_t = 0)]
        from: u64,

        /// Last episode number to include
        #[arg(long, default_value_t = 0)]
        to: u64,

        /// Include every episode, including those without a number; overrides --from/--to
        #[arg(long)]
        all: bool,
    },
}

impl Commands {
    fn output_dir(&self) -> &Path {
        match self {
            Commands::Info { output_dir, .. }
            | Commands::Download { output_dir, .. }
            | Commands::Both { output_dir, .. }
            | Commands::Series { output_dir, .. } => output_dir,
        }
    }
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::ResolvingSeries { url } => {
            println!("Fetching series information: {}", url);
        }
        ProgressEvent::SeriesIdentified { series_id } => {
            println!("Series ID: {}", series_id);
        }
        ProgressEvent::Authenticated { uid_preview } => {
            println!("Token acquired: UID={}", uid_preview);
        }
        ProgressEvent::SeasonsFound { count } => {
            println!("Seasons: {}", count);
        }
        ProgressEvent::SeasonSkipped { season_id, reason } => {
            println!("  Skipping season {}: {}", season_id, reason);
        }
        ProgressEvent::EpisodesCollected { count } => {
            println!("Episodes: {}", count);
        }
        ProgressEvent::DownloadingEpisode {
            index,
            total,
            title,
        } => {
            println!("\n[{}/{}] Downloading: {}", index + 1, total, title);
        }
        ProgressEvent::EpisodeDownloaded { title, elapsed } => {
            println!("Done: {} ({:.1?})", title, elapsed);
        }
        ProgressEvent::EpisodeFailed {
            episode_number,
            title,
            reason,
        } => {
            eprintln!(
                "Download of episode {} ({}) failed: {}",
                episode_number, title, reason
            );
        }
        ProgressEvent::DownloadsComplete { succeeded, failed } => {
            println!(
                "\nDownloads complete: {} succeeded, {} failed",
                succeeded, failed
            );
        }
    }
}

/// Range filter for the series command; `--all` disables filtering
fn episode_range(all: bool, from: u64, to: u64) -> Option<EpisodeRange> {
    if all {
        None
    } else {
        Some(EpisodeRange::new(from, to))
    }
}

fn display_episodes(episodes: &[ParsedEpisode]) {
    println!("\n=== Episodes ===");
    for (index, episode) in episodes.iter().enumerate() {
        if episode.has_number() {
            println!(
                "{:2}. Episode {}: {}",
                index + 1,
                episode.episode_number,
                episode.title
            );
        } else {
            println!("{:2}. [unknown number]: {}", index + 1, episode.title);
        }
        println!("    ID: {}", episode.id);
        println!("    URL: {}", episode.url);
        println!();
    }
    println!("Total: {} episode(s)", episodes.len());
    println!("================");
}

fn display_video_info(info: &VideoInfo) {
    println!("\n=== Video Info ===");
    println!("ID: {}", info.id);
    println!("Title: {}", info.title);
    println!("Series: {}", info.series);
    println!("Season: {}", info.season);
    println!("Episode: {}", info.episode);
    if info.episode_number > 0 {
        println!("Episode number: {}", info.episode_number);
    }
    println!("Uploader: {}", info.uploader);
    println!("Upload date: {}", info.upload_date);
    if info.duration > 0.0 {
        println!(
            "Duration: {:.0}s ({:.1} min)",
            info.duration,
            info.duration / 60.0
        );
    }
    println!("URL: {}", info.webpage);
    if !info.description.is_empty() {
        println!("Description: {}", info.description.trim());
    }
    println!("==================\n");
}

fn save_info_or_warn(ytdlp: &YtDlp, info: &VideoInfo) {
    match ytdlp.save_info(info) {
        Ok(path) => println!("Video info saved: {}", path.display()),
        Err(e) => eprintln!("Failed to save video info: {}", e),
    }
}

fn download_single(ytdlp: &YtDlp, url: &str) -> Result<()> {
    println!("Starting download: {}", url);
    let started = Instant::now();
    ytdlp.download(url).context("Download failed")?;
    println!("Download complete ({:.1?})", started.elapsed());
    Ok(())
}

fn run_series(
    ytdlp: &YtDlp,
    url: &str,
    range: Option<EpisodeRange>,
    list_only: bool,
) -> Result<()> {
    let episodes = fetch_series(PlatformConfig::default(), url, range, handle_progress_event)
        .context("Failed to fetch series information")?;

    display_episodes(&episodes);

    let series_file = ytdlp.output_dir().join(SERIES_FILE_NAME);
    match save_series(&episodes, &series_file) {
        Ok(()) => println!("Series information saved: {}", series_file.display()),
        Err(e) => eprintln!("Failed to save series information: {}", e),
    }

    if list_only {
        println!("Episode listing complete!");
        return Ok(());
    }

    if episodes.is_empty() {
        println!("No episodes to download.");
        return Ok(());
    }

    println!("\nDownloading {} episode(s)...", episodes.len());
    download_episodes(ytdlp, &episodes, handle_progress_event);

    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let ytdlp = YtDlp::new(DownloaderConfig {
        program: cli.yt_dlp.clone(),
        output_dir: cli.command.output_dir().to_path_buf(),
        ..DownloaderConfig::default()
    });

    let version = ytdlp.version().context("yt-dlp check failed")?;
    println!("yt-dlp version: {}", version);

    ytdlp
        .ensure_output_dir()
        .context("Failed to create output directory")?;
    println!("Output directory: {}\n", ytdlp.output_dir().display());

    match cli.command {
        Commands::Info { url, .. } => {
            let episode_id = episode_id_from_url(&url)?;
            println!("Episode ID: {}", episode_id);

            let info = ytdlp
                .video_info(&url)
                .context("Failed to fetch video info")?;
            display_video_info(&info);
            save_info_or_warn(&ytdlp, &info);
        }
        Commands::Download { url, .. } => {
            let episode_id = episode_id_from_url(&url)?;
            println!("Episode ID: {}", episode_id);

            download_single(&ytdlp, &url)?;
        }
        Commands::Both { url, .. } => {
            let episode_id = episode_id_from_url(&url)?;
            println!("Episode ID: {}", episode_id);

            let info = ytdlp
                .video_info(&url)
                .context("Failed to fetch video info")?;
            display_video_info(&info);
            download_single(&ytdlp, &url)?;
            save_info_or_warn(&ytdlp, &info);
        }
        Commands::Series {
            url,
            list,
            from,
            to,
            all,
            ..
        } => {
            run_series(&ytdlp, &url, episode_range(all, from, to), list)?;
        }
    }

    println!("All done!");
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick a level from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "tver_dl=debug".to_string()
        } else {
            "tver_dl=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("\nError: {:#}", e);
        process::exit(1);
    }
}
