//! Episode list processing
//!
//! Turns raw platform entries into numbered episodes, keeps them in a
//! deterministic order and applies episode range filters.

use crate::episode_number::extract_episode_number;
use crate::platform_api::EpisodeEntry;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::OnceLock;

/// An episode with its number extracted from the title.
///
/// Serialized field names match the `series_info.json` artifact format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEpisode {
    /// Episode number, 0 when the title carries no recognizable number
    #[serde(rename = "EpisodeNumber")]
    pub episode_number: u64,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "URL")]
    pub url: String,
    /// Episode identifier taken from the URL, empty when the URL has none
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "OriginalTitle")]
    pub original_title: String,
}

impl ParsedEpisode {
    /// Whether a number could be extracted from the title
    pub fn has_number(&self) -> bool {
        self.episode_number != 0
    }
}

/// An inclusive episode number range; 0 on either side leaves it open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpisodeRange {
    pub from: u64,
    pub to: u64,
}

impl EpisodeRange {
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    /// Whether an episode number passes this range
    ///
    /// 0 never passes, even for a fully open range.
    pub fn contains(&self, episode_number: u64) -> bool {
        if episode_number == 0 {
            return false;
        }
        if self.from > 0 && episode_number < self.from {
            return false;
        }
        if self.to > 0 && episode_number > self.to {
            return false;
        }
        true
    }
}

static EPISODE_ID_PATTERN: OnceLock<Regex> = OnceLock::new();

fn episode_id_pattern() -> &'static Regex {
    EPISODE_ID_PATTERN.get_or_init(|| {
        Regex::new(r"episodes/([a-zA-Z0-9]+)").expect("compile episode id pattern")
    })
}

/// Extracts the episode identifier from an episode URL, if present
pub fn extract_episode_id(url: &str) -> Option<String> {
    episode_id_pattern()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parses raw entries into numbered episodes and sorts them
///
/// An entry whose URL has no episode id gets an empty id.
pub fn parse_episodes(entries: &[EpisodeEntry]) -> Vec<ParsedEpisode> {
    let mut episodes: Vec<ParsedEpisode> = entries
        .iter()
        .map(|entry| ParsedEpisode {
            episode_number: extract_episode_number(&entry.title),
            title: entry.title.clone(),
            url: entry.webpage_url.clone(),
            id: extract_episode_id(&entry.webpage_url).unwrap_or_default(),
            original_title: entry.title.clone(),
        })
        .collect();

    sort_episodes(&mut episodes);
    episodes
}

/// Orders two episode numbers with unknown (0) after every known number
fn compare_episode_numbers(a: u64, b: u64) -> Ordering {
    match (a, b) {
        (0, 0) => Ordering::Equal,
        (0, _) => Ordering::Greater,
        (_, 0) => Ordering::Less,
        _ => a.cmp(&b),
    }
}

/// Sorts episodes by number, ascending, with unnumbered episodes last
///
/// The sort is stable: episodes with equal numbers, including all unnumbered
/// ones, keep their input order.
pub fn sort_episodes(episodes: &mut [ParsedEpisode]) {
    episodes.sort_by(|a, b| compare_episode_numbers(a.episode_number, b.episode_number));
}

/// Keeps the episodes inside the given range
///
/// Unnumbered episodes are always dropped.
pub fn filter_episodes(episodes: &[ParsedEpisode], range: EpisodeRange) -> Vec<ParsedEpisode> {
    episodes
        .iter()
        .filter(|episode| range.contains(episode.episode_number))
        .cloned()
        .collect()
}
