//! Episode number extraction
//!
//! Episode titles on the platform follow a handful of loose conventions.
//! This module turns a free-text title into an episode number by evaluating
//! an ordered table of title rules.

use regex::Regex;
use std::sync::OnceLock;

/// A single title convention: a pattern whose first capture group holds the number
struct TitleRule {
    /// Short name used in debug logging
    name: &'static str,
    pattern: Regex,
}

impl TitleRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("title rule pattern must compile"),
        }
    }

    /// Returns the number captured by this rule, if the rule matches and the
    /// captured text fits a signed 64-bit integer
    fn apply(&self, title: &str) -> Option<u64> {
        let caps = self.pattern.captures(title)?;
        let number: i64 = caps.get(1)?.as_str().parse().ok()?;
        u64::try_from(number).ok()
    }
}

static TITLE_RULES: OnceLock<Vec<TitleRule>> = OnceLock::new();

/// Rules in priority order. Earlier rules win when several match.
fn title_rules() -> &'static [TitleRule] {
    TITLE_RULES.get_or_init(|| {
        vec![
            // ASCII digits and whitespace only; full-width forms are not part of any marker
            TitleRule::new("japanese", r"第([0-9]+)話"),
            TitleRule::new("english", r"Episode[\t\n\f\r ]+([0-9]+)"),
            TitleRule::new("hash", r"#([0-9]+)"),
        ]
    })
}

/// Extracts the episode number from an episode title
///
/// Rules are tried in order: `第N話`, then `Episode N`, then `#N`. Only ASCII
/// digits form a number, so a full-width marker such as `第１話` is skipped and
/// a later ASCII marker of the same kind still counts. A rule whose number
/// does not fit in an `i64` does not count, and the next rule is tried.
///
/// Returns 0 when no rule yields a number. 0 is the "unknown" marker, not a
/// real episode number.
///
/// # Examples
///
/// ```
/// use tver_dl::extract_episode_number;
///
/// assert_eq!(extract_episode_number("第12話 旅立ち"), 12);
/// assert_eq!(extract_episode_number("#7 Episode 3"), 3);
/// assert_eq!(extract_episode_number("総集編"), 0);
/// ```
pub fn extract_episode_number(title: &str) -> u64 {
    for rule in title_rules() {
        if let Some(number) = rule.apply(title) {
            tracing::trace!(rule = rule.name, number, title, "episode number extracted");
            return number;
        }
    }

    0
}
