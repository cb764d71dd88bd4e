/// TVer platform API response types for deserialization.
///
/// These structures mirror the JSON envelopes returned by the platform.
use serde::Deserialize;

/// Response of the session creation endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    #[serde(rename = "Result")]
    pub result: TokenResult,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenResult {
    pub platform_uid: String,
    pub platform_token: String,
}

/// Response shared by the season and episode lookup endpoints.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "C: Deserialize<'de> + Default"))]
pub(super) struct ContentsResponse<C> {
    #[serde(rename = "Result")]
    pub result: ContentsResult<C>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "C: Deserialize<'de> + Default"))]
pub(super) struct ContentsResult<C> {
    /// Mixed list of content entries; may be absent for empty listings
    #[serde(rename = "Contents", default = "Vec::new")]
    pub contents: Vec<ContentEntry<C>>,
}

/// One entry of a content listing, tagged with its kind.
#[derive(Debug, Deserialize)]
pub(super) struct ContentEntry<C> {
    /// Entry kind such as "season" or "episode"
    #[serde(rename = "Type", default)]
    pub content_type: String,
    /// Missing for some entry kinds; defaulted so the listing still decodes
    #[serde(rename = "Content", default)]
    pub content: C,
}

/// Payload of a "season" entry.
#[derive(Debug, Default, Deserialize)]
pub(super) struct SeasonContent {
    #[serde(rename = "Id", default)]
    pub id: String,
}

/// Payload of an "episode" entry.
#[derive(Debug, Default, Deserialize)]
pub(super) struct EpisodeContent {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    /// End of availability (unix seconds)
    #[serde(rename = "EndAt", default)]
    pub end_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_listing_decodes() {
        let response: ContentsResponse<SeasonContent> = serde_json::from_str(
            r#"{"Result": {"Contents": [
                {"Type": "season", "Content": {"Id": "ss1"}},
                {"Type": "banner"}
            ]}}"#,
        )
        .unwrap();

        let contents = response.result.contents;
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].content_type, "season");
        assert_eq!(contents[0].content.id, "ss1");
        assert_eq!(contents[1].content_type, "banner");
        assert!(contents[1].content.id.is_empty());
    }

    #[test]
    fn test_episode_listing_decodes() {
        let response: ContentsResponse<EpisodeContent> = serde_json::from_str(
            r#"{"Result": {"Contents": [
                {"Type": "episode", "Content": {"Id": "ep1", "Title": "第1話", "EndAt": 1735657200}}
            ]}}"#,
        )
        .unwrap();

        let episode = &response.result.contents[0].content;
        assert_eq!(episode.id, "ep1");
        assert_eq!(episode.title, "第1話");
        assert_eq!(episode.end_at, 1_735_657_200);
    }
}
