/// TVer platform API client implementation.
use super::tver_types::{
    ContentEntry, ContentsResponse, EpisodeContent, SeasonContent, TokenResponse,
};
use super::{Credentials, EpisodeEntry, PlatformApi, PlatformApiError};
use crate::config::PlatformConfig;
use reqwest::blocking::Response;
use serde::de::DeserializeOwned;

const TOKEN_PATH: &str = "/v2/api/platform_users/browser/create";
const SERIES_SEASONS_PATH: &str = "/service/api/v1/callSeriesSeasons";
const SEASON_EPISODES_PATH: &str = "/service/api/v1/callSeasonEpisodes";

/// Client for the TVer platform API.
///
/// Every request carries the configured browser user agent and is bounded by
/// the configured timeout. Requests are never retried.
pub struct TverClient {
    client: reqwest::blocking::Client,
    config: PlatformConfig,
}

impl TverClient {
    /// Creates a new client for the given platform configuration.
    pub fn new(config: PlatformConfig) -> Result<Self, PlatformApiError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| PlatformApiError::Request(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Builds the website URL of an episode from its identifier.
    fn episode_url(&self, episode_id: &str) -> String {
        format!("{}/episodes/{}", self.config.web_base_url, episode_id)
    }

    /// Fetches a content listing and decodes its envelope.
    fn fetch_contents<C>(
        &self,
        path: &str,
        id: &str,
        credentials: &Credentials,
    ) -> Result<Vec<ContentEntry<C>>, PlatformApiError>
    where
        C: DeserializeOwned + Default,
    {
        let url = format!("{}{}/{}", self.config.api_base_url, path, id);
        tracing::debug!(%url, "requesting content listing");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("platform_uid", credentials.platform_uid.as_str()),
                ("platform_token", credentials.platform_token.as_str()),
            ])
            .send()
            .map_err(|e| PlatformApiError::Request(e.to_string()))?;

        let status = response.status();
        let body = read_body(response)?;

        if !status.is_success() {
            return Err(PlatformApiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ContentsResponse<C> = serde_json::from_str(&body).map_err(|e| {
            tracing::debug!(error = %e, "content listing did not decode");
            PlatformApiError::Api {
                status: status.as_u16(),
                body: body.clone(),
            }
        })?;

        Ok(envelope.result.contents)
    }
}

/// Reads the full response body as text
fn read_body(response: Response) -> Result<String, PlatformApiError> {
    response
        .text()
        .map_err(|e| PlatformApiError::Request(e.to_string()))
}

impl PlatformApi for TverClient {
    fn authenticate(&self) -> Result<Credentials, PlatformApiError> {
        let url = format!("{}{}", self.config.api_base_url, TOKEN_PATH);
        tracing::debug!(%url, "requesting session token");

        let response = self
            .client
            .post(&url)
            .form(&[("device_type", "pc")])
            .send()
            .map_err(|e| PlatformApiError::Authentication(format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().map_err(|e| {
            PlatformApiError::Authentication(format!("failed to read response: {}", e))
        })?;

        if !status.is_success() {
            return Err(PlatformApiError::Authentication(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            PlatformApiError::Authentication(format!("failed to parse token response: {}", e))
        })?;

        let credentials = Credentials {
            platform_uid: token.result.platform_uid,
            platform_token: token.result.platform_token,
        };

        tracing::info!(uid = %credentials.uid_preview(), "session token acquired");
        Ok(credentials)
    }

    fn list_seasons(
        &self,
        credentials: &Credentials,
        series_id: &str,
    ) -> Result<Vec<String>, PlatformApiError> {
        let contents: Vec<ContentEntry<SeasonContent>> =
            self.fetch_contents(SERIES_SEASONS_PATH, series_id, credentials)?;

        Ok(contents
            .into_iter()
            .filter(|entry| entry.content_type == "season")
            .map(|entry| entry.content.id)
            .collect())
    }

    fn list_episodes(
        &self,
        credentials: &Credentials,
        season_id: &str,
    ) -> Result<Vec<EpisodeEntry>, PlatformApiError> {
        let contents: Vec<ContentEntry<EpisodeContent>> =
            self.fetch_contents(SEASON_EPISODES_PATH, season_id, credentials)?;

        Ok(contents
            .into_iter()
            .filter(|entry| entry.content_type == "episode")
            .map(|entry| EpisodeEntry {
                entry_type: "video".to_string(),
                title: entry.content.title,
                webpage_url: self.episode_url(&entry.content.id),
                id: entry.content.id,
                extractor: "TVer".to_string(),
                end_at: entry.content.end_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_USER_AGENT;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> Credentials {
        Credentials {
            platform_uid: "uid-1234567890".to_string(),
            platform_token: "token-abc".to_string(),
        }
    }

    /// Runs a blocking client call off the async test runtime
    async fn with_client<T, F>(server: &MockServer, call: F) -> T
    where
        T: Send + 'static,
        F: FnOnce(&TverClient) -> T + Send + 'static,
    {
        let config = PlatformConfig::default().with_api_base_url(server.uri());
        tokio::task::spawn_blocking(move || {
            let client = TverClient::new(config).unwrap();
            call(&client)
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string("device_type=pc"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Result": {
                    "platform_uid": "uid-1234567890",
                    "platform_token": "token-abc"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = with_client(&server, |client| client.authenticate()).await;
        assert_eq!(result.unwrap(), credentials());
    }

    #[tokio::test]
    async fn test_authenticate_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let result = with_client(&server, |client| client.authenticate()).await;
        match result {
            Err(PlatformApiError::Authentication(message)) => {
                assert!(message.contains("500"));
                assert!(message.contains("boom"));
            }
            other => panic!("expected authentication error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_authenticate_malformed_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
            .mount(&server)
            .await;

        let result = with_client(&server, |client| client.authenticate()).await;
        assert!(matches!(result, Err(PlatformApiError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_list_seasons_keeps_only_seasons_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/api/v1/callSeriesSeasons/srabc123"))
            .and(query_param("platform_uid", "uid-1234567890"))
            .and(query_param("platform_token", "token-abc"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Result": {
                    "Contents": [
                        {"Type": "season", "Content": {"Id": "ss2"}},
                        {"Type": "banner", "Content": {"Title": "ad"}},
                        {"Type": "season", "Content": {"Id": "ss1"}}
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let seasons = with_client(&server, |client| {
            client.list_seasons(&credentials(), "srabc123")
        })
        .await
        .unwrap();

        assert_eq!(seasons, vec!["ss2", "ss1"]);
    }

    #[tokio::test]
    async fn test_list_seasons_http_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/api/v1/callSeriesSeasons/srmissing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let result = with_client(&server, |client| {
            client.list_seasons(&credentials(), "srmissing")
        })
        .await;

        match result {
            Err(PlatformApiError::Api { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "not found");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_seasons_undecodable_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/api/v1/callSeriesSeasons/srbroken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let result = with_client(&server, |client| {
            client.list_seasons(&credentials(), "srbroken")
        })
        .await;

        match result {
            Err(PlatformApiError::Api { status, body }) => {
                assert_eq!(status, 200);
                assert_eq!(body, "<html>maintenance</html>");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_episodes_synthesizes_urls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/api/v1/callSeasonEpisodes/ss1"))
            .and(query_param("platform_uid", "uid-1234567890"))
            .and(query_param("platform_token", "token-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Result": {
                    "Contents": [
                        {"Type": "episode", "Content": {"Id": "ep111", "Title": "第1話", "EndAt": 1767193200}},
                        {"Type": "live", "Content": {"Id": "lv999", "Title": "Live"}},
                        {"Type": "episode", "Content": {"Id": "ep222", "Title": "第2話"}}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let episodes = with_client(&server, |client| client.list_episodes(&credentials(), "ss1"))
            .await
            .unwrap();

        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].id, "ep111");
        assert_eq!(episodes[0].title, "第1話");
        assert_eq!(episodes[0].webpage_url, "https://tver.jp/episodes/ep111");
        assert_eq!(episodes[0].entry_type, "video");
        assert_eq!(episodes[0].extractor, "TVer");
        assert_eq!(episodes[0].end_at, 1767193200);
        assert_eq!(episodes[1].webpage_url, "https://tver.jp/episodes/ep222");
        assert_eq!(episodes[1].end_at, 0);
    }

    #[tokio::test]
    async fn test_list_episodes_empty_contents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/api/v1/callSeasonEpisodes/ssempty"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Result": {}})))
            .mount(&server)
            .await;

        let episodes = with_client(&server, |client| {
            client.list_episodes(&credentials(), "ssempty")
        })
        .await
        .unwrap();

        assert!(episodes.is_empty());
    }

    #[tokio::test]
    async fn test_request_timeout_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/api/v1/callSeasonEpisodes/ssslow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"Result": {"Contents": []}}))
                    .set_delay(Duration::from_secs(2)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut config = PlatformConfig::default().with_api_base_url(server.uri());
        config.timeout = Duration::from_millis(200);

        let result = tokio::task::spawn_blocking(move || {
            let client = TverClient::new(config).unwrap();
            client.list_episodes(&credentials(), "ssslow")
        })
        .await
        .unwrap();

        assert!(matches!(result, Err(PlatformApiError::Request(_))));
    }
}
