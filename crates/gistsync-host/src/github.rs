use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::Deserialize;

use gistsync_core::error::GistSyncError;
use gistsync_core::models::snippet::{GistId, Snippet};

use crate::pagination::{next_page_from_link, paginate, Page};
use crate::SnippetSource;

/// Page size requested from the gist listing endpoint.
pub const PER_PAGE: u32 = 100;

/// GitHub Gists API client, authenticated with a bearer token.
pub struct GitHubGists {
    client: reqwest::Client,
    api_url: url::Url,
    username: String,
}

impl GitHubGists {
    pub fn new(api_url: url::Url, token: &str, username: String) -> Result<Self, GistSyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| GistSyncError::config("GITHUB_TOKEN contains invalid characters"))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(concat!("gist-sync/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GistSyncError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url,
            username,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn url(&self, path: &str) -> String {
        let base = self.api_url.as_str().trim_end_matches('/');
        format!("{base}{path}")
    }

    async fn get_checked(&self, url: &str) -> Result<Response, GistSyncError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GistSyncError::ApiError {
                status: 0,
                message: e.to_string(),
            })?;
        check_status(resp).await
    }

    async fn fetch_page(&self, page: u32) -> Result<Page<Snippet>, GistSyncError> {
        let url = format!("{}?per_page={PER_PAGE}&page={page}", self.url("/gists"));
        let resp = self.get_checked(&url).await?;

        let next = resp
            .headers()
            .get(header::LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_page_from_link);

        let gists: Vec<GhGist> = resp.json().await.map_err(|e| GistSyncError::ApiError {
            status: 0,
            message: format!("JSON parse error: {e}"),
        })?;

        Ok(Page {
            items: gists.into_iter().map(Snippet::from).collect(),
            next,
        })
    }
}

/// Map non-success responses onto the error taxonomy.
async fn check_status(resp: Response) -> Result<Response, GistSyncError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let headers = resp.headers();
    let exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    if status == StatusCode::TOO_MANY_REQUESTS || (status == StatusCode::FORBIDDEN && exhausted) {
        let retry_after_secs = retry_after(headers).unwrap_or(60);
        return Err(GistSyncError::RateLimited {
            host: resp.url().host_str().unwrap_or("github").to_string(),
            retry_after_secs,
        });
    }

    let code = status.as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(GistSyncError::ApiError {
        status: code,
        message: body,
    })
}

fn retry_after(headers: &HeaderMap) -> Option<u64> {
    if let Some(secs) = headers
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
    {
        return Some(secs);
    }
    let reset: i64 = headers
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())?;
    let now = chrono::Utc::now().timestamp();
    Some(reset.saturating_sub(now).max(0) as u64)
}

#[derive(Deserialize)]
struct GhGist {
    id: String,
    description: Option<String>,
    #[serde(default)]
    public: bool,
    git_pull_url: String,
    #[serde(default)]
    git_push_url: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
}

impl From<GhGist> for Snippet {
    fn from(g: GhGist) -> Self {
        Snippet {
            id: GistId(g.id),
            description: g.description.unwrap_or_default(),
            public: g.public,
            pull_url: g.git_pull_url,
            push_url: g.git_push_url.unwrap_or_default(),
            html_url: g.html_url.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl SnippetSource for GitHubGists {
    async fn list_all(&self) -> Result<Vec<Snippet>, GistSyncError> {
        paginate(|page| self.fetch_page(page)).await
    }

    async fn get(&self, id: &GistId) -> Result<Option<Snippet>, GistSyncError> {
        let url = self.url(&format!("/gists/{id}"));
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GistSyncError::ApiError {
                status: 0,
                message: e.to_string(),
            })?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check_status(resp).await?;

        let gist: GhGist = resp.json().await.map_err(|e| GistSyncError::ApiError {
            status: 0,
            message: format!("JSON parse error: {e}"),
        })?;
        Ok(Some(Snippet::from(gist)))
    }

    async fn validate_credentials(&self) -> Result<bool, GistSyncError> {
        let resp = self
            .client
            .get(self.url("/user"))
            .send()
            .await
            .map_err(|e| GistSyncError::ApiError {
                status: 0,
                message: e.to_string(),
            })?;
        Ok(resp.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gist_conversion() {
        let json = r#"{
            "id": "aa5a315d61ae9438b18d",
            "description": null,
            "public": false,
            "git_pull_url": "https://gist.github.com/aa5a315d61ae9438b18d.git",
            "git_push_url": "https://gist.github.com/aa5a315d61ae9438b18d.git",
            "html_url": "https://gist.github.com/aa5a315d61ae9438b18d",
            "files": {}
        }"#;
        let gh: GhGist = serde_json::from_str(json).unwrap();
        let snippet = Snippet::from(gh);
        assert_eq!(snippet.id.as_str(), "aa5a315d61ae9438b18d");
        assert_eq!(snippet.description, "");
        assert!(!snippet.public);
        assert_eq!(
            snippet.pull_url,
            "https://gist.github.com/aa5a315d61ae9438b18d.git"
        );
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = GitHubGists::new(
            url::Url::parse("https://api.github.com/").unwrap(),
            "token",
            "octocat".into(),
        )
        .unwrap();
        assert_eq!(client.url("/gists"), "https://api.github.com/gists");
        assert_eq!(client.username(), "octocat");
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::RETRY_AFTER, HeaderValue::from_static("42"));
        assert_eq!(retry_after(&headers), Some(42));
        assert_eq!(retry_after(&HeaderMap::new()), None);
    }

    #[test]
    fn test_invalid_token_rejected() {
        let result = GitHubGists::new(
            url::Url::parse("https://api.github.com").unwrap(),
            "bad\ntoken",
            "octocat".into(),
        );
        assert!(result.is_err());
    }

    mod http {
        use super::*;
        use serde_json::json;
        use wiremock::matchers::{header as header_eq, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn gist(id: &str) -> serde_json::Value {
            json!({
                "id": id,
                "description": format!("gist {id}"),
                "public": true,
                "git_pull_url": format!("https://gist.github.com/{id}.git"),
            })
        }

        fn client(server: &MockServer) -> GitHubGists {
            GitHubGists::new(
                url::Url::parse(&server.uri()).unwrap(),
                "ghp_test",
                "octocat".into(),
            )
            .unwrap()
        }

        #[tokio::test]
        async fn test_list_follows_link_header() {
            let server = MockServer::start().await;
            let link = format!(
                "<{uri}/gists?per_page=100&page=2>; rel=\"next\", <{uri}/gists?per_page=100&page=2>; rel=\"last\"",
                uri = server.uri()
            );
            Mock::given(method("GET"))
                .and(path("/gists"))
                .and(query_param("page", "1"))
                .and(query_param("per_page", "100"))
                .and(header_eq("authorization", "Bearer ghp_test"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("link", link.as_str())
                        .set_body_json(json!([gist("a"), gist("b")])),
                )
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/gists"))
                .and(query_param("page", "2"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([gist("c")])))
                .expect(1)
                .mount(&server)
                .await;

            let snippets = client(&server).list_all().await.unwrap();
            let ids: Vec<&str> = snippets.iter().map(|s| s.id.as_str()).collect();
            assert_eq!(ids, vec!["a", "b", "c"]);
            assert_eq!(snippets[2].description, "gist c");
        }

        #[tokio::test]
        async fn test_exhausted_quota_is_rate_limited() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/gists"))
                .respond_with(
                    ResponseTemplate::new(403)
                        .insert_header("x-ratelimit-remaining", "0")
                        .insert_header("retry-after", "30"),
                )
                .mount(&server)
                .await;

            let err = client(&server).list_all().await.unwrap_err();
            assert!(
                matches!(err, GistSyncError::RateLimited { retry_after_secs: 30, .. }),
                "{err:?}"
            );
        }

        #[tokio::test]
        async fn test_too_many_requests_is_rate_limited() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/gists"))
                .respond_with(ResponseTemplate::new(429))
                .mount(&server)
                .await;

            let err = client(&server).list_all().await.unwrap_err();
            assert!(
                matches!(err, GistSyncError::RateLimited { retry_after_secs: 60, .. }),
                "{err:?}"
            );
        }

        #[tokio::test]
        async fn test_other_failures_are_api_errors() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/gists"))
                .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/gists/broken"))
                .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
                .mount(&server)
                .await;

            let gh = client(&server);
            match gh.list_all().await.unwrap_err() {
                GistSyncError::ApiError { status, message } => {
                    assert_eq!(status, 403);
                    assert_eq!(message, "forbidden");
                }
                other => panic!("expected ApiError, got {other:?}"),
            }
            match gh.get(&GistId::new("broken")).await.unwrap_err() {
                GistSyncError::ApiError { status, .. } => assert_eq!(status, 500),
                other => panic!("expected ApiError, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_get_missing_and_present() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/gists/gone"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/gists/abc"))
                .respond_with(ResponseTemplate::new(200).set_body_json(gist("abc")))
                .mount(&server)
                .await;

            let gh = client(&server);
            assert_eq!(gh.get(&GistId::new("gone")).await.unwrap(), None);
            let found = gh.get(&GistId::new("abc")).await.unwrap().unwrap();
            assert_eq!(found.pull_url, "https://gist.github.com/abc.git");
        }

        #[tokio::test]
        async fn test_validate_credentials() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/user"))
                .respond_with(ResponseTemplate::new(401))
                .mount(&server)
                .await;

            assert!(!client(&server).validate_credentials().await.unwrap());
        }
    }
}
