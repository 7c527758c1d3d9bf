//! Prismic REST v2 client

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{query_string, ContentApi, PageQuery, Predicate, RawDocument, RawPage};
use crate::config::SiteConfig;
use crate::error::{Error, Result};

/// API root document; only the refs matter to us
#[derive(Debug, Deserialize)]
struct ApiRoot {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// Handle to one Prismic repository
#[derive(Debug, Clone)]
pub struct PrismicClient {
    client: Client,
    endpoint: Url,
    access_token: Option<String>,
    doc_type: String,
}

impl PrismicClient {
    /// Create a client for `endpoint`, e.g. `https://my-blog.cdn.prismic.io/api/v2`
    pub fn new(
        endpoint: &str,
        access_token: Option<String>,
        doc_type: &str,
        timeout: Duration,
    ) -> Result<Self> {
        if endpoint.trim().is_empty() {
            return Err(Error::Config(format!(
                "api_endpoint is empty; set it in _config.yml or {}",
                crate::config::ENV_API_ENDPOINT
            )));
        }
        let endpoint = Url::parse(endpoint.trim())
            .map_err(|e| Error::Config(format!("invalid api_endpoint {:?}: {}", endpoint, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            access_token,
            doc_type: doc_type.to_string(),
        })
    }

    /// Create a client from site configuration
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        Self::new(
            &config.api_endpoint,
            config.access_token.clone(),
            &config.document_type,
            config.request_timeout(),
        )
    }

    /// Check that a cursor points back at our repository before following it
    pub fn check_cursor(&self, cursor: &str) -> Result<Url> {
        let url = Url::parse(cursor).map_err(|_| Error::InvalidCursor(cursor.to_string()))?;
        if url.scheme() != self.endpoint.scheme()
            || url.host_str() != self.endpoint.host_str()
            || url.port_or_known_default() != self.endpoint.port_or_known_default()
        {
            return Err(Error::InvalidCursor(cursor.to_string()));
        }
        Ok(url)
    }

    /// Build the search URL for `query` against `reference`
    pub fn search_url(&self, reference: &str, query: &PageQuery) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("api_endpoint {} cannot be a base", self.endpoint)))?
            .pop_if_empty()
            .push("documents")
            .push("search");

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", reference);
            pairs.append_pair("q", &query_string(&query.predicates));
            if !query.fetch.is_empty() {
                pairs.append_pair("fetch", &query.fetch.join(","));
            }
            pairs.append_pair("pageSize", &query.page_size.max(1).to_string());
            if let Some(token) = &self.access_token {
                pairs.append_pair("access_token", token);
            }
        }

        Ok(url)
    }

    /// Resolve the master ref from the API root
    ///
    /// Refs change on every publish, so this is looked up per query.
    async fn master_ref(&self) -> Result<String> {
        let mut url = self.endpoint.clone();
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }

        let root: ApiRoot = self.get_json(url).await?;
        root.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or_else(|| Error::MalformedDocument("API root lists no master ref".to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!("GET {}", redact(&url));
        let response = self.client.get(url).send().await?;
        let status = response.status();

        match status {
            s if s.is_success() => {
                let body = response.text().await?;
                serde_json::from_str(&body)
                    .map_err(|e| Error::MalformedDocument(format!("invalid response body: {}", e)))
            }
            StatusCode::NOT_FOUND => Err(Error::Status {
                status,
                body: "resource not found".to_string(),
            }),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::Status { status, body })
            }
        }
    }
}

impl ContentApi for PrismicClient {
    async fn fetch_posts_page(&self, query: &PageQuery) -> Result<RawPage> {
        let reference = self.master_ref().await?;
        let url = self.search_url(&reference, query)?;
        self.get_json(url).await
    }

    async fn fetch_page_url(&self, cursor: &str) -> Result<RawPage> {
        let url = self.check_cursor(cursor)?;
        self.get_json(url).await
    }

    async fn fetch_post_by_uid(&self, uid: &str) -> Result<RawDocument> {
        let query = PageQuery {
            predicates: vec![Predicate::uid(&self.doc_type, uid)],
            fetch: Vec::new(),
            page_size: 1,
        };
        let page = self.fetch_posts_page(&query).await?;
        page.results
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(uid.to_string()))
    }
}

/// Strip the access token before a URL reaches the logs
fn redact(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "access_token") {
        return url.to_string();
    }
    let mut clean = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            if k == "access_token" {
                (k.into_owned(), "***".to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();
    clean.query_pairs_mut().clear().extend_pairs(pairs);
    clean.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(token: Option<&str>) -> PrismicClient {
        PrismicClient::new(
            "https://blog.cdn.prismic.io/api/v2",
            token.map(str::to_string),
            "post",
            Duration::from_secs(30),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_endpoint_is_config_error() {
        let err = PrismicClient::new("", None, "post", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_search_url() {
        let url = client(None)
            .search_url("REF1", &PageQuery::listing("post", 2))
            .unwrap();
        assert_eq!(url.path(), "/api/v2/documents/search");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("ref".to_string(), "REF1".to_string()),
                ("q".to_string(), r#"[[at(document.type, "post")]]"#.to_string()),
                (
                    "fetch".to_string(),
                    "post.title,post.subtitle,post.author".to_string()
                ),
                ("pageSize".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_search_url_with_trailing_slash_and_token() {
        let client = PrismicClient::new(
            "https://blog.cdn.prismic.io/api/v2/",
            Some("tok".to_string()),
            "post",
            Duration::from_secs(30),
        )
        .unwrap();
        let url = client
            .search_url("REF1", &PageQuery::listing("post", 2))
            .unwrap();
        assert_eq!(url.path(), "/api/v2/documents/search");
        assert!(url.query_pairs().any(|(k, v)| k == "access_token" && v == "tok"));
        assert!(redact(&url).contains("access_token=***"));
    }

    #[test]
    fn test_check_cursor() {
        let client = client(None);
        let cursor = "https://blog.cdn.prismic.io/api/v2/documents/search?ref=X&page=2&pageSize=2";
        assert_eq!(client.check_cursor(cursor).unwrap().as_str(), cursor);

        assert!(matches!(
            client.check_cursor("https://evil.example.com/api/v2/documents/search?page=2"),
            Err(Error::InvalidCursor(_))
        ));
        assert!(matches!(
            client.check_cursor("not a url"),
            Err(Error::InvalidCursor(_))
        ));
    }
}
