//! Content API client
//!
//! [`ContentApi`] is the seam between page building and the headless
//! store. [`PrismicClient`] talks to a Prismic REST v2 repository; tests
//! plug in in-memory implementations.

mod prismic;
mod raw;
#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;

pub use prismic::PrismicClient;
pub use raw::{RawDocument, RawPage};

use crate::error::Result;

/// Page size used when walking every document to collect identifiers
pub const IDENTIFIER_PAGE_SIZE: usize = 100;

/// A query filter sent to the content API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    path: String,
    value: String,
}

impl Predicate {
    /// `at(path, value)`: exact match on a document field
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Select documents of one custom type
    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }

    /// Select the document of `doc_type` carrying `uid`
    pub fn uid(doc_type: &str, uid: &str) -> Self {
        Self::at(format!("my.{}.uid", doc_type), uid)
    }

    /// Query-language form, e.g. `[at(document.type, "post")]`
    pub fn to_query(&self) -> String {
        let value = self.value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("[at({}, \"{}\")]", self.path, value)
    }
}

/// Combine predicates into the `q` parameter
pub fn query_string(predicates: &[Predicate]) -> String {
    let inner: String = predicates.iter().map(Predicate::to_query).collect();
    format!("[{}]", inner)
}

/// Parameters for one search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub predicates: Vec<Predicate>,
    /// Field whitelist; an optimization only, the normalizer copes with gaps
    pub fetch: Vec<String>,
    pub page_size: usize,
}

impl PageQuery {
    /// Listing query: title, subtitle and author of `doc_type` documents
    pub fn listing(doc_type: &str, page_size: usize) -> Self {
        Self {
            predicates: vec![Predicate::document_type(doc_type)],
            fetch: ["title", "subtitle", "author"]
                .iter()
                .map(|field| format!("{}.{}", doc_type, field))
                .collect(),
            page_size,
        }
    }
}

/// Read access to the content store
///
/// Results come back in the store's default ordering, and a missing
/// `next_page` is the only end-of-results signal. Failures are returned
/// as-is: there is no retry or backoff at this layer.
pub trait ContentApi: Send + Sync {
    /// Run a search and return its first page
    fn fetch_posts_page(&self, query: &PageQuery) -> impl Future<Output = Result<RawPage>> + Send;

    /// Fetch the page behind an opaque cursor URL, exactly as given
    fn fetch_page_url(&self, cursor: &str) -> impl Future<Output = Result<RawPage>> + Send;

    /// Fetch one document by its slug identifier
    fn fetch_post_by_uid(&self, uid: &str) -> impl Future<Output = Result<RawDocument>> + Send;

    /// Collect every identifier matching `predicate`, following cursors
    /// until the last page
    fn fetch_all_uids(
        &self,
        predicate: &Predicate,
    ) -> impl Future<Output = Result<Vec<String>>> + Send {
        async move {
            let query = PageQuery {
                predicates: vec![predicate.clone()],
                fetch: Vec::new(),
                page_size: IDENTIFIER_PAGE_SIZE,
            };

            let mut page = self.fetch_posts_page(&query).await?;
            let mut uids = Vec::new();
            loop {
                for doc in &page.results {
                    match &doc.uid {
                        Some(uid) => uids.push(uid.clone()),
                        None => tracing::debug!("Skipping document {:?} without uid", doc.id),
                    }
                }
                match page.next_page.take() {
                    Some(cursor) => page = self.fetch_page_url(&cursor).await?,
                    None => break,
                }
            }

            Ok(uids)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;

    /// Serves pages from memory, keyed by cursor
    struct PagedStore {
        first: RawPage,
        pages: HashMap<String, RawPage>,
    }

    fn doc(uid: Option<&str>) -> RawDocument {
        RawDocument {
            uid: uid.map(str::to_string),
            ..Default::default()
        }
    }

    impl ContentApi for PagedStore {
        async fn fetch_posts_page(&self, _query: &PageQuery) -> Result<RawPage> {
            Ok(self.first.clone())
        }

        async fn fetch_page_url(&self, cursor: &str) -> Result<RawPage> {
            self.pages
                .get(cursor)
                .cloned()
                .ok_or_else(|| Error::InvalidCursor(cursor.to_string()))
        }

        async fn fetch_post_by_uid(&self, uid: &str) -> Result<RawDocument> {
            Err(Error::NotFound(uid.to_string()))
        }
    }

    #[test]
    fn test_predicate_query() {
        assert_eq!(
            Predicate::document_type("post").to_query(),
            r#"[at(document.type, "post")]"#
        );
        assert_eq!(
            Predicate::uid("post", r#"a"b"#).to_query(),
            r#"[at(my.post.uid, "a\"b")]"#
        );
        assert_eq!(
            query_string(&[Predicate::document_type("post")]),
            r#"[[at(document.type, "post")]]"#
        );
    }

    #[test]
    fn test_listing_query_fields() {
        let query = PageQuery::listing("post", 2);
        assert_eq!(query.fetch, vec!["post.title", "post.subtitle", "post.author"]);
        assert_eq!(query.page_size, 2);
    }

    #[tokio::test]
    async fn test_fetch_all_uids_follows_cursors() {
        let mut pages = HashMap::new();
        pages.insert(
            "p2".to_string(),
            RawPage {
                next_page: Some("p3".to_string()),
                results: vec![doc(Some("c")), doc(None)],
                ..Default::default()
            },
        );
        pages.insert(
            "p3".to_string(),
            RawPage {
                results: vec![doc(Some("d"))],
                ..Default::default()
            },
        );
        let store = PagedStore {
            first: RawPage {
                next_page: Some("p2".to_string()),
                results: vec![doc(Some("a")), doc(Some("b"))],
                ..Default::default()
            },
            pages,
        };

        let uids = store
            .fetch_all_uids(&Predicate::document_type("post"))
            .await
            .unwrap();
        assert_eq!(uids, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_fetch_all_uids_propagates_failure() {
        let store = PagedStore {
            first: RawPage {
                next_page: Some("missing".to_string()),
                results: vec![doc(Some("a"))],
                ..Default::default()
            },
            pages: HashMap::new(),
        };

        let err = store
            .fetch_all_uids(&Predicate::document_type("post"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCursor(_)));
    }
}
