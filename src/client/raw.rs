//! Loosely-typed documents as returned by the content API

use serde::{Deserialize, Serialize};

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPage {
    pub page: Option<u32>,
    pub total_pages: Option<u32>,
    /// Absolute URL of the next page, `null` on the last one
    pub next_page: Option<String>,
    pub results: Vec<RawDocument>,
}

/// A single document; everything under `data` is left untyped until
/// it goes through the normalizer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDocument {
    pub id: Option<String>,
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub first_publication_date: Option<String>,
    pub last_publication_date: Option<String>,
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_page() {
        let json = r#"{
            "page": 1,
            "results_per_page": 2,
            "total_pages": 3,
            "next_page": "https://blog.cdn.prismic.io/api/v2/documents/search?ref=X&page=2&pageSize=2",
            "results": [
                {
                    "id": "YF1",
                    "uid": "como-utilizar-hooks",
                    "type": "post",
                    "first_publication_date": "2021-03-15T19:25:28+0000",
                    "data": { "title": "Como utilizar Hooks", "subtitle": "Pensando em sincronização", "author": "Joseph Oliveira" }
                },
                { "id": "YF2", "uid": null, "first_publication_date": null, "data": {} }
            ]
        }"#;
        let page: RawPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_pages, Some(3));
        assert!(page.next_page.unwrap().ends_with("page=2&pageSize=2"));
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].doc_type.as_deref(), Some("post"));
        assert_eq!(page.results[1].uid, None);
        assert_eq!(page.results[1].first_publication_date, None);
    }

    #[test]
    fn test_last_page_has_no_cursor() {
        let page: RawPage = serde_json::from_str(r#"{"next_page": null, "results": []}"#).unwrap();
        assert_eq!(page.next_page, None);
        assert!(page.results.is_empty());
    }
}
