//! In-memory content API for tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use super::{ContentApi, PageQuery, RawDocument, RawPage};
use crate::error::{Error, Result};

/// A listing document with the usual fields filled in
pub fn raw_post(uid: &str, first_publication_date: Option<&str>) -> RawDocument {
    RawDocument {
        id: Some(format!("id-{}", uid)),
        uid: Some(uid.to_string()),
        doc_type: Some("post".to_string()),
        first_publication_date: first_publication_date.map(str::to_string),
        last_publication_date: None,
        data: serde_json::json!({
            "title": format!("Title {}", uid),
            "subtitle": format!("Subtitle {}", uid),
            "author": "Danilo Vieira",
        }),
    }
}

/// Scripted responses keyed by cursor and uid
///
/// Queued cursor responses are consumed in order, except that a last
/// successful response keeps being served.
#[derive(Default)]
pub struct ScriptedApi {
    first_page: Option<RawPage>,
    cursors: Mutex<HashMap<String, VecDeque<Result<RawPage>>>>,
    documents: HashMap<String, RawDocument>,
    gate: Option<Arc<Notify>>,
    page_calls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_first_page(mut self, page: RawPage) -> Self {
        self.first_page = Some(page);
        self
    }

    pub fn with_cursor(self, cursor: &str, response: Result<RawPage>) -> Self {
        self.cursors
            .lock()
            .unwrap()
            .entry(cursor.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn with_document(mut self, doc: RawDocument) -> Self {
        let uid = doc.uid.clone().unwrap_or_default();
        self.documents.insert(uid, doc);
        self
    }

    /// Hold every cursor response until `gate` is notified
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of cursor fetches issued so far
    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    fn next_cursor_response(&self, cursor: &str) -> Result<RawPage> {
        let mut cursors = self.cursors.lock().unwrap();
        let queue = cursors
            .get_mut(cursor)
            .ok_or_else(|| Error::InvalidCursor(cursor.to_string()))?;
        if queue.len() == 1 {
            if let Some(Ok(page)) = queue.front() {
                return Ok(page.clone());
            }
        }
        queue
            .pop_front()
            .unwrap_or_else(|| Err(Error::InvalidCursor(cursor.to_string())))
    }
}

impl ContentApi for ScriptedApi {
    async fn fetch_posts_page(&self, _query: &PageQuery) -> Result<RawPage> {
        self.first_page.clone().ok_or_else(|| Error::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "no first page scripted".to_string(),
        })
    }

    async fn fetch_page_url(&self, cursor: &str) -> Result<RawPage> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.next_cursor_response(cursor)
    }

    async fn fetch_post_by_uid(&self, uid: &str) -> Result<RawDocument> {
        self.documents
            .get(uid)
            .cloned()
            .ok_or_else(|| Error::NotFound(uid.to_string()))
    }
}
