//! Post models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::richtext::RichText;

/// Words per minute used for the reading-time estimate
pub const WORDS_PER_MINUTE: usize = 200;

/// A blog post as shown on the listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Store-assigned document id
    pub id: Option<String>,

    /// Slug identifier, used in the post URL
    pub uid: Option<String>,

    /// Absent for documents that were never published
    pub first_publication_date: Option<DateTime<Utc>>,

    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl Post {
    /// URL path of the post page (without root), when it has a slug
    pub fn path(&self) -> Option<String> {
        self.uid.as_ref().map(|uid| post_path(uid))
    }
}

/// URL path for the post with slug `uid`
pub fn post_path(uid: &str) -> String {
    format!("post/{}/", uid)
}

/// Banner image at the top of a post page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub url: String,
    pub alt: Option<String>,
}

/// One titled section of a post body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub heading: String,
    pub body: RichText,
}

/// A post with everything needed for its own page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub banner: Banner,
    pub content: Vec<ContentSection>,
}

impl PostDetail {
    /// Words across section headings and bodies
    pub fn word_count(&self) -> usize {
        self.content
            .iter()
            .map(|section| {
                section.heading.split_whitespace().count()
                    + section.body.plain_text().split_whitespace().count()
            })
            .sum()
    }

    /// Estimated reading time in whole minutes, at least one
    pub fn reading_time(&self) -> usize {
        self.word_count().div_ceil(WORDS_PER_MINUTE).max(1)
    }
}

/// The accumulated result set behind the listing page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginatedPosts {
    /// Cursor URL of the next page; `None` once the last page is loaded
    pub next_page: Option<String>,
    pub results: Vec<Post>,
}

impl PaginatedPosts {
    /// Append a freshly loaded page and take over its cursor
    ///
    /// Existing entries keep their position. With `dedup_by_uid`, posts whose
    /// uid is already present are dropped; posts without a uid are always kept.
    /// Returns how many posts were appended.
    pub fn append(&mut self, page: PaginatedPosts, dedup_by_uid: bool) -> usize {
        let before = self.results.len();

        if dedup_by_uid {
            let mut seen: HashSet<String> =
                self.results.iter().filter_map(|p| p.uid.clone()).collect();
            for post in page.results {
                match &post.uid {
                    Some(uid) if !seen.insert(uid.clone()) => {
                        tracing::debug!("Dropping duplicate post {}", uid);
                    }
                    _ => self.results.push(post),
                }
            }
        } else {
            self.results.extend(page.results);
        }

        self.next_page = page.next_page;
        self.results.len() - before
    }

    /// Whether another page can be requested
    pub fn has_next_page(&self) -> bool {
        self.next_page.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(uid: &str) -> Post {
        Post {
            id: None,
            uid: Some(uid.to_string()),
            first_publication_date: None,
            title: uid.to_uppercase(),
            subtitle: String::new(),
            author: "Danilo Vieira".to_string(),
        }
    }

    fn uids(posts: &PaginatedPosts) -> Vec<&str> {
        posts
            .results
            .iter()
            .map(|p| p.uid.as_deref().unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_append_keeps_order_and_duplicates() {
        let mut posts = PaginatedPosts {
            next_page: Some("p2".to_string()),
            results: vec![post("a"), post("b")],
        };
        let added = posts.append(
            PaginatedPosts {
                next_page: Some("p3".to_string()),
                results: vec![post("b"), post("c")],
            },
            false,
        );

        assert_eq!(added, 2);
        assert_eq!(uids(&posts), vec!["a", "b", "b", "c"]);
        assert_eq!(posts.next_page.as_deref(), Some("p3"));
    }

    #[test]
    fn test_append_with_dedup() {
        let mut posts = PaginatedPosts {
            next_page: Some("p2".to_string()),
            results: vec![post("a"), post("b")],
        };
        let mut anonymous = post("x");
        anonymous.uid = None;

        let added = posts.append(
            PaginatedPosts {
                next_page: None,
                results: vec![post("b"), anonymous.clone(), post("c"), anonymous],
            },
            true,
        );

        assert_eq!(added, 3);
        assert_eq!(uids(&posts), vec!["a", "b", "", "c", ""]);
        assert!(!posts.has_next_page());
    }

    #[test]
    fn test_post_path() {
        assert_eq!(post("my-post").path().as_deref(), Some("post/my-post/"));
        let mut draft = post("x");
        draft.uid = None;
        assert_eq!(draft.path(), None);
    }
}
