//! Core data models for Postscope
//!
//! Remote payloads are decoded into these typed records, so a response with
//! the wrong shape fails to parse instead of surfacing later as a missing key.

pub mod endpoints;

use serde::{Deserialize, Serialize};

/// A post as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Id of the user who wrote the post
    pub user_id: u32,
    /// Unique identifier for the post
    pub id: u32,
    pub title: String,
    pub body: String,
}

/// A comment attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Post this comment belongs to
    pub post_id: u32,
    pub id: u32,
    /// Comment headline
    pub name: String,
    /// Commenter's email address
    pub email: String,
    pub body: String,
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    /// Full name
    pub name: String,
    /// Login handle
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// A post together with its comments and, when resolved, its author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedPost {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
    pub comment_count: usize,
    /// Author looked up by `post.user_id`; `None` when no such user exists
    pub author: Option<User>,
}

impl EnrichedPost {
    /// Creates an enriched post without an author
    pub fn new(post: Post, comments: Vec<Comment>) -> Self {
        Self {
            comment_count: comments.len(),
            post,
            comments,
            author: None,
        }
    }
}

/// A post matching a search keyword, tagged with where it matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub post: Post,
    pub match_in_title: bool,
    pub match_in_body: bool,
}
