//! Request builders for the posts REST API and the echo service
//!
//! Paths and query parameters follow the JSONPlaceholder conventions
//! (`_limit` for page size, `postId` for comment filtering). The echo
//! builders follow httpbin (`/{method}`, `/delay/{n}`).

use reqwest::Method;
use serde_json::Value;

use crate::fetch::TransportRequest;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// Default echo service root
pub const DEFAULT_DIAGNOSTICS_URL: &str = "https://httpbin.org";

/// Lists up to `limit` posts
pub fn posts(limit: usize) -> TransportRequest {
    TransportRequest::get("/posts").param("_limit", limit)
}

/// A single post by id
pub fn post(id: u32) -> TransportRequest {
    TransportRequest::get(format!("/posts/{}", id))
}

/// All comments attached to a post
pub fn comments_for(post_id: u32) -> TransportRequest {
    TransportRequest::get("/comments").param("postId", post_id)
}

/// The full user collection
pub fn users() -> TransportRequest {
    TransportRequest::get("/users")
}

/// Echo request for `method`; POST, PUT and PATCH carry `data` as JSON
pub fn echo(method: Method, data: &Value) -> TransportRequest {
    let path = format!("/{}", method.as_str().to_lowercase());
    let carries_body = method == Method::POST || method == Method::PUT || method == Method::PATCH;
    let request = TransportRequest::new(method, path);
    if carries_body {
        request.json(data.clone())
    } else {
        request
    }
}

/// Delayed response after `seconds`
pub fn delay(seconds: u64) -> TransportRequest {
    TransportRequest::get(format!("/delay/{}", seconds))
}
