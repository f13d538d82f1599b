//! Post aggregation service
//!
//! Builds enriched views of posts (comments, authors) on top of the
//! session cache and fetcher, and keeps statistics about the last batch.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::config::Config;
use crate::data::endpoints;
use crate::data::{Comment, EnrichedPost, Post, SearchHit, User};
use crate::fetch::{FetchError, HttpTransport, ResilientFetcher, Transport, TransportError};

/// Number of posts scanned by a keyword search
pub const SEARCH_BATCH_SIZE: usize = 100;

/// Values kept in the session cache
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    /// Result of `posts_with_comments`
    Posts(Vec<EnrichedPost>),
    /// Result of `post_by_id`
    Post(EnrichedPost),
    /// A resolved author
    User(User),
}

/// Cache shared by every query of one session
pub type SessionCache = TtlCache<String, CachedValue>;

/// Statistics about the most recently aggregated batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    /// Posts in the batch
    pub total_items: usize,
    /// Comments across all posts in the batch
    pub total_sub_items: usize,
    /// `total_sub_items / total_items`, or 0 for an empty batch
    pub avg_sub_items_per_item: f64,
}

impl AggregateStats {
    /// Computes statistics for a complete batch from scratch
    pub fn from_batch(posts: &[EnrichedPost]) -> Self {
        let total_items = posts.len();
        let total_sub_items: usize = posts.iter().map(|p| p.comment_count).sum();
        let avg_sub_items_per_item = if total_items > 0 {
            total_sub_items as f64 / total_items as f64
        } else {
            0.0
        };

        Self {
            total_items,
            total_sub_items,
            avg_sub_items_per_item,
        }
    }
}

/// Answers post queries using one cache and one fetcher per session
pub struct PostService {
    transport: Arc<dyn Transport>,
    fetcher: Arc<ResilientFetcher>,
    cache: Arc<SessionCache>,
    statistics: Mutex<AggregateStats>,
}

impl PostService {
    /// Creates a service over an existing transport, fetcher and cache
    pub fn new(
        transport: Arc<dyn Transport>,
        fetcher: Arc<ResilientFetcher>,
        cache: Arc<SessionCache>,
    ) -> Self {
        Self {
            transport,
            fetcher,
            cache,
            statistics: Mutex::new(AggregateStats::default()),
        }
    }

    /// Builds a session over HTTP from configuration
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config.base_url.clone(), config.timeout())?;
        let fetcher = ResilientFetcher::new(config.retry_policy());
        let cache = SessionCache::from_seconds(config.ttl_seconds)
            .with_sweep_threshold(config.cache_sweep_threshold);

        Ok(Self::new(
            Arc::new(transport),
            Arc::new(fetcher),
            Arc::new(cache),
        ))
    }

    /// Session cache shared by every query
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn fetcher(&self) -> &ResilientFetcher {
        &self.fetcher
    }

    /// Statistics from the last fully aggregated batch
    pub fn statistics(&self) -> AggregateStats {
        *self.statistics.lock()
    }

    /// Lists up to `limit` posts without comments; never cached
    pub async fn fetch_posts(&self, limit: usize) -> Result<Vec<Post>, FetchError> {
        let mut posts: Vec<Post> = self
            .fetcher
            .fetch_from(self.transport.as_ref(), &endpoints::posts(limit))
            .await?;
        posts.truncate(limit);
        Ok(posts)
    }

    async fn fetch_comments(&self, post_id: u32) -> Result<Vec<Comment>, FetchError> {
        self.fetcher
            .fetch_from(self.transport.as_ref(), &endpoints::comments_for(post_id))
            .await
    }

    /// Returns up to `limit` posts, each with its comments
    ///
    /// A cached result is returned as-is without consulting the API. On a
    /// miss, one request fetches the posts and one more per post fetches its
    /// comments. Statistics are recomputed from the new batch and the batch is
    /// cached only after every request succeeded.
    pub async fn posts_with_comments(&self, limit: usize) -> Result<Vec<EnrichedPost>, FetchError> {
        let cache_key = format!("posts_with_comments_{}", limit);

        if let Some(CachedValue::Posts(posts)) = self.cache.get(&cache_key) {
            debug!(key = %cache_key, "cache hit");
            return Ok(posts);
        }

        let posts = self.fetch_posts(limit).await?;
        info!(posts = posts.len(), "fetched posts, loading comments");

        let mut enriched = Vec::with_capacity(posts.len());
        for post in posts {
            let comments = self.fetch_comments(post.id).await?;
            enriched.push(EnrichedPost::new(post, comments));
        }

        let stats = AggregateStats::from_batch(&enriched);
        *self.statistics.lock() = stats;
        info!(
            total_posts = stats.total_items,
            total_comments = stats.total_sub_items,
            "aggregated posts with comments"
        );

        self.cache.set(cache_key, CachedValue::Posts(enriched.clone()));
        Ok(enriched)
    }

    /// Returns one post with its comments and author, or `None` if it does not exist
    ///
    /// An author that cannot be found leaves `author` empty rather than
    /// failing the whole lookup.
    pub async fn post_by_id(&self, id: u32) -> Result<Option<EnrichedPost>, FetchError> {
        let cache_key = format!("post_{}", id);

        if let Some(CachedValue::Post(post)) = self.cache.get(&cache_key) {
            debug!(key = %cache_key, "cache hit");
            return Ok(Some(post));
        }

        let post: Post = match self
            .fetcher
            .fetch_from(self.transport.as_ref(), &endpoints::post(id))
            .await
        {
            Ok(post) => post,
            Err(e) if e.is_not_found() => {
                debug!(post_id = id, "post not found");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let comments = self.fetch_comments(id).await?;
        let mut enriched = EnrichedPost::new(post, comments);
        enriched.author = self.user_by_id(enriched.post.user_id).await?;

        self.cache.set(cache_key, CachedValue::Post(enriched.clone()));
        Ok(Some(enriched))
    }

    /// Resolves a user by scanning the full user collection
    ///
    /// Found users are cached per id; a missing user is not cached.
    async fn user_by_id(&self, user_id: u32) -> Result<Option<User>, FetchError> {
        let cache_key = format!("user_{}", user_id);

        if let Some(CachedValue::User(user)) = self.cache.get(&cache_key) {
            return Ok(Some(user));
        }

        let users: Vec<User> = match self
            .fetcher
            .fetch_from(self.transport.as_ref(), &endpoints::users())
            .await
        {
            Ok(users) => users,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        match users.into_iter().find(|u| u.id == user_id) {
            Some(user) => {
                self.cache.set(cache_key, CachedValue::User(user.clone()));
                Ok(Some(user))
            }
            None => {
                debug!(user_id, "author not found");
                Ok(None)
            }
        }
    }

    /// Case-insensitive keyword search over titles and bodies
    ///
    /// Always fetches a fresh batch of [`SEARCH_BATCH_SIZE`] posts.
    pub async fn search_posts(&self, keyword: &str) -> Result<Vec<SearchHit>, FetchError> {
        let posts = self.fetch_posts(SEARCH_BATCH_SIZE).await?;
        let needle = keyword.to_lowercase();

        let hits: Vec<SearchHit> = posts
            .into_iter()
            .filter_map(|post| {
                let match_in_title = post.title.to_lowercase().contains(&needle);
                let match_in_body = post.body.to_lowercase().contains(&needle);
                (match_in_title || match_in_body).then_some(SearchHit {
                    post,
                    match_in_title,
                    match_in_body,
                })
            })
            .collect();

        debug!(keyword, hits = hits.len(), "searched posts");
        Ok(hits)
    }
}
