//! Forum catalog: the one collaborator the presence hub consumes.
//!
//! The hub only needs to know how many forums exist so the registry can
//! pre-size its forum map (`1..=count`).

use async_trait::async_trait;

use forumhub_core::error::Result;

#[async_trait]
pub trait ForumCatalog: Send + Sync {
    async fn forum_count(&self) -> Result<u32>;
}

/// Catalog backed by `forums.count` from the gateway config.
#[derive(Debug, Clone, Copy)]
pub struct StaticForumCatalog {
    count: u32,
}

impl StaticForumCatalog {
    pub fn new(count: u32) -> Self {
        Self { count }
    }
}

#[async_trait]
impl ForumCatalog for StaticForumCatalog {
    async fn forum_count(&self) -> Result<u32> {
        Ok(self.count)
    }
}
