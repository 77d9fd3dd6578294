use async_trait::async_trait;

use crate::article::{Article, Company, Topic};

/// Remote fetch collaborator: finds candidate articles for a topic,
/// either across the industry or scoped to one company's blog.
///
/// Implementations are injected into the controller at construction and
/// must never let a failure cross this boundary: a slow, failed or empty
/// fetch manifests to the core only as an empty list. The core applies
/// no retry or backoff of its own.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn global_news(&self, topic: Topic) -> Vec<Article>;

    async fn company_blogs(&self, company: &Company, topic: Topic) -> Vec<Article>;
}
