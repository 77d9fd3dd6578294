//! Status projection: read/saved flags are derived from the user's
//! identifier sets at display time, never stored on cached articles.

use crate::article::{Article, Topic};

/// Projects read/saved status onto a raw article list.
///
/// Read flag = membership of the id in `read_ids`; saved flag = existence
/// of a snapshot with the same id in `saved`. Pure; callers re-run it
/// whenever the cache, read set or saved set changes.
pub fn project(articles: &[Article], read_ids: &[String], saved: &[Article]) -> Vec<Article> {
    articles
        .iter()
        .map(|article| with_status(article, read_ids, saved))
        .collect()
}

pub fn with_status(article: &Article, read_ids: &[String], saved: &[Article]) -> Article {
    let mut out = article.clone();
    out.is_read = read_ids.iter().any(|id| *id == article.id);
    out.is_saved = saved.iter().any(|snapshot| snapshot.id == article.id);
    out
}

/// Buckets articles by topic, in the fixed topic order. Views render one
/// section per topic, including empty ones.
pub fn group_by_topic(articles: &[Article]) -> Vec<(Topic, Vec<Article>)> {
    Topic::ALL
        .iter()
        .map(|topic| {
            let bucket = articles
                .iter()
                .filter(|article| article.topic == *topic)
                .cloned()
                .collect();
            (*topic, bucket)
        })
        .collect()
}
