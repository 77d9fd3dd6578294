//! Application state controller: owns the unified in-memory state,
//! mediates every mutation and persists after each one.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::article::{default_companies, AppState, Article, Company, NewsCache, Topic};
use crate::error::{RefreshError, StoreError};
use crate::projection;
use crate::source::NewsSource;
use crate::store::{LoadSource, StateStore};

/// Partition key for the global news cache; company partitions use the
/// company id.
const GLOBAL_PARTITION: &str = "global";

/// Navigation intent emitted by a mutation for the presentation layer.
/// The controller never consumes navigation state itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Home,
    Company(String),
}

pub struct AppController {
    state: RwLock<AppState>,
    store: StateStore,
    source: Arc<dyn NewsSource>,
    topics: Vec<Topic>,
    in_flight: Mutex<HashSet<String>>,
    last_company_id: AtomicI64,
    load_source: LoadSource,
}

impl AppController {
    /// Loads persisted state through the store's tiered protocol and
    /// wires the injected fetch collaborator.
    pub async fn load(store: StateStore, source: Arc<dyn NewsSource>) -> Self {
        let loaded = store.load().await;
        info!(source = ?loaded.source, "application state loaded");
        // Seed the id clock past any persisted company id so a restart
        // never re-issues one.
        let max_seen = loaded
            .state
            .companies
            .iter()
            .filter_map(|company| company.id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        Self {
            state: RwLock::new(loaded.state),
            store,
            source,
            topics: Topic::ALL.to_vec(),
            in_flight: Mutex::new(HashSet::new()),
            last_company_id: AtomicI64::new(max_seen),
            load_source: loaded.source,
        }
    }

    /// Which load tier supplied the initial state.
    pub fn load_source(&self) -> LoadSource {
        self.load_source
    }

    pub async fn snapshot(&self) -> AppState {
        self.state.read().await.clone()
    }

    pub async fn companies(&self) -> Vec<Company> {
        self.state.read().await.companies.clone()
    }

    pub async fn company(&self, company_id: &str) -> Option<Company> {
        self.state
            .read()
            .await
            .companies
            .iter()
            .find(|company| company.id == company_id)
            .cloned()
    }

    /// Global view: cached articles with read/saved status projected on.
    pub async fn global_articles(&self) -> Vec<Article> {
        let state = self.state.read().await;
        projection::project(
            &state.global_news.articles,
            &state.read_articles,
            &state.saved_articles,
        )
    }

    /// Company view; empty when the company has no cache entry.
    pub async fn company_articles(&self, company_id: &str) -> Vec<Article> {
        let state = self.state.read().await;
        match state.company_news.get(company_id) {
            Some(cache) => {
                projection::project(&cache.articles, &state.read_articles, &state.saved_articles)
            }
            None => Vec::new(),
        }
    }

    /// Saved view: the stored snapshots, re-projected against the live
    /// read set. Saved stays true by construction.
    pub async fn saved_articles(&self) -> Vec<Article> {
        let state = self.state.read().await;
        projection::project(
            &state.saved_articles,
            &state.read_articles,
            &state.saved_articles,
        )
    }

    /// Looks an article up by id across the global cache, every company
    /// cache and the saved snapshots, with status projected on.
    pub async fn find_article(&self, article_id: &str) -> Option<Article> {
        let state = self.state.read().await;
        state
            .global_news
            .articles
            .iter()
            .chain(state.company_news.values().flat_map(|cache| cache.articles.iter()))
            .chain(state.saved_articles.iter())
            .find(|article| article.id == article_id)
            .map(|article| projection::with_status(article, &state.read_articles, &state.saved_articles))
    }

    /// Flips membership of the id in the read set. Two toggles cancel
    /// out.
    pub async fn toggle_read(&self, article_id: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        match state.read_articles.iter().position(|id| id == article_id) {
            Some(index) => {
                state.read_articles.remove(index);
            }
            None => state.read_articles.push(article_id.to_owned()),
        }
        self.store.persist(&state).await
    }

    /// Removes the article's saved snapshot if one exists, else prepends
    /// a snapshot with the saved flag forced true. Saving captures the
    /// article as it is now; later changes to the live article do not
    /// propagate into the snapshot.
    pub async fn toggle_save(&self, article: &Article) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        match state
            .saved_articles
            .iter()
            .position(|saved| saved.id == article.id)
        {
            Some(index) => {
                state.saved_articles.remove(index);
            }
            None => {
                let mut snapshot = article.clone();
                snapshot.is_saved = true;
                state.saved_articles.insert(0, snapshot);
            }
        }
        self.store.persist(&state).await
    }

    /// Appends a company under a fresh identifier and signals navigation
    /// to its view, which is what triggers the first fetch.
    pub async fn add_company(&self, name: &str, blog_url: &str) -> Result<Navigation, StoreError> {
        let id = self.next_company_id();
        let mut state = self.state.write().await;
        state.companies.push(Company {
            id: id.clone(),
            name: name.to_owned(),
            blog_url: blog_url.to_owned(),
        });
        self.store.persist(&state).await?;
        Ok(Navigation::Company(id))
    }

    /// Removes the company and evicts its cache entry so no orphaned
    /// news survives. Emits a home intent for the case where the removed
    /// company's view was active.
    pub async fn remove_company(&self, company_id: &str) -> Result<Navigation, StoreError> {
        let mut state = self.state.write().await;
        state.companies.retain(|company| company.id != company_id);
        state.company_news.remove(company_id);
        self.store.persist(&state).await?;
        Ok(Navigation::Home)
    }

    /// Restores the built-in company list and clears all company caches.
    /// Global news and the read/saved sets are untouched. Confirmation
    /// is the presentation layer's job.
    pub async fn reset_to_defaults(&self) -> Result<Navigation, StoreError> {
        let mut state = self.state.write().await;
        state.companies = default_companies();
        state.company_news.clear();
        self.store.persist(&state).await?;
        Ok(Navigation::Home)
    }

    /// Fetches every configured topic concurrently and replaces the
    /// global cache with the concatenation, stamped now. The timestamp
    /// advances even when every topic came back empty: an attempt counts
    /// as freshness. A refresh already in flight for this partition
    /// rejects the call.
    pub async fn refresh_global_news(&self) -> Result<usize, RefreshError> {
        let _guard = self.begin_refresh(GLOBAL_PARTITION)?;
        let fetches = self
            .topics
            .iter()
            .map(|topic| self.source.global_news(*topic));
        let articles: Vec<Article> = join_all(fetches).await.into_iter().flatten().collect();
        let count = articles.len();

        let mut state = self.state.write().await;
        state.global_news = NewsCache {
            articles,
            last_updated: Utc::now().timestamp_millis(),
        };
        self.store.persist(&state).await?;
        Ok(count)
    }

    /// Same pattern as [`refresh_global_news`], scoped to one company's
    /// cache entry.
    ///
    /// [`refresh_global_news`]: AppController::refresh_global_news
    pub async fn refresh_company_news(&self, company_id: &str) -> Result<usize, RefreshError> {
        let company = self
            .company(company_id)
            .await
            .ok_or_else(|| RefreshError::UnknownCompany(company_id.to_owned()))?;
        let _guard = self.begin_refresh(&company.id)?;
        let fetches = self
            .topics
            .iter()
            .map(|topic| self.source.company_blogs(&company, *topic));
        let articles: Vec<Article> = join_all(fetches).await.into_iter().flatten().collect();
        let count = articles.len();

        let mut state = self.state.write().await;
        if !state.companies.iter().any(|c| c.id == company.id) {
            // Removed while the fetch was in flight; keep the
            // no-orphaned-cache invariant and drop the result.
            debug!(company = %company.id, "discarding refresh for removed company");
            return Ok(0);
        }
        state.company_news.insert(
            company.id.clone(),
            NewsCache {
                articles,
                last_updated: Utc::now().timestamp_millis(),
            },
        );
        self.store.persist(&state).await?;
        Ok(count)
    }

    /// The view-mount auto-trigger: refreshes exactly once when the
    /// partition has never been fetched and no refresh is in flight.
    /// Returns whether a refresh ran.
    pub async fn refresh_global_if_empty(&self) -> Result<bool, RefreshError> {
        {
            let state = self.state.read().await;
            if !state.global_news.is_empty() {
                return Ok(false);
            }
        }
        match self.refresh_global_news().await {
            Ok(_) => Ok(true),
            Err(RefreshError::AlreadyRunning) => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub async fn refresh_company_if_empty(&self, company_id: &str) -> Result<bool, RefreshError> {
        {
            let state = self.state.read().await;
            let empty = state
                .company_news
                .get(company_id)
                .map(NewsCache::is_empty)
                .unwrap_or(true);
            if !empty {
                return Ok(false);
            }
        }
        match self.refresh_company_news(company_id).await {
            Ok(_) => Ok(true),
            Err(RefreshError::AlreadyRunning) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn begin_refresh(&self, partition: &str) -> Result<RefreshGuard<'_>, RefreshError> {
        let mut in_flight = self.in_flight.lock().expect("in-flight set poisoned");
        if !in_flight.insert(partition.to_owned()) {
            return Err(RefreshError::AlreadyRunning);
        }
        Ok(RefreshGuard {
            set: &self.in_flight,
            partition: partition.to_owned(),
        })
    }

    /// Fresh opaque company id from a monotonically increasing timestamp
    /// source; never reused, even for ids issued within the same
    /// millisecond.
    fn next_company_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_company_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| {
                Some(last.max(now - 1) + 1)
            })
            .expect("fetch_update closure always returns Some");
        (previous.max(now - 1) + 1).to_string()
    }
}

struct RefreshGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    partition: String,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.partition);
        }
    }
}
