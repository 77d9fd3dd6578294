//! Partitioned persistence for the unified application state.
//!
//! Durable storage is split into two independently written records so a
//! quota or disk failure on the large, reconstructible news cache can
//! never take the user's company list and read history down with it. A
//! third, legacy combined record is kept as a read-only migration source.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::article::{default_companies, AppState, Article, Company, NewsCache};
use crate::error::StoreError;

pub const SETTINGS_FILE: &str = "settings.json";
pub const CACHE_FILE: &str = "cache.json";
/// Pre-split combined record. Never written, only migrated from.
pub const LEGACY_FILE: &str = "state.json";

/// Which tier of the load protocol supplied the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Split settings/cache records.
    Split,
    /// Legacy single-record format.
    Legacy,
    /// Hardcoded defaults (no records, or a record failed to parse).
    Defaults,
}

#[derive(Debug, Clone)]
pub struct LoadedState {
    pub state: AppState,
    pub source: LoadSource,
}

// Durable record shapes. Fields are optional so that a record written by
// an older build substitutes defaults per missing field instead of
// failing the whole parse.

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsRecord {
    companies: Option<Vec<Company>>,
    read_articles: Option<Vec<String>>,
    saved_articles: Option<Vec<Article>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheRecord {
    global_news: Option<NewsCache>,
    company_news: Option<std::collections::HashMap<String, NewsCache>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRecord {
    companies: Option<Vec<Company>>,
    read_articles: Option<Vec<String>>,
    saved_articles: Option<Vec<Article>>,
    global_news: Option<NewsCache>,
    company_news: Option<std::collections::HashMap<String, NewsCache>>,
}

enum RecordRead<T> {
    Missing,
    Corrupt,
    Parsed(T),
}

#[derive(Debug, Clone)]
pub struct StateStore {
    settings_path: PathBuf,
    cache_path: PathBuf,
    legacy_path: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            settings_path: dir.join(SETTINGS_FILE),
            cache_path: dir.join(CACHE_FILE),
            legacy_path: dir.join(LEGACY_FILE),
        }
    }

    /// Loads state following the tiered protocol: split records, then the
    /// legacy record, then hardcoded defaults. A parse failure at any
    /// tier is logged and drops straight to defaults. The returned tag
    /// records which tier won, which makes the one-time migration
    /// observable and testable.
    pub async fn load(&self) -> LoadedState {
        match read_record::<SettingsRecord>(&self.settings_path).await {
            RecordRead::Parsed(settings) => {
                let cache = match read_record::<CacheRecord>(&self.cache_path).await {
                    RecordRead::Parsed(cache) => cache,
                    RecordRead::Missing => CacheRecord::default(),
                    RecordRead::Corrupt => {
                        return LoadedState {
                            state: AppState::initial(),
                            source: LoadSource::Defaults,
                        }
                    }
                };
                LoadedState {
                    state: compose(
                        settings.companies,
                        settings.read_articles,
                        settings.saved_articles,
                        cache.global_news,
                        cache.company_news,
                    ),
                    source: LoadSource::Split,
                }
            }
            RecordRead::Missing => match read_record::<LegacyRecord>(&self.legacy_path).await {
                RecordRead::Parsed(legacy) => {
                    debug!("migrating state from legacy combined record");
                    LoadedState {
                        state: compose(
                            legacy.companies,
                            legacy.read_articles,
                            legacy.saved_articles,
                            legacy.global_news,
                            legacy.company_news,
                        ),
                        source: LoadSource::Legacy,
                    }
                }
                _ => LoadedState {
                    state: AppState::initial(),
                    source: LoadSource::Defaults,
                },
            },
            RecordRead::Corrupt => LoadedState {
                state: AppState::initial(),
                source: LoadSource::Defaults,
            },
        }
    }

    /// Writes the settings partition: companies, read ids, saved
    /// snapshots. Failure here threatens irreplaceable user data, so the
    /// error propagates for the presentation layer to surface.
    pub async fn save_settings(&self, state: &AppState) -> Result<(), StoreError> {
        let record = SettingsRecord {
            companies: Some(state.companies.clone()),
            read_articles: Some(state.read_articles.clone()),
            saved_articles: Some(state.saved_articles.clone()),
        };
        write_atomic(&self.settings_path, &record).await
    }

    /// Writes the cache partition: fetched news only. Callers treat a
    /// failure as loggable, not user-visible, since the cache can be
    /// re-fetched.
    pub async fn save_cache(&self, state: &AppState) -> Result<(), StoreError> {
        let record = CacheRecord {
            global_news: Some(state.global_news.clone()),
            company_news: Some(state.company_news.clone()),
        };
        write_atomic(&self.cache_path, &record).await
    }

    /// Persists both partitions through their independent write paths.
    /// The cache write is attempted even when the settings write failed;
    /// only the settings outcome is returned.
    pub async fn persist(&self, state: &AppState) -> Result<(), StoreError> {
        let settings = self.save_settings(state).await;
        if let Err(err) = self.save_cache(state).await {
            warn!(%err, "failed to persist news cache");
        }
        settings
    }
}

fn compose(
    companies: Option<Vec<Company>>,
    read_articles: Option<Vec<String>>,
    saved_articles: Option<Vec<Article>>,
    global_news: Option<NewsCache>,
    company_news: Option<std::collections::HashMap<String, NewsCache>>,
) -> AppState {
    AppState {
        companies: companies.unwrap_or_else(default_companies),
        read_articles: read_articles.unwrap_or_default(),
        saved_articles: saved_articles.unwrap_or_default(),
        global_news: global_news.unwrap_or_default(),
        company_news: company_news.unwrap_or_default(),
    }
}

async fn read_record<T: DeserializeOwned>(path: &Path) -> RecordRead<T> {
    match tokio::fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<T>(&bytes) {
            Ok(record) => RecordRead::Parsed(record),
            Err(err) => {
                warn!(error = %err, path = %path.display(), "failed to parse stored record");
                RecordRead::Corrupt
            }
        },
        Err(_) => RecordRead::Missing,
    }
}

async fn write_atomic<T: Serialize>(path: &Path, record: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(record)?;
    if let Some(parent) = path.parent() {
        let _ = tokio::fs::create_dir_all(parent).await;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
