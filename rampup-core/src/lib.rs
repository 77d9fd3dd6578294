pub mod article;
pub mod config;
pub mod error;
pub mod gemini;
pub mod projection;
pub mod source;
pub mod state;
pub mod store;

pub use article::{article_id, default_companies, AppState, Article, Company, NewsCache, Topic};
pub use config::AppConfig;
pub use error::{RefreshError, SourceError, StoreError};
pub use gemini::GeminiNewsSource;
pub use projection::{group_by_topic, project, with_status};
pub use source::NewsSource;
pub use state::{AppController, Navigation};
pub use store::{LoadSource, LoadedState, StateStore};
