use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed set of topics every fetch is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "Security")]
    Security,
    #[serde(rename = "Enterprise AI")]
    EnterpriseAi,
    #[serde(rename = "Identity and Access Management")]
    Iam,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Security, Topic::EnterpriseAi, Topic::Iam];

    pub fn label(&self) -> &'static str {
        match self {
            Topic::Security => "Security",
            Topic::EnterpriseAi => "Enterprise AI",
            Topic::Iam => "Identity and Access Management",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub summary: Vec<String>,
    pub topic: Topic,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_saved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    pub blog_url: String,
}

/// Articles for one partition plus the freshness marker.
/// `last_updated` is epoch milliseconds; 0 means never fetched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsCache {
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub last_updated: i64,
}

impl NewsCache {
    /// True while the partition has never seen a fetch attempt.
    pub fn is_empty(&self) -> bool {
        self.last_updated == 0 && self.articles.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub companies: Vec<Company>,
    pub read_articles: Vec<String>,
    pub saved_articles: Vec<Article>,
    pub global_news: NewsCache,
    pub company_news: HashMap<String, NewsCache>,
}

impl AppState {
    /// Hardcoded default state: built-in company list, nothing read,
    /// nothing saved, no caches.
    pub fn initial() -> Self {
        Self {
            companies: default_companies(),
            read_articles: Vec::new(),
            saved_articles: Vec::new(),
            global_news: NewsCache::default(),
            company_news: HashMap::new(),
        }
    }
}

pub fn default_companies() -> Vec<Company> {
    [
        ("1", "Okta", "https://www.okta.com/blog"),
        ("2", "Microsoft", "https://www.microsoft.com/en-us/security/blog"),
        ("3", "Google Cloud", "https://cloud.google.com/blog"),
        ("4", "CrowdStrike", "https://www.crowdstrike.com/blog"),
        ("5", "OpenAI", "https://openai.com/news"),
    ]
    .into_iter()
    .map(|(id, name, blog_url)| Company {
        id: id.to_owned(),
        name: name.to_owned(),
        blog_url: blog_url.to_owned(),
    })
    .collect()
}

/// Derives a stable identifier for an article from its URL.
///
/// Read and saved marks are recorded by identifier, so the same URL must
/// produce the same identifier across fetches and across sessions. The
/// hash is a 32-bit rolling hash over the UTF-16 code units of the URL,
/// rendered in base 36 with the sign discarded. An unusable (empty) URL
/// falls back to a random token: no determinism, but never an empty id.
pub fn article_id(url: &str) -> String {
    if url.is_empty() {
        return random_token();
    }
    let mut hash: i32 = 0;
    for unit in url.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    to_base36(u64::from(hash.unsigned_abs()))
}

fn random_token() -> String {
    let token = uuid::Uuid::new_v4().simple().to_string();
    token[..8].to_owned()
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_owned();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ascii")
}
