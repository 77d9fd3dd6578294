//! LLM-backed search-and-extract adapter for the fetch collaborator.
//!
//! Talks to the Generative Language API with search grounding and a JSON
//! response schema. Untrusted output: the model returns candidate
//! articles as a JSON array in the first candidate's text part, and every
//! failure on this path degrades to an empty list at the trait boundary.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::article::{article_id, Article, Company, Topic};
use crate::error::SourceError;
use crate::source::NewsSource;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

const COMPANY_SYSTEM_INSTRUCTION: &str = "You are a specialized data retrieval agent. Your primary directive is 100% URL ACCURACY via search grounding. You extract the exact absolute links from search results metadata. You are strictly forbidden from guessing, inventing, or reconstructing URLs. You must look at the 'uri' property and copy it verbatim. Accuracy is non-negotiable.";

const GLOBAL_SYSTEM_INSTRUCTION: &str = "You are an expert news librarian. You prioritize link integrity above all else. You extract the full, raw absolute URL for every source from the search grounding verbatim. You never shorten, summarize, or hallucinate a link path.";

pub struct GeminiNewsSource {
    http: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiNewsSource {
    pub fn new(http: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
        }
    }

    /// Points the adapter at a different API base. Tests use this to
    /// target a local mock server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn generate(
        &self,
        system_instruction: &str,
        prompt: &str,
        schema: Value,
    ) -> Result<Vec<Candidate>, SourceError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        );
        let body = json!({
            "systemInstruction": { "parts": [{ "text": system_instruction }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "tools": [{ "googleSearch": {} }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Api(status));
        }

        let payload: GenerateResponse = response.json().await?;
        let text = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or(SourceError::EmptyResponse)?;
        let candidates: Vec<Candidate> = serde_json::from_str(text.trim())?;
        Ok(candidates)
    }
}

#[async_trait]
impl NewsSource for GeminiNewsSource {
    async fn global_news(&self, topic: Topic) -> Vec<Article> {
        let prompt = format!(
            "SEARCH TASK: Find high-authority global industry news for \"{topic}\".\n\n\
             MANDATORY RULE:\n\
             - Copy the ACTUAL source link from your search grounding results.\n\
             - Do not reconstruct or guess links from the title.\n\
             - Absolute, verbatim character-perfect copy of the URL is required.\n\n\
             Return 4 results in JSON."
        );
        match self
            .generate(GLOBAL_SYSTEM_INSTRUCTION, &prompt, global_schema())
            .await
        {
            Ok(candidates) => candidates
                .into_iter()
                .map(|candidate| candidate.into_article(topic, None))
                .collect(),
            Err(err) => {
                warn!(%topic, error = %err, "failed to fetch global industry news");
                Vec::new()
            }
        }
    }

    async fn company_blogs(&self, company: &Company, topic: Topic) -> Vec<Article> {
        let prompt = format!(
            "SEARCH AND EXTRACT MISSION (Vertex-Grounded Accuracy):\n\
             Find the most recent blog posts from the official {name} website ({url}) about \"{topic}\".\n\n\
             STRICT URL INTEGRITY PROTOCOL:\n\
             1. You MUST use the Google Search tool to find actual results.\n\
             2. For the 'url' field in the JSON response, YOU MUST ONLY USE THE RAW, ABSOLUTE 'uri' AS IT APPEARS IN THE SEARCH GROUNDING METADATA.\n\
             3. NEVER construct a URL by guessing the slug based on the title.\n\
             4. NEVER simplify a URL (e.g., if it has a date like /2024/05/ or a complex report suffix like -2025-report/, YOU MUST INCLUDE IT).\n\
             5. EVERY character in the URL must match the source search result exactly. NO HALLUCINATION.\n\
             6. If you cannot find a direct link in the metadata, do not include the article.\n\n\
             Return up to 5 results in valid JSON format.",
            name = company.name,
            url = company.blog_url,
        );
        match self
            .generate(COMPANY_SYSTEM_INSTRUCTION, &prompt, company_schema())
            .await
        {
            Ok(candidates) => candidates
                .into_iter()
                .map(|candidate| candidate.into_article(topic, Some(company.name.clone())))
                .collect(),
            Err(err) => {
                warn!(company = %company.name, %topic, error = %err, "failed to fetch company blogs");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

/// One candidate article as the model returns it, before it is trusted
/// with an identifier or a topic.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    title: String,
    url: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    summary: Vec<String>,
    #[serde(default)]
    published_date: Option<String>,
}

impl Candidate {
    fn into_article(self, topic: Topic, source_override: Option<String>) -> Article {
        let source = source_override
            .or(self.source)
            .unwrap_or_else(|| "Web".to_owned());
        Article {
            id: article_id(&self.url),
            title: self.title,
            url: self.url,
            source,
            published_date: self.published_date,
            summary: self.summary,
            topic,
            is_read: false,
            is_saved: false,
        }
    }
}

fn global_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "url": { "type": "STRING", "description": "Verbatim absolute URL from search results metadata." },
                "source": { "type": "STRING" },
                "summary": { "type": "ARRAY", "items": { "type": "STRING" } }
            },
            "required": ["title", "url", "source", "summary"]
        }
    })
}

fn company_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING", "description": "Verbatim title." },
                "url": { "type": "STRING", "description": "The EXACT, RAW absolute URL from the grounding metadata." },
                "summary": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "3-5 takeaways."
                },
                "publishedDate": { "type": "STRING", "description": "Publication date." }
            },
            "required": ["title", "url", "summary"]
        }
    })
}
