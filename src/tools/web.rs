//! Web search over the DuckDuckGo HTML endpoint.

use async_trait::async_trait;

use super::{SearchHit, SearchTool};
use crate::error::ServiceError;

const DDG_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Search the web via DuckDuckGo HTML (no API key needed).
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: String,
    max_results: usize,
}

impl DuckDuckGoSearch {
    pub fn new(max_results: usize) -> Result<Self, ServiceError> {
        Self::with_endpoint(DDG_HTML_ENDPOINT.to_string(), max_results)
    }

    pub fn with_endpoint(endpoint: String, max_results: usize) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; Coursewright/0.3)")
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            max_results,
        })
    }
}

#[async_trait]
impl SearchTool for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ServiceError> {
        let url = format!("{}?q={}", self.endpoint, urlencoding::encode(query));

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status { status, body });
        }

        let html = response.text().await?;
        let hits = extract_ddg_results(&html, self.max_results);
        tracing::debug!(query = %query, hits = hits.len(), "Web search finished");
        Ok(hits)
    }
}

/// Extract search results from DuckDuckGo HTML.
fn extract_ddg_results(html: &str, limit: usize) -> Vec<SearchHit> {
    let mut results = Vec::new();

    for chunk in html.split("class=\"result__body\"").skip(1) {
        if results.len() >= limit {
            break;
        }

        let title = element_text(chunk, "class=\"result__a\"").unwrap_or_default();
        let snippet = element_text(chunk, "class=\"result__snippet\"").unwrap_or_default();
        let url = element_text(chunk, "class=\"result__url\"")
            .map(|s| normalize_url(&s))
            .unwrap_or_default();

        if !title.is_empty() {
            results.push(SearchHit {
                title: html_decode(&title),
                snippet: html_decode(&snippet),
                url,
            });
        }
    }

    results
}

/// Text content of the element opened at `marker`, up to its closing tag.
///
/// Inline markup (DuckDuckGo bolds query terms) is dropped and whitespace
/// collapsed.
fn element_text(chunk: &str, marker: &str) -> Option<String> {
    let after = chunk.split(marker).nth(1)?;
    let (_, body) = after.split_once('>')?;
    let end = body
        .find("</a>")
        .or_else(|| body.find("</div>"))
        .unwrap_or(body.len());
    Some(
        strip_tags(&body[..end])
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}

/// DuckDuckGo shows bare hosts/paths; give them a scheme when they parse as one.
fn normalize_url(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    if url::Url::parse(raw).is_ok() {
        return raw.to_string();
    }
    let candidate = format!("https://{}", raw);
    match url::Url::parse(&candidate) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Basic HTML entity decoding.
fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
}
