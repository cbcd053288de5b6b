use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::types::WebResult;
use super::GatewayError;

pub const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// Optional external search. Stateless: one query string in, a short ordered
/// list of hits out.
#[async_trait]
pub trait EvidenceGateway: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, GatewayError>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

// ═══════════════════════════════════════════════════════════
// Tavily
// ═══════════════════════════════════════════════════════════

/// Tavily search API client (advanced depth).
pub struct TavilyGateway {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
}

#[derive(serde::Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<WebResult>,
}

impl TavilyGateway {
    /// `request_timeout` caps the HTTP exchange itself; callers usually wrap
    /// the call in a shorter timeout of their own.
    pub fn new(api_key: impl Into<String>, request_timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: TAVILY_ENDPOINT.to_string(),
        })
    }

    #[cfg(test)]
    fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl EvidenceGateway for TavilyGateway {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, GatewayError> {
        let body = TavilyRequest {
            api_key: &self.api_key,
            query,
            search_depth: "advanced",
            max_results,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout
                } else if e.is_connect() {
                    GatewayError::Connection(self.endpoint.clone())
                } else {
                    GatewayError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::ResponseParsing(e.to_string()))?;
        let mut results = parse_response(&text)?;
        results.truncate(max_results);
        Ok(results)
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

fn parse_response(body: &str) -> Result<Vec<WebResult>, GatewayError> {
    let parsed: TavilyResponse =
        serde_json::from_str(body).map_err(|e| GatewayError::ResponseParsing(e.to_string()))?;
    Ok(parsed.results)
}

// ═══════════════════════════════════════════════════════════
// Mock gateway for tests
// ═══════════════════════════════════════════════════════════

/// Scripted gateway: fixed results, optional failure, optional delay.
pub struct MockGateway {
    results: Vec<WebResult>,
    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_query: Mutex<Option<String>>,
}

impl MockGateway {
    pub fn with_results(results: Vec<WebResult>) -> Self {
        Self {
            results,
            fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_results(vec![])
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<String> {
        self.last_query.lock().ok().and_then(|q| q.clone())
    }
}

#[async_trait]
impl EvidenceGateway for MockGateway {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_query.lock() {
            *last = Some(query.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(GatewayError::Connection("mock gateway offline".into()));
        }
        Ok(self.results.iter().take(max_results).cloned().collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tavily_results() {
        let body = r#"{
            "query": "ckd diet",
            "results": [
                {"title": "CKD diet basics", "url": "https://example.org/ckd", "content": "Limit sodium.", "score": 0.91},
                {"url": "https://example.org/bare"}
            ]
        }"#;
        let results = parse_response(body).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "CKD diet basics");
        assert_eq!(results[1].content, "");
    }

    #[test]
    fn missing_results_field_is_empty() {
        assert!(parse_response(r#"{"query": "x"}"#).unwrap().is_empty());
    }

    #[test]
    fn malformed_body_is_parse_error() {
        assert!(matches!(
            parse_response("<html>"),
            Err(GatewayError::ResponseParsing(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let gateway = TavilyGateway::new("key", Duration::from_secs(2))
            .unwrap()
            .with_endpoint("http://127.0.0.1:1/search");
        assert!(gateway.search("kidney", 3).await.is_err());
    }

    #[tokio::test]
    async fn mock_records_queries_and_caps_results() {
        let hit = WebResult {
            title: "t".into(),
            url: "https://example.org".into(),
            content: "c".into(),
        };
        let gateway = MockGateway::with_results(vec![hit.clone(), hit.clone(), hit]);
        let results = gateway.search("dialysis", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(gateway.call_count(), 1);
        assert_eq!(gateway.last_query().as_deref(), Some("dialysis"));
    }
}
