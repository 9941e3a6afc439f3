// Nixora — Web search tool (Tavily).
// Result ranking is a pure function so the quality cutoff and ordering are
// testable without a live API key.

use crate::error::{AgentError, AgentResult};
use crate::tools::Toolbox;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS: usize = 10;
/// Results scored at or below this are dropped as low quality.
const MIN_SCORE: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

/// Drop empty-content and low-score results, then order by descending
/// relevance. The sort is stable so equal scores keep API order.
pub fn rank_results(mut results: Vec<SearchResult>) -> Vec<SearchResult> {
    results.retain(|r| !r.content.trim().is_empty() && r.score > MIN_SCORE);
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results
}

pub async fn search_internet(toolbox: &Toolbox, args: &Value) -> AgentResult<Value> {
    let query = args["query"]
        .as_str()
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| AgentError::Validation("search query is required".into()))?;

    let Some(api_key) = toolbox.config.tavily_api_key.as_deref() else {
        return Err(AgentError::tool("searchInternet", "search is not configured on this server"));
    };

    debug!("[search] query={query}");
    let resp = toolbox
        .http
        .post(TAVILY_SEARCH_URL)
        .json(&json!({
            "api_key": api_key,
            "query": query,
            "search_depth": "advanced",
            "max_results": MAX_RESULTS,
            "include_answer": true,
            "include_raw_content": true,
            "include_images": false,
        }))
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(AgentError::tool(
            "searchInternet",
            format!("search API returned status {}", resp.status()),
        ));
    }

    let body: Value = resp.json().await?;
    let raw: Vec<SearchResult> = serde_json::from_value(body["results"].clone()).unwrap_or_default();
    let ranked = rank_results(raw);

    let summary = ranked
        .iter()
        .map(|r| format!("Context from {}:\n{}", r.title, r.content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(json!({
        "answer": body["answer"],
        "summary": summary,
        "sources": ranked.iter().map(|r| json!({
            "title": r.title,
            "url": r.url,
            "published_date": r.published_date,
            "relevance_score": r.score,
        })).collect::<Vec<_>>(),
        "query_context": {
            "original_query": query,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "total_results": ranked.len(),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, score: f64, content: &str) -> SearchResult {
        SearchResult {
            title: title.into(),
            url: format!("https://example.com/{title}"),
            content: content.into(),
            score,
            published_date: None,
        }
    }

    #[test]
    fn test_rank_drops_low_scores_and_orders_descending() {
        let ranked = rank_results(vec![
            result("mid", 0.3, "text"),
            result("low", 0.7, "text"),
            result("top", 0.9, "text"),
        ]);
        let scores: Vec<f64> = ranked.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![0.9, 0.7]);
    }

    #[test]
    fn test_rank_drops_empty_content() {
        let ranked = rank_results(vec![result("blank", 0.95, "   "), result("ok", 0.8, "body")]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].title, "ok");
    }

    #[test]
    fn test_rank_is_stable_for_equal_scores() {
        let ranked = rank_results(vec![result("first", 0.8, "a"), result("second", 0.8, "b")]);
        assert_eq!(ranked[0].title, "first");
        assert_eq!(ranked[1].title, "second");
    }
}
