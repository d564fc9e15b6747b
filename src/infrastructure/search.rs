//! DuckDuckGo instant answer adapter.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::traits::SearchProvider;
use crate::domain::types::SearchResult;
use crate::infrastructure::http::http_client;

const API_URL: &str = "https://api.duckduckgo.com/";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InstantAnswer {
    heading: String,
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    results: Vec<Topic>,
    related_topics: Vec<Topic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Topic {
    text: String,
    #[serde(rename = "FirstURL")]
    first_url: String,
    /// Present on category groups instead of text/url.
    topics: Vec<Topic>,
}

pub struct DuckDuckGo;

#[async_trait]
impl SearchProvider for DuckDuckGo {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, String> {
        let response = http_client()
            .get(API_URL)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("search service returned {}", response.status()));
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        parse_instant_answer(&body, max_results)
    }
}

/// Flattens an instant answer into at most `max_results` hits: the abstract first,
/// then direct results, then related topics.
pub fn parse_instant_answer(body: &str, max_results: usize) -> Result<Vec<SearchResult>, String> {
    let answer: InstantAnswer =
        serde_json::from_str(body).map_err(|e| format!("unexpected search response: {}", e))?;

    let mut hits = Vec::new();
    if !answer.abstract_text.is_empty() {
        hits.push(SearchResult {
            title: answer.heading.clone(),
            url: answer.abstract_url.clone(),
            snippet: answer.abstract_text.clone(),
        });
    }

    let topics = answer
        .results
        .iter()
        .chain(answer.related_topics.iter().flat_map(|t| {
            if t.topics.is_empty() {
                std::slice::from_ref(t).iter()
            } else {
                t.topics.iter()
            }
        }));

    for topic in topics {
        if topic.text.is_empty() || topic.first_url.is_empty() {
            continue;
        }
        let title = topic
            .text
            .split_once(" - ")
            .map(|(title, _)| title)
            .unwrap_or(&topic.text);
        hits.push(SearchResult {
            title: title.to_string(),
            url: topic.first_url.clone(),
            snippet: topic.text.clone(),
        });
    }

    hits.truncate(max_results);
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flattens_groups_and_limits() {
        let body = r#"{
            "Heading": "Rust",
            "AbstractText": "Rust is a systems programming language.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Rust_(programming_language)",
            "Results": [{"Text": "Official site - rust-lang.org", "FirstURL": "https://www.rust-lang.org"}],
            "RelatedTopics": [
                {"Text": "Cargo - Rust package manager", "FirstURL": "https://duckduckgo.com/Cargo"},
                {"Name": "Games", "Topics": [
                    {"Text": "Rust (video game) - survival game", "FirstURL": "https://duckduckgo.com/Rust_game"}
                ]}
            ]
        }"#;

        let hits = parse_instant_answer(body, 3).unwrap();
        let titles: Vec<&str> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Rust", "Official site", "Cargo"]);

        let all = parse_instant_answer(body, 10).unwrap();
        assert_eq!(all.last().unwrap().url, "https://duckduckgo.com/Rust_game");
    }

    #[test]
    fn test_parse_empty_answer() {
        assert!(parse_instant_answer("{}", 5).unwrap().is_empty());
        assert!(parse_instant_answer("not json", 5).is_err());
    }
}
