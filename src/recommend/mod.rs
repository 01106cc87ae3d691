//! Recommendation adapter.
//!
//! Sends the visitor's query and the full catalog to a hosted generative
//! model and returns its prose. Every failure collapses into a fixed
//! fallback message so the storefront never shows an error here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::RecommenderConfig;
use crate::errors::AppError;
use crate::models::VehicleRecord;

/// Shown whenever the provider cannot produce an answer.
pub const FALLBACK_TEXT: &str = "Our advanced consultant is currently busy with another client. Please browse our inventory or call us directly!";

pub struct Recommender {
    http_client: reqwest::Client,
    config: RecommenderConfig,
}

impl Recommender {
    pub fn new(config: RecommenderConfig, timeout: Duration) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// Recommend vehicles from `inventory` for a free-text query.
    pub async fn recommend(&self, query: &str, inventory: &[VehicleRecord]) -> String {
        match self.generate(query, inventory).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Recommendation failed, using fallback: {}", e);
                FALLBACK_TEXT.to_string()
            }
        }
    }

    async fn generate(&self, query: &str, inventory: &[VehicleRecord]) -> Result<String, AppError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Internal("No recommendation provider key configured".into()))?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(build_prompt(query, inventory)),
                    thought: None,
                }],
            }],
            generation_config: GenerationConfig {
                thinking_config: ThinkingConfig {
                    thinking_budget: self.config.thinking_budget,
                },
            },
        };

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Recommendation provider returned {}: {}",
                status, text
            )));
        }

        let reply: GenerateResponse = response.json().await?;
        let text: String = reply
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter(|part| !part.thought.unwrap_or(false))
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AppError::Internal("Recommendation provider returned no text".into()));
        }
        Ok(text)
    }
}

/// One line per vehicle.
pub fn format_catalog(inventory: &[VehicleRecord]) -> String {
    inventory
        .iter()
        .map(|c| {
            format!(
                "{} {} ({}), {}, Price: ₹{}L, Type: {}, Mileage: {}km. Description: {}",
                c.brand,
                c.model,
                c.year,
                c.fuel_type.as_str(),
                c.price,
                c.body_type.as_str(),
                c.mileage,
                c.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(query: &str, inventory: &[VehicleRecord]) -> String {
    format!(
        r#"You are the "Smart Consultant" for Carz-34, a premium pre-owned car dealer in Chandrapur.
Use your deep reasoning capabilities to provide a sophisticated and highly personalized recommendation based on the inventory and user query below.

User Query: "{query}"

Current Inventory:
{inventory}

Instructions:
1. Think deeply about the user's implicit needs (safety, status, fuel economy, family size).
2. Provide 1-2 expert recommendations.
3. Use a tone that is professional, authoritative, and helpful.
4. Format your response with clear headings or bullet points if necessary.
5. If no car matches perfectly, suggest the closest alternative and explain why."#,
        query = query,
        inventory = format_catalog(inventory)
    )
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::starter_inventory;
    use axum::{extract::Query, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn config(base_url: &str, api_key: Option<&str>) -> RecommenderConfig {
        RecommenderConfig {
            api_key: api_key.map(str::to_string),
            model: "gemini-test".to_string(),
            base_url: base_url.to_string(),
            thinking_budget: 1024,
        }
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_catalog_line_format() {
        let lines = format_catalog(&starter_inventory()[..1]);
        assert_eq!(
            lines,
            "Maruti Suzuki Swift ZXI (2021), Petrol, Price: ₹6.75L, Type: Hatchback, \
             Mileage: 24000km. Description: Single owner, pristine condition, regularly \
             serviced at authorized service center."
        );
    }

    #[test]
    fn test_prompt_embeds_query_and_inventory() {
        let prompt = build_prompt("family SUV under 16 lakhs", &starter_inventory());
        assert!(prompt.contains("Smart Consultant"));
        assert!(prompt.contains("User Query: \"family SUV under 16 lakhs\""));
        assert!(prompt.contains("Toyota Innova Crysta (2018)"));
        assert!(prompt.contains("5. If no car matches perfectly"));
    }

    #[tokio::test]
    async fn test_missing_key_returns_fallback() {
        let recommender =
            Recommender::new(config("http://127.0.0.1:1", None), Duration::from_secs(1)).unwrap();
        let text = recommender.recommend("anything", &starter_inventory()).await;
        assert_eq!(text, FALLBACK_TEXT);
    }

    #[tokio::test]
    async fn test_unreachable_provider_returns_fallback() {
        let recommender = Recommender::new(
            config("http://127.0.0.1:1", Some("key")),
            Duration::from_secs(1),
        )
        .unwrap();
        let text = recommender.recommend("anything", &[]).await;
        assert_eq!(text, FALLBACK_TEXT);
    }

    #[tokio::test]
    async fn test_provider_text_is_returned() {
        async fn generate(
            Query(params): Query<HashMap<String, String>>,
            Json(body): Json<Value>,
        ) -> Json<Value> {
            assert_eq!(params.get("key").map(String::as_str), Some("test-key"));
            assert_eq!(
                body["generationConfig"]["thinkingConfig"]["thinkingBudget"],
                1024
            );
            Json(json!({
                "candidates": [{
                    "content": { "parts": [
                        { "text": "weighing options", "thought": true },
                        { "text": "Consider the " },
                        { "text": "Hyundai Creta." }
                    ]}
                }]
            }))
        }

        let app = Router::new().route("/models/{model}", post(generate));
        let base = serve(app).await;

        let recommender =
            Recommender::new(config(&base, Some("test-key")), Duration::from_secs(5)).unwrap();
        let text = recommender.recommend("SUV", &starter_inventory()).await;
        assert_eq!(text, "Consider the Hyundai Creta.");
    }

    #[tokio::test]
    async fn test_blank_or_failed_reply_returns_fallback() {
        let app = Router::new().route(
            "/models/{model}",
            post(|| async { Json(json!({ "candidates": [] })) }),
        );
        let base = serve(app).await;
        let recommender =
            Recommender::new(config(&base, Some("k")), Duration::from_secs(5)).unwrap();
        assert_eq!(recommender.recommend("SUV", &[]).await, FALLBACK_TEXT);

        let app = Router::new().route(
            "/models/{model}",
            post(|| async { (axum::http::StatusCode::TOO_MANY_REQUESTS, "quota") }),
        );
        let base = serve(app).await;
        let recommender =
            Recommender::new(config(&base, Some("k")), Duration::from_secs(5)).unwrap();
        assert_eq!(recommender.recommend("SUV", &[]).await, FALLBACK_TEXT);
    }
}
