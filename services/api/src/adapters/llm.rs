//! services/api/src/adapters/llm.rs
//!
//! This module contains the adapter for the external LLM gateway.
//! It implements the `LlmGateway` port from the `core` crate on top of an
//! OpenAI-compatible chat-completions API.
//!
//! The model is asked to answer with bare JSON, but in practice it often
//! wraps the payload in markdown code fences. Every response therefore goes
//! through `strip_wrapper_markers` before decoding, and a payload that still
//! fails to decode is treated as "no result" rather than a hard error.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use curator_core::domain::{FetchedItem, GeneratedItem, TopicCandidate};
use curator_core::ports::{LlmGateway, PortError, PortResult};
use serde::de::DeserializeOwned;
use tracing::warn;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `LlmGateway` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiGatewayAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGatewayAdapter {
    /// Creates a new `OpenAiGatewayAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    /// Sends a single-user-message completion request and returns the raw text.
    async fn complete(&self, prompt: String) -> PortResult<String> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(content)
    }
}

//=========================================================================================
// Response Coercion Helpers
//=========================================================================================

/// Strips known wrapper markers (markdown code fences) around a JSON payload.
pub(crate) fn strip_wrapper_markers(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Decodes a JSON array of items, accepting a bare object as a one-item array.
/// Any decode failure yields an empty list.
pub(crate) fn decode_item_list<T: DeserializeOwned>(text: &str) -> Vec<T> {
    let payload = strip_wrapper_markers(text);
    match serde_json::from_str::<Vec<T>>(payload) {
        Ok(items) => items,
        Err(_) => match serde_json::from_str::<T>(payload) {
            Ok(item) => vec![item],
            Err(e) => {
                warn!(error = %e, "Gateway payload did not decode as a list; dropping it");
                Vec::new()
            }
        },
    }
}

/// Decodes a single JSON object. Any decode failure yields `None`.
pub(crate) fn decode_object<T: DeserializeOwned>(text: &str) -> Option<T> {
    let payload = strip_wrapper_markers(text);
    match serde_json::from_str::<T>(payload) {
        Ok(item) => Some(item),
        Err(e) => {
            warn!(error = %e, "Gateway payload did not decode as an object; dropping it");
            None
        }
    }
}

//=========================================================================================
// `LlmGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl LlmGateway for OpenAiGatewayAdapter {
    async fn parse_interests(&self, interest_text: &str) -> PortResult<Vec<TopicCandidate>> {
        let prompt = format!(
            r#"You are an interest parser for a personal content curator.

A user described their interests in natural language. Extract the distinct
topics they want to follow.

User input:
{interest_text}

CRITICAL: You MUST respond with ONLY a valid JSON array. No explanations,
no preamble, no markdown backticks.

Return EXACTLY this format:
[
  {{
    "name": "Short Topic Name",
    "description": "One sentence describing what the user wants from this topic"
  }}
]

Rules:
- One entry per distinct topic
- Names should be concise (2-4 words), title-cased
- Start response with [ and end with ]"#
        );

        let text = self.complete(prompt).await?;
        Ok(decode_item_list(&text))
    }

    async fn fetch_content_for_topic(
        &self,
        topic_name: &str,
        description: &str,
        max_items: u32,
    ) -> PortResult<Vec<FetchedItem>> {
        let context_line = if description.is_empty() {
            String::new()
        } else {
            format!("Additional context: {description}\n")
        };
        let prompt = format!(
            r#"You are a content curator for "{topic_name}".

Your task: find {max_items} of the latest, most relevant, high-quality content about this topic.

Topic: {topic_name}
{context_line}
Search for recent articles, news, updates from the past 1-24 hours.

CRITICAL: You MUST respond with ONLY a valid JSON array. No explanations, no preamble, no markdown backticks.

Return EXACTLY this format:
[
  {{
    "title": "Article title here",
    "summary": "Brief 2-3 sentence summary",
    "url": "https://actual-url.com",
    "source": "Source name"
  }}
]

Rules:
- Return {max_items} recent items
- URLs must be real and working
- Focus on content from the last 24-48 hours
- No explanations before or after the JSON
- Start response with [ and end with ]"#
        );

        let text = self.complete(prompt).await?;
        let mut items: Vec<FetchedItem> = decode_item_list(&text);
        items.truncate(max_items as usize);
        Ok(items)
    }

    async fn generate_ai_content(
        &self,
        topic_name: &str,
        description: &str,
        time_period: &str,
        current_date: &str,
    ) -> PortResult<Option<GeneratedItem>> {
        let prompt = format!(
            r#"You are generating personalized content for: {topic_name}

Context: {description}
Time Period: {time_period}
Current Date: {current_date}

Your task: generate a comprehensive, well-written response that:
- Is time-aware (considers the specific time period given above)
- Uses the latest available information
- Is personalized based on the provided context
- Is formatted as a complete article/report

CRITICAL: Return ONLY valid JSON with this exact format:
{{
  "title": "A compelling title for this content",
  "summary": "A 2-3 sentence summary",
  "content": "The full comprehensive response (can be multiple paragraphs, use \n for line breaks)"
}}

Guidelines:
- Make it conversational, engaging, and valuable
- The content should be substantial (300-500 words minimum)

Return ONLY the JSON object. No markdown, no backticks, no explanations."#
        );

        let text = self.complete(prompt).await?;
        Ok(decode_object(&text))
    }

    async fn generate_learning_content(
        &self,
        topic_name: &str,
        description: &str,
        current_day: i64,
        total_days: i64,
        previous_context: &str,
    ) -> PortResult<Option<GeneratedItem>> {
        let prompt = format!(
            r#"You are creating a structured learning curriculum for: {topic_name}

Learning Goal: {description}
Current Progress: Day {current_day} of {total_days}

{previous_context}

Your task: create a comprehensive, structured lesson for Day {current_day}.

IMPORTANT GUIDELINES:
1. This is part of a {total_days}-day structured curriculum
2. Build progressively on previous lessons
3. Include: Theory, Examples, Exercises, and Practice Problems
4. Make it hands-on and practical
5. Format it like a proper course lesson, not a news article

Structure your lesson with:
- Clear learning objectives for this day
- Theoretical concepts explained simply
- Practical examples with code/exercises (if applicable)
- Summary of key takeaways
- Preview of what's coming next

CRITICAL: Return ONLY valid JSON with this exact format:
{{
  "title": "Day {current_day}: [Specific topic for today]",
  "summary": "Brief 2-3 sentence overview of what this lesson covers",
  "content": "The complete structured lesson (use \n\n for paragraphs)"
}}

Minimum 500 words for the content section.

Return ONLY the JSON object. No markdown, no backticks, no explanations."#
        );

        let text = self.complete(prompt).await?;
        Ok(decode_object(&text))
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_code_fences() {
        let wrapped = "```json\n[{\"name\": \"Tech News\"}]\n```";
        assert_eq!(strip_wrapper_markers(wrapped), "[{\"name\": \"Tech News\"}]");
    }

    #[test]
    fn strips_bare_code_fences_and_whitespace() {
        let wrapped = "  ```\n{\"title\": \"x\"}\n```  ";
        assert_eq!(strip_wrapper_markers(wrapped), "{\"title\": \"x\"}");
    }

    #[test]
    fn leaves_unwrapped_payloads_alone() {
        assert_eq!(strip_wrapper_markers("[1, 2]"), "[1, 2]");
    }

    #[test]
    fn decodes_wrapped_item_list() {
        let text = "```json\n[{\"title\": \"A\", \"summary\": \"s\"}]\n```";
        let items: Vec<FetchedItem> = decode_item_list(text);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "A");
        assert_eq!(items[0].url, None);
    }

    #[test]
    fn single_object_is_coerced_to_one_item_list() {
        let text = "{\"title\": \"Only One\"}";
        let items: Vec<FetchedItem> = decode_item_list(text);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Only One");
    }

    #[test]
    fn malformed_list_payload_decodes_to_empty() {
        let items: Vec<FetchedItem> = decode_item_list("I could not find anything today.");
        assert!(items.is_empty());
    }

    #[test]
    fn malformed_object_payload_decodes_to_none() {
        let item: Option<GeneratedItem> = decode_object("```json\n{not valid json\n```");
        assert!(item.is_none());
    }
}
