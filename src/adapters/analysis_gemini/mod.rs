// Gemini analysis adapter - Multimodal generateContent client

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::adapters::toml_config::AnalysisConfig;
use crate::domain::errors::DomainError;
use crate::domain::model::AnalysisRequest;
use crate::domain::rules::{Field, FieldType, ResponseSchema};
use crate::error::{CinemetricsError, CinemetricsResult};
use crate::ports::AnalysisPort;

const FRAME_MIME_TYPE: &str = "image/jpeg";

/// Client for a Gemini-style `generateContent` endpoint
#[derive(Debug, Clone)]
pub struct GeminiAnalysisAdapter {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiAnalysisAdapter {
    pub fn new(config: &AnalysisConfig) -> CinemetricsResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CinemetricsError::ClientError {
                message: "no API key configured (set GEMINI_API_KEY or analysis.api_key)"
                    .to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| CinemetricsError::ClientError {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    pub fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl AnalysisPort for GeminiAnalysisAdapter {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, DomainError> {
        let body = build_request_body(request, &ResponseSchema::film_analysis());
        let start = Instant::now();
        info!(
            model = %self.model,
            frames = request.samples().len(),
            payload_bytes = request.payload_bytes(),
            "sending analysis request"
        );

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DomainError::analysis_service(format!(
                "service returned {}: {}",
                status,
                truncate(&detail, 512)
            )));
        }

        let payload: Value = response.json().await.map_err(|e| {
            DomainError::malformed_response(format!("response body is not JSON: {}", e))
        })?;
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "analysis response received");

        extract_text(&payload)
    }

    fn service_name(&self) -> &str {
        "gemini"
    }
}

fn transport_error(error: reqwest::Error) -> DomainError {
    if error.is_timeout() {
        DomainError::analysis_service(format!("request timed out: {}", error))
    } else {
        DomainError::analysis_service(format!("request failed: {}", error))
    }
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Instruction sent alongside the frames
pub fn analysis_prompt(source_label: &str) -> String {
    format!(
        "You are a world-class cinematographer and film theorist.\n\
         Analyze the provided video frames from the film titled \"{}\". \
         The frames are in chronological order and evenly spaced.\n\n\
         Tasks:\n\
         1. Identify individual shots based on visual changes across these frames.\n\
         2. Estimate shot durations in seconds and calculate the Average Shot Length (ASL).\n\
         3. Extract dominant hex color codes for each shot and for the whole film.\n\
         4. Describe camera movement and composition for each shot.\n\
         5. Infer the musical mood and audio dynamics from the visual cues.\n\n\
         Respond with a single JSON object matching the response schema.",
        source_label
    )
}

/// Assemble the `generateContent` body: one inline image per frame, then the prompt
pub fn build_request_body(request: &AnalysisRequest, schema: &ResponseSchema) -> Value {
    let mut parts: Vec<Value> = request
        .samples()
        .iter()
        .map(|sample| {
            json!({
                "inlineData": {
                    "mimeType": FRAME_MIME_TYPE,
                    "data": STANDARD.encode(&sample.encoded_image),
                }
            })
        })
        .collect();
    parts.push(json!({ "text": analysis_prompt(request.source_label()) }));

    json!({
        "contents": [{ "parts": parts }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": schema_json(&FieldType::Object(schema.fields())),
        }
    })
}

/// Render a field type in the service's OpenAPI-style schema dialect
pub fn schema_json(ty: &FieldType) -> Value {
    match ty {
        FieldType::String => json!({ "type": "STRING" }),
        FieldType::NonNegative => json!({ "type": "NUMBER" }),
        FieldType::Array(items, _) => json!({ "type": "ARRAY", "items": schema_json(items) }),
        FieldType::Object(fields) => {
            let properties: Map<String, Value> = fields
                .iter()
                .map(|Field { name, ty }| (name.to_string(), schema_json(ty)))
                .collect();
            let required: Vec<&str> = fields.iter().map(|f| f.name).collect();
            json!({
                "type": "OBJECT",
                "properties": properties,
                "required": required,
            })
        }
    }
}

/// Concatenate the text parts of the first candidate
pub fn extract_text(response: &Value) -> Result<String, DomainError> {
    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            let reason = response
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .unwrap_or("no candidates");
            DomainError::malformed_response(format!("response has no content: {}", reason))
        })?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(DomainError::malformed_response("response has no text part"));
    }
    Ok(text)
}
