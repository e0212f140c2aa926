use crate::config::Settings;
use crate::domain::contract::{
    LlmAnalysisReport, MIN_PREDICTIVE_MODELS, MIN_STATCAST_METRICS, RECOMMENDATION_COUNT,
};
use crate::domain::report::AnalysisReport;
use crate::llm::error::GeneratorError;
use crate::llm::{json, GenerateInput, Provider, ReportGenerator};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 8192;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

const TOOL_NAME_EMIT_REPORT: &str = "emit_report";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let timeout_secs = std::env::var("ANTHROPIC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }

    async fn create_message(
        &self,
        req: CreateMessageRequest,
    ) -> anyhow::Result<CreateMessageResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .map_err(|e| GeneratorError::Transport {
                provider: Provider::Anthropic,
                detail: format!("request failed: {e}"),
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|e| GeneratorError::Transport {
            provider: Provider::Anthropic,
            detail: format!("failed to read response body: {e}"),
        })?;
        if !status.is_success() {
            return Err(GeneratorError::Transport {
                provider: Provider::Anthropic,
                detail: format!("status={status}: {}", GeneratorError::snippet_of(&text)),
            }
            .into());
        }

        serde_json::from_str::<CreateMessageResponse>(&text)
            .map_err(|e| {
                GeneratorError::SchemaViolation {
                    provider: Provider::Anthropic,
                    detail: format!("undecodable messages response: {e}"),
                    snippet: GeneratorError::snippet_of(&text),
                }
                .into()
            })
    }

    fn tools() -> Vec<Tool> {
        // Minimal JSON schema for the exact report contract. Keep it strict
        // and explicit to maximize compliance.
        let string = serde_json::json!({"type": "string"});
        let trailing = |len: usize| {
            serde_json::json!({
                "type": "array",
                "minItems": len,
                "maxItems": len,
                "items": {"type": "number"}
            })
        };

        let player_schema = serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": [
                "playerName", "team", "position", "mlbId", "corePerformance",
                "statcastValidation", "matchup", "synthesis", "finalVerdict"
            ],
            "properties": {
                "playerName": string,
                "team": string,
                "position": string,
                "mlbId": {"type": ["string", "null"]},
                "corePerformance": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": [
                        "slashLine", "ops", "activeHitStreak", "streakDetail",
                        "last7Avg", "last15Avg", "last30Avg"
                    ],
                    "properties": {
                        "slashLine": string,
                        "ops": string,
                        "activeHitStreak": {"type": "integer", "minimum": 0},
                        "streakDetail": {"type": ["string", "null"]},
                        "last7Avg": trailing(7),
                        "last15Avg": trailing(15),
                        "last30Avg": trailing(30)
                    }
                },
                "statcastValidation": {
                    "type": "array",
                    "minItems": MIN_STATCAST_METRICS,
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "required": ["label", "value", "percentile"],
                        "properties": {
                            "label": string,
                            "value": string,
                            "percentile": {"type": "integer", "minimum": 0, "maximum": 100}
                        }
                    }
                },
                "matchup": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["pitcherName", "pitcherTeam", "era", "whip", "battingAverageAgainst"],
                    "properties": {
                        "pitcherName": string,
                        "pitcherTeam": string,
                        "era": string,
                        "whip": string,
                        "battingAverageAgainst": string
                    }
                },
                "synthesis": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["predictiveModels", "batterVsPitcher", "parkFactor", "weatherForecast"],
                    "properties": {
                        "predictiveModels": {
                            "type": "array",
                            "minItems": MIN_PREDICTIVE_MODELS,
                            "items": {
                                "type": "object",
                                "additionalProperties": false,
                                "required": ["modelName", "probability"],
                                "properties": {
                                    "modelName": string,
                                    "probability": string
                                }
                            }
                        },
                        "batterVsPitcher": {"type": ["string", "null"]},
                        "parkFactor": {"type": ["string", "null"]},
                        "weatherForecast": {"type": ["string", "null"]}
                    }
                },
                "finalVerdict": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["compositeHitProbability"],
                    "properties": {
                        "compositeHitProbability": {"type": "number", "minimum": 0, "maximum": 100}
                    }
                }
            }
        });

        let schema = serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": [
                "reportTitle", "date", "executiveSummary",
                "recommendations", "watchListCautionaryNotes"
            ],
            "properties": {
                "reportTitle": string,
                "date": string,
                "executiveSummary": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["situationalOverview", "keyTableSynopsis"],
                    "properties": {
                        "situationalOverview": string,
                        "keyTableSynopsis": {
                            "type": "object",
                            "additionalProperties": false,
                            "required": ["headers", "data", "notes"],
                            "properties": {
                                "headers": {"type": "array", "items": string},
                                "data": {
                                    "type": "array",
                                    "minItems": RECOMMENDATION_COUNT,
                                    "maxItems": RECOMMENDATION_COUNT,
                                    "items": {
                                        "type": "object",
                                        "additionalProperties": false,
                                        "required": [
                                            "player", "team", "position",
                                            "compositeHitProbability",
                                            "secondaryModelProbability", "activeStreak"
                                        ],
                                        "properties": {
                                            "player": string,
                                            "team": string,
                                            "position": string,
                                            "compositeHitProbability": string,
                                            "secondaryModelProbability": string,
                                            "activeStreak": string
                                        }
                                    }
                                },
                                "notes": {"type": "array", "items": string}
                            }
                        }
                    }
                },
                "recommendations": {
                    "type": "array",
                    "minItems": RECOMMENDATION_COUNT,
                    "maxItems": RECOMMENDATION_COUNT,
                    "items": player_schema
                },
                "watchListCautionaryNotes": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["honorableMentions", "ineligiblePlayersToNote"],
                    "properties": {
                        "honorableMentions": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "additionalProperties": false,
                                "required": ["player", "team", "reason", "probability"],
                                "properties": {
                                    "player": string,
                                    "team": string,
                                    "reason": string,
                                    "probability": {"type": ["string", "null"]}
                                }
                            }
                        },
                        "ineligiblePlayersToNote": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "additionalProperties": false,
                                "required": ["player", "team", "reason"],
                                "properties": {
                                    "player": string,
                                    "team": string,
                                    "reason": string
                                }
                            }
                        }
                    }
                }
            }
        });

        vec![Tool {
            name: TOOL_NAME_EMIT_REPORT,
            description: "Emit the final daily player-performance analysis report as structured JSON",
            input_schema: schema,
        }]
    }

    fn tool_choice() -> ToolChoice {
        ToolChoice::Tool {
            name: TOOL_NAME_EMIT_REPORT,
        }
    }

    fn system_prompt() -> String {
        [
            "You are an expert MLB analyst producing the daily STREAKSENSE report for a Beat the Streak style contest.",
            "Return ONLY a single JSON object matching the report schema. Do not wrap in markdown. Do not include any extra keys or surrounding text.",
            "No trailing commas. No comments. Use double quotes for all JSON strings.",
            "Rules:",
            "- recommendations must have exactly 5 entries, ordered best pick first",
            "- every nested field must be populated: no nulls or empty placeholders where data is expected",
            "- each recommendation needs last7Avg/last15Avg/last30Avg arrays of exactly 7/15/30 numbers",
            "- each recommendation needs at least 3 statcast metrics (percentile 0-100) and at least 2 named predictive-model probabilities",
            "- compositeHitProbability is a number between 0 and 100",
            "- keyTableSynopsis.data must summarize the same 5 recommended players, in order",
        ]
        .join("\n")
    }

    fn user_prompt(input: &GenerateInput) -> String {
        format!(
            "Task: Produce the daily MLB player-performance analysis for {} (dateKey={}).\n\
             Rank the 5 hitters most likely to record a hit that day, with full supporting \
             analysis per the schema, plus honorable mentions and ineligible players to note.",
            input.display_label,
            input.date_key(),
        )
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            match block {
                ContentBlock::Text { text } => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(text);
                }
                ContentBlock::ToolUse { .. } => {
                    // Tool output is handled separately by `decode_response`.
                    continue;
                }
                ContentBlock::Thinking { .. } | ContentBlock::RedactedThinking { .. } => {
                    // Ignore.
                }
                ContentBlock::Unknown => {
                    // Ignore unknown blocks.
                }
            }
        }
        out
    }

    fn decode_response(res: &CreateMessageResponse) -> Result<AnalysisReport, GeneratorError> {
        match res.stop_reason.as_deref() {
            Some("max_tokens") => {
                return Err(GeneratorError::BackendRefusal {
                    provider: Provider::Anthropic,
                    reason: "response truncated at max_tokens".to_string(),
                });
            }
            Some("refusal") => {
                return Err(GeneratorError::BackendRefusal {
                    provider: Provider::Anthropic,
                    reason: "backend declined to generate the report".to_string(),
                });
            }
            _ => {}
        }

        // Forced tool use: the report arrives as the tool invocation's input.
        for block in &res.content {
            if let ContentBlock::ToolUse { name, input, .. } = block {
                if name == TOOL_NAME_EMIT_REPORT {
                    let raw = input.to_string();
                    return serde_json::from_value::<LlmAnalysisReport>(input.clone())
                        .map_err(anyhow::Error::from)
                        .and_then(LlmAnalysisReport::validate_and_into_report)
                        .map_err(|e| GeneratorError::SchemaViolation {
                            provider: Provider::Anthropic,
                            detail: format!("{e:#}"),
                            snippet: GeneratorError::snippet_of(&raw),
                        });
                }
            }
        }

        // Fallback to text (should be rare with tool_choice forced).
        let text = Self::response_text(res);
        if text.trim().is_empty() {
            return Err(GeneratorError::BackendRefusal {
                provider: Provider::Anthropic,
                reason: "response contained no usable content".to_string(),
            });
        }
        json::parse_report(&text).map_err(|e| GeneratorError::SchemaViolation {
            provider: Provider::Anthropic,
            detail: format!("{e:#}"),
            snippet: GeneratorError::snippet_of(&text),
        })
    }
}

#[async_trait::async_trait]
impl ReportGenerator for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn generate(&self, input: GenerateInput) -> anyhow::Result<AnalysisReport> {
        let req = CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(Self::system_prompt()),
            messages: vec![Message {
                role: "user",
                content: Self::user_prompt(&input),
            }],
            tools: Some(Self::tools()),
            tool_choice: Some(Self::tool_choice()),
        };

        let res = self.create_message(req).await?;
        let report = Self::decode_response(&res).map_err(|err| {
            tracing::warn!(%input.report_date, error = %err, "report generation failed");
            anyhow::Error::new(err)
        })?;
        Ok(report)
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    #[serde(rename = "thinking")]
    Thinking {
        #[serde(default)]
        thinking: String,
        #[serde(default)]
        signature: String,
    },

    #[serde(rename = "redacted_thinking")]
    RedactedThinking {
        #[serde(default)]
        data: String,
    },

    #[serde(other)]
    Unknown,
}
