//! Scoring-oracle client.
//!
//! Builds a structured prompt describing every group and take, sends it to
//! the oracle, and validates the JSON verdict. Parse failures keep the raw
//! reply text so protocol drift can be debugged from the error alone.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cutdown_models::{Group, Segment};

use crate::error::{PipelineError, PipelineResult};

const DEFAULT_ORACLE_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_ORACLE_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Scores for one take inside a group evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeScore {
    pub segment_index: usize,
    pub audio_quality: f64,
    pub content: f64,
    pub emotion: f64,
    pub overall: f64,
    #[serde(default)]
    pub comment: String,
}

/// The oracle's verdict for one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEvaluation {
    pub group_id: usize,
    pub takes: Vec<TakeScore>,
    /// Index into the group's takes list. Out-of-range values fall back to
    /// being read as a global segment index.
    pub best_take_index: i64,
    #[serde(default)]
    pub reason: String,
}

/// The full oracle reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleReply {
    pub evaluations: Vec<GroupEvaluation>,
    /// Playback order over group ids; identity when missing or empty.
    #[serde(default)]
    pub suggested_order: Vec<usize>,
    #[serde(default)]
    pub overall_notes: String,
}

#[derive(Debug, Serialize)]
struct OracleRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct OracleEnvelope {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ReplyContent,
}

#[derive(Debug, Deserialize)]
struct ReplyContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    text: String,
}

/// HTTP client for the scoring oracle.
pub struct ScoringClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl ScoringClient {
    /// Create a client around the credential supplied by the surrounding
    /// shell. An absent credential fails here, before any network call.
    pub fn new(api_key: impl Into<String>) -> PipelineResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(PipelineError::MissingCredential);
        }
        Ok(Self {
            api_key,
            model: std::env::var("CUTDOWN_ORACLE_MODEL")
                .unwrap_or_else(|_| DEFAULT_ORACLE_MODEL.to_string()),
            base_url: std::env::var("CUTDOWN_ORACLE_URL")
                .unwrap_or_else(|_| DEFAULT_ORACLE_BASE.to_string()),
            client: Client::new(),
        })
    }

    /// Ask the oracle to rank takes within each group and order the groups.
    pub async fn score(
        &self,
        groups: &[Group],
        segments: &[Segment],
    ) -> PipelineResult<OracleReply> {
        let prompt = build_prompt(groups, segments);
        debug!(prompt_chars = prompt.len(), groups = groups.len(), "scoring groups");

        let body = match self.call_oracle(&prompt).await {
            Ok(body) => body,
            Err(e) if e.is_transport() => {
                // One retry for transient transport faults only
                warn!(error = %e, "oracle transport error, retrying once");
                self.call_oracle(&prompt).await.map_err(|e| e.into_pipeline())?
            }
            Err(e) => return Err(e.into_pipeline()),
        };

        let reply = parse_reply(&body)?;
        info!(
            evaluations = reply.evaluations.len(),
            ordered_groups = reply.suggested_order.len(),
            "oracle reply accepted"
        );
        Ok(reply)
    }

    async fn call_oracle(&self, prompt: &str) -> Result<String, CallError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let request = OracleRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(CallError::Transport)?;

        let status = response.status();
        let text = response.text().await.map_err(CallError::Transport)?;
        if !status.is_success() {
            return Err(CallError::Protocol {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: OracleEnvelope =
            serde_json::from_str(&text).map_err(|e| CallError::Parse {
                message: e.to_string(),
                body: text.clone(),
            })?;
        envelope
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or(CallError::Parse {
                message: "no content in oracle envelope".to_string(),
                body: text,
            })
    }
}

/// Transport/protocol split so only transport errors are retried.
#[derive(Debug)]
enum CallError {
    Transport(reqwest::Error),
    Protocol { status: u16, body: String },
    Parse { message: String, body: String },
}

impl CallError {
    fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    fn into_pipeline(self) -> PipelineError {
        match self {
            Self::Transport(e) => PipelineError::OracleProtocol {
                status: 0,
                body: e.to_string(),
            },
            Self::Protocol { status, body } => PipelineError::OracleProtocol { status, body },
            Self::Parse { message, body } => PipelineError::OracleParse { message, body },
        }
    }
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {}", e),
            Self::Protocol { status, .. } => write!(f, "HTTP {}", status),
            Self::Parse { message, .. } => write!(f, "parse: {}", message),
        }
    }
}

/// Build the evaluation prompt from the group and take metadata.
pub fn build_prompt(groups: &[Group], segments: &[Segment]) -> String {
    let mut listing = String::new();
    for group in groups {
        listing.push_str(&format!(
            "\nGROUP {} (line: \"{}\")\n",
            group.group_id, group.text_summary
        ));
        for &idx in &group.take_indices {
            let Some(segment) = segments.iter().find(|s| s.index == idx) else {
                continue;
            };
            let mean = segment
                .audio_metrics
                .and_then(|m| m.mean_db)
                .map(|v| format!("{:.1} dB", v))
                .unwrap_or_else(|| "n/a".to_string());
            let quality = segment
                .audio_metrics
                .map(|m| m.quality.as_str())
                .unwrap_or("unknown");
            listing.push_str(&format!(
                "  take segment_index={} duration={:.3}s mean_volume={} quality={} text=\"{}\"\n",
                segment.index,
                segment.duration,
                mean,
                quality,
                segment.text()
            ));
        }
    }

    format!(
        r#"You are ranking alternative takes of spoken lines from a single recording session.
For every group below, score each take and pick the best one, then suggest an
order in which the groups should appear in the final edit.

Return ONLY a single JSON object with this schema:
{{
  "evaluations": [
    {{
      "group_id": 0,
      "takes": [
        {{
          "segment_index": 0,
          "audio_quality": 0.0,
          "content": 0.0,
          "emotion": 0.0,
          "overall": 0.0,
          "comment": "one sentence"
        }}
      ],
      "best_take_index": 0,
      "reason": "why this take wins"
    }}
  ],
  "suggested_order": [0],
  "overall_notes": "session-level remarks"
}}

Rules:
- All scores are numbers from 0 to 10.
- "best_take_index" is the position of the winning take within the group's
  "takes" array.
- "suggested_order" must list every group_id exactly once.
- Prefer takes that are complete, clean, and confidently delivered.

TAKES:
{listing}"#
    )
}

/// Pull the JSON payload out of a reply that may be fenced or surrounded
/// by prose.
pub fn extract_json(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text).trim();

    match (text.find('{'), text.rfind('}')) {
        (Some(open), Some(close)) if close > open => &text[open..=close],
        _ => text,
    }
}

/// Parse and shape-check the oracle's verdict text.
pub fn parse_reply(body: &str) -> PipelineResult<OracleReply> {
    let json = extract_json(body);
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| PipelineError::OracleParse {
            message: e.to_string(),
            body: body.to_string(),
        })?;
    serde_json::from_value(value).map_err(|e| PipelineError::OracleShape {
        message: e.to_string(),
        body: body.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutdown_models::{AudioMetrics, Transcription};

    fn fixture() -> (Vec<Group>, Vec<Segment>) {
        let mut s0 = Segment::new(0, 0.0, 2.0);
        s0.transcription = Transcription::new("hello world", Vec::new());
        s0.audio_metrics = Some(AudioMetrics::new(Some(-18.0), Some(-2.0)));
        let mut s1 = Segment::new(1, 3.0, 5.0);
        s1.transcription = Transcription::new("hello world.", Vec::new());
        let groups = vec![Group {
            group_id: 0,
            take_indices: vec![0, 1],
            text_summary: "hello world.".to_string(),
        }];
        (groups, vec![s0, s1])
    }

    #[test]
    fn test_prompt_carries_take_metadata() {
        let (groups, segments) = fixture();
        let prompt = build_prompt(&groups, &segments);
        assert!(prompt.contains("GROUP 0"));
        assert!(prompt.contains("segment_index=0"));
        assert!(prompt.contains("-18.0 dB"));
        assert!(prompt.contains("quality=good"));
        assert!(prompt.contains("mean_volume=n/a"));
        assert!(prompt.contains("\"suggested_order\""));
    }

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json(r#"{"a":1}"#), r#"{"a":1}"#);
        assert_eq!(extract_json("```json\n{\"a\":1}\n```"), r#"{"a":1}"#);
        assert_eq!(extract_json("```\n{\"a\":1}\n```"), r#"{"a":1}"#);
        assert_eq!(extract_json("Sure! Here it is: {\"a\":1} Hope that helps"), r#"{"a":1}"#);
    }

    #[test]
    fn test_parse_reply_valid() {
        let body = r#"{
            "evaluations": [{
                "group_id": 0,
                "takes": [{
                    "segment_index": 0,
                    "audio_quality": 7,
                    "content": 8,
                    "emotion": 6,
                    "overall": 7.5,
                    "comment": "clean"
                }],
                "best_take_index": 0,
                "reason": "only take"
            }],
            "suggested_order": [0],
            "overall_notes": "short session"
        }"#;
        let reply = parse_reply(body).unwrap();
        assert_eq!(reply.evaluations.len(), 1);
        assert_eq!(reply.evaluations[0].takes[0].overall, 7.5);
        assert_eq!(reply.suggested_order, vec![0]);
    }

    #[test]
    fn test_parse_reply_fenced() {
        let body = "```json\n{\"evaluations\": [], \"suggested_order\": []}\n```";
        let reply = parse_reply(body).unwrap();
        assert!(reply.evaluations.is_empty());
    }

    #[test]
    fn test_parse_reply_invalid_json() {
        let err = parse_reply("this is not json at all").unwrap_err();
        match err {
            PipelineError::OracleParse { body, .. } => {
                assert!(body.contains("not json"));
            }
            other => panic!("expected OracleParse, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_reply_missing_fields() {
        // evaluations entries must carry group_id and takes
        let err = parse_reply(r#"{"evaluations": [{"best_take_index": 0}]}"#).unwrap_err();
        assert!(matches!(err, PipelineError::OracleShape { .. }));
    }

    #[test]
    fn test_missing_credential_rejected_early() {
        assert!(matches!(
            ScoringClient::new("  "),
            Err(PipelineError::MissingCredential)
        ));
        assert!(ScoringClient::new("key-123").is_ok());
    }
}
