use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::SettingsStore;
use crate::sentence::SentenceBackend;

use super::classifier::{
    ClassifyError, ClassifyTarget, GestureClassifier, RecognitionOutcome,
};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODELS_URL: &str = "https://api.openai.com/v1/models";

const ANALYSIS_MODEL: &str = "gpt-4.1-2025-04-14";
const RECOGNITION_MODEL: &str = "gpt-4o";
const SENTENCE_MODEL: &str = "gpt-4o";

/// OpenAI chat-completions client covering gesture analysis, free
/// recognition over a trained candidate set, and sentence reconstruction.
///
/// The credential is read from the shared settings store on every call; the
/// pipeline never mutates it.
pub struct OpenAiClient {
    http: reqwest::Client,
    settings: Arc<SettingsStore>,
}

impl OpenAiClient {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    fn api_key(&self) -> Result<String, ClassifyError> {
        let config = self.settings.api_config();
        if !config.is_valid() {
            return Err(ClassifyError::MissingCredential);
        }
        Ok(config.api_key)
    }

    /// Liveness probe for a candidate key, used by the settings flow.
    pub async fn test_api_key(&self, api_key: &str) -> bool {
        match self.http.get(MODELS_URL).bearer_auth(api_key).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn chat(&self, body: Value) -> Result<String, ClassifyError> {
        let api_key = self.api_key()?;

        let response = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ClassifyError::Transport(err.to_string()))?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(ClassifyError::Unauthorized);
        }
        if status.as_u16() == 429 {
            return Err(ClassifyError::RateLimited);
        }
        if !status.is_success() {
            return Err(ClassifyError::Transport(format!("HTTP {status}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| ClassifyError::Malformed(err.to_string()))?;

        message_content(&payload)
            .map(str::to_string)
            .ok_or_else(|| ClassifyError::Malformed("response carried no message content".into()))
    }
}

impl GestureClassifier for OpenAiClient {
    async fn classify(
        &self,
        image_png: &[u8],
        target: &ClassifyTarget,
    ) -> Result<RecognitionOutcome, ClassifyError> {
        let image_url = format!("data:image/png;base64,{}", BASE64.encode(image_png));

        match target {
            ClassifyTarget::Expected { gesture_name, .. } => {
                let body = analysis_request(gesture_name, &image_url);
                let content = self.chat(body).await?;
                parse_analysis(&content)
            }
            ClassifyTarget::Candidates(candidates) => {
                if candidates.is_empty() {
                    return Err(ClassifyError::Malformed(
                        "candidate set is empty; train a gesture first".into(),
                    ));
                }
                let names = candidates
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                let body = recognition_request(&names, &image_url);
                let content = self.chat(body).await?;
                parse_recognition(&content)
            }
        }
    }
}

impl SentenceBackend for OpenAiClient {
    async fn complete_sentence(&self, words: &[String]) -> Result<String, ClassifyError> {
        let joined = words.join(", ");
        let body = json!({
            "model": SENTENCE_MODEL,
            "messages": [
                {
                    "role": "system",
                    "content": format!(
                        "You are helping construct sentences from sign language gestures. \
                         The user has signed these words in sequence: {joined}.\n\n\
                         Your task is to create a natural, grammatically correct sentence \
                         from these words. Fill in any missing articles, prepositions, or \
                         connecting words as needed to make the sentence flow naturally.\n\n\
                         Respond with ONLY the complete sentence, nothing else. Keep it \
                         concise and natural."
                    )
                },
                {
                    "role": "user",
                    "content": format!("Create a natural sentence from these words: {joined}")
                }
            ],
            "max_tokens": 100,
            "temperature": 0.5
        });

        let content = self.chat(body).await?;
        debug!("sentence completion: {content}");
        Ok(content.trim().to_string())
    }
}

fn analysis_request(gesture_name: &str, image_url: &str) -> Value {
    json!({
        "model": ANALYSIS_MODEL,
        "messages": [
            {
                "role": "system",
                "content": format!(
                    "You are an AUSLAN (Australian Sign Language) gesture recognition \
                     expert. Analyze the image and determine if the person is correctly \
                     performing the AUSLAN gesture for \"{gesture_name}\".\n\n\
                     Respond with a JSON object containing:\n\
                     - recognized: boolean (true if gesture is correct)\n\
                     - gesture: string (what gesture you think is being shown)\n\
                     - confidence: number (0-100, confidence in your assessment)\n\
                     - feedback: string (encouraging feedback about the attempt)\n\
                     - suggestions: array of strings (specific tips for improvement if needed)\n\n\
                     Be encouraging and educational in your feedback. Consider hand \
                     position, finger placement, and overall gesture form."
                )
            },
            {
                "role": "user",
                "content": [
                    {
                        "type": "text",
                        "text": format!(
                            "Please analyze this AUSLAN gesture attempt. The person is \
                             trying to sign \"{gesture_name}\"."
                        )
                    },
                    { "type": "image_url", "image_url": { "url": image_url } }
                ]
            }
        ],
        "max_tokens": 300,
        "temperature": 0.3
    })
}

fn recognition_request(names: &str, image_url: &str) -> Value {
    json!({
        "model": RECOGNITION_MODEL,
        "messages": [
            {
                "role": "system",
                "content": format!(
                    "You are analyzing a hand gesture image. The user has trained the \
                     following custom gestures: {names}.\n\n\
                     Your task is to:\n\
                     1. Identify which trained gesture this most closely matches\n\
                     2. If uncertain, make your best guess from the trained gestures list\n\
                     3. Provide a confidence score (0-100)\n\n\
                     Respond with a JSON object:\n\
                     {{\n  \"recognizedGesture\": \"gesture_name\",\n  \"confidence\": number,\n  \
                     \"suggestions\": [\"helpful tip if confidence is low\"]\n}}\n\n\
                     Be helpful and encouraging. If the gesture is unclear, suggest \
                     improvements but still make your best match."
                )
            },
            {
                "role": "user",
                "content": [
                    {
                        "type": "text",
                        "text": format!("Which of my trained gestures ({names}) does this match?")
                    },
                    { "type": "image_url", "image_url": { "url": image_url } }
                ]
            }
        ],
        "max_tokens": 300,
        "temperature": 0.3
    })
}

#[derive(Debug, Deserialize)]
struct AnalysisPayload {
    #[serde(default)]
    recognized: bool,
    #[serde(default)]
    gesture: Option<String>,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RecognitionPayload {
    #[serde(rename = "recognizedGesture", default)]
    recognized_gesture: Option<String>,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    suggestions: Vec<String>,
}

fn parse_analysis(content: &str) -> Result<RecognitionOutcome, ClassifyError> {
    let cleaned = strip_code_fences(content);
    let payload: AnalysisPayload = serde_json::from_str(cleaned).map_err(|err| {
        warn!("analysis response was not valid JSON: {err}");
        ClassifyError::Malformed(err.to_string())
    })?;

    Ok(RecognitionOutcome {
        matched: payload.recognized,
        label: payload.gesture.unwrap_or_else(|| "unknown".into()),
        confidence: payload.confidence.clamp(0.0, 100.0),
        feedback: payload.feedback,
        suggestions: payload.suggestions,
    })
}

fn parse_recognition(content: &str) -> Result<RecognitionOutcome, ClassifyError> {
    let cleaned = strip_code_fences(content);
    let payload: RecognitionPayload = serde_json::from_str(cleaned).map_err(|err| {
        warn!("recognition response was not valid JSON: {err}");
        ClassifyError::Malformed(err.to_string())
    })?;

    let label = payload
        .recognized_gesture
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "unknown".into());

    // Free recognition always yields a best match, never a pass/fail.
    Ok(RecognitionOutcome {
        matched: true,
        label,
        confidence: payload.confidence.clamp(0.0, 100.0),
        feedback: String::new(),
        suggestions: payload.suggestions,
    })
}

fn message_content(payload: &Value) -> Option<&str> {
    payload
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
}

/// The model occasionally wraps its JSON in a markdown code fence.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_code_fences() {
        assert_eq!(
            strip_code_fences("```json\n{\"a\":1}\n```"),
            "{\"a\":1}"
        );
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn extracts_message_content() {
        let payload = json!({
            "choices": [ { "message": { "content": "hello" } } ]
        });
        assert_eq!(message_content(&payload), Some("hello"));
        assert_eq!(message_content(&json!({"choices": []})), None);
    }

    #[test]
    fn parses_analysis_payload() {
        let outcome = parse_analysis(
            "```json\n{\"recognized\": true, \"gesture\": \"hello\", \
             \"confidence\": 92, \"feedback\": \"Nice form!\", \
             \"suggestions\": []}\n```",
        )
        .unwrap();
        assert!(outcome.matched);
        assert_eq!(outcome.label, "hello");
        assert_eq!(outcome.confidence, 92.0);
        assert_eq!(outcome.feedback, "Nice form!");
    }

    #[test]
    fn analysis_payload_tolerates_missing_fields() {
        let outcome = parse_analysis("{\"recognized\": false}").unwrap();
        assert!(!outcome.matched);
        assert_eq!(outcome.label, "unknown");
        assert_eq!(outcome.confidence, 0.0);
    }

    #[test]
    fn non_json_content_is_malformed() {
        assert!(matches!(
            parse_analysis("I think that is the sign for hello!"),
            Err(ClassifyError::Malformed(_))
        ));
    }

    #[test]
    fn parses_recognition_payload() {
        let outcome = parse_recognition(
            "{\"recognizedGesture\": \"water\", \"confidence\": 61, \
             \"suggestions\": [\"hold the sign steady\"]}",
        )
        .unwrap();
        assert!(outcome.matched);
        assert_eq!(outcome.label, "water");
        assert_eq!(outcome.confidence, 61.0);
        assert_eq!(outcome.suggestions.len(), 1);
    }

    #[test]
    fn recognition_confidence_is_clamped() {
        let outcome =
            parse_recognition("{\"recognizedGesture\": \"x\", \"confidence\": 400}").unwrap();
        assert_eq!(outcome.confidence, 100.0);
    }
}
