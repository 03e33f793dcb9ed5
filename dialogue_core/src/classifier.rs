//! Intent classification contract.
//!
//! Natural-language understanding lives outside this crate. An
//! [`IntentClassifier`] receives a query describing the utterance and the
//! candidates valid in the current state, and answers with a [`Detection`].
//! The turn pipeline decides what to do with low-confidence or unknown
//! labels.

use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::machine::{ActionDef, TransitionCondition};
use crate::memory::ChatEntry;

/// Input for transition detection.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionQuery<'a> {
    pub utterance: &'a str,
    pub state: &'a str,
    pub history: &'a [ChatEntry],
    /// Conditions leaving the current state, with their few-shot examples.
    pub candidates: Vec<&'a TransitionCondition>,
}

/// Input for action detection.
#[derive(Debug, Clone, Serialize)]
pub struct ActionQuery<'a> {
    pub utterance: &'a str,
    pub state: &'a str,
    pub history: &'a [ChatEntry],
    /// Actions permitted in the current state.
    pub candidates: &'a [ActionDef],
}

/// A classifier's answer: the most likely label, or nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(default, alias = "detected_condition", alias = "detected_action")]
    pub label: Option<String>,

    /// 0.0-1.0
    #[serde(default, alias = "confidence_score")]
    pub confidence: f32,
}

impl Detection {
    /// Nothing detected.
    pub fn none() -> Self {
        Self {
            label: None,
            confidence: 0.0,
        }
    }

    /// A labelled detection. Confidence is clamped to 0.0-1.0.
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: Some(label.into()),
            confidence: clamp_confidence(confidence),
        }
    }

    /// The label, if it was detected with at least `threshold` confidence.
    pub fn accept(&self, threshold: f32) -> Option<&str> {
        match self.label.as_deref() {
            Some(label) if self.confidence >= threshold => Some(label),
            _ => None,
        }
    }

    /// Parse a collaborator's JSON answer.
    ///
    /// Leading or trailing prose around the JSON object is ignored. An empty
    /// label or the literal `"none"` is read as no detection.
    pub fn from_json(text: &str) -> Result<Self, CollaboratorError> {
        let json = extract_json("classifier", text)?;
        let mut detection: Detection = serde_json::from_str(json)
            .map_err(|e| CollaboratorError::new("classifier", format!("invalid detection: {e}")))?;

        if detection
            .label
            .as_deref()
            .map(|label| label.trim().is_empty() || label.trim().eq_ignore_ascii_case("none"))
            .unwrap_or(false)
        {
            detection.label = None;
        }
        detection.confidence = clamp_confidence(detection.confidence);
        Ok(detection)
    }
}

fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Slice the outermost JSON object out of a collaborator response.
pub(crate) fn extract_json<'t>(
    collaborator: &'static str,
    text: &'t str,
) -> Result<&'t str, CollaboratorError> {
    let start = text
        .find('{')
        .ok_or_else(|| CollaboratorError::new(collaborator, "no JSON object in response"))?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| CollaboratorError::new(collaborator, "unterminated JSON object in response"))?;
    Ok(&text[start..=end])
}

/// Detects transition conditions and actions in player utterances.
pub trait IntentClassifier {
    fn detect_transition(&self, query: &TransitionQuery<'_>) -> Result<Detection, CollaboratorError>;

    fn detect_action(&self, query: &ActionQuery<'_>) -> Result<Detection, CollaboratorError>;
}
