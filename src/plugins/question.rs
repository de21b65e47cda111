use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

/// Correct-answer key for a question: a single accepted value or several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum AnswerKey {
    /// One accepted answer.
    One(String),
    /// Several accepted answers (multi-select, or alternative spellings).
    Many(Vec<String>),
}

/// Answer payload submitted by a participant. Kept loose on purpose: plugins
/// decide what shapes they accept, everything else counts as incorrect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum AnswerValue {
    /// A single answer string.
    Text(String),
    /// A multi-select answer.
    Selection(Vec<String>),
    /// Anything else a client managed to send.
    #[schema(value_type = Object)]
    Other(serde_json::Value),
}

impl AnswerValue {
    /// The answer as a single string, when it is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// The answer as a selection of strings, when it is one.
    pub fn as_selection(&self) -> Option<&[String]> {
        match self {
            AnswerValue::Selection(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

/// Scoring mode for `balance-game` questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum BalanceScoring {
    /// Every voter gets a flat participation amount.
    #[default]
    None,
    /// Only voters matching the room-wide majority get the standard formula.
    Majority,
}

/// Per-question tuning knobs, all optional.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuestionSettings {
    /// Short-answer comparison keeps case when set.
    #[serde(default)]
    pub case_sensitive: bool,
    /// Balance-game scoring mode.
    pub scoring: Option<BalanceScoring>,
    /// Flat award for balance-game `none` scoring, overriding the built-in default.
    pub participation_points: Option<u32>,
}

/// Type-tagged question payload as authored in the external game store.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuestionData {
    /// Game type string resolved against the plugin registry.
    #[serde(rename = "type")]
    pub question_type: String,
    /// Question text shown to participants.
    pub text: String,
    /// Choices offered to participants, where the type uses them.
    #[serde(default)]
    pub options: Vec<String>,
    /// Correct answer key; absent for types without objective correctness.
    pub correct_answer: Option<AnswerKey>,
    /// Per-question settings.
    #[serde(default)]
    pub settings: QuestionSettings,
}

impl QuestionData {
    /// Build a bare question of the given type, used by plugin defaults.
    pub fn new(question_type: impl Into<String>) -> Self {
        Self {
            question_type: question_type.into(),
            text: String::new(),
            options: Vec::new(),
            correct_answer: None,
            settings: QuestionSettings::default(),
        }
    }
}
