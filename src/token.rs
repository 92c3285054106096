use serde::{Deserialize, Deserializer, Serialize};

/// Body of `POST /analyze`. The text is sent exactly as the user typed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub text: String,
}

impl AnalysisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// One tokenized unit of the input as returned by the analysis service.
///
/// Word tokens carry `frequency` and `color`; whitespace and punctuation carry
/// neither. `rarity` may be supplied by the service or filled in during
/// normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub token: String,
    pub position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(
        default,
        deserialize_with = "non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub color: Option<String>,
    #[serde(
        default,
        deserialize_with = "non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub rarity: Option<String>,
}

impl Token {
    /// A plain token has no color: whitespace, punctuation, or anything the
    /// service chose not to score.
    pub fn plain(token: impl Into<String>, position: i64) -> Self {
        Self {
            token: token.into(),
            position,
            frequency: None,
            color: None,
            rarity: None,
        }
    }

    pub fn word(
        token: impl Into<String>,
        position: i64,
        frequency: f64,
        color: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            position,
            frequency: Some(frequency),
            color: Some(color.into()),
            rarity: None,
        }
    }

    pub fn with_rarity(mut self, rarity: impl Into<String>) -> Self {
        self.rarity = Some(rarity.into());
        self
    }

    pub fn is_word(&self) -> bool {
        self.color.is_some()
    }
}

/// Concatenates token surfaces in slice order.
pub fn reconstruct(tokens: &[Token]) -> String {
    let capacity = tokens.iter().map(|token| token.token.len()).sum();
    tokens
        .iter()
        .fold(String::with_capacity(capacity), |mut text, token| {
            text.push_str(&token.token);
            text
        })
}

// The service sends `null` for non-word colors; an empty string is just as
// falsy to the page and is treated the same way.
fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
