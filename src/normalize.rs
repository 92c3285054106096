//! Turns the analysis service's response body into an ordered, gap-filled
//! token sequence.

use crate::error::AnalysisError;
use crate::rarity::RarityLabel;
use crate::token::{Token, reconstruct};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

const MAX_SHAPE_KEYS: usize = 8;

/// Result of a successful normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// The service returned an empty array: nothing to analyze.
    Empty,
    /// Tokens sorted by position, each word carrying a rarity label.
    Tokens(Vec<Token>),
}

impl Normalized {
    pub fn tokens(&self) -> &[Token] {
        match self {
            Normalized::Empty => &[],
            Normalized::Tokens(tokens) => tokens,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens().len()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Normalized::Empty)
    }
}

/// Parses a raw response body.
pub fn normalize(body: &[u8]) -> Result<Normalized, AnalysisError> {
    let value: Value = serde_json::from_slice(body).map_err(|err| {
        AnalysisError::malformed(format!("{} bytes of invalid JSON", body.len()), err.to_string())
    })?;
    normalize_value(&value)
}

/// Validates an already-parsed payload, sorts it by position, and fills in
/// missing rarity labels.
pub fn normalize_value(value: &Value) -> Result<Normalized, AnalysisError> {
    let Value::Array(items) = value else {
        return Err(AnalysisError::malformed(
            describe_shape(value),
            "expected an array of token records",
        ));
    };

    let mut tokens = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let token = Token::deserialize(item).map_err(|err| {
            AnalysisError::malformed(
                format!("element {index}: {}", describe_shape(item)),
                err.to_string(),
            )
        })?;
        if token.is_word() && token.frequency.is_none() {
            return Err(AnalysisError::malformed(
                format!("element {index}: {}", describe_shape(item)),
                format!("colored token {:?} has no frequency", token.token),
            ));
        }
        tokens.push(token);
    }

    if tokens.is_empty() {
        debug!("analysis returned no tokens");
        return Ok(Normalized::Empty);
    }

    // `sort_by_key` is stable, so duplicate positions keep service order.
    tokens.sort_by_key(|token| token.position);
    let derived = fill_rarity(&mut tokens);
    debug!(tokens = tokens.len(), derived, "normalized analysis response");
    Ok(Normalized::Tokens(tokens))
}

/// Fills `rarity` on every token that has a frequency but no label. Labels the
/// service supplied are never replaced, even ones outside the five known buckets. Returns how many were derived.
pub fn fill_rarity(tokens: &mut [Token]) -> usize {
    let mut derived = 0;
    for token in tokens.iter_mut() {
        if let Some(label) = &token.rarity {
            if let Err(err) = label.parse::<RarityLabel>() {
                debug!(token = %token.token, error = %err, "keeping unrecognized rarity label");
            }
            continue;
        }
        if let Some(frequency) = token.frequency {
            token.rarity = Some(RarityLabel::classify(frequency).to_string());
            derived += 1;
        }
    }
    derived
}

/// Logs a warning when the sorted tokens do not spell out the submitted text.
/// Returns whether they matched.
pub fn check_partition(text: &str, tokens: &[Token]) -> bool {
    let rebuilt = reconstruct(tokens);
    let matches = rebuilt == text;
    if !matches {
        warn!(
            input_len = text.len(),
            rebuilt_len = rebuilt.len(),
            "tokens do not reproduce the submitted text"
        );
    }
    matches
}

/// Short human description of a JSON value, for diagnostics.
pub fn describe_shape(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(s) => format!("string of {} chars", s.chars().count()),
        Value::Array(items) => format!("array of {} elements", items.len()),
        Value::Object(map) => {
            let mut keys: Vec<&str> = map.keys().map(String::as_str).take(MAX_SHAPE_KEYS).collect();
            if map.len() > MAX_SHAPE_KEYS {
                keys.push("…");
            }
            format!("object with keys [{}]", keys.join(", "))
        }
    }
}
