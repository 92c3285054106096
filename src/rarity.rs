use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Qualitative rarity bucket for a per-million corpus frequency.
///
/// Variants are declared from rarest to most common, so the derived `Ord`
/// follows frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RarityLabel {
    #[serde(rename = "Very Rare")]
    VeryRare,
    #[serde(rename = "Rare")]
    Rare,
    #[serde(rename = "Uncommon")]
    Uncommon,
    #[serde(rename = "Common")]
    Common,
    #[serde(rename = "Very Common")]
    VeryCommon,
}

impl RarityLabel {
    pub const ALL: [RarityLabel; 5] = [
        RarityLabel::VeryRare,
        RarityLabel::Rare,
        RarityLabel::Uncommon,
        RarityLabel::Common,
        RarityLabel::VeryCommon,
    ];

    /// Classifies a frequency (occurrences per million words).
    ///
    /// Each bucket is closed on its upper bound: `0.1` is `VeryRare`, `1.0` is
    /// `Rare`, `10.0` is `Uncommon`, `100.0` is `Common`. NaN falls through to
    /// `VeryCommon` since it compares false against every bound.
    pub fn classify(frequency: f64) -> Self {
        if frequency <= 0.1 {
            RarityLabel::VeryRare
        } else if frequency <= 1.0 {
            RarityLabel::Rare
        } else if frequency <= 10.0 {
            RarityLabel::Uncommon
        } else if frequency <= 100.0 {
            RarityLabel::Common
        } else {
            RarityLabel::VeryCommon
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RarityLabel::VeryRare => "Very Rare",
            RarityLabel::Rare => "Rare",
            RarityLabel::Uncommon => "Uncommon",
            RarityLabel::Common => "Common",
            RarityLabel::VeryCommon => "Very Common",
        }
    }
}

impl fmt::Display for RarityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown rarity label {0:?}")]
pub struct UnknownRarity(pub String);

impl FromStr for RarityLabel {
    type Err = UnknownRarity;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        RarityLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == value)
            .ok_or_else(|| UnknownRarity(value.to_string()))
    }
}
