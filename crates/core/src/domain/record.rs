use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const BRAND_MAX_CHARS: usize = 64;
pub const IMPRESSION_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rating {
    #[serde(rename = "非常に好き", alias = "VERY_GOOD")]
    VeryGood,
    #[serde(rename = "好き", alias = "GOOD")]
    Good,
    #[serde(rename = "合わない", alias = "BAD")]
    Bad,
    #[serde(rename = "非常に合わない", alias = "VERY_BAD")]
    VeryBad,
}

impl Rating {
    pub fn label(self) -> &'static str {
        match self {
            Rating::VeryGood => "非常に好き",
            Rating::Good => "好き",
            Rating::Bad => "合わない",
            Rating::VeryBad => "非常に合わない",
        }
    }

    pub fn is_liked(self) -> bool {
        matches!(self, Rating::VeryGood | Rating::Good)
    }

    pub fn is_disliked(self) -> bool {
        matches!(self, Rating::Bad | Rating::VeryBad)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Rating {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "非常に好き" | "VERY_GOOD" => Ok(Rating::VeryGood),
            "好き" | "GOOD" => Ok(Rating::Good),
            "合わない" | "BAD" => Ok(Rating::Bad),
            "非常に合わない" | "VERY_BAD" => Ok(Rating::VeryBad),
            other => anyhow::bail!("unknown rating: {other}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrinkingRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: String,
    pub brand: String,
    pub impression: String,
    pub rating: Rating,
    #[serde(default)]
    pub label_image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DrinkingRecord {
    /// Trims free-text fields and enforces their length bounds.
    pub fn validated(mut self) -> anyhow::Result<Self> {
        self.brand = self.brand.trim().to_string();
        anyhow::ensure!(!self.brand.is_empty(), "brand must be non-empty");
        anyhow::ensure!(
            self.brand.chars().count() <= BRAND_MAX_CHARS,
            "brand must be at most {BRAND_MAX_CHARS} chars"
        );

        self.impression = self.impression.trim().to_string();
        anyhow::ensure!(!self.impression.is_empty(), "impression must be non-empty");
        anyhow::ensure!(
            self.impression.chars().count() <= IMPRESSION_MAX_CHARS,
            "impression must be at most {IMPRESSION_MAX_CHARS} chars"
        );

        Ok(self)
    }
}

/// Decodes raw record payloads, dropping the ones that do not validate.
pub fn parse_records(raw: Vec<serde_json::Value>) -> Vec<DrinkingRecord> {
    let total = raw.len();
    let mut out = Vec::with_capacity(total);
    for (index, value) in raw.into_iter().enumerate() {
        let parsed = serde_json::from_value::<DrinkingRecord>(value)
            .map_err(anyhow::Error::from)
            .and_then(DrinkingRecord::validated);
        match parsed {
            Ok(record) => out.push(record),
            Err(err) => {
                tracing::warn!(index, error = %err, "skipping invalid drinking record");
            }
        }
    }

    if out.len() != total {
        tracing::info!(total, kept = out.len(), "drinking records parsed");
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    brands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MenuError {
    #[error("menu must list at least one brand")]
    Empty,
    #[error("menu brand #{position} is blank")]
    BlankBrand { position: usize },
    #[error("menu brand #{position} exceeds 64 chars")]
    BrandTooLong { position: usize },
}

impl Menu {
    /// Trims every brand, rejects blank or overlong entries and drops duplicates
    /// while keeping the first occurrence.
    pub fn new<I, S>(brands: I) -> Result<Self, MenuError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for (index, brand) in brands.into_iter().enumerate() {
            let position = index + 1;
            let brand = brand.as_ref().trim();
            if brand.is_empty() {
                return Err(MenuError::BlankBrand { position });
            }
            if brand.chars().count() > BRAND_MAX_CHARS {
                return Err(MenuError::BrandTooLong { position });
            }
            if !out.iter().any(|b| b == brand) {
                out.push(brand.to_string());
            }
        }

        if out.is_empty() {
            return Err(MenuError::Empty);
        }
        Ok(Self { brands: out })
    }

    pub fn brands(&self) -> &[String] {
        &self.brands
    }
}
