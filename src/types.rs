/// Shared types used across the codebase

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two listing collections. Both carry a creator back-reference and
/// an owner array on the user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Property,
    Requirement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Apartment,
    Rental,
    Commercial,
    Farmhouse,
    Duplex,
    Plot,
    Land,
    Room,
}

impl PropertyType {
    pub const ALL: [PropertyType; 8] = [
        PropertyType::Apartment,
        PropertyType::Rental,
        PropertyType::Commercial,
        PropertyType::Farmhouse,
        PropertyType::Duplex,
        PropertyType::Plot,
        PropertyType::Land,
        PropertyType::Room,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "apartment",
            PropertyType::Rental => "rental",
            PropertyType::Commercial => "commercial",
            PropertyType::Farmhouse => "farmhouse",
            PropertyType::Duplex => "duplex",
            PropertyType::Plot => "plot",
            PropertyType::Land => "land",
            PropertyType::Room => "room",
        }
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        PropertyType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown property type '{}'", s))
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealType {
    Direct,
    Indirect,
}

impl DealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealType::Direct => "Direct",
            DealType::Indirect => "Indirect",
        }
    }
}

impl FromStr for DealType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(DealType::Direct),
            "indirect" => Ok(DealType::Indirect),
            _ => Err(format!("unknown deal type '{}'", s)),
        }
    }
}

impl fmt::Display for DealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Accepts `1200`, `1200.0` or `"1200"`. Blank strings and null become `None`.
pub fn flexible_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Int(i)) => Ok(Some(i)),
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
        Some(NumberOrString::Float(f)) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(Some(f as i64))
        }
        Some(NumberOrString::Float(f)) => Err(D::Error::custom(format!("expected a whole number in the i64 range, got {}", f))),
        Some(NumberOrString::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected a number, got '{}'", s))),
    }
}

/// Phone numbers arrive as numbers from some forms; keep them as text.
pub fn flexible_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Int(i)) => Ok(Some(i.to_string())),
        Some(NumberOrString::Float(f)) => Ok(Some(f.to_string())),
        Some(NumberOrString::Text(s)) => Ok(Some(s)),
    }
}
