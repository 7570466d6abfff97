use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Leaderboard partition used by the upstream ranked service.
///
/// `Global` is the aggregate pseudo-region: requests for it omit the
/// `specificRegion` parameter entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    Global,
    NorthAmerica,
    SouthAmerica,
    Europe,
    Asia,
    Oceania,
    JapaneseLanguageText,
}

impl Region {
    /// Priority order used when locating a player without a region hint.
    pub const SEARCH_ORDER: [Region; 7] = [
        Region::Global,
        Region::NorthAmerica,
        Region::SouthAmerica,
        Region::Europe,
        Region::Asia,
        Region::Oceania,
        Region::JapaneseLanguageText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Global => "Global",
            Region::NorthAmerica => "NorthAmerica",
            Region::SouthAmerica => "SouthAmerica",
            Region::Europe => "Europe",
            Region::Asia => "Asia",
            Region::Oceania => "Oceania",
            Region::JapaneseLanguageText => "JapaneseLanguageText",
        }
    }

    /// Value for the upstream `specificRegion` query parameter.
    pub fn specific_region(&self) -> Option<&'static str> {
        match self {
            Region::Global => None,
            other => Some(other.as_str()),
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Region::Global)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown region '{0}'")]
pub struct UnknownRegion(pub String);

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::SEARCH_ORDER
            .into_iter()
            .find(|region| region.as_str() == s.trim())
            .ok_or_else(|| UnknownRegion(s.to_string()))
    }
}
