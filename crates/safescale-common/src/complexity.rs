//! Cluster size tiers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Cluster size tier; flavors map each tier to minimum member counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Complexity {
    Small,
    Normal,
    Large,
}

impl Complexity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Small => "Small",
            Self::Normal => "Normal",
            Self::Large => "Large",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error type for parsing a complexity tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseComplexityError(pub String);

impl fmt::Display for ParseComplexityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown complexity: '{}'", self.0)
    }
}

impl std::error::Error for ParseComplexityError {}

impl FromStr for Complexity {
    type Err = ParseComplexityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "small" | "1" => Ok(Self::Small),
            "normal" | "2" => Ok(Self::Normal),
            "large" | "3" => Ok(Self::Large),
            _ => Err(ParseComplexityError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_names_and_digits() {
        assert_eq!("Normal".parse::<Complexity>().unwrap(), Complexity::Normal);
        assert_eq!("3".parse::<Complexity>().unwrap(), Complexity::Large);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("huge".parse::<Complexity>().is_err());
    }
}
