//! Commission tier brackets
//!
//! A tier is the commission-rate bracket assigned to a contract or place.
//! Shared vocabulary for the contract, commission, and catalog domains.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    C1,
    C2,
    C3,
    Special,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::C1, Tier::C2, Tier::C3, Tier::Special];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::C1 => "C1",
            Tier::C2 => "C2",
            Tier::C3 => "C3",
            Tier::Special => "SPECIAL",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "C1" => Ok(Tier::C1),
            "C2" => Ok(Tier::C2),
            "C3" => Ok(Tier::C3),
            "SPECIAL" => Ok(Tier::Special),
            other => Err(format!("unknown tier: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_round_trip() {
        for tier in Tier::ALL {
            let parsed: Tier = tier.as_str().parse().unwrap();
            assert_eq!(parsed, tier);
        }
    }

    #[test]
    fn test_tier_parse_is_case_insensitive() {
        assert_eq!("special".parse::<Tier>().unwrap(), Tier::Special);
        assert!("C4".parse::<Tier>().is_err());
    }
}
