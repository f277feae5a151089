use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::Error;

/// Exchange identifiers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Exchange {
    #[serde(rename = "hyperliquid")]
    Hyperliquid,
    #[serde(rename = "lighter")]
    Lighter,
}

impl Exchange {
    pub const ALL: [Exchange; 2] = [Exchange::Hyperliquid, Exchange::Lighter];

    /// Name used in the database and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Hyperliquid => "hyperliquid",
            Exchange::Lighter => "lighter",
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hyperliquid" => Ok(Exchange::Hyperliquid),
            "lighter" => Ok(Exchange::Lighter),
            unknown => Err(Error::ParseError(format!(
                "Unknown exchange: {}. Supported exchanges: hyperliquid, lighter",
                unknown
            ))),
        }
    }
}
