//! Spoken-word sound tokens
//!
//! Every token maps 1:1 to a clip named by its id (`amount.mp3`, `40.mp3`, ...).

use std::fmt;
use std::str::FromStr;

/// One atomic spoken-word unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundToken {
    /// Opening phrase announcing an amount
    Amount,
    /// A spoken number. Clips exist for 1-20 and the tens 30-90.
    Number(u64),
    Hundred,
    Thousand,
    Lakh,
    Crore,
    Point,
    NetworkConnected,
    NetworkDisconnected,
    Error,
}

impl SoundToken {
    /// Every token a complete sound catalogue must provide
    pub fn required() -> Vec<SoundToken> {
        let mut tokens = vec![
            SoundToken::Amount,
            SoundToken::Crore,
            SoundToken::Lakh,
            SoundToken::Thousand,
            SoundToken::Hundred,
            SoundToken::Point,
            SoundToken::NetworkConnected,
            SoundToken::NetworkDisconnected,
            SoundToken::Error,
        ];
        tokens.extend((1..=20).map(SoundToken::Number));
        tokens.extend((3..=9).map(|t| SoundToken::Number(t * 10)));
        tokens
    }

    /// Whether a clip for this token can exist at all
    pub fn is_in_vocabulary(&self) -> bool {
        match self {
            SoundToken::Number(n) => (1..=20).contains(n) || (*n % 10 == 0 && (30..=90).contains(n)),
            _ => true,
        }
    }

    /// System sounds are played outside of amount sequences
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            SoundToken::NetworkConnected | SoundToken::NetworkDisconnected | SoundToken::Error
        )
    }

    /// Clip identifier
    pub fn id(&self) -> String {
        match self {
            SoundToken::Number(n) => n.to_string(),
            other => other.word().to_string(),
        }
    }

    fn word(&self) -> &'static str {
        match self {
            SoundToken::Amount => "amount",
            SoundToken::Hundred => "hundred",
            SoundToken::Thousand => "thousand",
            SoundToken::Lakh => "lakh",
            SoundToken::Crore => "crore",
            SoundToken::Point => "point",
            SoundToken::NetworkConnected => "network_connected",
            SoundToken::NetworkDisconnected => "network_disconnected",
            SoundToken::Error => "error",
            SoundToken::Number(_) => "",
        }
    }
}

impl fmt::Display for SoundToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundToken::Number(n) => write!(f, "{n}"),
            other => f.write_str(other.word()),
        }
    }
}

/// Unrecognized clip identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sound token '{0}'")]
pub struct UnknownToken(pub String);

impl FromStr for SoundToken {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = match s {
            "amount" => SoundToken::Amount,
            "hundred" => SoundToken::Hundred,
            "thousand" => SoundToken::Thousand,
            "lakh" => SoundToken::Lakh,
            "crore" => SoundToken::Crore,
            "point" => SoundToken::Point,
            "network_connected" => SoundToken::NetworkConnected,
            "network_disconnected" => SoundToken::NetworkDisconnected,
            "error" => SoundToken::Error,
            digits => digits
                .parse::<u64>()
                .map(SoundToken::Number)
                .map_err(|_| UnknownToken(s.to_string()))?,
        };
        Ok(token)
    }
}
