//! Validated room identifier.
//!
//! [`RoomCode`] is a newtype over the 6-character room identifier. The
//! invariant (exactly 6 ASCII alphanumeric characters, stored uppercase)
//! is enforced at every boundary: `FromStr`, `TryFrom<String>`, and serde
//! deserialization all go through the same validating parser.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Length of every room code.
pub const ROOM_CODE_LEN: usize = 6;

/// A validated 6-character room code.
///
/// Room codes are bearer capabilities: knowing the code grants access to
/// the room. Lowercase input is canonicalized to uppercase before
/// validation, since clients freely mix case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Returns the canonical uppercase code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomCode {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical = s.trim().to_ascii_uppercase();
        if canonical.len() != ROOM_CODE_LEN {
            return Err(RelayError::InvalidRoomCode(format!(
                "{s:?} is not {ROOM_CODE_LEN} characters"
            )));
        }
        if !canonical.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(RelayError::InvalidRoomCode(format!(
                "{s:?} contains non-alphanumeric characters"
            )));
        }
        Ok(Self(canonical))
    }
}

impl TryFrom<String> for RoomCode {
    type Error = RelayError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_code() {
        let Ok(code) = "ABC123".parse::<RoomCode>() else {
            panic!("expected valid code");
        };
        assert_eq!(code.as_str(), "ABC123");
    }

    #[test]
    fn lowercase_is_canonicalized() {
        let Ok(code) = "abc123".parse::<RoomCode>() else {
            panic!("expected valid code");
        };
        assert_eq!(code.as_str(), "ABC123");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let Ok(code) = " abc123 ".parse::<RoomCode>() else {
            panic!("expected valid code");
        };
        assert_eq!(code.as_str(), "ABC123");
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("ABC12".parse::<RoomCode>().is_err());
        assert!("ABC1234".parse::<RoomCode>().is_err());
        assert!("".parse::<RoomCode>().is_err());
    }

    #[test]
    fn rejects_non_alphanumeric() {
        assert!("ABC-12".parse::<RoomCode>().is_err());
        assert!("ABC 12".parse::<RoomCode>().is_err());
        assert!("ÄBC123".parse::<RoomCode>().is_err());
    }

    #[test]
    fn serde_round_trip_validates() {
        let Ok(code) = serde_json::from_str::<RoomCode>("\"abc123\"") else {
            panic!("expected valid code");
        };
        assert_eq!(code.as_str(), "ABC123");
        assert!(serde_json::from_str::<RoomCode>("\"nope\"").is_err());

        let Ok(json) = serde_json::to_string(&code) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"ABC123\"");
    }
}
