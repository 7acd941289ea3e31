use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An amateur-radio station identifier: a base call plus an optional SSID.
///
/// Immutable once constructed. Two callsigns are equal iff their full
/// values match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Callsign {
    value: String,
    base: String,
    ssid: u8,
}

impl Callsign {
    /// Parse `BASE` or `BASE-SSID` into a validated callsign.
    ///
    /// `base` must be 2-6 alphanumeric characters; `ssid`, if present, must
    /// be an integer 0-15. The resulting `value` is uppercased and must be
    /// 3-15 characters overall.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("callsign", "empty"));
        }
        let upper = trimmed.to_uppercase();

        let (base, ssid) = match upper.split_once('-') {
            Some((base, ssid_str)) => {
                let ssid: u8 = ssid_str
                    .parse()
                    .map_err(|_| Error::validation("callsign", "ssid is not a number"))?;
                if ssid > 15 {
                    return Err(Error::validation("callsign", "ssid out of range 0-15"));
                }
                (base.to_string(), ssid)
            }
            None => (upper.clone(), 0),
        };

        if base.len() < 2 || base.len() > 6 || !base.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::validation(
                "callsign",
                "base must be 2-6 alphanumeric characters",
            ));
        }
        if upper.len() < 3 || upper.len() > 15 {
            return Err(Error::validation(
                "callsign",
                "full value must be 3-15 characters",
            ));
        }

        Ok(Callsign {
            value: upper,
            base,
            ssid,
        })
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn ssid(&self) -> u8 {
        self.ssid
    }
}

impl PartialEq for Callsign {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl Eq for Callsign {}

impl fmt::Display for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
