use serde::Deserialize;

/// Maximum characters in the base part of an AX.25 callsign
pub const CALLSIGN_MAX_LEN: usize = 6;

/// Station address as used on the AX.25 link: up to six characters plus an SSID.
/// The base is always stored upper-case, so comparisons are case-insensitive.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Callsign {
    call: String,
    /// Secondary station identifier, 0 to 15
    pub ssid: u8,
}

impl Callsign {
    /// Builds a callsign from its parts. Returns an error if the base is empty,
    /// too long, contains something other than letters and digits, or the ssid exceeds 15.
    pub fn new(call: &str, ssid: u8) -> Result<Self, &'static str> {
        if call.is_empty() || call.len() > CALLSIGN_MAX_LEN {
            return Err("callsign must be 1 to 6 characters");
        }
        if !call.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err("callsign may only contain letters and digits");
        }
        if ssid > 15 {
            return Err("ssid must be 0 to 15");
        }
        Ok(Self { call: call.to_ascii_uppercase(), ssid })
    }

    /// Parses `CALL` or `CALL-SSID`
    pub fn parse(s: &str) -> Result<Self, &'static str> {
        let s = s.trim();
        match s.split_once('-') {
            Some((call, ssid)) => {
                let ssid = ssid.parse::<u8>().map_err(|_| "invalid ssid")?;
                Self::new(call, ssid)
            }
            None => Self::new(s, 0),
        }
    }

    /// Builds a callsign from a literal that is known to be valid, without validation.
    /// Used for the protocol's well-known addresses.
    pub fn well_known(call: &'static str, ssid: u8) -> Self {
        Self { call: call.to_ascii_uppercase(), ssid: ssid & 0x0F }
    }

    /// Base callsign without the ssid
    pub fn call(&self) -> &str {
        &self.call
    }
}

impl TryFrom<String> for Callsign {
    type Error = &'static str;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl core::fmt::Display for Callsign {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.ssid == 0 {
            write!(f, "{}", self.call)
        } else {
            write!(f, "{}-{}", self.call, self.ssid)
        }
    }
}

impl core::fmt::Debug for Callsign {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self)
    }
}
