use core::fmt;

use pacsat_core::{Callsign, PduParseErr};

use crate::pb::enums::pb_error::PbError;

/// Answer to a broadcast request: `OK <CALL>\r` or `NO -<n> <CALL>\r`
#[derive(Debug, Clone, PartialEq)]
pub enum PbResponse {
    Ok(Callsign),
    No(PbError, Callsign),
}

impl PbResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        let text = match self {
            PbResponse::Ok(call) => format!("OK {}\r", call),
            PbResponse::No(err, call) => format!("NO -{} {}\r", err.into_raw(), call),
        };
        text.into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PduParseErr> {
        let text = core::str::from_utf8(bytes)
            .map_err(|_| PduParseErr::Inconsistency { field: "pb_response", reason: "not text" })?;
        let Some(text) = text.strip_suffix('\r') else {
            return Err(PduParseErr::Inconsistency { field: "pb_response", reason: "missing CR" });
        };
        let parse_call = |s: &str| Callsign::parse(s).map_err(|_| PduParseErr::InvalidAddress { field: "pb_response" });

        if let Some(call) = text.strip_prefix("OK ") {
            return Ok(PbResponse::Ok(parse_call(call)?));
        }
        if let Some(rest) = text.strip_prefix("NO -") {
            let Some((num, call)) = rest.split_once(' ') else {
                return Err(PduParseErr::Inconsistency { field: "pb_response", reason: "missing callsign" });
            };
            let num: u64 = num.parse().map_err(|_| PduParseErr::Inconsistency { field: "pb_response", reason: "bad error number" })?;
            let err = PbError::try_from(num).map_err(|_| PduParseErr::InvalidValue { field: "pb_error", value: num })?;
            return Ok(PbResponse::No(err, parse_call(call)?));
        }
        Err(PduParseErr::Inconsistency { field: "pb_response", reason: "unknown response" })
    }
}

impl fmt::Display for PbResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PbResponse::Ok(call) => write!(f, "OK {}", call),
            PbResponse::No(err, call) => write!(f, "NO -{} ({}) {}", err.into_raw(), err, call),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text() {
        let call = Callsign::parse("G4ABC-7").unwrap();
        assert_eq!(PbResponse::Ok(call.clone()).to_bytes(), b"OK G4ABC-7\r".to_vec());
        assert_eq!(PbResponse::No(PbError::Temporary, call.clone()).to_bytes(), b"NO -1 G4ABC-7\r".to_vec());
        assert_eq!(
            PbResponse::from_bytes(b"NO -5 G4ABC-7\r").unwrap(),
            PbResponse::No(PbError::InvalidPacket, call)
        );
        assert!(PbResponse::from_bytes(b"OK G4ABC").is_err());
    }
}
