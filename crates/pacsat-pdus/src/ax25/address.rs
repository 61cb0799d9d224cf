use pacsat_core::{ByteBuffer, Callsign, PduParseErr};
use pacsat_core::callsign::CALLSIGN_MAX_LEN;

/// Length of one address field on the wire
pub const AX25_ADDR_LEN: usize = 7;

/// One decoded address field
#[derive(Debug, Clone, PartialEq)]
pub struct Ax25Address {
    pub callsign: Callsign,
    /// C bit for destination/source, H (has-been-repeated) bit for digipeaters
    pub c_bit: bool,
    /// Address extension bit: this is the last address field
    pub last: bool,
}

impl Ax25Address {
    /// Parse one 7-byte address field
    pub fn from_buf(buffer: &mut ByteBuffer, field: &'static str) -> Result<Self, PduParseErr> {
        let raw = buffer.read_slice(AX25_ADDR_LEN, field)?;

        let mut call = String::with_capacity(CALLSIGN_MAX_LEN);
        for &b in &raw[..CALLSIGN_MAX_LEN] {
            if b & 0x01 != 0 {
                // Extension bit may only be set in the ssid byte
                return Err(PduParseErr::InvalidAddress { field });
            }
            let c = (b >> 1) as char;
            if c != ' ' {
                call.push(c);
            }
        }
        let ssid_byte = raw[CALLSIGN_MAX_LEN];
        let ssid = (ssid_byte >> 1) & 0x0F;
        let callsign = Callsign::new(&call, ssid).map_err(|_| PduParseErr::InvalidAddress { field })?;

        Ok(Ax25Address {
            callsign,
            c_bit: ssid_byte & 0x80 != 0,
            last: ssid_byte & 0x01 != 0,
        })
    }

    /// Serialize into 7 bytes: shifted callsign padded with shifted spaces, then the ssid byte
    pub fn to_buf(&self, buffer: &mut ByteBuffer) {
        let call = self.callsign.call().as_bytes();
        for i in 0..CALLSIGN_MAX_LEN {
            let c = call.get(i).copied().unwrap_or(b' ');
            buffer.write_u8(c << 1);
        }
        let mut ssid_byte = 0x60 | (self.callsign.ssid << 1);
        if self.c_bit {
            ssid_byte |= 0x80;
        }
        if self.last {
            ssid_byte |= 0x01;
        }
        buffer.write_u8(ssid_byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_encoding() {
        let addr = Ax25Address { callsign: Callsign::parse("PACSAT-12").unwrap(), c_bit: true, last: false };
        let mut buf = ByteBuffer::new_autoexpand(7);
        addr.to_buf(&mut buf);
        assert_eq!(buf.as_slice(), &[0xA0, 0x82, 0x86, 0xA6, 0x82, 0xA8, 0xF8]);

        buf.seek(0);
        let parsed = Ax25Address::from_buf(&mut buf, "dest").unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_short_callsign_padding() {
        let addr = Ax25Address { callsign: Callsign::parse("G0K").unwrap(), c_bit: false, last: true };
        let mut buf = ByteBuffer::new_autoexpand(7);
        addr.to_buf(&mut buf);
        assert_eq!(buf.as_slice(), &[0x8E, 0x60, 0x96, 0x40, 0x40, 0x40, 0x61]);
        buf.seek(0);
        assert_eq!(Ax25Address::from_buf(&mut buf, "src").unwrap().callsign.to_string(), "G0K");
    }
}
