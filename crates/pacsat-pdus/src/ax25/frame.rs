use core::fmt;

use pacsat_core::{ByteBuffer, Callsign, PduParseErr};

use crate::ax25::address::{AX25_ADDR_LEN, Ax25Address};
use crate::ax25::enums::frame_type::Ax25FrameType;
use crate::ax25::enums::pid::Ax25Pid;
use crate::ax25::{AX25_MAX_FRAME_INFO_LEN, AX25_MIN_FRAME_LEN};

/// A decoded AX.25 v2.0 frame (modulo 8)
#[derive(Clone, PartialEq)]
pub struct Ax25Frame {
    pub dest: Callsign,
    pub src: Callsign,
    /// At most one digipeater is supported
    pub digi: Option<Callsign>,
    /// True for command frames, false for responses
    pub command: bool,
    pub frame_type: Ax25FrameType,
    /// Poll (command) or Final (response) bit
    pub pf: bool,
    /// N(R), for I and S frames
    pub nr: u8,
    /// N(S), for I frames
    pub ns: u8,
    /// Present for I and UI frames only
    pub pid: Option<u8>,
    /// Information field. For frames without PID this holds any trailing bytes.
    pub info: Vec<u8>,
}

impl Ax25Frame {
    /// Unnumbered frame without information field
    pub fn new_u(dest: Callsign, src: Callsign, frame_type: Ax25FrameType, command: bool, pf: bool) -> Self {
        Self { dest, src, digi: None, command, frame_type, pf, nr: 0, ns: 0, pid: None, info: vec![] }
    }

    /// Supervisory frame
    pub fn new_s(dest: Callsign, src: Callsign, frame_type: Ax25FrameType, command: bool, pf: bool, nr: u8) -> Self {
        Self { dest, src, digi: None, command, frame_type, pf, nr: nr & 0x07, ns: 0, pid: None, info: vec![] }
    }

    /// Information frame. Always a command.
    pub fn new_i(dest: Callsign, src: Callsign, nr: u8, ns: u8, pf: bool, pid: u8, info: Vec<u8>) -> Self {
        Self {
            dest,
            src,
            digi: None,
            command: true,
            frame_type: Ax25FrameType::I,
            pf,
            nr: nr & 0x07,
            ns: ns & 0x07,
            pid: Some(pid),
            info,
        }
    }

    /// Unnumbered information frame, sent as a command with P=0
    pub fn new_ui(dest: Callsign, src: Callsign, pid: Ax25Pid, info: Vec<u8>) -> Self {
        Self {
            dest,
            src,
            digi: None,
            command: true,
            frame_type: Ax25FrameType::Ui,
            pf: false,
            nr: 0,
            ns: 0,
            pid: Some(pid.into_raw()),
            info,
        }
    }

    /// Parse a complete frame (no flags, no FCS)
    pub fn from_bytes(data: &[u8]) -> Result<Self, PduParseErr> {
        if data.len() < AX25_MIN_FRAME_LEN {
            return Err(PduParseErr::InconsistentLength { expected: AX25_MIN_FRAME_LEN, found: data.len() });
        }
        let mut buffer = ByteBuffer::from_bytes(data);

        let dest = Ax25Address::from_buf(&mut buffer, "dest")?;
        if dest.last {
            return Err(PduParseErr::InvalidAddress { field: "dest" });
        }
        let src = Ax25Address::from_buf(&mut buffer, "src")?;
        let digi = if src.last {
            None
        } else {
            let digi = Ax25Address::from_buf(&mut buffer, "digi")?;
            if !digi.last {
                return Err(PduParseErr::NotImplemented { field: Some("multiple digipeaters") });
            }
            Some(digi.callsign)
        };

        let control = buffer.read_u8("control")?;
        let Some(frame_type) = Ax25FrameType::from_control(control) else {
            return Err(PduParseErr::InvalidValue { field: "control", value: control as u64 });
        };

        let (nr, ns) = match frame_type {
            Ax25FrameType::I => (control >> 5, (control >> 1) & 0x07),
            ft if ft.is_supervisory() => (control >> 5, 0),
            _ => (0, 0),
        };
        let pf = control & 0x10 != 0;

        let pid = if frame_type.has_pid() {
            Some(buffer.read_u8("pid")?)
        } else {
            None
        };
        // N1 is checked by the data link, which has to answer an oversize I frame
        let info = buffer.read_remaining();
        if info.len() > AX25_MAX_FRAME_INFO_LEN {
            return Err(PduParseErr::TooLong { field: "info", max: AX25_MAX_FRAME_INFO_LEN, found: info.len() });
        }

        Ok(Ax25Frame {
            dest: dest.callsign,
            src: src.callsign,
            digi,
            command: dest.c_bit && !src.c_bit,
            frame_type,
            pf,
            nr,
            ns,
            pid,
            info,
        })
    }

    /// Serialize this frame into a fresh byte vector
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::new_autoexpand(AX25_ADDR_LEN * 3 + 2 + self.info.len());

        Ax25Address { callsign: self.dest.clone(), c_bit: self.command, last: false }.to_buf(&mut buffer);
        Ax25Address { callsign: self.src.clone(), c_bit: !self.command, last: self.digi.is_none() }.to_buf(&mut buffer);
        if let Some(digi) = &self.digi {
            Ax25Address { callsign: digi.clone(), c_bit: false, last: true }.to_buf(&mut buffer);
        }

        buffer.write_u8(self.control());
        if self.frame_type.has_pid() {
            buffer.write_u8(self.pid.unwrap_or(Ax25Pid::NoProtocol.into_raw()));
        }
        buffer.write_bytes(&self.info);
        buffer.into_bytes()
    }

    /// Control byte for this frame
    pub fn control(&self) -> u8 {
        let pf = if self.pf { 0x10 } else { 0x00 };
        match self.frame_type {
            Ax25FrameType::I => (self.nr << 5) | pf | (self.ns << 1),
            ft if ft.is_supervisory() => (self.nr << 5) | pf | ft.into_raw() as u8,
            ft => ft.into_raw() as u8 | pf,
        }
    }
}

impl fmt::Display for Ax25Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}>{} {} {}", self.src, self.dest, self.frame_type, if self.command { "C" } else { "R" })?;
        if self.pf {
            write!(f, "{}", if self.command { " P" } else { " F" })?;
        }
        match self.frame_type {
            Ax25FrameType::I => write!(f, " NR={} NS={}", self.nr, self.ns)?,
            ft if ft.is_supervisory() => write!(f, " NR={}", self.nr)?,
            _ => {}
        }
        if let Some(pid) = self.pid {
            write!(f, " pid={:02X}", pid)?;
        }
        if !self.info.is_empty() {
            write!(f, " len={}", self.info.len())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Ax25Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Ax25Frame {{ {} }}", self)
    }
}

#[cfg(test)]
mod tests {
    use pacsat_core::debug;

    use super::*;

    fn call(s: &str) -> Callsign {
        Callsign::parse(s).unwrap()
    }

    #[test]
    fn test_sabm() {
        debug::setup_logging_verbose();
        let frame = Ax25Frame::new_u(call("PACSAT-12"), call("N0CALL"), Ax25FrameType::Sabm, true, true);
        let bytes = frame.to_bytes();
        tracing::info!("Serialized: {:02X?}", bytes);
        assert_eq!(bytes.len(), 15);
        assert_eq!(bytes[14], 0x3F);
        assert_eq!(bytes[6] & 0x80, 0x80, "dest C bit set on command");
        assert_eq!(bytes[13] & 0x81, 0x01, "src C bit clear, extension bit set");

        let parsed = Ax25Frame::from_bytes(&bytes).unwrap();
        tracing::info!("Parsed: {}", parsed);
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_i_frame_fields() {
        let frame = Ax25Frame::new_i(call("PACSAT-12"), call("N0CALL"), 5, 3, false, 0xF0, vec![1, 2, 3]);
        assert_eq!(frame.control(), 0xA6);
        let parsed = Ax25Frame::from_bytes(&frame.to_bytes()).unwrap();
        assert_eq!(parsed.nr, 5);
        assert_eq!(parsed.ns, 3);
        assert_eq!(parsed.pid, Some(0xF0));
        assert_eq!(parsed.info, vec![1, 2, 3]);
    }

    #[test]
    fn test_response_rr() {
        let frame = Ax25Frame::new_s(call("N0CALL"), call("PACSAT-12"), Ax25FrameType::Rr, false, true, 7);
        let parsed = Ax25Frame::from_bytes(&frame.to_bytes()).unwrap();
        assert!(!parsed.command);
        assert!(parsed.pf);
        assert_eq!(parsed.nr, 7);
        assert_eq!(parsed.frame_type, Ax25FrameType::Rr);
    }

    #[test]
    fn test_digipeated_ui() {
        let mut frame = Ax25Frame::new_ui(call("PACSAT-11"), call("G4ABC"), Ax25Pid::File, vec![0u8; 10]);
        frame.digi = Some(call("PACSAT-1"));
        let bytes = frame.to_bytes();
        assert_eq!(bytes.len(), 21 + 2 + 10);
        let parsed = Ax25Frame::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.digi, Some(call("PACSAT-1")));
        assert_eq!(parsed.pid, Some(0xBB));
    }

    #[test]
    fn test_rejects() {
        let frame = Ax25Frame::new_u(call("PACSAT-12"), call("N0CALL"), Ax25FrameType::Sabm, true, true);
        let bytes = frame.to_bytes();

        // Too short
        assert!(matches!(Ax25Frame::from_bytes(&bytes[..14]), Err(PduParseErr::InconsistentLength { .. })));

        // Unknown control
        let mut bad = bytes.clone();
        bad[14] = 0x07;
        assert!(matches!(Ax25Frame::from_bytes(&bad), Err(PduParseErr::InvalidValue { field: "control", .. })));

        // UI without pid
        let mut bad = bytes.clone();
        bad[14] = 0x03;
        assert!(matches!(Ax25Frame::from_bytes(&bad), Err(PduParseErr::BufferEnded { field: Some("pid") })));

        // I frame above N1 still decodes, anything above the KISS frame limit does not
        let big = Ax25Frame::new_i(call("PACSAT-12"), call("N0CALL"), 0, 0, false, 0xF0, vec![0; 224]);
        assert_eq!(Ax25Frame::from_bytes(&big.to_bytes()).unwrap().info.len(), 224);
        let huge = Ax25Frame::new_i(call("PACSAT-12"), call("N0CALL"), 0, 0, false, 0xF0, vec![0; 400]);
        assert!(matches!(Ax25Frame::from_bytes(&huge.to_bytes()), Err(PduParseErr::TooLong { .. })));
    }
}
