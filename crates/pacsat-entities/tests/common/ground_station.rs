use pacsat_config::CfgIdentity;
use pacsat_core::{ByteBuffer, Callsign, ChannelId};
use pacsat_pdus::ax25::enums::frame_type::Ax25FrameType;
use pacsat_pdus::ax25::enums::pid::Ax25Pid;
use pacsat_pdus::ax25::frame::Ax25Frame;
use pacsat_pdus::ftl0::enums::ftl0_packet_type::Ftl0PacketType;
use pacsat_pdus::ftl0::ftl0_header::Ftl0Header;
use pacsat_pdus::ftl0::pdus::ul_go_resp::UlGoResp;
use pacsat_pdus::ftl0::pdus::ul_status_resp::UlStatusResp;
use pacsat_pdus::ftl0::pdus::upload_cmd::UploadCmd;

use super::ComponentTest;

/// Minimal connected-mode peer: sends in-sequence I frames and tracks what the
/// server sends back
pub struct GroundStation {
    pub call: Callsign,
    pub channel: ChannelId,
    bbs: Callsign,
    vs: u8,
    vr: u8,
}

impl GroundStation {
    pub fn new(call: &str, channel: ChannelId) -> Self {
        Self {
            call: Callsign::parse(call).unwrap(),
            channel,
            bbs: CfgIdentity::default().bbs,
            vs: 0,
            vr: 0,
        }
    }

    pub fn sabm(&mut self) -> Ax25Frame {
        self.vs = 0;
        self.vr = 0;
        Ax25Frame::new_u(self.bbs.clone(), self.call.clone(), Ax25FrameType::Sabm, true, true)
    }

    pub fn disc(&self) -> Ax25Frame {
        Ax25Frame::new_u(self.bbs.clone(), self.call.clone(), Ax25FrameType::Disc, true, true)
    }

    pub fn iframe(&mut self, info: Vec<u8>) -> Ax25Frame {
        let frame = Ax25Frame::new_i(self.bbs.clone(), self.call.clone(), self.vr, self.vs, false, Ax25Pid::NoProtocol.into_raw(), info);
        self.vs = (self.vs + 1) % 8;
        frame
    }

    pub fn rr(&self) -> Ax25Frame {
        Ax25Frame::new_s(self.bbs.clone(), self.call.clone(), Ax25FrameType::Rr, false, false, self.vr)
    }

    /// Takes the frames addressed to this station. Returns the payloads of the
    /// in-sequence I frames.
    pub fn receive(&mut self, frames: &[(ChannelId, Ax25Frame)]) -> Vec<Vec<u8>> {
        let mut payloads = Vec::new();
        for (channel, frame) in frames {
            if *channel != self.channel || frame.dest != self.call {
                continue;
            }
            if frame.frame_type == Ax25FrameType::I && frame.ns == self.vr {
                self.vr = (self.vr + 1) % 8;
                payloads.push(frame.info.clone());
            }
        }
        payloads
    }

    /// Sends an I frame and runs the stack until the server's answers are in.
    /// Every server I frame is acknowledged.
    pub fn send(&mut self, test: &mut ComponentTest, info: Vec<u8>) -> Vec<Vec<u8>> {
        let frame = self.iframe(info);
        let frames = test.exchange(self.channel, &frame);
        let mut payloads = self.receive(&frames);
        payloads.extend(self.drain(test));
        payloads
    }

    /// Acknowledges until the server has nothing left to send
    pub fn drain(&mut self, test: &mut ComponentTest) -> Vec<Vec<u8>> {
        let mut payloads = Vec::new();
        for _ in 0..20 {
            let rr = self.rr();
            let frames = test.exchange(self.channel, &rr);
            let got = self.receive(&frames);
            if got.is_empty() {
                break;
            }
            payloads.extend(got);
        }
        payloads
    }

    /// Connects and returns the FTL0 packets received, LOGIN_RESP first
    pub fn connect(&mut self, test: &mut ComponentTest) -> Vec<Vec<u8>> {
        let sabm = self.sabm();
        let frames = test.exchange(self.channel, &sabm);
        assert!(
            frames.iter().any(|(_, f)| f.dest == self.call && f.frame_type == Ax25FrameType::Ua),
            "no UA for {}",
            self.call
        );
        let mut payloads = self.receive(&frames);
        payloads.extend(self.drain(test));
        payloads
    }

    pub fn upload_cmd(&mut self, test: &mut ComponentTest, continue_file_id: u32, file_length: u32) -> Vec<Vec<u8>> {
        self.send(test, UploadCmd { continue_file_id, file_length }.to_bytes())
    }

    pub fn data(&mut self, test: &mut ComponentTest, data: &[u8]) -> Vec<Vec<u8>> {
        self.send(test, Ftl0Header::encode_packet(Ftl0PacketType::Data, data))
    }

    pub fn data_end(&mut self, test: &mut ComponentTest) -> Vec<Vec<u8>> {
        self.send(test, Ftl0Header::encode_packet(Ftl0PacketType::DataEnd, &[]))
    }
}

pub fn go_resp(packet: &[u8]) -> UlGoResp {
    UlGoResp::from_buf(&mut ByteBuffer::from_bytes(packet)).unwrap()
}

pub fn status_resp(packet: &[u8]) -> UlStatusResp {
    UlStatusResp::from_buf(&mut ByteBuffer::from_bytes(packet)).unwrap()
}
