use std::collections::VecDeque;

use pacsat_config::CfgDataLink;
use pacsat_core::pacsat_entities::PacsatEntity;
use pacsat_core::pacsat_time::TICKS_PER_SECOND;
use pacsat_core::{Callsign, ChannelId, PacsatTime, Sap, unimplemented_log};
use pacsat_pdus::ax25::AX25_MAX_INFO_BYTES_LEN;
use pacsat_pdus::ax25::enums::frame_type::Ax25FrameType;
use pacsat_pdus::ax25::enums::pid::Ax25Pid;
use pacsat_pdus::ax25::frame::Ax25Frame;
use pacsat_saps::dl::*;
use pacsat_saps::lm::LmTxReq;
use pacsat_saps::{SapMsg, SapMsgInner};

use crate::MessageQueue;

const MODULO: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlState {
    Disconnected,
    AwaitingConnection,
    AwaitingRelease,
    Connected,
    TimerRecovery,
    /// AX.25 v2.2 link setup. SABME is always refused, so this is never entered
    AwaitingExtendedConnection,
}

#[derive(Debug, Clone, Copy)]
pub struct DlParams {
    pub t1_ticks: u64,
    pub t3_ticks: u64,
    pub n2: u8,
    pub k: u8,
    pub queue_len: usize,
}

impl From<&CfgDataLink> for DlParams {
    fn from(cfg: &CfgDataLink) -> Self {
        Self {
            t1_ticks: cfg.t1_secs * TICKS_PER_SECOND,
            t3_ticks: cfg.t3_secs * TICKS_PER_SECOND,
            n2: cfg.n2_retries,
            k: cfg.window_k,
            queue_len: cfg.iframe_queue_len,
        }
    }
}

/// AX.25 v2.0 (modulo 8) data link state machine for one channel.
///
/// Link frames go out as LmTxReq to the radio, indications go up to the Uplink.
/// Timers are deadlines checked by `tick`.
pub struct DlSession {
    pub channel: ChannelId,
    bbs: Callsign,
    params: DlParams,

    pub state: DlState,
    /// The station occupying this channel
    pub peer: Option<Callsign>,
    /// Time of the event being processed
    now: PacsatTime,

    vs: u8,
    va: u8,
    vr: u8,
    rc: u8,

    peer_busy: bool,
    reject_exception: bool,
    ack_pending: bool,
    layer3_initiated: bool,

    t1: Option<PacsatTime>,
    t3: Option<PacsatTime>,

    /// Information fields waiting for transmission
    iframe_queue: VecDeque<Vec<u8>>,
    /// Information fields sent, indexed by N(S), kept for retransmission
    sent: [Option<Vec<u8>>; MODULO as usize],
}

impl DlSession {
    pub fn new(channel: ChannelId, bbs: Callsign, params: DlParams) -> Self {
        Self {
            channel,
            bbs,
            params,
            state: DlState::Disconnected,
            peer: None,
            now: PacsatTime::default(),
            vs: 0,
            va: 0,
            vr: 0,
            rc: 0,
            peer_busy: false,
            reject_exception: false,
            ack_pending: false,
            layer3_initiated: false,
            t1: None,
            t3: None,
            iframe_queue: VecDeque::new(),
            sent: Default::default(),
        }
    }

    /// A new station may claim the channel
    pub fn is_free(&self) -> bool {
        self.state == DlState::Disconnected
    }

    /// The channel is held by a station other than `callsign`
    pub fn is_busy_for(&self, callsign: &Callsign) -> bool {
        !self.is_free() && self.peer.as_ref() != Some(callsign)
    }

    pub fn queued(&self) -> usize {
        self.iframe_queue.len()
    }

    /// (V(S), V(A), V(R))
    pub fn seq_vars(&self) -> (u8, u8, u8) {
        (self.vs, self.va, self.vr)
    }

    // ─── Output helpers ───────────────────────────────────────────

    fn send(&self, queue: &mut MessageQueue, frame: Ax25Frame) {
        tracing::debug!(ch = self.channel, "-> {}", frame);
        queue.push_back(SapMsg {
            sap: Sap::LmSap,
            src: PacsatEntity::DataLink,
            dest: PacsatEntity::Radio,
            ts: self.now,
            msg: SapMsgInner::LmTxReq(LmTxReq { channel: self.channel, data: frame.to_bytes(), expedited: true }),
        });
    }

    fn send_u(&self, queue: &mut MessageQueue, frame_type: Ax25FrameType, command: bool, pf: bool) {
        let Some(peer) = self.peer.clone() else {
            tracing::warn!(ch = self.channel, "no peer to send {:?} to", frame_type);
            return;
        };
        self.send(queue, Ax25Frame::new_u(peer, self.bbs.clone(), frame_type, command, pf));
    }

    fn send_s(&self, queue: &mut MessageQueue, frame_type: Ax25FrameType, command: bool, pf: bool) {
        let Some(peer) = self.peer.clone() else {
            tracing::warn!(ch = self.channel, "no peer to send {:?} to", frame_type);
            return;
        };
        self.send(queue, Ax25Frame::new_s(peer, self.bbs.clone(), frame_type, command, pf, self.vr));
    }

    /// FRMR response. The information field names the rejected control byte and our
    /// state variables, with W set: control field undefined or not implemented.
    fn send_frmr(&self, queue: &mut MessageQueue, rejected: &Ax25Frame) {
        let Some(peer) = self.peer.clone() else {
            return;
        };
        let cr = if rejected.command { 0x00 } else { 0x10 };
        let mut frame = Ax25Frame::new_u(peer, self.bbs.clone(), Ax25FrameType::Frmr, false, rejected.pf);
        frame.info = vec![rejected.control(), (self.vr << 5) | cr | (self.vs << 1), 0x01];
        self.send(queue, frame);
    }

    /// Sends a DL primitive for the current peer up to the Uplink
    fn upward(&self, queue: &mut MessageQueue, make: impl FnOnce(ChannelId, Callsign) -> SapMsgInner) {
        let Some(callsign) = self.peer.clone() else {
            tracing::warn!(ch = self.channel, "no peer for indication");
            return;
        };
        queue.push_back(SapMsg {
            sap: Sap::DlSap,
            src: PacsatEntity::DataLink,
            dest: PacsatEntity::Uplink,
            ts: self.now,
            msg: make(self.channel, callsign),
        });
    }

    fn error(&self, queue: &mut MessageQueue, code: DlErrorCode) {
        tracing::info!(ch = self.channel, "data link error {}", code);
        self.upward(queue, |channel, callsign| SapMsgInner::DlErrorInd(DlErrorInd { channel, callsign, code }));
    }

    fn connect_ind(&self, queue: &mut MessageQueue) {
        self.upward(queue, |channel, callsign| SapMsgInner::DlConnectInd(DlConnectInd { channel, callsign }));
    }

    fn connect_conf(&self, queue: &mut MessageQueue) {
        self.upward(queue, |channel, callsign| SapMsgInner::DlConnectConf(DlConnectConf { channel, callsign }));
    }

    fn disconnect_ind(&self, queue: &mut MessageQueue) {
        self.upward(queue, |channel, callsign| SapMsgInner::DlDisconnectInd(DlDisconnectInd { channel, callsign }));
    }

    fn disconnect_conf(&self, queue: &mut MessageQueue) {
        self.upward(queue, |channel, callsign| SapMsgInner::DlDisconnectConf(DlDisconnectConf { channel, callsign }));
    }

    // ─── Timers and variables ─────────────────────────────────────

    fn start_t1(&mut self) {
        self.t1 = Some(self.now.add_ticks(self.params.t1_ticks));
    }

    fn stop_t1(&mut self) {
        self.t1 = None;
    }

    fn start_t3(&mut self) {
        self.t3 = Some(self.now.add_ticks(self.params.t3_ticks));
    }

    fn stop_t3(&mut self) {
        self.t3 = None;
    }

    fn reset_vars(&mut self) {
        self.vs = 0;
        self.va = 0;
        self.vr = 0;
        self.rc = 0;
        self.sent = Default::default();
    }

    fn discard_queue(&mut self) {
        if !self.iframe_queue.is_empty() {
            tracing::debug!(ch = self.channel, "discarding {} queued I frames", self.iframe_queue.len());
        }
        self.iframe_queue.clear();
    }

    fn clear_exceptions(&mut self) {
        self.peer_busy = false;
        self.reject_exception = false;
        self.ack_pending = false;
        self.discard_queue();
    }

    fn to_disconnected(&mut self) {
        tracing::info!(ch = self.channel, "{:?} disconnected", self.peer);
        self.state = DlState::Disconnected;
        self.stop_t1();
        self.stop_t3();
        self.discard_queue();
        self.reset_vars();
        self.peer = None;
    }

    /// V(A) <= N(R) <= V(S), modulo 8
    fn nr_valid(&self, nr: u8) -> bool {
        nr.wrapping_sub(self.va) % MODULO <= self.vs.wrapping_sub(self.va) % MODULO
    }

    // ─── AX.25 procedures ─────────────────────────────────────────

    fn establish_data_link(&mut self, queue: &mut MessageQueue) {
        self.clear_exceptions();
        self.rc = 1;
        self.send_u(queue, Ax25FrameType::Sabm, true, true);
        self.stop_t3();
        self.start_t1();
    }

    fn clear_layer3_initiated(&mut self, queue: &mut MessageQueue) {
        self.disconnect_conf(queue);
        self.layer3_initiated = false;
    }

    /// Link reset after an error: re-establish and tell the Uplink the old link is gone
    fn reset_link(&mut self, queue: &mut MessageQueue) {
        self.establish_data_link(queue);
        self.clear_layer3_initiated(queue);
        self.state = DlState::AwaitingConnection;
    }

    fn nr_error_recovery(&mut self, queue: &mut MessageQueue) {
        self.error(queue, DlErrorCode::J);
        self.reset_link(queue);
    }

    /// RR (F=`f`) with our V(R)
    fn enquiry_response(&mut self, queue: &mut MessageQueue, f: bool) {
        self.send_s(queue, Ax25FrameType::Rr, false, f);
        self.ack_pending = false;
    }

    /// RR command with P=1, polling the peer
    fn transmit_enquiry(&mut self, queue: &mut MessageQueue) {
        self.send_s(queue, Ax25FrameType::Rr, true, true);
        self.ack_pending = false;
        self.start_t1();
    }

    fn check_need_for_response(&mut self, queue: &mut MessageQueue, frame: &Ax25Frame) {
        if frame.command && frame.pf {
            self.enquiry_response(queue, true);
        } else if !frame.command && frame.pf {
            self.error(queue, DlErrorCode::A);
        }
    }

    fn check_iframes_acked(&mut self, nr: u8) {
        if self.peer_busy {
            self.va = nr;
            self.start_t3();
            if self.t1.is_none() {
                self.start_t1();
            }
        } else if nr == self.vs {
            self.va = nr;
            self.stop_t1();
            self.start_t3();
        } else if nr != self.va {
            self.va = nr;
            self.start_t1();
        }
    }

    /// Puts the frames from N(R) up to V(S) back in front of the queue, oldest first
    fn invoke_retransmission(&mut self, nr: u8) {
        tracing::debug!(ch = self.channel, "retransmit from {} (V(S) {})", nr, self.vs);
        let mut vs = self.vs;
        while vs != nr {
            vs = vs.wrapping_sub(1) % MODULO;
            match self.sent[vs as usize].clone() {
                Some(info) => self.iframe_queue.push_front(info),
                None => tracing::warn!(ch = self.channel, "no copy of I frame {} to retransmit", vs),
            }
        }
        self.vs = nr;
    }

    // ─── Frame input ──────────────────────────────────────────────

    /// Processes a frame from the peer. The caller has checked that the channel is not
    /// busy for the sender.
    pub fn rx_frame(&mut self, queue: &mut MessageQueue, ts: PacsatTime, frame: Ax25Frame) {
        self.now = ts;
        tracing::trace!(
            ch = self.channel,
            "{:?} VS={} VA={} VR={} RC={} <- {}",
            self.state, self.vs, self.va, self.vr, self.rc, frame
        );

        match self.state {
            DlState::Disconnected => self.rx_disconnected(queue, frame),
            DlState::AwaitingConnection => self.rx_awaiting_connection(queue, frame),
            DlState::AwaitingRelease => self.rx_awaiting_release(queue, frame),
            DlState::Connected | DlState::TimerRecovery => self.rx_connected(queue, frame),
            DlState::AwaitingExtendedConnection => {
                unimplemented_log!("ch {}: frame in AwaitingExtendedConnection", self.channel);
            }
        }
    }

    fn rx_disconnected(&mut self, queue: &mut MessageQueue, frame: Ax25Frame) {
        self.peer = Some(frame.src.clone());

        match frame.frame_type {
            Ax25FrameType::Sabm => {
                self.send_u(queue, Ax25FrameType::Ua, false, frame.pf);
                self.clear_exceptions();
                self.reset_vars();
                self.layer3_initiated = false;
                self.connect_ind(queue);
                self.stop_t1();
                self.start_t3();
                self.state = DlState::Connected;
                tracing::info!(ch = self.channel, "connected to {}", frame.src);
            }
            Ax25FrameType::Sabme => {
                self.send_frmr(queue, &frame);
            }
            Ax25FrameType::Disc => {
                self.send_u(queue, Ax25FrameType::Dm, false, frame.pf);
            }
            _ if frame.command => {
                self.send_u(queue, Ax25FrameType::Dm, false, frame.pf);
            }
            _ => {
                tracing::debug!(ch = self.channel, "ignoring {} while disconnected", frame);
            }
        }

        if self.state == DlState::Disconnected {
            self.peer = None;
        }
    }

    fn rx_awaiting_connection(&mut self, queue: &mut MessageQueue, frame: Ax25Frame) {
        match frame.frame_type {
            Ax25FrameType::Ui => {
                if frame.pf {
                    self.send_u(queue, Ax25FrameType::Dm, false, true);
                }
            }
            Ax25FrameType::Sabm => {
                self.send_u(queue, Ax25FrameType::Ua, false, frame.pf);
            }
            Ax25FrameType::Sabme => {
                self.send_frmr(queue, &frame);
            }
            Ax25FrameType::Disc => {
                self.send_u(queue, Ax25FrameType::Dm, false, frame.pf);
            }
            Ax25FrameType::Dm => {
                if frame.pf {
                    self.discard_queue();
                    self.disconnect_ind(queue);
                    self.to_disconnected();
                }
            }
            Ax25FrameType::Ua => {
                if frame.pf {
                    if self.layer3_initiated {
                        self.connect_conf(queue);
                    } else {
                        self.connect_ind(queue);
                        self.layer3_initiated = true;
                    }
                    self.stop_t1();
                    self.start_t3();
                    self.reset_vars();
                    self.state = DlState::Connected;
                } else {
                    self.error(queue, DlErrorCode::D);
                }
            }
            _ => {
                tracing::debug!(ch = self.channel, "ignoring {} while awaiting connection", frame);
            }
        }
    }

    fn rx_awaiting_release(&mut self, queue: &mut MessageQueue, frame: Ax25Frame) {
        match frame.frame_type {
            Ax25FrameType::Ua => {
                if frame.pf {
                    self.disconnect_conf(queue);
                    self.to_disconnected();
                } else {
                    self.error(queue, DlErrorCode::D);
                }
            }
            Ax25FrameType::Dm => {
                if frame.pf {
                    self.disconnect_conf(queue);
                    self.to_disconnected();
                }
            }
            Ax25FrameType::Sabm => {
                self.send_u(queue, Ax25FrameType::Dm, false, frame.pf);
            }
            Ax25FrameType::Sabme => {
                self.send_frmr(queue, &frame);
            }
            Ax25FrameType::Disc => {
                self.send_u(queue, Ax25FrameType::Ua, false, frame.pf);
            }
            Ax25FrameType::Ui | Ax25FrameType::I | Ax25FrameType::Rr | Ax25FrameType::Rnr | Ax25FrameType::Rej => {
                if frame.pf {
                    self.send_u(queue, Ax25FrameType::Dm, false, true);
                }
            }
            Ax25FrameType::Srej => {
                if frame.command && frame.pf {
                    self.send_u(queue, Ax25FrameType::Dm, false, true);
                }
            }
            _ => {
                tracing::debug!(ch = self.channel, "ignoring {} while awaiting release", frame);
            }
        }
    }

    /// Connected and TimerRecovery. Only the handling of RR, RNR and REJ differs.
    fn rx_connected(&mut self, queue: &mut MessageQueue, frame: Ax25Frame) {
        let timer_recovery = self.state == DlState::TimerRecovery;

        match frame.frame_type {
            Ax25FrameType::Sabm => {
                self.send_u(queue, Ax25FrameType::Ua, false, frame.pf);
                self.clear_exceptions();
                self.error(queue, DlErrorCode::F);
                self.stop_t1();
                self.start_t3();
                self.reset_vars();
                self.state = DlState::Connected;
            }
            Ax25FrameType::Sabme => {
                self.send_frmr(queue, &frame);
            }
            Ax25FrameType::Frmr => {
                self.error(queue, DlErrorCode::K);
                self.reset_link(queue);
            }
            Ax25FrameType::Ua => {
                self.error(queue, DlErrorCode::C);
                self.reset_link(queue);
            }
            Ax25FrameType::Ui => {
                tracing::debug!(ch = self.channel, "ignoring UI on connected link");
            }
            Ax25FrameType::Disc => {
                self.discard_queue();
                self.send_u(queue, Ax25FrameType::Ua, false, frame.pf);
                self.disconnect_ind(queue);
                self.to_disconnected();
            }
            Ax25FrameType::Dm => {
                self.error(queue, DlErrorCode::E);
                self.disconnect_conf(queue);
                self.to_disconnected();
            }
            Ax25FrameType::Rr | Ax25FrameType::Rnr => {
                self.peer_busy = frame.frame_type == Ax25FrameType::Rnr;
                if timer_recovery {
                    self.rx_supervisory_timer_recovery(queue, &frame);
                } else {
                    self.check_need_for_response(queue, &frame);
                    if self.nr_valid(frame.nr) {
                        self.check_iframes_acked(frame.nr);
                    } else {
                        self.nr_error_recovery(queue);
                    }
                }
            }
            Ax25FrameType::Rej => {
                self.peer_busy = false;
                if timer_recovery {
                    self.rx_supervisory_timer_recovery(queue, &frame);
                } else {
                    self.check_need_for_response(queue, &frame);
                    if self.nr_valid(frame.nr) {
                        self.va = frame.nr;
                        self.stop_t1();
                        self.stop_t3();
                        self.ack_pending = false;
                        self.invoke_retransmission(frame.nr);
                        if self.vs == self.va && self.iframe_queue.is_empty() {
                            self.start_t3();
                        }
                    } else {
                        self.nr_error_recovery(queue);
                    }
                }
            }
            Ax25FrameType::I => {
                let final_state = self.state;
                self.process_iframe(queue, frame, final_state);
            }
            Ax25FrameType::Srej | Ax25FrameType::Xid | Ax25FrameType::Test => {
                unimplemented_log!("ch {}: {:?} on connected link", self.channel, frame.frame_type);
                self.error(queue, DlErrorCode::L);
            }
        }
    }

    /// RR, RNR and REJ in TimerRecovery. A response with F=1 answers our poll.
    fn rx_supervisory_timer_recovery(&mut self, queue: &mut MessageQueue, frame: &Ax25Frame) {
        if frame.command && frame.pf {
            self.enquiry_response(queue, true);
        }
        if !self.nr_valid(frame.nr) {
            self.nr_error_recovery(queue);
            return;
        }

        self.va = frame.nr;
        if !frame.command && frame.pf {
            self.stop_t1();
            if self.vs == self.va {
                self.start_t3();
                self.rc = 0;
                self.state = DlState::Connected;
            } else {
                self.invoke_retransmission(frame.nr);
                self.stop_t3();
                self.start_t1();
            }
        } else if frame.frame_type == Ax25FrameType::Rej && self.vs != self.va {
            self.invoke_retransmission(frame.nr);
            self.stop_t3();
            self.start_t1();
            self.ack_pending = false;
        }
    }

    fn process_iframe(&mut self, queue: &mut MessageQueue, frame: Ax25Frame, final_state: DlState) {
        if !frame.command {
            self.error(queue, DlErrorCode::S);
            return;
        }
        if frame.info.len() > AX25_MAX_INFO_BYTES_LEN {
            self.error(queue, DlErrorCode::O);
            self.reset_link(queue);
            return;
        }
        if !self.nr_valid(frame.nr) {
            self.nr_error_recovery(queue);
            return;
        }

        self.check_iframes_acked(frame.nr);

        if frame.ns == self.vr {
            self.vr = (self.vr + 1) % MODULO;
            self.reject_exception = false;
            let data = frame.info;
            self.upward(queue, |channel, callsign| SapMsgInner::DlDataInd(DlDataInd { channel, callsign, data }));
            if frame.pf {
                self.enquiry_response(queue, true);
            } else {
                // Acknowledged by the next I frame, or an RR at the end of the tick
                self.ack_pending = true;
            }
        } else if self.reject_exception {
            if frame.pf {
                self.enquiry_response(queue, true);
            }
        } else {
            tracing::debug!(ch = self.channel, "N(S) {} out of sequence, expected {}", frame.ns, self.vr);
            self.reject_exception = true;
            self.send_s(queue, Ax25FrameType::Rej, false, frame.pf);
            self.ack_pending = false;
        }
        self.state = final_state;
    }

    // ─── Layer 3 requests ─────────────────────────────────────────

    /// Queues information for the peer. Returns false if the queue is full.
    pub fn dl_data_req(&mut self, queue: &mut MessageQueue, ts: PacsatTime, data: Vec<u8>) -> bool {
        self.now = ts;
        match self.state {
            DlState::Connected | DlState::TimerRecovery | DlState::AwaitingConnection => {}
            _ => {
                tracing::debug!(ch = self.channel, "dropping data request in {:?}", self.state);
                return true;
            }
        }
        if self.iframe_queue.len() >= self.params.queue_len {
            tracing::warn!(ch = self.channel, "I frame queue full, dropping {} bytes", data.len());
            self.error(queue, DlErrorCode::QueueFull);
            return false;
        }
        self.iframe_queue.push_back(data);
        true
    }

    pub fn dl_disconnect_req(&mut self, queue: &mut MessageQueue, ts: PacsatTime) {
        self.now = ts;
        match self.state {
            DlState::Disconnected | DlState::AwaitingExtendedConnection => {
                tracing::debug!(ch = self.channel, "disconnect request, already disconnected");
            }
            DlState::AwaitingRelease => {
                self.send_u(queue, Ax25FrameType::Dm, false, false);
            }
            DlState::AwaitingConnection | DlState::Connected | DlState::TimerRecovery => {
                self.discard_queue();
                self.rc = 0;
                self.send_u(queue, Ax25FrameType::Disc, true, true);
                self.stop_t3();
                self.start_t1();
                self.state = DlState::AwaitingRelease;
            }
        }
    }

    // ─── Timers and transmission ──────────────────────────────────

    /// Runs expired timers
    pub fn tick(&mut self, queue: &mut MessageQueue, ts: PacsatTime) {
        self.now = ts;
        if self.t1.is_some_and(|deadline| ts >= deadline) {
            self.stop_t1();
            self.t1_expired(queue);
        }
        if self.t3.is_some_and(|deadline| ts >= deadline) {
            self.stop_t3();
            self.t3_expired(queue);
        }
    }

    fn t1_expired(&mut self, queue: &mut MessageQueue) {
        tracing::debug!(ch = self.channel, "T1 expired in {:?}, RC={}", self.state, self.rc);
        match self.state {
            DlState::AwaitingConnection => {
                if self.rc >= self.params.n2 {
                    self.discard_queue();
                    self.error(queue, DlErrorCode::G);
                    self.disconnect_ind(queue);
                    self.to_disconnected();
                } else {
                    self.rc += 1;
                    self.send_u(queue, Ax25FrameType::Sabm, true, true);
                    self.start_t1();
                }
            }
            DlState::AwaitingRelease => {
                if self.rc >= self.params.n2 {
                    self.error(queue, DlErrorCode::G);
                    self.disconnect_ind(queue);
                    self.to_disconnected();
                } else {
                    self.rc += 1;
                    self.send_u(queue, Ax25FrameType::Disc, true, true);
                    self.start_t1();
                }
            }
            DlState::Connected => {
                self.rc = 1;
                self.transmit_enquiry(queue);
                self.state = DlState::TimerRecovery;
            }
            DlState::TimerRecovery => {
                if self.rc >= self.params.n2 {
                    let code = if self.va != self.vs {
                        DlErrorCode::I
                    } else if self.peer_busy {
                        DlErrorCode::U
                    } else {
                        DlErrorCode::T
                    };
                    self.error(queue, code);
                    self.disconnect_conf(queue);
                    self.discard_queue();
                    self.send_u(queue, Ax25FrameType::Dm, false, true);
                    self.to_disconnected();
                } else {
                    self.rc += 1;
                    self.transmit_enquiry(queue);
                }
            }
            DlState::Disconnected | DlState::AwaitingExtendedConnection => {}
        }
    }

    fn t3_expired(&mut self, queue: &mut MessageQueue) {
        if self.state == DlState::Connected {
            tracing::debug!(ch = self.channel, "T3 expired, polling {:?}", self.peer);
            self.rc = 1;
            self.transmit_enquiry(queue);
            self.state = DlState::TimerRecovery;
        }
    }

    /// End of tick: sends at most one queued I frame if the window allows, then any
    /// acknowledgement still pending
    pub fn flush(&mut self, queue: &mut MessageQueue, ts: PacsatTime) {
        self.now = ts;
        if !matches!(self.state, DlState::Connected | DlState::TimerRecovery) {
            return;
        }

        let window_full = self.vs == (self.va + self.params.k) % MODULO;
        if !self.peer_busy && !window_full {
            if let (Some(info), Some(peer)) = (self.iframe_queue.pop_front(), self.peer.clone()) {
                let frame = Ax25Frame::new_i(
                    peer,
                    self.bbs.clone(),
                    self.vr,
                    self.vs,
                    false,
                    Ax25Pid::NoProtocol.into_raw(),
                    info.clone(),
                );
                self.send(queue, frame);
                self.sent[self.vs as usize] = Some(info);
                self.vs = (self.vs + 1) % MODULO;
                self.ack_pending = false;
                if self.t1.is_none() {
                    self.stop_t3();
                    self.start_t1();
                }
            }
        }

        if self.ack_pending {
            self.enquiry_response(queue, false);
        }
    }

    /// Answers a station that addressed this channel while another one holds it
    pub fn send_busy_dm(&self, queue: &mut MessageQueue, ts: PacsatTime, frame: &Ax25Frame) {
        let mut dm = Ax25Frame::new_u(frame.src.clone(), self.bbs.clone(), Ax25FrameType::Dm, false, frame.pf);
        dm.digi = None;
        tracing::debug!(ch = self.channel, "busy, {} refused", frame.src);
        queue.push_back(SapMsg {
            sap: Sap::LmSap,
            src: PacsatEntity::DataLink,
            dest: PacsatEntity::Radio,
            ts,
            msg: SapMsgInner::LmTxReq(LmTxReq { channel: self.channel, data: dm.to_bytes(), expedited: true }),
        });
    }
}
