use pacsat_config::SharedConfig;
use pacsat_core::pacsat_entities::PacsatEntity;
use pacsat_core::{PacsatTime, Sap};
use pacsat_pdus::ax25::enums::pid::Ax25Pid;
use pacsat_pdus::ax25::frame::Ax25Frame;
use pacsat_pdus::ax25::well_known;
use pacsat_saps::lm::LmTxReq;
use pacsat_saps::{SapMsg, SapMsgInner};

use crate::datalink::components::dl_session::{DlParams, DlSession};
use crate::{MessageQueue, PacsatEntityTrait};

/// Data link entity. Owns one AX.25 session per radio channel, so at most one
/// uploading station per channel.
pub struct DataLinkBs {
    config: SharedConfig,
    sessions: Vec<DlSession>,
    /// Next "Open" status beacon, set on the first tick
    next_status: Option<PacsatTime>,
}

impl DataLinkBs {
    pub fn new(config: SharedConfig) -> Self {
        let sessions = Self::make_sessions(&config);
        Self { config, sessions, next_status: None }
    }

    fn make_sessions(config: &SharedConfig) -> Vec<DlSession> {
        let cfg = config.config();
        let params = DlParams::from(&cfg.datalink);
        (0..cfg.radio.num_channels)
            .map(|channel| DlSession::new(channel, cfg.identity.bbs.clone(), params))
            .collect()
    }

    pub fn session(&self, channel: usize) -> Option<&DlSession> {
        self.sessions.get(channel)
    }

    fn rx_lm_frame_ind(&mut self, queue: &mut MessageQueue, mut message: SapMsg) {
        tracing::trace!("rx_lm_frame_ind");
        let SapMsgInner::LmFrameInd(prim) = &mut message.msg else {panic!()};

        let Some(session) = self.sessions.get_mut(prim.channel as usize) else {
            tracing::warn!("rx_lm_frame_ind: frame on unknown channel {}", prim.channel);
            return;
        };

        let frame = prim.frame.clone();
        if session.is_busy_for(&frame.src) {
            tracing::info!(ch = session.channel, "busy with {:?}, refusing {}", session.peer, frame.src);
            if frame.command {
                session.send_busy_dm(queue, message.ts, &frame);
            }
            return;
        }
        session.rx_frame(queue, message.ts, frame);
    }

    fn rx_dl_data_req(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        tracing::trace!("rx_dl_data_req");
        let SapMsgInner::DlDataReq(prim) = message.msg else {panic!()};

        match self.sessions.get_mut(prim.channel as usize) {
            Some(session) => {
                session.dl_data_req(queue, message.ts, prim.data);
            }
            None => tracing::warn!("rx_dl_data_req: unknown channel {}", prim.channel),
        }
    }

    fn rx_dl_disconnect_req(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        tracing::trace!("rx_dl_disconnect_req");
        let SapMsgInner::DlDisconnectReq(prim) = &message.msg else {panic!()};

        match self.sessions.get_mut(prim.channel as usize) {
            Some(session) => session.dl_disconnect_req(queue, message.ts),
            None => tracing::warn!("rx_dl_disconnect_req: unknown channel {}", prim.channel),
        }
    }

    /// "Open ABCD." style beacon, a letter per free channel, a space per busy one
    fn status_text(&self) -> Vec<u8> {
        let mut text = b"Open ".to_vec();
        for session in &self.sessions {
            text.push(if session.is_free() { b'A' + session.channel } else { b' ' });
        }
        text.push(b'.');
        text
    }

    fn send_status(&mut self, queue: &mut MessageQueue, ts: PacsatTime) {
        let period = self.config.config().datalink.status_period_secs;
        let Some(deadline) = self.next_status else {
            self.next_status = Some(ts.add_secs(period));
            return;
        };
        if ts < deadline {
            return;
        }
        self.next_status = Some(ts.add_secs(period));

        if !self.config.state_read().uplink_enabled {
            return;
        }
        if !self.sessions.iter().any(|s| s.is_free()) {
            tracing::debug!("send_status: all channels busy");
            return;
        }

        let bbs = self.config.config().identity.bbs.clone();
        let frame = Ax25Frame::new_ui(well_known::bbs_stat(), bbs, Ax25Pid::NoProtocol, self.status_text());
        tracing::debug!("-> {}", frame);
        queue.push_back(SapMsg {
            sap: Sap::LmSap,
            src: PacsatEntity::DataLink,
            dest: PacsatEntity::Radio,
            ts,
            msg: SapMsgInner::LmTxReq(LmTxReq { channel: 0, data: frame.to_bytes(), expedited: false }),
        });
    }
}

impl PacsatEntityTrait for DataLinkBs {
    fn entity(&self) -> PacsatEntity {
        PacsatEntity::DataLink
    }

    fn set_config(&mut self, config: SharedConfig) {
        self.config = config;
    }

    fn tick_start(&mut self, queue: &mut MessageQueue, ts: PacsatTime) {
        for session in self.sessions.iter_mut() {
            session.tick(queue, ts);
        }
        self.send_status(queue, ts);
    }

    fn tick_end(&mut self, queue: &mut MessageQueue, ts: PacsatTime) -> bool {
        for session in self.sessions.iter_mut() {
            session.flush(queue, ts);
        }
        false
    }

    fn rx_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        tracing::debug!("rx_prim: {}", message.msg);

        match message.sap {
            Sap::LmSap => match message.msg {
                SapMsgInner::LmFrameInd(_) => {
                    self.rx_lm_frame_ind(queue, message);
                }
                _ => {
                    panic!();
                }
            },
            Sap::DlSap => match message.msg {
                SapMsgInner::DlDataReq(_) => {
                    self.rx_dl_data_req(queue, message);
                }
                SapMsgInner::DlDisconnectReq(_) => {
                    self.rx_dl_disconnect_req(queue, message);
                }
                _ => {
                    panic!();
                }
            },
        }
    }
}
