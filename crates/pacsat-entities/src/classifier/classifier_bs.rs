use pacsat_config::SharedConfig;
use pacsat_core::pacsat_entities::PacsatEntity;
use pacsat_core::Sap;
use pacsat_pdus::ax25::frame::Ax25Frame;
use pacsat_saps::lm::LmFrameInd;
use pacsat_saps::{SapMsg, SapMsgInner};

use crate::{MessageQueue, PacsatEntityTrait};

/// Decodes received frames and routes them on their destination address
pub struct ClassifierBs {
    config: SharedConfig,
    /// Frames dropped since start, either undecodable or not for us
    pub dropped: usize,
}

impl ClassifierBs {
    pub fn new(config: SharedConfig) -> Self {
        Self { config, dropped: 0 }
    }

    fn rx_lm_raw_ind(&mut self, queue: &mut MessageQueue, mut message: SapMsg) {
        tracing::trace!("rx_lm_raw_ind");
        let SapMsgInner::LmRawInd(prim) = &mut message.msg else {panic!()};

        let frame = match Ax25Frame::from_bytes(&prim.data) {
            Ok(frame) => {
                tracing::debug!(ch = prim.channel, "<- {}", frame);
                frame
            }
            Err(e) => {
                tracing::debug!(ch = prim.channel, "rx_lm_raw_ind: dropping undecodable frame: {} ({} bytes)", e, prim.data.len());
                self.dropped += 1;
                return;
            }
        };

        let config = self.config.config();
        let dest = if frame.dest == config.identity.bbs {
            PacsatEntity::DataLink
        } else if frame.dest == config.identity.broadcast {
            PacsatEntity::Pb
        } else {
            tracing::debug!("rx_lm_raw_ind: not for us: {}", frame);
            self.dropped += 1;
            return;
        };

        queue.push_back(SapMsg {
            sap: Sap::LmSap,
            src: PacsatEntity::Classifier,
            dest,
            ts: message.ts,
            msg: SapMsgInner::LmFrameInd(LmFrameInd { channel: prim.channel, frame }),
        });
    }
}

impl PacsatEntityTrait for ClassifierBs {
    fn entity(&self) -> PacsatEntity {
        PacsatEntity::Classifier
    }

    fn set_config(&mut self, config: SharedConfig) {
        self.config = config;
    }

    fn rx_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        tracing::debug!("rx_prim: {}", message.msg);

        assert!(message.sap == Sap::LmSap);

        match message.msg {
            SapMsgInner::LmRawInd(_) => {
                self.rx_lm_raw_ind(queue, message);
            }
            _ => {
                panic!();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pacsat_config::CfgIdentity;
    use pacsat_core::{Callsign, PacsatTime, debug};
    use pacsat_pdus::ax25::enums::frame_type::Ax25FrameType;
    use pacsat_saps::lm::LmRawInd;

    use super::*;

    fn raw(frame: &Ax25Frame) -> SapMsg {
        SapMsg::new(
            Sap::LmSap,
            PacsatEntity::Radio,
            PacsatEntity::Classifier,
            PacsatTime::default(),
            SapMsgInner::LmRawInd(LmRawInd { channel: 2, data: frame.to_bytes() }),
        )
    }

    #[test]
    fn test_routes_by_destination() {
        debug::setup_logging_verbose();
        let identity = CfgIdentity::default();
        let mut classifier = ClassifierBs::new(SharedConfig::new(identity.clone()));
        let mut queue = MessageQueue::new();
        let ground = Callsign::parse("N0CALL").unwrap();

        let sabm = Ax25Frame::new_u(identity.bbs.clone(), ground.clone(), Ax25FrameType::Sabm, true, true);
        classifier.rx_prim(&mut queue, raw(&sabm));
        let msg = queue.pop_front().unwrap();
        assert_eq!(msg.dest, PacsatEntity::DataLink);
        let SapMsgInner::LmFrameInd(ind) = msg.msg else { panic!() };
        assert_eq!(ind.channel, 2);
        assert_eq!(ind.frame, sabm);

        let req = Ax25Frame::new_i(identity.broadcast.clone(), ground.clone(), 0, 0, false, 0xBD, vec![0x10, 0xF4, 0x00]);
        classifier.rx_prim(&mut queue, raw(&req));
        assert_eq!(queue.pop_front().unwrap().dest, PacsatEntity::Pb);

        let other = Ax25Frame::new_u(Callsign::parse("W1AW").unwrap(), ground, Ax25FrameType::Disc, true, true);
        classifier.rx_prim(&mut queue, raw(&other));
        assert!(queue.is_empty());

        let junk = SapMsg::new(
            Sap::LmSap,
            PacsatEntity::Radio,
            PacsatEntity::Classifier,
            PacsatTime::default(),
            SapMsgInner::LmRawInd(LmRawInd { channel: 0, data: vec![0x00; 4] }),
        );
        classifier.rx_prim(&mut queue, junk);
        assert!(queue.is_empty());
        assert_eq!(classifier.dropped, 2);
    }

    #[test]
    fn test_follows_new_identity() {
        debug::setup_logging_verbose();
        let mut classifier = ClassifierBs::new(SharedConfig::new(CfgIdentity::default()));
        let mut queue = MessageQueue::new();
        let ground = Callsign::parse("N0CALL").unwrap();
        let identity = CfgIdentity {
            bbs: Callsign::parse("TEST-12").unwrap(),
            broadcast: Callsign::parse("TEST-11").unwrap(),
            ..Default::default()
        };
        classifier.set_config(SharedConfig::new(identity.clone()));

        let old = Ax25Frame::new_u(CfgIdentity::default().bbs, ground.clone(), Ax25FrameType::Sabm, true, true);
        classifier.rx_prim(&mut queue, raw(&old));
        assert!(queue.is_empty());

        let sabm = Ax25Frame::new_u(identity.bbs, ground, Ax25FrameType::Sabm, true, true);
        classifier.rx_prim(&mut queue, raw(&sabm));
        assert_eq!(queue.pop_front().unwrap().dest, PacsatEntity::DataLink);
        assert_eq!(classifier.dropped, 1);
    }
}
