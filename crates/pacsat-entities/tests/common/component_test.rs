use pacsat_config::{CfgIdentity, RadioBackend, SharedConfig, StackConfig, StackState};
use pacsat_core::pacsat_entities::PacsatEntity;
use pacsat_core::{ChannelId, PacsatTime, Sap};
use pacsat_entities::classifier::classifier_bs::ClassifierBs;
use pacsat_entities::datalink::datalink_bs::DataLinkBs;
use pacsat_entities::dir::{Directory, MemFileStore, SharedDir};
use pacsat_entities::pb::pb_bs::PbBs;
use pacsat_entities::uplink::uplink_bs::UplinkBs;
use pacsat_entities::{MessageRouter, PacsatEntityTrait};
use pacsat_pdus::ax25::frame::Ax25Frame;
use pacsat_saps::lm::LmRawInd;
use pacsat_saps::{SapMsg, SapMsgInner};

use super::sink::Sink;

/// Start of the test clock, unix seconds
pub const TEST_EPOCH: u32 = 1_700_000_000;

/// Creates a default config for testing. It can still be modified as needed
/// before passing it to the ComponentTest constructor
pub fn default_test_config() -> StackConfig {
    let mut config = StackConfig::new(CfgIdentity::default());
    // These tests don't run a radio worker; a Sink takes the Radio's place
    config.radio.backend = RadioBackend::None;
    config
}

/// Infrastructure for testing the ground-link entities
/// Quick setup of all components for end-to-end testing
/// Supports optional sinks for collecting messages for later inspection
pub struct ComponentTest {
    pub config: SharedConfig,
    pub router: MessageRouter,
    pub dir: SharedDir,
    pub sinks: Vec<PacsatEntity>,
}

impl ComponentTest {
    pub fn new(config: StackConfig) -> Self {
        let shared_config = SharedConfig::from_parts(config, StackState::default());
        let mut mr = MessageRouter::new(shared_config.clone());
        mr.set_time(PacsatTime::new(TEST_EPOCH));

        let capacity = shared_config.config().storage.capacity_bytes;
        let dir = SharedDir::new(Directory::new(Box::new(MemFileStore::new(capacity))));

        Self {
            config: shared_config,
            router: mr,
            dir,
            sinks: vec![],
        }
    }

    pub fn populate_entities(&mut self, components: Vec<PacsatEntity>, sinks: Vec<PacsatEntity>) {
        for component in components.iter() {
            match component {
                PacsatEntity::Classifier => {
                    let classifier = ClassifierBs::new(self.config.clone());
                    self.register_entity(classifier);
                }
                PacsatEntity::DataLink => {
                    let dl = DataLinkBs::new(self.config.clone());
                    self.register_entity(dl);
                }
                PacsatEntity::Uplink => {
                    let ul = UplinkBs::new(self.config.clone(), self.dir.clone());
                    self.register_entity(ul);
                }
                PacsatEntity::Pb => {
                    let pb = PbBs::new(self.config.clone(), self.dir.clone());
                    self.register_entity(pb);
                }
                _ => {
                    panic!("Component not implemented: {:?}", component);
                }
            }
        }

        // Setup any sinks
        for sink in sinks.iter() {
            assert!(!self.sinks.contains(sink), "Sink already exists: {:?}", sink);
            assert!(self.router.get_entity(*sink).is_none(), "Sink already registered as entity: {:?}", sink);

            self.sinks.push(*sink);
            self.router.register_entity(Box::new(Sink::new(*sink)));
        }
    }

    /// Full server stack with a sink in place of the radio
    pub fn server(config: StackConfig) -> Self {
        let mut test = Self::new(config);
        test.populate_entities(
            vec![PacsatEntity::Classifier, PacsatEntity::DataLink, PacsatEntity::Uplink, PacsatEntity::Pb],
            vec![PacsatEntity::Radio],
        );
        test
    }

    pub fn register_entity<T: 'static + PacsatEntityTrait>(&mut self, entity: T) {
        self.router.register_entity(Box::new(entity));
    }

    pub fn run_stack(&mut self, num_ticks: Option<usize>) {
        self.router.run_stack(num_ticks, None);
    }

    pub fn submit_message(&mut self, message: SapMsg) {
        self.router.submit_message(message);
    }

    pub fn now(&self) -> PacsatTime {
        self.router.get_time()
    }

    /// Hands a frame to the classifier as if the radio received it
    pub fn rx_frame(&mut self, channel: ChannelId, frame: &Ax25Frame) {
        let ts = self.now();
        self.submit_message(SapMsg::new(
            Sap::LmSap,
            PacsatEntity::Radio,
            PacsatEntity::Classifier,
            ts,
            SapMsgInner::LmRawInd(LmRawInd { channel, data: frame.to_bytes() }),
        ));
    }

    /// Submits a frame and runs one tick. Returns what was sent to the radio.
    pub fn exchange(&mut self, channel: ChannelId, frame: &Ax25Frame) -> Vec<(ChannelId, Ax25Frame)> {
        self.rx_frame(channel, frame);
        self.run_stack(Some(1));
        self.tx_frames()
    }

    pub fn dump_sinks(&mut self) -> Vec<SapMsg> {
        let mut msgs = vec![];
        for sink in self.sinks.iter() {
            if let Some(component) = self.router.get_entity(*sink) {
                if let Some(sink) = component.as_any_mut().downcast_mut::<Sink>() {
                    let mut sink_msgs = sink.take_msgqueue();
                    msgs.append(&mut sink_msgs);
                }
            }
        }
        msgs
    }

    /// Frames the radio sink collected since the last call, decoded
    pub fn tx_frames(&mut self) -> Vec<(ChannelId, Ax25Frame)> {
        self.dump_sinks()
            .into_iter()
            .filter_map(|msg| match msg.msg {
                SapMsgInner::LmTxReq(req) => Some((req.channel, Ax25Frame::from_bytes(&req.data).unwrap())),
                _ => None,
            })
            .collect()
    }
}
