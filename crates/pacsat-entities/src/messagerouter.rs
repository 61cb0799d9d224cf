use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use pacsat_config::SharedConfig;
use pacsat_core::pacsat_time::TICKS_PER_SECOND;
use pacsat_core::{PacsatTime, pacsat_entities::PacsatEntity};
use pacsat_saps::SapMsg;

use crate::PacsatEntityTrait;

/// End-of-tick order. The data link emits its I frames and acks first so that the
/// radio, last, sends everything gathered during the tick.
const TICK_END_ORDER: [PacsatEntity; 5] = [
    PacsatEntity::DataLink,
    PacsatEntity::Uplink,
    PacsatEntity::Pb,
    PacsatEntity::Classifier,
    PacsatEntity::Radio,
];

pub struct MessageQueue {
    messages: VecDeque<SapMsg>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self {
            messages: VecDeque::new(),
        }
    }

    pub fn push_back(&mut self, message: SapMsg) {
        self.messages.push_back(message);
    }

    pub fn pop_front(&mut self) -> Option<SapMsg> {
        self.messages.pop_front()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MessageRouter {
    config: SharedConfig,
    entities: HashMap<PacsatEntity, Box<dyn PacsatEntityTrait>>,
    msg_queue: MessageQueue,

    /// Current stack time, incremented each tick and passed to entities
    ts: PacsatTime,

    /// When set, each tick is stretched to this wall-clock duration
    tick_period: Option<Duration>,
}

impl MessageRouter {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            entities: HashMap::new(),
            msg_queue: MessageQueue::new(),
            config,
            ts: PacsatTime::default(),
            tick_period: None,
        }
    }

    /// Sets the stack time. The epoch is the unix time of tick 0.
    pub fn set_time(&mut self, ts: PacsatTime) {
        self.ts = ts;
    }

    pub fn get_time(&self) -> PacsatTime {
        self.ts
    }

    /// Paces `run_stack` to wall-clock time, one tick per 1/TICKS_PER_SECOND seconds
    pub fn set_realtime(&mut self, realtime: bool) {
        self.tick_period = if realtime {
            Some(Duration::from_millis(1000 / TICKS_PER_SECOND))
        } else {
            None
        };
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Hands a new config to the router and every registered entity
    pub fn set_config(&mut self, config: SharedConfig) {
        for entity in self.entities.values_mut() {
            entity.set_config(config.clone());
        }
        self.config = config;
    }

    pub fn register_entity(&mut self, entity: Box<dyn PacsatEntityTrait>) {
        let comp_type = entity.entity();
        tracing::debug!("register_entity {:?}", comp_type);
        if self.entities.insert(comp_type, entity).is_some() {
            tracing::warn!("register_entity: {:?} replaced", comp_type);
        }
    }

    /// Returns a mut ref to a component of the requested type
    pub fn get_entity(&mut self, comp: PacsatEntity) -> Option<&mut dyn PacsatEntityTrait> {
        self.entities.get_mut(&comp).map(|entity| entity.as_mut())
    }

    pub fn submit_message(&mut self, message: SapMsg) {
        tracing::debug!("submit_message {:?}: {:?} -> {:?}", message.get_sap(), message.get_source(), message.get_dest());
        self.msg_queue.push_back(message);
    }

    fn deliver_message(&mut self, message: SapMsg) {
        tracing::debug!("deliver_message: {:?}: {:?} -> {:?} {}", message.get_sap(), message.get_source(), message.get_dest(), message.msg);

        let dest = *message.get_dest();
        match self.entities.get_mut(&dest) {
            Some(entity) => entity.rx_prim(&mut self.msg_queue, message),
            None => tracing::warn!("deliver_message: no entity {:?} for {} from {:?}", dest, message.msg, message.get_source()),
        }
    }

    /// Delivers until the queue is empty, including messages produced on the way
    pub fn deliver_all_messages(&mut self) {
        while let Some(message) = self.msg_queue.pop_front() {
            self.deliver_message(message);
        }
    }

    pub fn get_msgqueue_len(&self) -> usize {
        self.msg_queue.len()
    }

    pub fn tick_start(&mut self) {
        tracing::trace!("--- tick {} ---", self.ts);

        for entity in self.entities.values_mut() {
            entity.tick_start(&mut self.msg_queue, self.ts);
        }
    }

    /// Runs the end-of-tick functions in `TICK_END_ORDER`, delivering what each one
    /// produces before the next runs. Then advances the clock by one tick.
    pub fn tick_end(&mut self) {
        for target in TICK_END_ORDER {
            if let Some(entity) = self.entities.get_mut(&target) {
                if entity.tick_end(&mut self.msg_queue, self.ts) {
                    tracing::trace!("tick_end: {:?} did work", target);
                }
            }
            self.deliver_all_messages();
        }

        self.ts = self.ts.add_ticks(1);
    }

    /// Runs the full stack either forever or for a specified number of ticks.
    /// Stops early once `running` is cleared.
    pub fn run_stack(&mut self, num_ticks: Option<usize>, running: Option<Arc<AtomicBool>>) {
        let mut ticks: usize = 0;
        let mut next_deadline = Instant::now();

        loop {
            if let Some(running) = &running {
                if !running.load(Ordering::SeqCst) {
                    tracing::info!("run_stack: stop requested after {} ticks", ticks);
                    break;
                }
            }

            self.tick_start();
            self.deliver_all_messages();
            self.tick_end();

            ticks += 1;
            if let Some(num_ticks) = num_ticks {
                if ticks >= num_ticks {
                    break;
                }
            }

            if let Some(period) = self.tick_period {
                next_deadline += period;
                let now = Instant::now();
                if next_deadline > now {
                    std::thread::sleep(next_deadline - now);
                } else {
                    // Fell behind, do not try to catch up with a burst of ticks
                    next_deadline = now;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pacsat_config::CfgIdentity;
    use pacsat_core::{Sap, debug};
    use pacsat_saps::SapMsgInner;
    use pacsat_saps::dl::DlDisconnectReq;

    use super::*;

    /// Records which hook ran, in order, into a log shared by all recorders
    struct Recorder {
        id: PacsatEntity,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl PacsatEntityTrait for Recorder {
        fn entity(&self) -> PacsatEntity {
            self.id
        }

        fn rx_prim(&mut self, _queue: &mut MessageQueue, message: SapMsg) {
            self.log.lock().unwrap().push(format!("rx {:?} from {:?}", self.id, message.get_source()));
        }

        fn tick_end(&mut self, queue: &mut MessageQueue, ts: PacsatTime) -> bool {
            self.log.lock().unwrap().push(format!("end {:?}", self.id));
            if self.id == PacsatEntity::DataLink {
                // Must reach the radio before the radio's own tick_end
                queue.push_back(SapMsg::new(
                    Sap::DlSap,
                    PacsatEntity::DataLink,
                    PacsatEntity::Radio,
                    ts,
                    SapMsgInner::DlDisconnectReq(DlDisconnectReq { channel: 0 }),
                ));
            }
            false
        }
    }

    #[test]
    fn test_tick_end_order() {
        debug::setup_logging_verbose();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = MessageRouter::new(SharedConfig::new(CfgIdentity::default()));
        for id in [PacsatEntity::Radio, PacsatEntity::Pb, PacsatEntity::DataLink] {
            router.register_entity(Box::new(Recorder { id, log: log.clone() }));
        }
        router.set_time(PacsatTime::new(1000));

        router.run_stack(Some(1), None);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["end DataLink", "rx Radio from DataLink", "end Pb", "end Radio"]
        );
        assert_eq!(router.get_time(), PacsatTime::new(1000).add_ticks(1));
    }

    #[test]
    fn test_stops_when_cleared() {
        let mut router = MessageRouter::new(SharedConfig::new(CfgIdentity::default()));
        let running = Arc::new(AtomicBool::new(false));
        router.run_stack(None, Some(running));
        assert_eq!(router.get_time(), PacsatTime::default());
    }
}
