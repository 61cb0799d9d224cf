use pacsat_core::pacsat_entities::PacsatEntity;
use pacsat_entities::{MessageQueue, PacsatEntityTrait};
use pacsat_saps::SapMsg;

/// A stand-in entity for testing purposes
/// Collects all received SapMsg messages for later inspection
pub struct Sink {
    component: PacsatEntity,
    msgqueue: Vec<SapMsg>,
}

impl Sink {
    pub fn new(component: PacsatEntity) -> Self {
        Self {
            component,
            msgqueue: vec![],
        }
    }

    pub fn take_msgqueue(&mut self) -> Vec<SapMsg> {
        std::mem::take(&mut self.msgqueue)
    }
}

impl PacsatEntityTrait for Sink {
    fn entity(&self) -> PacsatEntity {
        self.component
    }

    fn rx_prim(&mut self, _queue: &mut MessageQueue, message: SapMsg) {
        tracing::debug!("rx_prim: {:?}", message);
        self.msgqueue.push(message);
    }
}
