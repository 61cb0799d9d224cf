use as_any::AsAny;
use pacsat_config::SharedConfig;
use pacsat_core::{PacsatTime, pacsat_entities::PacsatEntity};
use pacsat_saps::SapMsg;
use crate::MessageQueue;

/// Trait for the entities of the ground-link stack
/// Used by MessageRouter for passing messages between entities
pub trait PacsatEntityTrait: Send + AsAny {
    /// Returns the entity type identifier
    fn entity(&self) -> PacsatEntity;

    /// Handle incoming SAP primitive
    fn rx_prim(&mut self, queue: &mut MessageQueue, message: SapMsg);

    /// Update configuration (optional)
    #[allow(dead_code)]
    fn set_config(&mut self, _config: SharedConfig) {}

    /// Called at the start of each router tick. Timers and periodic work are checked here.
    fn tick_start(&mut self, _queue: &mut MessageQueue, _ts: PacsatTime) { }

    /// Called at the end of each router tick
    fn tick_end(&mut self, _queue: &mut MessageQueue, _ts: PacsatTime) -> bool { false }
}
