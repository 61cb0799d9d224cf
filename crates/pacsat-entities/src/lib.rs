#![allow(dead_code)]

pub mod classifier;
pub mod datalink;
pub mod dir;
pub mod entity_trait;
pub mod messagerouter;
pub mod pb;
pub mod radio;
pub mod uplink;

// Re-export commonly used items from router
pub use entity_trait::PacsatEntityTrait;
pub use messagerouter::{MessageQueue, MessageRouter};
