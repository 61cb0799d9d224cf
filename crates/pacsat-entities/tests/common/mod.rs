// Each test binary uses its own subset of the harness
#![allow(dead_code)]

pub mod component_test;
pub mod ground_station;
pub mod sink;

pub use component_test::{ComponentTest, default_test_config};
#[allow(unused_imports)]
pub use ground_station::GroundStation;
