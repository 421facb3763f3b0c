//! Collapse-field engine: pool field, particle, dealer sign, hazard and forward map.

pub mod dealer;
pub mod engine;
pub mod forward_map;
pub mod hazard;
pub mod kernel;
pub mod particle;
pub mod pool_field;

pub use engine::CollapseFieldEngine;
