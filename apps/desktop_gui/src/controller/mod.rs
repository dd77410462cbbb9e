//! Controller layer: UI events, pure view projections, and command orchestration.

pub mod events;
pub mod orchestration;
pub mod projection;
