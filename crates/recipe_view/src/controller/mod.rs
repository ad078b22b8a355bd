//! Controller layer: UI events, screen lifecycle, and command orchestration.

pub mod events;
pub mod orchestration;
pub mod screen;
