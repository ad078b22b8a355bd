//! Recipe-details screen: a pure renderer plus the controller and worker bridge that keep it in
//! sync with remote flags.

pub mod backend_bridge;
pub mod controller;
pub mod navigation;
pub mod render;
pub mod selector;

pub use backend_bridge::{commands::BridgeCommand, runtime::launch as launch_bridge};
pub use controller::{
    events::{MountId, UiEvent},
    screen::{EventEffect, Lifecycle, ScreenController},
};
pub use navigation::{NavigationEvent, NavigationPath, Route, Router};
pub use render::{render, RenderTree, Row};
pub use selector::SectionSelector;

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod controller_tests;
