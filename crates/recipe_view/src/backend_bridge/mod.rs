//! Worker thread that runs flag refreshes off the UI thread.

pub mod commands;
pub mod runtime;
