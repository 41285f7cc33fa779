pub(crate) mod bootstrap;
mod config;
mod events;
pub(crate) mod loop_runner;
mod metrics;
mod renderer;
mod stdin_commands;
#[cfg_attr(feature = "puredoom", allow(dead_code))]
mod synthetic;
mod textures;
