//! Host-facing adapters: external agents that take control during a launch.

pub mod agent;
