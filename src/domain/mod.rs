//! Domain model of the continuation protocol: flow types, correlation tokens, pending
//! records, the tagged results exchanged between components, and the ports implemented by
//! infrastructure adapters.

pub mod configuration;
pub mod flow;
pub mod outcome;
pub mod pending;
pub mod ports;
pub mod request;
pub mod timestamp;
pub mod token;
