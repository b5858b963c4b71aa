//! Application layer orchestrating the continuation protocol.
//!
//! Data flows `RequestBuilder` -> `Launcher` (persists, hands off) -> external agent, possibly
//! across a process restart -> `ReturnHandler` (consumes) -> `TokenizeCompleter` ->
//! `ResultDispatcher`. `PaymentFlowClient` wires them behind one facade.

pub mod builder;
pub mod client;
pub mod completer;
pub mod dispatcher;
pub mod launcher;
pub mod return_handler;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::RequestBuilder;
pub use client::PaymentFlowClient;
pub use completer::TokenizeCompleter;
pub use dispatcher::ResultDispatcher;
pub use launcher::Launcher;
pub use return_handler::{Resumption, ReturnHandler};
