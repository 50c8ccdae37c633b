//! Transport-neutral temperature telemetry collector.
//!
//! The crate is organized leaf-first: `codec` has no dependents in
//! this crate other than `poll`/`push`; `link` implementations are
//! swappable behind the `Link`/`DatagramLink` traits; `store` is the
//! single shared sink; `poll`/`push` are the two engines; `supervisor`
//! wires everything together under one `ShutdownToken`.

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod link;
pub mod model;
pub mod poll;
pub mod push;
pub mod shutdown;
pub mod store;
pub mod supervisor;
