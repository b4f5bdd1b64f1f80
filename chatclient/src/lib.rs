//! The client-side protocol half of the chat system: local nick state,
//! outbound intent translation, and inbound signal/response dispatch.
//! No terminal UI - see spec.md §1 for why that's out of scope here.

pub mod driver;

pub use driver::{Intent, RosterSink, Session};
