//! Cross-leg value linker.
//!
//! Lets one leg's declared result feed another leg's arguments without a
//! synchronous round trip: results are resolved from leg declarations
//! before any packet is sent, and travel inside the dispatch packets.
//! Resolution is pure and synchronous; each source leg's result is computed
//! at most once per assembly and memoized.

mod linker;

pub use linker::{LinkError, Linker};
