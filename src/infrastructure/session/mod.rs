//! Session adapters.
//!
//! One adapter ships in-tree: a deterministic loopback session used by
//! tests and local simulation. Live transports implement the same ports
//! out of tree.

pub mod loopback;

pub use loopback::{LoopbackFactory, LoopbackFeed, WireCall};
