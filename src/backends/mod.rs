//! Backend implementations of the external collaborators

pub mod loopback;

pub use loopback::{LoopbackCapture, LoopbackTransport, MemorySink};
