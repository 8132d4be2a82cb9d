//! Track rendering
//!
//! This module binds local and remote tracks to output sinks:
//! - RenderSink trait for the external output (video surfaces, audio device)
//! - ScopedBinding that detaches on drop
//! - RenderGrid holding one surface per participant

pub mod binding;
pub mod grid;
pub mod sink;
pub mod surface;

pub use binding::ScopedBinding;
pub use grid::{RenderGrid, TileView};
pub use sink::{RenderSink, RenderTarget, TileKey};
pub use surface::RenderSurface;
