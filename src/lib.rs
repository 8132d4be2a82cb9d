//! Callroom - call-session coordination for embedded video calls.
//!
//! This is the main library crate. It coordinates joining and leaving a
//! channel, local camera and microphone capture, publishing, remote
//! participants and the render surfaces that show them. Media transport,
//! device capture and output are reached through traits.

pub mod backends;
pub mod capture;
pub mod render;
pub mod session;
pub mod transport;
pub mod utils;

pub use session::{CallConfig, CallController, CallCoordinator, CallHandle, CallView, ConnectionStatus};
pub use utils::error::{CallError, CallResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "callroom=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Callroom v{}", env!("CARGO_PKG_VERSION"));
}
