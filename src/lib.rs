//! A log tail library: follows a growing text file and publishes numbered
//! line batches and state changes as an async stream.
//!
//! On start the engine emits the last lines already in the file, then reads
//! only what gets appended, driven by filesystem notifications with a polling
//! fallback. Truncation, deletion, rename and recreation are reported and
//! survived; line numbers keep counting across them.
//!
//! # Example
//!
//! ```rust,no_run
//! use log_tail::{TailConfig, TailEvent, tail_file};
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (_engine, mut events) = tail_file("app.log", TailConfig::default()).await?;
//!
//!     while let Some(event) = events.next().await {
//!         match event {
//!             TailEvent::LinesAdded(lines) => {
//!                 for line in lines {
//!                     println!("{}: {}", line.line_number(), line.content());
//!                 }
//!             }
//!             TailEvent::StateChanged(state) => eprintln!("state: {}", state),
//!             TailEvent::Error(e) => eprintln!("error: {}", e),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

mod buffer;
mod config;
mod engine;
mod error;
mod model;
mod position;
mod reader;
mod stream;
mod watcher;

#[cfg(test)]
mod test_helpers;

pub use buffer::TailBuffer;
pub use config::{
    DEFAULT_MAX_BUFFERED_LINES, DEFAULT_POLL_INTERVAL, DEFAULT_TAIL_WINDOW, TailConfig,
};
pub use engine::TailEngine;
pub use error::{Error, Result};
pub use model::{TailEvent, TailLine, TailState};
pub use stream::TailEvents;

use std::path::Path;

/// Creates an engine for `path` and starts it.
///
/// Fails like [`TailEngine::start`], e.g. with [`Error::FileNotFound`].
/// Dropping the returned engine stops tailing.
pub async fn tail_file<P: AsRef<Path>>(
    path: P,
    config: TailConfig,
) -> Result<(TailEngine, TailEvents)> {
    let (engine, events) = TailEngine::new(path, config)?;
    engine.start().await?;
    Ok((engine, events))
}
