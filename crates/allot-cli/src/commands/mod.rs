//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `shared` - Config resolution and input parsing used by every command
//! - `optimize` - Single-snapshot optimization and result rendering
//! - `weights` - Baseline and effective weight report
//! - `batch` - Concurrent optimization of a request file
//! - `config` - Effective configuration and override location

pub mod batch;
pub mod config;
pub mod optimize;
pub mod shared;
pub mod weights;

// Re-export command functions for main.rs
pub use batch::*;
pub use config::*;
pub use optimize::*;
pub use shared::*;
pub use weights::*;
