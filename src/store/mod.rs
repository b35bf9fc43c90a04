//! JSON state files.
//!
//! This module handles loading and saving allocator state:
//! - [`state_file`] - read/write one [`StateDoc`] per file

mod state_file;

// Re-export public types and functions
pub use state_file::{read_state, write_state, StateDoc};
