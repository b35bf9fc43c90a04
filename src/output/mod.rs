//! Output formatting for state files.
//!
//! - [`terminal`] - plain rendering of trackers, networks and counters, and coloured printing

mod terminal;

pub use terminal::{
    format_field, print_state, render_counter, render_network, render_state, render_subnet,
};
