//! Process-wide state.

mod state;

pub use state::{is_shutdown, register_stop_handle, setup_shutdown_handler, shutdown_signal};
