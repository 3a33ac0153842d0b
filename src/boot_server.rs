//! `bootpush` device lifecycle management around a single boot push.
//!
//! **Example** - Executing the state machine the event loop:
//! ```no_run
//! use bootpush::{self as bp, DeviceManager};
//!
//! let settings = bp::SettingsBuilder::default().finalize();
//! let mut sdm = bp::singleton(settings);
//! let status = sdm.run(); // status code returned after the `Exit` event
//! println!("status: {}", status);
//! std::process::exit(0);
//! ```

mod events;
mod state_machine;
mod states;

pub use state_machine::{singleton, DeviceManager};
