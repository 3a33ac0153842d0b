//! Bootpush loads a firmware image into the volatile memory of a small
//! UART-booted target (a DA14531-class BLE SoC, typically) right after the
//! target is reset. The target's boot ROM announces itself with a single
//! signal byte for a short window after every reset; `bootpush` pulses the
//! reset line until it catches that window, then pushes the image through a
//! tiny framed protocol and verifies an XOR checksum computed by the target
//! itself. The link can be a regular two-wire UART or a half-duplex
//! single-wire UART, in which case every transmitted byte echoes back into
//! the host's receiver and is drained byte-for-byte.
//!
//! Bootpush offers interactive selection menus to chose the serial port to
//! be used, can wait for a device to be plugged in, and reports transfer
//! progress while the image is streaming.
//!
//! Most of the functionality in `bootpush` is implemented as state
//! machines. State machines are implemented in terms of **states** and
//! **transitions** between them with the following characteristics:
//!
//! * Can only be in one state at any time.
//! * Each state can have its own associated data if needed.
//! * It is possible to have some shared data between **all** states.
//! * Transitions between states are triggered via typed **events** and
//!   follow defined semantics.
//! * Only explicitly defined transitions should be permitted and as many
//!   errors should be detected at **compile-time**.
//! * Transitioning from one state to another consumes the original state
//!   and renders it unusable. Any transition back to that state would
//!   create a new state.
//! * Data can be transferred from one state to the next by attaching it to
//!   the transition event. Such data is statically defined as part of the
//!   event type.
//!
//! The implementation of state transitions leverages `rust`'s `From` and
//! `Into` pattern. The `From` trait allows for a type to define how to
//! create itself from another type, hence providing us an intuitive and
//! simple mechanism for converting `events` into new `states`. Only
//! transitions for which the `From` trait is implemented are authorized and
//! any other transition would be detected at compile-time as an error.

mod boot_protocol;
mod boot_server;
mod checksum;
mod settings;
mod transport;
mod utils;

pub use boot_protocol::{
    boot, factory, BootError, BootProtocol, ChecksumError, HeaderError, PayloadError, SyncError,
};
pub use boot_server::{singleton, DeviceManager};
pub use checksum::xor_checksum;
pub use settings::{Settings, SettingsBuilder};
pub use transport::{BootLink, ResetControl, SerialLink, Transport, TransportError, WireMode};
