//! Events for the `bootpush` device manager state machine.
//!
//! This modules is private and restricted to the
//! [`boot_server`](crate::boot_server) scope. The public interface of the
//! state machine is provided by [`boot_server`](crate::boot_server).
//!
//! Refer to the [`state_machine`](super::state_machine) module for an
//! overview of states, events and transitions.

use crate::settings::Settings;

// =============================================================================
// Crate-Public Interface
// =============================================================================

// WaitForPortEvent ============================================================

/// Event fired to trigger a transition to the `WaitForPort` state.
///
/// This event can happen under one of the following circumstances:
///
///  1. While at the `Init` state and a port name was provided. Port
///     selection is skipped and we just hold on until the port shows up
///     (meaning the adapter is plugged).
///  2. When the target never answered its boot signal while at the `Push`
///     state. The usual causes are an unplugged adapter or an unpowered
///     target, both of which are worth waiting on.
#[derive(Debug)]
pub(crate) struct WaitForPortEvent {
    pub settings: Settings,
}

// SelectPortEvent =============================================================

/// Event fired to trigger the transition to the `SelectPort` state.
///
/// This event can happen under one of the following circumstances:
///
///  1. If the program is started with no specific device path provided.
///  2. If a wait on a specific device path is cancelled by the user
///     pressing the `ESC` key, to let them pick a device out of the
///     detected ones instead.
///  3. If the user declines the presented selection (again `ESC`) to
///     refresh the list of connected devices.
#[derive(Debug)]
pub(crate) struct SelectPortEvent {
    pub settings: Settings,
}

// PortReadyEvent ==============================================================

/// Event fired when we have a serial port with a valid device path on the
/// system, either because the port we were waiting on has come up or
/// because one was selected from the list of detected ports.
///
/// Fired from the `WaitForPort` or `SelectPort` states; triggers the
/// transition to the `Push` state.
#[derive(Debug)]
pub(crate) struct PortReadyEvent {
    pub settings: Settings,
}

// PortErrorEvent ==============================================================

/// Event fired when the push failed in a way that points at the physical
/// setup rather than at the image: the target never emitted its boot
/// signal. Triggers a transition back into the `WaitForPort` state so the
/// user can fix the wiring or re-plug the device, or `ESC` out to pick
/// another port.
#[derive(Debug)]
pub(crate) struct PortErrorEvent {
    pub settings: Settings,
}

// DoneEvent ===================================================================

/// Event fired when the program completes and is about to terminate. It
/// triggers a transition to the `Done` state.
#[derive(Debug)]
pub(crate) struct DoneEvent {
    pub settings: Settings,
    pub with_errors: bool,
}

// ExitEvent ===================================================================

/// The last event that can be triggered in `bootpush` and will result in
/// the event loop terminating with an `exit status`, handing back the
/// control to the original caller that started the event loop.
///
/// The returned `status code` can be used as an exit code from the `main`
/// function.
///
/// **Example**
/// ```no_run
/// use bootpush::{self as bp, DeviceManager};
///
/// let settings = bp::SettingsBuilder::new().finalize();
/// let mut sdm = bp::singleton(settings);
/// let status = sdm.run(); // status code returned after the `Exit` event
/// println!("status: {}", status);
/// std::process::exit(0);
/// ```
#[derive(Debug)]
pub(crate) struct ExitEvent {
    pub settings: Settings,
    pub with_error: bool,
}

// Events enum =================================================================

/// Events that can be triggered within the device management state machine
/// of `bootpush`.
///
/// Each possible value holds an `event`, which in turn may hold additional
/// data for the state transition. Such data is passed by the origin state
/// for potential use by the target state.
#[derive(Debug)]
pub(crate) enum Event {
    WaitForPort(WaitForPortEvent),
    SelectPort(SelectPortEvent),
    PortReady(PortReadyEvent),
    PortError(PortErrorEvent),
    Done(DoneEvent),
    Exit(ExitEvent),
}
