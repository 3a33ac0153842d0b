//! States for the `bootpush` device manager state machine.
//!
//! This modules is private and restricted to the
//! [`boot_server`](crate::boot_server) scope. The public interface of the
//! state machine is provided by [`boot_server`](crate::boot_server).
//!
//! Refer to the [`state_machine`](super::state_machine) module for an
//! overview of states, events and transitions.

use console::style;
use log::info;

use crate::boot_protocol::{boot, BootError};
use crate::settings::Settings;
use crate::transport::SerialLink;
use crate::utils;

use super::events::*;

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Trait adding the ability for a state to be `run` after a transition into
/// it.
pub(crate) trait Runnable {
    /// A state implements this method so it can be `run` after the state
    /// machine transitions into it.
    ///
    /// During this call, the state can do any work that needs to be done
    /// and when finished, requests transition to a new state by returning
    /// the appropriate `event`. The `event` is then consumed to create the
    /// new `state` using the corresponding `From` trait implementation if
    /// available.
    fn run(&mut self, settings: &Settings) -> Event;
}

// Init State ==================================================================

/// Represents the initial state of the device manager state machine.
///
/// From the `InitState`, the state machine can evolve via the following
/// transitions:
///
///  * **`WaitForPortEvent` => `WaitForPortState`** when a specific device
///    path was provided in the settings,
///  * **`SelectPortEvent` => `SelectPortState`** when no device path was
///    provided in the settings.
#[derive(Debug)]
pub(crate) struct InitState {}
impl Runnable for InitState {
    /// At the `Init` state, check if the provided `settings` have a device
    /// path, and if yes, transition to the `WaitForPort` state; otherwise
    /// transition to the `SelectPort` state.
    fn run(&mut self, settings: &Settings) -> Event {
        info!("=> Init");
        match settings.path {
            Some(_) => Event::WaitForPort(WaitForPortEvent {
                settings: settings.clone(),
            }),
            None => Event::SelectPort(SelectPortEvent {
                settings: settings.clone(),
            }),
        }
    }
}

// WaitForPortState ============================================================

#[derive(Debug)]
pub(crate) struct WaitForPortState {}
impl Runnable for WaitForPortState {
    fn run(&mut self, settings: &Settings) -> Event {
        let path = settings.path.as_ref().unwrap();
        info!("=> WaitForPort");
        let canceled = utils::wait_for_port(path);
        if canceled {
            Event::SelectPort(SelectPortEvent {
                settings: settings.clone(),
            })
        } else {
            // The port showed up without the wait being cancelled; move on
            // to pushing the image.
            Event::PortReady(PortReadyEvent {
                settings: settings.clone(),
            })
        }
    }
}

// SelectPortState =============================================================

#[derive(Debug)]
pub(crate) struct SelectPortState {}
impl Runnable for SelectPortState {
    fn run(&mut self, settings: &Settings) -> Event {
        info!("=> SelectPort");
        let selection = utils::select_port();
        match selection {
            // We have a serial port device path that we now need to update
            // in the settings and then trigger the transition via the
            // `PortReady` event.
            Some(path) => {
                let mut cloned_settings = settings.clone();
                cloned_settings.path = Some(path);
                Event::PortReady(PortReadyEvent {
                    settings: cloned_settings,
                })
            }
            None => Event::SelectPort(SelectPortEvent {
                settings: settings.clone(),
            }),
        }
    }
}

// Push State ==================================================================

/// A state where `bootpush` opens the selected port, loads the image from
/// disk and runs one complete boot transaction against the target.
///
/// This state can transition to another state as following:
///
///  * **`DoneEvent` => `DoneState`** on success, on a protocol-level
///    failure (the target answered but the transfer or the image is the
///    problem) or when the user cancels image selection,
///  * **`PortErrorEvent` => `WaitForPortState`** when the target never
///    emitted its boot signal. That usually means the device got unplugged
///    or the target is unpowered, and waiting on the port again (or `ESC`
///    to pick another one) is the right remedy.
#[derive(Debug)]
pub(crate) struct PushState {}
impl Runnable for PushState {
    fn run(&mut self, settings: &Settings) -> Event {
        info!("=> Push");

        let port = match utils::open_and_setup_port(settings) {
            Ok(port) => port,
            Err(e) => {
                info!("error: {:?}", e.to_string());
                println!(
                    "{}",
                    style("[BP] 💥 Could not open the serial port!").red()
                );
                return Event::Done(DoneEvent {
                    settings: settings.clone(),
                    with_errors: true,
                });
            }
        };

        let image = match utils::load_image(settings) {
            Ok(Some(image)) => image,
            Ok(None) => {
                // The user cancelled image selection; nothing to push.
                return Event::Done(DoneEvent {
                    settings: settings.clone(),
                    with_errors: false,
                });
            }
            Err(e) => {
                info!("error: {:?}", e.to_string());
                println!("{}", style("[BP] 💥 Could not load the image!").red());
                return Event::Done(DoneEvent {
                    settings: settings.clone(),
                    with_errors: true,
                });
            }
        };

        let link = Box::new(SerialLink::new(port));
        match boot(image, link, settings) {
            Ok(()) => {
                println!(
                    "{}",
                    style("[BP] ✅ Image pushed and verified by the target").green()
                );
                Event::Done(DoneEvent {
                    settings: settings.clone(),
                    with_errors: false,
                })
            }
            Err(BootError::NoBootResponse(e)) => {
                info!("error: {}", e);
                println!(
                    "{}",
                    style("[BP] 😶 The target never announced its boot ROM").yellow()
                );
                println!("[BP] 🔌 Check wiring and power, or re-plug the device");
                Event::PortError(PortErrorEvent {
                    settings: settings.clone(),
                })
            }
            Err(e) => {
                info!("error: {}", e);
                println!(
                    "{}",
                    style(format!("[BP] 💥 Push failed: {}", e)).red()
                );
                Event::Done(DoneEvent {
                    settings: settings.clone(),
                    with_errors: true,
                })
            }
        }
    }
}

// Done State ==================================================================

/// Reached when `bootpush` completes its execution and is about to
/// terminate (normally or abnormally).
///
/// This state goes into a 2-phase execution. During the initial phase, it
/// runs like any other state to report the outcome, then triggers the
/// `ExitEvent` to cause the event loop to terminate and exit.
#[derive(Debug, Copy, Clone)]
pub(crate) struct DoneState {
    /// When `true`, indicates an abnormal completion caused by an error.
    pub with_error: bool,
    /// When `true` instructs the device manager state machine to exit its
    /// event loop.
    pub should_exit: bool,
}
impl Runnable for DoneState {
    fn run(&mut self, settings: &Settings) -> Event {
        info!(
            "=> Done with{}errors",
            if self.with_error { " " } else { " no " }
        );
        Event::Exit(ExitEvent {
            settings: settings.clone(),
            with_error: self.with_error,
        })
    }
}
