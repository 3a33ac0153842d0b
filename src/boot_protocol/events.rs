//! Events for the boot protocol state machine.
//!
//! This modules is private and restricted to the
//! [`boot_protocol`](crate::boot_protocol) scope. The public interface of
//! the boot protocol state machine is provided by
//! [`boot_protocol`](crate::boot_protocol).
//!
//! Refer to the [`state_machine`](super::state_machine) module for an
//! overview of states, events and transitions.

use std::fmt;

use crate::settings::Settings;
use crate::transport::BootLink;

use super::BootError;

// =============================================================================
// Crate-Public Interface
// =============================================================================

// BootSignalSeenEvent =========================================================

/// Event fired when the synchronizer has caught the target's boot signal,
/// triggering the transition to the `SendHeader` state.
///
/// The link and the image move to the next state; the XOR checksum over the
/// full image is computed as part of this transition.
pub(crate) struct BootSignalSeenEvent {
    pub settings: Settings,
    pub link: Box<dyn BootLink>,
    pub image: Vec<u8>,
}
impl fmt::Debug for BootSignalSeenEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BootSignalSeenEvent")
            .field(&self.image.len())
            .finish()
    }
}

// HeaderAcceptedEvent =========================================================

/// Event fired when the target has acknowledged the frame header,
/// triggering the transition to the `SendPayload` state.
pub(crate) struct HeaderAcceptedEvent {
    pub settings: Settings,
    pub link: Box<dyn BootLink>,
    pub image: Vec<u8>,
    /// XOR checksum over the full image, computed before the header went
    /// out. Carried along until the `Verify` state needs it.
    pub checksum: u8,
}
impl fmt::Debug for HeaderAcceptedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HeaderAcceptedEvent")
            .field(&self.image.len())
            .field(&self.checksum)
            .finish()
    }
}

// PayloadDeliveredEvent =======================================================

/// Event fired when every payload byte has gone out (and, on a one-wire
/// link, its echo has been drained), triggering the transition to the
/// `Verify` state.
pub(crate) struct PayloadDeliveredEvent {
    pub settings: Settings,
    pub link: Box<dyn BootLink>,
    pub checksum: u8,
}
impl fmt::Debug for PayloadDeliveredEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PayloadDeliveredEvent")
            .field(&self.checksum)
            .finish()
    }
}

// ImageVerifiedEvent ==========================================================

/// Event fired when the target's checksum matched and the closing
/// acknowledgment went out. The transaction is complete; the link is
/// dropped with the terminal state.
#[derive(Debug)]
pub(crate) struct ImageVerifiedEvent {
    pub settings: Settings,
}

// FailedEvent =================================================================

/// Event fired from any non-terminal state when its wire operation fails.
/// Carries the terminal error; the link is dropped on the way out since no
/// recovery is possible within the current transaction.
#[derive(Debug)]
pub(crate) struct FailedEvent {
    pub settings: Settings,
    pub error: BootError,
}

impl FailedEvent {
    pub(crate) fn new(settings: &Settings, error: impl Into<BootError>) -> Self {
        FailedEvent {
            settings: settings.clone(),
            error: error.into(),
        }
    }
}

// ExitEvent ===================================================================

/// The last event in the boot protocol state machine. It terminates the
/// event loop and hands the transaction outcome back to the caller of
/// [`run`](super::BootProtocol::run).
#[derive(Debug)]
pub(crate) struct ExitEvent {
    pub settings: Settings,
    pub failure: Option<BootError>,
}

// Events enum =================================================================

/// Events that can be triggered within the boot protocol state machine.
///
/// Each possible value holds an `event`, which in turn may hold additional
/// data for the state transition. Such data is passed by the origin state
/// for potential use by the target state.
#[derive(Debug)]
pub(crate) enum Event {
    BootSignalSeen(BootSignalSeenEvent),
    HeaderAccepted(HeaderAcceptedEvent),
    PayloadDelivered(PayloadDeliveredEvent),
    ImageVerified(ImageVerifiedEvent),
    Failed(FailedEvent),
    Exit(ExitEvent),
}
