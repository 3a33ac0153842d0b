//! States for the boot protocol state machine.
//!
//! This modules is private and restricted to the
//! [`boot_protocol`](crate::boot_protocol) scope. The public interface of
//! the boot protocol state machine is provided by
//! [`boot_protocol`](crate::boot_protocol).
//!
//! Refer to the [`state_machine`](super::state_machine) module for an
//! overview of states, events and transitions.

use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::boot_protocol::wire;
use crate::settings::Settings;
use crate::transport::BootLink;

use super::events::*;
use super::BootError;

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Trait adding the ability for a state to be `run` after a transition into
/// it.
pub(crate) trait Runnable {
    /// A state implements this method so it can be `run` after the state
    /// machine transitions into it.
    ///
    /// During this call, the state performs its wire operation and, when
    /// finished, requests a transition to a new state by returning the
    /// appropriate `event`. The `state` and the `event` are consumed to
    /// create the new state using the corresponding [`From`] trait
    /// implementation (provided such implementation exists).
    fn run(&mut self, settings: &Settings) -> Event;
}

// Synchronize State ===========================================================

/// The initial state of a boot transaction: pulse the target's reset line
/// and wait for its boot signal, bounded by the configured attempt count.
///
/// From here, the state machine can evolve via the following transitions:
///
///  * **[`BootSignalSeenEvent`] => [`SendHeaderState`]** when the boot
///    signal is caught within the allowed attempts,
///  * **[`FailedEvent`] => [`DoneState`]** with
///    [`BootError::NoBootResponse`] when every attempt is exhausted.
pub(crate) struct SynchronizeState {
    /// The physical link, exclusively owned by this transaction. Consumed
    /// and moved to the next state.
    pub link: Option<Box<dyn BootLink>>,
    /// The image to be pushed. Moved along with the link.
    pub image: Option<Vec<u8>>,
}
impl Runnable for SynchronizeState {
    fn run(&mut self, settings: &Settings) -> Event {
        info!("=> Synchronize");

        if let (Some(mut link), Some(image)) = (self.link.take(), self.image.take()) {
            return match wire::wait_for_boot_signal(
                link.as_mut(),
                settings.boot_attempts,
                settings.settle_delay,
                settings.reply_timeout,
            ) {
                Ok(()) => Event::BootSignalSeen(BootSignalSeenEvent {
                    settings: settings.clone(),
                    link,
                    image,
                }),
                Err(e) => Event::Failed(FailedEvent::new(settings, e)),
            };
        }

        // We should never reach here!
        unreachable!()
    }
}
impl_link_state_debug!(SynchronizeState, "SynchronizeState");

// SendHeader State ============================================================

/// Sends the 3-byte frame header (start marker + little-endian length) and
/// waits for the target's acknowledgment.
///
///  * **[`HeaderAcceptedEvent`] => [`SendPayloadState`]** on an ACK,
///  * **[`FailedEvent`] => [`DoneState`]** with
///    [`BootError::HeaderRejected`] on a NACK, an unexpected byte or a
///    timeout.
pub(crate) struct SendHeaderState {
    pub link: Option<Box<dyn BootLink>>,
    pub image: Option<Vec<u8>>,
    /// XOR checksum over the full image, computed on the transition into
    /// this state.
    pub checksum: u8,
}
impl Runnable for SendHeaderState {
    fn run(&mut self, settings: &Settings) -> Event {
        info!("=> SendHeader");

        if let (Some(mut link), Some(image)) = (self.link.take(), self.image.take()) {
            // The image length fits in 16 bits; boot() checked it upfront.
            return match wire::send_header(
                link.as_mut(),
                image.len() as u16,
                settings.wire,
                settings.reply_timeout,
            ) {
                Ok(()) => Event::HeaderAccepted(HeaderAcceptedEvent {
                    settings: settings.clone(),
                    link,
                    image,
                    checksum: self.checksum,
                }),
                Err(e) => Event::Failed(FailedEvent::new(settings, e)),
            };
        }

        // We should never reach here!
        unreachable!()
    }
}
impl_link_state_debug!(SendHeaderState, "SendHeaderState");

// SendPayload State ===========================================================

/// Streams the image to the target, one byte at a time, draining the
/// self-echo after every byte on a one-wire link.
///
///  * **[`PayloadDeliveredEvent`] => [`VerifyState`]** when every byte went
///    out,
///  * **[`FailedEvent`] => [`DoneState`]** with
///    [`BootError::PayloadTransfer`] on the first transmit failure. There
///    is no mid-payload recovery: a dropped byte desynchronizes the
///    target's running checksum.
pub(crate) struct SendPayloadState {
    pub link: Option<Box<dyn BootLink>>,
    pub image: Option<Vec<u8>>,
    pub checksum: u8,
}
impl Runnable for SendPayloadState {
    fn run(&mut self, settings: &Settings) -> Event {
        info!("=> SendPayload");

        if let (Some(mut link), Some(image)) = (self.link.take(), self.image.take()) {
            let pb = ProgressBar::new(image.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "[BP] ⏩ Pushing [{elapsed_precise}] [{bar:40.cyan/blue}] \
                         {bytes}/{total_bytes} ({eta})",
                    )
                    .progress_chars("=>-"),
            );

            let result = wire::send_payload(
                link.as_mut(),
                &image,
                settings.wire,
                settings.reply_timeout,
                |sent| pb.set_position(sent as u64),
            );
            pb.finish_and_clear();

            return match result {
                Ok(()) => Event::PayloadDelivered(PayloadDeliveredEvent {
                    settings: settings.clone(),
                    link,
                    checksum: self.checksum,
                }),
                Err(e) => Event::Failed(FailedEvent::new(settings, e)),
            };
        }

        // We should never reach here!
        unreachable!()
    }
}
impl_link_state_debug!(SendPayloadState, "SendPayloadState");

// Verify State ================================================================

/// Receives the checksum the target computed over the payload, compares it
/// against the locally computed one and closes the transaction with an
/// acknowledgment.
///
///  * **[`ImageVerifiedEvent`] => [`DoneState`]** on a match,
///  * **[`FailedEvent`] => [`DoneState`]** with
///    [`BootError::ChecksumIncorrect`] on a mismatch or a silent target.
pub(crate) struct VerifyState {
    pub link: Option<Box<dyn BootLink>>,
    pub checksum: u8,
}
impl Runnable for VerifyState {
    fn run(&mut self, settings: &Settings) -> Event {
        info!("=> Verify");

        if let Some(mut link) = self.link.take() {
            return match wire::verify_checksum(
                link.as_mut(),
                self.checksum,
                settings.wire,
                settings.reply_timeout,
            ) {
                Ok(()) => Event::ImageVerified(ImageVerifiedEvent {
                    settings: settings.clone(),
                }),
                Err(e) => Event::Failed(FailedEvent::new(settings, e)),
            };
        }

        // We should never reach here!
        unreachable!()
    }
}
impl_link_state_debug!(VerifyState, "VerifyState");

// Done State ==================================================================

/// Reached when the boot transaction completes, successfully or not.
///
/// This state goes into a 2-phase execution. During the initial phase, it
/// runs like any other state to log the outcome, then triggers the
/// [`ExitEvent`] to cause the state machine event loop to terminate and
/// hand the outcome back to the caller.
#[derive(Debug)]
pub(crate) struct DoneState {
    /// The terminal error, if the transaction failed.
    pub failure: Option<BootError>,
    /// When `true` instructs the boot protocol state machine to exit its
    /// event loop.
    pub should_exit: bool,
}
impl Runnable for DoneState {
    fn run(&mut self, settings: &Settings) -> Event {
        match &self.failure {
            None => info!("=> Done, image verified"),
            Some(e) => info!("=> Done with error: {}", e),
        }

        Event::Exit(ExitEvent {
            settings: settings.clone(),
            failure: self.failure.take(),
        })
    }
}
