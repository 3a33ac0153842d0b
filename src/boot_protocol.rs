//! The serial boot protocol: push an image into a freshly reset target's
//! RAM and verify it arrived intact.
//!
//! **Example** - Pushing an image over an already open link:
//! ```ignore
//! use bootpush::{boot, SerialLink, SettingsBuilder};
//!
//! let settings = SettingsBuilder::new()
//!     .path("/dev/ttyUSB0")
//!     .finalize();
//! let link = Box::new(SerialLink::new(port));
//! boot(image, link, &settings)?;
//! ```
//!
//! One `boot()` call is one transaction: synchronize with the target
//! through reset pulses, send the framed header, stream the payload,
//! verify the checksum. The transaction owns the link exclusively until it
//! returns and never runs concurrently with another one; both would fight
//! over the same reset line and UART.

#[macro_use]
mod macros;

mod events;
mod state_machine;
mod states;
pub mod wire;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

use crate::settings::Settings;
use crate::transport::BootLink;

pub use state_machine::{factory, BootProtocol};
pub use wire::{ChecksumError, HeaderError, PayloadError, SyncError};

// =============================================================================
// Public Interface
// =============================================================================

/// Terminal outcome of a failed boot transaction.
///
/// The variants split cleanly into "target unreachable"
/// ([`BootError::NoBootResponse`]) and "target reachable but the transfer
/// or its content went wrong" (everything else), because the two call for
/// different remedies: check wiring and power for the former, check the
/// image for the latter.
#[derive(Debug, Error)]
pub enum BootError {
    /// The image does not fit the header's 16-bit length field.
    #[error("image of {len} bytes does not fit the 16-bit length field")]
    ImageTooLarge { len: usize },
    /// Synchronization exhausted all reset attempts.
    #[error("no boot response: {0}")]
    NoBootResponse(#[from] SyncError),
    /// The target NACKed the header or never acknowledged it.
    #[error("header rejected: {0}")]
    HeaderRejected(#[from] HeaderError),
    /// A byte failed to transmit mid-payload.
    #[error("payload transfer failed: {0}")]
    PayloadTransfer(#[from] PayloadError),
    /// The checksum byte never arrived or did not match.
    #[error("checksum verification failed: {0}")]
    ChecksumIncorrect(#[from] ChecksumError),
}

/// Run one complete boot transaction: reset-synchronize with the target,
/// push `image` over `link` and verify the target's checksum.
///
/// The wire mode, attempt count and timeouts come from `settings`. Images
/// longer than 65 535 bytes are rejected upfront; the protocol's header
/// cannot describe them.
pub fn boot(
    image: Vec<u8>,
    link: Box<dyn BootLink>,
    settings: &Settings,
) -> Result<(), BootError> {
    if image.len() > usize::from(u16::MAX) {
        return Err(BootError::ImageTooLarge { len: image.len() });
    }
    factory(image, link, settings.clone()).run()
}
