//! Byte-level transport abstraction over the serial link to the target.
//!
//! The boot protocol only ever needs three primitives: transmit one byte,
//! receive one byte (both bounded by a caller-supplied timeout) and drive
//! the target's reset line. Everything in
//! [`boot_protocol`](crate::boot_protocol) is written against the traits in
//! this module so the whole protocol can be exercised in tests with a
//! scripted mock instead of real hardware.
//!
//! [`SerialLink`] is the production implementation, adapting a
//! [`SerialPort`](serialport::SerialPort) from the `serialport` crate and
//! pulsing the reset line through RTS.

use std::io::{Read, Write};
use std::time::Duration;

use log::{trace, warn};
use serialport::SerialPort;
use thiserror::Error;

// =============================================================================
// Public Interface
// =============================================================================

/// UART wiring of the link to the target.
///
/// Selected once per transaction and never changed mid-transfer.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum WireMode {
    /// Half-duplex single-wire UART. Every byte the host transmits is
    /// electrically looped back into its own receive path and must be
    /// drained before the next wire action.
    OneWire,
    /// Full-duplex two-wire UART (separate TX/RX). No self-echo.
    TwoWire,
}

/// Errors surfaced by the transport primitives.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The operation did not complete within the supplied timeout.
    #[error("link operation timed out")]
    TimedOut,
    /// Any other device-level I/O failure.
    #[error("link i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Blocking single-byte transmit/receive primitives.
pub trait Transport {
    /// Transmit one byte, blocking for at most `timeout`.
    fn transmit(&mut self, byte: u8, timeout: Duration) -> Result<(), TransportError>;

    /// Receive one byte, blocking for at most `timeout`.
    fn receive(&mut self, timeout: Duration) -> Result<u8, TransportError>;
}

/// Level control of the target's reset line.
///
/// Both operations are assumed infallible at the protocol level; an
/// implementation that can fail should log and carry on, as a missed pulse
/// simply costs one synchronization attempt.
pub trait ResetControl {
    /// Drive the reset line to its active level.
    fn assert_reset(&mut self);

    /// Release the reset line, letting the target start its boot ROM.
    fn deassert_reset(&mut self);
}

/// The full set of capabilities the boot protocol needs from the physical
/// link. Blanket-implemented for anything providing both halves.
pub trait BootLink: Transport + ResetControl {}
impl<T: Transport + ResetControl> BootLink for T {}

// SerialLink ==================================================================

/// Adapter implementing [`Transport`] and [`ResetControl`] on top of a
/// configured and open serial port.
///
/// The target's reset input is expected to be wired to the adapter's RTS
/// output; the pulse is active-high, matching the usual wiring of a
/// DA14531-class target's RST pin to a USB serial adapter.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        SerialLink { port }
    }
}

impl Transport for SerialLink {
    fn transmit(&mut self, byte: u8, timeout: Duration) -> Result<(), TransportError> {
        self.port.set_timeout(timeout).map_err(io_kind)?;
        trace!("tx {:#04x}", byte);
        self.port.write_all(&[byte]).map_err(classify)
    }

    fn receive(&mut self, timeout: Duration) -> Result<u8, TransportError> {
        self.port.set_timeout(timeout).map_err(io_kind)?;
        let mut buf = [0u8; 1];
        self.port.read_exact(&mut buf).map_err(classify)?;
        trace!("rx {:#04x}", buf[0]);
        Ok(buf[0])
    }
}

impl ResetControl for SerialLink {
    fn assert_reset(&mut self) {
        if let Err(e) = self.port.write_request_to_send(true) {
            warn!("could not assert reset over RTS: {}", e);
        }
    }

    fn deassert_reset(&mut self) {
        if let Err(e) = self.port.write_request_to_send(false) {
            warn!("could not release reset over RTS: {}", e);
        }
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let port = &self.port;
        crate::debug_fmt_serialport!(port, f).finish()
    }
}

// =============================================================================
// Private stuff
// =============================================================================

fn io_kind(err: serialport::Error) -> TransportError {
    TransportError::Io(err.into())
}

/// A timed-out read/write on a serial port surfaces as an
/// [`io::ErrorKind::TimedOut`](std::io::ErrorKind::TimedOut); everything
/// else stays an I/O error.
fn classify(err: std::io::Error) -> TransportError {
    if err.kind() == std::io::ErrorKind::TimedOut {
        TransportError::TimedOut
    } else {
        TransportError::Io(err)
    }
}
