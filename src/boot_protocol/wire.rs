//! Wire-level operations of the boot protocol.
//!
//! The exchange with the target's boot ROM is, in order:
//!
//! ```text
//! host                                target
//!   |        <- reset pulse ->          |
//!   |<------------- STX ---------------|   boot signal
//!   |-- SOH len_lo len_hi ------------>|   header, length little-endian
//!   |<------------- ACK ---------------|   header accepted
//!   |-- payload bytes ---------------->|   one byte at a time
//!   |<---------- checksum -------------|   XOR over the payload
//!   |-------------- ACK -------------->|   closes the transaction
//! ```
//!
//! On a one-wire link every host transmission is looped back into the
//! host's own receiver; each function here drains that echo immediately
//! after the transmit it belongs to. The echo for byte *N* must be consumed
//! before byte *N+1* is written, otherwise a stale byte sits in the receive
//! buffer and corrupts the next expected response.

use std::thread;
use std::time::Duration;

use log::{debug, trace};
use retry::{delay, retry, OperationResult};
use thiserror::Error;

use crate::transport::{BootLink, Transport, TransportError, WireMode};

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Boot signal emitted by the target once per reset, target to host.
pub const STX: u8 = 0x02;
/// Start-of-header marker, host to target.
pub const SOH: u8 = 0x01;
/// Accept byte, exchanged at the two checkpoints.
pub const ACK: u8 = 0x06;
/// Reject byte the target may answer the header with.
pub const NACK: u8 = 0x15;

const HEADER_SIZE: usize = 3;

// Errors ======================================================================

/// Synchronization with the freshly reset target failed.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The boot signal never showed up within the allowed reset attempts.
    #[error("no boot signal from the target after {attempts} reset pulses")]
    NoResponse { attempts: u16 },
}

/// The header exchange failed. Both variants are fatal for the transaction;
/// they are kept distinct so diagnostics can tell a silent target from one
/// that explicitly refused the frame.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The target answered the header with something other than [`ACK`].
    #[error("target rejected the header with {response:#04x}")]
    Rejected { response: u8 },
    /// No acknowledgment byte arrived within the transfer timeout.
    #[error("no acknowledgment for the header")]
    NoReply,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// The payload stream broke off mid-transfer. A dropped byte desynchronizes
/// the running checksum on the target and there is no way to resynchronize,
/// so the whole transfer is aborted on the spot.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("failed to transmit payload byte at offset {offset}: {source}")]
    TransmitFailed {
        offset: usize,
        source: TransportError,
    },
}

/// The closing checksum exchange failed.
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// The target never sent its checksum byte.
    #[error("target did not report a checksum")]
    NoResponse,
    /// The target's checksum differs from the locally computed one. The
    /// target is still speaking the protocol correctly, which makes this a
    /// different failure mode from [`ChecksumError::NoResponse`].
    #[error("checksum mismatch: expected {expected:#04x}, target reported {received:#04x}")]
    Mismatch { expected: u8, received: u8 },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// Operations ==================================================================

/// Pulse the target's reset line and wait for its boot signal, retrying up
/// to `max_attempts` times.
///
/// A freshly reset target emits [`STX`] only once per reset and only for a
/// short window while its ROM is racing the application startup, so a
/// single long wait is not enough; every missed window gets a new reset
/// pulse. Any byte other than [`STX`], or a receive timeout, consumes one
/// attempt.
pub fn wait_for_boot_signal<L>(
    link: &mut L,
    max_attempts: u16,
    settle: Duration,
    timeout: Duration,
) -> Result<(), SyncError>
where
    L: BootLink + ?Sized,
{
    if max_attempts == 0 {
        return Err(SyncError::NoResponse { attempts: 0 });
    }

    let result = retry(
        delay::Fixed::from_millis(0).take(usize::from(max_attempts) - 1),
        || {
            link.assert_reset();
            link.deassert_reset();
            thread::sleep(settle);

            match link.receive(timeout) {
                Ok(STX) => OperationResult::Ok(()),
                Ok(other) => {
                    trace!("ignoring {:#04x} while waiting for the boot signal", other);
                    OperationResult::Retry(())
                }
                Err(_) => OperationResult::Retry(()),
            }
        },
    );

    match result {
        Ok(()) => {
            debug!("boot signal received");
            Ok(())
        }
        Err(_) => Err(SyncError::NoResponse {
            attempts: max_attempts,
        }),
    }
}

/// Send the 3-byte frame header (`SOH`, length little-endian) and wait for
/// the target's acknowledgment.
///
/// There is no local retry here: a rejected or unanswered header kills the
/// transaction and the caller has to start over from synchronization.
pub fn send_header<T>(
    transport: &mut T,
    length: u16,
    mode: WireMode,
    timeout: Duration,
) -> Result<(), HeaderError>
where
    T: Transport + ?Sized,
{
    let len = length.to_le_bytes();
    let header: [u8; HEADER_SIZE] = [SOH, len[0], len[1]];
    debug!("sending header {:02x?} for {} byte image", header, length);

    for byte in header.iter() {
        transport.transmit(*byte, timeout)?;
        drain_echo(transport, mode, timeout);
    }

    match transport.receive(timeout) {
        Ok(ACK) => Ok(()),
        Ok(response) => Err(HeaderError::Rejected { response }),
        Err(TransportError::TimedOut) => Err(HeaderError::NoReply),
        Err(e) => Err(e.into()),
    }
}

/// Stream the image to the target, one byte at a time, in order.
///
/// No acknowledgment is expected per byte or for the stream as a whole; the
/// target keeps pace with the host's transmission rate. `progress` is
/// invoked with the number of bytes pushed so far after every byte.
pub fn send_payload<T>(
    transport: &mut T,
    image: &[u8],
    mode: WireMode,
    timeout: Duration,
    mut progress: impl FnMut(usize),
) -> Result<(), PayloadError>
where
    T: Transport + ?Sized,
{
    for (offset, byte) in image.iter().enumerate() {
        transport
            .transmit(*byte, timeout)
            .map_err(|source| PayloadError::TransmitFailed { offset, source })?;
        drain_echo(transport, mode, timeout);
        progress(offset + 1);
    }
    debug!("pushed {} payload bytes", image.len());
    Ok(())
}

/// Receive the checksum the target computed over the payload, compare it
/// against `expected` and close the transaction with an [`ACK`].
///
/// The outcome of this function is the final word on whether the whole
/// transfer succeeded.
pub fn verify_checksum<T>(
    transport: &mut T,
    expected: u8,
    mode: WireMode,
    timeout: Duration,
) -> Result<(), ChecksumError>
where
    T: Transport + ?Sized,
{
    let received = match transport.receive(timeout) {
        Ok(byte) => byte,
        Err(TransportError::TimedOut) => return Err(ChecksumError::NoResponse),
        Err(e) => return Err(e.into()),
    };

    if received != expected {
        return Err(ChecksumError::Mismatch { expected, received });
    }

    transport.transmit(ACK, timeout)?;
    drain_echo(transport, mode, timeout);
    Ok(())
}

// =============================================================================
// Private stuff
// =============================================================================

/// On a one-wire link, consume the self-echo of the byte that was just
/// transmitted. The echoed value is irrelevant, and so is a drain timeout;
/// only emptying the receive buffer before the next wire action matters.
fn drain_echo<T>(transport: &mut T, mode: WireMode, timeout: Duration)
where
    T: Transport + ?Sized,
{
    if mode == WireMode::OneWire {
        let _ = transport.receive(timeout);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot_protocol::testing::{MockLink, Op};

    const T: Duration = Duration::from_millis(0);

    #[test]
    fn sync_succeeds_on_first_marker() {
        let (mut link, log) = MockLink::new(vec![Ok(STX)]);
        wait_for_boot_signal(&mut link, 10, T, T).unwrap();
        assert_eq!(log.borrow().resets, 1);
    }

    #[test]
    fn sync_retries_past_a_stray_byte() {
        let (mut link, log) = MockLink::new(vec![Ok(0xFF), Ok(STX)]);
        wait_for_boot_signal(&mut link, 10, T, T).unwrap();
        assert_eq!(log.borrow().resets, 2);
    }

    #[test]
    fn sync_exhausts_exactly_max_attempts() {
        // An empty script makes every receive time out.
        let (mut link, log) = MockLink::new(vec![]);
        let err = wait_for_boot_signal(&mut link, 10, T, T).unwrap_err();
        let SyncError::NoResponse { attempts } = err;
        assert_eq!(attempts, 10);
        assert_eq!(log.borrow().resets, 10);
        assert_eq!(log.borrow().receives(), 10);
    }

    #[test]
    fn sync_with_zero_attempts_fails_without_touching_the_wire() {
        let (mut link, log) = MockLink::new(vec![Ok(STX)]);
        wait_for_boot_signal(&mut link, 0, T, T).unwrap_err();
        assert_eq!(log.borrow().resets, 0);
        assert_eq!(log.borrow().receives(), 0);
    }

    #[test]
    fn header_encodes_length_little_endian() {
        let (mut link, log) = MockLink::new(vec![Ok(ACK)]);
        send_header(&mut link, 0x1234, WireMode::TwoWire, T).unwrap();
        assert_eq!(log.borrow().sent, vec![SOH, 0x34, 0x12]);
    }

    #[test]
    fn header_length_round_trips() {
        for &n in &[0u16, 1, 255, 256, 0x1234, u16::MAX] {
            let (mut link, log) = MockLink::new(vec![Ok(ACK)]);
            send_header(&mut link, n, WireMode::TwoWire, T).unwrap();
            let sent = &log.borrow().sent;
            assert_eq!(u16::from_le_bytes([sent[1], sent[2]]), n);
        }
    }

    #[test]
    fn header_nack_is_a_rejection() {
        let (mut link, _log) = MockLink::new(vec![Ok(NACK)]);
        match send_header(&mut link, 16, WireMode::TwoWire, T) {
            Err(HeaderError::Rejected { response: NACK }) => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn header_ack_timeout_is_distinct_from_a_nack() {
        let (mut link, _log) = MockLink::new(vec![]);
        match send_header(&mut link, 16, WireMode::TwoWire, T) {
            Err(HeaderError::NoReply) => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn header_one_wire_drains_one_echo_per_byte() {
        // Three echoes, then the ACK.
        let (mut link, log) = MockLink::new(vec![Ok(0), Ok(0), Ok(0), Ok(ACK)]);
        send_header(&mut link, 0x0003, WireMode::OneWire, T).unwrap();
        assert_eq!(
            log.borrow().ops,
            vec![
                Op::Tx(SOH),
                Op::Rx,
                Op::Tx(0x03),
                Op::Rx,
                Op::Tx(0x00),
                Op::Rx,
                Op::Rx, // the ACK itself
            ]
        );
    }

    #[test]
    fn payload_streams_bytes_in_order() {
        let (mut link, log) = MockLink::new(vec![]);
        let image = [0xDE, 0xAD, 0xBE, 0xEF];
        send_payload(&mut link, &image, WireMode::TwoWire, T, |_| {}).unwrap();
        assert_eq!(log.borrow().sent, image.to_vec());
    }

    #[test]
    fn payload_reports_progress_per_byte() {
        let (mut link, _log) = MockLink::new(vec![]);
        let mut seen = Vec::new();
        send_payload(&mut link, &[1, 2, 3], WireMode::TwoWire, T, |n| seen.push(n)).unwrap();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn payload_transmit_failure_carries_the_offset() {
        let (mut link, log) = MockLink::new(vec![]);
        link.fail_transmit_at(2);
        let err = send_payload(&mut link, &[1, 2, 3, 4], WireMode::TwoWire, T, |_| {}).unwrap_err();
        let PayloadError::TransmitFailed { offset, .. } = err;
        assert_eq!(offset, 2);
        // Nothing further went out after the failure.
        assert_eq!(log.borrow().sent, vec![1, 2]);
    }

    #[test]
    fn payload_one_wire_interleaves_drains() {
        let (mut link, log) = MockLink::new(vec![Ok(0), Ok(0)]);
        send_payload(&mut link, &[0x10, 0x20], WireMode::OneWire, T, |_| {}).unwrap();
        assert_eq!(
            log.borrow().ops,
            vec![Op::Tx(0x10), Op::Rx, Op::Tx(0x20), Op::Rx]
        );
    }

    #[test]
    fn verify_matches_and_acknowledges() {
        let (mut link, log) = MockLink::new(vec![Ok(0x5A)]);
        verify_checksum(&mut link, 0x5A, WireMode::TwoWire, T).unwrap();
        assert_eq!(log.borrow().sent, vec![ACK]);
    }

    #[test]
    fn verify_mismatch_keeps_both_values() {
        let (mut link, log) = MockLink::new(vec![Ok(0x00)]);
        match verify_checksum(&mut link, 0x5A, WireMode::TwoWire, T) {
            Err(ChecksumError::Mismatch { expected, received }) => {
                assert_eq!(expected, 0x5A);
                assert_eq!(received, 0x00);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        // No ACK goes out on a mismatch.
        assert!(log.borrow().sent.is_empty());
    }

    #[test]
    fn verify_timeout_is_no_response() {
        let (mut link, _log) = MockLink::new(vec![]);
        match verify_checksum(&mut link, 0x5A, WireMode::TwoWire, T) {
            Err(ChecksumError::NoResponse) => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn verify_one_wire_drains_the_ack_echo() {
        let (mut link, log) = MockLink::new(vec![Ok(0x5A), Ok(ACK)]);
        verify_checksum(&mut link, 0x5A, WireMode::OneWire, T).unwrap();
        assert_eq!(log.borrow().ops, vec![Op::Rx, Op::Tx(ACK), Op::Rx]);
    }
}
