//! The boot protocol state machine.
//!
//! A boot transaction traverses the machine at most once; there are no
//! internal retries past synchronization and no state is ever revisited.
//! All resilience is front-loaded into the synchronizer's reset-retry loop,
//! because that is the only point where retrying is safe: once the header
//! has gone out, any hiccup desynchronizes the target and only a new reset
//! can recover it.
//!
//! ```text
//!  Synchronize --> SendHeader --> SendPayload --> Verify --> Done(ok)
//!       |               |              |             |
//!       '---------------+--------------+-------------+-----> Done(error)
//! ```

use super::events::*;
use super::states::*;
use super::BootError;
use crate::settings::Settings;
use crate::transport::BootLink;

// =============================================================================
// Public Interface
// =============================================================================

/// Represents one boot transaction as a state machine. Use the `factory()`
/// function to get an instance then run it by calling its `run()` method.
pub struct BootProtocol {
    sm: ProtocolStates,
}
impl BootProtocol {
    /// The boot protocol state machine event loop runs until the `Done`
    /// state is reached and its `should_exit` flag is set. At such point,
    /// the event loop terminates and the transaction outcome is returned.
    pub fn run(&mut self) -> Result<(), BootError> {
        loop {
            self.sm = self.sm.step();
            if let ProtocolStates::Done(sm) = &mut self.sm {
                if sm.state.should_exit {
                    return match sm.state.failure.take() {
                        None => Ok(()),
                        Some(error) => Err(error),
                    };
                }
            }
        }
    }
}

/// Factory function for the boot protocol state machine. Use it to get an
/// instance of the state machine, which you can run by invoking its `run()`
/// method.
///
/// The machine takes exclusive ownership of the link for the whole
/// transaction; the reset line and the UART must not be driven by anything
/// else until `run()` returns.
pub fn factory(image: Vec<u8>, link: Box<dyn BootLink>, settings: Settings) -> BootProtocol {
    BootProtocol {
        // A transaction naturally starts by synchronizing with the target.
        sm: ProtocolStates::Synchronize(ProtocolSM::new(image, link, settings)),
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// The raw state machine implementing the boot transaction.
///
/// This is a private interface, abstracted for a simpler and more intuitive
/// use in the public [`BootProtocol`] interface.
///
/// Note that using a generic type that holds the current state serves two
/// purposes. It allows for also having shared data by all states that is
/// not really part of state data (the settings), and it's nicer when
/// debugging to see the state machine and the current state it is holding
/// at any time.
#[derive(Debug)]
struct ProtocolSM<S: Runnable> {
    settings: Settings,
    state: S,
}
impl<S: Runnable> ProtocolSM<S> {
    fn run(&mut self) -> Event {
        self.state.run(&self.settings)
    }
}

/// The state machine starts in the `SynchronizeState`.
impl ProtocolSM<SynchronizeState> {
    fn new(image: Vec<u8>, link: Box<dyn BootLink>, settings: Settings) -> Self {
        ProtocolSM {
            settings,
            state: SynchronizeState {
                link: Some(link),
                image: Some(image),
            },
        }
    }
}

/// An enum wrapper around the states of the boot protocol state machine. It
/// provides a simpler and more intuitive model for manipulating states and
/// their transitions.
enum ProtocolStates {
    Synchronize(ProtocolSM<SynchronizeState>),
    SendHeader(ProtocolSM<SendHeaderState>),
    SendPayload(ProtocolSM<SendPayloadState>),
    Verify(ProtocolSM<VerifyState>),
    Done(ProtocolSM<DoneState>),
}
impl ProtocolStates {
    /// The unit of work in the state machine event loop. It checks the
    /// current state and the current event and decides the next transition.
    /// State transitions from events are implemented using the rust
    /// `From`/`Into` pattern. Most of the potential errors of
    /// state/event/transition mismatches can be caught at compile time.
    fn step(&mut self) -> Self {
        match self {
            ProtocolStates::Synchronize(sm) => {
                let event = sm.run();
                match event {
                    Event::BootSignalSeen(ev) => ProtocolStates::SendHeader(ev.into()),
                    Event::Failed(ev) => ProtocolStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            ProtocolStates::SendHeader(sm) => {
                let event = sm.run();
                match event {
                    Event::HeaderAccepted(ev) => ProtocolStates::SendPayload(ev.into()),
                    Event::Failed(ev) => ProtocolStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            ProtocolStates::SendPayload(sm) => {
                let event = sm.run();
                match event {
                    Event::PayloadDelivered(ev) => ProtocolStates::Verify(ev.into()),
                    Event::Failed(ev) => ProtocolStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            ProtocolStates::Verify(sm) => {
                let event = sm.run();
                match event {
                    Event::ImageVerified(ev) => ProtocolStates::Done(ev.into()),
                    Event::Failed(ev) => ProtocolStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            ProtocolStates::Done(sm) => {
                let event = sm.run();
                match event {
                    Event::Exit(ev) => ProtocolStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl From<BootSignalSeenEvent> for ProtocolSM<SendHeaderState> {
    fn from(event: BootSignalSeenEvent) -> ProtocolSM<SendHeaderState> {
        // The checksum over the full image is fixed from here on; the
        // verify state compares it against what the target reports.
        let checksum = crate::checksum::xor_checksum(&event.image);
        ProtocolSM {
            settings: event.settings,
            state: SendHeaderState {
                link: Some(event.link),
                image: Some(event.image),
                checksum,
            },
        }
    }
}

impl From<HeaderAcceptedEvent> for ProtocolSM<SendPayloadState> {
    fn from(event: HeaderAcceptedEvent) -> ProtocolSM<SendPayloadState> {
        ProtocolSM {
            settings: event.settings,
            state: SendPayloadState {
                link: Some(event.link),
                image: Some(event.image),
                checksum: event.checksum,
            },
        }
    }
}

impl From<PayloadDeliveredEvent> for ProtocolSM<VerifyState> {
    fn from(event: PayloadDeliveredEvent) -> ProtocolSM<VerifyState> {
        ProtocolSM {
            settings: event.settings,
            state: VerifyState {
                link: Some(event.link),
                checksum: event.checksum,
            },
        }
    }
}

impl From<ImageVerifiedEvent> for ProtocolSM<DoneState> {
    fn from(event: ImageVerifiedEvent) -> ProtocolSM<DoneState> {
        ProtocolSM {
            settings: event.settings,
            state: DoneState {
                failure: None,
                should_exit: false,
            },
        }
    }
}
impl From<FailedEvent> for ProtocolSM<DoneState> {
    fn from(event: FailedEvent) -> ProtocolSM<DoneState> {
        ProtocolSM {
            settings: event.settings,
            state: DoneState {
                failure: Some(event.error),
                should_exit: false,
            },
        }
    }
}
impl From<ExitEvent> for ProtocolSM<DoneState> {
    fn from(event: ExitEvent) -> ProtocolSM<DoneState> {
        ProtocolSM {
            settings: event.settings,
            state: DoneState {
                failure: event.failure,
                should_exit: true,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::boot;
    use super::*;
    use crate::boot_protocol::testing::{MockLink, Op};
    use crate::boot_protocol::wire::{ACK, NACK, SOH, STX};
    use crate::settings::SettingsBuilder;
    use crate::transport::WireMode;

    fn fast_settings() -> Settings {
        SettingsBuilder::new()
            .settle_delay(Duration::from_millis(0))
            .reply_timeout(Duration::from_millis(0))
            .finalize()
    }

    #[test]
    fn happy_path_two_wire() {
        // Image [0x10, 0x20, 0x30] has XOR checksum 0x00.
        let (link, log) = MockLink::new(vec![Ok(STX), Ok(ACK), Ok(0x00)]);

        boot(vec![0x10, 0x20, 0x30], Box::new(link), &fast_settings()).unwrap();

        let log = log.borrow();
        // One reset pulse was enough.
        assert_eq!(log.resets, 1);
        // Header, the 3 payload bytes in order, then the closing ACK.
        assert_eq!(
            log.sent,
            vec![SOH, 0x03, 0x00, 0x10, 0x20, 0x30, ACK]
        );
    }

    #[test]
    fn happy_path_one_wire_drains_every_echo() {
        // Script: boot signal, 3 header echoes, header ACK, 2 payload
        // echoes, checksum byte, closing ACK echo.
        let (link, log) = MockLink::new(vec![
            Ok(STX),
            Ok(SOH),
            Ok(0x02),
            Ok(0x00),
            Ok(ACK),
            Ok(0xAA),
            Ok(0x55),
            Ok(0xAA ^ 0x55),
            Ok(ACK),
        ]);
        let settings = SettingsBuilder::new()
            .wire(WireMode::OneWire)
            .settle_delay(Duration::from_millis(0))
            .reply_timeout(Duration::from_millis(0))
            .finalize();

        boot(vec![0xAA, 0x55], Box::new(link), &settings).unwrap();

        // Every transmit is immediately followed by exactly one drain.
        let log = log.borrow();
        assert_eq!(
            log.ops,
            vec![
                Op::Rx, // boot signal
                Op::Tx(SOH),
                Op::Rx,
                Op::Tx(0x02),
                Op::Rx,
                Op::Tx(0x00),
                Op::Rx,
                Op::Rx, // header ACK
                Op::Tx(0xAA),
                Op::Rx,
                Op::Tx(0x55),
                Op::Rx,
                Op::Rx, // checksum byte
                Op::Tx(ACK),
                Op::Rx,
            ]
        );
    }

    #[test]
    fn silent_target_exhausts_all_reset_attempts() {
        let (link, log) = MockLink::new(vec![]);
        let settings = SettingsBuilder::new()
            .boot_attempts(4)
            .settle_delay(Duration::from_millis(0))
            .reply_timeout(Duration::from_millis(0))
            .finalize();

        let err = boot(vec![1, 2, 3], Box::new(link), &settings).unwrap_err();

        assert!(matches!(err, BootError::NoBootResponse(_)));
        let log = log.borrow();
        assert_eq!(log.resets, 4);
        // Nothing was ever transmitted.
        assert!(log.sent.is_empty());
    }

    #[test]
    fn rejected_header_sends_no_payload() {
        let (link, log) = MockLink::new(vec![Ok(STX), Ok(NACK)]);

        let err = boot(vec![1, 2, 3], Box::new(link), &fast_settings()).unwrap_err();

        assert!(matches!(err, BootError::HeaderRejected(_)));
        // Only the 3 header bytes went out.
        assert_eq!(log.borrow().sent, vec![SOH, 0x03, 0x00]);
    }

    #[test]
    fn payload_transmit_failure_aborts_with_offset() {
        let (mut link, _log) = MockLink::new(vec![Ok(STX), Ok(ACK)]);
        // Header takes transmits 0..3; fail the second payload byte.
        link.fail_transmit_at(4);

        let err = boot(vec![9, 8, 7], Box::new(link), &fast_settings()).unwrap_err();

        match err {
            BootError::PayloadTransfer(e) => {
                assert!(e.to_string().contains("offset 1"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn checksum_mismatch_withholds_the_final_ack() {
        let (link, log) = MockLink::new(vec![Ok(STX), Ok(ACK), Ok(0xFF)]);

        let err = boot(vec![0x10, 0x20, 0x30], Box::new(link), &fast_settings()).unwrap_err();

        assert!(matches!(err, BootError::ChecksumIncorrect(_)));
        // Header + payload only; no ACK after the bad checksum.
        assert_eq!(log.borrow().sent.len(), 6);
    }

    #[test]
    fn checksum_silence_is_also_incorrect() {
        let (link, _log) = MockLink::new(vec![Ok(STX), Ok(ACK)]);
        let err = boot(vec![0x01], Box::new(link), &fast_settings()).unwrap_err();
        assert!(matches!(err, BootError::ChecksumIncorrect(_)));
    }

    #[test]
    fn empty_image_is_pushed_with_zero_checksum() {
        let (link, log) = MockLink::new(vec![Ok(STX), Ok(ACK), Ok(0x00)]);

        boot(Vec::new(), Box::new(link), &fast_settings()).unwrap();

        // Zero-length header, no payload, closing ACK.
        assert_eq!(log.borrow().sent, vec![SOH, 0x00, 0x00, ACK]);
    }

    #[test]
    fn oversized_image_is_rejected_before_the_wire() {
        let (link, log) = MockLink::new(vec![Ok(STX)]);

        let err = boot(vec![0; 65_536], Box::new(link), &fast_settings()).unwrap_err();

        assert!(matches!(err, BootError::ImageTooLarge { .. }));
        let log = log.borrow();
        assert_eq!(log.resets, 0);
        assert!(log.ops.is_empty());
    }

    #[test]
    fn largest_image_length_is_accepted() {
        let image = vec![0xA5; 65_535];
        let expected_checksum = 0xA5; // odd count of identical bytes
        let (link, log) = MockLink::new(vec![Ok(STX), Ok(ACK), Ok(expected_checksum)]);

        boot(image, Box::new(link), &fast_settings()).unwrap();

        let sent = &log.borrow().sent;
        assert_eq!(&sent[..3], &[SOH, 0xFF, 0xFF]);
        assert_eq!(sent.len(), 3 + 65_535 + 1);
    }
}
