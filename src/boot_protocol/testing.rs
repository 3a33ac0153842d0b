//! Scripted transport mock for exercising the boot protocol without
//! hardware.
//!
//! The mock plays back a script of receive outcomes and records every
//! operation it sees (transmits with their byte values, receives, reset
//! pulses) into a shared [`LinkLog`]. Tests keep a handle to the log so
//! they can inspect the traffic even after the link has been boxed up and
//! consumed by the state machine.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::transport::{ResetControl, Transport, TransportError};

/// One recorded wire operation, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Tx(u8),
    Rx,
}

/// Everything the mock observed.
#[derive(Debug, Default)]
pub(crate) struct LinkLog {
    /// Every successfully transmitted byte, in order.
    pub sent: Vec<u8>,
    /// Number of reset pulses (assert followed by deassert).
    pub resets: u16,
    /// The full interleaved operation sequence.
    pub ops: Vec<Op>,
}

impl LinkLog {
    pub fn receives(&self) -> usize {
        self.ops.iter().filter(|op| **op == Op::Rx).count()
    }
}

pub(crate) struct MockLink {
    script: VecDeque<Result<u8, TransportError>>,
    log: Rc<RefCell<LinkLog>>,
    fail_transmit_at: Option<usize>,
    transmits: usize,
    reset_asserted: bool,
}

impl MockLink {
    /// Build a mock whose receives play back `script` in order; once the
    /// script runs out, every receive times out.
    pub fn new(
        script: Vec<Result<u8, TransportError>>,
    ) -> (Self, Rc<RefCell<LinkLog>>) {
        let log = Rc::new(RefCell::new(LinkLog::default()));
        let link = MockLink {
            script: script.into(),
            log: Rc::clone(&log),
            fail_transmit_at: None,
            transmits: 0,
            reset_asserted: false,
        };
        (link, log)
    }

    /// Make the n-th transmit (0-based) fail with a timeout.
    pub fn fail_transmit_at(&mut self, n: usize) {
        self.fail_transmit_at = Some(n);
    }
}

impl Transport for MockLink {
    fn transmit(&mut self, byte: u8, _timeout: Duration) -> Result<(), TransportError> {
        let index = self.transmits;
        self.transmits += 1;
        if self.fail_transmit_at == Some(index) {
            return Err(TransportError::TimedOut);
        }
        let mut log = self.log.borrow_mut();
        log.ops.push(Op::Tx(byte));
        log.sent.push(byte);
        Ok(())
    }

    fn receive(&mut self, _timeout: Duration) -> Result<u8, TransportError> {
        self.log.borrow_mut().ops.push(Op::Rx);
        self.script
            .pop_front()
            .unwrap_or(Err(TransportError::TimedOut))
    }
}

impl ResetControl for MockLink {
    fn assert_reset(&mut self) {
        self.reset_asserted = true;
    }

    fn deassert_reset(&mut self) {
        if self.reset_asserted {
            self.log.borrow_mut().resets += 1;
            self.reset_asserted = false;
        }
    }
}
