//! Settings for the serial port, the boot protocol timing knobs and the
//! image to be pushed.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values.

use std::time::Duration;

pub use serialport::{DataBits, FlowControl, Parity, StopBits};

use crate::transport::WireMode;

// =============================================================================
// Public Interface
// =============================================================================

/// Groups all settings used by `bootpush`: serial port parameters, protocol
/// timing/retry knobs and the image location. Instances are created through
/// the [`SettingsBuilder`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// The port name, usually the device path.
    pub path: Option<String>,
    /// The baud rate in symbols-per-second.
    pub baud_rate: u32,
    /// Number of bits used to represent a character sent on the line.
    pub data_bits: DataBits,
    /// The type of signalling to use for controlling data transfer.
    pub flow_control: FlowControl,
    /// The type of parity to use for error checking.
    pub parity: Parity,
    /// Number of bits to use to signal the end of a character.
    pub stop_bits: StopBits,

    /// UART wiring towards the target. One-wire links self-echo every
    /// transmitted byte and the protocol drains those echoes.
    pub wire: WireMode,
    /// How many reset pulses to try while waiting for the target's boot
    /// signal before giving up.
    pub boot_attempts: u16,
    /// How long to let the target settle after a reset pulse before
    /// listening for its boot signal.
    pub settle_delay: Duration,
    /// Per-operation timeout for every transmit/receive on the wire.
    pub reply_timeout: Duration,

    /// Path to the image to be pushed. Optional; when not set, `bootpush`
    /// looks for `image.bin` in the current working directory and otherwise
    /// offers the `.bin`/`.img` files found there for selection.
    pub image: Option<String>,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}

/// The builder for the `Settings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set. The protocol defaults (10 boot attempts, 10 ms settle
/// delay) match the narrow emission window of the target's boot ROM.
///
/// **Example**
///
/// ```ignore
/// let settings = SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
/// ```
pub struct SettingsBuilder {
    settings: Settings,
}
impl SettingsBuilder {
    /// Start building the settings using default values and no path for the
    /// port.
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings {
                path: None,
                baud_rate: 115_200,
                data_bits: DataBits::Eight,
                flow_control: FlowControl::None,
                parity: Parity::None,
                stop_bits: StopBits::One,
                wire: WireMode::TwoWire,
                boot_attempts: 10,
                settle_delay: Duration::from_millis(10),
                reply_timeout: Duration::from_millis(500),
                image: None,
                _private_use_builder: (),
            },
        }
    }

    /// Set the path to the serial port
    pub fn path<'a>(mut self, path: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.path = Some(path.into().as_ref().to_owned());
        self
    }

    /// Set the baud rate in symbols-per-second
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.settings.baud_rate = baud_rate;
        self
    }

    /// Set the number of bits used to represent a character sent on the line
    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.settings.data_bits = data_bits;
        self
    }

    /// Set the type of signalling to use for controlling data transfer
    pub fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.settings.flow_control = flow_control;
        self
    }

    /// Set the type of parity to use for error checking
    pub fn parity(mut self, parity: Parity) -> Self {
        self.settings.parity = parity;
        self
    }

    /// Set the number of bits to use to signal the end of a character
    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.settings.stop_bits = stop_bits;
        self
    }

    /// Set the UART wiring towards the target
    pub fn wire(mut self, wire: WireMode) -> Self {
        self.settings.wire = wire;
        self
    }

    /// Set the number of reset pulses to try while synchronizing
    pub fn boot_attempts(mut self, boot_attempts: u16) -> Self {
        self.settings.boot_attempts = boot_attempts;
        self
    }

    /// Set the post-reset settle delay
    pub fn settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settings.settle_delay = settle_delay;
        self
    }

    /// Set the per-operation wire timeout
    pub fn reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.settings.reply_timeout = reply_timeout;
        self
    }

    /// Set the path to the image file to be pushed
    pub fn image<'a>(mut self, image: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.image = Some(image.into().as_ref().to_owned());
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        SettingsBuilder::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = SettingsBuilder::new().finalize();
    assert_eq!(
        settings,
        Settings {
            path: None,
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            wire: WireMode::TwoWire,
            boot_attempts: 10,
            settle_delay: Duration::from_millis(10),
            reply_timeout: Duration::from_millis(500),
            image: None,
            _private_use_builder: (),
        }
    )
}

#[test]
fn path() {
    let settings = SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
    assert_eq!(settings.path.unwrap(), "/dev/ttyUSB0");
}

#[test]
fn baud_rate() {
    let baud_rate = 57_600;
    let settings = SettingsBuilder::new().baud_rate(baud_rate).finalize();
    assert_eq!(settings.baud_rate, baud_rate);
}

#[test]
fn data_bits() {
    let data_bits = DataBits::Seven;
    let settings = SettingsBuilder::new().data_bits(data_bits).finalize();
    assert_eq!(settings.data_bits, data_bits);
}

#[test]
fn flow_control() {
    let flow_control = FlowControl::Hardware;
    let settings = SettingsBuilder::new().flow_control(flow_control).finalize();
    assert_eq!(settings.flow_control, flow_control);
}

#[test]
fn stop_bits() {
    let stop_bits = StopBits::Two;
    let settings = SettingsBuilder::new().stop_bits(stop_bits).finalize();
    assert_eq!(settings.stop_bits, stop_bits);
}

#[test]
fn parity() {
    let parity = Parity::Even;
    let settings = SettingsBuilder::new().parity(parity).finalize();
    assert_eq!(settings.parity, parity);
}

#[test]
fn wire() {
    let settings = SettingsBuilder::new().wire(WireMode::OneWire).finalize();
    assert_eq!(settings.wire, WireMode::OneWire);
}

#[test]
fn boot_attempts() {
    let settings = SettingsBuilder::new().boot_attempts(3).finalize();
    assert_eq!(settings.boot_attempts, 3);
}

#[test]
fn timing() {
    let settings = SettingsBuilder::new()
        .settle_delay(Duration::from_millis(1))
        .reply_timeout(Duration::from_millis(50))
        .finalize();
    assert_eq!(settings.settle_delay, Duration::from_millis(1));
    assert_eq!(settings.reply_timeout, Duration::from_millis(50));
}

#[test]
fn image() {
    let settings = SettingsBuilder::new().image("firmware.bin").finalize();
    assert_eq!(settings.image.unwrap(), "firmware.bin");
}
