//! Helper macros for the boot protocol state machine modules.

/// Generate debug formatting code for a [`SerialPort`](serialport::SerialPort)
/// like struct.
#[macro_export]
macro_rules! debug_fmt_serialport {
    ($port:ident, $f:ident) => {
        $f.debug_tuple("")
            .field(&$port.name())
            .field(&$port.baud_rate())
            .field(&$port.data_bits())
            .field(&$port.stop_bits())
            .field(&$port.parity())
            .field(&$port.flow_control())
    };
}

/// Implement [`Debug`](std::fmt::Debug) for a protocol state that holds the
/// boxed boot link (which itself has no useful debug representation).
macro_rules! impl_link_state_debug {
    ($state:ty, $name:literal) => {
        impl std::fmt::Debug for $state {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple($name)
                    .field(&self.link.as_ref().map(|_| "link"))
                    .finish()
            }
        }
    };
}
