//! Serial port device enumeration, selection and opening.

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use serialport::{available_ports, SerialPort, SerialPortType};

use std::{
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

use crate::{utils::poll_escape, Settings};

//==============================================================================
// Public Interface
//==============================================================================

/// Present the list of connected serial devices to the user to
/// interactively select one.
///
/// The user may cancel the selection (with `ESC`) to request a refresh of
/// the connected devices, typically while waiting for a specific device to
/// be plugged in. We keep doing that until a device is selected.
pub(crate) fn select_port() -> Option<String> {
    let mut found_ports;
    let mut attempt: usize = 1;
    let waiting_period: usize = 1;

    let pb = new_spinner();

    // Avoid cursor flicker during the waiting
    Term::stdout().hide_cursor().unwrap();
    // Enumerate connected USB serial devices until we have some.
    loop {
        found_ports = enumerate_usb_serial_ports();
        let num_ports = found_ports.len();
        if num_ports > 0 {
            pb.finish_with_message("Select a port to be used:");
            break;
        }

        let waited = attempt * waiting_period;
        pb.set_message(format!(
            "[{:03}s {}] ⌛ Waiting for a USB serial adapter to be connected...",
            style(waited).dim(),
            num_ports
        ));
        attempt += 1;

        thread::sleep(Duration::from_secs(waiting_period as u64));
    }
    Term::stdout().show_cursor().unwrap();

    // Ask the user to confirm the port selection. A cancelled selection
    // sends us back for another enumeration round, which allows plugging
    // the adapter late without restarting `bootpush`.
    let selection = select_port_interactive(&found_ports);
    match &selection {
        Some(path) => {
            pb.finish_with_message(format!("👍 Serial port {} is ready", style(path).green()));
        }
        None => {
            pb.finish_with_message("❌ Selection canceled -> refreshing...");
        }
    }
    selection
}

/// Check for a device with the given path in the system. If not immediately
/// found, enter into a waiting loop, checking every period of time whether
/// the device has been created or not. While waiting, the user can
/// interactively cancel waiting by pressing the `ESC` key.
///
/// The function will return `true` when the wait was cancelled by the user
/// hitting `Esc`.
pub(crate) fn wait_for_port(path: &str) -> bool {
    let pb = new_spinner();

    let mut found_ports: Vec<String>;
    let mut attempt: usize = 1;
    let waiting_period = 2;

    pb.set_message(format!(
        "[{:03}s] ⏳ Waiting for {} to be ready (ESC to cancel)...",
        style(waiting_period).dim(),
        style(path).cyan()
    ));

    // Two threads cooperate here: the main thread polls the system for the
    // device, and a helper thread polls the keyboard for `ESC`. Each side
    // must be able to stop the other, so a channel runs in each direction:
    // `cancel` from the keyboard thread to the main thread, `done` the
    // other way around.
    let (cancel_tx, cancel_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel();

    let cancelation_thread = thread::spawn(move || loop {
        // Terminate silently once the serial device is ready.
        if done_rx.try_recv().is_ok() {
            break;
        }
        // Poll for the Esc key, non blocking
        if let Ok(esc) = poll_escape() {
            if esc {
                cancel_tx
                    .send(1)
                    .expect("an unrecoverable error while sending over cancel_tx");
                break;
            }
        }
    });

    let mut cancelled = false;
    loop {
        found_ports = enumerate_usb_serial_ports();

        // We are waiting for one specific port; loop until it is part of
        // the detected ones.
        if check_requested_port(&found_ports, path) {
            // Notify the cancellation thread
            done_tx
                .send(1)
                .expect("an unrecoverable error while sending over done_tx");

            pb.finish_with_message(format!("👍 Serial port {} is ready", style(path).green()));
            break;
        }

        // Update the progress message and wait for some time (receiving
        // until timeout from the cancellation channel) before enumerating
        // serial devices again.
        let waited = attempt * waiting_period;
        pb.set_message(format!(
            "[{:03}s {}] ⏳ Waiting for {} to be ready (ESC to cancel)...",
            style(waited).dim(),
            found_ports.len(),
            style(path).cyan()
        ));

        match cancel_rx.recv_timeout(Duration::from_secs(waiting_period as u64)) {
            Ok(_) => {
                // we got cancelled
                pb.finish_with_message(format!(
                    "❌ Waiting on port {} canceled after {} seconds",
                    style(path).cyan(),
                    style(waited).dim()
                ));
                cancelled = true;
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                // try again after a timeout
            }
            Err(RecvTimeoutError::Disconnected) => {
                // no point in waiting anymore :'(
                cancelled = true;
                break;
            }
        }

        attempt += 1;
    }

    // Join the cancellation thread
    cancelation_thread
        .join()
        .expect("an unrecoverable error while joining the cancellation thread");

    cancelled
}

/// Open the port named in `settings` and configure it with the serial
/// parameters from `settings`, retrying a few times to paper over the
/// device node showing up slightly after enumeration.
pub(crate) fn open_and_setup_port(
    settings: &Settings,
) -> Result<Box<dyn SerialPort>, serialport::Error> {
    use retry::{delay, retry_with_index};

    let result = retry_with_index(
        delay::Fixed::from_millis(1000).take(4),
        |index| -> Result<Box<dyn SerialPort>, serialport::Error> {
            debug!("Trying to connect {}", index);
            let path = settings.path.clone().unwrap();
            serialport::new(&path, settings.baud_rate)
                .data_bits(settings.data_bits)
                .stop_bits(settings.stop_bits)
                .parity(settings.parity)
                .flow_control(settings.flow_control)
                .open()
        },
    );
    match result {
        Ok(mut port) => {
            // Configure the port with the values in `settings`. Some
            // drivers only accept the configuration after `open`.
            port.set_baud_rate(settings.baud_rate)?;
            port.set_data_bits(settings.data_bits)?;
            port.set_stop_bits(settings.stop_bits)?;
            port.set_parity(settings.parity)?;
            port.set_flow_control(settings.flow_control)?;

            info!(
                "Connected to {} at {} baud",
                port.name().unwrap_or_default(),
                settings.baud_rate
            );
            debug!("data_bits    : {:#?}", port.data_bits()?);
            debug!("stop_bits    : {:#?}", port.stop_bits()?);
            debug!("parity       : {:#?}", port.parity()?);
            debug!("flow control : {:#?}", port.flow_control()?);

            if port.baud_rate()? != settings.baud_rate {
                return Err(serialport::Error::new(
                    serialport::ErrorKind::InvalidInput,
                    format!(
                        "the port did not accept the baud rate {}; \
                         pick a standard rate or leave the default",
                        settings.baud_rate
                    ),
                ));
            }

            Ok(port)
        }
        Err(err) => match err {
            retry::Error::Operation {
                error,
                total_delay,
                tries,
            } => {
                info!(
                    "Failed to open the port after {:?} and {} tries: {}",
                    total_delay, tries, error,
                );
                Err(error)
            }
            retry::Error::Internal(_) => {
                info!("Internal retry error while opening port");
                Err(serialport::Error::new(
                    serialport::ErrorKind::Unknown,
                    "internal error while retrying to open the port",
                ))
            }
        },
    }
}

//==============================================================================
// Private stuff
//==============================================================================

fn new_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(120);
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"])
            .template("[BP] {spinner:.blue} {msg}"),
    );
    pb
}

fn check_requested_port(ports: &[String], path: &str) -> bool {
    ports.iter().any(|detected| detected.starts_with(path))
}

/// Enumerates serial devices of type USB on the system
fn enumerate_usb_serial_ports() -> Vec<String> {
    let mut usb_ports = vec![];
    match available_ports() {
        Ok(ports) => {
            for p in ports {
                match p.port_type {
                    // USB ports give us more info about the connected
                    // serial controller
                    SerialPortType::UsbPort(info) => {
                        let extended_name = format!(
                            "{}: ({} / {})",
                            p.port_name,
                            info.manufacturer.as_ref().map_or("", String::as_str),
                            info.product.as_ref().map_or("", String::as_str)
                        );
                        usb_ports.push(extended_name);
                    }
                    // We're also interested in the other devices, such as
                    // virtual ports for testing
                    _ => {
                        usb_ports.push(p.port_name);
                    }
                }
            }
        }
        Err(ref e) => {
            info!("error: {}", e.to_string());
        }
    }
    usb_ports
}

fn select_port_interactive(ports: &[String]) -> Option<String> {
    use dialoguer::{theme::ColorfulTheme, Select};

    let term = Term::buffered_stderr();
    let theme = ColorfulTheme::default();

    let mut select = Select::with_theme(&theme);
    for item in ports {
        select.item(item);
    }

    // The entries carry a "path: (manufacturer / product)" decoration; only
    // the path part is the selection result.
    let selection = select.default(0).interact_on_opt(&term).unwrap();
    selection.map(|x| String::from(ports.get(x).unwrap().split(':').next().unwrap()))
}
