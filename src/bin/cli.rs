//! Bootpush command line interface.

use std::process;
use std::time::Duration;

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_t, App, AppSettings::*, Arg,
};
use console::style;
use log::{debug, trace, LevelFilter};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use simplelog::*;

use bootpush::{self as bp, DeviceManager, WireMode};

fn main() {
    println!("[BP] bootpush v{}", crate_version!());

    ctrlc::set_handler(move || {
        println!("🛑 received Ctrl+C!");
        process::exit(0);
    })
    .expect("Failed to install my Ctrl-C handler!");

    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            Bootpush loads a firmware image into the RAM of a small \
            UART-booted target right after the target is reset. The \
            target's boot ROM announces itself for a short window after \
            every reset; bootpush pulses the reset line (wired to RTS) \
            until it catches that window, then: \n\
               \t* sends a 3-byte header (start marker + image size, \
            lowest order byte first) \n\
               \t* waits for the target to acknowledge the header \n\
               \t* streams the image one byte at a time \n\
               \t* checks the XOR checksum the target computed and \
            acknowledges it \n\
            \n\
            On a single-wire UART (--wire=one) every transmitted byte \
            echoes back into the host receiver; bootpush drains those \
            echoes byte-for-byte.\n\
            \n\
            Bootpush can be started before or after the target is plugged \
            in, and can wait for the serial adapter to show up.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .arg(
            Arg::with_name("DEVICE_TTY")
                .help("the USB tty device to use")
                .long_help(
                    "the USB tty device to use; may change when the adapter \
                     is unplugged and re-plugged and may differ between \
                     systems. You can opt for selecting a new device while \
                     `bootpush` is running.",
                )
                .short("-t")
                .long("--tty")
                .takes_value(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("BAUD_RATE")
                .help("serial port baud rate")
                .long_help("serial baud rate")
                .short("-b")
                .long("--baud-rate")
                .takes_value(true)
                .default_value("115200")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("DATA_BITS")
                .help("number of bits per character")
                .short("-d")
                .long("--data-bits")
                .takes_value(true)
                .possible_values(&["5", "6", "7", "8"])
                .default_value("8")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("STOP_BITS")
                .help("number of stop bits per byte")
                .short("-s")
                .long("--stop-bits")
                .takes_value(true)
                .possible_values(&["1", "2"])
                .default_value("1")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("PARITY")
                .help("parity checking protocol")
                .short("-p")
                .long("--parity")
                .takes_value(true)
                .possible_values(&["none", "odd", "even"])
                .default_value("none")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("FLOW_CONTROL")
                .help("flow control mode")
                .short("-f")
                .long("--flow-control")
                .takes_value(true)
                .possible_values(&["none", "soft", "hard"])
                .default_value("none")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("WIRE")
                .help("UART wiring towards the target")
                .long_help(
                    "UART wiring towards the target; on a single-wire \
                     (half-duplex) link every transmitted byte is echoed \
                     back and bootpush drains the echoes.",
                )
                .short("-w")
                .long("--wire")
                .takes_value(true)
                .possible_values(&["one", "two"])
                .default_value("two")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("ATTEMPTS")
                .help("reset pulses to try while waiting for the boot signal")
                .short("-a")
                .long("--attempts")
                .takes_value(true)
                .default_value("10")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("TIMEOUT_MS")
                .help("per-operation wire timeout, in milliseconds")
                .long("--timeout")
                .takes_value(true)
                .default_value("500")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("IMAGE")
                .help("path to the image to be pushed")
                .long_help(
                    "path to the image to be pushed; when not set, \
                     `bootpush` will look for `image.bin` in the current \
                     working directory.",
                )
                .index(1),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .get_matches();

    // Vary the output based on how many times the user used the "verbose"
    // flag (i.e. 'bootpush -v -v -v' or 'bootpush -vvv' vs 'bootpush -v'
    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    TermLogger::init(log_level, Config::default(), TerminalMode::Mixed).unwrap();

    trace!("{:#?}", matches);

    // Arguments with default values ===========================================

    // It's safe to call unwrap on all command line arguments with default
    // values, because the value will either be what the user input at
    // runtime or the default value

    let baud_rate = value_t!(matches.value_of("BAUD_RATE"), u32).unwrap_or_else(|_| {
        bad_numeric_value("baud-rate", matches.value_of("BAUD_RATE").unwrap())
    });

    let attempts = value_t!(matches.value_of("ATTEMPTS"), u16).unwrap_or_else(|_| {
        bad_numeric_value("attempts", matches.value_of("ATTEMPTS").unwrap())
    });

    let timeout_ms = value_t!(matches.value_of("TIMEOUT_MS"), u64).unwrap_or_else(|_| {
        bad_numeric_value("timeout", matches.value_of("TIMEOUT_MS").unwrap())
    });

    let data_bits = match matches.value_of("DATA_BITS").unwrap() {
        "5" => DataBits::Five,
        "6" => DataBits::Six,
        "7" => DataBits::Seven,
        "8" => DataBits::Eight,
        _ => unreachable!(),
    };

    let stop_bits = match matches.value_of("STOP_BITS").unwrap() {
        "1" => StopBits::One,
        "2" => StopBits::Two,
        _ => unreachable!(),
    };

    let parity = match matches.value_of("PARITY").unwrap() {
        "none" => Parity::None,
        "even" => Parity::Even,
        "odd" => Parity::Odd,
        _ => unreachable!(),
    };

    let flow_control = match matches.value_of("FLOW_CONTROL").unwrap() {
        "none" => FlowControl::None,
        "soft" => FlowControl::Software,
        "hard" => FlowControl::Hardware,
        _ => unreachable!(),
    };

    let wire = match matches.value_of("WIRE").unwrap() {
        "one" => WireMode::OneWire,
        "two" => WireMode::TwoWire,
        _ => unreachable!(),
    };

    // END - Arguments with default values =====================================

    let mut settings = bp::SettingsBuilder::default()
        .baud_rate(baud_rate)
        .data_bits(data_bits)
        .stop_bits(stop_bits)
        .parity(parity)
        .flow_control(flow_control)
        .wire(wire)
        .boot_attempts(attempts)
        .reply_timeout(Duration::from_millis(timeout_ms))
        .finalize();

    // START - Arguments with NO default values ================================

    if matches.is_present("DEVICE_TTY") {
        settings.path = Some(matches.value_of("DEVICE_TTY").unwrap().into());
    }

    if matches.is_present("IMAGE") {
        settings.image = Some(matches.value_of("IMAGE").unwrap().into());
    }

    // END - Arguments =========================================================

    // Run the state machine ===================================================

    let mut sdm = bp::singleton(settings);
    let exit_code = sdm.run();
    debug!("exit code: {}", exit_code);
    std::process::exit(exit_code.into());
}

fn bad_numeric_value(name: &str, value: &str) -> ! {
    println!(
        "{}: `{}` needs to be a numeric value",
        style("error").red(),
        style(name).cyan()
    );
    println!(
        "   {} `{}` is not a valid value",
        style("-->").cyan(),
        style(value).on_red()
    );
    process::exit(-1);
}
