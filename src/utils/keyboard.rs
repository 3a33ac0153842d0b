//! Non-blocking keyboard polling for cancellable waits.

use std::io::stdout;
use std::{process, time::Duration};

use crossterm::{
    cursor::{Hide, MoveToColumn, Show},
    event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
    Result,
};

/// Poll for half a second whether the user pressed the `ESC` key.
///
/// The terminal is switched into raw mode for the duration of the poll; a
/// `Ctrl+C` observed while in raw mode would not reach the process signal
/// handler, so it is caught here and terminates the process directly.
pub(crate) fn poll_escape() -> Result<bool> {
    enable_raw_mode()?;
    execute!(stdout(), Hide)?;

    let mut esc_pressed = false;
    if poll(Duration::from_millis(500))? {
        // It's guaranteed that read() wont block if `poll` returns
        // `Ok(true)`
        let event = read()?;
        if event == Event::Key(KeyCode::Esc.into()) {
            esc_pressed = true;
        } else if event
            == Event::Key(KeyEvent {
                modifiers: KeyModifiers::CONTROL,
                code: KeyCode::Char('c'),
            })
        {
            // As we are in raw mode, Ctrl+C is captured here as a key event
            // instead of reaching the process signal handler.
            process::exit(0);
        }
    }

    execute!(stdout(), MoveToColumn(0), Show)?;
    disable_raw_mode()?;

    Ok(esc_pressed)
}
