//! Helper functions to locate and load the image file to be pushed.

use std::error::Error;
use std::fs;
use std::io;

use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, Select};
use hexplay::HexViewBuilder;
use log::{debug, info, log_enabled, Level::Debug};

use crate::Settings;

/// Largest image the boot protocol's 16-bit header length can describe.
const MAX_IMAGE_SIZE: usize = 0xFFFF;

/// Read the image to be pushed into memory.
///
/// The path comes from the settings, falling back to `image.bin` in the
/// current working directory, and finally to an interactive selection over
/// the `.bin`/`.img` files found there. Returns `Ok(None)` when the user
/// cancels the selection.
pub(crate) fn load_image(settings: &Settings) -> Result<Option<Vec<u8>>, Box<dyn Error>> {
    let image_path = match &settings.image {
        Some(value) => value.clone(),
        None => "image.bin".into(),
    };

    let mut read_result = fs::read(&image_path);
    if let Err(e) = read_result {
        debug!("`{}` error: {}", &image_path, e);
        debug!("Looking for an image file in current directory");

        loop {
            match select_image_file_interactive() {
                Some(ref name) => {
                    if name.ends_with("cancel and go back...") {
                        return Ok(None);
                    }
                    read_result = fs::read(name);
                    match read_result {
                        Err(ref e) => {
                            debug!("`{}` error: {}", name, e);
                            println!(
                                "{}",
                                style(format!("[BP] 🙁 could not read `{}`, try again...", name))
                                    .yellow()
                            );
                        }
                        Ok(_) => break,
                    }
                }
                None => {
                    debug!("No image file was selected!");
                    // Try again with a refreshed list of files
                }
            }
        }
    }

    let image = read_result?;

    if image.len() > MAX_IMAGE_SIZE {
        // The protocol header only has 2 bytes for the image length; a
        // bigger image cannot be described on the wire.
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "image is {} bytes; the boot protocol can carry at most {}",
                image.len(),
                MAX_IMAGE_SIZE
            ),
        )
        .into());
    }

    info!("loaded {} byte image", image.len());

    // Dump the head of the image in a hex table for debugging
    if log_enabled!(Debug) {
        let head = &image[..image.len().min(64)];
        let view = HexViewBuilder::new(head)
            .address_offset(0)
            .row_width(16)
            .finish();
        println!("{}", view);
    }

    Ok(Some(image))
}

fn select_image_file_interactive() -> Option<String> {
    // List files ending with ".bin" or ".img" in the current working
    // directory and ask the user to select one out of them.
    match fs::read_dir(".") {
        Ok(files) => {
            let mut items: Vec<String> = Vec::new();
            files
                .filter_map(Result::ok)
                .filter(|f| {
                    let path = f.path();
                    let ext = path.extension().unwrap_or_default();
                    ext == "bin" || ext == "img"
                })
                .for_each(|f| {
                    let name = f.file_name();
                    items.push(name.to_string_lossy().into_owned());
                });

            if items.is_empty() {
                debug!("There are no image files in the current directory");
            }

            items.push("🔙cancel and go back...".into());

            let selection = Select::with_theme(&ColorfulTheme::default())
                .items(&items)
                .with_prompt(format!(
                    "Select an image file to push (`{}` to refresh):",
                    style("Esc").cyan()
                ))
                .default(0)
                .interact_on_opt(&Term::stdout());

            match selection {
                Ok(Some(index)) => Some(items[index].clone()),
                Ok(None) => {
                    debug!("user did not select any image file");
                    None
                }
                Err(ref e) => {
                    info!("error: {}", e.to_string());
                    None
                }
            }
        }
        Err(ref e) => {
            info!("error: {}", e.to_string());
            None
        }
    }
}
