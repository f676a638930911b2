//! neugif - Assemble animated GIFs from still frames
//!
//! A command-line tool that feeds a sequence of images through the neugif
//! encoder and inspects the block structure of the result.

use clap::{Parser, Subcommand};
use neugif::{DisposalMethod, EncoderSettings, GifEncoder, Repeat};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod inspect;

#[derive(Parser)]
#[command(name = "neugif")]
#[command(version)]
#[command(about = "Encode still frames into an animated GIF", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode image files (PNG, JPEG, GIF, WebP) as frames of an animated GIF
    Encode {
        /// Frame images, in playback order; all must share the first frame's size
        #[arg(required = true)]
        frames: Vec<PathBuf>,

        /// Output GIF file
        #[arg(short, long)]
        output: PathBuf,

        /// Quantizer sample factor (1-30, lower = better colors but slower)
        #[arg(short, long, default_value = "10")]
        quality: u32,

        /// Frames per second
        #[arg(long, conflicts_with = "delay")]
        fps: Option<f32>,

        /// Delay between frames in milliseconds
        #[arg(short, long)]
        delay: Option<u32>,

        /// Loop count (-1 = play once, 0 = forever)
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        repeat: i32,

        /// Disposal method code (0-3); chosen automatically if omitted
        #[arg(long)]
        dispose: Option<u8>,

        /// Transparent color as RRGGBB hex
        #[arg(short, long, value_parser = parse_hex_color)]
        transparent: Option<[u8; 3]>,

        /// Comment stored with every frame
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// Print the block structure of a GIF file
    Info {
        /// Input GIF file
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Encode {
            frames,
            output,
            quality,
            fps,
            delay,
            repeat,
            dispose,
            transparent,
            comment,
        } => {
            let settings = EncoderSettings {
                quality: quality.clamp(1, 30),
                repeat: Repeat::from_count(repeat)?,
                disposal: dispose.map(DisposalMethod::try_from).transpose()?,
                transparent,
                comment,
                ..EncoderSettings::default()
            };
            let mut encoder = GifEncoder::with_settings(settings)?;
            match (fps, delay) {
                (Some(fps), _) => encoder.set_frame_rate(fps)?,
                (None, Some(ms)) => encoder.set_delay(ms)?,
                (None, None) => encoder.set_frame_rate(10.0)?,
            }

            encoder.start();
            for (i, path) in frames.iter().enumerate() {
                let img = image::open(path)
                    .map_err(|e| format!("Failed to open '{}': {}", path.display(), e))?;
                let rgba_img = img.to_rgba8();
                let (width, height) = rgba_img.dimensions();

                if i == 0 {
                    encoder.configure(width, height)?;
                    info!(
                        "Encoding {} frames at {}x{}, quality={}, delay={}cs",
                        frames.len(),
                        width,
                        height,
                        encoder.settings().quality,
                        encoder.settings().delay_cs
                    );
                }

                encoder
                    .add_frame(rgba_img.as_raw())
                    .map_err(|e| format!("Frame '{}': {}", path.display(), e))?;
                debug!(frame = i, path = %path.display(), "added");
            }
            encoder.finish();

            let bytes = encoder.into_bytes();
            fs::write(&output, &bytes)
                .map_err(|e| format!("Failed to write '{}': {}", output.display(), e))?;
            info!("Written {} bytes to '{}'", bytes.len(), output.display());
        }

        Commands::Info { input } => {
            let data = fs::read(&input)
                .map_err(|e| format!("Failed to read '{}': {}", input.display(), e))?;
            let summary = inspect::GifSummary::parse(&data)?;
            print!("{summary}");
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_hex_color(s: &str) -> Result<[u8; 3], String> {
    let hex = s.trim_start_matches('#');
    if hex.len() != 6 {
        return Err(format!("expected RRGGBB, got '{s}'"));
    }
    let value = u32::from_str_radix(hex, 16).map_err(|e| format!("invalid color '{s}': {e}"))?;
    Ok([(value >> 16) as u8, (value >> 8) as u8, value as u8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("ff8000"), Ok([255, 128, 0]));
        assert_eq!(parse_hex_color("#000001"), Ok([0, 0, 1]));
        assert!(parse_hex_color("fff").is_err());
        assert!(parse_hex_color("gggggg").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
