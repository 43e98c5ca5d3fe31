// Command line interface module
// Handles parsing of command line arguments

use crate::picker::PickMode;
use clap::Parser;
use std::path::PathBuf;

/// Largest window dimension accepted on the command line
const MAX_DIMENSION: u32 = 8192;

/// rsview - A lightweight desktop image viewer for Wayland
#[derive(Parser, Debug)]
#[command(name = "rsview")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Initial window width in pixels
    #[arg(long, default_value = "800", value_parser = parse_dimension)]
    pub width: u32,

    /// Initial window height in pixels
    #[arg(long, default_value = "600", value_parser = parse_dimension)]
    pub height: u32,

    /// Disable GPU rendering and use CPU rendering only
    #[arg(long, default_value = "false")]
    pub cpu: bool,

    /// Extra font file to load for UI text
    #[arg(long, value_name = "PATH")]
    pub font: Option<PathBuf>,

    /// Run file dialogs in the background instead of blocking the window
    #[arg(long, default_value = "false")]
    pub background_picker: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,
}

/// Parsed arguments with resolved options
#[derive(Debug)]
pub struct ParsedArgs {
    pub width: u32,
    pub height: u32,
    /// Use GPU rendering (default true, set to false with --cpu)
    pub use_gpu: bool,
    pub font: Option<PathBuf>,
    pub pick_mode: PickMode,
    pub verbose: bool,
}

impl From<Args> for ParsedArgs {
    fn from(args: Args) -> Self {
        Self {
            width: args.width,
            height: args.height,
            use_gpu: !args.cpu, // GPU is default, --cpu disables it
            font: args.font,
            pick_mode: if args.background_picker {
                PickMode::Background
            } else {
                PickMode::Blocking
            },
            verbose: args.verbose,
        }
    }
}

/// Parse a window dimension and ensure it's within a usable range
fn parse_dimension(s: &str) -> Result<u32, String> {
    let value: u32 = s.parse().map_err(|_| format!("Invalid dimension: {s}"))?;
    if !(1..=MAX_DIMENSION).contains(&value) {
        return Err(format!("Dimension must be between 1 and {MAX_DIMENSION}"));
    }
    Ok(value)
}

/// Parse command line arguments
pub fn parse_args() -> ParsedArgs {
    Args::parse().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ParsedArgs, clap::Error> {
        Args::try_parse_from(std::iter::once("rsview").chain(args.iter().copied())).map(Into::into)
    }

    #[test]
    fn defaults_match_the_reference_resolution() {
        let args = parse(&[]).unwrap();
        assert_eq!((args.width, args.height), (800, 600));
        assert!(args.use_gpu);
        assert_eq!(args.pick_mode, PickMode::Blocking);
        assert!(args.font.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn flags_map_to_options() {
        let args = parse(&[
            "--width",
            "1280",
            "--height",
            "720",
            "--cpu",
            "--background-picker",
            "--font",
            "/usr/share/fonts/a.ttf",
            "-v",
        ])
        .unwrap();
        assert_eq!((args.width, args.height), (1280, 720));
        assert!(!args.use_gpu);
        assert_eq!(args.pick_mode, PickMode::Background);
        assert_eq!(args.font, Some(PathBuf::from("/usr/share/fonts/a.ttf")));
        assert!(args.verbose);
    }

    #[test]
    fn rejects_out_of_range_dimensions() {
        assert!(parse(&["--width", "0"]).is_err());
        assert!(parse(&["--height", "100000"]).is_err());
        assert!(parse(&["--width", "wide"]).is_err());
    }

    #[test]
    fn positional_arguments_are_not_accepted() {
        assert!(parse(&["picture.png"]).is_err());
    }
}
