//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u16
fn parse_hex_u16(s: &str) -> Result<u16, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u16>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal usize
fn parse_hex_usize(s: &str) -> Result<usize, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<usize>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "c3flash")]
#[command(author, version, about = "Controleo3 serial flash tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Backend to use: sim[:image=<file>] or linux_gpio:dev=...,cs=..,sck=..,io0..io3=..
    #[arg(short, long, global = true, default_value = "sim")]
    pub programmer: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Protection profile names on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProfileArg {
    /// Whole chip read-only
    All,
    /// Everything writable
    None,
    /// Only preferences and profiles writable
    NotPrefs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Verify the chip identity and print its unique ID
    Probe,

    /// Show status registers and protection
    Status,

    /// Apply a protection profile
    Protect {
        /// Profile to apply
        #[arg(value_enum)]
        profile: ProfileArg,

        /// Also write the non-volatile status registers
        #[arg(long)]
        permanent: bool,
    },

    /// Erase part or all of the chip
    #[command(subcommand)]
    Erase(EraseCommands),

    /// List provisioned bitmaps
    Catalog,

    /// Append bitmaps listed in a TOML manifest
    Provision {
        /// Manifest file
        manifest: PathBuf,

        /// Erase the whole chip first and start from bitmap 0
        #[arg(long)]
        erase: bool,
    },

    /// Stream one bitmap's pixel data to a file
    DumpBitmap {
        /// Bitmap index
        index: u16,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Read raw bytes starting at a page
    Read {
        /// First page (hex or decimal)
        #[arg(long, value_parser = parse_hex_u16, default_value = "0")]
        page: u16,

        /// Number of bytes (hex or decimal), defaults to the rest of the chip
        #[arg(long, value_parser = parse_hex_usize)]
        length: Option<usize>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Erase subcommands
#[derive(Subcommand)]
pub enum EraseCommands {
    /// Erase the whole chip, leaving it unprotected
    Chip,

    /// Erase one preferences slot (0-3)
    Prefs {
        /// Slot number
        slot: u8,
    },

    /// Erase the 4K profile sector starting at a page (64-511, multiple of 16)
    Profile {
        /// First page of the sector (hex or decimal)
        #[arg(value_parser = parse_hex_u16)]
        page: u16,
    },

    /// Erase all preferences and profiles
    FactoryReset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_or_decimal() {
        assert_eq!(parse_hex_u16("0x200"), Ok(512));
        assert_eq!(parse_hex_u16("528"), Ok(528));
        assert!(parse_hex_u16("0x10000").is_err());
        assert_eq!(parse_hex_usize("0X100"), Ok(256));
    }

    #[test]
    fn test_protect_command() {
        let cli = Cli::try_parse_from(["c3flash", "protect", "not-prefs", "--permanent"]).unwrap();
        assert_eq!(cli.programmer, "sim");
        match cli.command {
            Commands::Protect { profile, permanent } => {
                assert_eq!(profile, ProfileArg::NotPrefs);
                assert!(permanent);
            }
            _ => panic!("expected protect"),
        }
    }

    #[test]
    fn test_global_programmer_after_subcommand() {
        let cli = Cli::try_parse_from([
            "c3flash",
            "erase",
            "profile",
            "0x40",
            "-p",
            "sim:image=flash.bin",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.programmer, "sim:image=flash.bin");
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Erase(EraseCommands::Profile { page: 64 })
        ));
    }

    #[test]
    fn test_read_defaults() {
        let cli = Cli::try_parse_from(["c3flash", "read", "-o", "out.bin"]).unwrap();
        match cli.command {
            Commands::Read { page, length, .. } => {
                assert_eq!(page, 0);
                assert_eq!(length, None);
            }
            _ => panic!("expected read"),
        }
    }
}
