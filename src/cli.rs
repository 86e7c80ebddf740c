//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands. Every
//! command takes the build directory as its first argument, mirroring the
//! `<tool> <command> <out_dir>` shape users know from Ninja generators.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// A meta-build system that resolves declarative build manifests into Ninja files.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory the source root `//` maps to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: Utf8PathBuf,

    /// Alternate dotfile path, relative to the source root.
    #[arg(long, value_name = "FILE")]
    pub dotfile: Option<Utf8PathBuf>,

    /// Change to this directory before doing anything.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<Utf8PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Resolve the graph and write build.ninja into the build directory.
    Gen {
        /// Build directory, relative to the source root (e.g. out/Debug).
        build_dir: String,
    },

    /// Print everything known about one resolved target.
    Desc {
        /// Build directory, relative to the source root.
        build_dir: String,
        /// Label of the target to describe.
        label: String,
    },

    /// Serve desc queries over a Unix socket, one command per connection.
    Serve {
        /// Build directory, relative to the source root.
        build_dir: String,
        /// Socket path; defaults to kanna.sock inside the build directory.
        #[arg(long, value_name = "PATH")]
        socket: Option<Utf8PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gen_parses_with_defaults() {
        let cli = Cli::try_parse_from(["kanna", "gen", "out/Debug"]).expect("parse");
        assert_eq!(cli.root, Utf8PathBuf::from("."));
        assert!(!cli.verbose);
        assert_eq!(
            cli.command,
            Commands::Gen {
                build_dir: "out/Debug".to_owned()
            }
        );
    }

    #[test]
    fn global_flags_parse() {
        let cli = Cli::try_parse_from([
            "kanna",
            "--root",
            "src",
            "--dotfile",
            "foo/.kanna",
            "-v",
            "desc",
            "out",
            "//foo:bar",
        ])
        .expect("parse");
        assert_eq!(cli.root, Utf8PathBuf::from("src"));
        assert_eq!(cli.dotfile.as_deref().map(|d| d.as_str()), Some("foo/.kanna"));
        assert!(cli.verbose);
    }

    #[test]
    fn missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["kanna"]).is_err());
    }
}
