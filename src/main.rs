//! # Butterfly-batch CLI
//!
//! Command-line front end for the route-shape geometry of butterfly-batch.
//! Reads a JSON array of `[lon, lat]` pairs from a file or stdin and writes
//! the result as JSON to stdout.

use std::io::Read;

use anyhow::{bail, Context, Result};
use butterfly_batch::geometry::{self, JoinPolicy, OffsetOptions, Side};
use butterfly_batch::{Location, Profile};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, error};

/// Command-line interface for butterfly-batch
#[derive(Parser)]
#[command(name = "butterfly-batch")]
#[command(about = "Route-shape geometry for OpenStreetMap routing results")]
#[command(long_about = "Works on JSON lines of [lon, lat] pairs:
  butterfly-batch simplify route.json --epsilon 0.0001
  butterfly-batch offset route.json --distance 5 --side left
  cat route.json | butterfly-batch simplify - --epsilon 0.0001
  butterfly-batch profile car.json     # Validate and flatten a routing profile")]
#[command(version = env!("BUTTERFLY_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pretty-print the JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Simplify a line, dropping points closer than EPSILON degrees to the kept shape
    Simplify {
        /// Input file, or "-" for stdin
        input: String,

        /// Tolerance in degrees
        #[arg(short, long)]
        epsilon: f64,
    },

    /// Offset a line sideways by DISTANCE metres
    Offset {
        /// Input file, or "-" for stdin
        input: String,

        /// Offset distance in metres
        #[arg(short, long)]
        distance: f64,

        /// Side of the travel direction
        #[arg(long, value_enum, default_value_t = SideArg::Right)]
        side: SideArg,

        /// How adjacent offset segments are joined
        #[arg(long, value_enum, default_value_t = JoinArg::AngleGated)]
        join: JoinArg,
    },

    /// Validate a JSON routing profile and print its engine form
    Profile {
        /// Profile file, or "-" for stdin
        input: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SideArg {
    Left,
    Right,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Left => Side::Left,
            SideArg::Right => Side::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum JoinArg {
    Always,
    AngleGated,
}

impl From<JoinArg> for JoinPolicy {
    fn from(join: JoinArg) -> Self {
        match join {
            JoinArg::Always => JoinPolicy::Always,
            JoinArg::AngleGated => JoinPolicy::AngleGated,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let mut logger = env_logger::Builder::from_default_env();
    logger.target(env_logger::Target::Stderr);
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    if let Err(e) = run(&cli) {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let output = match &cli.command {
        Command::Simplify { input, epsilon } => {
            let line = parse_line(&read_input(input)?)?;
            let simplified = geometry::simplify(&line, *epsilon);
            debug!("Simplified {} points to {}", line.len(), simplified.len());
            to_json(&simplified, cli.pretty)?
        }
        Command::Offset {
            input,
            distance,
            side,
            join,
        } => {
            if !distance.is_finite() {
                bail!("offset distance must be finite, got {distance}");
            }
            let line = parse_line(&read_input(input)?)?;
            let options = OffsetOptions::new(*distance, (*side).into()).with_join((*join).into());
            let shifted = geometry::offset(&line, &options);
            debug!("Offset {} points into {}", line.len(), shifted.len());
            to_json(&shifted, cli.pretty)?
        }
        Command::Profile { input } => {
            let profile = Profile::from_json(&read_input(input)?)
                .with_context(|| format!("invalid profile in {input}"))?;
            let engine_profile = profile.to_engine()?;
            to_json(&engine_profile, cli.pretty)?
        }
    };
    println!("{output}");
    Ok(())
}

/// Read a file, or stdin for "-"
fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read {input}"))
    }
}

/// Parse a JSON array of `[lon, lat]` pairs
fn parse_line(json: &str) -> Result<Vec<Location>> {
    let line: Vec<Location> =
        serde_json::from_str(json).context("expected a JSON array of [lon, lat] pairs")?;
    if let Some(bad) = line.iter().find(|p| !p.lon.is_finite() || !p.lat.is_finite()) {
        bail!("coordinate [{}, {}] is not finite", bad.lon, bad.lat);
    }
    Ok(line)
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let line = parse_line("[[4.35, 50.85], [4.36, 50.86]]").unwrap();
        assert_eq!(line, vec![Location::new(4.35, 50.85), Location::new(4.36, 50.86)]);
        assert!(parse_line("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_line_rejects_bad_input() {
        assert!(parse_line("{\"lon\": 1}").is_err());
        assert!(parse_line("[[1.0]]").is_err());
        assert!(parse_line("[[1.0, 2.0, 3.0]]").is_err());
    }

    #[test]
    fn test_offset_defaults() {
        let cli = Cli::try_parse_from(["butterfly-batch", "offset", "-", "--distance", "5"]).unwrap();
        match cli.command {
            Command::Offset { side, join, distance, .. } => {
                assert_eq!(side, SideArg::Right);
                assert_eq!(join, JoinArg::AngleGated);
                assert_eq!(distance, 5.0);
            }
            _ => panic!("Expected offset command"),
        }
    }

    #[test]
    fn test_join_and_side_flags() {
        let cli = Cli::try_parse_from([
            "butterfly-batch",
            "offset",
            "line.json",
            "-d",
            "2.5",
            "--side",
            "left",
            "--join",
            "always",
            "--pretty",
        ])
        .unwrap();
        assert!(cli.pretty);
        match cli.command {
            Command::Offset { side, join, .. } => {
                assert_eq!(Side::from(side), Side::Left);
                assert_eq!(JoinPolicy::from(join), JoinPolicy::Always);
            }
            _ => panic!("Expected offset command"),
        }
    }

    #[test]
    fn test_simplify_requires_epsilon() {
        assert!(Cli::try_parse_from(["butterfly-batch", "simplify", "line.json"]).is_err());
    }
}
