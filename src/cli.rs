use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use log::LevelFilter;

pub(crate) const DEFAULT_CONFDIR: &str = "/etc/ofconfig";

/// Environment variable holding the default verbosity level.
pub(crate) const ENVIRONMENT_VERBOSE: &str = "OFC_VERBOSE";

/// Interval at which the main loop re-checks for shutdown.
pub(crate) const DEFAULT_TICK: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[clap(name = "ofconfig-server", author, version, about, long_about = None)]
#[clap(args_override_self = true)]
struct Args {
    /// Run in foreground
    #[clap(short, long)]
    foreground: bool,

    /// Verbose output level (0 error, 1 warning, 2 verbose, 3 debug)
    #[clap(
        short,
        long,
        value_name = "LEVEL",
        env = ENVIRONMENT_VERBOSE,
        allow_hyphen_values = true,
        value_parser = parse_level
    )]
    verbose: Option<i64>,

    /// Directory holding data models and datastores
    #[clap(short, long, value_name = "DIR", value_parser, default_value = DEFAULT_CONFDIR)]
    confdir: PathBuf,

    /// Operands are accepted and ignored.
    #[clap(hide = true, value_parser)]
    _operands: Vec<OsString>,
}

/// Reads a level the way `atoi` does: an optional sign and leading digits,
/// anything else counts as zero. Overlong numbers saturate.
fn parse_level(s: &str) -> Result<i64, String> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut level: i64 = 0;
    for d in digits.bytes().take_while(u8::is_ascii_digit) {
        level = level.saturating_mul(10).saturating_add(i64::from(d - b'0'));
    }
    Ok(if negative { -level } else { level })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Verbosity {
    Error = 0,
    Warning = 1,
    Verbose = 2,
    Debug = 3,
}

impl Verbosity {
    /// Maps any level onto the supported range.
    pub(crate) fn clamped(level: i64) -> Self {
        match level {
            i64::MIN..=0 => Verbosity::Error,
            1 => Verbosity::Warning,
            2 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    }

    pub(crate) fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Error => LevelFilter::Error,
            Verbosity::Warning => LevelFilter::Warn,
            Verbosity::Verbose => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) daemonize: bool,
    pub(crate) verbosity: Verbosity,
    pub(crate) confdir: PathBuf,
    pub(crate) tick: Duration,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            daemonize: !args.foreground,
            verbosity: Verbosity::clamped(args.verbose.unwrap_or(0)),
            confdir: args.confdir,
            tick: DEFAULT_TICK,
        }
    }
}

#[derive(Debug)]
pub(crate) enum Outcome {
    Run(Config),
    /// Print the text to stdout and exit successfully.
    Exit(String),
}

fn usage() -> String {
    let mut buf = Vec::new();
    if Args::command().write_help(&mut buf).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

pub(crate) fn parse_from<I, T>(args: I) -> Outcome
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Args::try_parse_from(args) {
        Ok(args) => Outcome::Run(args.into()),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Outcome::Exit(e.to_string()),
            _ => Outcome::Exit(usage()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Config {
        match parse_from(args.iter().copied()) {
            Outcome::Run(config) => config,
            Outcome::Exit(text) => panic!("unexpected exit: {}", text),
        }
    }

    fn exits(args: &[&str]) -> bool {
        matches!(parse_from(args.iter().copied()), Outcome::Exit(_))
    }

    #[test]
    fn test_defaults() {
        let config = run(&["ofconfig-server"]);
        assert!(config.daemonize);
        assert_eq!(config.confdir, PathBuf::from(DEFAULT_CONFDIR));
        assert_eq!(config.tick, DEFAULT_TICK);
    }

    #[test]
    fn test_foreground() {
        assert!(!run(&["ofconfig-server", "-f"]).daemonize);
        assert!(!run(&["ofconfig-server", "--foreground"]).daemonize);
    }

    #[test]
    fn test_verbose_is_clamped() {
        let level = |v: &str| run(&["ofconfig-server", "-v", v]).verbosity;
        assert_eq!(level("0"), Verbosity::Error);
        assert_eq!(level("1"), Verbosity::Warning);
        assert_eq!(level("2"), Verbosity::Verbose);
        assert_eq!(level("3"), Verbosity::Debug);
        assert_eq!(level("17"), Verbosity::Debug);
        assert_eq!(level("99999999999999999999999"), Verbosity::Debug);
        assert_eq!(level("-4"), Verbosity::Error);
        assert_eq!(level("debug"), Verbosity::Error);
        assert_eq!(
            run(&["ofconfig-server", "--verbose", "2", "-f"]).verbosity,
            Verbosity::Verbose
        );
        // the last occurrence wins
        assert_eq!(
            run(&["ofconfig-server", "-v", "1", "-v", "3"]).verbosity,
            Verbosity::Debug
        );
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("2"), Ok(2));
        assert_eq!(parse_level("  +3x"), Ok(3));
        assert_eq!(parse_level("-1"), Ok(-1));
        assert_eq!(parse_level(""), Ok(0));
        assert_eq!(parse_level("x3"), Ok(0));
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(Verbosity::Error.level_filter(), LevelFilter::Error);
        assert_eq!(Verbosity::Verbose.level_filter(), LevelFilter::Info);
        assert_eq!(Verbosity::Debug.level_filter(), LevelFilter::Debug);
    }

    #[test]
    fn test_confdir() {
        let config = run(&["ofconfig-server", "-c", "/tmp/ofc"]);
        assert_eq!(config.confdir, PathBuf::from("/tmp/ofc"));
    }

    #[test]
    fn test_help_exits() {
        assert!(exits(&["ofconfig-server", "-h"]));
        assert!(exits(&["ofconfig-server", "-f", "--help"]));
        assert!(exits(&["ofconfig-server", "-v", "2", "-f", "-h"]));
        match parse_from(["ofconfig-server", "-h"]) {
            Outcome::Exit(text) => assert!(text.contains("--foreground")),
            Outcome::Run(_) => unreachable!(),
        }
    }

    #[test]
    fn test_unknown_flag_prints_usage() {
        match parse_from(["ofconfig-server", "-x"]) {
            Outcome::Exit(text) => {
                assert!(text.contains("--verbose"));
                assert!(text.contains("--foreground"));
            }
            Outcome::Run(_) => panic!("unknown flag accepted"),
        }
    }

    #[test]
    fn test_operands_are_ignored() {
        assert!(!run(&["ofconfig-server", "-f", "extra"]).daemonize);
        let config = run(&["ofconfig-server", "-v", "2", "one", "two"]);
        assert!(config.daemonize);
        assert_eq!(config.verbosity, Verbosity::Verbose);
        assert!(exits(&["ofconfig-server", "extra", "-x"]));
    }
}
