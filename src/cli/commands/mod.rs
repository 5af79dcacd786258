pub mod session;

use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_VERBOSITY: &str = "verbosity";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// `TURNSTILE_LOG_LEVEL` accepts a level name or its `-v` count (`0` is error, `4` is trace).
fn parse_log_level(level: &str) -> Result<u8, String> {
    let level = level.trim().to_lowercase();
    LOG_LEVELS
        .iter()
        .zip(0u8..)
        .find(|(name, count)| **name == level || count.to_string() == level)
        .map(|(_, count)| count)
        .ok_or_else(|| format!("invalid log level `{level}`, expected one of {LOG_LEVELS:?} or 0-4"))
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("turnstile")
        .about("Account registration, login and cookie sessions")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("TURNSTILE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .long_help(
                    "PostgreSQL connection string for the user directory. When omitted, accounts are kept in memory and lost on restart.",
                )
                .env("TURNSTILE_DSN"),
        )
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Repeat for more output: -v warn, -vv info, -vvv debug, -vvvv trace")
                .env("TURNSTILE_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(parse_log_level),
        );

    session::with_args(command)
}
