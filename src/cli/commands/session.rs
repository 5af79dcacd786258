use clap::{Arg, ArgAction, ArgMatches, Command, builder::BoolishValueParser};

use crate::api::handlers::account::session::{
    DEFAULT_SESSION_COOKIE_NAME, DEFAULT_SESSION_TTL_SECONDS,
};
use crate::directory::DEFAULT_ROLE;

pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SESSION_COOKIE_NAME: &str = "session-cookie-name";
pub const ARG_SESSION_COOKIE_SECURE: &str = "session-cookie-secure";
pub const ARG_DEFAULT_ROLE: &str = "default-role";

#[derive(Debug, Clone)]
pub struct Options {
    pub ttl_seconds: u64,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub default_roles: Vec<String>,
}

impl Options {
    /// Parse session and account arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the cookie name is blank or no default role remains.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let cookie_name = matches
            .get_one::<String>(ARG_SESSION_COOKIE_NAME)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_SESSION_COOKIE_NAME}"))?;

        // Cookie names are tokens; `=` `;` or whitespace would corrupt the header
        if cookie_name
            .chars()
            .any(|c| c == '=' || c == ';' || c == ',' || c.is_whitespace())
        {
            anyhow::bail!("invalid --{ARG_SESSION_COOKIE_NAME}: {cookie_name}");
        }

        let mut default_roles: Vec<String> = Vec::new();
        for role in matches
            .get_many::<String>(ARG_DEFAULT_ROLE)
            .into_iter()
            .flatten()
            .map(|role| role.trim())
            .filter(|role| !role.is_empty())
        {
            if !default_roles.iter().any(|known| known == role) {
                default_roles.push(role.to_string());
            }
        }
        if default_roles.is_empty() {
            anyhow::bail!("missing required argument: --{ARG_DEFAULT_ROLE}");
        }

        Ok(Self {
            ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_SESSION_TTL_SECONDS),
            cookie_name,
            cookie_secure: matches
                .get_one::<bool>(ARG_SESSION_COOKIE_SECURE)
                .copied()
                .unwrap_or(false),
            default_roles,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("TURNSTILE_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_COOKIE_NAME)
                .long(ARG_SESSION_COOKIE_NAME)
                .help("Name of the session cookie")
                .env("TURNSTILE_SESSION_COOKIE_NAME")
                .default_value(DEFAULT_SESSION_COOKIE_NAME),
        )
        .arg(
            Arg::new(ARG_SESSION_COOKIE_SECURE)
                .long(ARG_SESSION_COOKIE_SECURE)
                .help("Mark the session cookie Secure (serve over HTTPS)")
                .env("TURNSTILE_SESSION_COOKIE_SECURE")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_DEFAULT_ROLE)
                .long(ARG_DEFAULT_ROLE)
                .help("Role granted to new accounts, repeat or comma separate for more")
                .env("TURNSTILE_DEFAULT_ROLES")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .default_value(DEFAULT_ROLE),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> Command {
        with_args(Command::new("turnstile"))
    }

    #[test]
    fn defaults() -> anyhow::Result<()> {
        temp_env::with_vars(
            [
                ("TURNSTILE_SESSION_TTL_SECONDS", None::<&str>),
                ("TURNSTILE_SESSION_COOKIE_NAME", None),
                ("TURNSTILE_SESSION_COOKIE_SECURE", None),
                ("TURNSTILE_DEFAULT_ROLES", None),
            ],
            || {
                let matches = command().get_matches_from(vec!["turnstile"]);
                let options = Options::parse(&matches)?;
                assert_eq!(options.ttl_seconds, DEFAULT_SESSION_TTL_SECONDS);
                assert_eq!(options.cookie_name, DEFAULT_SESSION_COOKIE_NAME);
                assert!(!options.cookie_secure);
                assert_eq!(options.default_roles, vec![DEFAULT_ROLE]);
                Ok(())
            },
        )
    }

    #[test]
    fn flags_override_defaults() -> anyhow::Result<()> {
        let matches = command().get_matches_from(vec![
            "turnstile",
            "--session-ttl-seconds",
            "60",
            "--session-cookie-name",
            "sid",
            "--session-cookie-secure",
            "--default-role",
            "user",
            "--default-role",
            "reader,user",
        ]);
        let options = Options::parse(&matches)?;
        assert_eq!(options.ttl_seconds, 60);
        assert_eq!(options.cookie_name, "sid");
        assert!(options.cookie_secure);
        assert_eq!(options.default_roles, vec!["user", "reader"]);
        Ok(())
    }

    #[test]
    fn env_vars() -> anyhow::Result<()> {
        temp_env::with_vars(
            [
                ("TURNSTILE_SESSION_TTL_SECONDS", Some("120")),
                ("TURNSTILE_SESSION_COOKIE_NAME", Some("app_sid")),
                ("TURNSTILE_SESSION_COOKIE_SECURE", Some("true")),
                ("TURNSTILE_DEFAULT_ROLES", Some("user,editor")),
            ],
            || {
                let matches = command().get_matches_from(vec!["turnstile"]);
                let options = Options::parse(&matches)?;
                assert_eq!(options.ttl_seconds, 120);
                assert_eq!(options.cookie_name, "app_sid");
                assert!(options.cookie_secure);
                assert_eq!(options.default_roles, vec!["user", "editor"]);
                Ok(())
            },
        )
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let result =
            command().try_get_matches_from(vec!["turnstile", "--session-ttl-seconds", "0"]);
        assert!(result.is_err());

        temp_env::with_var("TURNSTILE_SESSION_TTL_SECONDS", Some("0"), || {
            assert!(command().try_get_matches_from(vec!["turnstile"]).is_err());
        });
    }

    #[test]
    fn invalid_cookie_name_is_rejected() {
        let matches =
            command().get_matches_from(vec!["turnstile", "--session-cookie-name", "a=b"]);
        assert!(Options::parse(&matches).is_err());
    }

    #[test]
    fn blank_roles_are_rejected() {
        let matches = command().get_matches_from(vec!["turnstile", "--default-role", " "]);
        let result = Options::parse(&matches);
        assert!(result.is_err());
        if let Err(err) = result {
            assert!(err.to_string().contains("--default-role"));
        }
    }
}
