use std::{borrow::Cow, fmt, io::IsTerminal, net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::bail;
use clap::{Parser, ValueEnum};
use config::Config;
use logforth::filter::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "Warden", version, long_about = concat!("Warden v", env!("CARGO_PKG_VERSION")))]
pub struct Args {
    /// IP address on which the server will listen for incoming connections.
    /// Default: 127.0.0.1:8000
    #[arg(short, long, env = "WARDEN_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,
    /// Path to the TOML configuration file
    #[arg(long, short, env = "WARDEN_CONFIG_PATH", default_value = "./warden.toml")]
    pub config: PathBuf,
    /// Set the logging level
    #[arg(long = "log", env = "WARDEN_LOG", default_value_t = LogLevel::default())]
    pub log_level: LogLevel,
    /// Set the style of log output
    #[arg(long, env = "WARDEN_LOG_STYLE", default_value_t = LogStyle::default())]
    pub log_style: LogStyle,
}

impl Args {
    pub fn config(&self) -> anyhow::Result<Config> {
        // Secrets have no defaults, so running without a file can never pass validation.
        if !self.config.exists() {
            bail!("Configuration file {} not found", self.config.display());
        }

        Config::load(&self.config)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogStyle {
    /// Colorized text, used as the default with TTY output
    Color,
    /// Standard text, used as the default with non-TTY output
    Text,
    /// JSON objects
    Json,
}

impl Default for LogStyle {
    fn default() -> Self {
        if std::io::stdout().is_terminal() {
            LogStyle::Color
        } else {
            LogStyle::Text
        }
    }
}

impl fmt::Display for LogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogStyle::Color => "color",
            LogStyle::Text => "text",
            LogStyle::Json => "json",
        };

        f.write_str(name)
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogLevel {
    /// Disable logging
    Off,
    /// Only log errors
    Error,
    /// Log errors, and warnings
    Warn,
    /// Log errors, warnings, and info messages
    #[default]
    Info,
    /// Log errors, warnings, info, and debug messages
    Debug,
    /// Log errors, warnings, info, debug, and trace messages
    Trace,
}

impl LogLevel {
    /// Dependencies log at `warn`, the workspace crates at the selected level.
    fn filter_directive(self) -> Cow<'static, str> {
        match self {
            LogLevel::Off => Cow::Borrowed("off"),
            level => Cow::Owned(format!(
                "warn,warden={level},server={level},chat={level},captcha={level},rate_limit={level},config={level}"
            )),
        }
    }

    pub fn env_filter(self) -> EnvFilter {
        #[allow(clippy::expect_used)]
        EnvFilter::from_str(&self.filter_directive()).expect("workspace crate names are valid filter directives")
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };

        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["warden"]).unwrap();

        assert_eq!(args.listen_address, None);
        assert_eq!(args.config, PathBuf::from("./warden.toml"));
        assert_eq!(args.log_level, LogLevel::Info);
    }

    #[test]
    fn explicit_values() {
        let args = Args::try_parse_from([
            "warden",
            "--listen-address",
            "0.0.0.0:9000",
            "--config",
            "/etc/warden.toml",
            "--log",
            "debug",
            "--log-style",
            "json",
        ])
        .unwrap();

        assert_eq!(args.listen_address, Some("0.0.0.0:9000".parse().unwrap()));
        assert_eq!(args.config, PathBuf::from("/etc/warden.toml"));
        assert_eq!(args.log_level, LogLevel::Debug);
        assert_eq!(args.log_style, LogStyle::Json);
    }

    #[test]
    fn filter_directives() {
        assert_eq!(LogLevel::Off.filter_directive(), "off");
        assert_eq!(
            LogLevel::Debug.filter_directive(),
            "warn,warden=debug,server=debug,chat=debug,captcha=debug,rate_limit=debug,config=debug"
        );
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = Args::try_parse_from(["warden", "--config", "/nonexistent/warden.toml"]).unwrap();

        let error = args.config().unwrap_err().to_string();
        assert_eq!(error, "Configuration file /nonexistent/warden.toml not found");
    }
}
