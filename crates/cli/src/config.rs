//! Command-line configuration.
//!
//! The argument list is already tokenized by whoever invoked `chore`; nothing
//! here quotes, globs or expands. Grammar:
//!
//! ```text
//! chore [--json] [--log-json] [--] STAGE [| STAGE]...
//! STAGE := PROGRAM [ARG]...  |  --literal TEXT
//! ```
//!
//! `|` must be its own argument (quote it in the calling shell).

use anyhow::{bail, Context};

/// Environment variable holding the tracing filter directive.
pub const LOG_FILTER_VAR: &str = "CHORE_LOG";

/// Filter used when [`LOG_FILTER_VAR`] is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Environment variable that enables the OTLP exporter when set.
pub const OTLP_ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

const STAGE_SEPARATOR: &str = "|";

/// How the run's result is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Captured stdout to stdout, captured stderr to stderr.
    #[default]
    Text,
    /// A JSON `RunRecord` on stdout.
    Json,
}

/// Format of diagnostic log lines on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging and trace export settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive, e.g. `"engine=debug"`.
    pub filter: String,
    /// OTLP collector endpoint; `None` disables trace export.
    pub otlp_endpoint: Option<String>,
}

/// One stage as written on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageArg {
    Command(Vec<String>),
    Literal(String),
}

/// Fully parsed CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub output: OutputMode,
    pub log: LogConfig,
    pub stages: Vec<StageArg>,
}

impl CliConfig {
    /// Builds the configuration from process arguments (without the binary
    /// name) and the environment.
    pub fn from_env_and_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        Self::parse(args, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from `args` and an environment lookup.
    pub fn parse(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let mut output = OutputMode::default();
        let mut format = LogFormat::default();
        let mut args = args.into_iter().peekable();

        loop {
            match args.peek().map(String::as_str) {
                Some("--json") => output = OutputMode::Json,
                Some("--log-json") => format = LogFormat::Json,
                Some("--") => {
                    args.next();
                    break;
                }
                _ => break,
            }
            args.next();
        }

        let stages = parse_stages(args.collect())?;

        Ok(Self {
            output,
            log: LogConfig {
                format,
                filter: env(LOG_FILTER_VAR).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
                otlp_endpoint: env(OTLP_ENDPOINT_VAR).filter(|v| !v.is_empty()),
            },
            stages,
        })
    }
}

fn parse_stages(tokens: Vec<String>) -> anyhow::Result<Vec<StageArg>> {
    if tokens.is_empty() {
        bail!("no command given; usage: chore [--json] [--log-json] [--] STAGE ['|' STAGE]...");
    }

    tokens
        .split(|token| token == STAGE_SEPARATOR)
        .enumerate()
        .map(|(index, group)| {
            parse_stage(group).with_context(|| format!("invalid stage {}", index + 1))
        })
        .collect()
}

fn parse_stage(group: &[String]) -> anyhow::Result<StageArg> {
    match group {
        [] => bail!("empty stage"),
        [flag, text] if flag == "--literal" => Ok(StageArg::Literal(text.clone())),
        [flag, ..] if flag == "--literal" => bail!("--literal takes exactly one argument"),
        [program, ..] if program.is_empty() => bail!("empty program name"),
        tokens => Ok(StageArg::Command(tokens.to_vec())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn parses_flags_and_stages() {
        let config = CliConfig::parse(
            args(&["--json", "ls", "-l", "|", "--literal", "yolo", "|", "cat"]),
            no_env,
        )
        .unwrap();

        assert_eq!(config.output, OutputMode::Json);
        assert_eq!(config.log.format, LogFormat::Text);
        assert_eq!(
            config.stages,
            vec![
                StageArg::Command(args(&["ls", "-l"])),
                StageArg::Literal("yolo".into()),
                StageArg::Command(args(&["cat"])),
            ]
        );
    }

    #[test]
    fn double_dash_ends_flags() {
        let config = CliConfig::parse(args(&["--", "--json"]), no_env).unwrap();
        assert_eq!(config.output, OutputMode::Text);
        assert_eq!(config.stages, vec![StageArg::Command(args(&["--json"]))]);
    }

    #[test]
    fn rejects_empty_stage_and_missing_command() {
        assert!(CliConfig::parse(args(&["ls", "|", "|", "cat"]), no_env).is_err());
        assert!(CliConfig::parse(args(&["ls", "|"]), no_env).is_err());
        assert!(CliConfig::parse(args(&["--json"]), no_env).is_err());
        assert!(CliConfig::parse(args(&["--literal", "a", "b"]), no_env).is_err());
    }

    #[test]
    fn log_settings_come_from_environment() {
        let config = CliConfig::parse(args(&["--log-json", "true"]), |key| match key {
            LOG_FILTER_VAR => Some("engine=debug".to_string()),
            OTLP_ENDPOINT_VAR => Some("http://localhost:4317".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.filter, "engine=debug");
        assert_eq!(
            config.log.otlp_endpoint.as_deref(),
            Some("http://localhost:4317")
        );
    }

    #[test]
    fn defaults_without_environment() {
        let config = CliConfig::parse(args(&["true"]), no_env).unwrap();
        assert_eq!(config.log.filter, DEFAULT_LOG_FILTER);
        assert!(config.log.otlp_endpoint.is_none());
    }
}
