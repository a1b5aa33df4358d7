use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the daemon renders log events on stdout.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One terse line per event, coloured when stdout is a terminal.
    #[default]
    Compact,
    /// One flattened JSON object per line for log shippers.
    Json,
}

impl LogFormat {
    /// Whether events are machine-readable records. Structured output never
    /// carries ANSI colour codes.
    #[must_use]
    pub fn is_structured(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Error returned when `log_format` names an unknown format.
pub type LogFormatParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("compact", LogFormat::Compact)]
    #[case("JSON", LogFormat::Json)]
    #[case("Json", LogFormat::Json)]
    fn parses_format_names_case_insensitively(#[case] input: &str, #[case] expected: LogFormat) {
        assert_eq!(input.parse::<LogFormat>().expect("known format"), expected);
    }

    #[test]
    fn rejects_unknown_format() {
        assert!("pretty".parse::<LogFormat>().is_err());
    }

    #[test]
    fn daemon_defaults_to_compact_text() {
        let format = LogFormat::default();
        assert_eq!(format, LogFormat::Compact);
        assert_eq!(format.to_string(), "compact");
        assert!(!format.is_structured());
        assert!(LogFormat::Json.is_structured());
    }

    #[test]
    fn deserialises_snake_case_names() {
        let format: LogFormat =
            serde_json::from_value(serde_json::json!("json")).expect("deserialise format");
        assert_eq!(format, LogFormat::Json);
    }
}
