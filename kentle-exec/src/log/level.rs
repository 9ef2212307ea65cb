use std::str::FromStr;

/// Kettle log levels, from quietest to noisiest.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    Nothing,
    Error,
    #[default]
    Minimal,
    Basic,
    Detailed,
    Debug,
    Rowlevel,
}

impl LogLevel {
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Nothing,
        LogLevel::Error,
        LogLevel::Minimal,
        LogLevel::Basic,
        LogLevel::Detailed,
        LogLevel::Debug,
        LogLevel::Rowlevel,
    ];

    /// Name used on the pan command line (`-level=Minimal`).
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Nothing => "Nothing",
            LogLevel::Error => "Error",
            LogLevel::Minimal => "Minimal",
            LogLevel::Basic => "Basic",
            LogLevel::Detailed => "Detailed",
            LogLevel::Debug => "Debug",
            LogLevel::Rowlevel => "Rowlevel",
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Whether a line logged at `line` is kept by a channel set to `self`.
    pub fn admits(&self, line: LogLevel) -> bool {
        line != LogLevel::Nothing && line <= *self
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level {0:?} (expected one of nothing, error, minimal, basic, detailed, debug, rowlevel)")]
pub struct ParseLogLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        LogLevel::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(wanted) || wanted == l.code().to_string())
            .ok_or_else(|| ParseLogLevelError(s.to_string()))
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ParseLogLevelError;

    fn try_from(value: String) -> Result<Self, ParseLogLevelError> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(value: LogLevel) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_codes() {
        assert_eq!("minimal".parse::<LogLevel>().unwrap(), LogLevel::Minimal);
        assert_eq!("ROWLEVEL".parse::<LogLevel>().unwrap(), LogLevel::Rowlevel);
        assert_eq!("3".parse::<LogLevel>().unwrap(), LogLevel::Basic);
        assert!("chatty".parse::<LogLevel>().is_err());
    }

    #[test]
    fn owned_strings_convert_through_try_from() {
        assert_eq!(
            LogLevel::try_from("Detailed".to_string()).unwrap(),
            LogLevel::Detailed
        );
        let err = LogLevel::try_from("chatty".to_string()).unwrap_err();
        assert_eq!(err, ParseLogLevelError("chatty".to_string()));
    }

    #[test]
    fn minimal_admits_errors_but_not_basic() {
        assert!(LogLevel::Minimal.admits(LogLevel::Error));
        assert!(LogLevel::Minimal.admits(LogLevel::Minimal));
        assert!(!LogLevel::Minimal.admits(LogLevel::Basic));
        assert!(!LogLevel::Nothing.admits(LogLevel::Error));
    }
}
