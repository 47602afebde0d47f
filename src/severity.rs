use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The 5-level severity vocabulary understood by the remote ingestion
/// protocol.
///
/// Everything downstream of [`Severity::from_raw`] speaks this enum; the
/// heterogeneous severities supplied by hosts (level names, platform error
/// codes) are folded into it once, at the mapper boundary, and never
/// re-interpreted later.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    /// The default: an unrecognized severity is an error until proven
    /// otherwise.
    #[default]
    Error,
    Fatal,
}

/// Severity as it arrives from the host, before mapping.
///
/// Hosts hand the bridge either a level name (`"WARNING"`, `"err"`, ...) or
/// a platform-native numeric error code (see [`code`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RawSeverity {
    Name(String),
    Code(i64),
}

impl From<&str> for RawSeverity {
    fn from(name: &str) -> Self {
        RawSeverity::Name(name.to_string())
    }
}

impl From<i64> for RawSeverity {
    fn from(code: i64) -> Self {
        RawSeverity::Code(code)
    }
}

/// Platform-native error constants recognized by the numeric mapping path.
///
/// These are the power-of-two codes emitted by the scripting platform the
/// bridge fronts; each maps to the platform's own category before being
/// lower-cased onto the wire.
pub mod code {
    pub const ERROR: i64 = 1;
    pub const WARNING: i64 = 2;
    pub const PARSE: i64 = 4;
    pub const NOTICE: i64 = 8;
    pub const CORE_ERROR: i64 = 16;
    pub const CORE_WARNING: i64 = 32;
    pub const COMPILE_ERROR: i64 = 64;
    pub const COMPILE_WARNING: i64 = 128;
    pub const USER_ERROR: i64 = 256;
    pub const USER_WARNING: i64 = 512;
    pub const USER_NOTICE: i64 = 1024;
    pub const STRICT: i64 = 2048;
    pub const RECOVERABLE_ERROR: i64 = 4096;
    pub const DEPRECATED: i64 = 8192;
    pub const USER_DEPRECATED: i64 = 16384;
}

impl Severity {
    /// Map a heterogeneous host severity to the wire vocabulary.
    ///
    /// Total function: unknown names and codes fall through to
    /// [`Severity::Error`] rather than failing.
    pub fn from_raw(raw: &RawSeverity) -> Severity {
        match raw {
            RawSeverity::Name(name) => Severity::from_level_name(name),
            RawSeverity::Code(code) => Severity::from_error_code(*code),
        }
    }

    /// Map a level name (case-insensitive) to the wire vocabulary.
    ///
    /// Covers both the platform's stringified error categories
    /// (`"coreerror"`, `"user_notice"`, ...) and the short names used by
    /// host logging stacks (`"warn"`, `"err"`, `"emerg"`).
    pub fn from_level_name(name: &str) -> Severity {
        match name.to_lowercase().as_str() {
            "deprecated" | "user_deprecated" | "warning" | "user_warning" | "warn" => {
                Severity::Warning
            }
            "error" | "parse" | "coreerror" | "corewarning" | "compilerror" | "compilewarning"
            | "emerg" => Severity::Fatal,
            "recoverableerror" | "user_error" | "err" => Severity::Error,
            "notice" | "user_notice" | "strict" | "info" => Severity::Info,
            // It's an error until proven otherwise.
            _ => Severity::Error,
        }
    }

    /// Map a platform-native numeric error code to the wire vocabulary.
    pub fn from_error_code(code: i64) -> Severity {
        match code {
            code::DEPRECATED | code::USER_DEPRECATED | code::WARNING | code::USER_WARNING => {
                Severity::Warning
            }
            code::ERROR
            | code::PARSE
            | code::CORE_ERROR
            | code::CORE_WARNING
            | code::COMPILE_ERROR
            | code::COMPILE_WARNING => Severity::Fatal,
            code::RECOVERABLE_ERROR | code::USER_ERROR => Severity::Error,
            code::NOTICE | code::USER_NOTICE | code::STRICT => Severity::Info,
            _ => Severity::Error,
        }
    }

    /// Lower-case name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error used when parsing [`Severity`] from its wire form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid severity")]
pub struct ParseSeverityError;

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "debug" => Severity::Debug,
            "info" => Severity::Info,
            "warning" => Severity::Warning,
            "error" => Severity::Error,
            "fatal" => Severity::Fatal,
            _ => return Err(ParseSeverityError),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_userland_level_names() {
        assert_eq!(Severity::from_level_name("WARNING"), Severity::Warning);
        assert_eq!(Severity::from_level_name("ERROR"), Severity::Fatal);
        assert_eq!(Severity::from_level_name("WIBBLE"), Severity::Error);
        assert_eq!(Severity::from_level_name("INFO"), Severity::Info);
    }

    #[test]
    fn maps_platform_level_names() {
        assert_eq!(Severity::from_level_name("warning"), Severity::Warning);
        assert_eq!(Severity::from_level_name("error"), Severity::Fatal);
        assert_eq!(Severity::from_level_name("notice"), Severity::Info);
        assert_eq!(Severity::from_level_name("strict"), Severity::Info);
        assert_eq!(Severity::from_level_name("user_error"), Severity::Error);
        assert_eq!(
            Severity::from_level_name("recoverableerror"),
            Severity::Error
        );
        assert_eq!(Severity::from_level_name("compilewarning"), Severity::Fatal);
        assert_eq!(
            Severity::from_level_name("user_deprecated"),
            Severity::Warning
        );
    }

    #[test]
    fn maps_host_logger_short_names() {
        assert_eq!(Severity::from_level_name("WARN"), Severity::Warning);
        assert_eq!(Severity::from_level_name("ERR"), Severity::Error);
        assert_eq!(Severity::from_level_name("EMERG"), Severity::Fatal);
        assert_eq!(Severity::from_level_name("NOTICE"), Severity::Info);
    }

    #[test]
    fn maps_platform_error_codes() {
        assert_eq!(Severity::from_error_code(code::WARNING), Severity::Warning);
        assert_eq!(Severity::from_error_code(code::ERROR), Severity::Fatal);
        assert_eq!(Severity::from_error_code(code::NOTICE), Severity::Info);
        assert_eq!(
            Severity::from_error_code(code::USER_ERROR),
            Severity::Error
        );
        assert_eq!(
            Severity::from_error_code(code::COMPILE_ERROR),
            Severity::Fatal
        );
        // Unknown codes are errors until proven otherwise.
        assert_eq!(Severity::from_error_code(3), Severity::Error);
        assert_eq!(Severity::from_error_code(-1), Severity::Error);
    }

    #[test]
    fn from_raw_covers_both_shapes() {
        assert_eq!(
            Severity::from_raw(&RawSeverity::from("WARN")),
            Severity::Warning
        );
        assert_eq!(
            Severity::from_raw(&RawSeverity::from(code::NOTICE)),
            Severity::Info
        );
    }

    #[test]
    fn wire_form_is_lowercase() {
        assert_eq!(Severity::Fatal.to_string(), "fatal");
        assert_eq!(
            serde_json::to_string(&Severity::Warning).unwrap(),
            "\"warning\""
        );
        assert_eq!("warning".parse::<Severity>().unwrap(), Severity::Warning);
        assert!("WIBBLE".parse::<Severity>().is_err());
    }
}
