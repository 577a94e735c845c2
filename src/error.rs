use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::io::ErrorKind;

/// Errors produced while framing or parsing MRT records.
///
/// `EofExpected` marks a clean end of input at a record boundary and is
/// filtered out before errors reach the log sink.
#[derive(Debug)]
pub enum ParserError {
    IoError(io::Error),
    EofError(io::Error),
    EofExpected,
    ParseError(String),
    TruncatedMsg(String),
    Unsupported(String),
    InconsistentFieldLength {
        name: &'static str,
        expected: usize,
        found: usize,
    },
    InvalidPrefixLength(ipnet::PrefixLenError),
    OversizedRecord {
        length: u32,
        limit: u32,
    },
    FormatError(String),
}

impl Display for ParserError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParserError::IoError(e) => write!(f, "I/O error: {}", e),
            ParserError::EofError(e) => write!(f, "unexpected end of input: {}", e),
            ParserError::EofExpected => write!(f, "reached end of input"),
            ParserError::ParseError(s) => write!(f, "parse error: {}", s),
            ParserError::TruncatedMsg(s) => write!(f, "truncated message: {}", s),
            ParserError::Unsupported(s) => write!(f, "unsupported: {}", s),
            ParserError::InconsistentFieldLength {
                name,
                expected,
                found,
            } => write!(
                f,
                "inconsistent field length for {}: expected {} bytes, found {}",
                name, expected, found
            ),
            ParserError::InvalidPrefixLength(e) => write!(f, "invalid prefix length: {}", e),
            ParserError::OversizedRecord { length, limit } => write!(
                f,
                "record length {} exceeds the {} byte limit",
                length, limit
            ),
            ParserError::FormatError(s) => write!(f, "format error: {}", s),
        }
    }
}

impl Error for ParserError {}

impl From<io::Error> for ParserError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            ErrorKind::UnexpectedEof => ParserError::EofError(err),
            _ => ParserError::IoError(err),
        }
    }
}

impl From<ipnet::PrefixLenError> for ParserError {
    fn from(err: ipnet::PrefixLenError) -> Self {
        ParserError::InvalidPrefixLength(err)
    }
}

impl From<serde_json::Error> for ParserError {
    fn from(err: serde_json::Error) -> Self {
        ParserError::FormatError(err.to_string())
    }
}

/// Errors raised while constructing a run configuration. These are the
/// only fatal errors: the process exits non-zero without starting the
/// worker pool.
#[derive(Debug)]
pub enum ConfigError {
    BadArgs(String),
    BadDate(String),
    BadCollectorFormat(String),
    BadConfig(String),
    BadFilter(String),
    Io(io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::BadArgs(s) => write!(f, "bad arguments: {}", s),
            ConfigError::BadDate(s) => write!(f, "cannot parse date: {}", s),
            ConfigError::BadCollectorFormat(s) => {
                write!(f, "bad collector format file: {}", s)
            }
            ConfigError::BadConfig(s) => write!(f, "bad config file: {}", s),
            ConfigError::BadFilter(s) => write!(f, "bad filter: {}", s),
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}
