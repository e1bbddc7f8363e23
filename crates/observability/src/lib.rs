//! Process-wide tracing setup shared by msgboard binaries.

pub mod subscriber;

pub use subscriber::{LOG_FORMAT_ENV, LogFormat, ParseLogFormatError, init, init_with};
