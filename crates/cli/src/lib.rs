//! Building blocks of the `msgboard` binary: configuration, the loopback
//! OAuth callback listener and the interactive command parser.

pub mod callback_server;
pub mod commands;
pub mod config;

pub use callback_server::CallbackServer;
pub use commands::{Command, format_message};
pub use config::{AppConfig, ConfigError};
