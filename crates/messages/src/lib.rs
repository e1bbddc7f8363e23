//! `msgboard-messages`: the message board workflow on top of the gateway.
//!
//! Nothing here decides who may read or write a message; that is the job of
//! the policies installed from [`MessageVisibility`].

pub mod board;
pub mod error;
pub mod profiles;
pub mod schema;
pub mod visibility;

pub use board::{MESSAGES_TABLE, MessageBoard};
pub use error::BoardError;
pub use profiles::{PROFILES_TABLE, base_handle, ensure_profile, profile_directory};
pub use visibility::{MessageVisibility, ParseVisibilityError};
