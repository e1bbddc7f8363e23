//! `msgboard-core`: domain building blocks shared by every msgboard crate.
//!
//! This crate contains **pure domain** types (no transport, no storage).

pub mod error;
pub mod id;
pub mod message;
pub mod profile;

pub use error::{DomainError, DomainResult};
pub use id::{MessageId, SubjectId};
pub use message::{MAX_BODY_CHARS, Message, MessageBody};
pub use profile::{Profile, slugify_handle};
