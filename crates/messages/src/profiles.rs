//! Profile bootstrap: make sure the signed-in subject has a `profiles` row
//! with a unique username.

use std::collections::HashMap;

use rand::Rng;
use serde_json::json;

use msgboard_auth::Session;
use msgboard_core::{Profile, SubjectId, slugify_handle};
use msgboard_gateway::{DataGateway, Filter, RemoteStore, Row};

use crate::BoardError;

pub const PROFILES_TABLE: &str = "profiles";

const SUFFIX_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxyz0123456789";
const SHORT_SUFFIX_TRIES: usize = 50;

/// Preferred handle for a fresh profile, before uniqueness is checked.
///
/// Taken from the provider username, else the email local part, slugified;
/// falls back to `user_<id prefix>`.
pub fn base_handle(session: &Session) -> String {
    let meta = &session.user_metadata;
    let nonblank = |s: &&str| !s.trim().is_empty();
    let raw = meta
        .preferred_username
        .as_deref()
        .filter(nonblank)
        .or(meta.user_name.as_deref().filter(nonblank))
        .map(str::to_string)
        .or_else(|| {
            session
                .email
                .as_deref()
                .and_then(|e| e.split('@').next())
                .map(str::to_string)
        })
        .unwrap_or_default();

    let id = &session.subject_id;
    let base = slugify_handle(&raw, &format!("user_{}", id.prefix(8)));
    if base.chars().count() < 3 {
        format!("user_{}", id.prefix(6))
    } else {
        base
    }
}

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

async fn username_available<S: RemoteStore>(gateway: &DataGateway<S>, handle: &str) -> Result<bool, BoardError> {
    let taken = gateway
        .select(PROFILES_TABLE, Filter::new().eq("username", handle).limit(1))
        .await?;
    Ok(taken.is_empty())
}

/// `base`, then `base2`..`base19`, then random short suffixes, then random
/// long suffixes until one is free.
async fn next_available_username<S: RemoteStore>(gateway: &DataGateway<S>, base: &str) -> Result<String, BoardError> {
    let numbered = std::iter::once(base.to_string()).chain((2..20).map(|i| format!("{base}{i}")));
    for candidate in numbered {
        if username_available(gateway, &candidate).await? {
            return Ok(candidate);
        }
    }
    for _ in 0..SHORT_SUFFIX_TRIES {
        let candidate = format!("{base}{}", random_suffix(3));
        if username_available(gateway, &candidate).await? {
            return Ok(candidate);
        }
    }
    loop {
        let candidate = format!("{base}{}", random_suffix(6));
        if username_available(gateway, &candidate).await? {
            return Ok(candidate);
        }
    }
}

/// Return the subject's profile, creating it on first sign-in.
pub async fn ensure_profile<S: RemoteStore>(gateway: &DataGateway<S>, session: &Session) -> Result<Profile, BoardError> {
    let own = gateway
        .select(
            PROFILES_TABLE,
            Filter::new().eq("id", session.subject_id.as_str()).limit(1),
        )
        .await?;
    if let Some(profile) = own.decode::<Profile>()?.into_iter().next() {
        return Ok(profile);
    }

    let username = next_available_username(gateway, &base_handle(session)).await?;
    let meta = &session.user_metadata;
    let mut record = Row::new();
    record.insert("id".to_string(), json!(session.subject_id.as_str()));
    record.insert("username".to_string(), json!(username));
    record.insert("full_name".to_string(), json!(meta.full_name));
    record.insert("avatar_url".to_string(), json!(meta.avatar_url));

    let stored = gateway.insert(PROFILES_TABLE, record).await?;
    let profile = stored
        .decode::<Profile>()?
        .into_iter()
        .next()
        .ok_or_else(|| BoardError::Decode("profile insert returned no row".to_string()))?;

    tracing::info!(subject = %profile.id, username = ?profile.username, "profile created");
    Ok(profile)
}

/// Every profile the active credential may read, keyed by subject.
pub async fn profile_directory<S: RemoteStore>(
    gateway: &DataGateway<S>,
) -> Result<HashMap<SubjectId, Profile>, BoardError> {
    let rows = gateway.select(PROFILES_TABLE, Filter::default()).await?;
    Ok(rows
        .decode::<Profile>()?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect())
}
