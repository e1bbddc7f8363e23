//! Table layout and policy sets for both store backends.

use msgboard_gateway::{ColumnDefault, InMemoryPolicyStore, Policy, PolicyAction, Predicate};

use crate::{MESSAGES_TABLE, MessageVisibility, PROFILES_TABLE};

/// Table definitions for a Postgres deployment (policies not included).
pub const SCHEMA_SQL: &str = include_str!("../sql/schema.sql");

pub fn profile_policies() -> Vec<Policy> {
    vec![
        Policy::new(
            "profiles readable by signed-in users",
            PROFILES_TABLE,
            PolicyAction::Select,
            Predicate::Authenticated,
        ),
        Policy::new(
            "profile created for self",
            PROFILES_TABLE,
            PolicyAction::Insert,
            Predicate::owner_matches("id"),
        ),
    ]
}

/// Every policy the board needs under `visibility`.
pub fn policies(visibility: MessageVisibility) -> Vec<Policy> {
    let mut all = visibility.policies();
    all.extend(profile_policies());
    all
}

/// Create the board's tables in an in-memory store and install the policies.
pub fn install(store: &InMemoryPolicyStore, visibility: MessageVisibility) {
    store.create_table(
        MESSAGES_TABLE,
        [
            ("id", ColumnDefault::Uuid),
            ("author_id", ColumnDefault::AuthUid),
            ("created_at", ColumnDefault::Now),
        ],
    );
    store.create_table(PROFILES_TABLE, Vec::<(String, ColumnDefault)>::new());
    apply_visibility(store, visibility);
}

/// Swap the `messages` read policy without touching stored rows.
pub fn apply_visibility(store: &InMemoryPolicyStore, visibility: MessageVisibility) {
    store.set_policies(MESSAGES_TABLE, visibility.policies());
    store.set_policies(PROFILES_TABLE, profile_policies());
}

/// Full SQL script: tables, then one `create policy` per policy.
pub fn deployment_sql(visibility: MessageVisibility) -> String {
    let mut sql = SCHEMA_SQL.trim_end().to_string();
    sql.push_str("\n\n");
    for policy in policies(visibility) {
        sql.push_str(&policy.to_sql());
        sql.push('\n');
    }
    sql
}
