//! Row-level policy declarations.
//!
//! Policies belong to the remote store. The client crates only *describe*
//! them (to configure the in-memory store or to document a deployment); the
//! gateway never evaluates them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use msgboard_core::SubjectId;

use crate::store::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    Select,
    Insert,
    Update,
    Delete,
}

impl core::fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            PolicyAction::Select => "select",
            PolicyAction::Insert => "insert",
            PolicyAction::Update => "update",
            PolicyAction::Delete => "delete",
        })
    }
}

/// Condition over the requesting identity and the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Anyone, including anonymous callers.
    Public,
    /// Any verified identity.
    Authenticated,
    /// `row[column] = <verified subject>`.
    OwnerMatches { column: String },
}

impl Predicate {
    pub fn owner_matches(column: impl Into<String>) -> Self {
        Self::OwnerMatches {
            column: column.into(),
        }
    }

    pub fn allows(&self, caller: Option<&SubjectId>, row: &Row) -> bool {
        match self {
            Predicate::Public => true,
            Predicate::Authenticated => caller.is_some(),
            Predicate::OwnerMatches { column } => match (caller, row.get(column)) {
                (Some(subject), Some(Value::String(owner))) => owner == subject.as_str(),
                _ => false,
            },
        }
    }
}

/// `(table, action, predicate)` rule. Policies for the same table/action are
/// permissive: a row passes if any of them allows it; with none, nothing
/// passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    pub table: String,
    pub action: PolicyAction,
    pub predicate: Predicate,
}

impl Policy {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        action: PolicyAction,
        predicate: Predicate,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            action,
            predicate,
        }
    }

    pub fn applies_to(&self, table: &str, action: PolicyAction) -> bool {
        self.table == table && self.action == action
    }

    /// Postgres `CREATE POLICY` statement for a PostgREST deployment.
    pub fn to_sql(&self) -> String {
        let (roles, expr) = match &self.predicate {
            Predicate::Public => ("anon, authenticated", "true".to_string()),
            Predicate::Authenticated => ("authenticated", "true".to_string()),
            Predicate::OwnerMatches { column } => ("authenticated", format!("auth.uid() = {column}")),
        };
        let clause = match self.action {
            PolicyAction::Insert => "with check",
            _ => "using",
        };
        format!(
            "create policy \"{}\" on public.{} for {} to {} {} ({});",
            self.name.replace('"', "\"\""),
            self.table,
            self.action,
            roles,
            clause,
            expr
        )
    }
}
