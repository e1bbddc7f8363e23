use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use msgboard_auth::{Credential, JwtValidator};
use msgboard_core::SubjectId;

use super::r#trait::{RemoteStore, Row, RowSet, StoreOperation, StoreRequest};
use crate::{Filter, GatewayError, Policy, PolicyAction};

/// Server-side value for a column the client left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDefault {
    /// Fresh time-ordered UUID.
    Uuid,
    /// Current UTC time, RFC 3339 with microseconds.
    Now,
    /// The verified subject of the request (`null` when anonymous).
    AuthUid,
}

#[derive(Debug, Default)]
struct Table {
    defaults: Vec<(String, ColumnDefault)>,
    rows: Vec<(u64, Row)>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, Table>,
    policies: Vec<Policy>,
    next_seq: u64,
}

/// In-memory remote store with row-level policy enforcement.
///
/// Intended for tests/dev. Behaves like a policy-enabled database: the
/// caller's identity comes only from the bearer token, checked by the
/// configured [`JwtValidator`]; reads are filtered, writes are checked.
pub struct InMemoryPolicyStore {
    validator: Arc<dyn JwtValidator>,
    inner: RwLock<Inner>,
}

impl InMemoryPolicyStore {
    pub fn new(validator: Arc<dyn JwtValidator>) -> Self {
        Self {
            validator,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Create (or reset) a table with its column defaults.
    pub fn create_table<C: Into<String>>(
        &self,
        table: impl Into<String>,
        defaults: impl IntoIterator<Item = (C, ColumnDefault)>,
    ) {
        let defaults = defaults.into_iter().map(|(c, d)| (c.into(), d)).collect();
        self.write().tables.insert(
            table.into(),
            Table {
                defaults,
                rows: Vec::new(),
            },
        );
    }

    pub fn add_policy(&self, policy: Policy) {
        self.write().policies.push(policy);
    }

    /// Replace every policy on `table`. Takes effect for the next request.
    pub fn set_policies(&self, table: &str, policies: impl IntoIterator<Item = Policy>) {
        let mut inner = self.write();
        inner.policies.retain(|p| p.table != table);
        inner
            .policies
            .extend(policies.into_iter().filter(|p| p.table == table));
    }

    /// All rows of `table`, bypassing policies (service-role view).
    pub fn service_rows(&self, table: &str) -> Vec<Row> {
        self.read()
            .tables
            .get(table)
            .map(|t| t.rows.iter().map(|(_, r)| r.clone()).collect())
            .unwrap_or_default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn caller(
        &self,
        table: &str,
        action: PolicyAction,
        credential: &Credential,
    ) -> Result<Option<SubjectId>, GatewayError> {
        let Some(token) = credential.bearer() else {
            return Ok(None);
        };
        self.validator
            .validate(token, Utc::now())
            .map(|claims| Some(claims.sub))
            .map_err(|e| GatewayError::access_denied(table, action, format!("bearer token rejected: {e}")))
    }
}

fn unknown_table(table: &str) -> GatewayError {
    GatewayError::Rejected {
        status: 404,
        message: format!("relation \"{table}\" does not exist"),
    }
}

fn allowed(policies: &[&Policy], caller: Option<&SubjectId>, row: &Row) -> bool {
    policies.iter().any(|p| p.predicate.allows(caller, row))
}

fn select(inner: &Inner, table: &str, filter: &Filter, caller: Option<&SubjectId>) -> Result<RowSet, GatewayError> {
    let t = inner.tables.get(table).ok_or_else(|| unknown_table(table))?;
    let policies: Vec<&Policy> = inner
        .policies
        .iter()
        .filter(|p| p.applies_to(table, PolicyAction::Select))
        .collect();

    let mut visible: Vec<&(u64, Row)> = t
        .rows
        .iter()
        .filter(|(_, row)| allowed(&policies, caller, row) && filter.matches(row))
        .collect();
    visible.sort_by(|(sa, a), (sb, b)| filter.compare(a, b).then(sa.cmp(sb)));

    let limit = filter.limit.unwrap_or(usize::MAX);
    Ok(visible.into_iter().take(limit).map(|(_, r)| r.clone()).collect::<Vec<_>>().into())
}

fn insert(inner: &mut Inner, table: &str, rows: Vec<Row>, caller: Option<&SubjectId>) -> Result<RowSet, GatewayError> {
    let Inner {
        tables,
        policies,
        next_seq,
    } = inner;
    let t = tables.get_mut(table).ok_or_else(|| unknown_table(table))?;
    let policies: Vec<&Policy> = policies
        .iter()
        .filter(|p| p.applies_to(table, PolicyAction::Insert))
        .collect();

    let mut prepared = Vec::with_capacity(rows.len());
    for mut row in rows {
        for (column, default) in &t.defaults {
            if !row.contains_key(column) {
                row.insert(column.clone(), default_value(*default, caller));
            }
        }
        if !allowed(&policies, caller, &row) {
            return Err(GatewayError::access_denied(
                table,
                PolicyAction::Insert,
                format!("new row violates row-level security policy for table \"{table}\""),
            ));
        }
        prepared.push(row);
    }

    for row in &prepared {
        *next_seq += 1;
        t.rows.push((*next_seq, row.clone()));
    }
    Ok(prepared.into())
}

fn default_value(default: ColumnDefault, caller: Option<&SubjectId>) -> Value {
    match default {
        ColumnDefault::Uuid => Value::String(Uuid::now_v7().to_string()),
        ColumnDefault::Now => Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        ColumnDefault::AuthUid => caller.map_or(Value::Null, |s| Value::String(s.to_string())),
    }
}

#[async_trait]
impl RemoteStore for InMemoryPolicyStore {
    async fn execute(&self, request: StoreRequest) -> Result<RowSet, GatewayError> {
        let StoreRequest {
            table,
            operation,
            credential,
        } = request;
        let caller = self.caller(&table, operation.action(), &credential)?;

        match operation {
            StoreOperation::Select(filter) => select(&self.read(), &table, &filter, caller.as_ref()),
            StoreOperation::Insert(rows) => insert(&mut self.write(), &table, rows, caller.as_ref()),
        }
    }
}

impl core::fmt::Debug for InMemoryPolicyStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.read();
        f.debug_struct("InMemoryPolicyStore")
            .field("tables", &inner.tables.keys().collect::<Vec<_>>())
            .field("policies", &inner.policies.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Predicate;
    use chrono::Duration;
    use msgboard_auth::{AccessClaims, HmacTokenKey};
    use serde_json::json;

    fn key() -> HmacTokenKey {
        HmacTokenKey::new("store-secret")
    }

    fn token(sub: &str) -> Credential {
        let now = Utc::now();
        let claims = AccessClaims::new(SubjectId::new(sub), None, now, now + Duration::hours(1));
        Credential::Bearer(key().sign(&claims).unwrap())
    }

    fn store() -> InMemoryPolicyStore {
        let store = InMemoryPolicyStore::new(Arc::new(key()));
        store.create_table(
            "notes",
            [
                ("id", ColumnDefault::Uuid),
                ("owner", ColumnDefault::AuthUid),
                ("created_at", ColumnDefault::Now),
            ],
        );
        store.add_policy(Policy::new("own notes", "notes", PolicyAction::Select, Predicate::owner_matches("owner")));
        store.add_policy(Policy::new("write own", "notes", PolicyAction::Insert, Predicate::owner_matches("owner")));
        store
    }

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    async fn run(store: &InMemoryPolicyStore, op: StoreOperation, credential: Credential) -> Result<RowSet, GatewayError> {
        store
            .execute(StoreRequest {
                table: "notes".into(),
                operation: op,
                credential,
            })
            .await
    }

    #[tokio::test]
    async fn defaults_fill_missing_columns() {
        let s = store();
        let out = run(&s, StoreOperation::Insert(vec![row(json!({ "text": "hi" }))]), token("u1"))
            .await
            .unwrap();

        let r = &out.rows()[0];
        assert_eq!(r["owner"], json!("u1"));
        assert!(r["id"].as_str().unwrap().parse::<Uuid>().is_ok());
        assert!(r["created_at"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn batch_insert_is_all_or_nothing() {
        let s = store();
        let rows = vec![
            row(json!({ "text": "mine" })),
            row(json!({ "text": "forged", "owner": "u2" })),
        ];
        let err = run(&s, StoreOperation::Insert(rows), token("u1")).await.unwrap_err();

        assert!(err.is_access_denied());
        assert!(s.service_rows("notes").is_empty());
    }

    #[tokio::test]
    async fn select_drops_rows_silently() {
        let s = store();
        run(&s, StoreOperation::Insert(vec![row(json!({ "text": "a" }))]), token("u1")).await.unwrap();
        run(&s, StoreOperation::Insert(vec![row(json!({ "text": "b" }))]), token("u2")).await.unwrap();

        let mine = run(&s, StoreOperation::Select(Filter::default()), token("u1")).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine.rows()[0]["text"], json!("a"));

        let anon = run(&s, StoreOperation::Select(Filter::default()), Credential::Anonymous).await.unwrap();
        assert!(anon.is_empty());
    }

    #[tokio::test]
    async fn no_policy_means_no_access() {
        let s = store();
        s.set_policies("notes", Vec::<Policy>::new());

        let err = run(&s, StoreOperation::Insert(vec![row(json!({}))]), token("u1")).await.unwrap_err();
        assert!(err.is_access_denied());
        let rows = run(&s, StoreOperation::Select(Filter::default()), token("u1")).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn invalid_token_is_denied_not_anonymous() {
        let s = store();
        let forged = HmacTokenKey::new("other-secret");
        let now = Utc::now();
        let claims = AccessClaims::new(SubjectId::new("u1"), None, now, now + Duration::hours(1));
        let credential = Credential::Bearer(forged.sign(&claims).unwrap());

        let err = run(&s, StoreOperation::Select(Filter::default()), credential).await.unwrap_err();
        assert!(matches!(err, GatewayError::AccessDenied { action: PolicyAction::Select, .. }));
    }

    #[tokio::test]
    async fn unknown_table_is_rejected() {
        let s = store();
        let err = s
            .execute(StoreRequest {
                table: "missing".into(),
                operation: StoreOperation::Select(Filter::default()),
                credential: Credential::Anonymous,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { status: 404, .. }));
    }

    #[tokio::test]
    async fn select_honours_filter_order_and_limit() {
        let s = store();
        s.set_policies(
            "notes",
            [
                Policy::new("read all", "notes", PolicyAction::Select, Predicate::Public),
                Policy::new("write own", "notes", PolicyAction::Insert, Predicate::owner_matches("owner")),
            ],
        );
        for (i, text) in ["c", "a", "b"].iter().enumerate() {
            let r = row(json!({ "text": text, "n": i }));
            run(&s, StoreOperation::Insert(vec![r]), token("u1")).await.unwrap();
        }

        let out = run(&s, StoreOperation::Select(Filter::new().order_asc("text").limit(2)), Credential::Anonymous)
            .await
            .unwrap();
        let texts: Vec<_> = out.rows().iter().map(|r| r["text"].clone()).collect();
        assert_eq!(texts, vec![json!("a"), json!("b")]);

        let out = run(&s, StoreOperation::Select(Filter::new().eq("n", 0)), Credential::Anonymous)
            .await
            .unwrap();
        assert_eq!(out.rows()[0]["text"], json!("c"));
    }
}
