//! The remote store contract consumed by the reconciliation engine.
//!
//! Every guarantee here is one the engine must defensively assume may NOT
//! hold: any call can time out or fail, and the engine treats failure and
//! absence alike as "fall back to local".

use crate::error::RemoteResult;
use crate::value::{Document, Value};
use async_trait::async_trait;

/// Outcome of an idempotent create.
///
/// `AlreadyExists` is success, not an error: client-chosen document ids
/// mean a duplicate create is a retry of a write that already landed.
/// At-least-once delivery with client ids collapses to effectively-once
/// storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Outcome of a delete. `NotFound` is success: already-gone is an
/// acceptable terminal state for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Query filter. The backing store has no composite indexes, so callers
/// must not combine a disjunction with server-side ordering — sort in
/// memory instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    FieldEq { field: String, value: Value },
    Or(Vec<Filter>),
}

impl Filter {
    pub fn field_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::FieldEq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn any_of(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    /// True for OR filters, which cannot be combined with server ordering.
    pub fn is_disjunction(&self) -> bool {
        matches!(self, Filter::Or(_))
    }
}

/// Server-side sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Server-side ordering request.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}

/// Thin adapter over a remote document collection store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Lightweight availability check, used by the save flow's bounded
    /// remote probe. Distinguishes "network up but remote degraded" from
    /// "no network".
    async fn ping(&self) -> RemoteResult<()>;

    /// Fetch one document. `Ok(None)` is absence; `Err` is a fault — the
    /// two are distinguishable, though the engine treats both as "fall
    /// back to local".
    async fn get(&self, collection: &str, id: &str) -> RemoteResult<Option<Document>>;

    /// Create a document under a caller-chosen id. Must be idempotent:
    /// repeating the call with the same id yields `AlreadyExists`, never a
    /// duplicate-detection error.
    async fn create_with_id(
        &self,
        collection: &str,
        id: &str,
        doc: &Document,
    ) -> RemoteResult<CreateOutcome>;

    /// Partial update limited to the masked field paths.
    async fn patch(
        &self,
        collection: &str,
        id: &str,
        doc: &Document,
        field_mask: &[&str],
    ) -> RemoteResult<()>;

    /// Query a collection. Returns `(document_id, document)` pairs.
    async fn run_query(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        order_by: Option<&OrderBy>,
        limit: Option<usize>,
    ) -> RemoteResult<Vec<(String, Document)>>;

    /// Delete a document. See [`DeleteOutcome`].
    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<DeleteOutcome>;

    /// Atomic server-side numeric increment. Used for win counts so
    /// concurrent increments from different devices never lose updates the
    /// way a read-modify-write PATCH would.
    async fn transform_increment(
        &self,
        collection: &str,
        id: &str,
        field_path: &str,
        delta: i64,
    ) -> RemoteResult<()>;
}
