//! Operation requests, results, and the executor seam.
//!
//! A [`DatasourceOperation`] performs the actual I/O. It receives a request
//! and a [`Completion`]; it may complete right away or hold the completion
//! and finish on a later tick. Completions are delivered over a channel and
//! applied by `Datasource::update`, so results never re-enter the ledger
//! while it is borrowed.

use crate::guid::Guid;
use crate::loader::ScopeKey;
use crate::persistence::OperationKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::mpsc::Sender;

/// One queued entity operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceOperationData {
    pub id: Guid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// GUID-keyed queue: a later entry for the same id replaces the earlier one.
#[derive(Debug, Clone, Default)]
pub struct OperationQueue {
    entries: BTreeMap<Guid, Option<Value>>,
}

impl OperationQueue {
    pub fn push(&mut self, id: Guid, payload: Option<Value>) {
        self.entries.insert(id, payload);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: Guid) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn remove(&mut self, id: Guid) {
        self.entries.remove(&id);
    }

    /// Drain the queue in id order.
    pub fn take(&mut self) -> Vec<PersistenceOperationData> {
        std::mem::take(&mut self.entries)
            .into_iter()
            .map(|(id, payload)| PersistenceOperationData { id, payload })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadRequest {
    /// Scope the load was issued for; `None` for host-initiated loads.
    pub scope: Option<ScopeKey>,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationRequest {
    Save(Vec<PersistenceOperationData>),
    Synchronize(Vec<PersistenceOperationData>),
    Delete(Vec<PersistenceOperationData>),
    Load(LoadRequest),
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Save(_) => OperationKind::Save,
            Self::Synchronize(_) => OperationKind::Synchronize,
            Self::Delete(_) => OperationKind::Delete,
            Self::Load(_) => OperationKind::Load,
        }
    }

    /// Ids named by a batch request. Empty for loads.
    pub fn ids(&self) -> Vec<Guid> {
        match self {
            Self::Save(batch) | Self::Synchronize(batch) | Self::Delete(batch) => {
                batch.iter().map(|data| data.id).collect()
            }
            Self::Load(_) => Vec::new(),
        }
    }
}

/// A node of a result tree.
///
/// `fallback` supplies defaults for fields the result omits. Children are
/// materialized under this record's entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultRecord {
    pub json: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResultRecord>,
}

impl ResultRecord {
    pub fn new(json: Value) -> Self {
        Self {
            json,
            fallback: None,
            children: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: Value) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_children(mut self, children: Vec<ResultRecord>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(default)]
    pub records: Vec<ResultRecord>,
}

impl OperationResult {
    pub fn success(records: Vec<ResultRecord>) -> Self {
        Self {
            success: true,
            records,
        }
    }

    pub fn failure() -> Self {
        Self {
            success: false,
            records: Vec::new(),
        }
    }
}

/// Identifies one executed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Ticket(pub u64);

pub(crate) type CompletionSender = Sender<(Ticket, OperationResult)>;

/// One-shot result slot handed to [`DatasourceOperation::execute`].
///
/// Dropping a completion without finishing it reports a failure, so a
/// backend that loses a request cannot stall a reload forever.
#[derive(Debug)]
pub struct Completion {
    ticket: Ticket,
    sender: Option<CompletionSender>,
}

impl Completion {
    pub(crate) fn new(ticket: Ticket, sender: CompletionSender) -> Self {
        Self {
            ticket,
            sender: Some(sender),
        }
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn succeed(self, records: Vec<ResultRecord>) {
        self.complete(OperationResult::success(records));
    }

    pub fn fail(self) {
        self.complete(OperationResult::failure());
    }

    pub fn complete(mut self, result: OperationResult) {
        self.send(result);
    }

    fn send(&mut self, result: OperationResult) {
        if let Some(sender) = self.sender.take() {
            // the datasource may already be gone
            let _ = sender.send((self.ticket, result));
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.send(OperationResult::failure());
    }
}

/// Executes datasource I/O.
pub trait DatasourceOperation {
    fn execute(&mut self, request: OperationRequest, completion: Completion);
}

/// What a callback learns about a finished operation.
///
/// `entities` is `None` when the operation failed; on success it lists the
/// ids the result touched (for loads, every materialized or reused entity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    pub ticket: Ticket,
    pub kind: OperationKind,
    pub success: bool,
    pub entities: Option<Vec<Guid>>,
}

pub type OperationCallback = Box<dyn FnOnce(&OperationOutcome)>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::mpsc::channel;

    #[test]
    fn queue_coalesces_by_id() {
        let mut queue = OperationQueue::default();
        let id = Guid::from_u128(1);
        queue.push(id, Some(json!({"x": 1})));
        queue.push(id, Some(json!({"x": 2})));
        queue.push(Guid::from_u128(2), None);
        assert_eq!(queue.len(), 2);

        let batch = queue.take();
        assert!(queue.is_empty());
        assert_eq!(batch[0].id, id);
        assert_eq!(batch[0].payload, Some(json!({"x": 2})));
        assert_eq!(batch[1].payload, None);
    }

    #[test]
    fn dropped_completion_reports_failure() {
        let (sender, receiver) = channel();
        drop(Completion::new(Ticket(4), sender));
        let (ticket, result) = receiver.try_recv().unwrap();
        assert_eq!(ticket, Ticket(4));
        assert!(!result.success);
    }

    #[test]
    fn completion_sends_exactly_once() {
        let (sender, receiver) = channel();
        Completion::new(Ticket(1), sender).succeed(vec![ResultRecord::new(json!({}))]);
        let (_, result) = receiver.try_recv().unwrap();
        assert!(result.success);
        assert_eq!(result.records.len(), 1);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn result_tree_deserializes_with_defaults() {
        let record: ResultRecord = serde_json::from_value(json!({
            "json": {"name": "root"},
            "children": [{"json": {"name": "leaf"}, "fallback": {"color": "red"}}]
        }))
        .unwrap();
        assert_eq!(record.fallback, None);
        assert_eq!(record.children[0].fallback, Some(json!({"color": "red"})));
        assert!(record.children[0].children.is_empty());
    }
}
