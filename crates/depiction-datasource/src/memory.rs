//! In-memory [`DatasourceOperation`].
//!
//! `MemoryOperation` is a cheap clonable handle: give one clone to the
//! datasource and keep another to seed records, inspect what was executed,
//! or hold completions back to simulate slow I/O.

use crate::guid::Guid;
use crate::operation::{Completion, DatasourceOperation, OperationRequest, OperationResult};
use crate::persistence::OperationKind;
use crate::query;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Default)]
struct MemoryState {
    records: BTreeMap<Guid, Value>,
    executed: Vec<OperationRequest>,
    held: Vec<(Completion, OperationResult)>,
    deferred: bool,
    failing: bool,
}

#[derive(Clone, Default)]
pub struct MemoryOperation {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryOperation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record. Returns `false` if the payload has no valid `id`.
    pub fn insert(&self, record: Value) -> bool {
        match crate::json::payload_id(&record) {
            Ok(Some(id)) => {
                self.state.borrow_mut().records.insert(id, record);
                true
            }
            _ => false,
        }
    }

    pub fn record(&self, id: Guid) -> Option<Value> {
        self.state.borrow().records.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().records.is_empty()
    }

    /// Every request executed so far, in order.
    pub fn executed(&self) -> Vec<OperationRequest> {
        self.state.borrow().executed.clone()
    }

    pub fn execution_count(&self, kind: OperationKind) -> usize {
        self.state
            .borrow()
            .executed
            .iter()
            .filter(|request| request.kind() == kind)
            .count()
    }

    /// Fail every subsequent request without touching the records.
    pub fn set_failing(&self, failing: bool) {
        self.state.borrow_mut().failing = failing;
    }

    /// Hold completions until [`release`](Self::release).
    pub fn set_deferred(&self, deferred: bool) {
        self.state.borrow_mut().deferred = deferred;
    }

    pub fn held(&self) -> usize {
        self.state.borrow().held.len()
    }

    /// Complete the oldest held request.
    pub fn release_next(&self) -> bool {
        let next = {
            let mut state = self.state.borrow_mut();
            (!state.held.is_empty()).then(|| state.held.remove(0))
        };
        match next {
            Some((completion, result)) => {
                completion.complete(result);
                true
            }
            None => false,
        }
    }

    /// Complete every held request. Returns how many were released.
    pub fn release(&self) -> usize {
        let held = std::mem::take(&mut self.state.borrow_mut().held);
        let count = held.len();
        for (completion, result) in held {
            completion.complete(result);
        }
        count
    }
}

impl DatasourceOperation for MemoryOperation {
    fn execute(&mut self, request: OperationRequest, completion: Completion) {
        let mut state = self.state.borrow_mut();
        state.executed.push(request.clone());
        let result = if state.failing {
            OperationResult::failure()
        } else {
            query::respond(&mut state.records, &request).0
        };
        if state.deferred {
            state.held.push((completion, result));
        } else {
            drop(state);
            completion.complete(result);
        }
    }
}

impl std::fmt::Debug for MemoryOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MemoryOperation")
            .field("records", &state.records.len())
            .field("executed", &state.executed.len())
            .field("held", &state.held.len())
            .finish()
    }
}
