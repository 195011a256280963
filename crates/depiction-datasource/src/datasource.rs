//! The persistence ledger.
//!
//! A [`Datasource`] tracks which scene entities it is responsible for, queues
//! and batches save/synchronize/delete requests, turns load results into
//! entities, and evicts entities that no loader wants any more.
//!
//! ```text
//! queue_* ──flush──▶ DatasourceOperation::execute ──Completion──▶ channel
//!                                                                   │
//! refresh_loaders / reload_all ──load──▶ execute ──Completion──▶    │
//!                                                                   ▼
//!                                              update(scene): apply results,
//!                                              run callbacks, auto-dispose
//! ```

use crate::config::DatasourceConfig;
use crate::error::DatasourceError;
use crate::guid::Guid;
use crate::index2d_loader::Index2DLoader;
use crate::json;
use crate::loader::{LoadScope, Loader, LoaderBase, ScopeKey, ScopeState};
use crate::operation::{
    Completion, CompletionSender, DatasourceOperation, LoadRequest, OperationCallback,
    OperationOutcome, OperationQueue, OperationRequest, OperationResult,
    PersistenceOperationData, ResultRecord, Ticket,
};
use crate::persistence::{OperationCapabilities, OperationKind, PersistenceData};
use crate::reload::{ReloadState, ReloadTracker};
use crate::scene::{EntityHandle, Scene};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::{Receiver, channel};
use tracing::{debug, info, warn};

struct PendingOperation {
    kind: OperationKind,
    batch: Vec<Guid>,
    callback: Option<OperationCallback>,
    /// Loader id and scope key for loads issued on behalf of a loader.
    scope: Option<(String, ScopeKey)>,
}

pub struct Datasource {
    name: String,
    capabilities: OperationCapabilities,
    auto_dispose: bool,
    ledger: BTreeMap<Guid, PersistenceData>,
    loaders: Vec<LoaderBase>,
    operation: Box<dyn DatasourceOperation>,
    save_queue: OperationQueue,
    synchronize_queue: OperationQueue,
    delete_queue: OperationQueue,
    pending: BTreeMap<Ticket, PendingOperation>,
    next_ticket: u64,
    sender: CompletionSender,
    receiver: Receiver<(Ticket, OperationResult)>,
    reload: ReloadTracker,
    disposing: bool,
}

impl Datasource {
    pub fn new(
        name: impl Into<String>,
        capabilities: OperationCapabilities,
        operation: Box<dyn DatasourceOperation>,
    ) -> Self {
        let (sender, receiver) = channel();
        Self {
            name: name.into(),
            capabilities,
            auto_dispose: true,
            ledger: BTreeMap::new(),
            loaders: Vec::new(),
            operation,
            save_queue: OperationQueue::default(),
            synchronize_queue: OperationQueue::default(),
            delete_queue: OperationQueue::default(),
            pending: BTreeMap::new(),
            next_ticket: 0,
            sender,
            receiver,
            reload: ReloadTracker::default(),
            disposing: false,
        }
    }

    /// Build from configuration. An `[index2d]` table registers an
    /// [`Index2DLoader`] named `index2d`.
    pub fn from_config(config: &DatasourceConfig, operation: Box<dyn DatasourceOperation>) -> Self {
        let mut datasource = Self::new(config.name.clone(), config.capabilities(), operation);
        datasource.auto_dispose = config.auto_dispose;
        if let Some(index2d) = &config.index2d {
            datasource.add_loader(Box::new(Index2DLoader::from_config("index2d", index2d)));
        }
        datasource
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> OperationCapabilities {
        self.capabilities
    }

    pub fn set_auto_dispose(&mut self, auto_dispose: bool) {
        self.auto_dispose = auto_dispose;
    }

    /// True once [`dispose`](Self::dispose) has started.
    pub fn is_disposing(&self) -> bool {
        self.disposing
    }

    pub fn reload_state(&self) -> ReloadState {
        self.reload.state()
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    pub fn persistence_data(&self, id: Guid) -> Option<&PersistenceData> {
        self.ledger.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = Guid> + '_ {
        self.ledger.keys().copied()
    }

    /// Operations handed to the backend and not yet applied.
    pub fn pending_operations(&self) -> usize {
        self.pending.len()
    }

    // ---- ledger -------------------------------------------------------

    /// Start tracking the entity behind `handle`.
    ///
    /// Returns `false` without changing anything if the id is already
    /// tracked, the handle is stale, or the datasource is torn down.
    pub fn add_persistence_data(&mut self, scene: &Scene, handle: EntityHandle) -> bool {
        if self.disposing {
            return false;
        }
        let Some(entity) = scene.get(handle) else {
            debug!(datasource = %self.name, "ignoring stale handle");
            return false;
        };
        let id = entity.id();
        if self.ledger.contains_key(&id) {
            debug!(datasource = %self.name, %id, "already tracked");
            return false;
        }
        self.ledger
            .insert(id, PersistenceData::new(handle, id, self.capabilities));
        true
    }

    /// Stop tracking `id`. Ignored during teardown.
    pub fn remove_persistence_data(&mut self, id: Guid) -> Option<PersistenceData> {
        if self.disposing {
            debug!(datasource = %self.name, %id, "ignoring removal during teardown");
            return None;
        }
        self.forget(id)
    }

    fn forget(&mut self, id: Guid) -> Option<PersistenceData> {
        self.save_queue.remove(id);
        self.synchronize_queue.remove(id);
        for loader in &mut self.loaders {
            loader.forget(id);
        }
        self.ledger.remove(&id)
    }

    pub fn supports_operation_type(&self, scene: &Scene, kind: OperationKind) -> bool {
        match kind {
            OperationKind::Load => true,
            _ => self.capabilities.supports(kind) && scene.persistence_operations_enabled(),
        }
    }

    /// Record a local change that the backend has not seen yet.
    pub fn mark_modified(&mut self, id: Guid) -> Result<(), DatasourceError> {
        self.ledger
            .get_mut(&id)
            .map(|data| data.set_out_of_sync(true))
            .ok_or(DatasourceError::UnknownEntity(id))
    }

    // ---- queues -------------------------------------------------------

    pub fn queue_save(&mut self, scene: &Scene, id: Guid, payload: Option<Value>) -> bool {
        self.queue(scene, OperationKind::Save, id, payload)
    }

    pub fn queue_synchronize(&mut self, scene: &Scene, id: Guid, payload: Option<Value>) -> bool {
        self.queue(scene, OperationKind::Synchronize, id, payload)
    }

    pub fn queue_delete(&mut self, scene: &Scene, id: Guid) -> bool {
        self.queue(scene, OperationKind::Delete, id, None)
    }

    fn queue(&mut self, scene: &Scene, kind: OperationKind, id: Guid, payload: Option<Value>) -> bool {
        if self.disposing || !self.supports_operation_type(scene, kind) {
            debug!(datasource = %self.name, %id, %kind, "operation not supported, not queued");
            return false;
        }
        let queue = match kind {
            OperationKind::Save => &mut self.save_queue,
            OperationKind::Synchronize => &mut self.synchronize_queue,
            OperationKind::Delete => &mut self.delete_queue,
            OperationKind::Load => return false,
        };
        queue.push(id, payload);
        if kind != OperationKind::Delete
            && let Some(data) = self.ledger.get_mut(&id)
        {
            data.set_out_of_sync(true);
        }
        true
    }

    pub fn queued(&self, kind: OperationKind) -> usize {
        match kind {
            OperationKind::Save => self.save_queue.len(),
            OperationKind::Synchronize => self.synchronize_queue.len(),
            OperationKind::Delete => self.delete_queue.len(),
            OperationKind::Load => 0,
        }
    }

    /// Hand every non-empty queue to the backend as one batch each.
    ///
    /// Queues whose kind is currently unsupported are kept for a later
    /// flush.
    pub fn flush(&mut self, scene: &Scene) -> Vec<Ticket> {
        let mut tickets = Vec::new();
        for kind in [
            OperationKind::Save,
            OperationKind::Synchronize,
            OperationKind::Delete,
        ] {
            if self.queued(kind) == 0 || !self.supports_operation_type(scene, kind) {
                continue;
            }
            let batch = match kind {
                OperationKind::Save => self.save_queue.take(),
                OperationKind::Synchronize => self.synchronize_queue.take(),
                _ => self.delete_queue.take(),
            };
            if let Some(ticket) = self.execute_batch(scene, kind, batch, None) {
                tickets.push(ticket);
            }
        }
        tickets
    }

    // ---- operations ---------------------------------------------------

    pub fn save(
        &mut self,
        scene: &Scene,
        batch: Vec<PersistenceOperationData>,
        callback: Option<OperationCallback>,
    ) -> Option<Ticket> {
        self.execute_batch(scene, OperationKind::Save, batch, callback)
    }

    pub fn synchronize(
        &mut self,
        scene: &Scene,
        batch: Vec<PersistenceOperationData>,
        callback: Option<OperationCallback>,
    ) -> Option<Ticket> {
        self.execute_batch(scene, OperationKind::Synchronize, batch, callback)
    }

    pub fn delete(
        &mut self,
        scene: &Scene,
        batch: Vec<PersistenceOperationData>,
        callback: Option<OperationCallback>,
    ) -> Option<Ticket> {
        self.execute_batch(scene, OperationKind::Delete, batch, callback)
    }

    /// Load outside any loader. Entities it materializes are tracked but
    /// unclaimed, so the next auto-dispose pass may evict them.
    pub fn load(&mut self, request: LoadRequest, callback: Option<OperationCallback>) -> Ticket {
        self.execute(OperationRequest::Load(request), callback, None)
    }

    fn execute_batch(
        &mut self,
        scene: &Scene,
        kind: OperationKind,
        mut batch: Vec<PersistenceOperationData>,
        callback: Option<OperationCallback>,
    ) -> Option<Ticket> {
        if self.disposing || !self.supports_operation_type(scene, kind) {
            debug!(datasource = %self.name, %kind, "operation not supported");
            return None;
        }
        if kind == OperationKind::Save {
            for data in &mut batch {
                if data.payload.is_none() {
                    data.payload = scene.entity(data.id).map(|entity| entity.state().clone());
                }
            }
        }
        let request = match kind {
            OperationKind::Save => OperationRequest::Save(batch),
            OperationKind::Synchronize => OperationRequest::Synchronize(batch),
            OperationKind::Delete => OperationRequest::Delete(batch),
            OperationKind::Load => return None,
        };
        Some(self.execute(request, callback, None))
    }

    fn execute(
        &mut self,
        request: OperationRequest,
        callback: Option<OperationCallback>,
        scope: Option<(String, ScopeKey)>,
    ) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        let kind = request.kind();
        debug!(datasource = %self.name, ticket = ticket.0, %kind, "executing");
        self.pending.insert(
            ticket,
            PendingOperation {
                kind,
                batch: request.ids(),
                callback,
                scope,
            },
        );
        self.operation
            .execute(request, Completion::new(ticket, self.sender.clone()));
        ticket
    }

    /// Apply every completed operation, run callbacks, and reconcile.
    pub fn update(&mut self, scene: &mut Scene) -> Vec<OperationOutcome> {
        let mut outcomes = Vec::new();
        while let Ok((ticket, result)) = self.receiver.try_recv() {
            let Some(pending) = self.pending.remove(&ticket) else {
                debug!(datasource = %self.name, ticket = ticket.0, "dropping unknown completion");
                continue;
            };
            let outcome = self.apply(scene, ticket, &pending, result);
            if let Some(callback) = pending.callback {
                callback(&outcome);
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    fn apply(
        &mut self,
        scene: &mut Scene,
        ticket: Ticket,
        pending: &PendingOperation,
        result: OperationResult,
    ) -> OperationOutcome {
        let kind = pending.kind;
        if self.disposing {
            return OperationOutcome {
                ticket,
                kind,
                success: false,
                entities: None,
            };
        }
        if !result.success {
            warn!(datasource = %self.name, ticket = ticket.0, %kind, "operation failed");
        }

        let entities = match kind {
            OperationKind::Load => self.apply_load(scene, ticket, pending, &result),
            _ if !result.success => None,
            _ => {
                let ids = self.apply_batch(scene, kind, pending, &result);
                self.auto_dispose(scene);
                Some(ids)
            }
        };

        OperationOutcome {
            ticket,
            kind,
            success: result.success,
            entities,
        }
    }

    /// Ids a batch result refers to: the records' ids, or the batch itself
    /// when the backend returned no records.
    fn matched_ids(pending: &PendingOperation, result: &OperationResult) -> Vec<(Guid, Option<Value>)> {
        if result.records.is_empty() {
            return pending.batch.iter().map(|id| (*id, None)).collect();
        }
        result
            .records
            .iter()
            .filter_map(|record| match json::payload_id(&record.json) {
                Ok(Some(id)) => Some((id, Some(record.json.clone()))),
                _ => None,
            })
            .collect()
    }

    fn apply_batch(
        &mut self,
        scene: &mut Scene,
        kind: OperationKind,
        pending: &PendingOperation,
        result: &OperationResult,
    ) -> Vec<Guid> {
        let mut touched = Vec::new();
        for (id, json) in Self::matched_ids(pending, result) {
            let Some(data) = self.ledger.get_mut(&id) else {
                continue;
            };
            match kind {
                OperationKind::Save => data.set_out_of_sync(false),
                OperationKind::Synchronize => {
                    if let Some(json) = &json
                        && let Some(entity) = scene.get_mut(data.handle())
                        && let Err(error) = entity.apply(json)
                    {
                        warn!(datasource = %self.name, %id, %error, "synchronize result rejected");
                        continue;
                    }
                    data.set_out_of_sync(false);
                }
                OperationKind::Delete => {
                    let handle = data.handle();
                    for disposed in scene.dispose(handle) {
                        self.forget(disposed);
                    }
                    self.forget(id);
                }
                OperationKind::Load => {}
            }
            touched.push(id);
        }
        touched
    }

    fn apply_load(
        &mut self,
        scene: &mut Scene,
        ticket: Ticket,
        pending: &PendingOperation,
        result: &OperationResult,
    ) -> Option<Vec<Guid>> {
        let loader_index = match &pending.scope {
            Some((loader_id, key)) => {
                let index = self.loaders.iter().position(|loader| loader.id() == loader_id);
                let live = index.and_then(|index| {
                    self.loaders[index]
                        .get_load_scope(key)
                        .filter(|scope| scope.ticket() == ticket)
                        .map(|_| index)
                });
                if live.is_none() {
                    debug!(datasource = %self.name, scope = %key, "scope gone, discarding load");
                    self.finish_reload_ticket(scene, ticket);
                    return result.success.then(Vec::new);
                }
                live
            }
            None => None,
        };
        let key = pending.scope.as_ref().map(|(_, key)| key);

        let entities = if result.success {
            let mut loaded = Vec::new();
            for record in &result.records {
                if let Err(error) = self.materialize(scene, record, None, loader_index.zip(key), &mut loaded) {
                    warn!(datasource = %self.name, %error, "skipping invalid load record");
                }
            }
            if let (Some(index), Some(key)) = (loader_index, key)
                && let Some(scope) = self.loaders[index].scope_mut(key)
            {
                scope.loaded(loaded.iter().copied());
            }
            info!(datasource = %self.name, entities = loaded.len(), "load applied");
            Some(loaded)
        } else {
            if let (Some(index), Some(key)) = (loader_index, key)
                && let Some(scope) = self.loaders[index].scope_mut(key)
            {
                scope.failed();
            }
            None
        };

        self.finish_reload_ticket(scene, ticket);
        entities
    }

    /// Turn one result node and its descendants into tracked entities.
    fn materialize(
        &mut self,
        scene: &mut Scene,
        record: &ResultRecord,
        parent: Option<Guid>,
        scope: Option<(usize, &ScopeKey)>,
        loaded: &mut Vec<Guid>,
    ) -> Result<Guid, DatasourceError> {
        let mut payload = match &record.fallback {
            Some(fallback) => json::merge_with_fallback(&record.json, fallback),
            None => record.json.clone(),
        };
        json::object_mut(&mut payload)?;
        if let Some(parent) = parent {
            json::inject_parent(&mut payload, parent)?;
        }
        if let Some((index, key)) = scope {
            self.loaders[index].loader().generate_persistent(key, &mut payload);
        }

        let id = self.reuse_or_spawn(scene, payload)?;
        loaded.push(id);

        for child in &record.children {
            if let Err(error) = self.materialize(scene, child, Some(id), scope, loaded) {
                warn!(datasource = %self.name, parent = %id, %error, "skipping invalid child record");
            }
        }
        Ok(id)
    }

    fn reuse_or_spawn(&mut self, scene: &mut Scene, payload: Value) -> Result<Guid, DatasourceError> {
        if let Some(id) = json::payload_id(&payload)? {
            // tracked by this ledger: refresh unless local edits are pending
            if let Some(data) = self.ledger.get(&id) {
                let in_sync = !data.is_out_of_sync();
                if let Some(entity) = scene.get_mut(data.handle()) {
                    if in_sync {
                        entity.apply(&payload)?;
                    }
                    return Ok(id);
                }
                self.ledger.remove(&id);
            }
            // live in the scene but not tracked yet
            if let Some(handle) = scene.handle_of(id) {
                if let Some(entity) = scene.get_mut(handle) {
                    entity.apply(&payload)?;
                }
                self.add_persistence_data(scene, handle);
                return Ok(id);
            }
        }

        let handle = scene.spawn(payload, true)?;
        self.add_persistence_data(scene, handle);
        scene
            .get(handle)
            .map(|entity| entity.id())
            .ok_or(DatasourceError::InvalidPayload("spawned entity vanished".to_string()))
    }

    // ---- loaders ------------------------------------------------------

    /// Register a loader. A loader whose id is already registered is
    /// ignored.
    pub fn add_loader(&mut self, loader: Box<dyn Loader>) -> bool {
        if self.disposing || self.loaders.iter().any(|existing| existing.id() == loader.id()) {
            debug!(datasource = %self.name, loader = loader.id(), "loader already registered");
            return false;
        }
        self.loaders.push(LoaderBase::new(loader));
        true
    }

    /// Unregister a loader and release everything only it claimed.
    pub fn remove_loader(&mut self, scene: &mut Scene, id: &str) -> bool {
        let Some(index) = self.loaders.iter().position(|loader| loader.id() == id) else {
            return false;
        };
        self.loaders.remove(index);
        self.auto_dispose(scene);
        true
    }

    pub fn loaders(&self) -> &[LoaderBase] {
        &self.loaders
    }

    pub fn loader(&self, id: &str) -> Option<&LoaderBase> {
        self.loaders.iter().find(|loader| loader.id() == id)
    }

    /// The concrete loader registered under `id`, to move or reconfigure it.
    pub fn loader_mut<T: Loader>(&mut self, id: &str) -> Option<&mut T> {
        self.loaders
            .iter_mut()
            .find(|loader| loader.id() == id)
            .and_then(LoaderBase::downcast_mut::<T>)
    }

    /// Bring every loader's scopes in line with what it wants now.
    ///
    /// New and previously failed scopes are loaded; scopes no longer wanted
    /// are dropped, after which unclaimed entities may be auto-disposed.
    /// Returns the tickets of the issued loads.
    pub fn refresh_loaders(&mut self, scene: &mut Scene) -> Vec<Ticket> {
        if self.disposing {
            return Vec::new();
        }
        let mut tickets = Vec::new();
        let mut released = 0;
        for index in 0..self.loaders.len() {
            let desired = self.loaders[index].loader().desired_scopes();
            let stale: Vec<ScopeKey> = self.loaders[index]
                .scopes()
                .map(|scope| scope.key().clone())
                .filter(|key| !desired.contains(key))
                .collect();
            for key in &stale {
                self.loaders[index].remove_scope(key);
            }
            released += stale.len();

            for key in desired {
                let wanted = match self.loaders[index].get_load_scope(&key) {
                    None => true,
                    Some(scope) => scope.state() == ScopeState::Failed,
                };
                if wanted {
                    tickets.push(self.load_scope(index, key));
                }
            }
        }
        if released > 0 {
            debug!(datasource = %self.name, released, "released scopes");
            self.auto_dispose(scene);
        }
        tickets
    }

    fn load_scope(&mut self, index: usize, key: ScopeKey) -> Ticket {
        let loader = &self.loaders[index];
        let request = LoadRequest {
            scope: Some(key.clone()),
            parameters: loader.loader().load_parameters(&key),
        };
        let loader_id = loader.id().to_string();
        let ticket = self.execute(
            OperationRequest::Load(request),
            None,
            Some((loader_id, key.clone())),
        );
        self.loaders[index].insert_scope(LoadScope::new(key, ticket));
        ticket
    }

    /// Drop every scope, reload what each loader wants, and once all of
    /// those loads have finished dispose whatever no scope claimed.
    pub fn reload_all(&mut self, scene: &mut Scene) -> Vec<Ticket> {
        if self.disposing {
            return Vec::new();
        }
        info!(datasource = %self.name, loaders = self.loaders.len(), "reload requested");
        self.reload.request();
        let mut tickets = Vec::new();
        for index in 0..self.loaders.len() {
            self.loaders[index].clear_scopes();
            let desired = self.loaders[index].loader().desired_scopes();
            for key in desired {
                let ticket = self.load_scope(index, key);
                self.reload.track(ticket);
                tickets.push(ticket);
            }
        }
        self.reload.seal();
        self.complete_reload(scene);
        tickets
    }

    fn finish_reload_ticket(&mut self, scene: &mut Scene, ticket: Ticket) {
        if self.reload.finish(ticket) {
            self.complete_reload(scene);
        }
    }

    fn complete_reload(&mut self, scene: &mut Scene) {
        if self.reload.take_completed() {
            let disposed = self.auto_dispose(scene);
            info!(datasource = %self.name, disposed = disposed.len(), "reload completed");
        }
    }

    // ---- disposal -----------------------------------------------------

    fn is_claimed(&self, id: Guid) -> bool {
        self.loaders.iter().rev().any(|loader| loader.contains(id))
    }

    /// Whether disposing `id` would take down a tracked descendant that is
    /// still claimed or still holds local edits.
    fn retains_descendant(&self, scene: &Scene, id: Guid) -> bool {
        let mut visited = BTreeSet::from([id]);
        let mut stack = scene.children_of(id);
        while let Some(child) = stack.pop() {
            if !visited.insert(child) {
                continue;
            }
            if let Some(data) = self.ledger.get(&child)
                && (!data.can_be_auto_disposed() || self.is_claimed(child))
            {
                return true;
            }
            stack.extend(scene.children_of(child));
        }
        false
    }

    /// Dispose every tracked entity that is in sync and claimed by no
    /// loader scope. Skipped while a reload is in progress.
    ///
    /// Disposal cascades to children, so an entity whose subtree holds a
    /// claimed or out-of-sync tracked entity stays resident.
    pub fn auto_dispose(&mut self, scene: &mut Scene) -> Vec<Guid> {
        if !self.auto_dispose || self.disposing || self.reload.is_reloading() {
            return Vec::new();
        }
        let candidates: Vec<(Guid, EntityHandle)> = self
            .ledger
            .values()
            .filter(|data| {
                data.can_be_auto_disposed()
                    && !self.is_claimed(data.id())
                    && !self.retains_descendant(scene, data.id())
            })
            .map(|data| (data.id(), data.handle()))
            .collect();

        let mut disposed = Vec::new();
        for (id, handle) in candidates {
            if !self.ledger.contains_key(&id) {
                continue;
            }
            let ids = scene.dispose(handle);
            if ids.is_empty() {
                // disposed behind our back
                self.forget(id);
                continue;
            }
            for id in ids {
                self.forget(id);
                disposed.push(id);
            }
        }
        if !disposed.is_empty() {
            debug!(datasource = %self.name, count = disposed.len(), "auto-disposed entities");
        }
        disposed
    }

    /// Tear the datasource down, disposing every tracked entity once.
    pub fn dispose(&mut self, scene: &mut Scene) -> Vec<Guid> {
        if self.disposing {
            return Vec::new();
        }
        self.disposing = true;
        let mut disposed = Vec::new();
        let ledger = std::mem::take(&mut self.ledger);
        for data in ledger.values() {
            disposed.extend(scene.dispose(data.handle()));
        }
        self.loaders.clear();
        self.save_queue.take();
        self.synchronize_queue.take();
        self.delete_queue.take();
        self.pending.clear();
        info!(datasource = %self.name, disposed = disposed.len(), "datasource disposed");
        disposed
    }

    // ---- reporting ----------------------------------------------------

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            name: self.name.clone(),
            reload_state: self.reload.state(),
            entities: self
                .ledger
                .values()
                .map(|data| {
                    let id = data.id();
                    EntitySummary {
                        id,
                        out_of_sync: data.is_out_of_sync(),
                        claimed_by: self
                            .loaders
                            .iter()
                            .flat_map(|loader| {
                                loader
                                    .scopes()
                                    .filter(move |scope| scope.contains(id))
                                    .map(move |scope| format!("{}/{}", loader.id(), scope.key()))
                            })
                            .collect(),
                    }
                })
                .collect(),
            loaders: self
                .loaders
                .iter()
                .map(|loader| LoaderSummary {
                    id: loader.id().to_string(),
                    scopes: loader
                        .scopes()
                        .map(|scope| ScopeSummary {
                            key: scope.key().to_string(),
                            state: scope.state(),
                            entities: scope.entities().len(),
                        })
                        .collect(),
                })
                .collect(),
            queued: QueuedSummary {
                save: self.save_queue.len(),
                synchronize: self.synchronize_queue.len(),
                delete: self.delete_queue.len(),
            },
            pending: self.pending.len(),
        }
    }
}

impl std::fmt::Debug for Datasource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datasource")
            .field("name", &self.name)
            .field("entities", &self.ledger.len())
            .field("loaders", &self.loaders)
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub name: String,
    pub reload_state: ReloadState,
    pub entities: Vec<EntitySummary>,
    pub loaders: Vec<LoaderSummary>,
    pub queued: QueuedSummary,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySummary {
    pub id: Guid,
    pub out_of_sync: bool,
    pub claimed_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoaderSummary {
    pub id: String,
    pub scopes: Vec<ScopeSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeSummary {
    pub key: String,
    pub state: ScopeState,
    pub entities: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedSummary {
    pub save: usize,
    pub synchronize: usize,
    pub delete: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryOperation;
    use serde_json::json;

    fn id(n: u128) -> Guid {
        Guid::from_u128(n)
    }

    fn datasource(memory: &MemoryOperation) -> Datasource {
        Datasource::new("test", OperationCapabilities::ALL, Box::new(memory.clone()))
    }

    #[test]
    fn add_persistence_data_is_idempotent() {
        let memory = MemoryOperation::new();
        let mut scene = Scene::new();
        let mut ds = datasource(&memory);
        let handle = scene.spawn(json!({"id": id(1)}), false).unwrap();
        assert!(ds.add_persistence_data(&scene, handle));
        assert!(!ds.add_persistence_data(&scene, handle));
        assert_eq!(ds.len(), 1);
        assert_eq!(
            ds.persistence_data(id(1)).unwrap().capabilities(),
            OperationCapabilities::ALL
        );
    }

    #[test]
    fn capabilities_and_play_mode_gate_operations() {
        let memory = MemoryOperation::new();
        let mut scene = Scene::new();
        let mut ds = Datasource::new(
            "read-only",
            OperationCapabilities {
                save: true,
                ..OperationCapabilities::NONE
            },
            Box::new(memory.clone()),
        );
        assert!(ds.supports_operation_type(&scene, OperationKind::Save));
        assert!(!ds.supports_operation_type(&scene, OperationKind::Delete));
        assert!(!ds.queue_delete(&scene, id(1)));

        scene.set_persistence_operations_enabled(false);
        assert!(!ds.supports_operation_type(&scene, OperationKind::Save));
        assert!(ds.supports_operation_type(&scene, OperationKind::Load));
        assert!(!ds.queue_save(&scene, id(1), None));
        assert!(ds.flush(&scene).is_empty());
        assert!(memory.executed().is_empty());
    }

    #[test]
    fn mark_modified_requires_tracked_entity() {
        let memory = MemoryOperation::new();
        let mut ds = datasource(&memory);
        assert!(matches!(
            ds.mark_modified(id(1)),
            Err(DatasourceError::UnknownEntity(_))
        ));
    }

    #[test]
    fn failed_save_keeps_entity_out_of_sync() {
        let memory = MemoryOperation::new();
        memory.set_failing(true);
        let mut scene = Scene::new();
        let mut ds = datasource(&memory);
        let handle = scene.spawn(json!({"id": id(1)}), false).unwrap();
        ds.add_persistence_data(&scene, handle);

        ds.queue_save(&scene, id(1), None);
        ds.flush(&scene);
        let outcomes = ds.update(&mut scene);
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].entities, None);
        assert!(ds.persistence_data(id(1)).unwrap().is_out_of_sync());
    }

    #[test]
    fn save_without_payload_sends_entity_state() {
        let memory = MemoryOperation::new();
        let mut scene = Scene::new();
        let mut ds = datasource(&memory);
        let handle = scene.spawn(json!({"id": id(1), "name": "rock"}), false).unwrap();
        ds.add_persistence_data(&scene, handle);

        ds.queue_save(&scene, id(1), None);
        ds.flush(&scene);
        assert_eq!(memory.record(id(1)).unwrap()["name"], json!("rock"));
    }

    #[test]
    fn synchronize_applies_returned_fields() {
        let memory = MemoryOperation::new();
        memory.insert(json!({"id": id(1), "remote": true}));
        let mut scene = Scene::new();
        let mut ds = datasource(&memory);
        ds.set_auto_dispose(false);
        let handle = scene.spawn(json!({"id": id(1), "local": 1}), false).unwrap();
        ds.add_persistence_data(&scene, handle);

        ds.synchronize(
            &scene,
            vec![PersistenceOperationData {
                id: id(1),
                payload: Some(json!({"local": 2})),
            }],
            None,
        );
        ds.update(&mut scene);
        let state = scene.entity(id(1)).unwrap().state();
        assert_eq!(state["local"], json!(2));
        assert_eq!(state["remote"], json!(true));
    }

    #[test]
    fn delete_disposes_entity_and_children() {
        let memory = MemoryOperation::new();
        let mut scene = Scene::new();
        let mut ds = datasource(&memory);
        ds.set_auto_dispose(false);
        for payload in [
            json!({"id": id(1)}),
            json!({"id": id(2), "transform": {"parent": id(1)}}),
        ] {
            let handle = scene.spawn(payload, false).unwrap();
            ds.add_persistence_data(&scene, handle);
        }

        ds.queue_delete(&scene, id(1));
        ds.flush(&scene);
        let outcomes = ds.update(&mut scene);
        assert_eq!(outcomes[0].entities, Some(vec![id(1)]));
        assert!(scene.is_empty());
        assert!(ds.is_empty());
    }

    #[test]
    fn teardown_disposes_once_and_freezes_the_ledger() {
        let memory = MemoryOperation::new();
        let mut scene = Scene::new();
        let mut ds = datasource(&memory);
        for payload in [
            json!({"id": id(1)}),
            json!({"id": id(2), "transform": {"parent": id(1)}}),
        ] {
            let handle = scene.spawn(payload, false).unwrap();
            ds.add_persistence_data(&scene, handle);
        }

        let disposed = ds.dispose(&mut scene);
        assert_eq!(disposed.len(), 2);
        assert_eq!(scene.disposal_log().len(), 2);
        assert!(ds.dispose(&mut scene).is_empty());
        assert!(ds.remove_persistence_data(id(1)).is_none());
        let handle = scene.spawn(json!({"id": id(3)}), false).unwrap();
        assert!(!ds.add_persistence_data(&scene, handle));
    }
}
