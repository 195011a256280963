//! Loaders and their load scopes.
//!
//! A loader decides *what* should be resident; the datasource decides *how*
//! to get it there. Each loader names the scopes it currently wants, and the
//! datasource keeps one [`LoadScope`] per wanted key recording which
//! entities that scope's load produced. An entity stays resident while at
//! least one scope of one loader claims it.

use crate::guid::Guid;
use crate::operation::Ticket;
use depiction_math::TileIndex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};

/// Key of a load scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKey {
    Tile(TileIndex),
    Id(Guid),
    Named(String),
}

impl std::fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tile(tile) => write!(f, "tile:{tile}"),
            Self::Id(id) => write!(f, "id:{id}"),
            Self::Named(name) => write!(f, "named:{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeState {
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadScope {
    key: ScopeKey,
    state: ScopeState,
    ticket: Ticket,
    entities: BTreeSet<Guid>,
}

impl LoadScope {
    pub(crate) fn new(key: ScopeKey, ticket: Ticket) -> Self {
        Self {
            key,
            state: ScopeState::Loading,
            ticket,
            entities: BTreeSet::new(),
        }
    }

    pub fn key(&self) -> &ScopeKey {
        &self.key
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    /// Ticket of the load that fills this scope.
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn entities(&self) -> &BTreeSet<Guid> {
        &self.entities
    }

    pub fn contains(&self, id: Guid) -> bool {
        self.entities.contains(&id)
    }

    pub(crate) fn loaded(&mut self, entities: impl IntoIterator<Item = Guid>) {
        self.entities.extend(entities);
        self.state = ScopeState::Loaded;
    }

    pub(crate) fn failed(&mut self) {
        self.entities.clear();
        self.state = ScopeState::Failed;
    }

    pub(crate) fn forget(&mut self, id: Guid) {
        self.entities.remove(&id);
    }
}

/// Decides which scopes should be resident.
pub trait Loader: Any {
    /// Unique among the loaders of one datasource.
    fn id(&self) -> &str;

    fn desired_scopes(&self) -> Vec<ScopeKey>;

    /// Parameters handed to the load operation for `scope`.
    fn load_parameters(&self, scope: &ScopeKey) -> Value;

    /// Adjust a payload loaded for `scope` before it is materialized.
    fn generate_persistent(&self, _scope: &ScopeKey, _json: &mut Value) {}
}

/// A registered loader and the scopes the datasource keeps for it.
pub struct LoaderBase {
    loader: Box<dyn Loader>,
    scopes: BTreeMap<ScopeKey, LoadScope>,
}

impl LoaderBase {
    pub fn new(loader: Box<dyn Loader>) -> Self {
        Self {
            loader,
            scopes: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.loader.id()
    }

    pub fn loader(&self) -> &dyn Loader {
        self.loader.as_ref()
    }

    pub fn downcast_mut<T: Loader>(&mut self) -> Option<&mut T> {
        let loader: &mut dyn Any = self.loader.as_mut();
        loader.downcast_mut::<T>()
    }

    pub fn get_load_scope(&self, key: &ScopeKey) -> Option<&LoadScope> {
        self.scopes.get(key)
    }

    pub fn scopes(&self) -> impl Iterator<Item = &LoadScope> {
        self.scopes.values()
    }

    /// Whether any current scope claims `id`.
    pub fn contains(&self, id: Guid) -> bool {
        self.scopes.values().any(|scope| scope.contains(id))
    }

    pub(crate) fn scope_mut(&mut self, key: &ScopeKey) -> Option<&mut LoadScope> {
        self.scopes.get_mut(key)
    }

    pub(crate) fn insert_scope(&mut self, scope: LoadScope) {
        self.scopes.insert(scope.key.clone(), scope);
    }

    pub(crate) fn remove_scope(&mut self, key: &ScopeKey) -> Option<LoadScope> {
        self.scopes.remove(key)
    }

    pub(crate) fn clear_scopes(&mut self) -> usize {
        let count = self.scopes.len();
        self.scopes.clear();
        count
    }

    pub(crate) fn forget(&mut self, id: Guid) {
        for scope in self.scopes.values_mut() {
            scope.forget(id);
        }
    }
}

impl std::fmt::Debug for LoaderBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderBase")
            .field("id", &self.id())
            .field("scopes", &self.scopes)
            .finish()
    }
}
