//! Loaders for fixed entity sets.

use crate::guid::Guid;
use crate::loader::{Loader, ScopeKey};
use serde_json::{Value, json};
use std::collections::BTreeSet;

/// One scope per wanted entity id.
#[derive(Debug, Clone)]
pub struct IdLoader {
    id: String,
    ids: BTreeSet<Guid>,
}

impl IdLoader {
    pub fn new(id: impl Into<String>, ids: impl IntoIterator<Item = Guid>) -> Self {
        Self {
            id: id.into(),
            ids: ids.into_iter().collect(),
        }
    }

    pub fn ids(&self) -> &BTreeSet<Guid> {
        &self.ids
    }

    pub fn add_id(&mut self, id: Guid) -> bool {
        self.ids.insert(id)
    }

    pub fn remove_id(&mut self, id: Guid) -> bool {
        self.ids.remove(&id)
    }
}

impl Loader for IdLoader {
    fn id(&self) -> &str {
        &self.id
    }

    fn desired_scopes(&self) -> Vec<ScopeKey> {
        self.ids.iter().copied().map(ScopeKey::Id).collect()
    }

    fn load_parameters(&self, scope: &ScopeKey) -> Value {
        match scope {
            ScopeKey::Id(id) => json!({ "ids": [id] }),
            _ => json!({ "ids": [] }),
        }
    }
}

/// A single named scope loaded with fixed parameters.
///
/// `{}` as parameters asks a store for everything it holds.
#[derive(Debug, Clone)]
pub struct NamedLoader {
    id: String,
    scope: String,
    parameters: Value,
}

impl NamedLoader {
    pub fn new(id: impl Into<String>, scope: impl Into<String>, parameters: Value) -> Self {
        Self {
            id: id.into(),
            scope: scope.into(),
            parameters,
        }
    }
}

impl Loader for NamedLoader {
    fn id(&self) -> &str {
        &self.id
    }

    fn desired_scopes(&self) -> Vec<ScopeKey> {
        vec![ScopeKey::Named(self.scope.clone())]
    }

    fn load_parameters(&self, _scope: &ScopeKey) -> Value {
        self.parameters.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_scope_per_id() {
        let loader = IdLoader::new("ids", [Guid::from_u128(2), Guid::from_u128(1)]);
        let scopes = loader.desired_scopes();
        assert_eq!(
            scopes,
            vec![
                ScopeKey::Id(Guid::from_u128(1)),
                ScopeKey::Id(Guid::from_u128(2))
            ]
        );
        assert_eq!(
            loader.load_parameters(&scopes[0]),
            json!({"ids": ["00000000-0000-0000-0000-000000000001"]})
        );
    }
}
