//! Entity arena and the explicit context shared by every datasource.
//!
//! A [`Scene`] owns every persistent entity. Datasources only hold
//! [`EntityHandle`]s into it; a handle whose slot was freed (or reused by a
//! later entity) reports [`Lifecycle::Disposed`] instead of aliasing the new
//! occupant.

use crate::error::DatasourceError;
use crate::guid::Guid;
use crate::json;
use serde::Serialize;
use serde_json::Value;
use slab::Slab;
use std::collections::BTreeMap;
use tracing::debug;

/// Where an entity is in its teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Live,
    Disposing,
    Disposed,
}

/// Generation-checked index into a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle {
    slot: usize,
    generation: u64,
}

/// A persistent, GUID-identified entity and its JSON state.
#[derive(Debug, Clone)]
pub struct PersistentEntity {
    id: Guid,
    parent: Option<Guid>,
    dont_save_to_scene: bool,
    state: Value,
    lifecycle: Lifecycle,
}

impl PersistentEntity {
    pub fn id(&self) -> Guid {
        self.id
    }

    pub fn parent(&self) -> Option<Guid> {
        self.parent
    }

    pub fn dont_save_to_scene(&self) -> bool {
        self.dont_save_to_scene
    }

    pub fn state(&self) -> &Value {
        &self.state
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Merge `patch` into the state and refresh the derived fields.
    ///
    /// The `id` field is pinned: a patch cannot re-identify an entity.
    pub fn apply(&mut self, patch: &Value) -> Result<(), DatasourceError> {
        let mut next = self.state.clone();
        json::merge(&mut next, patch);
        json::set_id(&mut next, self.id)?;
        self.parent = json::parent_id(&next)?;
        if let Some(flag) = json::dont_save_to_scene(&next) {
            self.dont_save_to_scene = flag;
        }
        self.state = next;
        Ok(())
    }
}

struct Slot {
    generation: u64,
    entity: PersistentEntity,
}

/// Entity arena plus the switches that used to be process-wide globals.
pub struct Scene {
    slots: Slab<Slot>,
    by_id: BTreeMap<Guid, EntityHandle>,
    next_generation: u64,
    persistence_operations_enabled: bool,
    disposal_log: Vec<Guid>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            slots: Slab::new(),
            by_id: BTreeMap::new(),
            next_generation: 0,
            persistence_operations_enabled: true,
            disposal_log: Vec::new(),
        }
    }

    /// Whether save/synchronize/delete may run. Hosts turn this off while
    /// simulating so that play sessions never write to a datasource.
    pub fn persistence_operations_enabled(&self) -> bool {
        self.persistence_operations_enabled
    }

    pub fn set_persistence_operations_enabled(&mut self, enabled: bool) {
        self.persistence_operations_enabled = enabled;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Materialize an entity from its payload.
    ///
    /// A payload without `id` gets a fresh one written into it.
    /// `dont_save_to_scene` is used when the payload does not declare
    /// `dontSaveToScene`.
    pub fn spawn(
        &mut self,
        mut state: Value,
        dont_save_to_scene: bool,
    ) -> Result<EntityHandle, DatasourceError> {
        json::object_mut(&mut state)?;
        let id = match json::payload_id(&state)? {
            Some(id) => id,
            None => {
                let id = Guid::new_v4();
                json::set_id(&mut state, id)?;
                id
            }
        };
        if self.by_id.contains_key(&id) {
            return Err(DatasourceError::DuplicateEntity(id));
        }
        let parent = json::parent_id(&state)?;
        let dont_save_to_scene = json::dont_save_to_scene(&state).unwrap_or(dont_save_to_scene);

        let generation = self.next_generation;
        self.next_generation += 1;
        let slot = self.slots.insert(Slot {
            generation,
            entity: PersistentEntity {
                id,
                parent,
                dont_save_to_scene,
                state,
                lifecycle: Lifecycle::Live,
            },
        });
        let handle = EntityHandle { slot, generation };
        self.by_id.insert(id, handle);
        debug!(%id, "spawned entity");
        Ok(handle)
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&PersistentEntity> {
        self.slots
            .get(handle.slot)
            .filter(|slot| slot.generation == handle.generation)
            .map(|slot| &slot.entity)
    }

    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut PersistentEntity> {
        self.slots
            .get_mut(handle.slot)
            .filter(|slot| slot.generation == handle.generation)
            .map(|slot| &mut slot.entity)
    }

    pub fn handle_of(&self, id: Guid) -> Option<EntityHandle> {
        self.by_id.get(&id).copied()
    }

    pub fn entity(&self, id: Guid) -> Option<&PersistentEntity> {
        self.handle_of(id).and_then(|handle| self.get(handle))
    }

    pub fn lifecycle(&self, handle: EntityHandle) -> Lifecycle {
        self.get(handle)
            .map(PersistentEntity::lifecycle)
            .unwrap_or(Lifecycle::Disposed)
    }

    pub fn children_of(&self, parent: Guid) -> Vec<Guid> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.entity.parent == Some(parent))
            .map(|(_, slot)| slot.entity.id)
            .collect()
    }

    /// Dispose an entity and, depth first, its children.
    ///
    /// Returns every id that was disposed by this call. Disposing a stale
    /// handle or an entity already being disposed returns an empty list.
    pub fn dispose(&mut self, handle: EntityHandle) -> Vec<Guid> {
        let mut disposed = Vec::new();
        self.dispose_into(handle, &mut disposed);
        disposed
    }

    fn dispose_into(&mut self, handle: EntityHandle, disposed: &mut Vec<Guid>) {
        let id = match self.get_mut(handle) {
            Some(entity) if entity.lifecycle == Lifecycle::Live => {
                entity.lifecycle = Lifecycle::Disposing;
                entity.id
            }
            _ => return,
        };

        for child in self.children_of(id) {
            if let Some(child_handle) = self.handle_of(child) {
                self.dispose_into(child_handle, disposed);
            }
        }

        self.slots.remove(handle.slot);
        self.by_id.remove(&id);
        self.disposal_log.push(id);
        disposed.push(id);
        debug!(%id, "disposed entity");
    }

    /// Every id disposed so far, in disposal order.
    pub fn disposal_log(&self) -> &[Guid] {
        &self.disposal_log
    }

    pub fn iter(&self) -> impl Iterator<Item = &PersistentEntity> {
        self.slots.iter().map(|(_, slot)| &slot.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(n: u128) -> Guid {
        Guid::from_u128(n)
    }

    #[test]
    fn spawn_assigns_missing_id() {
        let mut scene = Scene::new();
        let handle = scene.spawn(json!({"name": "a"}), false).unwrap();
        let entity = scene.get(handle).unwrap();
        assert!(!entity.id().is_nil());
        assert_eq!(
            entity.state()["id"],
            Value::String(entity.id().to_string())
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut scene = Scene::new();
        scene.spawn(json!({"id": id(1).to_string()}), false).unwrap();
        assert!(matches!(
            scene.spawn(json!({"id": id(1).to_string()}), false),
            Err(DatasourceError::DuplicateEntity(_))
        ));
    }

    #[test]
    fn stale_handles_report_disposed() {
        let mut scene = Scene::new();
        let first = scene.spawn(json!({"id": id(1).to_string()}), false).unwrap();
        assert_eq!(scene.dispose(first), vec![id(1)]);
        // the freed slot is reused with a new generation
        let second = scene.spawn(json!({"id": id(2).to_string()}), false).unwrap();
        assert_eq!(scene.lifecycle(first), Lifecycle::Disposed);
        assert_eq!(scene.lifecycle(second), Lifecycle::Live);
        assert!(scene.get(first).is_none());
        assert!(scene.dispose(first).is_empty());
    }

    #[test]
    fn dispose_cascades_to_children_once() {
        let mut scene = Scene::new();
        let parent = scene.spawn(json!({"id": id(1).to_string()}), false).unwrap();
        scene
            .spawn(
                json!({"id": id(2).to_string(), "transform": {"parent": id(1).to_string()}}),
                false,
            )
            .unwrap();
        let disposed = scene.dispose(parent);
        assert_eq!(disposed, vec![id(2), id(1)]);
        assert!(scene.is_empty());
        assert_eq!(scene.disposal_log(), &[id(2), id(1)]);
    }

    #[test]
    fn apply_pins_id_and_tracks_parent() {
        let mut scene = Scene::new();
        let handle = scene.spawn(json!({"id": id(1).to_string()}), true).unwrap();
        let entity = scene.get_mut(handle).unwrap();
        entity
            .apply(&json!({"id": id(9).to_string(), "transform": {"parent": id(5).to_string()}}))
            .unwrap();
        assert_eq!(entity.id(), id(1));
        assert_eq!(entity.state()["id"], json!(id(1).to_string()));
        assert_eq!(entity.parent(), Some(id(5)));
        assert!(entity.dont_save_to_scene());
    }
}
