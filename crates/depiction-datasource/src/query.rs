//! Request evaluation over a GUID-keyed record map.
//!
//! Shared by the in-memory and JSONL backends. Load parameters select
//! records by `ids`, by `tile` (matched against
//! `transform.geoCoordinate`), or everything when neither is given.
//! Selected records come back as trees nested by `transform.parent`.

use crate::guid::Guid;
use crate::json::{self, GEO_COORDINATE_FIELD, TRANSFORM_FIELD};
use crate::operation::{OperationRequest, OperationResult, PersistenceOperationData, ResultRecord};
use depiction_math::{GeoCoordinate2Double, TileIndex};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Apply `request` to `records`. Returns the result and whether `records`
/// changed.
pub fn respond(
    records: &mut BTreeMap<Guid, Value>,
    request: &OperationRequest,
) -> (OperationResult, bool) {
    match request {
        OperationRequest::Save(batch) => (save(records, batch, false), !batch.is_empty()),
        OperationRequest::Synchronize(batch) => (save(records, batch, true), !batch.is_empty()),
        OperationRequest::Delete(batch) => {
            let mut out = Vec::with_capacity(batch.len());
            let mut changed = false;
            for data in batch {
                changed |= records.remove(&data.id).is_some();
                out.push(ResultRecord::new(id_only(data.id)));
            }
            (OperationResult::success(out), changed)
        }
        OperationRequest::Load(load) => match select(records, &load.parameters) {
            Some(selected) => (OperationResult::success(build_tree(records, &selected)), false),
            None => (OperationResult::failure(), false),
        },
    }
}

fn id_only(id: Guid) -> Value {
    let mut record = serde_json::Map::new();
    record.insert(json::ID_FIELD.to_string(), Value::String(id.to_string()));
    Value::Object(record)
}

/// Save replaces the stored record; synchronize merges onto it.
fn save(
    records: &mut BTreeMap<Guid, Value>,
    batch: &[PersistenceOperationData],
    merge: bool,
) -> OperationResult {
    let mut out = Vec::with_capacity(batch.len());
    for data in batch {
        let payload = data.payload.clone().unwrap_or_else(|| id_only(data.id));
        let mut record = match (merge, records.get(&data.id)) {
            (true, Some(existing)) => json::merge_with_fallback(&payload, existing),
            _ => payload,
        };
        if json::set_id(&mut record, data.id).is_err() {
            warn!(id = %data.id, "skipping non-object payload");
            continue;
        }
        records.insert(data.id, record.clone());
        out.push(ResultRecord::new(record));
    }
    OperationResult::success(out)
}

/// Ids matching the load parameters, or `None` for malformed parameters.
fn select(records: &BTreeMap<Guid, Value>, parameters: &Value) -> Option<BTreeSet<Guid>> {
    if let Some(ids) = parameters.get("ids") {
        let ids = ids.as_array()?;
        let mut selected = BTreeSet::new();
        for id in ids {
            let id = Guid::parse(id.as_str()?).ok()?;
            if records.contains_key(&id) {
                selected.insert(id);
            }
        }
        return Some(selected);
    }

    if let Some(tile) = parameters.get("tile") {
        let tile: TileIndex = serde_json::from_value(tile.clone()).ok()?;
        return Some(
            records
                .iter()
                .filter(|(_, record)| {
                    geo_coordinate(record)
                        .is_some_and(|geo| TileIndex::from_geo(&geo, tile.zoom) == tile)
                })
                .map(|(id, _)| *id)
                .collect(),
        );
    }

    Some(records.keys().copied().collect())
}

fn geo_coordinate(record: &Value) -> Option<GeoCoordinate2Double> {
    let geo = record.get(TRANSFORM_FIELD)?.get(GEO_COORDINATE_FIELD)?;
    serde_json::from_value(geo.clone()).ok()
}

/// Nest `selected` and all their descendants under their parents.
fn build_tree(records: &BTreeMap<Guid, Value>, selected: &BTreeSet<Guid>) -> Vec<ResultRecord> {
    let mut children: BTreeMap<Guid, Vec<Guid>> = BTreeMap::new();
    for (id, record) in records {
        if let Ok(Some(parent)) = json::parent_id(record) {
            children.entry(parent).or_default().push(*id);
        }
    }

    let mut included = BTreeSet::new();
    let mut stack: Vec<Guid> = selected.iter().copied().collect();
    while let Some(id) = stack.pop() {
        if included.insert(id)
            && let Some(kids) = children.get(&id)
        {
            stack.extend(kids.iter().copied());
        }
    }

    let mut visited = BTreeSet::new();
    included
        .iter()
        .filter(|id| {
            records
                .get(id)
                .and_then(|record| json::parent_id(record).ok().flatten())
                .is_none_or(|parent| !included.contains(&parent))
        })
        .filter_map(|id| node(records, &children, *id, &mut visited))
        .collect()
}

fn node(
    records: &BTreeMap<Guid, Value>,
    children: &BTreeMap<Guid, Vec<Guid>>,
    id: Guid,
    visited: &mut BTreeSet<Guid>,
) -> Option<ResultRecord> {
    // parent cycles
    if !visited.insert(id) {
        return None;
    }
    let json = records.get(&id)?.clone();
    let kids = children
        .get(&id)
        .map(|kids| {
            kids.iter()
                .filter_map(|kid| node(records, children, *kid, visited))
                .collect()
        })
        .unwrap_or_default();
    Some(ResultRecord::new(json).with_children(kids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::LoadRequest;
    use serde_json::json;

    fn id(n: u128) -> Guid {
        Guid::from_u128(n)
    }

    fn store() -> BTreeMap<Guid, Value> {
        let mut records = BTreeMap::new();
        records.insert(
            id(1),
            json!({"id": id(1), "transform": {"geoCoordinate": {"latitude": 45.5017, "longitude": -73.5673}}}),
        );
        records.insert(id(2), json!({"id": id(2), "transform": {"parent": id(1)}}));
        records.insert(
            id(3),
            json!({"id": id(3), "transform": {"geoCoordinate": {"latitude": -33.86, "longitude": 151.2}}}),
        );
        records
    }

    fn load(parameters: Value) -> OperationRequest {
        OperationRequest::Load(LoadRequest {
            scope: None,
            parameters,
        })
    }

    #[test]
    fn load_all_nests_children() {
        let mut records = store();
        let (result, changed) = respond(&mut records, &load(json!({})));
        assert!(result.success);
        assert!(!changed);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].children.len(), 1);
        assert_eq!(result.records[0].children[0].json["id"], json!(id(2)));
    }

    #[test]
    fn load_by_tile_brings_descendants() {
        let mut records = store();
        let (result, _) = respond(
            &mut records,
            &load(json!({"tile": {"x": 302, "y": 366, "zoom": 10}})),
        );
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].json["id"], json!(id(1)));
        assert_eq!(result.records[0].children.len(), 1);
    }

    #[test]
    fn selected_child_without_parent_is_a_root() {
        let mut records = store();
        let (result, _) = respond(&mut records, &load(json!({"ids": [id(2)]})));
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].json["id"], json!(id(2)));
    }

    #[test]
    fn malformed_parameters_fail() {
        let mut records = store();
        let (result, _) = respond(&mut records, &load(json!({"ids": "nope"})));
        assert!(!result.success);
    }

    #[test]
    fn synchronize_merges_and_save_replaces() {
        let mut records = store();
        let batch = vec![PersistenceOperationData {
            id: id(3),
            payload: Some(json!({"name": "sydney"})),
        }];
        respond(&mut records, &OperationRequest::Synchronize(batch.clone()));
        assert_eq!(records[&id(3)]["name"], json!("sydney"));
        assert!(records[&id(3)].get("transform").is_some());

        respond(&mut records, &OperationRequest::Save(batch));
        assert!(records[&id(3)].get("transform").is_none());
        assert_eq!(records[&id(3)]["id"], json!(id(3)));
    }

    #[test]
    fn parent_cycles_terminate() {
        let mut records = BTreeMap::new();
        records.insert(id(1), json!({"id": id(1), "transform": {"parent": id(2)}}));
        records.insert(id(2), json!({"id": id(2), "transform": {"parent": id(1)}}));
        let (result, _) = respond(&mut records, &load(json!({})));
        // every member has a selected parent, so nothing is a root
        assert!(result.success);
        assert!(result.records.is_empty());
    }
}
