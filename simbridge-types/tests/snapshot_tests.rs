//! Snapshot equality, tombstones and wire shape.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use simbridge_types::{
    BuildingData, EntityKind, InstanceData, NodeData, PropData, SegmentData, Snapshot, TreeData,
    Vector,
};
use std::str::FromStr;

// ── EntityKind ────────────────────────────────────────────────────

#[test]
fn entity_kind_wire_names() {
    for kind in EntityKind::ALL {
        assert_eq!(EntityKind::from_str(kind.as_str()).unwrap(), kind);
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, format!("\"{}\"", kind.as_str()));
    }
}

#[test]
fn entity_kind_unknown_name() {
    let err = EntityKind::from_str("vehicle").unwrap_err();
    assert!(err.to_string().contains("vehicle"));
}

#[test]
fn snapshot_kinds_match_records() {
    assert_eq!(BuildingData::KIND, EntityKind::Building);
    assert_eq!(PropData::KIND, EntityKind::Prop);
    assert_eq!(TreeData::KIND, EntityKind::Tree);
    assert_eq!(NodeData::KIND, EntityKind::Node);
    assert_eq!(SegmentData::KIND, EntityKind::Segment);
}

// ── Tombstones ────────────────────────────────────────────────────

#[test]
fn tombstone_is_deleted() {
    let t = BuildingData::tombstone(7);
    assert!(t.is_deleted());
    assert_eq!(t.id(), 7);
}

#[test]
fn tombstones_ignore_other_fields() {
    let mut a = BuildingData::tombstone(7);
    let mut b = BuildingData::tombstone(7);
    a.angle = 1.0;
    a.instance.prefab_name = "stale".into();
    b.instance.position = Vector::new(5.0, 5.0, 5.0);
    assert_eq!(a, b);
}

#[test]
fn tombstone_differs_from_live_entity() {
    let live = TreeData::new(3, Vector::zero(), "Oak");
    assert_ne!(live, TreeData::tombstone(3));
    assert_ne!(TreeData::tombstone(3), TreeData::tombstone(4));
}

#[test]
fn live_entities_compare_kind_fields() {
    let a = BuildingData::new(1, Vector::new(1.0, 0.0, 1.0), "House", 0.5);
    let mut b = a.clone();
    assert_eq!(a, b);
    b.angle = 0.25;
    assert_ne!(a, b);
}

#[test]
fn instance_data_equality_for_live_entities() {
    let a = InstanceData::new(1u16, Vector::xz(1.0, 1.0), "Lamp");
    let b = InstanceData::new(1u16, Vector::xz(1.0, 1.0), "Bench");
    assert_ne!(a, b);
}

// ── Wire shape ────────────────────────────────────────────────────

#[test]
fn instance_fields_are_flattened() {
    let seg = SegmentData::new(9, Vector::new(1.0, 2.0, 3.0), "Basic Road", 1, 2, 40.0);
    let json = serde_json::to_value(&seg).unwrap();
    assert_eq!(json["id"], 9);
    assert_eq!(json["prefab_name"], "Basic Road");
    assert_eq!(json["start_node_id"], 1);
    assert_eq!(json["deleted"], false);
}

#[test]
fn tombstone_decodes_from_minimal_record() {
    let json = serde_json::json!({ "id": 12, "deleted": true });
    let prop: PropData = serde_json::from_value(json).unwrap();
    assert_eq!(prop, PropData::tombstone(12));
}

// ── Round-trip property ───────────────────────────────────────────

// Quarter steps keep every coordinate exactly representable in JSON text.
fn coord(range: std::ops::Range<i32>) -> impl Strategy<Value = f64> {
    range.prop_map(|v| f64::from(v) / 4.0)
}

fn vector_strategy() -> impl Strategy<Value = Vector> {
    (coord(-400_000..400_000), coord(-4_000..4_000), coord(-400_000..400_000), any::<bool>())
        .prop_map(|(x, y, z, defined)| {
            if defined { Vector::new(x, y, z) } else { Vector::xz(x, z) }
        })
}

proptest! {
    #[test]
    fn building_roundtrip_is_field_for_field(
        id in any::<u16>(),
        position in vector_strategy(),
        prefab in "[A-Za-z ]{0,24}",
        angle in coord(-25..25),
        deleted in any::<bool>(),
    ) {
        let snapshot = if deleted {
            BuildingData::tombstone(id)
        } else {
            BuildingData::new(id, position, prefab, angle)
        };
        let bytes = serde_json::to_vec(&snapshot).unwrap();
        let decoded: BuildingData = serde_json::from_slice(&bytes).unwrap();
        prop_assert_eq!(decoded, snapshot);
    }

    #[test]
    fn tree_roundtrip_keeps_wide_ids(id in any::<u32>(), position in vector_strategy()) {
        let snapshot = TreeData::new(id, position, "Pine");
        let decoded: TreeData =
            serde_json::from_value(serde_json::to_value(&snapshot).unwrap()).unwrap();
        prop_assert_eq!(decoded.id(), id);
        prop_assert_eq!(decoded, snapshot);
    }

    #[test]
    fn prop_roundtrip_keeps_angle(
        id in any::<u16>(),
        position in vector_strategy(),
        prefab in "[A-Za-z ]{0,24}",
        angle in coord(-25..25),
    ) {
        let snapshot = PropData::new(id, position, prefab, angle);
        let bytes = serde_json::to_vec(&snapshot).unwrap();
        let decoded: PropData = serde_json::from_slice(&bytes).unwrap();
        prop_assert_eq!(decoded.angle, angle);
        prop_assert_eq!(decoded, snapshot);
    }

    #[test]
    fn node_roundtrip_keeps_segment_order(
        id in any::<u16>(),
        position in vector_strategy(),
        segment_ids in proptest::collection::vec(any::<u16>(), 0..8),
    ) {
        let mut snapshot = NodeData::new(id, position, "Basic Road");
        snapshot.segment_ids = segment_ids.clone();
        let bytes = serde_json::to_vec(&snapshot).unwrap();
        let decoded: NodeData = serde_json::from_slice(&bytes).unwrap();
        prop_assert_eq!(&decoded.segment_ids, &segment_ids);
        prop_assert_eq!(decoded, snapshot);
    }

    #[test]
    fn segment_roundtrip_keeps_endpoints(
        id in any::<u16>(),
        position in vector_strategy(),
        start in any::<u16>(),
        end in any::<u16>(),
        length in coord(0..40_000),
    ) {
        let snapshot = SegmentData::new(id, position, "Basic Road", start, end, length);
        let bytes = serde_json::to_vec(&snapshot).unwrap();
        let decoded: SegmentData = serde_json::from_slice(&bytes).unwrap();
        prop_assert_eq!(
            (decoded.start_node_id, decoded.end_node_id, decoded.length),
            (start, end, length)
        );
        prop_assert_eq!(decoded, snapshot);
    }
}
