use super::*;

fn spec() -> CollectionSpec {
    CollectionSpec {
        name: "personal_assistant".to_string(),
        vector_name: "text_embedding_004".to_string(),
        dimension: 768,
        distance: DistanceKind::Cosine,
    }
}

fn named_config(name: &str, size: u64, distance: Distance) -> VectorsConfig {
    let mut map = HashMap::new();
    map.insert(
        name.to_string(),
        VectorParams {
            size,
            distance: distance as i32,
            ..Default::default()
        },
    );
    VectorsConfig {
        config: Some(vectors_config::Config::ParamsMap(VectorParamsMap { map })),
    }
}

fn unnamed_config(size: u64) -> VectorsConfig {
    VectorsConfig {
        config: Some(vectors_config::Config::Params(VectorParams {
            size,
            distance: Distance::Cosine as i32,
            ..Default::default()
        })),
    }
}

#[test]
fn matching_named_vector_is_ready() {
    let declared = named_config("text_embedding_004", 768, Distance::Cosine);
    assert_eq!(
        schema_outcome(&spec(), Some(&declared)),
        CollectionOutcome::Ready
    );
}

#[test]
fn unnamed_vector_mode_is_incompatible() {
    // A 1536-dim unnamed collection cannot serve a 768-dim named vector;
    // switching naming modes requires a destructive recreate.
    let declared = unnamed_config(1536);
    let outcome = schema_outcome(&spec(), Some(&declared));

    let CollectionOutcome::Incompatible(reason) = outcome else {
        panic!("expected incompatible outcome");
    };
    assert!(reason.contains("unnamed"));
}

#[test]
fn dimension_mismatch_is_incompatible() {
    let declared = named_config("text_embedding_004", 1536, Distance::Cosine);
    let outcome = schema_outcome(&spec(), Some(&declared));

    let CollectionOutcome::Incompatible(reason) = outcome else {
        panic!("expected incompatible outcome");
    };
    assert!(reason.contains("1536"));
    assert!(reason.contains("768"));
}

#[test]
fn missing_vector_name_is_incompatible() {
    let declared = named_config("some_other_model", 768, Distance::Cosine);
    let outcome = schema_outcome(&spec(), Some(&declared));

    assert!(matches!(outcome, CollectionOutcome::Incompatible(_)));
}

#[test]
fn distance_mismatch_is_incompatible() {
    let declared = named_config("text_embedding_004", 768, Distance::Dot);
    let outcome = schema_outcome(&spec(), Some(&declared));

    assert!(matches!(outcome, CollectionOutcome::Incompatible(_)));
}

#[test]
fn unreadable_config_is_incompatible() {
    assert!(matches!(
        schema_outcome(&spec(), None),
        CollectionOutcome::Incompatible(_)
    ));
    assert!(matches!(
        schema_outcome(&spec(), Some(&VectorsConfig { config: None })),
        CollectionOutcome::Incompatible(_)
    ));
}

#[test]
fn created_config_round_trips_through_schema_check() {
    let declared = named_vectors_config(&spec());
    assert_eq!(
        schema_outcome(&spec(), Some(&declared)),
        CollectionOutcome::Ready
    );
}

#[test]
fn point_record_conversion() {
    let record = PointRecord {
        id: "6ba7b810-9dad-11d1-80b4-00c04fd430c8".to_string(),
        vector_name: "text_embedding_004".to_string(),
        vector: vec![0.1, 0.2, 0.3],
        payload: serde_json::json!({
            "document": "chunk text",
            "chunk_idx": 0,
            "is_active": true,
        }),
    };

    let point = point_from_record(record).expect("conversion should succeed");

    assert!(point.id.is_some());
    assert!(point.vectors.is_some());
    let document = point
        .payload
        .get("document")
        .map(|v| v.clone().into_json());
    assert_eq!(document, Some(serde_json::json!("chunk text")));
    let is_active = point
        .payload
        .get("is_active")
        .map(|v| v.clone().into_json());
    assert_eq!(is_active, Some(serde_json::json!(true)));
}

#[test]
fn non_object_payload_is_rejected() {
    let record = PointRecord {
        id: "6ba7b810-9dad-11d1-80b4-00c04fd430c8".to_string(),
        vector_name: "v".to_string(),
        vector: vec![0.0],
        payload: serde_json::json!("not an object"),
    };

    assert!(point_from_record(record).is_err());
}

#[test]
fn point_id_string_forms() {
    let uuid_id = PointId {
        point_id_options: Some(PointIdOptions::Uuid("abc-123".to_string())),
    };
    assert_eq!(point_id_string(uuid_id), "abc-123");

    let num_id = PointId {
        point_id_options: Some(PointIdOptions::Num(42)),
    };
    assert_eq!(point_id_string(num_id), "42");
}
