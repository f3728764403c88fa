mod common;

use serde_json::{json, Value};

use common::{Building, Harness, Unit, CURRENCIES};
use kore_core::{
    take_entity, Criteria, DataStore, Entity, FieldRef, Predicate, Query, Record, ScopeBypass,
};

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

/// Seeds a unit of agency 42 that (wrongly) points at a building of agency 99,
/// plus one consistent pair per agency.
async fn seed(h: &Harness) {
    let store = &h.store.inner;
    for b in [
        json!({"id": "b42", "agency_id": "42", "name": "Tower"}),
        json!({"id": "b99", "agency_id": "99", "name": "Annex"}),
    ] {
        store.insert(&Building::collection(), record(b)).await.unwrap();
    }
    for u in [
        json!({"id": "u1", "agency_id": "42", "building_id": "b42", "label": "1A", "currency": "EUR"}),
        json!({"id": "u2", "agency_id": "99", "building_id": "b99", "label": "2B", "currency": "XOF"}),
        json!({"id": "u3", "agency_id": "42", "building_id": "b99", "label": "3C", "currency": "EUR"}),
    ] {
        store.insert(&Unit::collection(), record(u)).await.unwrap();
    }
    for c in [json!({"code": "EUR"}), json!({"code": "XOF"})] {
        store.insert(&CURRENCIES, record(c)).await.unwrap();
    }
}

fn units_with_buildings() -> Query {
    Query::from::<Unit>().join::<Building>(
        "b",
        FieldRef::of("units", "building_id"),
        FieldRef::of("b", "id"),
    )
}

#[tokio::test]
async fn test_join_scopes_every_tenant_owned_source() {
    let h = Harness::new();
    seed(&h).await;

    let rows = h
        .units
        .join(&h.ctx_for("42"), units_with_buildings())
        .await
        .unwrap();

    // u3 joins a building of agency 99 and must not come back.
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["units"]["id"], "u1");
    assert_eq!(rows[0]["b"]["agency_id"], "42");
}

#[tokio::test]
async fn test_join_rewrite_leaves_global_sources_alone() {
    let h = Harness::new();
    seed(&h).await;

    let query = units_with_buildings()
        .join_collection(
            CURRENCIES,
            "c",
            FieldRef::of("units", "currency"),
            FieldRef::of("c", "code"),
        )
        .filter(Predicate::eq(FieldRef::of("c", "code"), "EUR"));

    let rows = h.units.join(&h.ctx_for("42"), query).await.unwrap();
    assert_eq!(rows.len(), 1);

    let sent = h.store.queries().pop().unwrap();
    let Some(Predicate::And(parts)) = sent.criteria.filter else {
        panic!("expected a conjunction, got {:?}", sent.criteria.filter);
    };
    assert!(parts.contains(&Predicate::eq(FieldRef::of("units", "agency_id"), "42")));
    assert!(parts.contains(&Predicate::eq(FieldRef::of("b", "agency_id"), "42")));
    assert!(parts.contains(&Predicate::eq(FieldRef::of("c", "code"), "EUR")));
    assert!(!parts
        .iter()
        .any(|p| matches!(p, Predicate::Eq(f, _) if f.source.as_deref() == Some("c") && f.field == "agency_id")));
}

#[tokio::test]
async fn test_bypassed_join_sees_cross_agency_rows() {
    let h = Harness::new();
    seed(&h).await;
    let ctx = h.ctx();

    let rows = ctx
        .with_bypass(
            ScopeBypass::new("data repair", "admin@kore").unwrap(),
            || async { h.units.join(&ctx, units_with_buildings()).await },
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 3);
    let audit = h.audit.entries();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].operations[0].entity_type, "units");
}

#[tokio::test]
async fn test_rows_deserialize_per_alias() {
    let h = Harness::new();
    seed(&h).await;

    let mut rows = h
        .units
        .join(
            &h.ctx_for("99"),
            units_with_buildings().with_criteria(Criteria::new().eq(FieldRef::of("b", "name"), "Annex")),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    let unit: Unit = take_entity(&mut rows[0], "units").unwrap();
    let building: Building = take_entity(&mut rows[0], "b").unwrap();
    assert_eq!(unit.building_id, building.id.unwrap());
    assert!(take_entity::<Building>(&mut rows[0], "b").is_err());
}

/// Plain reads are rewritten into criteria; nothing is filtered after fetch.
#[tokio::test]
async fn test_list_pushes_tenant_predicate_to_store() {
    let h = Harness::new();
    seed(&h).await;

    h.buildings
        .list(&h.ctx_for("42"), Criteria::new().eq("name", "Tower"))
        .await
        .unwrap();

    let sent = h.store.queries().pop().unwrap();
    assert_eq!(
        sent.criteria.filter,
        Some(Predicate::And(vec![
            Predicate::eq("name", "Tower"),
            Predicate::eq("agency_id", "42"),
        ]))
    );
}
