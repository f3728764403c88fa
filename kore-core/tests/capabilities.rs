mod common;

use serde_json::json;

use common::{Building, Harness, Unit};
use kore_core::{
    Criteria, FieldRef, Query, Record, StoreCapabilities, StoreMethod, TenancyError,
};

fn rename(name: &str) -> Record {
    json!({ "name": name }).as_object().cloned().unwrap()
}

#[tokio::test]
async fn test_read_only_store_refuses_writes_before_touching_it() {
    let h = Harness::new();
    let ctx = h.ctx_for("42");
    let created = h.buildings.create(&ctx, Building::named("X")).await.unwrap();
    h.store.restrict(StoreCapabilities::read_only());
    let calls_before = h.store.calls();

    let err = h.buildings.create(&ctx, Building::named("Y")).await.unwrap_err();
    assert!(matches!(err, TenancyError::Unsupported { ref what, .. } if what == "insert"));

    let err = h
        .buildings
        .update(&ctx, created.id(), rename("Z"))
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::Unsupported { ref what, .. } if what == "update"));

    let err = h.buildings.delete(&ctx, Criteria::new()).await.unwrap_err();
    assert!(matches!(err, TenancyError::Unsupported { ref what, .. } if what == "delete"));

    assert_eq!(h.store.calls(), calls_before);

    let listed = h.buildings.list(&ctx, Criteria::new()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "X");
}

#[tokio::test]
async fn test_joins_need_a_joining_store() {
    let h = Harness::new();
    h.store.restrict(StoreCapabilities {
        methods: vec![StoreMethod::Select],
        joins: false,
    });
    let ctx = h.ctx_for("42");

    let query = Query::from::<Unit>().join::<Building>(
        "b",
        FieldRef::of("units", "building_id"),
        FieldRef::of("b", "id"),
    );
    let err = h.units.join(&ctx, query).await.unwrap_err();
    assert!(matches!(err, TenancyError::Unsupported { ref what, .. } if what == "joins"));
    assert_eq!(h.store.calls(), 0);

    // A single-source query is still a plain select.
    let rows = h.units.join(&ctx, Query::from::<Unit>()).await.unwrap();
    assert!(rows.is_empty());
    assert_eq!(h.store.calls(), 1);
}
