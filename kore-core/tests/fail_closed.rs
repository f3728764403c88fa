mod common;

use serde_json::json;

use common::{Building, Harness, Unit};
use kore_core::{Criteria, FieldRef, OperationKind, Query, Record, TenancyError};

fn assert_no_tenant(err: TenancyError, op: OperationKind) {
    match err {
        TenancyError::NoActiveTenant { operation, .. } => assert_eq!(operation, op),
        other => panic!("expected NoActiveTenant for {op}, got {other:?}"),
    }
}

/// Without a tenant and without a bypass every operation fails before
/// reaching the store.
#[tokio::test]
async fn test_every_operation_fails_closed_without_tenant() {
    let h = Harness::new();
    let ctx = h.ctx();

    let err = h.buildings.find(&ctx, Criteria::new()).await.unwrap_err();
    assert_no_tenant(err, OperationKind::Find);

    let err = h.buildings.list(&ctx, Criteria::new()).await.unwrap_err();
    assert_no_tenant(err, OperationKind::List);

    let err = h.buildings.get(&ctx, "b1").await.unwrap_err();
    assert_no_tenant(err, OperationKind::Find);

    let err = h
        .buildings
        .create(&ctx, Building::named("X"))
        .await
        .unwrap_err();
    assert_no_tenant(err, OperationKind::Create);

    let mut changes = Record::new();
    changes.insert("name".into(), json!("renamed"));
    let err = h.buildings.update(&ctx, "b1", changes).await.unwrap_err();
    assert_no_tenant(err, OperationKind::Update);

    let err = h.buildings.delete(&ctx, Criteria::new()).await.unwrap_err();
    assert_no_tenant(err, OperationKind::Delete);

    let query = Query::from::<Unit>().join::<Building>(
        "b",
        FieldRef::of("units", "building_id"),
        FieldRef::of("b", "id"),
    );
    let err = h.units.join(&ctx, query).await.unwrap_err();
    assert_no_tenant(err, OperationKind::Join);

    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn test_context_released_by_guard_fails_closed_again() {
    let h = Harness::new();
    let ctx = h.ctx();

    {
        let _tenant = ctx.enter("42").unwrap();
        h.buildings
            .create(&ctx, Building::named("X"))
            .await
            .unwrap();
    }

    let err = h.buildings.list(&ctx, Criteria::new()).await.unwrap_err();
    assert!(matches!(err, TenancyError::NoActiveTenant { .. }));
}

/// A cancelled operation must not leave its tenant behind.
#[tokio::test]
async fn test_cancelled_operation_clears_tenant() {
    let h = Harness::new();
    let ctx = h.ctx();

    let operation = async {
        let _tenant = ctx.enter("42").unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
    };
    let outcome = tokio::time::timeout(std::time::Duration::from_millis(10), operation).await;

    assert!(outcome.is_err());
    assert_eq!(ctx.current(), None);
}

#[tokio::test]
async fn test_setting_a_second_tenant_requires_clear() {
    let h = Harness::new();
    let ctx = h.ctx_for("42");

    let err = ctx.set("99").unwrap_err();
    assert!(matches!(err, TenancyError::ContextAlreadySet { .. }));

    ctx.clear();
    ctx.set("99").unwrap();
    let visible = h.buildings.list(&ctx, Criteria::new()).await.unwrap();
    assert!(visible.is_empty());
}
