use axum::body::Body;
use axum::http::Request;
use axum::Router;
use http_body_util::BodyExt;
use kore_core::Entity;
use kore_erp::jobs::generate_invoices;
use kore_erp::seed::seed_demo;
use kore_erp::services::Invoice;
use kore_erp::Erp;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn seeded() -> (Erp, Router) {
    let erp = kore_erp::build().unwrap();
    seed_demo(&erp).await.unwrap();
    let router = erp.router();
    (erp, router)
}

fn request(method: &str, uri: &str, agency: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-actor-id", "agent@kore");
    if let Some(agency) = agency {
        builder = builder.header("x-agency-id", agency);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send_raw(router: &Router, req: Request<Body>) -> (u16, Vec<u8>) {
    let res = router.clone().oneshot(req).await.unwrap();
    let status = res.status().as_u16();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn send(router: &Router, req: Request<Body>) -> (u16, Value) {
    let (status, bytes) = send_raw(router, req).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn first_id(router: &Router, path: &str, agency: &str) -> String {
    let (status, body) = send(router, request("GET", path, Some(agency), None)).await;
    assert_eq!(status, 200, "{body}");
    body[0]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_needs_no_agency() {
    let (_erp, router) = seeded().await;

    let (status, body) = send_raw(&router, request("GET", "/health", None, None)).await;

    assert_eq!(status, 200);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn dashboard_counts_only_the_callers_agency() {
    let (_erp, router) = seeded().await;

    let (status, body) = send(&router, request("GET", "/dashboard", Some("42"), None)).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(
        body,
        json!({
            "agency_id": "42",
            "buildings": 1,
            "units": 2,
            "occupied_units": 1,
            "open_maintenance_requests": 0,
            "outstanding_invoices": 0,
            "outstanding_amount": 0
        })
    );

    let (status, body) = send(&router, request("GET", "/dashboard", None, None)).await;
    assert_eq!(status, 401);
    assert_eq!(body["data"]["tenancy"], "no-active-tenant");
}

#[tokio::test]
async fn dashboard_tracks_open_requests_and_outstanding_invoices() {
    let (erp, router) = seeded().await;
    generate_invoices(&erp.jobs, &erp.repos, &erp.agencies, "2026-10".parse().unwrap())
        .await
        .unwrap();

    let unit_id = first_id(&router, "/units?label=A1", "42").await;
    let (status, body) = send(
        &router,
        request(
            "POST",
            "/maintenance-requests",
            Some("42"),
            Some(json!({"unit_id": unit_id, "title": "Leaking tap", "priority": "high"})),
        ),
    )
    .await;
    assert_eq!(status, 201, "{body}");
    assert_eq!(body["status"], "open");
    assert_eq!(body["agency_id"], "42");

    let invoice_id = first_id(&router, "/invoices", "42").await;
    let (status, body) = send(
        &router,
        request(
            "PATCH",
            &format!("/invoices/{invoice_id}"),
            Some("42"),
            Some(json!({"status": "issued"})),
        ),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["status"], "issued");

    let (_, body) = send(&router, request("GET", "/dashboard", Some("42"), None)).await;
    assert_eq!(body["open_maintenance_requests"], 1);
    assert_eq!(body["outstanding_invoices"], 1);
    assert_eq!(body["outstanding_amount"], 150_000);

    let (_, body) = send(&router, request("GET", "/dashboard", Some("99"), None)).await;
    assert_eq!(body["open_maintenance_requests"], 0);
    assert_eq!(body["outstanding_invoices"], 0);
}

#[tokio::test]
async fn references_to_another_agencys_records_are_rejected() {
    let (_erp, router) = seeded().await;
    let foreign_building = first_id(&router, "/buildings", "99").await;

    let (status, body) = send(
        &router,
        request(
            "POST",
            "/units",
            Some("42"),
            Some(json!({
                "building_id": foreign_building,
                "label": "B1",
                "monthly_rent": 90000,
                "currency": "XOF"
            })),
        ),
    )
    .await;

    assert_eq!(status, 422, "{body}");
    assert_eq!(body["name"], "Unprocessable");
    assert!(body["errors"]["building_id"][0]
        .as_str()
        .unwrap()
        .contains("not found"));

    let (_, units) = send(&router, request("GET", "/units", Some("42"), None)).await;
    assert_eq!(units.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn patching_a_reference_is_checked_too() {
    let (_erp, router) = seeded().await;
    let unit_id = first_id(&router, "/units?label=A2", "42").await;
    let foreign_renter = first_id(&router, "/renters", "99").await;

    let (status, body) = send(
        &router,
        request(
            "PATCH",
            &format!("/units/{unit_id}"),
            Some("42"),
            Some(json!({"renter_id": foreign_renter})),
        ),
    )
    .await;
    assert_eq!(status, 422, "{body}");
    assert!(body["errors"]["renter_id"].is_array());

    let own_renter = first_id(&router, "/renters", "42").await;
    let (status, body) = send(
        &router,
        request(
            "PATCH",
            &format!("/units/{unit_id}"),
            Some("42"),
            Some(json!({"renter_id": own_renter})),
        ),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["renter_id"], own_renter.as_str());
}

#[tokio::test]
async fn invalid_records_are_unprocessable() {
    let (_erp, router) = seeded().await;

    let (status, body) = send(
        &router,
        request(
            "POST",
            "/owners",
            Some("42"),
            Some(json!({"name": "", "email": "not-an-email"})),
        ),
    )
    .await;

    assert_eq!(status, 422, "{body}");
    assert_eq!(body["errors"]["name"], json!(["must not be empty"]));
    assert_eq!(body["errors"]["email"], json!(["must be a valid email address"]));

    let (status, body) = send(
        &router,
        request(
            "PATCH",
            &format!("/buildings/{}", first_id(&router, "/buildings", "42").await),
            Some("42"),
            Some(json!({"name": "  "})),
        ),
    )
    .await;
    assert_eq!(status, 422, "{body}");
    assert_eq!(body["errors"]["name"], json!(["must not be empty"]));
}

#[tokio::test]
async fn malformed_billing_period_is_a_bad_request() {
    let (_erp, router) = seeded().await;
    let unit_id = first_id(&router, "/units?label=A1", "42").await;
    let renter_id = first_id(&router, "/renters", "42").await;

    let (status, body) = send(
        &router,
        request(
            "POST",
            "/invoices",
            Some("42"),
            Some(json!({
                "unit_id": unit_id,
                "renter_id": renter_id,
                "period": "October",
                "amount": 1000,
                "currency": "XOF",
                "due_on": "2026-10-05"
            })),
        ),
    )
    .await;

    assert_eq!(status, 400, "{body}");
    assert_eq!(body["name"], "BadRequest");
}

#[tokio::test]
async fn agency_profile_follows_the_header() {
    let (_erp, router) = seeded().await;

    let (status, body) = send(&router, request("GET", "/agency", Some("99"), None)).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["currency"], "EUR");
    assert_eq!(body["country"], "FR");

    let (status, _) = send(&router, request("GET", "/agency", Some("7"), None)).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn agency_id_cannot_be_moved_over_http() {
    let (_erp, router) = seeded().await;
    let building = first_id(&router, "/buildings", "42").await;

    let (status, body) = send(
        &router,
        request(
            "PATCH",
            &format!("/buildings/{building}"),
            Some("42"),
            Some(json!({"agency_id": "99"})),
        ),
    )
    .await;
    assert_eq!(status, 422, "{body}");

    let (status, _) = send(
        &router,
        request("GET", &format!("/buildings/{building}"), Some("99"), None),
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn patches_are_validated_before_they_are_written() {
    let (_erp, router) = seeded().await;
    let unit_id = first_id(&router, "/units?label=A1", "42").await;
    let uri = format!("/units/{unit_id}");

    let (status, body) = send(
        &router,
        request("PATCH", &uri, Some("42"), Some(json!({"monthly_rent": "lots"}))),
    )
    .await;
    assert_eq!(status, 422, "{body}");
    assert_eq!(body["data"]["tenancy"], "invalid-update");

    let (status, body) = send(
        &router,
        request("PATCH", &uri, Some("42"), Some(json!({"monthly_rent": -5}))),
    )
    .await;
    assert_eq!(status, 422, "{body}");
    assert!(body["errors"]["monthly_rent"].is_array());

    let (status, body) = send(&router, request("GET", &uri, Some("42"), None)).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["monthly_rent"], 150_000);

    let (_, units) = send(&router, request("GET", "/units", Some("42"), None)).await;
    assert_eq!(units.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn amounts_are_bounded() {
    let (_erp, router) = seeded().await;
    let unit_id = first_id(&router, "/units?label=A1", "42").await;
    let renter_id = first_id(&router, "/renters", "42").await;

    let (status, body) = send(
        &router,
        request(
            "POST",
            "/invoices",
            Some("42"),
            Some(json!({
                "unit_id": unit_id,
                "renter_id": renter_id,
                "period": "2026-10",
                "amount": i64::MAX,
                "currency": "XOF",
                "due_on": "2026-10-05"
            })),
        ),
    )
    .await;

    assert_eq!(status, 422, "{body}");
    assert!(body["errors"]["amount"].is_array());
}

#[tokio::test]
async fn dashboard_reports_overflowing_totals_as_server_error() {
    let (erp, router) = seeded().await;
    for id in ["inv-a", "inv-b"] {
        let record = json!({
            "id": id,
            "agency_id": "42",
            "unit_id": "u-1",
            "renter_id": "p-1",
            "period": "2026-10",
            "amount": i64::MAX,
            "currency": "XOF",
            "status": "issued",
            "due_on": "2026-10-05"
        });
        erp.store
            .insert(&Invoice::collection(), record.as_object().cloned().unwrap())
            .await
            .unwrap();
    }

    let (status, body) = send(&router, request("GET", "/dashboard", Some("42"), None)).await;
    assert_eq!(status, 500, "{body}");
    assert_eq!(body["name"], "GeneralError");

    let (status, body) = send(&router, request("GET", "/dashboard", Some("99"), None)).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["outstanding_amount"], 0);
}
