use std::sync::Arc;

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use attest_core::certification::ExpiryPolicy;
use attest_store_sqlite::SqliteStore;
use axum::{
  Router,
  body::Body,
  http::{Method, Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use rand_core::OsRng;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::{AppState, auth::AuthConfig, router};

// ─── Helpers ──────────────────────────────────────────────────────────────────

async fn make_app() -> Router {
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(b"secret", &salt)
    .unwrap()
    .to_string();

  router(AppState {
    store:  Arc::new(SqliteStore::open_in_memory().await.unwrap()),
    auth:   Arc::new(AuthConfig {
      username:      "admin".to_string(),
      password_hash: hash,
    }),
    policy: ExpiryPolicy::default(),
  })
}

fn auth_header() -> String {
  format!("Basic {}", B64.encode("admin:secret"))
}

async fn send(
  app: &Router,
  method: Method,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let builder = Request::builder()
    .method(method)
    .uri(uri)
    .header(header::AUTHORIZATION, auth_header());
  let req = match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

async fn post(app: &Router, uri: &str, body: Value) -> Value {
  let (status, value) = send(app, Method::POST, uri, Some(body)).await;
  assert_eq!(status, StatusCode::CREATED, "POST {uri}: {value}");
  value
}

fn id(value: &Value) -> String {
  value["id"].as_str().unwrap().to_string()
}

/// Tenant, organisation, position and one employee holding `Б.3`.
struct Fixture {
  tenant:    String,
  org:       String,
  person:    String,
  personnel: String,
}

async fn seed(app: &Router) -> Fixture {
  let tenant = id(
    &post(app, "/api/tenants", json!({
      "name": "Холдинг",
      "inn": "7700000000",
      "admin_name": "Иванов И.И.",
      "admin_email": "admin@example.ru",
    }))
    .await,
  );
  let org = id(
    &post(app, "/api/organizations", json!({
      "tenant_id": tenant,
      "name": "ООО Ромашка",
      "inn": "7711111111",
    }))
    .await,
  );
  let position = id(
    &post(app, "/api/positions", json!({
      "tenant_id": tenant,
      "name": "Главный инженер",
    }))
    .await,
  );
  let person = id(
    &post(app, "/api/people", json!({
      "tenant_id": tenant,
      "last_name": "Петров",
      "first_name": "Пётр",
    }))
    .await,
  );
  let personnel = id(
    &post(app, "/api/personnel", json!({
      "tenant_id": tenant,
      "person_id": person,
      "position_id": position,
      "organization_id": org,
    }))
    .await,
  );
  post(app, "/api/certifications", json!({
    "tenant_id": tenant,
    "person_id": person,
    "category": "industrial_safety",
    "area_label": "Б.3 Эксплуатация объектов электроэнергетики",
    "issue_date": "2021-01-01",
    "expiry_date": "2026-01-01",
  }))
  .await;

  Fixture { tenant, org, person, personnel }
}

// ─── Auth ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn api_requires_credentials() {
  let app = make_app().await;
  let req = Request::builder()
    .uri("/api/tenants")
    .body(Body::empty())
    .unwrap();
  let resp = app.oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn wrong_password_is_rejected() {
  let app = make_app().await;
  let req = Request::builder()
    .uri("/api/tenants")
    .header(
      header::AUTHORIZATION,
      format!("Basic {}", B64.encode("admin:wrong")),
    )
    .body(Body::empty())
    .unwrap();
  let resp = app.oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ─── Records ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_get_and_list_records() {
  let app = make_app().await;
  let fx = seed(&app).await;

  let (status, list) = send(
    &app,
    Method::GET,
    &format!("/api/organizations?tenant_id={}", fx.tenant),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(list.as_array().unwrap().len(), 1);
  assert_eq!(list[0]["name"], "ООО Ромашка");

  let (status, one) = send(
    &app,
    Method::GET,
    &format!("/api/personnel/{}", fx.personnel),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(one["status"], "active");
}

#[tokio::test]
async fn missing_record_is_not_found() {
  let app = make_app().await;
  let (status, body) = send(
    &app,
    Method::GET,
    &format!("/api/people/{}", uuid::Uuid::new_v4()),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn blank_required_field_is_bad_request() {
  let app = make_app().await;
  let (status, _) = send(
    &app,
    Method::POST,
    "/api/tenants",
    Some(json!({
      "name": "  ",
      "inn": "7700000000",
      "admin_name": "Иванов И.И.",
      "admin_email": "admin@example.ru",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tenant_with_members_cannot_be_deleted() {
  let app = make_app().await;
  let fx = seed(&app).await;
  let (status, _) = send(
    &app,
    Method::DELETE,
    &format!("/api/tenants/{}", fx.tenant),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

// ─── Certifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn certification_status_follows_as_of() {
  let app = make_app().await;
  let fx = seed(&app).await;
  let person = &fx.person;

  let cert = post(&app, "/api/certifications", json!({
    "tenant_id": fx.tenant,
    "person_id": person,
    "category": "energy_safety",
    "area_label": "Г.1.1",
    "issue_date": "2022-01-10",
    "expiry_date": "2025-01-10",
  }))
  .await;
  let uri = format!("/api/certifications/{}", id(&cert));

  let (_, soon) =
    send(&app, Method::GET, &format!("{uri}?as_of=2024-10-20"), None).await;
  assert_eq!(soon["status"], "expiring_soon");
  assert_eq!(soon["days_until_expiry"], 82);

  let (_, expired) =
    send(&app, Method::GET, &format!("{uri}?as_of=2025-02-01"), None).await;
  assert_eq!(expired["status"], "expired");

  let (_, filtered) = send(
    &app,
    Method::GET,
    &format!(
      "/api/certifications?person_id={person}&status=expiring_soon&as_of=2024-10-20"
    ),
    None,
  )
  .await;
  assert_eq!(filtered.as_array().unwrap().len(), 1);
  assert_eq!(filtered[0]["area"], "Г.1.1");
}

#[tokio::test]
async fn upcoming_lists_certifications_inside_window() {
  let app = make_app().await;
  let fx = seed(&app).await;

  let (status, upcoming) = send(
    &app,
    Method::GET,
    &format!(
      "/api/certifications/upcoming?tenant_id={}&as_of=2025-11-01",
      fx.tenant
    ),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(upcoming.as_array().unwrap().len(), 1);

  let (_, none) = send(
    &app,
    Method::GET,
    &format!(
      "/api/certifications/upcoming?tenant_id={}&as_of=2025-11-01&within_days=30",
      fx.tenant
    ),
    None,
  )
  .await;
  assert!(none.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn expiry_is_derived_from_competency_validity() {
  let app = make_app().await;
  let fx = seed(&app).await;
  let competency = post(&app, "/api/competencies", json!({
    "tenant_id": fx.tenant,
    "code": "Б.7",
    "name": "Эксплуатация объектов нефтегазодобычи",
    "category": "industrial_safety",
    "validity_months": 60,
  }))
  .await;

  let cert = post(&app, "/api/certifications", json!({
    "tenant_id": fx.tenant,
    "person_id": fx.person,
    "competency_id": competency["id"],
    "category": "industrial_safety",
    "area_label": "Б.7",
    "issue_date": "2024-03-15",
  }))
  .await;
  assert_eq!(cert["expiry_date"], "2029-03-15");
  assert_eq!(cert["competency_id"], competency["id"]);
}

#[tokio::test]
async fn unknown_competency_without_expiry_is_bad_request() {
  let app = make_app().await;
  let fx = seed(&app).await;

  let (status, body) = send(
    &app,
    Method::POST,
    "/api/certifications",
    Some(json!({
      "tenant_id": fx.tenant,
      "person_id": fx.person,
      "competency_id": uuid::Uuid::new_v4(),
      "category": "industrial_safety",
      "area_label": "Б.7",
      "issue_date": "2024-03-15",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("competency"));
}

#[tokio::test]
async fn missing_expiry_without_competency_is_bad_request() {
  let app = make_app().await;
  let fx = seed(&app).await;

  let (status, _) = send(
    &app,
    Method::POST,
    "/api/certifications",
    Some(json!({
      "tenant_id": fx.tenant,
      "person_id": fx.person,
      "category": "industrial_safety",
      "area_label": "Б.7",
      "issue_date": "2024-03-15",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Facilities ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn facilities_crud_under_organization() {
  let app = make_app().await;
  let fx = seed(&app).await;

  let site = post(&app, "/api/facilities", json!({
    "tenant_id": fx.tenant,
    "organization_id": fx.org,
    "name": "Площадка нефтебазы",
    "type": "opo",
    "hazard_class": "III",
  }))
  .await;
  assert_eq!(site["status"], "active");
  let station = post(&app, "/api/facilities", json!({
    "tenant_id": fx.tenant,
    "organization_id": fx.org,
    "parent_id": site["id"],
    "name": "Резервуарный парк",
  }))
  .await;

  let (status, list) = send(
    &app,
    Method::GET,
    &format!("/api/facilities?organization_id={}", fx.org),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(list.as_array().unwrap().len(), 2);

  let site_uri = format!("/api/facilities/{}", id(&site));
  let (status, patched) = send(
    &app,
    Method::PATCH,
    &site_uri,
    Some(json!({ "status": "maintenance" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(patched["status"], "maintenance");
  assert_eq!(patched["type"], "opo");

  let (status, _) = send(&app, Method::DELETE, &site_uri, None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let station_uri = format!("/api/facilities/{}", id(&station));
  let (status, _) = send(&app, Method::DELETE, &station_uri, None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = send(&app, Method::DELETE, &site_uri, None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
}

// ─── Matrix and compliance ────────────────────────────────────────────────────

#[tokio::test]
async fn imported_matrix_drives_gap_analysis() {
  let app = make_app().await;
  let fx = seed(&app).await;

  let (status, report) = send(
    &app,
    Method::POST,
    "/api/matrices/import",
    Some(json!({
      "tenant_id": fx.tenant,
      "rows": [
        {
          "Организация": "ООО Ромашка",
          "Должность": "Главный инженер",
          "Требуемые области аттестации": "Промышленная безопасность: Б.3, Б.7",
        },
        {
          "Организация": "ООО Лютик",
          "Должность": "Главный инженер",
          "Требуемые области аттестации": "Промышленная безопасность: Б.1",
        },
      ],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{report}");
  assert_eq!(report["created"], 1);
  assert_eq!(report["updated"], 0);
  assert_eq!(report["skipped"][0]["row"], 3);

  let (status, compliance) = send(
    &app,
    Method::GET,
    &format!("/api/compliance/personnel/{}?as_of=2024-10-20", fx.personnel),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(compliance["has_matrix"], true);
  assert_eq!(compliance["has_all_required"], false);
  assert_eq!(compliance["completion_percent"], 50);
  assert_eq!(compliance["risk_level"], "high");
  assert_eq!(compliance["missing"].as_array().unwrap().len(), 1);
  assert_eq!(compliance["missing"][0]["code"], "Б.7");

  let (_, summary) = send(
    &app,
    Method::GET,
    &format!("/api/compliance/report?tenant_id={}&as_of=2024-10-20", fx.tenant),
    None,
  )
  .await;
  assert_eq!(summary["total_personnel"], 1);
  assert_eq!(summary["compliant"], 0);
  assert_eq!(summary["non_compliant"], 1);
}

#[tokio::test]
async fn export_renders_imported_cell() {
  let app = make_app().await;
  let fx = seed(&app).await;
  let cell = "Промышленная безопасность: Б.3, Б.7 | Энергобезопасность: Г.1.1";

  send(
    &app,
    Method::POST,
    "/api/matrices/import",
    Some(json!({
      "tenant_id": fx.tenant,
      "rows": [{
        "Организация": "ООО Ромашка",
        "Должность": "Главный инженер",
        "Требуемые области аттестации": cell,
      }],
    })),
  )
  .await;

  let (status, rows) = send(
    &app,
    Method::GET,
    &format!("/api/matrices/export?tenant_id={}", fx.tenant),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(rows.as_array().unwrap().len(), 1);
  assert_eq!(rows[0]["Организация"], "ООО Ромашка");
  assert_eq!(rows[0]["Требуемые области аттестации"], cell);
  assert!(rows[0]["Дата создания"].is_string());
}

#[tokio::test]
async fn matrix_code_with_cell_separator_is_bad_request() {
  let app = make_app().await;
  let fx = seed(&app).await;
  let (_, positions) = send(
    &app,
    Method::GET,
    &format!("/api/positions?tenant_id={}", fx.tenant),
    None,
  )
  .await;

  let (status, body) = send(
    &app,
    Method::POST,
    "/api/matrices",
    Some(json!({
      "tenant_id": fx.tenant,
      "organization_id": fx.org,
      "position_id": positions[0]["id"],
      "required_areas": [{
        "category": "energy_safety",
        "areas": ["III группа, до 1000В"],
      }],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn import_without_valid_rows_is_rejected() {
  let app = make_app().await;
  let fx = seed(&app).await;

  let (status, body) = send(
    &app,
    Method::POST,
    "/api/matrices/import",
    Some(json!({
      "tenant_id": fx.tenant,
      "rows": [{
        "Организация": "ООО Ромашка",
        "Должность": "Главный инженер",
        "Требуемые области аттестации": "нет данных",
      }],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["skipped"][0]["row"], 2);
}

// ─── Orders ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn order_status_follows_workflow() {
  let app = make_app().await;
  let fx = seed(&app).await;

  let order = post(&app, "/api/orders", json!({
    "tenant_id": fx.tenant,
    "organization_id": fx.org,
    "order_number": "17-А",
    "order_date": "2024-10-01",
    "kind": "internal_commission",
    "area_name": "Промышленная безопасность",
  }))
  .await;
  assert_eq!(order["status"], "draft");
  let uri = format!("/api/orders/{}/status", id(&order));

  let (status, _) = send(
    &app,
    Method::POST,
    &uri,
    Some(json!({ "status": "completed" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, pending) = send(
    &app,
    Method::POST,
    &uri,
    Some(json!({ "status": "pending" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(pending["status"], "pending");
}
