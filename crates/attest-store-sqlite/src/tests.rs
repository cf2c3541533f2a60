//! Integration tests for `SqliteStore` against an in-memory database.

use attest_core::{
  RecordFilter, Relation,
  certification::{Certification, NewCertification},
  competency::{AreaCode, CertificationCategory, Competency, NewCompetency},
  matrix::{AreaRequirement, CompetencyMatrix, NewCompetencyMatrix},
  order::{
    AttestationOrder, AttestationOrderPatch, NewAttestationOrder, OrderKind,
    OrderPersonnel, OrderStatus,
  },
  organization::{
    Facility, FacilityType, HazardClass, NewFacility, NewOrganization,
    NewPosition, NewTenant, Organization, OrganizationPatch, Position, Tenant,
  },
  person::{NewPerson, NewPersonnel, Person, Personnel, PersonnelPatch},
  store::ComplianceStore,
};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn tenant(s: &SqliteStore) -> Tenant {
  s.add::<Tenant>(NewTenant {
    name:        "Холдинг".into(),
    inn:         "7700000001".into(),
    admin_name:  "Администратор".into(),
    admin_email: "admin@example.ru".into(),
    expires_at:  None,
  })
  .await
  .unwrap()
}

async fn organization(s: &SqliteStore, tenant_id: Uuid, name: &str) -> Organization {
  s.add::<Organization>(NewOrganization {
    tenant_id,
    name: name.into(),
    inn: "7701234567".into(),
    kpp: None,
    address: None,
  })
  .await
  .unwrap()
}

async fn position(s: &SqliteStore, tenant_id: Uuid, name: &str) -> Position {
  s.add::<Position>(NewPosition {
    tenant_id,
    name: name.into(),
    code: None,
    category: Default::default(),
    description: None,
  })
  .await
  .unwrap()
}

fn facility_input(f: &Fixture, name: &str, parent_id: Option<Uuid>) -> NewFacility {
  NewFacility {
    tenant_id: f.tenant.id,
    organization_id: f.org.id,
    parent_id,
    name: name.into(),
    registration_number: None,
    facility_type: FacilityType::Opo,
    hazard_class: Some(HazardClass::II),
    address: None,
    responsible: None,
  }
}

/// A tenant with one organisation, position, person and personnel record.
struct Fixture {
  tenant:    Tenant,
  org:       Organization,
  position:  Position,
  person:    Person,
  personnel: Personnel,
}

async fn fixture(s: &SqliteStore) -> Fixture {
  let tenant = tenant(s).await;
  let org = organization(s, tenant.id, "ООО Энергосервис").await;
  let position = position(s, tenant.id, "Главный энергетик").await;
  let person = s
    .add::<Person>(NewPerson::new(tenant.id, "Петров", "Иван"))
    .await
    .unwrap();
  let personnel = s
    .add::<Personnel>(NewPersonnel::new(
      tenant.id,
      person.id,
      position.id,
      Some(org.id),
    ))
    .await
    .unwrap();
  Fixture { tenant, org, position, person, personnel }
}

fn certification(f: &Fixture, label: &str) -> NewCertification {
  NewCertification::new(
    f.tenant.id,
    f.person.id,
    CertificationCategory::EnergySafety,
    label,
    date(2022, 1, 10),
    date(2027, 1, 10),
  )
}

fn order_input(f: &Fixture) -> NewAttestationOrder {
  NewAttestationOrder {
    tenant_id:          f.tenant.id,
    organization_id:    f.org.id,
    order_number:       "ПР-001".into(),
    order_date:         date(2024, 10, 1),
    kind:               OrderKind::InternalCommission,
    area_name:          "Б.3 Эксплуатация объектов".into(),
    personnel:          vec![OrderPersonnel {
      personnel_id:       f.personnel.id,
      full_name:          "Петров Иван".into(),
      position:           "Главный энергетик".into(),
      required_documents: Vec::new(),
    }],
    scheduled_date:     Some(date(2024, 11, 15)),
    commission_members: vec!["Сидоров А.А.".into()],
    location:           None,
    notes:              None,
    created_by:         None,
  }
}

// ─── CRUD ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_record() {
  let s = store().await;
  let t = tenant(&s).await;
  let org = organization(&s, t.id, "ООО Энергосервис").await;

  let fetched = s.get::<Organization>(org.id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "ООО Энергосервис");
  assert_eq!(fetched.tenant_id, t.id);
  assert_eq!(fetched.created_at, org.created_at);
}

#[tokio::test]
async fn get_is_scoped_to_kind() {
  let s = store().await;
  let t = tenant(&s).await;
  let org = organization(&s, t.id, "ООО Энергосервис").await;

  assert!(s.get::<Position>(org.id).await.unwrap().is_none());
  assert!(s.get::<Organization>(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_merges_patch_and_refreshes_timestamp() {
  let s = store().await;
  let t = tenant(&s).await;
  let org = organization(&s, t.id, "ООО Энергосервис").await;

  let updated = s
    .update::<Organization>(org.id, OrganizationPatch {
      address: Some("Москва".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.name, "ООО Энергосервис");
  assert_eq!(updated.address.as_deref(), Some("Москва"));
  assert!(updated.updated_at >= org.updated_at);

  let fetched = s.get::<Organization>(org.id).await.unwrap().unwrap();
  assert_eq!(fetched.address.as_deref(), Some("Москва"));
}

#[tokio::test]
async fn update_unknown_id_is_not_found() {
  let s = store().await;
  let err = s
    .update::<Organization>(Uuid::new_v4(), OrganizationPatch::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn invalid_patch_leaves_record_unchanged() {
  let s = store().await;
  let t = tenant(&s).await;
  let org = organization(&s, t.id, "ООО Энергосервис").await;

  let err = s
    .update::<Organization>(org.id, OrganizationPatch {
      name: Some("  ".into()),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(attest_core::Error::Validation(_))));

  let fetched = s.get::<Organization>(org.id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "ООО Энергосервис");
}

#[tokio::test]
async fn delete_unknown_returns_false() {
  let s = store().await;
  assert!(!s.delete::<Organization>(Uuid::new_v4()).await.unwrap());
}

// ─── Filters ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_filters_by_tenant() {
  let s = store().await;
  let a = tenant(&s).await;
  let b = tenant(&s).await;
  organization(&s, a.id, "А").await;
  organization(&s, a.id, "Б").await;
  organization(&s, b.id, "В").await;

  let all = s.list::<Organization>(RecordFilter::default()).await.unwrap();
  assert_eq!(all.len(), 3);

  let only_a = s
    .list::<Organization>(RecordFilter::tenant(a.id))
    .await
    .unwrap();
  assert_eq!(only_a.len(), 2);
  assert!(only_a.iter().all(|o| o.tenant_id == a.id));
}

#[tokio::test]
async fn list_filters_by_relation() {
  let s = store().await;
  let f = fixture(&s).await;
  let other = s
    .add::<Person>(NewPerson::new(f.tenant.id, "Иванова", "Мария"))
    .await
    .unwrap();
  s.add::<Certification>(certification(&f, "Б.3")).await.unwrap();
  s.add::<Certification>(certification(&f, "Б.7")).await.unwrap();
  let mut theirs = certification(&f, "А.1");
  theirs.person_id = other.id;
  s.add::<Certification>(theirs).await.unwrap();

  let mine = s
    .list::<Certification>(RecordFilter::related(Relation::Person, f.person.id))
    .await
    .unwrap();
  assert_eq!(mine.len(), 2);
  assert!(mine.iter().all(|c| c.person_id == f.person.id));

  let by_org = s
    .list::<Personnel>(
      RecordFilter::related(Relation::Organization, f.org.id)
        .with_tenant(f.tenant.id),
    )
    .await
    .unwrap();
  assert_eq!(by_org.len(), 1);
  assert_eq!(by_org[0].id, f.personnel.id);
}

#[tokio::test]
async fn stored_certifications_keep_normalised_area() {
  let s = store().await;
  let f = fixture(&s).await;
  let cert = s
    .add::<Certification>(certification(
      &f,
      "Б.3 Эксплуатация объектов электроэнергетики",
    ))
    .await
    .unwrap();

  let fetched = s.get::<Certification>(cert.id).await.unwrap().unwrap();
  assert_eq!(fetched.area, AreaCode::parse("Б.3").unwrap());
  assert_eq!(
    fetched.area_label,
    "Б.3 Эксплуатация объектов электроэнергетики"
  );
}

// ─── Referential integrity ───────────────────────────────────────────────────

#[tokio::test]
async fn unknown_tenant_is_rejected() {
  let s = store().await;
  let err = s
    .add::<Organization>(NewOrganization {
      tenant_id: Uuid::new_v4(),
      name:      "ООО Призрак".into(),
      inn:       "0".into(),
      kpp:       None,
      address:   None,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UnknownTenant(_)));
}

#[tokio::test]
async fn dangling_reference_is_rejected() {
  let s = store().await;
  let f = fixture(&s).await;

  let err = s
    .add::<Personnel>(NewPersonnel::new(
      f.tenant.id,
      Uuid::new_v4(),
      f.position.id,
      None,
    ))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DanglingReference {
    relation: Relation::Person,
    ..
  }));
}

#[tokio::test]
async fn reference_to_wrong_kind_is_rejected() {
  let s = store().await;
  let f = fixture(&s).await;

  // The organisation id is not a position.
  let err = s
    .add::<Personnel>(NewPersonnel::new(
      f.tenant.id,
      f.person.id,
      f.org.id,
      None,
    ))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DanglingReference {
    relation: Relation::Position,
    ..
  }));
}

#[tokio::test]
async fn cross_tenant_reference_is_rejected() {
  let s = store().await;
  let f = fixture(&s).await;
  let other = tenant(&s).await;

  let err = s
    .add::<Personnel>(NewPersonnel::new(
      other.id,
      f.person.id,
      f.position.id,
      None,
    ))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DanglingReference { .. }));
}

#[tokio::test]
async fn update_rechecks_references() {
  let s = store().await;
  let f = fixture(&s).await;

  let err = s
    .update::<Personnel>(f.personnel.id, PersonnelPatch {
      position_id: Some(Uuid::new_v4()),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DanglingReference { .. }));
}

#[tokio::test]
async fn deleting_person_cascades() {
  let s = store().await;
  let f = fixture(&s).await;
  let cert = s.add::<Certification>(certification(&f, "Б.3")).await.unwrap();

  assert!(s.delete::<Person>(f.person.id).await.unwrap());
  assert!(s.get::<Person>(f.person.id).await.unwrap().is_none());
  assert!(s.get::<Personnel>(f.personnel.id).await.unwrap().is_none());
  assert!(s.get::<Certification>(cert.id).await.unwrap().is_none());

  // Nothing left points at the position any more.
  assert!(s.delete::<Position>(f.position.id).await.unwrap());
}

#[tokio::test]
async fn referenced_records_cannot_be_deleted() {
  let s = store().await;
  let f = fixture(&s).await;

  let err = s.delete::<Organization>(f.org.id).await.unwrap_err();
  assert!(matches!(err, Error::StillReferenced { referrers: 1, .. }));
  assert!(s.get::<Organization>(f.org.id).await.unwrap().is_some());

  let err = s.delete::<Tenant>(f.tenant.id).await.unwrap_err();
  assert!(matches!(err, Error::StillReferenced { .. }));
}

#[tokio::test]
async fn person_in_an_order_cannot_be_deleted() {
  let s = store().await;
  let f = fixture(&s).await;
  s.add::<AttestationOrder>(order_input(&f)).await.unwrap();

  let err = s.delete::<Person>(f.person.id).await.unwrap_err();
  assert!(matches!(err, Error::StillReferenced { .. }));
  assert!(s.get::<Personnel>(f.personnel.id).await.unwrap().is_some());
}

#[tokio::test]
async fn competency_in_use_cannot_be_deleted() {
  let s = store().await;
  let f = fixture(&s).await;
  let competency = s
    .add::<Competency>(NewCompetency {
      tenant_id:          f.tenant.id,
      code:               AreaCode::parse("Б.3").unwrap(),
      name:               "Эксплуатация объектов электроэнергетики".into(),
      category:           CertificationCategory::EnergySafety,
      validity_months:    60,
      requires_regulator: true,
      description:        None,
    })
    .await
    .unwrap();
  let mut input = certification(&f, "Б.3");
  input.competency_id = Some(competency.id);
  let cert = s.add::<Certification>(input).await.unwrap();

  assert!(s.delete::<Competency>(competency.id).await.is_err());
  assert!(s.delete::<Certification>(cert.id).await.unwrap());
  assert!(s.delete::<Competency>(competency.id).await.unwrap());
}

// ─── Orders ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn order_walks_through_workflow() {
  let s = store().await;
  let f = fixture(&s).await;
  let order = s.add::<AttestationOrder>(order_input(&f)).await.unwrap();
  assert_eq!(order.status, OrderStatus::Draft);

  for next in [
    OrderStatus::Pending,
    OrderStatus::Scheduled,
    OrderStatus::Completed,
  ] {
    let moved = s.transition_order(order.id, next).await.unwrap();
    assert_eq!(moved.status, next);
  }

  let stored = s.get::<AttestationOrder>(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Completed);
}

#[tokio::test]
async fn illegal_transition_is_rejected_and_not_persisted() {
  let s = store().await;
  let f = fixture(&s).await;
  let order = s.add::<AttestationOrder>(order_input(&f)).await.unwrap();

  let err = s
    .transition_order(order.id, OrderStatus::Completed)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(attest_core::Error::IllegalTransition {
      from: OrderStatus::Draft,
      to:   OrderStatus::Completed,
    })
  ));

  let stored = s.get::<AttestationOrder>(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Draft);
}

#[tokio::test]
async fn transition_of_unknown_order_is_not_found() {
  let s = store().await;
  let err = s
    .transition_order(Uuid::new_v4(), OrderStatus::Pending)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn scheduled_order_personnel_is_locked() {
  let s = store().await;
  let f = fixture(&s).await;
  let order = s.add::<AttestationOrder>(order_input(&f)).await.unwrap();
  s.transition_order(order.id, OrderStatus::Pending).await.unwrap();
  s.transition_order(order.id, OrderStatus::Scheduled).await.unwrap();

  let err = s
    .update::<AttestationOrder>(order.id, AttestationOrderPatch {
      personnel: Some(Vec::new()),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(attest_core::Error::OrderLocked { .. })
  ));
}

#[tokio::test]
async fn removing_order_personnel_releases_the_reference() {
  let s = store().await;
  let f = fixture(&s).await;
  let order = s.add::<AttestationOrder>(order_input(&f)).await.unwrap();

  s.update::<AttestationOrder>(order.id, AttestationOrderPatch {
    personnel: Some(Vec::new()),
    ..Default::default()
  })
  .await
  .unwrap();

  assert!(s.delete::<Person>(f.person.id).await.unwrap());
}

// ─── Matrices ────────────────────────────────────────────────────────────────

fn matrix_input(f: &Fixture, codes: &[&str]) -> NewCompetencyMatrix {
  NewCompetencyMatrix {
    tenant_id:       f.tenant.id,
    organization_id: f.org.id,
    position_id:     f.position.id,
    required_areas:  vec![
      AreaRequirement::new(
        CertificationCategory::EnergySafety,
        codes.iter().map(|c| AreaCode::parse(c).unwrap()),
      )
      .unwrap(),
    ],
  }
}

#[tokio::test]
async fn upsert_creates_then_replaces_areas() {
  let s = store().await;
  let f = fixture(&s).await;

  let first = s
    .upsert_matrices(f.tenant.id, vec![matrix_input(&f, &["Б.3"])])
    .await
    .unwrap();
  assert_eq!((first.created, first.updated), (1, 0));

  let second = s
    .upsert_matrices(f.tenant.id, vec![matrix_input(&f, &["Б.7", "Г.1.1"])])
    .await
    .unwrap();
  assert_eq!((second.created, second.updated), (0, 1));

  let matrices = s
    .list::<CompetencyMatrix>(RecordFilter::tenant(f.tenant.id))
    .await
    .unwrap();
  assert_eq!(matrices.len(), 1);
  assert_eq!(matrices[0].required_codes().count(), 2);
}

#[tokio::test]
async fn upsert_is_atomic() {
  let s = store().await;
  let f = fixture(&s).await;
  let mut bad = matrix_input(&f, &["Б.3"]);
  bad.position_id = Uuid::new_v4();

  let err = s
    .upsert_matrices(f.tenant.id, vec![matrix_input(&f, &["Б.3"]), bad])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DanglingReference { .. }));

  let matrices = s
    .list::<CompetencyMatrix>(RecordFilter::tenant(f.tenant.id))
    .await
    .unwrap();
  assert!(matrices.is_empty());
}

// ─── Facilities ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn facilities_nest_and_filter_by_relation() {
  let s = store().await;
  let f = fixture(&s).await;
  let site = s
    .add::<Facility>(facility_input(&f, "Площадка нефтебазы", None))
    .await
    .unwrap();
  let tank = s
    .add::<Facility>(facility_input(&f, "Резервуарный парк", Some(site.id)))
    .await
    .unwrap();

  let by_org = s
    .list::<Facility>(RecordFilter::related(Relation::Organization, f.org.id))
    .await
    .unwrap();
  assert_eq!(by_org.len(), 2);

  let children = s
    .list::<Facility>(RecordFilter::related(Relation::ParentFacility, site.id))
    .await
    .unwrap();
  assert_eq!(children.len(), 1);
  assert_eq!(children[0].id, tank.id);
  assert_eq!(children[0].hazard_class, Some(HazardClass::II));
}

#[tokio::test]
async fn facility_parent_must_be_a_facility() {
  let s = store().await;
  let f = fixture(&s).await;

  let err = s
    .add::<Facility>(facility_input(&f, "Цех", Some(f.org.id)))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DanglingReference {
    relation: Relation::ParentFacility,
    ..
  }));
}

#[tokio::test]
async fn parent_facility_cannot_be_deleted_before_children() {
  let s = store().await;
  let f = fixture(&s).await;
  let site = s
    .add::<Facility>(facility_input(&f, "ГТС Северная", None))
    .await
    .unwrap();
  let station = s
    .add::<Facility>(facility_input(&f, "Компрессорная станция", Some(site.id)))
    .await
    .unwrap();

  let err = s.delete::<Facility>(site.id).await.unwrap_err();
  assert!(matches!(err, Error::StillReferenced { referrers: 1, .. }));

  assert!(s.delete::<Facility>(station.id).await.unwrap());
  assert!(s.delete::<Facility>(site.id).await.unwrap());
}
