//! JSON REST API for attest.
//!
//! Exposes an axum [`Router`] backed by any
//! [`attest_core::store::ComplianceStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", attest_api::api_router(store.clone(), ExpiryPolicy::default()))
//! ```

pub mod certifications;
pub mod compliance;
pub mod error;
pub mod matrices;
pub mod orders;
pub mod records;

use std::sync::Arc;

use attest_core::{
  certification::{Certification, ExpiryPolicy},
  competency::Competency,
  matrix::CompetencyMatrix,
  order::AttestationOrder,
  organization::{Department, Facility, Organization, Position, Tenant},
  person::{Person, Personnel},
  store::ComplianceStore,
};
use axum::{
  Router,
  routing::{get, post},
};
use chrono::{Local, NaiveDate};

pub use error::ApiError;

/// Shared handler state: the injected store and the expiry window used
/// whenever a certification status is derived.
pub struct ApiState<S> {
  pub store:  Arc<S>,
  pub policy: ExpiryPolicy,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), policy: self.policy }
  }
}

/// The day statuses are derived for: `as_of` when given, otherwise the
/// local calendar day.
pub(crate) fn today(as_of: Option<NaiveDate>) -> NaiveDate {
  as_of.unwrap_or_else(|| Local::now().date_naive())
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, policy: ExpiryPolicy) -> Router<()>
where
  S: ComplianceStore + 'static,
{
  Router::new()
    // Directory records
    .route(
      "/tenants",
      get(records::list::<S, Tenant>).post(records::create::<S, Tenant>),
    )
    .route(
      "/tenants/{id}",
      get(records::get_one::<S, Tenant>)
        .patch(records::update::<S, Tenant>)
        .delete(records::delete::<S, Tenant>),
    )
    .route(
      "/organizations",
      get(records::list::<S, Organization>)
        .post(records::create::<S, Organization>),
    )
    .route(
      "/organizations/{id}",
      get(records::get_one::<S, Organization>)
        .patch(records::update::<S, Organization>)
        .delete(records::delete::<S, Organization>),
    )
    .route(
      "/departments",
      get(records::list::<S, Department>)
        .post(records::create::<S, Department>),
    )
    .route(
      "/departments/{id}",
      get(records::get_one::<S, Department>)
        .patch(records::update::<S, Department>)
        .delete(records::delete::<S, Department>),
    )
    .route(
      "/facilities",
      get(records::list::<S, Facility>).post(records::create::<S, Facility>),
    )
    .route(
      "/facilities/{id}",
      get(records::get_one::<S, Facility>)
        .patch(records::update::<S, Facility>)
        .delete(records::delete::<S, Facility>),
    )
    .route(
      "/positions",
      get(records::list::<S, Position>).post(records::create::<S, Position>),
    )
    .route(
      "/positions/{id}",
      get(records::get_one::<S, Position>)
        .patch(records::update::<S, Position>)
        .delete(records::delete::<S, Position>),
    )
    .route(
      "/people",
      get(records::list::<S, Person>).post(records::create::<S, Person>),
    )
    .route(
      "/people/{id}",
      get(records::get_one::<S, Person>)
        .patch(records::update::<S, Person>)
        .delete(records::delete::<S, Person>),
    )
    .route(
      "/personnel",
      get(records::list::<S, Personnel>).post(records::create::<S, Personnel>),
    )
    .route(
      "/personnel/{id}",
      get(records::get_one::<S, Personnel>)
        .patch(records::update::<S, Personnel>)
        .delete(records::delete::<S, Personnel>),
    )
    .route(
      "/competencies",
      get(records::list::<S, Competency>)
        .post(records::create::<S, Competency>),
    )
    .route(
      "/competencies/{id}",
      get(records::get_one::<S, Competency>)
        .patch(records::update::<S, Competency>)
        .delete(records::delete::<S, Competency>),
    )
    // Certifications (status derived on read)
    .route(
      "/certifications",
      get(certifications::list::<S>).post(certifications::create::<S>),
    )
    .route("/certifications/upcoming", get(certifications::upcoming::<S>))
    .route(
      "/certifications/{id}",
      get(certifications::get_one::<S>)
        .patch(certifications::update::<S>)
        .delete(records::delete::<S, Certification>),
    )
    // Competency matrix
    .route(
      "/matrices",
      get(records::list::<S, CompetencyMatrix>)
        .post(records::create::<S, CompetencyMatrix>),
    )
    .route("/matrices/import", post(matrices::import::<S>))
    .route("/matrices/export", get(matrices::export::<S>))
    .route(
      "/matrices/{id}",
      get(records::get_one::<S, CompetencyMatrix>)
        .patch(records::update::<S, CompetencyMatrix>)
        .delete(records::delete::<S, CompetencyMatrix>),
    )
    // Attestation orders
    .route(
      "/orders",
      get(records::list::<S, AttestationOrder>)
        .post(records::create::<S, AttestationOrder>),
    )
    .route(
      "/orders/{id}",
      get(records::get_one::<S, AttestationOrder>)
        .patch(records::update::<S, AttestationOrder>)
        .delete(records::delete::<S, AttestationOrder>),
    )
    .route("/orders/{id}/status", post(orders::transition::<S>))
    // Compliance analysis
    .route(
      "/compliance/personnel/{id}",
      get(compliance::personnel::<S>),
    )
    .route("/compliance/report", get(compliance::report::<S>))
    .with_state(ApiState { store, policy })
}
