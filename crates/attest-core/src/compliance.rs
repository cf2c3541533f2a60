//! Competency matching and gap analysis.
//!
//! Requirements come from the [`CompetencyMatrix`] row for a personnel
//! record's organisation and position; held certifications come from the
//! person behind it. Matching is exact equality on [`AreaCode`].

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  certification::{
    AttestationResult, Certification, CertificationStatus, ExpiryPolicy,
    ResolvedCertification,
  },
  competency::{AreaCode, CertificationCategory},
  matrix::{AreaRequirement, CompetencyMatrix},
  organization::Organization,
  person::{Person, Personnel},
};

// ─── Matcher ─────────────────────────────────────────────────────────────────

/// A required `(category, code)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaGap {
  pub category: CertificationCategory,
  pub code:     AreaCode,
}

fn covering<'a>(
  code: &AreaCode,
  held: &'a [ResolvedCertification],
) -> impl Iterator<Item = &'a ResolvedCertification> {
  held.iter().filter(move |c| {
    c.certification.result == AttestationResult::Passed
      && c.status != CertificationStatus::Expired
      && c.certification.area == *code
  })
}

fn pairs(requirements: &[AreaRequirement]) -> impl Iterator<Item = AreaGap> + '_ {
  requirements.iter().flat_map(|r| {
    r.areas
      .iter()
      .map(|code| AreaGap { category: r.category, code: code.clone() })
  })
}

/// Required areas that no held certification satisfies, in requirement
/// order. A certification satisfies a requirement when it was passed, has
/// not expired, and its area code equals the required one.
pub fn find_gaps(
  requirements: &[AreaRequirement],
  held: &[ResolvedCertification],
) -> Vec<AreaGap> {
  pairs(requirements)
    .filter(|gap| covering(&gap.code, held).next().is_none())
    .collect()
}

/// Required areas that are covered, but only by certifications inside the
/// expiry warning window.
pub fn find_expiring(
  requirements: &[AreaRequirement],
  held: &[ResolvedCertification],
) -> Vec<AreaGap> {
  pairs(requirements)
    .filter(|gap| {
      let mut covers = covering(&gap.code, held).peekable();
      covers.peek().is_some()
        && covers.all(|c| c.status == CertificationStatus::ExpiringSoon)
    })
    .collect()
}

// ─── Per-personnel analysis ──────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
  Low,
  Medium,
  High,
  Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonnelCompliance {
  pub personnel_id:       Uuid,
  pub person_id:          Uuid,
  pub full_name:          String,
  pub organization_id:    Option<Uuid>,
  pub position_id:        Uuid,
  /// Whether a matrix row exists for the organisation and position.
  pub has_matrix:         bool,
  pub required:           Vec<AreaGap>,
  pub missing:            Vec<AreaGap>,
  pub expiring:           Vec<AreaGap>,
  pub completion_percent: u8,
  pub has_all_required:   bool,
  pub risk_level:         RiskLevel,
}

/// `part / total` as a rounded percentage; zero when `total` is zero.
fn percent(part: usize, total: usize) -> u8 {
  if total == 0 {
    return 0;
  }
  ((part * 100 + total / 2) / total).min(100) as u8
}

fn risk(covered: usize, total: usize) -> RiskLevel {
  if covered >= total {
    RiskLevel::Low
  } else if covered * 100 < total * 50 {
    RiskLevel::Critical
  } else if covered * 100 < total * 75 {
    RiskLevel::High
  } else {
    RiskLevel::Medium
  }
}

/// Analyse one personnel record. `held` must be the certifications of
/// `person`. Without a matrix nothing is known to be required, so the
/// record counts as incomplete but low-risk.
pub fn analyze_personnel(
  personnel: &Personnel,
  person: &Person,
  matrix: Option<&CompetencyMatrix>,
  held: &[ResolvedCertification],
) -> PersonnelCompliance {
  let mut result = PersonnelCompliance {
    personnel_id:       personnel.id,
    person_id:          person.id,
    full_name:          person.full_name(),
    organization_id:    personnel.organization_id,
    position_id:        personnel.position_id,
    has_matrix:         matrix.is_some(),
    required:           Vec::new(),
    missing:            Vec::new(),
    expiring:           Vec::new(),
    completion_percent: 0,
    has_all_required:   false,
    risk_level:         RiskLevel::Low,
  };
  let Some(matrix) = matrix else {
    return result;
  };

  let requirements = &matrix.required_areas;
  result.required = pairs(requirements).collect();
  result.missing = find_gaps(requirements, held);
  result.expiring = find_expiring(requirements, held);

  let total = result.required.len();
  let covered = total - result.missing.len();
  result.completion_percent =
    if total == 0 { 100 } else { percent(covered, total) };
  result.has_all_required = result.missing.is_empty();
  result.risk_level = risk(covered, total);
  result
}

// ─── Tenant-wide report ──────────────────────────────────────────────────────

/// Everything [`analyze`] looks at, typically one tenant's records.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisInput<'a> {
  pub personnel:      &'a [Personnel],
  pub people:         &'a [Person],
  pub organizations:  &'a [Organization],
  pub matrices:       &'a [CompetencyMatrix],
  pub certifications: &'a [ResolvedCertification],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationBreakdown {
  pub organization_id:   Uuid,
  pub organization_name: String,
  pub total:             usize,
  pub compliant:         usize,
  pub compliance_rate:   u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingArea {
  pub code:  AreaCode,
  pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
  pub category:     CertificationCategory,
  pub required:     usize,
  pub missing:      usize,
  /// Up to five codes missing most often, ties broken by code.
  pub most_missing: Vec<MissingArea>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetencyGapReport {
  pub total_personnel: usize,
  pub compliant:       usize,
  pub non_compliant:   usize,
  pub critical_risk:   usize,
  pub high_risk:       usize,
  pub compliance_rate: u8,
  pub by_organization: Vec<OrganizationBreakdown>,
  pub by_category:     Vec<CategoryBreakdown>,
  pub personnel:       Vec<PersonnelCompliance>,
}

const MOST_MISSING: usize = 5;

#[derive(Default)]
struct CategoryTally {
  required: usize,
  missing:  HashMap<AreaCode, usize>,
}

/// Analyse every active personnel record attached to a known organisation.
pub fn analyze(input: AnalysisInput<'_>) -> CompetencyGapReport {
  let people: HashMap<Uuid, &Person> =
    input.people.iter().map(|p| (p.id, p)).collect();
  let mut held: HashMap<Uuid, Vec<ResolvedCertification>> = HashMap::new();
  for cert in input.certifications {
    held
      .entry(cert.certification.person_id)
      .or_default()
      .push(cert.clone());
  }

  let mut analysed = Vec::new();
  for personnel in input.personnel.iter().filter(|p| p.is_active()) {
    let Some(org_id) = personnel.organization_id else { continue };
    if !input.organizations.iter().any(|o| o.id == org_id) {
      continue;
    }
    let Some(person) = people.get(&personnel.person_id) else { continue };
    let matrix = input
      .matrices
      .iter()
      .find(|m| m.applies_to(org_id, personnel.position_id));
    let certs = held.get(&person.id).map(Vec::as_slice).unwrap_or_default();
    analysed.push(analyze_personnel(personnel, person, matrix, certs));
  }

  let total = analysed.len();
  let compliant = analysed.iter().filter(|p| p.has_all_required).count();

  let by_organization = input
    .organizations
    .iter()
    .filter_map(|org| {
      let members: Vec<_> = analysed
        .iter()
        .filter(|p| p.organization_id == Some(org.id))
        .collect();
      if members.is_empty() {
        return None;
      }
      let ok = members.iter().filter(|p| p.has_all_required).count();
      Some(OrganizationBreakdown {
        organization_id:   org.id,
        organization_name: org.name.clone(),
        total:             members.len(),
        compliant:         ok,
        compliance_rate:   percent(ok, members.len()),
      })
    })
    .collect();

  let mut tallies: BTreeMap<CertificationCategory, CategoryTally> =
    BTreeMap::new();
  for p in &analysed {
    for gap in &p.required {
      tallies.entry(gap.category).or_default().required += 1;
    }
    for gap in &p.missing {
      *tallies
        .entry(gap.category)
        .or_default()
        .missing
        .entry(gap.code.clone())
        .or_default() += 1;
    }
  }
  let by_category = tallies
    .into_iter()
    .map(|(category, tally)| {
      let mut most_missing: Vec<MissingArea> = tally
        .missing
        .into_iter()
        .map(|(code, count)| MissingArea { code, count })
        .collect();
      most_missing
        .sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.code.cmp(&b.code)));
      let missing = most_missing.iter().map(|m| m.count).sum();
      most_missing.truncate(MOST_MISSING);
      CategoryBreakdown {
        category,
        required: tally.required,
        missing,
        most_missing,
      }
    })
    .collect();

  CompetencyGapReport {
    total_personnel: total,
    compliant,
    non_compliant: total - compliant,
    critical_risk: analysed
      .iter()
      .filter(|p| p.risk_level == RiskLevel::Critical)
      .count(),
    high_risk: analysed
      .iter()
      .filter(|p| p.risk_level == RiskLevel::High)
      .count(),
    compliance_rate: percent(compliant, total),
    by_organization,
    by_category,
    personnel: analysed,
  }
}

// ─── Calendar ────────────────────────────────────────────────────────────────

/// Certifications that have not expired on `today` and expire within
/// `within_days`, soonest first.
pub fn upcoming(
  certs: impl IntoIterator<Item = Certification>,
  today: NaiveDate,
  within_days: u32,
  policy: &ExpiryPolicy,
) -> Vec<ResolvedCertification> {
  let mut out: Vec<_> = certs
    .into_iter()
    .map(|c| c.resolve(today, policy))
    .filter(|c| (0..=i64::from(within_days)).contains(&c.days_until_expiry))
    .collect();
  out.sort_by(|a, b| {
    a.certification
      .expiry_date
      .cmp(&b.certification.expiry_date)
      .then_with(|| a.certification.id.cmp(&b.certification.id))
  });
  out
}
