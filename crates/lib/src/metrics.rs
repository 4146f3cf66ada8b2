//! # Metrics Aggregator
//!
//! Read-only rollups over leads and call attempts for the admin dashboard.
//! Every figure is computed here from a [`MetricsSource`] snapshot.

use crate::{
    errors::CrmError,
    providers::db::repository::Repository,
    specialty::SpecialtyRules,
    types::{CallFacts, LeadFacts, LeadStatus, MetricsSource},
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Leads at or above this completeness score count as enriched.
pub const ENRICHED_SCORE: i64 = 60;

const CONTACTED_OUTCOME: &str = "contacted";

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct OverallMetrics {
    pub total_leads: usize,
    pub appointments_booked: usize,
    pub total_calls: usize,
    pub calls_contacted: usize,
    pub leads_enriched: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CallerMetrics {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub leads_assigned: usize,
    pub appointments_booked: usize,
    pub calls_made: usize,
    pub calls_contacted: usize,
    /// `None` when no call carries a rating.
    pub avg_interest_level: Option<f64>,
    pub avg_appointment_likelihood: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpecialtyMetrics {
    pub specialty: String,
    pub total_leads: usize,
    pub appointments_booked: usize,
    pub total_calls: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsReport {
    pub overall: OverallMetrics,
    pub callers: Vec<CallerMetrics>,
    pub specialties: Vec<SpecialtyMetrics>,
}

fn is_booked(lead: &LeadFacts) -> bool {
    lead.status == LeadStatus::AppointmentBooked
}

fn is_contacted(call: &CallFacts) -> bool {
    call.outcome == CONTACTED_OUTCOME
}

/// Mean of the present values, rounded to two decimals.
fn average(values: impl Iterator<Item = Option<i64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .fold((0i64, 0u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| (sum as f64 / f64::from(count) * 100.0).round() / 100.0)
}

/// Computes every rollup. Specialty names matching the regional-variant
/// denylist are left out of the specialty breakdown only.
pub fn aggregate(source: &MetricsSource, rules: &SpecialtyRules) -> MetricsReport {
    let mut calls_by_lead: HashMap<i64, Vec<&CallFacts>> = HashMap::new();
    for call in &source.calls {
        calls_by_lead.entry(call.lead_id).or_default().push(call);
    }
    let calls_for = |lead: &LeadFacts| calls_by_lead.get(&lead.id).map_or(0, Vec::len);

    let overall = OverallMetrics {
        total_leads: source.leads.len(),
        appointments_booked: source.leads.iter().filter(|l| is_booked(l)).count(),
        total_calls: source.calls.len(),
        calls_contacted: source.calls.iter().filter(|c| is_contacted(c)).count(),
        leads_enriched: source
            .leads
            .iter()
            .filter(|l| l.data_completeness_score >= ENRICHED_SCORE)
            .count(),
    };

    let callers = source
        .callers
        .iter()
        .map(|caller| {
            let leads: Vec<&LeadFacts> = source
                .leads
                .iter()
                .filter(|l| l.assigned_caller_id.as_deref() == Some(caller.id.as_str()))
                .collect();
            let calls: Vec<&CallFacts> = leads
                .iter()
                .filter_map(|l| calls_by_lead.get(&l.id))
                .flatten()
                .copied()
                .collect();
            CallerMetrics {
                id: caller.id.clone(),
                name: caller.name.clone(),
                email: caller.email.clone(),
                leads_assigned: leads.len(),
                appointments_booked: leads.iter().filter(|l| is_booked(l)).count(),
                calls_made: calls.len(),
                calls_contacted: calls.iter().filter(|c| is_contacted(c)).count(),
                avg_interest_level: average(calls.iter().map(|c| c.interest_level)),
                avg_appointment_likelihood: average(
                    calls.iter().map(|c| c.appointment_likelihood),
                ),
            }
        })
        .collect();

    let mut by_specialty: BTreeMap<&str, SpecialtyMetrics> = BTreeMap::new();
    for lead in source
        .leads
        .iter()
        .filter(|l| !rules.is_regional_variant(&l.specialty))
    {
        let entry = by_specialty
            .entry(lead.specialty.as_str())
            .or_insert_with(|| SpecialtyMetrics {
                specialty: lead.specialty.clone(),
                total_leads: 0,
                appointments_booked: 0,
                total_calls: 0,
            });
        entry.total_leads += 1;
        entry.appointments_booked += usize::from(is_booked(lead));
        entry.total_calls += calls_for(lead);
    }
    let mut specialties: Vec<SpecialtyMetrics> = by_specialty.into_values().collect();
    // Stable sort keeps names ascending within equal counts.
    specialties.sort_by(|a, b| b.appointments_booked.cmp(&a.appointments_booked));

    MetricsReport {
        overall,
        callers,
        specialties,
    }
}

pub async fn compute_metrics(repo: &dyn Repository) -> Result<MetricsReport, CrmError> {
    let rules = SpecialtyRules::new()?;
    let source = repo.metrics_source().await?;
    Ok(aggregate(&source, &rules))
}
