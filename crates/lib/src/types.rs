//! # Data Model
//!
//! Records shared by every component and by both data paths. Field names
//! match column names, so rows from the managed client deserialize directly.

use chrono::{DateTime, Utc};
use core_access::User;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

// --- Leads ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    AppointmentBooked,
    NotInterested,
    FollowUp,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::AppointmentBooked => "appointment_booked",
            LeadStatus::NotInterested => "not_interested",
            LeadStatus::FollowUp => "follow_up",
        }
    }

    /// The status a logged call outcome moves its lead to, if any.
    ///
    /// Only three outcomes carry a transition and each maps to the status of
    /// the same name. Every other outcome leaves the lead untouched.
    pub fn from_outcome(outcome: &str) -> Option<LeadStatus> {
        match outcome {
            "appointment_booked" => Some(LeadStatus::AppointmentBooked),
            "not_interested" => Some(LeadStatus::NotInterested),
            "contacted" => Some(LeadStatus::Contacted),
            _ => None,
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "appointment_booked" => Ok(LeadStatus::AppointmentBooked),
            "not_interested" => Ok(LeadStatus::NotInterested),
            "follow_up" => Ok(LeadStatus::FollowUp),
            other => Err(format!("unknown lead status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lead {
    pub id: i64,
    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub specialty: String,
    pub status: LeadStatus,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub assigned_caller_id: Option<String>,
    pub data_completeness_score: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// 20 points for each populated contact field, 0 to 100.
    pub fn completeness_score(&self) -> i64 {
        completeness_score([
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.phone.as_deref(),
            self.email.as_deref(),
            self.notes.as_deref(),
        ])
    }
}

pub fn completeness_score(fields: [Option<&str>; 5]) -> i64 {
    fields
        .iter()
        .filter(|f| f.is_some_and(|v| !v.trim().is_empty()))
        .count() as i64
        * 20
}

/// Splits a full name at its first whitespace run.
///
/// The first token becomes the first name and everything after it the last
/// name, so `"Dr. Jane Doe"` yields `("Dr.", "Jane Doe")`.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedLead {
    #[serde(flatten)]
    pub lead: Lead,
    pub tags: Vec<Tag>,
}

/// A lead as it appears in list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadSummary {
    #[serde(flatten)]
    pub lead: Lead,
    pub tags: Vec<Tag>,
    pub call_count: i64,
    pub last_call_at: Option<DateTime<Utc>>,
    pub appointment_count: i64,
    pub caller_name: Option<String>,
    pub caller_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadDetail {
    #[serde(flatten)]
    pub lead: Lead,
    pub tags: Vec<Tag>,
    /// Newest first.
    pub call_attempts: Vec<CallAttempt>,
    /// Newest first.
    pub appointments: Vec<Appointment>,
}

/// One row of a bulk import, as uploaded.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ImportRow {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub assigned_caller_id: Option<String>,
}

/// A validated lead ready for insertion.
#[derive(Debug, Clone, Serialize)]
pub struct NewLead {
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub specialty: String,
    pub assigned_caller_id: Option<String>,
}

/// Which leads a request may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadScope {
    /// Only leads assigned to this caller.
    Owner(String),
    /// Any lead (admin).
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerFilter {
    Caller(String),
    Unassigned,
}

impl CallerFilter {
    /// Parses the admin query value, where `unassigned` is a sentinel.
    pub fn parse(value: &str) -> Self {
        if value == "unassigned" {
            CallerFilter::Unassigned
        } else {
            CallerFilter::Caller(value.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeadOrder {
    #[default]
    RecentlyUpdated,
    RecentlyCreated,
}

#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub caller: Option<CallerFilter>,
    pub status: Option<LeadStatus>,
    pub specialty: Option<String>,
    /// Case-insensitive substring of `full_name` or `notes`.
    pub search: Option<String>,
    /// Applied by the lead registry after the repository query returns.
    pub tag: Option<String>,
    pub order: LeadOrder,
}

/// A partial update; only supplied fields change.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LeadUpdate {
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub specialty: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub status: Option<LeadStatus>,
    /// Replaces the whole tag set when present.
    pub tags: Option<Vec<String>>,
}

impl LeadUpdate {
    /// Column/value pairs for the scalar fields that were supplied, trimmed.
    /// A blank value comes out empty and clears its column.
    pub fn column_values(&self) -> Vec<(&'static str, String)> {
        let mut columns = Vec::new();
        let text_fields = [
            ("full_name", &self.full_name),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("specialty", &self.specialty),
            ("phone", &self.phone),
            ("email", &self.email),
            ("notes", &self.notes),
        ];
        for (column, value) in text_fields {
            if let Some(value) = value {
                columns.push((column, value.trim().to_string()));
            }
        }
        if let Some(status) = self.status {
            columns.push(("status", status.as_str().to_string()));
        }
        columns
    }

    /// Tag names with blanks and duplicates removed, in first-seen order.
    pub fn normalized_tags(&self) -> Option<Vec<String>> {
        self.tags.as_ref().map(|tags| {
            let mut seen = Vec::new();
            for tag in tags {
                let tag = tag.trim();
                if !tag.is_empty() && !seen.iter().any(|s: &String| s == tag) {
                    seen.push(tag.to_string());
                }
            }
            seen
        })
    }
}

// --- Call log ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallAttempt {
    pub id: i64,
    pub lead_id: i64,
    pub caller_id: String,
    pub outcome: String,
    pub notes: Option<String>,
    pub interest_level: Option<i64>,
    pub appointment_likelihood: Option<i64>,
    pub decision_maker_reached: Option<bool>,
    pub call_control: Option<i64>,
    pub objection_handling: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewCallAttempt {
    #[serde(default)]
    pub outcome: String,
    pub notes: Option<String>,
    pub interest_level: Option<i64>,
    pub appointment_likelihood: Option<i64>,
    pub decision_maker_reached: Option<bool>,
    pub call_control: Option<i64>,
    pub objection_handling: Option<i64>,
}

// --- Appointments ---

pub const APPOINTMENT_SCHEDULED: &str = "scheduled";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: i64,
    pub lead_id: i64,
    pub caller_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub google_calendar_event_id: Option<String>,
    pub google_meet_link: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub lead_id: i64,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentWithLead {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub full_name: String,
    pub specialty: String,
    pub lead_email: Option<String>,
    pub lead_phone: Option<String>,
}

/// The calendar event recorded against an appointment after booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarLink {
    pub event_id: String,
    pub meet_link: Option<String>,
}

// --- Scripts ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Script {
    /// `None` for the built-in placeholder.
    pub id: Option<i64>,
    pub specialty: String,
    pub opening_line: Option<String>,
    pub qualification: Option<String>,
    pub talking_points: Option<String>,
    pub objection_handling: Option<String>,
    pub closing_line: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScriptInput {
    #[serde(default)]
    pub specialty: String,
    pub opening_line: Option<String>,
    pub qualification: Option<String>,
    pub talking_points: Option<String>,
    pub objection_handling: Option<String>,
    pub closing_line: Option<String>,
}

// --- Callers ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerSummary {
    #[serde(flatten)]
    pub user: User,
    pub leads_count: i64,
    pub scripts_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerDetail {
    #[serde(flatten)]
    pub user: User,
    pub scripts: Vec<Script>,
    pub leads_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignableLead {
    pub id: i64,
    pub full_name: String,
    pub specialty: String,
    pub status: LeadStatus,
}

/// Bulk assignment filter. A lead must match every non-empty list.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LeadCategories {
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub statuses: Vec<LeadStatus>,
}

impl LeadCategories {
    pub fn is_empty(&self) -> bool {
        self.specialties.is_empty() && self.statuses.is_empty()
    }

    pub fn matches(&self, specialty: &str, status: LeadStatus) -> bool {
        (self.specialties.is_empty() || self.specialties.iter().any(|s| s == specialty))
            && (self.statuses.is_empty() || self.statuses.contains(&status))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LeadAssignment {
    #[default]
    Unchanged,
    ByIds(Vec<i64>),
    ByCategory(LeadCategories),
}

impl LeadAssignment {
    /// Categories win over explicit ids when they name anything.
    pub fn resolve(lead_ids: Option<Vec<i64>>, categories: Option<LeadCategories>) -> Self {
        match (categories, lead_ids) {
            (Some(categories), _) if !categories.is_empty() => LeadAssignment::ByCategory(categories),
            (_, Some(ids)) => LeadAssignment::ByIds(ids),
            _ => LeadAssignment::Unchanged,
        }
    }
}

/// What a caller-profile save writes. Script ids, when present, replace the
/// existing set.
#[derive(Debug, Clone, Default)]
pub struct CallerProfile {
    pub name: Option<String>,
    pub script_ids: Option<Vec<i64>>,
    pub leads: LeadAssignment,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

// --- Metrics inputs ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadFacts {
    pub id: i64,
    pub specialty: String,
    pub status: LeadStatus,
    pub assigned_caller_id: Option<String>,
    pub data_completeness_score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallFacts {
    pub lead_id: i64,
    pub outcome: String,
    pub interest_level: Option<i64>,
    pub appointment_likelihood: Option<i64>,
}

/// Everything the metrics aggregator scans, fetched in one operation.
#[derive(Debug, Clone, Default)]
pub struct MetricsSource {
    pub leads: Vec<LeadFacts>,
    pub calls: Vec<CallFacts>,
    pub callers: Vec<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_full_name_on_first_whitespace_run() {
        assert_eq!(
            split_full_name("Dr. Jane Doe"),
            ("Dr.".to_string(), "Jane Doe".to_string())
        );
        assert_eq!(
            split_full_name("  Maria   Papadopoulou "),
            ("Maria".to_string(), "Papadopoulou".to_string())
        );
        assert_eq!(split_full_name("Cher"), ("Cher".to_string(), String::new()));
    }

    #[test]
    fn test_completeness_counts_non_empty_fields() {
        assert_eq!(completeness_score([None; 5]), 0);
        assert_eq!(
            completeness_score([Some("A"), Some("B"), Some(""), Some("  "), None]),
            40
        );
        assert_eq!(completeness_score([Some("x"); 5]), 100);
    }

    #[test]
    fn test_update_values_are_trimmed_and_blanks_clear() {
        let update = LeadUpdate {
            phone: Some("  +30 210 0000000 ".into()),
            notes: Some("   ".into()),
            status: Some(LeadStatus::Contacted),
            ..Default::default()
        };
        assert_eq!(
            update.column_values(),
            vec![
                ("phone", "+30 210 0000000".to_string()),
                ("notes", String::new()),
                ("status", "contacted".to_string()),
            ]
        );
    }

    #[test]
    fn test_outcome_transitions_mirror_status_names() {
        assert_eq!(
            LeadStatus::from_outcome("appointment_booked"),
            Some(LeadStatus::AppointmentBooked)
        );
        assert_eq!(
            LeadStatus::from_outcome("not_interested"),
            Some(LeadStatus::NotInterested)
        );
        assert_eq!(LeadStatus::from_outcome("contacted"), Some(LeadStatus::Contacted));
        assert_eq!(LeadStatus::from_outcome("voicemail"), None);
        assert_eq!(LeadStatus::from_outcome("follow_up"), None);
    }

    #[test]
    fn test_lead_assignment_prefers_categories() {
        let categories = LeadCategories {
            specialties: vec!["Cardiology".into()],
            statuses: vec![],
        };
        assert_eq!(
            LeadAssignment::resolve(Some(vec![1, 2]), Some(categories.clone())),
            LeadAssignment::ByCategory(categories)
        );
        assert_eq!(
            LeadAssignment::resolve(Some(vec![1, 2]), Some(LeadCategories::default())),
            LeadAssignment::ByIds(vec![1, 2])
        );
        assert_eq!(LeadAssignment::resolve(None, None), LeadAssignment::Unchanged);
    }

    #[test]
    fn test_categories_require_every_named_dimension() {
        let categories = LeadCategories {
            specialties: vec!["Cardiology".into()],
            statuses: vec![LeadStatus::New],
        };
        assert!(categories.matches("Cardiology", LeadStatus::New));
        assert!(!categories.matches("Cardiology", LeadStatus::Contacted));
        assert!(!categories.matches("Dermatology", LeadStatus::New));
    }

    #[test]
    fn test_normalized_tags_drop_blanks_and_duplicates() {
        let update = LeadUpdate {
            tags: Some(vec!["A".into(), " B ".into(), "A".into(), "".into()]),
            ..Default::default()
        };
        assert_eq!(update.normalized_tags(), Some(vec!["A".to_string(), "B".to_string()]));
    }
}
