//! # API Payloads
//!
//! Request and response bodies that exist only at the HTTP boundary. Domain
//! records are serialized as they are.

use callboard::{
    leads::ImportOutcome,
    providers::calendar::CalendarCredentials,
    types::{CallerFilter, ImportRow, Lead, LeadFilter, LeadOrder, LeadStatus},
    CrmError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query string accepted by both lead lists.
#[derive(Debug, Deserialize, Default)]
pub struct LeadListQuery {
    #[serde(default)]
    pub caller_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

impl LeadListQuery {
    /// Builds the repository filter. Empty values are treated as absent.
    pub fn into_filter(self, order: LeadOrder) -> Result<LeadFilter, CrmError> {
        let present = |value: Option<String>| value.filter(|v| !v.is_empty());
        let status = present(self.status)
            .map(|s| s.parse::<LeadStatus>())
            .transpose()
            .map_err(CrmError::Validation)?;
        Ok(LeadFilter {
            caller: present(self.caller_id).map(|c| CallerFilter::parse(&c)),
            status,
            specialty: present(self.specialty),
            search: present(self.search),
            tag: present(self.tag),
            order,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub leads: Vec<ImportRow>,
    /// Applied to rows that carry no `assigned_caller_id` of their own.
    #[serde(default)]
    pub caller_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub leads: Vec<Lead>,
    pub skipped: usize,
}

impl From<ImportOutcome> for ImportResponse {
    fn from(outcome: ImportOutcome) -> Self {
        Self {
            success: true,
            leads: outcome.leads,
            skipped: outcome.skipped,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AssignRequest {
    /// `null` or empty unassigns the lead.
    #[serde(default)]
    pub caller_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct NormalizeRequest {
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NormalizeResponse {
    pub updated: u64,
}

#[derive(Debug, Deserialize)]
pub struct BookingPayload {
    pub lead_id: i64,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl BookingPayload {
    /// Calendar credentials exist only when an access token was sent.
    pub fn credentials(&self) -> Option<CalendarCredentials> {
        self.access_token
            .as_ref()
            .filter(|t| !t.is_empty())
            .map(|access_token| CalendarCredentials {
                access_token: access_token.clone(),
                refresh_token: self.refresh_token.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_query_parses_sentinel_and_status() {
        let query = LeadListQuery {
            caller_id: Some("unassigned".into()),
            status: Some("follow_up".into()),
            specialty: Some(String::new()),
            ..Default::default()
        };
        let filter = query.into_filter(LeadOrder::RecentlyCreated).unwrap();
        assert_eq!(filter.caller, Some(CallerFilter::Unassigned));
        assert_eq!(filter.status, Some(LeadStatus::FollowUp));
        assert_eq!(filter.specialty, None);
        assert_eq!(filter.order, LeadOrder::RecentlyCreated);
    }

    #[test]
    fn test_unknown_status_is_a_validation_error() {
        let query = LeadListQuery {
            status: Some("won".into()),
            ..Default::default()
        };
        let err = query.into_filter(LeadOrder::default()).unwrap_err();
        assert!(matches!(err, CrmError::Validation(_)));
    }

    #[test]
    fn test_credentials_require_access_token() {
        let payload: BookingPayload = serde_json::from_value(serde_json::json!({
            "lead_id": 1,
            "scheduled_at": "2030-01-15T10:00:00Z",
            "refresh_token": "r"
        }))
        .unwrap();
        assert!(payload.credentials().is_none());
    }
}
