use crate::{
    errors::RepoError,
    types::{
        Appointment, AppointmentWithLead, AssignableLead, CalendarLink, CallAttempt, CallerDetail,
        CallerProfile, CallerSummary, Lead, LeadDetail, LeadFilter, LeadScope, LeadStatus,
        LeadSummary, LeadUpdate, MetricsSource, NewAppointment, NewCallAttempt, NewLead,
        ProfileUpdate, Script, ScriptInput, TaggedLead,
    },
};
use async_trait::async_trait;
use core_access::{Role, User, UserStore};
use std::fmt::Debug;

/// Every persistence operation the CRM performs.
///
/// Operations that are scoped to an owner return `Ok(None)` when the target
/// does not exist or belongs to someone else; callers turn that into a
/// not-found error without revealing which case applied.
#[async_trait]
pub trait Repository: UserStore + Debug {
    /// Returns the name of the data path (e.g., "SQLite", "REST").
    fn name(&self) -> &str;

    // --- Users ---

    async fn update_user_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, RepoError>;

    async fn set_user_role(&self, id: &str, role: Role) -> Result<Option<User>, RepoError>;

    // --- Leads ---

    async fn insert_lead(&self, lead: &NewLead) -> Result<Lead, RepoError>;

    /// Lists leads matching the filter's caller, status, specialty, and search
    /// fields. The tag filter is left to the caller.
    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<LeadSummary>, RepoError>;

    async fn get_lead(&self, id: i64, scope: &LeadScope) -> Result<Option<LeadDetail>, RepoError>;

    /// Applies the supplied fields, replaces the tag set if given, and
    /// recomputes the completeness score.
    async fn update_lead(
        &self,
        id: i64,
        scope: &LeadScope,
        update: &LeadUpdate,
    ) -> Result<Option<TaggedLead>, RepoError>;

    async fn assign_lead(&self, id: i64, caller_id: Option<&str>) -> Result<Option<Lead>, RepoError>;

    /// Deletes the lead along with its tags, calls, and appointments.
    async fn delete_lead(&self, id: i64) -> Result<Option<Lead>, RepoError>;

    /// Rewrites every lead with specialty `from` to `to`, returning the count.
    async fn rename_specialty(&self, from: &str, to: &str) -> Result<u64, RepoError>;

    // --- Call log ---

    /// Records a call on a lead owned by `caller_id` and applies the status
    /// transition, if any.
    async fn log_call(
        &self,
        lead_id: i64,
        caller_id: &str,
        call: &NewCallAttempt,
        status: Option<LeadStatus>,
    ) -> Result<Option<CallAttempt>, RepoError>;

    // --- Appointments ---

    /// Inserts a `scheduled` appointment on a lead owned by `caller_id`.
    async fn create_appointment(
        &self,
        caller_id: &str,
        appointment: &NewAppointment,
    ) -> Result<Option<(Appointment, Lead)>, RepoError>;

    async fn link_calendar_event(
        &self,
        appointment_id: i64,
        link: &CalendarLink,
    ) -> Result<Option<Appointment>, RepoError>;

    /// The caller's appointments, latest `scheduled_at` first.
    async fn list_appointments(&self, caller_id: &str)
        -> Result<Vec<AppointmentWithLead>, RepoError>;

    // --- Scripts ---

    async fn find_script(&self, specialty: &str) -> Result<Option<Script>, RepoError>;

    async fn list_scripts(&self) -> Result<Vec<Script>, RepoError>;

    async fn upsert_script(&self, input: &ScriptInput) -> Result<Script, RepoError>;

    // --- Callers ---

    async fn list_callers(&self) -> Result<Vec<CallerSummary>, RepoError>;

    async fn get_caller(&self, id: &str) -> Result<Option<CallerDetail>, RepoError>;

    /// Writes the caller's name, replaces their script set, and reassigns
    /// leads as the profile describes. Returns `None` if `id` is not a caller.
    async fn save_caller_profile(
        &self,
        id: &str,
        profile: &CallerProfile,
    ) -> Result<Option<User>, RepoError>;

    async fn list_assignable_leads(&self) -> Result<Vec<AssignableLead>, RepoError>;

    // --- Metrics ---

    async fn metrics_source(&self) -> Result<MetricsSource, RepoError>;
}
