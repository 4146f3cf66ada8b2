//! # Fallback Policy
//!
//! Runs every operation on the primary data path and, if that fails, runs the
//! same operation once on the fallback path. No operation spans both paths.

use crate::{
    errors::RepoError,
    providers::db::repository::Repository,
    types::{
        Appointment, AppointmentWithLead, AssignableLead, CalendarLink, CallAttempt, CallerDetail,
        CallerProfile, CallerSummary, Lead, LeadDetail, LeadFilter, LeadScope, LeadStatus,
        LeadSummary, LeadUpdate, MetricsSource, NewAppointment, NewCallAttempt, NewLead,
        ProfileUpdate, Script, ScriptInput, TaggedLead,
    },
};
use async_trait::async_trait;
use core_access::{AccessError, Role, User, UserStore};
use futures::future::BoxFuture;
use std::{fmt::Display, sync::Arc};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct FallbackRepository {
    primary: Arc<dyn Repository>,
    fallback: Option<Arc<dyn Repository>>,
}

impl FallbackRepository {
    pub fn new(primary: Arc<dyn Repository>, fallback: Option<Arc<dyn Repository>>) -> Self {
        Self { primary, fallback }
    }

    async fn with_fallback<'a, T, E, F>(&'a self, operation: &str, call: F) -> Result<T, E>
    where
        F: Fn(&'a dyn Repository) -> BoxFuture<'a, Result<T, E>>,
        E: Display,
    {
        match call(self.primary.as_ref()).await {
            Ok(value) => Ok(value),
            Err(primary_err) => match &self.fallback {
                Some(fallback) => {
                    warn!(
                        operation,
                        primary = self.primary.name(),
                        fallback = fallback.name(),
                        "Primary data path failed, retrying on fallback: {primary_err}"
                    );
                    call(fallback.as_ref()).await
                }
                None => Err(primary_err),
            },
        }
    }
}

#[async_trait]
impl UserStore for FallbackRepository {
    async fn find_user(&self, id: &str) -> Result<Option<User>, AccessError> {
        self.with_fallback("find_user", |repo| repo.find_user(id)).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AccessError> {
        self.with_fallback("find_user_by_email", |repo| repo.find_user_by_email(email))
            .await
    }

    async fn insert_user(&self, user: &User) -> Result<User, AccessError> {
        self.with_fallback("insert_user", |repo| repo.insert_user(user))
            .await
    }
}

#[async_trait]
impl Repository for FallbackRepository {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn update_user_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, RepoError> {
        self.with_fallback("update_user_profile", |repo| {
            repo.update_user_profile(id, update)
        })
        .await
    }

    async fn set_user_role(&self, id: &str, role: Role) -> Result<Option<User>, RepoError> {
        self.with_fallback("set_user_role", |repo| repo.set_user_role(id, role))
            .await
    }

    async fn insert_lead(&self, lead: &NewLead) -> Result<Lead, RepoError> {
        self.with_fallback("insert_lead", |repo| repo.insert_lead(lead))
            .await
    }

    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<LeadSummary>, RepoError> {
        self.with_fallback("list_leads", |repo| repo.list_leads(filter))
            .await
    }

    async fn get_lead(&self, id: i64, scope: &LeadScope) -> Result<Option<LeadDetail>, RepoError> {
        self.with_fallback("get_lead", |repo| repo.get_lead(id, scope))
            .await
    }

    async fn update_lead(
        &self,
        id: i64,
        scope: &LeadScope,
        update: &LeadUpdate,
    ) -> Result<Option<TaggedLead>, RepoError> {
        self.with_fallback("update_lead", |repo| repo.update_lead(id, scope, update))
            .await
    }

    async fn assign_lead(&self, id: i64, caller_id: Option<&str>) -> Result<Option<Lead>, RepoError> {
        self.with_fallback("assign_lead", |repo| repo.assign_lead(id, caller_id))
            .await
    }

    async fn delete_lead(&self, id: i64) -> Result<Option<Lead>, RepoError> {
        self.with_fallback("delete_lead", |repo| repo.delete_lead(id))
            .await
    }

    async fn rename_specialty(&self, from: &str, to: &str) -> Result<u64, RepoError> {
        self.with_fallback("rename_specialty", |repo| repo.rename_specialty(from, to))
            .await
    }

    async fn log_call(
        &self,
        lead_id: i64,
        caller_id: &str,
        call: &NewCallAttempt,
        status: Option<LeadStatus>,
    ) -> Result<Option<CallAttempt>, RepoError> {
        self.with_fallback("log_call", |repo| {
            repo.log_call(lead_id, caller_id, call, status)
        })
        .await
    }

    async fn create_appointment(
        &self,
        caller_id: &str,
        appointment: &NewAppointment,
    ) -> Result<Option<(Appointment, Lead)>, RepoError> {
        self.with_fallback("create_appointment", |repo| {
            repo.create_appointment(caller_id, appointment)
        })
        .await
    }

    async fn link_calendar_event(
        &self,
        appointment_id: i64,
        link: &CalendarLink,
    ) -> Result<Option<Appointment>, RepoError> {
        self.with_fallback("link_calendar_event", |repo| {
            repo.link_calendar_event(appointment_id, link)
        })
        .await
    }

    async fn list_appointments(
        &self,
        caller_id: &str,
    ) -> Result<Vec<AppointmentWithLead>, RepoError> {
        self.with_fallback("list_appointments", |repo| repo.list_appointments(caller_id))
            .await
    }

    async fn find_script(&self, specialty: &str) -> Result<Option<Script>, RepoError> {
        self.with_fallback("find_script", |repo| repo.find_script(specialty))
            .await
    }

    async fn list_scripts(&self) -> Result<Vec<Script>, RepoError> {
        self.with_fallback("list_scripts", |repo| repo.list_scripts())
            .await
    }

    async fn upsert_script(&self, input: &ScriptInput) -> Result<Script, RepoError> {
        self.with_fallback("upsert_script", |repo| repo.upsert_script(input))
            .await
    }

    async fn list_callers(&self) -> Result<Vec<CallerSummary>, RepoError> {
        self.with_fallback("list_callers", |repo| repo.list_callers())
            .await
    }

    async fn get_caller(&self, id: &str) -> Result<Option<CallerDetail>, RepoError> {
        self.with_fallback("get_caller", |repo| repo.get_caller(id))
            .await
    }

    async fn save_caller_profile(
        &self,
        id: &str,
        profile: &CallerProfile,
    ) -> Result<Option<User>, RepoError> {
        self.with_fallback("save_caller_profile", |repo| {
            repo.save_caller_profile(id, profile)
        })
        .await
    }

    async fn list_assignable_leads(&self) -> Result<Vec<AssignableLead>, RepoError> {
        self.with_fallback("list_assignable_leads", |repo| repo.list_assignable_leads())
            .await
    }

    async fn metrics_source(&self) -> Result<MetricsSource, RepoError> {
        self.with_fallback("metrics_source", |repo| repo.metrics_source())
            .await
    }
}
