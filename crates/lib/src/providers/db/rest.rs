//! # Managed Database Client
//!
//! The data path for a hosted database. Talks to a PostgREST-style API
//! (`/rest/v1/<table>`) in front of the callboard schema, composing joins and
//! aggregates in process from table-level calls.

use crate::{
    errors::RepoError,
    providers::db::{repository::Repository, sqlite::rows::timestamp_string},
    types::{
        Appointment, AppointmentWithLead, AssignableLead, CalendarLink, CallAttempt, CallFacts,
        CallerDetail, CallerFilter, CallerProfile, CallerSummary, Lead, LeadAssignment,
        LeadDetail, LeadFacts, LeadFilter, LeadOrder, LeadScope, LeadStatus, LeadSummary,
        LeadUpdate, MetricsSource, NewAppointment, NewCallAttempt, NewLead, ProfileUpdate, Script,
        ScriptInput, Tag, TaggedLead, APPOINTMENT_SCHEDULED,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_access::{AccessError, Role, User, UserStore};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::{debug, info};

type Query = Vec<(&'static str, String)>;

#[derive(Deserialize)]
struct IdRow {
    id: i64,
}

#[derive(Deserialize)]
struct LeadTagRow {
    lead_id: i64,
    tag_id: i64,
}

#[derive(Deserialize)]
struct CallStampRow {
    lead_id: i64,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct LeadRefRow {
    lead_id: i64,
}

#[derive(Deserialize)]
struct AssignedRow {
    assigned_caller_id: Option<String>,
}

#[derive(Deserialize)]
struct CallerScriptRow {
    caller_id: String,
    script_id: i64,
}

/// A client for the managed database's REST interface.
#[derive(Clone, Debug)]
pub struct RestRepository {
    client: ReqwestClient,
    rest_url: String,
    api_key: String,
}

impl RestRepository {
    /// Creates a client for the project at `rest_url` (without the
    /// `/rest/v1` suffix).
    pub fn new(rest_url: String, api_key: String) -> Result<Self, RepoError> {
        let client = ReqwestClient::builder().build()?;
        Ok(Self {
            client,
            rest_url,
            api_key,
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{table}", self.rest_url.trim_end_matches('/'));
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RepoError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RepoError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: Query) -> Result<Vec<T>, RepoError> {
        debug!(table, ?query, "--> Managed database select");
        self.send(self.request(Method::GET, table).query(&query)).await
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        mut query: Query,
    ) -> Result<Option<T>, RepoError> {
        query.push(("limit", "1".to_string()));
        Ok(self.select(table, query).await?.into_iter().next())
    }

    async fn insert<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<Vec<T>, RepoError> {
        self.send(
            self.request(Method::POST, table)
                .header("Prefer", "return=representation")
                .json(body),
        )
        .await
    }

    /// Inserts or merges on the natural key `on_conflict`.
    async fn upsert<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        table: &str,
        on_conflict: &str,
        resolution: &str,
        body: &B,
    ) -> Result<Vec<T>, RepoError> {
        self.send(
            self.request(Method::POST, table)
                .query(&[("on_conflict", on_conflict)])
                .header("Prefer", format!("resolution={resolution},return=representation"))
                .json(body),
        )
        .await
    }

    async fn update<T: DeserializeOwned>(
        &self,
        table: &str,
        query: Query,
        body: &Value,
    ) -> Result<Vec<T>, RepoError> {
        self.send(
            self.request(Method::PATCH, table)
                .query(&query)
                .header("Prefer", "return=representation")
                .json(body),
        )
        .await
    }

    async fn delete(&self, table: &str, query: Query) -> Result<(), RepoError> {
        let response = self.request(Method::DELETE, table).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RepoError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    fn lead_query(id: i64, scope: &LeadScope) -> Query {
        let mut query = vec![("id", eq(id))];
        if let LeadScope::Owner(caller_id) = scope {
            query.push(("assigned_caller_id", eq(caller_id)));
        }
        query
    }

    async fn fetch_lead(&self, id: i64, scope: &LeadScope) -> Result<Option<Lead>, RepoError> {
        self.select_one("leads", Self::lead_query(id, scope)).await
    }

    async fn fetch_caller(&self, id: &str) -> Result<Option<User>, RepoError> {
        self.select_one(
            "users",
            vec![("id", eq(id)), ("role", eq(Role::Caller.as_str()))],
        )
        .await
    }

    async fn tags_for(&self, lead_ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>, RepoError> {
        let mut by_lead: HashMap<i64, Vec<Tag>> = HashMap::new();
        if lead_ids.is_empty() {
            return Ok(by_lead);
        }
        let links: Vec<LeadTagRow> = self
            .select(
                "lead_tags",
                vec![("select", "lead_id,tag_id".into()), ("lead_id", in_list(lead_ids))],
            )
            .await?;
        if links.is_empty() {
            return Ok(by_lead);
        }
        let tag_ids: Vec<i64> = links.iter().map(|l| l.tag_id).collect();
        let tags: HashMap<i64, Tag> = self
            .select::<Tag>(
                "tags",
                vec![("id", in_list(&tag_ids)), ("order", "name".into())],
            )
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        for link in links {
            if let Some(tag) = tags.get(&link.tag_id) {
                by_lead.entry(link.lead_id).or_default().push(tag.clone());
            }
        }
        for tags in by_lead.values_mut() {
            tags.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(by_lead)
    }

    async fn replace_tags(&self, lead_id: i64, names: &[String]) -> Result<(), RepoError> {
        self.delete("lead_tags", vec![("lead_id", eq(lead_id))]).await?;
        for name in names {
            let existing: Option<IdRow> =
                self.select_one("tags", vec![("select", "id".into()), ("name", eq(name))]).await?;
            let tag_id = match existing {
                Some(row) => row.id,
                None => self
                    .insert::<IdRow, _>("tags", &json!({ "name": name }))
                    .await?
                    .into_iter()
                    .next()
                    .map(|row| row.id)
                    .ok_or_else(|| RepoError::DataIntegrity(format!("tag '{name}' not created")))?,
            };
            self.insert::<Value, _>("lead_tags", &json!({ "lead_id": lead_id, "tag_id": tag_id }))
                .await?;
        }
        Ok(())
    }

    async fn count_assigned_leads(&self) -> Result<HashMap<String, i64>, RepoError> {
        let rows: Vec<AssignedRow> = self
            .select(
                "leads",
                vec![
                    ("select", "assigned_caller_id".into()),
                    ("assigned_caller_id", "not.is.null".into()),
                ],
            )
            .await?;
        let mut counts = HashMap::new();
        for caller_id in rows.into_iter().filter_map(|r| r.assigned_caller_id) {
            *counts.entry(caller_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn list_callers_ordered(&self) -> Result<Vec<User>, RepoError> {
        self.select(
            "users",
            vec![
                ("role", eq(Role::Caller.as_str())),
                ("order", "name.asc.nullsfirst,email.asc.nullsfirst".into()),
            ],
        )
        .await
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn in_list(ids: &[i64]) -> String {
    format!(
        "in.({})",
        ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
    )
}

fn in_quoted(values: &[&str]) -> String {
    format!(
        "in.({})",
        values.iter().map(|v| quoted(v)).collect::<Vec<_>>().join(",")
    )
}

/// A double-quoted filter value, so reserved characters like `,` `(` `)`
/// stay part of it.
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// An `or` filter matching `term` as a literal, case-insensitive substring of
/// any of `columns`. Every punctuation character is escaped for the regex
/// operator, so `*`, `%`, `_` and `.` match only themselves.
fn contains_any(columns: &[&str], term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() * 2);
    for c in term.chars() {
        if !c.is_alphanumeric() && !c.is_whitespace() {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    let value = quoted(&pattern);
    format!(
        "({})",
        columns
            .iter()
            .map(|column| format!("{column}.imatch.{value}"))
            .collect::<Vec<_>>()
            .join(",")
    )
}

/// Empty strings clear a nullable column.
fn clearable(value: &str) -> Value {
    if value.is_empty() {
        Value::Null
    } else {
        Value::String(value.to_string())
    }
}

fn first<T>(rows: Vec<T>, what: &str) -> Result<T, RepoError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| RepoError::DataIntegrity(format!("{what} returned no row")))
}

#[async_trait]
impl UserStore for RestRepository {
    async fn find_user(&self, id: &str) -> Result<Option<User>, AccessError> {
        Ok(self.select_one("users", vec![("id", eq(id))]).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AccessError> {
        Ok(self
            .select_one("users", vec![("email", format!("ilike.{email}"))])
            .await?)
    }

    async fn insert_user(&self, user: &User) -> Result<User, AccessError> {
        let body = json!({
            "id": user.id,
            "email": user.email,
            "name": user.name,
            "role": user.role,
            "created_at": timestamp_string(&user.created_at),
        });
        self.upsert::<Value, _>("users", "id", "ignore-duplicates", &body)
            .await?;
        self.find_user(&user.id)
            .await?
            .ok_or_else(|| AccessError::UserPersistenceFailed(user.id.clone()))
    }
}

#[async_trait]
impl Repository for RestRepository {
    fn name(&self) -> &str {
        "REST"
    }

    async fn update_user_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, RepoError> {
        let mut body = Map::new();
        if let Some(name) = &update.name {
            body.insert("name".into(), clearable(name));
        }
        if let Some(email) = &update.email {
            body.insert("email".into(), clearable(email));
        }
        if body.is_empty() {
            return self.select_one("users", vec![("id", eq(id))]).await;
        }
        Ok(self
            .update::<User>("users", vec![("id", eq(id))], &Value::Object(body))
            .await?
            .into_iter()
            .next())
    }

    async fn set_user_role(&self, id: &str, role: Role) -> Result<Option<User>, RepoError> {
        Ok(self
            .update::<User>("users", vec![("id", eq(id))], &json!({ "role": role }))
            .await?
            .into_iter()
            .next())
    }

    async fn insert_lead(&self, lead: &NewLead) -> Result<Lead, RepoError> {
        let now = timestamp_string(&Utc::now());
        let score = crate::types::completeness_score([
            Some(lead.first_name.as_str()),
            Some(lead.last_name.as_str()),
            None,
            None,
            None,
        ]);
        let body = json!({
            "full_name": lead.full_name,
            "first_name": clearable(&lead.first_name),
            "last_name": clearable(&lead.last_name),
            "specialty": lead.specialty,
            "status": LeadStatus::New,
            "assigned_caller_id": lead.assigned_caller_id,
            "data_completeness_score": score,
            "created_at": now,
            "updated_at": now,
        });
        first(self.insert("leads", &body).await?, "lead insert")
    }

    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<LeadSummary>, RepoError> {
        let mut query: Query = Vec::new();
        match &filter.caller {
            Some(CallerFilter::Caller(caller_id)) => query.push(("assigned_caller_id", eq(caller_id))),
            Some(CallerFilter::Unassigned) => query.push(("assigned_caller_id", "is.null".into())),
            None => {}
        }
        if let Some(status) = filter.status {
            query.push(("status", eq(status.as_str())));
        }
        if let Some(specialty) = &filter.specialty {
            query.push(("specialty", eq(specialty)));
        }
        if let Some(search) = &filter.search {
            query.push(("or", contains_any(&["full_name", "notes"], search)));
        }
        query.push((
            "order",
            match filter.order {
                LeadOrder::RecentlyUpdated => "updated_at.desc,id.desc",
                LeadOrder::RecentlyCreated => "created_at.desc,id.desc",
            }
            .into(),
        ));

        let leads: Vec<Lead> = self.select("leads", query).await?;
        if leads.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = leads.iter().map(|l| l.id).collect();
        let mut tags = self.tags_for(&ids).await?;

        let mut call_stats: HashMap<i64, (i64, Option<DateTime<Utc>>)> = HashMap::new();
        let stamps: Vec<CallStampRow> = self
            .select(
                "call_attempts",
                vec![("select", "lead_id,created_at".into()), ("lead_id", in_list(&ids))],
            )
            .await?;
        for stamp in stamps {
            let entry = call_stats.entry(stamp.lead_id).or_insert((0, None));
            entry.0 += 1;
            entry.1 = entry.1.max(Some(stamp.created_at));
        }

        let mut appointment_counts: HashMap<i64, i64> = HashMap::new();
        let refs: Vec<LeadRefRow> = self
            .select(
                "appointments",
                vec![("select", "lead_id".into()), ("lead_id", in_list(&ids))],
            )
            .await?;
        for r in refs {
            *appointment_counts.entry(r.lead_id).or_insert(0) += 1;
        }

        let caller_ids: Vec<&str> = leads
            .iter()
            .filter_map(|l| l.assigned_caller_id.as_deref())
            .collect();
        let callers: HashMap<String, User> = if caller_ids.is_empty() {
            HashMap::new()
        } else {
            self.select::<User>("users", vec![("id", in_quoted(&caller_ids))])
                .await?
                .into_iter()
                .map(|u| (u.id.clone(), u))
                .collect()
        };

        Ok(leads
            .into_iter()
            .map(|lead| {
                let (call_count, last_call_at) =
                    call_stats.get(&lead.id).cloned().unwrap_or((0, None));
                let caller = lead
                    .assigned_caller_id
                    .as_ref()
                    .and_then(|id| callers.get(id));
                LeadSummary {
                    tags: tags.remove(&lead.id).unwrap_or_default(),
                    call_count,
                    last_call_at,
                    appointment_count: appointment_counts.get(&lead.id).copied().unwrap_or(0),
                    caller_name: caller.and_then(|u| u.name.clone()),
                    caller_email: caller.and_then(|u| u.email.clone()),
                    lead,
                }
            })
            .collect())
    }

    async fn get_lead(&self, id: i64, scope: &LeadScope) -> Result<Option<LeadDetail>, RepoError> {
        let Some(lead) = self.fetch_lead(id, scope).await? else {
            return Ok(None);
        };
        let tags = self.tags_for(&[id]).await?.remove(&id).unwrap_or_default();
        let call_attempts = self
            .select(
                "call_attempts",
                vec![("lead_id", eq(id)), ("order", "created_at.desc,id.desc".into())],
            )
            .await?;
        let appointments = self
            .select(
                "appointments",
                vec![("lead_id", eq(id)), ("order", "created_at.desc,id.desc".into())],
            )
            .await?;
        Ok(Some(LeadDetail {
            lead,
            tags,
            call_attempts,
            appointments,
        }))
    }

    async fn update_lead(
        &self,
        id: i64,
        scope: &LeadScope,
        update: &LeadUpdate,
    ) -> Result<Option<TaggedLead>, RepoError> {
        if self.fetch_lead(id, scope).await?.is_none() {
            return Ok(None);
        }

        let columns = update.column_values();
        if !columns.is_empty() {
            let mut body = Map::new();
            for (column, value) in &columns {
                body.insert((*column).to_string(), clearable(value));
            }
            body.insert(
                "updated_at".into(),
                Value::String(timestamp_string(&Utc::now())),
            );
            self.update::<Value>("leads", vec![("id", eq(id))], &Value::Object(body))
                .await?;
        }

        if let Some(tags) = update.normalized_tags() {
            self.replace_tags(id, &tags).await?;
        }

        let lead = self
            .fetch_lead(id, &LeadScope::Any)
            .await?
            .ok_or_else(|| RepoError::DataIntegrity(format!("lead {id} vanished during update")))?;
        let lead: Lead = first(
            self.update(
                "leads",
                vec![("id", eq(id))],
                &json!({
                    "data_completeness_score": lead.completeness_score(),
                    "updated_at": timestamp_string(&Utc::now()),
                }),
            )
            .await?,
            "lead score update",
        )?;
        let tags = self.tags_for(&[id]).await?.remove(&id).unwrap_or_default();
        Ok(Some(TaggedLead { lead, tags }))
    }

    async fn assign_lead(&self, id: i64, caller_id: Option<&str>) -> Result<Option<Lead>, RepoError> {
        Ok(self
            .update::<Lead>(
                "leads",
                vec![("id", eq(id))],
                &json!({
                    "assigned_caller_id": caller_id,
                    "updated_at": timestamp_string(&Utc::now()),
                }),
            )
            .await?
            .into_iter()
            .next())
    }

    async fn delete_lead(&self, id: i64) -> Result<Option<Lead>, RepoError> {
        let Some(lead) = self.fetch_lead(id, &LeadScope::Any).await? else {
            return Ok(None);
        };
        for table in ["lead_tags", "call_attempts", "appointments"] {
            self.delete(table, vec![("lead_id", eq(id))]).await?;
        }
        self.delete("leads", vec![("id", eq(id))]).await?;
        info!(lead_id = id, "Deleted lead and its dependent rows.");
        Ok(Some(lead))
    }

    async fn rename_specialty(&self, from: &str, to: &str) -> Result<u64, RepoError> {
        let changed: Vec<IdRow> = self
            .update(
                "leads",
                vec![("specialty", eq(from))],
                &json!({ "specialty": to, "updated_at": timestamp_string(&Utc::now()) }),
            )
            .await?;
        Ok(changed.len() as u64)
    }

    async fn log_call(
        &self,
        lead_id: i64,
        caller_id: &str,
        call: &NewCallAttempt,
        status: Option<LeadStatus>,
    ) -> Result<Option<CallAttempt>, RepoError> {
        let owner = LeadScope::Owner(caller_id.to_string());
        if self.fetch_lead(lead_id, &owner).await?.is_none() {
            return Ok(None);
        }
        let now = timestamp_string(&Utc::now());
        let body = json!({
            "lead_id": lead_id,
            "caller_id": caller_id,
            "outcome": call.outcome,
            "notes": call.notes,
            "interest_level": call.interest_level,
            "appointment_likelihood": call.appointment_likelihood,
            "decision_maker_reached": call.decision_maker_reached,
            "call_control": call.call_control,
            "objection_handling": call.objection_handling,
            "created_at": now,
        });
        let attempt: CallAttempt = first(self.insert("call_attempts", &body).await?, "call insert")?;

        if let Some(status) = status {
            self.update::<Value>(
                "leads",
                vec![("id", eq(lead_id))],
                &json!({ "status": status, "updated_at": now }),
            )
            .await?;
        }
        Ok(Some(attempt))
    }

    async fn create_appointment(
        &self,
        caller_id: &str,
        appointment: &NewAppointment,
    ) -> Result<Option<(Appointment, Lead)>, RepoError> {
        let owner = LeadScope::Owner(caller_id.to_string());
        let Some(lead) = self.fetch_lead(appointment.lead_id, &owner).await? else {
            return Ok(None);
        };
        let body = json!({
            "lead_id": appointment.lead_id,
            "caller_id": caller_id,
            "scheduled_at": timestamp_string(&appointment.scheduled_at),
            "notes": appointment.notes,
            "status": APPOINTMENT_SCHEDULED,
            "created_at": timestamp_string(&Utc::now()),
        });
        let created: Appointment =
            first(self.insert("appointments", &body).await?, "appointment insert")?;
        Ok(Some((created, lead)))
    }

    async fn link_calendar_event(
        &self,
        appointment_id: i64,
        link: &CalendarLink,
    ) -> Result<Option<Appointment>, RepoError> {
        Ok(self
            .update::<Appointment>(
                "appointments",
                vec![("id", eq(appointment_id))],
                &json!({
                    "google_calendar_event_id": link.event_id,
                    "google_meet_link": link.meet_link,
                }),
            )
            .await?
            .into_iter()
            .next())
    }

    async fn list_appointments(
        &self,
        caller_id: &str,
    ) -> Result<Vec<AppointmentWithLead>, RepoError> {
        let appointments: Vec<Appointment> = self
            .select(
                "appointments",
                vec![
                    ("caller_id", eq(caller_id)),
                    ("order", "scheduled_at.desc,id.desc".into()),
                ],
            )
            .await?;
        if appointments.is_empty() {
            return Ok(Vec::new());
        }
        let lead_ids: Vec<i64> = appointments.iter().map(|a| a.lead_id).collect();
        let leads: HashMap<i64, Lead> = self
            .select::<Lead>("leads", vec![("id", in_list(&lead_ids))])
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();

        Ok(appointments
            .into_iter()
            .filter_map(|appointment| {
                let lead = leads.get(&appointment.lead_id)?;
                Some(AppointmentWithLead {
                    full_name: lead.full_name.clone(),
                    specialty: lead.specialty.clone(),
                    lead_email: lead.email.clone(),
                    lead_phone: lead.phone.clone(),
                    appointment,
                })
            })
            .collect())
    }

    async fn find_script(&self, specialty: &str) -> Result<Option<Script>, RepoError> {
        self.select_one("scripts", vec![("specialty", eq(specialty))])
            .await
    }

    async fn list_scripts(&self) -> Result<Vec<Script>, RepoError> {
        self.select("scripts", vec![("order", "specialty".into())])
            .await
    }

    async fn upsert_script(&self, input: &ScriptInput) -> Result<Script, RepoError> {
        let body = json!({
            "specialty": input.specialty,
            "opening_line": input.opening_line,
            "qualification": input.qualification,
            "talking_points": input.talking_points,
            "objection_handling": input.objection_handling,
            "closing_line": input.closing_line,
            "updated_at": timestamp_string(&Utc::now()),
        });
        first(
            self.upsert("scripts", "specialty", "merge-duplicates", &body)
                .await?,
            "script upsert",
        )
    }

    async fn list_callers(&self) -> Result<Vec<CallerSummary>, RepoError> {
        let callers = self.list_callers_ordered().await?;
        let leads = self.count_assigned_leads().await?;
        let assignments: Vec<CallerScriptRow> = self
            .select("caller_scripts", vec![("select", "caller_id,script_id".into())])
            .await?;
        let mut scripts: HashMap<String, i64> = HashMap::new();
        for row in assignments {
            *scripts.entry(row.caller_id).or_insert(0) += 1;
        }

        Ok(callers
            .into_iter()
            .map(|user| CallerSummary {
                leads_count: leads.get(&user.id).copied().unwrap_or(0),
                scripts_count: scripts.get(&user.id).copied().unwrap_or(0),
                user,
            })
            .collect())
    }

    async fn get_caller(&self, id: &str) -> Result<Option<CallerDetail>, RepoError> {
        let Some(user) = self.fetch_caller(id).await? else {
            return Ok(None);
        };
        let assignments: Vec<CallerScriptRow> = self
            .select(
                "caller_scripts",
                vec![("select", "caller_id,script_id".into()), ("caller_id", eq(id))],
            )
            .await?;
        let scripts = if assignments.is_empty() {
            Vec::new()
        } else {
            let script_ids: Vec<i64> = assignments.iter().map(|a| a.script_id).collect();
            self.select(
                "scripts",
                vec![("id", in_list(&script_ids)), ("order", "specialty".into())],
            )
            .await?
        };
        let leads_count = self
            .count_assigned_leads()
            .await?
            .get(id)
            .copied()
            .unwrap_or(0);
        Ok(Some(CallerDetail {
            user,
            scripts,
            leads_count,
        }))
    }

    async fn save_caller_profile(
        &self,
        id: &str,
        profile: &CallerProfile,
    ) -> Result<Option<User>, RepoError> {
        if self.fetch_caller(id).await?.is_none() {
            return Ok(None);
        }

        if let Some(name) = &profile.name {
            self.update::<Value>("users", vec![("id", eq(id))], &json!({ "name": clearable(name) }))
                .await?;
        }

        if let Some(script_ids) = &profile.script_ids {
            self.delete("caller_scripts", vec![("caller_id", eq(id))])
                .await?;
            let mut unique: Vec<i64> = Vec::new();
            for script_id in script_ids {
                if !unique.contains(script_id) {
                    unique.push(*script_id);
                }
            }
            if !unique.is_empty() {
                let rows: Vec<Value> = unique
                    .iter()
                    .map(|script_id| json!({ "caller_id": id, "script_id": script_id }))
                    .collect();
                self.insert::<Value, _>("caller_scripts", &rows).await?;
            }
        }

        let assignment = json!({
            "assigned_caller_id": id,
            "updated_at": timestamp_string(&Utc::now()),
        });
        match &profile.leads {
            LeadAssignment::Unchanged => {}
            LeadAssignment::ByIds(lead_ids) => {
                for lead_id in lead_ids {
                    self.update::<Value>("leads", vec![("id", eq(lead_id))], &assignment)
                        .await?;
                }
            }
            LeadAssignment::ByCategory(categories) => {
                let mut query: Query = Vec::new();
                if !categories.specialties.is_empty() {
                    let specialties: Vec<&str> =
                        categories.specialties.iter().map(String::as_str).collect();
                    query.push(("specialty", in_quoted(&specialties)));
                }
                if !categories.statuses.is_empty() {
                    let statuses: Vec<&str> =
                        categories.statuses.iter().map(LeadStatus::as_str).collect();
                    query.push(("status", in_quoted(&statuses)));
                }
                let assigned: Vec<IdRow> = self.update("leads", query, &assignment).await?;
                info!(caller_id = %id, assigned = assigned.len(), "Assigned leads by category.");
            }
        }

        self.select_one("users", vec![("id", eq(id))]).await
    }

    async fn list_assignable_leads(&self) -> Result<Vec<AssignableLead>, RepoError> {
        self.select(
            "leads",
            vec![
                ("select", "id,full_name,specialty,status".into()),
                ("order", "full_name,id".into()),
            ],
        )
        .await
    }

    async fn metrics_source(&self) -> Result<MetricsSource, RepoError> {
        let leads: Vec<LeadFacts> = self
            .select(
                "leads",
                vec![(
                    "select",
                    "id,specialty,status,assigned_caller_id,data_completeness_score".into(),
                )],
            )
            .await?;
        let calls: Vec<CallFacts> = self
            .select(
                "call_attempts",
                vec![(
                    "select",
                    "lead_id,outcome,interest_level,appointment_likelihood".into(),
                )],
            )
            .await?;
        let callers = self.list_callers_ordered().await?;
        Ok(MetricsSource {
            leads,
            calls,
            callers,
        })
    }
}
