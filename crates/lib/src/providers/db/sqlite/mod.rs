use crate::{
    errors::RepoError,
    providers::db::repository::Repository,
    types::{
        completeness_score, Appointment, AppointmentWithLead, AssignableLead, CalendarLink,
        CallAttempt, CallFacts, CallerDetail, CallerFilter, CallerProfile, CallerSummary, Lead,
        LeadAssignment, LeadDetail, LeadFacts, LeadFilter, LeadOrder, LeadScope, LeadStatus,
        LeadSummary, LeadUpdate, MetricsSource, NewAppointment, NewCallAttempt, NewLead,
        ProfileUpdate, Script, ScriptInput, Tag, TaggedLead, APPOINTMENT_SCHEDULED,
    },
};
use async_trait::async_trait;
use core_access::{AccessError, Role, User, UserStore};
use std::{
    collections::HashMap,
    fmt::{self, Debug},
};
use tracing::{debug, info};
use turso::{Connection, Database, Row, Value as TursoValue};

pub mod rows;
pub mod sql;

use rows::{int, opt_int, opt_text, opt_timestamp, text};
use rows::{opt_bool_param, opt_int_param, opt_text_param, text_param};
use sql::{
    placeholders, APPOINTMENT_COLUMNS, CALL_ATTEMPT_COLUMNS, LEAD_COLUMNS, SCRIPT_COLUMNS,
    USER_COLUMNS,
};

/// Direct SQL against a local database accessed through Turso.
///
/// [`SqliteProvider::new`] keeps one `Database` instance for every call; clones
/// share it, so an in-memory instance can be shared across tests by cloning
/// one provider. [`SqliteProvider::per_call`] is the fallback client for the
/// same file: it opens the database afresh for each operation and so never
/// depends on a long-lived handle.
#[derive(Clone)]
pub struct SqliteProvider {
    handle: Handle,
}

#[derive(Clone)]
enum Handle {
    Shared(Database),
    PerCall(String),
}

impl SqliteProvider {
    /// Opens (or creates) the database at `db_path`. Use ":memory:" for a
    /// unique, isolated in-memory database.
    pub async fn new(db_path: &str) -> Result<Self, RepoError> {
        let db = turso::Builder::new_local(db_path).build().await?;

        // Use `query` for PRAGMA statements that return a value to avoid "unexpected row" errors.
        let conn = db.connect()?;
        conn.query("PRAGMA journal_mode=WAL;", ()).await?;

        Ok(Self {
            handle: Handle::Shared(db),
        })
    }

    /// A client for the database file at `db_path` that opens it for every
    /// operation. In-memory paths are rejected, since each open would see a
    /// different empty database.
    pub fn per_call(db_path: &str) -> Result<Self, RepoError> {
        if db_path.trim().is_empty() || db_path.starts_with(":memory:") {
            return Err(RepoError::Config(format!(
                "per-call connections need a database file, got '{db_path}'"
            )));
        }
        Ok(Self {
            handle: Handle::PerCall(db_path.to_string()),
        })
    }

    /// Ensures that all required application tables and indexes exist.
    /// This function is idempotent and safe to call on every application startup.
    pub async fn initialize_schema(&self) -> Result<(), RepoError> {
        let conn = self.connect().await?;
        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }
        info!("SQLite schema is ready.");
        Ok(())
    }

    /// A helper for tests to pre-populate data by executing multiple SQL statements.
    pub async fn initialize_with_data(&self, init_sql: &str) -> Result<(), RepoError> {
        let conn = self.connect().await?;
        for statement in init_sql.split(';').filter(|s| !s.trim().is_empty()) {
            conn.execute(statement, ()).await?;
        }
        Ok(())
    }

    async fn connect(&self) -> Result<Connection, RepoError> {
        match &self.handle {
            Handle::Shared(db) => Ok(db.connect()?),
            Handle::PerCall(path) => {
                let db = turso::Builder::new_local(path).build().await?;
                Ok(db.connect()?)
            }
        }
    }

    async fn fetch_user(&self, conn: &Connection, id: &str) -> Result<Option<User>, RepoError> {
        fetch_optional(
            conn,
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
            vec![text_param(id)],
            |row| rows::user(row, 0),
        )
        .await
    }

    async fn fetch_caller(&self, conn: &Connection, id: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .fetch_user(conn, id)
            .await?
            .filter(|user| user.role == Role::Caller))
    }

    async fn fetch_lead(
        &self,
        conn: &Connection,
        id: i64,
        scope: &LeadScope,
    ) -> Result<Option<Lead>, RepoError> {
        let mut sql = format!("SELECT {LEAD_COLUMNS} FROM leads l WHERE l.id = ?");
        let mut params = vec![TursoValue::Integer(id)];
        if let LeadScope::Owner(caller_id) = scope {
            sql.push_str(" AND l.assigned_caller_id = ?");
            params.push(text_param(caller_id));
        }
        fetch_optional(conn, &sql, params, |row| rows::lead(row, 0)).await
    }

    async fn tags_for(
        &self,
        conn: &Connection,
        lead_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Tag>>, RepoError> {
        let mut by_lead: HashMap<i64, Vec<Tag>> = HashMap::new();
        if lead_ids.is_empty() {
            return Ok(by_lead);
        }
        let sql = format!(
            "SELECT lt.lead_id, t.id, t.name, t.color
             FROM lead_tags lt
             JOIN tags t ON t.id = lt.tag_id
             WHERE lt.lead_id IN ({})
             ORDER BY t.name",
            placeholders(lead_ids.len())
        );
        let tagged = fetch_all(conn, &sql, int_params(lead_ids), |row| {
            Ok((int(row, 0)?, rows::tag(row, 1)?))
        })
        .await?;
        for (lead_id, tag) in tagged {
            by_lead.entry(lead_id).or_default().push(tag);
        }
        Ok(by_lead)
    }

    async fn fetch_call_attempt(
        &self,
        conn: &Connection,
        id: i64,
    ) -> Result<Option<CallAttempt>, RepoError> {
        fetch_optional(
            conn,
            &format!("SELECT {CALL_ATTEMPT_COLUMNS} FROM call_attempts WHERE id = ?"),
            vec![TursoValue::Integer(id)],
            rows::call_attempt,
        )
        .await
    }

    async fn fetch_appointment(
        &self,
        conn: &Connection,
        id: i64,
    ) -> Result<Option<Appointment>, RepoError> {
        fetch_optional(
            conn,
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = ?"),
            vec![TursoValue::Integer(id)],
            rows::appointment,
        )
        .await
    }

    async fn fetch_script(
        &self,
        conn: &Connection,
        specialty: &str,
    ) -> Result<Option<Script>, RepoError> {
        fetch_optional(
            conn,
            &format!("SELECT {SCRIPT_COLUMNS} FROM scripts s WHERE s.specialty = ?"),
            vec![text_param(specialty)],
            rows::script,
        )
        .await
    }

    /// Replaces the lead's tag set, creating unknown tags on demand.
    async fn replace_tags(
        &self,
        conn: &Connection,
        lead_id: i64,
        names: &[String],
    ) -> Result<(), RepoError> {
        conn.execute(
            "DELETE FROM lead_tags WHERE lead_id = ?",
            vec![TursoValue::Integer(lead_id)],
        )
        .await?;

        for name in names {
            conn.execute(
                "INSERT INTO tags (name) VALUES (?) ON CONFLICT(name) DO NOTHING",
                vec![text_param(name)],
            )
            .await?;
            let tag_id = fetch_optional(
                conn,
                "SELECT id FROM tags WHERE name = ?",
                vec![text_param(name)],
                |row| int(row, 0),
            )
            .await?
            .ok_or_else(|| RepoError::DataIntegrity(format!("tag '{name}' vanished")))?;
            conn.execute(
                "INSERT INTO lead_tags (lead_id, tag_id) VALUES (?, ?)",
                vec![TursoValue::Integer(lead_id), TursoValue::Integer(tag_id)],
            )
            .await?;
        }
        Ok(())
    }

    async fn count_by(
        &self,
        conn: &Connection,
        sql: &str,
    ) -> Result<HashMap<String, i64>, RepoError> {
        let counts = fetch_all(conn, sql, Vec::new(), |row| Ok((text(row, 0)?, int(row, 1)?))).await?;
        Ok(counts.into_iter().collect())
    }
}

impl Debug for SqliteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteProvider")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

async fn fetch_all<T, F>(
    conn: &Connection,
    sql: &str,
    params: Vec<TursoValue>,
    decode: F,
) -> Result<Vec<T>, RepoError>
where
    F: Fn(&Row) -> Result<T, RepoError>,
{
    debug!(sql = %sql, "--> Executing SQLite query");
    let mut results = conn.query(sql, params).await?;
    let mut out = Vec::new();
    while let Some(row) = results.next().await? {
        out.push(decode(&row)?);
    }
    Ok(out)
}

async fn fetch_optional<T, F>(
    conn: &Connection,
    sql: &str,
    params: Vec<TursoValue>,
    decode: F,
) -> Result<Option<T>, RepoError>
where
    F: Fn(&Row) -> Result<T, RepoError>,
{
    let mut results = conn.query(sql, params).await?;
    match results.next().await? {
        Some(row) => Ok(Some(decode(&row)?)),
        None => Ok(None),
    }
}

/// Runs an `INSERT ... RETURNING id` and yields the new row id.
async fn insert_returning_id(
    conn: &Connection,
    sql: &str,
    params: Vec<TursoValue>,
) -> Result<i64, RepoError> {
    fetch_optional(conn, sql, params, |row| int(row, 0))
        .await?
        .ok_or_else(|| RepoError::DataIntegrity("insert returned no id".to_string()))
}

fn int_params(ids: &[i64]) -> Vec<TursoValue> {
    ids.iter().map(|id| TursoValue::Integer(*id)).collect()
}

/// Empty strings clear a nullable column.
fn clearable(value: &str) -> TursoValue {
    if value.is_empty() {
        TursoValue::Null
    } else {
        text_param(value)
    }
}

#[async_trait]
impl UserStore for SqliteProvider {
    async fn find_user(&self, id: &str) -> Result<Option<User>, AccessError> {
        let conn = self.connect().await?;
        Ok(self.fetch_user(&conn, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AccessError> {
        let conn = self.connect().await?;
        Ok(fetch_optional(
            &conn,
            &format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER(?)"),
            vec![text_param(email)],
            |row| rows::user(row, 0),
        )
        .await?)
    }

    async fn insert_user(&self, user: &User) -> Result<User, AccessError> {
        let conn = self.connect().await?;
        conn.execute(
            "INSERT INTO users (id, email, name, role, created_at) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
            vec![
                text_param(&user.id),
                opt_text_param(user.email.as_deref()),
                opt_text_param(user.name.as_deref()),
                text_param(user.role.as_str()),
                text_param(&rows::timestamp_string(&user.created_at)),
            ],
        )
        .await
        .map_err(RepoError::from)?;
        self.fetch_user(&conn, &user.id)
            .await?
            .ok_or_else(|| AccessError::UserPersistenceFailed(user.id.clone()))
    }
}

#[async_trait]
impl Repository for SqliteProvider {
    fn name(&self) -> &str {
        match self.handle {
            Handle::Shared(_) => "SQLite",
            Handle::PerCall(_) => "SQLite (per-call)",
        }
    }

    async fn update_user_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, RepoError> {
        let conn = self.connect().await?;
        let mut sets = Vec::new();
        let mut params = Vec::new();
        if let Some(name) = &update.name {
            sets.push("name = ?");
            params.push(clearable(name));
        }
        if let Some(email) = &update.email {
            sets.push("email = ?");
            params.push(clearable(email));
        }
        if !sets.is_empty() {
            params.push(text_param(id));
            let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
            conn.execute(&sql, params).await?;
        }
        self.fetch_user(&conn, id).await
    }

    async fn set_user_role(&self, id: &str, role: Role) -> Result<Option<User>, RepoError> {
        let conn = self.connect().await?;
        conn.execute(
            "UPDATE users SET role = ? WHERE id = ?",
            vec![text_param(role.as_str()), text_param(id)],
        )
        .await?;
        self.fetch_user(&conn, id).await
    }

    async fn insert_lead(&self, lead: &NewLead) -> Result<Lead, RepoError> {
        let conn = self.connect().await?;
        let now = rows::now();
        let score = completeness_score([
            Some(lead.first_name.as_str()),
            Some(lead.last_name.as_str()),
            None,
            None,
            None,
        ]);
        let id = insert_returning_id(
            &conn,
            "INSERT INTO leads (full_name, first_name, last_name, specialty, status,
                assigned_caller_id, data_completeness_score, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
            vec![
                text_param(&lead.full_name),
                clearable(&lead.first_name),
                clearable(&lead.last_name),
                text_param(&lead.specialty),
                text_param(LeadStatus::New.as_str()),
                opt_text_param(lead.assigned_caller_id.as_deref()),
                TursoValue::Integer(score),
                text_param(&now),
                text_param(&now),
            ],
        )
        .await?;
        self.fetch_lead(&conn, id, &LeadScope::Any)
            .await?
            .ok_or_else(|| RepoError::DataIntegrity(format!("lead {id} missing after insert")))
    }

    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<LeadSummary>, RepoError> {
        let conn = self.connect().await?;
        let mut sql = format!(
            "SELECT {LEAD_COLUMNS}, u.name, u.email
             FROM leads l
             LEFT JOIN users u ON u.id = l.assigned_caller_id
             WHERE 1 = 1"
        );
        let mut params: Vec<TursoValue> = Vec::new();

        match &filter.caller {
            Some(CallerFilter::Caller(caller_id)) => {
                sql.push_str(" AND l.assigned_caller_id = ?");
                params.push(text_param(caller_id));
            }
            Some(CallerFilter::Unassigned) => sql.push_str(" AND l.assigned_caller_id IS NULL"),
            None => {}
        }
        if let Some(status) = filter.status {
            sql.push_str(" AND l.status = ?");
            params.push(text_param(status.as_str()));
        }
        if let Some(specialty) = &filter.specialty {
            sql.push_str(" AND l.specialty = ?");
            params.push(text_param(specialty));
        }
        if let Some(search) = &filter.search {
            // Literal substring match; `%` and `_` in the term are not wildcards.
            let needle = search.to_lowercase();
            sql.push_str(
                " AND (instr(LOWER(l.full_name), ?) > 0 OR instr(LOWER(COALESCE(l.notes, '')), ?) > 0)",
            );
            params.push(text_param(&needle));
            params.push(text_param(&needle));
        }
        sql.push_str(match filter.order {
            LeadOrder::RecentlyUpdated => " ORDER BY l.updated_at DESC, l.id DESC",
            LeadOrder::RecentlyCreated => " ORDER BY l.created_at DESC, l.id DESC",
        });

        let found = fetch_all(&conn, &sql, params, |row| {
            Ok((
                rows::lead(row, 0)?,
                opt_text(row, rows::LEAD_WIDTH)?,
                opt_text(row, rows::LEAD_WIDTH + 1)?,
            ))
        })
        .await?;
        if found.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = found.iter().map(|(lead, _, _)| lead.id).collect();
        let mut tags = self.tags_for(&conn, &ids).await?;

        let call_stats: HashMap<i64, (i64, Option<chrono::DateTime<chrono::Utc>>)> = fetch_all(
            &conn,
            &format!(
                "SELECT lead_id, COUNT(*), MAX(created_at) FROM call_attempts
                 WHERE lead_id IN ({}) GROUP BY lead_id",
                placeholders(ids.len())
            ),
            int_params(&ids),
            |row| Ok((int(row, 0)?, (int(row, 1)?, opt_timestamp(row, 2)?))),
        )
        .await?
        .into_iter()
        .collect();

        let appointment_counts: HashMap<i64, i64> = fetch_all(
            &conn,
            &format!(
                "SELECT lead_id, COUNT(*) FROM appointments
                 WHERE lead_id IN ({}) GROUP BY lead_id",
                placeholders(ids.len())
            ),
            int_params(&ids),
            |row| Ok((int(row, 0)?, int(row, 1)?)),
        )
        .await?
        .into_iter()
        .collect();

        Ok(found
            .into_iter()
            .map(|(lead, caller_name, caller_email)| {
                let (call_count, last_call_at) =
                    call_stats.get(&lead.id).cloned().unwrap_or((0, None));
                LeadSummary {
                    tags: tags.remove(&lead.id).unwrap_or_default(),
                    call_count,
                    last_call_at,
                    appointment_count: appointment_counts.get(&lead.id).copied().unwrap_or(0),
                    caller_name,
                    caller_email,
                    lead,
                }
            })
            .collect())
    }

    async fn get_lead(&self, id: i64, scope: &LeadScope) -> Result<Option<LeadDetail>, RepoError> {
        let conn = self.connect().await?;
        let Some(lead) = self.fetch_lead(&conn, id, scope).await? else {
            return Ok(None);
        };
        let tags = self.tags_for(&conn, &[id]).await?.remove(&id).unwrap_or_default();
        let call_attempts = fetch_all(
            &conn,
            &format!(
                "SELECT {CALL_ATTEMPT_COLUMNS} FROM call_attempts
                 WHERE lead_id = ? ORDER BY created_at DESC, id DESC"
            ),
            vec![TursoValue::Integer(id)],
            rows::call_attempt,
        )
        .await?;
        let appointments = fetch_all(
            &conn,
            &format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments a
                 WHERE a.lead_id = ? ORDER BY a.created_at DESC, a.id DESC"
            ),
            vec![TursoValue::Integer(id)],
            rows::appointment,
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
        let conn = self.connect().await?;
        if self.fetch_lead(&conn, id, scope).await?.is_none() {
            return Ok(None);
        }

        let columns = update.column_values();
        if !columns.is_empty() {
            let sets = columns
                .iter()
                .map(|(column, _)| format!("{column} = ?"))
                .collect::<Vec<_>>()
                .join(", ");
            let mut params: Vec<TursoValue> =
                columns.iter().map(|(_, value)| clearable(value)).collect();
            params.push(text_param(&rows::now()));
            params.push(TursoValue::Integer(id));
            conn.execute(
                &format!("UPDATE leads SET {sets}, updated_at = ? WHERE id = ?"),
                params,
            )
            .await?;
        }

        if let Some(tags) = update.normalized_tags() {
            self.replace_tags(&conn, id, &tags).await?;
        }

        let lead = self
            .fetch_lead(&conn, id, &LeadScope::Any)
            .await?
            .ok_or_else(|| RepoError::DataIntegrity(format!("lead {id} vanished during update")))?;
        conn.execute(
            "UPDATE leads SET data_completeness_score = ?, updated_at = ? WHERE id = ?",
            vec![
                TursoValue::Integer(lead.completeness_score()),
                text_param(&rows::now()),
                TursoValue::Integer(id),
            ],
        )
        .await?;

        let lead = self
            .fetch_lead(&conn, id, &LeadScope::Any)
            .await?
            .ok_or_else(|| RepoError::DataIntegrity(format!("lead {id} vanished during update")))?;
        let tags = self.tags_for(&conn, &[id]).await?.remove(&id).unwrap_or_default();
        Ok(Some(TaggedLead { lead, tags }))
    }

    async fn assign_lead(&self, id: i64, caller_id: Option<&str>) -> Result<Option<Lead>, RepoError> {
        let conn = self.connect().await?;
        let changed = conn
            .execute(
                "UPDATE leads SET assigned_caller_id = ?, updated_at = ? WHERE id = ?",
                vec![
                    opt_text_param(caller_id),
                    text_param(&rows::now()),
                    TursoValue::Integer(id),
                ],
            )
            .await?;
        if changed == 0 {
            return Ok(None);
        }
        self.fetch_lead(&conn, id, &LeadScope::Any).await
    }

    async fn delete_lead(&self, id: i64) -> Result<Option<Lead>, RepoError> {
        let conn = self.connect().await?;
        let Some(lead) = self.fetch_lead(&conn, id, &LeadScope::Any).await? else {
            return Ok(None);
        };
        for statement in [
            "DELETE FROM lead_tags WHERE lead_id = ?",
            "DELETE FROM call_attempts WHERE lead_id = ?",
            "DELETE FROM appointments WHERE lead_id = ?",
            "DELETE FROM leads WHERE id = ?",
        ] {
            conn.execute(statement, vec![TursoValue::Integer(id)]).await?;
        }
        info!(lead_id = id, "Deleted lead and its dependent rows.");
        Ok(Some(lead))
    }

    async fn rename_specialty(&self, from: &str, to: &str) -> Result<u64, RepoError> {
        let conn = self.connect().await?;
        Ok(conn
            .execute(
                "UPDATE leads SET specialty = ?, updated_at = ? WHERE specialty = ?",
                vec![text_param(to), text_param(&rows::now()), text_param(from)],
            )
            .await?)
    }

    async fn log_call(
        &self,
        lead_id: i64,
        caller_id: &str,
        call: &NewCallAttempt,
        status: Option<LeadStatus>,
    ) -> Result<Option<CallAttempt>, RepoError> {
        let conn = self.connect().await?;
        let owner = LeadScope::Owner(caller_id.to_string());
        if self.fetch_lead(&conn, lead_id, &owner).await?.is_none() {
            return Ok(None);
        }

        let now = rows::now();
        let id = insert_returning_id(
            &conn,
            "INSERT INTO call_attempts (lead_id, caller_id, outcome, notes, interest_level,
                appointment_likelihood, decision_maker_reached, call_control,
                objection_handling, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
            vec![
                TursoValue::Integer(lead_id),
                text_param(caller_id),
                text_param(&call.outcome),
                opt_text_param(call.notes.as_deref()),
                opt_int_param(call.interest_level),
                opt_int_param(call.appointment_likelihood),
                opt_bool_param(call.decision_maker_reached),
                opt_int_param(call.call_control),
                opt_int_param(call.objection_handling),
                text_param(&now),
            ],
        )
        .await?;

        if let Some(status) = status {
            conn.execute(
                "UPDATE leads SET status = ?, updated_at = ? WHERE id = ?",
                vec![
                    text_param(status.as_str()),
                    text_param(&now),
                    TursoValue::Integer(lead_id),
                ],
            )
            .await?;
        }

        self.fetch_call_attempt(&conn, id).await
    }

    async fn create_appointment(
        &self,
        caller_id: &str,
        appointment: &NewAppointment,
    ) -> Result<Option<(Appointment, Lead)>, RepoError> {
        let conn = self.connect().await?;
        let owner = LeadScope::Owner(caller_id.to_string());
        let Some(lead) = self.fetch_lead(&conn, appointment.lead_id, &owner).await? else {
            return Ok(None);
        };

        let id = insert_returning_id(
            &conn,
            "INSERT INTO appointments (lead_id, caller_id, scheduled_at, notes, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
            vec![
                TursoValue::Integer(appointment.lead_id),
                text_param(caller_id),
                text_param(&rows::timestamp_string(&appointment.scheduled_at)),
                opt_text_param(appointment.notes.as_deref()),
                text_param(APPOINTMENT_SCHEDULED),
                text_param(&rows::now()),
            ],
        )
        .await?;

        let created = self.fetch_appointment(&conn, id).await?.ok_or_else(|| {
            RepoError::DataIntegrity(format!("appointment {id} missing after insert"))
        })?;
        Ok(Some((created, lead)))
    }

    async fn link_calendar_event(
        &self,
        appointment_id: i64,
        link: &CalendarLink,
    ) -> Result<Option<Appointment>, RepoError> {
        let conn = self.connect().await?;
        conn.execute(
            "UPDATE appointments SET google_calendar_event_id = ?, google_meet_link = ? WHERE id = ?",
            vec![
                text_param(&link.event_id),
                opt_text_param(link.meet_link.as_deref()),
                TursoValue::Integer(appointment_id),
            ],
        )
        .await?;
        self.fetch_appointment(&conn, appointment_id).await
    }

    async fn list_appointments(
        &self,
        caller_id: &str,
    ) -> Result<Vec<AppointmentWithLead>, RepoError> {
        let conn = self.connect().await?;
        fetch_all(
            &conn,
            &format!(
                "SELECT {APPOINTMENT_COLUMNS}, l.full_name, l.specialty, l.email, l.phone
                 FROM appointments a
                 JOIN leads l ON l.id = a.lead_id
                 WHERE a.caller_id = ?
                 ORDER BY a.scheduled_at DESC, a.id DESC"
            ),
            vec![text_param(caller_id)],
            |row| {
                let width = rows::APPOINTMENT_WIDTH;
                Ok(AppointmentWithLead {
                    appointment: rows::appointment(row)?,
                    full_name: text(row, width)?,
                    specialty: text(row, width + 1)?,
                    lead_email: opt_text(row, width + 2)?,
                    lead_phone: opt_text(row, width + 3)?,
                })
            },
        )
        .await
    }

    async fn find_script(&self, specialty: &str) -> Result<Option<Script>, RepoError> {
        let conn = self.connect().await?;
        self.fetch_script(&conn, specialty).await
    }

    async fn list_scripts(&self) -> Result<Vec<Script>, RepoError> {
        let conn = self.connect().await?;
        fetch_all(
            &conn,
            &format!("SELECT {SCRIPT_COLUMNS} FROM scripts s ORDER BY s.specialty"),
            Vec::new(),
            rows::script,
        )
        .await
    }

    async fn upsert_script(&self, input: &ScriptInput) -> Result<Script, RepoError> {
        let conn = self.connect().await?;
        conn.execute(
            "INSERT INTO scripts (specialty, opening_line, qualification, talking_points,
                objection_handling, closing_line, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(specialty) DO UPDATE SET
                opening_line = excluded.opening_line,
                qualification = excluded.qualification,
                talking_points = excluded.talking_points,
                objection_handling = excluded.objection_handling,
                closing_line = excluded.closing_line,
                updated_at = excluded.updated_at",
            vec![
                text_param(&input.specialty),
                opt_text_param(input.opening_line.as_deref()),
                opt_text_param(input.qualification.as_deref()),
                opt_text_param(input.talking_points.as_deref()),
                opt_text_param(input.objection_handling.as_deref()),
                opt_text_param(input.closing_line.as_deref()),
                text_param(&rows::now()),
            ],
        )
        .await?;
        self.fetch_script(&conn, &input.specialty)
            .await?
            .ok_or_else(|| {
                RepoError::DataIntegrity(format!("script '{}' missing after upsert", input.specialty))
            })
    }

    async fn list_callers(&self) -> Result<Vec<CallerSummary>, RepoError> {
        let conn = self.connect().await?;
        let callers = fetch_all(
            &conn,
            &format!("SELECT {USER_COLUMNS} FROM users WHERE role = 'caller' ORDER BY name, email"),
            Vec::new(),
            |row| rows::user(row, 0),
        )
        .await?;
        let leads = self
            .count_by(
                &conn,
                "SELECT assigned_caller_id, COUNT(*) FROM leads
                 WHERE assigned_caller_id IS NOT NULL GROUP BY assigned_caller_id",
            )
            .await?;
        let scripts = self
            .count_by(
                &conn,
                "SELECT caller_id, COUNT(*) FROM caller_scripts GROUP BY caller_id",
            )
            .await?;

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
        let conn = self.connect().await?;
        let Some(user) = self.fetch_caller(&conn, id).await? else {
            return Ok(None);
        };
        let scripts = fetch_all(
            &conn,
            &format!(
                "SELECT {SCRIPT_COLUMNS} FROM scripts s
                 JOIN caller_scripts cs ON cs.script_id = s.id
                 WHERE cs.caller_id = ?
                 ORDER BY s.specialty"
            ),
            vec![text_param(id)],
            rows::script,
        )
        .await?;
        let leads_count = fetch_optional(
            &conn,
            "SELECT COUNT(*) FROM leads WHERE assigned_caller_id = ?",
            vec![text_param(id)],
            |row| int(row, 0),
        )
        .await?
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
        let conn = self.connect().await?;
        if self.fetch_caller(&conn, id).await?.is_none() {
            return Ok(None);
        }

        if let Some(name) = &profile.name {
            conn.execute(
                "UPDATE users SET name = ? WHERE id = ?",
                vec![clearable(name), text_param(id)],
            )
            .await?;
        }

        if let Some(script_ids) = &profile.script_ids {
            conn.execute(
                "DELETE FROM caller_scripts WHERE caller_id = ?",
                vec![text_param(id)],
            )
            .await?;
            let mut unique: Vec<i64> = Vec::new();
            for script_id in script_ids {
                if !unique.contains(script_id) {
                    unique.push(*script_id);
                }
            }
            for script_id in unique {
                conn.execute(
                    "INSERT INTO caller_scripts (caller_id, script_id) VALUES (?, ?)",
                    vec![text_param(id), TursoValue::Integer(script_id)],
                )
                .await?;
            }
        }

        let now = rows::now();
        match &profile.leads {
            LeadAssignment::Unchanged => {}
            LeadAssignment::ByIds(lead_ids) => {
                for lead_id in lead_ids {
                    conn.execute(
                        "UPDATE leads SET assigned_caller_id = ?, updated_at = ? WHERE id = ?",
                        vec![text_param(id), text_param(&now), TursoValue::Integer(*lead_id)],
                    )
                    .await?;
                }
            }
            LeadAssignment::ByCategory(categories) => {
                let mut sql =
                    "UPDATE leads SET assigned_caller_id = ?, updated_at = ? WHERE 1 = 1".to_string();
                let mut params = vec![text_param(id), text_param(&now)];
                if !categories.specialties.is_empty() {
                    sql.push_str(&format!(
                        " AND specialty IN ({})",
                        placeholders(categories.specialties.len())
                    ));
                    params.extend(categories.specialties.iter().map(|s| text_param(s)));
                }
                if !categories.statuses.is_empty() {
                    sql.push_str(&format!(
                        " AND status IN ({})",
                        placeholders(categories.statuses.len())
                    ));
                    params.extend(categories.statuses.iter().map(|s| text_param(s.as_str())));
                }
                let assigned = conn.execute(&sql, params).await?;
                info!(caller_id = %id, assigned, "Assigned leads by category.");
            }
        }

        self.fetch_user(&conn, id).await
    }

    async fn list_assignable_leads(&self) -> Result<Vec<AssignableLead>, RepoError> {
        let conn = self.connect().await?;
        fetch_all(
            &conn,
            "SELECT id, full_name, specialty, status FROM leads ORDER BY full_name, id",
            Vec::new(),
            |row| {
                Ok(AssignableLead {
                    id: int(row, 0)?,
                    full_name: text(row, 1)?,
                    specialty: text(row, 2)?,
                    status: rows::status(row, 3)?,
                })
            },
        )
        .await
    }

    async fn metrics_source(&self) -> Result<MetricsSource, RepoError> {
        let conn = self.connect().await?;
        let leads = fetch_all(
            &conn,
            "SELECT id, specialty, status, assigned_caller_id, data_completeness_score FROM leads",
            Vec::new(),
            |row| {
                Ok(LeadFacts {
                    id: int(row, 0)?,
                    specialty: text(row, 1)?,
                    status: rows::status(row, 2)?,
                    assigned_caller_id: opt_text(row, 3)?,
                    data_completeness_score: int(row, 4)?,
                })
            },
        )
        .await?;
        let calls = fetch_all(
            &conn,
            "SELECT lead_id, outcome, interest_level, appointment_likelihood FROM call_attempts",
            Vec::new(),
            |row| {
                Ok(CallFacts {
                    lead_id: int(row, 0)?,
                    outcome: text(row, 1)?,
                    interest_level: opt_int(row, 2)?,
                    appointment_likelihood: opt_int(row, 3)?,
                })
            },
        )
        .await?;
        let callers = fetch_all(
            &conn,
            &format!("SELECT {USER_COLUMNS} FROM users WHERE role = 'caller' ORDER BY name, email"),
            Vec::new(),
            |row| rows::user(row, 0),
        )
        .await?;
        Ok(MetricsSource {
            leads,
            calls,
            callers,
        })
    }
}
