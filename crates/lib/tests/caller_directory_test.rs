//! # Caller Directory Tests

mod common;

use anyhow::Result;
use callboard::{
    callers::{self, CallerChanges, NewCaller},
    leads, scripts,
    types::{LeadCategories, LeadScope, LeadStatus, LeadUpdate, ScriptInput},
    CrmError, Repository,
};
use callboard_test_utils::{StaticIdentityProvider, TestSetup};
use common::{setup_tracing, stranger};
use core_access::{Role, UserStore};

async fn seed_scripts(setup: &TestSetup) -> Result<Vec<i64>> {
    let admin = setup.user("admin", Role::Admin).await?;
    let mut ids = Vec::new();
    for specialty in ["Cardiology", "Dermatology"] {
        let script = scripts::upsert_script(
            &setup.provider,
            &admin,
            ScriptInput {
                specialty: specialty.into(),
                opening_line: Some(format!("Hello from {specialty}")),
                ..Default::default()
            },
        )
        .await?;
        ids.extend(script.id);
    }
    Ok(ids)
}

#[tokio::test]
async fn test_create_caller_provisions_account_and_assigns() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    let identity = StaticIdentityProvider::new();
    let script_ids = seed_scripts(&setup).await?;
    let first = setup.lead("Dr. One", "Cardiology", None).await?;
    let second = setup.lead("Dr. Two", "Dermatology", None).await?;

    let caller = callers::create_caller(
        &setup.provider,
        &identity,
        NewCaller {
            email: "new@example.com".into(),
            name: Some("New Caller".into()),
            password: Some("s3cret!".into()),
            script_ids: Some(vec![script_ids[0], script_ids[0]]),
            lead_ids: Some(vec![first.id, second.id]),
            lead_categories: None,
        },
    )
    .await?;

    assert_eq!(caller.role, Role::Caller);
    assert_eq!(caller.name.as_deref(), Some("New Caller"));
    assert_eq!(
        identity.accounts(),
        vec![("new@example.com".to_string(), "s3cret!".to_string())]
    );

    let detail = callers::get_caller(&setup.provider, &caller.id).await?;
    assert_eq!(detail.leads_count, 2);
    assert_eq!(detail.scripts.len(), 1);
    assert_eq!(detail.scripts[0].specialty, "Cardiology");

    let listed = callers::list_callers(&setup.provider).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].leads_count, 2);
    assert_eq!(listed[0].scripts_count, 1);
    Ok(())
}

#[tokio::test]
async fn test_create_caller_validates_and_detects_conflicts() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    let identity = StaticIdentityProvider::new();
    setup.user("admin", Role::Admin).await?;

    let missing_email = callers::create_caller(&setup.provider, &identity, NewCaller::default())
        .await
        .unwrap_err();
    assert!(matches!(missing_email, CrmError::Validation(m) if m == "Email is required"));

    let missing_password = callers::create_caller(
        &setup.provider,
        &identity,
        NewCaller {
            email: "fresh@example.com".into(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(missing_password, CrmError::Validation(_)));

    let conflict = callers::create_caller(
        &setup.provider,
        &identity,
        NewCaller {
            email: "admin@example.com".into(),
            password: Some("pw".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(conflict, CrmError::Conflict(_)));
    assert!(identity.accounts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_existing_caller_is_adopted_without_password() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    let identity = StaticIdentityProvider::new();
    let existing = setup.user("c1", Role::Caller).await?;

    let adopted = callers::create_caller(
        &setup.provider,
        &identity,
        NewCaller {
            email: "C1@example.com".into(),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(adopted.id, existing.id);
    assert!(identity.accounts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_category_assignment_requires_every_list_to_match() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    setup.user("c1", Role::Caller).await?;
    let fresh_cardio = setup.lead("Dr. Fresh", "Cardiology", None).await?;
    let worked_cardio = setup.lead("Dr. Worked", "Cardiology", None).await?;
    let fresh_derm = setup.lead("Dr. Skin", "Dermatology", None).await?;
    leads::update_lead(
        &setup.provider,
        worked_cardio.id,
        &LeadScope::Any,
        LeadUpdate {
            status: Some(LeadStatus::Contacted),
            ..Default::default()
        },
    )
    .await?;

    callers::update_caller(
        &setup.provider,
        "c1",
        CallerChanges {
            lead_ids: Some(vec![fresh_derm.id]),
            lead_categories: Some(LeadCategories {
                specialties: vec!["Cardiology".into()],
                statuses: vec![LeadStatus::New],
            }),
            ..Default::default()
        },
    )
    .await?;

    let owner = LeadScope::Owner("c1".into());
    let mine = leads::list_leads(&setup.provider, &owner, Default::default()).await?;
    let ids: Vec<i64> = mine.iter().map(|l| l.lead.id).collect();
    assert_eq!(ids, vec![fresh_cardio.id]);
    Ok(())
}

#[tokio::test]
async fn test_update_caller_replaces_scripts_and_keeps_name_when_absent() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    let script_ids = seed_scripts(&setup).await?;
    setup.user("c1", Role::Caller).await?;

    callers::update_caller(
        &setup.provider,
        "c1",
        CallerChanges {
            script_ids: Some(script_ids.clone()),
            ..Default::default()
        },
    )
    .await?;
    let updated = callers::update_caller(
        &setup.provider,
        "c1",
        CallerChanges {
            script_ids: Some(vec![script_ids[1]]),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(updated.name.as_deref(), Some("User c1"));

    let detail = callers::get_caller(&setup.provider, "c1").await?;
    let specialties: Vec<&str> = detail.scripts.iter().map(|s| s.specialty.as_str()).collect();
    assert_eq!(specialties, vec!["Dermatology"]);

    let err = callers::update_caller(&setup.provider, "admin", CallerChanges::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::NotFound(m) if m == "Caller not found"));
    Ok(())
}

#[tokio::test]
async fn test_assignment_pickers_list_everything() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    seed_scripts(&setup).await?;
    setup.lead("Dr. Zeta", "Cardiology", None).await?;
    setup.lead("Dr. Alpha", "Dermatology", Some("c9")).await?;

    let scripts = callers::available_scripts(&setup.provider).await?;
    assert_eq!(scripts.len(), 2);

    let leads = callers::available_leads(&setup.provider).await?;
    let names: Vec<&str> = leads.iter().map(|l| l.full_name.as_str()).collect();
    assert_eq!(names, vec!["Dr. Alpha", "Dr. Zeta"]);
    Ok(())
}

#[tokio::test]
async fn test_script_catalog_enforces_admin_and_falls_back() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    seed_scripts(&setup).await?;
    let caller = setup.user("c1", Role::Caller).await?;

    let stored = scripts::get_script(&setup.provider, "Cardiology").await?;
    assert!(stored.id.is_some());
    assert_eq!(stored.opening_line.as_deref(), Some("Hello from Cardiology"));

    let placeholder = scripts::get_script(&setup.provider, "Unknown Specialty").await?;
    assert_eq!(placeholder.id, None);
    assert_eq!(
        placeholder.talking_points.as_deref(),
        Some("Key points to discuss...")
    );

    let err = scripts::list_scripts(&setup.provider, &caller).await.unwrap_err();
    assert!(matches!(err, CrmError::Forbidden(_)));

    // A stale admin record is not enough: the role is read from storage.
    let ghost = stranger("ghost", Role::Admin);
    let err = scripts::upsert_script(&setup.provider, &ghost, ScriptInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::Forbidden(_)));

    let admin = setup.provider.find_user("admin").await?.unwrap();
    let replaced = scripts::upsert_script(
        &setup.provider,
        &admin,
        ScriptInput {
            specialty: "Cardiology".into(),
            closing_line: Some("Talk soon".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(replaced.id, stored.id);
    assert_eq!(replaced.opening_line, None);
    assert_eq!(setup.provider.list_scripts().await?.len(), 2);
    Ok(())
}
