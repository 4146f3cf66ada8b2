//! # Script Endpoint Tests

mod common;

use anyhow::Result;
use common::TestApp;
use core_access::Role;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_unknown_specialty_gets_placeholder() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, token) = app.user("c1", Role::Caller).await?;

    let response = app
        .get("/api/scripts/Unknown%20Specialty", &token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let script: Value = response.json().await?;
    assert!(script["id"].is_null());
    assert_eq!(script["specialty"], "Unknown Specialty");
    assert_eq!(
        script["opening_line"],
        "Hello, this is [Your Name] calling from [Company]."
    );
    assert_eq!(
        script["closing_line"],
        "Would you be available for a brief call this week?"
    );
    Ok(())
}

#[tokio::test]
async fn test_only_admins_list_and_save_scripts() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, admin) = app.user("admin", Role::Admin).await?;
    let (_, caller) = app.user("c1", Role::Caller).await?;

    let response = app
        .post("/api/scripts", &caller)
        .json(&json!({ "specialty": "Cardiology", "opening_line": "Hi" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = app.get("/api/scripts", &caller).send().await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post("/api/scripts", &admin)
        .json(&json!({ "specialty": "Cardiology", "opening_line": "Hello doctor" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let saved: Value = response.json().await?;
    assert!(saved["id"].is_i64());

    let response = app
        .post("/api/scripts", &admin)
        .json(&json!({ "opening_line": "No specialty" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let listed: Value = app.get("/api/scripts", &admin).send().await?.json().await?;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let fetched: Value = app
        .get("/api/scripts/Cardiology", &caller)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(fetched["opening_line"], "Hello doctor");
    assert_eq!(fetched["id"], saved["id"]);
    Ok(())
}
