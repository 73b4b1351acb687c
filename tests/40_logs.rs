mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{app, create_medication, delegated_app, delete, get, id_of, login, patch, post, DUMMY_TOKEN};

fn taken(medication_id: &str, scheduled_at: &str) -> Value {
    json!({ "medication_id": medication_id, "scheduled_at": scheduled_at, "status": "taken" })
}

#[tokio::test]
async fn create_show_update_delete() -> Result<()> {
    let app = app();
    let med = create_medication(&app, DUMMY_TOKEN, json!({ "name": "Ibuprofen" })).await?;

    let mut body = taken(&med, "2024-03-10T08:00:00Z");
    body["effectiveness_rating"] = json!(4);
    body["side_effects"] = json!(["頭痛"]);
    body["severity_level"] = json!("mild");
    let res = post(&app, "/api/medication-logs", DUMMY_TOKEN, body).await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["message"], "Log created successfully");
    assert_eq!(res.body["data"]["status"], "taken");
    assert_eq!(res.body["data"]["severity_level"], "mild");
    assert_eq!(res.body["data"]["side_effects"], json!(["頭痛"]));
    assert_eq!(res.body["data"]["medication"]["name"], "Ibuprofen");
    assert!(res.body["data"]["medication"].get("logs").is_none());
    let id = id_of(&res.body)?;
    let uri = format!("/api/medication-logs/{id}");

    let res = get(&app, &uri, DUMMY_TOKEN).await?;
    assert_eq!(res.body["data"]["effectiveness_rating"], 4);
    assert_eq!(res.body["data"]["medication"]["id"], med.as_str());
    assert_eq!(res.body["data"]["medication"]["name"], "Ibuprofen");

    let res = patch(&app, &uri, DUMMY_TOKEN, json!({ "status": "skipped", "effectiveness_rating": null })).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Log updated successfully");
    assert_eq!(res.body["data"]["status"], "skipped");
    assert!(res.body["data"]["effectiveness_rating"].is_null());

    let res = delete(&app, &uri, DUMMY_TOKEN).await?;
    assert_eq!(res.body["message"], "Log deleted successfully");
    let res = get(&app, &uri, DUMMY_TOKEN).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["message"], "Log not found");
    Ok(())
}

#[tokio::test]
async fn validation_failures() -> Result<()> {
    let app = app();
    let res = post(&app, "/api/medication-logs", DUMMY_TOKEN, json!({})).await?;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    for field in ["medication_id", "scheduled_at", "status"] {
        assert!(res.body["errors"][field].is_array(), "missing error for {field}: {}", res.body);
    }

    let med = create_medication(&app, DUMMY_TOKEN, json!({ "name": "Ibuprofen" })).await?;
    let mut body = taken(&med, "2024-03-10T08:00:00Z");
    body["status"] = json!("forgotten");
    body["effectiveness_rating"] = json!(6);
    let res = post(&app, "/api/medication-logs", DUMMY_TOKEN, body).await?;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res.body["errors"]["status"].is_array());
    assert!(res.body["errors"]["effectiveness_rating"].is_array());
    Ok(())
}

#[tokio::test]
async fn references_must_belong_to_the_caller() -> Result<()> {
    let app = delegated_app();
    let alice = login(&app, "alice").await?;
    let bob = login(&app, "bob").await?;

    let alice_med = create_medication(&app, &alice, json!({ "name": "Alice's" })).await?;
    let res = post(&app, "/api/medication-logs", &bob, taken(&alice_med, "2024-03-10T08:00:00Z")).await?;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res.body["errors"]["medication_id"].is_array());

    let id = id_of(&post(&app, "/api/medication-logs", &alice, taken(&alice_med, "2024-03-10T08:00:00Z")).await?.body)?;
    assert_eq!(get(&app, &format!("/api/medication-logs/{id}"), &bob).await?.status, StatusCode::NOT_FOUND);
    let res = get(&app, "/api/medication-logs", &bob).await?;
    assert_eq!(res.body["meta"]["total"], 0);
    Ok(())
}

#[tokio::test]
async fn pattern_must_belong_to_the_medication() -> Result<()> {
    let app = app();
    let med_a = create_medication(&app, DUMMY_TOKEN, json!({ "name": "A" })).await?;
    let med_b = create_medication(&app, DUMMY_TOKEN, json!({ "name": "B" })).await?;
    let pattern = id_of(
        &post(
            &app,
            &format!("/api/medications/{med_a}/patterns"),
            DUMMY_TOKEN,
            json!({ "schedule_type": "as_needed", "start_date": "2024-01-01" }),
        )
        .await?
        .body,
    )?;

    let mut body = taken(&med_b, "2024-03-10T08:00:00Z");
    body["medication_pattern_id"] = json!(pattern);
    let res = post(&app, "/api/medication-logs", DUMMY_TOKEN, body).await?;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res.body["errors"]["medication_pattern_id"].is_array());

    let mut body = taken(&med_a, "2024-03-10T08:00:00Z");
    body["medication_pattern_id"] = json!(pattern);
    let res = post(&app, "/api/medication-logs", DUMMY_TOKEN, body).await?;
    assert_eq!(res.status, StatusCode::CREATED);
    let log = id_of(&res.body)?;

    // The log survives its pattern, without the link.
    delete(&app, &format!("/api/medications/{med_a}/patterns/{pattern}"), DUMMY_TOKEN).await?;
    let res = get(&app, &format!("/api/medication-logs/{log}"), DUMMY_TOKEN).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["data"]["medication_pattern_id"].is_null());
    Ok(())
}

#[tokio::test]
async fn filters_by_date_status_and_medication() -> Result<()> {
    let app = app();
    let med_a = create_medication(&app, DUMMY_TOKEN, json!({ "name": "A" })).await?;
    let med_b = create_medication(&app, DUMMY_TOKEN, json!({ "name": "B" })).await?;

    post(&app, "/api/medication-logs", DUMMY_TOKEN, taken(&med_a, "2024-03-10T08:00:00Z")).await?;
    post(&app, "/api/medication-logs", DUMMY_TOKEN, taken(&med_a, "2024-03-10T23:30:00Z")).await?;
    post(&app, "/api/medication-logs", DUMMY_TOKEN, taken(&med_b, "2024-03-12T08:00:00Z")).await?;
    let mut missed = taken(&med_b, "2024-03-11T08:00:00Z");
    missed["status"] = json!("missed");
    post(&app, "/api/medication-logs", DUMMY_TOKEN, missed).await?;

    let res = get(&app, "/api/medication-logs", DUMMY_TOKEN).await?;
    assert_eq!(res.body["meta"]["total"], 4);
    assert_eq!(res.body["data"][0]["medication"]["name"], "B");
    // Most recent dose first.
    let first = res.body["data"][0]["scheduled_at"].as_str().unwrap_or_default().to_string();
    assert!(first.starts_with("2024-03-12"));

    let res = get(&app, "/api/medication-logs?start_date=2024-03-10&end_date=2024-03-10", DUMMY_TOKEN).await?;
    assert_eq!(res.body["meta"]["total"], 2);

    let res = get(&app, "/api/medication-logs?start_date=2024-03-10&end_date=2024-03-11&status=missed", DUMMY_TOKEN).await?;
    assert_eq!(res.body["meta"]["total"], 1);

    let res = get(&app, &format!("/api/medication-logs?medication_id={med_b}"), DUMMY_TOKEN).await?;
    assert_eq!(res.body["meta"]["total"], 2);

    let res = get(&app, "/api/medication-logs?start_date=2024-03-12&end_date=2024-03-10", DUMMY_TOKEN).await?;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res.body["errors"]["end_date"].is_array());

    let res = get(&app, "/api/medication-logs?start_date=2024-03-10", DUMMY_TOKEN).await?;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn deleting_a_medication_removes_its_logs() -> Result<()> {
    let app = app();
    let med = create_medication(&app, DUMMY_TOKEN, json!({ "name": "Temporary" })).await?;
    let log = id_of(&post(&app, "/api/medication-logs", DUMMY_TOKEN, taken(&med, "2024-03-10T08:00:00Z")).await?.body)?;

    delete(&app, &format!("/api/medications/{med}"), DUMMY_TOKEN).await?;
    assert_eq!(get(&app, &format!("/api/medication-logs/{log}"), DUMMY_TOKEN).await?.status, StatusCode::NOT_FOUND);
    let res = get(&app, "/api/medication-logs", DUMMY_TOKEN).await?;
    assert_eq!(res.body["meta"]["total"], 0);
    Ok(())
}
