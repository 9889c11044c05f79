mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{table_rows, TestApp, USER_ID, USER_TOKEN};
use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path, query_param},
    Mock, ResponseTemplate,
};

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let app = TestApp::new().await?;

    for uri in ["/api/auth/me", "/api/dashboard", "/api/activity-logs"] {
        let (status, body) = app.get(uri, None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    // No token means the auth service is never asked
    assert!(app.received("/auth/v1/user").await.is_empty());
    Ok(())
}

#[tokio::test]
async fn rejected_token_is_unauthorized() -> Result<()> {
    let app = TestApp::new().await?;
    app.reject_token("expired-token").await;

    let (status, _) = app.get("/api/dashboard", Some("expired-token")).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn dashboard_echoes_the_user_id() -> Result<()> {
    let app = TestApp::new().await?;
    app.accept_user_token().await;

    let (status, body) = app.get("/api/dashboard", Some(USER_TOKEN)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Dashboard data", "user_id": USER_ID}));
    Ok(())
}

#[tokio::test]
async fn me_returns_the_users_row() -> Result<()> {
    let app = TestApp::new().await?;
    app.accept_user_token().await;

    let row = json!({"uuid": USER_ID, "email": "doctor@clinic.test", "screenname": "doc", "role": "DOCTOR", "approved": true});
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("select", "*"))
        .and(query_param("uuid", format!("eq.{}", USER_ID).as_str()))
        .respond_with(table_rows(json!([row.clone()])))
        .mount(&app.managed)
        .await;

    let (status, body) = app.get("/api/auth/me", Some(USER_TOKEN)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, row);
    Ok(())
}

#[tokio::test]
async fn me_without_users_row_is_not_found() -> Result<()> {
    let app = TestApp::new().await?;
    app.accept_user_token().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(table_rows(json!([])))
        .mount(&app.managed)
        .await;

    let (status, body) = app.get("/api/auth/me", Some(USER_TOKEN)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
    Ok(())
}

#[tokio::test]
async fn create_user_inserts_unapproved_staff_row_once() -> Result<()> {
    let app = TestApp::new().await?;
    app.accept_user_token().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(table_rows(json!([])))
        .mount(&app.managed)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{"uuid": USER_ID}])))
        .expect(1)
        .mount(&app.managed)
        .await;

    let (status, body) = app
        .post_json("/api/auth/create_user", Some(USER_TOKEN), &json!({"email": "new.hire@clinic.test"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "uuid": USER_ID, "was_inaugural_login": true}));

    let inserts = app.received("/rest/v1/users").await;
    let insert = inserts
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .expect("insert request");
    let payload: Value = serde_json::from_slice(&insert.body)?;
    assert_eq!(
        payload,
        json!({
            "uuid": USER_ID,
            "email": "new.hire@clinic.test",
            "screenname": "new.hire",
            "role": "STAFF",
            "approved": false
        })
    );
    Ok(())
}

#[tokio::test]
async fn create_user_is_idempotent_for_existing_row() -> Result<()> {
    let app = TestApp::new().await?;
    app.accept_user_token().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("uuid", format!("eq.{}", USER_ID).as_str()))
        .respond_with(table_rows(json!([{"uuid": USER_ID, "email": "doctor@clinic.test"}])))
        .mount(&app.managed)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&app.managed)
        .await;

    let (status, body) = app.post_json("/api/auth/create_user", Some(USER_TOKEN), &json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["was_inaugural_login"], false);
    assert_eq!(body["uuid"], USER_ID);
    Ok(())
}

#[tokio::test]
async fn create_user_reuses_row_found_by_email() -> Result<()> {
    let app = TestApp::new().await?;
    app.accept_user_token().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.doctor@clinic.test"))
        .respond_with(table_rows(json!([{"uuid": "legacy-uuid", "email": "doctor@clinic.test"}])))
        .mount(&app.managed)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(table_rows(json!([])))
        .mount(&app.managed)
        .await;

    let (status, body) = app
        .post_json("/api/auth/create_user", Some(USER_TOKEN), &json!({"email": "doctor@clinic.test"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "uuid": "legacy-uuid", "was_inaugural_login": false}));
    Ok(())
}

#[tokio::test]
async fn upsert_user_patches_existing_row() -> Result<()> {
    let app = TestApp::new().await?;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(table_rows(json!([{"uuid": "u-1", "email": null}])))
        .mount(&app.managed)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(query_param("uuid", "eq.u-1"))
        .respond_with(table_rows(json!([{"uuid": "u-1"}])))
        .expect(1)
        .mount(&app.managed)
        .await;

    let (status, body) = app
        .post_json(
            "/api/auth/upsert-user",
            None,
            &json!({"uuid": "u-1", "screen_name": "Dr. Rao", "role": "DOCTOR"}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "uuid": "u-1"}));

    let patch = app
        .received("/rest/v1/users")
        .await
        .into_iter()
        .find(|r| r.method.as_str() == "PATCH")
        .expect("patch request");
    let payload: Value = serde_json::from_slice(&patch.body)?;
    assert_eq!(payload, json!({"screenname": "Dr. Rao", "role": "DOCTOR"}));
    Ok(())
}

#[tokio::test]
async fn upsert_user_takes_uuid_from_token_and_inserts() -> Result<()> {
    let app = TestApp::new().await?;
    app.accept_user_token().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(table_rows(json!([])))
        .mount(&app.managed)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{"uuid": USER_ID}])))
        .expect(1)
        .mount(&app.managed)
        .await;

    let (status, body) = app
        .post_json("/api/auth/upsert-user", Some(USER_TOKEN), &json!({"email": "nurse@clinic.test", "role": "ADMIN"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["uuid"], USER_ID);

    let insert = app
        .received("/rest/v1/users")
        .await
        .into_iter()
        .find(|r| r.method.as_str() == "POST")
        .expect("insert request");
    let payload: Value = serde_json::from_slice(&insert.body)?;
    assert_eq!(payload["screenname"], "nurse");
    assert_eq!(payload["role"], "STAFF");
    Ok(())
}

#[tokio::test]
async fn upsert_user_input_errors() -> Result<()> {
    let app = TestApp::new().await?;

    let (status, body) = app.post_json("/api/auth/upsert-user", None, &json!({"role": "DOCTOR"})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "uuid required");

    let (status, body) = app
        .post_json("/api/auth/upsert-user", None, &json!({"uuid": "u-1", "role": "ADMIN"}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "provide at least screenname, role, or email");
    Ok(())
}

#[tokio::test]
async fn managed_auth_outage_is_service_unavailable() -> Result<()> {
    let router = TestApp::unconfigured()?;
    let app = TestApp { router, managed: wiremock::MockServer::start().await };

    let (status, body) = app.get("/api/dashboard", Some(USER_TOKEN)).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    Ok(())
}
