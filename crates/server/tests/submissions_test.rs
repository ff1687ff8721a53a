mod common;

use common::TestApp;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};

/// Builds a form with a required text field, a required number field, and an
/// optional file field, returning the form id.
async fn seed_kyc_form(app: &TestApp, admin_token: &str) -> String {
    let response = app
        .client
        .post(format!("{}/forms", app.address))
        .bearer_auth(admin_token)
        .json(&json!({ "name": "KYC Application" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let form_id = body["data"]["id"].as_str().unwrap().to_string();

    for payload in [
        json!({ "name": "full_name", "field_type": "text", "is_required": true, "order": 0 }),
        json!({ "name": "income", "field_type": "number", "is_required": true, "order": 1 }),
        json!({ "name": "payslip", "field_type": "file", "order": 2 }),
    ] {
        let response = app
            .client
            .post(format!("{}/forms/{form_id}/fields", app.address))
            .bearer_auth(admin_token)
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
    }
    form_id
}

fn submission_form(form_id: &str, data: Value) -> Form {
    Form::new()
        .text("form_id", form_id.to_string())
        .text("data", data.to_string())
}

#[tokio::test]
async fn submission_with_attachment_is_stored_and_notifies_admins() {
    let app = TestApp::spawn().await;
    let (_admin, admin_token) = app.seed_user("root", None, true).await;
    let (user, user_token) = app.seed_user("ada", Some("ada@example.com"), false).await;
    let form_id = seed_kyc_form(&app, &admin_token).await;

    let form = submission_form(
        &form_id,
        json!({ "full_name": "Ada Lovelace", "income": "42000" }),
    )
    .part(
        "payslip",
        Part::bytes(b"pdf bytes".to_vec()).file_name("payslip.pdf"),
    );

    let response = app
        .client
        .post(format!("{}/submissions", app.address))
        .bearer_auth(&user_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["user"], user.id);
    let submission_id = body["data"]["id"].as_str().unwrap();

    // Detail view carries the stored document.
    let response = app
        .client
        .get(format!("{}/submissions/{submission_id}", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let documents = body["data"]["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["size"], 9);
    assert!(documents[0]["file"].as_str().unwrap().starts_with("uploads/"));

    // Exactly one notice, addressed with the submitter's email.
    let notices = app.dispatcher.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].form_name, "KYC Application");
    assert_eq!(notices[0].submitter_contact, "ada@example.com");
}

#[tokio::test]
async fn validation_failures_report_every_field_at_once() {
    let app = TestApp::spawn().await;
    let (_admin, admin_token) = app.seed_user("root", None, true).await;
    let (_user, user_token) = app.seed_user("ada", None, false).await;
    let form_id = seed_kyc_form(&app, &admin_token).await;

    let response = app
        .client
        .post(format!("{}/submissions", app.address))
        .bearer_auth(&user_token)
        .multipart(submission_form(&form_id, json!({})))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Validation failed.");
    assert_eq!(body["data"]["full_name"][0], "This field is required.");
    assert_eq!(body["data"]["income"][0], "This field is required.");
    assert!(app.dispatcher.notices().is_empty());
}

#[tokio::test]
async fn conditional_requirement_follows_the_controlling_answer() {
    let app = TestApp::spawn().await;
    let (_admin, admin_token) = app.seed_user("root", None, true).await;

    let response = app
        .client
        .post(format!("{}/forms", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({ "name": "Loan" }))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let form_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .client
        .post(format!("{}/forms/{form_id}/fields", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({ "name": "income", "field_type": "number", "is_required": true }))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let income_id = body["data"]["id"].as_str().unwrap().to_string();

    app.client
        .post(format!("{}/forms/{form_id}/fields", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({
            "name": "tax_reference",
            "field_type": "text",
            "is_required": true,
            "order": 1,
            "is_conditional": true,
            "conditional_field": income_id,
            "conditional_operator": "greater_than",
            "conditional_value": "50000"
        }))
        .send()
        .await
        .unwrap();

    // Below the threshold the dependent field is inactive.
    let response = app
        .client
        .post(format!("{}/submissions", app.address))
        .bearer_auth(&admin_token)
        .multipart(submission_form(&form_id, json!({ "income": "40000" })))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    // Above it the dependent field is required.
    let response = app
        .client
        .post(format!("{}/submissions", app.address))
        .bearer_auth(&admin_token)
        .multipart(submission_form(&form_id, json!({ "income": "60000" })))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["tax_reference"][0], "This field is required.");
}

#[tokio::test]
async fn submitting_requires_a_login() {
    let app = TestApp::spawn().await;
    let (_admin, admin_token) = app.seed_user("root", None, true).await;
    let form_id = seed_kyc_form(&app, &admin_token).await;

    let response = app
        .client
        .post(format!("{}/submissions", app.address))
        .multipart(submission_form(
            &form_id,
            json!({ "full_name": "Anon", "income": "1000" }),
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Authentication required.");

    // Nothing was written and nobody was notified.
    let response = app
        .client
        .get(format!("{}/submissions", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());
    assert!(app.dispatcher.notices().is_empty());
}

#[tokio::test]
async fn submission_visibility_and_listing_rules() {
    let app = TestApp::spawn().await;
    let (_admin, admin_token) = app.seed_user("root", None, true).await;
    let (_ada, ada_token) = app.seed_user("ada", None, false).await;
    let (_eve, eve_token) = app.seed_user("eve", None, false).await;
    let form_id = seed_kyc_form(&app, &admin_token).await;

    let response = app
        .client
        .post(format!("{}/submissions", app.address))
        .bearer_auth(&ada_token)
        .multipart(submission_form(
            &form_id,
            json!({ "full_name": "Ada", "income": "1000" }),
        ))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let submission_id = body["data"]["id"].as_str().unwrap().to_string();

    // Listing needs a login.
    let response = app
        .client
        .get(format!("{}/submissions", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // Owner sees it under /submissions/mine.
    let response = app
        .client
        .get(format!("{}/submissions/mine", app.address))
        .bearer_auth(&ada_token)
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Another client's list of their own submissions is empty, and they
    // cannot open someone else's detail view.
    let response = app
        .client
        .get(format!("{}/submissions/mine", app.address))
        .bearer_auth(&eve_token)
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());

    let response = app
        .client
        .get(format!("{}/submissions/{submission_id}", app.address))
        .bearer_auth(&eve_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // The owner can.
    let response = app
        .client
        .get(format!("{}/submissions/{submission_id}", app.address))
        .bearer_auth(&ada_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn admin_reviews_and_deletes_submissions() {
    let app = TestApp::spawn().await;
    let (_admin, admin_token) = app.seed_user("root", None, true).await;
    let (_ada, ada_token) = app.seed_user("ada", None, false).await;
    let form_id = seed_kyc_form(&app, &admin_token).await;

    let response = app
        .client
        .post(format!("{}/submissions", app.address))
        .bearer_auth(&ada_token)
        .multipart(submission_form(
            &form_id,
            json!({ "full_name": "Ada", "income": "1000" }),
        ))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let submission_id = body["data"]["id"].as_str().unwrap().to_string();

    // A non-admin cannot change the status.
    let response = app
        .client
        .put(format!("{}/submissions/{submission_id}", app.address))
        .bearer_auth(&ada_token)
        .json(&json!({ "status": "approved" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = app
        .client
        .put(format!("{}/submissions/{submission_id}", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({ "status": "approved" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "approved");

    let response = app
        .client
        .delete(format!("{}/submissions/{submission_id}", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = app
        .client
        .get(format!("{}/submissions/{submission_id}", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn submitting_against_an_unknown_form_is_not_found() {
    let app = TestApp::spawn().await;
    let (_user, user_token) = app.seed_user("ada", None, false).await;

    let response = app
        .client
        .post(format!("{}/submissions", app.address))
        .bearer_auth(&user_token)
        .multipart(submission_form("no-such-form", json!({})))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
