// tests/authoring_tests.rs

mod common;

use common::{error_code, spawn_app};
use placement_api::utils::rbac::Role;
use serde_json::{Value, json};

#[tokio::test]
async fn unknown_route_is_404() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_requires_known_college_and_valid_input() {
    // Arrange
    let app = spawn_app().await;

    // Act: Send a username that is too short
    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "collegeSlug": app.college.slug, "username": "yo", "password": "password123" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(error_code(response).await, "VALIDATION_ERROR");

    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "collegeSlug": "no-such-college", "username": "newbie", "password": "password123" }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn logout_invalidates_the_token() {
    // Arrange
    let app = spawn_app().await;
    let student = app.create_user(Role::Member).await;
    let token = app.login(&student.username).await;

    // Act
    let response = app.post(&token, "/api/auth/logout", json!({})).await;
    assert_eq!(response.status().as_u16(), 200);

    // Assert
    let response = app.get(&token, "/api/tests").await;
    assert_eq!(response.status().as_u16(), 401);
    assert_eq!(error_code(response).await, "UNAUTHORIZED");
}

#[tokio::test]
async fn students_never_see_answers() {
    // Arrange
    let app = spawn_app().await;
    let owner = app.create_user(Role::Owner).await;
    let owner_token = app.login(&owner.username).await;
    let mcq = app.create_mcq(&owner_token).await;
    let coding = app.create_coding(&owner_token).await;
    let test_id = app.publish_test(&owner_token, 10, &[&mcq, &coding]).await;

    let student = app.create_user(Role::Member).await;
    let token = app.login(&student.username).await;

    // Act
    let response = app.get(&token, &format!("/api/questions/{}", coding)).await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(body["data"].get("solution").is_none());
    assert!(body["data"].get("testCases").is_none());
    assert_eq!(body["data"]["sampleTestCases"].as_array().unwrap().len(), 1);

    let response = app.get(&token, &format!("/api/tests/{}", test_id)).await;
    let body: Value = response.json().await.unwrap();
    let questions = body["data"]["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    let text = serde_json::to_string(questions).unwrap();
    assert!(!text.contains("isCorrect"));
    assert!(!text.contains("40 2"));

    let response = app.get(&owner_token, &format!("/api/questions/{}", coding)).await;
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["solution"].is_string());
    assert_eq!(body["data"]["testCases"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn authoring_rules_are_enforced() {
    // Arrange
    let app = spawn_app().await;
    let owner = app.create_user(Role::Owner).await;
    let owner_token = app.login(&owner.username).await;
    let student = app.create_user(Role::Member).await;
    let student_token = app.login(&student.username).await;

    // Students cannot author.
    let response = app
        .post(
            &student_token,
            "/api/tests",
            json!({ "title": "Sneaky", "duration": 30 }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);
    assert_eq!(error_code(response).await, "FORBIDDEN");

    // MCQ without a correct option.
    let response = app
        .post(
            &owner_token,
            "/api/questions",
            json!({
                "type": "MCQ",
                "title": "Broken question",
                "content": "This question has no right answer.",
                "options": [
                    { "text": "One", "isCorrect": false },
                    { "text": "Two", "isCorrect": false }
                ]
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    // Empty test cannot be published.
    let response = app
        .post(&owner_token, "/api/tests", json!({ "title": "Empty", "duration": 30 }))
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["passingScore"].as_f64(), Some(50.0));
    assert_eq!(body["data"]["totalMarks"], 100);
    let empty_id = body["data"]["id"].as_str().unwrap().to_string();
    let response = app
        .post(&owner_token, &format!("/api/tests/{}/publish", empty_id), json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    // Binding twice conflicts; a bound question cannot be deleted.
    let mcq = app.create_mcq(&owner_token).await;
    let test_id = app.publish_test(&owner_token, 4, &[&mcq]).await;
    let response = app
        .post(
            &owner_token,
            &format!("/api/tests/{}/questions", test_id),
            json!({ "questionId": mcq }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);
    assert_eq!(error_code(response).await, "ALREADY_EXISTS");

    let response = app
        .client
        .delete(app.url(&format!("/api/questions/{}", mcq)))
        .bearer_auth(&owner_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 409);
    assert_eq!(error_code(response).await, "CONFLICT");
}
