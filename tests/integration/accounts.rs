use serde_json::json;

use crate::*;

#[tokio::test]
async fn test_register_and_login() {
    let node = Node::start().await.unwrap();

    let (status, body) = node
        .post(
            "/register/",
            &json!({"username": "carol", "email": "carol@example.com", "password": PASSWORD}),
            None,
        )
        .await
        .unwrap();
    assert_eq!(status, 201);
    assert_eq!(body["message"], "User registered successfully");

    let (status, body) = node
        .post("/login/", &json!({"username": "carol", "password": PASSWORD}), None)
        .await
        .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["email"], "carol@example.com");
    assert!(body["user_id"].is_number());
    assert_eq!(body["token"].as_str().unwrap().len(), 40);
}

#[tokio::test]
async fn test_weak_password_creates_no_account() {
    let node = Node::start().await.unwrap();

    let (status, body) = node
        .post(
            "/register/",
            &json!({"username": "dave", "email": "dave@example.com", "password": "password"}),
            None,
        )
        .await
        .unwrap();
    assert_eq!(status, 400);
    assert!(body["password"].is_array(), "expected password errors: {body}");

    // The account must not exist, so logging in fails.
    let (status, body) = node
        .post("/login/", &json!({"username": "dave", "password": "password"}), None)
        .await
        .unwrap();
    assert_eq!(status, 400);
    assert!(body["non_field_errors"].is_array());
}

#[tokio::test]
async fn test_tokens_are_per_user() {
    let node = Node::start().await.unwrap();
    let erin = node.account("erin").await.unwrap();
    let frank = node.account("frank").await.unwrap();
    assert_ne!(erin, frank);

    // Logging in again hands back the same token.
    let (_, body) = node
        .post("/login/", &json!({"username": "erin", "password": PASSWORD}), None)
        .await
        .unwrap();
    assert_eq!(body["token"], erin);
}

#[tokio::test]
async fn test_protected_routes_need_a_token() {
    let node = Node::start().await.unwrap();

    let (status, body) = node
        .post("/process/", &json!({"email": "a@b.com", "message": "hi"}), None)
        .await
        .unwrap();
    assert_eq!(status, 401);
    assert_eq!(body["detail"], "Authentication credentials were not provided.");

    let (status, body) = node.get("/task-status/anything/", Some("bogus")).await.unwrap();
    assert_eq!(status, 401);
    assert_eq!(body["detail"], "Invalid token.");

    assert_eq!(node.records.count().unwrap(), 0);
}

#[tokio::test]
async fn test_disallowed_host_is_rejected() {
    let node = Node::start_with(NodeOptions {
        allowed_hosts: vec!["courier.internal".to_string()],
        ..NodeOptions::default()
    })
    .await
    .unwrap();

    // reqwest sends Host: 127.0.0.1:<port>
    let (status, body) = node.get("/health/", None).await.unwrap();
    assert_eq!(status, 400);
    assert_eq!(body["detail"], "Invalid HTTP_HOST header");
}
