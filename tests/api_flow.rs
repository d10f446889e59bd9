//! End-to-end behavior of the HTTP API over the in-memory store.

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    http::{
        Method, Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
};
use chrono::{Duration, Utc};
use inkpost::{
    api::{
        self,
        handlers::auth::{AuthConfig, AuthState, issue_token},
    },
    store::{Comment, MemoryStore, Store, User},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    auth_state: Arc<AuthState>,
}

impl TestApp {
    fn new() -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let auth_state = Arc::new(AuthState::new(AuthConfig::new(SecretString::from(
            "integration-secret".to_string(),
        ))));
        let router = api::app(store.clone(), auth_state.clone())?;
        Ok(Self {
            router,
            store,
            auth_state,
        })
    }

    async fn seed(&self, username: &str, is_admin: bool) -> User {
        self.seed_at(username, is_admin, Utc::now()).await
    }

    async fn seed_at(
        &self,
        username: &str,
        is_admin: bool,
        created_at: chrono::DateTime<Utc>,
    ) -> User {
        let user = User {
            id: Uuid::now_v7(),
            username: username.to_string(),
            email: format!("{username}@inkpost.dev"),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$seeded$seeded".to_string(),
            profile_picture: "https://cdn.inkpost.dev/default.png".to_string(),
            is_admin,
            created_at,
            updated_at: created_at,
        };
        self.store.seed_user(user.clone()).await;
        user
    }

    fn cookie_for(&self, user: &User) -> Result<String> {
        let token = issue_token(&self.auth_state, user.id, user.is_admin)?;
        Ok(format!("access_token={token}"))
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value, Option<String>)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Ok((status, value, set_cookie))
    }
}

fn message(body: &Value) -> &str {
    body.get("message").and_then(Value::as_str).unwrap_or_default()
}

fn assert_no_password(value: &Value) {
    let text = value.to_string();
    assert!(!text.contains("password"), "password leaked: {text}");
    assert!(!text.contains("$argon2"), "hash leaked: {text}");
}

#[tokio::test]
async fn signup_signin_and_session_cookie() -> Result<()> {
    let app = TestApp::new()?;

    let (status, body, _) = app
        .send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({"username": "writer01", "email": "Writer01@Inkpost.dev", "password": "secret1"})),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message(&body), "Signup successful");

    let (status, _, _) = app
        .send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({"username": "writer02", "email": "writer01@inkpost.dev", "password": "secret1"})),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body, _) = app
        .send(
            Method::POST,
            "/api/auth/signin",
            None,
            Some(json!({"email": "writer01@inkpost.dev", "password": "wrong-password"})),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(message(&body), "Invalid password");

    let (status, body, set_cookie) = app
        .send(
            Method::POST,
            "/api/auth/signin",
            None,
            Some(json!({"email": "writer01@inkpost.dev", "password": "secret1"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_no_password(&body);
    let set_cookie = set_cookie.context("signin must set a cookie")?;
    assert!(set_cookie.starts_with("access_token="));
    assert!(set_cookie.contains("HttpOnly"));

    let cookie = set_cookie
        .split(';')
        .next()
        .context("cookie pair")?
        .to_string();
    let user_id = body
        .pointer("/user/id")
        .and_then(Value::as_str)
        .context("user id")?;
    let (status, body, _) = app
        .send(
            Method::PUT,
            &format!("/api/user/{user_id}"),
            Some(&cookie),
            Some(json!({"username": "newname1"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.pointer("/user/username").and_then(Value::as_str),
        Some("newname1")
    );
    Ok(())
}

#[tokio::test]
async fn signin_unknown_email_is_404() -> Result<()> {
    let app = TestApp::new()?;
    let (status, body, _) = app
        .send(
            Method::POST,
            "/api/auth/signin",
            None,
            Some(json!({"email": "ghost@inkpost.dev", "password": "secret1"})),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(message(&body), "User not found");
    assert_eq!(body.get("success"), Some(&Value::Bool(false)));
    assert_eq!(body.get("statusCode"), Some(&json!(404)));
    Ok(())
}

#[tokio::test]
async fn update_by_non_owner_is_401_without_mutation() -> Result<()> {
    let app = TestApp::new()?;
    let owner = app.seed("owner0001", false).await;
    let other = app.seed("other0001", false).await;

    let (status, body, _) = app
        .send(
            Method::PUT,
            &format!("/api/user/{}", owner.id),
            Some(&app.cookie_for(&other)?),
            Some(json!({"username": "newname1"})),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(message(&body), "You are not allowed to update this user");

    let stored = app.store.find_user(owner.id).await?.context("owner")?;
    assert_eq!(stored.username, "owner0001");
    Ok(())
}

#[tokio::test]
async fn update_without_session_is_401() -> Result<()> {
    let app = TestApp::new()?;
    let owner = app.seed("owner0001", false).await;
    let (status, body, _) = app
        .send(
            Method::PUT,
            &format!("/api/user/{}", owner.id),
            None,
            Some(json!({"username": "newname1"})),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(message(&body), "Unauthorized");
    Ok(())
}

#[tokio::test]
async fn username_rules_reject_without_mutation() -> Result<()> {
    let app = TestApp::new()?;
    let owner = app.seed("owner0001", false).await;
    let cookie = app.cookie_for(&owner)?;

    let cases = [
        ("short", "username must be between 7 and 20 characters"),
        (
            "abcdefghijklmnopqrstu",
            "username must be between 7 and 20 characters",
        ),
        ("new name1", "username can not contain spaces"),
        (" newname1 ", "username can not contain spaces"),
        ("newname1 ", "username can not contain spaces"),
        ("NewName1", "username must be lowercase"),
        ("new.name1", "username can only contain letters and numbers"),
    ];
    for (username, expected) in cases {
        let (status, body, _) = app
            .send(
                Method::PUT,
                &format!("/api/user/{}", owner.id),
                Some(&cookie),
                Some(json!({ "username": username })),
            )
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "username {username}");
        assert_eq!(message(&body), expected);
    }

    let stored = app.store.find_user(owner.id).await?.context("owner")?;
    assert_eq!(stored.username, "owner0001");
    Ok(())
}

#[tokio::test]
async fn signup_rejects_padded_username() -> Result<()> {
    let app = TestApp::new()?;
    let (status, body, _) = app
        .send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({"username": " writer01", "email": "writer01@inkpost.dev", "password": "secret1"})),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(message(&body), "username can not contain spaces");
    assert_eq!(app.store.count_users(None).await?, 0);
    Ok(())
}

#[tokio::test]
async fn password_is_hashed_and_never_returned() -> Result<()> {
    let app = TestApp::new()?;
    let owner = app.seed("owner0001", false).await;
    let cookie = app.cookie_for(&owner)?;

    let (status, body, _) = app
        .send(
            Method::PUT,
            &format!("/api/user/{}", owner.id),
            Some(&cookie),
            Some(json!({"password": "12345"})),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(message(&body), "password must be at least 6 characters");

    let (status, body, _) = app
        .send(
            Method::PUT,
            &format!("/api/user/{}", owner.id),
            Some(&cookie),
            Some(json!({"password": "longer-secret"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(message(&body), "User updated successfully");
    assert_no_password(&body);

    let stored = app.store.find_user(owner.id).await?.context("owner")?;
    assert_ne!(stored.password_hash, "longer-secret");
    assert!(stored.password_hash.starts_with("$argon2id$"));

    let (status, body, _) = app
        .send(Method::GET, &format!("/api/user/{}", owner.id), None, None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_no_password(&body);
    Ok(())
}

#[tokio::test]
async fn is_admin_in_body_is_ignored() -> Result<()> {
    let app = TestApp::new()?;
    let owner = app.seed("owner0001", false).await;

    let (status, body, _) = app
        .send(
            Method::PUT,
            &format!("/api/user/{}", owner.id),
            Some(&app.cookie_for(&owner)?),
            Some(json!({"isAdmin": true, "profilePicture": "https://cdn.inkpost.dev/me.png"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.pointer("/user/isAdmin"), Some(&Value::Bool(false)));

    let stored = app.store.find_user(owner.id).await?.context("owner")?;
    assert!(!stored.is_admin);
    assert_eq!(stored.profile_picture, "https://cdn.inkpost.dev/me.png");
    Ok(())
}

#[tokio::test]
async fn delete_rules() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.seed("admin0001", true).await;
    let alice = app.seed("alice0001", false).await;
    let bob = app.seed("bob000001", false).await;

    let (status, body, _) = app
        .send(
            Method::DELETE,
            &format!("/api/user/{}", alice.id),
            Some(&app.cookie_for(&bob)?),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(message(&body), "You are not allowed to delete this user");
    assert!(app.store.find_user(alice.id).await?.is_some());

    let (status, body, _) = app
        .send(
            Method::DELETE,
            &format!("/api/user/{}", bob.id),
            Some(&app.cookie_for(&bob)?),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(message(&body), "User has been deleted");

    let (status, _, _) = app
        .send(
            Method::DELETE,
            &format!("/api/user/{}", alice.id),
            Some(&app.cookie_for(&admin)?),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(app.store.find_user(alice.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn sign_out_clears_cookie() -> Result<()> {
    let app = TestApp::new()?;
    let (status, body, set_cookie) = app
        .send(Method::POST, "/api/user/signout", None, None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(message(&body), "User has been signed out");
    let set_cookie = set_cookie.context("signout must clear the cookie")?;
    assert!(set_cookie.starts_with("access_token=;"));
    assert!(set_cookie.contains("Max-Age=0"));
    Ok(())
}

#[tokio::test]
async fn user_listing_pagination_and_sort() -> Result<()> {
    let app = TestApp::new()?;
    let now = Utc::now();
    let admin = app.seed_at("admin0001", true, now - Duration::days(90)).await;
    for day in 1..=11 {
        app.seed_at(&format!("reader{day:03}"), false, now - Duration::days(day))
            .await;
    }
    let cookie = app.cookie_for(&admin)?;

    let (status, body, _) = app
        .send(Method::GET, "/api/user/getUsers", Some(&cookie), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(message(&body), "Users fetched successfully");
    let users = body.get("users").and_then(Value::as_array).context("users")?;
    assert_eq!(users.len(), 9);
    assert_eq!(
        users[0].get("username").and_then(Value::as_str),
        Some("reader001")
    );
    assert_eq!(body.get("totalUsers"), Some(&json!(12)));
    assert_eq!(body.get("lastMonthUsers"), Some(&json!(11)));
    assert_no_password(&body);

    let (status, body, _) = app
        .send(
            Method::GET,
            "/api/user/getUsers?sort=asc&limit=2&startIndex=1",
            Some(&cookie),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .get("users")
        .and_then(Value::as_array)
        .context("users")?
        .iter()
        .filter_map(|user| user.get("username").and_then(Value::as_str))
        .collect();
    assert_eq!(names, vec!["reader011", "reader010"]);

    let reader = app.seed("reader999", false).await;
    let (status, body, _) = app
        .send(
            Method::GET,
            "/api/user/getUsers",
            Some(&app.cookie_for(&reader)?),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message(&body), "You are not allowed to see all users");
    Ok(())
}

#[tokio::test]
async fn get_user_errors() -> Result<()> {
    let app = TestApp::new()?;
    let (status, body, _) = app
        .send(Method::GET, &format!("/api/user/{}", Uuid::now_v7()), None, None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(message(&body), "User not found");

    let (status, _, _) = app.send(Method::GET, "/api/user/123", None, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn comment_lifecycle() -> Result<()> {
    let app = TestApp::new()?;
    let author = app.seed("author001", false).await;
    let reader = app.seed("reader001", false).await;
    let admin = app.seed("admin0001", true).await;
    let post_id = Uuid::now_v7();
    let author_cookie = app.cookie_for(&author)?;
    let reader_cookie = app.cookie_for(&reader)?;

    let (status, body, _) = app
        .send(
            Method::POST,
            "/api/comment/create",
            Some(&author_cookie),
            Some(json!({"content": "  First!  ", "postId": post_id, "userId": author.id})),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.get("content").and_then(Value::as_str), Some("First!"));
    let comment_id = body
        .get("id")
        .and_then(Value::as_str)
        .context("comment id")?
        .to_string();

    let (status, body, _) = app
        .send(
            Method::POST,
            "/api/comment/create",
            Some(&reader_cookie),
            Some(json!({"content": "spoofed", "postId": post_id, "userId": author.id})),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message(&body), "You are not allowed to create this comment");

    let (status, body, _) = app
        .send(
            Method::POST,
            "/api/comment/create",
            Some(&author_cookie),
            Some(json!({"content": "x".repeat(201), "postId": post_id, "userId": author.id})),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(message(&body), "Comment must be at most 200 characters");

    let (status, body, _) = app
        .send(
            Method::PUT,
            &format!("/api/comment/likeComments/{comment_id}"),
            Some(&reader_cookie),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("numberOfLikes"), Some(&json!(1)));

    let (status, body, _) = app
        .send(
            Method::GET,
            &format!("/api/comment/getPostComments/{post_id}"),
            None,
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, _, _) = app
        .send(
            Method::PUT,
            &format!("/api/comment/likeComments/{comment_id}"),
            Some(&reader_cookie),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let stored = app
        .store
        .find_comment(Uuid::parse_str(&comment_id)?)
        .await?
        .context("comment")?;
    assert!(stored.likes.is_empty());

    let (status, body, _) = app
        .send(
            Method::PUT,
            &format!("/api/comment/editComment/{comment_id}"),
            Some(&reader_cookie),
            Some(json!({"content": "hijack"})),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message(&body), "You are not allowed to edit this comment");

    let (status, body, _) = app
        .send(
            Method::PUT,
            &format!("/api/comment/editComment/{comment_id}"),
            Some(&author_cookie),
            Some(json!({"content": "Edited"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("content").and_then(Value::as_str), Some("Edited"));

    let (status, _, _) = app
        .send(
            Method::DELETE,
            &format!("/api/comment/deleteComment/{comment_id}"),
            Some(&reader_cookie),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body, _) = app
        .send(
            Method::DELETE,
            &format!("/api/comment/deleteComment/{comment_id}"),
            Some(&app.cookie_for(&admin)?),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(message(&body), "Comment has been deleted");
    Ok(())
}

#[tokio::test]
async fn deleted_user_cannot_comment_with_old_cookie() -> Result<()> {
    let app = TestApp::new()?;
    let author = app.seed("author001", false).await;
    let cookie = app.cookie_for(&author)?;

    let (status, _, _) = app
        .send(
            Method::DELETE,
            &format!("/api/user/{}", author.id),
            Some(&cookie),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = app
        .send(
            Method::POST,
            "/api/comment/create",
            Some(&cookie),
            Some(json!({"content": "still here?", "postId": Uuid::now_v7(), "userId": author.id})),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(message(&body), "Unauthorized");
    assert_eq!(app.store.count_comments(None).await?, 0);
    Ok(())
}

#[tokio::test]
async fn comment_admin_listing() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.seed("admin0001", true).await;
    let author = app.seed("author001", false).await;
    let now = Utc::now();
    for day in [1_i64, 2, 60] {
        let created_at = now - Duration::days(day);
        app.store
            .seed_comment(Comment {
                id: Uuid::now_v7(),
                post_id: Uuid::now_v7(),
                user_id: author.id,
                content: format!("{day} days ago"),
                likes: Vec::new(),
                created_at,
                updated_at: created_at,
            })
            .await;
    }

    let (status, body, _) = app
        .send(
            Method::GET,
            "/api/comment/getComments?limit=2",
            Some(&app.cookie_for(&admin)?),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.get("comments").and_then(Value::as_array).map(Vec::len),
        Some(2)
    );
    assert_eq!(body.get("totalComments"), Some(&json!(3)));
    assert_eq!(body.get("lastMonthComments"), Some(&json!(2)));

    let (status, body, _) = app
        .send(
            Method::GET,
            "/api/comment/getComments",
            Some(&app.cookie_for(&author)?),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message(&body), "You are not allowed to get all comments");
    Ok(())
}

#[tokio::test]
async fn health_and_root() -> Result<()> {
    let app = TestApp::new()?;
    let (status, body, _) = app.send(Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("database").and_then(Value::as_str), Some("ok"));

    let (status, body, _) = app.send(Method::GET, "/", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.get("name").and_then(Value::as_str),
        Some(env!("CARGO_PKG_NAME"))
    );
    Ok(())
}
