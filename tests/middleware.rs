use std::collections::HashMap;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{middleware, Json, Router};
use http_body_util::BodyExt;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::Value;
use time::OffsetDateTime;
use tower::ServiceExt;

use gatehouse::{
    auth_routes, authenticate, AccessClaims, AuthConfig, AuthState, BoxError, Directory,
    MemoryStore, PermissionGate, Principal, PrincipalId, Role, RoleId, Throttle, User,
};

const SECRET: &str = "integration-test-secret-integration";

/// Directory double backed by a fixed user map.
#[derive(Clone, Default)]
struct MockDirectory {
    users: HashMap<i64, User>,
    fail: bool,
}

impl Directory for MockDirectory {
    async fn user_by_id(&self, id: PrincipalId) -> Result<Option<User>, BoxError> {
        if self.fail {
            return Err("directory down".into());
        }
        Ok(self.users.get(&id.0).cloned())
    }

    async fn roles_and_permissions_for_user(&self, id: PrincipalId) -> Result<Vec<Role>, BoxError> {
        if self.fail {
            return Err("directory down".into());
        }
        Ok(self
            .users
            .get(&id.0)
            .map(|u| u.roles.clone())
            .unwrap_or_default())
    }
}

fn admin_user() -> User {
    User {
        id: PrincipalId(1),
        email: "root@example.com".into(),
        roles: vec![Role {
            id: RoleId(10),
            name: "admin-role".into(),
            permissions: vec!["admin".into()],
        }],
    }
}

fn reader_user() -> User {
    User {
        id: PrincipalId(2),
        email: "reader@example.com".into(),
        roles: vec![Role {
            id: RoleId(20),
            name: "reader".into(),
            permissions: vec!["read".into()],
        }],
    }
}

fn directory() -> MockDirectory {
    MockDirectory {
        users: HashMap::from([(1, admin_user()), (2, reader_user())]),
        fail: false,
    }
}

fn auth_state(directory: MockDirectory) -> AuthState<MockDirectory, MemoryStore> {
    AuthState::new(AuthConfig::new(SECRET), directory, MemoryStore::new())
}

fn app(state: &AuthState<MockDirectory, MemoryStore>) -> Router {
    let users = Router::new()
        .route("/users", get(|| async { "users" }))
        .route_layer(PermissionGate::new(state.clone(), &["manage_users"]));
    let ping = Router::new()
        .route("/ping", get(|| async { "pong" }))
        .route_layer(PermissionGate::new(state.clone(), &["all"]));
    let search = Router::new()
        .route("/search", get(|| async { "results" }))
        .route_layer(Throttle::new(
            state.limiter(),
            "search",
            Duration::from_secs(60),
            2,
        ));

    let protected = Router::new()
        .route("/me", get(me))
        .merge(users)
        .merge(ping)
        .merge(search)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate::<MockDirectory, MemoryStore>,
        ));

    protected.merge(auth_routes(state.clone()))
}

async fn me(principal: Principal) -> Json<Value> {
    Json(serde_json::json!({
        "id": principal.id,
        "email": principal.email,
    }))
}

fn request(uri: &str, cookies: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder.body(Body::empty()).unwrap()
}

fn cookie_pair(access: &str, refresh: &str) -> String {
    format!("access_token={access}; refresh_token={refresh}")
}

/// Extract the value of a cookie named `name` from the Set-Cookie headers.
fn set_cookie_value(response: &Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|raw| raw.starts_with(&prefix))
        .map(|raw| raw.split(';').next().unwrap()[prefix.len()..].to_string())
}

fn expired_access_token(user: &User) -> String {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let claims = AccessClaims {
        sub: user.id,
        email: user.email.clone(),
        roles: user.role_names(),
        role_ids: user.role_ids(),
        iat: now - 3600,
        exp: now - 120,
        jti: "expired-jti".into(),
        token_type: "access".into(),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn anonymous_request_is_unauthorized() {
    let state = auth_state(directory());
    let response = app(&state).oneshot(request("/me", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_access_token_authenticates_without_rotation() {
    let state = auth_state(directory());
    let pair = state.codec().issue_pair(&reader_user()).unwrap();

    let response = app(&state)
        .oneshot(request(
            "/me",
            Some(&cookie_pair(&pair.access_token, &pair.refresh_token)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // Still inside the access window: no rotation, no cookie changes.
    assert!(set_cookie_value(&response, "access_token").is_none());

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["id"], 2);
    assert_eq!(json["email"], "reader@example.com");
}

#[tokio::test]
async fn tampered_access_token_is_rejected_without_refresh() {
    let state = auth_state(directory());
    let pair = state.codec().issue_pair(&reader_user()).unwrap();
    let tampered = format!("{}x", pair.access_token);

    // The refresh token is perfectly valid: a tampered access token must
    // still short-circuit to 401 rather than rotate.
    let response = app(&state)
        .oneshot(request(
            "/me",
            Some(&cookie_pair(&tampered, &pair.refresh_token)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie_value(&response, "access_token").is_none());
}

#[tokio::test]
async fn expired_access_with_valid_refresh_rotates_and_bypasses() {
    // End to end: admin principal, expired access token, valid refresh
    // token. The gateway rotates the pair, resolves {"admin"}, and the
    // gate allows a route requiring "manage_users" via the bypass.
    let state = auth_state(directory());
    let user = admin_user();
    let access = expired_access_token(&user);
    let refresh = state.codec().issue_refresh(user.id).unwrap();

    let response = app(&state)
        .oneshot(request("/users", Some(&cookie_pair(&access, &refresh))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let new_access = set_cookie_value(&response, "access_token").expect("rotated access cookie");
    let new_refresh = set_cookie_value(&response, "refresh_token").expect("rotated refresh cookie");
    assert_ne!(new_access, access);
    assert_ne!(new_refresh, refresh);

    // The rotated pair works on its own.
    let response = app(&state)
        .oneshot(request("/me", Some(&cookie_pair(&new_access, &new_refresh))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The superseded refresh token was retired during rotation.
    let response = app(&state)
        .oneshot(request(
            "/users",
            Some(&cookie_pair(&expired_access_token(&user), &refresh)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rotated_cookies_carry_session_flags() {
    let state = auth_state(directory());
    let user = admin_user();
    let refresh = state.codec().issue_refresh(user.id).unwrap();

    let response = app(&state)
        .oneshot(request(
            "/me",
            Some(&format!("refresh_token={refresh}")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let raw = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|raw| raw.starts_with("access_token="))
        .unwrap();
    assert!(raw.contains("HttpOnly"));
    assert!(raw.contains("Secure"));
    assert!(raw.contains("SameSite=Strict"));
}

#[tokio::test]
async fn missing_refresh_cookie_fails_the_refresh_path() {
    let state = auth_state(directory());
    let access = expired_access_token(&admin_user());

    let response = app(&state)
        .oneshot(request("/me", Some(&format!("access_token={access}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_for_deleted_user_is_rejected() {
    let state = auth_state(directory());
    let refresh = state.codec().issue_refresh(PrincipalId(999)).unwrap();

    let response = app(&state)
        .oneshot(request("/me", Some(&format!("refresh_token={refresh}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_and_clears_both_tokens() {
    let state = auth_state(directory());
    let pair = state.codec().issue_pair(&reader_user()).unwrap();
    let cookies = cookie_pair(&pair.access_token, &pair.refresh_token);

    let response = app(&state)
        .oneshot(request("/auth/logout", Some(&cookies)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(set_cookie_value(&response, "access_token").as_deref(), Some(""));
    assert_eq!(set_cookie_value(&response, "refresh_token").as_deref(), Some(""));

    // Revocation precedence: the access token is structurally valid and
    // unexpired, but must now be rejected.
    let response = app(&state).oneshot(request("/me", Some(&cookies))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The refresh token alone is dead too.
    let response = app(&state)
        .oneshot(request(
            "/me",
            Some(&format!("refresh_token={}", pair.refresh_token)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn gate_denies_missing_permission() {
    let state = auth_state(directory());
    let pair = state.codec().issue_pair(&reader_user()).unwrap();

    let response = app(&state)
        .oneshot(request(
            "/users",
            Some(&cookie_pair(&pair.access_token, &pair.refresh_token)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn all_sentinel_admits_any_authenticated_principal() {
    let state = auth_state(directory());
    let pair = state.codec().issue_pair(&reader_user()).unwrap();

    let response = app(&state)
        .oneshot(request(
            "/ping",
            Some(&cookie_pair(&pair.access_token, &pair.refresh_token)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // "all" still means authenticated: anonymous stays out.
    let response = app(&state).oneshot(request("/ping", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn throttle_answers_429_when_exhausted() {
    let state = auth_state(directory());
    let pair = state.codec().issue_pair(&reader_user()).unwrap();
    let cookies = cookie_pair(&pair.access_token, &pair.refresh_token);

    for _ in 0..2 {
        let response = app(&state)
            .oneshot(request("/search", Some(&cookies)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app(&state)
        .oneshot(request("/search", Some(&cookies)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn directory_failure_is_an_internal_error() {
    let mut broken = directory();
    broken.fail = true;
    let state = auth_state(broken);

    // Token verifies fine; resolution has a cold cache and a dead
    // Directory behind it.
    let healthy = auth_state(directory());
    let pair = healthy.codec().issue_pair(&reader_user()).unwrap();

    let response = app(&state)
        .oneshot(request(
            "/me",
            Some(&cookie_pair(&pair.access_token, &pair.refresh_token)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
