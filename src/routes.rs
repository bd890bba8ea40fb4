use axum::{
    routing::{get, post},
    Router,
    middleware::from_fn,
};
use time::Duration;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tower_sessions::cookie::SameSite;
use crate::config::SessionConfig;
use crate::state::AppState;
use crate::{handlers, middleware};

pub fn session_layer(config: &SessionConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.secure)
        .with_same_site(SameSite::Lax)
        .with_name("session")
        .with_expiry(Expiry::OnInactivity(Duration::minutes(config.inactivity_minutes)))
}

pub fn build_router(state: AppState) -> Router {
    let session_layer = session_layer(&state.config.session);

    Router::new()
        // Auth routes
        .route("/", get(handlers::index))
        .route("/login", get(handlers::serve_login_page).post(handlers::handle_login))
        .route("/register", get(handlers::serve_register_page).post(handlers::handle_register))
        .route("/logout", post(handlers::handle_logout))

        // Measurement routes
        .route("/calculate", get(handlers::serve_calculate_page).post(handlers::handle_calculate))
        .route("/history", get(handlers::serve_history))
        .route("/clear_history", post(handlers::handle_clear_history))

        // Admin routes
        .route("/admin_login", get(handlers::serve_admin_login_page).post(handlers::handle_admin_login))
        .route("/admin", get(handlers::serve_admin_dashboard).post(handlers::handle_admin_action))
        .route("/admin_logout", post(handlers::handle_admin_logout))

        // Static files
        .nest_service("/static", ServeDir::new("static"))

        // Add middleware
        .layer(from_fn(middleware::require_auth))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())

        // Add state
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use crate::config::Config;
    use crate::services::MemoryUserStore;

    fn test_app() -> (Router, AppState) {
        let store = Arc::new(MemoryUserStore::new());
        let state = AppState::new(store, Config::for_tests()).unwrap();
        (build_router(state.clone()), state)
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    fn get_req(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn location(resp: &Response) -> String {
        resp.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    fn session_cookie(resp: &Response) -> String {
        resp.headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .expect("response should set the session cookie")
            .to_string()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn register_and_login(app: &Router, username: &str, password: &str) -> String {
        let body = format!("username={0}&password={1}&confirm_password={1}", username, password);
        let resp = send(app, post_form("/register", &body, None)).await;
        assert!(location(&resp).starts_with("/login?"), "registration should land on login");

        let body = format!("username={}&password={}", username, password);
        let resp = send(app, post_form("/login", &body, None)).await;
        assert!(location(&resp).starts_with("/calculate?"));
        session_cookie(&resp)
    }

    #[tokio::test]
    async fn test_index_redirects_to_login() {
        let (app, _) = test_app();
        let resp = send(&app, get_req("/", None)).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/login");
    }

    #[tokio::test]
    async fn test_gated_routes_redirect_without_session() {
        let (app, _) = test_app();

        for uri in ["/calculate", "/history"] {
            let resp = send(&app, get_req(uri, None)).await;
            assert!(location(&resp).starts_with("/login?notice=Please%20log%20in%20first."), "{}", uri);
        }

        let resp = send(&app, post_form("/clear_history", "", None)).await;
        assert!(location(&resp).starts_with("/login?"));

        let resp = send(&app, get_req("/admin", None)).await;
        assert!(location(&resp).starts_with("/admin_login?"));
    }

    #[tokio::test]
    async fn test_login_page_shows_notice_escaped() {
        let (app, _) = test_app();
        let resp = send(&app, get_req("/login?notice=%3Cb%3Ehi%3C%2Fb%3E&level=danger", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("&lt;b&gt;hi&lt;/b&gt;"));
        assert!(!html.contains("<b>hi</b>"));
    }

    #[tokio::test]
    async fn test_calculate_records_reading() {
        let (app, state) = test_app();
        let cookie = register_and_login(&app, "amy", "secret").await;

        let resp = send(
            &app,
            post_form("/calculate", "weight=70&height=175&age=30&gender=male", Some(&cookie)),
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("22.86"));
        assert!(html.contains("18.13"));
        assert!(html.contains("normal"));

        let user = state.store.find_user("amy").await.unwrap().unwrap();
        assert_eq!(user.history.len(), 1);
        assert_eq!(user.history[0].bmi, 22.86);

        let resp = send(&app, get_req("/history", Some(&cookie))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("22.86"));
    }

    #[tokio::test]
    async fn test_invalid_measurement_is_rejected() {
        let (app, state) = test_app();
        let cookie = register_and_login(&app, "bob", "pw").await;

        let resp = send(
            &app,
            post_form("/calculate", "weight=abc&height=175&age=30&gender=male", Some(&cookie)),
        ).await;
        assert!(location(&resp).starts_with("/calculate?notice=weight%20must%20be%20a%20number"));

        let resp = send(
            &app,
            post_form("/calculate", "weight=70&height=175&age=30", Some(&cookie)),
        ).await;
        assert!(location(&resp).starts_with("/calculate?notice=gender%20is%20required"));

        let user = state.store.find_user("bob").await.unwrap().unwrap();
        assert!(user.history.is_empty());
    }

    #[tokio::test]
    async fn test_clear_history_then_append() {
        let (app, state) = test_app();
        let cookie = register_and_login(&app, "cy", "pw").await;

        for weight in ["60", "61", "62"] {
            let body = format!("weight={}&height=170&age=40&gender=female", weight);
            send(&app, post_form("/calculate", &body, Some(&cookie))).await;
        }
        assert_eq!(state.store.find_user("cy").await.unwrap().unwrap().history.len(), 3);

        let resp = send(&app, post_form("/clear_history", "", Some(&cookie))).await;
        assert!(location(&resp).starts_with("/history?"));
        assert!(state.store.find_user("cy").await.unwrap().unwrap().history.is_empty());

        send(&app, post_form("/calculate", "weight=63&height=170&age=40&gender=female", Some(&cookie))).await;
        assert_eq!(state.store.find_user("cy").await.unwrap().unwrap().history.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_first_account() {
        let (app, _) = test_app();
        register_and_login(&app, "dee", "first").await;

        let resp = send(&app, post_form("/register", "username=dee&password=second", None)).await;
        assert!(location(&resp).starts_with("/register?"));
        assert!(location(&resp).ends_with("level=warning"));

        let resp = send(&app, post_form("/login", "username=dee&password=second", None)).await;
        assert!(location(&resp).starts_with("/login?notice=Invalid"));

        let resp = send(&app, post_form("/login", "username=dee&password=first", None)).await;
        assert!(location(&resp).starts_with("/calculate?"));
    }

    #[tokio::test]
    async fn test_login_accepts_username_as_registered() {
        let (app, state) = test_app();
        let resp = send(&app, post_form("/register", "username=amy%20&password=pw", None)).await;
        assert!(location(&resp).starts_with("/login?"));
        assert!(state.store.find_user("amy").await.unwrap().is_some());

        let resp = send(&app, post_form("/login", "username=amy%20&password=pw", None)).await;
        assert!(location(&resp).starts_with("/calculate?"));
        let cookie = session_cookie(&resp);

        // The session must carry the stored name, or history writes would miss the account
        let resp = send(
            &app,
            post_form("/calculate", "weight=70&height=175&age=30&gender=male", Some(&cookie)),
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.store.find_user("amy").await.unwrap().unwrap().history.len(), 1);

        let resp = send(&app, post_form("/login", "username=%20amy&password=pw", None)).await;
        assert!(location(&resp).starts_with("/calculate?"));
    }

    #[tokio::test]
    async fn test_register_rejects_mismatched_passwords() {
        let (app, state) = test_app();
        let resp = send(
            &app,
            post_form("/register", "username=eve&password=a&confirm_password=b", None),
        ).await;
        assert!(location(&resp).starts_with("/register?notice=passwords%20do%20not%20match"));
        assert!(state.store.find_user("eve").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let (app, _) = test_app();
        let cookie = register_and_login(&app, "fay", "pw").await;

        let resp = send(&app, get_req("/calculate", Some(&cookie))).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, post_form("/logout", "", Some(&cookie))).await;
        assert!(location(&resp).starts_with("/login?"));

        let resp = send(&app, get_req("/calculate", Some(&cookie))).await;
        assert!(location(&resp).starts_with("/login?"));
    }

    #[tokio::test]
    async fn test_deleted_user_session_is_dropped() {
        let (app, state) = test_app();
        let cookie = register_and_login(&app, "gus", "pw").await;
        state.store.delete_user("gus").await.unwrap();

        let resp = send(
            &app,
            post_form("/calculate", "weight=70&height=175&age=30&gender=male", Some(&cookie)),
        ).await;
        assert!(location(&resp).starts_with("/login?notice=Your%20account%20no%20longer%20exists."));
    }

    async fn admin_cookie(app: &Router) -> String {
        let resp = send(app, post_form("/admin_login", "username=root&password=root-pass", None)).await;
        assert!(location(&resp).starts_with("/admin?"));
        session_cookie(&resp)
    }

    #[tokio::test]
    async fn test_admin_login_rejects_bad_credentials() {
        let (app, _) = test_app();
        let resp = send(&app, post_form("/admin_login", "username=root&password=nope", None)).await;
        assert!(location(&resp).starts_with("/admin_login?notice=Invalid"));

        // A regular account cannot reach the console
        register_and_login(&app, "hal", "pw").await;
        let resp = send(&app, post_form("/admin_login", "username=hal&password=pw", None)).await;
        assert!(location(&resp).starts_with("/admin_login?"));
    }

    #[tokio::test]
    async fn test_admin_login_trims_username() {
        let (app, _) = test_app();
        let resp = send(&app, post_form("/admin_login", "username=root%20&password=root-pass", None)).await;
        assert!(location(&resp).starts_with("/admin?"));
    }

    #[tokio::test]
    async fn test_admin_dashboard_does_not_expand_placeholders_in_notice() {
        let (app, _) = test_app();
        let cookie = admin_cookie(&app).await;

        let resp = send(&app, get_req("/admin?notice=%7B%7Buser_count%7D%7D", Some(&cookie))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains(r#"<div class="notice notice-info">{{user_count}}</div>"#));
        assert!(html.contains("Users (0)"));
        assert!(html.contains("Sampled at "));
    }

    #[tokio::test]
    async fn test_admin_console_operations() {
        let (app, state) = test_app();
        let cookie = admin_cookie(&app).await;

        let resp = send(
            &app,
            post_form("/admin", "add_user=1&new_username=ivy&new_password=pw1&new_is_admin=on", Some(&cookie)),
        ).await;
        assert!(location(&resp).starts_with("/admin?notice=User%20ivy%20added."));
        let ivy = state.store.find_user("ivy").await.unwrap().unwrap();
        assert!(ivy.is_admin);

        let resp = send(
            &app,
            post_form("/admin", "add_user=1&new_username=ivy&new_password=other", Some(&cookie)),
        ).await;
        assert!(location(&resp).ends_with("level=warning"));

        let resp = send(
            &app,
            post_form("/admin", "change_password=1&change_username=ivy&changed_password=pw2", Some(&cookie)),
        ).await;
        assert!(location(&resp).ends_with("level=success"));
        let resp = send(&app, post_form("/login", "username=ivy&password=pw2", None)).await;
        assert!(location(&resp).starts_with("/calculate?"));

        let resp = send(
            &app,
            post_form("/admin", "change_password=1&change_username=nobody&changed_password=x", Some(&cookie)),
        ).await;
        assert!(location(&resp).ends_with("level=warning"));

        let resp = send(&app, get_req("/admin", Some(&cookie))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("ivy"));

        let resp = send(&app, post_form("/admin", "delete_user=1&delete_username=ivy", Some(&cookie))).await;
        assert!(location(&resp).ends_with("level=success"));
        assert!(state.store.find_user("ivy").await.unwrap().is_none());

        let resp = send(&app, post_form("/admin", "delete_user=1&delete_username=ivy", Some(&cookie))).await;
        assert!(location(&resp).ends_with("level=info"));

        let resp = send(&app, post_form("/admin", "", Some(&cookie))).await;
        assert!(location(&resp).ends_with("level=danger"));
    }

    #[tokio::test]
    async fn test_stored_admin_account_can_log_in() {
        let (app, state) = test_app();
        let hash = state.hash_password("boss").await.unwrap();
        state.store.create_user(&crate::models::User::new("jo", hash, true)).await.unwrap();

        let resp = send(&app, post_form("/admin_login", "username=jo&password=boss", None)).await;
        assert!(location(&resp).starts_with("/admin?"));
        let cookie = session_cookie(&resp);

        let resp = send(&app, post_form("/admin_logout", "", Some(&cookie))).await;
        assert!(location(&resp).starts_with("/admin_login?"));
        let resp = send(&app, get_req("/admin", Some(&cookie))).await;
        assert!(location(&resp).starts_with("/admin_login?"));
    }
}
