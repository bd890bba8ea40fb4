use axum::{
    middleware::Next,
    response::{IntoResponse, Response},
    extract::Request,
    body::Body,
};
use tower_sessions::Session;
use crate::templates::Notice;

pub const USER_SESSION_KEY: &str = "user_session";
pub const ADMIN_SESSION_KEY: &str = "admin_logged_in";

const USER_ROUTES: [&str; 3] = ["/calculate", "/history", "/clear_history"];
const ADMIN_ROUTES: [&str; 1] = ["/admin"];

pub async fn require_auth(
    session: Session,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();

    if USER_ROUTES.contains(&path) {
        return match session.get::<String>(USER_SESSION_KEY).await {
            Ok(Some(_)) => next.run(req).await,
            _ => Notice::danger("Please log in first.").redirect("/login").into_response(),
        };
    }

    if ADMIN_ROUTES.contains(&path) {
        return match session.get::<bool>(ADMIN_SESSION_KEY).await {
            Ok(Some(true)) => next.run(req).await,
            _ => Notice::danger("Please log in as an administrator first.")
                .redirect("/admin_login")
                .into_response(),
        };
    }

    next.run(req).await
}
