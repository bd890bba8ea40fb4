use axum::{
    extract::{Form, Query, State},
    response::{IntoResponse, Response, Redirect},
};
use tower_sessions::Session;
use crate::errors::{AppError, AppResult};
use crate::middleware::USER_SESSION_KEY;
use crate::models::{LoginForm, RegisterForm, User};
use crate::state::{verify_password, AppState};
use crate::templates::{self, Notice, NoticeQuery};

pub async fn index() -> Redirect {
    Redirect::to("/login")
}

/// Username of the logged-in user, or an auth error that redirects to the login page.
pub async fn session_username(session: &Session) -> AppResult<String> {
    session
        .get::<String>(USER_SESSION_KEY)
        .await?
        .ok_or_else(|| AppError::Auth("Please log in first.".into()))
}

pub async fn serve_login_page(Query(query): Query<NoticeQuery>) -> AppResult<Response> {
    let notice = query.into_notice();
    let page = templates::render("login", &[("notice", templates::notice_html(notice.as_ref()))])?;
    Ok(page.into_response())
}

pub async fn serve_register_page(Query(query): Query<NoticeQuery>) -> AppResult<Response> {
    let notice = query.into_notice();
    let page = templates::render("register", &[("notice", templates::notice_html(notice.as_ref()))])?;
    Ok(page.into_response())
}

#[axum::debug_handler]
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    Form(login_form): Form<LoginForm>,
) -> AppResult<Response> {
    let username = login_form.username();
    tracing::info!("Login attempt for user: {}", username);

    let verified = match state.store.find_user(username).await? {
        Some(user) => verify_password(&login_form.password, &user.password_hash).await?,
        None => {
            tracing::debug!("User not found: {}", username);
            false
        }
    };

    if !verified {
        tracing::info!("Rejected login for user: {}", username);
        return Ok(Notice::danger("Invalid username or password.")
            .redirect("/login")
            .into_response());
    }

    session.cycle_id().await?;
    session.insert(USER_SESSION_KEY, username).await?;

    tracing::info!("User {} logged in", username);
    Ok(Notice::success("Welcome back, you are logged in.")
        .redirect("/calculate")
        .into_response())
}

pub async fn handle_register(
    State(state): State<AppState>,
    Form(register_form): Form<RegisterForm>,
) -> AppResult<Response> {
    if let Err(e) = register_form.validate() {
        return Ok(Notice::danger(e.to_string()).redirect("/register").into_response());
    }

    let username = register_form.username.trim().to_string();
    let password_hash = state.hash_password(&register_form.password).await?;
    let user = User::new(username.clone(), password_hash, false);

    match state.store.create_user(&user).await {
        Ok(()) => {
            tracing::info!("Registered new user: {}", username);
            Ok(Notice::success("Registration successful. Please log in.")
                .redirect("/login")
                .into_response())
        }
        Err(e) => match AppError::from(e) {
            AppError::Duplicate(_) => {
                tracing::info!("Registration rejected, username taken: {}", username);
                Ok(Notice::warning("That username is already taken.")
                    .redirect("/register")
                    .into_response())
            }
            other => Err(other),
        },
    }
}

#[axum::debug_handler]
pub async fn handle_logout(
    session: Session,
) -> Response {
    if let Err(e) = session.remove::<String>(USER_SESSION_KEY).await {
        tracing::warn!("Session removal error: {}", e);
    }
    Notice::success("You have been logged out.").redirect("/login").into_response()
}
