use axum::{
    extract::{Form, Query, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use crate::errors::{AppError, AppResult};
use crate::middleware::ADMIN_SESSION_KEY;
use crate::models::{AdminAction, AdminForm, LoginForm, User, UserSummary};
use crate::services::HostMetrics;
use crate::state::{verify_password, AppState};
use crate::templates::{self, escape_html, Notice, NoticeQuery};

pub async fn serve_admin_login_page(Query(query): Query<NoticeQuery>) -> AppResult<Response> {
    let notice = query.into_notice();
    let page = templates::render("admin_login", &[("notice", templates::notice_html(notice.as_ref()))])?;
    Ok(page.into_response())
}

// The configured administrator, or any stored account flagged as admin
async fn verify_admin(state: &AppState, form: &LoginForm) -> AppResult<bool> {
    if state.admin.verify(form.username(), &form.password).await? {
        return Ok(true);
    }

    match state.store.find_user(form.username()).await? {
        Some(user) if user.is_admin => verify_password(&form.password, &user.password_hash).await,
        _ => Ok(false),
    }
}

pub async fn handle_admin_login(
    State(state): State<AppState>,
    session: Session,
    Form(login_form): Form<LoginForm>,
) -> AppResult<Response> {
    tracing::info!("Admin login attempt for: {}", login_form.username());

    if !verify_admin(&state, &login_form).await? {
        tracing::warn!("Rejected admin login for: {}", login_form.username());
        return Ok(Notice::danger("Invalid administrator credentials.")
            .redirect("/admin_login")
            .into_response());
    }

    session.cycle_id().await?;
    session.insert(ADMIN_SESSION_KEY, true).await?;

    tracing::info!("Administrator {} logged in", login_form.username());
    Ok(Notice::success("Administrator login successful.")
        .redirect("/admin")
        .into_response())
}

pub async fn handle_admin_logout(session: Session) -> Response {
    if let Err(e) = session.remove::<bool>(ADMIN_SESSION_KEY).await {
        tracing::warn!("Session removal error: {}", e);
    }
    Notice::success("Administrator logged out.").redirect("/admin_login").into_response()
}

fn user_rows(users: &[UserSummary]) -> String {
    users
        .iter()
        .map(|u| {
            format!(
                r#"<tr>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
            </tr>"#,
                escape_html(&u.username),
                if u.is_admin { "yes" } else { "no" },
                u.reading_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn serve_admin_dashboard(
    State(state): State<AppState>,
    Query(query): Query<NoticeQuery>,
) -> AppResult<Response> {
    let users = state.store.list_users().await?;
    let metrics: HostMetrics = state.host_metrics.read().await.clone();

    tracing::debug!(
        "Admin dashboard: {} users, cpu {:.1}%, memory {:.1}%",
        users.len(), metrics.cpu_percent, metrics.memory_percent
    );

    let notice = query.into_notice();
    let page = templates::render("admin", &[
        ("notice", templates::notice_html(notice.as_ref())),
        ("cpu_percent", format!("{:.1}", metrics.cpu_percent)),
        ("memory_used", metrics.memory_used_mb.to_string()),
        ("memory_total", metrics.memory_total_mb.to_string()),
        ("memory_percent", format!("{:.1}", metrics.memory_percent)),
        ("sampled_at", metrics.sampled_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ("user_count", users.len().to_string()),
        ("users", user_rows(&users)),
    ])?;
    Ok(page.into_response())
}

async fn apply_action(state: &AppState, action: AdminAction) -> AppResult<Notice> {
    match action {
        AdminAction::AddUser { username, password, is_admin } => {
            let user = User::new(username.clone(), state.hash_password(&password).await?, is_admin);
            match state.store.create_user(&user).await.map_err(AppError::from) {
                Ok(()) => {
                    tracing::info!("Admin added user {} (admin: {})", username, is_admin);
                    Ok(Notice::success(format!("User {} added.", username)))
                }
                Err(AppError::Duplicate(_)) => {
                    Ok(Notice::warning(format!("User {} already exists.", username)))
                }
                Err(e) => Err(e),
            }
        }
        AdminAction::DeleteUser { username } => {
            if state.store.delete_user(&username).await? {
                tracing::info!("Admin deleted user {}", username);
                Ok(Notice::success(format!("User {} deleted.", username)))
            } else {
                Ok(Notice::info(format!("User {} does not exist.", username)))
            }
        }
        AdminAction::ChangePassword { username, password } => {
            let password_hash = state.hash_password(&password).await?;
            match state.store.set_password_hash(&username, &password_hash).await.map_err(AppError::from) {
                Ok(()) => {
                    tracing::info!("Admin changed password for {}", username);
                    Ok(Notice::success(format!("Password for {} updated.", username)))
                }
                Err(AppError::NotFound(_)) => {
                    Ok(Notice::warning(format!("User {} does not exist.", username)))
                }
                Err(e) => Err(e),
            }
        }
    }
}

pub async fn handle_admin_action(
    State(state): State<AppState>,
    Form(form): Form<AdminForm>,
) -> AppResult<Response> {
    let notice = match AdminAction::try_from(form) {
        Ok(action) => apply_action(&state, action).await?,
        Err(e) => Notice::danger(e.to_string()),
    };
    Ok(notice.redirect("/admin").into_response())
}
