use axum::{
    extract::{Form, Query, State},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tower_sessions::Session;
use crate::errors::{AppError, AppResult, StoreError};
use crate::fitness::{trend_data_uri, Measurement, TREND_WINDOW};
use crate::middleware::USER_SESSION_KEY;
use crate::models::{CalculateForm, Reading};
use crate::state::AppState;
use crate::templates::{self, escape_html, Notice, NoticeQuery};
use super::auth::session_username;

// A user deleted by the admin while still logged in loses the session
async fn account_gone(session: &Session, username: &str) -> AppError {
    tracing::warn!("Session user {} no longer exists", username);
    if let Err(e) = session.remove::<String>(USER_SESSION_KEY).await {
        tracing::warn!("Session removal error: {}", e);
    }
    AppError::Auth("Your account no longer exists.".into())
}

fn result_html(reading: &Reading) -> String {
    format!(
        r#"<div class="result">
            <p>BMI: <strong>{:.2}</strong> ({})</p>
            <p>Body fat: <strong>{:.2}%</strong></p>
        </div>"#,
        reading.bmi, reading.bmi_category, reading.body_fat_percent
    )
}

pub async fn serve_calculate_page(
    session: Session,
    Query(query): Query<NoticeQuery>,
) -> AppResult<Response> {
    let username = session_username(&session).await?;
    let notice = query.into_notice();

    let page = templates::render("calculate", &[
        ("notice", templates::notice_html(notice.as_ref())),
        ("username", escape_html(&username)),
        ("result", String::new()),
    ])?;
    Ok(page.into_response())
}

pub async fn handle_calculate(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CalculateForm>,
) -> AppResult<Response> {
    let username = session_username(&session).await?;

    let measurement = Measurement::parse(&form.weight, &form.height, &form.age, &form.gender)?;
    let metrics = measurement.compute();
    let reading = Reading::new(&measurement, &metrics, Utc::now());

    tracing::debug!(
        "Computed bmi={} body_fat={} for user {}",
        reading.bmi, reading.body_fat_percent, username
    );

    match state.store.append_reading(&username, &reading).await {
        Ok(()) => {}
        Err(StoreError::NotFound(_)) => return Err(account_gone(&session, &username).await),
        Err(e) => return Err(e.into()),
    }

    tracing::info!("Recorded reading for user {}", username);
    let notice = Notice::success("Calculation complete.");
    let page = templates::render("calculate", &[
        ("notice", notice.to_html()),
        ("username", escape_html(&username)),
        ("result", result_html(&reading)),
    ])?;
    Ok(page.into_response())
}

fn history_rows(history: &[Reading]) -> String {
    history
        .iter()
        .map(|r| {
            format!(
                r#"<tr>
                <td>{}</td>
                <td>{:.1}</td>
                <td>{:.1}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{:.2}</td>
                <td>{:.2}</td>
                <td>{}</td>
            </tr>"#,
                r.timestamp.format("%Y-%m-%d %H:%M:%S"),
                r.weight_kg,
                r.height_cm,
                r.age,
                r.gender,
                r.bmi,
                r.body_fat_percent,
                r.bmi_category
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn serve_history(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<NoticeQuery>,
) -> AppResult<Response> {
    let username = session_username(&session).await?;

    let user = match state.store.find_user(&username).await? {
        Some(user) => user,
        None => return Err(account_gone(&session, &username).await),
    };

    tracing::debug!("User {} has {} readings", username, user.history.len());

    // A broken chart should not take the whole page down
    let chart = match trend_data_uri(&user.history) {
        Ok(Some(uri)) => format!(r#"<img class="trend" src="{}" alt="BMI trend">"#, uri),
        Ok(None) => r#"<p class="empty">No readings yet.</p>"#.to_string(),
        Err(e) => {
            tracing::warn!("Failed to render trend chart for {}: {}", username, e);
            r#"<p class="empty">Chart unavailable.</p>"#.to_string()
        }
    };

    let notice = query.into_notice();
    let page = templates::render("history", &[
        ("notice", templates::notice_html(notice.as_ref())),
        ("username", escape_html(&username)),
        ("chart", chart),
        ("trend_window", TREND_WINDOW.to_string()),
        ("reading_count", user.history.len().to_string()),
        ("rows", history_rows(&user.history)),
    ])?;
    Ok(page.into_response())
}

pub async fn handle_clear_history(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let username = session_username(&session).await?;

    let cleared = match state.store.clear_history(&username).await {
        Ok(n) => n,
        Err(StoreError::NotFound(_)) => return Err(account_gone(&session, &username).await),
        Err(e) => return Err(e.into()),
    };

    tracing::info!("Cleared {} readings for user {}", cleared, username);
    Ok(Notice::success("History cleared.").redirect("/history").into_response())
}
