use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use crate::errors::AppError;
use crate::templates::Notice;

// The IntoResponse trait implementation converts AppError into a well-formed HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // Authentication errors redirect to the matching login page
            AppError::Auth(msg) => Notice::danger(msg).redirect("/login").into_response(),

            AppError::AdminAuth(msg) => Notice::danger(msg).redirect("/admin_login").into_response(),

            // Bad measurements go back to the form
            AppError::Validation(err) => {
                Notice::danger(err.to_string()).redirect("/calculate").into_response()
            }

            AppError::Duplicate(name) => (
                StatusCode::CONFLICT,
                format!("User {} already exists", name)
            ).into_response(),

            AppError::NotFound(name) => (
                StatusCode::NOT_FOUND,
                format!("User {} not found", name)
            ).into_response(),

            // Everything else is an internal server error
            err => {
                tracing::error!("Request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Internal error: {}", err)
                ).into_response()
            }
        }
    }
}
