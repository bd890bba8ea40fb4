mod auth;
mod calculate;
mod admin;

pub use auth::{index, serve_login_page, serve_register_page, handle_login, handle_register, handle_logout};
pub use calculate::{serve_calculate_page, handle_calculate, serve_history, handle_clear_history};
pub use admin::{
    serve_admin_login_page, handle_admin_login, handle_admin_logout,
    serve_admin_dashboard, handle_admin_action,
};
