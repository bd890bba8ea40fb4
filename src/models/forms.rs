use serde::Deserialize;
use crate::errors::{ValidationError, ValidationResult};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    /// Trimmed the same way registration and the admin console store it.
    pub fn username(&self) -> &str {
        self.username.trim()
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub confirm_password: Option<String>,
}

impl RegisterForm {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::Missing("username"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::Missing("password"));
        }
        match &self.confirm_password {
            Some(confirm) if confirm != &self.password => Err(ValidationError::Mismatch("passwords")),
            _ => Ok(()),
        }
    }
}

// Kept as raw strings so bad input becomes a ValidationError, not a 422
#[derive(Debug, Deserialize, Default)]
pub struct CalculateForm {
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub height: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub gender: String,
}

/// Every admin console form posts here; the button name picks the action.
#[derive(Debug, Deserialize, Default)]
pub struct AdminForm {
    pub add_user: Option<String>,
    pub new_username: Option<String>,
    pub new_password: Option<String>,
    pub new_is_admin: Option<String>,

    pub delete_user: Option<String>,
    pub delete_username: Option<String>,

    pub change_password: Option<String>,
    pub change_username: Option<String>,
    pub changed_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    AddUser { username: String, password: String, is_admin: bool },
    DeleteUser { username: String },
    ChangePassword { username: String, password: String },
}

fn required(value: Option<String>, field: &'static str) -> ValidationResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::Missing(field))
}

impl TryFrom<AdminForm> for AdminAction {
    type Error = ValidationError;

    fn try_from(form: AdminForm) -> ValidationResult<Self> {
        if form.add_user.is_some() {
            Ok(AdminAction::AddUser {
                username: required(form.new_username, "new_username")?,
                password: required(form.new_password, "new_password")?,
                is_admin: form.new_is_admin.is_some(),
            })
        } else if form.delete_user.is_some() {
            Ok(AdminAction::DeleteUser {
                username: required(form.delete_username, "delete_username")?,
            })
        } else if form.change_password.is_some() {
            Ok(AdminAction::ChangePassword {
                username: required(form.change_username, "change_username")?,
                password: required(form.changed_password, "changed_password")?,
            })
        } else {
            Err(ValidationError::UnknownAdminAction)
        }
    }
}
