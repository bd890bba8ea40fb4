use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{field} must be a number, got '{value}'")]
    NotNumeric { field: &'static str, value: String },

    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("Unknown gender '{0}', expected 'male' or 'female'")]
    UnknownGender(String),

    #[error("{0} do not match")]
    Mismatch(&'static str),

    #[error("No admin action selected")]
    UnknownAdminAction,
}

pub type ValidationResult<T> = Result<T, ValidationError>;
