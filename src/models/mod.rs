mod user;
mod forms;

pub use user::{User, Reading, UserSummary};
pub use forms::{LoginForm, RegisterForm, CalculateForm, AdminForm, AdminAction};
