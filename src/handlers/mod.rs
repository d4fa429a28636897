mod admin;
mod health;
mod issues;
mod users;
mod util;

pub use admin::stats;
pub use health::health_check;
pub use issues::{create_issue, delete_issue, get_issue, list_issues, update_issue_status};
pub use users::{login, register};
