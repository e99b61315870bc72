// Models module - Database entity representations

pub mod admin_user;
pub mod card;

pub use admin_user::AdminUser;
pub use card::{Card, CardEvent, CardSummary};
