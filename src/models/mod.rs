pub mod activity;
pub mod external;
pub mod health;
pub mod notification;
pub mod preference;
pub mod retry;
pub mod user;
