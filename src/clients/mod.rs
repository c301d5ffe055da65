pub mod database;
pub mod health;
pub mod mailer;
pub mod redis;
