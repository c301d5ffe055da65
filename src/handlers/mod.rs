pub mod activity;
pub mod comment;
pub mod external;
pub mod inbox;
pub mod subscriber;
pub mod templates;
