//! Built-in actions.

pub mod login;

pub use login::{hash_password, LoginAction};
