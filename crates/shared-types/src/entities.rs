//! # Read-Model Entities
//!
//! The user record served by the read model, and the credential payload a
//! `LoginUser` command carries.

use serde::{Deserialize, Serialize};

/// A stored user record.
///
/// `password` holds the salted hash in storage. It is cleared before a record
/// leaves the handler and omitted from the wire when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "userID", default)]
    pub user_id: String,

    #[serde(default)]
    pub email: String,

    #[serde(rename = "firstName", default)]
    pub first_name: String,

    #[serde(rename = "lastName", default)]
    pub last_name: String,

    #[serde(rename = "userName", default)]
    pub user_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    #[serde(default)]
    pub role: String,
}

/// Credentials carried in a `LoginUser` payload.
///
/// Absent fields decode as empty, so an incomplete payload fails as bad
/// credentials rather than as an undecodable payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    #[serde(rename = "userName", default)]
    pub user_name: String,

    #[serde(default)]
    pub password: String,
}
