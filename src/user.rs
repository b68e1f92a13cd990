use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    // kept as "password" on disk, it only ever holds the bcrypt hash
    #[serde(rename = "password", alias = "passwordHash")]
    pub pwhash: String,
}

/// Every account, keyed by (case-sensitive) username.
pub type Users = BTreeMap<String, User>;
