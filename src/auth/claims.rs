use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload identifying a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub user_id: i64,     // internal id
    pub user_uuid: Uuid,  // external id, the one authorization compares
    pub username: String,
    pub email: String,
    pub iat: usize,       // issued at (unix timestamp)
    pub exp: usize,       // expires at (unix timestamp)
    pub iss: String,      // issuer
    pub aud: String,      // audience
}
