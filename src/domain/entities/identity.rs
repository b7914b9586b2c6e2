use serde::{Deserialize, Serialize};

/// Signed token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub admin: bool,
    pub exp: usize,
    pub iat: usize,
}

/// The authenticated caller, as resolved by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub admin: bool,
}

impl Identity {
    pub fn can_act_for(&self, user_id: &str) -> bool {
        self.admin || self.uid == user_id
    }
}
