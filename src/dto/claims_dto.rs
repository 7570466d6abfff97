use serde::{Deserialize, Serialize};

pub const STAFF_ROLE: &str = "staff";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub role: Option<String>,
}

impl Claims {
    pub fn is_staff(&self) -> bool {
        self.role.as_deref() == Some(STAFF_ROLE)
    }
}
