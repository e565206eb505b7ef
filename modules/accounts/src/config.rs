use serde::Deserialize;

use crate::domain::handlers::Limits;

/// `modules.accounts` section of the application config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccountsConfig {
    pub max_name_len: usize,
    pub max_email_len: usize,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            max_name_len: limits.max_name_len,
            max_email_len: limits.max_email_len,
        }
    }
}

impl AccountsConfig {
    pub fn limits(&self) -> Limits {
        Limits {
            max_name_len: self.max_name_len,
            max_email_len: self.max_email_len,
        }
    }
}
