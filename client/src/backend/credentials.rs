//! Basic authentication for ActiveSync requests

use base64::Engine;

use crate::types::StepResult;

/// Account credentials as configured
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub domain: Option<String>,
}

impl Credentials {
    pub fn new(username: &str, password: &str, domain: Option<&str>) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            domain: domain.map(|d| d.to_string()),
        }
    }

    /// Username as sent to the server, `DOMAIN\user` when a domain is set
    pub fn qualified_username(&self) -> String {
        match self.domain.as_deref() {
            Some(domain) if !domain.is_empty() => format!("{}\\{}", domain, self.username),
            _ => self.username.clone(),
        }
    }

    /// Build the `Authorization` header value
    ///
    /// Empty username or password is rejected with `UserFixRequired`.
    pub fn basic_auth_header(&self) -> Result<String, StepResult> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(StepResult::user_fix("Please provide valid credentials"));
        }

        let credentials = format!("{}:{}", self.qualified_username(), self.password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        Ok(format!("Basic {}", encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatusCode;

    #[test]
    fn test_qualified_username() {
        let creds = Credentials::new("jdoe", "secret", Some("CORP"));
        assert_eq!(creds.qualified_username(), "CORP\\jdoe");

        let creds = Credentials::new("jdoe", "secret", Some(""));
        assert_eq!(creds.qualified_username(), "jdoe");

        let creds = Credentials::new("jdoe", "secret", None);
        assert_eq!(creds.qualified_username(), "jdoe");
    }

    #[test]
    fn test_basic_auth_header() {
        let creds = Credentials::new("user", "pass", None);
        // base64("user:pass")
        assert_eq!(creds.basic_auth_header().unwrap(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_rejects_empty_credentials() {
        let err = Credentials::new("", "pass", None)
            .basic_auth_header()
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UserFixRequired);

        let err = Credentials::new("user", "", Some("CORP"))
            .basic_auth_header()
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UserFixRequired);
    }
}
