//! Shared-password gate in front of the dashboard.
//!
//! This is a local placeholder, not an access-control boundary: there is
//! no token and no server round-trip.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("Senha incorreta. Tente novamente.")]
    WrongPassword,
}

#[derive(Debug, Clone)]
pub struct AuthGate {
    password: String,
    authenticated: bool,
}

impl AuthGate {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            authenticated: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn login(&mut self, attempt: &str) -> Result<(), LoginError> {
        if constant_time_eq(attempt.as_bytes(), self.password.as_bytes()) {
            self.authenticated = true;
            tracing::info!("login succeeded");
            Ok(())
        } else {
            tracing::warn!("login rejected");
            Err(LoginError::WrongPassword)
        }
    }

    pub fn logout(&mut self) {
        self.authenticated = false;
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_and_logout() {
        let mut gate = AuthGate::new("riot2025");
        assert!(!gate.is_authenticated());

        let err = gate.login("riot2024").unwrap_err();
        assert_eq!(err.to_string(), "Senha incorreta. Tente novamente.");
        assert!(!gate.is_authenticated());

        gate.login("riot2025").unwrap();
        assert!(gate.is_authenticated());

        gate.logout();
        assert!(!gate.is_authenticated());
    }

    #[test]
    fn test_prefix_is_not_enough() {
        let mut gate = AuthGate::new("riot2025");
        assert!(gate.login("riot").is_err());
        assert!(gate.login("").is_err());
    }
}
