use crate::core::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

const PHONE_LENGTH: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    Private,
    Bank,
}

impl Display for ClientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientKind::Private => write!(f, "Private"),
            ClientKind::Bank => write!(f, "Bank"),
        }
    }
}

/// The owner of one or more accounts. Exactly one client is the bank itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub kind: ClientKind,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Client {
    pub fn new(
        name: &str,
        email: Option<&str>,
        phone: &str,
        kind: ClientKind,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if name.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Client name cannot be empty".to_string(),
            ));
        }
        validate_phone(phone)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: email.map(str::to_string),
            phone: phone.to_string(),
            kind,
            created: now,
            modified: now,
        })
    }

    pub fn is_bank(&self) -> bool {
        self.kind == ClientKind::Bank
    }
}

/// Phone numbers are domestic: an `8` followed by ten digits.
pub fn validate_phone(phone: &str) -> Result<(), LedgerError> {
    let valid = phone.len() == PHONE_LENGTH
        && phone.starts_with('8')
        && phone.chars().all(|c| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(LedgerError::Validation(
            "Phone number must start with 8 and contain 11 digits".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_validation() {
        assert!(validate_phone("89991234567").is_ok());
        assert!(validate_phone("79991234567").is_err());
        assert!(validate_phone("8999123456").is_err());
        assert!(validate_phone("899912345678").is_err());
        assert!(validate_phone("8999123456a").is_err());
    }

    #[test]
    fn test_client_requires_name() {
        let now = Utc::now();
        assert!(Client::new("  ", None, "89991234567", ClientKind::Private, now).is_err());

        let client = Client::new(" Ada ", None, "89991234567", ClientKind::Private, now).unwrap();
        assert_eq!(client.name, "Ada");
        assert!(!client.is_bank());
    }
}
