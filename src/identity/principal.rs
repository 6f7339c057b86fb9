use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    User,
    Other(String),
}

impl Role {
    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            "user" => Role::User,
            other => Role::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Other(s) => s.as_str(),
        }
    }
}

/// Claims carried in the credential payload. Only `role` drives behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().map(Role::parse)
    }

    /// `exp` as a timestamp. Informational only; expiry is enforced by the backend.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map(|t| t <= now).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_and_expiry() {
        let c: Claims = serde_json::from_str(r#"{"sub":"ana","role":"admin","exp":1700000000,"iat":1699990000}"#).unwrap();
        assert_eq!(c.role(), Some(Role::Admin));
        assert_eq!(c.extra.get("iat").and_then(|v| v.as_i64()), Some(1699990000));
        let exp = c.expires_at().unwrap();
        assert_eq!(exp.to_rfc3339(), "2023-11-14T22:13:20+00:00");
        assert!(c.is_expired_at(exp));
        assert!(!c.is_expired_at(DateTime::from_timestamp(1600000000, 0).unwrap()));
        assert!(!Claims::default().is_expired_at(Utc::now()));
        assert_eq!(Role::parse("auditor"), Role::Other("auditor".into()));
    }
}
