use serde::{Deserialize, Serialize};

/// `aud` is either a single string or a list, depending on the issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::One(value) => value == audience,
            Audience::Many(values) => values.iter().any(|value| value == audience),
        }
    }
}

/// Decoded payload of a verified access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the issuer's stable user identifier
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    /// Namespaced custom claims (roles, permissions) the issuer adds.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn audience_accepts_string_or_list() {
        let one: Claims = serde_json::from_value(json!({
            "sub": "auth0|1",
            "aud": "https://books.example.com"
        }))
        .unwrap();
        assert!(one.aud.unwrap().contains("https://books.example.com"));

        let many: Claims = serde_json::from_value(json!({
            "sub": "auth0|1",
            "aud": ["https://books.example.com", "https://tenant.example.com/userinfo"]
        }))
        .unwrap();
        let aud = many.aud.unwrap();
        assert!(aud.contains("https://tenant.example.com/userinfo"));
        assert!(!aud.contains("https://other.example.com"));
    }

    #[test]
    fn unknown_claims_are_kept() {
        let claims: Claims = serde_json::from_value(json!({
            "sub": "auth0|1",
            "https://books.example.com/roles": ["editor"]
        }))
        .unwrap();
        assert_eq!(
            claims.extra["https://books.example.com/roles"],
            json!(["editor"])
        );
        assert_eq!(claims.email, None);
    }
}
