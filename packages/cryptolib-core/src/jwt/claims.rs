//! Registered and custom JWT claims.

use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;

/// The registered claim names from RFC 7519.
///
/// Zero values are left out of the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisteredClaims {
    /// Intended recipients
    #[serde(rename = "aud", skip_serializing_if = "Vec::is_empty")]
    pub audience: Audience,
    /// Expiry, Unix seconds (`0` means never)
    #[serde(rename = "exp", skip_serializing_if = "is_zero")]
    pub expires_at: i64,
    /// Token ID
    #[serde(rename = "jti", skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Issue time, Unix seconds
    #[serde(rename = "iat", skip_serializing_if = "is_zero")]
    pub issued_at: i64,
    /// Issuer
    #[serde(rename = "iss", skip_serializing_if = "String::is_empty")]
    pub issuer: String,
    /// Start of validity, Unix seconds
    #[serde(rename = "nbf", skip_serializing_if = "is_zero")]
    pub not_before: i64,
    /// Subject
    #[serde(rename = "sub", skip_serializing_if = "String::is_empty")]
    pub subject: String,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// A payload type carried in a token.
///
/// Implementors usually embed [`RegisteredClaims`] with `#[serde(flatten)]`
/// and add their own fields next to it.
pub trait CustomClaims: Serialize + DeserializeOwned {
    /// The embedded registered claims.
    fn registered_claims(&self) -> &RegisteredClaims;

    /// Mutable access to the embedded registered claims.
    fn registered_claims_mut(&mut self) -> &mut RegisteredClaims;

    /// Application checks, run after the registered claims pass.
    fn valid(&self) -> Result<()> {
        Ok(())
    }
}

impl CustomClaims for RegisteredClaims {
    fn registered_claims(&self) -> &RegisteredClaims {
        self
    }

    fn registered_claims_mut(&mut self) -> &mut RegisteredClaims {
        self
    }
}

// ============================================================================
// AUDIENCE
// ============================================================================

/// The `aud` claim.
///
/// Written as a bare string when there is exactly one audience and as an
/// array otherwise. Both forms are accepted when reading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Audience(pub Vec<String>);

impl Deref for Audience {
    type Target = Vec<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<String>> for Audience {
    fn from(audience: Vec<String>) -> Self {
        Self(audience)
    }
}

impl<S: Into<String>> FromIterator<S> for Audience {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Serialize for Audience {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0.as_slice() {
            [single] => serializer.serialize_str(single),
            all => all.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(single) => Self(vec![single]),
            OneOrMany::Many(all) => Self(all),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_forms() {
        let one: Audience = ["a"].into_iter().collect();
        assert_eq!(serde_json::to_string(&one).unwrap(), r#""a""#);

        let many: Audience = ["a", "b"].into_iter().collect();
        assert_eq!(serde_json::to_string(&many).unwrap(), r#"["a","b"]"#);

        assert_eq!(serde_json::from_str::<Audience>(r#""a""#).unwrap(), one);
        assert_eq!(serde_json::from_str::<Audience>(r#"["a","b"]"#).unwrap(), many);
        assert!(serde_json::from_str::<Audience>("1").is_err());
    }

    #[test]
    fn test_zero_claims_are_omitted() {
        assert_eq!(
            serde_json::to_string(&RegisteredClaims::default()).unwrap(),
            "{}"
        );

        let claims = RegisteredClaims {
            audience: ["aud"].into_iter().collect(),
            expires_at: 10,
            subject: "sub".into(),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&claims).unwrap(),
            r#"{"aud":"aud","exp":10,"sub":"sub"}"#
        );
    }

    #[test]
    fn test_missing_claims_default() {
        let claims: RegisteredClaims = serde_json::from_str(r#"{"iss":"me"}"#).unwrap();
        assert_eq!(claims.issuer, "me");
        assert_eq!(claims.expires_at, 0);
        assert!(claims.audience.is_empty());
    }
}
