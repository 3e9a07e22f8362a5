//! Token construction, signing and verification.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::crypto::{Key, KeyFamily, PrivateKey, PublicKey, SignatureHash, Signer, Verifier};
use crate::error::{Error, Result, ValidationError};
use crate::jwt::claims::{Audience, CustomClaims};
use crate::time::{now_timestamp, timestamp_or_zero};

/// The `typ` header value.
pub const TOKEN_TYPE: &str = "JWT";

// ============================================================================
// SIGNING METHOD
// ============================================================================

/// The `alg` header value. One per key family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum JwtAlgorithm {
    /// ECDSA P-256 over SHA-256
    Es256,
    /// Ed25519
    #[default]
    EdDsa,
    /// RSA PKCS#1 v1.5 over SHA-256
    Rs256,
}

impl JwtAlgorithm {
    /// The signing method used by keys of `family`.
    pub fn for_family(family: KeyFamily) -> Self {
        match family {
            KeyFamily::EcP256 => JwtAlgorithm::Es256,
            KeyFamily::Ed25519 => JwtAlgorithm::EdDsa,
            KeyFamily::Rsa2048 => JwtAlgorithm::Rs256,
        }
    }

    /// Prehash applied to the signing input.
    pub fn hash(&self) -> SignatureHash {
        match self {
            JwtAlgorithm::Es256 | JwtAlgorithm::Rs256 => SignatureHash::Sha256,
            JwtAlgorithm::EdDsa => SignatureHash::Ed25519,
        }
    }

    /// Header name of the method.
    pub const fn as_str(&self) -> &'static str {
        match self {
            JwtAlgorithm::Es256 => "ES256",
            JwtAlgorithm::EdDsa => "EdDSA",
            JwtAlgorithm::Rs256 => "RS256",
        }
    }
}

impl fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JwtAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ES256" => Ok(JwtAlgorithm::Es256),
            "EdDSA" => Ok(JwtAlgorithm::EdDsa),
            "RS256" => Ok(JwtAlgorithm::Rs256),
            _ => Err(Error::UnknownSigningMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for JwtAlgorithm {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<JwtAlgorithm> for &'static str {
    fn from(alg: JwtAlgorithm) -> Self {
        alg.as_str()
    }
}

/// The JOSE header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Signing method
    pub alg: JwtAlgorithm,
    /// ID of the signing key
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kid: String,
    /// Always `JWT`
    #[serde(default)]
    pub typ: String,
}

// ============================================================================
// TOKEN
// ============================================================================

/// A JWT in its three encoded parts.
///
/// ```text
/// base64url(header) . base64url(payload) . base64url(signature)
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    /// Decoded header (set by [`Token::sign`] and [`Token::decode`])
    pub header: TokenHeader,
    /// Encoded header
    pub header_base64: String,
    /// Encoded payload
    pub payload_base64: String,
    /// Encoded signature
    pub signature_base64: String,
}

fn decode_part(part: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| Error::TokenFormat(e.to_string()))
}

impl Token {
    /// Fill the registered claims and encode the payload.
    ///
    /// `iat` and `nbf` are set to now. `exp` is left out when
    /// `expires_at` is `None`.
    pub fn new<C, A>(
        claims: &mut C,
        expires_at: Option<DateTime<Utc>>,
        audience: A,
        id: &str,
        issuer: &str,
        subject: &str,
    ) -> Result<Self>
    where
        C: CustomClaims,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        let now = now_timestamp();
        let registered = claims.registered_claims_mut();

        registered.audience = audience.into_iter().collect::<Audience>();
        registered.expires_at = timestamp_or_zero(expires_at);
        registered.id = id.to_string();
        registered.issued_at = now;
        registered.issuer = issuer.to_string();
        registered.not_before = now;
        registered.subject = subject.to_string();

        let payload = serde_json::to_vec(&*claims)?;

        Ok(Self {
            payload_base64: URL_SAFE_NO_PAD.encode(payload),
            ..Default::default()
        })
    }

    /// Set the header and return the signing input `header.payload`.
    pub fn sign_message(&mut self, alg: JwtAlgorithm, key_id: &str) -> Result<String> {
        self.header = TokenHeader {
            alg,
            kid: key_id.to_string(),
            typ: TOKEN_TYPE.to_string(),
        };
        self.header_base64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&self.header)?);

        Ok(self.signing_input())
    }

    fn signing_input(&self) -> String {
        format!("{}.{}", self.header_base64, self.payload_base64)
    }

    /// Sign with `key`. The signing method follows the key's family.
    pub fn sign(&mut self, key: &Key<PrivateKey>) -> Result<()> {
        let alg = JwtAlgorithm::for_family(key.key.family());
        let message = self.sign_message(alg, &key.id)?;
        let signature = key.key.sign(message.as_bytes(), alg.hash())?;

        self.signature_base64 = URL_SAFE_NO_PAD.encode(signature);
        tracing::debug!(key_id = %key.id, alg = %alg, "signed token");

        Ok(())
    }

    /// Split a token and decode its header without checking the signature.
    pub fn decode(token: &str) -> Result<Self> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header_base64, payload_base64, signature_base64] = parts[..] else {
            return Err(Error::TokenFormat(format!(
                "expected 3 parts, got {}",
                parts.len()
            )));
        };

        let header: TokenHeader = serde_json::from_slice(&decode_part(header_base64)?)
            .map_err(|e| Error::TokenFormat(e.to_string()))?;

        Ok(Self {
            header,
            header_base64: header_base64.to_string(),
            payload_base64: payload_base64.to_string(),
            signature_base64: signature_base64.to_string(),
        })
    }

    /// Decode the payload and validate it.
    ///
    /// Each non-empty pattern must match: `aud_regex` any audience entry,
    /// `jti_regex` the token ID, `sub_regex` the subject. `nbf` and `exp`
    /// are checked against the current time, then the claims' own
    /// [`CustomClaims::valid`] runs.
    pub fn parse_payload<C: CustomClaims>(
        &self,
        aud_regex: &str,
        jti_regex: &str,
        sub_regex: &str,
    ) -> Result<C> {
        let claims: C = serde_json::from_slice(&decode_part(&self.payload_base64)?)
            .map_err(|e| Error::TokenFormat(format!("error unmarshaling JWT: {}", e)))?;
        let registered = claims.registered_claims();

        if let Some(aud) = compile(aud_regex)? {
            if !registered.audience.iter().any(|a| aud.is_match(a)) {
                return Err(ValidationError::AudienceMismatch.into());
            }
        }

        if let Some(jti) = compile(jti_regex)? {
            if !jti.is_match(&registered.id) {
                return Err(ValidationError::IdMismatch.into());
            }
        }

        let now = now_timestamp();

        if registered.not_before > now {
            return Err(ValidationError::NotYetValid.into());
        }

        if registered.expires_at != 0 && now >= registered.expires_at {
            return Err(ValidationError::Expired.into());
        }

        if let Some(sub) = compile(sub_regex)? {
            if !sub.is_match(&registered.subject) {
                return Err(ValidationError::SubjectMismatch.into());
            }
        }

        claims.valid()?;

        Ok(claims)
    }
}

fn compile(pattern: &str) -> Result<Option<Regex>> {
    if pattern.is_empty() {
        return Ok(None);
    }

    Regex::new(pattern)
        .map(Some)
        .map_err(|e| ValidationError::InvalidRegex(e.to_string()).into())
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.header_base64, self.payload_base64, self.signature_base64
        )
    }
}

/// Decode `token`, verify it against `keys` and return it with the key
/// that verified it.
///
/// The header's `alg` must be the signing method of the verifying key's
/// family.
pub fn parse(token: &str, keys: &[Key<PublicKey>]) -> Result<(Token, Key<PublicKey>)> {
    let token = Token::decode(token)?;

    if keys.is_empty() {
        return Err(Error::NoPublicKeys);
    }

    let signature = decode_part(&token.signature_base64)?;
    let message = token.signing_input();
    let hash = token.header.alg.hash();

    let key = keys
        .iter()
        .find(|key| match key.key.verify(message.as_bytes(), hash, &signature) {
            Ok(()) => true,
            Err(e) => {
                tracing::trace!(key_id = %key.id, error = %e, "token candidate rejected");
                false
            }
        })
        .ok_or(Error::VerificationFailed)?;

    if JwtAlgorithm::for_family(key.key.family()) != token.header.alg {
        return Err(Error::SigningMethodMismatch);
    }

    Ok((token, key.clone()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::new_keys_encrypt_asymmetric;
    use crate::jwt::claims::RegisteredClaims;
    use chrono::Duration;

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    struct License {
        licensed: bool,
        #[serde(default)]
        name: String,
        #[serde(flatten)]
        registered: RegisteredClaims,
    }

    impl CustomClaims for License {
        fn registered_claims(&self) -> &RegisteredClaims {
            &self.registered
        }

        fn registered_claims_mut(&mut self) -> &mut RegisteredClaims {
            &mut self.registered
        }

        fn valid(&self) -> Result<()> {
            if self.licensed {
                Ok(())
            } else {
                Err(ValidationError::Claims("not licensed".into()).into())
            }
        }
    }

    fn license() -> License {
        License {
            licensed: true,
            name: "a".into(),
            ..Default::default()
        }
    }

    fn in_ten_seconds() -> Option<DateTime<Utc>> {
        Some(Utc::now() + Duration::seconds(10))
    }

    #[test]
    fn test_sign_parse_each_family() {
        for family in [KeyFamily::Ed25519, KeyFamily::EcP256, KeyFamily::Rsa2048] {
            let (private, public) = new_keys_encrypt_asymmetric(family.into()).unwrap();
            let expires = in_ten_seconds();

            let mut claims = license();
            let mut token =
                Token::new(&mut claims, expires, ["audience"], "id", "issuer", "subject").unwrap();

            assert_eq!(claims.registered.audience.0, vec!["audience"]);
            assert_eq!(claims.registered.expires_at, timestamp_or_zero(expires));
            assert_eq!(claims.registered.id, "id");
            assert_eq!(claims.registered.issued_at, claims.registered.not_before);
            assert_eq!(
                token.payload_base64,
                URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap())
            );

            token.sign(&private).unwrap();
            assert_eq!(token.header.alg, JwtAlgorithm::for_family(family));
            assert_eq!(token.header.kid, private.id);
            assert_eq!(token.header.typ, TOKEN_TYPE);

            let (parsed, verified_by) = parse(&token.to_string(), &[public.clone()]).unwrap();
            assert_eq!(verified_by, public);
            assert_eq!(parsed, token);

            let out: License = parsed.parse_payload("", "", "").unwrap();
            assert_eq!(out, claims);
        }
    }

    #[test]
    fn test_multiple_audiences() {
        let (private, public) = new_keys_encrypt_asymmetric(Default::default()).unwrap();

        let mut claims = license();
        let mut token = Token::new(&mut claims, in_ten_seconds(), ["1", "2"], "id", "", "").unwrap();
        token.sign(&private).unwrap();

        let (parsed, _) = parse(&token.to_string(), &[public]).unwrap();
        let out: License = parsed.parse_payload("^2$", "", "").unwrap();
        assert_eq!(out.registered.audience.0, vec!["1", "2"]);
    }

    #[test]
    fn test_expired_token() {
        let (private, public) = new_keys_encrypt_asymmetric(Default::default()).unwrap();

        let mut claims = license();
        let mut token = Token::new(
            &mut claims,
            Some(Utc::now() - Duration::hours(24)),
            ["aud"],
            "id",
            "issuer",
            "subject",
        )
        .unwrap();
        token.sign(&private).unwrap();

        let (parsed, verified_by) = parse(&token.to_string(), &[public.clone()]).unwrap();
        assert_eq!(verified_by, public);

        assert!(matches!(
            parsed.parse_payload::<License>("", "", ""),
            Err(Error::TokenValidation(ValidationError::Expired))
        ));
    }

    #[test]
    fn test_expires_now_is_expired() {
        let claims = RegisteredClaims {
            expires_at: now_timestamp(),
            ..Default::default()
        };
        let token = Token {
            payload_base64: URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap()),
            ..Default::default()
        };

        assert!(matches!(
            token.parse_payload::<RegisteredClaims>("", "", ""),
            Err(Error::TokenValidation(ValidationError::Expired))
        ));
    }

    #[test]
    fn test_not_yet_valid() {
        let claims = RegisteredClaims {
            not_before: now_timestamp() + 3600,
            ..Default::default()
        };
        let token = Token {
            payload_base64: URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap()),
            ..Default::default()
        };

        assert!(matches!(
            token.parse_payload::<RegisteredClaims>("", "", ""),
            Err(Error::TokenValidation(ValidationError::NotYetValid))
        ));
    }

    #[test]
    fn test_no_expiry() {
        let mut claims = RegisteredClaims::default();
        let token = Token::new(&mut claims, None, Vec::<String>::new(), "", "", "").unwrap();

        let out: RegisteredClaims = token.parse_payload("", "", "").unwrap();
        assert_eq!(out.expires_at, 0);
    }

    #[test]
    fn test_claim_patterns() {
        let mut claims = license();
        let token = Token::new(
            &mut claims,
            in_ten_seconds(),
            ["https://example.com"],
            "token-1",
            "issuer",
            "account",
        )
        .unwrap();

        assert!(token
            .parse_payload::<License>("example\\.com$", "^token-", "^account$")
            .is_ok());
        assert!(matches!(
            token.parse_payload::<License>("other", "", ""),
            Err(Error::TokenValidation(ValidationError::AudienceMismatch))
        ));
        assert!(matches!(
            token.parse_payload::<License>("", "^other", ""),
            Err(Error::TokenValidation(ValidationError::IdMismatch))
        ));
        assert!(matches!(
            token.parse_payload::<License>("", "", "^token-1$"),
            Err(Error::TokenValidation(ValidationError::SubjectMismatch))
        ));
        assert!(matches!(
            token.parse_payload::<License>("(", "", ""),
            Err(Error::TokenValidation(ValidationError::InvalidRegex(_)))
        ));
    }

    #[test]
    fn test_custom_validation() {
        let mut claims = License::default();
        let token = Token::new(&mut claims, None, ["aud"], "", "", "").unwrap();

        assert!(matches!(
            token.parse_payload::<License>("", "", ""),
            Err(Error::TokenValidation(ValidationError::Claims(_)))
        ));
    }

    #[test]
    fn test_parse_rejections() {
        let (private, public) = new_keys_encrypt_asymmetric(Default::default()).unwrap();
        let (_, other) = new_keys_encrypt_asymmetric(Default::default()).unwrap();

        let mut claims = license();
        let mut token = Token::new(&mut claims, None, ["aud"], "", "", "").unwrap();
        token.sign(&private).unwrap();
        let text = token.to_string();

        assert!(matches!(parse(&text, &[]), Err(Error::NoPublicKeys)));
        assert!(matches!(
            parse(&text, &[other.clone()]),
            Err(Error::VerificationFailed)
        ));
        assert!(parse(&text, &[other, public]).is_ok());
        assert!(matches!(parse("a.b", &[]), Err(Error::TokenFormat(_))));
        assert!(matches!(parse("!!.b.c", &[]), Err(Error::TokenFormat(_))));
    }

    #[test]
    fn test_signing_method_must_match_key() {
        let (private, public) = new_keys_encrypt_asymmetric(KeyFamily::Ed25519.into()).unwrap();

        let mut claims = license();
        let mut token = Token::new(&mut claims, None, ["aud"], "", "", "").unwrap();
        let message = token.sign_message(JwtAlgorithm::Es256, &private.id).unwrap();
        let signature = private
            .key
            .sign(message.as_bytes(), SignatureHash::Ed25519)
            .unwrap();
        token.signature_base64 = URL_SAFE_NO_PAD.encode(signature);

        assert!(matches!(
            parse(&token.to_string(), &[public]),
            Err(Error::SigningMethodMismatch)
        ));
    }

    #[test]
    fn test_unknown_signing_method() {
        assert!(matches!(
            "HS256".parse::<JwtAlgorithm>(),
            Err(Error::UnknownSigningMethod(_))
        ));

        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        assert!(matches!(
            Token::decode(&format!("{}.e30.", header)),
            Err(Error::TokenFormat(_))
        ));
    }
}
