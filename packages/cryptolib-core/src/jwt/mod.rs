//! # JSON Web Tokens
//!
//! Compact JWTs signed by any private key from [`crate::crypto`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           TOKEN FLOW                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Token::new(claims, exp, aud, jti, iss, sub)                            │
//! │      │   iat = nbf = now                                                │
//! │      ▼                                                                  │
//! │  Token::sign(private key)                                               │
//! │      │   alg from key family:  ecp256 → ES256                           │
//! │      │                         ed25519 → EdDSA                          │
//! │      │                         rsa2048 → RS256                          │
//! │      ▼                                                                  │
//! │  header.payload.signature                                               │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  parse(token, public keys)    first verifying key wins, then            │
//! │      │                        alg must match that key's family          │
//! │      ▼                                                                  │
//! │  Token::parse_payload(aud, jti, sub patterns)                           │
//! │          nbf ≤ now < exp, patterns match, claims.valid()                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod claims;
pub mod token;

pub use claims::{Audience, CustomClaims, RegisteredClaims};
pub use token::{parse, JwtAlgorithm, Token, TokenHeader, TOKEN_TYPE};
