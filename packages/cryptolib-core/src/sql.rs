//! # Database Columns
//!
//! Keys, envelopes and signatures are stored in text columns using their
//! canonical string form. Collections use the Postgres array literal so the
//! same column layout works against either database.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          COLUMN FORMS                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Key<T>            aes128:lQQyBeRmGYECoYkafl+4VQ==:k1                   │
//! │  OptionalKey<T>    as Key<T>, or "" for no key                          │
//! │  EncryptedValue    aes128gcm:Guqh...:k1        (zero value ⇒ "")        │
//! │  Signature         ed25519:aGVsbG8=:k1         (zero value ⇒ "")        │
//! │  Keys<T>           {aes128:a:1,none:b}                                  │
//! │  EncryptedValues   {aes128gcm:x:1,"argon2id:s-1-2-3@aes128gcm:y"}       │
//! │                                                                         │
//! │  Reading: NULL, "", {} and {NULL} are all the empty value.              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::crypto::{
    parse_encrypted_value, parse_key, parse_optional_key, parse_signature, EncryptedValue,
    EncryptedValues, Key, KeyKind, Keys, OptionalKey, Signature,
};
use crate::error::Result;

/// Write strings as a Postgres array literal.
///
/// Empty strings are skipped. An element is quoted only when it contains a
/// comma, brace, quote, backslash or whitespace, or is the word `NULL`.
pub fn to_pg_array<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let elements: Vec<String> = items
        .into_iter()
        .filter(|s| !s.as_ref().is_empty())
        .map(|s| quote_element(s.as_ref()))
        .collect();

    format!("{{{}}}", elements.join(","))
}

fn quote_element(s: &str) -> String {
    let needs_quotes = s.eq_ignore_ascii_case("null")
        || s
            .chars()
            .any(|c| matches!(c, ',' | '{' | '}' | '"' | '\\') || c.is_whitespace());

    if needs_quotes {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        s.to_string()
    }
}

/// Read a Postgres array literal.
///
/// Quoted elements may contain commas; unquoted `NULL` and empty elements
/// are dropped.
pub fn parse_pg_array(s: &str) -> Vec<String> {
    let s = s.trim();
    let inner = s.strip_prefix('{').unwrap_or(s);
    let inner = inner.strip_suffix('}').unwrap_or(inner);

    let mut elements = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = inner.chars();

    let mut finish = |current: &mut String, quoted: &mut bool| {
        let element = std::mem::take(current);
        let keep = if *quoted {
            !element.is_empty()
        } else {
            !element.is_empty() && !element.eq_ignore_ascii_case("null")
        };
        if keep {
            elements.push(element);
        }
        *quoted = false;
    };

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            ',' if !in_quotes => finish(&mut current, &mut quoted),
            c => current.push(c),
        }
    }
    finish(&mut current, &mut quoted);

    elements
}

fn from_sql_error(err: crate::error::Error) -> FromSqlError {
    FromSqlError::Other(Box::new(err))
}

fn parse_all<T>(s: &str, parse: impl Fn(&str) -> Result<T>) -> FromSqlResult<Vec<T>> {
    parse_pg_array(s)
        .iter()
        .map(|element| parse(element).map_err(from_sql_error))
        .collect()
}

// ============================================================================
// KEYS
// ============================================================================

impl<T: KeyKind> ToSql for Key<T> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl<T: KeyKind> FromSql for Key<T> {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        parse_key(value.as_str()?).map_err(from_sql_error)
    }
}

impl<T: KeyKind> ToSql for OptionalKey<T> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl<T: KeyKind> FromSql for OptionalKey<T> {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::default()),
            value => parse_optional_key(value.as_str()?)
                .map(Self)
                .map_err(from_sql_error),
        }
    }
}

impl<T: KeyKind> ToSql for Keys<T> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(to_pg_array(
            self.iter().map(|key| key.to_string()),
        )))
    }
}

impl<T: KeyKind> FromSql for Keys<T> {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::default()),
            value => parse_all(value.as_str()?, parse_key::<T>).map(Self),
        }
    }
}

// ============================================================================
// ENVELOPES
// ============================================================================

impl ToSql for EncryptedValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        if self.is_empty() {
            return Ok(ToSqlOutput::from(""));
        }
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for EncryptedValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::default()),
            value => match value.as_str()? {
                "" => Ok(Self::default()),
                s => parse_encrypted_value(s).map_err(from_sql_error),
            },
        }
    }
}

impl ToSql for EncryptedValues {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(to_pg_array(
            self.iter()
                .filter(|value| !value.is_empty())
                .map(|value| value.to_string()),
        )))
    }
}

impl FromSql for EncryptedValues {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::default()),
            value => parse_all(value.as_str()?, parse_encrypted_value).map(Self),
        }
    }
}

impl ToSql for Signature {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        if self.is_empty() {
            return Ok(ToSqlOutput::from(""));
        }
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for Signature {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::default()),
            value => match value.as_str()? {
                "" => Ok(Self::default()),
                s => parse_signature(s).map_err(from_sql_error),
            },
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{new_key_encrypt_symmetric, KeyProvider, Preferred, SymmetricKey};
    use rusqlite::{params, Connection};

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE secrets (key TEXT, keys TEXT, value TEXT, vals TEXT, sig TEXT)",
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_to_pg_array() {
        assert_eq!(to_pg_array(["test", "test2"]), "{test,test2}");
        assert_eq!(to_pg_array(["test", "test2", ""]), "{test,test2}");
        assert_eq!(to_pg_array(Vec::<String>::new()), "{}");
        assert_eq!(to_pg_array(["a,b", "c"]), r#"{"a,b",c}"#);
        assert_eq!(to_pg_array([r#"say "hi""#]), r#"{"say \"hi\""}"#);
    }

    #[test]
    fn test_to_pg_array_quotes_what_postgres_misreads() {
        assert_eq!(to_pg_array(["NULL", "null"]), r#"{"NULL","null"}"#);
        assert_eq!(to_pg_array(["a b"]), r#"{"a b"}"#);
        assert_eq!(to_pg_array([r"a\b"]), r#"{"a\\b"}"#);
        assert_eq!(to_pg_array(["aes128:a+/=:k1"]), "{aes128:a+/=:k1}");

        assert_eq!(parse_pg_array(&to_pg_array(["NULL"])), vec!["NULL"]);
    }

    #[test]
    fn test_parse_pg_array() {
        assert!(parse_pg_array("").is_empty());
        assert!(parse_pg_array("{}").is_empty());
        assert!(parse_pg_array("{NULL}").is_empty());
        assert_eq!(parse_pg_array("{a,b}"), vec!["a", "b"]);
        assert_eq!(parse_pg_array(r#"{"a,b",c}"#), vec!["a,b", "c"]);
        assert_eq!(parse_pg_array(r#"{"say \"hi\""}"#), vec![r#"say "hi""#]);
        assert_eq!(parse_pg_array(r#"{"NULL"}"#), vec!["NULL"]);
    }

    #[test]
    fn test_pg_array_round_trip() {
        let items = ["plain", "with space", "a,b", "{brace}", r#"back\slash"#];
        assert_eq!(parse_pg_array(&to_pg_array(items)), items);
    }

    #[test]
    fn test_columns_round_trip() {
        let conn = connection();

        let key = new_key_encrypt_symmetric(Preferred::Best).unwrap();
        let keys: Keys<KeyProvider> = vec![key.clone().into_provider()].into();
        let value = key.encrypt(b"secret").unwrap();
        let values: EncryptedValues = vec![value.clone(), value.clone()].into_iter().collect();
        let signature: Signature = "ed25519:aGVsbG8=:k".parse().unwrap();

        conn.execute(
            "INSERT INTO secrets VALUES (?1, ?2, ?3, ?4, ?5)",
            params![key, keys, value, values, signature],
        )
        .unwrap();

        let (k, ks, v, vs, s): (
            Key<SymmetricKey>,
            Keys<KeyProvider>,
            EncryptedValue,
            EncryptedValues,
            Signature,
        ) = conn
            .query_row("SELECT key, keys, value, vals, sig FROM secrets", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })
            .unwrap();

        assert_eq!(k, key);
        assert_eq!(ks, keys);
        assert_eq!(v, value);
        assert_eq!(vs, values);
        assert_eq!(s, signature);
        assert_eq!(v.decrypt(&[k]).unwrap(), b"secret");
    }

    #[test]
    fn test_empty_columns() {
        let conn = connection();
        conn.execute(
            "INSERT INTO secrets VALUES (NULL, '{}', '', '{NULL}', NULL)",
            [],
        )
        .unwrap();

        let (ks, v, vs, s): (Keys<KeyProvider>, EncryptedValue, EncryptedValues, Signature) = conn
            .query_row("SELECT keys, value, vals, sig FROM secrets", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .unwrap();

        assert!(ks.is_empty());
        assert!(v.is_empty());
        assert!(vs.is_empty());
        assert!(s.is_empty());

        let key: rusqlite::Result<Option<Key<KeyProvider>>> =
            conn.query_row("SELECT key FROM secrets", [], |row| row.get(0));
        assert_eq!(key.unwrap(), None);
    }

    #[test]
    fn test_optional_key_column_round_trip() {
        let conn = connection();
        let key = new_key_encrypt_symmetric(Preferred::Best).unwrap();

        conn.execute(
            "INSERT INTO secrets (key, keys) VALUES (?1, ?2)",
            params![OptionalKey::<SymmetricKey>::default(), OptionalKey::from(key.clone())],
        )
        .unwrap();

        let (raw, empty, full): (String, OptionalKey<SymmetricKey>, OptionalKey<SymmetricKey>) =
            conn.query_row("SELECT key, key, keys FROM secrets", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .unwrap();

        assert_eq!(raw, "");
        assert_eq!(*empty, None);
        assert_eq!(full.0, Some(key));

        conn.execute("UPDATE secrets SET key = NULL", []).unwrap();
        let null: OptionalKey<SymmetricKey> = conn
            .query_row("SELECT key FROM secrets", [], |row| row.get(0))
            .unwrap();
        assert!(null.is_none());
    }

    #[test]
    fn test_zero_values_write_empty() {
        let conn = connection();
        conn.execute(
            "INSERT INTO secrets (value, sig) VALUES (?1, ?2)",
            params![EncryptedValue::default(), Signature::default()],
        )
        .unwrap();

        let (v, s): (String, String) = conn
            .query_row("SELECT value, sig FROM secrets", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();

        assert_eq!(v, "");
        assert_eq!(s, "");
    }

    #[test]
    fn test_bad_column_errors() {
        let conn = connection();
        conn.execute("INSERT INTO secrets (value) VALUES ('bogus:abc')", [])
            .unwrap();

        let result: rusqlite::Result<EncryptedValue> =
            conn.query_row("SELECT value FROM secrets", [], |row| row.get(0));
        assert!(result.is_err());
    }
}
