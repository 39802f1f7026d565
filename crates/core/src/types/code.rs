//! Public identifiers: shareable order slugs and guest tracking codes.
//!
//! Both are short random strings. Uniqueness is not guaranteed here; the
//! store enforces it with a unique constraint and callers regenerate on
//! conflict.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Alphabet for shareable slugs.
pub const SLUG_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Alphabet for the random part of tracking codes.
pub const TRACKING_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Number of random characters in slugs and tracking codes.
pub const CODE_LENGTH: usize = 8;

/// Fixed prefix of every tracking code.
pub const TRACKING_PREFIX: &str = "GOM-";

/// Errors returned when parsing a slug or tracking code.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// Wrong number of characters.
    #[error("expected {expected} characters, got {actual}")]
    Length {
        /// Required length.
        expected: usize,
        /// Length of the input.
        actual: usize,
    },
    /// A character outside the alphabet.
    #[error("invalid character {0:?}")]
    InvalidCharacter(char),
    /// Tracking code without the `GOM-` prefix.
    #[error("tracking code must start with {TRACKING_PREFIX}")]
    MissingPrefix,
}

fn random_string<R: Rng + ?Sized>(rng: &mut R, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..alphabet.len());
            alphabet.get(idx).map_or('0', |&b| char::from(b))
        })
        .collect()
}

fn check_alphabet(s: &str, alphabet: &[u8]) -> Result<(), CodeError> {
    match s.chars().find(|c| !c.is_ascii() || !alphabet.contains(&(*c as u8))) {
        Some(c) => Err(CodeError::InvalidCharacter(c)),
        None => Ok(()),
    }
}

/// Public slug for an order's listing page, e.g. `k3v9x0qa`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareableSlug(String);

impl ShareableSlug {
    /// Generate a random slug.
    #[must_use]
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(random_string(rng, SLUG_ALPHABET, CODE_LENGTH))
    }

    /// Parse a slug from a URL path segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not 8 lowercase alphanumerics.
    pub fn parse(s: &str) -> Result<Self, CodeError> {
        let s = s.trim();
        if s.len() != CODE_LENGTH {
            return Err(CodeError::Length {
                expected: CODE_LENGTH,
                actual: s.chars().count(),
            });
        }
        check_alphabet(s, SLUG_ALPHABET)?;
        Ok(Self(s.to_owned()))
    }

    /// The slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Guest-facing tracking code, e.g. `GOM-7QX2MZ4B`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackingCode(String);

impl TrackingCode {
    /// Total length including the prefix.
    pub const LENGTH: usize = TRACKING_PREFIX.len() + CODE_LENGTH;

    /// Generate a random tracking code.
    #[must_use]
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(format!(
            "{TRACKING_PREFIX}{}",
            random_string(rng, TRACKING_ALPHABET, CODE_LENGTH)
        ))
    }

    /// Parse user input, accepting any letter case.
    ///
    /// # Errors
    ///
    /// Returns an error if the normalised input is not `GOM-` followed by 8
    /// uppercase alphanumerics.
    pub fn parse(s: &str) -> Result<Self, CodeError> {
        let normalised = s.trim().to_ascii_uppercase();
        let body = normalised
            .strip_prefix(TRACKING_PREFIX)
            .ok_or(CodeError::MissingPrefix)?;
        if body.len() != CODE_LENGTH {
            return Err(CodeError::Length {
                expected: Self::LENGTH,
                actual: normalised.chars().count(),
            });
        }
        check_alphabet(body, TRACKING_ALPHABET)?;
        Ok(Self(normalised))
    }

    /// The code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! impl_code_traits {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = CodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = CodeError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(code: $name) -> Self {
                code.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        #[cfg(feature = "postgres")]
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                Ok(Self::parse(&s)?)
            }
        }

        #[cfg(feature = "postgres")]
        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

impl_code_traits!(ShareableSlug);
impl_code_traits!(TrackingCode);
