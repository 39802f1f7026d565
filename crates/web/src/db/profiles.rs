//! Profile repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gomflow_core::{Country, Email, ProfileId};

use super::RepositoryError;
use crate::models::{NewProfile, Profile};

const PROFILE_COLUMNS: &str =
    "id, email, discord_id, discord_username, is_gom, country, created_at";

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    discord_id: Option<String>,
    discord_username: Option<String>,
    is_gom: bool,
    country: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let country = row
            .country
            .as_deref()
            .map(Country::parse)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid country: {e}")))?;

        Ok(Self {
            id: ProfileId::new(row.id),
            email,
            discord_id: row.discord_id,
            discord_username: row.discord_username,
            is_gom: row.is_gom,
            country,
            created_at: row.created_at,
        })
    }
}

/// Repository for profile database operations.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a profile by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM gomflow.profile WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    /// Get the most recently created profile with this email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM gomflow.profile
             WHERE lower(email) = $1
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    /// Insert the profile unless one already exists for this id.
    ///
    /// Returns the stored profile and whether it was created by this call.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn provision(&self, new: &NewProfile) -> Result<(Profile, bool), RepositoryError> {
        let inserted = sqlx::query(
            "INSERT INTO gomflow.profile (id, email, discord_id, discord_username)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(new.id.as_uuid())
        .bind(new.email.as_str())
        .bind(new.discord_id.as_deref())
        .bind(new.discord_username.as_deref())
        .execute(self.pool)
        .await?
        .rows_affected()
            > 0;

        let profile = self
            .get_by_id(new.id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok((profile, inserted))
    }

    /// Mark a profile as a GOM operating in `country`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no profile has this id.
    pub async fn become_gom(
        &self,
        id: ProfileId,
        country: Country,
    ) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "UPDATE gomflow.profile SET is_gom = TRUE, country = $2
             WHERE id = $1
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(country.code())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Profile::try_from(row)
    }

    /// Set or clear the GOM flag by email (operator command).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no profile has this email.
    pub async fn set_gom_by_email(
        &self,
        email: &Email,
        is_gom: bool,
    ) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "UPDATE gomflow.profile SET is_gom = $2
             WHERE lower(email) = $1
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(is_gom)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Profile::try_from(row)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row() -> ProfileRow {
        ProfileRow {
            id: Uuid::new_v4(),
            email: "Gom@Example.com".to_owned(),
            discord_id: Some("80351110224678912".to_owned()),
            discord_username: Some("gom_ph".to_owned()),
            is_gom: true,
            country: Some("PH".to_owned()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_converts() {
        let profile = Profile::try_from(row()).unwrap();
        assert_eq!(profile.email.as_str(), "gom@example.com");
        assert_eq!(profile.country, Some(Country::Ph));
        assert!(profile.is_gom);
    }

    #[test]
    fn test_corrupt_rows_are_reported() {
        let mut bad_email = row();
        bad_email.email = "not-an-email".to_owned();
        assert!(matches!(
            Profile::try_from(bad_email),
            Err(RepositoryError::DataCorruption(_))
        ));

        let mut bad_country = row();
        bad_country.country = Some("XX".to_owned());
        assert!(matches!(
            Profile::try_from(bad_country),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
