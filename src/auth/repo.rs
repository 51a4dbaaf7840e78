use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Credential store record. One row per normalized email; uniqueness is
/// enforced by the database index, not by application pre-checks.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub verification_token_expires_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_expires_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    pub reward: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const USER_COLUMNS: &str = r#"
    id, email, password_hash, name, is_verified,
    verification_token, verification_token_expires_at,
    reset_password_token, reset_password_expires_at,
    last_login, reward, created_at
"#;

impl User {
    /// Create an unverified user with a pending verification code.
    ///
    /// A duplicate normalized email violates the unique index; callers map
    /// that to a conflict response.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        name: &str,
        verification_token: &str,
        verification_expires_at: OffsetDateTime,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, verification_token, verification_token_expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(verification_token)
        .bind(verification_expires_at)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email = $1
            "#,
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1
            "#,
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Consume an unexpired verification code: flips `is_verified` and clears
    /// the token fields in one statement, so a code matches at most once even
    /// under concurrent requests. Returns `None` when the code is unknown,
    /// expired, or already used.
    pub async fn consume_verification_code(
        db: &PgPool,
        code: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET is_verified = TRUE,
                verification_token = NULL,
                verification_token_expires_at = NULL
            WHERE verification_token = $1
              AND verification_token_expires_at > now()
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(code)
        .fetch_optional(db)
        .await
    }

    /// Stamp `last_login` on a successful login.
    pub async fn record_login(db: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Attach a pending reset token to the user.
    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_password_token = $2, reset_password_expires_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Consume an unexpired reset token: replaces the password hash and
    /// clears both reset fields atomically. Returns `None` when the token is
    /// unknown, expired, or already used.
    pub async fn consume_reset_token(
        db: &PgPool,
        token: &str,
        new_password_hash: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET password_hash = $2,
                reset_password_token = NULL,
                reset_password_expires_at = NULL
            WHERE reset_password_token = $1
              AND reset_password_expires_at > now()
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(token)
        .bind(new_password_hash)
        .fetch_optional(db)
        .await
    }

    pub async fn list_all(db: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY created_at
            "#,
        ))
        .fetch_all(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ann@example.com".into(),
            password_hash: "$argon2id$fake".into(),
            name: "Ann".into(),
            is_verified: false,
            verification_token: Some("123456".into()),
            verification_token_expires_at: Some(OffsetDateTime::now_utc()),
            reset_password_token: None,
            reset_password_expires_at: None,
            last_login: None,
            reward: 0,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn serialization_never_leaks_secrets() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("verification_token"));
        assert!(!json.contains("123456"));
        assert!(!json.contains("reset_password_token"));
        assert!(json.contains("ann@example.com"));
        assert!(json.contains("\"reward\":0"));
    }
}
