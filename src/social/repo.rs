use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// A connected social platform account, tokens encrypted at rest.
#[derive(Debug, Clone, FromRow)]
pub struct SocialAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub platform: String,
    pub platform_user_id: String,
    pub username: String,
    pub access_token_encrypted: String,
    pub refresh_token_encrypted: Option<String>,
    pub token_expires_at: Option<OffsetDateTime>,
    pub connected_at: OffsetDateTime,
}

/// Public projection of an account; never carries token material.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SocialAccountInfo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub platform: String,
    pub platform_user_id: String,
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub connected_at: OffsetDateTime,
}

pub struct NewSocialAccount {
    pub user_id: Uuid,
    pub platform: String,
    pub platform_user_id: String,
    pub username: String,
    pub access_token_encrypted: String,
    pub refresh_token_encrypted: Option<String>,
    pub token_expires_at: Option<OffsetDateTime>,
}

impl SocialAccount {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<SocialAccount>> {
        let account = sqlx::query_as::<_, SocialAccount>(
            r#"
            SELECT id, user_id, platform, platform_user_id, username,
                   access_token_encrypted, refresh_token_encrypted, token_expires_at, connected_at
            FROM social_accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(account)
    }

    pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<SocialAccountInfo>> {
        let rows = sqlx::query_as::<_, SocialAccountInfo>(
            r#"
            SELECT id, user_id, platform, platform_user_id, username, connected_at
            FROM social_accounts
            WHERE user_id = $1
            ORDER BY connected_at
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Insert or replace the account for (user, platform); reconnecting a
    /// platform overwrites the stored tokens.
    pub async fn upsert(db: &PgPool, account: NewSocialAccount) -> anyhow::Result<SocialAccountInfo> {
        let row = sqlx::query_as::<_, SocialAccountInfo>(
            r#"
            INSERT INTO social_accounts
                (user_id, platform, platform_user_id, username,
                 access_token_encrypted, refresh_token_encrypted, token_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, platform) DO UPDATE SET
                platform_user_id = EXCLUDED.platform_user_id,
                username = EXCLUDED.username,
                access_token_encrypted = EXCLUDED.access_token_encrypted,
                refresh_token_encrypted = EXCLUDED.refresh_token_encrypted,
                token_expires_at = EXCLUDED.token_expires_at
            RETURNING id, user_id, platform, platform_user_id, username, connected_at
            "#,
        )
        .bind(account.user_id)
        .bind(&account.platform)
        .bind(&account.platform_user_id)
        .bind(&account.username)
        .bind(&account.access_token_encrypted)
        .bind(&account.refresh_token_encrypted)
        .bind(account.token_expires_at)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// Rotate stored tokens after a refresh-token exchange.
    pub async fn update_tokens(
        db: &PgPool,
        id: Uuid,
        access_token_encrypted: &str,
        refresh_token_encrypted: &str,
        token_expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE social_accounts
            SET access_token_encrypted = $2,
                refresh_token_encrypted = $3,
                token_expires_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(access_token_encrypted)
        .bind(refresh_token_encrypted)
        .bind(token_expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn delete_for_platform(
        db: &PgPool,
        user_id: Uuid,
        platform: &str,
    ) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"DELETE FROM social_accounts WHERE user_id = $1 AND platform = $2"#,
        )
        .bind(user_id)
        .bind(platform)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }
}

/// One push-capable device per user; read-only for the background loops.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceRegistration {
    pub user_id: Uuid,
    pub fcm_token: String,
    pub updated_at: OffsetDateTime,
}

impl DeviceRegistration {
    pub async fn upsert(db: &PgPool, user_id: Uuid, fcm_token: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_devices (user_id, fcm_token, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (user_id) DO UPDATE SET
                fcm_token = EXCLUDED.fcm_token,
                updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(fcm_token)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn token_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<String>> {
        let token: Option<(String,)> =
            sqlx::query_as(r#"SELECT fcm_token FROM user_devices WHERE user_id = $1"#)
                .bind(user_id)
                .fetch_optional(db)
                .await?;
        Ok(token.map(|t| t.0).filter(|t| !t.is_empty()))
    }
}
