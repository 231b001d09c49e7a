use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::social::repo::SocialAccount;

/// A user commitment with a hard deadline and bound social posts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub notification_sent: bool,
    pub total_postponed_minutes: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const GOAL_COLUMNS: &str = "id, user_id, title, description, deadline, completed, completed_at, \
                            notification_sent, total_postponed_minutes, created_at";

impl Goal {
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        title: &str,
        description: &str,
        deadline: OffsetDateTime,
    ) -> anyhow::Result<Goal> {
        let goal = sqlx::query_as::<_, Goal>(&format!(
            r#"
            INSERT INTO goals (user_id, title, description, deadline)
            VALUES ($1, $2, $3, $4)
            RETURNING {GOAL_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(deadline)
        .fetch_one(db)
        .await?;
        Ok(goal)
    }

    pub async fn find_owned(
        db: &PgPool,
        user_id: Uuid,
        goal_id: Uuid,
    ) -> anyhow::Result<Option<Goal>> {
        let goal = sqlx::query_as::<_, Goal>(&format!(
            r#"SELECT {GOAL_COLUMNS} FROM goals WHERE id = $1 AND user_id = $2"#
        ))
        .bind(goal_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(goal)
    }

    pub async fn list_open_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Goal>> {
        let goals = sqlx::query_as::<_, Goal>(&format!(
            r#"
            SELECT {GOAL_COLUMNS}
            FROM goals
            WHERE user_id = $1 AND completed = false
            ORDER BY deadline
            "#
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(goals)
    }

    pub async fn list_completed_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Goal>> {
        let goals = sqlx::query_as::<_, Goal>(&format!(
            r#"
            SELECT {GOAL_COLUMNS}
            FROM goals
            WHERE user_id = $1 AND completed = true
            ORDER BY completed_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(goals)
    }

    /// Goals past their deadline and not yet finalized.
    pub async fn find_expired(db: &PgPool, now: OffsetDateTime) -> anyhow::Result<Vec<Goal>> {
        let goals = sqlx::query_as::<_, Goal>(&format!(
            r#"
            SELECT {GOAL_COLUMNS}
            FROM goals
            WHERE completed = false AND deadline <= $1
            ORDER BY deadline
            "#
        ))
        .bind(now)
        .fetch_all(db)
        .await?;
        Ok(goals)
    }

    /// Goals whose deadline falls inside the advance-notification window
    /// and that have not been notified for this deadline instance.
    pub async fn find_in_notification_window(
        db: &PgPool,
        window_start: OffsetDateTime,
        window_end: OffsetDateTime,
    ) -> anyhow::Result<Vec<Goal>> {
        let goals = sqlx::query_as::<_, Goal>(&format!(
            r#"
            SELECT {GOAL_COLUMNS}
            FROM goals
            WHERE completed = false
              AND notification_sent = false
              AND deadline >= $1
              AND deadline <= $2
            "#
        ))
        .bind(window_start)
        .bind(window_end)
        .fetch_all(db)
        .await?;
        Ok(goals)
    }

    /// Finalize the goal. Conditioned on `completed = false` so an
    /// overlapping scan cannot clobber `completed_at`; returns whether this
    /// caller won the write.
    pub async fn mark_completed(
        db: &PgPool,
        goal_id: Uuid,
        now: OffsetDateTime,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE goals
            SET completed = true, completed_at = $2
            WHERE id = $1 AND completed = false
            "#,
        )
        .bind(goal_id)
        .bind(now)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_notification_sent(db: &PgPool, goal_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE goals SET notification_sent = true WHERE id = $1"#)
            .bind(goal_id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Move the deadline and accumulate the postpone budget; the new
    /// deadline is a fresh notification instance, so the sent flag resets.
    pub async fn apply_postpone(
        db: &PgPool,
        goal_id: Uuid,
        new_deadline: OffsetDateTime,
        new_total_postponed: i32,
    ) -> anyhow::Result<Goal> {
        let goal = sqlx::query_as::<_, Goal>(&format!(
            r#"
            UPDATE goals
            SET deadline = $2,
                total_postponed_minutes = $3,
                notification_sent = false
            WHERE id = $1
            RETURNING {GOAL_COLUMNS}
            "#
        ))
        .bind(goal_id)
        .bind(new_deadline)
        .bind(new_total_postponed)
        .fetch_one(db)
        .await?;
        Ok(goal)
    }
}

/// AI-generated announcement bound to one goal and one social account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GeneratedPost {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub social_account_id: Uuid,
    pub content: String,
    pub edited_content: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub posted_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const POST_COLUMNS: &str =
    "id, goal_id, social_account_id, content, edited_content, posted_at, created_at";

impl GeneratedPost {
    /// User edits win over the generated text.
    pub fn effective_text(&self) -> &str {
        self.edited_content
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.content)
    }

    /// Char-boundary-safe prefix for notification previews.
    pub fn preview(&self, max_chars: usize) -> String {
        self.effective_text().chars().take(max_chars).collect()
    }

    pub async fn insert(
        db: &PgPool,
        goal_id: Uuid,
        social_account_id: Uuid,
        content: &str,
    ) -> anyhow::Result<GeneratedPost> {
        let post = sqlx::query_as::<_, GeneratedPost>(&format!(
            r#"
            INSERT INTO generated_posts (goal_id, social_account_id, content)
            VALUES ($1, $2, $3)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(goal_id)
        .bind(social_account_id)
        .bind(content)
        .fetch_one(db)
        .await?;
        Ok(post)
    }

    pub async fn list_for_goal(db: &PgPool, goal_id: Uuid) -> anyhow::Result<Vec<GeneratedPost>> {
        let posts = sqlx::query_as::<_, GeneratedPost>(&format!(
            r#"SELECT {POST_COLUMNS} FROM generated_posts WHERE goal_id = $1 ORDER BY created_at"#
        ))
        .bind(goal_id)
        .fetch_all(db)
        .await?;
        Ok(posts)
    }

    pub async fn first_for_goal(db: &PgPool, goal_id: Uuid) -> anyhow::Result<Option<GeneratedPost>> {
        let post = sqlx::query_as::<_, GeneratedPost>(&format!(
            r#"
            SELECT {POST_COLUMNS} FROM generated_posts
            WHERE goal_id = $1
            ORDER BY created_at
            LIMIT 1
            "#
        ))
        .bind(goal_id)
        .fetch_optional(db)
        .await?;
        Ok(post)
    }

    /// Each post with the account it targets; the engine needs both sides.
    pub async fn list_with_accounts(
        db: &PgPool,
        goal_id: Uuid,
    ) -> anyhow::Result<Vec<(GeneratedPost, SocialAccount)>> {
        let posts = Self::list_for_goal(db, goal_id).await?;
        let mut pairs = Vec::with_capacity(posts.len());
        for post in posts {
            match SocialAccount::find_by_id(db, post.social_account_id).await? {
                Some(account) => pairs.push((post, account)),
                // Account disconnected after generation; nothing to publish to.
                None => continue,
            }
        }
        Ok(pairs)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<GeneratedPost>> {
        let post = sqlx::query_as::<_, GeneratedPost>(&format!(
            r#"SELECT {POST_COLUMNS} FROM generated_posts WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(post)
    }

    pub async fn update_edited_content(
        db: &PgPool,
        id: Uuid,
        edited_content: &str,
    ) -> anyhow::Result<GeneratedPost> {
        let post = sqlx::query_as::<_, GeneratedPost>(&format!(
            r#"
            UPDATE generated_posts
            SET edited_content = $2
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(edited_content)
        .fetch_one(db)
        .await?;
        Ok(post)
    }

    /// Stamp `posted_at` exactly once; a second runner's write is a no-op.
    pub async fn mark_posted(
        db: &PgPool,
        id: Uuid,
        now: OffsetDateTime,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"UPDATE generated_posts SET posted_at = $2 WHERE id = $1 AND posted_at IS NULL"#,
        )
        .bind(id)
        .bind(now)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Which accounts a goal will announce on.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GoalSelection {
    pub social_account_id: Uuid,
    pub platform: String,
    pub username: String,
}

impl GoalSelection {
    pub async fn link(db: &PgPool, goal_id: Uuid, account_ids: &[Uuid]) -> anyhow::Result<()> {
        for account_id in account_ids {
            sqlx::query(
                r#"
                INSERT INTO goal_social_selections (goal_id, social_account_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(goal_id)
            .bind(account_id)
            .execute(db)
            .await?;
        }
        Ok(())
    }

    pub async fn list_for_goal(db: &PgPool, goal_id: Uuid) -> anyhow::Result<Vec<GoalSelection>> {
        let rows = sqlx::query_as::<_, GoalSelection>(
            r#"
            SELECT s.social_account_id, a.platform, a.username
            FROM goal_social_selections s
            JOIN social_accounts a ON a.id = s.social_account_id
            WHERE s.goal_id = $1
            "#,
        )
        .bind(goal_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_with(content: &str, edited: Option<&str>) -> GeneratedPost {
        GeneratedPost {
            id: Uuid::new_v4(),
            goal_id: Uuid::new_v4(),
            social_account_id: Uuid::new_v4(),
            content: content.into(),
            edited_content: edited.map(str::to_string),
            posted_at: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn edited_text_wins_when_present() {
        assert_eq!(post_with("generated", None).effective_text(), "generated");
        assert_eq!(
            post_with("generated", Some("my own words")).effective_text(),
            "my own words"
        );
        // Empty edits do not shadow the generated text
        assert_eq!(post_with("generated", Some("")).effective_text(), "generated");
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        let post = post_with(&"é".repeat(150), None);
        let preview = post.preview(100);
        assert_eq!(preview.chars().count(), 100);

        let short = post_with("done!", None);
        assert_eq!(short.preview(100), "done!");
    }
}
