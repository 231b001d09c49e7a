//! Goal mutations with domain rules: the postpone guard and post
//! generation. Publishing fan-out lives with the commitment engine and is
//! reused here for the manual post-now path.

use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tracing::{error, info};
use uuid::Uuid;

use crate::goals::repo::{GeneratedPost, Goal, GoalSelection};
use crate::state::AppState;

/// Hard cap on accumulated deadline extensions.
pub const MAX_POSTPONE_MINUTES: i32 = 120;

#[derive(Debug, thiserror::Error)]
pub enum PostponeError {
    #[error("Postponement must be between 1 and {MAX_POSTPONE_MINUTES} minutes")]
    InvalidMinutes,
    #[error("Goal not found")]
    NotFound,
    #[error("Cannot postpone a completed goal")]
    AlreadyCompleted,
    #[error("Cannot postpone a goal past its deadline")]
    DeadlinePassed,
    #[error("Cannot postpone. Maximum 2 hours total. You have {remaining} minutes remaining.")]
    BudgetExceeded { remaining: i32 },
    #[error(transparent)]
    Db(#[from] anyhow::Error),
}

pub struct PostponeReceipt {
    pub goal: Goal,
    pub postponed_by_minutes: i32,
}

/// Pure validation half of the guard; checks run in a fixed order so the
/// caller always sees the most specific rejection.
pub fn check_postpone(goal: &Goal, minutes: i32, now: OffsetDateTime) -> Result<(), PostponeError> {
    if minutes <= 0 || minutes > MAX_POSTPONE_MINUTES {
        return Err(PostponeError::InvalidMinutes);
    }
    if goal.completed {
        return Err(PostponeError::AlreadyCompleted);
    }
    if goal.deadline < now {
        return Err(PostponeError::DeadlinePassed);
    }
    if goal.total_postponed_minutes + minutes > MAX_POSTPONE_MINUTES {
        return Err(PostponeError::BudgetExceeded {
            remaining: MAX_POSTPONE_MINUTES - goal.total_postponed_minutes,
        });
    }
    Ok(())
}

/// Validate and apply a bounded deadline extension. Rejections leave the
/// goal untouched.
pub async fn postpone(
    db: &PgPool,
    user_id: Uuid,
    goal_id: Uuid,
    minutes: i32,
) -> Result<PostponeReceipt, PostponeError> {
    if minutes <= 0 || minutes > MAX_POSTPONE_MINUTES {
        return Err(PostponeError::InvalidMinutes);
    }

    let goal = Goal::find_owned(db, user_id, goal_id)
        .await?
        .ok_or(PostponeError::NotFound)?;

    check_postpone(&goal, minutes, OffsetDateTime::now_utc())?;

    let new_deadline = goal.deadline + Duration::minutes(minutes as i64);
    let new_total = goal.total_postponed_minutes + minutes;
    let goal = Goal::apply_postpone(db, goal.id, new_deadline, new_total).await?;

    info!(%goal_id, %user_id, minutes, total = new_total, "goal postponed");
    Ok(PostponeReceipt {
        goal,
        postponed_by_minutes: minutes,
    })
}

/// Generate one announcement per selected account and store it. Failures
/// for a single platform are logged and skipped; the rest still generate.
pub async fn generate_posts_for_goal(
    state: &AppState,
    user_id: Uuid,
    goal_id: Uuid,
) -> anyhow::Result<Vec<GeneratedPost>> {
    let goal = Goal::find_owned(&state.db, user_id, goal_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("goal not found"))?;
    let selections = GoalSelection::list_for_goal(&state.db, goal_id).await?;

    let mut posts = Vec::with_capacity(selections.len());
    for selection in selections {
        let content = match state
            .generator
            .generate(&selection.platform, &goal.title, &goal.description)
            .await
        {
            Ok(content) => content,
            Err(e) => {
                error!(error = %e, %goal_id, platform = %selection.platform, "post generation failed");
                continue;
            }
        };
        let post =
            GeneratedPost::insert(&state.db, goal_id, selection.social_account_id, &content).await?;
        posts.push(post);
    }

    info!(%goal_id, generated = posts.len(), "posts generated");
    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(deadline_offset_mins: i64, completed: bool, total_postponed: i32) -> Goal {
        let now = OffsetDateTime::now_utc();
        Goal {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Ship the thing".into(),
            description: "For real this time".into(),
            deadline: now + Duration::minutes(deadline_offset_mins),
            completed,
            completed_at: completed.then(|| now),
            notification_sent: false,
            total_postponed_minutes: total_postponed,
            created_at: now,
        }
    }

    #[test]
    fn accepts_a_valid_postpone() {
        let g = goal(60, false, 0);
        assert!(check_postpone(&g, 30, OffsetDateTime::now_utc()).is_ok());
    }

    #[test]
    fn rejects_out_of_range_minutes() {
        let g = goal(60, false, 0);
        let now = OffsetDateTime::now_utc();
        assert!(matches!(check_postpone(&g, 0, now), Err(PostponeError::InvalidMinutes)));
        assert!(matches!(check_postpone(&g, -5, now), Err(PostponeError::InvalidMinutes)));
        assert!(matches!(check_postpone(&g, 121, now), Err(PostponeError::InvalidMinutes)));
        // Boundary values are allowed
        assert!(check_postpone(&g, 1, now).is_ok());
        assert!(check_postpone(&g, 120, now).is_ok());
    }

    #[test]
    fn rejects_completed_goal() {
        let g = goal(60, true, 0);
        assert!(matches!(
            check_postpone(&g, 10, OffsetDateTime::now_utc()),
            Err(PostponeError::AlreadyCompleted)
        ));
    }

    #[test]
    fn rejects_passed_deadline() {
        let g = goal(-5, false, 0);
        assert!(matches!(
            check_postpone(&g, 10, OffsetDateTime::now_utc()),
            Err(PostponeError::DeadlinePassed)
        ));
    }

    #[test]
    fn rejects_over_budget_and_reports_remaining() {
        let g = goal(60, false, 100);
        match check_postpone(&g, 30, OffsetDateTime::now_utc()) {
            Err(PostponeError::BudgetExceeded { remaining }) => assert_eq!(remaining, 20),
            other => panic!("expected budget rejection, got {other:?}"),
        }
        // Exactly exhausting the budget is fine
        assert!(check_postpone(&g, 20, OffsetDateTime::now_utc()).is_ok());
    }

    #[test]
    fn exhausted_budget_rejects_any_postpone() {
        let g = goal(60, false, 120);
        assert!(matches!(
            check_postpone(&g, 1, OffsetDateTime::now_utc()),
            Err(PostponeError::BudgetExceeded { remaining: 0 })
        ));
    }
}
