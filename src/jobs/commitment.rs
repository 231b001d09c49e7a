//! The commitment engine: goals past their deadline get their posts
//! published best-effort and are then finalized unconditionally. A deadline
//! always results in completion; publish failures degrade to a partial
//! report, never to a blocked or retried completion.

use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::goals::repo::{GeneratedPost, Goal};
use crate::publish::PublishOutcome;
use crate::social::repo::SocialAccount;
use crate::state::AppState;

/// What one finalization pass did for one goal.
#[derive(Debug)]
pub struct CompletionReport {
    pub goal_id: Uuid,
    pub outcomes: Vec<PublishOutcome>,
}

impl CompletionReport {
    pub fn posted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.posted()
    }

    pub fn is_partial(&self) -> bool {
        self.failed() > 0
    }
}

pub async fn tick(state: &AppState) -> anyhow::Result<()> {
    let now = OffsetDateTime::now_utc();
    let goals = Goal::find_expired(&state.db, now).await?;
    if goals.is_empty() {
        return Ok(());
    }

    info!(count = goals.len(), "expired goals to finalize");
    for goal in goals {
        // One bad goal must not stop the rest of the pass.
        match finalize_goal(state, &goal).await {
            Ok(report) if report.is_partial() => {
                warn!(
                    goal_id = %report.goal_id,
                    posted = report.posted(),
                    failed = report.failed(),
                    "goal completed, partially posted"
                );
            }
            Ok(report) => {
                info!(goal_id = %report.goal_id, posted = report.posted(), "goal completed, fully posted");
            }
            Err(e) => {
                error!(error = %e, goal_id = %goal.id, "finalizing goal failed, will retry next scan");
            }
        }
    }
    Ok(())
}

/// Publish every still-unposted post for the goal, then mark it completed.
/// Finalization does not depend on any individual publish outcome; only the
/// inability to even load the goal's posts defers it to the next scan.
#[instrument(skip(state, goal), fields(goal_id = %goal.id))]
pub async fn finalize_goal(state: &AppState, goal: &Goal) -> anyhow::Result<CompletionReport> {
    let pairs = GeneratedPost::list_with_accounts(&state.db, goal.id).await?;
    let now = OffsetDateTime::now_utc();

    let outcomes = publish_pending(state, &pairs, now).await;

    let first_writer = Goal::mark_completed(&state.db, goal.id, now).await?;
    if !first_writer {
        info!("goal was already finalized by an overlapping scan");
    }

    Ok(CompletionReport {
        goal_id: goal.id,
        outcomes,
    })
}

/// Fan out over preloaded post/account pairs, skipping anything already
/// stamped. One outcome per attempted post; skipped posts produce none.
async fn publish_pending(
    state: &AppState,
    pairs: &[(GeneratedPost, SocialAccount)],
    now: OffsetDateTime,
) -> Vec<PublishOutcome> {
    let mut outcomes = Vec::new();
    for (post, account) in pairs {
        // Idempotent re-entry: an interrupted pass never republishes.
        if post.posted_at.is_some() {
            info!(post_id = %post.id, "post already published, skipping");
            continue;
        }

        let outcome = state.publisher.publish_post(&state.db, post, account).await;
        if outcome.success {
            info!(post_id = %post.id, platform = %outcome.platform, "post published");
            if let Err(e) = GeneratedPost::mark_posted(&state.db, post.id, now).await {
                // Completion still proceeds; the post may be re-sent on a
                // restarted pass, which the platform-side dedupe cannot
                // prevent, so the stamp failure is loud.
                error!(error = %e, post_id = %post.id, "stamping posted_at failed");
            }
        } else {
            warn!(
                post_id = %post.id,
                platform = %outcome.platform,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "post publish failed"
            );
        }
        outcomes.push(outcome);
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::tests::{account, post, test_vault, ScriptedPort};
    use crate::publish::{Platform, Publisher};
    use crate::state::AppState;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn state_with_ports(ports: Vec<Arc<ScriptedPort>>) -> AppState {
        let vault = test_vault();
        let ports = ports
            .into_iter()
            .map(|p| p as Arc<dyn crate::publish::PlatformPort>)
            .collect();
        AppState::fake_with_publisher(Publisher::with_ports(vault, ports))
    }

    #[tokio::test]
    async fn partial_failure_still_reports_both_outcomes() {
        let vault = test_vault();
        let twitter = Arc::new(ScriptedPort::new(Platform::Twitter, &[201]));
        let linkedin = Arc::new(ScriptedPort::new(Platform::Linkedin, &[403]));
        let state = state_with_ports(vec![twitter.clone(), linkedin.clone()]);

        let tw_account = account(&vault, "twitter");
        let li_account = account(&vault, "linkedin");
        let goal_id = Uuid::new_v4();
        let pairs = vec![
            (post(goal_id, tw_account.id), tw_account),
            (post(goal_id, li_account.id), li_account),
        ];

        let outcomes = publish_pending(&state, &pairs, OffsetDateTime::now_utc()).await;
        let report = CompletionReport { goal_id, outcomes };

        assert_eq!(report.posted(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.is_partial());
        assert!(report.outcomes[0].success);
        assert_eq!(report.outcomes[0].platform, "twitter");
        assert!(!report.outcomes[1].success);
        assert_eq!(
            report.outcomes[1].error.as_deref(),
            Some("Status 403: body-403")
        );
    }

    #[tokio::test]
    async fn already_posted_posts_are_never_republished() {
        let vault = test_vault();
        let twitter = Arc::new(ScriptedPort::new(Platform::Twitter, &[201]));
        let state = state_with_ports(vec![twitter.clone()]);

        let tw_account = account(&vault, "twitter");
        let goal_id = Uuid::new_v4();
        let mut already_posted = post(goal_id, tw_account.id);
        already_posted.posted_at = Some(OffsetDateTime::now_utc());
        let pending = post(goal_id, tw_account.id);
        let pairs = vec![
            (already_posted, tw_account.clone()),
            (pending, tw_account),
        ];

        let outcomes = publish_pending(&state, &pairs, OffsetDateTime::now_utc()).await;

        // Only the unstamped post reaches the port; the stamped one
        // produces neither a call nor an outcome.
        assert_eq!(twitter.publish_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].success);
    }

    #[tokio::test]
    async fn zero_post_goal_completes_without_publish_calls() {
        let twitter = Arc::new(ScriptedPort::new(Platform::Twitter, &[201]));
        let state = state_with_ports(vec![twitter.clone()]);

        let outcomes = publish_pending(&state, &[], OffsetDateTime::now_utc()).await;
        assert!(outcomes.is_empty());
        assert_eq!(twitter.publish_calls.load(Ordering::SeqCst), 0);

        // An empty fan-out is a full success, not a partial one.
        let report = CompletionReport {
            goal_id: Uuid::new_v4(),
            outcomes,
        };
        assert_eq!(report.posted(), 0);
        assert_eq!(report.failed(), 0);
        assert!(!report.is_partial());
    }
}
