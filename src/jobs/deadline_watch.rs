//! Advance deadline notifications: goals whose deadline enters the fixed
//! lead-time window get one push per deadline instance. The window is
//! narrow by design; a goal whose window passes unscanned simply misses its
//! notification (accepted best-effort bound, no catch-up).

use time::{Duration, OffsetDateTime};
use tracing::{debug, error, info, instrument};

use crate::goals::repo::{GeneratedPost, Goal};
use crate::social::repo::DeviceRegistration;
use crate::state::AppState;

/// How far ahead of the deadline the notification fires.
const NOTIFY_LEAD: Duration = Duration::hours(2);
/// Half-width of the scan window around the lead instant.
const WINDOW_TOLERANCE: Duration = Duration::minutes(1);
/// Preview length taken from the first post's effective text.
const PREVIEW_CHARS: usize = 100;

pub async fn tick(state: &AppState) -> anyhow::Result<()> {
    let now = OffsetDateTime::now_utc();
    let target = now + NOTIFY_LEAD;
    let goals =
        Goal::find_in_notification_window(&state.db, target - WINDOW_TOLERANCE, target + WINDOW_TOLERANCE)
            .await?;
    if goals.is_empty() {
        return Ok(());
    }

    info!(count = goals.len(), "goals hitting deadline in 2 hours");
    for goal in goals {
        if let Err(e) = notify_goal(state, &goal).await {
            error!(error = %e, goal_id = %goal.id, "deadline notification failed");
        }
    }
    Ok(())
}

/// Send the advance push for one goal; the goal only transitions to
/// notified on confirmed delivery.
#[instrument(skip(state, goal), fields(goal_id = %goal.id))]
async fn notify_goal(state: &AppState, goal: &Goal) -> anyhow::Result<()> {
    let Some(device_token) = DeviceRegistration::token_for_user(&state.db, goal.user_id).await?
    else {
        debug!(user_id = %goal.user_id, "no device token, skipping");
        return Ok(());
    };

    let preview = GeneratedPost::first_for_goal(&state.db, goal.id)
        .await?
        .map(|post| post.preview(PREVIEW_CHARS))
        .unwrap_or_default();

    let delivered = state
        .push
        .send(
            &device_token,
            "Goal deadline in 2 hours",
            &goal.title,
            goal.id,
            &preview,
        )
        .await?;

    if delivered {
        Goal::set_notification_sent(&state.db, goal.id).await?;
        info!("deadline notification delivered");
    } else {
        debug!("push gateway reported non-delivery, will retry while in window");
    }
    Ok(())
}
