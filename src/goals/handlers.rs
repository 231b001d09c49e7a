use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    goals::dto::{
        CreateGoalRequest, GeneratedPostsResponse, GoalResponse, GoalWithSelections,
        PostNowResponse, PostponeQuery, PostponeResponse, UpdatePostRequest, UpdatedPostResponse,
    },
    goals::repo::{GeneratedPost, Goal, GoalSelection},
    goals::services::{self, PostponeError, MAX_POSTPONE_MINUTES},
    jobs::commitment,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/goals", post(create_goal).get(list_goals))
        .route("/goals/history", get(goal_history))
        .route("/goals/:id/posts", get(get_goal_posts))
        .route("/goals/:id/generate-posts", post(generate_posts))
        .route("/goals/:id/post-now", post(post_now))
        .route("/goals/:id/postpone", post(postpone_goal))
        .route("/posts/:post_id", patch(update_post))
}

#[instrument(skip(state, payload))]
pub async fn create_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateGoalRequest>,
) -> Result<Json<GoalResponse>, (StatusCode, String)> {
    if payload.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "title must be non-empty".into()));
    }

    let goal = Goal::create(
        &state.db,
        user_id,
        payload.title.trim(),
        &payload.description,
        payload.deadline,
    )
    .await
    .map_err(internal)?;

    GoalSelection::link(&state.db, goal.id, &payload.selected_social_account_ids)
        .await
        .map_err(internal)?;

    // Post generation runs in the background; a generation failure leaves
    // the goal standing with no posts, which the engine tolerates.
    let bg_state = state.clone();
    let goal_id = goal.id;
    tokio::spawn(async move {
        if let Err(e) = services::generate_posts_for_goal(&bg_state, user_id, goal_id).await {
            error!(error = %e, %goal_id, "background post generation failed");
        }
    });

    info!(goal_id = %goal.id, %user_id, deadline = %goal.deadline, "goal created");
    Ok(Json(GoalResponse { success: true, goal }))
}

#[instrument(skip(state))]
pub async fn list_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<GoalWithSelections>>, (StatusCode, String)> {
    let goals = Goal::list_open_for_user(&state.db, user_id)
        .await
        .map_err(internal)?;

    let mut items = Vec::with_capacity(goals.len());
    for goal in goals {
        let selections = GoalSelection::list_for_goal(&state.db, goal.id)
            .await
            .map_err(internal)?;
        items.push(GoalWithSelections {
            goal,
            goal_social_selections: selections,
        });
    }
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn goal_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<GoalWithSelections>>, (StatusCode, String)> {
    let goals = Goal::list_completed_for_user(&state.db, user_id)
        .await
        .map_err(internal)?;

    let mut items = Vec::with_capacity(goals.len());
    for goal in goals {
        let selections = GoalSelection::list_for_goal(&state.db, goal.id)
            .await
            .map_err(internal)?;
        items.push(GoalWithSelections {
            goal,
            goal_social_selections: selections,
        });
    }
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_goal_posts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(goal_id): Path<Uuid>,
) -> Result<Json<Vec<GeneratedPost>>, (StatusCode, String)> {
    let Some(goal) = Goal::find_owned(&state.db, user_id, goal_id)
        .await
        .map_err(internal)?
    else {
        return Err((StatusCode::NOT_FOUND, "Goal not found".into()));
    };

    let posts = GeneratedPost::list_for_goal(&state.db, goal.id)
        .await
        .map_err(internal)?;
    Ok(Json(posts))
}

#[instrument(skip(state))]
pub async fn generate_posts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(goal_id): Path<Uuid>,
) -> Result<Json<GeneratedPostsResponse>, (StatusCode, String)> {
    let posts = services::generate_posts_for_goal(&state, user_id, goal_id)
        .await
        .map_err(|e| {
            error!(error = %e, %goal_id, "post generation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    Ok(Json(GeneratedPostsResponse { posts }))
}

#[instrument(skip(state, payload))]
pub async fn update_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<UpdatedPostResponse>, (StatusCode, String)> {
    let Some(post) = GeneratedPost::find_by_id(&state.db, post_id)
        .await
        .map_err(internal)?
    else {
        return Err((StatusCode::NOT_FOUND, "Post not found".into()));
    };

    // Ownership check runs through the post's goal
    if Goal::find_owned(&state.db, user_id, post.goal_id)
        .await
        .map_err(internal)?
        .is_none()
    {
        return Err((StatusCode::FORBIDDEN, "Unauthorized".into()));
    }

    if post.posted_at.is_some() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Post has already been published".into(),
        ));
    }

    let post = GeneratedPost::update_edited_content(&state.db, post_id, &payload.edited_content)
        .await
        .map_err(internal)?;
    Ok(Json(UpdatedPostResponse {
        success: true,
        post,
    }))
}

/// Manual early publish: same fan-out and finalization as the commitment
/// engine, just triggered by the owner ahead of the deadline.
#[instrument(skip(state))]
pub async fn post_now(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(goal_id): Path<Uuid>,
) -> Result<Json<PostNowResponse>, (StatusCode, String)> {
    let Some(goal) = Goal::find_owned(&state.db, user_id, goal_id)
        .await
        .map_err(internal)?
    else {
        return Err((StatusCode::NOT_FOUND, "Goal not found".into()));
    };

    let report = commitment::finalize_goal(&state, &goal)
        .await
        .map_err(internal)?;

    let completed_goal = Goal::find_owned(&state.db, user_id, goal_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Goal not found".to_string()))?;

    Ok(Json(PostNowResponse {
        success: true,
        results: report.outcomes,
        completed_goal,
    }))
}

#[instrument(skip(state))]
pub async fn postpone_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(goal_id): Path<Uuid>,
    Query(query): Query<PostponeQuery>,
) -> Result<Json<PostponeResponse>, (StatusCode, String)> {
    let receipt = services::postpone(&state.db, user_id, goal_id, query.minutes)
        .await
        .map_err(|e| {
            let status = match &e {
                PostponeError::NotFound => StatusCode::NOT_FOUND,
                PostponeError::Db(inner) => {
                    error!(error = %inner, %goal_id, "postpone failed");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => {
                    warn!(%goal_id, %user_id, minutes = query.minutes, reason = %e, "postpone rejected");
                    StatusCode::BAD_REQUEST
                }
            };
            (status, e.to_string())
        })?;

    let total = receipt.goal.total_postponed_minutes;
    Ok(Json(PostponeResponse {
        success: true,
        postponed_by_minutes: receipt.postponed_by_minutes,
        total_postponed_minutes: total,
        remaining_postpone_minutes: MAX_POSTPONE_MINUTES - total,
        new_deadline: receipt.goal.deadline,
        goal: receipt.goal,
    }))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
