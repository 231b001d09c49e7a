use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::goals::repo::{Goal, GoalSelection};
use crate::publish::PublishOutcome;

#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    pub title: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    pub selected_social_account_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct GoalResponse {
    pub success: bool,
    pub goal: Goal,
}

#[derive(Debug, Serialize)]
pub struct GoalWithSelections {
    #[serde(flatten)]
    pub goal: Goal,
    pub goal_social_selections: Vec<GoalSelection>,
}

#[derive(Debug, Deserialize)]
pub struct PostponeQuery {
    pub minutes: i32,
}

#[derive(Debug, Serialize)]
pub struct PostponeResponse {
    pub success: bool,
    pub goal: Goal,
    pub postponed_by_minutes: i32,
    pub total_postponed_minutes: i32,
    pub remaining_postpone_minutes: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub new_deadline: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub edited_content: String,
}

#[derive(Debug, Serialize)]
pub struct UpdatedPostResponse {
    pub success: bool,
    pub post: crate::goals::repo::GeneratedPost,
}

#[derive(Debug, Serialize)]
pub struct GeneratedPostsResponse {
    pub posts: Vec<crate::goals::repo::GeneratedPost>,
}

#[derive(Debug, Serialize)]
pub struct PostNowResponse {
    pub success: bool,
    pub results: Vec<PublishOutcome>,
    pub completed_goal: Goal,
}
