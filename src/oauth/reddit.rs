//! Reddit OAuth: authorization URL only. The callback exchange (and the
//! submit-post port) are not wired up yet.
//! TODO: complete the code exchange against /api/v1/access_token once the
//! reddit app registration is settled.

use uuid::Uuid;

use crate::state::AppState;

const AUTHORIZE_URL: &str = "https://www.reddit.com/api/v1/authorize";
const SCOPE: &str = "identity submit";

pub fn authorization_url(state: &AppState, user_id: Uuid) -> String {
    let csrf_state = state.oauth_states.issue(user_id, None);
    let oauth = &state.config.reddit;
    format!(
        "{AUTHORIZE_URL}?client_id={}&response_type=code&state={}&redirect_uri={}&duration=permanent&scope={}",
        oauth.client_id,
        csrf_state,
        oauth.redirect_uri,
        SCOPE.replace(' ', "%20"),
    )
}
