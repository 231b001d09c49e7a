use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims of a Supabase-issued user JWT. Only the fields we validate or
/// read; everything else in the token is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,      // user ID
    pub exp: usize,     // expires at (unix timestamp)
    pub aud: String,    // "authenticated" for signed-in users
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub email: Option<String>,
}
