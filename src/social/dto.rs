use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct FcmTokenRequest {
    pub fcm_token: String,
}

#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub success: bool,
}
