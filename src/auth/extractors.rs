use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use uuid::Uuid;

use super::claims::Claims;
use crate::state::AppState;

/// Audience Supabase stamps on signed-in user tokens.
const USER_AUDIENCE: &str = "authenticated";

/// Extracts and validates the Supabase JWT, returning the user ID.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "missing Authorization header".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "invalid auth scheme".into()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[USER_AUDIENCE]);
        let decoding = DecodingKey::from_secret(state.config.supabase_jwt_secret.as_bytes());

        let data = decode::<Claims>(token, &decoding, &validation)
            .map_err(|_| (StatusCode::UNAUTHORIZED, "invalid or expired token".into()))?;

        Ok(AuthUser(data.claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::OffsetDateTime;

    fn sign(secret: &str, aud: &str, exp_offset_secs: i64) -> String {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            exp: (now + exp_offset_secs) as usize,
            aud: aud.into(),
            role: "authenticated".into(),
            email: None,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn verify(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[USER_AUDIENCE]);
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map(|d| d.claims)
    }

    #[test]
    fn accepts_valid_user_token() {
        let token = sign("dev-secret", USER_AUDIENCE, 300);
        let claims = verify(&token, "dev-secret").expect("valid token");
        assert_eq!(claims.aud, USER_AUDIENCE);
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = sign("dev-secret", USER_AUDIENCE, 300);
        assert!(verify(&token, "other-secret").is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let token = sign("dev-secret", USER_AUDIENCE, -300);
        assert!(verify(&token, "dev-secret").is_err());
    }

    #[test]
    fn rejects_foreign_audience() {
        let token = sign("dev-secret", "anon", 300);
        assert!(verify(&token, "dev-secret").is_err());
    }
}
