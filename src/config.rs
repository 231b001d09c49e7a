use anyhow::Context;

/// OAuth client registration for one platform.
#[derive(Debug, Clone, Default)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl OAuthProviderConfig {
    fn from_env(prefix: &str) -> Self {
        Self {
            client_id: std::env::var(format!("{prefix}_CLIENT_ID")).unwrap_or_default(),
            client_secret: std::env::var(format!("{prefix}_CLIENT_SECRET")).unwrap_or_default(),
            redirect_uri: std::env::var(format!("{prefix}_REDIRECT_URI")).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// HS256 secret the Supabase auth service signs user JWTs with.
    pub supabase_jwt_secret: String,
    /// Base64-encoded 32-byte key for token encryption at rest.
    pub encryption_key: String,
    pub twitter: OAuthProviderConfig,
    pub linkedin: OAuthProviderConfig,
    pub reddit: OAuthProviderConfig,
    /// Deep link the OAuth callback pages bounce back to.
    pub frontend_url: String,
    pub openai_api_key: Option<String>,
    pub fcm_server_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let supabase_jwt_secret =
            std::env::var("SUPABASE_JWT_SECRET").context("SUPABASE_JWT_SECRET is required")?;
        let encryption_key =
            std::env::var("ENCRYPTION_KEY").context("ENCRYPTION_KEY is required")?;

        Ok(Self {
            database_url,
            supabase_jwt_secret,
            encryption_key,
            twitter: OAuthProviderConfig::from_env("TWITTER"),
            linkedin: OAuthProviderConfig::from_env("LINKEDIN"),
            reddit: OAuthProviderConfig::from_env("REDDIT"),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "lockin://oauth/callback".into()),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|v| !v.is_empty()),
            fcm_server_key: std::env::var("FCM_SERVER_KEY").ok().filter(|v| !v.is_empty()),
        })
    }
}
