use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AuthConfig;
use crate::storage::{Role, User};

const TOKEN_TYPE_ACCESS: &str = "access";
const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Token Claims（access 与 refresh 共用，靠 token_type 区分）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: String,
}

/// JWT Service for generating and validating tokens
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_minutes: u64,
    refresh_token_days: u64,
}

impl JwtService {
    pub fn new(secret: &str, access_token_minutes: u64, refresh_token_days: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_minutes,
            refresh_token_days,
        }
    }

    /// Create JwtService from the auth section of the config
    ///
    /// 未配置密钥时生成进程内随机密钥，重启后已签发的 token 全部失效。
    pub fn from_auth_config(auth: &AuthConfig) -> Self {
        let secret = if auth.jwt_secret.is_empty() {
            warn!("JWT secret not configured, generating an ephemeral key");
            crate::utils::generate_random_code(48)
        } else {
            auth.jwt_secret.clone()
        };

        Self::new(&secret, auth.access_token_minutes, auth.refresh_token_days)
    }

    fn generate(
        &self,
        user: &User,
        token_type: &str,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: token_type.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Generate Access Token (short-lived)
    pub fn generate_access_token(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        self.generate(
            user,
            TOKEN_TYPE_ACCESS,
            Duration::minutes(self.access_token_minutes as i64),
        )
    }

    /// Generate Refresh Token (long-lived)
    pub fn generate_refresh_token(
        &self,
        user: &User,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.generate(
            user,
            TOKEN_TYPE_REFRESH,
            Duration::days(self.refresh_token_days as i64),
        )
    }

    fn validate(
        &self,
        token: &str,
        expected_type: &str,
    ) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;

        if token_data.claims.token_type != expected_type {
            return Err(jsonwebtoken::errors::Error::from(
                jsonwebtoken::errors::ErrorKind::InvalidToken,
            ));
        }

        Ok(token_data.claims)
    }

    /// Validate Access Token
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        self.validate(token, TOKEN_TYPE_ACCESS)
    }

    /// Validate Refresh Token
    pub fn validate_refresh_token(
        &self,
        token: &str,
    ) -> Result<Claims, jsonwebtoken::errors::Error> {
        self.validate(token, TOKEN_TYPE_REFRESH)
    }
}
