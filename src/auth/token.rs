use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// 签发者
pub const ISSUER: &str = "devlog";

/// 令牌有效期（小时），不支持续期
pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub admin_id: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// 已签发的令牌
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 令牌签发与校验
///
/// 密钥在构造时传入，之后只读。
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iat", "iss"]);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// 以 `issued_at` 为签发时间签发令牌
    pub fn issue(&self, admin_id: Uuid, issued_at: DateTime<Utc>) -> Result<IssuedToken> {
        let expires_at = issued_at + self.ttl;
        let claims = Claims {
            admin_id: admin_id.to_string(),
            iss: ISSUER.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// 校验签名、签发者与有效期，返回管理员 id
    pub fn verify(&self, token: &str) -> Result<Uuid> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            Error::InvalidToken
        })?;

        Uuid::parse_str(&data.claims.admin_id).map_err(|_| Error::InvalidToken)
    }
}
