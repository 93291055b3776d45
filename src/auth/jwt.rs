use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use super::claims::Claims;
use crate::{config::JwtConfig, error::AppError, users::repo_types::User};

/// Tokens are valid for a fixed day from issuance.
pub const TOKEN_TTL: TimeDuration = TimeDuration::hours(24);

const ALGORITHM: Algorithm = Algorithm::HS256;

/// HMAC signing and verification keys, built once from configuration.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        self.issue_at(user, OffsetDateTime::now_utc())
    }

    fn issue_at(&self, user: &User, now: OffsetDateTime) -> Result<String, AppError> {
        let exp = now + TOKEN_TTL;
        let claims = Claims {
            user_id: user.id,
            user_uuid: user.external_id,
            username: user.username.clone(),
            email: user.email.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(e.into()))?;
        debug!(user_id = %user.external_id, "jwt signed");
        Ok(token)
    }

    /// Every failure (tampered, expired, malformed, wrong algorithm) is the
    /// same [`AppError::InvalidToken`].
    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            AppError::InvalidToken
        })?;
        debug!(user_id = %data.claims.user_uuid, "jwt verified");
        Ok(data.claims)
    }
}

/// Authenticated caller may only act on their own record.
pub fn authorize_target(claims: &Claims, target: Uuid) -> Result<(), AppError> {
    if claims.user_uuid != target {
        warn!(caller = %claims.user_uuid, %target, "update of foreign account refused");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Validated claims of the bearer token on the request.
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<TokenService>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = Arc::<TokenService>::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::MissingToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .filter(|t| !t.is_empty())
            .ok_or(AppError::MissingToken)?;

        let claims = tokens.validate(token).map_err(|e| {
            warn!("invalid or expired token");
            e
        })?;
        Ok(AuthUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str, issuer: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: "test-aud".into(),
        }
    }

    fn bob() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: 7,
            external_id: Uuid::new_v4(),
            username: "bob".into(),
            email: "bob@x.com".into(),
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issue_then_validate_reproduces_identity() {
        let tokens = TokenService::new(&config("dev-secret", "test-issuer"));
        let user = bob();
        let token = tokens.issue(&user).expect("issue");
        let claims = tokens.validate(&token).expect("validate");
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.user_uuid, user.external_id);
        assert_eq!(claims.username, user.username);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn token_issued_23_hours_ago_is_still_valid() {
        let tokens = TokenService::new(&config("dev-secret", "iss"));
        let issued = OffsetDateTime::now_utc() - TimeDuration::hours(23);
        let token = tokens.issue_at(&bob(), issued).unwrap();
        assert!(tokens.validate(&token).is_ok());
    }

    #[test]
    fn token_older_than_a_day_is_rejected() {
        let tokens = TokenService::new(&config("dev-secret", "iss"));
        let issued = OffsetDateTime::now_utc() - TimeDuration::hours(25);
        let token = tokens.issue_at(&bob(), issued).unwrap();
        assert!(matches!(tokens.validate(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn token_just_past_a_day_is_rejected() {
        let tokens = TokenService::new(&config("dev-secret", "iss"));
        for past_expiry in [TimeDuration::seconds(1), TimeDuration::seconds(30)] {
            let issued = OffsetDateTime::now_utc() - TOKEN_TTL - past_expiry;
            let token = tokens.issue_at(&bob(), issued).unwrap();
            assert!(matches!(tokens.validate(&token), Err(AppError::InvalidToken)));
        }
    }

    #[test]
    fn tampered_and_malformed_tokens_are_rejected_alike() {
        let tokens = TokenService::new(&config("dev-secret", "iss"));
        let token = tokens.issue(&bob()).unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.clone().into_bytes();
        bytes[sig_start] = if bytes[sig_start] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        for bad in [tampered.as_str(), "not.a.token", ""] {
            assert!(matches!(tokens.validate(bad), Err(AppError::InvalidToken)));
        }
    }

    #[test]
    fn other_secret_or_issuer_is_rejected() {
        let good = TokenService::new(&config("secret-a", "iss"));
        let other_secret = TokenService::new(&config("secret-b", "iss"));
        let other_issuer = TokenService::new(&config("secret-a", "someone-else"));
        let token = good.issue(&bob()).unwrap();
        assert!(matches!(other_secret.validate(&token), Err(AppError::InvalidToken)));
        assert!(matches!(other_issuer.validate(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn other_hmac_algorithm_is_rejected() {
        let cfg = config("dev-secret", "iss");
        let tokens = TokenService::new(&cfg);
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            user_id: 1,
            user_uuid: Uuid::new_v4(),
            username: "bob".into(),
            email: "bob@x.com".into(),
            iat: now.unix_timestamp() as usize,
            exp: (now + TOKEN_TTL).unix_timestamp() as usize,
            iss: cfg.issuer.clone(),
            aud: cfg.audience.clone(),
        };
        let forged = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(cfg.secret.as_bytes()),
        )
        .unwrap();
        assert!(matches!(tokens.validate(&forged), Err(AppError::InvalidToken)));
    }

    #[test]
    fn foreign_target_is_forbidden() {
        let tokens = TokenService::new(&config("dev-secret", "iss"));
        let user = bob();
        let claims = tokens.validate(&tokens.issue(&user).unwrap()).unwrap();
        assert!(authorize_target(&claims, user.external_id).is_ok());
        assert!(matches!(
            authorize_target(&claims, Uuid::new_v4()),
            Err(AppError::Forbidden)
        ));
    }
}
