//! Issuing and validating user access tokens.
//!
//! Tokens are HS256 JWTs signed with the configured secret and carry the
//! user id as their subject. They reach the server either as a bearer token
//! or in the access token cookie; extracting them from the request is the
//! web layer's job, everything after that lives here.

use crate::error::{DomainErrorKind, EntityErrorKind, Error, InternalErrorKind};
use crate::store::{NotificationStore, RowStatus};
use chrono::{Duration, Utc};
use claims::AccessTokenClaims;
use events::UserId;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use service::config::Config;

pub(crate) mod claims;

pub const KEY_ID: &str = "v1";
pub const ISSUER: &str = "memos";
pub const ACCESS_TOKEN_AUDIENCE: &str = "user.access-token";

pub fn generate_access_token(
    config: &Config,
    user_id: UserId,
    username: &str,
    ttl: Duration,
) -> Result<String, Error> {
    let now = Utc::now();
    let claims = AccessTokenClaims {
        name: username.to_string(),
        sub: user_id.to_string(),
        iss: ISSUER.to_string(),
        aud: ACCESS_TOKEN_AUDIENCE.to_string(),
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
    };
    let header = Header {
        kid: Some(KEY_ID.to_string()),
        ..Header::new(Algorithm::HS256)
    };

    Ok(encode(
        &header,
        &claims,
        &EncodingKey::from_secret(signing_secret(config)?.as_bytes()),
    )?)
}

/// Check signature, key id, issuer, audience and expiry, and return the
/// user id the token was issued to.
pub fn validate_access_token(config: &Config, token: &str) -> Result<UserId, Error> {
    let header = decode_header(token)?;
    if header.kid.as_deref() != Some(KEY_ID) {
        debug!("Rejecting access token with unexpected kid {:?}", header.kid);
        return Err(Error::entity(EntityErrorKind::Unauthenticated));
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_audience(&[ACCESS_TOKEN_AUDIENCE]);

    let data = decode::<AccessTokenClaims>(
        token,
        &DecodingKey::from_secret(signing_secret(config)?.as_bytes()),
        &validation,
    )?;

    data.claims.sub.parse::<UserId>().map_err(|_| {
        debug!("Rejecting access token with non-numeric subject");
        Error::entity(EntityErrorKind::Unauthenticated)
    })
}

fn signing_secret(config: &Config) -> Result<&str, Error> {
    config.jwt_secret().ok_or_else(|| {
        error!("No JWT secret configured; refusing to sign or accept access tokens");
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    })
}

/// Validate the token and make sure its user still exists and is active.
pub async fn authenticate(
    store: &dyn NotificationStore,
    config: &Config,
    token: &str,
) -> Result<UserId, Error> {
    let user_id = validate_access_token(config, token)?;

    match store.find_user(user_id).await? {
        Some(user) if user.row_status == RowStatus::Normal => Ok(user_id),
        Some(_) => {
            info!("Rejecting access token of archived user {user_id}");
            Err(Error::entity(EntityErrorKind::Unauthenticated))
        }
        None => {
            info!("Rejecting access token of unknown user {user_id}");
            Err(Error::entity(EntityErrorKind::Unauthenticated))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, User};
    use service::config::{RustEnv, DEVELOPMENT_JWT_SECRET};

    fn config(secret: &str) -> Config {
        Config::from_defaults().set_jwt_secret(secret)
    }

    fn is_unauthenticated(err: &Error) -> bool {
        err.error_kind
            == DomainErrorKind::Internal(InternalErrorKind::Entity(
                EntityErrorKind::Unauthenticated,
            ))
    }

    #[test]
    fn issued_token_validates_to_its_user() {
        let config = config("secret");
        let token = generate_access_token(&config, 17, "ann", Duration::hours(1)).unwrap();

        assert_eq!(validate_access_token(&config, &token).unwrap(), 17);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token =
            generate_access_token(&config("other"), 17, "ann", Duration::hours(1)).unwrap();

        let err = validate_access_token(&config("secret"), &token).unwrap_err();
        assert!(is_unauthenticated(&err));
    }

    #[test]
    fn production_without_secret_rejects_development_signed_tokens() {
        let development = config(DEVELOPMENT_JWT_SECRET);
        let forged = generate_access_token(&development, 1, "ann", Duration::hours(1)).unwrap();
        let mut production = Config::from_defaults();
        production.runtime_env = RustEnv::Production;
        assert_eq!(production.jwt_secret(), None);

        let err = validate_access_token(&production, &forged).unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config)
        );
        assert!(generate_access_token(&production, 1, "ann", Duration::hours(1)).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = config("secret");
        let token = generate_access_token(&config, 17, "ann", Duration::hours(-2)).unwrap();

        assert!(validate_access_token(&config, &token).is_err());
    }

    #[test]
    fn token_without_expected_kid_is_rejected() {
        let config = config("secret");
        let claims = AccessTokenClaims {
            name: "ann".to_string(),
            sub: "17".to_string(),
            iss: ISSUER.to_string(),
            aud: ACCESS_TOKEN_AUDIENCE.to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iat: Utc::now().timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let err = validate_access_token(&config, &token).unwrap_err();
        assert!(is_unauthenticated(&err));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(validate_access_token(&config("secret"), "not-a-jwt").is_err());
    }

    #[tokio::test]
    async fn authenticate_requires_an_active_user() {
        let config = config("secret");
        let store = MemoryStore::new();
        store
            .upsert_user(User {
                id: 1,
                username: "ann".to_string(),
                nickname: String::new(),
                row_status: RowStatus::Normal,
            })
            .await;
        store
            .upsert_user(User {
                id: 2,
                username: "bo".to_string(),
                nickname: String::new(),
                row_status: RowStatus::Archived,
            })
            .await;

        let active = generate_access_token(&config, 1, "ann", Duration::hours(1)).unwrap();
        let archived = generate_access_token(&config, 2, "bo", Duration::hours(1)).unwrap();
        let unknown = generate_access_token(&config, 3, "cy", Duration::hours(1)).unwrap();

        assert_eq!(authenticate(&store, &config, &active).await.unwrap(), 1);
        assert!(is_unauthenticated(
            &authenticate(&store, &config, &archived).await.unwrap_err()
        ));
        assert!(is_unauthenticated(
            &authenticate(&store, &config, &unknown).await.unwrap_err()
        ));
    }
}
