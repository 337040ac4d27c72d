use crate::extractors::RejectionType;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use domain::UserId;
use log::*;

/// The user the `require_auth` middleware resolved from the request's
/// access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AuthenticatedUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = RejectionType;

    // The middleware inserts this value into the request extensions once the
    // token is verified. A route mounted without the middleware never sees one.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthenticatedUser>() {
            Some(user) => Ok(*user),
            None => {
                warn!("AuthenticatedUser requested on a route without require_auth");
                Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn reads_user_from_extensions() {
        let mut request = Request::builder().uri("/").body(()).unwrap();
        request.extensions_mut().insert(AuthenticatedUser(7));
        let (mut parts, _) = request.into_parts();

        let user = AuthenticatedUser::from_request_parts(&mut parts, &()).await;

        assert_eq!(user, Ok(AuthenticatedUser(7)));
    }

    #[tokio::test]
    async fn rejects_when_middleware_did_not_run() {
        let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();

        let rejection = AuthenticatedUser::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();

        assert_eq!(rejection.0, StatusCode::UNAUTHORIZED);
    }
}
