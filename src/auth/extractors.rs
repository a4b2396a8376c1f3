use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use tracing::warn;

use crate::{auth::jwt::JwtKeys, auth::repo::User, error::ApiError, state::AppState};

/// Name of the session cookie set at login and cleared at logout. Both the API
/// flow and the browser form flow use this one cookie.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Resolves the requesting user from the session cookie.
///
/// Missing cookie, failed token validation and a subject with no matching user
/// row all reject with 401; the endpoint never sees a half-authenticated state.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(ACCESS_TOKEN_COOKIE)
            .ok_or_else(|| ApiError::unauthenticated("Not authenticated"))?;

        let keys = JwtKeys::from_ref(state);
        let subject = keys.validate(token.value()).map_err(|e| {
            warn!(error = %e, "session token rejected");
            ApiError::unauthenticated("Could not validate credentials")
        })?;

        let user = User::find_by_email(&state.db, &subject)
            .await?
            .ok_or_else(|| {
                warn!(subject = %subject, "token subject no longer exists");
                ApiError::unauthenticated("Could not validate credentials")
            })?;

        Ok(CurrentUser(user))
    }
}
