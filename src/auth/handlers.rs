use axum::{
    extract::{FromRef, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::{cookie::Cookie, CookieJar};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginForm, PublicUser, RegisterForm, TokenResponse},
        extractors::ACCESS_TOKEN_COOKIE,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::{is_unique_violation, User},
    },
    error::ApiError,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Form(mut payload): Form<RegisterForm>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Fast-path check; the unique index on users.email is the real guard
    // against a concurrent duplicate slipping past it.
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::conflict("A user with this email already exists"));
    }

    let hash = hash_password(&payload.password)?;
    let user = match User::create(&state.db, &payload.email, &hash).await {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, "duplicate registration lost the race");
            return Err(ApiError::conflict("A user with this email already exists"));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(PublicUser {
            id: user.id,
            email: user.email,
        }),
    ))
}

/// One login handler for both entry points: browser form posts are redirected
/// to the dashboard, API clients get the token body. Both receive the same
/// `access_token` cookie.
#[instrument(skip(state, jar, headers, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Form(mut payload): Form<LoginForm>,
) -> Result<Response, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password answer identically.
    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::unauthorized("Incorrect email or password")
        })?;

    if !verify_password(&payload.password, &user.hashed_password)? {
        warn!(email = %payload.email, user_id = user.id, "login invalid password");
        return Err(ApiError::unauthorized("Incorrect email or password"));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.issue(&user.email, keys.access_ttl)?;
    let jar = jar.add(
        Cookie::build((ACCESS_TOKEN_COOKIE, token.clone()))
            .path("/")
            .http_only(true)
            .build(),
    );

    info!(user_id = user.id, email = %user.email, "user logged in");
    if wants_html(&headers) {
        Ok((jar, Redirect::to("/dashboard")).into_response())
    } else {
        Ok((
            jar,
            Json(TokenResponse {
                access_token: token,
                token_type: "bearer".into(),
            }),
        )
            .into_response())
    }
}

/// Drops the session cookie. The token itself stays valid until expiry.
#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/").build());
    (jar, StatusCode::OK)
}

pub async fn register_page() -> Html<String> {
    Html(render_credentials_page(
        "Register",
        "/register",
        "Create account",
    ))
}

pub async fn login_page() -> Html<String> {
    Html(render_credentials_page("Log in", "/login", "Log in"))
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/html"))
        .unwrap_or(false)
}

fn render_credentials_page(title: &str, action: &str, submit: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{title} - Booking</title></head>
<body>
  <h1>{title}</h1>
  <form method="post" action="{action}">
    <label>Email <input type="email" name="email" required></label><br>
    <label>Password <input type="password" name="password" required></label><br>
    <button type="submit">{submit}</button>
  </form>
</body>
</html>"#
    )
}
