use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{admin, auth, state::AppState};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(admin::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::dto::TokenResponse, state::test_support};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn test_app() -> Router {
        build_app(test_support::state().await)
    }

    fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn form_post_authed(uri: &str, body: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::COOKIE, cookie.to_string())
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_authed(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie.to_string())
            .body(Body::empty())
            .unwrap()
    }

    async fn body_string(res: axum::response::Response) -> String {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Registers an account and logs in, returning the session cookie pair.
    async fn register_and_login(app: &Router, email: &str) -> String {
        let res = app
            .clone()
            .oneshot(form_post("/register", &format!("email={email}&password=pw")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = app
            .clone()
            .oneshot(form_post("/login", &format!("email={email}&password=pw")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .expect("login sets the session cookie")
            .to_str()
            .unwrap();
        cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_twice_yields_created_then_conflict() {
        let app = test_app().await;

        let res = app
            .clone()
            .oneshot(form_post("/register", "email=a@x.com&password=pw1"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = app
            .clone()
            .oneshot(form_post("/register", "email=a@x.com&password=pw2"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn login_returns_bearer_token_and_cookie() {
        let app = test_app().await;
        app.clone()
            .oneshot(form_post("/register", "email=a@x.com&password=pw1"))
            .await
            .unwrap();

        let res = app
            .clone()
            .oneshot(form_post("/login", "email=a@x.com&password=pw1"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("access_token="));

        let body = body_string(res).await;
        let token: TokenResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(token.token_type, "bearer");
        assert!(!token.access_token.is_empty());
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let app = test_app().await;
        app.clone()
            .oneshot(form_post("/register", "email=a@x.com&password=pw1"))
            .await
            .unwrap();

        let res = app
            .clone()
            .oneshot(form_post("/login", "email=a@x.com&password=wrong"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        // Unknown email answers exactly the same way.
        let res = app
            .clone()
            .oneshot(form_post("/login", "email=b@x.com&password=pw1"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn browser_login_redirects_to_dashboard() {
        let app = test_app().await;
        app.clone()
            .oneshot(form_post("/register", "email=a@x.com&password=pw1"))
            .await
            .unwrap();

        let mut req = form_post("/login", "email=a@x.com&password=pw1");
        req.headers_mut()
            .insert(header::ACCEPT, "text/html".parse().unwrap());
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/dashboard");
        assert!(res.headers().contains_key(header::SET_COOKIE));
    }

    #[tokio::test]
    async fn dashboard_rejects_missing_and_bad_tokens() {
        let app = test_app().await;

        let res = app
            .clone()
            .oneshot(Request::builder().uri("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app
            .clone()
            .oneshot(get_authed("/dashboard", "access_token=garbage"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn dashboard_shows_counts_for_authenticated_user() {
        let app = test_app().await;
        let cookie = register_and_login(&app, "admin@x.com").await;

        let res = app.clone().oneshot(get_authed("/dashboard", &cookie)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_string(res).await;
        assert!(body.contains("Users: 1"));
        assert!(body.contains("Items: 0"));
    }

    #[tokio::test]
    async fn unknown_table_is_not_found() {
        let app = test_app().await;
        let cookie = register_and_login(&app, "admin@x.com").await;

        let res = app
            .clone()
            .oneshot(get_authed("/model/unknown_table", &cookie))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_crud_round_trip() {
        let app = test_app().await;
        let cookie = register_and_login(&app, "admin@x.com").await;

        // Create an item owned by the admin user (id 1, first row).
        let res = app
            .clone()
            .oneshot(form_post_authed(
                "/model/items/create",
                "name=ticket&user_id=1",
                &cookie,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/model/items");

        let res = app.clone().oneshot(get_authed("/model/items", &cookie)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains("ticket"));

        // Edit it.
        let res = app
            .clone()
            .oneshot(form_post_authed(
                "/model/items/edit/1",
                "id=1&name=pass&user_id=1",
                &cookie,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        let res = app.clone().oneshot(get_authed("/model/items", &cookie)).await.unwrap();
        let body = body_string(res).await;
        assert!(body.contains("pass"));
        assert!(!body.contains("ticket"));

        // Deleting the owning user cascades to the item.
        let res = app
            .clone()
            .oneshot(form_post_authed("/model/users/delete/1", "", &cookie))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        // The session subject is gone now, so the panel locks us out.
        let res = app.clone().oneshot(get_authed("/model/items", &cookie)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_with_bad_integer_is_bad_request() {
        let app = test_app().await;
        let cookie = register_and_login(&app, "admin@x.com").await;

        let res = app
            .clone()
            .oneshot(form_post_authed(
                "/model/items/create",
                "name=x&user_id=abc",
                &cookie,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn edit_form_for_missing_row_is_not_found() {
        let app = test_app().await;
        let cookie = register_and_login(&app, "admin@x.com").await;

        let res = app
            .clone()
            .oneshot(get_authed("/model/items/edit/42", &cookie))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn logout_clears_the_session_cookie() {
        let app = test_app().await;
        let cookie = register_and_login(&app, "admin@x.com").await;

        let res = app
            .clone()
            .oneshot(form_post_authed("/logout", "", &cookie))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let removal = res
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(removal.starts_with("access_token="));
        assert!(removal.contains("Max-Age=0"));

        // The token itself is still valid until expiry; only the cookie is gone.
        let res = app.clone().oneshot(get_authed("/dashboard", &cookie)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_and_login_pages_render() {
        let app = test_app().await;
        for uri in ["/register", "/login"] {
            let res = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            assert!(body_string(res).await.contains("<form"));
        }
    }
}
