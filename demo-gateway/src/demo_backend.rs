//! Tiny protected application for trying the gateway locally

use axum::{
    Router,
    extract::Request,
    http::HeaderMap,
    response::Html,
    routing::get,
};

pub(crate) fn demo_backend_router() -> Router {
    Router::new()
        .route("/login", get(login))
        .fallback(whoami)
}

async fn whoami(request: Request) -> Html<String> {
    let user = user_from(request.headers()).unwrap_or("(none)");
    Html(format!(
        "<h1>Protected</h1><p>{} {}</p><p>Signed in as <b>{}</b></p>",
        request.method(),
        request.uri(),
        escape(user)
    ))
}

// Reached directly on the backend port; the gateway itself redirects here
async fn login() -> Html<&'static str> {
    Html("<h1>Login</h1><p>Set an <code>auth-token</code> cookie and try again.</p>")
}

fn user_from(headers: &HeaderMap) -> Option<&str> {
    headers.get("x-user-id").and_then(|v| v.to_str().ok())
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
