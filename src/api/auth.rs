use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};

use super::response::JsonResponse;
use super::session::Session;

/// Where unauthenticated clients are sent.
pub const LOGIN_PAGE: &str = "/guest/login.html";

/// The single implicit user every login becomes.
pub const GUEST_USER: &str = "guest";

/// Lets the request through only if its session carries an identity.
///
/// Must run inside [`super::session::session_middleware`]. A request without
/// a session means the layers are wired in the wrong order and is answered
/// with a 500; a session without an identity is redirected to the login page.
pub async fn require_identity(req: Request, next: Next) -> Response {
    tracing::debug!("auth for route: {}", req.uri());

    let Some(session) = req.extensions().get::<Session>() else {
        // TODO: check the layer order once at startup instead of per request
        tracing::error!("no session on request to {}", req.uri());
        return JsonResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "no session", 500)
            .into_response();
    };

    if session.user().is_none() {
        return Redirect::temporary(LOGIN_PAGE).into_response();
    }

    next.run(req).await
}

/// `POST /guest/login`
pub async fn login(Extension(session): Extension<Session>) -> Redirect {
    session.set_user(GUEST_USER);
    tracing::info!("Session {} logged in as {}", session.id(), GUEST_USER);
    Redirect::to("/")
}

/// `POST /guest/logout`. The session middleware forgets the session once
/// its identity is gone.
pub async fn logout(Extension(session): Extension<Session>) -> Redirect {
    session.clear_user();
    tracing::info!("Session {} logged out", session.id());
    Redirect::to(LOGIN_PAGE)
}
