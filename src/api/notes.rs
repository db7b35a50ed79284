use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    response::{Html, IntoResponse, Response},
};
use ram_core::models::{CreateNoteInput, Note};

use super::render::{self, RenderError};
use super::response::JsonResponse;
use super::AppState;

/// Marker header sent by htmx; only its presence matters.
pub const HX_REQUEST: &str = "hx-request";

/// Application error code for a failed note listing.
const LIST_FAILED: i64 = 1;

/// `/notes`: `PUT` creates a note, `GET` lists notes. Any other method gets
/// an empty 200.
pub async fn notes_route(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    tracing::debug!("{} /notes", method);
    if method == Method::PUT {
        create_note(&state, &body)
    } else if method == Method::GET {
        list_notes(&state, &headers)
    } else {
        StatusCode::OK.into_response()
    }
}

fn create_note(state: &AppState, body: &[u8]) -> Response {
    let input: CreateNoteInput = match serde_json::from_slice(body) {
        Ok(input) => input,
        Err(e) => {
            tracing::error!("Invalid note data: {}", e);
            return JsonResponse::error(StatusCode::BAD_REQUEST, e, 400).into_response();
        }
    };
    tracing::debug!("Got note data: {:?}", input);

    let mut note = Note::from(input);
    if let Err(e) = state.db.persist_note(&note) {
        tracing::error!("Failed to store note {}: {}", note.id, e);
        return JsonResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e, 500).into_response();
    }
    note.mark_persisted();

    JsonResponse::ok(note).into_response()
}

fn list_notes(state: &AppState, headers: &HeaderMap) -> Response {
    let notes = state.db.recent_notes();

    if headers.contains_key(HX_REQUEST) {
        // fragment errors are rendered inline with a 200
        let html = notes
            .map_err(RenderError::from)
            .and_then(|notes| render::notes_fragment(&state.config.static_dir, &notes))
            .unwrap_or_else(|e| {
                tracing::error!("Failed to render notes: {}", e);
                render::error_snippet(&e)
            });
        return Html(html).into_response();
    }

    match notes {
        Ok(notes) => JsonResponse::ok(notes).into_response(),
        Err(e) => {
            tracing::error!("Failed to list notes: {}", e);
            JsonResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e, LIST_FAILED).into_response()
        }
    }
}
