//! Cookie sessions.
//!
//! [`session_middleware`] resumes the session named by the `ram_session`
//! cookie, or starts a new one, and inserts it into the request extensions
//! as a [`Session`]. Handlers further down read it from there.
//!
//! Only sessions carrying an identity are kept in the [`SessionStore`]: an
//! anonymous session lives for one request, a session whose identity is
//! cleared is dropped, and stored sessions idle for longer than the store's
//! timeout are evicted.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "ram_session";

/// How long a logged-in session survives without a request.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Default)]
struct SessionData {
    user: Option<String>,
}

/// Handle to one client's session. Clones share the same data.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    data: Arc<RwLock<SessionData>>,
}

impl Session {
    /// A fresh anonymous session, not yet known to any store.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            data: Arc::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The logged-in identity, if any.
    pub fn user(&self) -> Option<String> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .clone()
    }

    pub fn set_user(&self, user: impl Into<String>) {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .user = Some(user.into());
    }

    pub fn clear_user(&self) {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .user = None;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct StoredSession {
    session: Session,
    last_seen: Instant,
}

/// In-memory registry of logged-in sessions, shared by all requests.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, StoredSession>>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_idle_timeout(SESSION_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            idle_timeout,
        }
    }

    /// Looks up a live session and marks it as used. Expired sessions are
    /// removed instead.
    pub fn load(&self, id: Uuid) -> Option<Session> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let stored = sessions.get_mut(&id)?;
        if stored.last_seen.elapsed() >= self.idle_timeout {
            sessions.remove(&id);
            tracing::debug!("Session {} expired", id);
            return None;
        }
        stored.last_seen = Instant::now();
        Some(stored.session.clone())
    }

    /// Registers `session`, evicting every session idle past the timeout
    /// first.
    pub fn save(&self, session: &Session) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, stored| stored.last_seen.elapsed() < self.idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!("Evicted {} idle sessions", evicted);
        }
        sessions.insert(
            session.id,
            StoredSession {
                session: session.clone(),
                last_seen: Instant::now(),
            },
        );
    }

    pub fn remove(&self, id: Uuid) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

fn session_cookie(session: &Session) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, session.id
    ))
    .ok()
}

/// Attaches a [`Session`] to every request before handing it on, then
/// stores or drops it depending on whether it ends up with an identity.
pub async fn session_middleware(
    State(store): State<SessionStore>,
    mut req: Request,
    next: Next,
) -> Response {
    let resumed = session_id_from_headers(req.headers()).and_then(|id| store.load(id));
    let (session, is_new) = match resumed {
        Some(session) => (session, false),
        None => {
            let session = Session::new();
            tracing::debug!("Started session {}", session.id());
            (session, true)
        }
    };

    let cookie = is_new.then(|| session_cookie(&session)).flatten();
    req.extensions_mut().insert(session.clone());

    let mut response = next.run(req).await;

    if session.user().is_some() {
        if is_new {
            store.save(&session);
        }
    } else if !is_new && store.remove(session.id()) {
        tracing::debug!("Dropped session {}", session.id());
    }

    if let Some(cookie) = cookie {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}
