//! Opportunistic access-cookie renewal
//!
//! The layer puts an empty [`RenewalSlot`] into each request. If the session
//! extractor decides the access token is close to expiry it fills the slot,
//! and the layer appends the replacement `Set-Cookie` to whatever response
//! the handler produced.

use axum::{
    extract::{Request, State},
    http::{header::SET_COOKIE, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::{Arc, OnceLock};

use crate::auth::{IssuedToken, SessionManager};

#[derive(Clone, Default)]
pub struct RenewalSlot(Arc<OnceLock<IssuedToken>>);

impl RenewalSlot {
    /// First offer wins
    pub fn offer(&self, token: IssuedToken) {
        let _ = self.0.set(token);
    }

    pub fn get(&self) -> Option<&IssuedToken> {
        self.0.get()
    }
}

pub async fn renew_access_cookie(
    State(sessions): State<Arc<SessionManager>>,
    mut request: Request,
    next: Next,
) -> Response {
    let slot = RenewalSlot::default();
    request.extensions_mut().insert(slot.clone());

    let mut response = next.run(request).await;

    if let Some(token) = slot.get() {
        let cookie = sessions.cookies().token_cookie(token);
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "Renewed access cookie is not a valid header"),
        }
    }

    response
}
