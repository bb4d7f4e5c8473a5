//! Session extractors
//!
//! [`Authorized`] reads the `atm_token` cookie, runs the session check for
//! the route's role policy and, when the token was close to expiry, hands the
//! replacement token to the [`RenewalSlot`] so the response carries it.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use super::renewal::RenewalSlot;
use crate::auth::{SessionManager, ACCESS_COOKIE};
use crate::error::ApiError;
use crate::models::Role;

/// Roles admitted by a route
pub trait RolePolicy: Send + Sync + 'static {
    /// Empty means any authenticated role
    const ROLES: &'static [Role];
}

#[derive(Debug, Clone, Copy)]
pub struct AnyRole;

impl RolePolicy for AnyRole {
    const ROLES: &'static [Role] = &[];
}

#[derive(Debug, Clone, Copy)]
pub struct AdminOnly;

impl RolePolicy for AdminOnly {
    const ROLES: &'static [Role] = &[Role::Admin];
}

/// Bank staff: admins and tellers
#[derive(Debug, Clone, Copy)]
pub struct Staff;

impl RolePolicy for Staff {
    const ROLES: &'static [Role] = &[Role::Admin, Role::Teller];
}

/// Anyone allowed to move money: staff and customers
#[derive(Debug, Clone, Copy)]
pub struct Banking;

impl RolePolicy for Banking {
    const ROLES: &'static [Role] = &[Role::Admin, Role::Teller, Role::Customer];
}

/// Authenticated caller whose stored role satisfies `P`
#[derive(Debug, Clone)]
pub struct Authorized<P: RolePolicy = AnyRole> {
    pub subject: String,
    pub user_id: Uuid,
    pub role: Role,
    _policy: PhantomData<fn() -> P>,
}

pub type AuthenticatedUser = Authorized<AnyRole>;
pub type AdminUser = Authorized<AdminOnly>;
pub type StaffUser = Authorized<Staff>;
pub type BankingUser = Authorized<Banking>;

#[async_trait]
impl<S, P> FromRequestParts<S> for Authorized<P>
where
    Arc<SessionManager>: FromRef<S>,
    S: Send + Sync,
    P: RolePolicy,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(ACCESS_COOKIE).map(|c| c.value().to_string());

        let sessions = Arc::<SessionManager>::from_ref(state);
        let session = sessions.authorize(token.as_deref(), P::ROLES).await?;

        if let Some(renewed) = session.renewed_access {
            match parts.extensions.get::<RenewalSlot>() {
                Some(slot) => slot.offer(renewed),
                None => tracing::warn!("Access token due for renewal but no renewal layer is installed"),
            }
        }

        Ok(Authorized {
            subject: session.subject,
            user_id: session.user_id,
            role: session.role,
            _policy: PhantomData,
        })
    }
}
