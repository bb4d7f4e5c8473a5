//! Audit trail and ledger history writes
//!
//! Both are secondary writes: the primary operation (a PIN check, a login, a
//! balance change) has already happened when they run. Whether a failed
//! secondary write is swallowed or surfaced is decided by [`WritePolicy`].

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Extensions, HeaderMap},
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::models::{NewAuditLog, NewHistoryEntry};
use crate::store::{Store, StoreError};

/// What to do when a secondary write fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Log and continue; the primary outcome is returned unchanged
    #[default]
    BestEffort,
    /// Surface the failure to the caller
    Strict,
}

impl WritePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "best_effort" | "best-effort" | "besteffort" => Some(WritePolicy::BestEffort),
            "strict" => Some(WritePolicy::Strict),
            _ => None,
        }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, WritePolicy::Strict)
    }
}

/// Caller context stamped on every audit row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub ip: String,
    pub user_agent: String,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            ip: "unknown".to_string(),
            user_agent: "unknown".to_string(),
        }
    }
}

impl RequestContext {
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Client IP from proxy headers, then the socket peer, else "unknown"
    pub fn from_request_parts(headers: &HeaderMap, extensions: &Extensions) -> Self {
        let ip = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|h| h.to_str().ok())
                    .map(|s| s.to_string())
            })
            .or_else(|| {
                extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Self { ip, user_agent }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(|| RequestContext::from_request_parts(&parts.headers, &parts.extensions)))
    }
}

/// Writes audit rows and history rows under a [`WritePolicy`]
#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn Store>,
    policy: WritePolicy,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn Store>, policy: WritePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    /// Record one audit event
    pub async fn record(
        &self,
        actor: &str,
        action: &str,
        details: impl Into<String>,
        ctx: &RequestContext,
    ) -> Result<(), StoreError> {
        let entry = NewAuditLog {
            actor: actor.to_string(),
            action: action.to_string(),
            details: details.into(),
            ip: ctx.ip.clone(),
            user_agent: ctx.user_agent.clone(),
        };

        match self.store.insert_audit_log(entry).await {
            Ok(()) => Ok(()),
            Err(e) => self.secondary_failure("audit", action, e),
        }
    }

    /// Append one ledger history row
    pub async fn history(&self, entry: NewHistoryEntry) -> Result<(), StoreError> {
        let action = entry.action.as_str();
        match self.store.insert_history(entry.clone()).await {
            Ok(()) => Ok(()),
            Err(e) => self.secondary_failure("history", action, e),
        }
    }

    fn secondary_failure(&self, sink: &str, action: &str, e: StoreError) -> Result<(), StoreError> {
        match self.policy {
            WritePolicy::BestEffort => {
                tracing::warn!(sink = %sink, action = %action, error = %e, "Secondary write failed, continuing");
                Ok(())
            }
            WritePolicy::Strict => {
                tracing::error!(sink = %sink, action = %action, error = %e, "Secondary write failed");
                Err(e)
            }
        }
    }
}
