//! Structured audit trail on the `devctl::audit` tracing target.

use std::time::Instant;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::error::DevctlError;

pub const AUDIT_TARGET: &str = "devctl::audit";

/// What an audited call reports once it has produced a response.
pub trait Audited {
    fn audit_success(&self) -> bool;

    /// Exit code of the subprocess behind the response, when there was one.
    fn audit_exit_code(&self) -> Option<i32> {
        None
    }

    /// Subject resolved while handling the call (a synthesized backup name),
    /// recorded in place of the requested one.
    fn audit_subject(&self) -> Option<&str> {
        None
    }
}

/// One audited call, opened before any work and closed exactly once.
pub struct AuditEvent<'a> {
    pub request_id: Uuid,
    user: &'a str,
    action: &'a str,
    subject: &'a str,
    started: Instant,
}

impl<'a> AuditEvent<'a> {
    pub fn begin(ctx: &'a AuthContext, action: &'a str, subject: &'a str) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user: &ctx.user_id,
            action,
            subject,
            started: Instant::now(),
        }
    }

    fn duration_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn completed(self, outcome: &impl Audited) {
        tracing::info!(
            target: AUDIT_TARGET,
            request_id = %self.request_id,
            user = %self.user,
            action = ?self.action,
            subject = ?outcome.audit_subject().unwrap_or(self.subject),
            success = outcome.audit_success(),
            exit_code = outcome.audit_exit_code(),
            duration_ms = self.duration_ms(),
            "action completed"
        );
    }

    pub fn rejected(self, err: &DevctlError) {
        tracing::warn!(
            target: AUDIT_TARGET,
            request_id = %self.request_id,
            user = %self.user,
            action = ?self.action,
            subject = ?self.subject,
            success = false,
            error = err.kind(),
            duration_ms = self.duration_ms(),
            "action rejected"
        );
    }
}

/// Run `f` inside an audit event and record how it ended.
pub fn audited<T, F>(ctx: &AuthContext, action: &str, subject: &str, f: F) -> crate::Result<T>
where
    T: Audited,
    F: FnOnce() -> crate::Result<T>,
{
    let event = AuditEvent::begin(ctx, action, subject);
    let outcome = f();
    match &outcome {
        Ok(response) => event.completed(response),
        Err(e) => event.rejected(e),
    }
    outcome
}
