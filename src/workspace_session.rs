use std::time::{SystemTime, UNIX_EPOCH};

const SESSION_PREFIX: &str = "session";

/// Identifies the scratch directories created by this process:
/// `session-<pid>-<started_ms>`.
#[derive(Clone, Debug)]
pub struct WorkspaceSessionId {
    id: String,
}

impl WorkspaceSessionId {
    pub fn new() -> Self {
        let pid = std::process::id();
        Self {
            id: format!("{SESSION_PREFIX}-{pid}-{}", now_unix_ms()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl Default for WorkspaceSessionId {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}

pub(crate) fn parse_session_start_ms(session_id: &str) -> Option<u128> {
    let mut parts = session_id.split('-');
    if parts.next()? != SESSION_PREFIX {
        return None;
    }
    let _pid = parts.next()?;
    let started_ms = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    started_ms.parse::<u128>().ok()
}

pub(crate) fn is_stale_session(session_id: &str, now_ms: u128, retention_ms: u128) -> bool {
    let Some(started_ms) = parse_session_start_ms(session_id) else {
        return false;
    };
    now_ms.saturating_sub(started_ms) > retention_ms
}
