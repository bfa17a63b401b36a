use uuid::Uuid;

/// State of one tracked lease. Owned by the gate for `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseRecord {
    pub name: String,
    pub owner_token: String,
    pub grant_start_ms: i64,
    pub granted_duration_ms: i64,
}

impl LeaseRecord {
    /// A fresh grant with a newly minted owner token.
    pub(crate) fn grant(name: &str, now_ms: i64, duration_ms: i64) -> Self {
        Self {
            name: name.to_string(),
            owner_token: new_token(),
            grant_start_ms: now_ms,
            granted_duration_ms: duration_ms,
        }
    }

    /// Hands an expired record to a new holder.
    pub(crate) fn regrant(&mut self, now_ms: i64, duration_ms: i64) {
        self.owner_token = new_token();
        self.extend(now_ms, duration_ms);
    }

    /// Restarts the grant window for the current holder.
    pub(crate) fn extend(&mut self, now_ms: i64, duration_ms: i64) {
        self.grant_start_ms = now_ms;
        self.granted_duration_ms = duration_ms;
    }

    pub fn expires_at_ms(&self) -> i64 {
        self.grant_start_ms.saturating_add(self.granted_duration_ms)
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms() < now_ms
    }

    /// Time left in the grant; negative once expired.
    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        self.expires_at_ms().saturating_sub(now_ms)
    }
}

fn new_token() -> String {
    Uuid::new_v4().to_string()
}
