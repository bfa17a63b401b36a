//! Results of the four lease operations. Declines, foreign tokens and missing
//! leases are ordinary outcomes, distinguished by flags.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOutcome {
    pub granted: bool,
    /// A record already existed for the name (expired or not).
    pub found: bool,
    /// Empty unless granted.
    pub token: String,
    pub granted_duration_ms: i64,
    pub duration_till_expiry_ms: i64,
}

impl RequestOutcome {
    pub(crate) fn granted(token: &str, duration_ms: i64, found: bool) -> Self {
        Self {
            granted: true,
            found,
            token: token.to_string(),
            granted_duration_ms: duration_ms,
            duration_till_expiry_ms: duration_ms,
        }
    }

    pub(crate) fn declined(remaining_ms: i64) -> Self {
        Self {
            granted: false,
            found: true,
            token: String::new(),
            granted_duration_ms: 0,
            duration_till_expiry_ms: remaining_ms.max(0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenewOutcome {
    pub found: bool,
    pub granted: bool,
    pub held_by_other: bool,
    pub granted_duration_ms: i64,
}

impl RenewOutcome {
    pub(crate) fn not_found() -> Self {
        Self::default()
    }

    pub(crate) fn held_by_other() -> Self {
        Self {
            found: true,
            held_by_other: true,
            ..Self::default()
        }
    }

    pub(crate) fn granted(duration_ms: i64) -> Self {
        Self {
            found: true,
            granted: true,
            held_by_other: false,
            granted_duration_ms: duration_ms,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub found: bool,
    pub is_owner: bool,
    pub released: bool,
}

impl ReleaseOutcome {
    pub(crate) fn not_found() -> Self {
        Self::default()
    }

    pub(crate) fn not_owner() -> Self {
        Self {
            found: true,
            ..Self::default()
        }
    }

    pub(crate) fn released() -> Self {
        Self {
            found: true,
            is_owner: true,
            released: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpiryOutcome {
    pub found: bool,
    pub duration_till_expiry_ms: i64,
}

impl ExpiryOutcome {
    pub(crate) fn not_found() -> Self {
        Self::default()
    }

    pub(crate) fn found(remaining_ms: i64) -> Self {
        Self {
            found: true,
            duration_till_expiry_ms: remaining_ms.max(0),
        }
    }
}
