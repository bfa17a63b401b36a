//! Request checks run before the store sees a request. Each returns the
//! joined problem description, or `None` when the request is acceptable.

use elysees::wire::{LeaseCreationRequest, LeaseReleaseRequest, LeaseRenewRequest};

#[derive(Default)]
struct Problems(Vec<String>);

impl Problems {
    fn check(&mut self, ok: bool, problem: impl FnOnce() -> String) {
        if !ok {
            self.0.push(problem());
        }
    }

    fn name(&mut self, name: &str) {
        self.check(!name.is_empty(), || "leaseName must not be empty!".to_string());
    }

    fn duration(&mut self, ms: i64, max_ms: i64) {
        self.check(ms > 0, || "durationInMillis must be greater than zero!".to_string());
        self.check(ms <= max_ms, || {
            format!("durationInMillis must not exceed {max_ms} ms!")
        });
    }

    fn token(&mut self, token: &str) {
        self.check(!token.is_empty(), || "token must not be empty!".to_string());
    }

    fn into_message(self) -> Option<String> {
        (!self.0.is_empty()).then(|| self.0.join(" "))
    }
}

pub fn creation(req: &LeaseCreationRequest, max_duration_ms: i64) -> Option<String> {
    let mut p = Problems::default();
    p.name(&req.lease_name);
    p.duration(req.duration_in_millis, max_duration_ms);
    p.into_message()
}

pub fn renew(req: &LeaseRenewRequest, max_extension_ms: i64) -> Option<String> {
    let mut p = Problems::default();
    p.name(&req.lease_name);
    p.duration(req.duration_in_millis, max_extension_ms);
    p.token(&req.token);
    p.into_message()
}

pub fn release(req: &LeaseReleaseRequest) -> Option<String> {
    let mut p = Problems::default();
    p.name(&req.lease_name);
    p.token(&req.token);
    p.into_message()
}

pub fn expiry(lease_name: &str) -> Option<String> {
    let mut p = Problems::default();
    p.name(lease_name);
    p.into_message()
}
