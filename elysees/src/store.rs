use crate::clock::{Clock, SystemClock};
use crate::gate::GateRegistry;
use crate::outcome::{ExpiryOutcome, ReleaseOutcome, RenewOutcome, RequestOutcome};
use crate::record::LeaseRecord;
use log::*;
use std::sync::Arc;
use std::time::Instant;

/// The lease authority.
///
/// Every operation runs while holding the gate of the lease it names, reads
/// the clock once after the gate is taken, and returns an outcome. Nothing
/// here fails: contention and absence are reported through the outcome flags.
/// Durations are milliseconds and must be positive; the caller validates them.
pub struct LeaseStore {
    gates: GateRegistry,
    clock: Arc<dyn Clock>,
}

impl Default for LeaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaseStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            gates: GateRegistry::new(),
            clock,
        }
    }

    pub fn gates(&self) -> &GateRegistry {
        &self.gates
    }

    pub fn request(&self, name: &str, duration_ms: i64) -> RequestOutcome {
        debug_assert!(duration_ms > 0, "lease duration must be positive");
        let _timer = scopeguard::guard(Instant::now(), |start| {
            debug!("request({name}) took {:?}", start.elapsed());
        });

        let gate = self.gates.gate_for(name);
        let mut slot = gate.lock();
        let now = self.clock.now_ms();

        match slot.as_mut() {
            None => {
                let record = LeaseRecord::grant(name, now, duration_ms);
                let outcome = RequestOutcome::granted(&record.owner_token, duration_ms, false);
                *slot = Some(record);
                outcome
            }
            Some(record) if record.is_expired(now) => {
                info!("re-granting expired lease: {name}");
                record.regrant(now, duration_ms);
                RequestOutcome::granted(&record.owner_token, duration_ms, true)
            }
            Some(record) => {
                info!("declining lease: {name}");
                RequestOutcome::declined(record.remaining_ms(now))
            }
        }
    }

    /// Extends the grant to at least `duration_ms` from now. A grant that
    /// already runs longer is left alone and its remaining time reported.
    pub fn renew(&self, name: &str, token: &str, duration_ms: i64) -> RenewOutcome {
        debug_assert!(duration_ms > 0, "lease duration must be positive");
        let _timer = scopeguard::guard(Instant::now(), |start| {
            debug!("renew({name}) took {:?}", start.elapsed());
        });

        // Only a request creates records, so a name without a gate has none.
        let Some(gate) = self.gates.existing(name) else {
            return RenewOutcome::not_found();
        };

        let mut slot = gate.lock();
        let now = self.clock.now_ms();
        let Some(record) = slot.as_mut() else {
            return RenewOutcome::not_found();
        };

        // Checked before expiry so a foreign caller learns nothing more.
        if record.owner_token != token {
            return RenewOutcome::held_by_other();
        }

        let remaining = record.remaining_ms(now);
        if remaining > duration_ms {
            return RenewOutcome::granted(remaining);
        }

        record.extend(now, duration_ms);
        RenewOutcome::granted(duration_ms)
    }

    pub fn release(&self, name: &str, token: &str) -> ReleaseOutcome {
        let _timer = scopeguard::guard(Instant::now(), |start| {
            debug!("release({name}) took {:?}", start.elapsed());
        });

        let Some(gate) = self.gates.existing(name) else {
            return ReleaseOutcome::not_found();
        };

        let mut slot = gate.lock();
        if slot.is_none() {
            return ReleaseOutcome::not_found();
        }

        match slot.take_if(|record| record.owner_token == token) {
            Some(_) => {
                info!("released lease: {name}");
                ReleaseOutcome::released()
            }
            None => ReleaseOutcome::not_owner(),
        }
    }

    pub fn duration_till_expiry(&self, name: &str) -> ExpiryOutcome {
        self.duration_till_expiry_at(name, self.clock.now_ms())
    }

    /// Remaining time of `name`'s grant as seen at `now_ms`, floored at zero.
    pub fn duration_till_expiry_at(&self, name: &str, now_ms: i64) -> ExpiryOutcome {
        let Some(gate) = self.gates.existing(name) else {
            return ExpiryOutcome::not_found();
        };

        let slot = gate.lock();
        match slot.as_ref() {
            Some(record) => ExpiryOutcome::found(record.remaining_ms(now_ms)),
            None => ExpiryOutcome::not_found(),
        }
    }

    /// Forgets every lease.
    pub fn clear(&self) {
        for gate in self.gates.snapshot() {
            gate.lock().take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn store_at(start_ms: i64) -> (LeaseStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start_ms));
        (LeaseStore::with_clock(clock.clone()), clock)
    }

    #[test]
    fn unknown_names_are_not_found() {
        let (store, _) = store_at(0);
        assert_eq!(store.duration_till_expiry("nope"), ExpiryOutcome::default());
        assert_eq!(store.renew("nope", "t", 10), RenewOutcome::not_found());
        assert_eq!(store.release("nope", "t"), ReleaseOutcome::not_found());
        assert!(store.gates().is_empty());
    }

    #[test]
    fn fresh_request_is_granted() {
        let (store, _) = store_at(1_000);
        let out = store.request("R", 60_000);
        assert!(out.granted);
        assert!(!out.found);
        assert!(!out.token.is_empty());
        assert_eq!(out.granted_duration_ms, 60_000);
        assert_eq!(out.duration_till_expiry_ms, 60_000);

        let expiry = store.duration_till_expiry("R");
        assert!(expiry.found);
        assert_eq!(expiry.duration_till_expiry_ms, 60_000);
    }

    #[test]
    fn request_before_expiry_is_declined() {
        let (store, clock) = store_at(0);
        store.request("R", 60_000);
        clock.advance(15);

        let out = store.request("R", 60_000);
        assert!(!out.granted);
        assert!(out.found);
        assert_eq!(out.token, "");
        assert_eq!(out.granted_duration_ms, 0);
        assert_eq!(out.duration_till_expiry_ms, 59_985);
    }

    #[test]
    fn request_at_the_expiry_instant_is_still_declined() {
        let (store, clock) = store_at(0);
        store.request("R", 100);
        clock.set(100);
        let out = store.request("R", 100);
        assert!(!out.granted);
        assert_eq!(out.duration_till_expiry_ms, 0);
    }

    #[test]
    fn request_after_expiry_issues_a_new_token() {
        let (store, clock) = store_at(0);
        let first = store.request("R", 100);
        clock.set(101);

        let second = store.request("R", 5_000);
        assert!(second.granted);
        assert!(second.found);
        assert_ne!(second.token, first.token);
        assert_eq!(second.granted_duration_ms, 5_000);
        assert_eq!(second.duration_till_expiry_ms, 5_000);

        // The new grant runs from the re-grant time with the new duration.
        clock.advance(1_000);
        assert_eq!(store.duration_till_expiry("R").duration_till_expiry_ms, 4_000);

        // The old holder lost it.
        assert_eq!(store.renew("R", &first.token, 100), RenewOutcome::held_by_other());
    }

    #[test]
    fn renew_with_foreign_token_is_held_by_other_even_when_expired() {
        let (store, clock) = store_at(0);
        store.request("R", 100);
        assert_eq!(store.renew("R", "bogus", 100), RenewOutcome::held_by_other());

        clock.advance(10_000);
        let out = store.renew("R", "bogus", 100);
        assert!(out.found);
        assert!(out.held_by_other);
        assert!(!out.granted);
        assert_eq!(out.granted_duration_ms, 0);
    }

    #[test]
    fn renew_never_shortens_a_longer_grant() {
        let (store, clock) = store_at(0);
        let token = store.request("R", 60_000).token;
        clock.advance(5_000);

        let out = store.renew("R", &token, 10_000);
        assert_eq!(out, RenewOutcome::granted(55_000));
        assert_eq!(store.duration_till_expiry("R").duration_till_expiry_ms, 55_000);
    }

    #[test]
    fn renew_extends_to_the_requested_duration_from_now() {
        let (store, clock) = store_at(0);
        let token = store.request("R", 1_000).token;
        clock.advance(800);

        let out = store.renew("R", &token, 5_000);
        assert_eq!(out, RenewOutcome::granted(5_000));
        assert_eq!(store.duration_till_expiry("R").duration_till_expiry_ms, 5_000);
    }

    #[test]
    fn renew_with_equal_remaining_restarts_the_window() {
        let (store, clock) = store_at(0);
        let token = store.request("R", 1_000).token;
        clock.advance(500);

        assert_eq!(store.renew("R", &token, 500), RenewOutcome::granted(500));
        clock.advance(100);
        assert_eq!(store.duration_till_expiry("R").duration_till_expiry_ms, 400);
    }

    #[test]
    fn owner_may_revive_an_expired_grant() {
        let (store, clock) = store_at(0);
        let token = store.request("R", 100).token;
        clock.advance(1_000);

        assert_eq!(store.renew("R", &token, 300), RenewOutcome::granted(300));
        assert!(!store.request("R", 300).granted);
    }

    #[test]
    fn release_by_owner_removes_the_record() {
        let (store, _) = store_at(0);
        let token = store.request("R", 1_000).token;

        assert_eq!(store.release("R", &token), ReleaseOutcome::released());
        assert_eq!(store.duration_till_expiry("R"), ExpiryOutcome::not_found());
        assert_eq!(store.release("R", &token), ReleaseOutcome::not_found());

        let again = store.request("R", 1_000);
        assert!(again.granted);
        assert!(!again.found);
    }

    #[test]
    fn release_by_stranger_leaves_the_record() {
        let (store, _) = store_at(0);
        let token = store.request("R", 1_000).token;

        let out = store.release("R", "someone-else");
        assert!(out.found);
        assert!(!out.is_owner);
        assert!(!out.released);
        assert!(store.duration_till_expiry("R").found);
        assert!(store.renew("R", &token, 10).granted);
    }

    #[test]
    fn expiry_query_floors_at_zero() {
        let (store, clock) = store_at(0);
        store.request("R", 100);
        clock.advance(500);
        assert_eq!(store.duration_till_expiry("R"), ExpiryOutcome::found(0));
        assert_eq!(store.duration_till_expiry_at("R", 40), ExpiryOutcome::found(60));
    }

    #[test]
    fn clear_forgets_everything() {
        let (store, _) = store_at(0);
        store.request("a", 1_000);
        store.request("b", 1_000);
        store.clear();
        assert!(!store.duration_till_expiry("a").found);
        assert!(store.request("b", 1_000).granted);
    }

    #[test]
    fn compaction_is_invisible_to_callers() {
        let (store, _) = store_at(0);
        let token = store.request("gone", 1_000).token;
        store.release("gone", &token);
        store.request("kept", 1_000);

        assert_eq!(store.gates().compact(), 1);
        assert_eq!(store.duration_till_expiry("gone"), ExpiryOutcome::not_found());
        assert!(store.duration_till_expiry("kept").found);
        assert!(store.request("gone", 1_000).granted);
    }

    #[test]
    fn concrete_scenario() {
        let store = LeaseStore::new();

        let first = store.request("R", 60_000);
        assert!(first.granted);
        assert_eq!(first.duration_till_expiry_ms, 60_000);

        let second = store.request("R", 60_000);
        assert!(!second.granted);
        assert_eq!(second.token, "");
        assert!(second.duration_till_expiry_ms > 59_000);
        assert!(second.duration_till_expiry_ms <= 60_000);

        let renewed = store.renew("R", &first.token, 10_000);
        assert!(renewed.granted);
        assert!(!renewed.held_by_other);
        assert!(renewed.granted_duration_ms > 10_000);

        let released = store.release("R", &first.token);
        assert!(released.released);
        assert!(released.is_owner);
        assert!(!store.duration_till_expiry("R").found);
    }

    #[test]
    fn one_winner_among_concurrent_requests() {
        let store = Arc::new(LeaseStore::new());
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.request("contested", 60_000).granted)
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|granted| *granted)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn held_gate_does_not_block_other_names() {
        let store = Arc::new(LeaseStore::new());
        store.request("busy", 60_000);

        let gate = store.gates.gate_for("busy");
        let _held = gate.lock();

        let (tx, rx) = mpsc::channel();
        let other = Arc::clone(&store);
        thread::spawn(move || {
            let token = other.request("free", 1_000).token;
            other.renew("free", &token, 1_000);
            other.duration_till_expiry("free");
            tx.send(other.release("free", &token).released).unwrap();
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(true));
    }
}
