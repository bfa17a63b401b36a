//! HTTP client for a lease server and the handle for a granted lease.

use crate::wire::*;
use anyhow::{Context, Result, bail};
use exp_backoff::BackoffBuilder;
use log::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

// Pause bounds between attempts of request_lease_until_granted, in ns.
const RETRY_PAUSE_MIN_NS: u64 = 10_000_000;
const RETRY_PAUSE_MAX_NS: u64 = 1_000_000_000;

/// Connection to a lease server, e.g. `http://localhost:8080/elysees-api/v1`.
#[derive(Debug, Clone)]
pub struct Elysees {
    url_prefix: String,
    http: reqwest::Client,
}

impl Elysees {
    pub fn for_lease_server(url_prefix: impl Into<String>) -> Result<Self> {
        let url_prefix = url_prefix.into().trim_end_matches('/').to_string();
        if url_prefix.is_empty() {
            bail!("url prefix must not be empty");
        }

        Ok(Self {
            url_prefix,
            http: reqwest::Client::new(),
        })
    }

    fn url(&self, call: &str) -> String {
        format!("{}/{}", self.url_prefix, call)
    }

    async fn post<B, R>(&self, call: &str, body: &B) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned + LeaseResponse,
    {
        let resp = self
            .http
            .post(self.url(call))
            .json(body)
            .send()
            .await
            .with_context(|| format!("{call}: request to {} failed", self.url_prefix))?;

        decode(call, resp).await
    }

    /// Asks once for `name`. `None` means someone else holds it.
    pub async fn request_lease(&self, name: &str, duration: Duration) -> Result<Option<Lease>> {
        let started = Instant::now();
        let req = LeaseCreationRequest {
            lease_name: name.to_string(),
            duration_in_millis: to_millis(duration),
        };

        let resp: LeaseCreationResponse = self.post("requestLease", &req).await?;
        if !resp.granted {
            debug!(
                "lease {name} declined, expires in {:?}",
                from_millis(resp.duration_till_expiry)
            );
            return Ok(None);
        }

        Ok(Some(Lease {
            client: self.clone(),
            name: name.to_string(),
            token: resp.token,
            started,
            granted_duration: from_millis(resp.granted_duration_in_millis),
            valid_for: from_millis(resp.duration_till_expiry),
        }))
    }

    /// Keeps asking for `name` until it is granted or `max_wait` has passed,
    /// backing off between attempts. At least one attempt is made. A
    /// `max_wait` too large to represent as an instant waits forever.
    pub async fn request_lease_until_granted(
        &self,
        name: &str,
        duration: Duration,
        max_wait: Duration,
    ) -> Result<Option<Lease>> {
        let deadline = Instant::now().checked_add(max_wait);
        let mut bo = BackoffBuilder::new()
            .initial_ns(RETRY_PAUSE_MIN_NS)
            .max_ns(RETRY_PAUSE_MAX_NS)
            .build();

        loop {
            if let Some(lease) = self.request_lease(name, duration).await? {
                return Ok(Some(lease));
            }

            let mut pause = Duration::from_nanos(bo.pause().max(RETRY_PAUSE_MIN_NS));
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    info!("gave up on lease {name} after {max_wait:?}");
                    return Ok(None);
                }
                pause = pause.min(deadline - now);
            }

            tokio::time::sleep(pause).await;
        }
    }

    /// Returns the granted duration, or `None` if the renewal was refused.
    pub async fn renew_lease(&self, name: &str, token: &str, duration: Duration) -> Result<Option<Duration>> {
        let req = LeaseRenewRequest {
            lease_name: name.to_string(),
            duration_in_millis: to_millis(duration),
            token: token.to_string(),
        };

        let resp: LeaseRenewResponse = self.post("renewLease", &req).await?;
        if !resp.granted {
            debug!(
                "renew of {name} refused: found={}, held_by_other={}",
                resp.lease_found, resp.held_by_other_lease
            );
            return Ok(None);
        }

        Ok(Some(from_millis(resp.granted_duration_in_millis)))
    }

    pub async fn release_lease(&self, name: &str, token: &str) -> Result<LeaseReleaseResponse> {
        let req = LeaseReleaseRequest {
            lease_name: name.to_string(),
            token: token.to_string(),
        };

        self.post("releaseLease", &req).await
    }

    /// Remaining time of `name`'s grant, `None` if nobody holds it.
    pub async fn duration_till_expiry(&self, name: &str) -> Result<Option<Duration>> {
        let resp = self
            .http
            .get(self.url("durationTillExpiry"))
            .query(&LeaseExpiryQuery {
                lease_name: name.to_string(),
            })
            .send()
            .await
            .with_context(|| format!("durationTillExpiry: request to {} failed", self.url_prefix))?;

        let resp: LeaseExpiryResponse = decode("durationTillExpiry", resp).await?;
        Ok(resp
            .lease_found
            .then(|| from_millis(resp.duration_till_expiry)))
    }

    /// The server's current time as it reports it.
    pub async fn is_alive(&self) -> Result<String> {
        let resp = self
            .http
            .get(self.url("isalive"))
            .send()
            .await
            .context("isalive: request failed")?
            .error_for_status()
            .context("isalive")?;

        resp.text().await.context("isalive: unreadable body")
    }
}

async fn decode<R>(call: &str, resp: reqwest::Response) -> Result<R>
where
    R: DeserializeOwned + LeaseResponse,
{
    let status = resp.status();
    let body: R = resp
        .json()
        .await
        .with_context(|| format!("{call}: undecodable response ({status})"))?;

    if !body.bad_request().is_empty() {
        bail!("{call} rejected for '{}': {}", body.lease_name(), body.bad_request());
    }

    if !status.is_success() {
        bail!("{call} failed with status {status}");
    }

    Ok(body)
}

fn to_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

fn from_millis(ms: i64) -> Duration {
    Duration::from_millis(u64::try_from(ms).unwrap_or(0))
}

/// A granted lease. Only exists for a grant; a refused request yields no
/// handle at all.
///
/// Expiry is tracked locally from the moment the request was sent, so the
/// handle errs towards thinking the lease ends early.
#[derive(Debug)]
pub struct Lease {
    client: Elysees,
    name: String,
    token: String,
    started: Instant,
    granted_duration: Duration,
    valid_for: Duration,
}

impl Lease {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn granted_duration(&self) -> Duration {
        self.granted_duration
    }

    pub fn duration_till_expiry(&self) -> Duration {
        self.valid_for.saturating_sub(self.started.elapsed())
    }

    pub fn is_expired(&self) -> bool {
        self.started.elapsed() > self.valid_for
    }

    pub fn expires_within(&self, d: Duration) -> bool {
        self.duration_till_expiry() < d
    }

    /// Renews only when less than `duration` is left; otherwise a no-op.
    /// Returns whether the lease is still held.
    pub async fn renew_if_near_expiry(&mut self, duration: Duration) -> Result<bool> {
        if duration.is_zero() {
            bail!("invalid renew duration {duration:?}");
        }

        if !self.expires_within(duration) {
            return Ok(true);
        }

        debug!("renewing lease {} for {duration:?}", self.name);
        let started = Instant::now();
        match self.client.renew_lease(&self.name, &self.token, duration).await? {
            Some(granted) => {
                self.started = started;
                self.granted_duration = granted;
                self.valid_for = granted;
                Ok(true)
            }
            None => {
                warn!("lost lease {}", self.name);
                Ok(false)
            }
        }
    }

    /// Gives the lease back. The server's answer is only logged.
    pub async fn release(self) -> Result<()> {
        let resp = self.client.release_lease(&self.name, &self.token).await?;
        if resp.release_successful {
            info!("released lease {}", self.name);
        } else {
            warn!(
                "release of {} had no effect: found={}, owner={}",
                self.name, resp.lease_found, resp.lease_owner
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lease(valid_for: Duration) -> Lease {
        Lease {
            client: Elysees::for_lease_server("http://127.0.0.1:1").unwrap(),
            name: "R".to_string(),
            token: "t".to_string(),
            started: Instant::now(),
            granted_duration: valid_for,
            valid_for,
        }
    }

    #[test]
    fn empty_prefix_is_rejected() {
        assert!(Elysees::for_lease_server("").is_err());
        assert!(Elysees::for_lease_server("/").is_err());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let c = Elysees::for_lease_server("http://h/elysees-api/v1/").unwrap();
        assert_eq!(c.url("renewLease"), "http://h/elysees-api/v1/renewLease");
    }

    #[test]
    fn millis_conversions_clamp() {
        assert_eq!(to_millis(Duration::from_secs(2)), 2_000);
        assert_eq!(to_millis(Duration::MAX), i64::MAX);
        assert_eq!(from_millis(-5), Duration::ZERO);
        assert_eq!(from_millis(1_500), Duration::from_millis(1_500));
    }

    #[test]
    fn local_expiry_tracking() {
        let l = lease(Duration::from_secs(60));
        assert!(!l.is_expired());
        assert!(!l.expires_within(Duration::from_secs(10)));
        assert!(l.expires_within(Duration::from_secs(61)));

        let gone = lease(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));
        assert!(gone.is_expired());
        assert_eq!(gone.duration_till_expiry(), Duration::ZERO);
    }

    #[tokio::test]
    async fn renew_far_from_expiry_does_not_call_the_server() {
        // Port 1 refuses connections, so any call would error.
        let mut l = lease(Duration::from_secs(60));
        assert!(l.renew_if_near_expiry(Duration::from_secs(5)).await.unwrap());
        assert!(l.renew_if_near_expiry(Duration::ZERO).await.is_err());
    }
}
