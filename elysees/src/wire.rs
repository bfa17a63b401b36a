//! JSON payloads of the HTTP transport, shared by server and client.
//!
//! Every field defaults, so a body missing a field still decodes and is then
//! rejected by validation instead of by the decoder.

use crate::outcome::{ExpiryOutcome, ReleaseOutcome, RenewOutcome, RequestOutcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaseCreationRequest {
    pub lease_name: String,
    pub duration_in_millis: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaseRenewRequest {
    pub lease_name: String,
    pub duration_in_millis: i64,
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaseReleaseRequest {
    pub lease_name: String,
    pub token: String,
}

/// Query string of the expiry lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaseExpiryQuery {
    pub lease_name: String,
}

/// Common view over the response bodies.
pub trait LeaseResponse {
    fn lease_name(&self) -> &str;

    /// Validation message; empty when the request was accepted.
    fn bad_request(&self) -> &str;
}

macro_rules! lease_response {
    ($t:ty) => {
        impl LeaseResponse for $t {
            fn lease_name(&self) -> &str {
                &self.lease_name
            }

            fn bad_request(&self) -> &str {
                &self.bad_request
            }
        }

        impl $t {
            pub fn rejected(lease_name: &str, message: String) -> Self {
                Self {
                    lease_name: lease_name.to_string(),
                    bad_request: message,
                    ..Self::default()
                }
            }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaseCreationResponse {
    pub lease_name: String,
    pub bad_request: String,
    pub lease_found: bool,
    pub granted: bool,
    pub token: String,
    pub granted_duration_in_millis: i64,
    pub duration_till_expiry: i64,
}

impl LeaseCreationResponse {
    pub fn from_outcome(lease_name: String, out: RequestOutcome) -> Self {
        Self {
            lease_name,
            bad_request: String::new(),
            lease_found: out.found,
            granted: out.granted,
            token: out.token,
            granted_duration_in_millis: out.granted_duration_ms,
            duration_till_expiry: out.duration_till_expiry_ms,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaseRenewResponse {
    pub lease_name: String,
    pub bad_request: String,
    pub lease_found: bool,
    pub granted: bool,
    pub held_by_other_lease: bool,
    pub granted_duration_in_millis: i64,
}

impl LeaseRenewResponse {
    pub fn from_outcome(lease_name: String, out: RenewOutcome) -> Self {
        Self {
            lease_name,
            bad_request: String::new(),
            lease_found: out.found,
            granted: out.granted,
            held_by_other_lease: out.held_by_other,
            granted_duration_in_millis: out.granted_duration_ms,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaseReleaseResponse {
    pub lease_name: String,
    pub bad_request: String,
    pub lease_found: bool,
    pub release_successful: bool,
    pub lease_owner: bool,
}

impl LeaseReleaseResponse {
    pub fn from_outcome(lease_name: String, out: ReleaseOutcome) -> Self {
        Self {
            lease_name,
            bad_request: String::new(),
            lease_found: out.found,
            release_successful: out.released,
            lease_owner: out.is_owner,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaseExpiryResponse {
    pub lease_name: String,
    pub bad_request: String,
    pub lease_found: bool,
    pub duration_till_expiry: i64,
}

impl LeaseExpiryResponse {
    pub fn from_outcome(lease_name: String, out: ExpiryOutcome) -> Self {
        Self {
            lease_name,
            bad_request: String::new(),
            lease_found: out.found,
            duration_till_expiry: out.duration_till_expiry_ms,
        }
    }
}

lease_response!(LeaseCreationResponse);
lease_response!(LeaseRenewResponse);
lease_response!(LeaseReleaseResponse);
lease_response!(LeaseExpiryResponse);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_names_are_camel_case() {
        let resp = LeaseRenewResponse::from_outcome(
            "R".to_string(),
            RenewOutcome {
                found: true,
                granted: false,
                held_by_other: true,
                granted_duration_ms: 0,
            },
        );

        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({
                "leaseName": "R",
                "badRequest": "",
                "leaseFound": true,
                "granted": false,
                "heldByOtherLease": true,
                "grantedDurationInMillis": 0,
            })
        );
    }

    #[test]
    fn missing_fields_decode_to_defaults() {
        let req: LeaseRenewRequest = serde_json::from_value(json!({ "leaseName": "R" })).unwrap();
        assert_eq!(req.lease_name, "R");
        assert_eq!(req.duration_in_millis, 0);
        assert_eq!(req.token, "");
    }

    #[test]
    fn rejected_carries_only_name_and_message() {
        let resp = LeaseReleaseResponse::rejected("R", "token must not be empty!".to_string());
        assert_eq!(resp.lease_name(), "R");
        assert_eq!(resp.bad_request(), "token must not be empty!");
        assert!(!resp.lease_found);
        assert!(!resp.release_successful);
    }
}
