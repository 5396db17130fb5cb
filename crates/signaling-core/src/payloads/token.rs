use serde::{Deserialize, Serialize};

/// Platform code the service expects from this client
pub const PLATFORM_CODE: &str = "16";

/// `/update-token` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTokenBody {
    /// Talent number; organization clients send their `uNo` here
    #[serde(rename = "tNo")]
    pub talent_no: String,
    pub device_id: String,
    pub voip_token: String,
    #[serde(rename = "APNs_token")]
    pub apns_token: String,
    pub platform: String,
}

impl UpdateTokenBody {
    /// Register one push token for both the voip and APNs slots
    pub fn new(talent_no: impl Into<String>, push_token: impl Into<String>, device_id: impl Into<String>) -> Self {
        let push_token = push_token.into();
        Self {
            talent_no: talent_no.into(),
            device_id: device_id.into(),
            voip_token: push_token.clone(),
            apns_token: push_token,
            platform: PLATFORM_CODE.to_string(),
        }
    }
}
