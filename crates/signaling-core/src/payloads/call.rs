//! Call offer payloads sent to `/call`

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::CallOfferDefaults;

/// Voice-session coordinates handed to the callee.
///
/// Every field defaults so a push payload with missing keys still parses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MumbleInfo {
    /// Voice node the callee should connect to
    pub target_node: String,
    /// Channel both parties meet in
    pub channel_name: String,
    /// Offer creation time, Unix milliseconds
    pub timestamp: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub caller_name: String,
    #[serde(rename = "oLogo")]
    pub avatar_url: String,
}

impl MumbleInfo {
    /// Fresh offer for `caller`: random channel name, current timestamp
    pub fn offer(defaults: &CallOfferDefaults, caller: i64) -> Self {
        Self {
            target_node: defaults.target_node.clone(),
            channel_name: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            caller_name: String::new(),
            avatar_url: defaults.avatar_url(caller),
        }
    }

    /// Parse the `mumble_info` object of a push payload
    pub fn from_json(value: &serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value.clone())
    }
}

/// Talent calling an organization user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallToOrganization {
    #[serde(rename = "caller_tNo")]
    pub caller_talent_no: i64,
    #[serde(rename = "callee_uNo")]
    pub callee_organization_no: i64,
    pub name: String,
    pub device_id: String,
    pub job_id: i64,
    pub mumble_info: MumbleInfo,
}

/// Organization user calling a talent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallToTalent {
    #[serde(rename = "caller_uNo")]
    pub caller_organization_no: i64,
    #[serde(rename = "callee_tNo")]
    pub callee_talent_no: i64,
    pub name: String,
    pub device_id: String,
    pub job_id: i64,
    pub mumble_info: MumbleInfo,
}

/// A call offer in either direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallPayload {
    ToOrganization(CallToOrganization),
    ToTalent(CallToTalent),
}

impl CallPayload {
    /// The embedded voice-session coordinates
    pub fn mumble_info(&self) -> &MumbleInfo {
        match self {
            CallPayload::ToOrganization(call) => &call.mumble_info,
            CallPayload::ToTalent(call) => &call.mumble_info,
        }
    }

    /// Caller's numeric id
    pub fn caller(&self) -> i64 {
        match self {
            CallPayload::ToOrganization(call) => call.caller_talent_no,
            CallPayload::ToTalent(call) => call.caller_organization_no,
        }
    }
}

impl From<CallToOrganization> for CallPayload {
    fn from(call: CallToOrganization) -> Self {
        CallPayload::ToOrganization(call)
    }
}

impl From<CallToTalent> for CallPayload {
    fn from(call: CallToTalent) -> Self {
        CallPayload::ToTalent(call)
    }
}
