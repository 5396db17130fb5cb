//! Wire payloads for the signaling endpoints
//!
//! Field names here are the service's wire contract; Rust names are chosen
//! for readability and mapped with `#[serde(rename)]`. The shared security
//! key is not part of these types: the repository wraps every body in a
//! [`SecuredBody`] when sending.

pub mod call;
pub mod device_status;
pub mod settings;
pub mod token;

use serde::{Deserialize, Serialize};

pub use call::{CallPayload, CallToOrganization, CallToTalent, MumbleInfo};
pub use device_status::{
    CallAnswered, CallCancelled, CallHangup, CallRejected, DeviceStatusEvent,
    DisconnectedByOrganization, DisconnectedByTalent, Logout, MissedCallToOrganization,
    MissedCallToTalent,
};
pub use settings::{GetVoipSettingBody, SetVoipSettingBody, VoipScheduleItem, VoipSetting};
pub use token::UpdateTokenBody;

/// Which side of a call a numeric id belongs to.
///
/// Serialized as a single `tNo` or `uNo` field when flattened into a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Party {
    /// Talent (job seeker) number
    #[serde(rename = "tNo")]
    Talent(i64),
    /// Organization user number
    #[serde(rename = "uNo")]
    Organization(i64),
}

impl Party {
    /// The numeric id regardless of side
    pub fn id(&self) -> i64 {
        match self {
            Party::Talent(id) | Party::Organization(id) => *id,
        }
    }
}

/// Any request body plus the shared security key
#[derive(Debug, Serialize)]
pub struct SecuredBody<'a, T: Serialize> {
    pub security_key: &'a str,
    #[serde(flatten)]
    pub body: &'a T,
}

/// `{message}` / `{error}` response body used by the service for
/// acknowledgements and errors
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiMessage {
    #[serde(alias = "error")]
    pub message: String,
}
