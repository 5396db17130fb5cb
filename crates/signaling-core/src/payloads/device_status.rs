//! Device status reports sent to `/update-device-status`
//!
//! Each report is a flat JSON object with a `type` literal. Two pairs of
//! variants share a literal (`call_missed`, `call_disconnected`) and differ
//! only in which party fields they carry, so [`DeviceStatusEvent`] writes
//! the `type` field itself instead of relying on serde's enum tagging.

use serde::{Serialize, Serializer};

use super::Party;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Logout {
    pub device_id: String,
    #[serde(flatten)]
    pub party: Option<Party>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallAnswered {
    pub device_id: String,
    pub log_id: Option<i64>,
    #[serde(flatten)]
    pub party: Option<Party>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRejected {
    #[serde(flatten)]
    pub party: Option<Party>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallHangup {
    #[serde(flatten)]
    pub party: Option<Party>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallCancelled {
    pub log_id: Option<i64>,
    #[serde(flatten)]
    pub party: Option<Party>,
}

/// Missed call reported by the calling talent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissedCallToOrganization {
    #[serde(rename = "tNo")]
    pub talent_no: Option<i64>,
    #[serde(rename = "callee_uNo")]
    pub callee_organization_no: Option<i64>,
    pub log_id: Option<i64>,
}

/// Missed call reported by the calling organization user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissedCallToTalent {
    #[serde(rename = "uNo")]
    pub organization_no: Option<i64>,
    #[serde(rename = "callee_tNo")]
    pub callee_talent_no: Option<i64>,
    pub log_id: Option<i64>,
}

/// Disconnect reported by the organization side
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisconnectedByOrganization {
    #[serde(rename = "uNo")]
    pub organization_no: Option<i64>,
    pub device_id: String,
    pub log_id: Option<i64>,
}

/// Disconnect reported by the talent side
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisconnectedByTalent {
    #[serde(rename = "tNo")]
    pub talent_no: Option<i64>,
    pub device_id: String,
    pub log_id: Option<i64>,
}

/// One device status report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceStatusEvent {
    Logout(Logout),
    CallAnswered(CallAnswered),
    CallRejected(CallRejected),
    CallHangup(CallHangup),
    CallCancelled(CallCancelled),
    MissedCallToOrganization(MissedCallToOrganization),
    MissedCallToTalent(MissedCallToTalent),
    DisconnectedByOrganization(DisconnectedByOrganization),
    DisconnectedByTalent(DisconnectedByTalent),
}

impl DeviceStatusEvent {
    /// Wire `type` literal
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceStatusEvent::Logout(_) => "logout",
            DeviceStatusEvent::CallAnswered(_) => "call_answered",
            DeviceStatusEvent::CallRejected(_) => "call_rejected",
            DeviceStatusEvent::CallHangup(_) => "call_hangup",
            DeviceStatusEvent::CallCancelled(_) => "call_cancelled",
            DeviceStatusEvent::MissedCallToOrganization(_)
            | DeviceStatusEvent::MissedCallToTalent(_) => "call_missed",
            DeviceStatusEvent::DisconnectedByOrganization(_)
            | DeviceStatusEvent::DisconnectedByTalent(_) => "call_disconnected",
        }
    }
}

#[derive(Serialize)]
struct Tagged<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    body: &'a T,
}

impl Serialize for DeviceStatusEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = self.kind();
        match self {
            DeviceStatusEvent::Logout(body) => Tagged { kind, body }.serialize(serializer),
            DeviceStatusEvent::CallAnswered(body) => Tagged { kind, body }.serialize(serializer),
            DeviceStatusEvent::CallRejected(body) => Tagged { kind, body }.serialize(serializer),
            DeviceStatusEvent::CallHangup(body) => Tagged { kind, body }.serialize(serializer),
            DeviceStatusEvent::CallCancelled(body) => Tagged { kind, body }.serialize(serializer),
            DeviceStatusEvent::MissedCallToOrganization(body) => {
                Tagged { kind, body }.serialize(serializer)
            }
            DeviceStatusEvent::MissedCallToTalent(body) => Tagged { kind, body }.serialize(serializer),
            DeviceStatusEvent::DisconnectedByOrganization(body) => {
                Tagged { kind, body }.serialize(serializer)
            }
            DeviceStatusEvent::DisconnectedByTalent(body) => {
                Tagged { kind, body }.serialize(serializer)
            }
        }
    }
}

macro_rules! impl_from_body {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for DeviceStatusEvent {
                fn from(body: $variant) -> Self {
                    DeviceStatusEvent::$variant(body)
                }
            }
        )*
    };
}

impl_from_body!(
    Logout,
    CallAnswered,
    CallRejected,
    CallHangup,
    CallCancelled,
    MissedCallToOrganization,
    MissedCallToTalent,
    DisconnectedByOrganization,
    DisconnectedByTalent,
);
