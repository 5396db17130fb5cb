//! Typed access to the signaling endpoints
//!
//! [`SignalingRepository`] has one method per endpoint. Each method wraps its
//! body with the configured security key, sends it once, and maps the answer
//! into a [`SignalingResult`]. Nothing is cached and nothing is retried.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::SignalingConfig;
use crate::error::SignalingResult;
use crate::payloads::{
    ApiMessage, CallAnswered, CallPayload, CallToOrganization, CallToTalent, DeviceStatusEvent,
    GetVoipSettingBody, Logout, MumbleInfo, Party, SecuredBody, SetVoipSettingBody,
    UpdateTokenBody, VoipSetting,
};
use crate::transport::{HttpTransport, SignalingTransport};

/// Endpoint paths, relative to the base URL
pub mod endpoints {
    pub const UPDATE_TOKEN: &str = "update-token";
    pub const SET_VOIP_SETTING: &str = "set-voip-setting";
    pub const GET_VOIP_SETTING: &str = "get-voip-setting";
    pub const CALL: &str = "call";
    pub const UPDATE_DEVICE_STATUS: &str = "update-device-status";
}

/// Result of dispatching a call offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDispatch {
    /// Coordinates sent to the callee; the caller joins the same channel
    pub mumble_info: MumbleInfo,
    /// Raw service response
    pub response: String,
}

/// Who is placing a call, and to whom
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub caller: i64,
    pub callee: i64,
    /// Caller's display name
    pub name: String,
    pub device_id: String,
    pub job_id: i64,
}

/// Signaling API client
#[derive(Debug, Clone)]
pub struct SignalingRepository<T = HttpTransport> {
    transport: T,
    config: SignalingConfig,
}

impl SignalingRepository<HttpTransport> {
    /// Repository over the default HTTP transport
    pub fn new(config: SignalingConfig) -> SignalingResult<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self { transport, config })
    }
}

impl<T: SignalingTransport> SignalingRepository<T> {
    /// Repository over a custom transport
    pub fn with_transport(transport: T, config: SignalingConfig) -> Self {
        Self { transport, config }
    }

    /// Configuration in use
    pub fn config(&self) -> &SignalingConfig {
        &self.config
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> SignalingResult<String> {
        let secured = SecuredBody {
            security_key: self.config.security_key(),
            body,
        };
        let value = serde_json::to_value(&secured)?;
        self.transport.post_json(path, value).await
    }

    /// Register the device's push token for a talent
    pub async fn update_push_token(
        &self,
        talent_no: &str,
        push_token: &str,
        device_id: &str,
    ) -> SignalingResult<ApiMessage> {
        debug!("Updating push token for talent {} on device {}", talent_no, device_id);
        let body = UpdateTokenBody::new(talent_no, push_token, device_id);
        let text = self.post(endpoints::UPDATE_TOKEN, &body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Store a talent's voip-block schedule
    pub async fn set_voip_setting(
        &self,
        talent_no: i64,
        voip_setting: VoipSetting,
    ) -> SignalingResult<String> {
        debug!("Setting voip schedule for talent {}", talent_no);
        let body = SetVoipSettingBody {
            talent_no,
            voip_setting,
        };
        self.post(endpoints::SET_VOIP_SETTING, &body).await
    }

    /// Fetch an organization user's voip-block schedule
    pub async fn get_voip_setting(&self, organization_no: i64) -> SignalingResult<String> {
        debug!("Fetching voip schedule for organization user {}", organization_no);
        self.post(endpoints::GET_VOIP_SETTING, &GetVoipSettingBody { organization_no })
            .await
    }

    /// Send a prepared call offer
    pub async fn make_call(&self, payload: &CallPayload) -> SignalingResult<String> {
        info!(
            "Dispatching call from {} on channel {}",
            payload.caller(),
            payload.mumble_info().channel_name
        );
        self.post(endpoints::CALL, payload).await
    }

    /// Talent calls an organization user
    pub async fn make_call_to_organization(&self, request: CallRequest) -> SignalingResult<CallDispatch> {
        let mumble_info = MumbleInfo::offer(self.config.call_defaults(), request.caller);
        let payload = CallPayload::from(CallToOrganization {
            caller_talent_no: request.caller,
            callee_organization_no: request.callee,
            name: request.name,
            device_id: request.device_id,
            job_id: request.job_id,
            mumble_info: mumble_info.clone(),
        });
        let response = self.make_call(&payload).await?;
        Ok(CallDispatch {
            mumble_info,
            response,
        })
    }

    /// Organization user calls a talent
    pub async fn make_call_to_talent(&self, request: CallRequest) -> SignalingResult<CallDispatch> {
        let mumble_info = MumbleInfo::offer(self.config.call_defaults(), request.caller);
        let payload = CallPayload::from(CallToTalent {
            caller_organization_no: request.caller,
            callee_talent_no: request.callee,
            name: request.name,
            device_id: request.device_id,
            job_id: request.job_id,
            mumble_info: mumble_info.clone(),
        });
        let response = self.make_call(&payload).await?;
        Ok(CallDispatch {
            mumble_info,
            response,
        })
    }

    /// Report a device status change
    pub async fn report_device_status(&self, event: impl Into<DeviceStatusEvent>) -> SignalingResult<String> {
        let event = event.into();
        debug!("Reporting device status '{}'", event.kind());
        self.post(endpoints::UPDATE_DEVICE_STATUS, &event).await
    }

    /// Report that this device logged out
    pub async fn logout(&self, device_id: &str, party: Option<Party>) -> SignalingResult<String> {
        self.report_device_status(Logout {
            device_id: device_id.to_string(),
            party,
        })
        .await
    }

    /// Report that this device answered a call
    pub async fn answer_call(
        &self,
        device_id: &str,
        log_id: Option<i64>,
        party: Option<Party>,
    ) -> SignalingResult<String> {
        self.report_device_status(CallAnswered {
            device_id: device_id.to_string(),
            log_id,
            party,
        })
        .await
    }
}
