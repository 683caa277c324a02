//! Wire envelope and its JSON codec.
//!
//! Every request and response is a single JSON object:
//!
//! ```text
//! {
//!   "data":            { "content", "signature", "dataDescription" },
//!   "globalInfo":      { "tin", "deviceNo", "interfaceCode", "requestTime", ... },
//!   "returnStateInfo": { "returnCode", "returnMessage" }      // responses only
//! }
//! ```
//!
//! Unset optional fields are omitted on encode. Decoding tolerates missing
//! optional fields but requires `globalInfo` and `data` to be objects.

use serde::{Deserialize, Deserializer, Serialize};

use crate::data::DataBlock;
use crate::error::{ProtocolError, Result};
use crate::interface::InterfaceCode;

/// Application identifier sent with every request.
pub const APP_ID: &str = "AP04";

/// Interface version sent with every request.
pub const INTERFACE_VERSION: &str = "1.1.20191201";

/// Return code the server uses for success.
pub const SUCCESS_CODE: &str = "00";

/// Format of `globalInfo.requestTime`.
pub const REQUEST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The request/response transport unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// The payload-carrying block.
    pub data: DataBlock,
    /// Routing metadata.
    pub global_info: GlobalInfo,
    /// Result of the call. Present on responses only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_state_info: Option<ReturnStateInfo>,
}

impl Envelope {
    /// Creates a request envelope (no return-state block).
    pub fn request(global_info: GlobalInfo, data: DataBlock) -> Self {
        Self {
            data,
            global_info,
            return_state_info: None,
        }
    }

    /// Creates a response envelope.
    pub fn response(global_info: GlobalInfo, data: DataBlock, state: ReturnStateInfo) -> Self {
        Self {
            data,
            global_info,
            return_state_info: Some(state),
        }
    }

    /// Serializes the envelope to JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Parses an envelope from JSON bytes.
    ///
    /// Any failure, including a missing `globalInfo` or `data` block, is
    /// reported as [`ProtocolError::MalformedEnvelope`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))
    }

    /// Returns the interface code this envelope is routed to.
    pub fn interface(&self) -> InterfaceCode {
        InterfaceCode::from(self.global_info.interface_code.as_str())
    }
}

/// Caller-supplied routing parameters, turned into a fresh [`GlobalInfo`]
/// for each request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Routing {
    /// Taxpayer identification number.
    pub tin: String,
    /// Registered device number.
    pub device_no: String,
    /// Business registration number, often empty.
    pub brn: String,
    /// Time zone label reported with the request time.
    pub time_zone: Option<String>,
}

impl Routing {
    /// Creates routing parameters for a taxpayer and device.
    pub fn new(tin: impl Into<String>, device_no: impl Into<String>) -> Self {
        Self {
            tin: tin.into(),
            device_no: device_no.into(),
            ..Default::default()
        }
    }

    /// Sets the reported time zone.
    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    /// Builds the global info block for one request.
    pub fn global_info(&self, interface: &InterfaceCode) -> GlobalInfo {
        GlobalInfo {
            app_id: APP_ID.to_string(),
            version: INTERFACE_VERSION.to_string(),
            data_exchange_id: uuid::Uuid::new_v4().simple().to_string(),
            interface_code: interface.as_str().to_string(),
            request_code: "TP".to_string(),
            request_time: chrono::Local::now().format(REQUEST_TIME_FORMAT).to_string(),
            response_code: "TA".to_string(),
            user_name: "admin".to_string(),
            device_mac: "FFFFFFFFFFFF".to_string(),
            device_no: self.device_no.clone(),
            tin: self.tin.clone(),
            brn: self.brn.clone(),
            taxpayer_id: "1".to_string(),
            longitude: "0".to_string(),
            latitude: "0".to_string(),
            time_zone: self.time_zone.clone(),
            extend_field: Some(ExtendField::default()),
        }
    }
}

/// Routing and session metadata of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalInfo {
    #[serde(deserialize_with = "nullable_string")]
    pub app_id: String,
    #[serde(deserialize_with = "nullable_string")]
    pub version: String,
    /// Unique identifier of this exchange.
    #[serde(deserialize_with = "nullable_string")]
    pub data_exchange_id: String,
    /// Selects the server-side operation.
    #[serde(deserialize_with = "nullable_string")]
    pub interface_code: String,
    #[serde(deserialize_with = "nullable_string")]
    pub request_code: String,
    /// Local time of the request, `yyyy-MM-dd HH:mm:ss`.
    #[serde(deserialize_with = "nullable_string")]
    pub request_time: String,
    #[serde(deserialize_with = "nullable_string")]
    pub response_code: String,
    #[serde(deserialize_with = "nullable_string")]
    pub user_name: String,
    #[serde(rename = "deviceMAC", deserialize_with = "nullable_string")]
    pub device_mac: String,
    #[serde(deserialize_with = "nullable_string")]
    pub device_no: String,
    #[serde(deserialize_with = "nullable_string")]
    pub tin: String,
    #[serde(deserialize_with = "nullable_string")]
    pub brn: String,
    #[serde(rename = "taxpayerID", deserialize_with = "nullable_string")]
    pub taxpayer_id: String,
    #[serde(deserialize_with = "nullable_string")]
    pub longitude: String,
    #[serde(deserialize_with = "nullable_string")]
    pub latitude: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extend_field: Option<ExtendField>,
}

/// Formats the server should use for dates in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtendField {
    pub response_date_format: String,
    pub response_time_format: String,
}

impl Default for ExtendField {
    fn default() -> Self {
        Self {
            response_date_format: "dd/MM/yyyy".to_string(),
            response_time_format: "dd/MM/yyyy HH:mm:ss".to_string(),
        }
    }
}

/// Business-level result of a call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReturnStateInfo {
    #[serde(deserialize_with = "nullable_string")]
    pub return_code: String,
    #[serde(deserialize_with = "nullable_string")]
    pub return_message: String,
}

impl ReturnStateInfo {
    /// Creates a return state.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            return_code: code.into(),
            return_message: message.into(),
        }
    }

    /// The success state the server reports.
    pub fn success() -> Self {
        Self::new(SUCCESS_CODE, "SUCCESS")
    }

    /// Whether the server reported success.
    pub fn is_success(&self) -> bool {
        self.return_code == SUCCESS_CODE
    }
}

/// Deserializes a string that the server may send as `null`.
pub(crate) fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
