//! Result vocabulary shared by every response

use serde::Serialize;

use super::error::DecodeError;
use super::fields;
use super::xml::XmlElement;
use super::XmlValue;
use crate::support::wire::wire_enum;

wire_enum! {
    /// Outcome class of a request.
    pub enum ResultCode {
        Ok => "ok",
        /// Batch partially applied.
        Partly => "partly",
        NotAuthorized => "not-authorized",
        InvalidId => "invalid-id",
        Server => "server-error",
        Format => "format-error",
        /// Any code this implementation does not know.
        Unknown => "unknown",
    }
}

impl ResultCode {
    /// Decode a result token; unrecognised tokens become `Unknown`.
    pub fn decode(text: &str) -> Self {
        Self::from_wire(text).unwrap_or(Self::Unknown)
    }
}

/// Result code plus optional human-readable description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OchpResult {
    pub code: ResultCode,
    pub description: Option<String>,
}

impl OchpResult {
    pub fn new(code: ResultCode, description: Option<String>) -> Self {
        Self { code, description }
    }

    pub fn ok() -> Self {
        Self::new(ResultCode::Ok, None)
    }

    pub fn partly(description: impl Into<String>) -> Self {
        Self::new(ResultCode::Partly, Some(description.into()))
    }

    pub fn not_authorized(description: impl Into<String>) -> Self {
        Self::new(ResultCode::NotAuthorized, Some(description.into()))
    }

    pub fn invalid_id(description: impl Into<String>) -> Self {
        Self::new(ResultCode::InvalidId, Some(description.into()))
    }

    pub fn server(description: impl Into<String>) -> Self {
        Self::new(ResultCode::Server, Some(description.into()))
    }

    pub fn format(description: impl Into<String>) -> Self {
        Self::new(ResultCode::Format, Some(description.into()))
    }

    /// Outcome of a batch where `accepted` of `total` entries were applied.
    ///
    /// An empty batch is `Ok`; a batch with nothing applied is `Format`.
    pub fn batch(accepted: usize, total: usize) -> Self {
        if accepted == total {
            Self::ok()
        } else if accepted == 0 {
            Self::format(format!("all {} entries refused", total))
        } else {
            Self::partly(format!("{} of {} entries refused", total - accepted, total))
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == ResultCode::Ok
    }
}

impl From<&DecodeError> for OchpResult {
    fn from(err: &DecodeError) -> Self {
        Self::new(err.result_code(), Some(err.to_string()))
    }
}

/// `<result><resultCode><resultCode>ok</resultCode></resultCode>
/// <resultDescription>…</resultDescription></result>`
impl XmlValue for OchpResult {
    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        let outer = fields::required_child(element, "resultCode")?;
        let code = match outer.child("resultCode") {
            Some(inner) => ResultCode::decode(inner.text()),
            None => ResultCode::decode(outer.text()),
        };
        let description = fields::optional_free_text(element, "resultDescription").map(str::to_string);
        Ok(Self { code, description })
    }

    fn encode(&self, name: &str) -> XmlElement {
        let mut element = XmlElement::new(name).with_child(
            XmlElement::new("resultCode")
                .with_child(XmlElement::text_node("resultCode", self.code.as_wire())),
        );
        element.push_opt(
            self.description
                .as_ref()
                .map(|d| XmlElement::text_node("resultDescription", d.as_str())),
        );
        element
    }
}
