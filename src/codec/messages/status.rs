//! Status messages: UpdateStatus, GetStatus

use chrono::{DateTime, Utc};

use crate::codec::fields::{self, format_timestamp};
use crate::codec::{
    result_only_response, DecodeError, OchpMessage, OchpResponse, OchpResult, XmlElement, XmlValue,
};
use crate::domain::{
    EvseId, EvseMajorStatus, EvseMinorStatus, EvseStatus, ParkingId, ParkingStatus,
    ParkingStatusType,
};

/// `<evse major=".." minor=".." ttl=".."><evseId>…</evseId></evse>`
impl XmlValue for EvseStatus {
    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        let major_text = element.attr("major").ok_or_else(|| DecodeError::MissingAttribute {
            element: element.name.clone(),
            name: "major",
        })?;
        let major = fields::parse_token("major", major_text, EvseMajorStatus::from_wire)?;
        let minor = element
            .attr("minor")
            .map(|text| fields::parse_token("minor", text, EvseMinorStatus::from_wire))
            .transpose()?;
        let ttl = fields::optional_timestamp_attr(element, "ttl")?;
        let evse_id: EvseId = fields::required_id(element, "evseId")?;

        EvseStatus::new(evse_id, major, minor, ttl).map_err(|source| DecodeError::InvalidStatus {
            element: element.name.clone(),
            source,
        })
    }

    fn encode(&self, name: &str) -> XmlElement {
        let mut element = XmlElement::new(name).with_attr("major", self.major().as_wire());
        if let Some(minor) = self.minor() {
            element = element.with_attr("minor", minor.as_wire());
        }
        if let Some(ttl) = self.ttl() {
            element = element.with_attr("ttl", format_timestamp(&ttl));
        }
        element.with_child(fields::id_element("evseId", self.evse_id()))
    }
}

/// `<parking status=".." ttl=".."><parkingId>…</parkingId></parking>`
impl XmlValue for ParkingStatus {
    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        let status_text = element.attr("status").ok_or_else(|| DecodeError::MissingAttribute {
            element: element.name.clone(),
            name: "status",
        })?;
        let status = fields::parse_token("status", status_text, ParkingStatusType::from_wire)?;
        let ttl = fields::optional_timestamp_attr(element, "ttl")?;
        let parking_id: ParkingId = fields::required_id(element, "parkingId")?;
        Ok(ParkingStatus::new(parking_id, status, ttl))
    }

    fn encode(&self, name: &str) -> XmlElement {
        let mut element = XmlElement::new(name).with_attr("status", self.status().as_wire());
        if let Some(ttl) = self.ttl() {
            element = element.with_attr("ttl", format_timestamp(&ttl));
        }
        element.with_child(fields::id_element("parkingId", self.parking_id()))
    }
}

/// Batch status upload from an operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateStatusRequest {
    pub evse: Vec<EvseStatus>,
    pub parking: Vec<ParkingStatus>,
    /// Default expiry for entries without their own TTL.
    pub ttl: Option<DateTime<Utc>>,
}

impl OchpMessage for UpdateStatusRequest {
    const NAME: &'static str = "UpdateStatusRequest";

    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        fields::expect_name(element, Self::NAME)?;
        Ok(Self {
            evse: fields::repeated(element, "evse")?,
            parking: fields::repeated(element, "parking")?,
            ttl: fields::optional_timestamp(element, "ttl")?,
        })
    }

    fn encode(&self) -> XmlElement {
        let mut element = XmlElement::new(Self::NAME);
        fields::push_repeated(&mut element, "evse", &self.evse);
        fields::push_repeated(&mut element, "parking", &self.parking);
        element.push_opt(self.ttl.as_ref().map(|ttl| fields::timestamp_element("ttl", ttl)));
        element
    }
}

result_only_response!(UpdateStatusResponse);

/// Query of statuses, optionally only those received since a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetStatusRequest {
    pub start_date_time: Option<DateTime<Utc>>,
}

impl OchpMessage for GetStatusRequest {
    const NAME: &'static str = "GetStatusRequest";

    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        fields::expect_name(element, Self::NAME)?;
        Ok(Self {
            start_date_time: fields::optional_timestamp(element, "startDateTime")?,
        })
    }

    fn encode(&self) -> XmlElement {
        let mut element = XmlElement::new(Self::NAME);
        element.push_opt(
            self.start_date_time
                .as_ref()
                .map(|ts| fields::timestamp_element("startDateTime", ts)),
        );
        element
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetStatusResponse {
    pub result: OchpResult,
    pub evse: Vec<EvseStatus>,
    pub parking: Vec<ParkingStatus>,
}

impl OchpMessage for GetStatusResponse {
    const NAME: &'static str = "GetStatusResponse";

    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        fields::expect_name(element, Self::NAME)?;
        Ok(Self {
            result: OchpResult::decode(fields::required_child(element, "result")?)?,
            evse: fields::repeated(element, "evse")?,
            parking: fields::repeated(element, "parking")?,
        })
    }

    fn encode(&self) -> XmlElement {
        let mut element = XmlElement::new(Self::NAME).with_child(self.result.encode("result"));
        fields::push_repeated(&mut element, "evse", &self.evse);
        fields::push_repeated(&mut element, "parking", &self.parking);
        element
    }
}

impl OchpResponse for GetStatusResponse {
    fn from_result(result: OchpResult) -> Self {
        Self {
            result,
            evse: Vec::new(),
            parking: Vec::new(),
        }
    }

    fn result(&self) -> &OchpResult {
        &self.result
    }
}
