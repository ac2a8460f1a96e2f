//! OCHPdirect messages
//!
//! Provider → operator: SelectEvse, ControlEvse, ReleaseEvse, GetEvseStatus,
//! ReportDiscrepancy. Operator → provider: InformProvider.

use chrono::{DateTime, Utc};

use crate::codec::fields;
use crate::codec::{
    result_only_response, DecodeError, OchpMessage, OchpResponse, OchpResult, XmlElement, XmlValue,
};
use crate::domain::{
    BillingItem, ChargingLimits, ChargingPeriod, ContractId, Currency, DirectId, DirectOperation,
    EvseId, EvseStatus, MeterReading, SessionTelemetry, StateOfCharge,
};

impl XmlValue for MeterReading {
    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        Ok(Self {
            value: fields::required_decimal(element, "meterValue")?,
            time: fields::required_timestamp(element, "meterTime")?,
        })
    }

    fn encode(&self, name: &str) -> XmlElement {
        XmlElement::new(name)
            .with_child(fields::decimal_element("meterValue", &self.value))
            .with_child(fields::timestamp_element("meterTime", &self.time))
    }
}

impl XmlValue for ChargingPeriod {
    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        let start = fields::required_timestamp(element, "startDateTime")?;
        let end = fields::required_timestamp(element, "endDateTime")?;
        let mut period = ChargingPeriod::new(
            start,
            end,
            fields::required_token(element, "billingItem", BillingItem::from_wire)?,
            fields::required_decimal(element, "billingValue")?,
            fields::required_decimal(element, "itemPrice")?,
        )
        .map_err(|e| DecodeError::invalid_value("endDateTime", fields::format_timestamp(&end), e.to_string()))?;
        period.period_cost = fields::optional_decimal(element, "periodCost")?;
        period.tax_rate = fields::optional_decimal(element, "taxrate")?;
        Ok(period)
    }

    fn encode(&self, name: &str) -> XmlElement {
        let mut element = XmlElement::new(name)
            .with_child(fields::timestamp_element("startDateTime", &self.start()))
            .with_child(fields::timestamp_element("endDateTime", &self.end()))
            .with_child(XmlElement::text_node("billingItem", self.billing_item.as_wire()))
            .with_child(fields::decimal_element("billingValue", &self.billing_value))
            .with_child(fields::decimal_element("itemPrice", &self.item_price));
        element.push_opt(self.period_cost.as_ref().map(|v| fields::decimal_element("periodCost", v)));
        element.push_opt(self.tax_rate.as_ref().map(|v| fields::decimal_element("taxrate", v)));
        element
    }
}

// ── Flattened field groups ─────────────────────────────────────

fn decode_limits(element: &XmlElement) -> Result<ChargingLimits, DecodeError> {
    Ok(ChargingLimits {
        max_power: fields::optional_decimal(element, "maxPower")?,
        max_current: fields::optional_decimal(element, "maxCurrent")?,
        one_phase: fields::optional_bool(element, "onePhase")?,
        max_energy: fields::optional_decimal(element, "maxEnergy")?,
        min_energy: fields::optional_decimal(element, "minEnergy")?,
        departure: fields::optional_timestamp(element, "departure")?,
    })
}

fn push_limits(element: &mut XmlElement, limits: &ChargingLimits) {
    let decimal = |name: &str, value: &Option<_>| value.as_ref().map(|v| fields::decimal_element(name, v));
    element.push_opt(decimal("maxPower", &limits.max_power));
    element.push_opt(decimal("maxCurrent", &limits.max_current));
    element.push_opt(
        limits
            .one_phase
            .map(|flag| XmlElement::text_node("onePhase", flag.to_string())),
    );
    element.push_opt(decimal("maxEnergy", &limits.max_energy));
    element.push_opt(decimal("minEnergy", &limits.min_energy));
    element.push_opt(
        limits
            .departure
            .as_ref()
            .map(|ts| fields::timestamp_element("departure", ts)),
    );
}

fn decode_state_of_charge(element: &XmlElement) -> Result<Option<StateOfCharge>, DecodeError> {
    let Some(text) = fields::optional_text(element, "stateOfCharge") else {
        return Ok(None);
    };
    text.parse::<u8>()
        .ok()
        .and_then(|percent| StateOfCharge::new(percent).ok())
        .map(Some)
        .ok_or_else(|| DecodeError::invalid_value("stateOfCharge", text, "expected a percentage 0-100"))
}

fn decode_currency(element: &XmlElement) -> Result<Option<Currency>, DecodeError> {
    let Some(text) = fields::optional_text(element, "currency") else {
        return Ok(None);
    };
    Currency::parse(text)
        .map(Some)
        .map_err(|_| DecodeError::invalid_value("currency", text, "expected an ISO 4217 code"))
}

fn decode_telemetry(element: &XmlElement) -> Result<SessionTelemetry, DecodeError> {
    Ok(SessionTelemetry {
        state_of_charge: decode_state_of_charge(element)?,
        limits: decode_limits(element)?,
        current_power: fields::optional_decimal(element, "currentPower")?,
        charged_energy: fields::optional_decimal(element, "chargedEnergy")?,
        meter_reading: element.child("meterReading").map(MeterReading::decode).transpose()?,
        charging_periods: fields::repeated(element, "chargingPeriods")?,
        current_cost: fields::optional_decimal(element, "currentCost")?,
        currency: decode_currency(element)?,
    })
}

fn push_telemetry(element: &mut XmlElement, telemetry: &SessionTelemetry) {
    element.push_opt(
        telemetry
            .state_of_charge
            .map(|soc| XmlElement::text_node("stateOfCharge", soc.to_string())),
    );
    push_limits(element, &telemetry.limits);
    element.push_opt(
        telemetry
            .current_power
            .as_ref()
            .map(|v| fields::decimal_element("currentPower", v)),
    );
    element.push_opt(
        telemetry
            .charged_energy
            .as_ref()
            .map(|v| fields::decimal_element("chargedEnergy", v)),
    );
    element.push_opt(telemetry.meter_reading.as_ref().map(|m| m.encode("meterReading")));
    fields::push_repeated(element, "chargingPeriods", &telemetry.charging_periods);
    element.push_opt(
        telemetry
            .current_cost
            .as_ref()
            .map(|v| fields::decimal_element("currentCost", v)),
    );
    element.push_opt(
        telemetry
            .currency
            .as_ref()
            .map(|c| XmlElement::text_node("currency", c.as_str())),
    );
}

fn optional_ttl(element: &mut XmlElement, ttl: &Option<DateTime<Utc>>) {
    element.push_opt(ttl.as_ref().map(|ts| fields::timestamp_element("ttl", ts)));
}

// ── SelectEvse ─────────────────────────────────────────────────

/// Provider asks the operator to hold an EVSE, optionally for a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectEvseRequest {
    pub evse_id: EvseId,
    pub contract_id: Option<ContractId>,
    pub reserve_until: Option<DateTime<Utc>>,
}

impl OchpMessage for SelectEvseRequest {
    const NAME: &'static str = "SelectEvseRequest";

    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        fields::expect_name(element, Self::NAME)?;
        Ok(Self {
            evse_id: fields::required_id(element, "evseId")?,
            contract_id: fields::optional_id(element, "contractId")?,
            reserve_until: fields::optional_timestamp(element, "reserveUntil")?,
        })
    }

    fn encode(&self) -> XmlElement {
        let mut element =
            XmlElement::new(Self::NAME).with_child(fields::id_element("evseId", &self.evse_id));
        element.push_opt(
            self.contract_id
                .as_ref()
                .map(|id| fields::id_element("contractId", id)),
        );
        element.push_opt(
            self.reserve_until
                .as_ref()
                .map(|ts| fields::timestamp_element("reserveUntil", ts)),
        );
        element
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectEvseResponse {
    pub result: OchpResult,
    pub direct_id: Option<DirectId>,
    pub ttl: Option<DateTime<Utc>>,
}

impl OchpMessage for SelectEvseResponse {
    const NAME: &'static str = "SelectEvseResponse";

    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        fields::expect_name(element, Self::NAME)?;
        Ok(Self {
            result: OchpResult::decode(fields::required_child(element, "result")?)?,
            direct_id: fields::optional_text(element, "directId")
                .map(|text| fields::parse_id("directId", text))
                .transpose()?,
            ttl: fields::optional_timestamp(element, "ttl")?,
        })
    }

    fn encode(&self) -> XmlElement {
        let mut element = XmlElement::new(Self::NAME).with_child(self.result.encode("result"));
        element.push_opt(self.direct_id.as_ref().map(|id| fields::id_element("directId", id)));
        optional_ttl(&mut element, &self.ttl);
        element
    }
}

impl OchpResponse for SelectEvseResponse {
    fn from_result(result: OchpResult) -> Self {
        Self {
            result,
            direct_id: None,
            ttl: None,
        }
    }

    fn result(&self) -> &OchpResult {
        &self.result
    }
}

// ── ControlEvse ────────────────────────────────────────────────

/// Provider starts, changes or ends charging on a selected EVSE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlEvseRequest {
    pub direct_id: DirectId,
    pub operation: DirectOperation,
    pub limits: ChargingLimits,
}

impl OchpMessage for ControlEvseRequest {
    const NAME: &'static str = "ControlEvseRequest";

    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        fields::expect_name(element, Self::NAME)?;
        Ok(Self {
            direct_id: fields::required_id(element, "directId")?,
            operation: fields::required_token(element, "operation", DirectOperation::from_wire)?,
            limits: decode_limits(element)?,
        })
    }

    fn encode(&self) -> XmlElement {
        let mut element = XmlElement::new(Self::NAME)
            .with_child(fields::id_element("directId", &self.direct_id))
            .with_child(XmlElement::text_node("operation", self.operation.as_wire()));
        push_limits(&mut element, &self.limits);
        element
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlEvseResponse {
    pub result: OchpResult,
    pub ttl: Option<DateTime<Utc>>,
}

impl OchpMessage for ControlEvseResponse {
    const NAME: &'static str = "ControlEvseResponse";

    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        fields::expect_name(element, Self::NAME)?;
        Ok(Self {
            result: OchpResult::decode(fields::required_child(element, "result")?)?,
            ttl: fields::optional_timestamp(element, "ttl")?,
        })
    }

    fn encode(&self) -> XmlElement {
        let mut element = XmlElement::new(Self::NAME).with_child(self.result.encode("result"));
        optional_ttl(&mut element, &self.ttl);
        element
    }
}

impl OchpResponse for ControlEvseResponse {
    fn from_result(result: OchpResult) -> Self {
        Self { result, ttl: None }
    }

    fn result(&self) -> &OchpResult {
        &self.result
    }
}

// ── ReleaseEvse ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEvseRequest {
    pub direct_id: DirectId,
}

impl OchpMessage for ReleaseEvseRequest {
    const NAME: &'static str = "ReleaseEvseRequest";

    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        fields::expect_name(element, Self::NAME)?;
        Ok(Self {
            direct_id: fields::required_id(element, "directId")?,
        })
    }

    fn encode(&self) -> XmlElement {
        XmlElement::new(Self::NAME).with_child(fields::id_element("directId", &self.direct_id))
    }
}

result_only_response!(ReleaseEvseResponse);

// ── GetEvseStatus ──────────────────────────────────────────────

/// Live status query for one or more EVSEs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetEvseStatusRequest {
    pub evse_ids: Vec<EvseId>,
}

impl OchpMessage for GetEvseStatusRequest {
    const NAME: &'static str = "GetEvseStatusRequest";

    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        fields::expect_name(element, Self::NAME)?;
        let evse_ids = element
            .children_named("evseId")
            .map(|child| fields::parse_id("evseId", child.text()))
            .collect::<Result<Vec<EvseId>, _>>()?;
        if evse_ids.is_empty() {
            return Err(DecodeError::Cardinality {
                parent: element.name.clone(),
                name: "evseId",
                min: 1,
            });
        }
        Ok(Self { evse_ids })
    }

    fn encode(&self) -> XmlElement {
        let mut element = XmlElement::new(Self::NAME);
        for id in &self.evse_ids {
            element.push(fields::id_element("evseId", id));
        }
        element
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetEvseStatusResponse {
    pub result: OchpResult,
    pub evse: Vec<EvseStatus>,
}

impl OchpMessage for GetEvseStatusResponse {
    const NAME: &'static str = "GetEvseStatusResponse";

    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        fields::expect_name(element, Self::NAME)?;
        Ok(Self {
            result: OchpResult::decode(fields::required_child(element, "result")?)?,
            evse: fields::repeated(element, "evse")?,
        })
    }

    fn encode(&self) -> XmlElement {
        let mut element = XmlElement::new(Self::NAME).with_child(self.result.encode("result"));
        fields::push_repeated(&mut element, "evse", &self.evse);
        element
    }
}

impl OchpResponse for GetEvseStatusResponse {
    fn from_result(result: OchpResult) -> Self {
        Self {
            result,
            evse: Vec::new(),
        }
    }

    fn result(&self) -> &OchpResult {
        &self.result
    }
}

// ── ReportDiscrepancy ──────────────────────────────────────────

/// Free-text report about wrong EVSE data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDiscrepancyRequest {
    pub evse_id: EvseId,
    pub report: String,
}

impl OchpMessage for ReportDiscrepancyRequest {
    const NAME: &'static str = "ReportDiscrepancyRequest";

    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        fields::expect_name(element, Self::NAME)?;
        Ok(Self {
            evse_id: fields::required_id(element, "evseId")?,
            report: fields::required_free_text(element, "report")?.to_string(),
        })
    }

    fn encode(&self) -> XmlElement {
        XmlElement::new(Self::NAME)
            .with_child(fields::id_element("evseId", &self.evse_id))
            .with_child(XmlElement::text_node("report", self.report.as_str()))
    }
}

result_only_response!(ReportDiscrepancyResponse);

// ── InformProvider ─────────────────────────────────────────────

/// Operator telemetry for a running direct session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InformProviderRequest {
    pub message: DirectOperation,
    pub evse_id: EvseId,
    pub contract_id: ContractId,
    pub direct_id: DirectId,
    pub ttl: Option<DateTime<Utc>>,
    pub telemetry: SessionTelemetry,
}

impl OchpMessage for InformProviderRequest {
    const NAME: &'static str = "InformProviderRequest";

    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        fields::expect_name(element, Self::NAME)?;
        Ok(Self {
            message: fields::required_token(element, "message", DirectOperation::from_wire)?,
            evse_id: fields::required_id(element, "evseId")?,
            contract_id: fields::required_id(element, "contractId")?,
            direct_id: fields::required_id(element, "directId")?,
            ttl: fields::optional_timestamp(element, "ttl")?,
            telemetry: decode_telemetry(element)?,
        })
    }

    fn encode(&self) -> XmlElement {
        let mut element = XmlElement::new(Self::NAME)
            .with_child(XmlElement::text_node("message", self.message.as_wire()))
            .with_child(fields::id_element("evseId", &self.evse_id))
            .with_child(fields::id_element("contractId", &self.contract_id))
            .with_child(fields::id_element("directId", &self.direct_id));
        optional_ttl(&mut element, &self.ttl);
        push_telemetry(&mut element, &self.telemetry);
        element
    }
}

result_only_response!(InformProviderResponse);
