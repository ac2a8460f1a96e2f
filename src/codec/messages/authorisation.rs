//! Roaming authorisation list messages

use crate::codec::fields;
use crate::codec::{DecodeError, OchpMessage, OchpResponse, OchpResult, XmlElement, XmlValue};
use crate::domain::{
    ContractId, DomainError, DomainResult, EmtId, RoamingAuthorisationInfo, TokenRepresentation,
    TokenSubType, TokenType,
};

const INFO_ELEMENT: &str = "roamingAuthorisationInfoArray";
const REFUSED_ELEMENT: &str = "refusedRoamingAuthorisationInfo";

/// `<EmtId representation="plain"><instance/><tokenType/><tokenSubType/></EmtId>`
impl XmlValue for EmtId {
    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        let representation = match element.attr("representation") {
            Some(text) => fields::parse_token("representation", text, TokenRepresentation::from_wire)?,
            None => TokenRepresentation::Plain,
        };
        let instance = fields::required_text(element, "instance")?;
        let token_type = fields::required_token(element, "tokenType", TokenType::from_wire)?;
        let token_sub_type = fields::optional_token(element, "tokenSubType", TokenSubType::from_wire)?;

        EmtId::new(instance, representation, token_type, token_sub_type).map_err(|source| {
            DecodeError::InvalidIdentifier {
                element: element.name.clone(),
                source,
            }
        })
    }

    fn encode(&self, name: &str) -> XmlElement {
        let mut element = XmlElement::new(name)
            .with_attr("representation", self.representation.as_wire())
            .with_child(XmlElement::text_node("instance", self.instance.as_str()))
            .with_child(XmlElement::text_node("tokenType", self.token_type.as_wire()));
        element.push_opt(
            self.token_sub_type
                .map(|sub| XmlElement::text_node("tokenSubType", sub.as_wire())),
        );
        element
    }
}

impl XmlValue for RoamingAuthorisationInfo {
    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        let emt_id = EmtId::decode(fields::required_child(element, "EmtId")?)?;
        let contract_id: ContractId = fields::required_id(element, "contractId")?;
        Ok(Self {
            emt_id,
            contract_id,
            printed_number: fields::optional_free_text(element, "printedNumber").map(str::to_string),
            expiry_date: fields::required_timestamp(element, "expiryDate")?,
        })
    }

    fn encode(&self, name: &str) -> XmlElement {
        let mut element = XmlElement::new(name)
            .with_child(self.emt_id.encode("EmtId"))
            .with_child(fields::id_element("contractId", &self.contract_id));
        element.push_opt(
            self.printed_number
                .as_ref()
                .map(|n| XmlElement::text_node("printedNumber", n.as_str())),
        );
        element.push(fields::timestamp_element("expiryDate", &self.expiry_date));
        element
    }
}

/// Declare a list upload carrying one or more authorisation entries.
macro_rules! authorisation_list_request {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            entries: Vec<RoamingAuthorisationInfo>,
        }

        impl $name {
            /// At least one entry is required.
            pub fn new(entries: Vec<RoamingAuthorisationInfo>) -> DomainResult<Self> {
                if entries.is_empty() {
                    return Err(DomainError::Argument {
                        name: "entries",
                        reason: "at least one roaming authorisation entry is required",
                    });
                }
                Ok(Self { entries })
            }

            pub fn entries(&self) -> &[RoamingAuthorisationInfo] {
                &self.entries
            }

            pub fn into_entries(self) -> Vec<RoamingAuthorisationInfo> {
                self.entries
            }
        }

        impl OchpMessage for $name {
            const NAME: &'static str = stringify!($name);

            fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
                fields::expect_name(element, Self::NAME)?;
                Ok(Self {
                    entries: fields::repeated_at_least_one(element, INFO_ELEMENT)?,
                })
            }

            fn encode(&self) -> XmlElement {
                let mut element = XmlElement::new(Self::NAME);
                fields::push_repeated(&mut element, INFO_ELEMENT, &self.entries);
                element
            }
        }
    };
}

/// Declare a list-upload response reporting refused entries.
macro_rules! authorisation_list_response {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub result: OchpResult,
            pub refused: Vec<RoamingAuthorisationInfo>,
        }

        impl OchpMessage for $name {
            const NAME: &'static str = stringify!($name);

            fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
                fields::expect_name(element, Self::NAME)?;
                Ok(Self {
                    result: OchpResult::decode(fields::required_child(element, "result")?)?,
                    refused: fields::repeated(element, REFUSED_ELEMENT)?,
                })
            }

            fn encode(&self) -> XmlElement {
                let mut element =
                    XmlElement::new(Self::NAME).with_child(self.result.encode("result"));
                fields::push_repeated(&mut element, REFUSED_ELEMENT, &self.refused);
                element
            }
        }

        impl OchpResponse for $name {
            fn from_result(result: OchpResult) -> Self {
                Self {
                    result,
                    refused: Vec::new(),
                }
            }

            fn result(&self) -> &OchpResult {
                &self.result
            }
        }
    };
}

authorisation_list_request!(
    /// Replace the whole roaming authorisation list.
    SetRoamingAuthorisationListRequest
);
authorisation_list_request!(
    /// Add or replace individual roaming authorisation entries.
    UpdateRoamingAuthorisationListRequest
);
authorisation_list_response!(SetRoamingAuthorisationListResponse);
authorisation_list_response!(UpdateRoamingAuthorisationListResponse);
