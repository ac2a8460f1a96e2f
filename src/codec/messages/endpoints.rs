//! Service endpoint exchange: AddServiceEndpoints, GetServiceEndpoints

use crate::codec::fields;
use crate::codec::{
    result_only_response, DecodeError, OchpMessage, OchpResponse, OchpResult, XmlElement, XmlValue,
};
use crate::domain::{EndpointRegistration, EndpointRole};

const PROVIDER_ARRAY: &str = "providerEndpointArray";
const OPERATOR_ARRAY: &str = "operatorEndpointArray";

fn array_name(role: EndpointRole) -> &'static str {
    match role {
        EndpointRole::Provider => PROVIDER_ARRAY,
        EndpointRole::Operator => OPERATOR_ARRAY,
    }
}

/// The role is not on the wire; it follows from the enclosing array.
impl XmlValue for EndpointRegistration {
    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        let role = match element.name.as_str() {
            PROVIDER_ARRAY => EndpointRole::Provider,
            OPERATOR_ARRAY => EndpointRole::Operator,
            other => {
                return Err(DecodeError::UnexpectedElement {
                    expected: PROVIDER_ARRAY,
                    found: other.to_string(),
                })
            }
        };

        let patterns = |name: &str| -> Vec<String> {
            element
                .children_named(name)
                .map(XmlElement::text)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        };

        Ok(Self {
            role,
            url: fields::required_text(element, "url")?.to_string(),
            namespace_url: fields::required_text(element, "namespaceUrl")?.to_string(),
            access_token: fields::required_text(element, "accessToken")?.to_string(),
            valid_date: fields::required_timestamp(element, "validDate")?,
            whitelist: patterns("whitelist"),
            blacklist: patterns("blacklist"),
        })
    }

    fn encode(&self, name: &str) -> XmlElement {
        let mut element = XmlElement::new(name)
            .with_child(XmlElement::text_node("url", self.url.as_str()))
            .with_child(XmlElement::text_node("namespaceUrl", self.namespace_url.as_str()))
            .with_child(XmlElement::text_node("accessToken", self.access_token.as_str()))
            .with_child(fields::timestamp_element("validDate", &self.valid_date));
        for pattern in &self.whitelist {
            element.push(XmlElement::text_node("whitelist", pattern.as_str()));
        }
        for pattern in &self.blacklist {
            element.push(XmlElement::text_node("blacklist", pattern.as_str()));
        }
        element
    }
}

fn encode_endpoints(element: &mut XmlElement, endpoints: &[EndpointRegistration]) {
    for role in [EndpointRole::Provider, EndpointRole::Operator] {
        for endpoint in endpoints.iter().filter(|e| e.role == role) {
            element.push(endpoint.encode(array_name(role)));
        }
    }
}

fn decode_endpoints(element: &XmlElement) -> Result<Vec<EndpointRegistration>, DecodeError> {
    let mut endpoints: Vec<EndpointRegistration> = fields::repeated(element, PROVIDER_ARRAY)?;
    endpoints.extend(fields::repeated::<EndpointRegistration>(element, OPERATOR_ARRAY)?);
    Ok(endpoints)
}

/// Publish provider and operator endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddServiceEndpointsRequest {
    /// Provider endpoints first, then operator endpoints.
    pub endpoints: Vec<EndpointRegistration>,
}

impl OchpMessage for AddServiceEndpointsRequest {
    const NAME: &'static str = "AddServiceEndpointsRequest";

    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        fields::expect_name(element, Self::NAME)?;
        Ok(Self {
            endpoints: decode_endpoints(element)?,
        })
    }

    fn encode(&self) -> XmlElement {
        let mut element = XmlElement::new(Self::NAME);
        encode_endpoints(&mut element, &self.endpoints);
        element
    }
}

result_only_response!(AddServiceEndpointsResponse);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetServiceEndpointsRequest;

impl OchpMessage for GetServiceEndpointsRequest {
    const NAME: &'static str = "GetServiceEndpointsRequest";

    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        fields::expect_name(element, Self::NAME)?;
        Ok(Self)
    }

    fn encode(&self) -> XmlElement {
        XmlElement::new(Self::NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetServiceEndpointsResponse {
    pub result: OchpResult,
    pub endpoints: Vec<EndpointRegistration>,
}

impl OchpMessage for GetServiceEndpointsResponse {
    const NAME: &'static str = "GetServiceEndpointsResponse";

    fn decode(element: &XmlElement) -> Result<Self, DecodeError> {
        fields::expect_name(element, Self::NAME)?;
        Ok(Self {
            result: OchpResult::decode(fields::required_child(element, "result")?)?,
            endpoints: decode_endpoints(element)?,
        })
    }

    fn encode(&self) -> XmlElement {
        let mut element = XmlElement::new(Self::NAME).with_child(self.result.encode("result"));
        encode_endpoints(&mut element, &self.endpoints);
        element
    }
}

impl OchpResponse for GetServiceEndpointsResponse {
    fn from_result(result: OchpResult) -> Self {
        Self {
            result,
            endpoints: Vec::new(),
        }
    }

    fn result(&self) -> &OchpResult {
        &self.result
    }
}
