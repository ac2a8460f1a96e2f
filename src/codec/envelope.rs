//! Minimal SOAP 1.1 framing
//!
//! Only enough to carry one OCHP body per envelope. Headers are written
//! empty and ignored on input.

use super::xml::{OCHP_NAMESPACE, OCHP_PREFIX};
use super::{DecodeError, OchpMessage, XmlElement};

pub const SOAP_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SOAP_PREFIX: &str = "soapenv";

/// Wrap a message body in an envelope.
pub fn wrap(body: &XmlElement) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(&format!(
        "<{p}:Envelope xmlns:{p}=\"{soap}\" xmlns:{ns}=\"{ochp}\"><{p}:Header/><{p}:Body>",
        p = SOAP_PREFIX,
        soap = SOAP_NAMESPACE,
        ns = OCHP_PREFIX,
        ochp = OCHP_NAMESPACE,
    ));
    body.write(&mut out, Some(OCHP_PREFIX), None);
    out.push_str(&format!("</{p}:Body></{p}:Envelope>", p = SOAP_PREFIX));
    out
}

/// Extract the message body.
///
/// A document without an `Envelope` root is taken to be a bare body.
pub fn unwrap(text: &str) -> Result<XmlElement, DecodeError> {
    let root = XmlElement::parse(text)?;
    if root.name != "Envelope" {
        return Ok(root);
    }

    let body = root
        .children
        .into_iter()
        .find(|child| child.name == "Body")
        .ok_or(DecodeError::MissingElement {
            parent: "Envelope".into(),
            name: "Body",
        })?;
    body.children
        .into_iter()
        .next()
        .ok_or(DecodeError::MissingElement {
            parent: "Body".into(),
            name: "message",
        })
}

/// SOAP fault for requests that carry no decodable OCHP body.
pub fn fault(code: &str, reason: &str) -> String {
    let body = XmlElement::new("Fault")
        .with_child(XmlElement::text_node("faultcode", format!("{}:{}", SOAP_PREFIX, code)))
        .with_child(XmlElement::text_node("faultstring", reason));
    let mut out = format!(
        "<{p}:Envelope xmlns:{p}=\"{soap}\"><{p}:Body>",
        p = SOAP_PREFIX,
        soap = SOAP_NAMESPACE,
    );
    body.write(&mut out, Some(SOAP_PREFIX), None);
    out.push_str(&format!("</{p}:Body></{p}:Envelope>", p = SOAP_PREFIX));
    out
}

pub fn wrap_message<M: OchpMessage>(message: &M) -> String {
    wrap(&message.encode())
}

pub fn unwrap_message<M: OchpMessage>(text: &str) -> Result<M, DecodeError> {
    M::decode(&unwrap(text)?)
}
