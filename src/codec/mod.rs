//! OCHP 1.4 message codec
//!
//! Every request/response type implements [`OchpMessage`]: `decode` turns
//! a wire element into a validated value, `encode` is total. The round-trip
//! law `decode(encode(x)) == x` holds for every constructible value.
//!
//! Optional fields: absent on the wire ⇔ `None`; `None` is never written.
//! Collections: zero or more repetitions unless a message says otherwise.

pub mod envelope;
pub mod error;
pub mod fields;
pub mod messages;
pub mod result;
pub mod xml;

pub use error::DecodeError;
pub use result::{OchpResult, ResultCode};
pub use xml::{XmlElement, OCHP_NAMESPACE};

/// Value nested inside a message (status, token, endpoint…).
///
/// The element name is chosen by the enclosing message.
pub trait XmlValue: Sized {
    fn decode(element: &XmlElement) -> Result<Self, DecodeError>;
    fn encode(&self, name: &str) -> XmlElement;
}

/// Top-level request or response.
pub trait OchpMessage: Sized {
    /// Element name of the message body.
    const NAME: &'static str;

    fn decode(element: &XmlElement) -> Result<Self, DecodeError>;
    fn encode(&self) -> XmlElement;

    fn from_xml(text: &str) -> Result<Self, DecodeError> {
        Self::decode(&XmlElement::parse(text)?)
    }

    fn to_xml(&self) -> String {
        self.encode().to_xml_string()
    }
}

/// Response that can always be produced from a bare result, so failures
/// still yield a well-formed reply.
pub trait OchpResponse: OchpMessage {
    fn from_result(result: OchpResult) -> Self;
    fn result(&self) -> &OchpResult;
}

/// Declare a response whose only payload is the result.
macro_rules! result_only_response {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub result: $crate::codec::OchpResult,
        }

        impl $crate::codec::OchpMessage for $name {
            const NAME: &'static str = stringify!($name);

            fn decode(
                element: &$crate::codec::XmlElement,
            ) -> Result<Self, $crate::codec::DecodeError> {
                $crate::codec::fields::expect_name(element, Self::NAME)?;
                let result = <$crate::codec::OchpResult as $crate::codec::XmlValue>::decode(
                    $crate::codec::fields::required_child(element, "result")?,
                )?;
                Ok(Self { result })
            }

            fn encode(&self) -> $crate::codec::XmlElement {
                $crate::codec::XmlElement::new(Self::NAME).with_child(
                    <$crate::codec::OchpResult as $crate::codec::XmlValue>::encode(
                        &self.result,
                        "result",
                    ),
                )
            }
        }

        impl $crate::codec::OchpResponse for $name {
            fn from_result(result: $crate::codec::OchpResult) -> Self {
                Self { result }
            }

            fn result(&self) -> &$crate::codec::OchpResult {
                &self.result
            }
        }
    };
}

pub(crate) use result_only_response;
