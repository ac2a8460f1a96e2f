//! Authorisation token identifier (EMT id)

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::error::{DomainError, DomainResult};
use crate::support::wire::wire_enum;

wire_enum! {
    /// How the token instance is represented on the wire.
    pub enum TokenRepresentation {
        Plain => "plain",
        Sha160 => "sha-160",
        Sha256 => "sha-256",
    }
}

wire_enum! {
    pub enum TokenType {
        Rfid => "rfid",
        Remote => "remote",
        Iso15118 => "15118",
    }
}

wire_enum! {
    pub enum TokenSubType {
        MifareClassic => "mifareCls",
        MifareDesfire => "mifareDes",
        Calypso => "calypso",
    }
}

/// Electric-mobility token.
///
/// Equality covers all four fields: the same instance text with a
/// different representation or type is a different token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmtId {
    pub instance: String,
    pub representation: TokenRepresentation,
    pub token_type: TokenType,
    pub token_sub_type: Option<TokenSubType>,
}

impl EmtId {
    pub fn new(
        instance: &str,
        representation: TokenRepresentation,
        token_type: TokenType,
        token_sub_type: Option<TokenSubType>,
    ) -> DomainResult<Self> {
        let instance = instance.trim();
        if instance.is_empty() {
            return Err(DomainError::format("token id", instance, "empty instance"));
        }
        if instance.len() > 512 {
            return Err(DomainError::format("token id", instance, "instance longer than 512 characters"));
        }
        Ok(Self {
            instance: instance.to_string(),
            representation,
            token_type,
            token_sub_type,
        })
    }

    /// Plain-text RFID token.
    pub fn rfid(instance: &str, sub_type: Option<TokenSubType>) -> DomainResult<Self> {
        Self::new(instance, TokenRepresentation::Plain, TokenType::Rfid, sub_type)
    }

    /// Hash a plain token so it can be shared without exposing the UID.
    ///
    /// Hashing an already hashed token is rejected.
    pub fn hashed_sha256(&self) -> DomainResult<Self> {
        if self.representation != TokenRepresentation::Plain {
            return Err(DomainError::Argument {
                name: "representation",
                reason: "only plain tokens can be hashed",
            });
        }
        let digest = Sha256::digest(self.instance.as_bytes());
        Ok(Self {
            instance: hex::encode_upper(digest),
            representation: TokenRepresentation::Sha256,
            token_type: self.token_type,
            token_sub_type: self.token_sub_type,
        })
    }
}

impl fmt::Display for EmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.instance, self.representation, self.token_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::wire::assert_wire_table;

    #[test]
    fn wire_tables_are_complete() {
        assert_wire_table!(TokenRepresentation);
        assert_wire_table!(TokenType);
        assert_wire_table!(TokenSubType);
    }

    #[test]
    fn equality_covers_every_field() {
        let plain = EmtId::rfid("04A2B3C4", None).unwrap();
        let remote =
            EmtId::new("04A2B3C4", TokenRepresentation::Plain, TokenType::Remote, None).unwrap();
        let with_sub = EmtId::rfid("04A2B3C4", Some(TokenSubType::MifareClassic)).unwrap();
        assert_ne!(plain, remote);
        assert_ne!(plain, with_sub);
        assert_eq!(plain, EmtId::rfid(" 04A2B3C4 ", None).unwrap());
    }

    #[test]
    fn hashing_produces_sha256_hex() {
        let token = EmtId::rfid("abc", None).unwrap();
        let hashed = token.hashed_sha256().unwrap();
        assert_eq!(hashed.representation, TokenRepresentation::Sha256);
        assert_eq!(
            hashed.instance,
            "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD"
        );
        assert!(hashed.hashed_sha256().is_err());
    }

    #[test]
    fn rejects_empty_instance() {
        assert!(EmtId::rfid("  ", None).is_err());
    }
}
