//! Party identifiers (country code + 3-character party code)

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::{DomainError, DomainResult};

/// Role a party plays in the roaming network.
///
/// The role only decides how the identifier is rendered; the grammar is
/// shared.
pub trait PartyRole: 'static {
    /// Human-readable kind used in error messages.
    const KIND: &'static str;
    /// Canonical separator between country and party code.
    const SEPARATOR: char;
}

/// Charge point operator role (`DE*GEF`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {}

/// E-mobility provider role (`DE-GDF`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Provider {}

impl PartyRole for Operator {
    const KIND: &'static str = "operator id";
    const SEPARATOR: char = '*';
}

impl PartyRole for Provider {
    const KIND: &'static str = "provider id";
    const SEPARATOR: char = '-';
}

static PARTY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]{2})[*\-]?([A-Za-z0-9]{3})$").expect("party id pattern")
});

/// Country code plus party code, normalized to upper case.
pub struct PartyId<R: PartyRole> {
    country: String,
    party: String,
    _role: PhantomData<fn() -> R>,
}

pub type OperatorId = PartyId<Operator>;
pub type ProviderId = PartyId<Provider>;

impl<R: PartyRole> PartyId<R> {
    /// Build from already separated parts.
    pub fn new(country: &str, party: &str) -> DomainResult<Self> {
        Self::parse(&format!("{}{}", country.trim(), party.trim()))
    }

    /// Parse `CC*PPP`, `CC-PPP` or `CCPPP`.
    pub fn parse(text: &str) -> DomainResult<Self> {
        let trimmed = text.trim();
        let caps = PARTY_PATTERN.captures(trimmed).ok_or_else(|| {
            DomainError::format(R::KIND, trimmed, "expected 2-letter country and 3-character party code")
        })?;

        Ok(Self::from_validated(&caps[1], &caps[2]))
    }

    pub fn try_parse(text: &str) -> Option<Self> {
        Self::parse(text).ok()
    }

    pub(crate) fn from_validated(country: &str, party: &str) -> Self {
        Self {
            country: country.to_ascii_uppercase(),
            party: party.to_ascii_uppercase(),
            _role: PhantomData,
        }
    }

    /// ISO 3166-1 alpha-2 country code.
    pub fn country_code(&self) -> &str {
        &self.country
    }

    pub fn party_code(&self) -> &str {
        &self.party
    }

    /// Compact form without separator (`DEGEF`).
    pub fn compact(&self) -> String {
        format!("{}{}", self.country, self.party)
    }
}

impl<R: PartyRole> Clone for PartyId<R> {
    fn clone(&self) -> Self {
        Self {
            country: self.country.clone(),
            party: self.party.clone(),
            _role: PhantomData,
        }
    }
}

impl<R: PartyRole> PartialEq for PartyId<R> {
    fn eq(&self, other: &Self) -> bool {
        self.country == other.country && self.party == other.party
    }
}

impl<R: PartyRole> Eq for PartyId<R> {}

impl<R: PartyRole> Hash for PartyId<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.country.hash(state);
        self.party.hash(state);
    }
}

impl<R: PartyRole> PartialOrd for PartyId<R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R: PartyRole> Ord for PartyId<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.country
            .cmp(&other.country)
            .then_with(|| self.party.cmp(&other.party))
    }
}

impl<R: PartyRole> fmt::Display for PartyId<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.country, R::SEPARATOR, self.party)
    }
}

impl<R: PartyRole> fmt::Debug for PartyId<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", R::KIND, self)
    }
}

impl<R: PartyRole> FromStr for PartyId<R> {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_id_accepts_both_forms() {
        let a = OperatorId::parse("DE*GEF").unwrap();
        let b = OperatorId::parse("degef").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "DE*GEF");
        assert_eq!(b.compact(), "DEGEF");
    }

    #[test]
    fn provider_id_renders_with_dash() {
        let p = ProviderId::parse("DE*GDF").unwrap();
        assert_eq!(p.to_string(), "DE-GDF");
        assert_eq!(p.country_code(), "DE");
        assert_eq!(p.party_code(), "GDF");
    }

    #[test]
    fn rejects_wrong_lengths() {
        assert!(OperatorId::parse("D*GEF").is_err());
        assert!(OperatorId::parse("DE*GE").is_err());
        assert!(OperatorId::parse("DE*GEFX").is_err());
        assert!(OperatorId::try_parse("12*GEF").is_none());
    }

    #[test]
    fn new_from_parts() {
        let id = OperatorId::new("de", "a1b").unwrap();
        assert_eq!(id.to_string(), "DE*A1B");
    }
}
