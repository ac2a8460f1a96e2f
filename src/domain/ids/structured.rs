//! Composite identifiers: party id + kind-specific suffix
//!
//! Every structured identifier accepts two serializations:
//!
//! - **new**  `CC*OOO*Xsuffix` (contract ids also accept `-`, used
//!   consistently throughout the id)
//! - **old**  `CCOOOXsuffix` (no separators)
//!
//! Both parse to the same value. The country/party segment is upper-cased,
//! the suffix keeps its original case.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::party::{Operator, PartyId, PartyRole, Provider};
use crate::domain::error::{DomainError, DomainResult};

/// Anchored grammars for one identifier kind.
pub struct Grammar {
    /// One new-format grammar per accepted separator.
    new_formats: Vec<(char, Regex)>,
    old_format: Regex,
    suffix: Regex,
}

/// Parts of an identifier as written.
struct Split<'t> {
    country: &'t str,
    party: &'t str,
    suffix: &'t str,
    /// Separator of the new grammar, `None` for the old one.
    separator: Option<char>,
}

impl Grammar {
    fn new(separators: &[char], suffix: &str) -> Self {
        let new_formats = separators
            .iter()
            .map(|&sep| {
                let pattern = format!(
                    r"^([A-Za-z]{{2}}){sep}([A-Za-z0-9]{{3}}){sep}(.+)$",
                    sep = regex::escape(&sep.to_string())
                );
                (sep, Regex::new(&pattern).expect("new-format grammar"))
            })
            .collect();
        Self {
            new_formats,
            old_format: Regex::new(r"^([A-Za-z]{2})([A-Za-z0-9]{3})(.+)$").expect("old-format grammar"),
            suffix: Regex::new(suffix).expect("suffix grammar"),
        }
    }

    /// New grammar first, then the old one.
    fn split<'t>(&self, text: &'t str) -> Option<Split<'t>> {
        let (caps, separator) = self
            .new_formats
            .iter()
            .find_map(|(sep, format)| format.captures(text).map(|caps| (caps, Some(*sep))))
            .or_else(|| self.old_format.captures(text).map(|caps| (caps, None)))?;
        let (_, [country, party, suffix]) = caps.extract();
        Some(Split {
            country,
            party,
            suffix,
            separator,
        })
    }
}

/// Identifier kind: binds a party role to a suffix grammar.
pub trait IdKind: 'static {
    const KIND: &'static str;
    type Role: PartyRole;

    fn grammar() -> &'static Grammar;

    /// Validate a trimmed suffix and return its canonical text.
    ///
    /// `separator` is the one the rest of the id was written with, if any.
    fn normalize_suffix(suffix: &str, _separator: Option<char>) -> Option<String> {
        Self::grammar()
            .suffix
            .is_match(suffix)
            .then(|| suffix.to_string())
    }

    /// Suffix as written in the compact form.
    fn compact_suffix(suffix: &str) -> String {
        suffix.to_string()
    }
}

#[derive(Debug)]
pub enum EvseKind {}
#[derive(Debug)]
pub enum ParkingKind {}
#[derive(Debug)]
pub enum TariffKind {}
#[derive(Debug)]
pub enum ContractKind {}

static EVSE_GRAMMAR: LazyLock<Grammar> =
    LazyLock::new(|| Grammar::new(&['*'], r"^[Ee][A-Za-z0-9*]{1,30}$"));
static PARKING_GRAMMAR: LazyLock<Grammar> =
    LazyLock::new(|| Grammar::new(&['*'], r"^[Pp][A-Za-z0-9*]{1,30}$"));
static TARIFF_GRAMMAR: LazyLock<Grammar> =
    LazyLock::new(|| Grammar::new(&['*'], r"^[Tt][A-Za-z0-9*]{1,30}$"));
static CONTRACT_GRAMMAR: LazyLock<Grammar> = LazyLock::new(|| {
    Grammar::new(&['-', '*'], r"^([A-Za-z0-9]{9})(?:([*\-])?([A-Za-z0-9]))?$")
});

impl IdKind for EvseKind {
    const KIND: &'static str = "EVSE id";
    type Role = Operator;

    fn grammar() -> &'static Grammar {
        &EVSE_GRAMMAR
    }
}

impl IdKind for ParkingKind {
    const KIND: &'static str = "parking id";
    type Role = Operator;

    fn grammar() -> &'static Grammar {
        &PARKING_GRAMMAR
    }
}

impl IdKind for TariffKind {
    const KIND: &'static str = "tariff id";
    type Role = Operator;

    fn grammar() -> &'static Grammar {
        &TARIFF_GRAMMAR
    }
}

impl IdKind for ContractKind {
    const KIND: &'static str = "contract id";
    type Role = Provider;

    fn grammar() -> &'static Grammar {
        &CONTRACT_GRAMMAR
    }

    // Instance and check character are kept as `INSTANCE-C`.
    fn normalize_suffix(suffix: &str, separator: Option<char>) -> Option<String> {
        let caps = CONTRACT_GRAMMAR.suffix.captures(suffix)?;
        let instance = caps.get(1)?.as_str();
        let check_separator = caps.get(2).and_then(|sep| sep.as_str().chars().next());
        if let (Some(id_sep), Some(check_sep)) = (separator, check_separator) {
            if id_sep != check_sep {
                return None;
            }
        }
        Some(match caps.get(3) {
            Some(check) => format!("{}-{}", instance, check.as_str()),
            None => instance.to_string(),
        })
    }

    fn compact_suffix(suffix: &str) -> String {
        suffix.replace('-', "")
    }
}

/// Identifier made of a party id and a grammar-checked suffix.
pub struct StructuredId<K: IdKind> {
    party: PartyId<K::Role>,
    suffix: String,
    _kind: PhantomData<fn() -> K>,
}

pub type EvseId = StructuredId<EvseKind>;
pub type ParkingId = StructuredId<ParkingKind>;
pub type TariffId = StructuredId<TariffKind>;
pub type ContractId = StructuredId<ContractKind>;

impl<K: IdKind> StructuredId<K> {
    /// Parse either accepted serialization.
    pub fn parse(text: &str) -> DomainResult<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(DomainError::format(K::KIND, trimmed, "empty identifier"));
        }

        let split = K::grammar()
            .split(trimmed)
            .ok_or_else(|| DomainError::format(K::KIND, trimmed, "does not match identifier grammar"))?;

        let suffix = K::normalize_suffix(split.suffix.trim(), split.separator)
            .ok_or_else(|| DomainError::format(K::KIND, trimmed, "invalid suffix"))?;

        Ok(Self {
            party: PartyId::from_validated(split.country, split.party),
            suffix,
            _kind: PhantomData,
        })
    }

    /// Non-failing variant of [`parse`](Self::parse).
    pub fn try_parse(text: &str) -> Option<Self> {
        Self::parse(text).ok()
    }

    /// Compose from a party id and a suffix, re-validating the suffix.
    pub fn from_parts(party: PartyId<K::Role>, suffix: &str) -> DomainResult<Self> {
        let trimmed = suffix.trim();
        let suffix = K::normalize_suffix(trimmed, None)
            .ok_or_else(|| DomainError::format(K::KIND, trimmed, "invalid suffix"))?;

        Ok(Self {
            party,
            suffix,
            _kind: PhantomData,
        })
    }

    pub fn party(&self) -> &PartyId<K::Role> {
        &self.party
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Old (separator-free) serialization.
    pub fn to_compact(&self) -> String {
        format!("{}{}", self.party.compact(), K::compact_suffix(&self.suffix))
    }

    fn canonical_len(&self) -> usize {
        // country + separator + party + separator + suffix
        2 + 1 + 3 + 1 + self.suffix.len()
    }
}

impl StructuredId<ContractKind> {
    /// Contract instance without the check character.
    pub fn instance(&self) -> &str {
        self.suffix.split('-').next().unwrap_or(&self.suffix)
    }

    pub fn check_character(&self) -> Option<char> {
        self.suffix
            .split_once('-')
            .and_then(|(_, check)| check.chars().next())
    }
}

impl<K: IdKind> Clone for StructuredId<K> {
    fn clone(&self) -> Self {
        Self {
            party: self.party.clone(),
            suffix: self.suffix.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: IdKind> PartialEq for StructuredId<K> {
    fn eq(&self, other: &Self) -> bool {
        self.party == other.party && self.suffix == other.suffix
    }
}

impl<K: IdKind> Eq for StructuredId<K> {}

impl<K: IdKind> Hash for StructuredId<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.party.hash(state);
        self.suffix.hash(state);
    }
}

impl<K: IdKind> PartialOrd for StructuredId<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shorter canonical form first, then party id, then suffix (ordinal).
impl<K: IdKind> Ord for StructuredId<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical_len()
            .cmp(&other.canonical_len())
            .then_with(|| self.party.cmp(&other.party))
            .then_with(|| self.suffix.cmp(&other.suffix))
    }
}

impl<K: IdKind> fmt::Display for StructuredId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.party, K::Role::SEPARATOR, self.suffix)
    }
}

impl<K: IdKind> fmt::Debug for StructuredId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", K::KIND, self)
    }
}

impl<K: IdKind> FromStr for StructuredId<K> {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<K: IdKind> Serialize for StructuredId<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, K: IdKind> Deserialize<'de> for StructuredId<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::OperatorId;

    #[test]
    fn evse_id_new_and_old_format_are_equal() {
        let new = EvseId::parse("DE*GEF*E1234*1").unwrap();
        let old = EvseId::parse("DEGEFE1234*1").unwrap();
        assert_eq!(new, old);
        assert_eq!(old.to_string(), "DE*GEF*E1234*1");
        assert_eq!(new.to_compact(), "DEGEFE1234*1");
    }

    #[test]
    fn contract_id_dash_and_compact_forms_are_equal() {
        let a = ContractId::parse("DE-GDF-123456789-1").unwrap();
        let b = ContractId::parse("DEGDF1234567891").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "DE-GDF-123456789-1");
        assert_eq!(a.instance(), "123456789");
        assert_eq!(a.check_character(), Some('1'));
        assert_eq!(b.to_compact(), "DEGDF1234567891");
    }

    #[test]
    fn contract_id_separators_must_agree() {
        let star = ContractId::parse("DE*GDF*123456789*1").unwrap();
        assert_eq!(star, ContractId::parse("DE-GDF-123456789-1").unwrap());

        for mixed in [
            "DE*GDF-123456789",
            "DE-GDF*123456789",
            "DE*GDF*123456789-1",
            "DE-GDF-123456789*1",
        ] {
            assert!(ContractId::try_parse(mixed).is_none(), "accepted {mixed:?}");
        }
    }

    #[test]
    fn contract_id_without_check_character() {
        let id = ContractId::parse("DE*GDF*ABC123456").unwrap();
        assert_eq!(id.to_string(), "DE-GDF-ABC123456");
        assert_eq!(id.check_character(), None);
    }

    #[test]
    fn country_and_operator_are_uppercased_suffix_keeps_case() {
        let id = EvseId::parse("de*gef*e12ab").unwrap();
        assert_eq!(id.to_string(), "DE*GEF*e12ab");
        assert_ne!(id, EvseId::parse("DE*GEF*E12AB").unwrap());
    }

    #[test]
    fn parking_suffix_requires_leading_p() {
        assert!(ParkingId::parse("DE*GEF*P123").is_ok());
        assert!(ParkingId::parse("DE*GEF*p123").is_ok());
        assert!(ParkingId::parse("DE*GEF*E123").is_err());

        let op = OperatorId::parse("DE*GEF").unwrap();
        assert!(ParkingId::from_parts(op.clone(), "P77").is_ok());
        assert!(ParkingId::from_parts(op, "X77").is_err());
    }

    #[test]
    fn tariff_id_parses() {
        let id = TariffId::parse(" DEGEFT0001 ").unwrap();
        assert_eq!(id.to_string(), "DE*GEF*T0001");
    }

    #[test]
    fn rejects_malformed_text() {
        for bad in ["", "DE", "DE*GEF", "DE*GEF*", "D1*GEF*E1", "DE*GEF*E", "DE*GEF*E1-2"] {
            assert!(EvseId::try_parse(bad).is_none(), "accepted {bad:?}");
        }
        assert!(ContractId::parse("DE-GDF-1234").is_err());
    }

    #[test]
    fn error_names_the_kind() {
        let err = EvseId::parse("nope").unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("EVSE id"));
    }

    #[test]
    fn ordering_is_length_then_party_then_suffix() {
        let mut ids: Vec<EvseId> = ["DE*GEF*E10", "AT*ABC*E9", "DE*ABC*E9", "DE*GEF*E2"]
            .iter()
            .map(|s| EvseId::parse(s).unwrap())
            .collect();
        ids.sort();
        let rendered: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["AT*ABC*E9", "DE*ABC*E9", "DE*GEF*E2", "DE*GEF*E10"]);
    }

    #[test]
    fn usable_as_map_key() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(EvseId::parse("DE*GEF*E1").unwrap(), 1);
        assert_eq!(map.get(&EvseId::parse("DEGEFE1").unwrap()), Some(&1));
    }

    #[test]
    fn serde_uses_canonical_string() {
        let id = EvseId::parse("DEGEFE1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"DE*GEF*E1\"");
        let back: EvseId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<EvseId>("\"garbage\"").is_err());
    }
}
