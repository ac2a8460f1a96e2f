//! Field-level decode/encode helpers shared by all messages

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;

use super::error::DecodeError;
use super::xml::XmlElement;
use super::XmlValue;
use crate::domain::DomainError;

/// Child element wrapping timestamps: `<ttl><DateTime>…</DateTime></ttl>`.
const DATE_TIME: &str = "DateTime";

pub fn expect_name(element: &XmlElement, expected: &'static str) -> Result<(), DecodeError> {
    if element.name == expected {
        Ok(())
    } else {
        Err(DecodeError::UnexpectedElement {
            expected,
            found: element.name.clone(),
        })
    }
}

pub fn required_child<'a>(
    element: &'a XmlElement,
    name: &'static str,
) -> Result<&'a XmlElement, DecodeError> {
    element.child(name).ok_or_else(|| DecodeError::MissingElement {
        parent: element.name.clone(),
        name,
    })
}

/// Text of `name`; absent or empty elements are `None`.
pub fn optional_text<'a>(element: &'a XmlElement, name: &str) -> Option<&'a str> {
    element
        .child(name)
        .map(XmlElement::text)
        .filter(|text| !text.is_empty())
}

/// Free text exactly as received. A present but empty element is `Some("")`.
pub fn optional_free_text<'a>(element: &'a XmlElement, name: &str) -> Option<&'a str> {
    element.child(name).map(XmlElement::raw_text)
}

/// Free text exactly as received; blank text is refused.
pub fn required_free_text<'a>(
    element: &'a XmlElement,
    name: &'static str,
) -> Result<&'a str, DecodeError> {
    let text = required_child(element, name)?.raw_text();
    if text.trim().is_empty() {
        return Err(DecodeError::invalid_value(name, text, "must not be empty"));
    }
    Ok(text)
}

pub fn required_text<'a>(element: &'a XmlElement, name: &'static str) -> Result<&'a str, DecodeError> {
    let child = required_child(element, name)?;
    let text = child.text();
    if text.is_empty() {
        return Err(DecodeError::invalid_value(name, text, "must not be empty"));
    }
    Ok(text)
}

// ── Identifiers ────────────────────────────────────────────────

pub fn parse_id<T>(element: &str, text: &str) -> Result<T, DecodeError>
where
    T: FromStr<Err = DomainError>,
{
    text.parse::<T>()
        .map_err(|source| DecodeError::InvalidIdentifier {
            element: element.to_string(),
            source,
        })
}

pub fn required_id<T>(element: &XmlElement, name: &'static str) -> Result<T, DecodeError>
where
    T: FromStr<Err = DomainError>,
{
    let child = required_child(element, name)?;
    parse_id(name, child.text())
}

/// Absent or empty elements are `None`; present text must parse.
pub fn optional_id<T>(element: &XmlElement, name: &'static str) -> Result<Option<T>, DecodeError>
where
    T: FromStr<Err = DomainError>,
{
    optional_text(element, name)
        .map(|text| parse_id(name, text))
        .transpose()
}

pub fn id_element(name: &str, id: &impl ToString) -> XmlElement {
    XmlElement::text_node(name, id.to_string())
}

// ── Timestamps ─────────────────────────────────────────────────

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_timestamp(element: &str, text: &str) -> Result<DateTime<Utc>, DecodeError> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DecodeError::invalid_value(element, text, e.to_string()))
}

/// `<name><DateTime>…</DateTime></name>`
pub fn timestamp_element(name: &str, value: &DateTime<Utc>) -> XmlElement {
    XmlElement::new(name).with_child(XmlElement::text_node(DATE_TIME, format_timestamp(value)))
}

pub fn optional_timestamp(
    element: &XmlElement,
    name: &'static str,
) -> Result<Option<DateTime<Utc>>, DecodeError> {
    let Some(child) = element.child(name) else {
        return Ok(None);
    };
    // Tolerate peers that put the instant directly into the element.
    let text = child.child(DATE_TIME).map(XmlElement::text).unwrap_or(child.text());
    if text.is_empty() {
        return Ok(None);
    }
    parse_timestamp(name, text).map(Some)
}

pub fn required_timestamp(
    element: &XmlElement,
    name: &'static str,
) -> Result<DateTime<Utc>, DecodeError> {
    optional_timestamp(element, name)?.ok_or_else(|| DecodeError::MissingElement {
        parent: element.name.clone(),
        name,
    })
}

pub fn optional_timestamp_attr(
    element: &XmlElement,
    name: &'static str,
) -> Result<Option<DateTime<Utc>>, DecodeError> {
    match element.attr(name).map(str::trim).filter(|v| !v.is_empty()) {
        Some(text) => parse_timestamp(name, text).map(Some),
        None => Ok(None),
    }
}

// ── Numbers and flags ──────────────────────────────────────────

pub fn optional_decimal(element: &XmlElement, name: &'static str) -> Result<Option<Decimal>, DecodeError> {
    optional_text(element, name)
        .map(|text| {
            Decimal::from_str(text).map_err(|e| DecodeError::invalid_value(name, text, e.to_string()))
        })
        .transpose()
}

pub fn required_decimal(element: &XmlElement, name: &'static str) -> Result<Decimal, DecodeError> {
    let text = required_text(element, name)?;
    Decimal::from_str(text).map_err(|e| DecodeError::invalid_value(name, text, e.to_string()))
}

pub fn decimal_element(name: &str, value: &Decimal) -> XmlElement {
    XmlElement::text_node(name, value.to_string())
}

pub fn optional_bool(element: &XmlElement, name: &'static str) -> Result<Option<bool>, DecodeError> {
    optional_text(element, name)
        .map(|text| match text {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(DecodeError::invalid_value(name, other, "expected boolean")),
        })
        .transpose()
}

// ── Enumerations ───────────────────────────────────────────────

/// Map a wire token through an enum's lookup table.
pub fn parse_token<T>(
    element: &str,
    text: &str,
    lookup: fn(&str) -> Option<T>,
) -> Result<T, DecodeError> {
    lookup(text).ok_or_else(|| DecodeError::invalid_value(element, text, "unknown token"))
}

pub fn optional_token<T>(
    element: &XmlElement,
    name: &'static str,
    lookup: fn(&str) -> Option<T>,
) -> Result<Option<T>, DecodeError> {
    optional_text(element, name)
        .map(|text| parse_token(name, text, lookup))
        .transpose()
}

pub fn required_token<T>(
    element: &XmlElement,
    name: &'static str,
    lookup: fn(&str) -> Option<T>,
) -> Result<T, DecodeError> {
    parse_token(name, required_text(element, name)?, lookup)
}

// ── Collections ────────────────────────────────────────────────

/// Zero or more `name` children.
pub fn repeated<T: XmlValue>(element: &XmlElement, name: &str) -> Result<Vec<T>, DecodeError> {
    element.children_named(name).map(T::decode).collect()
}

/// One or more `name` children.
pub fn repeated_at_least_one<T: XmlValue>(
    element: &XmlElement,
    name: &'static str,
) -> Result<Vec<T>, DecodeError> {
    let items = repeated(element, name)?;
    if items.is_empty() {
        return Err(DecodeError::Cardinality {
            parent: element.name.clone(),
            name,
            min: 1,
        });
    }
    Ok(items)
}

pub fn push_repeated<T: XmlValue>(element: &mut XmlElement, name: &str, items: &[T]) {
    for item in items {
        element.push(item.encode(name));
    }
}
