//! Merge fields and their values.

use serde::{Deserialize, Serialize};

use super::country::Country;

/// A single merge field edit. The key is given without vertical bars (e.g. `FNAME`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeField {
    pub key: String,
    pub value: MergeFieldValue,
}

/// Value of a merge field.
///
/// Serialized with an explicit `type` discriminator (`"string"` or
/// `"address"`) so a persisted change-set decodes back into the same variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MergeFieldValue {
    String { value: String },
    Address(Address),
}

impl From<String> for MergeFieldValue {
    fn from(value: String) -> Self {
        MergeFieldValue::String { value }
    }
}

impl From<&str> for MergeFieldValue {
    fn from(value: &str) -> Self {
        MergeFieldValue::String {
            value: value.to_string(),
        }
    }
}

impl From<Address> for MergeFieldValue {
    fn from(address: Address) -> Self {
        MergeFieldValue::Address(address)
    }
}

/// Value of an address-typed merge field.
///
/// Line one, city and zip are required; see [`Address::builder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(rename = "addr1")]
    pub address_line_one: String,
    #[serde(rename = "addr2", default, skip_serializing_if = "Option::is_none")]
    pub address_line_two: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Country>,
    pub zip: String,
}

impl Address {
    pub fn builder(
        address_line_one: impl Into<String>,
        city: impl Into<String>,
        zip: impl Into<String>,
    ) -> AddressBuilder {
        AddressBuilder {
            address_line_one: address_line_one.into(),
            address_line_two: None,
            city: city.into(),
            state: None,
            country: None,
            zip: zip.into(),
        }
    }
}

pub struct AddressBuilder {
    address_line_one: String,
    address_line_two: Option<String>,
    city: String,
    state: Option<String>,
    country: Option<Country>,
    zip: String,
}

impl AddressBuilder {
    pub fn address_line_two(mut self, line: impl Into<String>) -> Self {
        self.address_line_two = Some(line.into());
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn country(mut self, country: Country) -> Self {
        self.country = Some(country);
        self
    }

    pub fn build(self) -> Address {
        Address {
            address_line_one: self.address_line_one,
            address_line_two: self.address_line_two,
            city: self.city,
            state: self.state,
            country: self.country,
            zip: self.zip,
        }
    }
}
