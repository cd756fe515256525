//! Core types for the cafe catalog

use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Column names of the `cafe` table, in declared order.
///
/// The same list drives the SQL select list and the key order of
/// [`Cafe::to_dict`], so the two never drift apart.
pub const CAFE_COLUMNS: [&str; 11] = [
    "id",
    "name",
    "map_url",
    "img_url",
    "location",
    "seats",
    "has_toilet",
    "has_wifi",
    "has_sockets",
    "can_take_calls",
    "coffee_price",
];

/// Ordered field name to value mapping used for every JSON response
pub type CafeDict = Map<String, Value>;

/// A cafe listing
#[derive(Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Cafe {
    pub id: i64,
    pub name: String,
    pub map_url: String,
    pub img_url: String,
    pub location: String,
    /// Free-form seat count, e.g. "20-30"
    pub seats: String,
    pub has_toilet: bool,
    pub has_wifi: bool,
    pub has_sockets: bool,
    pub can_take_calls: bool,
    /// Free-form price, e.g. "£2.40". `None` when unknown.
    pub coffee_price: Option<String>,
}

impl Cafe {
    /// Build a cafe from a persisted record and its assigned id
    pub fn from_new(id: i64, new: NewCafe) -> Self {
        Self {
            id,
            name: new.name,
            map_url: new.map_url,
            img_url: new.img_url,
            location: new.location,
            seats: new.seats,
            has_toilet: new.has_toilet,
            has_wifi: new.has_wifi,
            has_sockets: new.has_sockets,
            can_take_calls: new.can_take_calls,
            coffee_price: new.coffee_price,
        }
    }

    /// Value of a single column, as it appears in JSON output
    fn column_value(&self, column: &str) -> Value {
        match column {
            "id" => Value::from(self.id),
            "name" => Value::from(self.name.as_str()),
            "map_url" => Value::from(self.map_url.as_str()),
            "img_url" => Value::from(self.img_url.as_str()),
            "location" => Value::from(self.location.as_str()),
            "seats" => Value::from(self.seats.as_str()),
            "has_toilet" => Value::Bool(self.has_toilet),
            "has_wifi" => Value::Bool(self.has_wifi),
            "has_sockets" => Value::Bool(self.has_sockets),
            "can_take_calls" => Value::Bool(self.can_take_calls),
            "coffee_price" => self
                .coffee_price
                .as_deref()
                .map_or(Value::Null, Value::from),
            other => unreachable!("column '{}' has no field on Cafe", other),
        }
    }

    /// Convert to an ordered mapping with every column present
    pub fn to_dict(&self) -> CafeDict {
        CAFE_COLUMNS
            .iter()
            .map(|column| (column.to_string(), self.column_value(column)))
            .collect()
    }
}

/// Fields of a cafe that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCafe {
    pub name: String,
    pub map_url: String,
    pub img_url: String,
    pub location: String,
    pub seats: String,
    pub has_toilet: bool,
    pub has_wifi: bool,
    pub has_sockets: bool,
    pub can_take_calls: bool,
    pub coffee_price: Option<String>,
}

impl NewCafe {
    /// Check that every required text field is non-empty
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("name", &self.name),
            ("map_url", &self.map_url),
            ("img_url", &self.img_url),
            ("location", &self.location),
            ("seats", &self.seats),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Validation(format!("Field '{}' must not be empty", field)));
            }
        }

        Ok(())
    }
}

/// Parse a textual amenity flag.
///
/// Only `true`/`false`, `1`/`0` and `on`/`off` are accepted (case-insensitive).
pub fn parse_flag(field: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        _ => Err(Error::Validation(format!(
            "Field '{}' must be one of true/false, 1/0, on/off (got '{}')",
            field, raw
        ))),
    }
}
