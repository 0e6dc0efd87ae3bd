//! Point finder models
//!
//! The point finder answers with pipe-delimited records of nine fields:
//!
//! ```text
//! id|type|place|name|easting|northing|distance|<reserved>|shortcut
//! ```
//!
//! The reserved field is kept verbatim so a parsed record renders back to
//! the same string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coordinates::GeoPosition;
use crate::envelope::Status;
use crate::error::VvoError;

const NOT_IDENTIFIED: &str = "NotIdentified";

/// Identifier of a point: numeric for stops, opaque otherwise
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    /// Stop identifier
    Numeric(u64),
    /// Address, POI or coordinate identifier
    Text(String),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Text(id) => write!(f, "{id}"),
        }
    }
}

/// What kind of location a point describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    /// Public transit stop
    Stop,
    /// Street address
    Address,
    /// Point of interest
    Poi,
    /// Raw coordinate
    Coordinate,
}

impl PointKind {
    /// Classify a point from its type discriminator and raw identifier
    #[must_use]
    pub fn classify(discriminator: &str, id: &str) -> Self {
        match discriminator {
            "" if is_numeric(id) => Self::Stop,
            "c" => Self::Coordinate,
            d if d.starts_with('a') => Self::Address,
            _ => Self::Poi,
        }
    }
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// A location candidate returned by the point finder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    /// Point identifier
    pub id: PointId,
    /// Derived kind
    pub kind: PointKind,
    /// Raw type discriminator as sent by the service
    pub discriminator: String,
    /// City or community
    pub place: String,
    /// Display name
    pub name: String,
    /// GK4 easting in metres
    pub easting: i64,
    /// GK4 northing in metres
    pub northing: i64,
    /// Distance in metres (proximity queries only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
    /// Eighth record field, not interpreted
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reserved: String,
    /// Stop shortcut, empty if none was requested
    pub shortcut: String,
}

impl Point {
    /// Parse a pipe-delimited point record
    ///
    /// # Errors
    ///
    /// Returns [`VvoError::InvalidPointRecord`] unless the record has exactly
    /// nine fields, and [`VvoError::InvalidField`] for non-integer
    /// coordinates, distances or stop identifiers.
    pub fn parse(record: &str) -> Result<Self, VvoError> {
        let fields: Vec<&str> = record.split('|').collect();
        let &[id, discriminator, place, name, easting, northing, distance, reserved, shortcut] =
            fields.as_slice()
        else {
            return Err(VvoError::InvalidPointRecord {
                fields: fields.len(),
            });
        };

        let kind = PointKind::classify(discriminator, id);
        let id = if kind == PointKind::Stop {
            PointId::Numeric(parse_field("id", id)?)
        } else {
            PointId::Text(id.to_string())
        };
        let distance = if distance.is_empty() {
            None
        } else {
            Some(parse_field("distance", distance)?)
        };

        Ok(Self {
            id,
            kind,
            discriminator: discriminator.to_string(),
            place: place.to_string(),
            name: name.to_string(),
            easting: parse_field("easting", easting)?,
            northing: parse_field("northing", northing)?,
            distance,
            reserved: reserved.to_string(),
            shortcut: shortcut.to_string(),
        })
    }

    /// Render the point back into its wire record
    #[must_use]
    pub fn to_record(&self) -> String {
        let distance = self.distance.map(|d| d.to_string()).unwrap_or_default();
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.id,
            self.discriminator,
            self.place,
            self.name,
            self.easting,
            self.northing,
            distance,
            self.reserved,
            self.shortcut
        )
    }

    /// Whether this point is a stop
    #[must_use]
    pub fn is_stop(&self) -> bool {
        self.kind == PointKind::Stop
    }

    /// Whether this point is a raw coordinate
    #[must_use]
    pub fn is_coordinate(&self) -> bool {
        self.kind == PointKind::Coordinate
    }

    /// Numeric stop id, if this point is a stop
    #[must_use]
    pub const fn stop_id(&self) -> Option<u64> {
        match self.id {
            PointId::Numeric(id) => Some(id),
            PointId::Text(_) => None,
        }
    }

    /// WGS84 position, recomputed on every call
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // GK4 values are far below 2^52
    pub fn location(&self) -> GeoPosition {
        GeoPosition::from_gk4(self.easting as f64, self.northing as f64)
    }
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, VvoError> {
    value.parse().map_err(|_| VvoError::InvalidField {
        field,
        value: value.to_string(),
    })
}

impl FromStr for Point {
    type Err = VvoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_record())
    }
}

/// Response of a point finder query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointResponse {
    /// False when the service could not identify the query
    pub ok: bool,
    /// Found points, best match first
    pub points: Vec<Point>,
}

impl PointResponse {
    /// Create a "not identified" response
    #[must_use]
    pub const fn not_identified() -> Self {
        Self {
            ok: false,
            points: Vec::new(),
        }
    }

    /// Decode a point finder JSON body
    ///
    /// # Errors
    ///
    /// Returns [`VvoError::Status`] for a non-`Ok` status, and parse errors
    /// for malformed JSON or point records.
    pub fn from_json(body: &str) -> Result<Self, VvoError> {
        let raw: RawPointResponse =
            serde_json::from_str(body).map_err(|e| VvoError::ParseError(e.to_string()))?;
        if raw.point_status.as_deref() == Some(NOT_IDENTIFIED) {
            return Ok(Self::not_identified());
        }
        raw.status.into_result()?;

        let points = raw
            .points
            .iter()
            .map(|p| Point::parse(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { ok: true, points })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPointResponse {
    status: Status,
    point_status: Option<String>,
    #[serde(default)]
    points: Vec<String>,
}
