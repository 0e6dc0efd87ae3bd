//! Request and response envelope
//!
//! Every response carries a `Status` object; every request is a JSON object
//! of named parameters. This module owns both ends: status decoding and the
//! normalization of typed query options into the wire parameters.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::coordinates::GeoPosition;
use crate::departure::TransportMode;
use crate::error::VvoError;
use crate::point::Point;

/// Point finder endpoint
pub const POINT_FINDER_ENDPOINT: &str = "tr/pointfinder";
/// Departure monitor endpoint
pub const DEPARTURE_ENDPOINT: &str = "dm";
/// Trip planner endpoint
pub const TRIP_ENDPOINT: &str = "tr/trips";

const OK_CODE: &str = "Ok";

/// Status object present on every response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Status {
    /// Status code, `Ok` on success
    pub code: String,
    /// Optional message, usually only set on failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Status {
    /// Whether the status reports success
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == OK_CODE
    }

    /// Turn a failure status into [`VvoError::Status`]
    ///
    /// # Errors
    ///
    /// Returns an error unless the code is `Ok`.
    pub fn into_result(self) -> Result<Self, VvoError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(VvoError::Status {
                code: self.code,
                message: self.message,
            })
        }
    }
}

/// The part of a response shared by all endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Envelope {
    pub status: Status,
}

impl Envelope {
    /// Decode only the status of a response body
    pub(crate) fn status_of(body: &str) -> Result<Status, VvoError> {
        serde_json::from_str::<Self>(body)
            .map(|e| e.status)
            .map_err(|e| VvoError::ParseError(e.to_string()))
    }
}

/// Map a non-2xx transport response to an error
///
/// Uses the embedded status code and message when the body carries one.
pub fn failure_from_body(http_status: impl fmt::Display, body: &str) -> VvoError {
    match serde_json::from_str::<Envelope>(body) {
        Ok(Envelope { status }) => VvoError::Status {
            code: status.code,
            message: status.message,
        },
        Err(_) => VvoError::RequestFailed(format!("HTTP {http_status}")),
    }
}

/// A stop given either by id or as a point finder result
#[derive(Debug, Clone, Copy)]
pub enum StopRef<'a> {
    /// Bare stop id
    Id(u64),
    /// A point that must be a stop
    Point(&'a Point),
}

impl StopRef<'_> {
    /// Resolve to the bare stop id
    ///
    /// # Errors
    ///
    /// Returns [`VvoError::NotAStop`] for points that are not stops.
    pub fn resolve(&self) -> Result<u64, VvoError> {
        match self {
            Self::Id(id) => Ok(*id),
            Self::Point(point) => point
                .stop_id()
                .filter(|_| point.is_stop())
                .ok_or_else(|| VvoError::NotAStop(point.name.clone())),
        }
    }
}

impl From<u64> for StopRef<'_> {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl<'a> From<&'a Point> for StopRef<'a> {
    fn from(point: &'a Point) -> Self {
        Self::Point(point)
    }
}

/// What to look for in the point finder
#[derive(Debug, Clone, PartialEq)]
pub enum PointQuery {
    /// Free text, e.g. a stop name
    Text(String),
    /// A stop id
    Id(u64),
    /// Points around a WGS84 position
    Location(GeoPosition),
}

impl PointQuery {
    /// Wire form of the query
    #[allow(clippy::cast_possible_truncation)] // rounded GK4 metres
    fn to_wire(&self) -> Result<String, VvoError> {
        match self {
            Self::Text(text) if text.trim().is_empty() => Err(VvoError::InvalidQuery(
                "search query must not be empty".to_string(),
            )),
            Self::Text(text) => Ok(text.clone()),
            Self::Id(id) => Ok(id.to_string()),
            Self::Location(position) => {
                let (easting, northing) = position.to_gk4();
                Ok(format!(
                    "coord:{}:{}",
                    easting.round() as i64,
                    northing.round() as i64
                ))
            }
        }
    }

    const fn is_location(&self) -> bool {
        matches!(self, Self::Location(_))
    }
}

impl From<&str> for PointQuery {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<u64> for PointQuery {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl From<GeoPosition> for PointQuery {
    fn from(position: GeoPosition) -> Self {
        Self::Location(position)
    }
}

/// Point finder options
#[allow(clippy::struct_excessive_bools)] // mirrors the API flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointOptions {
    /// Maximum number of results
    pub limit: Option<u32>,
    /// Only return stops
    pub stops_only: bool,
    /// Only return regional stops (text queries)
    pub regional_only: bool,
    /// Include stop shortcuts
    pub shortcuts: bool,
    /// Include stops assigned to the coordinate (location queries only)
    pub assigned_stops: bool,
}

impl PointOptions {
    /// Regional stop lookup without shortcuts
    #[must_use]
    pub fn for_stops(limit: Option<u32>) -> Self {
        Self {
            limit,
            stops_only: true,
            regional_only: true,
            ..Self::default()
        }
    }
}

/// Maximum number of interchanges for a trip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaxChanges {
    /// Direct connections only
    #[serde(rename = "None")]
    Zero,
    /// At most one interchange
    One,
    /// At most two interchanges
    Two,
    /// No restriction
    #[default]
    Unlimited,
}

impl MaxChanges {
    /// Closest supported setting for an interchange count
    #[must_use]
    pub const fn from_count(count: u32) -> Self {
        match count {
            0 => Self::Zero,
            1 => Self::One,
            2 => Self::Two,
            _ => Self::Unlimited,
        }
    }
}

/// Departure monitor options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartureOptions {
    /// Maximum number of results
    pub limit: Option<u32>,
    /// Reference time, local wall clock
    pub time: Option<NaiveDateTime>,
    /// Interpret `time` as arrival instead of departure
    pub is_arrival: Option<bool>,
    /// Include short term changes
    pub short_term_changes: Option<bool>,
    /// Allowed modes of transport
    pub modes: Option<Vec<TransportMode>>,
}

/// Trip planner options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOptions {
    /// Maximum number of results
    pub limit: Option<u32>,
    /// Reference time, local wall clock
    pub time: Option<NaiveDateTime>,
    /// Interpret `time` as arrival instead of departure
    pub is_arrival_time: Option<bool>,
    /// Include short term changes
    pub short_term_changes: Option<bool>,
    /// Allowed modes of transport
    pub modes: Option<Vec<TransportMode>>,
    /// Maximum number of interchanges
    pub max_changes: MaxChanges,
}

fn check_limit(limit: Option<u32>) -> Result<(), VvoError> {
    if limit == Some(0) {
        return Err(VvoError::InvalidQuery(
            "limit must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Body of a point finder request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointFinderRequest {
    pub(crate) query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) limit: Option<u32>,
    pub(crate) stops_only: bool,
    pub(crate) regional_only: bool,
    pub(crate) stop_shortcuts: bool,
    #[serde(rename = "assignedstops", skip_serializing_if = "Option::is_none")]
    pub(crate) assigned_stops: Option<bool>,
}

impl PointFinderRequest {
    /// Build and validate a point finder request
    ///
    /// # Errors
    ///
    /// Returns [`VvoError::InvalidQuery`] for empty text, a zero limit, or
    /// `assigned_stops` on a non-location query.
    pub fn new(query: &PointQuery, options: &PointOptions) -> Result<Self, VvoError> {
        check_limit(options.limit)?;
        if options.assigned_stops && !query.is_location() {
            return Err(VvoError::InvalidQuery(
                "assigned stops are only available for location queries".to_string(),
            ));
        }

        Ok(Self {
            query: query.to_wire()?,
            limit: options.limit,
            stops_only: options.stops_only,
            regional_only: options.regional_only,
            stop_shortcuts: options.shortcuts,
            assigned_stops: query.is_location().then_some(options.assigned_stops),
        })
    }
}

/// Body of a departure monitor request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartureRequest {
    #[serde(rename = "stopid")]
    pub(crate) stop_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) time: Option<NaiveDateTime>,
    #[serde(rename = "isarrival", skip_serializing_if = "Option::is_none")]
    pub(crate) is_arrival: Option<bool>,
    #[serde(rename = "shorttermchanges", skip_serializing_if = "Option::is_none")]
    pub(crate) short_term_changes: Option<bool>,
    #[serde(rename = "mot", skip_serializing_if = "Option::is_none")]
    pub(crate) modes: Option<Vec<TransportMode>>,
}

impl DepartureRequest {
    /// Build and validate a departure monitor request
    ///
    /// # Errors
    ///
    /// Returns [`VvoError::NotAStop`] if `stop` is a non-stop point and
    /// [`VvoError::InvalidQuery`] for a zero limit.
    pub fn new(stop: StopRef<'_>, options: &DepartureOptions) -> Result<Self, VvoError> {
        check_limit(options.limit)?;
        Ok(Self {
            stop_id: stop.resolve()?,
            limit: options.limit,
            time: options.time,
            is_arrival: options.is_arrival,
            short_term_changes: options.short_term_changes,
            modes: options.modes.clone(),
        })
    }

    /// Requested result limit
    #[must_use]
    pub const fn limit(&self) -> Option<u32> {
        self.limit
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StandardSettings {
    pub(crate) max_changes: MaxChanges,
    #[serde(rename = "mot", skip_serializing_if = "Option::is_none")]
    pub(crate) modes: Option<Vec<TransportMode>>,
}

/// Body of a trip planner request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripRequest {
    pub(crate) origin: u64,
    pub(crate) destination: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) time: Option<NaiveDateTime>,
    #[serde(rename = "isarrivaltime", skip_serializing_if = "Option::is_none")]
    pub(crate) is_arrival_time: Option<bool>,
    #[serde(rename = "shorttermchanges", skip_serializing_if = "Option::is_none")]
    pub(crate) short_term_changes: Option<bool>,
    #[serde(rename = "standardSettings")]
    pub(crate) standard_settings: StandardSettings,
}

impl TripRequest {
    /// Build and validate a trip planner request
    ///
    /// # Errors
    ///
    /// Returns [`VvoError::NotAStop`] if either end is a non-stop point and
    /// [`VvoError::InvalidQuery`] for a zero limit.
    pub fn new(
        origin: StopRef<'_>,
        destination: StopRef<'_>,
        options: &RouteOptions,
    ) -> Result<Self, VvoError> {
        check_limit(options.limit)?;
        Ok(Self {
            origin: origin.resolve()?,
            destination: destination.resolve()?,
            limit: options.limit,
            time: options.time,
            is_arrival_time: options.is_arrival_time,
            short_term_changes: options.short_term_changes,
            standard_settings: StandardSettings {
                max_changes: options.max_changes,
                modes: options.modes.clone(),
            },
        })
    }
}
