//! Trip planner models
//!
//! A [`Route`] is made of [`PartialRoute`]s, each travelled with a single
//! [`Vehicle`] and calling at a list of [`RouteStop`]s.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::coordinates::GeoPosition;
use crate::departure::{Platform, Punctuality, TransportMode};
use crate::envelope::Envelope;
use crate::error::VvoError;
use crate::time::parse_timestamp;

/// Vehicle used for a partial route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Mode of transport
    pub mode: TransportMode,
    /// Direction / destination of the line (absent for walking)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Line name or number (absent for walking)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Identifiers of current line changes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<String>,
}

impl Vehicle {
    fn from_raw(raw: RawVehicle) -> Result<Self, VvoError> {
        Ok(Self {
            mode: raw.kind.parse()?,
            direction: raw.direction,
            name: raw.name,
            changes: raw.changes,
        })
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.direction) {
            (Some(name), Some(direction)) => write!(f, "{} {name} -> {direction}", self.mode),
            (Some(name), None) => write!(f, "{} {name}", self.mode),
            _ => write!(f, "{}", self.mode),
        }
    }
}

/// A regular stop on a partial route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStop {
    /// Name of the stop
    pub name: String,
    /// City or community of the stop
    pub place: String,
    /// Stop id, see [`crate::Point`]
    pub point_id: u64,
    /// Stop type as reported by the service (usually "Stop")
    pub kind: String,
    /// Scheduled arrival
    pub arrival_scheduled: NaiveDateTime,
    /// Real-time arrival
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_real_time: Option<NaiveDateTime>,
    /// Punctuality of the arrival
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_state: Option<Punctuality>,
    /// Scheduled departure
    pub departure_scheduled: NaiveDateTime,
    /// Real-time departure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_real_time: Option<NaiveDateTime>,
    /// Punctuality of the departure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_state: Option<Punctuality>,
    /// Platform where the vehicle stops
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    /// GK4 easting in metres
    pub easting: i64,
    /// GK4 northing in metres
    pub northing: i64,
}

impl RouteStop {
    /// Arrival time: real-time if known, else scheduled
    #[must_use]
    pub fn arrival(&self) -> NaiveDateTime {
        self.arrival_real_time.unwrap_or(self.arrival_scheduled)
    }

    /// Departure time: real-time if known, else scheduled
    #[must_use]
    pub fn departure(&self) -> NaiveDateTime {
        self.departure_real_time.unwrap_or(self.departure_scheduled)
    }

    /// WGS84 position, recomputed on every call
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn location(&self) -> GeoPosition {
        GeoPosition::from_gk4(self.easting as f64, self.northing as f64)
    }

    fn from_raw(raw: RawRouteStop) -> Result<Self, VvoError> {
        let point_id = raw.data_id.parse().map_err(|_| VvoError::InvalidField {
            field: "DataId",
            value: raw.data_id.clone(),
        })?;

        Ok(Self {
            name: raw.name,
            place: raw.place,
            point_id,
            kind: raw.kind,
            arrival_scheduled: parse_timestamp(&raw.arrival_time)?,
            arrival_real_time: parse_optional(raw.arrival_real_time.as_deref())?,
            arrival_state: raw
                .arrival_state
                .as_deref()
                .map(str::parse::<Punctuality>)
                .transpose()?,
            departure_scheduled: parse_timestamp(&raw.departure_time)?,
            departure_real_time: parse_optional(raw.departure_real_time.as_deref())?,
            departure_state: raw
                .departure_state
                .as_deref()
                .map(str::parse::<Punctuality>)
                .transpose()?,
            platform: raw.platform,
            easting: raw.longitude,
            northing: raw.latitude,
        })
    }
}

fn parse_optional(raw: Option<&str>) -> Result<Option<NaiveDateTime>, VvoError> {
    raw.map(parse_timestamp).transpose()
}

/// A section of a route travelled with one vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialRoute {
    /// Internal id of this section
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Duration in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    /// Vehicle used
    pub vehicle: Vehicle,
    /// Regular stops, in travel order
    pub stops: Vec<RouteStop>,
    /// Following departures of the same line
    pub next_departures: Vec<NaiveDateTime>,
    /// Preceding departures of the same line
    pub previous_departures: Vec<NaiveDateTime>,
}

impl PartialRoute {
    fn from_raw(raw: RawPartialRoute) -> Result<Self, VvoError> {
        let stops = raw
            .regular_stops
            .into_iter()
            .map(RouteStop::from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        let duration = raw.duration.or_else(|| infer_duration(&stops));

        Ok(Self {
            id: raw.partial_route_id,
            duration,
            vehicle: Vehicle::from_raw(raw.mot)?,
            stops,
            next_departures: parse_all(&raw.next_departure_times)?,
            previous_departures: parse_all(&raw.previous_departure_times)?,
        })
    }
}

fn parse_all(raw: &[String]) -> Result<Vec<NaiveDateTime>, VvoError> {
    raw.iter().map(|t| parse_timestamp(t)).collect()
}

/// Minutes between the first departure and the last arrival, halves
/// rounded to even
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn infer_duration(stops: &[RouteStop]) -> Option<i64> {
    let first = stops.first()?;
    let last = stops.last()?;
    let seconds = (last.arrival() - first.departure()).num_seconds();
    Some((seconds as f64 / 60.0).round_ties_even() as i64)
}

/// A complete route from origin to destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Duration in minutes
    pub duration: i64,
    /// Number of interchanges
    pub interchanges: u32,
    /// Sections of this route with different vehicles
    pub partial_routes: Vec<PartialRoute>,
    /// Chain of vehicles used, including implicit walks
    pub vehicles: Vec<Vehicle>,
}

impl Route {
    fn from_raw(raw: RawRoute) -> Result<Self, VvoError> {
        Ok(Self {
            duration: raw.duration,
            interchanges: raw.interchanges,
            partial_routes: raw
                .partial_routes
                .into_iter()
                .map(PartialRoute::from_raw)
                .collect::<Result<_, _>>()?,
            vehicles: raw
                .mot_chain
                .into_iter()
                .map(Vehicle::from_raw)
                .collect::<Result<_, _>>()?,
        })
    }

    /// Departure at the first stop of the route
    #[must_use]
    pub fn departure(&self) -> Option<NaiveDateTime> {
        self.partial_routes
            .iter()
            .find_map(|p| p.stops.first())
            .map(RouteStop::departure)
    }

    /// Arrival at the last stop of the route
    #[must_use]
    pub fn arrival(&self) -> Option<NaiveDateTime> {
        self.partial_routes
            .iter()
            .rev()
            .find_map(|p| p.stops.last())
            .map(RouteStop::arrival)
    }

    /// Format as a compact one-line summary
    #[must_use]
    pub fn format_summary(&self) -> String {
        let times = match (self.departure(), self.arrival()) {
            (Some(dep), Some(arr)) => format!("{} -> {} ", dep.format("%H:%M"), arr.format("%H:%M")),
            _ => String::new(),
        };
        let lines: Vec<&str> = self
            .vehicles
            .iter()
            .filter(|v| !v.mode.is_walking())
            .filter_map(|v| v.name.as_deref())
            .collect();

        format!(
            "{times}({}min, {} changes) {}",
            self.duration,
            self.interchanges,
            lines.join(" -> ")
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_summary())
    }
}

/// Response of the trip planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteResponse {
    /// False if the service reported a failure status
    pub ok: bool,
    /// Found routes; empty when `ok` is false
    pub routes: Vec<Route>,
}

impl RouteResponse {
    /// Create a response with no results
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            ok: false,
            routes: Vec::new(),
        }
    }

    /// Decode a trip planner JSON body
    ///
    /// A non-`Ok` status yields [`Self::empty`] instead of an error.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON, missing required fields, unknown modes and
    /// malformed timestamps.
    pub fn from_json(body: &str) -> Result<Self, VvoError> {
        let status = Envelope::status_of(body)?;
        if !status.is_ok() {
            warn!(code = %status.code, message = ?status.message, "Trip request not successful");
            return Ok(Self::empty());
        }

        let raw: RawRouteResponse =
            serde_json::from_str(body).map_err(|e| VvoError::ParseError(e.to_string()))?;
        let routes = raw
            .routes
            .into_iter()
            .map(Route::from_raw)
            .collect::<Result<_, _>>()?;

        Ok(Self { ok: true, routes })
    }
}

// --- Raw API response types for deserialization ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawRouteResponse {
    routes: Vec<RawRoute>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawRoute {
    duration: i64,
    interchanges: u32,
    partial_routes: Vec<RawPartialRoute>,
    mot_chain: Vec<RawVehicle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPartialRoute {
    partial_route_id: Option<i64>,
    duration: Option<i64>,
    mot: RawVehicle,
    #[serde(default)]
    regular_stops: Vec<RawRouteStop>,
    #[serde(default)]
    next_departure_times: Vec<String>,
    #[serde(default)]
    previous_departure_times: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawVehicle {
    #[serde(rename = "Type")]
    kind: String,
    direction: Option<String>,
    name: Option<String>,
    #[serde(default)]
    changes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawRouteStop {
    name: String,
    place: String,
    data_id: String,
    #[serde(rename = "Type")]
    kind: String,
    arrival_time: String,
    departure_time: String,
    arrival_real_time: Option<String>,
    departure_real_time: Option<String>,
    arrival_state: Option<String>,
    departure_state: Option<String>,
    platform: Option<Platform>,
    latitude: i64,
    longitude: i64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const T0: &str = "/Date(1644164100000-0000)/"; // 16:15
    const T2: &str = "/Date(1644164220000-0000)/"; // 16:17
    const T9: &str = "/Date(1644164640000-0000)/"; // 16:24
    const T10: &str = "/Date(1644164700000-0000)/"; // 16:25

    fn stop(name: &str, id: &str, arrival: &str, departure: &str) -> serde_json::Value {
        json!({
            "ArrivalTime": arrival,
            "DepartureTime": departure,
            "Place": "Dresden",
            "Name": name,
            "Type": "Stop",
            "DataId": id,
            "DhId": "de:14612:80",
            "Latitude": 5_658_653,
            "Longitude": 4_623_295,
            "CancelReasons": []
        })
    }

    fn bus_62() -> serde_json::Value {
        json!({
            "DlId": "de:vvo:21-62",
            "Type": "Bus",
            "Name": "62",
            "Direction": "Johannstadt",
            "Changes": ["13599", "12906"],
            "Diva": { "Number": "21062", "Network": "voe" }
        })
    }

    fn route_body(partial_routes: serde_json::Value) -> String {
        json!({
            "Status": { "Code": "Ok" },
            "Routes": [{
                "Duration": 12,
                "Interchanges": 0,
                "PartialRoutes": partial_routes,
                "MotChain": [bus_62(), { "Type": "Footpath" }]
            }]
        })
        .to_string()
    }

    #[test]
    fn test_parse_route() {
        let body = route_body(json!([{
            "PartialRouteId": 1,
            "Duration": 10,
            "Mot": bus_62(),
            "RegularStops": [
                stop("St.-Benno-Gymnasium", "33000080", T0, T0),
                stop("Pirnaischer Platz", "33000005", T10, T10)
            ],
            "NextDepartureTimes": [T10],
            "PreviousDepartureTimes": [T0, T2]
        }]));

        let response = RouteResponse::from_json(&body).unwrap();
        assert!(response.ok);
        assert_eq!(response.routes.len(), 1);

        let route = &response.routes[0];
        assert_eq!(route.duration, 12);
        assert_eq!(route.interchanges, 0);
        assert_eq!(route.vehicles.len(), 2);
        assert_eq!(route.vehicles[1].mode, TransportMode::Footpath);
        assert!(route.vehicles[1].name.is_none());

        let partial = &route.partial_routes[0];
        assert_eq!(partial.id, Some(1));
        assert_eq!(partial.duration, Some(10));
        assert_eq!(partial.vehicle.name.as_deref(), Some("62"));
        assert_eq!(partial.vehicle.changes.len(), 2);
        assert_eq!(partial.stops.len(), 2);
        assert_eq!(partial.stops[0].point_id, 33_000_080);
        assert_eq!(partial.stops[0].easting, 4_623_295);
        assert_eq!(partial.stops[0].northing, 5_658_653);
        assert_eq!(partial.next_departures.len(), 1);
        assert_eq!(partial.previous_departures.len(), 2);
    }

    #[test]
    fn test_duration_inferred_from_stops() {
        let mut first = stop("A", "1", T0, T0);
        first["DepartureRealTime"] = json!(T2);
        let mut last = stop("B", "2", T9, T9);
        last["ArrivalRealTime"] = json!(T10);

        let body = route_body(json!([{ "Mot": bus_62(), "RegularStops": [first, last] }]));
        let response = RouteResponse::from_json(&body).unwrap();
        let partial = &response.routes[0].partial_routes[0];

        // 16:17 (real) -> 16:25 (real)
        assert_eq!(partial.duration, Some(8));
        assert!(partial.id.is_none());
    }

    #[test]
    fn test_duration_inference_rounds() {
        let body = route_body(json!([{
            "Mot": bus_62(),
            "RegularStops": [
                stop("A", "1", T0, T0),
                stop("B", "2", "/Date(1644164790000-0000)/", "/Date(1644164790000-0000)/")
            ]
        }]));
        let response = RouteResponse::from_json(&body).unwrap();
        // 11.5 minutes
        assert_eq!(response.routes[0].partial_routes[0].duration, Some(12));
    }

    #[test]
    fn test_duration_inference_rounds_half_to_even() {
        let body = route_body(json!([{
            "Mot": bus_62(),
            "RegularStops": [
                stop("A", "1", T0, T0),
                stop("B", "2", "/Date(1644164250000-0000)/", "/Date(1644164250000-0000)/")
            ]
        }]));
        let response = RouteResponse::from_json(&body).unwrap();
        // 2.5 minutes
        assert_eq!(response.routes[0].partial_routes[0].duration, Some(2));
    }

    #[test]
    fn test_duration_absent_without_stops() {
        let body = route_body(json!([{ "Mot": { "Type": "Footpath" } }]));
        let response = RouteResponse::from_json(&body).unwrap();
        let partial = &response.routes[0].partial_routes[0];
        assert!(partial.duration.is_none());
        assert!(partial.stops.is_empty());
        assert!(partial.vehicle.direction.is_none());
    }

    #[test]
    fn test_route_stop_effective_times_and_state() {
        let mut raw = stop("A", "1", T0, T0);
        raw["ArrivalRealTime"] = json!(T2);
        raw["ArrivalState"] = json!("Delayed");
        raw["DepartureState"] = json!("InTime");
        raw["Platform"] = json!({ "Name": "2", "Type": "Platform" });

        let body = route_body(json!([{ "Mot": bus_62(), "RegularStops": [raw] }]));
        let response = RouteResponse::from_json(&body).unwrap();
        let stop = &response.routes[0].partial_routes[0].stops[0];

        assert_eq!(stop.arrival(), stop.arrival_real_time.unwrap());
        assert_eq!(stop.departure(), stop.departure_scheduled);
        assert_eq!(stop.arrival_state, Some(Punctuality::Delayed));
        assert_eq!(stop.departure_state, Some(Punctuality::InTime));
        assert_eq!(stop.platform.as_ref().unwrap().name, "2");

        let location = stop.location();
        assert!((51.0..51.1).contains(&location.latitude));
    }

    #[test]
    fn test_missing_vehicle_fails() {
        let body = route_body(json!([{ "RegularStops": [] }]));
        let err = RouteResponse::from_json(&body).unwrap_err();
        assert!(err.to_string().contains("Mot"));
    }

    #[test]
    fn test_missing_stop_time_fails() {
        let mut raw = stop("A", "1", T0, T0);
        raw.as_object_mut().unwrap().remove("ArrivalTime");
        let body = route_body(json!([{ "Mot": bus_62(), "RegularStops": [raw] }]));
        let err = RouteResponse::from_json(&body).unwrap_err();
        assert!(err.to_string().contains("ArrivalTime"));
    }

    #[test]
    fn test_non_numeric_data_id_fails() {
        let body = route_body(json!([{ "Mot": bus_62(), "RegularStops": [stop("A", "x", T0, T0)] }]));
        assert!(matches!(
            RouteResponse::from_json(&body),
            Err(VvoError::InvalidField { field: "DataId", .. })
        ));
    }

    #[test]
    fn test_failed_status_yields_empty_routes() {
        let body = r#"{"Status":{"Code":"ServiceError","Message":"no trips"}}"#;
        let response = RouteResponse::from_json(body).unwrap();
        assert!(!response.ok);
        assert!(response.routes.is_empty());
    }

    #[test]
    fn test_format_summary() {
        let body = route_body(json!([{
            "Mot": bus_62(),
            "RegularStops": [stop("A", "1", T0, T0), stop("B", "2", T10, T10)]
        }]));
        let response = RouteResponse::from_json(&body).unwrap();
        let summary = response.routes[0].format_summary();
        assert_eq!(summary, "16:15 -> 16:25 (12min, 0 changes) 62");
    }

    #[test]
    fn test_vehicle_display() {
        let vehicle = Vehicle {
            mode: TransportMode::Bus,
            direction: Some("Johannstadt".to_string()),
            name: Some("62".to_string()),
            changes: Vec::new(),
        };
        assert_eq!(vehicle.to_string(), "Bus 62 -> Johannstadt");
    }
}
