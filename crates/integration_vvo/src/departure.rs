//! Departure monitor models
//!
//! Typed departures as returned by the `dm` endpoint, including the
//! derived delay and countdown values.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::envelope::Envelope;
use crate::error::VvoError;
use crate::time::parse_timestamp;

/// Mode of transport as named by the VVO API
///
/// The `Footpath` and `Mobility*` modes only appear in trip plans; do not
/// request them from the departure monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportMode {
    /// Bus
    Bus,
    /// Tram / Straßenbahn
    Tram,
    /// Train
    Train,
    /// Ferry
    Ferry,
    /// City bus
    CityBus,
    /// PlusBus
    PlusBus,
    /// Clock-face bus (e.g. line N)
    ClockBus,
    /// Cable car / funicular
    Cableway,
    /// Intercity bus
    IntercityBus,
    /// S-Bahn
    SuburbanRailway,
    /// On-demand shared taxi
    HailedSharedTaxi,
    /// RegionalExpress
    RapidTransit,
    /// Walking
    Footpath,
    /// Stairs up
    #[serde(rename = "MobilityStairsUp")]
    StairwayUp,
    /// Stairs down
    #[serde(rename = "MobilityStairsDown")]
    StairwayDown,
    /// Ramp up
    #[serde(rename = "MobilityRampUp")]
    RampUp,
    /// Ramp down
    #[serde(rename = "MobilityRampDown")]
    RampDown,
}

impl TransportMode {
    /// All modes, in wire order
    pub const ALL: [Self; 17] = [
        Self::Bus,
        Self::Tram,
        Self::Train,
        Self::Ferry,
        Self::CityBus,
        Self::PlusBus,
        Self::ClockBus,
        Self::Cableway,
        Self::IntercityBus,
        Self::SuburbanRailway,
        Self::HailedSharedTaxi,
        Self::RapidTransit,
        Self::Footpath,
        Self::StairwayUp,
        Self::StairwayDown,
        Self::RampUp,
        Self::RampDown,
    ];

    /// Wire name of this mode
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bus => "Bus",
            Self::Tram => "Tram",
            Self::Train => "Train",
            Self::Ferry => "Ferry",
            Self::CityBus => "CityBus",
            Self::PlusBus => "PlusBus",
            Self::ClockBus => "ClockBus",
            Self::Cableway => "Cableway",
            Self::IntercityBus => "IntercityBus",
            Self::SuburbanRailway => "SuburbanRailway",
            Self::HailedSharedTaxi => "HailedSharedTaxi",
            Self::RapidTransit => "RapidTransit",
            Self::Footpath => "Footpath",
            Self::StairwayUp => "MobilityStairsUp",
            Self::StairwayDown => "MobilityStairsDown",
            Self::RampUp => "MobilityRampUp",
            Self::RampDown => "MobilityRampDown",
        }
    }

    /// Whether this mode is covered on foot
    #[must_use]
    pub const fn is_walking(&self) -> bool {
        matches!(
            self,
            Self::Footpath | Self::StairwayUp | Self::StairwayDown | Self::RampUp | Self::RampDown
        )
    }
}

impl FromStr for TransportMode {
    type Err = VvoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| VvoError::UnknownTransportMode(s.to_string()))
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Punctuality of a scheduled event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Punctuality {
    /// On time
    #[default]
    InTime,
    /// Delayed
    Delayed,
}

impl FromStr for Punctuality {
    type Err = VvoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "InTime" => Ok(Self::InTime),
            "Delayed" => Ok(Self::Delayed),
            other => Err(VvoError::UnknownPunctuality(other.to_string())),
        }
    }
}

/// Platform where a vehicle stops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Platform {
    /// Platform name, e.g. "2"
    pub name: String,
    /// Platform kind, e.g. "Platform" or "Railtrack"
    #[serde(rename = "Type")]
    pub kind: String,
}

/// A single departure from a stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Departure {
    /// Departure identifier
    pub id: String,
    /// Mode of transport
    pub mode: TransportMode,
    /// Line name / number
    pub line_name: String,
    /// Direction of the line
    pub direction: String,
    /// Punctuality state
    pub state: Punctuality,
    /// Scheduled departure, local time
    pub scheduled: NaiveDateTime,
    /// Real-time departure, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_time: Option<NaiveDateTime>,
    /// Departure platform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    /// Identifiers of route changes affecting this departure
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route_changes: Vec<String>,
}

impl Departure {
    /// Decode a single departure record
    ///
    /// # Errors
    ///
    /// Fails on missing required fields, unknown modes or states, and
    /// malformed timestamps.
    pub fn from_json(record: &str) -> Result<Self, VvoError> {
        let raw: RawDeparture =
            serde_json::from_str(record).map_err(|e| VvoError::ParseError(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Convert a raw record to a typed departure
    fn from_raw(raw: RawDeparture) -> Result<Self, VvoError> {
        Ok(Self {
            id: raw.id,
            mode: raw.mot.parse()?,
            line_name: raw.line_name,
            direction: raw.direction,
            state: raw
                .state
                .as_deref()
                .map(str::parse::<Punctuality>)
                .transpose()?
                .unwrap_or_default(),
            scheduled: parse_timestamp(&raw.scheduled_time)?,
            real_time: raw.real_time.as_deref().map(parse_timestamp).transpose()?,
            platform: raw.platform,
            route_changes: raw.route_changes,
        })
    }

    /// Delay in seconds, 0 without real-time data
    #[must_use]
    pub fn delay(&self) -> i64 {
        self.real_time
            .map_or(0, |real| (real - self.scheduled).num_seconds())
    }

    /// Seconds from `now` until the (delayed) departure
    #[must_use]
    pub fn seconds_until(&self, now: NaiveDateTime) -> i64 {
        (self.scheduled - now).num_seconds() + self.delay()
    }

    /// Seconds from the current local time until the (delayed) departure
    #[must_use]
    pub fn seconds_until_now(&self) -> i64 {
        self.seconds_until(Local::now().naive_local())
    }

    /// Actual departure time: real-time if known, else scheduled
    #[must_use]
    pub fn departure_time(&self) -> NaiveDateTime {
        self.real_time.unwrap_or(self.scheduled)
    }
}

impl fmt::Display for Departure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} -> {}",
            self.departure_time().format("%H:%M"),
            self.mode,
            self.line_name,
            self.direction
        )?;
        match self.delay() / 60 {
            0 => Ok(()),
            minutes => write!(f, " ({minutes:+}min)"),
        }
    }
}

/// Collapse departures sharing (id, scheduled time)
///
/// The last occurrence wins and takes the position of the first one, so
/// non-duplicates keep their relative order.
#[must_use]
pub fn dedup_departures(departures: Vec<Departure>) -> Vec<Departure> {
    let mut seen: HashMap<(String, NaiveDateTime), usize> = HashMap::new();
    let mut unique: Vec<Departure> = Vec::with_capacity(departures.len());

    for departure in departures {
        let key = (departure.id.clone(), departure.scheduled);
        if let Some(&index) = seen.get(&key) {
            debug!(id = %departure.id, "Replacing duplicate departure");
            unique[index] = departure;
        } else {
            seen.insert(key, unique.len());
            unique.push(departure);
        }
    }

    unique
}

/// Response of the departure monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartureResponse {
    /// Name of the stop
    pub name: String,
    /// City of the stop
    pub place: String,
    /// Deduplicated departures in service order
    pub departures: Vec<Departure>,
    /// True if more results can be queried
    pub more: bool,
}

impl DepartureResponse {
    /// Decode a departure monitor JSON body
    ///
    /// `limit` is the limit sent with the request and drives [`Self::more`].
    ///
    /// # Errors
    ///
    /// Returns [`VvoError::Status`] for a non-`Ok` status and decode errors
    /// for malformed records.
    pub fn from_json(body: &str, limit: Option<u32>) -> Result<Self, VvoError> {
        Envelope::status_of(body)?.into_result()?;

        let raw: RawDepartureResponse =
            serde_json::from_str(body).map_err(|e| VvoError::ParseError(e.to_string()))?;

        let returned = raw.departures.len();
        let departures = raw
            .departures
            .into_iter()
            .map(Departure::from_raw)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: raw.name,
            place: raw.place,
            departures: dedup_departures(departures),
            more: has_more(limit, returned),
        })
    }
}

/// True exactly when a limit was requested and fully used
#[must_use]
pub fn has_more(limit: Option<u32>, returned: usize) -> bool {
    limit.is_some_and(|limit| usize::try_from(limit).is_ok_and(|limit| limit == returned))
}

// --- Raw API response types for deserialization ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDepartureResponse {
    name: String,
    place: String,
    #[serde(default)]
    departures: Vec<RawDeparture>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDeparture {
    id: String,
    mot: String,
    line_name: String,
    direction: String,
    state: Option<String>,
    scheduled_time: String,
    real_time: Option<String>,
    platform: Option<Platform>,
    #[serde(default)]
    route_changes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeDelta};

    use super::*;
    use crate::time::format_timestamp;

    const BUS_62: &str = r#"{"Id":"1","Mot":"Bus","LineName":"62","Direction":"Johannstadt","ScheduledTime":"/Date(1644164100000-0000)/"}"#;

    fn sample(id: &str, scheduled_ms: i64, line: &str) -> String {
        format!(
            r#"{{"Id":"{id}","Mot":"Tram","LineName":"{line}","Direction":"Prohlis","ScheduledTime":"/Date({scheduled_ms}-0000)/"}}"#
        )
    }

    fn response_json(departures: &[String]) -> String {
        format!(
            r#"{{"Name":"Postplatz","Place":"Dresden","Status":{{"Code":"Ok"}},"Departures":[{}]}}"#,
            departures.join(",")
        )
    }

    #[test]
    fn test_departure_without_real_time() {
        let departure = Departure::from_json(BUS_62).unwrap();
        assert_eq!(departure.id, "1");
        assert_eq!(departure.mode, TransportMode::Bus);
        assert_eq!(departure.line_name, "62");
        assert_eq!(departure.direction, "Johannstadt");
        assert_eq!(departure.state, Punctuality::InTime);
        assert!(departure.real_time.is_none());
        assert_eq!(departure.delay(), 0);
    }

    #[test]
    fn test_departure_with_delay() {
        let json = r#"{"Id":"1","Mot":"Tram","LineName":"1","Direction":"Leutewitz","State":"Delayed","ScheduledTime":"/Date(1644164100000-0000)/","RealTime":"/Date(1644164400000-0000)/","Platform":{"Name":"3","Type":"Platform"},"RouteChanges":["13599"]}"#;
        let departure = Departure::from_json(json).unwrap();
        assert_eq!(departure.delay(), 300);
        assert_eq!(departure.state, Punctuality::Delayed);
        assert_eq!(departure.platform.as_ref().unwrap().name, "3");
        assert_eq!(departure.platform.as_ref().unwrap().kind, "Platform");
        assert_eq!(departure.route_changes, vec!["13599".to_string()]);
        assert_eq!(departure.departure_time(), departure.real_time.unwrap());
    }

    #[test]
    fn test_seconds_until() {
        let json = r#"{"Id":"1","Mot":"Tram","LineName":"1","Direction":"Leutewitz","ScheduledTime":"/Date(1644164100000-0000)/","RealTime":"/Date(1644164400000-0000)/"}"#;
        let departure = Departure::from_json(json).unwrap();
        let now = departure.scheduled - TimeDelta::minutes(10);
        assert_eq!(departure.seconds_until(now), 600 + 300);
        assert_eq!(departure.seconds_until(departure.scheduled), 300);
    }

    #[test]
    fn test_unknown_mode() {
        let json = BUS_62.replace("\"Bus\"", "\"Zeppelin\"");
        let err = Departure::from_json(&json).unwrap_err();
        assert!(matches!(err, VvoError::UnknownTransportMode(ref mode) if mode == "Zeppelin"));
    }

    #[test]
    fn test_missing_field_is_named() {
        let json = r#"{"Id":"1","Mot":"Bus","LineName":"62","ScheduledTime":"/Date(1644164100000-0000)/"}"#;
        let err = Departure::from_json(json).unwrap_err();
        assert!(err.to_string().contains("Direction"));
    }

    #[test]
    fn test_bad_timestamp() {
        let json = BUS_62.replace("/Date(1644164100000-0000)/", "tomorrow");
        assert!(matches!(
            Departure::from_json(&json),
            Err(VvoError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_transport_mode_round_trip() {
        for mode in TransportMode::ALL {
            assert_eq!(mode.as_str().parse::<TransportMode>().unwrap(), mode);
            assert_eq!(
                serde_json::to_string(&mode).unwrap(),
                format!("\"{}\"", mode.as_str())
            );
        }
        assert!(TransportMode::StairwayUp.is_walking());
        assert!(!TransportMode::Tram.is_walking());
    }

    #[test]
    fn test_response_dedup_last_wins() {
        let departures = vec![
            sample("a", 1_644_164_100_000, "1"),
            sample("b", 1_644_164_100_000, "2"),
            sample("a", 1_644_164_100_000, "11"),
            sample("a", 1_644_164_700_000, "1"),
        ];
        let response = DepartureResponse::from_json(&response_json(&departures), None).unwrap();

        assert_eq!(response.name, "Postplatz");
        assert_eq!(response.place, "Dresden");
        assert_eq!(response.departures.len(), 3);
        assert_eq!(response.departures[0].id, "a");
        assert_eq!(response.departures[0].line_name, "11");
        assert_eq!(response.departures[1].id, "b");
        assert_eq!(response.departures[2].line_name, "1");
        assert!(!response.more);
    }

    #[test]
    fn test_response_more_flag() {
        let departures = vec![
            sample("a", 1_644_164_100_000, "1"),
            sample("a", 1_644_164_100_000, "1"),
        ];
        let body = response_json(&departures);
        assert!(DepartureResponse::from_json(&body, Some(2)).unwrap().more);
        assert!(!DepartureResponse::from_json(&body, Some(3)).unwrap().more);
        assert!(!DepartureResponse::from_json(&body, None).unwrap().more);
    }

    #[test]
    fn test_response_error_status() {
        let body = r#"{"Status":{"Code":"ServiceError","Message":"stop unknown"}}"#;
        let err = DepartureResponse::from_json(body, None).unwrap_err();
        assert!(matches!(err, VvoError::Status { ref code, .. } if code == "ServiceError"));
    }

    #[test]
    fn test_has_more() {
        assert!(has_more(Some(5), 5));
        assert!(!has_more(Some(5), 4));
        assert!(!has_more(None, 0));
        assert!(!has_more(None, 5));
    }

    #[test]
    fn test_display() {
        let local = NaiveDate::from_ymd_opt(2022, 2, 6)
            .unwrap()
            .and_hms_opt(17, 15, 0)
            .unwrap();
        let json = format!(
            r#"{{"Id":"1","Mot":"Tram","LineName":"7","Direction":"Weixdorf","ScheduledTime":"{}","RealTime":"{}"}}"#,
            format_timestamp(local, 60),
            format_timestamp(local + TimeDelta::minutes(2), 60)
        );
        let departure = Departure::from_json(&json).unwrap();
        assert_eq!(departure.to_string(), "17:17 Tram 7 -> Weixdorf (+2min)");
    }

    #[test]
    fn test_display_hides_sub_minute_delay() {
        let local = NaiveDate::from_ymd_opt(2022, 2, 6)
            .unwrap()
            .and_hms_opt(17, 15, 0)
            .unwrap();
        let json = format!(
            r#"{{"Id":"1","Mot":"Tram","LineName":"7","Direction":"Weixdorf","ScheduledTime":"{}","RealTime":"{}"}}"#,
            format_timestamp(local, 60),
            format_timestamp(local - TimeDelta::seconds(30), 60)
        );
        let departure = Departure::from_json(&json).unwrap();
        assert_eq!(departure.delay(), -30);
        assert_eq!(departure.to_string(), "17:14 Tram 7 -> Weixdorf");
    }
}
