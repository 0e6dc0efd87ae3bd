//! Dresden public transit (VVO) integration
//!
//! Client for the open-data web API of the Verkehrsverbund Oberelbe at
//! [webapi.vvo-online.de](https://webapi.vvo-online.de): point finder (stops,
//! addresses, POIs), departure monitor and trip planner.
//!
//! # Architecture
//!
//! [`VvoClient`] defines the interface, implemented over HTTP by
//! [`HttpVvoClient`]. Responses are decoded into plain value types
//! ([`Point`], [`Departure`], [`Route`], ...). The service speaks
//! Gauss-Krüger zone 4 coordinates and `/Date(ms+HHMM)/` timestamps; see
//! [`coordinates`] and [`time`] for the conversions.
//!
//! # Example
//!
//! ```rust,ignore
//! use integration_vvo::{DepartureOptions, HttpVvoClient, PointOptions, VvoClient, VvoConfig};
//!
//! let client = HttpVvoClient::new(&VvoConfig::load()?)?;
//!
//! let stops = client
//!     .find_stops(&"Postplatz".into(), &PointOptions::for_stops(Some(1)))
//!     .await?;
//! if let Some(stop) = stops.points.first() {
//!     let monitor = client
//!         .get_departures(stop.into(), &DepartureOptions::default())
//!         .await?;
//!     for departure in &monitor.departures {
//!         println!("{departure}");
//!     }
//! }
//! ```

mod client;
mod config;
pub mod coordinates;
mod departure;
mod envelope;
mod error;
mod point;
mod route;
pub mod time;

pub use client::{HttpVvoClient, VvoClient};
pub use config::VvoConfig;
pub use coordinates::GeoPosition;
pub use departure::{
    Departure, DepartureResponse, Platform, Punctuality, TransportMode, dedup_departures, has_more,
};
pub use envelope::{
    DEPARTURE_ENDPOINT, DepartureOptions, DepartureRequest, MaxChanges, POINT_FINDER_ENDPOINT,
    PointFinderRequest, PointOptions, PointQuery, RouteOptions, Status, StopRef, TRIP_ENDPOINT,
    TripRequest, failure_from_body,
};
pub use error::VvoError;
pub use point::{Point, PointId, PointKind, PointResponse};
pub use route::{PartialRoute, Route, RouteResponse, RouteStop, Vehicle};
pub use time::{format_timestamp, parse_timestamp};
