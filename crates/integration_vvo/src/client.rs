//! VVO web API client
//!
//! Every operation is a single JSON POST against one of the
//! [webapi.vvo-online.de](https://webapi.vvo-online.de) endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::VvoConfig;
use crate::departure::DepartureResponse;
use crate::envelope::{
    DEPARTURE_ENDPOINT, DepartureOptions, DepartureRequest, POINT_FINDER_ENDPOINT,
    PointFinderRequest, PointOptions, PointQuery, RouteOptions, StopRef, TRIP_ENDPOINT,
    TripRequest, failure_from_body,
};
use crate::error::VvoError;
use crate::point::PointResponse;
use crate::route::RouteResponse;

/// Query used by [`VvoClient::is_healthy`]
const HEALTH_PROBE_QUERY: &str = "Postplatz";

/// Trait for VVO web API clients
#[async_trait]
pub trait VvoClient: Send + Sync {
    /// Look up stops, addresses and POIs
    async fn find_points(
        &self,
        query: &PointQuery,
        options: &PointOptions,
    ) -> Result<PointResponse, VvoError>;

    /// Look up stops only
    ///
    /// `stops_only` is forced on and location queries ask for the stops
    /// assigned to that location; limit, regional and shortcut flags are
    /// taken from `options`. See [`PointOptions::for_stops`] for the usual
    /// regional lookup.
    async fn find_stops(
        &self,
        query: &PointQuery,
        options: &PointOptions,
    ) -> Result<PointResponse, VvoError> {
        let options = PointOptions {
            stops_only: true,
            assigned_stops: matches!(query, PointQuery::Location(_)),
            ..options.clone()
        };
        self.find_points(query, &options).await
    }

    /// Fetch the departure monitor of a stop
    async fn get_departures(
        &self,
        stop: StopRef<'_>,
        options: &DepartureOptions,
    ) -> Result<DepartureResponse, VvoError>;

    /// Plan routes between two stops
    async fn find_routes(
        &self,
        origin: StopRef<'_>,
        destination: StopRef<'_>,
        options: &RouteOptions,
    ) -> Result<RouteResponse, VvoError>;

    /// Check if the VVO service is reachable
    async fn is_healthy(&self) -> bool;
}

/// VVO client over HTTP
#[derive(Debug)]
pub struct HttpVvoClient {
    client: Client,
    config: VvoConfig,
}

impl HttpVvoClient {
    /// Create a new VVO client
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: &VvoConfig) -> Result<Self, VvoError> {
        config.validate().map_err(VvoError::ConfigurationError)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| VvoError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// The configuration this client was built from
    #[must_use]
    pub const fn config(&self) -> &VvoConfig {
        &self.config
    }

    /// POST a JSON body and return the successful response body
    async fn post<T>(&self, endpoint: &str, body: &T) -> Result<String, VvoError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let url = self.config.endpoint_url(endpoint);
        debug!(%url, "Sending VVO request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VvoError::Timeout {
                        timeout_secs: self.config.timeout_secs,
                    }
                } else {
                    VvoError::ConnectionFailed(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| VvoError::ParseError(e.to_string()))?;

        if !status.is_success() {
            warn!(%status, %url, "VVO request failed");
            return Err(failure_from_body(status, &text));
        }

        Ok(text)
    }
}

#[async_trait]
impl VvoClient for HttpVvoClient {
    #[instrument(skip(self))]
    async fn find_points(
        &self,
        query: &PointQuery,
        options: &PointOptions,
    ) -> Result<PointResponse, VvoError> {
        let request = PointFinderRequest::new(query, options)?;
        let body = self.post(POINT_FINDER_ENDPOINT, &request).await?;
        let result = PointResponse::from_json(&body)?;

        if !result.ok {
            debug!("Query not identified");
        }

        debug!(count = result.points.len(), "Points found");
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn get_departures(
        &self,
        stop: StopRef<'_>,
        options: &DepartureOptions,
    ) -> Result<DepartureResponse, VvoError> {
        let request = DepartureRequest::new(stop, options)?;
        let body = self.post(DEPARTURE_ENDPOINT, &request).await?;
        let result = DepartureResponse::from_json(&body, request.limit())?;

        debug!(
            count = result.departures.len(),
            more = result.more,
            "Departures found"
        );
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn find_routes(
        &self,
        origin: StopRef<'_>,
        destination: StopRef<'_>,
        options: &RouteOptions,
    ) -> Result<RouteResponse, VvoError> {
        let request = TripRequest::new(origin, destination, options)?;
        let body = self.post(TRIP_ENDPOINT, &request).await?;
        let result = RouteResponse::from_json(&body)?;

        if result.routes.is_empty() {
            warn!("No routes found");
        }

        debug!(count = result.routes.len(), "Routes found");
        Ok(result)
    }

    async fn is_healthy(&self) -> bool {
        let options = PointOptions {
            limit: Some(1),
            ..PointOptions::default()
        };
        self.find_points(&PointQuery::from(HEALTH_PROBE_QUERY), &options)
            .await
            .is_ok()
    }
}
