//! Gauss-Krüger zone 4 <-> WGS84 conversion
//!
//! The VVO API reports positions as integer easting/northing pairs in a
//! transverse Mercator projection on the Bessel 1841 ellipsoid (DHDN datum):
//!
//! ```text
//! +proj=tmerc +lat_0=0 +lon_0=12 +k=1 +x_0=4500000 +y_0=0 +ellps=bessel
//! +towgs84=598.1,73.7,418.2,0.202,0.045,-2.455,6.7 +units=m
//! ```
//!
//! The projection uses the third-order Krüger series, the datum change a
//! seven-parameter position-vector Helmert transformation on geocentric
//! coordinates. Both are accurate to millimetres inside the service area.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A reference ellipsoid given by semi-major axis and flattening
#[derive(Debug, Clone, Copy)]
struct Ellipsoid {
    a: f64,
    f: f64,
}

impl Ellipsoid {
    const fn e2(self) -> f64 {
        self.f * (2.0 - self.f)
    }
}

const BESSEL: Ellipsoid = Ellipsoid {
    a: 6_377_397.155,
    f: 1.0 / 299.152_812_8,
};

const WGS84: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    f: 1.0 / 298.257_223_563,
};

const CENTRAL_MERIDIAN_DEG: f64 = 12.0;
const SCALE_FACTOR: f64 = 1.0;
const FALSE_EASTING: f64 = 4_500_000.0;
const FALSE_NORTHING: f64 = 0.0;

/// DHDN -> WGS84 shift: translations in metres, rotations in arc seconds,
/// scale in ppm (position vector convention)
const TO_WGS84: [f64; 7] = [598.1, 73.7, 418.2, 0.202, 0.045, -2.455, 6.7];

/// A WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    /// Longitude in degrees
    pub longitude: f64,
    /// Latitude in degrees
    pub latitude: f64,
}

impl GeoPosition {
    /// Create a new position
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Convert a GK4 easting/northing pair
    #[must_use]
    pub fn from_gk4(easting: f64, northing: f64) -> Self {
        let (longitude, latitude) = unproject(easting, northing);
        Self {
            longitude,
            latitude,
        }
    }

    /// Project this position to GK4 easting/northing
    #[must_use]
    pub fn to_gk4(&self) -> (f64, f64) {
        project(self.longitude, self.latitude)
    }
}

impl fmt::Display for GeoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Project WGS84 longitude/latitude (degrees) to GK4 easting/northing (metres)
#[must_use]
pub fn project(longitude: f64, latitude: f64) -> (f64, f64) {
    let geocentric = geodetic_to_geocentric(WGS84, longitude.to_radians(), latitude.to_radians());
    let shifted = helmert_from_wgs84(geocentric);
    let (lon, lat) = geocentric_to_geodetic(BESSEL, shifted);
    tmerc_forward(BESSEL, lon, lat)
}

/// Unproject GK4 easting/northing (metres) to WGS84 longitude/latitude (degrees)
#[must_use]
pub fn unproject(easting: f64, northing: f64) -> (f64, f64) {
    let (lon, lat) = tmerc_inverse(BESSEL, easting, northing);
    let geocentric = geodetic_to_geocentric(BESSEL, lon, lat);
    let shifted = helmert_to_wgs84(geocentric);
    let (lon, lat) = geocentric_to_geodetic(WGS84, shifted);
    (lon.to_degrees(), lat.to_degrees())
}

/// Krüger series coefficients for a given ellipsoid
struct Kruger {
    /// Rectifying radius scaled by the central scale factor
    radius: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
    e: f64,
}

impl Kruger {
    fn new(ellipsoid: Ellipsoid) -> Self {
        let n = ellipsoid.f / (2.0 - ellipsoid.f);
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;

        Self {
            radius: SCALE_FACTOR * ellipsoid.a / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0),
            alpha: [
                n / 2.0 - 2.0 / 3.0 * n2 + 5.0 / 16.0 * n3,
                13.0 / 48.0 * n2 - 3.0 / 5.0 * n3,
                61.0 / 240.0 * n3,
            ],
            beta: [
                n / 2.0 - 2.0 / 3.0 * n2 + 37.0 / 96.0 * n3,
                1.0 / 48.0 * n2 + 1.0 / 15.0 * n3,
                17.0 / 480.0 * n3,
            ],
            delta: [
                2.0 * n - 2.0 / 3.0 * n2 - 2.0 * n3,
                7.0 / 3.0 * n2 - 8.0 / 5.0 * n3,
                56.0 / 15.0 * n3,
            ],
            e: ellipsoid.e2().sqrt(),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn tmerc_forward(ellipsoid: Ellipsoid, lon: f64, lat: f64) -> (f64, f64) {
    let k = Kruger::new(ellipsoid);
    let dlon = lon - CENTRAL_MERIDIAN_DEG.to_radians();

    // conformal latitude
    let sin_lat = lat.sin();
    let t = (sin_lat.atanh() - k.e * (k.e * sin_lat).atanh()).sinh();

    let xi_p = t.atan2(dlon.cos());
    let eta_p = (dlon.sin() / (1.0 + t * t).sqrt()).atanh();

    let mut xi = xi_p;
    let mut eta = eta_p;
    for (j, alpha) in k.alpha.iter().enumerate() {
        let m = 2.0 * (j + 1) as f64;
        xi += alpha * (m * xi_p).sin() * (m * eta_p).cosh();
        eta += alpha * (m * xi_p).cos() * (m * eta_p).sinh();
    }

    (FALSE_EASTING + k.radius * eta, FALSE_NORTHING + k.radius * xi)
}

#[allow(clippy::cast_precision_loss)]
fn tmerc_inverse(ellipsoid: Ellipsoid, easting: f64, northing: f64) -> (f64, f64) {
    let k = Kruger::new(ellipsoid);
    let xi = (northing - FALSE_NORTHING) / k.radius;
    let eta = (easting - FALSE_EASTING) / k.radius;

    let mut xi_p = xi;
    let mut eta_p = eta;
    for (j, beta) in k.beta.iter().enumerate() {
        let m = 2.0 * (j + 1) as f64;
        xi_p -= beta * (m * xi).sin() * (m * eta).cosh();
        eta_p -= beta * (m * xi).cos() * (m * eta).sinh();
    }

    let chi = (xi_p.sin() / eta_p.cosh()).asin();
    let mut lat = chi;
    for (j, delta) in k.delta.iter().enumerate() {
        let m = 2.0 * (j + 1) as f64;
        lat += delta * (m * chi).sin();
    }
    let lon = CENTRAL_MERIDIAN_DEG.to_radians() + eta_p.sinh().atan2(xi_p.cos());

    (lon, lat)
}

fn geodetic_to_geocentric(ellipsoid: Ellipsoid, lon: f64, lat: f64) -> [f64; 3] {
    let e2 = ellipsoid.e2();
    let n = ellipsoid.a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
    [
        n * lat.cos() * lon.cos(),
        n * lat.cos() * lon.sin(),
        n * (1.0 - e2) * lat.sin(),
    ]
}

/// Returns (lon, lat) in radians; the ellipsoidal height is discarded
fn geocentric_to_geodetic(ellipsoid: Ellipsoid, [x, y, z]: [f64; 3]) -> (f64, f64) {
    let e2 = ellipsoid.e2();
    let p = x.hypot(y);
    let lon = y.atan2(x);

    let mut lat = z.atan2(p * (1.0 - e2));
    for _ in 0..10 {
        let n = ellipsoid.a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
        let h = p / lat.cos() - n;
        let next = z.atan2(p * (1.0 - e2 * n / (n + h)));
        let converged = (next - lat).abs() < 1e-14;
        lat = next;
        if converged {
            break;
        }
    }

    (lon, lat)
}

/// Helmert parameters converted to metres / radians / unitless scale
fn helmert_params() -> ([f64; 3], [f64; 3], f64) {
    let arcsec = (1.0_f64 / 3600.0).to_radians();
    let [tx, ty, tz, rx, ry, rz, ppm] = TO_WGS84;
    (
        [tx, ty, tz],
        [rx * arcsec, ry * arcsec, rz * arcsec],
        1.0 + ppm * 1e-6,
    )
}

fn helmert_to_wgs84([x, y, z]: [f64; 3]) -> [f64; 3] {
    let ([tx, ty, tz], [rx, ry, rz], s) = helmert_params();
    [
        tx + s * (x - rz * y + ry * z),
        ty + s * (rz * x + y - rx * z),
        tz + s * (-ry * x + rx * y + z),
    ]
}

fn helmert_from_wgs84([x, y, z]: [f64; 3]) -> [f64; 3] {
    let ([tx, ty, tz], [rx, ry, rz], s) = helmert_params();
    let (x, y, z) = ((x - tx) / s, (y - ty) / s, (z - tz) / s);
    // transposed rotation; the neglected second-order terms stay below a millimetre
    [x + rz * y - ry * z, -rz * x + y + rx * z, ry * x - rx * y + z]
}
