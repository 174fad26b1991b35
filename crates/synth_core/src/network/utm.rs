//! Universal Transverse Mercator on the WGS84 ellipsoid.
//!
//! Series expansion after Snyder, "Map Projections: A Working Manual" (USGS
//! 1395), eq. 8-9 to 8-25. Sub-millimetre within a zone, which is far below
//! the lane snapping tolerance.

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A UTM zone (1..=60) and hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmZone {
    pub number: u8,
    pub south: bool,
}

impl UtmZone {
    pub fn new(number: u8, south: bool) -> Option<Self> {
        (1..=60).contains(&number).then_some(Self { number, south })
    }

    fn central_meridian_rad(&self) -> f64 {
        (f64::from(self.number) * 6.0 - 183.0).to_radians()
    }
}

fn eccentricity_squared() -> f64 {
    WGS84_F * (2.0 - WGS84_F)
}

fn meridian_arc(phi: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

/// Projects `(lon, lat)` in degrees to UTM easting/northing in metres.
pub fn forward(zone: UtmZone, lon: f64, lat: f64) -> (f64, f64) {
    let e2 = eccentricity_squared();
    let ep2 = e2 / (1.0 - e2);
    let phi = lat.to_radians();
    let lambda = lon.to_radians();

    let sin_phi = phi.sin();
    let cos_phi = phi.cos();
    let tan_phi = phi.tan();

    let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let t = tan_phi * tan_phi;
    let c = ep2 * cos_phi * cos_phi;
    let a = cos_phi * (lambda - zone.central_meridian_rad());
    let m = meridian_arc(phi, e2);

    let a2 = a * a;
    let a3 = a2 * a;
    let a4 = a3 * a;
    let a5 = a4 * a;
    let a6 = a5 * a;

    let easting = K0
        * n
        * (a + (1.0 - t + c) * a3 / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0)
        + FALSE_EASTING;

    let mut northing = K0
        * (m + n
            * tan_phi
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));
    if zone.south {
        northing += FALSE_NORTHING_SOUTH;
    }

    (easting, northing)
}

/// Inverse of [`forward`]: UTM metres back to `(lon, lat)` in degrees.
pub fn inverse(zone: UtmZone, easting: f64, northing: f64) -> (f64, f64) {
    let e2 = eccentricity_squared();
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let ep2 = e2 / (1.0 - e2);

    let x = easting - FALSE_EASTING;
    let y = if zone.south {
        northing - FALSE_NORTHING_SOUTH
    } else {
        northing
    };

    let m = y / K0;
    let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let sqrt_one_minus_e2 = (1.0 - e2).sqrt();
    let e1 = (1.0 - sqrt_one_minus_e2) / (1.0 + sqrt_one_minus_e2);
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = ep2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let denom = 1.0 - e2 * sin_phi1 * sin_phi1;
    let n1 = WGS84_A / denom.sqrt();
    let r1 = WGS84_A * (1.0 - e2) / denom.powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    let phi = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let lambda = zone.central_meridian_rad()
        + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5
                / 120.0)
            / cos_phi1;

    (lambda.to_degrees(), phi.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn central_meridian_maps_to_false_easting() {
        let zone = UtmZone::new(33, false).expect("valid zone");
        let (easting, northing) = forward(zone, 15.0, 0.0);
        assert!((easting - 500_000.0).abs() < 1e-6);
        assert!(northing.abs() < 1e-6);
    }

    #[test]
    fn berlin_matches_reference_coordinates() {
        // Brandenburg Gate, zone 33N, checked against the Krüger series.
        let zone = UtmZone::new(33, false).expect("valid zone");
        let (easting, northing) = forward(zone, 13.377_7, 52.516_3);
        assert!((easting - 389_917.83).abs() < 0.05, "{easting}");
        assert!((northing - 5_819_701.92).abs() < 0.05, "{northing}");
    }

    #[test]
    fn inverse_round_trips_in_both_hemispheres() {
        let cases = [
            (UtmZone::new(33, false), 13.4, 52.5),
            (UtmZone::new(22, true), -51.23, -30.03),
            (UtmZone::new(32, false), 7.1, 51.6),
        ];
        for (zone, lon, lat) in cases {
            let zone = zone.expect("valid zone");
            let (e, n) = forward(zone, lon, lat);
            let (lon2, lat2) = inverse(zone, e, n);
            assert!((lon - lon2).abs() < 1e-7, "lon {lon} vs {lon2}");
            assert!((lat - lat2).abs() < 1e-7, "lat {lat} vs {lat2}");
        }
    }

    #[test]
    fn zone_number_is_bounded() {
        assert!(UtmZone::new(0, false).is_none());
        assert!(UtmZone::new(61, false).is_none());
    }
}
