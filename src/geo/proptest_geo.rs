//! Property-based tests for the globe coordinate transforms using proptest.

use bevy::math::DVec3;
use proptest::prelude::*;

use super::{
    GlobeRay, from_surface_position, intersect_sphere, normalize_longitude, ray_to_geodetic,
    to_surface_position,
};

/// Smallest angular difference between two longitudes, in degrees.
fn lon_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Forward then inverse returns the original coordinate.
    ///
    /// Poles are excluded from the longitude check: every longitude maps to
    /// the same point there.
    #[test]
    fn prop_round_trip_through_camera_ray(
        lat in -89.9f64..89.9,
        lon in -179.999f64..=180.0,
        radius in 0.5f64..100.0,
        camera_distance in 2.0f64..10.0,
    ) {
        let surface = to_surface_position(lat, lon, radius);
        // Camera outside the globe on the same radial line
        let camera = surface * camera_distance;
        let ray = GlobeRay::through(camera, surface);

        let geo = ray_to_geodetic(ray, radius, 0.0).expect("radial ray must hit");
        prop_assert!((geo.lat - lat).abs() < 1e-6, "lat {} vs {}", geo.lat, lat);
        prop_assert!(lon_diff(geo.lon, lon) < 1e-6, "lon {} vs {}", geo.lon, lon);
    }

    /// Poles recover latitude regardless of longitude.
    #[test]
    fn prop_pole_latitude(lon in -180.0f64..180.0, north in any::<bool>()) {
        let lat = if north { 90.0 } else { -90.0 };
        let geo = from_surface_position(to_surface_position(lat, lon, 3.0)).unwrap();
        prop_assert!((geo.lat - lat).abs() < 1e-6);
    }

    /// Forward transform always lands on the sphere.
    #[test]
    fn prop_surface_position_on_sphere(
        lat in -90.0f64..=90.0,
        lon in -360.0f64..360.0,
        radius in 0.1f64..1000.0,
    ) {
        let p = to_surface_position(lat, lon, radius);
        prop_assert!((p.length() - radius).abs() < 1e-9 * radius.max(1.0));
    }

    /// Any intersection reported lies on the sphere and in front of the ray.
    #[test]
    fn prop_intersection_on_sphere(
        ox in -20.0f64..20.0, oy in -20.0f64..20.0, oz in -20.0f64..20.0,
        dx in -1.0f64..1.0, dy in -1.0f64..1.0, dz in -1.0f64..1.0,
    ) {
        let ray = GlobeRay::new(DVec3::new(ox, oy, oz), DVec3::new(dx, dy, dz));
        if let Some(hit) = intersect_sphere(ray, 5.0) {
            prop_assert!((hit.length() - 5.0).abs() < 1e-9);
            prop_assert!((hit - ray.origin).dot(ray.dir) >= -1e-9);
        }
    }

    /// Normalized longitudes stay in (-180, 180] and keep their direction.
    #[test]
    fn prop_normalized_longitude_range(lon in -10_000.0f64..10_000.0) {
        let n = normalize_longitude(lon);
        prop_assert!(n > -180.0 && n <= 180.0);
        prop_assert!(lon_diff(n, lon) < 1e-6);
    }
}
