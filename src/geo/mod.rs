//! Coordinate transforms between geodetic degrees and the globe's 3D frame.
//!
//! Convention (right-handed, +Y through the north pole):
//! - `(lat 0, lon 0)` maps to `(R, 0, 0)`
//! - `(lat 0, lon 90E)` maps to `(0, 0, -R)`
//! - `(lat 90, *)` maps to `(0, R, 0)`
//!
//! The globe spins about +Y. Positions produced here are earth-fixed; the
//! render layer applies the rotation to the whole globe frame, and the picker
//! undoes it before inverting.

#[cfg(test)]
mod proptest_geo;

use bevy::math::{DQuat, DVec3};

use crate::types::{DEG_TO_RAD, GeoPoint, RAD_TO_DEG, SECONDS_PER_DAY};

/// Map geodetic degrees to a point on a sphere of `radius` centred on the origin.
pub fn to_surface_position(lat: f64, lon: f64, radius: f64) -> DVec3 {
    let phi = (90.0 - lat) * DEG_TO_RAD;
    let theta = (lon + 180.0) * DEG_TO_RAD;

    DVec3::new(
        -radius * phi.sin() * theta.cos(),
        radius * phi.cos(),
        radius * phi.sin() * theta.sin(),
    )
}

/// Recover geodetic degrees from a point on (or near) the sphere surface.
///
/// Latitude comes from the polar angle and longitude from the azimuth, so the
/// point's distance from the origin does not matter. Returns `None` for the
/// origin itself.
pub fn from_surface_position(point: DVec3) -> Option<GeoPoint> {
    let r = point.length();
    if !r.is_finite() || r <= 0.0 {
        return None;
    }

    let lat = (point.y / r).clamp(-1.0, 1.0).asin() * RAD_TO_DEG;
    let lon = normalize_longitude(-point.z.atan2(point.x) * RAD_TO_DEG);

    Some(GeoPoint::new(lat, lon))
}

/// Wrap a longitude into (-180, 180].
pub fn normalize_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 { wrapped + 360.0 } else { wrapped }
}

/// A ray in world space. `dir` need not be normalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobeRay {
    pub origin: DVec3,
    pub dir: DVec3,
}

impl GlobeRay {
    pub fn new(origin: DVec3, dir: DVec3) -> Self {
        Self { origin, dir }
    }

    /// Ray from `origin` through `target`.
    #[cfg(test)]
    pub fn through(origin: DVec3, target: DVec3) -> Self {
        Self::new(origin, target - origin)
    }
}

/// Nearest intersection of a ray with the origin-centred sphere of `radius`.
///
/// Only hits in front of the ray origin count. A ray starting inside the
/// sphere hits the far wall.
pub fn intersect_sphere(ray: GlobeRay, radius: f64) -> Option<DVec3> {
    let dir = ray.dir.try_normalize()?;

    // |o + t d|^2 = r^2 with |d| = 1
    let b = ray.origin.dot(dir);
    let c = ray.origin.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if !discriminant.is_finite() || discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let near = -b - sqrt_d;
    let far = -b + sqrt_d;
    let t = if near >= 0.0 {
        near
    } else if far >= 0.0 {
        far
    } else {
        return None;
    };

    Some(ray.origin + dir * t)
}

/// Intersect a world-space ray with the rotated globe and return the picked
/// geodetic coordinate, or `None` when the ray misses.
pub fn ray_to_geodetic(ray: GlobeRay, radius: f64, globe_rotation: f64) -> Option<GeoPoint> {
    // Undo the globe spin so the hit point is earth-fixed
    let inverse = DQuat::from_rotation_y(-globe_rotation);
    let local = GlobeRay::new(inverse * ray.origin, inverse * ray.dir);

    let hit = intersect_sphere(local, radius)?;
    from_surface_position(hit)
}

/// Globe spin angle (radians) for an elapsed simulation time.
///
/// Computed from total elapsed seconds so the rotation stays continuous across
/// day boundaries and when running backwards.
pub fn globe_rotation(elapsed_seconds: f64) -> f64 {
    elapsed_seconds / SECONDS_PER_DAY * std::f64::consts::TAU
}
