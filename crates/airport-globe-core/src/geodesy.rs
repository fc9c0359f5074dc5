//! Geodetic to Earth-centred Earth-fixed (ECEF) conversion
//!
//! # Coordinate System
//!
//! - Longitude / latitude: radians in [`Cartographic`], degrees at the
//!   `*_degrees` entry points
//! - Height: metres above the ellipsoid surface
//! - Cartesian: metres, origin at the Earth's centre, +X through
//!   (0°, 0°), +Z through the north pole

use serde::{Deserialize, Serialize};

/// A point in 3D Cartesian space (metres)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cartesian3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Cartesian3 {
    pub const ZERO: Cartesian3 = Cartesian3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn dot(&self, other: &Cartesian3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn normalize(&self) -> Cartesian3 {
        let m = self.magnitude();
        Cartesian3::new(self.x / m, self.y / m, self.z / m)
    }

    pub fn scale(&self, s: f64) -> Cartesian3 {
        Cartesian3::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn add(&self, other: &Cartesian3) -> Cartesian3 {
        Cartesian3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    /// Component-wise product
    pub fn mul_components(&self, other: &Cartesian3) -> Cartesian3 {
        Cartesian3::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    /// Position of a geodetic point given in degrees
    pub fn from_degrees(longitude: f64, latitude: f64, height: f64, ellipsoid: &Ellipsoid) -> Self {
        ellipsoid.cartographic_to_cartesian(&Cartographic::from_degrees(longitude, latitude, height))
    }
}

/// Geodetic position: longitude and latitude in radians, height in metres
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cartographic {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
}

impl Cartographic {
    pub fn from_degrees(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude: longitude.to_radians(),
            latitude: latitude.to_radians(),
            height,
        }
    }
}

/// A biaxial or triaxial ellipsoid centred at the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    radii: Cartesian3,
    radii_squared: Cartesian3,
}

impl Ellipsoid {
    /// WGS84 semi-major 6378137 m, semi-minor 6356752.3142451793 m
    pub const WGS84: Ellipsoid = Ellipsoid {
        radii: Cartesian3::new(6378137.0, 6378137.0, 6356752.3142451793),
        radii_squared: Cartesian3::new(40680631590769.0, 40680631590769.0, 40408299984661.445),
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            radii: Cartesian3::new(x, y, z),
            radii_squared: Cartesian3::new(x * x, y * y, z * z),
        }
    }

    pub fn radii(&self) -> Cartesian3 {
        self.radii
    }

    /// Unit normal to the surface at a geodetic position
    pub fn geodetic_surface_normal(&self, cartographic: &Cartographic) -> Cartesian3 {
        let cos_lat = cartographic.latitude.cos();
        Cartesian3::new(
            cos_lat * cartographic.longitude.cos(),
            cos_lat * cartographic.longitude.sin(),
            cartographic.latitude.sin(),
        )
        .normalize()
    }

    pub fn cartographic_to_cartesian(&self, cartographic: &Cartographic) -> Cartesian3 {
        let n = self.geodetic_surface_normal(cartographic);
        let k = self.radii_squared.mul_components(&n);
        let gamma = n.dot(&k).sqrt();
        let surface = k.scale(1.0 / gamma);
        surface.add(&n.scale(cartographic.height))
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

/// Maps geodetic degrees into the viewer's Cartesian space
pub trait Projector: Send + Sync {
    fn project_degrees(&self, longitude: f64, latitude: f64, height: f64) -> Cartesian3;
}

impl Projector for Ellipsoid {
    fn project_degrees(&self, longitude: f64, latitude: f64, height: f64) -> Cartesian3 {
        Cartesian3::from_degrees(longitude, latitude, height, self)
    }
}
