//! Positions in simulation space.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// A 3D position. Y is the height axis.
///
/// A vector may leave its height undefined, meaning "on the terrain": the
/// host resolves the height when the position is used to place an entity.
/// Two vectors without a height compare equal whatever `y` they carry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vector {
    x: f64,
    y: f64,
    z: f64,
    is_height_defined: bool,
}

impl Vector {
    /// Creates a vector with all three coordinates defined.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            is_height_defined: true,
        }
    }

    /// Creates a vector on the XZ plane with an undefined height.
    #[must_use]
    pub const fn xz(x: f64, z: f64) -> Self {
        Self {
            x,
            y: 0.0,
            z,
            is_height_defined: false,
        }
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    #[must_use]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// Height, or 0 when the height is undefined.
    #[must_use]
    pub fn y(&self) -> f64 {
        if self.is_height_defined { self.y } else { 0.0 }
    }

    #[must_use]
    pub const fn z(&self) -> f64 {
        self.z
    }

    #[must_use]
    pub const fn is_height_defined(&self) -> bool {
        self.is_height_defined
    }

    /// Returns a copy with the given height, marking it defined.
    #[must_use]
    pub const fn with_height(self, y: f64) -> Self {
        Self::new(self.x, y, self.z)
    }

    /// Returns a copy with the height dropped.
    #[must_use]
    pub const fn flat(self) -> Self {
        Self::xz(self.x, self.z)
    }

    /// Euclidean length.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        let y = self.y();
        (self.x * self.x + y * y + self.z * self.z).sqrt()
    }

    /// Distance to another vector.
    #[must_use]
    pub fn distance(&self, other: &Vector) -> f64 {
        (*self - *other).magnitude()
    }
}

impl PartialEq for Vector {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x
            && self.z == other.z
            && self.is_height_defined == other.is_height_defined
            && self.y() == other.y()
    }
}

impl Default for Vector {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, o: Vector) -> Vector {
        Vector {
            x: self.x + o.x,
            y: self.y() + o.y(),
            z: self.z + o.z,
            is_height_defined: self.is_height_defined && o.is_height_defined,
        }
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, o: Vector) -> Vector {
        Vector {
            x: self.x - o.x,
            y: self.y() - o.y(),
            z: self.z - o.z,
            is_height_defined: self.is_height_defined && o.is_height_defined,
        }
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;

    fn mul(self, k: f64) -> Vector {
        Vector {
            x: self.x * k,
            y: self.y() * k,
            z: self.z * k,
            is_height_defined: self.is_height_defined,
        }
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_height_defined {
            write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
        } else {
            write!(f, "({:.2}, undefined, {:.2})", self.x, self.z)
        }
    }
}
