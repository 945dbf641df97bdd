//! Display units and window geometry.
//!
//! Window coordinates are expressed in _logical units_ (device-independent
//! points) and _physical units_ (pixels). Conversions between the two are
//! scaled by a per-display factor.

use std::ops::Deref;

pub trait FromLogical<T> {
    fn from_logical(logical: T, scale: f64) -> Self;
}

pub trait IntoPhysical<T> {
    fn into_physical(self, scale: f64) -> T;
}

impl<T, U> IntoPhysical<T> for U
where
    T: FromLogical<U>,
{
    fn into_physical(self, scale: f64) -> T {
        T::from_logical(self, scale)
    }
}

pub trait FromPhysical<T> {
    fn from_physical(physical: T, scale: f64) -> Self;
}

pub trait IntoLogical<T> {
    fn into_logical(self, scale: f64) -> T;
}

impl<T, U> IntoLogical<T> for U
where
    T: FromPhysical<U>,
{
    fn into_logical(self, scale: f64) -> T {
        T::from_physical(self, scale)
    }
}

impl<T> IntoPhysical<(PhysicalUnit, PhysicalUnit)> for (T, T)
where
    T: Into<LogicalUnit>,
{
    fn into_physical(self, scale: f64) -> (PhysicalUnit, PhysicalUnit) {
        let (a, b) = self;
        (a.into().into_physical(scale), b.into().into_physical(scale))
    }
}

impl<T> IntoLogical<(LogicalUnit, LogicalUnit)> for (T, T)
where
    T: Into<PhysicalUnit>,
{
    fn into_logical(self, scale: f64) -> (LogicalUnit, LogicalUnit) {
        let (a, b) = self;
        (a.into().into_logical(scale), b.into().into_logical(scale))
    }
}

/// A coordinate in device-independent points.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct LogicalUnit(f64);

impl LogicalUnit {
    pub fn is_non_negative(self) -> bool {
        self.0.is_finite() && self.0 >= 0.0
    }
}

impl AsRef<f64> for LogicalUnit {
    fn as_ref(&self) -> &f64 {
        &self.0
    }
}

impl Deref for LogicalUnit {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<f64> for LogicalUnit {
    fn from(value: f64) -> Self {
        LogicalUnit(value)
    }
}

impl From<i32> for LogicalUnit {
    fn from(value: i32) -> Self {
        LogicalUnit(value as f64)
    }
}

impl From<u32> for LogicalUnit {
    fn from(value: u32) -> Self {
        LogicalUnit(value as f64)
    }
}

impl FromPhysical<PhysicalUnit> for LogicalUnit {
    fn from_physical(physical: PhysicalUnit, scale: f64) -> Self {
        LogicalUnit(physical.0 / scale)
    }
}

impl From<LogicalUnit> for f64 {
    fn from(unit: LogicalUnit) -> Self {
        unit.0
    }
}

impl From<LogicalUnit> for i32 {
    fn from(unit: LogicalUnit) -> Self {
        unit.0.round() as i32
    }
}

impl From<LogicalUnit> for u32 {
    fn from(unit: LogicalUnit) -> Self {
        unit.0.round() as u32
    }
}

/// A coordinate in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct PhysicalUnit(f64);

impl AsRef<f64> for PhysicalUnit {
    fn as_ref(&self) -> &f64 {
        &self.0
    }
}

impl Deref for PhysicalUnit {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<f64> for PhysicalUnit {
    fn from(value: f64) -> Self {
        PhysicalUnit(value)
    }
}

impl From<i32> for PhysicalUnit {
    fn from(value: i32) -> Self {
        PhysicalUnit(value as f64)
    }
}

impl From<u32> for PhysicalUnit {
    fn from(value: u32) -> Self {
        PhysicalUnit(value as f64)
    }
}

impl FromLogical<LogicalUnit> for PhysicalUnit {
    fn from_logical(logical: LogicalUnit, scale: f64) -> Self {
        PhysicalUnit(logical.0 * scale)
    }
}

impl From<PhysicalUnit> for f64 {
    fn from(unit: PhysicalUnit) -> Self {
        unit.0
    }
}

impl From<PhysicalUnit> for i32 {
    fn from(unit: PhysicalUnit) -> Self {
        unit.0.round() as i32
    }
}

impl From<PhysicalUnit> for u32 {
    fn from(unit: PhysicalUnit) -> Self {
        unit.0.round() as u32
    }
}

/// An axis-aligned rectangle in logical coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Cached window geometry.
///
/// Geometry is zeroed until a window becomes ready and frozen once it is
/// lost. Passive accessors return this type by value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WindowGeometry {
    /// Origin of the window in virtual display coordinates.
    pub origin: (i32, i32),
    /// Size of the content area in logical units.
    pub logical_size: (LogicalUnit, LogicalUnit),
    /// Size of the content area in pixels.
    pub pixel_size: (u32, u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_conversions_scale() {
        let logical = LogicalUnit::from(400);
        let physical: PhysicalUnit = logical.into_physical(2.0);
        assert_eq!(f64::from(physical), 800.0);
        let back: LogicalUnit = physical.into_logical(2.0);
        assert_eq!(back, logical);
    }

    #[test]
    fn pair_conversions() {
        let (w, h): (PhysicalUnit, PhysicalUnit) = (640, 480).into_physical(1.5);
        assert_eq!(u32::from(w), 960);
        assert_eq!(u32::from(h), 720);
    }

    #[test]
    fn non_negative_rejects_nan() {
        assert!(LogicalUnit::from(0.0).is_non_negative());
        assert!(!LogicalUnit::from(-1.0).is_non_negative());
        assert!(!LogicalUnit::from(f64::NAN).is_non_negative());
    }
}
