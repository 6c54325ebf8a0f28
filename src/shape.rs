//! Spatial key shapes and their linearization.
//!
//! Every key indexed by the R-tree implements [`SpatialShape`]: bounding-box
//! arithmetic plus a Hilbert linearization used as the sort key for all page
//! operations. Two shapes are provided, a 2D rectangle for plain location
//! keys and a 3D box that folds a category-rank axis into the key.
//!
//! Shapes live on an unsigned micro-degree grid: longitude is offset by 180
//! degrees and latitude by 90 degrees, both scaled by 1e6, so the whole globe
//! maps to `[0, 360_000_000) x [0, 180_000_000)`. Conversion from degree
//! coordinates validates range and finiteness.

use crate::error::{PoidexError, Result};
use crate::hilbert::{hilbert_2d, hilbert_3d};

const MICRO: f64 = 1_000_000.0;

/// Largest grid x coordinate (inclusive), 360 degrees in micro-degrees.
pub const GRID_MAX_X: u32 = 360_000_000;

/// Largest grid y coordinate (inclusive), 180 degrees in micro-degrees.
pub const GRID_MAX_Y: u32 = 180_000_000;

/// Capability contract for every region or key stored in the index.
///
/// `linear_order_value` is the shape's Hilbert value; pages keep their
/// entries sorted by it. `join_area` estimates the area of `join` without
/// materializing the joined shape.
pub trait SpatialShape: Clone {
    /// Scalar measure of the shape's extent (volume in 3D).
    fn area(&self) -> u128;

    /// Whether `other` lies entirely within this shape.
    fn contains(&self, other: &Self) -> bool;

    /// Whether this shape and `other` overlap.
    fn intersects(&self, other: &Self) -> bool;

    /// Grow this shape to the smallest shape containing both.
    fn join(&mut self, other: &Self);

    /// Area of the join of both shapes.
    fn join_area(&self, other: &Self) -> u128;

    /// Hilbert value of the shape, the sort key for all page operations.
    fn linear_order_value(&self) -> u64;
}

/// Convert a longitude in degrees to the unsigned micro-degree grid.
pub fn lon_to_grid(lon: f64) -> Result<u32> {
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(PoidexError::InvalidCoordinate {
            axis: "longitude",
            value: lon,
        });
    }
    Ok(((lon + 180.0) * MICRO).round() as u32)
}

/// Convert a latitude in degrees to the unsigned micro-degree grid.
pub fn lat_to_grid(lat: f64) -> Result<u32> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(PoidexError::InvalidCoordinate {
            axis: "latitude",
            value: lat,
        });
    }
    Ok(((lat + 90.0) * MICRO).round() as u32)
}

/// A 2D axis-aligned rectangle on the micro-degree grid.
///
/// A point key is a zero-area rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Minimum x coordinate.
    pub min_x: u32,
    /// Minimum y coordinate.
    pub min_y: u32,
    /// Maximum x coordinate.
    pub max_x: u32,
    /// Maximum y coordinate.
    pub max_y: u32,
}

impl Rect {
    /// Create a rectangle; corners are normalized so min <= max per axis.
    pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    /// Create a zero-area rectangle at a grid coordinate.
    pub fn point(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    /// Create a rectangle from degree coordinates.
    pub fn from_degrees(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        Ok(Self::new(
            lon_to_grid(min_lon)?,
            lat_to_grid(min_lat)?,
            lon_to_grid(max_lon)?,
            lat_to_grid(max_lat)?,
        ))
    }

    /// Create a zero-area rectangle at a degree coordinate.
    pub fn from_point(point: &geo::Point) -> Result<Self> {
        let x = lon_to_grid(point.x())?;
        let y = lat_to_grid(point.y())?;
        Ok(Self::point(x, y))
    }

    /// Center of the rectangle.
    pub fn center(&self) -> (u32, u32) {
        (
            self.min_x + (self.max_x - self.min_x) / 2,
            self.min_y + (self.max_y - self.min_y) / 2,
        )
    }
}

impl SpatialShape for Rect {
    fn area(&self) -> u128 {
        u128::from(self.max_x - self.min_x) * u128::from(self.max_y - self.min_y)
    }

    fn contains(&self, other: &Self) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && self.min_y <= other.max_y
            && self.max_x >= other.min_x
            && self.max_y >= other.min_y
    }

    fn join(&mut self, other: &Self) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    fn join_area(&self, other: &Self) -> u128 {
        let width = self.max_x.max(other.max_x) - self.min_x.min(other.min_x);
        let height = self.max_y.max(other.max_y) - self.min_y.min(other.min_y);
        u128::from(width) * u128::from(height)
    }

    fn linear_order_value(&self) -> u64 {
        let (x, y) = self.center();
        hilbert_2d(x, y)
    }
}

/// A 3D axis-aligned box combining a location rectangle with a category-rank
/// axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Box3 {
    /// Minimum x coordinate.
    pub min_x: u32,
    /// Minimum y coordinate.
    pub min_y: u32,
    /// Minimum z coordinate (category axis).
    pub min_z: u32,
    /// Maximum x coordinate.
    pub max_x: u32,
    /// Maximum y coordinate.
    pub max_y: u32,
    /// Maximum z coordinate (category axis).
    pub max_z: u32,
}

impl Box3 {
    /// Create a box; corners are normalized so min <= max per axis.
    pub fn new(min: (u32, u32, u32), max: (u32, u32, u32)) -> Self {
        Self {
            min_x: min.0.min(max.0),
            min_y: min.1.min(max.1),
            min_z: min.2.min(max.2),
            max_x: min.0.max(max.0),
            max_y: min.1.max(max.1),
            max_z: min.2.max(max.2),
        }
    }

    /// Create a zero-volume box at a grid coordinate.
    pub fn point(x: u32, y: u32, z: u32) -> Self {
        Self::new((x, y, z), (x, y, z))
    }

    /// Extrude a rectangle along the category axis.
    pub fn from_rect(rect: Rect, min_z: u32, max_z: u32) -> Self {
        Self::new((rect.min_x, rect.min_y, min_z), (rect.max_x, rect.max_y, max_z))
    }

    /// Center of the box.
    pub fn center(&self) -> (u32, u32, u32) {
        (
            self.min_x + (self.max_x - self.min_x) / 2,
            self.min_y + (self.max_y - self.min_y) / 2,
            self.min_z + (self.max_z - self.min_z) / 2,
        )
    }
}

impl SpatialShape for Box3 {
    fn area(&self) -> u128 {
        u128::from(self.max_x - self.min_x)
            * u128::from(self.max_y - self.min_y)
            * u128::from(self.max_z - self.min_z)
    }

    fn contains(&self, other: &Self) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.min_z <= other.min_z
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
            && self.max_z >= other.max_z
    }

    fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && self.min_y <= other.max_y
            && self.min_z <= other.max_z
            && self.max_x >= other.min_x
            && self.max_y >= other.min_y
            && self.max_z >= other.min_z
    }

    fn join(&mut self, other: &Self) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.min_z = self.min_z.min(other.min_z);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
        self.max_z = self.max_z.max(other.max_z);
    }

    fn join_area(&self, other: &Self) -> u128 {
        let width = self.max_x.max(other.max_x) - self.min_x.min(other.min_x);
        let height = self.max_y.max(other.max_y) - self.min_y.min(other.min_y);
        let depth = self.max_z.max(other.max_z) - self.min_z.min(other.min_z);
        u128::from(width) * u128::from(height) * u128::from(depth)
    }

    fn linear_order_value(&self) -> u64 {
        let (x, y, z) = self.center();
        hilbert_3d(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_predicates() {
        let outer = Rect::new(0, 0, 100, 100);
        let inner = Rect::new(25, 25, 75, 75);
        let disjoint = Rect::new(200, 200, 300, 300);
        let touching = Rect::new(100, 100, 150, 150);

        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.intersects(&inner));
        assert!(!outer.intersects(&disjoint));
        // Shared corner counts as intersection.
        assert!(outer.intersects(&touching));
    }

    #[test]
    fn test_rect_join_and_area() {
        let mut a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(20, 5, 30, 15);
        assert_eq!(a.join_area(&b), 30 * 15);
        a.join(&b);
        assert_eq!(a, Rect::new(0, 0, 30, 15));
        assert_eq!(a.area(), 30 * 15);
    }

    #[test]
    fn test_point_rect_is_zero_area() {
        let p = Rect::point(42, 99);
        assert_eq!(p.area(), 0);
        assert!(p.intersects(&p));
        assert!(p.contains(&p));
    }

    #[test]
    fn test_degree_conversion_bounds() {
        assert_eq!(lon_to_grid(-180.0).unwrap(), 0);
        assert_eq!(lon_to_grid(180.0).unwrap(), GRID_MAX_X);
        assert_eq!(lat_to_grid(-90.0).unwrap(), 0);
        assert_eq!(lat_to_grid(90.0).unwrap(), GRID_MAX_Y);

        assert!(lon_to_grid(180.1).is_err());
        assert!(lat_to_grid(f64::NAN).is_err());
        assert!(lat_to_grid(f64::INFINITY).is_err());
    }

    #[test]
    fn test_rect_normalizes_corners() {
        let rect = Rect::new(10, 20, 5, 15);
        assert_eq!(rect, Rect::new(5, 15, 10, 20));
    }

    #[test]
    fn test_box3_predicates_and_join() {
        let mut a = Box3::new((0, 0, 0), (10, 10, 10));
        let b = Box3::new((5, 5, 5), (15, 15, 15));
        let above = Box3::new((0, 0, 20), (10, 10, 30));

        assert!(a.intersects(&b));
        assert!(!a.intersects(&above));
        assert!(!a.contains(&b));

        a.join(&b);
        assert!(a.contains(&b));
        assert_eq!(a.area(), 15 * 15 * 15);
    }

    #[test]
    fn test_box3_category_axis_separates_points() {
        let point = Box3::point(1000, 1000, 50);
        let matching = Box3::from_rect(Rect::new(0, 0, 2000, 2000), 40, 60);
        let other_range = Box3::from_rect(Rect::new(0, 0, 2000, 2000), 60, 80);
        assert!(matching.intersects(&point));
        assert!(!other_range.intersects(&point));
    }

    #[test]
    fn test_linear_order_follows_center() {
        let a = Rect::point(100, 100);
        let b = Rect::new(90, 90, 110, 110);
        // Same center, same linearization.
        assert_eq!(a.linear_order_value(), b.linear_order_value());
    }
}
