use serde::{Deserialize, Serialize};

/// Canvas position of a piece. Serialized as an `[x, y]` pair, which is the
/// shape used by persisted and submitted solutions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Point {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl From<[f64; 2]> for Point {
    fn from(v: [f64; 2]) -> Self {
        Point { x: v[0], y: v[1] }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl From<(f64, f64)> for Point {
    fn from(v: (f64, f64)) -> Self {
        Point { x: v.0, y: v.1 }
    }
}

/// Two dimensional size or offset, serialized as `{x, y}` the way the
/// geometry engine expects its configuration vectors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Vector { x, y }
    }

    pub const fn uniform(v: f64) -> Self {
        Vector { x: v, y: v }
    }

    /// Component-wise product.
    pub fn multiply(self, other: Vector) -> Vector {
        Vector {
            x: self.x * other.x,
            y: self.y * other.y,
        }
    }

    pub fn scale(self, factor: f64) -> Vector {
        Vector {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    pub fn divide(self, divisor: f64) -> Vector {
        Vector {
            x: self.x / divisor,
            y: self.y / divisor,
        }
    }

    pub fn min_component(self) -> f64 {
        self.x.min(self.y)
    }
}

/// Axis along which images are stretched or inserts are measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Smallest x and smallest y over a set of points, or `None` when empty.
pub fn min_corner(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let mut minx = f64::INFINITY;
    let mut miny = f64::INFINITY;
    for p in points {
        minx = minx.min(p.x);
        miny = miny.min(p.y);
    }
    Some(Point { x: minx, y: miny })
}

/// Divisor applied to the best fitting factor so the puzzle keeps some room
/// around it for loose pieces.
pub const SCALE_MARGIN_DIVISOR: f64 = 1.75;

/// Scale factor that fits a puzzle of the given diameter into a
/// `width` x `height` container.
pub fn optimal_scale_factor(width: f64, height: f64, puzzle_diameter: Vector) -> f64 {
    let fx = width / puzzle_diameter.x;
    let fy = height / puzzle_diameter.y;
    fx.min(fy) / SCALE_MARGIN_DIVISOR
}
