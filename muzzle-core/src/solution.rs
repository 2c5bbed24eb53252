use serde::{Deserialize, Serialize};

use crate::engine::GeometryEngine;
use crate::geometry::{Point, min_corner};

#[derive(Debug, thiserror::Error)]
pub enum SolutionError {
    #[error("unparseable solution: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Piece positions in piece creation order.
///
/// Reordering the templates of a puzzle between builds invalidates every
/// stored solution, since the index is the only link to a piece.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub positions: Vec<Point>,
}

impl Solution {
    pub fn new(positions: Vec<Point>) -> Self {
        Solution { positions }
    }

    pub fn from_engine<E: GeometryEngine>(engine: &E) -> Self {
        Solution {
            positions: engine.points(),
        }
    }

    /// `{"positions": [[x, y], ...]}`
    pub fn to_json(&self) -> Result<String, SolutionError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(content: &str) -> Result<Self, SolutionError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parses persisted content. A corrupt value is logged and treated as
    /// no solution at all.
    pub fn restore(content: Option<&str>) -> Option<Self> {
        let content = content?;
        match Self::from_json(content) {
            Ok(solution) => Some(solution),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unparseable previous solution");
                None
            }
        }
    }

    /// Translation that moves the smallest x and y to zero.
    pub fn canonical_offset(positions: &[Point]) -> Option<(f64, f64)> {
        min_corner(positions).map(|min| (-min.x, -min.y))
    }

    pub fn normalized(&self) -> Solution {
        match Self::canonical_offset(&self.positions) {
            Some((dx, dy)) => Solution {
                positions: self.positions.iter().map(|p| p.translate(dx, dy)).collect(),
            },
            None => self.clone(),
        }
    }
}
