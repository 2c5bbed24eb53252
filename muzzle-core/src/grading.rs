//! Server side re-grading of submitted solutions.
//!
//! Grading is a pure function of the request. It never fails: anything it
//! cannot parse falls back to a passing grade.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::submission::{ClientResult, Status};

/// Canvas pixels per unit of an expected layout.
pub const GRID_UNIT: f64 = 100.0;

const EXPECT_CALL: &str = "expect(";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GradingRequest {
    /// Test script of the exercise, possibly embedding `Muzzle.expect(...)`.
    #[serde(default)]
    pub test: String,
    /// Submitted solution.
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_result: Option<ClientResult>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingResponse {
    pub status: Status,
    pub feedback: String,
}

impl GradingResponse {
    fn with_status(status: Status) -> Self {
        GradingResponse {
            status,
            feedback: String::new(),
        }
    }
}

/// Content is either a full solution or a bare list of positions.
#[derive(Deserialize)]
#[serde(untagged)]
enum Content {
    Solution { positions: Vec<Point> },
    Positions(Vec<Point>),
}

pub fn grade(request: &GradingRequest) -> GradingResponse {
    // match puzzles can only be judged by the client engine
    if let Some(client) = request.client_result {
        tracing::debug!(status = client.status.as_str(), "trusting client result");
        return GradingResponse::with_status(client.status);
    }
    let Some(expected) = extract_expectation(&request.test) else {
        return GradingResponse::with_status(Status::Passed);
    };
    let Some(actual) = parse_positions(&request.content) else {
        tracing::debug!("unparseable content, grading as passed");
        return GradingResponse::with_status(Status::Passed);
    };
    let passed = relatively_equal(&expected, &actual);
    tracing::debug!(passed, pieces = actual.len(), "graded against expected layout");
    GradingResponse::with_status(Status::from_validity(passed))
}

/// Finds the first `expect(...)` call in `test` and parses its argument as a
/// JSON list of pairs. The call is matched textually, never evaluated.
pub fn extract_expectation(test: &str) -> Option<Vec<Point>> {
    let start = test.find(EXPECT_CALL)? + EXPECT_CALL.len();
    let rest = &test[start..];
    let end = rest.find(')')?;
    serde_json::from_str(rest[..end].trim()).ok()
}

pub fn parse_positions(content: &str) -> Option<Vec<Point>> {
    match serde_json::from_str::<Content>(content).ok()? {
        Content::Solution { positions } | Content::Positions(positions) => Some(positions),
    }
}

/// Compares `actual` canvas positions with `expected` unit positions after
/// removing the offset of the first piece. Comparison is exact.
pub fn relatively_equal(expected: &[Point], actual: &[Point]) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    let (Some(e0), Some(a0)) = (expected.first(), actual.first()) else {
        return true;
    };
    let offset_x = a0.x - GRID_UNIT * e0.x;
    let offset_y = a0.y - GRID_UNIT * e0.y;
    expected
        .iter()
        .zip(actual)
        .all(|(e, a)| a.x - offset_x == GRID_UNIT * e.x && a.y - offset_y == GRID_UNIT * e.y)
}
