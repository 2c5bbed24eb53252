use crate::engine::{GeometryEngine, LivePiece, PuzzleView};
use crate::geometry::{Point, Vector};

/// Solvability predicate installed on a puzzle.
#[derive(Clone, Debug, PartialEq)]
pub enum Validator {
    /// Every piece connected to its grid neighbours; judged by the engine.
    Solved,
    /// Pieces sit at the given unit-grid positions, up to a translation.
    RelativeRefs(Vec<Point>),
    /// Every non-odd left piece is connected to its right target.
    Match,
}

impl Validator {
    /// Validator for grid puzzles: expected refs win unless they are only
    /// kept for server side grading.
    pub fn for_basic(expected: Option<&[Point]>, only_descriptive: bool) -> Self {
        match expected {
            Some(refs) if !only_descriptive => Validator::RelativeRefs(refs.to_vec()),
            _ => Validator::Solved,
        }
    }

    pub fn is_valid(&self, puzzle: &impl PuzzleView) -> bool {
        match self {
            Validator::Solved => puzzle.connected(),
            Validator::RelativeRefs(expected) => {
                let refs = refs_of(&puzzle.pieces(), puzzle.piece_diameter());
                refs_match(expected, &refs)
            }
            Validator::Match => targets_connected(&puzzle.pieces()),
        }
    }
}

/// Installs the grid puzzle validator on `engine`.
pub fn attach_basic<E: GeometryEngine>(
    engine: &mut E,
    expected: Option<&[Point]>,
    only_descriptive: bool,
) {
    engine.attach_validator(Validator::for_basic(expected, only_descriptive));
}

pub fn attach_match<E: GeometryEngine>(engine: &mut E) {
    engine.attach_validator(Validator::Match);
}

/// Tolerance, in piece units, when comparing live positions with refs.
const REF_EPSILON: f64 = 1e-6;

/// Offsets of every piece from the first one, in piece-size units. The
/// subtraction happens in canvas pixels so a grid placed at a fractional
/// offset keeps whole-unit spacings.
fn refs_of(pieces: &[LivePiece], diameter: Vector) -> Vec<Point> {
    let Some(origin) = pieces.first().map(|p| p.position) else {
        return Vec::new();
    };
    pieces
        .iter()
        .map(|p| {
            Point::new(
                (p.position.x - origin.x) / diameter.x,
                (p.position.y - origin.y) / diameter.y,
            )
        })
        .collect()
}

fn refs_match(expected: &[Point], relative: &[Point]) -> bool {
    if expected.len() != relative.len() {
        return false;
    }
    let Some(e0) = expected.first() else {
        return true;
    };
    expected.iter().zip(relative).all(|(e, a)| {
        (e.x - e0.x - a.x).abs() <= REF_EPSILON && (e.y - e0.y - a.y).abs() <= REF_EPSILON
    })
}

// Odd pieces are skipped entirely, even when they carry a target.
fn targets_connected(pieces: &[LivePiece]) -> bool {
    pieces
        .iter()
        .filter(|p| p.left && !p.odd)
        .all(|p| match (&p.right_connection, &p.right_target_id) {
            (Some(connected), Some(target)) => connected == target,
            _ => false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Board {
        pieces: Vec<LivePiece>,
        connected: bool,
    }

    impl PuzzleView for Board {
        fn pieces(&self) -> Vec<LivePiece> {
            self.pieces.clone()
        }
        fn piece_diameter(&self) -> Vector {
            Vector::uniform(100.0)
        }
        fn connected(&self) -> bool {
            self.connected
        }
    }

    fn left(i: usize, connection: Option<&str>) -> LivePiece {
        LivePiece {
            id: Some(format!("l{i}")),
            left: true,
            right_target_id: Some(format!("r{i}")),
            right_connection: connection.map(str::to_string),
            ..Default::default()
        }
    }

    fn at(x: f64, y: f64) -> LivePiece {
        LivePiece {
            position: Point::new(x, y),
            ..Default::default()
        }
    }

    #[test]
    fn basic_prefers_expected_refs() {
        let refs = [Point::new(1.0, 2.0)];
        assert_eq!(
            Validator::for_basic(Some(&refs), false),
            Validator::RelativeRefs(refs.to_vec())
        );
        assert_eq!(Validator::for_basic(Some(&refs), true), Validator::Solved);
        assert_eq!(Validator::for_basic(None, false), Validator::Solved);
    }

    #[test]
    fn solved_delegates_to_engine() {
        let board = Board {
            pieces: vec![],
            connected: true,
        };
        assert!(Validator::Solved.is_valid(&board));
    }

    #[test]
    fn relative_refs_ignore_translation() {
        let v = Validator::RelativeRefs(vec![Point::new(1.0, 2.0), Point::new(1.0, 3.0)]);
        let shifted = Board {
            pieces: vec![at(500.0, 100.0), at(500.0, 200.0)],
            connected: false,
        };
        assert!(v.is_valid(&shifted));
        let wrong = Board {
            pieces: vec![at(500.0, 100.0), at(600.0, 200.0)],
            connected: false,
        };
        assert!(!v.is_valid(&wrong));
    }

    #[test]
    fn one_wrong_connection_breaks_match() {
        let mut board = Board {
            pieces: vec![left(0, Some("r0")), left(1, Some("r1"))],
            connected: false,
        };
        assert!(Validator::Match.is_valid(&board));
        board.pieces[1].right_connection = Some("r0".into());
        assert!(!Validator::Match.is_valid(&board));
        board.pieces[1].right_connection = None;
        assert!(!Validator::Match.is_valid(&board));
    }

    #[test]
    fn odd_pieces_are_never_checked() {
        let mut odd = left(9, Some("r0"));
        odd.odd = true;
        odd.right_target_id = None;
        let board = Board {
            pieces: vec![left(0, Some("r0")), odd],
            connected: false,
        };
        assert!(Validator::Match.is_valid(&board));
    }

    #[test]
    fn relative_refs_hold_on_fractional_grids() {
        let d = 100.0 / 3.0;
        let v = Validator::RelativeRefs(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 2.0),
            Point::new(3.0, 1.0),
        ]);
        for (ox, oy) in [(0.5, 13.7), (40.0, 7.3), (13.7, 0.5)] {
            let board = Thirds {
                pieces: vec![
                    at(ox, oy),
                    at(ox + d, oy),
                    at(ox, oy + 2.0 * d),
                    at(ox + 3.0 * d, oy + d),
                ],
            };
            assert!(v.is_valid(&board), "offset ({ox}, {oy})");
        }
        let off_by_a_pixel = Thirds {
            pieces: vec![
                at(0.5, 13.7),
                at(0.5 + d + 1.0, 13.7),
                at(0.5, 13.7 + 2.0 * d),
                at(0.5 + 3.0 * d, 13.7 + d),
            ],
        };
        assert!(!v.is_valid(&off_by_a_pixel));
    }

    struct Thirds {
        pieces: Vec<LivePiece>,
    }

    impl PuzzleView for Thirds {
        fn pieces(&self) -> Vec<LivePiece> {
            self.pieces.clone()
        }
        fn piece_diameter(&self) -> Vector {
            Vector::uniform(100.0 / 3.0)
        }
        fn connected(&self) -> bool {
            false
        }
    }
}
