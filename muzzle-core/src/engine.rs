//! Seams towards the geometry engine that cuts, drags, snaps and paints the
//! pieces. The core configures it and reads its live state back; it never
//! simulates pieces itself.

use std::fmt;

use crate::config::{CanvasConfig, ImageFit, Shuffler};
use crate::geometry::{Point, Vector};
use crate::template::PieceTemplate;
use crate::validator::Validator;

/// A piece as currently arranged by the learner.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LivePiece {
    pub id: Option<String>,
    pub left: bool,
    pub odd: bool,
    pub right_target_id: Option<String>,
    /// Id of the piece snapped to this piece's right side, if any.
    pub right_connection: Option<String>,
    pub position: Point,
}

/// Read access to the live arrangement, handed to validators.
pub trait PuzzleView {
    /// Pieces in creation order.
    fn pieces(&self) -> Vec<LivePiece>;

    fn piece_diameter(&self) -> Vector;

    /// Whether every piece is connected to each of its grid neighbours.
    fn connected(&self) -> bool;
}

pub trait GeometryEngine {
    type Image: Clone;

    /// Cuts a `horizontal` x `vertical` grid from the board image.
    fn autogenerate(&mut self, horizontal: usize, vertical: usize);

    fn sketch_piece(&mut self, template: PieceTemplate<Self::Image>);

    fn adjust_images(&mut self, fit: ImageFit);

    fn shuffle(&mut self, shuffler: Shuffler, factor: f64);

    /// Installs the solvability predicate, replacing any previous one. The
    /// engine re-evaluates it after every move.
    fn attach_validator(&mut self, validator: Validator);

    /// Result of the installed predicate for the current arrangement. An
    /// engine without a predicate, such as one adopted through
    /// `Muzzle::custom`, reports its own solved state.
    fn is_valid(&self) -> bool;

    /// Piece positions in creation order.
    fn points(&self) -> Vec<Point>;

    fn relocate_to(&mut self, points: &[Point]);

    /// Connects every pair of pieces that lie next to each other.
    fn autoconnect(&mut self);

    fn translate(&mut self, dx: f64, dy: f64);

    fn draw(&mut self);

    fn redraw(&mut self);

    fn resize(&mut self, width: f64, height: f64);

    fn scale(&mut self, factor: f64);

    fn puzzle_diameter(&self) -> Vector;
}

/// Creates engines bound to a canvas element.
pub trait EngineFactory {
    type Engine: GeometryEngine;
    type Error: fmt::Display;

    fn create(
        &self,
        canvas_id: &str,
        config: CanvasConfig<<Self::Engine as GeometryEngine>::Image>,
    ) -> Result<Self::Engine, Self::Error>;
}
