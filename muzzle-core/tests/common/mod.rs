#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::convert::Infallible;
use std::future::{self, Future};
use std::rc::Rc;

use muzzle_core::config::CanvasConfig;
use muzzle_core::template::PieceTemplate;
use muzzle_core::{
    AssetLoader, Background, EngineFactory, GeometryEngine, ImageFit, ImageSize, LivePiece,
    LoadError, Point, PuzzleView, Shuffler, Validator, Vector,
};

#[derive(Clone, Debug, PartialEq)]
pub struct Img {
    pub url: String,
    pub width: f64,
    pub height: f64,
}

impl ImageSize for Img {
    fn width(&self) -> f64 {
        self.width
    }
    fn height(&self) -> f64 {
        self.height
    }
}

/// Resolves every url to a 200x100 image except the ones marked broken.
#[derive(Default)]
pub struct FakeLoader {
    broken: HashSet<String>,
    pub requested: RefCell<Vec<String>>,
}

impl FakeLoader {
    pub fn broken(urls: &[&str]) -> Self {
        FakeLoader {
            broken: urls.iter().map(|u| u.to_string()).collect(),
            requested: RefCell::default(),
        }
    }

    fn resolve(&self, background: &Background) -> Result<Img, LoadError> {
        let url = background.url().to_string();
        self.requested.borrow_mut().push(url.clone());
        if self.broken.contains(&url) {
            return Err(LoadError::Failed {
                url,
                reason: "404".into(),
            });
        }
        Ok(Img {
            url,
            width: 200.0,
            height: 100.0,
        })
    }
}

impl AssetLoader for FakeLoader {
    type Image = Img;

    fn load(&self, background: &Background) -> impl Future<Output = Result<Img, LoadError>> {
        future::ready(self.resolve(background))
    }

    fn load_all(
        &self,
        backgrounds: &[Background],
    ) -> impl Future<Output = Result<Vec<Img>, LoadError>> {
        let results: Vec<_> = backgrounds.iter().map(|b| self.resolve(b)).collect();
        future::ready(results.into_iter().collect())
    }
}

/// In-memory engine: pieces are points, connections are set by the test.
#[derive(Debug)]
pub struct FakeEngine {
    pub canvas_id: String,
    pub config: CanvasConfig<Img>,
    pub pieces: Vec<LivePiece>,
    pub templates: Vec<PieceTemplate<Img>>,
    pub validator: Option<Validator>,
    pub connected: bool,
    pub fit: Option<ImageFit>,
    pub shuffled: Option<(Shuffler, f64)>,
    pub size: (f64, f64),
    pub scale: f64,
    pub calls: Vec<&'static str>,
}

impl FakeEngine {
    pub fn new(canvas_id: &str, config: CanvasConfig<Img>) -> Self {
        FakeEngine {
            canvas_id: canvas_id.to_string(),
            size: (config.width, config.height),
            config,
            pieces: Vec::new(),
            templates: Vec::new(),
            validator: None,
            connected: false,
            fit: None,
            shuffled: None,
            scale: 1.0,
            calls: Vec::new(),
        }
    }

    pub fn piece(&self, id: &str) -> Option<&LivePiece> {
        self.pieces.iter().find(|p| p.id.as_deref() == Some(id))
    }

    /// Snaps `right` to the right side of `left`.
    pub fn connect(&mut self, left: &str, right: &str) {
        if let Some(p) = self.pieces.iter_mut().find(|p| p.id.as_deref() == Some(left)) {
            p.right_connection = Some(right.to_string());
        }
    }

    pub fn disconnect_all(&mut self) {
        for p in &mut self.pieces {
            p.right_connection = None;
        }
        self.connected = false;
    }

    pub fn place(&mut self, positions: &[(f64, f64)]) {
        for (piece, &(x, y)) in self.pieces.iter_mut().zip(positions) {
            piece.position = Point::new(x, y);
        }
    }
}

impl PuzzleView for FakeEngine {
    fn pieces(&self) -> Vec<LivePiece> {
        self.pieces.clone()
    }

    fn piece_diameter(&self) -> Vector {
        self.config.piece_size
    }

    fn connected(&self) -> bool {
        self.connected
    }
}

impl GeometryEngine for FakeEngine {
    type Image = Img;

    fn autogenerate(&mut self, horizontal: usize, vertical: usize) {
        let size = self.config.piece_size;
        for row in 0..vertical {
            for col in 0..horizontal {
                self.pieces.push(LivePiece {
                    position: Point::new(col as f64 * size.x, row as f64 * size.y),
                    ..LivePiece::default()
                });
            }
        }
        self.calls.push("autogenerate");
    }

    fn sketch_piece(&mut self, template: PieceTemplate<Img>) {
        let meta = &template.metadata;
        self.pieces.push(LivePiece {
            id: Some(meta.id.clone()),
            left: meta.left,
            odd: meta.odd,
            right_target_id: meta.right_target_id.clone(),
            right_connection: None,
            position: meta
                .target_position
                .map(|v| Point::new(v.x, v.y))
                .unwrap_or_default(),
        });
        self.templates.push(template);
    }

    fn adjust_images(&mut self, fit: ImageFit) {
        self.fit = Some(fit);
    }

    fn shuffle(&mut self, shuffler: Shuffler, factor: f64) {
        self.shuffled = Some((shuffler, factor));
        // scatter away from the origin so normalization is observable
        for (i, p) in self.pieces.iter_mut().enumerate() {
            p.position = p.position.translate(40.0 + 10.0 * i as f64, 25.0);
        }
        self.calls.push("shuffle");
    }

    fn attach_validator(&mut self, validator: Validator) {
        self.validator = Some(validator);
    }

    fn is_valid(&self) -> bool {
        match &self.validator {
            Some(validator) => validator.is_valid(self),
            None => self.connected,
        }
    }

    fn points(&self) -> Vec<Point> {
        self.pieces.iter().map(|p| p.position).collect()
    }

    fn relocate_to(&mut self, points: &[Point]) {
        for (piece, point) in self.pieces.iter_mut().zip(points) {
            piece.position = *point;
        }
        self.calls.push("relocate");
    }

    fn autoconnect(&mut self) {
        self.calls.push("autoconnect");
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        for p in &mut self.pieces {
            p.position = p.position.translate(dx, dy);
        }
    }

    fn draw(&mut self) {
        self.calls.push("draw");
    }

    fn redraw(&mut self) {
        self.calls.push("redraw");
    }

    fn resize(&mut self, width: f64, height: f64) {
        self.size = (width, height);
    }

    fn scale(&mut self, factor: f64) {
        self.scale = factor;
    }

    fn puzzle_diameter(&self) -> Vector {
        let max_x = self.pieces.iter().map(|p| p.position.x).fold(0.0, f64::max);
        let max_y = self.pieces.iter().map(|p| p.position.y).fold(0.0, f64::max);
        Vector::new(max_x + self.config.piece_size.x, max_y + self.config.piece_size.y)
    }
}

#[derive(Clone, Default)]
pub struct FakeFactory {
    pub created: Rc<RefCell<Vec<String>>>,
}

impl EngineFactory for FakeFactory {
    type Engine = FakeEngine;
    type Error = Infallible;

    fn create(&self, canvas_id: &str, config: CanvasConfig<Img>) -> Result<FakeEngine, Infallible> {
        self.created.borrow_mut().push(canvas_id.to_string());
        Ok(FakeEngine::new(canvas_id, config))
    }
}
