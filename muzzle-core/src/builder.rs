//! The puzzle context: one [`Muzzle`] per canvas, owning its settings,
//! lifecycle events and, once built, its geometry engine.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::background::{AssetLoader, Background, LoadError};
use crate::config::{CanvasConfig, ImageFit, SHUFFLE_FACTOR, Settings, Shuffler, set_if_absent};
use crate::engine::{EngineFactory, GeometryEngine};
use crate::events::EventRegistry;
use crate::geometry::{Axis, Point, Vector, optimal_scale_factor};
use crate::solution::{Solution, SolutionError};
use crate::submission::{Status, SubmissionGate, SubmissionPayload};
use crate::template::{PieceTemplate, ScaleToFit, Structure, TemplateFactory, TemplateRequest};
use crate::validator;

pub const DEFAULT_CANVAS_ID: &str = "muzzle-canvas";

/// Columns of a match puzzle: lefts and rights.
const MATCH_COLUMNS: f64 = 2.0;

pub type EngineOf<F> = <F as EngineFactory>::Engine;
pub type ImageOf<F> = <EngineOf<F> as GeometryEngine>::Image;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("could not create the canvas: {0}")]
    Engine(String),
    #[error("a {cols}x{rows} grid has no pieces")]
    EmptyGrid { cols: usize, rows: usize },
    #[error("match puzzles need one right asset per left asset ({left} left, {right} right)")]
    UnbalancedMatch { left: usize, right: usize },
}

/// Extra pieces and sizing of a match puzzle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchOptions {
    pub left_odd_assets: Vec<Background>,
    pub right_odd_assets: Vec<Background>,
    /// Multiplier applied to the width of right pieces.
    pub right_aspect_ratio: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            left_odd_assets: Vec::new(),
            right_odd_assets: Vec::new(),
            right_aspect_ratio: 1.0,
        }
    }
}

/// Outcome of restoring the previous solution on ready.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Restore {
    Absent,
    Applied,
    /// The stored content could not be parsed and was ignored.
    Ignored,
}

pub struct Muzzle<F: EngineFactory> {
    canvas_id: String,
    factory: F,
    settings: Settings,
    expected_refs: Option<Vec<Point>>,
    events: EventRegistry,
    canvas: Option<F::Engine>,
    restore: Restore,
}

impl<F: EngineFactory> Muzzle<F> {
    pub fn new(canvas_id: impl Into<String>, factory: F) -> Self {
        Muzzle {
            canvas_id: canvas_id.into(),
            factory,
            settings: Settings::default(),
            expected_refs: None,
            events: EventRegistry::new(),
            canvas: None,
            restore: Restore::Absent,
        }
    }

    pub fn canvas_id(&self) -> &str {
        &self.canvas_id
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Options written here before a build take precedence over the
    /// defaults the build would pick.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn events(&mut self) -> &mut EventRegistry {
        &mut self.events
    }

    pub fn canvas(&self) -> Option<&F::Engine> {
        self.canvas.as_ref()
    }

    pub fn canvas_mut(&mut self) -> Option<&mut F::Engine> {
        self.canvas.as_mut()
    }

    pub fn restore_outcome(&self) -> Restore {
        self.restore
    }

    /// Declares the expected layout, in piece units, used both by the basic
    /// puzzle validator and by server side grading.
    pub fn expect(&mut self, refs: Vec<Point>) {
        self.expected_refs = Some(refs);
    }

    pub fn expected_refs(&self) -> Option<&[Point]> {
        self.expected_refs.as_deref()
    }

    // ========
    // Building
    // ========

    /// Grid jigsaw cut from a single background.
    pub async fn basic<L>(
        &mut self,
        loader: &L,
        cols: usize,
        rows: usize,
        background: &Background,
    ) -> Result<&mut F::Engine, BuildError>
    where
        L: AssetLoader<Image = ImageOf<F>>,
    {
        self.prepare_basic(cols, rows)?;
        let image = background.load(loader).await?;
        self.assemble_basic(cols, rows, image)
    }

    /// Applies the grid puzzle defaults. Must precede the image load.
    pub fn prepare_basic(&mut self, cols: usize, rows: usize) -> Result<(), BuildError> {
        if cols == 0 || rows == 0 {
            return Err(BuildError::EmptyGrid { cols, rows });
        }
        let s = &mut self.settings;
        set_if_absent(&mut s.aspect_ratio, cols as f64 / rows as f64);
        set_if_absent(&mut s.simple, true);
        set_if_absent(&mut s.shuffler, Shuffler::Grid);
        set_if_absent(&mut s.spiky, false);
        set_if_absent(&mut s.auto_submit, true);
        Ok(())
    }

    pub fn assemble_basic(
        &mut self,
        cols: usize,
        rows: usize,
        image: ImageOf<F>,
    ) -> Result<&mut F::Engine, BuildError> {
        let mut config = self.settings.canvas_config();
        config.image = Some(image);
        let mut engine = self.create_engine(config)?;
        engine.adjust_images(ImageFit::Puzzle(self.settings.image_adjustment_axis()));
        engine.autogenerate(cols, rows);
        validator::attach_basic(
            &mut engine,
            self.expected_refs.as_deref(),
            self.settings.expected_refs_are_only_descriptive(),
        );
        engine.shuffle(self.settings.shuffler_or(Shuffler::Grid), SHUFFLE_FACTOR);
        tracing::debug!(cols, rows, canvas = %self.canvas_id, "basic puzzle assembled");
        Ok(self.finish(engine))
    }

    /// Left pieces matched against right pieces, with optional distractors
    /// on either side.
    pub async fn match_puzzle<L>(
        &mut self,
        loader: &L,
        lefts: &[Background],
        rights: &[Background],
        options: &MatchOptions,
    ) -> Result<&mut F::Engine, BuildError>
    where
        L: AssetLoader<Image = ImageOf<F>>,
    {
        let requests = self.prepare_match(lefts, rights, options)?;
        let templates = self.template_factory(loader).create(requests).await?;
        self.assemble_match(lefts.len(), templates)
    }

    /// Single pair match laid out on a line.
    pub async fn choose<L>(
        &mut self,
        loader: &L,
        left: &Background,
        right: &Background,
        left_odds: &[Background],
    ) -> Result<&mut F::Engine, BuildError>
    where
        L: AssetLoader<Image = ImageOf<F>>,
    {
        self.prepare_choose();
        let options = MatchOptions {
            left_odd_assets: left_odds.to_vec(),
            ..MatchOptions::default()
        };
        self.match_puzzle(
            loader,
            std::slice::from_ref(left),
            std::slice::from_ref(right),
            &options,
        )
        .await
    }

    pub fn prepare_choose(&mut self) {
        set_if_absent(&mut self.settings.shuffler, Shuffler::Line);
    }

    /// Applies the match defaults and lists the templates to load, in piece
    /// order: each left/right pair, then left odds, then right odds.
    pub fn prepare_match(
        &mut self,
        lefts: &[Background],
        rights: &[Background],
        options: &MatchOptions,
    ) -> Result<Vec<TemplateRequest>, BuildError> {
        if lefts.len() != rights.len() {
            return Err(BuildError::UnbalancedMatch {
                left: lefts.len(),
                right: rights.len(),
            });
        }
        let s = &mut self.settings;
        set_if_absent(&mut s.reference_insert_axis, Axis::Vertical);
        set_if_absent(&mut s.simple, false);
        set_if_absent(&mut s.shuffler, Shuffler::Columns);
        set_if_absent(&mut s.auto_submit, false);

        let unit = self.settings.piece_size();
        let right_size = self
            .settings
            .adjusted_piece_size()
            .multiply(Vector::new(options.right_aspect_ratio, 1.0));
        let left_request = |index: usize, background: &Background, id: String| TemplateRequest {
            background: background.clone(),
            structure: Structure::MATCH_LEFT,
            id,
            left: true,
            odd: false,
            right_target_id: None,
            target_position: Some(Vector::new(unit, unit * index as f64)),
            size: None,
        };
        let right_request = |index: usize, background: &Background, id: String| TemplateRequest {
            background: background.clone(),
            structure: Structure::MATCH_RIGHT,
            id,
            left: false,
            odd: false,
            right_target_id: None,
            target_position: Some(Vector::new(MATCH_COLUMNS * unit, unit * index as f64)),
            size: Some(right_size),
        };

        let mut requests = Vec::with_capacity(
            2 * lefts.len() + options.left_odd_assets.len() + options.right_odd_assets.len(),
        );
        for (i, (left, right)) in lefts.iter().zip(rights).enumerate() {
            requests.push(TemplateRequest {
                right_target_id: Some(format!("r{i}")),
                ..left_request(i + 1, left, format!("l{i}"))
            });
            requests.push(right_request(i + 1, right, format!("r{i}")));
        }
        for (i, odd) in options.left_odd_assets.iter().enumerate() {
            requests.push(TemplateRequest {
                odd: true,
                ..left_request(i + lefts.len(), odd, format!("lo{i}"))
            });
        }
        for (i, odd) in options.right_odd_assets.iter().enumerate() {
            requests.push(TemplateRequest {
                odd: true,
                ..right_request(i + rights.len(), odd, format!("ro{i}"))
            });
        }
        Ok(requests)
    }

    /// Template factory honouring the scale-to-fit option.
    pub fn template_factory<'a, L: AssetLoader>(&self, loader: &'a L) -> TemplateFactory<'a, L> {
        let fit = self.settings.scale_images_to_fit().then(|| ScaleToFit {
            piece_width: self.settings.adjusted_piece_size().x,
            border_fill: self.settings.border_fill(),
        });
        TemplateFactory::new(loader).scale_to_fit(fit)
    }

    pub fn assemble_match(
        &mut self,
        pairs: usize,
        templates: Vec<PieceTemplate<ImageOf<F>>>,
    ) -> Result<&mut F::Engine, BuildError> {
        let mut config = self.settings.canvas_config();
        config.max_pieces_count = Some(Vector::new(MATCH_COLUMNS, pairs as f64));
        let mut engine = self.create_engine(config)?;
        engine.adjust_images(ImageFit::Piece(self.settings.image_adjustment_axis()));
        let count = templates.len();
        for template in templates {
            engine.sketch_piece(template);
        }
        engine.shuffle(self.settings.shuffler_or(Shuffler::Columns), SHUFFLE_FACTOR);
        validator::attach_match(&mut engine);
        tracing::debug!(pairs, pieces = count, canvas = %self.canvas_id, "match puzzle assembled");
        Ok(self.finish(engine))
    }

    /// Registers a puzzle built outside of the builder.
    pub fn custom(&mut self, engine: F::Engine) -> &mut F::Engine {
        self.finish(engine)
    }

    fn create_engine(&self, config: CanvasConfig<ImageOf<F>>) -> Result<F::Engine, BuildError> {
        self.factory
            .create(&self.canvas_id, config)
            .map_err(|err| BuildError::Engine(err.to_string()))
    }

    fn finish(&mut self, mut engine: F::Engine) -> &mut F::Engine {
        self.restore = restore_previous(&self.settings, &mut engine);
        move_to_origin(&mut engine);
        engine.draw();
        let engine = self.canvas.insert(engine);
        self.events.fire_ready();
        engine
    }

    /// Loads the previous solution, moves the pieces to the origin, draws
    /// and fires the ready event.
    pub fn ready(&mut self) {
        if let Some(engine) = self.canvas.as_mut() {
            self.restore = restore_previous(&self.settings, engine);
            move_to_origin(engine);
            engine.draw();
        }
        self.events.fire_ready();
    }

    // ===========
    // Persistence
    // ===========

    pub fn solution(&self) -> Option<Solution> {
        self.canvas.as_ref().map(Solution::from_engine)
    }

    pub fn solution_content(&self) -> Result<Option<String>, SolutionError> {
        self.solution().map(|s| s.to_json()).transpose()
    }

    /// Moves the pieces to the given positions without drawing.
    pub fn load_solution(&mut self, solution: &Solution) {
        if let Some(engine) = self.canvas.as_mut() {
            relocate(engine, solution);
        }
    }

    pub fn load_previous_solution(&mut self) -> Restore {
        match self.canvas.as_mut() {
            Some(engine) => restore_previous(&self.settings, engine),
            None => Restore::Absent,
        }
    }

    /// Translates the pieces so the smallest coordinates become zero.
    pub fn reset_coordinates(&mut self) {
        if let Some(engine) = self.canvas.as_mut() {
            move_to_origin(engine);
        }
    }

    /// Stores the current solution as the previous one, for editors that
    /// persist it between sessions.
    pub fn sync_content(&mut self) -> Result<Option<String>, SolutionError> {
        let content = self.solution_content()?;
        if content.is_some() {
            self.settings.previous_solution_content = content.clone();
        }
        Ok(content)
    }

    // ==========
    // Submitting
    // ==========

    pub fn client_result_status(&self) -> Status {
        Status::from_validity(self.canvas.as_ref().is_some_and(|e| e.is_valid()))
    }

    pub fn gate(&self) -> SubmissionGate {
        SubmissionGate::new(self.settings.auto_submit())
    }

    /// Sends the current arrangement to the submit handlers. Returns the
    /// payload, or `None` when nothing was built yet.
    pub fn submit(&mut self) -> Result<Option<SubmissionPayload>, SolutionError> {
        let Some(engine) = self.canvas.as_ref() else {
            return Ok(None);
        };
        let payload = SubmissionPayload::capture(engine)?;
        self.events.fire_submit(&payload);
        Ok(Some(payload))
    }

    /// Called when the engine reports the puzzle became valid. Fires the
    /// valid handlers and returns the delay after which
    /// [`Muzzle::settle_submission`] must run, if automatic submission is on.
    pub fn notify_valid(&mut self) -> Option<Duration> {
        self.events.fire_valid();
        self.gate().on_valid()
    }

    /// Submits if the puzzle is still valid once it settled.
    pub fn settle_submission(&mut self) -> Result<Option<SubmissionPayload>, SolutionError> {
        let Some(engine) = self.canvas.as_ref() else {
            return Ok(None);
        };
        let payload = self.gate().settle(engine)?;
        if let Some(payload) = &payload {
            self.events.fire_submit(payload);
        }
        Ok(payload)
    }

    // =======
    // Scaling
    // =======

    /// Whether the canvas should follow its container size.
    pub fn follows_container(&self) -> bool {
        !self.settings.manual_scale()
    }

    /// Resizes the canvas to `width` x `height` and scales the puzzle to fit.
    /// Returns whether anything changed.
    pub fn scale(&mut self, width: f64, height: f64) -> bool {
        if self.settings.fixed_dimensions() {
            return false;
        }
        let Some(engine) = self.canvas.as_mut() else {
            return false;
        };
        let factor = optimal_scale_factor(width, height, engine.puzzle_diameter());
        engine.resize(width, height);
        engine.scale(factor);
        engine.redraw();
        true
    }
}

fn relocate<E: GeometryEngine>(engine: &mut E, solution: &Solution) {
    engine.relocate_to(&solution.positions);
    engine.autoconnect();
}

fn restore_previous<E: GeometryEngine>(settings: &Settings, engine: &mut E) -> Restore {
    let Some(content) = settings.previous_solution_content.as_deref() else {
        return Restore::Absent;
    };
    match Solution::restore(Some(content)) {
        Some(solution) => {
            relocate(engine, &solution);
            Restore::Applied
        }
        None => Restore::Ignored,
    }
}

fn move_to_origin<E: GeometryEngine>(engine: &mut E) {
    if let Some((dx, dy)) = Solution::canonical_offset(&engine.points()) {
        engine.translate(dx, dy);
    }
}

/// A context shared with host callbacks.
pub type Shared<F> = Rc<RefCell<Muzzle<F>>>;

/// Every puzzle context of a page: the main canvas plus any auxiliary ones
/// created with [`Page::another`].
pub struct Page<F: EngineFactory + Clone> {
    main: Shared<F>,
    aux: BTreeMap<String, Shared<F>>,
}

impl<F: EngineFactory + Clone> Page<F> {
    pub fn new(factory: F) -> Self {
        Page {
            main: Rc::new(RefCell::new(Muzzle::new(DEFAULT_CANVAS_ID, factory))),
            aux: BTreeMap::new(),
        }
    }

    pub fn main(&self) -> Shared<F> {
        self.main.clone()
    }

    /// Creates, or returns the already created, context of canvas `id`.
    pub fn another(&mut self, id: &str) -> Shared<F> {
        let factory = self.main.borrow().factory().clone();
        self.aux
            .entry(id.to_string())
            .or_insert_with(|| Rc::new(RefCell::new(Muzzle::new(id, factory))))
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Shared<F>> {
        if id == self.main.borrow().canvas_id() {
            Some(self.main.clone())
        } else {
            self.aux.get(id).cloned()
        }
    }
}
