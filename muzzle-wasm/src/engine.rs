//! Geometry engine backed by the host page's `headbreaker` library.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function, Reflect};
use muzzle_core::config::CanvasConfig;
use muzzle_core::{
    Axis, EngineFactory, GeometryEngine, ImageFit, LivePiece, Muzzle, Outline, PieceTemplate,
    Point, PuzzleView, Shuffler, Validator, Vector,
};
use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::loader::BoardImage;
use crate::utils::{call_method, error_message, from_js, get, set, to_js};

pub type Context = Muzzle<JsEngineFactory>;

fn headbreaker() -> Result<JsValue, JsValue> {
    let hb = get(&js_sys::global(), "headbreaker")?;
    if hb.is_undefined() {
        return Err(JsValue::from_str("headbreaker is not loaded"));
    }
    Ok(hb)
}

fn axis(hb: &JsValue, axis: Axis) -> Result<JsValue, JsValue> {
    match axis {
        Axis::Horizontal => get(hb, "Horizontal"),
        Axis::Vertical => get(hb, "Vertical"),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoundedOptions {
    bezelize: bool,
    insert_depth: f64,
    bezel_depth: f64,
}

fn outline(hb: &JsValue, outline: Outline) -> Result<JsValue, JsValue> {
    let outlines = get(hb, "outline")?;
    match outline {
        Outline::Classic => get(&outlines, "Classic"),
        Outline::Rounded {
            bezelize,
            insert_depth,
            bezel_depth,
            reference_insert_axis,
        } => {
            let options = to_js(&RoundedOptions {
                bezelize,
                insert_depth,
                bezel_depth,
            })?;
            if let Some(reference) = reference_insert_axis {
                set(&options, "referenceInsertAxis", &axis(hb, reference)?)?;
            }
            let ctor: Function = get(&outlines, "Rounded")?.dyn_into()?;
            Reflect::construct(&ctor, &Array::of1(&options))
        }
    }
}

/// Creates `headbreaker.Canvas` instances.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsEngineFactory;

impl JsEngineFactory {
    fn build(canvas_id: &str, config: &CanvasConfig<BoardImage>) -> Result<JsValue, JsValue> {
        let hb = headbreaker()?;
        let options = to_js(config)?;
        set(&options, "outline", &outline(&hb, config.outline)?)?;
        if let Some(image) = &config.image {
            set(&options, "image", image.element())?;
        }
        let ctor: Function = get(&hb, "Canvas")?.dyn_into()?;
        Reflect::construct(&ctor, &Array::of2(&JsValue::from_str(canvas_id), &options))
    }
}

impl EngineFactory for JsEngineFactory {
    type Engine = JsEngine;
    type Error = String;

    fn create(
        &self,
        canvas_id: &str,
        config: CanvasConfig<BoardImage>,
    ) -> Result<JsEngine, String> {
        Self::build(canvas_id, &config)
            .map(JsEngine::new)
            .map_err(|err| error_message(&err))
    }
}

/// Read-only view over a `headbreaker.Puzzle`.
struct JsPuzzleView {
    puzzle: JsValue,
}

impl JsPuzzleView {
    fn read_pieces(&self) -> Result<Vec<LivePiece>, JsValue> {
        let points: Vec<Point> = from_js(&get(&self.puzzle, "points")?)?;
        let pieces = Array::from(&get(&self.puzzle, "pieces")?);
        pieces
            .iter()
            .zip(points)
            .map(|(piece, position)| {
                let metadata = get(&piece, "metadata")?;
                let connection = get(&piece, "rightConnection")?;
                let right_connection = if connection.is_object() {
                    get(&connection, "id")?.as_string()
                } else {
                    None
                };
                Ok::<_, JsValue>(LivePiece {
                    id: get(&metadata, "id")?.as_string(),
                    left: get(&metadata, "left")?.as_bool().unwrap_or(false),
                    odd: get(&metadata, "odd")?.as_bool().unwrap_or(false),
                    right_target_id: get(&metadata, "rightTargetId")?.as_string(),
                    right_connection,
                    position,
                })
            })
            .collect()
    }
}

impl PuzzleView for JsPuzzleView {
    fn pieces(&self) -> Vec<LivePiece> {
        self.read_pieces().unwrap_or_else(|err| {
            report("reading pieces", &err);
            Vec::new()
        })
    }

    fn piece_diameter(&self) -> Vector {
        get(&self.puzzle, "pieceDiameter")
            .and_then(|d| from_js(&d))
            .unwrap_or_else(|err| {
                report("reading piece diameter", &err);
                Vector::uniform(1.0)
            })
    }

    fn connected(&self) -> bool {
        get(&self.puzzle, "connected")
            .map(|c| c.as_bool().unwrap_or(false))
            .unwrap_or(false)
    }
}

fn report(op: &str, err: &JsValue) {
    tracing::warn!(error = %error_message(err), "headbreaker call failed while {op}");
}

type ValidatorHook = Closure<dyn FnMut(JsValue) -> bool>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Autogenerate {
    horizontal_pieces_count: usize,
    vertical_pieces_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SketchMetadata<'a> {
    id: &'a str,
    left: bool,
    odd: bool,
    right_target_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_position: Option<Vector>,
}

#[derive(Serialize)]
struct ImagePlacement {
    offset: Vector,
    scale: f64,
}

/// A live `headbreaker.Canvas`.
pub struct JsEngine {
    canvas: JsValue,
    validator: Rc<RefCell<Option<Validator>>>,
    hook: Option<ValidatorHook>,
}

impl JsEngine {
    pub fn new(canvas: JsValue) -> Self {
        JsEngine {
            canvas,
            validator: Rc::new(RefCell::new(None)),
            hook: None,
        }
    }

    pub fn js(&self) -> &JsValue {
        &self.canvas
    }

    fn puzzle(&self) -> Result<JsValue, JsValue> {
        get(&self.canvas, "puzzle")
    }

    fn view(&self) -> Result<JsPuzzleView, JsValue> {
        Ok(JsPuzzleView {
            puzzle: self.puzzle()?,
        })
    }

    fn call(&self, op: &str, args: &[JsValue]) {
        if let Err(err) = call_method(&self.canvas, op, args) {
            report(op, &err);
        }
    }

    fn call_puzzle(&self, op: &str, args: &[JsValue]) {
        if let Err(err) = self.puzzle().and_then(|p| call_method(&p, op, args)) {
            report(op, &err);
        }
    }

    /// Refills piece images from their sources and redraws, used after an
    /// animated background painted a new frame.
    pub fn repaint(&self) {
        self.call("refill", &[]);
        self.call("redraw", &[]);
    }

    /// Registers a listener for the engine's own validity notifications.
    pub fn on_valid(&self, listener: &Function) -> Result<(), JsValue> {
        call_method(&self.canvas, "onValid", &[listener.clone().into()]).map(|_| ())
    }

    fn sketch(&self, template: PieceTemplate<BoardImage>) -> Result<(), JsValue> {
        let hb = headbreaker()?;
        let meta = &template.metadata;
        let metadata = to_js(&SketchMetadata {
            id: &meta.id,
            left: meta.left,
            odd: meta.odd,
            right_target_id: meta.right_target_id.as_deref(),
            target_position: meta.target_position,
        })?;
        let image = to_js(&ImagePlacement {
            offset: meta.image.offset,
            scale: meta.image.scale,
        })?;
        set(&image, "content", meta.image.content.element())?;
        set(&metadata, "image", &image)?;

        let piece = js_sys::Object::new();
        set(&piece, "structure", &JsValue::from_str(&template.structure.to_string()))?;
        set(&piece, "metadata", &metadata)?;
        if let Some(size) = template.size {
            let size = call_method(&hb, "diameter", &[to_js(&size)?])?;
            set(&piece, "size", &size)?;
        }
        call_method(&self.canvas, "sketchPiece", &[piece.into()]).map(|_| ())
    }

    fn install_validator(&mut self, validator: Validator) -> Result<(), JsValue> {
        *self.validator.borrow_mut() = Some(validator);
        let shared = self.validator.clone();
        let hook = Closure::<dyn FnMut(JsValue) -> bool>::wrap(Box::new(move |puzzle: JsValue| {
            shared
                .borrow()
                .as_ref()
                .is_some_and(|v| v.is_valid(&JsPuzzleView { puzzle }))
        }));
        let ctor: Function = get(&headbreaker()?, "PuzzleValidator")?.dyn_into()?;
        let js_validator = Reflect::construct(&ctor, &Array::of1(hook.as_ref()))?;
        call_method(&self.canvas, "attachValidator", &[js_validator])?;
        self.hook = Some(hook);
        Ok(())
    }
}

impl GeometryEngine for JsEngine {
    type Image = BoardImage;

    fn autogenerate(&mut self, horizontal: usize, vertical: usize) {
        match to_js(&Autogenerate {
            horizontal_pieces_count: horizontal,
            vertical_pieces_count: vertical,
        }) {
            Ok(options) => self.call("autogenerate", &[options]),
            Err(err) => report("autogenerate", &err),
        }
    }

    fn sketch_piece(&mut self, template: PieceTemplate<BoardImage>) {
        if let Err(err) = self.sketch(template) {
            report("sketchPiece", &err);
        }
    }

    fn adjust_images(&mut self, fit: ImageFit) {
        let (op, direction) = match fit {
            ImageFit::Puzzle(a) => ("adjustImagesToPuzzle", a),
            ImageFit::Piece(a) => ("adjustImagesToPiece", a),
        };
        match headbreaker().and_then(|hb| axis(&hb, direction)) {
            Ok(direction) => self.call(op, &[direction]),
            Err(err) => report(op, &err),
        }
    }

    fn shuffle(&mut self, shuffler: Shuffler, factor: f64) {
        let factor = JsValue::from_f64(factor);
        match shuffler {
            Shuffler::Grid => self.call("shuffleGrid", &[factor]),
            Shuffler::Columns => self.call("shuffleColumns", &[factor]),
            Shuffler::Random => self.call("shuffle", &[factor]),
            Shuffler::Line => {
                match headbreaker()
                    .and_then(|hb| get(&hb, "shuffler"))
                    .and_then(|s| get(&s, "line"))
                {
                    Ok(line) => self.call("shuffleWith", &[factor, line]),
                    Err(err) => report("shuffleWith", &err),
                }
            }
        }
    }

    fn attach_validator(&mut self, validator: Validator) {
        if let Err(err) = self.install_validator(validator) {
            report("attachValidator", &err);
        }
    }

    fn is_valid(&self) -> bool {
        let validator = self.validator.borrow();
        let Some(validator) = validator.as_ref() else {
            // adopted canvases carry their own headbreaker validator
            return get(&self.canvas, "valid")
                .map(|v| v.as_bool().unwrap_or(false))
                .unwrap_or_else(|err| {
                    report("reading canvas validity", &err);
                    false
                });
        };
        match self.view() {
            Ok(view) => validator.is_valid(&view),
            Err(err) => {
                report("reading puzzle", &err);
                false
            }
        }
    }

    fn points(&self) -> Vec<Point> {
        self.puzzle()
            .and_then(|p| get(&p, "points"))
            .and_then(|points| from_js(&points))
            .unwrap_or_else(|err| {
                report("reading points", &err);
                Vec::new()
            })
    }

    fn relocate_to(&mut self, points: &[Point]) {
        match to_js(points) {
            Ok(points) => self.call_puzzle("relocateTo", &[points]),
            Err(err) => report("relocateTo", &err),
        }
    }

    fn autoconnect(&mut self) {
        self.call_puzzle("autoconnect", &[]);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.call_puzzle("translate", &[JsValue::from_f64(dx), JsValue::from_f64(dy)]);
    }

    fn draw(&mut self) {
        self.call("draw", &[]);
    }

    fn redraw(&mut self) {
        self.call("redraw", &[]);
    }

    fn resize(&mut self, width: f64, height: f64) {
        self.call("resize", &[JsValue::from_f64(width), JsValue::from_f64(height)]);
    }

    fn scale(&mut self, factor: f64) {
        self.call("scale", &[JsValue::from_f64(factor)]);
    }

    fn puzzle_diameter(&self) -> Vector {
        get(&self.canvas, "puzzleDiameter")
            .and_then(|d| from_js(&d))
            .unwrap_or_else(|err| {
                report("reading puzzle diameter", &err);
                Vector::uniform(1.0)
            })
    }
}
