//! Puzzle options and the canvas configuration derived from them.
//!
//! Every option in [`Settings`] starts unset. Builders only fill options
//! that are still unset, so anything the host configured before calling
//! `basic`/`match` survives the build.

use serde::{Deserialize, Serialize};

use crate::geometry::{Axis, Vector};

pub const DEFAULT_CANVAS_WIDTH: f64 = 600.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 600.0;
pub const DEFAULT_PIECE_SIZE: f64 = 100.0;
pub const DEFAULT_STROKE_WIDTH: f64 = 3.0;
pub const LINE_SOFTNESS: f64 = 0.18;
/// Share of pieces displaced by the shufflers.
pub const SHUFFLE_FACTOR: f64 = 0.8;
/// Proximity threshold is the smaller piece side divided by this.
pub const PROXIMITY_DIVISOR: f64 = 5.0;
/// Classic outlines fill this fraction of the piece size when unset.
pub const BORDER_FILL_DIVISOR: f64 = 10.0;
pub const INSERT_DEPTH: f64 = 3.0 / 5.0;
pub const BEZEL_DEPTH: f64 = 9.0 / 10.0;
/// Time given to the final snap animation before an automatic submission.
pub const SETTLE_DELAY_MS: u32 = 1500;

/// Strategy used to scatter pieces after a build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shuffler {
    /// Swaps pieces around the grid.
    Grid,
    /// Shuffles pieces inside their own column.
    Columns,
    /// Lays pieces on a single line.
    Line,
    Random,
}

/// How pieces are cut out of the board.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Outline {
    Classic,
    #[serde(rename_all = "camelCase")]
    Rounded {
        bezelize: bool,
        insert_depth: f64,
        bezel_depth: f64,
        reference_insert_axis: Option<Axis>,
    },
}

/// Image adjustment applied by the geometry engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFit {
    /// One image stretched over the whole board.
    Puzzle(Axis),
    /// One image per piece.
    Piece(Axis),
}

/// Host facing puzzle options. `None` means unset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub canvas_width: Option<f64>,
    pub canvas_height: Option<f64>,
    /// Keep the canvas size when the container resizes.
    pub fixed_dimensions: Option<bool>,
    /// Only meaningful for spiky (classic) outlines.
    pub border_fill: Option<Vector>,
    pub stroke_width: Option<f64>,
    pub piece_size: Option<f64>,
    /// x:y ratio of a piece.
    pub aspect_ratio: Option<f64>,
    pub fit_images_vertically: Option<bool>,
    pub scale_images_to_fit: Option<bool>,
    pub manual_scale: Option<bool>,
    /// Whether the puzzle is solvable in very few tries.
    pub simple: Option<bool>,
    pub spiky: Option<bool>,
    pub reference_insert_axis: Option<Axis>,
    pub shuffler: Option<Shuffler>,
    /// Keep expected refs for server side grading only.
    pub expected_refs_are_only_descriptive: Option<bool>,
    pub auto_submit: Option<bool>,
    pub previous_solution_content: Option<String>,
}

/// Writes `value` into `slot` unless something is already there.
pub(crate) fn set_if_absent<T>(slot: &mut Option<T>, value: T) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

macro_rules! overlay {
    ($target:expr, $source:expr; $($field:ident),+ $(,)?) => {
        $(
            if $source.$field.is_some() {
                $target.$field = $source.$field;
            }
        )+
    };
}

impl Settings {
    /// Applies every option explicitly set in `other` on top of `self`.
    pub fn merge(&mut self, other: Settings) {
        overlay!(self, other;
            canvas_width,
            canvas_height,
            fixed_dimensions,
            border_fill,
            stroke_width,
            piece_size,
            aspect_ratio,
            fit_images_vertically,
            scale_images_to_fit,
            manual_scale,
            simple,
            spiky,
            reference_insert_axis,
            shuffler,
            expected_refs_are_only_descriptive,
            auto_submit,
            previous_solution_content,
        );
    }

    pub fn piece_size(&self) -> f64 {
        self.piece_size.unwrap_or(DEFAULT_PIECE_SIZE)
    }

    /// The piece size stretched by the aspect ratio.
    pub fn adjusted_piece_size(&self) -> Vector {
        let ratio = self.aspect_ratio.unwrap_or(1.0);
        let size = self.piece_size();
        Vector::new(size / ratio, size)
    }

    pub fn image_adjustment_axis(&self) -> Axis {
        if self.fit_images_vertically.unwrap_or(false) {
            Axis::Vertical
        } else {
            Axis::Horizontal
        }
    }

    pub fn is_spiky(&self) -> bool {
        self.spiky.unwrap_or(false)
    }

    pub fn is_simple(&self) -> bool {
        self.simple.unwrap_or(false)
    }

    pub fn border_fill(&self) -> Vector {
        if self.is_spiky() {
            self.border_fill
                .unwrap_or_else(|| self.adjusted_piece_size().divide(BORDER_FILL_DIVISOR))
        } else {
            Vector::ZERO
        }
    }

    pub fn outline(&self) -> Outline {
        if self.is_spiky() {
            Outline::Classic
        } else {
            Outline::Rounded {
                bezelize: true,
                insert_depth: INSERT_DEPTH,
                bezel_depth: BEZEL_DEPTH,
                reference_insert_axis: self.reference_insert_axis,
            }
        }
    }

    pub fn proximity(&self) -> f64 {
        self.adjusted_piece_size().min_component() / PROXIMITY_DIVISOR
    }

    pub fn shuffler_or(&self, fallback: Shuffler) -> Shuffler {
        self.shuffler.unwrap_or(fallback)
    }

    pub fn expected_refs_are_only_descriptive(&self) -> bool {
        self.expected_refs_are_only_descriptive.unwrap_or(false)
    }

    pub fn auto_submit(&self) -> bool {
        self.auto_submit.unwrap_or(false)
    }

    pub fn manual_scale(&self) -> bool {
        self.manual_scale.unwrap_or(false)
    }

    pub fn fixed_dimensions(&self) -> bool {
        self.fixed_dimensions.unwrap_or(false)
    }

    pub fn scale_images_to_fit(&self) -> bool {
        self.scale_images_to_fit.unwrap_or(false)
    }

    /// Canvas configuration handed to the geometry engine.
    pub fn canvas_config<I>(&self) -> CanvasConfig<I> {
        CanvasConfig {
            width: self.canvas_width.unwrap_or(DEFAULT_CANVAS_WIDTH),
            height: self.canvas_height.unwrap_or(DEFAULT_CANVAS_HEIGHT),
            piece_size: self.adjusted_piece_size(),
            proximity: self.proximity(),
            stroke_width: self.stroke_width.unwrap_or(DEFAULT_STROKE_WIDTH),
            line_softness: LINE_SOFTNESS,
            border_fill: self.border_fill(),
            outline: self.outline(),
            max_pieces_count: None,
            image: None,
        }
    }
}

/// Concrete configuration of one canvas.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasConfig<I> {
    pub width: f64,
    pub height: f64,
    pub piece_size: Vector,
    pub proximity: f64,
    pub stroke_width: f64,
    pub line_softness: f64,
    pub border_fill: Vector,
    pub outline: Outline,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pieces_count: Option<Vector>,
    /// Board image for puzzles cut from a single picture.
    #[serde(skip)]
    pub image: Option<I>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_rounded_square_canvas() {
        let cfg: CanvasConfig<()> = Settings::default().canvas_config();
        assert_eq!(cfg.width, 600.0);
        assert_eq!(cfg.height, 600.0);
        assert_eq!(cfg.piece_size, Vector::new(100.0, 100.0));
        assert_eq!(cfg.proximity, 20.0);
        assert_eq!(cfg.stroke_width, 3.0);
        assert_eq!(cfg.border_fill, Vector::ZERO);
        assert!(matches!(cfg.outline, Outline::Rounded { bezelize: true, .. }));
    }

    #[test]
    fn aspect_ratio_stretches_piece_width() {
        let settings = Settings {
            aspect_ratio: Some(2.0),
            ..Default::default()
        };
        assert_eq!(settings.adjusted_piece_size(), Vector::new(50.0, 100.0));
        assert_eq!(settings.proximity(), 10.0);
    }

    #[test]
    fn spiky_outline_fills_a_tenth_of_the_piece() {
        let mut settings = Settings {
            spiky: Some(true),
            ..Default::default()
        };
        assert_eq!(settings.outline(), Outline::Classic);
        assert_eq!(settings.border_fill(), Vector::new(10.0, 10.0));
        settings.border_fill = Some(Vector::new(4.0, 4.0));
        assert_eq!(settings.border_fill(), Vector::new(4.0, 4.0));
    }

    #[test]
    fn set_if_absent_keeps_first_write() {
        let mut slot = Some(3);
        set_if_absent(&mut slot, 7);
        assert_eq!(slot, Some(3));
        let mut empty = None;
        set_if_absent(&mut empty, 7);
        assert_eq!(empty, Some(7));
    }

    #[test]
    fn merge_only_overrides_explicit_options() {
        let mut base = Settings {
            piece_size: Some(80.0),
            simple: Some(true),
            ..Default::default()
        };
        let host: Settings =
            serde_json::from_str(r#"{"canvasWidth": 900, "shuffler": "line"}"#).unwrap();
        base.merge(host);
        assert_eq!(base.piece_size, Some(80.0));
        assert_eq!(base.simple, Some(true));
        assert_eq!(base.canvas_width, Some(900.0));
        assert_eq!(base.shuffler, Some(Shuffler::Line));
    }

    #[test]
    fn outline_serializes_with_kind_tag() {
        let json = serde_json::to_value(Settings::default().outline()).unwrap();
        assert_eq!(json["kind"], "rounded");
        assert_eq!(json["insertDepth"], INSERT_DEPTH);
        assert!(json["referenceInsertAxis"].is_null());
    }
}
