use std::future::Future;

use serde::{Deserialize, Serialize};

/// Artwork for a puzzle or a single piece.
///
/// Hosts describe backgrounds either as a bare path string or as an object,
/// so the JSON form is untagged: `"a.png"`, `{"imageUrl": "a.png"}` or
/// `{"patchUrl": "sheet.png", "animationInterval": 100, ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Background {
    Path(String),
    Image(ImageSource),
    Animation(Animation),
}

impl Background {
    pub fn image(url: impl Into<String>) -> Self {
        Background::Image(ImageSource {
            image_url: url.into(),
        })
    }

    /// Url of the image file backing this background.
    pub fn url(&self) -> &str {
        match self {
            Background::Path(path) => path,
            Background::Image(src) => &src.image_url,
            Background::Animation(anim) => &anim.patch_url,
        }
    }

    /// Loads this background through `loader`.
    pub fn load<L: AssetLoader>(
        &self,
        loader: &L,
    ) -> impl Future<Output = Result<L::Image, LoadError>> {
        loader.load(self)
    }
}

impl From<&str> for Background {
    fn from(path: &str) -> Self {
        Background::Path(path.to_string())
    }
}

impl From<String> for Background {
    fn from(path: String) -> Self {
        Background::Path(path)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSource {
    pub image_url: String,
}

pub const DEFAULT_ANIMATION_INTERVAL_MS: u32 = 100;
pub const DEFAULT_PATCH_COLUMNS: u32 = 4;
pub const DEFAULT_PATCH_ROWS: u32 = 4;

fn default_interval() -> u32 {
    DEFAULT_ANIMATION_INTERVAL_MS
}

fn default_patch_columns() -> u32 {
    DEFAULT_PATCH_COLUMNS
}

fn default_patch_rows() -> u32 {
    DEFAULT_PATCH_ROWS
}

/// Sprite sheet of `patch_width` x `patch_height` frames played as the
/// puzzle background.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    pub patch_url: String,
    #[serde(default = "default_interval")]
    pub animation_interval: u32,
    #[serde(default = "default_patch_columns")]
    pub patch_width: u32,
    #[serde(default = "default_patch_rows")]
    pub patch_height: u32,
}

impl Animation {
    pub fn new(patch_url: impl Into<String>) -> Self {
        Animation {
            patch_url: patch_url.into(),
            animation_interval: DEFAULT_ANIMATION_INTERVAL_MS,
            patch_width: DEFAULT_PATCH_COLUMNS,
            patch_height: DEFAULT_PATCH_ROWS,
        }
    }

    /// Size of one frame of a sheet measuring `sheet_width` x `sheet_height`.
    pub fn frame_size(&self, sheet_width: f64, sheet_height: f64) -> (f64, f64) {
        (
            sheet_width / f64::from(self.patch_width.max(1)),
            sheet_height / f64::from(self.patch_height.max(1)),
        )
    }
}

/// Playback state of an [`Animation`].
///
/// The first frame is always painted; later frames only advance while the
/// puzzle is solved.
#[derive(Clone, Debug)]
pub struct AnimationClock {
    columns: u32,
    rows: u32,
    x_offset: u32,
    y_offset: u32,
    first: bool,
}

impl AnimationClock {
    pub fn new(animation: &Animation) -> Self {
        AnimationClock {
            columns: animation.patch_width.max(1),
            rows: animation.patch_height.max(1),
            x_offset: 0,
            y_offset: 0,
            first: true,
        }
    }

    /// Advances one tick. Returns where the sheet must be drawn so the
    /// current frame lands at the frame canvas origin, or `None` when
    /// nothing should be painted.
    pub fn tick(
        &mut self,
        canvas_ready: bool,
        puzzle_valid: bool,
        frame: (f64, f64),
    ) -> Option<(f64, f64)> {
        if !canvas_ready || !(self.first || puzzle_valid) {
            return None;
        }
        self.first = false;
        let origin = (
            f64::from(self.x_offset) * -frame.0,
            f64::from(self.y_offset) * -frame.1,
        );
        self.x_offset += 1;
        if self.x_offset == self.columns {
            self.x_offset = 0;
            self.y_offset += 1;
            if self.y_offset == self.rows {
                self.y_offset = 0;
            }
        }
        Some(origin)
    }
}

/// Pixel dimensions of a decoded image.
pub trait ImageSize {
    fn width(&self) -> f64;
    fn height(&self) -> f64;
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("failed to load {url}: {reason}")]
    Failed { url: String, reason: String },
    #[error("loader resolved {loaded} images for {requested} requests")]
    Incomplete { requested: usize, loaded: usize },
}

/// Decodes backgrounds into images the geometry engine can paint.
pub trait AssetLoader {
    type Image: ImageSize + Clone;

    fn load(
        &self,
        background: &Background,
    ) -> impl Future<Output = Result<Self::Image, LoadError>>;

    /// Loads every background concurrently. Implementations start all loads
    /// before awaiting any of them and resolve only once each one settled,
    /// failing as a whole if any single load fails.
    fn load_all(
        &self,
        backgrounds: &[Background],
    ) -> impl Future<Output = Result<Vec<Self::Image>, LoadError>>;
}
