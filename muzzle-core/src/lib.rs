//! Jigsaw and match puzzle exercises: puzzle construction, validation,
//! solution persistence and grading, independent of any rendering backend.

pub mod background;
pub mod builder;
pub mod config;
pub mod engine;
pub mod events;
pub mod geometry;
pub mod grading;
pub mod solution;
pub mod submission;
pub mod template;
pub mod validator;

pub use background::{Animation, AnimationClock, AssetLoader, Background, ImageSize, LoadError};
pub use builder::{BuildError, MatchOptions, Muzzle, Page, Restore, Shared};
pub use config::{CanvasConfig, ImageFit, Outline, Settings, Shuffler};
pub use engine::{EngineFactory, GeometryEngine, LivePiece, PuzzleView};
pub use events::{Event, EventRegistry};
pub use geometry::{Axis, Point, Vector};
pub use grading::{GradingRequest, GradingResponse, grade};
pub use solution::{Solution, SolutionError};
pub use submission::{ClientResult, Status, SubmissionGate, SubmissionPayload};
pub use template::{PieceTemplate, Structure, TemplateRequest};
pub use validator::Validator;
