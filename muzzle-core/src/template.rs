use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::background::{AssetLoader, Background, ImageSize, LoadError};
use crate::geometry::Vector;

/// Shape of one piece side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Tab,
    Slot,
    Flat,
}

impl Edge {
    fn from_code(c: char) -> Option<Edge> {
        match c {
            'T' => Some(Edge::Tab),
            'S' => Some(Edge::Slot),
            '-' | 'N' => Some(Edge::Flat),
            _ => None,
        }
    }

    fn code(self) -> char {
        match self {
            Edge::Tab => 'T',
            Edge::Slot => 'S',
            Edge::Flat => '-',
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid piece structure {0:?}: expected four of T, S, N or -")]
pub struct StructureError(pub String);

/// Edge shapes of a piece, written as a four character code in the order
/// right, down, left, up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Structure {
    pub right: Edge,
    pub down: Edge,
    pub left: Edge,
    pub up: Edge,
}

impl Structure {
    /// Left column of a match puzzle: a single tab pointing right.
    pub const MATCH_LEFT: Structure = Structure {
        right: Edge::Tab,
        down: Edge::Flat,
        left: Edge::Flat,
        up: Edge::Flat,
    };

    /// Right column of a match puzzle: a single slot facing left.
    pub const MATCH_RIGHT: Structure = Structure {
        right: Edge::Flat,
        down: Edge::Flat,
        left: Edge::Slot,
        up: Edge::Flat,
    };
}

impl FromStr for Structure {
    type Err = StructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let edges: Vec<Edge> = s
            .chars()
            .map(Edge::from_code)
            .collect::<Option<_>>()
            .ok_or_else(|| StructureError(s.to_string()))?;
        match edges.as_slice() {
            [right, down, left, up] => Ok(Structure {
                right: *right,
                down: *down,
                left: *left,
                up: *up,
            }),
            _ => Err(StructureError(s.to_string())),
        }
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for edge in [self.right, self.down, self.left, self.up] {
            write!(f, "{}", edge.code())?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Structure {
    type Error = StructureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Structure> for String {
    fn from(s: Structure) -> Self {
        s.to_string()
    }
}

/// Image painted on a piece, with the placement the engine applies to it.
#[derive(Clone, Debug, PartialEq)]
pub struct PieceImage<I> {
    pub content: I,
    pub offset: Vector,
    pub scale: f64,
}

impl<I> PieceImage<I> {
    pub fn unscaled(content: I) -> Self {
        PieceImage {
            content,
            offset: Vector::ZERO,
            scale: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TemplateMetadata<I> {
    pub id: String,
    pub left: bool,
    pub odd: bool,
    pub right_target_id: Option<String>,
    pub image: PieceImage<I>,
    pub target_position: Option<Vector>,
}

/// Description of a piece before the geometry engine cuts it.
#[derive(Clone, Debug, PartialEq)]
pub struct PieceTemplate<I> {
    pub structure: Structure,
    pub metadata: TemplateMetadata<I>,
    pub size: Option<Vector>,
}

/// A template waiting for its image.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateRequest {
    pub background: Background,
    pub structure: Structure,
    pub id: String,
    pub left: bool,
    pub odd: bool,
    pub right_target_id: Option<String>,
    pub target_position: Option<Vector>,
    pub size: Option<Vector>,
}

impl TemplateRequest {
    pub fn into_template<I>(self, image: PieceImage<I>) -> PieceTemplate<I> {
        PieceTemplate {
            structure: self.structure,
            metadata: TemplateMetadata {
                id: self.id,
                left: self.left,
                odd: self.odd,
                right_target_id: self.right_target_id,
                image,
                target_position: self.target_position,
            },
            size: self.size,
        }
    }
}

/// Scales each piece image so its width matches the piece and shifts it
/// by the border fill so the artwork sits inside the bezel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleToFit {
    pub piece_width: f64,
    pub border_fill: Vector,
}

impl ScaleToFit {
    pub fn apply<I: ImageSize>(&self, content: I) -> PieceImage<I> {
        let width = content.width();
        if width <= 0.0 {
            return PieceImage::unscaled(content);
        }
        let scale = self.piece_width / width;
        PieceImage {
            offset: self.border_fill.divide(scale),
            scale,
            content,
        }
    }
}

/// Loads template images and produces piece templates.
pub struct TemplateFactory<'a, L> {
    loader: &'a L,
    fit: Option<ScaleToFit>,
}

impl<'a, L: AssetLoader> TemplateFactory<'a, L> {
    pub fn new(loader: &'a L) -> Self {
        TemplateFactory { loader, fit: None }
    }

    pub fn scale_to_fit(mut self, fit: Option<ScaleToFit>) -> Self {
        self.fit = fit;
        self
    }

    /// Loads every request's image at once and builds the templates in
    /// request order. Nothing is returned unless every load succeeded.
    pub async fn create(
        &self,
        requests: Vec<TemplateRequest>,
    ) -> Result<Vec<PieceTemplate<L::Image>>, LoadError> {
        let backgrounds: Vec<Background> =
            requests.iter().map(|r| r.background.clone()).collect();
        let images = self.loader.load_all(&backgrounds).await?;
        if images.len() != requests.len() {
            return Err(LoadError::Incomplete {
                requested: requests.len(),
                loaded: images.len(),
            });
        }
        tracing::debug!(count = images.len(), "piece images loaded");
        Ok(requests
            .into_iter()
            .zip(images)
            .map(|(request, image)| request.into_template(self.image(image)))
            .collect())
    }

    fn image(&self, content: L::Image) -> PieceImage<L::Image> {
        match &self.fit {
            Some(fit) => fit.apply(content),
            None => PieceImage::unscaled(content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Pic(f64);

    impl ImageSize for Pic {
        fn width(&self) -> f64 {
            self.0
        }
        fn height(&self) -> f64 {
            self.0
        }
    }

    #[test]
    fn match_structures_render_as_codes() {
        assert_eq!(Structure::MATCH_LEFT.to_string(), "T---");
        assert_eq!(Structure::MATCH_RIGHT.to_string(), "--S-");
    }

    #[test]
    fn flat_edges_accept_both_spellings() {
        let parsed: Structure = "T-N-".parse().unwrap();
        assert_eq!(parsed, Structure::MATCH_LEFT);
        let parsed: Structure = "N-S-".parse().unwrap();
        assert_eq!(parsed, Structure::MATCH_RIGHT);
    }

    #[test]
    fn bad_structures_are_rejected() {
        assert!("T--".parse::<Structure>().is_err());
        assert!("TXS-".parse::<Structure>().is_err());
        assert!(serde_json::from_str::<Structure>("\"TSTS\"").is_ok());
    }

    #[test]
    fn scale_to_fit_matches_piece_width() {
        let fit = ScaleToFit {
            piece_width: 100.0,
            border_fill: Vector::new(10.0, 10.0),
        };
        let image = fit.apply(Pic(400.0));
        assert_eq!(image.scale, 0.25);
        assert_eq!(image.offset, Vector::new(40.0, 40.0));
    }
}
