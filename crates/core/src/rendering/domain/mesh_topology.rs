//! Which landmarks are joined by a line when a face is drawn.
//!
//! Indices refer to the 468-point face mesh; the iris connections need the
//! 478-point variant.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::TESSELLATION_FILE_NAME;

#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("failed to read topology {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid topology JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("topology has no connections")]
    Empty,
}

#[rustfmt::skip]
pub const FACE_OVAL: &[(usize, usize)] = &[
    (10, 338), (338, 297), (297, 332), (332, 284), (284, 251), (251, 389),
    (389, 356), (356, 454), (454, 323), (323, 361), (361, 288), (288, 397),
    (397, 365), (365, 379), (379, 378), (378, 400), (400, 377), (377, 152),
    (152, 148), (148, 176), (176, 149), (149, 150), (150, 136), (136, 172),
    (172, 58), (58, 132), (132, 93), (93, 234), (234, 127), (127, 162),
    (162, 21), (21, 54), (54, 103), (103, 67), (67, 109), (109, 10),
];

#[rustfmt::skip]
pub const LIPS: &[(usize, usize)] = &[
    (61, 146), (146, 91), (91, 181), (181, 84), (84, 17), (17, 314),
    (314, 405), (405, 321), (321, 375), (375, 291), (61, 185), (185, 40),
    (40, 39), (39, 37), (37, 0), (0, 267), (267, 269), (269, 270),
    (270, 409), (409, 291), (78, 95), (95, 88), (88, 178), (178, 87),
    (87, 14), (14, 317), (317, 402), (402, 318), (318, 324), (324, 308),
    (78, 191), (191, 80), (80, 81), (81, 82), (82, 13), (13, 312),
    (312, 311), (311, 310), (310, 415), (415, 308),
];

#[rustfmt::skip]
pub const LEFT_EYE: &[(usize, usize)] = &[
    (263, 249), (249, 390), (390, 373), (373, 374), (374, 380), (380, 381),
    (381, 382), (382, 362), (263, 466), (466, 388), (388, 387), (387, 386),
    (386, 385), (385, 384), (384, 398), (398, 362),
];

#[rustfmt::skip]
pub const LEFT_EYEBROW: &[(usize, usize)] = &[
    (276, 283), (283, 282), (282, 295), (295, 285), (300, 293), (293, 334),
    (334, 296), (296, 336),
];

#[rustfmt::skip]
pub const RIGHT_EYE: &[(usize, usize)] = &[
    (33, 7), (7, 163), (163, 144), (144, 145), (145, 153), (153, 154),
    (154, 155), (155, 133), (33, 246), (246, 161), (161, 160), (160, 159),
    (159, 158), (158, 157), (157, 173), (173, 133),
];

#[rustfmt::skip]
pub const RIGHT_EYEBROW: &[(usize, usize)] = &[
    (46, 53), (53, 52), (52, 65), (65, 55), (70, 63), (63, 105),
    (105, 66), (66, 107),
];

pub const LEFT_IRIS: &[(usize, usize)] = &[(474, 475), (475, 476), (476, 477), (477, 474)];

pub const RIGHT_IRIS: &[(usize, usize)] = &[(469, 470), (470, 471), (471, 472), (472, 469)];

/// Static graph of landmark index pairs.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshTopology {
    edges: Vec<(usize, usize)>,
}

impl MeshTopology {
    pub fn new(edges: Vec<(usize, usize)>) -> Result<Self, TopologyError> {
        if edges.is_empty() {
            return Err(TopologyError::Empty);
        }
        Ok(Self { edges })
    }

    /// Outline of the face, lips, eyes and eyebrows.
    pub fn contours() -> Self {
        Self::from_groups(&[
            LIPS,
            LEFT_EYE,
            LEFT_EYEBROW,
            RIGHT_EYE,
            RIGHT_EYEBROW,
            FACE_OVAL,
        ])
    }

    /// Contours plus both irises. Needs a 478-point landmark model.
    pub fn contours_with_irises() -> Self {
        Self::from_groups(&[
            LIPS,
            LEFT_EYE,
            LEFT_EYEBROW,
            RIGHT_EYE,
            RIGHT_EYEBROW,
            FACE_OVAL,
            LEFT_IRIS,
            RIGHT_IRIS,
        ])
    }

    /// Full triangle mesh from [`TESSELLATION_FILE_NAME`] in `dir`.
    ///
    /// Falls back to [`MeshTopology::contours`] with a warning when the file
    /// is absent. A file that exists but does not parse is an error.
    pub fn tessellation_in(dir: &Path) -> Result<Self, TopologyError> {
        let path = dir.join(TESSELLATION_FILE_NAME);
        if !path.is_file() {
            log::warn!(
                "{} not found, drawing contours instead of the full mesh",
                path.display()
            );
            return Ok(Self::contours());
        }
        let topology = Self::from_json_file(&path)?;
        log::info!("Loaded {} mesh edges from {}", topology.len(), path.display());
        Ok(topology)
    }

    /// Parses a JSON array of `[start, end]` pairs.
    pub fn from_json_str(json: &str) -> Result<Self, TopologyError> {
        let edges: Vec<(usize, usize)> = serde_json::from_str(json)?;
        Self::new(edges)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, TopologyError> {
        let json = fs::read_to_string(path).map_err(|source| TopologyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// One past the highest landmark index referenced.
    pub fn required_landmarks(&self) -> usize {
        self.edges
            .iter()
            .map(|&(a, b)| a.max(b) + 1)
            .max()
            .unwrap_or(0)
    }

    fn from_groups(groups: &[&[(usize, usize)]]) -> Self {
        Self {
            edges: groups.iter().flat_map(|g| g.iter().copied()).collect(),
        }
    }
}
