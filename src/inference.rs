//! Output of the vision-landmark inference service.
//!
//! A [`Detector`] produces raw [`Detection`]s for video frames. The detection
//! loop condenses each of them into an [`InferenceFrame`]: the first tracked
//! face or body only, with its expression scores and pose matrix.
//!
//! [`Detector`]: trait.Detector.html
//! [`Detection`]: struct.Detection.html
//! [`InferenceFrame`]: struct.InferenceFrame.html

use cgmath::Matrix4;
use mint;

use error::{Error, Result};
use video::VideoFrame;

use std::slice;

/// Normalized keypoint position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    /// Horizontal position, 0 to 1 across the frame.
    pub x: f32,
    /// Vertical position, 0 to 1 down the frame.
    pub y: f32,
    /// Depth, roughly on the same scale as `x`.
    pub z: f32,
    /// Likelihood of the landmark being visible, when the model reports it.
    pub visibility: Option<f32>,
}

/// Score of a single expression category.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Category {
    /// Index of the category in the model output.
    pub index: i32,
    /// Score, usually 0 to 1 but not guaranteed to be.
    pub score: f32,
    /// Category name, e.g. `eyeBlinkLeft`.
    pub category_name: String,
    /// Human readable name, possibly empty.
    pub display_name: String,
}

/// A matrix as reported by the inference service, column-major.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatrixData {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub columns: usize,
    /// Elements in column-major order.
    pub data: Vec<f32>,
}

/// Raw per-frame result of a [`Detector`](trait.Detector.html).
///
/// Every list has one entry per tracked face or body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Detection {
    /// Keypoints.
    pub landmarks: Vec<Vec<Landmark>>,
    /// Expression scores.
    pub blendshape_categories: Vec<Vec<Category>>,
    /// Head or body pose.
    pub pose_matrices: Vec<MatrixData>,
}

/// The inference service, as seen by the detection loop.
pub trait Detector {
    /// Returns `true` once the model is loaded and frames can be submitted.
    fn is_ready(&self) -> bool;

    /// Runs inference on `frame`.
    ///
    /// `timestamp_ms` increases monotonically across calls.
    fn detect(&mut self, frame: &VideoFrame, timestamp_ms: i64) -> Result<Detection>;
}

/// A 4x4 pose transform in column-major order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseMatrix([f32; 16]);

impl PoseMatrix {
    /// The identity transform.
    pub fn identity() -> Self {
        let mut m = [0.0; 16];
        m[0] = 1.0;
        m[5] = 1.0;
        m[10] = 1.0;
        m[15] = 1.0;
        PoseMatrix(m)
    }

    /// Creates a pose matrix from 16 column-major elements.
    ///
    /// Any other number of elements is rejected with
    /// [`Error::MalformedMatrix`](enum.Error.html#variant.MalformedMatrix).
    pub fn from_slice(data: &[f32]) -> Result<Self> {
        if data.len() != 16 {
            return Err(Error::MalformedMatrix(data.len()));
        }
        let mut m = [0.0; 16];
        m.copy_from_slice(data);
        Ok(PoseMatrix(m))
    }

    /// Column-major elements.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Element at `row`, `column`.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `column` is 4 or more.
    pub fn get(&self, row: usize, column: usize) -> f32 {
        assert!(row < 4 && column < 4, "no element at ({}, {}) in a 4x4 matrix", row, column);
        self.0[column * 4 + row]
    }

    pub(crate) fn to_matrix4(&self) -> Matrix4<f32> {
        let m = &self.0;
        Matrix4::new(
            m[0], m[1], m[2], m[3],
            m[4], m[5], m[6], m[7],
            m[8], m[9], m[10], m[11],
            m[12], m[13], m[14], m[15],
        )
    }
}

impl From<PoseMatrix> for mint::ColumnMatrix4<f32> {
    fn from(pose: PoseMatrix) -> Self {
        pose.to_matrix4().into()
    }
}

/// Expression scores of one face, in the order the service reported them.
///
/// Scores are kept verbatim, without clamping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlendshapeScores {
    scores: Vec<(String, f32)>,
}

impl BlendshapeScores {
    /// Creates an empty set.
    pub fn new() -> Self {
        BlendshapeScores::default()
    }

    /// Score of the category called `name`.
    pub fn get(&self, name: &str) -> Option<f32> {
        self.scores.iter().find(|&&(ref n, _)| n == name).map(|&(_, s)| s)
    }

    /// Iterates over `(name, score)` pairs.
    pub fn iter(&self) -> Iter {
        Iter { inner: self.scores.iter() }
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns `true` when there are no scores.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl<S: Into<String>> ::std::iter::FromIterator<(S, f32)> for BlendshapeScores {
    fn from_iter<I: IntoIterator<Item = (S, f32)>>(iter: I) -> Self {
        BlendshapeScores {
            scores: iter.into_iter().map(|(name, score)| (name.into(), score)).collect(),
        }
    }
}

impl<'a> From<&'a [Category]> for BlendshapeScores {
    fn from(categories: &'a [Category]) -> Self {
        categories
            .iter()
            .map(|c| (c.category_name.clone(), c.score))
            .collect()
    }
}

/// Iterator over the scores of a [`BlendshapeScores`](struct.BlendshapeScores.html).
pub struct Iter<'a> {
    inner: slice::Iter<'a, (String, f32)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, f32);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|&(ref name, score)| (name.as_str(), score))
    }
}

/// One unit of inference output, ready to be retargeted.
#[derive(Clone, Debug, PartialEq)]
pub struct InferenceFrame {
    /// Timestamp the detector was called with.
    pub timestamp_ms: i64,
    /// Keypoints of the tracked face or body.
    pub landmarks: Vec<Landmark>,
    /// Expression scores, empty when the model does not produce them.
    pub blendshapes: BlendshapeScores,
    /// Head or body pose, when the model produces it.
    pub pose_matrix: Option<PoseMatrix>,
}

impl InferenceFrame {
    /// Keeps the first face or body of `detection`.
    ///
    /// Fails when the reported pose matrix is not 4x4.
    pub fn from_detection(detection: &Detection, timestamp_ms: i64) -> Result<Self> {
        let pose_matrix = match detection.pose_matrices.first() {
            Some(data) => Some(PoseMatrix::from_slice(&data.data)?),
            None => None,
        };
        Ok(InferenceFrame {
            timestamp_ms,
            landmarks: detection.landmarks.first().cloned().unwrap_or_default(),
            blendshapes: detection
                .blendshape_categories
                .first()
                .map(|c| BlendshapeScores::from(&c[..]))
                .unwrap_or_default(),
            pose_matrix,
        })
    }
}
