//! Tensor shapes flowing between blocks.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shape of a tensor, excluding the batch dimension (channels last).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Create a shape from its dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Self(dims)
    }

    /// Shape that no layer accepts. Returned when an output cannot be computed.
    pub fn invalid() -> Self {
        Self(Vec::new())
    }

    /// Dimensions of the shape.
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Last (channel / feature) dimension.
    #[inline]
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Total number of elements.
    pub fn num_elements(&self) -> usize {
        self.0.iter().product()
    }

    /// A shape is valid when it has at least one dimension and every
    /// dimension is positive.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|&d| d > 0)
    }

    /// Spatial dimensions and channel count of an image-like `[h, w, c]` shape.
    pub fn as_image(&self) -> Option<(usize, usize, usize)> {
        match self.0.as_slice() {
            &[h, w, c] => Some((h, w, c)),
            _ => None,
        }
    }

    /// Depth, spatial dimensions and channel count of a `[d, h, w, c]` volume.
    pub fn as_volume(&self) -> Option<(usize, usize, usize, usize)> {
        match self.0.as_slice() {
            &[d, h, w, c] => Some((d, h, w, c)),
            _ => None,
        }
    }

    /// Copy of this shape with the last dimension replaced.
    pub fn with_last(&self, last: usize) -> Self {
        let mut dims = self.0.clone();
        if let Some(d) = dims.last_mut() {
            *d = last;
        }
        Self(dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self(dims)
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self(dims.to_vec())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, ")")
    }
}
