use std::fmt;

/// The shape of a single example flowing through a node, the batch dimension is left out.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Self(dims)
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// The amount of scalars in one example.
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }

    /// The full array shape for a batch of `batch` examples.
    pub fn with_batch(&self, batch: usize) -> Vec<usize> {
        let mut dims = Vec::with_capacity(self.rank() + 1);
        dims.push(batch);
        dims.extend_from_slice(&self.0);
        dims
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

/// Displays the shape with a leading `None` batch dimension, e.g. `(None, 30, 32)`.
impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(None")?;
        for dim in &self.0 {
            write!(f, ", {dim}")?;
        }
        write!(f, ")")
    }
}
