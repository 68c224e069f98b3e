use std::ops::Range;

/// Maps a layer's slice of the flat parameter buffer into its tensors.
///
/// This is the "offsets + shapes" mechanism: a layer owns one contiguous range and its tensors
/// are laid out back to back, in the order the layer declares them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamLayout {
    range: Range<usize>,
    shapes: Vec<Vec<usize>>,
}

impl ParamLayout {
    /// Creates a layout starting at `start` in the flat buffer.
    pub fn new(start: usize, shapes: Vec<Vec<usize>>) -> Self {
        let size: usize = shapes.iter().map(|s| s.iter().product::<usize>()).sum();
        Self {
            range: start..start + size,
            shapes,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn shapes(&self) -> &[Vec<usize>] {
        &self.shapes
    }

    pub fn size(&self) -> usize {
        self.range.len()
    }

    /// The range of the `i`-th tensor in the flat buffer.
    pub fn tensor(&self, i: usize) -> Option<Range<usize>> {
        let shape = self.shapes.get(i)?;
        let start = self.range.start
            + self.shapes[..i]
                .iter()
                .map(|s| s.iter().product::<usize>())
                .sum::<usize>();

        Some(start..start + shape.iter().product::<usize>())
    }
}
