use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::MlErr;

/// How a `Conv1d` pads the sequence axis before sliding its kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    /// Output keeps the input length, the `k - 1` zeros are split with the extra one on the right.
    #[default]
    Same,
    /// No padding.
    Valid,
    /// Output keeps the input length, every zero goes on the left so no position sees the future.
    Causal,
}

impl Padding {
    /// Returns the amount of zeros added on the (left, right) of the sequence.
    pub fn pads(&self, kernel_size: usize) -> (usize, usize) {
        let total = kernel_size.saturating_sub(1);
        match self {
            Padding::Same => (total / 2, total - total / 2),
            Padding::Valid => (0, 0),
            Padding::Causal => (total, 0),
        }
    }

    /// Returns the output length for a sequence of length `len`, or `None` if the kernel doesn't
    /// fit in the padded sequence.
    pub fn output_len(&self, len: usize, kernel_size: usize) -> Option<usize> {
        let (left, right) = self.pads(kernel_size);
        let padded = len + left + right;

        (padded >= kernel_size && kernel_size > 0)
            .then(|| padded - kernel_size + 1)
            .filter(|&len| len > 0)
    }
}

impl FromStr for Padding {
    type Err = MlErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "same" => Ok(Padding::Same),
            "valid" => Ok(Padding::Valid),
            "causal" => Ok(Padding::Causal),
            _ => Err(MlErr::UnknownPadding(s.to_string())),
        }
    }
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Padding::Same => "same",
            Padding::Valid => "valid",
            Padding::Causal => "causal",
        };

        f.write_str(s)
    }
}
