use ndarray::{ArrayD, ArrayViewD};
use rand::Rng;

use crate::{MlErr, Result, arch::Mode};

/// Inverted dropout: while training every element is zeroed with probability `rate` and the
/// survivors are scaled by `1 / (1 - rate)`, at inference it's the identity.
#[derive(Debug, Clone)]
pub struct Dropout {
    rate: f32,
}

impl Dropout {
    /// Creates a new `Dropout`.
    ///
    /// # Returns
    /// An error if `rate` is not in `[0, 1)`.
    pub fn new(rate: f32) -> Result<Self> {
        if !(0. ..1.).contains(&rate) {
            return Err(MlErr::InvalidRate(rate));
        }

        Ok(Self { rate })
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn forward(&self, x: ArrayViewD<f32>, mode: &mut Mode<'_>) -> ArrayD<f32> {
        let Mode::Train(rng) = mode else {
            return x.to_owned();
        };

        if self.rate == 0. {
            return x.to_owned();
        }

        let keep = 1. - self.rate;
        x.mapv(|z| {
            if rng.random::<f32>() < keep {
                z / keep
            } else {
                0.
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::ArrayD;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn ones(n: usize) -> ArrayD<f32> {
        ArrayD::from_elem(vec![1, n], 1.)
    }

    #[test]
    fn identity_at_inference() {
        let dropout = Dropout::new(0.5).unwrap();
        let x = ones(100);

        assert_eq!(dropout.forward(x.view(), &mut Mode::Infer), x);
    }

    #[test]
    fn zeroes_and_rescales_while_training() {
        let dropout = Dropout::new(0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let x = ones(10_000);

        let out = dropout.forward(x.view(), &mut Mode::Train(&mut rng));

        assert!(out.iter().all(|&z| z == 0. || z == 2.));
        let dropped = out.iter().filter(|&&z| z == 0.).count();
        assert!((4_000..6_000).contains(&dropped), "dropped {dropped}");
    }

    #[test]
    fn zero_rate_keeps_everything() {
        let dropout = Dropout::new(0.).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let x = ones(50);

        assert_eq!(dropout.forward(x.view(), &mut Mode::Train(&mut rng)), x);
    }

    #[test]
    fn rate_must_be_a_probability() {
        assert!(matches!(Dropout::new(1.), Err(MlErr::InvalidRate(_))));
        assert!(Dropout::new(-0.1).is_err());
        assert!(Dropout::new(f32::NAN).is_err());
    }
}
