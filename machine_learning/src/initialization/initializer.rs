use std::{cell::RefCell, rc::Rc};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{ConstParamGen, ParamGen, RandParamGen, Result};

/// How a parameter tensor is filled when its layer is first applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initializer {
    Zeros,
    Const { value: f32 },
    Uniform { low: f32, high: f32 },
    Normal { mean: f32, std_dev: f32 },
    GlorotUniform,
    LecunUniform,
    Kaiming,
}

impl Initializer {
    /// Creates the generator for a tensor of the given shape.
    ///
    /// # Arguments
    /// * `rng` - The rng shared by the whole graph.
    /// * `shape` - The shape of the tensor, used for its size and its fans.
    pub fn param_gen<R>(&self, rng: &Rc<RefCell<R>>, shape: &[usize]) -> Result<Box<dyn ParamGen>>
    where
        R: Rng + 'static,
    {
        let limit = shape.iter().product();
        let (fan_in, fan_out) = fans(shape);
        let rng = Rc::clone(rng);

        let param_gen: Box<dyn ParamGen> = match *self {
            Initializer::Zeros => Box::new(ConstParamGen::zeros(limit)),
            Initializer::Const { value } => Box::new(ConstParamGen::new(value, limit)),
            Initializer::Uniform { low, high } => {
                Box::new(RandParamGen::uniform(rng, limit, low, high)?)
            }
            Initializer::Normal { mean, std_dev } => {
                Box::new(RandParamGen::normal(rng, limit, mean, std_dev)?)
            }
            Initializer::GlorotUniform => {
                Box::new(RandParamGen::glorot_uniform(rng, limit, fan_in, fan_out)?)
            }
            Initializer::LecunUniform => Box::new(RandParamGen::lecun_uniform(rng, limit, fan_in)?),
            Initializer::Kaiming => Box::new(RandParamGen::kaiming(rng, limit, fan_in)?),
        };

        Ok(param_gen)
    }
}

/// Computes the fans of a tensor, for kernels of rank > 2 the leading dims are the receptive field.
fn fans(shape: &[usize]) -> (usize, usize) {
    match shape {
        [] => (1, 1),
        [n] => (*n, *n),
        [fan_in, fan_out] => (*fan_in, *fan_out),
        [receptive @ .., fan_in, fan_out] => {
            let receptive: usize = receptive.iter().product();
            (fan_in * receptive, fan_out * receptive)
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn conv_kernel_fans() {
        assert_eq!(fans(&[3, 8, 16]), (24, 48));
        assert_eq!(fans(&[5, 7]), (5, 7));
        assert_eq!(fans(&[4]), (4, 4));
    }

    #[test]
    fn generates_whole_tensor() {
        let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(7)));

        let mut kernel = Initializer::GlorotUniform
            .param_gen(&rng, &[3, 4, 5])
            .unwrap();
        assert_eq!(kernel.sample_all().len(), 60);

        let mut bias = Initializer::Zeros.param_gen(&rng, &[5]).unwrap();
        assert_eq!(bias.sample_all(), vec![0.; 5]);
    }
}
