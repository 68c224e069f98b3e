use super::ParamGen;

/// A parameter generator that always generates the same value, biases start at zero through it.
pub struct ConstParamGen {
    value: f32,
    remaining: usize,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `value` - The value to always generate.
    /// * `limit` - The maximum amount of times to generate that value.
    pub fn new(value: f32, limit: usize) -> Self {
        Self {
            value,
            remaining: limit,
        }
    }

    /// A generator of `limit` zeros.
    pub fn zeros(limit: usize) -> Self {
        Self::new(0., limit)
    }
}

impl ParamGen for ConstParamGen {
    fn sample(&mut self, mut n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        n = n.min(self.remaining);
        self.remaining -= n;
        Some(vec![self.value; n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty() {
        let mut param_gen = ConstParamGen::zeros(0);
        assert!(param_gen.sample(1).is_none());
        assert!(param_gen.sample_all().is_empty());
    }

    #[test]
    fn partial() {
        let mut param_gen = ConstParamGen::new(0.5, 10);

        assert_eq!(param_gen.sample(7).unwrap(), vec![0.5; 7]);
        assert_eq!(param_gen.sample(7).unwrap(), vec![0.5; 3]);
        assert!(param_gen.sample(1).is_none());
    }

    #[test]
    fn sample_all_drains() {
        let mut param_gen = ConstParamGen::zeros(4);
        assert_eq!(param_gen.sample_all(), vec![0.; 4]);
        assert!(param_gen.sample(1).is_none());
    }
}
