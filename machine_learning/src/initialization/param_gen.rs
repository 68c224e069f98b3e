/// A `ParamGen` generates values for the initial state of a layer's parameters.
pub trait ParamGen {
    /// Should sample at most `n` parameters.
    ///
    /// # Arguments
    /// * `n` - The upper limit of samples to generate.
    ///
    /// # Returns
    /// `None` once the generator is exhausted.
    fn sample(&mut self, n: usize) -> Option<Vec<f32>>;

    /// Samples until the generator is exhausted.
    fn sample_all(&mut self) -> Vec<f32> {
        let mut params = Vec::new();
        while let Some(sample) = self.sample(usize::MAX) {
            if sample.is_empty() {
                break;
            }
            params.extend(sample);
        }

        params
    }
}
