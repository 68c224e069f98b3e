use ndarray::{Array, Axis, Dimension};

/// Applies softmax in place along the last axis of `x`.
pub(super) fn softmax_inplace<D: Dimension>(x: &mut Array<f32, D>) {
    if x.ndim() == 0 {
        return;
    }

    let last = Axis(x.ndim() - 1);
    for mut lane in x.lanes_mut(last) {
        let max = lane.fold(f32::NEG_INFINITY, |acc, &z| acc.max(z));
        lane.mapv_inplace(|z| (z - max).exp());

        let sum = lane.sum();
        if sum > 0. {
            lane.mapv_inplace(|z| z / sum);
        }
    }
}
