//! Adam optimizer over a fixed set of dense parameter matrices.

use ndarray::{Array2, Zip};

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPSILON: f32 = 1e-8;

struct Moments {
    first: Array2<f32>,
    second: Array2<f32>,
}

/// Adam with optional L2 weight decay folded into the gradient
///
/// ## Algorithm
/// For every parameter `p` with gradient `g` at step `t`:
/// 1. `g += weight_decay * p`
/// 2. `m = β1·m + (1-β1)·g`, `v = β2·v + (1-β2)·g²`
/// 3. `p -= lr · (m / (1-β1ᵗ)) / (sqrt(v / (1-β2ᵗ)) + ε)`
pub struct Adam {
    learning_rate: f32,
    weight_decay: f32,
    step: i32,
    moments: Vec<Moments>,
}

impl Adam {
    /// Create an optimizer for parameters of the given shapes
    pub fn new(shapes: &[(usize, usize)], learning_rate: f32, weight_decay: f32) -> Self {
        let moments = shapes
            .iter()
            .map(|&shape| Moments {
                first: Array2::zeros(shape),
                second: Array2::zeros(shape),
            })
            .collect();
        Self {
            learning_rate,
            weight_decay,
            step: 0,
            moments,
        }
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    /// Apply one update to every parameter.
    ///
    /// `params` and `grads` must follow the order of the shapes given to
    /// [`Adam::new`].
    pub fn step(&mut self, params: &mut [&mut Array2<f32>], grads: &[Array2<f32>]) {
        debug_assert_eq!(params.len(), self.moments.len());
        debug_assert_eq!(grads.len(), self.moments.len());

        self.step += 1;
        let lr = self.learning_rate;
        let weight_decay = self.weight_decay;
        let bias1 = 1.0 - BETA1.powi(self.step);
        let bias2 = 1.0 - BETA2.powi(self.step);

        for ((param, grad), state) in params.iter_mut().zip(grads).zip(self.moments.iter_mut()) {
            Zip::from(&mut **param)
                .and(grad)
                .and(&mut state.first)
                .and(&mut state.second)
                .for_each(|p, &g, m, v| {
                    let g = g + weight_decay * *p;
                    *m = BETA1 * *m + (1.0 - BETA1) * g;
                    *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                    let m_hat = *m / bias1;
                    let v_hat = *v / bias2;
                    *p -= lr * m_hat / (v_hat.sqrt() + EPSILON);
                });
        }
    }
}
