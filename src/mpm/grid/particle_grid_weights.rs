use super::data::GridData;
use crate::math::{T, TV, UV};

/// The number of nodes along each axis covered by the quadratic kernel.
pub const KERNEL_WIDTH: usize = 3;

/// The interpolation stencil of a single particle: the `3^D` grid nodes within the support of the
/// quadratic B-spline around the particle, with their weights and weight gradients.
///
/// Both transfers (P2G and G2P) use the same `Stencil` for a particle within a step.
///
/// Near the walls, the point the kernel is evaluated at (`sample`) is clamped to lie at least half
/// a cell inside the node range, so every node of the stencil exists. Weights are then still in
/// `[0, 1]`, still sum to one, and still reproduce linear fields about `sample`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stencil<const D: usize> {
    /// The lowest node of the stencil.
    pub base: UV<D>,
    /// The (clamped) position the weights are evaluated at.
    pub sample: TV<D>,
    /// `weights[k][d]`: 1D weight of node `base[d] + k` along axis `d`.
    weights: [TV<D>; KERNEL_WIDTH],
    /// `derivatives[k][d]`: derivative of `weights[k][d]` with respect to the particle position.
    derivatives: [TV<D>; KERNEL_WIDTH],
}

/// A single node of a [`Stencil`].
#[derive(Debug, Clone, PartialEq)]
pub struct StencilNode<const D: usize> {
    /// Linear index of the node in the grid.
    pub index: usize,
    pub weight: T,
    /// Gradient of `weight` with respect to the particle position.
    pub weight_grad: TV<D>,
    /// `x_node - x_p`
    pub dpos: TV<D>,
}

impl<const D: usize> GridData<D> {
    /// Computes the interpolation stencil of a particle at world-space position `p`.
    pub fn stencil(&self, p: &TV<D>) -> Stencil<D> {
        let mut base = UV::<D>::zeros();
        let mut sample = TV::<D>::zeros();
        let mut weights = [TV::<D>::zeros(); KERNEL_WIDTH];
        let mut derivatives = [TV::<D>::zeros(); KERNEL_WIDTH];

        for d in 0..D {
            let lower = 0.5 * self.h;
            let upper = (self.size[d] as T - 1.5) * self.h;
            // `max` first so that NaN positions land on the lower end instead of propagating.
            let xp = p[d].max(lower).min(upper);
            let x = xp * self.one_over_h;
            // Float to int casts saturate, so a sample rounding to just below 0.5 still gives 0.
            let b = ((x - 0.5).floor() as usize).min(self.size[d] - KERNEL_WIDTH);
            let fx = x - b as T;

            base[d] = b;
            sample[d] = xp;

            let w = quadratic_weights(fx);
            let dw = quadratic_weight_derivatives(fx);
            for k in 0..KERNEL_WIDTH {
                weights[k][d] = w[k];
                derivatives[k][d] = dw[k] * self.one_over_h;
            }
        }

        Stencil {
            base,
            sample,
            weights,
            derivatives,
        }
    }
}

impl<const D: usize> Stencil<D> {
    /// The number of nodes in a stencil, `3^D`.
    pub fn len() -> usize {
        KERNEL_WIDTH.pow(D as u32)
    }

    /// The offset from `base` of the `k`-th stencil node. The last axis varies fastest, matching
    /// the node ordering of the grid.
    pub fn offset(mut k: usize) -> UV<D> {
        let mut offset = UV::<D>::zeros();
        for d in (0..D).rev() {
            offset[d] = k % KERNEL_WIDTH;
            k /= KERNEL_WIDTH;
        }
        offset
    }

    /// The weight of the node at `base + offset`.
    pub fn weight(&self, offset: &UV<D>) -> T {
        (0..D).map(|d| self.weights[offset[d]][d]).product()
    }

    /// The gradient of the weight of the node at `base + offset`.
    pub fn weight_grad(&self, offset: &UV<D>) -> TV<D> {
        TV::<D>::from_fn(|axis, _| {
            (0..D)
                .map(|d| {
                    if d == axis {
                        self.derivatives[offset[d]][d]
                    } else {
                        self.weights[offset[d]][d]
                    }
                })
                .product()
        })
    }

    /// `x_node - x_p` for the node at `base + offset`, measured from the sample point.
    pub fn dpos(&self, grid: &GridData<D>, offset: &UV<D>) -> TV<D> {
        grid.coord_to_pos(&(self.base + offset)) - self.sample
    }

    /// The stencil node at `base + offset`.
    pub fn node(&self, grid: &GridData<D>, offset: &UV<D>) -> StencilNode<D> {
        StencilNode {
            index: grid.coord_to_index(&(self.base + offset)),
            weight: self.weight(offset),
            weight_grad: self.weight_grad(offset),
            dpos: self.dpos(grid, offset),
        }
    }

    /// Iterates over every node of the stencil.
    pub fn nodes<'a>(&'a self, grid: &'a GridData<D>) -> impl Iterator<Item = StencilNode<D>> + 'a {
        (0..Self::len()).map(move |k| self.node(grid, &Self::offset(k)))
    }
}

/// The 1D quadratic B-spline weights of the three nodes `base`, `base + 1`, `base + 2`, where `fx`
/// is the grid-space distance from `base` to the particle (in `[0.5, 1.5]` for interior particles).
pub fn quadratic_weights(fx: T) -> [T; KERNEL_WIDTH] {
    [kernel(fx), kernel(fx - 1.), kernel(fx - 2.)]
}

/// The derivatives of [`quadratic_weights`] with respect to `fx`.
pub fn quadratic_weight_derivatives(fx: T) -> [T; KERNEL_WIDTH] {
    [
        kernel_derivative(fx),
        kernel_derivative(fx - 1.),
        kernel_derivative(fx - 2.),
    ]
}

/// The quadratic kernel function N(x) described in Eqn. (123), pg. 33
/// MPM SIGGRAPH Course Notes 2016
pub fn kernel(x: T) -> T {
    let x = x.abs();
    if 0. <= x && x < 0.5 {
        0.75 - x * x
    } else if 0.5 <= x && x < 1.5 {
        let a = 1.5 - x;
        0.5 * a * a
    } else {
        0.
    }
}

/// The derivative of the quadratic kernel function, N'(x).
///
/// N(x) = 3/4 - |x|^2                0 <= |x| < 1/2
///        1/2(3/2 - |x|)^2           1/2 <= |x| < 3/2
///        0                          3/2 <= |x|
///
/// N'(x) =             -2|x|              0 <= |x| < 1/2
///         abs'(x)    -(3/2 - |x|)        1/2 <= |x| < 3/2
///                     0                  3/2 <= |x|
///
/// Where abs' is the derivative of the absolute value function, because chain rule.
pub fn kernel_derivative(x: T) -> T {
    let chain_rule = if x < 0. { -1. } else { 1. };
    let x = x.abs();

    chain_rule
        * if 0. <= x && x < 0.5 {
            -2. * x
        } else if 0.5 <= x && x < 1.5 {
            -(1.5 - x)
        } else {
            0.
        }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::linspace;
    use proptest::prelude::*;
    use std::ops::Range;

    #[derive(Debug)]
    struct DerivativeError {
        x: f64,
        estimated: f64,
        actual: f64,
        error: f64,
    }

    /// Tests if z_prime is the derivative of z, sampling `num_trials` points within the
    /// domain. Returns the Root-Mean-Square-Error if `Ok`, returns a `DerivativeError`
    /// otherwise
    fn test_derivative<F1: Fn(f64) -> f64, F2: Fn(f64) -> f64>(
        z: F1,
        z_prime: F2,
        domain: Range<f64>,
        num_trials: usize,
    ) -> Result<f64, DerivativeError> {
        let delta_x = 1e-3;

        let mut sum_square_error = 0.;

        for x in linspace(domain.start, domain.end, num_trials) {
            let estimated = (z(x + delta_x) - z(x - delta_x)) / (2. * delta_x);

            let actual = (z_prime(x + delta_x) + z_prime(x - delta_x)) / 2.;

            let error = estimated - actual;
            if error.abs() >= 0.01 {
                return Err(DerivativeError {
                    x,
                    estimated,
                    actual,
                    error,
                });
            }
            sum_square_error += error * error;
        }

        Ok((sum_square_error / num_trials as f64).sqrt())
    }

    #[test]
    fn test_derivative_test() {
        assert!(test_derivative(f64::sin, f64::cos, -2. ..2., 100).is_ok());
        assert!(test_derivative(f64::sin, |x| 2. * f64::cos(x), -2. ..2., 100).is_err());

        assert!(test_derivative(|x| x * x, |x| 2. * x, -2. ..2., 100).is_ok());
        assert!(test_derivative(|x| x * x, |x| 3. * x, -2. ..2., 100).is_err());
    }

    #[test]
    fn test_kernel_derivative() {
        let k = |x: f64| kernel(x as T) as f64;
        let dk = |x: f64| kernel_derivative(x as T) as f64;
        assert!(test_derivative(k, dk, -2. ..2., 101).is_ok());
        assert!(test_derivative(k, |x| 2. * dk(x), -2. ..2., 101).is_err());
    }

    #[test]
    fn test_kernel_values() {
        assert_eq!(kernel(0.), 0.75);
        assert_eq!(kernel(0.5), 0.5);
        assert_eq!(kernel(-0.5), 0.5);
        assert_eq!(kernel(1.5), 0.);
        assert_eq!(kernel(3.), 0.);
    }

    fn grid_2d() -> GridData<2> {
        GridData::new(0.1, UV::<2>::new(20, 12))
    }

    fn grid_3d() -> GridData<3> {
        GridData::new(0.25, UV::<3>::new(8, 10, 6))
    }

    proptest! {
        #[test]
        fn weights_partition_unity_2d(x in -1.0f32..3.0, y in -1.0f32..2.0) {
            let grid = grid_2d();
            let stencil = grid.stencil(&TV::<2>::new(x, y));
            let sum: T = stencil.nodes(&grid).map(|n| n.weight).sum();
            prop_assert!((sum - 1.).abs() < 1e-5, "sum of weights = {}", sum);
            for node in stencil.nodes(&grid) {
                prop_assert!(node.weight >= 0. && node.weight <= 1.);
            }
        }

        #[test]
        fn weights_partition_unity_3d(x in 0.0f32..2.0, y in 0.0f32..2.5, z in 0.0f32..1.5) {
            let grid = grid_3d();
            let stencil = grid.stencil(&TV::<3>::new(x, y, z));
            let sum: T = stencil.nodes(&grid).map(|n| n.weight).sum();
            prop_assert!((sum - 1.).abs() < 1e-5, "sum of weights = {}", sum);
        }

        #[test]
        fn gradients_sum_to_zero(x in 0.0f32..2.0, y in 0.0f32..2.5, z in 0.0f32..1.5) {
            let grid = grid_3d();
            let stencil = grid.stencil(&TV::<3>::new(x, y, z));
            let sum: TV<3> = stencil.nodes(&grid).map(|n| n.weight_grad).sum();
            prop_assert!(sum.norm() < 1e-3, "sum of gradients = {}", sum);
        }

        #[test]
        fn weights_reproduce_linear_fields(x in -0.5f32..2.5, y in 0.0f32..1.2) {
            let grid = grid_2d();
            let stencil = grid.stencil(&TV::<2>::new(x, y));
            let first_moment: TV<2> = stencil.nodes(&grid).map(|n| n.weight * n.dpos).sum();
            prop_assert!(first_moment.norm() < 1e-5, "first moment = {}", first_moment);
        }

        #[test]
        fn stencil_stays_in_grid(x in -10.0f32..10.0, y in -10.0f32..10.0) {
            let grid = grid_2d();
            let stencil = grid.stencil(&TV::<2>::new(x, y));
            for k in 0..Stencil::<2>::len() {
                let coord = stencil.base + Stencil::<2>::offset(k);
                prop_assert!(grid.coord_in_grid(&coord));
            }
        }
    }

    #[test]
    fn test_interior_sample_is_the_particle() {
        let grid = grid_2d();
        let p = TV::<2>::new(0.73, 0.41);
        let stencil = grid.stencil(&p);
        assert_eq!(stencil.sample, p);
        assert_eq!(stencil.base, UV::<2>::new(6, 3));
    }

    #[test]
    fn test_boundary_particles_are_clamped() {
        let grid = grid_2d();
        let stencil = grid.stencil(&TV::<2>::new(-0.3, 5.));
        assert_eq!(stencil.base, UV::<2>::new(0, 9));
        assert!((stencil.sample - TV::<2>::new(0.05, 1.05)).norm() < 1e-6);

        let stencil = grid.stencil(&TV::<2>::new(T::NAN, 0.5));
        assert_eq!(stencil.base.x, 0);
    }

    #[test]
    fn test_stencil_ordering() {
        assert_eq!(Stencil::<2>::len(), 9);
        assert_eq!(Stencil::<3>::len(), 27);
        assert_eq!(Stencil::<2>::offset(1), UV::<2>::new(0, 1));
        assert_eq!(Stencil::<2>::offset(3), UV::<2>::new(1, 0));
        assert_eq!(Stencil::<3>::offset(26), UV::<3>::new(2, 2, 2));
    }

    #[test]
    fn test_weight_gradient() {
        let grid = grid_2d();
        let offsets = (0..Stencil::<2>::len()).map(Stencil::<2>::offset).collect::<Vec<_>>();

        // The stencil of a point moves with the point, so compare against a fixed stencil base by
        // staying within one cell.
        for y in linspace(0.61, 0.69, 5) {
            for offset in offsets.iter() {
                let result = test_derivative(
                    |x| grid.stencil(&TV::<2>::new(x as T, y as T)).weight(offset) as f64,
                    |x| grid.stencil(&TV::<2>::new(x as T, y as T)).weight_grad(offset).x as f64,
                    0.56..0.64,
                    10,
                );
                assert!(result.is_ok(), "d/dx failed. Error: {:#?}", result);

                let result = test_derivative(
                    |z| grid.stencil(&TV::<2>::new(y as T, z as T)).weight(offset) as f64,
                    |z| grid.stencil(&TV::<2>::new(y as T, z as T)).weight_grad(offset).y as f64,
                    0.56..0.64,
                    10,
                );
                assert!(result.is_ok(), "d/dy failed. Error: {:#?}", result);
            }
        }
    }
}
