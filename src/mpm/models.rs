use crate::math::{cofactor, determinant, Mat, T};
use serde::{Deserialize, Serialize};

/// Trait that describes a hyperelastic constitutive model, evaluated from the deformation gradient
/// and its polar decomposition (computed once per particle and shared with the caller).
///
/// The MPM force computation uses the Kirchhoff stress `tau = P F^T`, whose default implementation
/// is derived from the first Piola-Kirchhoff stress.
pub trait ConstitutiveModel: Send + Sync {
    #[allow(non_snake_case)]
    fn piola_kirchhoff<const D: usize>(&self, F: &Mat<D>, polar: &PolarDecomposition<D>) -> Mat<D>;

    #[allow(non_snake_case)]
    fn kirchhoff_stress<const D: usize>(&self, F: &Mat<D>, polar: &PolarDecomposition<D>) -> Mat<D> {
        self.piola_kirchhoff(F, polar) * F.transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsotropicParameters {
    pub youngs_modulus: T,
    pub poissons_ratio: T,
    pub mu: T,
    pub lambda: T,
}

impl IsotropicParameters {
    pub fn new(youngs_modulus: T, poissons_ratio: T) -> Self {
        let mut base = Self {
            youngs_modulus,
            poissons_ratio,
            mu: 0.,
            lambda: 0.,
        };
        base.recalculate_lame_parameters();
        base
    }

    pub fn recalculate_lame_parameters(&mut self) {
        self.mu = self.youngs_modulus / (2. * (1. + self.poissons_ratio));
        self.lambda = self.youngs_modulus * self.poissons_ratio
            / ((1. + self.poissons_ratio) * (1. - 2. * self.poissons_ratio));
    }
}

/// The fixed-corotated model of Stomakhin et al. 2012:
///
/// P = 2 mu (F - R) + lambda (J - 1) J F^-T
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedCorotated(pub IsotropicParameters);

impl FixedCorotated {
    pub fn new(youngs_modulus: T, poissons_ratio: T) -> Self {
        FixedCorotated(IsotropicParameters::new(youngs_modulus, poissons_ratio))
    }
}

impl ConstitutiveModel for FixedCorotated {
    #[allow(non_snake_case)]
    fn piola_kirchhoff<const D: usize>(&self, F: &Mat<D>, polar: &PolarDecomposition<D>) -> Mat<D> {
        let J = determinant(F);

        // J F^-T is evaluated as the cofactor matrix, so a (near) singular F can't blow up here.
        let mu_term = 2. * self.0.mu * (F - polar.rotation);
        let lambda_term = self.0.lambda * (J - 1.) * cofactor(F);

        mu_term + lambda_term
    }
}

/// Below this, the rotational part of a 2D deformation gradient is considered undefined.
const MIN_ROTATION_NORM: T = 1e-12;

/// The rotation `R` of the polar decomposition `F = R S`, with `R` a proper rotation and `S`
/// symmetric.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarDecomposition<const D: usize> {
    pub rotation: Mat<D>,
}

impl<const D: usize> PolarDecomposition<D> {
    #[allow(non_snake_case)]
    pub fn new(F: &Mat<D>) -> Self {
        let rotation = match D {
            2 => rotation_2d(F),
            3 => rotation_3d(F),
            _ => unreachable!("only 2D and 3D deformation gradients are supported, got {}", D),
        };

        PolarDecomposition { rotation }
    }

    /// The symmetric factor `S = R^T F` of the `F` this was built from.
    #[allow(non_snake_case)]
    pub fn stretch(&self, F: &Mat<D>) -> Mat<D> {
        self.rotation.transpose() * F
    }
}

/// Closed form 2D rotation: the angle of the rotation is `atan2(F10 - F01, F00 + F11)`.
#[allow(non_snake_case)]
fn rotation_2d<const D: usize>(F: &Mat<D>) -> Mat<D> {
    let x = F[(0, 0)] + F[(1, 1)];
    let y = F[(1, 0)] - F[(0, 1)];
    let norm2 = x * x + y * y;

    let mut R = Mat::<D>::identity();
    if norm2 < MIN_ROTATION_NORM {
        return R;
    }

    let scale = 1. / norm2.sqrt();
    let (c, s) = (x * scale, y * scale);
    R[(0, 0)] = c;
    R[(0, 1)] = -s;
    R[(1, 0)] = s;
    R[(1, 1)] = c;
    R
}

/// 3D rotation from the SVD `F = U Sigma V^T`, `R = U V^T`. If `U V^T` is a reflection, the
/// singular vector of the smallest singular value is flipped to make it a proper rotation.
#[allow(non_snake_case)]
fn rotation_3d<const D: usize>(F: &Mat<D>) -> Mat<D> {
    let F3 = na::Matrix3::from_fn(|r, c| F[(r, c)]);
    let svd = F3.svd(true, true);

    let (mut u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Mat::<D>::identity(),
    };

    if (u * v_t).determinant() < 0. {
        let (smallest, _) = svd.singular_values.argmin();
        u.column_mut(smallest).neg_mut();
    }

    let R = u * v_t;
    Mat::<D>::from_fn(|r, c| R[(r, c)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::TV;

    fn rotation_z(angle: T) -> Mat<3> {
        *na::Rotation3::from_axis_angle(&na::Vector3::z_axis(), angle).matrix()
    }

    fn assert_close<const D: usize>(a: &Mat<D>, b: &Mat<D>, tol: T) {
        assert!((a - b).norm() < tol, "{} != {}", a, b);
    }

    #[test]
    fn test_lame_parameters() {
        let p = IsotropicParameters::new(50., 0.3);
        assert!((p.mu - 50. / 2.6).abs() < 1e-4);
        assert!((p.lambda - 50. * 0.3 / (1.3 * 0.4)).abs() < 1e-4);
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_polar_decomposition_2d() {
        let angle: T = 0.7;
        let R = Mat::<2>::new(angle.cos(), -angle.sin(), angle.sin(), angle.cos());
        let S = Mat::<2>::new(1.2, 0.1, 0.1, 0.8);
        let F = R * S;

        let polar = PolarDecomposition::new(&F);
        assert_close(&polar.rotation, &R, 1e-5);
        assert_close(&polar.stretch(&F), &S, 1e-5);
        assert_close(&(polar.rotation * polar.stretch(&F)), &F, 1e-5);
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_polar_decomposition_3d() {
        let R = rotation_z(-1.1);
        let S = Mat::<3>::new(1.3, 0.2, 0., 0.2, 0.9, 0.1, 0., 0.1, 1.05);
        let F = R * S;

        let polar = PolarDecomposition::new(&F);
        assert_close(&polar.rotation, &R, 1e-4);
        assert_close(&polar.stretch(&F), &S, 1e-4);
        assert!((determinant(&polar.rotation) - 1.).abs() < 1e-4);
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_rotation_is_proper_for_reflections() {
        let F = Mat::<3>::from_diagonal(&TV::<3>::new(1., 1., -0.5));
        let polar = PolarDecomposition::new(&F);
        assert!((determinant(&polar.rotation) - 1.).abs() < 1e-4);
        assert!(polar.rotation.iter().all(|x| x.is_finite()));
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_identity_is_stress_free() {
        let model = FixedCorotated::new(1000., 0.3);

        let F = Mat::<2>::identity();
        let polar = PolarDecomposition::new(&F);
        assert_eq!(polar.rotation, Mat::<2>::identity());
        assert_eq!(model.piola_kirchhoff(&F, &polar), Mat::<2>::zeros());

        let F = Mat::<3>::identity();
        let polar = PolarDecomposition::new(&F);
        assert_close(&model.kirchhoff_stress(&F, &polar), &Mat::<3>::zeros(), 1e-2);
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_rigid_rotation_is_stress_free() {
        let model = FixedCorotated::new(1000., 0.3);
        let F = rotation_z(0.4);
        let polar = PolarDecomposition::new(&F);
        assert_close(&model.piola_kirchhoff(&F, &polar), &Mat::<3>::zeros(), 1e-2);
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_kirchhoff_stress_is_symmetric() {
        let model = FixedCorotated::new(100., 0.25);
        let F = Mat::<3>::new(1.1, 0.2, 0.0, -0.1, 0.95, 0.05, 0.0, 0.1, 1.02);
        let tau = model.kirchhoff_stress(&F, &PolarDecomposition::new(&F));
        assert_close(&tau, &tau.transpose(), 1e-3);
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_stretch_pushes_back() {
        let model = FixedCorotated::new(100., 0.25);
        let F = Mat::<2>::from_diagonal(&TV::<2>::new(1.5, 1.));
        let P = model.piola_kirchhoff(&F, &PolarDecomposition::new(&F));
        // stretched along x: positive (tensile) stress along x
        assert!(P[(0, 0)] > 0.);
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_singular_deformation_is_finite() {
        let model = FixedCorotated::new(100., 0.25);

        for F in [Mat::<2>::zeros(), Mat::<2>::new(1., 2., 2., 4.)].iter() {
            let polar = PolarDecomposition::new(F);
            let tau = model.kirchhoff_stress(F, &polar);
            assert!(polar.rotation.iter().all(|x| x.is_finite()));
            assert!(tau.iter().all(|x| x.is_finite()), "{}", tau);
        }

        for F in [Mat::<3>::zeros(), Mat::<3>::from_diagonal(&TV::<3>::new(1., 1., 0.))].iter() {
            let polar = PolarDecomposition::new(F);
            let tau = model.kirchhoff_stress(F, &polar);
            assert!(polar.rotation.iter().all(|x| x.is_finite()));
            assert!(tau.iter().all(|x| x.is_finite()), "{}", tau);
        }
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_zero_deformation_falls_back_to_identity_rotation() {
        let F = Mat::<2>::zeros();
        let polar = PolarDecomposition::new(&F);
        assert_eq!(polar.rotation, Mat::<2>::identity());
        assert_eq!(polar.stretch(&F), Mat::<2>::zeros());
    }
}
