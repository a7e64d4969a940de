//! Scalar and small fixed-size vector/matrix types shared by the whole crate, along with the few
//! dimension-dependent matrix helpers nalgebra can't give us for a generic `const D: usize`.

/// The scalar type of every tensor crossing the operator boundary.
pub type T = f32;
/// A `D`-dimensional vector of scalars.
pub type TV<const D: usize> = na::SVector<T, D>;
/// A `D`-dimensional vector of grid indices.
pub type UV<const D: usize> = na::SVector<usize, D>;
/// A `D x D` matrix.
pub type Mat<const D: usize> = na::SMatrix<T, D, D>;

/// Outer product `a b^T`.
pub fn outer<const D: usize>(a: &TV<D>, b: &TV<D>) -> Mat<D> {
    a * b.transpose()
}

/// Determinant of a 2x2 or 3x3 matrix.
pub fn determinant<const D: usize>(m: &Mat<D>) -> T {
    match D {
        2 => m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)],
        3 => {
            m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
                - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
                + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
        }
        _ => unreachable!("only 2D and 3D matrices are supported, got {}", D),
    }
}

/// The cofactor matrix, `cof(F) = det(F) F^{-T}`.
///
/// Unlike the right hand side, this is a polynomial in the entries of `F` and stays finite (and
/// exact) when `F` is singular.
pub fn cofactor<const D: usize>(m: &Mat<D>) -> Mat<D> {
    match D {
        2 => {
            let mut cof = Mat::<D>::zeros();
            cof[(0, 0)] = m[(1, 1)];
            cof[(0, 1)] = -m[(1, 0)];
            cof[(1, 0)] = -m[(0, 1)];
            cof[(1, 1)] = m[(0, 0)];
            cof
        }
        3 => {
            // Column j of cof(F) is the cross product of the other two columns of F.
            let a = na::Vector3::new(m[(0, 0)], m[(1, 0)], m[(2, 0)]);
            let b = na::Vector3::new(m[(0, 1)], m[(1, 1)], m[(2, 1)]);
            let c = na::Vector3::new(m[(0, 2)], m[(1, 2)], m[(2, 2)]);
            let cols = [b.cross(&c), c.cross(&a), a.cross(&b)];

            Mat::<D>::from_fn(|r, col| cols[col][r])
        }
        _ => unreachable!("only 2D and 3D matrices are supported, got {}", D),
    }
}

/// Converts a row-major linear index into a grid coordinate (last axis fastest).
pub fn index_to_coord<const D: usize>(mut i: usize, size: &UV<D>) -> UV<D> {
    let mut coord = UV::<D>::zeros();
    for d in (0..D).rev() {
        coord[d] = i % size[d];
        i /= size[d];
    }
    coord
}

/// Converts a grid coordinate into a row-major linear index (last axis fastest).
pub fn coord_to_index<const D: usize>(coord: &UV<D>, size: &UV<D>) -> usize {
    (0..D).fold(0, |index, d| index * size[d] + coord[d])
}
