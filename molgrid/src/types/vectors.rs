use std::ops::{Add, Sub, Mul, Div, Neg, Index, IndexMut};
use std::ops::{AddAssign, SubAssign, MulAssign, DivAssign};

use ndarray::ArrayView1;

/// A 3-dimensional vector type, used for atomic centers, grid points and
/// directions.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct Vector3D([f64; 3]);

impl Vector3D {
    /// Create a new `Vector3D` with components `x`, `y`, `z`
    pub fn new(x: f64, y: f64, z: f64) -> Vector3D {
        Vector3D([x, y, z])
    }

    /// Create a new `Vector3D` with all components set to zero
    pub fn zero() -> Vector3D {
        Vector3D([0.0; 3])
    }

    /// Create a `Vector3D` from the first three entries of `row`, typically
    /// a row of a `(n, 3)` array of points.
    #[inline]
    pub fn from_row(row: ArrayView1<'_, f64>) -> Vector3D {
        debug_assert_eq!(row.len(), 3);
        Vector3D([row[0], row[1], row[2]])
    }

    /// Get the squared euclidean norm of this vector
    #[inline]
    pub fn norm2(&self) -> f64 {
        self * self
    }

    /// Get the euclidean norm of this vector
    #[inline]
    pub fn norm(&self) -> f64 {
        f64::sqrt(self.norm2())
    }

    /// Get a normalized version of this vector. The zero vector is normalized
    /// to the `z` axis.
    pub fn normalized(&self) -> Vector3D {
        let norm = self.norm();
        if norm > 0.0 {
            self / norm
        } else {
            Vector3D::new(0.0, 0.0, 1.0)
        }
    }

    /// Get the cross (vectorial) product of `self` and `other`
    pub fn cross(&self, other: &Vector3D) -> Vector3D {
        let x = self[1] * other[2] - self[2] * other[1];
        let y = self[2] * other[0] - self[0] * other[2];
        let z = self[0] * other[1] - self[1] * other[0];
        Vector3D::new(x, y, z)
    }

    /// Get the euclidean distance between `self` and `other`
    #[inline]
    pub fn distance(&self, other: &Vector3D) -> f64 {
        (self - other).norm()
    }
}

impl From<[f64; 3]> for Vector3D {
    fn from(array: [f64; 3]) -> Vector3D {
        Vector3D(array)
    }
}

impl From<Vector3D> for [f64; 3] {
    fn from(vector: Vector3D) -> [f64; 3] {
        vector.0
    }
}

impl Index<usize> for Vector3D {
    type Output = f64;
    #[inline]
    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl IndexMut<usize> for Vector3D {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.0[index]
    }
}

impl Add for Vector3D {
    type Output = Vector3D;
    #[inline]
    fn add(self, other: Vector3D) -> Vector3D {
        Vector3D([self[0] + other[0], self[1] + other[1], self[2] + other[2]])
    }
}
forward_ref_binop!(impl Add, add for Vector3D, Vector3D);

impl Sub for Vector3D {
    type Output = Vector3D;
    #[inline]
    fn sub(self, other: Vector3D) -> Vector3D {
        Vector3D([self[0] - other[0], self[1] - other[1], self[2] - other[2]])
    }
}
forward_ref_binop!(impl Sub, sub for Vector3D, Vector3D);

/// Scalar product
impl Mul for Vector3D {
    type Output = f64;
    #[inline]
    fn mul(self, other: Vector3D) -> f64 {
        self[0] * other[0] + self[1] * other[1] + self[2] * other[2]
    }
}
forward_ref_binop!(impl Mul, mul for Vector3D, Vector3D);

impl Mul<f64> for Vector3D {
    type Output = Vector3D;
    #[inline]
    fn mul(self, factor: f64) -> Vector3D {
        Vector3D(self.0.map(|v| v * factor))
    }
}
forward_ref_binop!(impl Mul, mul for Vector3D, f64);

impl Mul<Vector3D> for f64 {
    type Output = Vector3D;
    #[inline]
    fn mul(self, vector: Vector3D) -> Vector3D {
        vector * self
    }
}
forward_ref_binop!(impl Mul, mul for f64, Vector3D);

impl Div<f64> for Vector3D {
    type Output = Vector3D;
    #[inline]
    fn div(self, factor: f64) -> Vector3D {
        Vector3D(self.0.map(|v| v / factor))
    }
}
forward_ref_binop!(impl Div, div for Vector3D, f64);

impl AddAssign for Vector3D {
    #[inline]
    fn add_assign(&mut self, other: Vector3D) {
        *self = *self + other;
    }
}
forward_ref_op_assign!(impl AddAssign, add_assign for Vector3D, Vector3D);

impl SubAssign for Vector3D {
    #[inline]
    fn sub_assign(&mut self, other: Vector3D) {
        *self = *self - other;
    }
}
forward_ref_op_assign!(impl SubAssign, sub_assign for Vector3D, Vector3D);

impl MulAssign<f64> for Vector3D {
    #[inline]
    fn mul_assign(&mut self, other: f64) {
        self[0] *= other;
        self[1] *= other;
        self[2] *= other;
    }
}

impl DivAssign<f64> for Vector3D {
    #[inline]
    fn div_assign(&mut self, other: f64) {
        self[0] /= other;
        self[1] /= other;
        self[2] /= other;
    }
}

impl Neg for Vector3D {
    type Output = Vector3D;
    #[inline]
    fn neg(self) -> Vector3D {
        Vector3D::new(-self[0], -self[1], -self[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn arithmetic() {
        let a = Vector3D::new(2.0, 3.5, 4.8);
        let b = Vector3D::new(6.1, -8.5, 7.3);

        let c = a + b;
        assert_ulps_eq!(c[0], 8.1);
        assert_ulps_eq!(c[1], -5.0);
        assert_ulps_eq!(c[2], 12.1);

        let c = &a - &b;
        assert_ulps_eq!(c[0], -4.1);
        assert_ulps_eq!(c[1], 12.0);
        assert_ulps_eq!(c[2], -2.5);

        let c = 2.0 * a;
        assert_eq!(c, Vector3D::new(4.0, 7.0, 9.6));

        let c = b / 2.0;
        assert_eq!(c, Vector3D::new(3.05, -4.25, 3.65));

        assert_ulps_eq!(a * b, 2.0 * 6.1 - 3.5 * 8.5 + 4.8 * 7.3);
    }

    #[test]
    fn norms() {
        let a = Vector3D::new(3.0, 0.0, 4.0);
        assert_eq!(a.norm2(), 25.0);
        assert_eq!(a.norm(), 5.0);

        let n = a.normalized();
        assert_ulps_eq!(n.norm(), 1.0);
        assert_eq!(Vector3D::zero().normalized(), Vector3D::new(0.0, 0.0, 1.0));

        let b = Vector3D::new(0.0, 0.0, 1.0);
        assert_eq!(b.distance(&Vector3D::new(0.0, 0.0, -1.0)), 2.0);
    }

    #[test]
    fn cross() {
        let x = Vector3D::new(1.0, 0.0, 0.0);
        let y = Vector3D::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(&y), Vector3D::new(0.0, 0.0, 1.0));
        assert_eq!(y.cross(&x), Vector3D::new(0.0, 0.0, -1.0));
    }
}
