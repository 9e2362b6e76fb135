//! This module provides the 3D vector type used for atomic centers and grid
//! points.

/// Given an implementation of `impl Op<Rhs> for Lhs` on `Copy` types, add the
/// `&Lhs op Rhs`, `Lhs op &Rhs` and `&Lhs op &Rhs` variants.
macro_rules! forward_ref_binop {
    (impl $Op:ident, $op:ident for $Lhs:ty, $Rhs:ty) => {
        impl<'a> $Op<$Rhs> for &'a $Lhs {
            type Output = <$Lhs as $Op<$Rhs>>::Output;
            #[inline]
            fn $op(self, other: $Rhs) -> Self::Output {
                $Op::$op(*self, other)
            }
        }

        impl<'a> $Op<&'a $Rhs> for $Lhs {
            type Output = <$Lhs as $Op<$Rhs>>::Output;
            #[inline]
            fn $op(self, other: &'a $Rhs) -> Self::Output {
                $Op::$op(self, *other)
            }
        }

        impl<'a, 'b> $Op<&'a $Rhs> for &'b $Lhs {
            type Output = <$Lhs as $Op<$Rhs>>::Output;
            #[inline]
            fn $op(self, other: &'a $Rhs) -> Self::Output {
                $Op::$op(*self, *other)
            }
        }
    };
}

/// Same as `forward_ref_binop`, for `@=` operators taking `&Rhs`
macro_rules! forward_ref_op_assign {
    (impl $Op:ident, $op:ident for $Lhs:ty, $Rhs:ty) => {
        impl<'a> $Op<&'a $Rhs> for $Lhs {
            #[inline]
            fn $op(&mut self, other: &'a $Rhs) {
                $Op::$op(self, *other);
            }
        }
    };
}

mod vectors;
pub use self::vectors::Vector3D;
