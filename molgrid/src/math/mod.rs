/// `4π`, the solid angle of the full sphere
pub const FOUR_PI: f64 = 4.0 * std::f64::consts::PI;

mod tridiagonal;
pub(crate) use self::tridiagonal::solve_tridiagonal;

mod splines;
pub use self::splines::CubicSpline;

mod spherical_harmonics;
pub use self::spherical_harmonics::{SphericalHarmonics, SphericalHarmonicsArray};
pub use self::spherical_harmonics::{channel_count, channel_index, channels};
pub(crate) use self::spherical_harmonics::SphericalHarmonicsBuffer;
