//! Vector helpers shared by the force engine and integrators
//!
//! `NVec3` is nalgebra's `Vector3<f64>`; it already provides addition,
//! scaling, subtraction, `dot`, `norm` and `norm_squared`. The functions here
//! cover the few extra operations the engine needs.

use nalgebra::Vector3;

pub type NVec3 = Vector3<f64>;

/// True when every component of `v` is finite (no NaN, no infinity)
#[inline]
pub fn is_finite_vec(v: &NVec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

/// Softened squared distance d^2 = |r|^2 + eps^2
///
/// Softening is added before any division so the result is strictly
/// positive whenever `eps > 0`, even for `r = 0`.
#[inline]
pub fn softened_distance2(r: &NVec3, eps2: f64) -> f64 {
    r.norm_squared() + eps2
}

/// Convert a 3-array (config / snapshot form) into a vector
#[inline]
pub fn vec_from(a: [f64; 3]) -> NVec3 {
    NVec3::new(a[0], a[1], a[2])
}

/// Convert a vector into its 3-array form
#[inline]
pub fn vec_to(v: &NVec3) -> [f64; 3] {
    [v.x, v.y, v.z]
}
