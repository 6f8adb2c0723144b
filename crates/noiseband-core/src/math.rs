//! Math functions for no_std compatibility.
//!
//! In no_std mode, f32 doesn't have transcendental methods like sqrt, log10 or
//! powf. This module provides the handful the survey needs using libm.

/// Square root.
#[inline]
pub fn sqrt(x: f32) -> f32 {
    libm::sqrtf(x)
}

/// Base-10 logarithm.
#[inline]
pub fn log10(x: f32) -> f32 {
    libm::log10f(x)
}

/// Power of ten (10^x).
#[inline]
pub fn exp10(x: f32) -> f32 {
    libm::powf(10.0, x)
}

/// Round half away from zero.
#[inline]
pub fn round(x: f32) -> f32 {
    libm::roundf(x)
}
