//! Sample representations the SPU can run on.
//!
//! The hardware works on signed 16-bit samples. A float build keeps the same
//! control logic but skips quantisation, which is handy for A/B listening and
//! for hosts that want headroom above 0 dBFS inside the reverb network.

use std::fmt::Debug;

/// A mono sample value as seen by the SPU core.
///
/// Volumes are always signed 16-bit hardware values where `0x8000` is -1.0 and
/// `0x7FFF` is just under +1.0, regardless of the sample representation.
pub trait SpuSample: Copy + Debug + PartialEq + Send + 'static {
    const ZERO: Self;

    /// Convert a host sample (nominally -1.0..=1.0) into this representation.
    fn from_host(x: f64) -> Self;

    /// Convert back into a host sample.
    fn to_host(self) -> f64;

    /// Multiply by a signed 16-bit hardware volume.
    fn scale(self, vol: i16) -> Self;

    fn add(self, other: Self) -> Self;

    fn sub(self, other: Self) -> Self;
}

/// Hardware-faithful 16-bit fixed point.
///
/// Host conversion is asymmetric: negative values scale by `|i16::MIN|`,
/// non-negative values by `i16::MAX`, so -1.0, 0.0 and +1.0 all map exactly.
impl SpuSample for i16 {
    const ZERO: Self = 0;

    fn from_host(x: f64) -> Self {
        let x = x.clamp(-1.0, 1.0);
        if x < 0.0 {
            (-x * i16::MIN as f64) as i16
        } else {
            (x * i16::MAX as f64) as i16
        }
    }

    fn to_host(self) -> f64 {
        if self < 0 {
            -(self as f64) / i16::MIN as f64
        } else {
            self as f64 / i16::MAX as f64
        }
    }

    #[inline]
    fn scale(self, vol: i16) -> Self {
        ((self as i32 * vol as i32) >> 15).clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }

    #[inline]
    fn add(self, other: Self) -> Self {
        self.saturating_add(other)
    }

    #[inline]
    fn sub(self, other: Self) -> Self {
        self.saturating_sub(other)
    }
}

/// Float build: host samples pass through unchanged and nothing saturates.
impl SpuSample for f32 {
    const ZERO: Self = 0.0;

    fn from_host(x: f64) -> Self {
        x as f32
    }

    fn to_host(self) -> f64 {
        self as f64
    }

    #[inline]
    fn scale(self, vol: i16) -> Self {
        self * (vol as f32 / 32768.0)
    }

    #[inline]
    fn add(self, other: Self) -> Self {
        self + other
    }

    #[inline]
    fn sub(self, other: Self) -> Self {
        self - other
    }
}

/// Representation selected for the plugin build.
#[cfg(not(feature = "float-spu"))]
pub type DefaultSample = i16;

/// Representation selected for the plugin build.
#[cfg(feature = "float-spu")]
pub type DefaultSample = f32;

/// One left/right sample pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StereoSample<S> {
    pub left: S,
    pub right: S,
}

impl<S: SpuSample> StereoSample<S> {
    pub const fn new(left: S, right: S) -> Self {
        Self { left, right }
    }

    pub const fn silence() -> Self {
        Self {
            left: S::ZERO,
            right: S::ZERO,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.left == S::ZERO && self.right == S::ZERO
    }

    pub fn scale(self, vol: crate::registers::StereoVolume) -> Self {
        Self::new(self.left.scale(vol.left), self.right.scale(vol.right))
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.left.add(other.left), self.right.add(other.right))
    }
}

impl<S: SpuSample> Default for StereoSample<S> {
    fn default() -> Self {
        Self::silence()
    }
}
