//! External input bridge.
//!
//! The SPU pulls its external (CD/line) input once per step instead of being
//! handed a buffer. The host side stages one frame at a time and the SPU may
//! read it as often as it likes; under SPU2-rate stepping every sub-step of a
//! frame sees the same held sample.

use crate::sample::{SpuSample, StereoSample};

/// Anything the SPU can pull an external input sample from.
pub trait InputSource<S: SpuSample> {
    fn next_input(&mut self) -> StereoSample<S>;
}

/// Single-slot input holding the most recently staged host frame.
#[derive(Clone, Copy, Debug)]
pub struct StagedInput<S> {
    sample: StereoSample<S>,
}

impl<S: SpuSample> StagedInput<S> {
    pub fn new() -> Self {
        Self {
            sample: StereoSample::silence(),
        }
    }

    pub fn stage(&mut self, sample: StereoSample<S>) {
        self.sample = sample;
    }

    pub fn staged(&self) -> StereoSample<S> {
        self.sample
    }

    pub fn clear(&mut self) {
        self.sample = StereoSample::silence();
    }
}

impl<S: SpuSample> Default for StagedInput<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SpuSample> InputSource<S> for StagedInput<S> {
    fn next_input(&mut self) -> StereoSample<S> {
        self.sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_silent() {
        let mut input = StagedInput::<i16>::new();
        assert!(input.staged().is_silent());
        assert!(input.next_input().is_silent());
    }

    #[test]
    fn test_repeated_reads_return_held_sample() {
        let mut input = StagedInput::<i16>::new();
        input.stage(StereoSample::new(1200, -300));
        for _ in 0..4 {
            assert_eq!(input.next_input(), StereoSample::new(1200, -300));
        }
    }

    #[test]
    fn test_clear_returns_to_silence() {
        let mut input = StagedInput::<f32>::new();
        input.stage(StereoSample::new(0.25, 0.5));
        input.clear();
        assert!(input.next_input().is_silent());
    }
}
