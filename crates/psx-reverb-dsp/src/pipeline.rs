//! Host buffer plumbing around the SPU.
//!
//! Per frame: reduce the host's input channels to one stereo sample, stage it
//! for the SPU's input pull, step the SPU according to the [`StepPolicy`], and
//! write the result back out. Nothing here allocates; callers hold the engine
//! lock for the whole block.

use crate::input::StagedInput;
use crate::sample::{SpuSample, StereoSample};
use crate::spu::Spu;

/// How many SPU steps make up one host frame.
///
/// SPU2 runs its reverb 4x faster than SPU1 relative to the output clock, so
/// SPU1-era presets decay too quickly when run natively at SPU2 settings.
/// Stepping 4 times per frame and keeping the first step's output stretches
/// the decay back out while leaving the host rate alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepPolicy {
    pub steps_per_frame: u32,
}

impl StepPolicy {
    pub const NATIVE: Self = Self { steps_per_frame: 1 };
    pub const SPU2_REVERB_RATE: Self = Self { steps_per_frame: 4 };

    pub fn from_spu2_rate(enabled: bool) -> Self {
        if enabled {
            Self::SPU2_REVERB_RATE
        } else {
            Self::NATIVE
        }
    }

    pub fn is_oversampled(&self) -> bool {
        self.steps_per_frame > 1
    }
}

impl Default for StepPolicy {
    fn default() -> Self {
        Self::NATIVE
    }
}

/// Reduce one frame of host input to a stereo SPU sample.
///
/// `frame` holds the frame's value from each connected input channel, in
/// channel order. No channels gives silence, one channel is duplicated to
/// both sides, otherwise the first two feed left and right.
pub fn reduce_input<S: SpuSample>(frame: &[f32]) -> StereoSample<S> {
    match frame {
        [] => StereoSample::silence(),
        [mono] => {
            let x = S::from_host(*mono as f64);
            StereoSample::new(x, x)
        }
        [left, right, ..] => {
            StereoSample::new(S::from_host(*left as f64), S::from_host(*right as f64))
        }
    }
}

/// Host-format left/right pair for one output frame. A mono output takes the
/// left value.
pub fn expand_output<S: SpuSample>(sample: StereoSample<S>) -> [f32; 2] {
    [sample.left.to_host() as f32, sample.right.to_host() as f32]
}

/// Step the SPU once per policy sub-step and return the first step's output.
/// Later sub-steps still advance reverb state. A frame always takes at least
/// one step.
pub fn run_frame<S: SpuSample>(
    spu: &mut Spu<S, StagedInput<S>>,
    policy: StepPolicy,
) -> StereoSample<S> {
    let out = spu.step();
    for _ in 1..policy.steps_per_frame {
        spu.step();
    }
    out
}

/// Process separate input and output buffers. The block length is the
/// shortest connected channel.
pub fn process_block<S: SpuSample>(
    spu: &mut Spu<S, StagedInput<S>>,
    policy: StepPolicy,
    inputs: &[&[f32]],
    outputs: &mut [&mut [f32]],
) {
    let num_frames = inputs
        .iter()
        .map(|c| c.len())
        .chain(outputs.iter().map(|c| c.len()))
        .min()
        .unwrap_or(0);
    let num_in = inputs.len().min(2);
    let num_out = outputs.len().min(2);

    let mut frame = [0.0f32; 2];
    for i in 0..num_frames {
        for (slot, channel) in frame.iter_mut().zip(inputs) {
            *slot = channel[i];
        }
        spu.input_mut().stage(reduce_input(&frame[..num_in]));

        let out = expand_output(run_frame(spu, policy));
        for (channel, value) in outputs[..num_out].iter_mut().zip(out) {
            channel[i] = value;
        }
    }
}

/// Process a host buffer in place, where the first `num_inputs` channels
/// carry input on entry and every channel is an output on return. Channels
/// past the first two are left untouched.
pub fn process_in_place<S: SpuSample>(
    spu: &mut Spu<S, StagedInput<S>>,
    policy: StepPolicy,
    channels: &mut [&mut [f32]],
    num_inputs: usize,
) {
    let num_frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
    let num_in = num_inputs.min(channels.len()).min(2);
    let num_out = channels.len().min(2);

    let mut frame = [0.0f32; 2];
    for i in 0..num_frames {
        for (slot, channel) in frame[..num_in].iter_mut().zip(channels.iter()) {
            *slot = channel[i];
        }
        spu.input_mut().stage(reduce_input(&frame[..num_in]));

        let out = expand_output(run_frame(spu, policy));
        for (channel, value) in channels[..num_out].iter_mut().zip(out) {
            channel[i] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::StereoVolume;
    use crate::spu::{SPU_RAM_SIZE, SpuConfig};

    fn dry_spu() -> Spu<i16, StagedInput<i16>> {
        let mut spu = Spu::new(SpuConfig::default(), StagedInput::new());
        spu.unmute = true;
        spu.ext_enabled = true;
        spu.regs.volumes.master = StereoVolume::new(0x3FFF, 0x3FFF);
        spu.regs.volumes.ext_input = StereoVolume::new(0x7FFF, 0x7FFF);
        spu
    }

    #[test]
    fn test_reduce_no_channels_is_silence() {
        assert!(reduce_input::<i16>(&[]).is_silent());
    }

    #[test]
    fn test_reduce_mono_duplicates() {
        let s = reduce_input::<i16>(&[0.5]);
        assert_eq!(s.left, s.right);
        assert_eq!(s.left, i16::from_host(0.5));

        let s = reduce_input::<f32>(&[-0.3]);
        assert_eq!(s, StereoSample::new(-0.3, -0.3));
    }

    #[test]
    fn test_reduce_takes_first_two_channels() {
        let s = reduce_input::<f32>(&[0.1, 0.2, 0.9, 0.9]);
        assert_eq!(s, StereoSample::new(0.1, 0.2));
    }

    #[test]
    fn test_policy_constants() {
        assert_eq!(StepPolicy::default(), StepPolicy::NATIVE);
        assert!(!StepPolicy::NATIVE.is_oversampled());
        assert!(StepPolicy::SPU2_REVERB_RATE.is_oversampled());
        assert_eq!(StepPolicy::from_spu2_rate(true).steps_per_frame, 4);
    }

    #[test]
    fn test_zero_step_policy_still_steps_once() {
        let mut spu = dry_spu();
        run_frame(&mut spu, StepPolicy { steps_per_frame: 0 });
        assert_eq!(spu.cycle_count(), 1);
    }

    #[test]
    fn test_run_frame_step_count() {
        let mut spu = dry_spu();
        run_frame(&mut spu, StepPolicy::NATIVE);
        assert_eq!(spu.cycle_count(), 1);
        run_frame(&mut spu, StepPolicy::SPU2_REVERB_RATE);
        assert_eq!(spu.cycle_count(), 5);
    }

    #[test]
    fn test_block_without_inputs_is_silent() {
        let mut spu = dry_spu();
        let mut left = [1.0f32; 64];
        let mut right = [1.0f32; 64];
        process_block(&mut spu, StepPolicy::NATIVE, &[], &mut [&mut left, &mut right]);
        assert!(left.iter().chain(&right).all(|&x| x == 0.0));
        assert_eq!(spu.cycle_count(), 64);
    }

    #[test]
    fn test_block_mono_in_stereo_out() {
        let mut spu = dry_spu();
        let input = [0.25f32; 32];
        let mut left = [0.0f32; 32];
        let mut right = [0.0f32; 32];
        process_block(&mut spu, StepPolicy::NATIVE, &[&input], &mut [&mut left, &mut right]);

        let x = i16::from_host(0.25);
        assert_eq!(spu.input().staged(), StereoSample::new(x, x));
        for i in 0..32 {
            assert_eq!(left[i], right[i]);
            assert!((left[i] - 0.25).abs() < 1e-3, "frame {i}: {}", left[i]);
        }
    }

    #[test]
    fn test_block_mono_out_gets_left() {
        let mut spu = dry_spu();
        let l = [0.5f32; 8];
        let r = [-0.5f32; 8];
        let mut out = [0.0f32; 8];
        process_block(&mut spu, StepPolicy::NATIVE, &[&l, &r], &mut [&mut out]);
        assert!(out.iter().all(|&x| (x - 0.5).abs() < 1e-3));
    }

    #[test]
    fn test_in_place_leaves_extra_channels() {
        let mut spu = dry_spu();
        let mut a = [0.5f32; 16];
        let mut b = [-0.5f32; 16];
        let mut c = [0.75f32; 16];
        process_in_place(&mut spu, StepPolicy::NATIVE, &mut [&mut a, &mut b, &mut c], 3);

        assert!(a.iter().all(|&x| (x - 0.5).abs() < 1e-3));
        assert!(b.iter().all(|&x| (x + 0.5).abs() < 1e-3));
        assert!(c.iter().all(|&x| x == 0.75));
    }

    #[test]
    fn test_in_place_zero_inputs_ignores_buffer_contents() {
        let mut spu = dry_spu();
        let mut a = [0.9f32; 16];
        let mut b = [0.9f32; 16];
        process_in_place(&mut spu, StepPolicy::SPU2_REVERB_RATE, &mut [&mut a, &mut b], 0);
        assert!(a.iter().chain(&b).all(|&x| x == 0.0));
        assert_eq!(spu.cycle_count(), 64);
        assert_eq!(spu.ram_size_bytes(), SPU_RAM_SIZE);
    }
}
