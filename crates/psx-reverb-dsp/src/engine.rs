//! Shared reverb state for the audio and control threads.
//!
//! One re-entrant lock guards the SPU (registers, enable flags, RAM and the
//! staged input sample) plus the step policy. Control paths nest: restoring a
//! preset writes registers and then resets the work area, and each of those
//! takes the lock on its own. Holders of the outer lock never keep a `RefCell`
//! borrow open across an inner call.

use std::cell::RefCell;

use parking_lot::ReentrantMutex;

use crate::input::StagedInput;
use crate::pipeline::{self, StepPolicy};
use crate::presets::{self, Preset, PresetError};
use crate::registers::{ControlId, ControlValues, RegisterSnapshot, StereoVolume, Volumes};
use crate::sample::{DefaultSample, SpuSample};
use crate::spu::{SPU_RAM_SIZE, Spu, SpuConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Emulated SPU RAM in bytes.
    pub ram_size: usize,
    pub step_policy: StepPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ram_size: SPU_RAM_SIZE,
            step_policy: StepPolicy::NATIVE,
        }
    }
}

struct EngineState<S> {
    spu: Spu<S, StagedInput<S>>,
    policy: StepPolicy,
    reset_count: u64,
}

pub struct ReverbEngine<S: SpuSample = DefaultSample> {
    state: ReentrantMutex<RefCell<EngineState<S>>>,
}

impl<S: SpuSample> ReverbEngine<S> {
    /// Bring up a reverb-only SPU with its work area at the bottom of RAM,
    /// unmuted, with reverb writes and the external input path enabled.
    pub fn new(config: EngineConfig) -> Self {
        let mut spu = Spu::new(
            SpuConfig {
                ram_size: config.ram_size,
                num_voices: 0,
            },
            StagedInput::new(),
        );
        spu.regs.volumes = Volumes {
            master: StereoVolume::new(0x3FFF, 0x3FFF),
            ext_input: StereoVolume::new(0x7FFF, 0x7FFF),
            reverb: StereoVolume::new(0x2FFF, 0x2FFF),
        };
        spu.unmute = true;
        spu.reverb_write_enable = true;
        spu.ext_enabled = true;
        spu.ext_reverb_enable = true;

        log::debug!(
            "reverb engine up: {} bytes of SPU RAM, {} step(s) per frame",
            config.ram_size,
            config.step_policy.steps_per_frame
        );

        Self {
            state: ReentrantMutex::new(RefCell::new(EngineState {
                spu,
                policy: config.step_policy,
                reset_count: 0,
            })),
        }
    }

    /// Write all 39 controls into the live registers. Does not touch RAM.
    pub fn set_from_controls(&self, controls: &ControlValues) {
        let guard = self.state.lock();
        guard.borrow_mut().spu.regs.set_from_controls(controls);
    }

    /// Parameter-change notification for a single control. A change to the
    /// work-area base address also clears the new work area before the next
    /// step can see it.
    pub fn set_control(&self, id: ControlId, value: f64) {
        let guard = self.state.lock();
        guard.borrow_mut().spu.regs.set_control(id, value);
        if id.resets_work_area() {
            self.reset_work_area();
        }
    }

    /// Zero the work area `[base * 8, ram_size)` and the held reverb output.
    /// Safe to call at any time, including with a base address at or past
    /// the end of RAM.
    pub fn reset_work_area(&self) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        state.spu.clear_reverb_work_area();
        state.reset_count += 1;
    }

    /// Session restore: re-derive every register from saved control values,
    /// then clear the work area. The audio thread sees either the old state
    /// or the fully restored one.
    pub fn restore_from_controls(&self, controls: &ControlValues) {
        let _guard = self.state.lock();
        self.set_from_controls(controls);
        self.reset_work_area();
    }

    pub fn apply_preset(&self, preset: &Preset) {
        log::debug!(
            "applying preset {} (work area base {:#06x})",
            preset.name,
            preset.base_addr8
        );
        self.restore_from_controls(&preset.controls());
    }

    pub fn apply_preset_by_name(&self, name: &str) -> Result<&'static Preset, PresetError> {
        let preset = presets::find(name)?;
        self.apply_preset(preset);
        Ok(preset)
    }

    pub fn registers(&self) -> RegisterSnapshot {
        self.state.lock().borrow().spu.regs
    }

    pub fn controls(&self) -> ControlValues {
        ControlValues::from(&self.registers())
    }

    /// Number of work-area resets performed so far.
    pub fn reset_count(&self) -> u64 {
        self.state.lock().borrow().reset_count
    }

    pub fn step_policy(&self) -> StepPolicy {
        self.state.lock().borrow().policy
    }

    pub fn set_step_policy(&self, policy: StepPolicy) {
        let guard = self.state.lock();
        guard.borrow_mut().policy = policy;
    }

    /// Run one host block with separate input and output buffers.
    pub fn process_block(&self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let EngineState { spu, policy, .. } = &mut *state;
        pipeline::process_block(spu, *policy, inputs, outputs);
    }

    /// Run one host block in place. The first `num_inputs` channels hold
    /// input on entry.
    pub fn process_in_place(&self, channels: &mut [&mut [f32]], num_inputs: usize) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let EngineState { spu, policy, .. } = &mut *state;
        pipeline::process_in_place(spu, *policy, channels, num_inputs);
    }

    /// Inspect the SPU under the lock. `f` must not call back into the engine.
    pub fn with_spu<R>(&self, f: impl FnOnce(&Spu<S, StagedInput<S>>) -> R) -> R {
        let guard = self.state.lock();
        let state = guard.borrow();
        f(&state.spu)
    }

    /// Mutable access to the SPU under the lock, for tools that poke RAM or
    /// enable flags directly. `f` must not call back into the engine.
    pub fn with_spu_mut<R>(&self, f: impl FnOnce(&mut Spu<S, StagedInput<S>>) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state.spu)
    }
}

impl<S: SpuSample> Default for ReverbEngine<S> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<S: SpuSample> Drop for ReverbEngine<S> {
    fn drop(&mut self) {
        let state = self.state.get_mut().get_mut();
        state.spu.input_mut().clear();
        state.spu.destroy();
    }
}
