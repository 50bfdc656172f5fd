// PSX Reverb: PlayStation SPU reverb effect plugin (CLAP + VST3).

use nih_plug::prelude::*;
use psx_reverb_dsp::engine::{EngineConfig, ReverbEngine};
use std::num::NonZeroU32;
use std::sync::Arc;

mod params;
use params::PsxReverbParams;

struct PsxReverb {
    params: Arc<PsxReverbParams>,

    // Shared with the parameter callbacks, which run on whichever thread
    // the host changes a value from.
    engine: Arc<ReverbEngine>,

    // Main input channels in the active layout
    num_inputs: usize,
}

impl Default for PsxReverb {
    fn default() -> Self {
        let engine: Arc<ReverbEngine> = Arc::new(ReverbEngine::new(EngineConfig::default()));
        let params = Arc::new(PsxReverbParams::new(&engine));
        engine.restore_from_controls(&params.controls());
        Self {
            params,
            engine,
            num_inputs: 2,
        }
    }
}

impl PsxReverb {
    /// Re-derive every register from the current parameter values and clear
    /// the work area. Runs after session restore and on transport resets.
    fn sync_engine(&self) {
        self.engine.set_step_policy(self.params.step_policy());
        self.engine.restore_from_controls(&self.params.controls());
    }
}

impl Plugin for PsxReverb {
    const NAME: &'static str = "PSX Reverb";
    const VENDOR: &'static str = "PSX Reverb";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        // No input connected: the reverb is fed silence.
        AudioIOLayout {
            main_input_channels: None,
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        self.num_inputs = audio_io_layout
            .main_input_channels
            .map_or(0, |n| n.get() as usize);
        nih_debug_assert!(self.num_inputs <= 2, "unexpected input layout");

        // Parameter values may have just been restored from a saved session.
        self.sync_engine();

        let policy = self.engine.step_policy();
        nih_log!(
            "PSX Reverb initialized: {} in, {} Hz, {} SPU step(s) per frame{}",
            self.num_inputs,
            buffer_config.sample_rate,
            policy.steps_per_frame,
            if policy.is_oversampled() { " (SPU2 rate)" } else { "" }
        );

        true
    }

    fn reset(&mut self) {
        self.sync_engine();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        self.engine.process_in_place(buffer.as_slice(), self.num_inputs);

        ProcessStatus::Normal
    }
}

impl ClapPlugin for PsxReverb {
    const CLAP_ID: &'static str = "com.psx-reverb.spu-reverb";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("PlayStation SPU reverb unit emulation");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Reverb,
        ClapFeature::Stereo,
        ClapFeature::Mono,
    ];
}

impl Vst3Plugin for PsxReverb {
    const VST3_CLASS_ID: [u8; 16] = *b"PsxSpuReverbVST3";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Reverb];
}

nih_export_clap!(PsxReverb);
nih_export_vst3!(PsxReverb);
