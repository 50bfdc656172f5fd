/// Engine-level behaviour: channel policy, work-area resets, preset
/// application and SPU2-rate stepping, all driven through the public API.
use psx_reverb_dsp::engine::{EngineConfig, ReverbEngine};
use psx_reverb_dsp::input::StagedInput;
use psx_reverb_dsp::pipeline::{self, StepPolicy};
use psx_reverb_dsp::presets::{self, FACTORY_PRESETS};
use psx_reverb_dsp::registers::ControlId;
use psx_reverb_dsp::sample::{SpuSample, StereoSample};
use psx_reverb_dsp::spu::{SPU_RAM_SIZE, Spu, SpuConfig};

const BLOCK: usize = 256;

fn hall_engine() -> ReverbEngine<i16> {
    let engine = ReverbEngine::<i16>::default();
    engine.apply_preset_by_name("Hall").unwrap();
    engine
}

/// Feed a short full-scale burst, then `frames` of silence. Returns the peak
/// absolute output over the silent part.
fn excite_and_ring(engine: &ReverbEngine<i16>, frames: usize) -> f32 {
    let burst = [0.9f32; 64];
    let mut l = [0.0f32; 64];
    let mut r = [0.0f32; 64];
    engine.process_block(&[&burst, &burst], &mut [&mut l, &mut r]);

    let silence = [0.0f32; BLOCK];
    let mut peak = 0.0f32;
    for _ in 0..frames / BLOCK {
        let mut l = [0.0f32; BLOCK];
        let mut r = [0.0f32; BLOCK];
        engine.process_block(&[&silence, &silence], &mut [&mut l, &mut r]);
        peak = l.iter().chain(&r).fold(peak, |p, x| p.max(x.abs()));
    }
    peak
}

#[test]
fn test_no_inputs_is_silent_for_every_preset() {
    for preset in &FACTORY_PRESETS {
        let engine = ReverbEngine::<i16>::default();
        engine.apply_preset(preset);
        for _ in 0..16 {
            let mut l = [1.0f32; BLOCK];
            let mut r = [1.0f32; BLOCK];
            engine.process_block(&[], &mut [&mut l, &mut r]);
            assert!(
                l.iter().chain(&r).all(|&x| x == 0.0),
                "{}: output without input channels",
                preset.name
            );
        }
    }
}

#[test]
fn test_mono_input_is_duplicated_before_the_spu() {
    let engine = ReverbEngine::<i16>::default();
    let mono = [0.3f32; 8];
    let mut l = [0.0f32; 8];
    let mut r = [0.0f32; 8];
    engine.process_block(&[&mono], &mut [&mut l, &mut r]);

    let staged = engine.with_spu(|spu| spu.input().staged());
    let x = i16::from_host(0.3);
    assert_eq!(staged, StereoSample::new(x, x));
}

#[test]
fn test_reset_is_idempotent_and_confined_to_work_area() {
    let engine = hall_engine();
    let area = engine.with_spu(|spu| spu.work_area_slots());
    assert_eq!(area.start, 0xA913 * 4);

    engine.with_spu_mut(|spu| spu.ram_mut().fill(5));
    engine.reset_work_area();
    let first = engine.with_spu(|spu| spu.ram().to_vec());
    engine.reset_work_area();
    let second = engine.with_spu(|spu| spu.ram().to_vec());

    assert_eq!(first, second);
    assert!(first[..area.start].iter().all(|&s| s == 5));
    assert!(first[area].iter().all(|&s| s == 0));
}

#[test]
fn test_base_address_change_silences_old_tail() {
    let engine = hall_engine();
    let tail = excite_and_ring(&engine, 16 * BLOCK * 4);
    assert!(tail > 1e-3, "Hall tail too quiet before the change: {tail}");

    let resets = engine.reset_count();
    engine.set_control(ControlId::WaBaseAddr, 0xA000 as f64);
    assert_eq!(engine.reset_count(), resets + 1);
    assert!(engine.with_spu(|spu| {
        spu.ram()[spu.work_area_slots()].iter().all(|&s| s == 0)
    }));

    let silence = [0.0f32; BLOCK];
    let mut l = [0.0f32; BLOCK];
    let mut r = [0.0f32; BLOCK];
    engine.process_block(&[&silence, &silence], &mut [&mut l, &mut r]);
    for i in 0..BLOCK {
        assert_eq!(l[i], 0.0, "residual energy at frame {i}");
        assert_eq!(r[i], 0.0, "residual energy at frame {i}");
    }
}

#[test]
fn test_base_address_change_on_odd_frame_count() {
    // An odd number of frames leaves the reverb unit between ticks, holding
    // its last output when the reset lands.
    let engine = hall_engine();
    let burst = [0.9f32; 64];
    let mut l = [0.0f32; 64];
    let mut r = [0.0f32; 64];
    engine.process_block(&[&burst, &burst], &mut [&mut l, &mut r]);

    let loud = vec![0.9f32; 20_001];
    let mut l = vec![0.0f32; loud.len()];
    let mut r = vec![0.0f32; loud.len()];
    engine.process_block(&[&loud, &loud], &mut [&mut l, &mut r]);
    assert_eq!(engine.with_spu(|spu| spu.cycle_count()) % 2, 1);

    engine.set_control(ControlId::WaBaseAddr, 0xA000 as f64);
    let silence = [0.0f32; 8];
    let mut l = [1.0f32; 8];
    let mut r = [1.0f32; 8];
    engine.process_block(&[&silence, &silence], &mut [&mut l, &mut r]);
    for i in 0..8 {
        assert_eq!(l[i], 0.0, "residual energy at frame {i}");
        assert_eq!(r[i], 0.0, "residual energy at frame {i}");
    }
}

#[test]
fn test_preset_application_is_deterministic() {
    let engine = ReverbEngine::<i16>::default();
    let hall = presets::find("Hall").unwrap();

    engine.apply_preset(hall);
    let first = engine.registers();
    assert_eq!(engine.reset_count(), 1);

    engine.apply_preset(hall);
    assert_eq!(engine.registers(), first);
    assert_eq!(engine.reset_count(), 2);
    assert_eq!(first, hall.registers());
}

#[test]
fn test_switching_presets_drops_decaying_energy() {
    let engine = hall_engine();
    assert!(excite_and_ring(&engine, 32 * BLOCK) > 0.0);

    engine.apply_preset_by_name("Room").unwrap();
    let silence = [0.0f32; BLOCK];
    let mut l = [0.0f32; BLOCK];
    let mut r = [0.0f32; BLOCK];
    engine.process_block(&[&silence, &silence], &mut [&mut l, &mut r]);
    assert!(l.iter().chain(&r).all(|&x| x == 0.0));
}

#[test]
fn test_spu2_rate_steps_four_times_and_keeps_first_output() {
    let hall = presets::find("Hall").unwrap();
    let engine = ReverbEngine::<i16>::new(EngineConfig {
        step_policy: StepPolicy::SPU2_REVERB_RATE,
        ..EngineConfig::default()
    });
    engine.apply_preset(hall);

    let mut reference = Spu::new(SpuConfig::default(), StagedInput::<i16>::new());
    reference.regs = hall.registers();
    reference.unmute = true;
    reference.reverb_write_enable = true;
    reference.ext_enabled = true;
    reference.ext_reverb_enable = true;

    let frames = 4096;
    let left: Vec<f32> = (0..frames).map(|i| (i as f32 * 0.031).sin() * 0.5).collect();
    let right: Vec<f32> = (0..frames).map(|i| (i as f32 * 0.017).cos() * 0.4).collect();
    let mut out_l = vec![0.0f32; frames];
    let mut out_r = vec![0.0f32; frames];
    engine.process_block(&[&left, &right], &mut [&mut out_l, &mut out_r]);

    assert_eq!(engine.with_spu(|spu| spu.cycle_count()), 4 * frames as u64);

    for i in 0..frames {
        reference
            .input_mut()
            .stage(pipeline::reduce_input(&[left[i], right[i]]));
        let first = reference.step();
        for _ in 0..3 {
            reference.step();
        }
        let [l, r] = pipeline::expand_output(first);
        assert_eq!(out_l[i], l, "left differs at frame {i}");
        assert_eq!(out_r[i], r, "right differs at frame {i}");
    }
}

#[test]
fn test_spu2_rate_stretches_the_tail() {
    // A tap that is N reverb ticks away is reached in N/4 frames instead of N.
    let native = hall_engine();
    let spu2 = ReverbEngine::<i16>::new(EngineConfig {
        step_policy: StepPolicy::SPU2_REVERB_RATE,
        ..EngineConfig::default()
    });
    spu2.apply_preset_by_name("Hall").unwrap();

    let frames = 8 * BLOCK;
    let native_peak = excite_and_ring(&native, frames);
    let spu2_peak = excite_and_ring(&spu2, frames);
    assert_eq!(native_peak, 0.0, "native Hall should not reach its first tap yet");
    assert!(spu2_peak > 0.0, "SPU2-rate Hall produced no early reflections");
}

#[test]
fn test_degenerate_work_area_is_harmless() {
    let engine = ReverbEngine::<i16>::new(EngineConfig {
        ram_size: 1024,
        ..EngineConfig::default()
    });
    engine.set_control(ControlId::WaBaseAddr, 0xFFFF as f64);
    assert!(engine.with_spu(|spu| spu.work_area_slots().is_empty()));
    engine.reset_work_area();

    let input = [0.5f32; BLOCK];
    let mut l = [0.0f32; BLOCK];
    let mut r = [0.0f32; BLOCK];
    engine.process_block(&[&input, &input], &mut [&mut l, &mut r]);
    assert!(l.iter().all(|x| x.is_finite()));

    // Full-size RAM: base 0xFFFF leaves a 4-slot work area.
    let engine = hall_engine();
    engine.set_control(ControlId::WaBaseAddr, 0xFFFF as f64);
    assert_eq!(engine.with_spu(|spu| spu.work_area_slots()).len(), 4);
    assert_eq!(engine.with_spu(|spu| spu.ram_size_bytes()), SPU_RAM_SIZE);
    engine.process_block(&[&input, &input], &mut [&mut l, &mut r]);
}

#[test]
fn test_float_engine_rings() {
    let engine = ReverbEngine::<f32>::default();
    engine.apply_preset_by_name("Studio A").unwrap();

    let burst = [0.9f32; 64];
    let mut l = [0.0f32; 64];
    let mut r = [0.0f32; 64];
    engine.process_block(&[&burst, &burst], &mut [&mut l, &mut r]);

    let silence = [0.0f32; BLOCK];
    let mut peak = 0.0f32;
    for _ in 0..32 {
        let mut l = [0.0f32; BLOCK];
        let mut r = [0.0f32; BLOCK];
        engine.process_block(&[&silence, &silence], &mut [&mut l, &mut r]);
        assert!(l.iter().chain(&r).all(|x| x.is_finite()));
        peak = l.iter().chain(&r).fold(peak, |p, x| p.max(x.abs()));
    }
    assert!(peak > 0.0, "float Studio A produced no tail");
}
