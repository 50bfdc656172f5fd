use std::sync::Arc;

use nih_plug::prelude::*;
use psx_reverb_dsp::engine::ReverbEngine;
use psx_reverb_dsp::pipeline::StepPolicy;
use psx_reverb_dsp::presets;
use psx_reverb_dsp::registers::{ControlId, ControlValues};

/// Factory preset the parameters start out at.
pub const DEFAULT_PRESET: &str = "Hall";

/// Every control forwards its value straight into the engine when it changes.
#[derive(Params)]
pub struct PsxReverbParams {
    /// Momentary action: every toggle, on or off, clears the reverb work area.
    #[id = "clear"]
    pub clear: BoolParam,

    /// Step the SPU 4 times per host frame so SPU1 presets decay at SPU2 speed.
    #[id = "spu2Rate"]
    pub spu2_rate: BoolParam,

    /// Main output volume, 15-bit (`0x3FFF` is unity).
    #[id = "masterVolL"]
    pub master_vol_l: FloatParam,

    #[id = "masterVolR"]
    pub master_vol_r: FloatParam,

    /// External input volume.
    #[id = "inputVolL"]
    pub input_vol_l: FloatParam,

    #[id = "inputVolR"]
    pub input_vol_r: FloatParam,

    /// Reverb return level.
    #[id = "reverbVolL"]
    pub reverb_vol_l: FloatParam,

    #[id = "reverbVolR"]
    pub reverb_vol_r: FloatParam,

    /// Reverb work-area start in 8-byte units. Any change clears the work area.
    #[id = "revBaseAddr"]
    pub wa_base_addr: FloatParam,

    /// Reverb input gain.
    #[id = "volLIn"]
    pub vol_l_in: FloatParam,

    #[id = "volRIn"]
    pub vol_r_in: FloatParam,

    /// Reflection feedback (vIIR).
    #[id = "volIIR"]
    pub vol_iir: FloatParam,

    /// Reflection wall absorption (vWALL).
    #[id = "volWall"]
    pub vol_wall: FloatParam,

    /// All-pass filter gains.
    #[id = "volAPF1"]
    pub vol_apf1: FloatParam,

    #[id = "volAPF2"]
    pub vol_apf2: FloatParam,

    /// Comb tap gains.
    #[id = "volComb1"]
    pub vol_comb1: FloatParam,

    #[id = "volComb2"]
    pub vol_comb2: FloatParam,

    #[id = "volComb3"]
    pub vol_comb3: FloatParam,

    #[id = "volComb4"]
    pub vol_comb4: FloatParam,

    /// All-pass delay lengths, 8-byte units.
    #[id = "dispAPF1"]
    pub disp_apf1: FloatParam,

    #[id = "dispAPF2"]
    pub disp_apf2: FloatParam,

    /// All-pass write addresses.
    #[id = "addrLAPF1"]
    pub addr_l_apf1: FloatParam,

    #[id = "addrRAPF1"]
    pub addr_r_apf1: FloatParam,

    #[id = "addrLAPF2"]
    pub addr_l_apf2: FloatParam,

    #[id = "addrRAPF2"]
    pub addr_r_apf2: FloatParam,

    /// Comb read addresses.
    #[id = "addrLComb1"]
    pub addr_l_comb1: FloatParam,

    #[id = "addrRComb1"]
    pub addr_r_comb1: FloatParam,

    #[id = "addrLComb2"]
    pub addr_l_comb2: FloatParam,

    #[id = "addrRComb2"]
    pub addr_r_comb2: FloatParam,

    #[id = "addrLComb3"]
    pub addr_l_comb3: FloatParam,

    #[id = "addrRComb3"]
    pub addr_r_comb3: FloatParam,

    #[id = "addrLComb4"]
    pub addr_l_comb4: FloatParam,

    #[id = "addrRComb4"]
    pub addr_r_comb4: FloatParam,

    /// Same-side reflection write (1) and read (2) addresses.
    #[id = "addrLSame1"]
    pub addr_l_same1: FloatParam,

    #[id = "addrRSame1"]
    pub addr_r_same1: FloatParam,

    #[id = "addrLSame2"]
    pub addr_l_same2: FloatParam,

    #[id = "addrRSame2"]
    pub addr_r_same2: FloatParam,

    /// Different-side reflection write (1) and read (2) addresses.
    #[id = "addrLDiff1"]
    pub addr_l_diff1: FloatParam,

    #[id = "addrRDiff1"]
    pub addr_r_diff1: FloatParam,

    #[id = "addrLDiff2"]
    pub addr_l_diff2: FloatParam,

    #[id = "addrRDiff2"]
    pub addr_r_diff2: FloatParam,
}

impl PsxReverbParams {
    pub fn new(engine: &Arc<ReverbEngine>) -> Self {
        let defaults = presets::find(DEFAULT_PRESET)
            .map(|p| p.controls())
            .unwrap_or_default();
        let param = |id: ControlId| control_param(id, defaults[id], engine);

        let rate_engine = Arc::clone(engine);

        Self {
            clear: BoolParam::new("Clear Work Area", false)
                .with_callback(clear_callback(Arc::clone(engine)))
                .non_automatable(),

            spu2_rate: BoolParam::new("SPU2 Reverb Rate", false).with_callback(Arc::new(
                move |on| rate_engine.set_step_policy(StepPolicy::from_spu2_rate(on)),
            )),

            master_vol_l: param(ControlId::MasterVolL),
            master_vol_r: param(ControlId::MasterVolR),
            input_vol_l: param(ControlId::InputVolL),
            input_vol_r: param(ControlId::InputVolR),
            reverb_vol_l: param(ControlId::ReverbVolL),
            reverb_vol_r: param(ControlId::ReverbVolR),
            wa_base_addr: param(ControlId::WaBaseAddr),
            vol_l_in: param(ControlId::VolLIn),
            vol_r_in: param(ControlId::VolRIn),
            vol_iir: param(ControlId::VolIir),
            vol_wall: param(ControlId::VolWall),
            vol_apf1: param(ControlId::VolApf1),
            vol_apf2: param(ControlId::VolApf2),
            vol_comb1: param(ControlId::VolComb1),
            vol_comb2: param(ControlId::VolComb2),
            vol_comb3: param(ControlId::VolComb3),
            vol_comb4: param(ControlId::VolComb4),
            disp_apf1: param(ControlId::DispApf1),
            disp_apf2: param(ControlId::DispApf2),
            addr_l_apf1: param(ControlId::AddrLApf1),
            addr_r_apf1: param(ControlId::AddrRApf1),
            addr_l_apf2: param(ControlId::AddrLApf2),
            addr_r_apf2: param(ControlId::AddrRApf2),
            addr_l_comb1: param(ControlId::AddrLComb1),
            addr_r_comb1: param(ControlId::AddrRComb1),
            addr_l_comb2: param(ControlId::AddrLComb2),
            addr_r_comb2: param(ControlId::AddrRComb2),
            addr_l_comb3: param(ControlId::AddrLComb3),
            addr_r_comb3: param(ControlId::AddrRComb3),
            addr_l_comb4: param(ControlId::AddrLComb4),
            addr_r_comb4: param(ControlId::AddrRComb4),
            addr_l_same1: param(ControlId::AddrLSame1),
            addr_r_same1: param(ControlId::AddrRSame1),
            addr_l_same2: param(ControlId::AddrLSame2),
            addr_r_same2: param(ControlId::AddrRSame2),
            addr_l_diff1: param(ControlId::AddrLDiff1),
            addr_r_diff1: param(ControlId::AddrRDiff1),
            addr_l_diff2: param(ControlId::AddrLDiff2),
            addr_r_diff2: param(ControlId::AddrRDiff2),
        }
    }

    /// Snapshot of all 39 control values.
    pub fn controls(&self) -> ControlValues {
        let mut controls = ControlValues::default();
        for id in ControlId::ALL {
            controls[id] = self.control(id).value() as f64;
        }
        controls
    }

    pub fn step_policy(&self) -> StepPolicy {
        StepPolicy::from_spu2_rate(self.spu2_rate.value())
    }

    fn control(&self, id: ControlId) -> &FloatParam {
        use ControlId::*;
        match id {
            MasterVolL => &self.master_vol_l,
            MasterVolR => &self.master_vol_r,
            InputVolL => &self.input_vol_l,
            InputVolR => &self.input_vol_r,
            ReverbVolL => &self.reverb_vol_l,
            ReverbVolR => &self.reverb_vol_r,
            WaBaseAddr => &self.wa_base_addr,
            VolLIn => &self.vol_l_in,
            VolRIn => &self.vol_r_in,
            VolIir => &self.vol_iir,
            VolWall => &self.vol_wall,
            VolApf1 => &self.vol_apf1,
            VolApf2 => &self.vol_apf2,
            VolComb1 => &self.vol_comb1,
            VolComb2 => &self.vol_comb2,
            VolComb3 => &self.vol_comb3,
            VolComb4 => &self.vol_comb4,
            DispApf1 => &self.disp_apf1,
            DispApf2 => &self.disp_apf2,
            AddrLApf1 => &self.addr_l_apf1,
            AddrRApf1 => &self.addr_r_apf1,
            AddrLApf2 => &self.addr_l_apf2,
            AddrRApf2 => &self.addr_r_apf2,
            AddrLComb1 => &self.addr_l_comb1,
            AddrRComb1 => &self.addr_r_comb1,
            AddrLComb2 => &self.addr_l_comb2,
            AddrRComb2 => &self.addr_r_comb2,
            AddrLComb3 => &self.addr_l_comb3,
            AddrRComb3 => &self.addr_r_comb3,
            AddrLComb4 => &self.addr_l_comb4,
            AddrRComb4 => &self.addr_r_comb4,
            AddrLSame1 => &self.addr_l_same1,
            AddrRSame1 => &self.addr_r_same1,
            AddrLSame2 => &self.addr_l_same2,
            AddrRSame2 => &self.addr_r_same2,
            AddrLDiff1 => &self.addr_l_diff1,
            AddrRDiff1 => &self.addr_r_diff1,
            AddrLDiff2 => &self.addr_l_diff2,
            AddrRDiff2 => &self.addr_r_diff2,
        }
    }
}

/// The clear control acts on every value change in either direction, so a
/// single click always clears regardless of the value it was left at.
fn clear_callback(engine: Arc<ReverbEngine>) -> Arc<dyn Fn(bool) + Send + Sync> {
    Arc::new(move |_| engine.reset_work_area())
}

fn control_param(id: ControlId, default: f64, engine: &Arc<ReverbEngine>) -> FloatParam {
    let (min, max) = id.range();
    let engine = Arc::clone(engine);
    let param = FloatParam::new(
        id.name(),
        default as f32,
        FloatRange::Linear {
            min: min as f32,
            max: max as f32,
        },
    )
    .with_step_size(1.0)
    .with_callback(Arc::new(move |value| engine.set_control(id, value as f64)));

    // Addresses and offsets read better in hex.
    if min == 0.0 && max == u16::MAX as f64 {
        param
            .with_value_to_string(Arc::new(|value| format!("0x{:04X}", value as u32)))
            .with_string_to_value(Arc::new(parse_address))
    } else {
        param.with_value_to_string(formatters::v2s_f32_rounded(0))
    }
}

fn parse_address(s: &str) -> Option<f32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok().map(f32::from),
        None => s.parse().ok(),
    }
}
