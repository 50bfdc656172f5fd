//! SPU register model and the 39 controls bound to it.
//!
//! Every control owns exactly one register field. Controls are carried as
//! `f64` because some hosts choke on enumerating 65536-step integer
//! parameters; the conversion into a register truncates toward zero and
//! saturates at the field's bounds, which is exactly what Rust's float→int
//! `as` cast does.

use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// Reverb configuration registers (0x1F801DC0..0x1F801DFF on the PS1).
///
/// Address fields and APF displacements are in 8-byte units relative to the
/// current reverb address. The `*_same1`/`*_diff1` fields are the reflection
/// write taps (mSAME/mDIFF); `*_same2`/`*_diff2` are the read taps
/// (dSAME/dDIFF).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReverbRegs {
    pub disp_apf1: u16,
    pub disp_apf2: u16,
    /// Reflection volume 1 (vIIR).
    pub vol_iir: i16,
    pub vol_comb1: i16,
    pub vol_comb2: i16,
    pub vol_comb3: i16,
    pub vol_comb4: i16,
    /// Reflection volume 2 (vWALL).
    pub vol_wall: i16,
    pub vol_apf1: i16,
    pub vol_apf2: i16,
    pub addr_l_same1: u16,
    pub addr_r_same1: u16,
    pub addr_l_comb1: u16,
    pub addr_r_comb1: u16,
    pub addr_l_comb2: u16,
    pub addr_r_comb2: u16,
    pub addr_l_same2: u16,
    pub addr_r_same2: u16,
    pub addr_l_diff1: u16,
    pub addr_r_diff1: u16,
    pub addr_l_comb3: u16,
    pub addr_r_comb3: u16,
    pub addr_l_comb4: u16,
    pub addr_r_comb4: u16,
    pub addr_l_diff2: u16,
    pub addr_r_diff2: u16,
    pub addr_l_apf1: u16,
    pub addr_r_apf1: u16,
    pub addr_l_apf2: u16,
    pub addr_r_apf2: u16,
    pub vol_l_in: i16,
    pub vol_r_in: i16,
}

impl ReverbRegs {
    /// Build from the 32 raw register words in hardware order.
    pub const fn from_hw_words(w: [u16; 32]) -> Self {
        Self {
            disp_apf1: w[0],
            disp_apf2: w[1],
            vol_iir: w[2] as i16,
            vol_comb1: w[3] as i16,
            vol_comb2: w[4] as i16,
            vol_comb3: w[5] as i16,
            vol_comb4: w[6] as i16,
            vol_wall: w[7] as i16,
            vol_apf1: w[8] as i16,
            vol_apf2: w[9] as i16,
            addr_l_same1: w[10],
            addr_r_same1: w[11],
            addr_l_comb1: w[12],
            addr_r_comb1: w[13],
            addr_l_comb2: w[14],
            addr_r_comb2: w[15],
            addr_l_same2: w[16],
            addr_r_same2: w[17],
            addr_l_diff1: w[18],
            addr_r_diff1: w[19],
            addr_l_comb3: w[20],
            addr_r_comb3: w[21],
            addr_l_comb4: w[22],
            addr_r_comb4: w[23],
            addr_l_diff2: w[24],
            addr_r_diff2: w[25],
            addr_l_apf1: w[26],
            addr_r_apf1: w[27],
            addr_l_apf2: w[28],
            addr_r_apf2: w[29],
            vol_l_in: w[30] as i16,
            vol_r_in: w[31] as i16,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StereoVolume {
    pub left: i16,
    pub right: i16,
}

impl StereoVolume {
    pub const fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }
}

/// Level controls. These scale signal level and do not shape the reverb.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Volumes {
    /// 15-bit main volume, `0x3FFF` is unity.
    pub master: StereoVolume,
    /// External (CD) input volume.
    pub ext_input: StereoVolume,
    /// Reverb output volume (vLOUT/vROUT).
    pub reverb: StereoVolume,
}

/// All control-surface state that lives inside the SPU.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpuRegisters {
    pub reverb: ReverbRegs,
    pub volumes: Volumes,
    /// Start of the reverb work area, in 8-byte units.
    pub reverb_base_addr8: u16,
}

impl SpuRegisters {
    /// Write one control into the register it owns.
    pub fn set_control(&mut self, id: ControlId, value: f64) {
        use ControlId::*;

        let signed = value as i16;
        let unsigned = value as u16;
        let r = &mut self.reverb;
        let v = &mut self.volumes;
        match id {
            MasterVolL => v.master.left = signed,
            MasterVolR => v.master.right = signed,
            InputVolL => v.ext_input.left = signed,
            InputVolR => v.ext_input.right = signed,
            ReverbVolL => v.reverb.left = signed,
            ReverbVolR => v.reverb.right = signed,
            WaBaseAddr => self.reverb_base_addr8 = unsigned,
            VolLIn => r.vol_l_in = signed,
            VolRIn => r.vol_r_in = signed,
            VolIir => r.vol_iir = signed,
            VolWall => r.vol_wall = signed,
            VolApf1 => r.vol_apf1 = signed,
            VolApf2 => r.vol_apf2 = signed,
            VolComb1 => r.vol_comb1 = signed,
            VolComb2 => r.vol_comb2 = signed,
            VolComb3 => r.vol_comb3 = signed,
            VolComb4 => r.vol_comb4 = signed,
            DispApf1 => r.disp_apf1 = unsigned,
            DispApf2 => r.disp_apf2 = unsigned,
            AddrLApf1 => r.addr_l_apf1 = unsigned,
            AddrRApf1 => r.addr_r_apf1 = unsigned,
            AddrLApf2 => r.addr_l_apf2 = unsigned,
            AddrRApf2 => r.addr_r_apf2 = unsigned,
            AddrLComb1 => r.addr_l_comb1 = unsigned,
            AddrRComb1 => r.addr_r_comb1 = unsigned,
            AddrLComb2 => r.addr_l_comb2 = unsigned,
            AddrRComb2 => r.addr_r_comb2 = unsigned,
            AddrLComb3 => r.addr_l_comb3 = unsigned,
            AddrRComb3 => r.addr_r_comb3 = unsigned,
            AddrLComb4 => r.addr_l_comb4 = unsigned,
            AddrRComb4 => r.addr_r_comb4 = unsigned,
            AddrLSame1 => r.addr_l_same1 = unsigned,
            AddrRSame1 => r.addr_r_same1 = unsigned,
            AddrLSame2 => r.addr_l_same2 = unsigned,
            AddrRSame2 => r.addr_r_same2 = unsigned,
            AddrLDiff1 => r.addr_l_diff1 = unsigned,
            AddrRDiff1 => r.addr_r_diff1 = unsigned,
            AddrLDiff2 => r.addr_l_diff2 = unsigned,
            AddrRDiff2 => r.addr_r_diff2 = unsigned,
        }
    }

    /// Read back the value of the register a control owns.
    pub fn control(&self, id: ControlId) -> f64 {
        use ControlId::*;

        let r = &self.reverb;
        let v = &self.volumes;
        match id {
            MasterVolL => v.master.left as f64,
            MasterVolR => v.master.right as f64,
            InputVolL => v.ext_input.left as f64,
            InputVolR => v.ext_input.right as f64,
            ReverbVolL => v.reverb.left as f64,
            ReverbVolR => v.reverb.right as f64,
            WaBaseAddr => self.reverb_base_addr8 as f64,
            VolLIn => r.vol_l_in as f64,
            VolRIn => r.vol_r_in as f64,
            VolIir => r.vol_iir as f64,
            VolWall => r.vol_wall as f64,
            VolApf1 => r.vol_apf1 as f64,
            VolApf2 => r.vol_apf2 as f64,
            VolComb1 => r.vol_comb1 as f64,
            VolComb2 => r.vol_comb2 as f64,
            VolComb3 => r.vol_comb3 as f64,
            VolComb4 => r.vol_comb4 as f64,
            DispApf1 => r.disp_apf1 as f64,
            DispApf2 => r.disp_apf2 as f64,
            AddrLApf1 => r.addr_l_apf1 as f64,
            AddrRApf1 => r.addr_r_apf1 as f64,
            AddrLApf2 => r.addr_l_apf2 as f64,
            AddrRApf2 => r.addr_r_apf2 as f64,
            AddrLComb1 => r.addr_l_comb1 as f64,
            AddrRComb1 => r.addr_r_comb1 as f64,
            AddrLComb2 => r.addr_l_comb2 as f64,
            AddrRComb2 => r.addr_r_comb2 as f64,
            AddrLComb3 => r.addr_l_comb3 as f64,
            AddrRComb3 => r.addr_r_comb3 as f64,
            AddrLComb4 => r.addr_l_comb4 as f64,
            AddrRComb4 => r.addr_r_comb4 as f64,
            AddrLSame1 => r.addr_l_same1 as f64,
            AddrRSame1 => r.addr_r_same1 as f64,
            AddrLSame2 => r.addr_l_same2 as f64,
            AddrRSame2 => r.addr_r_same2 as f64,
            AddrLDiff1 => r.addr_l_diff1 as f64,
            AddrRDiff1 => r.addr_r_diff1 as f64,
            AddrLDiff2 => r.addr_l_diff2 as f64,
            AddrRDiff2 => r.addr_r_diff2 as f64,
        }
    }

    /// Bulk write of all 39 controls.
    pub fn set_from_controls(&mut self, controls: &ControlValues) {
        for (id, value) in controls.iter() {
            self.set_control(id, value);
        }
    }

    pub fn to_controls(&self) -> ControlValues {
        let mut controls = ControlValues::default();
        for id in ControlId::ALL {
            controls[id] = self.control(id);
        }
        controls
    }
}

/// Point-in-time copy of the register state, taken under the engine lock.
pub type RegisterSnapshot = SpuRegisters;

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("unknown control id: {0}")]
    UnknownControl(String),

    #[error("invalid value for {id}: {value}")]
    InvalidValue { id: &'static str, value: String },
}

/// Identifies one of the 39 controls exposed to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlId {
    MasterVolL,
    MasterVolR,
    InputVolL,
    InputVolR,
    ReverbVolL,
    ReverbVolR,
    WaBaseAddr,
    VolLIn,
    VolRIn,
    VolIir,
    VolWall,
    VolApf1,
    VolApf2,
    VolComb1,
    VolComb2,
    VolComb3,
    VolComb4,
    DispApf1,
    DispApf2,
    AddrLApf1,
    AddrRApf1,
    AddrLApf2,
    AddrRApf2,
    AddrLComb1,
    AddrRComb1,
    AddrLComb2,
    AddrRComb2,
    AddrLComb3,
    AddrRComb3,
    AddrLComb4,
    AddrRComb4,
    AddrLSame1,
    AddrRSame1,
    AddrLSame2,
    AddrRSame2,
    AddrLDiff1,
    AddrRDiff1,
    AddrLDiff2,
    AddrRDiff2,
}

impl ControlId {
    pub const COUNT: usize = 39;

    #[rustfmt::skip]
    pub const ALL: [ControlId; Self::COUNT] = {
        use ControlId::*;
        [
            MasterVolL, MasterVolR, InputVolL, InputVolR, ReverbVolL, ReverbVolR,
            WaBaseAddr, VolLIn, VolRIn, VolIir, VolWall, VolApf1, VolApf2,
            VolComb1, VolComb2, VolComb3, VolComb4, DispApf1, DispApf2,
            AddrLApf1, AddrRApf1, AddrLApf2, AddrRApf2,
            AddrLComb1, AddrRComb1, AddrLComb2, AddrRComb2,
            AddrLComb3, AddrRComb3, AddrLComb4, AddrRComb4,
            AddrLSame1, AddrRSame1, AddrLSame2, AddrRSame2,
            AddrLDiff1, AddrRDiff1, AddrLDiff2, AddrRDiff2,
        ]
    };

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable identifier, used for host parameter ids and CLI overrides.
    pub const fn id(self) -> &'static str {
        use ControlId::*;
        match self {
            MasterVolL => "masterVolL",
            MasterVolR => "masterVolR",
            InputVolL => "inputVolL",
            InputVolR => "inputVolR",
            ReverbVolL => "reverbVolL",
            ReverbVolR => "reverbVolR",
            WaBaseAddr => "revBaseAddr",
            VolLIn => "volLIn",
            VolRIn => "volRIn",
            VolIir => "volIIR",
            VolWall => "volWall",
            VolApf1 => "volAPF1",
            VolApf2 => "volAPF2",
            VolComb1 => "volComb1",
            VolComb2 => "volComb2",
            VolComb3 => "volComb3",
            VolComb4 => "volComb4",
            DispApf1 => "dispAPF1",
            DispApf2 => "dispAPF2",
            AddrLApf1 => "addrLAPF1",
            AddrRApf1 => "addrRAPF1",
            AddrLApf2 => "addrLAPF2",
            AddrRApf2 => "addrRAPF2",
            AddrLComb1 => "addrLComb1",
            AddrRComb1 => "addrRComb1",
            AddrLComb2 => "addrLComb2",
            AddrRComb2 => "addrRComb2",
            AddrLComb3 => "addrLComb3",
            AddrRComb3 => "addrRComb3",
            AddrLComb4 => "addrLComb4",
            AddrRComb4 => "addrRComb4",
            AddrLSame1 => "addrLSame1",
            AddrRSame1 => "addrRSame1",
            AddrLSame2 => "addrLSame2",
            AddrRSame2 => "addrRSame2",
            AddrLDiff1 => "addrLDiff1",
            AddrRDiff1 => "addrRDiff1",
            AddrLDiff2 => "addrLDiff2",
            AddrRDiff2 => "addrRDiff2",
        }
    }

    /// Human-readable label for host automation lanes.
    pub const fn name(self) -> &'static str {
        use ControlId::*;
        match self {
            MasterVolL => "Master L-Vol",
            MasterVolR => "Master R-Vol",
            InputVolL => "Input L-Vol",
            InputVolR => "Input R-Vol",
            ReverbVolL => "Reverb L-Vol",
            ReverbVolR => "Reverb R-Vol",
            WaBaseAddr => "WA Base Addr",
            VolLIn => "In L-Vol",
            VolRIn => "In R-Vol",
            VolIir => "Refl Vol 1",
            VolWall => "Refl Vol 2",
            VolApf1 => "APF Vol 1",
            VolApf2 => "APF Vol 2",
            VolComb1 => "Comb Vol 1",
            VolComb2 => "Comb Vol 2",
            VolComb3 => "Comb Vol 3",
            VolComb4 => "Comb Vol 4",
            DispApf1 => "APF Offset 1",
            DispApf2 => "APF Offset 2",
            AddrLApf1 => "APF L-Addr 1",
            AddrRApf1 => "APF R-Addr 1",
            AddrLApf2 => "APF L-Addr 2",
            AddrRApf2 => "APF R-Addr 2",
            AddrLComb1 => "Comb L-Addr 1",
            AddrRComb1 => "Comb R-Addr 1",
            AddrLComb2 => "Comb L-Addr 2",
            AddrRComb2 => "Comb R-Addr 2",
            AddrLComb3 => "Comb L-Addr 3",
            AddrRComb3 => "Comb R-Addr 3",
            AddrLComb4 => "Comb L-Addr 4",
            AddrRComb4 => "Comb R-Addr 4",
            AddrLSame1 => "SSR L-Addr 1",
            AddrRSame1 => "SSR R-Addr 1",
            AddrLSame2 => "SSR L-Addr 2",
            AddrRSame2 => "SSR R-Addr 2",
            AddrLDiff1 => "DSR L-Addr 1",
            AddrRDiff1 => "DSR R-Addr 1",
            AddrLDiff2 => "DSR L-Addr 2",
            AddrRDiff2 => "DSR R-Addr 2",
        }
    }

    /// Inclusive `(min, max)` range of the control. All controls step by 1.
    pub const fn range(self) -> (f64, f64) {
        use ControlId::*;
        match self {
            MasterVolL | MasterVolR => (0.0, 0x3FFF as f64),
            InputVolL | InputVolR | ReverbVolL | ReverbVolR => (0.0, 0x7FFF as f64),
            VolLIn | VolRIn | VolIir | VolWall | VolApf1 | VolApf2 | VolComb1 | VolComb2
            | VolComb3 | VolComb4 => (i16::MIN as f64, i16::MAX as f64),
            _ => (0.0, u16::MAX as f64),
        }
    }

    /// Whether changing this control invalidates the reverb work area.
    pub const fn resets_work_area(self) -> bool {
        matches!(self, ControlId::WaBaseAddr)
    }
}

impl FromStr for ControlId {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ControlId::ALL
            .into_iter()
            .find(|id| id.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| ControlError::UnknownControl(s.to_string()))
    }
}

/// One value per control, indexed by [`ControlId`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlValues([f64; ControlId::COUNT]);

impl ControlValues {
    pub fn iter(&self) -> impl Iterator<Item = (ControlId, f64)> + '_ {
        ControlId::ALL.into_iter().map(move |id| (id, self.0[id.index()]))
    }

    /// Parse an `id=value` override such as `revBaseAddr=43283`.
    pub fn apply_override(&mut self, assignment: &str) -> Result<ControlId, ControlError> {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| ControlError::UnknownControl(assignment.to_string()))?;
        let id: ControlId = name.trim().parse()?;
        let value = parse_control_value(value.trim()).ok_or_else(|| ControlError::InvalidValue {
            id: id.id(),
            value: value.trim().to_string(),
        })?;
        let (min, max) = id.range();
        self.0[id.index()] = value.clamp(min, max);
        Ok(id)
    }
}

/// Accepts decimal or `0x`-prefixed hex, optionally negative.
fn parse_control_value(s: &str) -> Option<f64> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16).ok()? as f64,
        None => digits.parse::<f64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

impl From<&SpuRegisters> for ControlValues {
    fn from(regs: &SpuRegisters) -> Self {
        regs.to_controls()
    }
}

impl Default for ControlValues {
    fn default() -> Self {
        Self([0.0; ControlId::COUNT])
    }
}

impl Index<ControlId> for ControlValues {
    type Output = f64;

    fn index(&self, id: ControlId) -> &f64 {
        &self.0[id.index()]
    }
}

impl IndexMut<ControlId> for ControlValues {
    fn index_mut(&mut self, id: ControlId) -> &mut f64 {
        &mut self.0[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_is_in_index_order() {
        for (i, id) in ControlId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i, "{id:?} out of order");
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<_> = ControlId::ALL.iter().map(|id| id.id()).collect();
        assert_eq!(ids.len(), ControlId::COUNT);
    }

    #[test]
    fn test_each_control_owns_one_field() {
        // Setting a single control away from zero must change exactly that
        // control's readback and nothing else.
        for id in ControlId::ALL {
            let mut regs = SpuRegisters::default();
            let (_, max) = id.range();
            regs.set_control(id, max);
            for other in ControlId::ALL {
                let expected = if other == id { max } else { 0.0 };
                assert_eq!(
                    regs.control(other),
                    expected,
                    "writing {} leaked into {}",
                    id.id(),
                    other.id()
                );
            }
        }
    }

    #[test]
    fn test_bulk_write_is_order_independent() {
        let mut controls = ControlValues::default();
        for (i, id) in ControlId::ALL.into_iter().enumerate() {
            let (min, max) = id.range();
            controls[id] = (min + 17.0 * (i as f64 + 1.0)).min(max);
        }

        let mut forward = SpuRegisters::default();
        forward.set_from_controls(&controls);

        let mut backward = SpuRegisters::default();
        for id in ControlId::ALL.into_iter().rev() {
            backward.set_control(id, controls[id]);
        }

        assert_eq!(forward, backward);
        assert_eq!(forward.to_controls(), controls);
    }

    #[test]
    fn test_conversion_truncates_toward_zero() {
        let mut regs = SpuRegisters::default();
        regs.set_control(ControlId::VolIir, -1234.9);
        regs.set_control(ControlId::AddrLComb1, 4095.99);
        assert_eq!(regs.reverb.vol_iir, -1234);
        assert_eq!(regs.reverb.addr_l_comb1, 4095);
    }

    #[test]
    fn test_signed_extremes() {
        let mut regs = SpuRegisters::default();
        regs.set_control(ControlId::VolLIn, -32768.0);
        regs.set_control(ControlId::VolRIn, 32767.0);
        assert_eq!(regs.reverb.vol_l_in, i16::MIN);
        assert_eq!(regs.reverb.vol_r_in, i16::MAX);
    }

    #[test]
    fn test_hw_word_order() {
        let mut words = [0u16; 32];
        for (i, w) in words.iter_mut().enumerate() {
            *w = i as u16 + 1;
        }
        words[30] = 0x8000;
        let regs = ReverbRegs::from_hw_words(words);
        assert_eq!(regs.disp_apf1, 1);
        assert_eq!(regs.vol_wall, 8);
        assert_eq!(regs.addr_l_same1, 11);
        assert_eq!(regs.addr_l_same2, 17);
        assert_eq!(regs.addr_r_apf2, 30);
        assert_eq!(regs.vol_l_in, i16::MIN);
    }

    #[test]
    fn test_parse_control_id() {
        assert_eq!("revBaseAddr".parse::<ControlId>().unwrap(), ControlId::WaBaseAddr);
        assert_eq!("volapf1".parse::<ControlId>().unwrap(), ControlId::VolApf1);
        assert!("nope".parse::<ControlId>().is_err());
    }

    #[test]
    fn test_apply_override() {
        let mut controls = ControlValues::default();
        assert_eq!(
            controls.apply_override("revBaseAddr=0xA913").unwrap(),
            ControlId::WaBaseAddr
        );
        assert_eq!(controls[ControlId::WaBaseAddr], 0xA913 as f64);

        controls.apply_override("volIIR=-0x8000").unwrap();
        assert_eq!(controls[ControlId::VolIir], -32768.0);

        // Out-of-range values clamp to the control's declared range.
        controls.apply_override("masterVolL=99999").unwrap();
        assert_eq!(controls[ControlId::MasterVolL], 0x3FFF as f64);

        assert!(controls.apply_override("volIIR").is_err());
        assert!(controls.apply_override("volIIR=loud").is_err());
    }
}
