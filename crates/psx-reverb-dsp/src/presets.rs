//! Factory reverb presets from the PsyQ SDK (LIBSPU/LIBSD).
//!
//! SPU2 writes the same preset data as SPU1 but multiplies the time-sensitive
//! fields by 4 so the tails decay at a similar rate under its faster reverb
//! clock. The tables below are the SPU2-scaled values. Work-area base addresses
//! are scaled the same way: `65536 - (65536 - spu1_base) * 4`.

use crate::registers::{ControlValues, ReverbRegs, SpuRegisters, StereoVolume, Volumes};

#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}

/// A named register set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub regs: ReverbRegs,
    /// Work-area base address in 8-byte units.
    pub base_addr8: u16,
}

const MASTER_VOL: i16 = 0x3FFF;
const INPUT_VOL: i16 = 0x7FFF;
const REVERB_VOL: i16 = 0x2FFF;

/// With reverb off the work area is parked at the very top of RAM.
const OFF_BASE_ADDR8: u16 = 0xFFFF;

impl Preset {
    pub fn is_off(&self) -> bool {
        self.regs == ReverbRegs::default()
    }

    /// Full register state this preset implies, including level controls.
    pub fn registers(&self) -> SpuRegisters {
        let reverb_vol = if self.is_off() { 0 } else { REVERB_VOL };
        SpuRegisters {
            reverb: self.regs,
            volumes: Volumes {
                master: StereoVolume::new(MASTER_VOL, MASTER_VOL),
                ext_input: StereoVolume::new(INPUT_VOL, INPUT_VOL),
                reverb: StereoVolume::new(reverb_vol, reverb_vol),
            },
            reverb_base_addr8: self.base_addr8,
        }
    }

    /// Preset expressed as the 39 control values.
    pub fn controls(&self) -> ControlValues {
        self.registers().to_controls()
    }
}

/// Case-insensitive lookup by name.
pub fn find(name: &str) -> Result<&'static Preset, PresetError> {
    FACTORY_PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| PresetError::UnknownPreset(name.to_string()))
}

#[rustfmt::skip]
pub static FACTORY_PRESETS: [Preset; 10] = [
    Preset {
        name: "Off",
        regs: ReverbRegs::from_hw_words([0; 32]),
        base_addr8: OFF_BASE_ADDR8,
    },
    Preset {
        name: "Room",
        regs: ReverbRegs::from_hw_words([
            0x01F4, 0x016C, 0x1B60, 0x54B8, 0xBED0, 0x0000, 0x0000, 0xBA80,
            0x5800, 0x5300, 0x1358, 0x0CCC, 0x0FC0, 0x089C, 0x0DD0, 0x07BC,
            0x0CD0, 0x06D4, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
            0x0000, 0x0000, 0x06D0, 0x04D8, 0x02E0, 0x0170, 0x8000, 0x8000,
        ]),
        base_addr8: 0xECA3,
    },
    Preset {
        name: "Studio A",
        regs: ReverbRegs::from_hw_words([
            0x00CC, 0x0094, 0x1C3C, 0x4FA8, 0xBCE0, 0x4410, 0xC0F0, 0x9C00,
            0x5280, 0x4EC0, 0x0F90, 0x0C6C, 0x0E90, 0x0ABC, 0x0DC8, 0x0998,
            0x0C70, 0x0974, 0x0970, 0x0638, 0x08BC, 0x04D4, 0x0748, 0x02DC,
            0x063C, 0x02D4, 0x02D0, 0x0200, 0x0130, 0x0098, 0x8000, 0x8000,
        ]),
        base_addr8: 0xF063,
    },
    Preset {
        name: "Studio B",
        regs: ReverbRegs::from_hw_words([
            0x02C4, 0x01FC, 0x1C3C, 0x4FA8, 0xBCE0, 0x4510, 0xBEF0, 0xB4C0,
            0x5280, 0x4EC0, 0x2410, 0x1DAC, 0x2090, 0x197C, 0x1E88, 0x1858,
            0x1DB0, 0x17B4, 0x17B0, 0x10B8, 0x143C, 0x0C14, 0x1188, 0x0ADC,
            0x10BC, 0x0994, 0x0990, 0x06C8, 0x0400, 0x0200, 0x8000, 0x8000,
        ]),
        base_addr8: 0xDBE3,
    },
    Preset {
        name: "Studio C",
        regs: ReverbRegs::from_hw_words([
            0x038C, 0x02A4, 0x1BD8, 0x4FA8, 0xBCE0, 0x4510, 0xBEF0, 0xA680,
            0x5680, 0x52C0, 0x37EC, 0x2D60, 0x3424, 0x28F0, 0x2F64, 0x25CC,
            0x2D64, 0x2368, 0x2364, 0x17A4, 0x1FB0, 0x12C0, 0x1BBC, 0x0F48,
            0x17A8, 0x0C74, 0x0C70, 0x08E0, 0x0550, 0x02A8, 0x8000, 0x8000,
        ]),
        base_addr8: 0xC813,
    },
    Preset {
        name: "Hall",
        regs: ReverbRegs::from_hw_words([
            0x0694, 0x04E4, 0x1800, 0x5000, 0x4C00, 0xB800, 0xBC00, 0xC000,
            0x6000, 0x5C00, 0x56E8, 0x46EC, 0x5308, 0x42F4, 0x46F0, 0x3704,
            0x4700, 0x370C, 0x3700, 0x2704, 0x2F10, 0x1F04, 0x2800, 0x1B34,
            0x2708, 0x1704, 0x1700, 0x1068, 0x09D0, 0x04E8, 0x8000, 0x8000,
        ]),
        base_addr8: 0xA913,
    },
    Preset {
        name: "Space",
        regs: ReverbRegs::from_hw_words([
            0x0CF4, 0x08C4, 0x1F80, 0x5000, 0xB400, 0xB000, 0x4C00, 0xB000,
            0x6000, 0x5400, 0x7B58, 0x68C4, 0x7450, 0x60EC, 0x6F08, 0x5AC8,
            0x68C8, 0x57BC, 0x57B8, 0x4154, 0x4CD0, 0x3CB4, 0x47D8, 0x3174,
            0x4158, 0x2B84, 0x2B80, 0x1E88, 0x1190, 0x08C8, 0x8000, 0x8000,
        ]),
        base_addr8: 0x84A3,
    },
    Preset {
        name: "Echo",
        regs: ReverbRegs::from_hw_words([
            0x0004, 0x0004, 0x1FFF, 0x7FFF, 0x0000, 0x0000, 0x0000, 0x8100,
            0x0000, 0x0000, 0x7FFC, 0x3FFC, 0x4014, 0x0014, 0x0000, 0x0000,
            0x4014, 0x0014, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
            0x0000, 0x0000, 0x4010, 0x4008, 0x0010, 0x0008, 0x8000, 0x8000,
        ]),
        base_addr8: 0x3FE3,
    },
    Preset {
        name: "Delay",
        regs: ReverbRegs::from_hw_words([
            0x0004, 0x0004, 0x1FFF, 0x7FFF, 0x0000, 0x0000, 0x0000, 0x0000,
            0x0000, 0x0000, 0x7FFC, 0x3FFC, 0x4014, 0x0014, 0x0000, 0x0000,
            0x4014, 0x0014, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
            0x0000, 0x0000, 0x4010, 0x4008, 0x0010, 0x0008, 0x8000, 0x8000,
        ]),
        base_addr8: 0x3FE3,
    },
    Preset {
        name: "Pipe",
        regs: ReverbRegs::from_hw_words([
            0x005C, 0x004C, 0x1C3C, 0x4FA8, 0xBCE0, 0x4510, 0xBEF0, 0x8500,
            0x5F80, 0x54C0, 0x0DC4, 0x0ABC, 0x0B94, 0x077C, 0x0AC0, 0x075C,
            0x0D60, 0x09A8, 0x0758, 0x0478, 0x04B4, 0x02C4, 0x047C, 0x0164,
            0x0B60, 0x038C, 0x0160, 0x0100, 0x00A0, 0x0050, 0x8000, 0x8000,
        ]),
        base_addr8: 0xE203,
    },
];
