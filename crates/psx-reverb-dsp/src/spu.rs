//! Reverb-only PlayStation SPU core.
//!
//! Runs the SPU's reverb unit over an emulated RAM pool with no sample-playback
//! voices: external input in, stereo mix out. The reverb network follows the
//! nocash PSX-SPX description:
//!   - same-side and different-side IIR reflections
//!   - 4 comb taps summed into the output
//!   - 2 cascaded all-pass filters
//!
//! All taps are addressed relative to a current address that walks the work
//! area `[base * 8, ram_size)` one halfword per reverb tick and wraps back to
//! the base. The reverb unit ticks at half the output rate; its output is held
//! between ticks.
//!
//! RAM is stored as sample slots, one per 16-bit halfword, so register
//! addresses (8-byte units) map to `addr * 4` slots.

use std::ops::Range;

use crate::input::InputSource;
use crate::registers::{SpuRegisters, StereoVolume};
use crate::sample::{SpuSample, StereoSample};

/// SPU RAM size on the PS1, in bytes.
pub const SPU_RAM_SIZE: usize = 512 * 1024;

/// Register address granularity in bytes.
pub const ADDR_UNIT_BYTES: usize = 8;

const SLOTS_PER_UNIT: usize = ADDR_UNIT_BYTES / 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpuConfig {
    /// Emulated RAM size in bytes.
    pub ram_size: usize,
    /// Sample-playback voices. Only 0 (reverb-only) is supported.
    pub num_voices: u32,
}

impl Default for SpuConfig {
    fn default() -> Self {
        Self {
            ram_size: SPU_RAM_SIZE,
            num_voices: 0,
        }
    }
}

#[derive(Clone, Copy)]
struct WorkArea {
    start: usize,
    len: usize,
}

pub struct Spu<S, I> {
    pub regs: SpuRegisters,
    pub unmute: bool,
    pub reverb_write_enable: bool,
    pub ext_enabled: bool,
    pub ext_reverb_enable: bool,

    ram: Vec<S>,
    /// Current reverb address, as an absolute RAM slot.
    reverb_cur_addr: usize,
    /// Output of the most recent reverb tick, held until the next one.
    processed_reverb: StereoSample<S>,
    cycle_count: u64,
    input: I,
}

impl<S: SpuSample, I: InputSource<S>> Spu<S, I> {
    /// Allocate RAM and bring the core up in its power-on state: all
    /// registers zero, muted, every enable flag off.
    pub fn new(config: SpuConfig, input: I) -> Self {
        assert_eq!(
            config.num_voices, 0,
            "sample-playback voices are not emulated; only a reverb-only SPU can be created"
        );
        Self {
            regs: SpuRegisters::default(),
            unmute: false,
            reverb_write_enable: false,
            ext_enabled: false,
            ext_reverb_enable: false,
            ram: vec![S::ZERO; config.ram_size / 2],
            reverb_cur_addr: 0,
            processed_reverb: StereoSample::silence(),
            cycle_count: 0,
            input,
        }
    }

    /// Advance the unit by one output tick.
    ///
    /// Pulls exactly one external input sample per call, whether or not the
    /// external input is enabled.
    pub fn step(&mut self) -> StereoSample<S> {
        debug_assert!(self.is_initialized(), "SPU stepped before initialization");

        let ext = self.input.next_input();
        let vols = self.regs.volumes;
        let ext_in = if self.ext_enabled {
            ext.scale(vols.ext_input)
        } else {
            StereoSample::silence()
        };

        if self.cycle_count % 2 == 0 {
            let reverb_in = if self.ext_reverb_enable {
                ext_in
            } else {
                StereoSample::silence()
            };
            self.processed_reverb = self.step_reverb(reverb_in);
        }
        self.cycle_count += 1;

        if !self.unmute {
            return StereoSample::silence();
        }

        ext_in
            .add(self.processed_reverb.scale(vols.reverb))
            .scale(master_gain(vols.master))
    }

    fn step_reverb(&mut self, input: StereoSample<S>) -> StereoSample<S> {
        let wa = self.work_area();
        if wa.len == 0 {
            return StereoSample::silence();
        }
        // Base address moved past the current address: restart at the base.
        if self.reverb_cur_addr < wa.start || self.reverb_cur_addr >= self.ram.len() {
            self.reverb_cur_addr = wa.start;
        }

        let r = self.regs.reverb;
        let l_in = input.left.scale(r.vol_l_in);
        let r_in = input.right.scale(r.vol_r_in);

        self.reflect(wa, l_in, r.addr_l_same1, r.addr_l_same2, r.vol_iir, r.vol_wall);
        self.reflect(wa, r_in, r.addr_r_same1, r.addr_r_same2, r.vol_iir, r.vol_wall);
        // Different-side reflections feed from the opposite channel's tap.
        self.reflect(wa, l_in, r.addr_l_diff1, r.addr_r_diff2, r.vol_iir, r.vol_wall);
        self.reflect(wa, r_in, r.addr_r_diff1, r.addr_l_diff2, r.vol_iir, r.vol_wall);

        let combs = [r.vol_comb1, r.vol_comb2, r.vol_comb3, r.vol_comb4];
        let l_out = self.comb(
            wa,
            [r.addr_l_comb1, r.addr_l_comb2, r.addr_l_comb3, r.addr_l_comb4],
            combs,
        );
        let r_out = self.comb(
            wa,
            [r.addr_r_comb1, r.addr_r_comb2, r.addr_r_comb3, r.addr_r_comb4],
            combs,
        );

        let l_out = self.all_pass(wa, l_out, r.addr_l_apf1, r.disp_apf1, r.vol_apf1);
        let r_out = self.all_pass(wa, r_out, r.addr_r_apf1, r.disp_apf1, r.vol_apf1);
        let l_out = self.all_pass(wa, l_out, r.addr_l_apf2, r.disp_apf2, r.vol_apf2);
        let r_out = self.all_pass(wa, r_out, r.addr_r_apf2, r.disp_apf2, r.vol_apf2);

        self.reverb_cur_addr += 1;
        if self.reverb_cur_addr >= self.ram.len() {
            self.reverb_cur_addr = wa.start;
        }

        StereoSample::new(l_out, r_out)
    }

    /// `[m] = (in + [d] * vWALL - [m - 1]) * vIIR + [m - 1]`
    fn reflect(
        &mut self,
        wa: WorkArea,
        input: S,
        m: u16,
        d: u16,
        vol_iir: i16,
        vol_wall: i16,
    ) {
        let prev = self.read(wa, m, 1);
        let fed = input.add(self.read(wa, d, 0).scale(vol_wall));
        let value = fed.sub(prev).scale(vol_iir).add(prev);
        self.write(wa, m, value);
    }

    fn comb(&self, wa: WorkArea, taps: [u16; 4], vols: [i16; 4]) -> S {
        taps.iter()
            .zip(vols)
            .fold(S::ZERO, |acc, (&tap, vol)| acc.add(self.read(wa, tap, 0).scale(vol)))
    }

    fn all_pass(&mut self, wa: WorkArea, x: S, m: u16, disp: u16, vol: i16) -> S {
        let delayed = self.read(wa, m, disp as usize * SLOTS_PER_UNIT);
        let x = x.sub(delayed.scale(vol));
        self.write(wa, m, x);
        x.scale(vol).add(delayed)
    }
}

impl<S: SpuSample, I> Spu<S, I> {
    pub fn is_initialized(&self) -> bool {
        !self.ram.is_empty()
    }

    pub fn ram_size_bytes(&self) -> usize {
        self.ram.len() * 2
    }

    pub fn ram(&self) -> &[S] {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut [S] {
        &mut self.ram
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// RAM slots currently belonging to the reverb work area. Empty when the
    /// base address lies at or beyond the end of RAM.
    pub fn work_area_slots(&self) -> Range<usize> {
        let wa = self.work_area();
        wa.start..wa.start + wa.len
    }

    /// Zero the reverb work area and drop the held reverb output, silencing
    /// any decaying reverb energy. RAM below the base address is left alone.
    pub fn clear_reverb_work_area(&mut self) {
        let start = self.work_area().start;
        self.ram[start..].fill(S::ZERO);
        self.processed_reverb = StereoSample::silence();
    }

    /// Release RAM. Safe to call on a default-constructed or already
    /// destroyed core.
    pub fn destroy(&mut self) {
        self.ram = Vec::new();
        self.reverb_cur_addr = 0;
        self.processed_reverb = StereoSample::silence();
        self.cycle_count = 0;
    }

    fn work_area(&self) -> WorkArea {
        let start = (self.regs.reverb_base_addr8 as usize * SLOTS_PER_UNIT).min(self.ram.len());
        WorkArea {
            start,
            len: self.ram.len() - start,
        }
    }

    /// RAM slot of tap `addr` (8-byte units), `back` slots behind it,
    /// wrapped into the work area.
    fn slot(&self, wa: WorkArea, addr: u16, back: usize) -> usize {
        let rel = self.reverb_cur_addr - wa.start + addr as usize * SLOTS_PER_UNIT + wa.len
            - back % wa.len;
        wa.start + rel % wa.len
    }

    fn read(&self, wa: WorkArea, addr: u16, back: usize) -> S {
        self.ram[self.slot(wa, addr, back)]
    }

    fn write(&mut self, wa: WorkArea, addr: u16, value: S) {
        if self.reverb_write_enable {
            let i = self.slot(wa, addr, 0);
            self.ram[i] = value;
        }
    }
}

impl<S: SpuSample, I: Default> Default for Spu<S, I> {
    /// An uninitialized core with no RAM.
    fn default() -> Self {
        Self {
            regs: SpuRegisters::default(),
            unmute: false,
            reverb_write_enable: false,
            ext_enabled: false,
            ext_reverb_enable: false,
            ram: Vec::new(),
            reverb_cur_addr: 0,
            processed_reverb: StereoSample::silence(),
            cycle_count: 0,
            input: I::default(),
        }
    }
}

/// Main volume is a 15-bit value (`0x3FFF` is unity); widen it to the Q15
/// scale the other volumes use.
fn master_gain(vol: StereoVolume) -> StereoVolume {
    let widen = |v: i16| (v as i32 * 2).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
    StereoVolume::new(widen(vol.left), widen(vol.right))
}
