/// Reverb Render: offline PlayStation SPU reverb renderer.
///
/// Runs WAV files through the same engine the plugin uses, renders impulse
/// responses of the factory presets, and lists the preset table.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use hound::{SampleFormat, WavSpec, WavWriter};

use psx_reverb_dsp::engine::{EngineConfig, ReverbEngine};
use psx_reverb_dsp::pipeline::StepPolicy;
use psx_reverb_dsp::presets::{self, FACTORY_PRESETS};
use psx_reverb_dsp::registers::ControlValues;
use psx_reverb_dsp::spu::SPU_RAM_SIZE;

const BLOCK_SIZE: usize = 1024;
const IMPULSE_SAMPLE_RATE: u32 = 44100;

#[derive(Parser)]
#[command(name = "reverb-render", about = "PlayStation SPU reverb renderer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List factory presets
    Presets,

    /// Run a WAV file through the reverb
    Render {
        /// Input WAV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output WAV file (24-bit, input sample rate)
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        reverb: ReverbArgs,

        /// Override a control, e.g. `revBaseAddr=0xA000` (repeatable)
        #[arg(long = "set", value_name = "ID=VALUE")]
        overrides: Vec<String>,

        /// Seconds of silence appended so the tail can ring out
        #[arg(long, default_value_t = 2.0)]
        tail: f64,
    },

    /// Render a stereo impulse response
    Impulse {
        /// Output WAV file (stereo, 44.1 kHz, 24-bit)
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        reverb: ReverbArgs,

        /// Length of the response in seconds
        #[arg(short, long, default_value_t = 3.0)]
        duration: f64,
    },
}

#[derive(clap::Args)]
struct ReverbArgs {
    /// Factory preset name
    #[arg(short, long, default_value = "Hall")]
    preset: String,

    /// Step the SPU 4x per frame (SPU2 reverb timing)
    #[arg(long)]
    spu2_rate: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Presets => list_presets(),
        Command::Render {
            input,
            output,
            reverb,
            overrides,
            tail,
        } => render(&input, &output, &reverb, &overrides, tail),
        Command::Impulse {
            output,
            reverb,
            duration,
        } => impulse(&output, &reverb, duration),
    }
}

fn list_presets() -> Result<()> {
    println!("{:<10} {:>8} {:>10}", "NAME", "BASE", "WORK AREA");
    for preset in &FACTORY_PRESETS {
        let start = preset.base_addr8 as usize * 8;
        let area = SPU_RAM_SIZE.saturating_sub(start);
        println!(
            "{:<10} {:>#8x} {:>7} KiB",
            preset.name,
            preset.base_addr8,
            area / 1024
        );
    }
    Ok(())
}

/// Engine configured from the preset, the SPU2-rate flag and any overrides.
fn build_engine(args: &ReverbArgs, overrides: &[String]) -> Result<ReverbEngine> {
    let preset = presets::find(&args.preset)?;
    let mut controls: ControlValues = preset.controls();
    for assignment in overrides {
        let id = controls
            .apply_override(assignment)
            .with_context(|| format!("bad --set {assignment:?}"))?;
        log::info!("override {} = {}", id.id(), controls[id]);
    }

    let engine = ReverbEngine::new(EngineConfig {
        step_policy: StepPolicy::from_spu2_rate(args.spu2_rate),
        ..EngineConfig::default()
    });
    engine.restore_from_controls(&controls);
    let policy = engine.step_policy();
    log::info!(
        "preset {} at base {:#06x}, {} step(s) per frame{}",
        preset.name,
        engine.registers().reverb_base_addr8,
        policy.steps_per_frame,
        if policy.is_oversampled() { " (SPU2 rate)" } else { "" }
    );
    Ok(engine)
}

fn render(
    input: &Path,
    output: &Path,
    args: &ReverbArgs,
    overrides: &[String],
    tail: f64,
) -> Result<()> {
    if !tail.is_finite() || tail < 0.0 {
        bail!("tail must be non-negative, got {tail}");
    }
    let engine = build_engine(args, overrides)?;

    let (mut channels, sample_rate) = read_wav(input)?;
    let tail_frames = (tail * sample_rate as f64) as usize;
    for channel in &mut channels {
        channel.resize(channel.len() + tail_frames, 0.0);
    }
    let num_frames = channels.first().map_or(0, Vec::len);
    let num_out = if channels.len() == 1 { 1 } else { 2 };
    log::info!(
        "rendering {} ({} ch, {} Hz, {num_frames} frames) -> {} ({num_out} ch)",
        input.display(),
        channels.len(),
        sample_rate,
        output.display()
    );

    let mut out = vec![vec![0.0f32; num_frames]; num_out];
    let mut start = 0;
    while start < num_frames {
        let end = (start + BLOCK_SIZE).min(num_frames);
        let inputs: Vec<&[f32]> = channels.iter().map(|c| &c[start..end]).collect();
        let mut outputs: Vec<&mut [f32]> = out.iter_mut().map(|c| &mut c[start..end]).collect();
        engine.process_block(&inputs, &mut outputs);
        start = end;
    }

    write_wav(output, &out, sample_rate)
}

fn impulse(output: &Path, args: &ReverbArgs, duration: f64) -> Result<()> {
    if !duration.is_finite() || duration <= 0.0 {
        bail!("duration must be positive, got {duration}");
    }
    let engine = build_engine(args, &[])?;

    let num_frames = (duration * IMPULSE_SAMPLE_RATE as f64) as usize;
    let mut excitation = vec![0.0f32; num_frames];
    if let Some(first) = excitation.first_mut() {
        *first = 1.0;
    }

    let mut out = vec![vec![0.0f32; num_frames]; 2];
    for start in (0..num_frames).step_by(BLOCK_SIZE) {
        let end = (start + BLOCK_SIZE).min(num_frames);
        let input = &excitation[start..end];
        let (left, right) = out.split_at_mut(1);
        engine.process_block(
            &[input, input],
            &mut [&mut left[0][start..end], &mut right[0][start..end]],
        );
    }

    let peak = out
        .iter()
        .flatten()
        .fold(0.0f32, |p, x| p.max(x.abs()));
    log::info!(
        "impulse peak {peak:.6} ({:.1} dBFS)",
        20.0 * (peak as f64).log10()
    );

    write_wav(output, &out, IMPULSE_SAMPLE_RATE)
}

/// Read a WAV file into per-channel buffers normalised to -1.0..=1.0.
fn read_wav(path: &Path) -> Result<(Vec<Vec<f32>>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    let num_channels = spec.channels as usize;
    if num_channels == 0 {
        bail!("{} has no channels", path.display());
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .with_context(|| format!("failed to read {}", path.display()))?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<Result<_, _>>()
                .with_context(|| format!("failed to read {}", path.display()))?
        }
    };

    let mut channels = vec![Vec::with_capacity(interleaved.len() / num_channels); num_channels];
    for frame in interleaved.chunks_exact(num_channels) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
    Ok((channels, spec.sample_rate))
}

fn write_wav(path: &Path, channels: &[Vec<f32>], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 24,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let scale = (1 << 23) as f64 - 1.0;
    let num_frames = channels.first().map_or(0, Vec::len);
    for i in 0..num_frames {
        for channel in channels {
            let s = (channel[i] as f64).clamp(-1.0, 1.0);
            writer.write_sample((s * scale) as i32)?;
        }
    }
    writer.finalize()?;
    log::info!("written {}", path.display());
    Ok(())
}
