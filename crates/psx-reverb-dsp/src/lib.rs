//! PlayStation SPU reverb engine.
//!
//! Framework-agnostic: register model and factory presets, the host-buffer
//! pipeline, the shared engine state and a reverb-only SPU core. No audio
//! framework dependencies.

// SPU core
pub mod input;
pub mod sample;
pub mod spu;

// Control surface
pub mod presets;
pub mod registers;

// Host side
pub mod engine;
pub mod pipeline;
