// Pixel-processing modules: displacement map generation and the CPU
// reference preview that consumes the maps.

pub mod displacement;
pub mod preview;
