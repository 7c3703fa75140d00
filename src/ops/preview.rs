// ============================================================================
// CPU REFERENCE PREVIEW — offline application of a displacement map
// ============================================================================
//
// Reproduces what the external runtime shader renders, pixel for pixel, on
// the CPU: decode the map's red/green channels to a signed UV offset, sample
// the source three times with per-channel offsets for chromatic aberration,
// and blend toward the undisplaced original where the displacement is near
// zero. Used by the CLI `--apply` mode and by tests to exercise the encode
// contract end to end. Offline only — the real-time path is the shader's.

use image::RgbaImage;
use rayon::prelude::*;

use crate::shader::decode_channel;

use super::displacement::smoothstep;

/// Clamp-sample a pixel, mirroring the shader's clamp-to-edge addressing.
#[inline]
fn sample_clamped(img: &RgbaImage, x: i32, y: i32) -> [f32; 4] {
    let cx = x.clamp(0, img.width() as i32 - 1) as u32;
    let cy = y.clamp(0, img.height() as i32 - 1) as u32;
    let p = img.get_pixel(cx, cy);
    [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
}

/// Bilinear-sample at fractional pixel coordinates.
#[inline]
fn sample_bilinear(img: &RgbaImage, fx: f32, fy: f32) -> [f32; 4] {
    let x0 = fx.floor() as i32;
    let y0 = fy.floor() as i32;
    let dx = fx - x0 as f32;
    let dy = fy - y0 as f32;

    let p00 = sample_clamped(img, x0, y0);
    let p10 = sample_clamped(img, x0 + 1, y0);
    let p01 = sample_clamped(img, x0, y0 + 1);
    let p11 = sample_clamped(img, x0 + 1, y0 + 1);

    let mut out = [0.0f32; 4];
    for c in 0..4 {
        let top = p00[c] + (p10[c] - p00[c]) * dx;
        let bottom = p01[c] + (p11[c] - p01[c]) * dx;
        out[c] = top + (bottom - top) * dy;
    }
    out
}

/// Sample a UV coordinate (clamped to [0,1]) from the source image.
#[inline]
fn sample_uv(img: &RgbaImage, u: f32, v: f32) -> [f32; 4] {
    let u = u.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);
    sample_bilinear(img, u * img.width() as f32, v * img.height() as f32)
}

/// Warp `src` through `map`, reproducing the runtime shader's output.
///
/// The map is sampled clamp-to-edge, so it may be any size; the CLI
/// generates it at the source image's dimensions. `aberration_intensity`
/// matches the shader uniform of the same name.
pub fn apply_displacement_core(
    src: &RgbaImage,
    map: &RgbaImage,
    aberration_intensity: f32,
) -> RgbaImage {
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }

    let wf = w as f32;
    let hf = h as f32;
    let stride = w * 4;
    let src_raw = src.as_raw();

    let mut dst_raw = vec![0u8; w * h * 4];
    dst_raw
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row_out)| {
            let v = y as f32 / hf;
            for x in 0..w {
                let u = x as f32 / wf;

                // Decode the displacement vector for this fragment.
                let mp = sample_clamped(map, x as i32, y as i32);
                let disp_u = decode_channel(mp[0] as u8);
                let disp_v = decode_channel(mp[1] as u8);

                // Aberration spread grows with radial distance from center.
                let pos_u = u - 0.5;
                let pos_v = v - 0.5;
                let edge_mask = smoothstep(0.2, 0.8, (pos_u * pos_u + pos_v * pos_v).sqrt());
                let aberration = aberration_intensity * 0.002 * edge_mask;

                let red = sample_uv(src, u + disp_u + aberration, v + disp_v);
                let green = sample_uv(src, u + disp_u * 0.95, v + disp_v * 0.95);
                let blue = sample_uv(src, u + disp_u * 0.9 - aberration, v + disp_v * 0.9);

                // Near-zero displacement falls back to the original pixel.
                let magnitude = (disp_u * disp_u + disp_v * disp_v).sqrt();
                let mix_factor = smoothstep(0.0, 0.05, magnitude);

                let si = y * stride + x * 4;
                let distorted = [red[0], green[1], blue[2], green[3]];
                let pi = x * 4;
                for c in 0..4 {
                    let original = src_raw[si + c] as f32;
                    let mixed = original + (distorted[c] - original) * mix_factor;
                    row_out[pi + c] = mixed.round().clamp(0.0, 255.0) as u8;
                }
            }
        });

    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap()
}
