// ============================================================================
// GlassFE CLI — headless displacement map generation and preview warping
// ============================================================================
//
// Usage examples:
//   glassfe --width 512 --height 512 --output map.png
//   glassfe -W 1024 -H 768 -r 64 -t 32 -s 0.6 -o map.png
//   glassfe -W 256 -H 256 --legacy -o legacy.png
//   glassfe --params glass.json -o map.png --dump-params effective.json
//   glassfe --apply photo.png --aberration 2 -o warped.png
//   glassfe --apply "shots/*.png" --output-dir warped/ --format jpeg
//
// All processing runs synchronously on the current thread; only the
// per-row pixel fills fan out through rayon.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::io::{SaveFormat, encode_and_write, load_image_sync, load_params, save_params};
use crate::ops::displacement::{GlassParams, generate, generate_legacy};
use crate::ops::preview::apply_displacement_core;
use crate::{log_err, log_info};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// GlassFE liquid glass displacement map generator.
///
/// Generate SDF-based displacement maps for a liquid glass runtime shader,
/// or warp images through a map on the CPU as an offline preview.
#[derive(Parser, Debug)]
#[command(
    name = "glassfe",
    about = "GlassFE liquid glass displacement map generator",
    long_about = "Generate the RGBA displacement maps a liquid glass runtime shader\n\
                  samples (red/green encode a signed 2D offset, blue mirrors green,\n\
                  alpha is opaque), or apply a map to source images on the CPU as an\n\
                  offline preview of the shader output.\n\n\
                  Example:\n  \
                  glassfe --width 512 --height 512 --corner-radius 48 --thickness 24 -o map.png\n  \
                  glassfe --apply \"shots/*.png\" --output-dir warped/"
)]
pub struct CliArgs {
    /// Map width in pixels. Required unless --params or --apply supplies dimensions.
    #[arg(short = 'W', long, value_name = "PX")]
    pub width: Option<u32>,

    /// Map height in pixels. Required unless --params or --apply supplies dimensions.
    #[arg(short = 'H', long, value_name = "PX")]
    pub height: Option<u32>,

    /// Corner radius of the glass shape, in pixels of the smaller dimension.
    #[arg(short = 'r', long, default_value_t = 48.0, value_name = "PX")]
    pub corner_radius: f32,

    /// Thickness of the refractive edge band, in pixels of the smaller dimension.
    #[arg(short = 't', long, default_value_t = 24.0, value_name = "PX")]
    pub thickness: f32,

    /// Displacement strength. 0 produces an identity map (effect disabled).
    #[arg(short = 's', long, default_value_t = 0.5)]
    pub scale: f32,

    /// Use the original fixed-shape bulge tuning instead of the banded model.
    /// Shape flags (--corner-radius, --thickness, --scale) are ignored.
    #[arg(long)]
    pub legacy: bool,

    /// Load generation parameters from a JSON document.
    /// Overrides the individual shape flags; --width/--height still win for size.
    #[arg(short = 'p', long, value_name = "FILE.json")]
    pub params: Option<PathBuf>,

    /// Write the effective parameters as a JSON document after generating.
    #[arg(long, value_name = "FILE.json")]
    pub dump_params: Option<PathBuf>,

    /// Source image(s) to warp through a generated map. Glob patterns accepted
    /// (e.g. "shots/*.png"). A map is generated at each image's dimensions.
    #[arg(short = 'a', long, num_args = 1.., value_name = "IMAGE")]
    pub apply: Vec<String>,

    /// Chromatic aberration strength for --apply (shader uniform equivalent).
    #[arg(long, default_value_t = 2.0)]
    pub aberration: f32,

    /// Output file path. Only valid for a single output.
    /// For batch --apply input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the input stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, bmp, tga.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100, default 90).
    #[arg(short, long, default_value_t = 90, value_name = "1-100")]
    pub quality: u8,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all outputs succeeded, `1` = one or more failed.
pub fn run(args: CliArgs) -> ExitCode {
    // Parse format up front so both modes agree on it
    let format = match parse_format(args.format.as_deref(), args.output.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Shape parameters: JSON document wins over individual flags
    let base_params = match &args.params {
        Some(path) => match load_params(path) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("error: {}", e);
                log_err!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => GlassParams {
            // Placeholder dimensions; both modes override them below
            width: 1,
            height: 1,
            corner_radius: args.corner_radius,
            thickness: args.thickness,
            displacement_scale: args.scale,
        },
    };

    if args.apply.is_empty() {
        run_generate(&args, base_params, format)
    } else {
        run_apply(&args, base_params, format)
    }
}

// ============================================================================
// Generate mode
// ============================================================================

fn run_generate(args: &CliArgs, base_params: GlassParams, format: SaveFormat) -> ExitCode {
    // Dimensions: explicit flags win, then the params document
    let width = args.width.or(args.params.as_ref().map(|_| base_params.width));
    let height = args
        .height
        .or(args.params.as_ref().map(|_| base_params.height));
    let (Some(width), Some(height)) = (width, height) else {
        eprintln!(
            "error: --width and --height are required to generate a map\n\
             (or supply them via --params FILE.json; use --apply to size from an image)."
        );
        return ExitCode::FAILURE;
    };
    if width == 0 || height == 0 {
        eprintln!("error: map dimensions must be positive, got {}x{}.", width, height);
        return ExitCode::FAILURE;
    }

    let params = GlassParams {
        width,
        height,
        ..base_params
    };

    let start = Instant::now();
    let map = if args.legacy {
        generate_legacy(width, height)
    } else {
        generate(&params)
    };
    if args.verbose {
        println!(
            "generated {}x{} map ({:.0}ms)",
            width,
            height,
            start.elapsed().as_secs_f64() * 1000.0
        );
    }
    log_info!(
        "generated {}x{} map (legacy: {})",
        width,
        height,
        args.legacy
    );

    if args.output.is_none()
        && let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_map_path(args.output_dir.as_deref(), width, height, format));

    if let Err(e) = write_output(&map, &output, format, args.quality) {
        eprintln!("error: {}", e);
        log_err!("{}", e);
        return ExitCode::FAILURE;
    }
    println!("{}", output.display());

    if let Some(dump) = &args.dump_params {
        if args.legacy {
            eprintln!("warning: --dump-params has no effect with --legacy (fixed tuning).");
        } else if let Err(e) = save_params(&params, dump) {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

// ============================================================================
// Apply mode
// ============================================================================

fn run_apply(args: &CliArgs, base_params: GlassParams, format: SaveFormat) -> ExitCode {
    let inputs = resolve_inputs(&args.apply);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "error: could not create output directory '{}': {}",
                dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let output_path = match build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            format,
        ) {
            Some(p) => p,
            None => {
                eprintln!(
                    "  error: cannot determine output path for '{}'.",
                    input_path.display()
                );
                any_failure = true;
                continue;
            }
        };

        match apply_one(input_path, &output_path, &base_params, args, format) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                log_err!("{}: {}", input_path.display(), e);
                any_failure = true;
            }
        }
    }

    if any_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Load one image, warp it through a map generated at its own dimensions,
/// and write the result.
fn apply_one(
    input: &Path,
    output: &Path,
    base_params: &GlassParams,
    args: &CliArgs,
    format: SaveFormat,
) -> Result<(), String> {
    let src = load_image_sync(input)?;
    if src.width() == 0 || src.height() == 0 {
        return Err(format!("'{}' has zero pixel dimensions", input.display()));
    }

    let map = if args.legacy {
        generate_legacy(src.width(), src.height())
    } else {
        let params = GlassParams {
            width: src.width(),
            height: src.height(),
            ..*base_params
        };
        generate(&params)
    };

    let warped = apply_displacement_core(&src, &map, args.aberration);
    write_output(&warped, output, format, args.quality)
}

// ============================================================================
// Helpers
// ============================================================================

fn write_output(
    image: &image::RgbaImage,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> Result<(), String> {
    encode_and_write(image, path, format, quality)
        .map_err(|e| format!("save failed for '{}': {}", path.display(), e))
}

/// Default output path for generate mode: `glass_<w>x<h>.<ext>` in the
/// output directory (or the working directory).
fn default_map_path(output_dir: Option<&Path>, width: u32, height: u32, format: SaveFormat) -> PathBuf {
    let name = format!("glass_{}x{}.{}", width, height, format.extension());
    match output_dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path — use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        // Treat as glob pattern
        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the [`SaveFormat`] from the `--format` string or infer it from the
/// output file extension. Defaults to PNG when neither is known.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<SaveFormat, String> {
    if let Some(f) = format_arg {
        return SaveFormat::from_name(f)
            .ok_or_else(|| format!("unknown format '{}' (expected png, jpeg, bmp, or tga)", f));
    }

    if let Some(out) = output {
        return Ok(SaveFormat::from_extension(out));
    }

    Ok(SaveFormat::Png)
}

/// Compute the output path for a single apply-mode input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_glass` to the stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> Option<PathBuf> {
    // Explicit output path
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    // Write next to the input file
    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_glass.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_avoids_clobbering_input() {
        let p = build_output_path(Path::new("dir/shot.png"), None, None, SaveFormat::Png).unwrap();
        assert_eq!(p, PathBuf::from("dir/shot_glass.png"));
    }

    #[test]
    fn output_path_changes_extension_in_place() {
        let p = build_output_path(Path::new("dir/shot.png"), None, None, SaveFormat::Jpeg).unwrap();
        assert_eq!(p, PathBuf::from("dir/shot.jpg"));
    }

    #[test]
    fn output_dir_wins_over_fallback() {
        let p = build_output_path(
            Path::new("dir/shot.png"),
            None,
            Some(Path::new("out")),
            SaveFormat::Png,
        )
        .unwrap();
        assert_eq!(p, PathBuf::from("out/shot.png"));
    }

    #[test]
    fn format_parse_rejects_unknown_names() {
        assert!(parse_format(Some("webp"), None).is_err());
        assert_eq!(parse_format(Some("PNG"), None), Ok(SaveFormat::Png));
        assert_eq!(
            parse_format(None, Some(Path::new("x.tga"))),
            Ok(SaveFormat::Tga)
        );
    }
}
