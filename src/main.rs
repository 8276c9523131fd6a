//! Terramorph CLI - terrain synthesis and image morphology.
//!
//! Generates diamond-square heightmaps or applies morphology operators to
//! images, on the GPU where one is available. PNG encode/decode and value
//! normalization happen here, on the caller side of the library boundary.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;

use terramorph::gpu::GpuContext;
use terramorph::morphology::{self, rgba, EdgeMode, MorphConfig, MorphOp, StructuringElement};
use terramorph::terrain::{generate_heightmap, CornerInit, HeightmapConfig};
use terramorph::{Backend, Heightmap, Image};

/// GPU-accelerated terrain synthesis and image morphology.
#[derive(Parser)]
#[command(name = "terramorph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a diamond-square heightmap and save it as a grayscale PNG.
    Generate {
        /// Side length; must be 2^n + 1 (e.g. 257, 513, 1025).
        #[arg(short, long, default_value = "257")]
        size: usize,

        /// Displacement magnitude at the coarsest level.
        #[arg(short, long, default_value = "1.0")]
        roughness: f32,

        /// Random seed for reproducible generation.
        #[arg(long)]
        seed: Option<u64>,

        /// Height of all four corners.
        #[arg(long, default_value = "0.0")]
        corner: f32,

        /// Draw corner heights from the seed instead of --corner.
        #[arg(long)]
        random_corners: bool,

        /// Compute backend.
        #[arg(short, long, default_value = "auto")]
        backend: BackendArg,

        /// Output PNG path.
        #[arg(short, long, default_value = "heightmap.png")]
        output: PathBuf,
    },
    /// Apply a morphology operator to a PNG image.
    Morph {
        /// Input image path.
        input: PathBuf,

        /// Operator to apply.
        #[arg(long, default_value = "open")]
        op: OpArg,

        /// Structuring element shape.
        #[arg(long, default_value = "rect")]
        shape: ShapeArg,

        /// Structuring element width in pixels.
        #[arg(long, default_value = "3")]
        element_width: usize,

        /// Structuring element height in pixels.
        #[arg(long, default_value = "3")]
        element_height: usize,

        /// Border policy for reads outside the image.
        #[arg(long, default_value = "clamp")]
        edge: EdgeArg,

        /// Border value used with --edge constant.
        #[arg(long, default_value = "0.0")]
        border: f32,

        /// Process color channels separately instead of grayscale.
        #[arg(long)]
        color: bool,

        /// Compute backend.
        #[arg(short, long, default_value = "auto")]
        backend: BackendArg,

        /// Output PNG path.
        #[arg(short, long, default_value = "morphed.png")]
        output: PathBuf,
    },
    /// Report whether a GPU adapter is available.
    Probe,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Auto,
    Gpu,
    Cpu,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => Backend::Auto,
            BackendArg::Gpu => Backend::GpuOnly,
            BackendArg::Cpu => Backend::CpuOnly,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OpArg {
    Erode,
    Dilate,
    Open,
    Close,
}

impl From<OpArg> for MorphOp {
    fn from(arg: OpArg) -> Self {
        match arg {
            OpArg::Erode => MorphOp::Erode,
            OpArg::Dilate => MorphOp::Dilate,
            OpArg::Open => MorphOp::Open,
            OpArg::Close => MorphOp::Close,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ShapeArg {
    Rect,
    Cross,
}

#[derive(Clone, Copy, ValueEnum)]
enum EdgeArg {
    Clamp,
    Constant,
    Identity,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            size,
            roughness,
            seed,
            corner,
            random_corners,
            backend,
            output,
        } => {
            run_generate(size, roughness, seed, corner, random_corners, backend, output);
        }
        Commands::Morph {
            input,
            op,
            shape,
            element_width,
            element_height,
            edge,
            border,
            color,
            backend,
            output,
        } => {
            run_morph(
                input,
                op,
                shape,
                element_width,
                element_height,
                edge,
                border,
                color,
                backend,
                output,
            );
        }
        Commands::Probe => run_probe(),
    }
}

fn run_generate(
    size: usize,
    roughness: f32,
    seed: Option<u64>,
    corner: f32,
    random_corners: bool,
    backend: BackendArg,
    output: PathBuf,
) {
    // Generate seed if not provided
    let seed = seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos() as u64
    });

    println!("Terramorph - Heightmap Generation");
    println!("=================================");
    println!("Size: {}x{}", size, size);
    println!("Roughness: {}", roughness);
    println!("Seed: {}", seed);

    let config = HeightmapConfig {
        size,
        roughness,
        seed,
        corners: if random_corners {
            CornerInit::Random
        } else {
            CornerInit::Constant(corner)
        },
        backend: backend.into(),
    };

    let start = Instant::now();
    let heightmap = match generate_heightmap(&config) {
        Ok(hm) => hm,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let (min, max) = heightmap.height_range();
    println!(
        "Generated in {:.2?} (height range {:.3}..{:.3})",
        start.elapsed(),
        min,
        max
    );

    if let Err(e) = heightmap_to_luma(&heightmap).save(&output) {
        eprintln!("Error: failed to save {}: {}", output.display(), e);
        std::process::exit(1);
    }
    println!("Saved {}", output.display());
}

/// Normalizes the height range onto 8-bit grayscale.
fn heightmap_to_luma(heightmap: &Heightmap) -> image::GrayImage {
    let (min, max) = heightmap.height_range();
    let scale = if max > min { 255.0 / (max - min) } else { 0.0 };
    let size = heightmap.size() as u32;
    image::GrayImage::from_fn(size, size, |x, y| {
        let v = (heightmap.get(x as usize, y as usize) - min) * scale;
        image::Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

fn run_morph(
    input: PathBuf,
    op: OpArg,
    shape: ShapeArg,
    element_width: usize,
    element_height: usize,
    edge: EdgeArg,
    border: f32,
    color: bool,
    backend: BackendArg,
    output: PathBuf,
) {
    let element = match shape {
        ShapeArg::Rect => StructuringElement::rect(element_width, element_height),
        ShapeArg::Cross => StructuringElement::cross(element_width, element_height),
    };
    let element = match element {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let config = MorphConfig {
        edge: match edge {
            EdgeArg::Clamp => EdgeMode::Clamp,
            EdgeArg::Constant => EdgeMode::Constant(border),
            EdgeArg::Identity => EdgeMode::Identity,
        },
        backend: backend.into(),
    };

    let loaded = match image::open(&input) {
        Ok(img) => img,
        Err(e) => {
            eprintln!("Error: failed to read {}: {}", input.display(), e);
            std::process::exit(1);
        }
    };

    println!("Terramorph - Morphology");
    println!("=======================");
    println!("Input: {}", input.display());
    println!(
        "Element: {} {}x{}, anchor {:?}",
        shape_name(shape),
        element.width(),
        element.height(),
        element.anchor()
    );

    let start = Instant::now();
    let result = if color {
        rgba::apply(op.into(), &loaded.to_rgba8(), &element, &config)
            .map(image::DynamicImage::ImageRgba8)
    } else {
        let luma = loaded.to_luma8();
        let (w, h) = luma.dimensions();
        let plane = Image::from_data(
            w as usize,
            h as usize,
            luma.pixels().map(|p| p.0[0] as f32).collect(),
        );
        morphology::run(op.into(), &plane, &element, &config).map(|out| {
            image::DynamicImage::ImageLuma8(image::GrayImage::from_fn(w, h, |x, y| {
                let v = out.get(x as usize, y as usize);
                image::Luma([v.round().clamp(0.0, 255.0) as u8])
            }))
        })
    };

    let result = match result {
        Ok(img) => img,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    println!("Processed in {:.2?}", start.elapsed());

    if let Err(e) = result.save(&output) {
        eprintln!("Error: failed to save {}: {}", output.display(), e);
        std::process::exit(1);
    }
    println!("Saved {}", output.display());
}

fn shape_name(shape: ShapeArg) -> &'static str {
    match shape {
        ShapeArg::Rect => "rect",
        ShapeArg::Cross => "cross",
    }
}

fn run_probe() {
    match pollster::block_on(GpuContext::new()) {
        Ok(ctx) => println!(
            "GPU adapter: {} ({:?})",
            ctx.adapter_info.name, ctx.adapter_info.backend
        ),
        Err(e) => println!("No GPU available ({}); compute will run on the CPU", e),
    }
}
