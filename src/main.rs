use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use collapse::{generate, BoundaryPolicy, CollapseError, Config, PatchFlags, SolveFlags};

#[derive(Parser)]
#[command(author, version, about, long_about = None)] // Read from `Cargo.toml`
struct Cli {
    /// Path to the texture to process.
    input_texture: PathBuf,
    /// Path to the output texture.
    #[arg(short = 'o', long = "output")]
    output_texture: Option<PathBuf>,
    /// The patch (kernel) size.
    #[arg(short = 's', long = "size", default_value = "2")]
    size: usize,
    /// The width of the output image.
    #[arg(long = "width", default_value = "10")]
    width: usize,
    /// The height of the output image.
    #[arg(long = "height", default_value = "10")]
    height: usize,
    /// Submit each patch's 90-degree rotations in addition to itself.
    #[arg(long = "rotate")]
    rotate: bool,
    /// Submit each patch's vertical mirror.
    #[arg(long = "mirror-v")]
    mirror_v: bool,
    /// Submit each patch's horizontal mirror.
    #[arg(long = "mirror-h")]
    mirror_h: bool,
    /// Disable horizontal wraparound when enumerating input windows.
    #[arg(long = "no-h-wrap")]
    no_h_wrap: bool,
    /// Disable vertical wraparound when enumerating input windows.
    #[arg(long = "no-v-wrap")]
    no_v_wrap: bool,
    /// Wrap the output grid during solving instead of treating it as bounded.
    #[arg(long = "seamless")]
    seamless: bool,
    /// Pin the RNG to a fixed seed for deterministic output.
    #[arg(long = "seed")]
    seed: Option<u64>,
    /// Number of times to restart the solve on contradiction before giving up.
    #[arg(long = "retries", default_value = "8")]
    retries: u32,
    /// Raise logging verbosity.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn install_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .init();
}

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            match err.downcast_ref::<CollapseError>() {
                Some(CollapseError::ArgumentError(_)) | Some(CollapseError::InputTooSmall { .. }) => {
                    ExitCode::from(1)
                }
                Some(CollapseError::Contradiction { .. }) => ExitCode::from(2),
                _ => ExitCode::from(1),
            }
        }
    }
}

/// Parses argv, mapping clap's own usage errors into `ArgumentError` so they
/// flow through `main`'s exit-code mapping instead of clap's `exit(2)`, which
/// would collide with the contradiction exit code.
fn try_main() -> anyhow::Result<()> {
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(err)
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(CollapseError::ArgumentError(err.to_string()).into()),
    };
    install_logging(args.verbose);
    run(args)
}

fn run(args: Cli) -> anyhow::Result<()> {
    if args.size == 0 {
        return Err(CollapseError::ArgumentError("pattern size must be positive".into()).into());
    }
    if args.width == 0 || args.height == 0 {
        return Err(CollapseError::ArgumentError("width and height must be positive".into()).into());
    }

    let image = image::open(&args.input_texture)?.to_rgba8();

    let patch_flags = PatchFlags {
        wrap_x: !args.no_h_wrap,
        wrap_y: !args.no_v_wrap,
        rotate: args.rotate,
        mirror_v: args.mirror_v,
        mirror_h: args.mirror_h,
    };

    let solve_flags = SolveFlags {
        boundary: if args.seamless {
            BoundaryPolicy::Seamless
        } else {
            BoundaryPolicy::Bounded
        },
        max_restarts: args.retries,
    };

    let output = generate(
        &image,
        Config {
            pattern_size: args.size,
            width: args.width,
            height: args.height,
            patch_flags,
            solve_flags,
            seed: args.seed,
        },
    )?;

    if let Some(path) = args.output_texture {
        output.save(path)?;
    }

    Ok(())
}
