//! `eggfit` command line.
//!
//! - `bulge-disk`: pure-bulge and pure-disk variants of a sky catalog
//! - `half-radius`: variant with bulge and disk radii halved
//! - `to-adu`: convert a count-rate image to counts
//! - `flag`: classify Galfit fits
//! - `crossmatch`: match fitted sources to the simulated truth catalog

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};
use eggfit::crossmatch::CrossmatchConfig;
use eggfit::quality::QualityParams;
use eggfit::sky::{convert_file, BuildMode, SkyMaker, VariantPaths};
use eggfit::workflow;
use log::LevelFilter;

#[cfg(not(feature = "tracing"))]
use log::info;

#[cfg(feature = "tracing")]
use tracing::info;

#[cfg(feature = "tracing")]
use eggfit::core::init_tracing;
#[cfg(not(feature = "tracing"))]
use eggfit::core::init_with_level;

#[derive(Parser, Debug)]
#[command(name = "eggfit", version, about = "Galfit on EGG simulated skies")]
struct Args {
    /// Log level for the eggfit crates (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,

    /// Emit JSON log lines
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    LevelFilter::from_str(s)
        .map_err(|_| format!("unknown level {s:?}, expected off, error, warn, info, debug or trace"))
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Write the edited catalog and configuration only
    CatalogOnly,
    /// Also run SkyMaker and egg-postskymaker on them
    CatalogAndImage,
}

impl From<Mode> for BuildMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::CatalogOnly => BuildMode::CatalogOnly,
            Mode::CatalogAndImage => BuildMode::CatalogAndImage,
        }
    }
}

#[derive(clap::Args, Debug)]
struct SkyArgs {
    /// SkyMaker catalog produced by egg-2skymaker
    #[arg(long)]
    catalog: PathBuf,

    /// SkyMaker configuration file
    #[arg(long)]
    config: PathBuf,

    #[arg(long, value_enum, default_value = "catalog-only")]
    mode: Mode,

    /// SkyMaker executable
    #[arg(long, default_value = "sky")]
    skymaker: String,

    /// Post-processing executable
    #[arg(long, default_value = "egg-postskymaker")]
    postprocessor: String,
}

impl SkyArgs {
    fn source(&self) -> VariantPaths {
        VariantPaths::new(&self.catalog, &self.config)
    }

    fn simulator(&self) -> SkyMaker {
        SkyMaker {
            skymaker: self.skymaker.clone(),
            postprocessor: self.postprocessor.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build pure-bulge (bt=1) and pure-disk (bt=0) variants
    BulgeDisk(SkyArgs),

    /// Build a variant with bulge and disk radii halved
    HalfRadius(SkyArgs),

    /// Convert an ADU/s image to ADU
    ToAdu {
        /// Input FITS image
        image: PathBuf,

        /// Exposure time in seconds
        #[arg(short, long)]
        exposure: f64,
    },

    /// Flag Galfit fits as good, suspicious, bad or unavailable
    Flag {
        /// Galapagos/Galfit output catalog
        catalog: PathBuf,

        /// JSON file with classifier parameters
        #[arg(long)]
        params: Option<PathBuf>,

        /// The Sérsic index was fixed during fitting
        #[arg(long)]
        fixed_sersic: bool,

        /// Fits fainter than this magnitude are bad
        #[arg(long)]
        mag_limit: Option<f64>,

        /// Magnitude column used with --mag-limit
        #[arg(long)]
        mag_column: Option<String>,

        /// Report path
        #[arg(short, long, default_value = "quality_report.json")]
        output: PathBuf,
    },

    /// Match fitted sources to the simulated truth catalog
    Crossmatch {
        /// JSON configuration; flags below override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Galfit catalog (X_IMAGE, Y_IMAGE, RE_GALFIT, FIT_DONE)
        #[arg(long)]
        candidates: Option<String>,

        /// Truth catalog with pixel positions
        #[arg(long)]
        references: Option<String>,

        /// Truth x column
        #[arg(long)]
        reference_x: Option<String>,

        /// Truth y column
        #[arg(long)]
        reference_y: Option<String>,

        /// Truth magnitude column used with --mag-limit
        #[arg(long)]
        reference_mag: Option<String>,

        /// Only references brighter than this magnitude are eligible
        #[arg(long)]
        mag_limit: Option<f64>,

        /// Window half-width increment of the adaptive search (pixels)
        #[arg(long)]
        search_step: Option<f64>,

        /// Half-width at which an empty-footprint, unfit candidate gives up (pixels)
        #[arg(long)]
        unfit_escape_radius: Option<f64>,

        /// Report path
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    #[cfg(not(feature = "tracing"))]
    {
        if let Err(e) = init_with_level(args.log_level) {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    }

    #[cfg(feature = "tracing")]
    {
        tracing_log::LogTracer::init().ok();
        init_tracing(args.log_json, args.log_level);
    }

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::BulgeDisk(sky) => {
            let built = workflow::bulge_disk(&sky.source(), sky.mode.into(), &sky.simulator())?;
            info!("{} variants built", built.len());
            for paths in built {
                println!("{} {}", paths.catalog.display(), paths.config.display());
            }
        }
        Command::HalfRadius(sky) => {
            let paths = workflow::half_radius(&sky.source(), sky.mode.into(), &sky.simulator())?;
            println!("{} {}", paths.catalog.display(), paths.config.display());
        }
        Command::ToAdu { image, exposure } => {
            let out = convert_file(&image, exposure)?;
            println!("{}", out.display());
        }
        Command::Flag {
            catalog,
            params,
            fixed_sersic,
            mag_limit,
            mag_column,
            output,
        } => {
            let mut p = match params {
                Some(path) => QualityParams::load_json(path)?,
                None => QualityParams::default(),
            };
            p.fixed_sersic |= fixed_sersic;
            if mag_limit.is_some() {
                p.mag_limit = mag_limit;
            }
            if let Some(column) = mag_column {
                p.mag_column = column;
            }

            let report = workflow::flag_catalog(&catalog, &p, &output)?;
            let c = report.counts;
            println!("good: {}", c.good);
            println!("suspicious: {}", c.suspicious);
            println!("bad: {}", c.bad);
            println!("unavailable: {}", c.unavailable);
        }
        Command::Crossmatch {
            config,
            candidates,
            references,
            reference_x,
            reference_y,
            reference_mag,
            mag_limit,
            search_step,
            unfit_escape_radius,
            output,
        } => {
            let mut cfg = match (config, candidates.clone(), references.clone()) {
                (Some(path), _, _) => CrossmatchConfig::load_json(path)?,
                (None, Some(c), Some(r)) => CrossmatchConfig::new(c, r),
                (None, _, _) => {
                    return Err("crossmatch needs --config or both --candidates and --references".into())
                }
            };
            if let Some(c) = candidates {
                cfg.candidates_path = c;
            }
            if let Some(r) = references {
                cfg.references_path = r;
            }
            if let Some(x) = reference_x {
                cfg.reference_x = x;
            }
            if let Some(y) = reference_y {
                cfg.reference_y = y;
            }
            if reference_mag.is_some() {
                cfg.reference_mag = reference_mag;
            }
            if mag_limit.is_some() {
                cfg.mag_limit = mag_limit;
            }
            if let Some(step) = search_step {
                cfg.params.search_step = step;
            }
            if let Some(radius) = unfit_escape_radius {
                cfg.params.unfit_escape_radius = radius;
            }
            if output.is_some() {
                cfg.output_path = output;
            }
            let report = workflow::crossmatch(&cfg)?;
            let s = report.summary;
            println!("candidates: {}", s.candidates);
            println!("eligible references: {}/{}", s.eligible_references, s.references);
            println!("resolved: {}", s.resolved);
            println!("conflicts: {}", s.conflicts);
            println!("unresolved: {}", s.unresolved);
            println!("number of errors: {}", s.error_count);
        }
    }
    Ok(())
}
