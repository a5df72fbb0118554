use clap::{Parser, Subcommand};
use folio_gallery::config::{self, GalleryConfig, OrderingStrategy, ResolvedPaths};
use folio_gallery::imaging::RustBackend;
use folio_gallery::maintenance::{self, read_artifact, referenced_hrefs};
use folio_gallery::output;
use folio_gallery::pipeline::{self, BuildOptions};
use std::path::{Path, PathBuf};

/// Flags for the `build` command.
#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Re-encode every rendition, ignoring freshness
    #[arg(long)]
    no_cache: bool,

    /// Seed for the randomized shuffle (overrides `ordering.seed`)
    #[arg(long)]
    seed: Option<u64>,

    /// Ordering strategy (overrides `ordering.strategy`)
    #[arg(long, value_enum)]
    strategy: Option<OrderingStrategy>,
}

#[derive(Parser)]
#[command(name = "folio-gallery")]
#[command(about = "Build the photo gallery data for a portfolio site")]
#[command(long_about = "\
Build the photo gallery data for a portfolio site

Category folders of photos go in; AVIF renditions and a generated
TypeScript data file come out.

Project layout (defaults):

  gallery.toml                     # Optional config (see gen-config)
  public/gallery/
  ├── street/                      # One folder per configured category
  │   ├── DSC0042 #bw.jpg          # '#tag' adds the photo to a category
  │   └── DSC0051.jpg              # Untagged: belongs to its folder
  ├── bw/
  │   └── DSC0042 #bw.jpg          # Same identity: deduplicated
  └── optimized/                   # Generated renditions
  src/data/gallery.ts              # Generated artifact

Metadata comes from EXIF (camera, lens, focal length, aperture, shutter,
ISO); missing values are shown as placeholders.

Run 'folio-gallery gen-config' to generate a documented gallery.toml.")]
#[command(version = env!("FOLIO_VERSION"))]
struct Cli {
    /// Project root; configured paths are relative to it
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (default: gallery.toml under the root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: scan → transcode → order → emit
    Build(BuildArgs),
    /// Scan and deduplicate without writing anything
    Scan,
    /// Report duplicate rows in the generated artifact
    CheckDuplicates,
    /// Drop "all" rows already covered by a category row (with backup)
    RemoveDuplicates,
    /// List photos in the gallery folders that the artifact doesn't show
    FindNew {
        /// Also write the list as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Give camera-less source files (Snapseed.jpg, UUIDs, ...) IMG names
    Rename {
        /// Perform the renames instead of listing them
        #[arg(long)]
        apply: bool,
    },
    /// Print a stock gallery.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let root = cli.root;
    let config_path = cli.config.unwrap_or_else(|| root.join("gallery.toml"));

    match cli.command {
        Command::Build(args) => {
            let config = config::load_config(&config_path)?;
            run_build(&root, &config, args)?;
        }
        Command::Scan => {
            let config = config::load_config(&config_path)?;
            let survey = pipeline::survey(&root, &config, &RustBackend::new())?;
            output::print_scan_output(&survey);
        }
        Command::CheckDuplicates => {
            let paths = load_paths(&root, &config_path)?;
            let artifact = read_artifact(&paths.output_file)?;
            let report = maintenance::check_duplicates(&artifact.items);
            output::print_duplicate_report(&report);
        }
        Command::RemoveDuplicates => {
            let paths = load_paths(&root, &config_path)?;
            let summary = maintenance::remove_duplicates(&paths.output_file)?;
            output::print_removal_summary(&summary);
        }
        Command::FindNew { output: out } => {
            let config = config::load_config(&config_path)?;
            let paths = config.paths.resolve(&root);
            let artifact = read_artifact(&paths.output_file)?;
            let referenced = referenced_hrefs(&artifact.items);
            let found =
                maintenance::find_new(&paths.gallery_dir, &config, &paths.href_prefix, &referenced)?;
            output::print_new_photos(&found);
            if let Some(out) = out {
                maintenance::write_new_photos(&out, &found)?;
                println!("Saved list to {}", out.display());
            }
        }
        Command::Rename { apply } => {
            let paths = load_paths(&root, &config_path)?;
            run_rename(&paths.source_dir, apply)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_paths(root: &Path, config_path: &Path) -> Result<ResolvedPaths, config::ConfigError> {
    Ok(config::load_config(config_path)?.paths.resolve(root))
}

fn run_build(
    root: &Path,
    config: &GalleryConfig,
    args: BuildArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    init_thread_pool(&config.processing);
    let options = BuildOptions {
        no_cache: args.no_cache,
        seed: args.seed,
        strategy: args.strategy,
    };

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = pipeline::build(root, config, &options, &RustBackend::new(), Some(tx));
    printer.join().ok();

    let report = result?;
    println!();
    output::print_build_summary(&report);
    Ok(())
}

fn run_rename(source_dir: &Path, apply: bool) -> Result<(), Box<dyn std::error::Error>> {
    let plans = maintenance::plan_renames(source_dir)?;
    if !apply || plans.is_empty() {
        output::print_rename_plans(&plans, source_dir);
        return Ok(());
    }
    let outcome = maintenance::apply_renames(plans);
    output::print_rename_outcome(&outcome, source_dir);
    if outcome.failed.is_empty() {
        Ok(())
    } else {
        Err(format!("{} rename(s) failed", outcome.failed.len()).into())
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
