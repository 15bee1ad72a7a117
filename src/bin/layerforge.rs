use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng as _;
use rand_pcg::Pcg64;
use tracing_subscriber::EnvFilter;

use layerforge::{
    BatchReport, Blueprint, ForgeConfig, GenerateOpts, OutputLayout, RenderOpts, TraitTable,
    count_reachable, load_config, render_collection, upper_bound,
};

#[derive(Parser, Debug)]
#[command(name = "layerforge", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a collection, write its trait table and render the images.
    Generate(GenerateArgs),
    /// Re-render the images of a previously written trait table.
    Render(RenderArgs),
    /// Validate a configuration and summarize its combination space.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Configuration file (YAML, or JSON by extension).
    #[arg(long)]
    config: PathBuf,

    /// Number of distinct trait sets; overrides `collection.count`.
    #[arg(long)]
    count: Option<usize>,

    /// RNG seed; overrides `collection.seed`.
    #[arg(long)]
    seed: Option<u64>,

    /// Output root; the collection is written to `<out>/<name>/`.
    #[arg(long, default_value = "output")]
    out: PathBuf,

    #[command(flatten)]
    workers: WorkerArgs,

    /// Only write the trait table.
    #[arg(long)]
    skip_render: bool,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Configuration file (YAML, or JSON by extension).
    #[arg(long)]
    config: PathBuf,

    /// Trait table to render; defaults to `<out>/<name>/metadata/metadata.json`.
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Output root; the collection is written to `<out>/<name>/`.
    #[arg(long, default_value = "output")]
    out: PathBuf,

    #[command(flatten)]
    workers: WorkerArgs,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Configuration file (YAML, or JSON by extension).
    #[arg(long)]
    config: PathBuf,
}

#[derive(Args, Debug)]
struct WorkerArgs {
    /// Render worker threads (default: one per core).
    #[arg(long)]
    threads: Option<usize>,

    /// Stop starting renders after the first failure.
    #[arg(long)]
    fail_fast: bool,
}

impl WorkerArgs {
    fn render_opts(&self) -> RenderOpts {
        RenderOpts {
            threads: self.threads,
            fail_fast: self.fail_fast,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args),
        Command::Render(args) => cmd_render(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn read_config(path: &Path) -> anyhow::Result<(ForgeConfig, PathBuf)> {
    let cfg = load_config(path).with_context(|| format!("load config '{}'", path.display()))?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((cfg, base_dir))
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let (mut cfg, base_dir) = read_config(&args.config)?;
    if args.count.is_some() {
        cfg.collection.count = args.count;
    }
    if args.seed.is_some() {
        cfg.collection.seed = args.seed;
    }
    let bp = Blueprint::from_config(&cfg, &base_dir)?;

    let seed = bp.seed.unwrap_or_else(rand::random::<u64>);
    tracing::info!(seed, count = bp.count, "generating collection");
    let mut rng = Pcg64::seed_from_u64(seed);

    let generated = bp
        .engine()?
        .generate(&GenerateOpts::new(bp.count), &mut rng)?;

    let layout = OutputLayout::new(&args.out, &bp.name);
    let manifest = layout.manifest_path();
    TraitTable::from_collection(&generated.collection, bp.filetype).write(&manifest)?;
    println!(
        "generated {} trait sets (seed {seed}, {} attempts); trait table: {}",
        generated.collection.len(),
        generated.stats.attempts,
        manifest.display()
    );

    if args.skip_render {
        return Ok(());
    }
    let report = render_collection(
        &generated.collection,
        &bp.catalog,
        &layout,
        bp.filetype,
        &args.workers.render_opts(),
    )?;
    finish(&report, &layout)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let (mut cfg, base_dir) = read_config(&args.config)?;
    let layout = OutputLayout::new(&args.out, cfg.collection.name.trim());
    let manifest = args.manifest.unwrap_or_else(|| layout.manifest_path());
    let table = TraitTable::read(&manifest)?;

    // The count only matters for generation.
    cfg.collection.count.get_or_insert(table.rows.len().max(1));
    let bp = Blueprint::from_config(&cfg, &base_dir)?;
    let collection = table.to_collection(&bp)?;
    tracing::info!(
        count = collection.len(),
        manifest = %manifest.display(),
        "rendering from trait table"
    );

    let report = render_collection(
        &collection,
        &bp.catalog,
        &layout,
        bp.filetype,
        &args.workers.render_opts(),
    )?;
    finish(&report, &layout)
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let (cfg, base_dir) = read_config(&args.config)?;
    let bp = Blueprint::from_config(&cfg, &base_dir)?;
    let engine = bp.engine()?;

    println!("collection '{}': {} requested", bp.name, bp.count);
    println!("  assets: {}", bp.catalog.root().display());
    for layer in &bp.layers {
        let assets = bp.catalog.layer(&layer.name)?.len();
        let selectable = layer.selectable().count();
        println!(
            "  {:>2}. {} ({}): {assets} assets, {selectable} selectable values",
            layer.declared_index,
            layer.name,
            if layer.required { "required" } else { "optional" },
        );
    }
    println!("  rules: {}", bp.rules.rules().len());

    let bound = upper_bound(&engine);
    let limit = GenerateOpts::default().enumeration_limit;
    let reachable = (bound <= limit)
        .then(|| count_reachable(&engine, limit))
        .flatten();
    match reachable {
        Some(reachable) => {
            println!("  reachable combinations: {reachable} (upper bound {bound})");
            if (bp.count as u64) > reachable {
                anyhow::bail!(
                    "requested {} trait sets but only {reachable} combinations are reachable",
                    bp.count
                );
            }
        }
        None => println!("  combination upper bound: {bound} (too large to enumerate)"),
    }
    Ok(())
}

fn finish(report: &BatchReport, layout: &OutputLayout) -> anyhow::Result<()> {
    println!(
        "rendered {} of {} images into {}",
        report.rendered,
        report.total(),
        layout.images_dir().display()
    );
    if report.is_success() {
        return Ok(());
    }
    for failure in &report.failed {
        eprintln!("  #{}: {}", failure.index, failure.reason);
    }
    if report.skipped > 0 {
        eprintln!("  {} images skipped after the first failure", report.skipped);
    }
    anyhow::bail!(
        "{} of {} images failed to render",
        report.failed.len(),
        report.total()
    )
}
