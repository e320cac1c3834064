use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use trendify::Result;
use trendify::aggregate::sort_products;
use trendify::config::{EmptyPolicy, Endpoint, FailurePolicy, InvokeOptions, OutputLayout, Workers};
use trendify::generate::{make_products, resolve};
use trendify::render::include::IncludeOptions;
use trendify::render::svg::FigureConfig;
use trendify::render::{StaticOptions, make_interactive, make_tables_and_figures};
use trendify::sample::make_sample_data;
use trendify::store::discover_dirs;

#[derive(Parser)]
#[command(name = "trendify")]
#[command(about = "Generate, sort and render tagged data products", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args)]
struct WorkerArgs {
    /// Parallel workers (capped at 5x the available cores).
    #[arg(short = 'n', long = "n-procs", default_value_t = 1)]
    n_procs: usize,
}

impl WorkerArgs {
    fn workers(&self) -> Workers {
        Workers::new(self.n_procs)
    }
}

#[derive(Args)]
struct GenerateArgs {
    /// Generator specifier: `path/to/script.py[:name]` or `dotted.module:name`.
    #[arg(short = 'g', long)]
    generator: String,

    /// Input directory globs (a matched file stands for its directory).
    #[arg(short = 'i', long = "input", required = true, num_args = 1..)]
    inputs: Vec<String>,

    #[arg(long, value_enum, default_value_t = FailurePolicy::Abort)]
    on_failure: FailurePolicy,

    #[arg(long, value_enum, default_value_t = EmptyPolicy::Error)]
    on_empty: EmptyPolicy,
}

#[derive(Args)]
struct StaticArgs {
    #[arg(long)]
    no_tables: bool,

    #[arg(long)]
    no_xy_plots: bool,

    #[arg(long)]
    no_histograms: bool,

    #[arg(long, default_value_t = FigureConfig::default().width)]
    width: u32,

    #[arg(long, default_value_t = FigureConfig::default().height)]
    height: u32,

    #[arg(long, default_value_t = FigureConfig::default().bins)]
    bins: usize,

    /// Skip the nested include.md files.
    #[arg(long)]
    no_includes: bool,

    /// Markdown heading depth of the static root in include.md files.
    #[arg(long)]
    heading_level: Option<usize>,

    /// Prefix for figure links in include.md files.
    #[arg(long)]
    figure_prefix: Option<String>,
}

impl StaticArgs {
    fn options(&self) -> StaticOptions {
        StaticOptions {
            tables: !self.no_tables,
            xy_plots: !self.no_xy_plots,
            histograms: !self.no_histograms,
            figure: FigureConfig {
                width: self.width,
                height: self.height,
                bins: self.bins,
            },
            includes: (!self.no_includes).then(|| IncludeOptions {
                heading_level: self.heading_level,
                figure_prefix: self.figure_prefix.clone(),
            }),
        }
    }
}

#[derive(Args)]
struct EndpointArgs {
    #[arg(long, default_value = "http")]
    protocol: String,

    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(long, default_value_t = 8000)]
    port: u16,
}

impl EndpointArgs {
    fn endpoint(&self) -> Endpoint {
        Endpoint {
            protocol: self.protocol.clone(),
            host: self.host.clone(),
            port: self.port,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a generator over input directories and write each one's data_products.json.
    ProductsMake {
        #[command(flatten)]
        generate: GenerateArgs,
        #[command(flatten)]
        workers: WorkerArgs,
    },

    /// Sort per-directory products by tag into <out>/products.
    ProductsSort {
        #[arg(short = 'i', long = "input", required = true, num_args = 1..)]
        inputs: Vec<String>,
        #[arg(short = 'o', long)]
        out: PathBuf,
        #[command(flatten)]
        workers: WorkerArgs,
    },

    /// Write tables and figures for every tag under <out>/products.
    AssetsMakeStatic {
        out: PathBuf,
        #[command(flatten)]
        workers: WorkerArgs,
        #[command(flatten)]
        assets: StaticArgs,
    },

    /// Write the dashboard definition and HTML viewer for <out>/products.
    AssetsMakeInteractive {
        out: PathBuf,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },

    /// Generate, sort and render in one go.
    MakeItTrendy {
        #[command(flatten)]
        generate: GenerateArgs,
        #[arg(short = 'o', long)]
        out: PathBuf,
        #[command(flatten)]
        workers: WorkerArgs,
        #[command(flatten)]
        assets: StaticArgs,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },

    /// Write sample batch-run directories under <workdir>/models.
    MakeSampleData {
        #[arg(short = 'w', long)]
        workdir: PathBuf,
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

fn products_make(generate: &GenerateArgs, workers: Workers) -> Result<()> {
    let generator = resolve(&generate.generator)?;
    let dirs = discover_dirs(&generate.inputs)?;
    let opts = InvokeOptions {
        workers,
        on_failure: generate.on_failure,
        on_empty: generate.on_empty,
    };
    let summary = make_products(generator.as_ref(), &dirs, &opts)?;
    println!(
        "Wrote {} records to {} directories",
        summary.records,
        summary.directories - summary.empty.len()
    );
    Ok(())
}

fn products_sort(inputs: &[String], layout: &OutputLayout, workers: Workers) -> Result<()> {
    let dirs = discover_dirs(inputs)?;
    let summary = sort_products(&dirs, &layout.products_dir(), workers)?;
    println!(
        "Wrote {} tag collections to {}",
        summary.collections.len(),
        layout.products_dir().display()
    );
    Ok(())
}

fn assets_static(layout: &OutputLayout, workers: Workers, opts: &StaticOptions) -> Result<()> {
    let files = make_tables_and_figures(
        &layout.products_dir(),
        &layout.static_assets_dir(),
        workers,
        opts,
    )?;
    println!("Wrote {} files to {}", files.len(), layout.static_assets_dir().display());
    Ok(())
}

fn assets_interactive(layout: &OutputLayout, endpoint: &Endpoint) -> Result<()> {
    let files = make_interactive(
        &layout.products_dir(),
        &layout.dashboard_dir(),
        &layout.index_path(),
        &layout.static_assets_dir(),
        endpoint,
    )?;
    println!("Wrote {} files to {}", files.len(), layout.interactive_assets_dir().display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ProductsMake { generate, workers } => {
            products_make(&generate, workers.workers())?;
        }
        Commands::ProductsSort { inputs, out, workers } => {
            products_sort(&inputs, &OutputLayout::new(out), workers.workers())?;
        }
        Commands::AssetsMakeStatic { out, workers, assets } => {
            assets_static(&OutputLayout::new(out), workers.workers(), &assets.options())?;
        }
        Commands::AssetsMakeInteractive { out, endpoint } => {
            assets_interactive(&OutputLayout::new(out), &endpoint.endpoint())?;
        }
        Commands::MakeItTrendy {
            generate,
            out,
            workers,
            assets,
            endpoint,
        } => {
            let layout = OutputLayout::new(out);
            let workers = workers.workers();
            products_make(&generate, workers)?;
            products_sort(&generate.inputs, &layout, workers)?;
            assets_static(&layout, workers, &assets.options())?;
            assets_interactive(&layout, &endpoint.endpoint())?;
        }
        Commands::MakeSampleData { workdir, count, seed } => {
            let dirs = make_sample_data(&workdir, count, seed)?;
            println!(
                "Wrote {} sample directories under {}",
                dirs.len(),
                workdir.join("models").display()
            );
        }
    }

    Ok(())
}
