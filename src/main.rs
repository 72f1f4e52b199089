use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use webp_batch::{OutputTarget, config, output, process};

#[derive(Parser)]
#[command(name = "webp-batch")]
#[command(about = "Convert images to WebP in parallel")]
#[command(long_about = "\
Convert images to WebP in parallel

Accepts any mix of files and folders. Folders are searched recursively for
.png, .jpg, .jpeg, .bmp and .tiff files (any case).

Existing files are never overwritten: if photo.webp already exists the
output becomes photo_1.webp, photo_2.webp, ... and the renames are listed
at the end.

With --keep-workflow, the `workflow` text chunk of each PNG is stored in
the output's EXIF ImageDescription as \"Workflow:<json>\" (LoraInfo nodes
removed). Non-PNG inputs fail in this mode.

Defaults are read from webp-batch.toml in the current directory when
present; run 'webp-batch gen-config' for a documented template.")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Image files or folders to convert
    paths: Vec<PathBuf>,

    /// Output directory (created if missing)
    #[arg(short, long, conflicts_with = "same_folder")]
    output: Option<PathBuf>,

    /// Save each output next to its source file
    #[arg(long)]
    same_folder: bool,

    /// WebP quality (1-100) [default: 87]
    #[arg(short, long)]
    quality: Option<u32>,

    /// Number of worker threads [default: all cores]
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Keep the PNG workflow in the EXIF comment (PNG input only)
    #[arg(long)]
    keep_workflow: bool,

    /// Config file [default: ./webp-batch.toml if present]
    #[arg(long)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print a stock webp-batch.toml with all options documented
    GenConfig,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "webp_batch=warn",
        1 => "webp_batch=debug",
        _ => "webp_batch=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::GenConfig) = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    init_tracing(cli.verbose);

    let settings = match &cli.config {
        Some(path) => config::load_config(path, true)?,
        None => config::load_config(std::path::Path::new(config::DEFAULT_CONFIG_FILE), false)?,
    };

    let same_folder = cli.same_folder || (cli.output.is_none() && settings.same_folder);
    let target = if same_folder {
        OutputTarget::SourceDirectory
    } else {
        OutputTarget::Directory(cli.output.or(settings.output_dir).unwrap_or_default())
    };

    let request = process::prepare_request(
        &cli.paths,
        target,
        cli.quality.unwrap_or(settings.quality),
        cli.keep_workflow || settings.keep_workflow,
        cli.threads.or(settings.threads),
    )?;

    println!(
        "==> Converting {} image(s) with {} thread(s)",
        request.inputs().len(),
        request.concurrency()
    );

    let batch = process::spawn_batch(request)?;
    for event in batch.events() {
        output::print_event(&event);
    }
    let result = batch.join()?;

    output::print_summary(&result);
    Ok(())
}
