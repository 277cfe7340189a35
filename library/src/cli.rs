//! Command-line front end over JSON scenes.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::{debug, info};

use crate::config::MigrationConfig;
use crate::convert::manager::ConversionManager;
use crate::convert::rule::SpecSheet;
use crate::convert::sheet_file::SheetDocument;
use crate::error::ShadeportError;
use crate::graph::cleanup::clean_up_with;
use crate::host::MemoryScene;
use crate::model::tree::NodeTree;
use crate::plugin::PluginManager;
use crate::tree::builder::TreeBuilder;

#[derive(Parser, Debug)]
#[command(name = "shadeport-cli")]
#[command(version, about = "Migrate shading networks between renderers")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Extra directory to load sheet plugins and documents from
    #[arg(short = 'P', long = "plugin-dir", global = true)]
    plugin_dirs: Vec<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert every node covered by a sheet and repoint its consumers
    Convert(ConvertArgs),
    /// Build a node tree description into a scene
    Build(BuildArgs),
    /// List available sheets
    Sheets,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Scene JSON file
    scene: PathBuf,

    /// Sheet document (.toml/.json) or plugin sheet id
    #[arg(short, long)]
    sheet: String,

    /// Where to write the converted scene (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip repointing consumers at the new nodes
    #[arg(long)]
    no_cleanup: bool,

    /// Fail if any node, attribute, hook or rewire failed
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Scene JSON file
    scene: PathBuf,

    /// Node tree JSON file
    tree: PathBuf,

    /// Where to write the resulting scene (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    strict: bool,
}

pub fn run(args: Vec<String>) -> Result<(), ShadeportError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help / --version
            print!("{}", e);
            return Ok(());
        }
        Err(e) => return Err(ShadeportError::InvalidArgument(e.to_string())),
    };
    init_logging(cli.verbose);

    let config = MigrationConfig::load_or_default(cli.config.as_deref())?;
    let plugins = PluginManager::new();
    for dir in config.plugins.directories.iter().chain(&cli.plugin_dirs) {
        let loaded = plugins.load_plugins_from_directory(dir)?;
        debug!("{} plugin(s) from {}", loaded, dir.display());
    }

    match cli.command {
        Commands::Convert(args) => convert_scene(&config, &plugins, args),
        Commands::Build(args) => build_tree(&config, args),
        Commands::Sheets => {
            for sheet in plugins.list_sheets() {
                let (major, minor, patch) = sheet.version;
                println!(
                    "{}\t{}.{}.{}\t{}\t{}",
                    sheet.id, major, minor, patch, sheet.impl_type, sheet.description
                );
            }
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init();
}

fn convert_scene(
    config: &MigrationConfig,
    plugins: &PluginManager,
    args: ConvertArgs,
) -> Result<(), ShadeportError> {
    let mut scene = MemoryScene::load(&std::fs::read_to_string(&args.scene)?)?;
    let sheet = resolve_sheet(config, plugins, &args.sheet, &mut scene)?;

    let report = ConversionManager::new(&sheet)
        .with_naming(config.naming.policy)
        .with_parallel_asset_jobs(config.conversion.parallel_asset_jobs)
        .auto_convert(&mut scene);

    let cleanup = if args.no_cleanup {
        None
    } else {
        Some(clean_up_with(
            &mut scene,
            &report.pairs(),
            &config.cleanup_options(),
        ))
    };

    write_scene(&scene, args.output.as_deref())?;

    eprintln!(
        "converted {} node(s), {} failed",
        report.converted(),
        report.failed()
    );
    for failure in report.mapping_failures() {
        eprintln!("  attribute: {}", failure);
    }
    for failure in report.hook_failures() {
        eprintln!("  hook: {}", failure);
    }
    let mut rewire_failures = 0;
    if let Some(cleanup) = &cleanup {
        eprintln!("rewired {} consumer edge(s)", cleanup.rewired.len());
        for failure in &cleanup.failures {
            eprintln!("  rewire: {}", failure);
        }
        rewire_failures = cleanup.failures.len();
    }

    if args.strict && (!report.is_clean() || rewire_failures > 0) {
        return Err(ShadeportError::Conversion(
            "conversion finished with failures".to_string(),
        ));
    }
    Ok(())
}

/// A path to a sheet document, or the id of a loaded sheet plugin. Plugin
/// node schemas the scene does not know yet are registered on it.
fn resolve_sheet(
    config: &MigrationConfig,
    plugins: &PluginManager,
    sheet: &str,
    scene: &mut MemoryScene,
) -> Result<SpecSheet, ShadeportError> {
    let ctx = config.sheet_context();
    let path = Path::new(sheet);
    if path.is_file() {
        info!("Using sheet document {}", path.display());
        return SheetDocument::load(path)?.compile(ctx.transcoder.as_ref());
    }

    let compiled = plugins.spec_sheet(sheet, &ctx)?;
    for schema in plugins.node_schemas(sheet) {
        if !scene.schemas.contains_key(&schema.type_name) {
            scene.register_type(schema);
        }
    }
    info!("Using sheet plugin '{}'", sheet);
    Ok(compiled)
}

fn build_tree(config: &MigrationConfig, args: BuildArgs) -> Result<(), ShadeportError> {
    let mut scene = MemoryScene::load(&std::fs::read_to_string(&args.scene)?)?;
    let tree: NodeTree = serde_json::from_str(&std::fs::read_to_string(&args.tree)?)?;

    let out = TreeBuilder::new(config.builder_options()).build(&mut scene, &tree)?;
    write_scene(&scene, args.output.as_deref())?;

    eprintln!(
        "built {} node(s) from {} root(s)",
        out.created.len(),
        out.roots.len()
    );
    for reference in &out.unresolved {
        eprintln!("  unresolved: {}", reference);
    }
    for failure in &out.failures {
        eprintln!("  failed: {}", failure);
    }

    if args.strict && !out.is_clean() {
        return Err(ShadeportError::Conversion(
            "build finished with failures".to_string(),
        ));
    }
    Ok(())
}

fn write_scene(scene: &MemoryScene, output: Option<&Path>) -> Result<(), ShadeportError> {
    let json = scene.save()?;
    match output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{}", json),
    }
    Ok(())
}
