use anyhow::{bail, Context, Result};
use bp2bst::{
    config::{find_config_from, load_config, FileConfig},
    convert_source,
    json::{errors_to_json, modules_to_json, JsonStyle},
    parse, resolve_source, ConvertOptions, Error, FileConversion, Registry,
};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// bp2bst - convert Android.bp modules to BuildStream elements
#[derive(Parser)]
#[command(name = "bp2bst")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert Blueprint files to .bst elements
    Convert {
        /// Blueprint files to convert
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory the element files are written to (default: current directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Subdirectory of the output directory for the generated elements
        #[arg(long)]
        prefix: Option<String>,

        /// Source tree path recorded as a local_external source
        #[arg(long)]
        source_dir: Option<String>,

        /// Print the elements instead of writing them
        #[arg(long)]
        dry_run: bool,

        /// Path to bp2bst.toml (default: searched upwards from the current directory)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the parsed syntax tree
    Parse { file: PathBuf },

    /// Summarize the modules declared in a file
    Info { file: PathBuf },

    /// Print modules after evaluation and defaults resolution, as JSON.
    /// On failure the error is printed to stdout as a JSON array instead.
    Eval { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            files,
            output_dir,
            prefix,
            source_dir,
            dry_run,
            config,
        } => cmd_convert(&files, output_dir, prefix, source_dir, dry_run, config),
        Commands::Parse { file } => cmd_parse(&file),
        Commands::Info { file } => cmd_info(&file),
        Commands::Eval { file } => cmd_eval(&file),
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_file_config(explicit: Option<PathBuf>) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => Some(path),
        None => find_config_from(&std::env::current_dir()?),
    };
    match path {
        Some(path) => {
            info!(config = %path.display(), "loading configuration");
            load_config(&path).with_context(|| format!("Failed to load {}", path.display()))
        }
        None => Ok(FileConfig::default()),
    }
}

fn cmd_convert(
    files: &[PathBuf],
    output_dir: Option<PathBuf>,
    prefix: Option<String>,
    source_dir: Option<String>,
    dry_run: bool,
    config: Option<PathBuf>,
) -> Result<()> {
    let file_config = load_file_config(config)?;
    let mut options: ConvertOptions = file_config.to_options()?;
    options.output_prefix = prefix;
    options.source_dir = source_dir;
    let output_dir = output_dir
        .or(file_config.output_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    let registry = Registry::default();

    // Files are independent: convert in parallel, write serially.
    let results: Vec<(&PathBuf, Result<(String, std::result::Result<FileConversion, Error>)>)> =
        files
            .par_iter()
            .map(|path| {
                let converted = read_source(path).map(|text| {
                    let result = convert_source(&text, &options, &registry);
                    (text, result)
                });
                (path, converted)
            })
            .collect();

    let mut failed = 0usize;
    let mut written = 0usize;
    for (path, result) in results {
        let (text, conversion) = match result {
            Ok(pair) => pair,
            Err(err) => {
                eprintln!("{:#}", err);
                failed += 1;
                continue;
            }
        };
        let conversion = match conversion {
            Ok(conversion) => conversion,
            Err(err) => {
                report_error(path, &text, &err);
                failed += 1;
                continue;
            }
        };

        for diagnostic in &conversion.diagnostics {
            match diagnostic.kind {
                bp2bst::DiagnosticKind::UnknownType => {
                    warn!(file = %path.display(), "{}", diagnostic)
                }
                bp2bst::DiagnosticKind::Skipped => {
                    info!(file = %path.display(), "{}", diagnostic)
                }
            }
        }

        for element in &conversion.descriptors {
            let rendered = element
                .to_bst()
                .with_context(|| format!("Failed to render element {}", element.name))?;
            let relative = element.file_name(options.output_prefix.as_deref());
            if dry_run {
                println!("# {}", relative);
                println!("{}", rendered);
            } else {
                let target = output_dir.join(&relative);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                fs::write(&target, rendered)
                    .with_context(|| format!("Failed to write {}", target.display()))?;
                info!(element = %target.display(), "wrote element");
            }
            written += 1;
        }
    }

    eprintln!(
        "{} element(s) generated from {} file(s), {} failed",
        written,
        files.len() - failed,
        failed
    );
    if failed > 0 || written == 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_parse(path: &Path) -> Result<()> {
    let text = read_source(path)?;
    match parse(&text) {
        Ok(file) => {
            for def in &file.defs {
                println!("{:#?}", def);
            }
            Ok(())
        }
        Err(err) => fail(path, &text, &err),
    }
}

fn cmd_info(path: &Path) -> Result<()> {
    let text = read_source(path)?;
    let file = match parse(&text) {
        Ok(file) => file,
        Err(err) => return fail(path, &text, &err),
    };
    println!("{}:", path.display());
    println!("  variables: {}", file.assignments().count());
    for module in file.modules() {
        let keys: Vec<&str> = module.properties.iter().map(|p| p.name.as_str()).collect();
        println!(
            "  {} {} [{}]",
            module.module_type,
            module.display_name(),
            keys.join(", ")
        );
    }
    Ok(())
}

fn cmd_eval(path: &Path) -> Result<()> {
    let text = read_source(path)?;
    match resolve_source(&text) {
        Ok(modules) => {
            println!("{}", modules_to_json(&modules, JsonStyle::Pretty));
            Ok(())
        }
        Err(err) => {
            println!("{}", errors_to_json(std::slice::from_ref(&err)));
            fail(path, &text, &err)
        }
    }
}

fn fail(path: &Path, text: &str, err: &Error) -> Result<()> {
    report_error(path, text, err);
    bail!("{} failed with {}", path.display(), err.code())
}

/// Print an error with the offending source line and a caret underline.
fn report_error(path: &Path, text: &str, err: &Error) {
    let Some((begin, end)) = err.span() else {
        eprintln!("ERROR IN {}:", path.display());
        eprintln!("{}", err);
        eprintln!();
        return;
    };

    let lines: Vec<&str> = text.lines().collect();
    let line_text = lines.get(begin.line).copied().unwrap_or("");

    eprintln!("ERROR IN {} AT LINE {}:", path.display(), begin.line + 1);
    eprintln!("{}", line_text);

    let start_col = begin.column;
    let end_col = if begin.line == end.line && end.column > begin.column {
        end.column
    } else if start_col < line_text.len() {
        // Point error or spans multiple lines: underline to end of line
        line_text.len()
    } else {
        start_col + 1
    };

    let mut underline = " ".repeat(start_col);
    underline.push('^');
    if end_col > start_col + 1 {
        underline.push_str(&"_".repeat(end_col - start_col - 1));
    }

    eprintln!("{}", underline);
    eprintln!("{}", err);
    eprintln!();
}
