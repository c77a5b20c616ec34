//! Chadwick - command-line front end
//!
//! Lists the event fields of a libchadwick build, the games in an event file,
//! and streams event records as JSON lines or CSV.

use anyhow::{bail, Context, Result};
use chadwick::config::CONFIG_FILE;
use chadwick::{Chadwick, ChadwickConfig, EventFrame, EventRecord};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "chadwick")]
#[command(version)]
#[command(about = "Read Retrosheet event files through libchadwick", long_about = None)]
struct Cli {
    /// Path to libchadwick (overrides chadwick.toml and CHADWICK_LIB)
    #[arg(long, global = true, value_name = "PATH")]
    lib: Option<PathBuf>,

    /// Config file (default: nearest chadwick.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the configuration in effect
    Config {
        /// Print only the path of the config file
        #[arg(long)]
        path: bool,

        /// Print the configuration as TOML (default)
        #[arg(long)]
        show: bool,
    },

    /// Stream the events of every game in an event file
    Events {
        /// Event file (.EVA, .EVN)
        file: PathBuf,

        /// Comma-separated headers to enable (default: config, else all)
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Convert columns to their declared types
        #[arg(long)]
        typed: bool,
    },

    /// List the fields libchadwick can write
    Fields {
        /// Only enabled fields
        #[arg(long)]
        active: bool,
    },

    /// List the games in an event file
    Games {
        /// Event file (.EVA, .EVN)
        file: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    chadwick::logging::init(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Config { path, show } => cmd_config(&config, cli.config.as_deref(), path, show),
        Commands::Events {
            file,
            fields,
            format,
            typed,
        } => cmd_events(&config, cli.lib.as_deref(), &file, &fields, format, typed),
        Commands::Fields { active } => cmd_fields(&config, cli.lib.as_deref(), active),
        Commands::Games { file } => cmd_games(&config, cli.lib.as_deref(), &file),
    }
}

fn load_config(path: Option<&Path>) -> Result<ChadwickConfig> {
    match path {
        Some(path) => ChadwickConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => ChadwickConfig::load_from_cwd().context("Failed to load chadwick.toml"),
    }
}

fn open_library(config: &ChadwickConfig, lib: Option<&Path>) -> Result<Chadwick> {
    let cw = match lib {
        Some(lib) => {
            let path = config.resolve(&lib.to_string_lossy());
            let cw = Chadwick::new(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            if !config.fields.enabled.is_empty() {
                cw.set_fields(&config.fields.enabled);
            }
            cw
        }
        None => Chadwick::from_config(config).with_context(|| {
            format!(
                "Failed to load {} (set --lib, {} or [library] path in {})",
                config.library_name(),
                chadwick::config::LIBRARY_ENV,
                CONFIG_FILE
            )
        })?,
    };
    tracing::debug!(library = %cw.library_path().display(), "library ready");
    Ok(cw)
}

fn cmd_config(
    config: &ChadwickConfig,
    explicit: Option<&Path>,
    path: bool,
    show: bool,
) -> Result<()> {
    if path {
        let found = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => ChadwickConfig::find(&std::env::current_dir()?),
        };
        match found {
            Some(p) => println!("{}", p.display()),
            None => println!("(no {} found)", CONFIG_FILE),
        }
        if !show {
            return Ok(());
        }
    }

    print!("{}", toml::to_string_pretty(config)?);
    println!("# library resolves to {}", config.resolve_library().display());
    Ok(())
}

fn cmd_fields(config: &ChadwickConfig, lib: Option<&Path>, active: bool) -> Result<()> {
    let cw = open_library(config, lib)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for field in cw.field_descriptors() {
        if active && !field.enabled {
            continue;
        }
        writeln!(
            out,
            "{:<9}{:>3}  {:<22}{}  {}",
            field.kind,
            field.index,
            field.header,
            if field.enabled { "on " } else { "off" },
            field.description
        )?;
    }
    out.flush()?;
    Ok(())
}

fn cmd_games(config: &ChadwickConfig, lib: Option<&Path>, file: &Path) -> Result<()> {
    let cw = open_library(config, lib)?;
    let games = cw
        .games(file)
        .with_context(|| format!("Failed to open {}", file.display()))?;

    for game in games {
        let visitor = game.info("visteam")?.unwrap_or_default();
        let home = game.info("hometeam")?.unwrap_or_default();
        let date = game.info("date")?.unwrap_or_default();
        println!("{}\t{}\t{}\t{}", game.id(), date, visitor, home);
    }
    Ok(())
}

fn cmd_events(
    config: &ChadwickConfig,
    lib: Option<&Path>,
    file: &Path,
    fields: &[String],
    format: OutputFormat,
    typed: bool,
) -> Result<()> {
    let cw = open_library(config, lib)?;
    if !fields.is_empty() {
        let unknown = cw.set_fields(fields);
        if !unknown.is_empty() {
            bail!("Unknown field(s): {}", unknown.join(", "));
        }
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if typed {
        let records = cw
            .events(file)
            .with_context(|| format!("Failed to open {}", file.display()))?
            .collect::<Result<Vec<EventRecord>, _>>()?;
        let mut frame = EventFrame::from_records(&records);
        frame.convert_types(&config.type_mapping())?;

        match format {
            OutputFormat::Csv => frame.write_csv(&mut out)?,
            OutputFormat::Json => {
                for row in frame.rows() {
                    serde_json::to_writer(&mut out, &row)?;
                    writeln!(out)?;
                }
            }
        }
    } else {
        if format == OutputFormat::Csv {
            writeln!(out, "{}", cw.active_headers().join(","))?;
        }
        let mut count = 0usize;
        for event in cw
            .events(file)
            .with_context(|| format!("Failed to open {}", file.display()))?
        {
            let event = event?;
            match format {
                OutputFormat::Csv => {
                    writeln!(out, "{}", event.values().collect::<Vec<_>>().join(","))?
                }
                OutputFormat::Json => {
                    serde_json::to_writer(&mut out, &event)?;
                    writeln!(out)?;
                }
            }
            count += 1;
        }
        tracing::debug!(events = count, "done");
    }

    out.flush()?;
    Ok(())
}
