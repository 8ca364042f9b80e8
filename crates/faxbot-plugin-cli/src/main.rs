use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use faxbot_plugin_core::{
    validate_manifest, ComplianceScanner, PackageValidator, SchemaValidator, ValidationReport,
    ValidatorConfig,
};
use faxbot_plugin_sdk::PluginManifest;
use regex::Regex;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_CONFIG: &str = include_str!("../../../config/validator.toml");

#[derive(Parser, Debug)]
#[command(
    name = "faxbot-plugin",
    author,
    version = faxbot_plugin_core::version(),
    about = "Validate fax-gateway plugin packages"
)]
struct Cli {
    /// Sets the log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a plugin package directory (manifest, config schema, sources).
    Validate {
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,
        /// Validator configuration file (TOML).
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Check a single manifest.json.
    Manifest {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Check a standalone JSON-Schema file used as plugin config schema.
    Schema {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Run the HIPAA compliance scanner over source files.
    Scan {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Interact with validator configuration files.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Validates the provided configuration file.
    Validate {
        #[arg(value_name = "FILE")]
        config: PathBuf,
    },
    /// Prints the bundled default configuration.
    Example,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;
    match cli.command {
        Commands::Validate { dir, config, json } => handle_validate(&dir, config.as_deref(), json),
        Commands::Manifest { file } => handle_manifest(&file),
        Commands::Schema { file } => handle_schema(&file),
        Commands::Scan { files } => handle_scan(&files),
        Commands::Config { command } => handle_config(command),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    Ok(())
}

fn handle_validate(dir: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = match config_path {
        Some(path) => load_config(path)?,
        None => ValidatorConfig::default(),
    };
    config.validate()?;
    let report = PackageValidator::new(&config).validate(dir);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(dir, &report);
    }
    if !report.valid {
        bail!(
            "plugin package {} is invalid ({} error(s))",
            dir.display(),
            report.errors.len()
        );
    }
    Ok(())
}

fn print_report(dir: &Path, report: &ValidationReport) {
    let verdict = if report.valid { "valid" } else { "INVALID" };
    println!("{}: {verdict}", dir.display());
    for error in &report.errors {
        println!("  error: {error}");
    }
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
    println!(
        "  scanned {} source file(s), skipped {}",
        report.scanned_files, report.skipped_files
    );
}

fn handle_manifest(path: &Path) -> Result<()> {
    let value = read_json(path)?;
    let errors = validate_manifest(&value);
    print_findings(path, &errors, "error");
    if !errors.is_empty() {
        bail!("manifest {} has {} error(s)", path.display(), errors.len());
    }
    if let Ok(manifest) = serde_json::from_value::<PluginManifest>(value) {
        if manifest.semver().is_none() {
            tracing::warn!(
                version = %manifest.version,
                "version is accepted but is not strict semver"
            );
        }
        println!("manifest OK: {} v{}", manifest.id, manifest.version);
    }
    Ok(())
}

fn handle_schema(path: &Path) -> Result<()> {
    let schema = read_json(path)?;
    let errors = SchemaValidator::default().validate(&schema);
    print_findings(path, &errors, "error");
    if !errors.is_empty() {
        bail!("config schema {} has {} error(s)", path.display(), errors.len());
    }
    println!("config schema OK: {}", path.display());
    Ok(())
}

fn handle_scan(files: &[PathBuf]) -> Result<()> {
    let scanner = ComplianceScanner::builtin();
    let mut total = 0;
    for file in files {
        let bytes =
            fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
        let warnings = scanner.scan(&String::from_utf8_lossy(&bytes));
        total += warnings.len();
        print_findings(file, &warnings, "warning");
    }
    println!("{total} compliance warning(s) in {} file(s)", files.len());
    Ok(())
}

fn handle_config(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Validate { config } => {
            let cfg = load_config(&config)?;
            cfg.validate()?;
            println!("configuration OK: {}", config.display());
        }
        ConfigCommands::Example => {
            println!("{DEFAULT_CONFIG}");
        }
    }
    Ok(())
}

fn print_findings(path: &Path, findings: &[String], kind: &str) {
    for finding in findings {
        println!("{}: {kind}: {finding}", path.display());
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn load_config(path: &Path) -> Result<ValidatorConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let expanded = interpolate_env(&raw);
    let cfg = toml::from_str::<ValidatorConfig>(&expanded)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(cfg)
}

/// Expands `${NAME}` and `${NAME:default}` from the process environment.
fn interpolate_env(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let regex = RE.get_or_init(|| Regex::new(r"\$\{([A-Z0-9_]+)(?::([^}]+))?\}").unwrap());
    let result = regex.replace_all(input, |caps: &regex::Captures| {
        let key = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(key).unwrap_or_else(|_| default.to_string())
    });
    result.into_owned()
}
