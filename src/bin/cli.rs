use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use gatekeeper::config::{Config, CONFIG_FILE_NAME};
use gatekeeper::error::GatekeeperError;
use gatekeeper::output::OutputFormat;
use gatekeeper::rules::Severity;
use gatekeeper::ScanOptions;

#[derive(Parser)]
#[command(
    name = "gatekeeper",
    about = "Static policy checks for Terraform/OpenTofu code",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Rule sources and policy flags shared by `scan` and `list-rules`.
#[derive(clap::Args)]
struct RuleArgs {
    /// Config file path (defaults to .gatekeeper.toml in the scanned directory)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Custom rule file (.yaml, .yml or .hcl)
    #[arg(long, short = 'r')]
    rules: Option<PathBuf>,

    /// Additional rule files, applied after --rules
    #[arg(long = "extra-rules")]
    extra_rules: Vec<PathBuf>,

    /// Skip the built-in rules
    #[arg(long)]
    no_builtin: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a Terraform directory or file against the rules
    Scan {
        /// Directory or .tf file to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        rules: RuleArgs,

        /// Variable values file (tfvars syntax)
        #[arg(long = "var-file")]
        var_file: Option<PathBuf>,

        /// Report checks on unresolved values as violations
        #[arg(long, env = "GATEKEEPER_STRICT")]
        strict: bool,

        /// Least severe level to report (error, warning, info)
        #[arg(long)]
        min_severity: Option<String>,

        /// Descend into subdirectories
        #[arg(long, short = 'R')]
        recursive: bool,

        /// Output format (console, json)
        #[arg(long, short = 'f')]
        format: Option<String>,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List the rules a scan would load
    ListRules {
        #[command(flatten)]
        rules: RuleArgs,

        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,
    },

    /// Generate a starter .gatekeeper.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("GATEKEEPER_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Scan {
            path,
            rules,
            var_file,
            strict,
            min_severity,
            recursive,
            format,
            output,
        } => {
            let options = ScanOptions {
                values_file: var_file,
                recursive,
                strict: strict.then_some(true),
                min_severity: min_severity.as_deref().and_then(parse_severity),
                ..scan_options(rules)
            };
            cmd_scan(path, options, format, output)
        }
        Commands::ListRules { rules, format } => cmd_list_rules(scan_options(rules), format),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn scan_options(args: RuleArgs) -> ScanOptions {
    ScanOptions {
        config_path: args.config,
        custom_rules: args.rules,
        extra_rule_files: args.extra_rules,
        disable_builtin: args.no_builtin,
        ..ScanOptions::default()
    }
}

fn parse_severity(s: &str) -> Option<Severity> {
    let severity = Severity::from_str_lenient(s);
    if severity.is_none() {
        eprintln!("Warning: unknown severity '{}', using config default", s);
    }
    severity
}

fn cmd_scan(
    path: PathBuf,
    options: ScanOptions,
    format_str: Option<String>,
    output_path: Option<PathBuf>,
) -> Result<i32, GatekeeperError> {
    let explicit = format_str.and_then(|s| {
        let format = OutputFormat::from_str_lenient(&s);
        if format.is_none() {
            eprintln!("Warning: unknown format '{}', using config default", s);
        }
        format
    });
    let format = gatekeeper::resolve_format(&path, &options, explicit)?;

    let result = gatekeeper::scan(&path, &options)?;
    let rendered = gatekeeper::output::render(&result, format)?;

    match output_path {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    // Exit code: 0 = clean, 1 = violations
    Ok(if result.has_violations() { 1 } else { 0 })
}

fn cmd_list_rules(options: ScanOptions, format_str: String) -> Result<i32, GatekeeperError> {
    let rules = gatekeeper::list_rules(&options)?;

    match format_str.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&rules)?;
            println!("{}", json);
        }
        _ => {
            println!(
                "{:<10} {:<34} {:<9} {:<22} TAGS",
                "ID", "NAME", "SEVERITY", "RESOURCE"
            );
            println!("{}", "-".repeat(90));
            for rule in &rules {
                println!(
                    "{:<10} {:<34} {:<9} {:<22} {}",
                    rule.id,
                    rule.name,
                    rule.severity.to_string(),
                    rule.resource_kind,
                    rule.tags.join(","),
                );
            }
        }
    }

    Ok(0)
}

fn cmd_init(force: bool) -> Result<i32, GatekeeperError> {
    let path = PathBuf::from(CONFIG_FILE_NAME);

    if path.exists() && !force {
        eprintln!("{CONFIG_FILE_NAME} already exists. Use --force to overwrite.");
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created {CONFIG_FILE_NAME}");

    Ok(0)
}
