//! Deploy Migrate CLI
//!
//! Entry point for the `deploy-migrate` command-line tool.

use clap::{Parser, Subcommand};
use deploy_migrate::redact::DEFAULT_REDACTOR_TIMEOUT;
use deploy_migrate::rules::DEFAULT_RULES_FILE;
use deploy_migrate::{
    check_files, ExternalRedactor, MigrationOptions, MigrationReport, MigrationRules, Migrator,
    ValidationReport,
};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deploy-migrate")]
#[command(about = "Carry customized deployment.toml values onto a newer template", version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate customizations from an old descriptor onto a new template
    Migrate {
        /// Customized descriptor from the old version
        source: PathBuf,

        /// Template descriptor from the new version
        target: PathBuf,

        /// Output file (default: <target stem>.migrated.toml)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Migration rules file (JSON, or TOML by extension)
        #[arg(long, short = 'c', default_value = DEFAULT_RULES_FILE)]
        config: PathBuf,

        /// Do not back up the target when overwriting it in place
        #[arg(long)]
        no_backup: bool,

        /// Report customizations without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Validate the migrated file afterwards
        #[arg(long)]
        validate: bool,

        /// Output the report in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Check TOML files for sensitive data with an external redactor
    CheckSensitive {
        /// Redactor program
        #[arg(long)]
        redactor: PathBuf,

        /// Extra argument passed to the redactor before the file (repeatable)
        #[arg(long = "redactor-arg", allow_hyphen_values = true)]
        redactor_arg: Vec<String>,

        /// Seconds allowed per file
        #[arg(long, default_value_t = DEFAULT_REDACTOR_TIMEOUT.as_secs())]
        timeout_secs: u64,

        /// Files to check; non-TOML files are skipped
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Migrate {
            source,
            target,
            output,
            config,
            no_backup,
            dry_run,
            validate,
            json,
        } => {
            let options = MigrationOptions {
                create_backup: !no_backup,
                dry_run,
            };
            run_migrate(&source, &target, output, &config, options, validate, json);
        }
        Commands::CheckSensitive {
            redactor,
            redactor_arg,
            timeout_secs,
            files,
        } => {
            run_check_sensitive(redactor, redactor_arg, timeout_secs, &files);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn run_migrate(
    source: &Path,
    target: &Path,
    output: Option<PathBuf>,
    config: &Path,
    options: MigrationOptions,
    validate: bool,
    json: bool,
) {
    for (label, path) in [("Source", source), ("Target", target)] {
        if !path.exists() {
            eprintln!("{} file not found: {}", label, path.display());
            process::exit(1);
        }
    }

    let rules = MigrationRules::load_or_default(config);
    let mut migrator = Migrator::new(source, target, rules);
    if let Some(output) = output {
        migrator = migrator.with_output(output);
    }

    eprintln!("Source: {}", source.display());
    eprintln!("Target: {}", target.display());
    eprintln!("Output: {}", migrator.output().display());

    let report = match migrator.migrate(&options) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Migration failed: {}", e);
            process::exit(1);
        }
    };

    let validation = if validate && !options.dry_run {
        match migrator.validate() {
            Ok(validation) => Some(validation),
            Err(e) => {
                eprintln!("Validation failed: {}", e);
                process::exit(1);
            }
        }
    } else {
        None
    };

    if json {
        let mut value = match serde_json::to_value(&report) {
            Ok(value) => value,
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        };
        if let (Some(validation), Some(obj)) = (&validation, value.as_object_mut()) {
            obj.insert(
                "validation".to_string(),
                serde_json::to_value(validation).unwrap_or_default(),
            );
        }
        match serde_json::to_string_pretty(&value) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_report(&report);
        if let Some(ref validation) = validation {
            print_validation(validation);
        }
    }

    if validation.map(|v| !v.is_valid()).unwrap_or(false) {
        process::exit(1);
    }
}

fn print_report(report: &MigrationReport) {
    if report.dry_run {
        if report.customizations.is_empty() {
            println!("No customizations found.");
            return;
        }
        println!("Customizations found ({} sections):\n", report.customizations.len());
        for (section, custom) in &report.customizations {
            println!("  [{}]", section);
            for (key, value) in &custom.regular_props {
                println!("    {} = {}", key, value);
            }
            for quoted in &custom.quoted_props {
                println!("    {}", quoted.line);
            }
        }
        println!("\nDry run: nothing written.");
        return;
    }

    if let Some(ref backup) = report.backup {
        println!("Backup: {}", backup.display());
    }
    if report.changes.is_empty() {
        println!("No changes applied.");
    } else {
        println!("Changes applied ({} total):\n", report.changes.len());
        for change in &report.changes {
            println!("  {}", change);
        }
    }
    println!("\nMigrated file written to {}", report.output.display());
}

fn print_validation(validation: &ValidationReport) {
    if validation.is_valid() {
        println!("Validation passed.");
    } else {
        println!(
            "Validation failed: missing sections {}",
            validation.missing_sections.join(", ")
        );
    }
    if let Some(ref analytics) = validation.analytics {
        println!("  Analytics enable: {}", analytics.enable.as_deref().unwrap_or("-"));
        println!("  Analytics type: {}", analytics.kind.as_deref().unwrap_or("-"));
        if let Some(count) = analytics.property_count {
            println!("  Analytics properties: {}", count);
        }
        println!("  Moesif key present: {}", analytics.has_moesif_key);
    }
    for warning in &validation.warnings {
        println!("  Warning: {}", warning);
    }
}

fn run_check_sensitive(program: PathBuf, args: Vec<String>, timeout_secs: u64, files: &[PathBuf]) {
    let redactor = ExternalRedactor::new(program)
        .with_args(args)
        .with_timeout(Duration::from_secs(timeout_secs));

    let report = check_files(&redactor, files);

    for path in &report.clean {
        println!("  clean: {}", path.display());
    }
    for flagged in &report.flagged {
        println!(
            "  SENSITIVE: {} ({} fields)",
            flagged.path.display(),
            flagged.sensitive_fields
        );
    }
    for failure in &report.failures {
        println!("  error: {}: {}", failure.path.display(), failure.message);
    }

    if report.passed() {
        println!("Checked {} file(s): no sensitive data found.", report.checked());
    } else {
        eprintln!("Sensitive data check failed. Redact the flagged files before committing.");
        process::exit(1);
    }
}
