use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::anyhow;
use clap::Parser as ClapParser;
use clap::Subcommand;

use btlin::analyzer::EngineAnalyzer;
use btlin::batch::{WorkItem, run_batch, write_report};
use btlin::lineage::{EnvMap, LineageRules, extract_lineage};

#[derive(clap::Parser)]
#[command(name = "btlin")]
#[command(about = "BTEQ script parser and table-level lineage extractor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the whole work-item catalog and write the lineage report.
    ExtractLineage(ExtractLineageCommand),
    /// Resolve a single script/target pair and print the record as JSON.
    Resolve(ResolveCommand),
}

#[derive(clap::Args)]
struct ExtractLineageCommand {
    /// Path to the JSON environment-parameter map (placeholder -> schema).
    #[arg(short, long)]
    env_params: PathBuf,
    /// Path to the JSON catalog of work items.
    #[arg(short, long)]
    catalog: PathBuf,
    /// Path to a TOML file overriding the transience/exclusion rules.
    #[arg(short, long)]
    rules: Option<PathBuf>,
    /// Directory script paths in the catalog are relative to.
    #[arg(long, default_value = ".")]
    scripts_root: PathBuf,
    /// Where to write the CSV report (stdout when omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Resolve catalog entries in parallel.
    #[arg(long)]
    parallel: bool,
}

#[derive(clap::Args)]
struct ResolveCommand {
    /// Path to the JSON environment-parameter map (placeholder -> schema).
    #[arg(short, long)]
    env_params: PathBuf,
    /// Path to a TOML file overriding the transience/exclusion rules.
    #[arg(short, long)]
    rules: Option<PathBuf>,
    /// Fully qualified `schema.table` target to resolve.
    #[arg(short, long)]
    target: String,
    /// Path to the BTEQ script populating the target.
    #[arg(value_name = "SQL_FILE")]
    sql: PathBuf,
    /// Pretty-print the output record.
    #[arg(long)]
    pretty: bool,
}

fn read_env_params(path: &Path) -> anyhow::Result<EnvMap> {
    let env_str = std::fs::read_to_string(path)
        .map_err(|_| anyhow!("Failed to read env params file: {}", path.display()))?;
    serde_json::from_str(&env_str).map_err(|err| {
        anyhow!(
            "Failed to parse JSON env params in file {} due to error: {}",
            path.display(),
            err
        )
    })
}

fn read_rules(path: Option<&PathBuf>) -> anyhow::Result<LineageRules> {
    let Some(path) = path else {
        return Ok(LineageRules::default());
    };
    let rules_str = std::fs::read_to_string(path)
        .map_err(|_| anyhow!("Failed to read rules file: {}", path.display()))?;
    toml::from_str(&rules_str).map_err(|err| {
        anyhow!(
            "Failed to parse TOML rules in file {} due to error: {}",
            path.display(),
            err
        )
    })
}

fn extract_lineage_command(command: &ExtractLineageCommand) -> anyhow::Result<()> {
    let env = read_env_params(&command.env_params)?;
    let rules = read_rules(command.rules.as_ref())?;

    let catalog_str = std::fs::read_to_string(&command.catalog).map_err(|_| {
        anyhow!(
            "Failed to read catalog file: {}",
            command.catalog.display()
        )
    })?;
    let items: Vec<WorkItem> = serde_json::from_str(&catalog_str).map_err(|err| {
        anyhow!(
            "Failed to parse JSON catalog in file {} due to error: {}",
            command.catalog.display(),
            err
        )
    })?;

    let scripts_root = command.scripts_root.clone();
    let loader = move |script_path: &str| -> anyhow::Result<String> {
        let full_path = scripts_root.join(script_path);
        std::fs::read_to_string(&full_path)
            .map_err(|_| anyhow!("Failed to read sql file {}", full_path.display()))
    };

    let analyzer = EngineAnalyzer::new(rules.clone());
    let outcomes = run_batch(&items, &loader, &analyzer, &env, &rules, command.parallel);

    match &command.output {
        Some(output_path) => {
            let file = std::fs::File::create(output_path).map_err(|_| {
                anyhow!("Failed to create output file {}", output_path.display())
            })?;
            write_report(&outcomes, file)?;
        }
        None => write_report(&outcomes, std::io::stdout().lock())?,
    }

    log::info!("Lineage analysis completed: {} targets", items.len());
    Ok(())
}

fn resolve_command(command: &ResolveCommand) -> anyhow::Result<()> {
    let env = read_env_params(&command.env_params)?;
    let rules = read_rules(command.rules.as_ref())?;

    let sql = std::fs::read_to_string(&command.sql)
        .map_err(|_| anyhow!("Failed to read sql file {}", command.sql.display()))?;
    let record = extract_lineage(&sql, &command.target, &env, &rules)?;

    let out_str = if command.pretty {
        serde_json::to_string_pretty(&record)?
    } else {
        serde_json::to_string(&record)?
    };
    println!("{}", out_str);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let now = Instant::now();

    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::ExtractLineage(command) => extract_lineage_command(command)?,
        Commands::Resolve(command) => resolve_command(command)?,
    }

    let elapsed = now.elapsed();
    log::info!("Elapsed: {:.2?}", elapsed);

    Ok(())
}
