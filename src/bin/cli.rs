use clap::{Parser, Subcommand, ValueEnum};
use schema_markup::*;
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "schema-markup")]
#[command(about = "Extract and validate schema.org structured data (JSON-LD, Microdata, RDFa)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an HTML page or a bare JSON-LD document
    Analyze {
        /// Read markup from a file (stdin when neither --file nor --url is given)
        #[arg(short, long, conflicts_with = "url")]
        file: Option<PathBuf>,
        /// Fetch and analyze a page
        #[arg(short, long)]
        url: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
        /// Analyzer configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Treat missing recommended properties as errors
        #[arg(long)]
        strict: bool,
    },
    /// Show the effective constraints of a vocabulary type
    Vocabulary {
        /// Type name (e.g. LocalBusiness)
        #[arg(short = 't', long = "type")]
        type_name: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            file,
            url,
            format,
            config,
            strict,
        } => {
            let valid = analyze_command(file, url, format, config, strict).await?;
            if !valid {
                std::process::exit(1);
            }
        }
        Commands::Vocabulary { type_name } => {
            show_type(&type_name)?;
        }
    }

    Ok(())
}

async fn analyze_command(
    file: Option<PathBuf>,
    url: Option<String>,
    format: OutputFormat,
    config_path: Option<PathBuf>,
    strict: bool,
) -> std::result::Result<bool, Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => AnalyzerConfig::from_file(path)?,
        None => AnalyzerConfig::default(),
    };
    if strict {
        config = config.with_strict(true);
    }

    let input = match (file, url) {
        (_, Some(url)) => AnalysisInput::url(url),
        (Some(path), None) => AnalysisInput::html(std::fs::read_to_string(path)?),
        (None, None) => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            AnalysisInput::html(buffer)
        }
    };

    let analyzer = Analyzer::new(config)?;
    let report = analyzer.analyze(&input).await?;

    match format {
        OutputFormat::Json => println!("{}", report.to_json_pretty()?),
        OutputFormat::Text => print_report(&report),
    }

    Ok(report.is_valid())
}

fn print_report(report: &AnalysisReport) {
    for notice in &report.notices {
        println!("ℹ️  {}: {}", notice.code, notice.message);
    }

    for result in &report.results {
        if result.valid {
            println!(
                "✅ {} ({}, bytes {}..{})",
                result.entity_type,
                result.source_format,
                result.source_range.start,
                result.source_range.end
            );
        } else {
            println!(
                "❌ {} ({}, bytes {}..{}) has {} errors",
                result.entity_type,
                result.source_format,
                result.source_range.start,
                result.source_range.end,
                result.count(IssueLevel::Error)
            );
        }

        for issue in &result.issues {
            let level = match issue.level {
                IssueLevel::Error => "ERROR",
                IssueLevel::Warning => "WARN",
                IssueLevel::Info => "INFO",
            };
            match &issue.affected_property {
                Some(path) => println!("  [{}] {} at {}: {}", level, issue.code, path, issue.message),
                None => println!("  [{}] {}: {}", level, issue.code, issue.message),
            }
        }

        for recommendation in &result.recommendations {
            println!("  -> {recommendation}");
        }
    }

    for recommendation in &report.page_recommendations {
        println!("💡 {recommendation}");
    }

    let summary = &report.summary;
    println!(
        "\n{} entities ({} valid), {} errors, {} warnings, {} info, score {}/100",
        summary.entities,
        summary.valid_entities,
        summary.errors,
        summary.warnings,
        summary.info,
        summary.score
    );
}

fn show_type(type_name: &str) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let registry = VocabularyRegistry::embedded()?;
    let Some(constraints) = registry.constraints(type_name) else {
        println!("❌ '{}' is not in vocabulary {}", type_name, registry.version());
        std::process::exit(1);
    };

    println!("📋 {} (vocabulary {})", type_name, registry.version());
    println!("Type chain: {}", registry.ancestors(type_name).join(" > "));
    println!("Required: {}", list_or_none(&constraints.required));
    println!("Recommended: {}", list_or_none(&constraints.recommended));

    println!("Properties:");
    for property in &constraints.property_order {
        match registry.shape_for(&constraints, property) {
            Some(range) => println!("  {property}: {range}"),
            None => println!("  {property}"),
        }
    }

    Ok(())
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}
