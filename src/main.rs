use anyhow::Result;
use citation_registry::config::file_config::ConfigFile;
use citation_registry::config::{
    find_config_file, load_config, Config, OutputFormat as ConfigFormat,
};
use citation_registry::models::{CitationRecord, Topic};
use citation_registry::utils::{
    citation_table_columns, format_citation, is_terminal, terminal_width, truncate_at_word,
    truncate_with_ellipsis, CitationStyle,
};
use citation_registry::{Registry, RegistryError};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use comfy_table::{Attribute, Cell, Table};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Citation Registry - Query a hierarchical Markdown reference document
#[derive(Parser, Debug)]
#[command(name = "citation-registry")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query citations in a hierarchical Markdown reference document", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Reference document (default: from config, else references.md)
    #[arg(long, short, global = true)]
    input: Option<PathBuf>,

    /// Output format (default: from config, else auto)
    #[arg(long, short, value_enum, global = true)]
    output: Option<OutputFormat>,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// One record per line: author(s) | year | title | url
    Plain,
}

impl From<ConfigFormat> for OutputFormat {
    fn from(format: ConfigFormat) -> Self {
        match format {
            ConfigFormat::Auto => OutputFormat::Auto,
            ConfigFormat::Table => OutputFormat::Table,
            ConfigFormat::Json => OutputFormat::Json,
            ConfigFormat::Plain => OutputFormat::Plain,
        }
    }
}

/// Citation style for `cite`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Style {
    Line,
    Apa,
    Bibtex,
}

impl From<Style> for CitationStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::Line => CitationStyle::Line,
            Style::Apa => CitationStyle::Apa,
            Style::Bibtex => CitationStyle::Bibtex,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List topic names in document order
    #[command(alias = "ls")]
    ListTopics {
        /// Indent by depth and show site identifiers
        #[arg(long)]
        tree: bool,
    },

    /// Citations for a topic path, e.g. `get "Rare Earth Elements (REE)" "Mountain Pass, CA"`
    Get {
        /// Topic names from the top of the document down
        #[arg(required = true)]
        path: Vec<String>,

        /// Include citations of all sub-topics
        #[arg(long, short)]
        recursive: bool,
    },

    /// Citations published in a year
    FindYear {
        year: i32,
    },

    /// Citations whose text contains a keyword (case-insensitive)
    #[command(alias = "search")]
    FindKeyword {
        keyword: String,
    },

    /// Look up a site by its external identifier
    Site {
        id: String,
    },

    /// List all sites
    Sites,

    /// List elements referenced by topic names
    Elements,

    /// Citations filed under topics about an element
    Element {
        /// Element symbol or name, e.g. "W" or "Tungsten"
        query: String,
    },

    /// Find citations that appear more than once
    Duplicates {
        /// Title similarity threshold (0.0 - 1.0)
        #[arg(long, short)]
        threshold: Option<f64>,
    },

    /// Show document statistics
    Stats,

    /// Render citations in a citation style
    Cite {
        /// Citation style
        #[arg(long, short, value_enum, default_value_t = Style::Line)]
        style: Style,

        /// Topic path (default: the whole document)
        path: Vec<String>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Where to write the file
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },

    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Concrete rendering once `auto` is resolved
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Table,
    Json,
    Plain,
}

fn resolve_format(format: OutputFormat) -> Format {
    match format {
        OutputFormat::Table => Format::Table,
        OutputFormat::Json => Format::Json,
        OutputFormat::Plain => Format::Plain,
        OutputFormat::Auto if is_terminal() => Format::Table,
        OutputFormat::Auto => Format::Json,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

/// 1 for a missing query target, 2 for everything that makes the document
/// or configuration unusable
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<RegistryError>() {
        Some(RegistryError::NotFound(_)) => 1,
        _ => 2,
    }
}

fn init_logging(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("citation_registry={}", level)),
    );

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.logging.is_json() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn run(cli: Cli) -> Result<()> {
    // Config file if specified or found in default locations, env on top
    let config_path = cli.config.clone().or_else(find_config_file);
    let config = load_config(config_path.as_deref())?;

    init_logging(&cli, &config);
    if let Some(path) = &config_path {
        tracing::debug!("Using config file: {}", path.display());
    }

    match &cli.command {
        Commands::InitConfig { path, force } => {
            ConfigFile::create_default(path).save(*force)?;
            println!("Wrote {}", path.display());
            return Ok(());
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(*shell, &mut command, "citation-registry", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let input = cli
        .input
        .clone()
        .unwrap_or_else(|| config.document.path.clone());
    let registry = Registry::load_file(&input)?;

    let format = resolve_format(cli.output.unwrap_or_else(|| config.output.format.into()));
    let out = Output {
        format,
        title_width: config.output.title_width,
    };

    match cli.command {
        Commands::ListTopics { tree } => out.topics(registry.root(), tree)?,
        Commands::Get { path, recursive } => {
            let records = if recursive {
                registry.citations_under(path.as_slice())?
            } else {
                registry.citations_for(path.as_slice())?.iter().collect()
            };
            out.records(&records)?;
        }
        Commands::FindYear { year } => out.records(&registry.find_by_year(year))?,
        Commands::FindKeyword { keyword } => out.records(&registry.find_by_keyword(&keyword))?,
        Commands::Site { id } => {
            let site = registry.site_by_id(&id)?;
            if format == Format::Json {
                print_json(&site)?;
            } else {
                println!("{} [{}]", site.name(), site.external_id);
                let records: Vec<&CitationRecord> = site.citations().iter().collect();
                out.records(&records)?;
            }
        }
        Commands::Sites => {
            let rows: Vec<SiteRow> = registry
                .sites()
                .iter()
                .map(|site| SiteRow {
                    external_id: site.external_id,
                    name: site.name(),
                    citations: site.citations().len(),
                })
                .collect();
            out.sites(&rows)?;
        }
        Commands::Elements => out.elements(&registry.elements())?,
        Commands::Element { query } => out.records(&registry.find_by_element(&query)?)?,
        Commands::Duplicates { threshold } => {
            let threshold = threshold.unwrap_or(config.duplicates.title_threshold);
            out.duplicates(&registry.duplicates(threshold))?;
        }
        Commands::Stats => {
            let stats = registry.stats();
            match format {
                Format::Json => print_json(&stats)?,
                Format::Plain => {
                    if let Some(title) = registry.title() {
                        println!("title: {}", title);
                    }
                    println!("topics: {}", stats.topics);
                    println!("sites: {}", stats.sites);
                    println!("records: {}", stats.records);
                    println!("with_year: {}", stats.with_year);
                    println!("with_url: {}", stats.with_url);
                    println!("unstructured: {}", stats.unstructured);
                }
                Format::Table => {
                    let mut table = Table::new();
                    table.load_preset(comfy_table::presets::UTF8_FULL);
                    table.set_header(vec!["Statistic", "Count"]);
                    for (name, count) in [
                        ("Topics", stats.topics),
                        ("Sites", stats.sites),
                        ("Records", stats.records),
                        ("With year", stats.with_year),
                        ("With URL", stats.with_url),
                        ("Unstructured", stats.unstructured),
                    ] {
                        table.add_row(vec![Cell::new(name), Cell::new(count)]);
                    }
                    if let Some(title) = registry.title() {
                        println!("{}", title);
                    }
                    println!("{table}");
                }
            }
        }
        Commands::Cite { style, path } => {
            let records = if path.is_empty() {
                registry.records().collect()
            } else {
                registry.citations_under(path.as_slice())?
            };
            let separator = if style == Style::Bibtex { "\n\n" } else { "\n" };
            let rendered: Vec<String> = records
                .iter()
                .map(|r| format_citation(r, style.into()))
                .collect();
            if !rendered.is_empty() {
                println!("{}", rendered.join(separator));
            }
        }
        Commands::InitConfig { .. } | Commands::Completions { .. } => {}
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, Serialize)]
struct SiteRow<'a> {
    external_id: &'a str,
    name: &'a str,
    citations: usize,
}

/// Compact topic tree for JSON output
#[derive(Debug, Serialize)]
struct TopicSummary<'a> {
    name: &'a str,
    depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_id: Option<&'a str>,
    citations: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<TopicSummary<'a>>,
}

impl<'a> TopicSummary<'a> {
    fn new(topic: &'a Topic) -> Self {
        Self {
            name: &topic.name,
            depth: topic.depth,
            external_id: topic.external_id(),
            citations: topic.citations.len(),
            children: topic.children.iter().map(TopicSummary::new).collect(),
        }
    }
}

struct Output {
    format: Format,
    title_width: usize,
}

impl Output {
    fn records(&self, records: &[&CitationRecord]) -> Result<()> {
        match self.format {
            Format::Json => print_json(records)?,
            Format::Plain => {
                for record in records {
                    println!("{}", format_citation(record, CitationStyle::Line));
                }
            }
            Format::Table => {
                if records.is_empty() {
                    eprintln!("No citations found.");
                    return Ok(());
                }
                println!("{}", self.record_table(records));
            }
        }
        Ok(())
    }

    fn record_table(&self, records: &[&CitationRecord]) -> Table {
        let (authors_w, _, title_w, url_w) =
            citation_table_columns(terminal_width(), self.title_width);

        let mut table = Table::new();
        table.load_preset(comfy_table::presets::UTF8_FULL);
        table.set_header(vec!["Authors", "Year", "Title", "URL"]);

        for record in records {
            table.add_row(vec![
                Cell::new(truncate_with_ellipsis(&record.author_display(), authors_w)),
                Cell::new(record.year_display()),
                Cell::new(truncate_at_word(record.title_display(), title_w))
                    .add_attribute(Attribute::Bold),
                Cell::new(truncate_with_ellipsis(
                    record.url.as_deref().unwrap_or_default(),
                    url_w,
                )),
            ]);
        }
        table
    }

    fn topics(&self, root: &Topic, tree: bool) -> Result<()> {
        let mut topics = Vec::new();
        for child in &root.children {
            child.walk(&mut |t| topics.push(t));
        }
        let label = |t: &Topic| {
            if tree {
                format!("{}{}", "  ".repeat(t.depth.saturating_sub(1)), t.name)
            } else {
                t.name.clone()
            }
        };

        match self.format {
            Format::Json if tree => {
                let summary: Vec<TopicSummary> =
                    root.children.iter().map(TopicSummary::new).collect();
                print_json(&summary)?;
            }
            Format::Json => {
                let names: Vec<&str> = topics.iter().map(|t| t.name.as_str()).collect();
                print_json(&names)?;
            }
            Format::Plain => {
                for &topic in &topics {
                    match topic.external_id() {
                        Some(id) if tree => println!("{} [{}]", label(topic), id),
                        _ => println!("{}", label(topic)),
                    }
                }
            }
            Format::Table => {
                let mut table = Table::new();
                table.load_preset(comfy_table::presets::UTF8_FULL);
                table.set_header(vec!["Topic", "Site ID", "Citations"]);
                for &topic in &topics {
                    table.add_row(vec![
                        Cell::new(label(topic)),
                        Cell::new(topic.external_id().unwrap_or_default()),
                        Cell::new(topic.citations.len()),
                    ]);
                }
                println!("{table}");
            }
        }
        Ok(())
    }

    fn sites(&self, rows: &[SiteRow]) -> Result<()> {
        match self.format {
            Format::Json => print_json(rows)?,
            Format::Plain => {
                for row in rows {
                    println!("{} | {} | {}", row.external_id, row.name, row.citations);
                }
            }
            Format::Table => {
                let mut table = Table::new();
                table.load_preset(comfy_table::presets::UTF8_FULL);
                table.set_header(vec!["Site ID", "Name", "Citations"]);
                for row in rows {
                    table.add_row(vec![
                        Cell::new(row.external_id).add_attribute(Attribute::Bold),
                        Cell::new(row.name),
                        Cell::new(row.citations),
                    ]);
                }
                println!("{table}");
            }
        }
        Ok(())
    }

    fn elements(&self, elements: &[&citation_registry::utils::Element]) -> Result<()> {
        match self.format {
            Format::Json => print_json(elements)?,
            Format::Plain => {
                for element in elements {
                    println!("{} | {}", element.symbol, element.name);
                }
            }
            Format::Table => {
                let mut table = Table::new();
                table.load_preset(comfy_table::presets::UTF8_FULL);
                table.set_header(vec!["Symbol", "Name", "Rare earth"]);
                for element in elements {
                    table.add_row(vec![
                        Cell::new(element.symbol).add_attribute(Attribute::Bold),
                        Cell::new(element.name),
                        Cell::new(if element.rare_earth { "yes" } else { "" }),
                    ]);
                }
                println!("{table}");
            }
        }
        Ok(())
    }

    fn duplicates(&self, groups: &[Vec<&CitationRecord>]) -> Result<()> {
        match self.format {
            Format::Json => print_json(groups)?,
            Format::Plain => {
                for (idx, group) in groups.iter().enumerate() {
                    if idx > 0 {
                        println!();
                    }
                    for record in group {
                        println!(
                            "{} | {}",
                            record.line,
                            format_citation(record, CitationStyle::Line)
                        );
                    }
                }
            }
            Format::Table => {
                if groups.is_empty() {
                    eprintln!("No duplicates found.");
                    return Ok(());
                }
                let title_w = self.title_width.min(terminal_width().saturating_sub(40)).max(20);
                let mut table = Table::new();
                table.load_preset(comfy_table::presets::UTF8_FULL);
                table.set_header(vec!["Group", "Line", "Year", "Title"]);
                for (idx, group) in groups.iter().enumerate() {
                    for record in group {
                        table.add_row(vec![
                            Cell::new(idx + 1),
                            Cell::new(record.line),
                            Cell::new(record.year_display()),
                            Cell::new(truncate_at_word(record.title_display(), title_w)),
                        ]);
                    }
                }
                println!("{table}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_version() {
        let version = env!("CARGO_PKG_VERSION");
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].parse::<u32>().is_ok());
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["citation-registry", "stats"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, None);
        assert_eq!(cli.input, None);
        assert!(matches!(cli.command, Commands::Stats));
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["citation-registry"]).is_err());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["citation-registry", "-vv", "sites"]);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::parse_from(["citation-registry", "sites", "--verbose"]);
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_cli_output_and_input() {
        let cli = Cli::parse_from([
            "citation-registry",
            "-o",
            "plain",
            "-i",
            "refs.md",
            "find-year",
            "1980",
        ]);
        assert_eq!(cli.output, Some(OutputFormat::Plain));
        assert_eq!(cli.input, Some(PathBuf::from("refs.md")));
        assert!(matches!(cli.command, Commands::FindYear { year: 1980 }));
    }

    #[test]
    fn test_cli_get_command() {
        let cli = Cli::parse_from([
            "citation-registry",
            "get",
            "Rare Earth Elements (REE)",
            "Mountain Pass, CA",
            "--recursive",
        ]);
        match cli.command {
            Commands::Get { path, recursive } => {
                assert_eq!(path, vec!["Rare Earth Elements (REE)", "Mountain Pass, CA"]);
                assert!(recursive);
            }
            _ => panic!("Expected Get command"),
        }

        assert!(Cli::try_parse_from(["citation-registry", "get"]).is_err());
    }

    #[test]
    fn test_cli_cite_command() {
        let cli = Cli::parse_from(["citation-registry", "cite", "--style", "bibtex", "Tungsten"]);
        match cli.command {
            Commands::Cite { style, path } => {
                assert_eq!(style, Style::Bibtex);
                assert_eq!(path, vec!["Tungsten"]);
            }
            _ => panic!("Expected Cite command"),
        }
    }

    #[test]
    fn test_cli_duplicates_threshold() {
        let cli = Cli::parse_from(["citation-registry", "duplicates", "-t", "0.9"]);
        assert!(matches!(
            cli.command,
            Commands::Duplicates { threshold: Some(t) } if (t - 0.9).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn test_cli_init_config() {
        let cli = Cli::parse_from(["citation-registry", "init-config", "cfg.toml", "--force"]);
        match cli.command {
            Commands::InitConfig { path, force } => {
                assert_eq!(path, PathBuf::from("cfg.toml"));
                assert!(force);
            }
            _ => panic!("Expected InitConfig command"),
        }
    }

    #[test]
    fn test_cli_completions() {
        let cli = Cli::parse_from(["citation-registry", "completions", "bash"]);
        assert!(matches!(cli.command, Commands::Completions { shell: Shell::Bash }));
        Cli::command().debug_assert();
    }

    #[test]
    fn test_exit_code_mapping() {
        let not_found = anyhow::Error::from(RegistryError::NotFound("site".into()));
        assert_eq!(exit_code(&not_found), 1);

        let parse = anyhow::Error::from(RegistryError::Parse("empty".into()));
        assert_eq!(exit_code(&parse), 2);

        assert_eq!(exit_code(&anyhow::anyhow!("bad config")), 2);
    }

    #[test]
    fn test_config_format_conversion() {
        assert_eq!(OutputFormat::from(ConfigFormat::Plain), OutputFormat::Plain);
        assert_eq!(resolve_format(OutputFormat::Json), Format::Json);
    }
}
