use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use nexus_catalog::{group_by_category, Catalog, CategoryFilter, SearchState};
use nexus_search::{
    build_matcher, filter_lexical, match_semantic, merge, MergePolicy, ResultSource,
    SearchConfig, SemanticMode, SemanticOutcome, SemanticStatus,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod output;
mod replay;

use output::{print_json, print_stdout, SearchReport};

#[derive(Parser)]
#[command(name = "nexus")]
#[command(about = "Browse and search the NexusHub tool directory", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Catalog JSON file (defaults to the built-in directory)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter the catalog by query and category
    Search(SearchArgs),

    /// Tool counts per category
    Categories(ListArgs),

    /// Featured tools
    Featured(ListArgs),

    /// Feed a timed script of input changes through a browsing session
    Replay(ReplayArgs),
}

#[derive(Args)]
struct SearchArgs {
    /// Free-text query
    #[arg(default_value = "")]
    query: String,

    /// Category facet ("All", a label like "Design", or a slug like "ai")
    #[arg(short, long, default_value = "All")]
    category: CategoryFilter,

    /// Semantic matcher override: auto|off|stub|gemini
    #[arg(long)]
    semantic: Option<SemanticMode>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ReplayArgs {
    /// JSON array of `{ "after_ms", "query"?, "category"?, "select"? }` steps
    script: PathBuf,

    /// Semantic matcher override: auto|off|stub|gemini
    #[arg(long)]
    semantic: Option<SemanticMode>,

    /// Print updates as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // JSON output keeps stdout clean for parsing
    let json_output = match &cli.command {
        Commands::Search(args) => args.json,
        Commands::Categories(args) | Commands::Featured(args) => args.json,
        Commands::Replay(args) => args.json,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let catalog = Arc::new(load_catalog(cli.catalog.as_deref())?);

    match cli.command {
        Commands::Search(args) => run_search(args, &catalog, cli.config.as_deref()).await?,
        Commands::Categories(args) => run_categories(&args, &catalog)?,
        Commands::Featured(args) => run_featured(&args, &catalog)?,
        Commands::Replay(args) => {
            let config = load_config(cli.config.as_deref(), args.semantic)?;
            replay::run(&args.script, args.json, catalog, &config).await?;
        }
    }

    Ok(())
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("Failed to load catalog from {}", path.display())),
        None => Catalog::builtin().context("Built-in catalog is invalid"),
    }
}

/// File config, then `NEXUS_*` environment, then the command-line override.
///
/// An explicit non-off `--semantic` opts into semantic-preferred merging.
fn load_config(path: Option<&Path>, semantic: Option<SemanticMode>) -> Result<SearchConfig> {
    let mut config = match path {
        Some(path) => SearchConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SearchConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid NEXUS_* environment override")?;

    if let Some(mode) = semantic {
        config.semantic.mode = mode;
        if mode != SemanticMode::Off {
            config.pipeline.merge_policy = MergePolicy::SemanticPreferred;
        }
    }
    Ok(config)
}

async fn run_search(args: SearchArgs, catalog: &Catalog, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, args.semantic)?;
    let pipeline_config = config.pipeline_config();
    let matcher = build_matcher(&config.semantic).context("Failed to configure semantic matcher")?;

    let state = SearchState::new(args.query, args.category);
    let lexical = filter_lexical(catalog, &state.query, state.category);

    let matcher = matcher.filter(|_| pipeline_config.merge_policy.wants_semantic(&state));
    let outcome = match &matcher {
        Some(matcher) => {
            let candidates: Vec<_> = catalog
                .iter()
                .filter(|tool| state.category.admits(tool.category))
                .cloned()
                .collect();
            match_semantic(
                matcher.as_ref(),
                &state.query,
                &candidates,
                pipeline_config.semantic_timeout,
            )
            .await
        }
        None => SemanticOutcome::NotRequested,
    };

    let (result, source) = merge(catalog, &state, lexical, &outcome);
    let semantic = match (&outcome, source) {
        (SemanticOutcome::NotRequested, _) => SemanticStatus::Skipped,
        (_, ResultSource::Semantic) => SemanticStatus::Applied,
        (_, ResultSource::Lexical) => SemanticStatus::Fallback,
    };

    let report = SearchReport {
        state: &state,
        source,
        semantic,
        matcher: matcher.as_ref().map(|m| m.name()),
        tools: &result,
    };
    if args.json {
        print_json(&report)
    } else {
        report.print()
    }
}

fn run_categories(args: &ListArgs, catalog: &Catalog) -> Result<()> {
    let groups = group_by_category(&catalog.all());
    if args.json {
        let counts: Vec<_> = groups
            .iter()
            .map(|group| {
                serde_json::json!({
                    "category": group.category,
                    "slug": group.category.slug(),
                    "count": group.tools.len(),
                    "ids": group.tools.iter().map(|tool| tool.id.as_str()).collect::<Vec<_>>(),
                })
            })
            .collect();
        return print_json(&counts);
    }

    for group in &groups {
        print_stdout(&format!(
            "{:<24} {:>3}",
            group.category.label(),
            group.tools.len()
        ))?;
    }
    print_stdout(&format!("{:<24} {:>3}", CategoryFilter::ALL_LABEL, catalog.len()))
}

fn run_featured(args: &ListArgs, catalog: &Catalog) -> Result<()> {
    let featured = catalog.featured();
    if args.json {
        return print_json(&featured);
    }
    if featured.is_empty() {
        return print_stdout("No featured tools.");
    }
    output::print_tools(&featured)
}
