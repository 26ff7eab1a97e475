use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use smartchef_core::index::IndexSnapshot;
use smartchef_core::persist::{load_index, save_index, IndexPaths};
use smartchef_core::{consolidate, EngineConfig, IdfMode, Recipe, SearchEngine, SearchFilters};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "smartchef-indexer")]
#[command(about = "Build a recipe search index and query it offline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from input JSON/JSONL recipe files or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Optional engine config (JSON); flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        /// Vocabulary size cap
        #[arg(long)]
        max_terms: Option<usize>,
        /// Use plain IDF = ln(N/df) instead of ln(1 + N/df)
        #[arg(long, default_value_t = false)]
        plain_idf: bool,
    },
    /// Search a built index
    Search {
        #[arg(long, default_value = "./index")]
        index: String,
        /// Free-text query
        #[arg(long, conflicts_with = "ingredients")]
        query: Option<String>,
        /// Comma-separated ingredients you have on hand
        #[arg(long, value_delimiter = ',')]
        ingredients: Vec<String>,
        #[arg(long, default_value_t = 15)]
        limit: usize,
        #[arg(long)]
        cuisine: Option<String>,
        #[arg(long)]
        difficulty: Option<String>,
        /// Comma-separated dietary tags; any one must match
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Print a consolidated shopping list for recipes in the index
    ShoppingList {
        #[arg(long, default_value = "./index")]
        index: String,
        /// Recipe to include, optionally with a servings multiplier: ID or ID:MULTIPLIER
        #[arg(long = "recipe", required = true)]
        recipes: Vec<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, config, max_terms, plain_idf } => {
            let mut config = match config {
                Some(path) => EngineConfig::from_file(&path).with_context(|| format!("reading config {}", path.display()))?,
                None => EngineConfig::default(),
            };
            if let Some(max_terms) = max_terms { config.max_terms = max_terms; }
            if plain_idf { config.idf = IdfMode::Plain; }
            build_index(&input, &output, &config)
        }
        Commands::Search { index, query, ingredients, limit, cuisine, difficulty, tags } => {
            let engine = open_engine(&index)?;
            let filters = SearchFilters { cuisine, difficulty, dietary_tags: tags.into_iter().collect() };
            let results = match query {
                Some(q) => engine.search(&q, limit, Some(&filters))?,
                None if !ingredients.is_empty() => {
                    let q = ingredients.join(" ");
                    engine.search(&q, limit, Some(&filters))?
                }
                None => bail!("either --query or --ingredients is required"),
            };
            print_json(&results)
        }
        Commands::ShoppingList { index, recipes } => {
            let engine = open_engine(&index)?;
            let mut selected: Vec<(Recipe, f64)> = Vec::new();
            for selection in &recipes {
                let (id, multiplier) = parse_selection(selection)?;
                match engine.get(id) {
                    Some(recipe) => selected.push((recipe, multiplier)),
                    None => tracing::warn!(recipe_id = id, "recipe not in index, skipping"),
                }
            }
            if selected.is_empty() {
                bail!("none of the requested recipes are in the index");
            }
            let refs: Vec<(&Recipe, f64)> = selected.iter().map(|(r, m)| (r, *m)).collect();
            let list = consolidate(&refs)?;
            print_json(&ShoppingListOutput { by_category: list.by_category(), total_items: list.total_items(), recipes: &list.recipe_ids })
        }
    }
}

#[derive(Serialize)]
struct ShoppingListOutput<'a> {
    by_category: std::collections::BTreeMap<smartchef_core::Category, Vec<&'a smartchef_core::ConsolidatedItem>>,
    total_items: usize,
    recipes: &'a [String],
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_engine(index: &str) -> Result<SearchEngine> {
    let snapshot = load_index(&IndexPaths::new(index)).with_context(|| format!("loading index from {index}"))?;
    Ok(SearchEngine::from_snapshot(EngineConfig::default(), snapshot))
}

/// `ID` or `ID:MULTIPLIER`.
fn parse_selection(selection: &str) -> Result<(&str, f64)> {
    match selection.rsplit_once(':') {
        Some((id, m)) => {
            let multiplier: f64 = m.parse().map_err(|_| anyhow!("invalid multiplier in {selection:?}"))?;
            Ok((id, multiplier))
        }
        None => Ok((selection, 1.0)),
    }
}

fn build_index(input: &str, output: &str, config: &EngineConfig) -> Result<()> {
    let input_path = Path::new(input);
    let out_paths = IndexPaths::new(output);

    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        bail!("input {input} does not exist");
    }

    let mut corpus: Vec<Recipe> = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    for file in files {
        let loaded = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file)?
        } else {
            read_json(&file)?
        };
        for recipe in loaded {
            if !seen_ids.insert(recipe.id.clone()) {
                tracing::warn!(recipe_id = %recipe.id, file = %file.display(), "duplicate recipe id, skipping");
                continue;
            }
            corpus.push(recipe);
        }
    }
    tracing::info!(num_docs = corpus.len(), "ingested recipes");

    let snapshot = IndexSnapshot::build(&corpus, config.max_terms, config.idf);
    save_index(&out_paths, &snapshot)?;

    tracing::info!(output, num_terms = snapshot.num_terms(), "index build complete");
    Ok(())
}

fn read_jsonl(file: &Path) -> Result<Vec<Recipe>> {
    let reader = BufReader::new(File::open(file)?);
    let mut out = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let recipe: Recipe = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), lineno + 1))?;
        out.push(recipe);
    }
    Ok(out)
}

fn read_json(file: &Path) -> Result<Vec<Recipe>> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    let recipes = match json {
        serde_json::Value::Array(arr) => arr
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Recipe>, _>>()
            .with_context(|| format!("parsing {}", file.display()))?,
        serde_json::Value::Object(_) => vec![serde_json::from_value(json).with_context(|| format!("parsing {}", file.display()))?],
        _ => Vec::new(),
    };
    Ok(recipes)
}
