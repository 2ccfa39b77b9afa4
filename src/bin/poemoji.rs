//! Poem-to-emoji CLI.
//!
//! Run with:
//!   cargo run --bin poemoji -- map "بسی رنج بردم در این سال سی" --explain
//!   cargo run --bin poemoji -- add-concept --id sea --label دریا --example دریا --emoji 🌊

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use poemoji::{
    global_embedder, ConceptBank, EnginePath, Explanation, HistoryStore, MapperConfig,
    MappingRecord, SemanticMapper, SimpleMapper,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "poemoji", about = "Semantic poem-to-emoji mapping")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Map a poem to an emoji sequence
    Map {
        /// Poem text; omit to read it from --file
        poem: Option<String>,

        /// Read the poem from a file instead of the command line
        #[arg(long)]
        file: Option<PathBuf>,

        /// Concept bank path
        #[arg(long, default_value = "data/concepts.json")]
        concepts: PathBuf,

        /// Minimum cosine similarity for a concept match
        #[arg(long, default_value_t = 0.52)]
        threshold: f32,

        /// Directory for mapping history records; history is off when absent
        #[arg(long)]
        history_dir: Option<PathBuf>,

        /// Skip the embedding model and use the dictionary fallback
        #[arg(long)]
        no_model: bool,

        /// Print the explanation trail as JSON
        #[arg(long)]
        explain: bool,
    },

    /// Add a concept to the bank and save it
    AddConcept {
        /// Concept bank path
        #[arg(long, default_value = "data/concepts.json")]
        concepts: PathBuf,

        #[arg(long)]
        id: String,

        #[arg(long)]
        label: String,

        /// Example phrase; repeat for more
        #[arg(long = "example")]
        examples: Vec<String>,

        /// Associated emoji; repeat for more, the first one is emitted
        #[arg(long = "emoji", required = true)]
        emoji: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    match Cli::parse().command {
        Command::Map {
            poem,
            file,
            concepts,
            threshold,
            history_dir,
            no_model,
            explain,
        } => run_map(poem, file, &concepts, threshold, history_dir, no_model, explain),
        Command::AddConcept {
            concepts,
            id,
            label,
            examples,
            emoji,
        } => run_add_concept(&concepts, id, label, examples, emoji),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_map(
    poem: Option<String>,
    file: Option<PathBuf>,
    concepts: &Path,
    threshold: f32,
    history_dir: Option<PathBuf>,
    no_model: bool,
    explain: bool,
) -> Result<()> {
    let poem = match (poem, file) {
        (Some(p), _) => p,
        (None, Some(f)) => std::fs::read_to_string(&f)
            .with_context(|| format!("failed to read {}", f.display()))?,
        (None, None) => bail!("provide a poem argument or --file"),
    };
    if poem.trim().is_empty() {
        bail!("poem is empty");
    }

    let (mapped, explanations, engine) = map_poem(&poem, concepts, threshold, no_model)?;

    println!("{}", mapped.join(" "));
    if explain {
        println!("{}", serde_json::to_string_pretty(&explanations)?);
    }
    info!("engine: {}", engine.as_str());

    // A history failure must not mask a successful mapping
    if let Some(dir) = history_dir {
        let record = MappingRecord::new(&poem, &mapped, explanations, engine);
        match HistoryStore::new(dir).append(&record) {
            Ok(path) => info!("history saved to {}", path.display()),
            Err(e) => warn!("mapping succeeded but history was not saved: {e}"),
        }
    }

    Ok(())
}

/// Run the semantic pipeline when a model can be had, the dictionary
/// fallback otherwise. Returns the engine path that actually produced the
/// result so the operator can tell degraded output from the real thing.
fn map_poem(
    poem: &str,
    concepts: &Path,
    threshold: f32,
    no_model: bool,
) -> Result<(Vec<String>, Vec<Explanation>, EnginePath)> {
    if no_model {
        let (mapped, explanations) = SimpleMapper::new().map(poem);
        return Ok((mapped, explanations, EnginePath::FallbackSimple));
    }

    // Preload attempt, mirroring a host that warms the model at startup.
    // A failed load is not cached, so the second accessor call below retries;
    // a mapping that only succeeds on the retry is tagged mapper_no_model.
    let engine = match global_embedder() {
        Ok(_) => EnginePath::Semantic,
        Err(e) => {
            warn!("embedding model not preloaded: {e}");
            EnginePath::MapperNoModel
        }
    };

    match global_embedder() {
        Ok(embedder) => {
            let bank = ConceptBank::load(concepts, embedder)
                .context("failed to load concept bank")?;
            let mapper = SemanticMapper::with_config(
                &bank,
                MapperConfig {
                    similarity_threshold: threshold,
                    top_k: 3,
                },
            );
            let (mapped, explanations) = mapper.map(poem);
            Ok((mapped, explanations, engine))
        }
        Err(e) => {
            warn!("semantic engine unavailable ({e}); using dictionary fallback");
            let (mapped, explanations) = SimpleMapper::new().map(poem);
            Ok((mapped, explanations, EnginePath::FallbackSimple))
        }
    }
}

fn run_add_concept(
    concepts: &Path,
    id: String,
    label: String,
    examples: Vec<String>,
    emoji: Vec<String>,
) -> Result<()> {
    let embedder = global_embedder().context("embedding model required to rebuild vectors")?;
    let mut bank = ConceptBank::load(concepts, embedder).context("failed to load concept bank")?;

    bank.add_concept(poemoji::Concept {
        id: id.clone(),
        label,
        examples,
        emoji,
    })
    .context("failed to add concept")?;
    bank.save(None).context("failed to save concept bank")?;

    info!("added concept '{}' ({} total)", id, bank.len());
    Ok(())
}
