//! nlpy CLI - Command-line interface
//!
//! Reads annotated documents (JSON) and prints keyword maps, relation
//! triples or entities as JSON on stdout.
//!
//! Usage:
//!   nlpy wordmap <file> [--method noun_chunks|tokens|entities|ranked] [--top N]
//!   nlpy relations <file>
//!   nlpy entities <file>

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use nlpy_core::{
    AnnotateOptions, AnnotatedDocument, AppConfig, LoggingConfig, PrecomputedAnnotator,
    WordmapMethod,
};
use nlpy_extractor::wordmap::resolve_method;
use nlpy_extractor::{Pipeline, RelationExtractor, Wordmap, WordmapBuilder};

#[derive(Parser)]
#[command(name = "nlpy")]
#[command(about = "Keyword maps and relation triples from annotated documents")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables still override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count keywords of an annotated document
    Wordmap {
        /// Annotated document JSON
        file: PathBuf,
        /// noun_chunks, tokens, entities or ranked
        #[arg(long)]
        method: Option<String>,
        /// Only print the N most frequent terms
        #[arg(long)]
        top: Option<usize>,
    },
    /// Extract relation triples
    Relations {
        /// Annotated document JSON
        file: PathBuf,
    },
    /// List the document's entities
    Entities {
        /// Annotated document JSON
        file: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct TermCount {
    term: String,
    count: usize,
}

/// Most frequent terms first, ties by term
fn rank_terms(map: Wordmap, top: Option<usize>) -> Vec<TermCount> {
    let mut terms: Vec<TermCount> = map
        .into_iter()
        .map(|(term, count)| TermCount { term, count })
        .collect();
    terms.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    if let Some(top) = top {
        terms.truncate(top);
    }
    terms
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

fn load_document(path: &Path) -> anyhow::Result<AnnotatedDocument> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let doc = AnnotatedDocument::from_json(&json)
        .with_context(|| format!("invalid annotated document {}", path.display()))?;
    Ok(doc)
}

/// Serve the file's annotation to a builder and count its keywords
fn wordmap_for(path: &Path, method: WordmapMethod, config: &AppConfig) -> anyhow::Result<Wordmap> {
    let doc = load_document(path)?;
    let text = doc.text().to_string();
    let annotator = Arc::new(PrecomputedAnnotator::new().with_document(doc));
    let builder = WordmapBuilder::new(annotator)
        .with_config(config.wordmap.clone())
        .with_cluster_config(config.clustering.clone());
    Ok(builder.build(&text, method)?)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Wordmap { file, method, top } => {
            let method = method
                .as_deref()
                .map(resolve_method)
                .unwrap_or(config.wordmap.method);
            tracing::info!("Building {} wordmap for {}", method, file.display());
            let map = wordmap_for(&file, method, &config)?;
            print_json(&rank_terms(map, top))?;
        }
        Commands::Relations { file } => {
            let doc = load_document(&file)?;
            let pipeline = Pipeline::new(Arc::new(PrecomputedAnnotator::new()))
                .with_extractor(RelationExtractor::new(config.relations.clone()));
            let processed = pipeline.process_annotated(&doc, &AnnotateOptions::new())?;
            print_json(&processed.relations)?;
        }
        Commands::Entities { file } => {
            let doc = load_document(&file)?;
            let pipeline = Pipeline::new(Arc::new(PrecomputedAnnotator::new()));
            let processed = pipeline.process_annotated(&doc, &AnnotateOptions::for_counting())?;
            print_json(&processed.document)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_terms() {
        let map: Wordmap = [("car", 2), ("house", 1), ("apple", 1)]
            .into_iter()
            .map(|(t, c)| (t.to_string(), c))
            .collect();

        let ranked = rank_terms(map.clone(), None);
        let terms: Vec<&str> = ranked.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["car", "apple", "house"]);

        assert_eq!(rank_terms(map, Some(1)).len(), 1);
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["nlpy", "wordmap", "doc.json", "--method", "tokens", "--top", "5"])
            .unwrap();
        match cli.command {
            Commands::Wordmap { file, method, top } => {
                assert_eq!(file, PathBuf::from("doc.json"));
                assert_eq!(method.as_deref(), Some("tokens"));
                assert_eq!(top, Some(5));
            }
            _ => panic!("expected wordmap"),
        }

        let cli = Cli::try_parse_from(["nlpy", "relations", "doc.json", "--config", "nlpy.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("nlpy.toml")));
    }

    #[test]
    fn test_wordmap_from_file() {
        let json = r#"{"tokens": [
            {"text": "Ada", "lemma": "Ada", "pos": "PROPN", "dep": "nsubj", "head": 1},
            {"text": "wrote", "lemma": "write", "pos": "VERB", "dep": "ROOT", "head": 1},
            {"text": "notes", "lemma": "note", "pos": "NOUN", "dep": "dobj", "head": 1, "whitespace": ""}
        ]}"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, json).unwrap();

        let config = AppConfig::default();
        let map = wordmap_for(&path, WordmapMethod::Tokens, &config).unwrap();
        let terms: Vec<String> = rank_terms(map, None).into_iter().map(|t| t.term).collect();
        assert_eq!(terms, vec!["Ada", "note", "write"]);
    }
}
