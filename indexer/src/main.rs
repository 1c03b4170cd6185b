use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mapindex_core::aggregate::Aggregator;
use mapindex_core::config::{PipelineConfig, DEFAULT_CONTEXT_SIZE};
use mapindex_core::corpus::{read_aggregate_records, read_documents, write_aggregate_records};
use mapindex_core::persist::{load_lengths, save_snapshot, IndexPaths, IndexSnapshot, MetaFile, FORMAT_VERSION};
use mapindex_core::{build_index, DocumentLengths, DocumentRecord, StopWords, WordDocStat};
use tracing_subscriber::{fmt, EnvFilter};

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Aggregate a document corpus and build a TF-IDF inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct AggregateOpts {
    /// Tokens of context on each side of an occurrence
    #[arg(long, default_value_t = DEFAULT_CONTEXT_SIZE)]
    context_size: usize,
    /// Keep at most this many contexts per document and word
    #[arg(long)]
    max_contexts: Option<usize>,
    /// Worker threads (defaults to all cores)
    #[arg(long)]
    workers: Option<usize>,
}

impl AggregateOpts {
    fn config(&self) -> PipelineConfig {
        PipelineConfig { context_size: self.context_size, max_contexts: self.max_contexts, workers: self.workers }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Group a combined corpus file into per-document word statistics
    Aggregate {
        /// Tab-delimited corpus: documentId, title, content
        #[arg(long)]
        input: PathBuf,
        /// Aggregate records output file
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        opts: AggregateOpts,
    },
    /// Write documentId:count lines for a combined corpus file
    CountWords {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Build the index directory from aggregate records
    Build {
        /// Aggregate records file
        #[arg(long)]
        input: PathBuf,
        /// Document length file (documentId:count)
        #[arg(long)]
        lengths: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        /// Stopword list, one word per line (defaults to built-in English)
        #[arg(long)]
        stopwords: Option<PathBuf>,
        /// Context size the aggregates were produced with, recorded in meta.json
        #[arg(long, default_value_t = DEFAULT_CONTEXT_SIZE)]
        context_size: usize,
    },
    /// Aggregate, count and build in one pass
    Run {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        stopwords: Option<PathBuf>,
        #[command(flatten)]
        opts: AggregateOpts,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Aggregate { input, output, opts } => {
            let docs = load_corpus(&input)?;
            let stats = Aggregator::new(opts.config())?.aggregate(&docs);
            let out = File::create(&output).with_context(|| format!("creating {}", output.display()))?;
            write_aggregate_records(BufWriter::new(out), &stats)?;
            tracing::info!(output = %output.display(), records = stats.len(), "aggregate records written");
            Ok(())
        }
        Commands::CountWords { input, output } => {
            let docs = load_corpus(&input)?;
            let lengths = DocumentLengths::from_documents(&docs);
            let out = File::create(&output).with_context(|| format!("creating {}", output.display()))?;
            lengths.write(BufWriter::new(out))?;
            tracing::info!(output = %output.display(), documents = lengths.len(), "word counts written");
            Ok(())
        }
        Commands::Build { input, lengths, output, stopwords, context_size } => {
            let file = open_input(&input)?;
            let stats = read_aggregate_records(BufReader::new(file))?;
            let lengths = load_lengths(&lengths)?;
            build_and_save(stats, lengths, &output, stopwords.as_deref(), context_size)
        }
        Commands::Run { input, output, stopwords, opts } => {
            let docs = load_corpus(&input)?;
            let lengths = DocumentLengths::from_documents(&docs);
            let stats = Aggregator::new(opts.config())?.aggregate(&docs);
            build_and_save(stats, lengths, &output, stopwords.as_deref(), opts.context_size)
        }
    }
}

fn open_input(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("input not found: {}", path.display()))
}

fn load_corpus(path: &Path) -> Result<Vec<DocumentRecord>> {
    let file = open_input(path)?;
    Ok(read_documents(BufReader::new(file))?)
}

fn build_and_save(
    stats: Vec<WordDocStat>,
    lengths: DocumentLengths,
    output: &Path,
    stopwords: Option<&Path>,
    context_size: usize,
) -> Result<()> {
    let stopwords = match stopwords {
        Some(path) => StopWords::load(path)?,
        None => StopWords::english(),
    };
    // Nothing is written unless the whole build succeeds.
    let index = build_index(stats, &stopwords).context("index build aborted")?;

    let meta = MetaFile {
        num_docs: lengths.len(),
        num_terms: index.num_terms(),
        context_size,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
    };
    let paths = IndexPaths::new(output);
    save_snapshot(&paths, &IndexSnapshot { index, lengths }, &meta)?;
    tracing::info!(output = %output.display(), "index build complete");
    Ok(())
}
