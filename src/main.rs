use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ctelig::config::{DomainConfig, ProcessorConfig};
use ctelig::document::{CriteriaInput, CriteriaProcessor, SegmentedDocument};
use ctelig::entity::{EntityAnnotator, PrecomputedAnnotator};
use ctelig::logging::configure_logging;
use ctelig::stats::{word_counts, CorpusStats};
use std::collections::HashSet;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory for the daily rolling log file
    #[arg(long, global = true)]
    log_dir: Option<String>,

    /// JSON vocabulary file (overrides CTELIG_DOMAIN_CONFIG)
    #[arg(long, global = true)]
    domain_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split eligibility blocks into inclusion and exclusion criteria
    Segment {
        /// JSON lines of {"id", "criteria"}, or a plain text block with --plain
        input: PathBuf,

        /// Treat the whole input file as one eligibility block
        #[arg(long)]
        plain: bool,
    },

    /// Segment, annotate, relocate negations and expand aliases
    Process {
        /// JSON lines of {"id", "criteria"}, or a plain text block with --plain
        input: PathBuf,

        /// Treat the whole input file as one eligibility block
        #[arg(long)]
        plain: bool,

        /// JSON object mapping criterion text to its entity list
        #[arg(short, long)]
        annotations: Option<PathBuf>,

        /// Skip alias expansion
        #[arg(long)]
        no_expand: bool,

        /// Skip negation relocation
        #[arg(long)]
        no_move_negations: bool,

        /// Aliases kept per entity
        #[arg(short, long, default_value = "2")]
        max_aliases: usize,
    },

    /// Summarize segmentation and negation relocation over a corpus
    Stats {
        /// JSON lines of {"id", "criteria"}
        input: PathBuf,

        /// JSON object mapping criterion text to its entity list
        #[arg(short, long)]
        annotations: Option<PathBuf>,

        /// Also print the most frequent criterion words
        #[arg(long, default_value = "0")]
        top_words: usize,

        /// Words left out of the frequency count, separated by ';'
        #[arg(long, default_value = "")]
        stopwords: String,
    },
}

fn load_inputs(path: &Path, plain: bool) -> Result<Vec<CriteriaInput>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input {}", path.display()))?;

    if plain {
        let id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        return Ok(vec![CriteriaInput::new(&id, &contents)]);
    }

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Invalid input on line {} of {}", idx + 1, path.display()))
        })
        .collect()
}

fn write_json_lines<T: serde::Serialize>(records: &[T]) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for record in records {
        serde_json::to_writer(&mut out, record).context("Failed to serialize output")?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    configure_logging(cli.log_dir.as_deref());

    let domain = match &cli.domain_config {
        Some(path) => DomainConfig::from_file(path)?,
        None => DomainConfig::from_env()?,
    };

    match cli.command {
        Commands::Segment { input, plain } => {
            let inputs = load_inputs(&input, plain)?;
            let processor = CriteriaProcessor::new(ProcessorConfig::default(), domain);
            let documents: Vec<SegmentedDocument> = processor
                .process_batch(&inputs, None)
                .into_iter()
                .filter_map(|result| match result {
                    Ok(document) => Some(document.into()),
                    Err(e) => {
                        error!("{:#}", e);
                        None
                    }
                })
                .collect();
            info!("Segmented {} eligibility blocks", documents.len());
            write_json_lines(&documents)?;
        }
        Commands::Process {
            input,
            plain,
            annotations,
            no_expand,
            no_move_negations,
            max_aliases,
        } => {
            let inputs = load_inputs(&input, plain)?;
            let annotator = match annotations {
                Some(path) => Some(PrecomputedAnnotator::from_file(path)?),
                None => None,
            };
            let config = ProcessorConfig {
                expand: !no_expand,
                move_negations: !no_move_negations,
                max_aliases,
            };
            let processor = CriteriaProcessor::new(config, domain);

            let annotator_ref = annotator
                .as_ref()
                .map(|a| a as &(dyn EntityAnnotator + Sync));
            let mut documents = Vec::with_capacity(inputs.len());
            for result in processor.process_batch(&inputs, annotator_ref) {
                match result {
                    Ok(document) => documents.push(document),
                    Err(e) => error!("{:#}", e),
                }
            }
            write_json_lines(&documents)?;
        }
        Commands::Stats {
            input,
            annotations,
            top_words,
            stopwords,
        } => {
            let inputs = load_inputs(&input, false)?;
            let annotator = match annotations {
                Some(path) => Some(PrecomputedAnnotator::from_file(path)?),
                None => None,
            };
            let processor = CriteriaProcessor::new(ProcessorConfig::default(), domain);
            let annotator_ref = annotator
                .as_ref()
                .map(|a| a as &(dyn EntityAnnotator + Sync));
            let documents: Vec<_> = processor
                .process_batch(&inputs, annotator_ref)
                .into_iter()
                .filter_map(|result| match result {
                    Ok(document) => Some(document),
                    Err(e) => {
                        error!("{:#}", e);
                        None
                    }
                })
                .collect();

            let stats = CorpusStats::from_documents(&documents);
            write_json_lines(&[&stats])?;

            if top_words > 0 {
                let stopwords: HashSet<String> = stopwords
                    .split(';')
                    .map(|w| w.trim().to_lowercase())
                    .filter(|w| !w.is_empty())
                    .collect();
                let mut counts: Vec<_> = word_counts(&documents, &stopwords).into_iter().collect();
                counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                counts.truncate(top_words);
                write_json_lines(&counts)?;
            }
        }
    }

    Ok(())
}
