use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use datum_pipeline::{
    AppResult, codec,
    config::{Config, defaults::DEFAULT_CONFIG_FILE},
    hashing::{HashEngine, Sha3Engine},
    models::Datum,
    pipeline::{BatchStage, HashingStage},
    runtime::LocalPipeline,
    transport::{MemoryStream, StreamEntry},
};

#[derive(Parser)]
#[command(name = "datum-pipeline")]
#[command(version)]
#[command(about = "Fix an iterated SHA3-512 digest on document records flowing through streams")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate records and push them through both stages in memory
    Run {
        /// Number of records to publish (overrides generator.count)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Digest iterations per record (overrides generator.iterations)
        #[arg(short, long)]
        iterations: Option<u32>,
    },
    /// Print random records as encoded payloads, one per line
    Generate {
        #[arg(short = 'n', long)]
        count: Option<usize>,

        #[arg(short, long)]
        iterations: Option<u32>,
    },
    /// Read encoded payloads from stdin and print them with their digest fixed
    Hash,
    /// Print the iterated digest of a document
    Digest {
        document: String,

        #[arg(short, long, default_value_t = 1)]
        iterations: u32,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("datum_pipeline={}", cli.log_level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_filter.into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = Config::load_from(Some(cli.config.as_path()))?;
    dispatch(cli.command, config).await?;
    Ok(())
}

async fn dispatch(command: Command, mut config: Config) -> AppResult<()> {
    match command {
        Command::Run { count, iterations } => {
            if let Some(iterations) = iterations {
                config.generator.iterations = iterations;
            }
            let count = count.unwrap_or(config.generator.count);
            info!("Starting datum-pipeline v{}", env!("CARGO_PKG_VERSION"));

            let pipeline = LocalPipeline::new(config);
            let run = pipeline.run(count).await?;
            println!("{}", serde_json::to_string_pretty(&run)?);
        }
        Command::Generate { count, iterations } => {
            let count = count.unwrap_or(config.generator.count);
            let iterations = iterations.unwrap_or(config.generator.iterations);
            generate_lines(
                &mut std::io::stdout().lock(),
                count,
                config.generator.document_chars,
                iterations,
            )?;
        }
        Command::Hash => {
            let input = std::io::stdin().lock();
            hash_lines(input, &mut std::io::stdout().lock(), &config).await?;
        }
        Command::Digest {
            document,
            iterations,
        } => {
            println!("{}", Sha3Engine.compute_digest(&document, iterations));
        }
        Command::Config => print!("{}", config.to_toml()?),
    }

    Ok(())
}

/// Write `count` random records as encoded payloads, one per line
fn generate_lines(
    out: &mut impl Write,
    count: usize,
    document_chars: usize,
    iterations: u32,
) -> AppResult<()> {
    for _ in 0..count {
        let datum = Datum::random(document_chars, iterations);
        out.write_all(&codec::encode_payload(&datum)?)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Run payload lines through the hashing stage and write what it emits
async fn hash_lines(input: impl BufRead, out: &mut impl Write, config: &Config) -> AppResult<()> {
    let entries = input
        .lines()
        .enumerate()
        .filter_map(|(number, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(Ok(StreamEntry::new(format!("line-{}", number + 1), line))),
            Err(e) => Some(Err(e)),
        })
        .collect::<std::io::Result<Vec<_>>>()?;

    let output = Arc::new(MemoryStream::new("stdout"));
    let stage = HashingStage::new(output.clone(), config.pipeline.max_concurrency);

    for chunk in entries.chunks(config.pipeline.batch_size) {
        let report = stage.process_batch(chunk.to_vec()).await?;
        for failure in &report.failures {
            warn!("Skipped {} ({}): {}", failure.key, failure.kind, failure.message);
        }
    }

    for entry in output.snapshot().await {
        out.write_all(&entry.payload)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use datum_pipeline::AppError;

    #[tokio::test]
    async fn test_generated_lines_hash_through_the_stage() {
        let mut generated = Vec::new();
        generate_lines(&mut generated, 3, 8, 2).unwrap();

        let mut input = generated.clone();
        input.extend_from_slice(b"\nnot a payload\n");

        let mut hashed = Vec::new();
        hash_lines(input.as_slice(), &mut hashed, &Config::default())
            .await
            .unwrap();

        let lines: Vec<_> = hashed.split(|b| *b == b'\n').filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let datum = codec::decode_payload(line).unwrap();
            assert_eq!(datum.document().len(), 8);
            assert_eq!(
                datum.digest(),
                Some(Sha3Engine.compute_digest(datum.document(), 2).as_str())
            );
        }
    }

    #[test]
    fn test_write_failures_surface_as_io_errors() {
        struct Closed;

        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let err = generate_lines(&mut Closed, 1, 4, 1).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
