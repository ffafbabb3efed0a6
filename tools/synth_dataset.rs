//! Synthetic Dataset Generator
//!
//! Writes a labeled credit-card CSV (`Time, V1..V28, Amount, Class`) shaped
//! like the raw source the preprocessor expects, for local pipeline runs.

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tracing::info;

const N_COMPONENTS: usize = 28;

#[derive(Parser, Debug)]
#[command(name = "synth-dataset", about = "Generate a synthetic credit-card fraud dataset")]
struct Args {
    /// Number of records
    #[arg(long, default_value_t = 1000)]
    rows: usize,
    /// Probability that a record is fraudulent
    #[arg(long, default_value_t = 0.05)]
    fraud_rate: f64,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value = "creditcard.csv")]
    output: PathBuf,
}

/// Record generator for testing
struct RecordGenerator {
    rng: StdRng,
    elapsed_secs: f64,
}

impl RecordGenerator {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            elapsed_secs: 0.0,
        }
    }

    fn next_time(&mut self) -> f64 {
        self.elapsed_secs += self.rng.gen_range(0.0..5.0);
        self.elapsed_secs.floor()
    }

    /// Generate a legitimate record: components centred on zero, modest amount
    fn generate_legitimate(&mut self) -> Vec<f64> {
        let mut row = Vec::with_capacity(N_COMPONENTS + 3);
        row.push(self.next_time());
        for _ in 0..N_COMPONENTS {
            row.push(self.rng.gen_range(-1.5..1.5));
        }
        row.push(self.rng.gen_range(1.0..250.0));
        row.push(0.0);
        row
    }

    /// Generate a fraudulent record: leading components shifted, larger amount
    fn generate_fraudulent(&mut self) -> Vec<f64> {
        let mut row = Vec::with_capacity(N_COMPONENTS + 3);
        row.push(self.next_time());
        for i in 0..N_COMPONENTS {
            let value = match i {
                0..=3 => self.rng.gen_range(-6.0..-1.0),
                4..=9 => self.rng.gen_range(1.0..5.0),
                _ => self.rng.gen_range(-1.5..1.5),
            };
            row.push(value);
        }
        row.push(self.rng.gen_range(200.0..2500.0));
        row.push(1.0);
        row
    }
}

fn header() -> Vec<String> {
    let mut columns = vec!["Time".to_string()];
    columns.extend((1..=N_COMPONENTS).map(|i| format!("V{}", i)));
    columns.push("Amount".to_string());
    columns.push("Class".to_string());
    columns
}

/// Write `rows` records to `output`; returns the number of fraudulent ones.
fn write_dataset(output: &Path, rows: usize, fraud_rate: f64, seed: u64) -> Result<usize> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    writer.write_record(header())?;

    let mut generator = RecordGenerator::new(seed);
    let mut label_rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut fraudulent_count = 0;

    for i in 0..rows {
        let row = if label_rng.gen_bool(fraud_rate.clamp(0.0, 1.0)) {
            fraudulent_count += 1;
            generator.generate_fraudulent()
        } else {
            generator.generate_legitimate()
        };
        writer.write_record(row.iter().map(|v| v.to_string()))?;

        if (i + 1) % 10_000 == 0 {
            info!("Generated {}/{} records", i + 1, rows);
        }
    }
    writer.flush()?;

    Ok(fraudulent_count)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("synth_dataset=info".parse()?),
        )
        .init();

    let args = Args::parse();
    info!(
        rows = args.rows,
        fraud_rate = args.fraud_rate,
        seed = args.seed,
        output = %args.output.display(),
        "Configuration loaded"
    );

    let fraudulent_count = write_dataset(&args.output, args.rows, args.fraud_rate, args.seed)?;

    info!(
        "Completed! Wrote {} records ({} legitimate, {} fraudulent)",
        args.rows,
        args.rows - fraudulent_count,
        fraudulent_count
    );

    Ok(())
}
