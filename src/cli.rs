//! Command-line surface of the `fraud-pipeline` binary.
//!
//! The processing host appends its own arguments to every stage invocation,
//! so unknown flags are filtered out before clap sees them.

use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// Fraud model pipeline stages
#[derive(Parser, Debug)]
#[command(name = "fraud-pipeline", version, about)]
pub struct Cli {
    /// Optional TOML configuration file
    #[arg(long, global = true, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split the raw source into stratified train/test CSVs
    Preprocess(PreprocessArgs),
    /// Oversample, fit and serialize the pipeline
    Train(TrainArgs),
    /// Package a model directory as a gzip tar archive
    Package(PackageArgs),
    /// Score the test partition and write the metrics report
    Evaluate(EvaluateArgs),
    /// Score a single record with a model directory
    Score(ScoreArgs),
}

#[derive(Args, Debug)]
pub struct PreprocessArgs {
    /// Raw labeled CSV (defaults to the configured mount path)
    #[arg(long)]
    pub input: Option<PathBuf>,
    #[arg(long)]
    pub train_output: Option<PathBuf>,
    #[arg(long)]
    pub test_output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory the serialized pipeline is written to
    #[arg(long = "model-dir", env = "SM_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,
    /// Directory holding train.csv
    #[arg(long = "train", env = "SM_CHANNEL_TRAIN")]
    pub train: Option<PathBuf>,
    /// Maximum optimizer iterations
    #[arg(long = "max_iter")]
    pub max_iter: Option<usize>,
}

#[derive(Args, Debug)]
pub struct PackageArgs {
    #[arg(long = "model-dir", env = "SM_MODEL_DIR")]
    pub model_dir: PathBuf,
    /// Archive path (defaults to the configured model archive)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[arg(long)]
    pub model_archive: Option<PathBuf>,
    #[arg(long)]
    pub test: Option<PathBuf>,
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Where the archive is extracted
    #[arg(long)]
    pub extract_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    #[arg(long = "model-dir", env = "SM_MODEL_DIR")]
    pub model_dir: PathBuf,
    /// Declared content type of the body
    #[arg(long, default_value = crate::models::inference::CSV_CONTENT_TYPE)]
    pub content_type: String,
    /// Request body; read from stdin when omitted
    #[arg(long)]
    pub body: Option<String>,
}

/// Long flags accepted by `subcommand` (plus global ones), and whether each takes a value.
fn known_flags(subcommand: &str) -> Vec<(String, bool)> {
    let root = Cli::command();
    let mut flags: Vec<(String, bool)> = Vec::new();

    let mut collect = |cmd: &clap::Command| {
        for arg in cmd.get_arguments() {
            if let Some(long) = arg.get_long() {
                flags.push((long.to_string(), arg.get_action().takes_values()));
            }
        }
    };

    collect(&root);
    if let Some(sub) = root.find_subcommand(subcommand) {
        collect(sub);
    }
    flags.push(("help".to_string(), false));
    flags.push(("version".to_string(), false));
    flags
}

/// Position of the first argument that is neither a root-level flag nor its value.
fn find_subcommand(args: &[String]) -> Option<usize> {
    let root_flags = known_flags("");
    let mut i = 0;
    while i < args.len() {
        match args[i].strip_prefix("--") {
            Some(body) => {
                let takes_value = root_flags
                    .iter()
                    .any(|(f, v)| *v && f == body);
                // `--config path` consumes the next argument; `--config=path` does not
                i += if takes_value { 2 } else { 1 };
            }
            None if args[i].starts_with('-') => i += 1,
            None => return Some(i),
        }
    }
    None
}

/// Drop arguments the selected subcommand does not declare.
///
/// Handles `--flag value`, `--flag=value` and bare `--flag`; anything that
/// is not a long flag and does not follow a known value-taking flag is
/// dropped too, except the program name and the subcommand itself.
pub fn retain_known_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut kept: Vec<String> = args.next().into_iter().collect();

    let rest: Vec<String> = args.collect();
    let subcommand_pos = find_subcommand(&rest);
    let flags = match subcommand_pos {
        Some(pos) => known_flags(&rest[pos]),
        None => known_flags(""),
    };

    let lookup = |name: &str| flags.iter().find(|(f, _)| f == name).map(|(_, v)| *v);

    let mut i = 0;
    while i < rest.len() {
        let arg = &rest[i];

        if Some(i) == subcommand_pos {
            kept.push(arg.clone());
            i += 1;
            continue;
        }

        if let Some(body) = arg.strip_prefix("--") {
            let (name, inline_value) = match body.split_once('=') {
                Some((n, _)) => (n, true),
                None => (body, false),
            };
            match lookup(name) {
                Some(takes_value) => {
                    kept.push(arg.clone());
                    if takes_value && !inline_value && i + 1 < rest.len() {
                        kept.push(rest[i + 1].clone());
                        i += 1;
                    }
                }
                None => {
                    debug!(argument = %arg, "Ignoring unrecognized argument");
                    // Swallow a following value that is not itself a flag or the subcommand
                    if !inline_value
                        && i + 1 < rest.len()
                        && !rest[i + 1].starts_with("--")
                        && Some(i + 1) != subcommand_pos
                    {
                        i += 1;
                    }
                }
            }
        } else {
            debug!(argument = %arg, "Ignoring unrecognized argument");
        }
        i += 1;
    }

    kept
}
