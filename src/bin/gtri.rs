use clap::Parser;
use env_logger::Builder;
use gtri::config::InferenceConfig;
use gtri::error::InferenceError;
use gtri::pipeline::{InferenceModel, solve};
use gtri::result::RuleSet;
use gtri::store::IteratedMap;
use log::{LevelFilter, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "gtri")]
#[command(about = "Infer a minimal set of graph transformation rules generating a labeled iterated map")]
struct Args {
    /// Directory with `graphs` and `rules` subfolders
    #[arg(value_name = "INPUT_DIRECTORY")]
    input_directory: PathBuf,

    /// Where to write the JSON rule set (default: standard output)
    #[arg(value_name = "OUTPUT_FILE")]
    output_file: Option<PathBuf>,

    /// Distortion modifier: 0 ignores distortion, large values approach an exact cover
    #[arg(short = 'r', long = "distortion-scale", value_name = "FLOAT", default_value_t = 1.0)]
    modifier: f64,

    /// Solver time limit in seconds (0 = no limit)
    #[arg(short = 't', long, value_name = "SECONDS", default_value_t = 60)]
    time_limit: u64,

    /// Save the built model (transitions, candidate rules, coverage) to a file
    #[arg(short = 's', long, value_name = "FILE")]
    save_model: Option<PathBuf>,

    /// Solve a previously saved model instead of reading the input directory
    #[arg(short = 'l', long, value_name = "FILE")]
    load_model: Option<PathBuf>,

    /// Also generate wildcard-labelled variants of every minimal rule
    #[arg(long = "abstract")]
    abstract_rules: bool,

    /// Also generate rules with neighbourhood context up to this radius
    #[arg(long, value_name = "K", default_value_t = 0, require_equals = true)]
    context_radius: usize,

    /// Logging verbosity (use -v for info, or -v=LEVEL for specific level)
    #[arg(long, short = 'v', value_name = "LEVEL", num_args = 0..=1, default_missing_value = "info", require_equals = true)]
    verbose: Option<Option<LogLevel>>,
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
        }
    }
}

fn main() {
    let args = Args::parse();

    let log_level = match args.verbose.clone() {
        None => LevelFilter::Off,
        Some(None) => LevelFilter::Info,
        Some(Some(level)) => level.into(),
    };
    Builder::from_default_env().filter_level(log_level).init();

    let config = InferenceConfig::default()
        .with_modifier(args.modifier)
        .unwrap_or_else(|e| {
            eprintln!("Invalid arguments: {e}");
            std::process::exit(2);
        });
    let time_limit = (args.time_limit > 0).then(|| Duration::from_secs(args.time_limit));
    let mut config = config.with_time_limit(time_limit);
    config.generator.abstract_rules = args.abstract_rules;
    config.generator.context_radius = args.context_radius;

    match infer(&args, &config) {
        Ok(rules) => {
            if let Err(e) = write_output(&rules, args.output_file.as_deref()) {
                eprintln!("{e}");
                std::process::exit(e.exit_code());
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    }
}

fn infer(args: &Args, config: &InferenceConfig) -> Result<RuleSet, InferenceError> {
    let model = match &args.load_model {
        Some(path) => InferenceModel::load(path)?,
        None => {
            let map = IteratedMap::load(&args.input_directory)?;
            InferenceModel::build(&map, config)
        }
    };
    if let Some(path) = &args.save_model {
        model.save(path)?;
    }
    solve(&model, config)
}

fn write_output(rules: &RuleSet, output: Option<&Path>) -> Result<(), InferenceError> {
    let json = rules.to_json()?;
    match output {
        None => println!("{json}"),
        Some(path) => {
            fs::write(path, json).map_err(|source| InferenceError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            info!("Rule set written to {}.", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;

    #[test]
    fn distortion_scale_has_short_and_long_forms() {
        let short = Args::try_parse_from(["gtri", "input", "-r", "2.5"]).unwrap();
        let long = Args::try_parse_from(["gtri", "input", "--distortion-scale", "2.5"]).unwrap();
        assert_eq!(short.modifier, 2.5);
        assert_eq!(long.modifier, 2.5);
        let default = Args::try_parse_from(["gtri", "input"]).unwrap();
        assert_eq!(default.modifier, 1.0);
    }
}
