use anyhow::{bail, Context};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use logpattern::colors::should_use_colors;
use logpattern::output_format::default_columns;
use logpattern::{
    ConversionPattern, ErrorStrategy, LogEvent, LogProcessor, OutputFormat, OutputFormatter, ParserConfig,
};

#[derive(Parser)]
#[command(name = "logpattern")]
#[command(about = "Parse log files written with a log4j conversion pattern into structured events")]
#[command(version)]
struct Args {
    /// Conversion pattern the log was written with, e.g. "%d [%t] %-5p %c - %m%n"
    #[arg(short = 'p', long = "pattern")]
    pattern: String,

    /// Input file (default: stdin)
    #[arg(value_name = "FILE", conflicts_with = "input_file")]
    input: Option<PathBuf>,

    /// Input file (default: stdin)
    #[arg(short = 'i', long = "input")]
    input_file: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long = "output")]
    output_file: Option<PathBuf>,

    /// Output format
    #[arg(short = 'F', long = "format", value_enum, default_value_t = OutputFormat::Jsonl)]
    format: OutputFormat,

    /// Output only these fields, in this order (comma-separated)
    #[arg(short = 'k', long = "keys", value_delimiter = ',')]
    keys: Option<Vec<String>>,

    /// Fail on first unparseable line instead of skipping it
    #[arg(long)]
    fail_fast: bool,

    /// Maximum line length
    #[arg(long, default_value = "1048576")] // 1MB
    max_line_length: usize,

    /// Force colored output
    #[arg(long, conflicts_with = "no_color")]
    color: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Print processing statistics to stderr
    #[arg(long)]
    stats: bool,

    /// Compile the pattern, print its canonical form and exit
    #[arg(long)]
    check: bool,

    /// Debug mode - show processing details
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn input_path(&self) -> Option<&PathBuf> {
        self.input.as_ref().or(self.input_file.as_ref())
    }

    fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color || self.output_file.is_some() {
            false
        } else {
            should_use_colors()
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("logpattern=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Exit code 0 when at least one event was produced, 2 when none was.
fn run(args: Args) -> anyhow::Result<i32> {
    let pattern = ConversionPattern::compile(&args.pattern).context("invalid conversion pattern")?;

    if args.check {
        println!("{}", pattern.pattern_literal());
        println!("fields: {}", default_columns(&pattern).join(","));
        for warning in pattern.warnings() {
            println!("warning: {}", warning);
        }
        return Ok(0);
    }

    if let Some(keys) = &args.keys {
        for key in keys {
            if !LogEvent::FIELD_NAMES.contains(&key.as_str()) {
                bail!(
                    "unknown key '{}' (expected one of: {})",
                    key,
                    LogEvent::FIELD_NAMES.join(", ")
                );
            }
        }
    }

    let config = ParserConfig {
        error_strategy: if args.fail_fast {
            ErrorStrategy::FailFast
        } else {
            ErrorStrategy::Skip
        },
        max_line_length: args.max_line_length,
    };

    // CSV needs a fixed header, so it defaults to every field the pattern can fill
    let keys = match (&args.keys, args.format) {
        (Some(keys), _) => Some(keys.clone()),
        (None, OutputFormat::Csv) => Some(default_columns(&pattern)),
        (None, _) => None,
    };
    let formatter = OutputFormatter::new_with_colors(args.format, keys, args.use_colors());
    let mut processor = LogProcessor::new(Arc::new(pattern), config, formatter);

    let input: Box<dyn BufRead> = match args.input_path() {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open input file '{}'", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut output: Box<dyn Write> = match &args.output_file {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("Failed to create output file '{}'", path.display()))?;
            Box::new(io::BufWriter::new(file))
        }
        None => Box::new(io::BufWriter::new(io::stdout())),
    };

    let stats = processor
        .process_stream(input, &mut output)
        .context("Processing failed")?;
    output.flush()?;

    if let Some(first) = stats.parse_errors.first() {
        eprintln!(
            "logpattern: {} line(s) could not be parsed; first at line {}: {}",
            stats.errors, first.line_number, first.error
        );
    }

    if args.stats {
        eprintln!("{}", stats);
    }

    Ok(if stats.records_output == 0 { 2 } else { 0 })
}
