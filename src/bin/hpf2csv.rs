use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use hpf::{Converter, Options};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Convert an HPF recording to a delimited text table
#[derive(Parser, Debug)]
#[command(name = "hpf2csv", version)]
struct Cli {
    /// Recording to convert
    input: PathBuf,

    /// Write the table here instead of to stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// RON file with conversion options, flags given here override it
    #[arg(short, long, env = "HPF2CSV_CONFIG")]
    config: Option<PathBuf>,

    /// Column separator, `tab` and `comma` are accepted as names
    #[arg(short, long, value_parser = parse_delimiter)]
    delimiter: Option<String>,

    /// Keep only every n-th sample line, use 1000 to turn 1kHz into 1Hz
    #[arg(short = 'n', long)]
    downsample: Option<NonZeroU64>,

    /// Write the recording date and channel table above the header row
    #[arg(long)]
    preamble: bool,

    /// Start every row with its line number in the recording
    #[arg(long)]
    row_index: bool,

    /// Refuse chunks larger than this many bytes
    #[arg(long)]
    max_chunk_size: Option<usize>,

    /// Show a progress bar on stderr
    #[arg(long)]
    progress: bool,

    /// Print the options in effect as RON and exit
    #[arg(long)]
    print_config: bool,

    /// Log more, may be repeated. RUST_LOG overrides this
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_delimiter(arg: &str) -> Result<String, String> {
    match arg {
        "tab" | "\\t" => Ok("\t".to_owned()),
        "comma" => Ok(",".to_owned()),
        "" => Err("delimiter may not be empty".to_owned()),
        other => Ok(other.to_owned()),
    }
}

impl Cli {
    fn options(&self) -> Result<Options> {
        let mut options = match &self.config {
            Some(path) => Options::from_ron_file(path).wrap_err("Could not load config")?,
            None => Options::default(),
        };
        if let Some(delimiter) = &self.delimiter {
            options.delimiter = delimiter.clone();
        }
        if let Some(downsample) = self.downsample {
            options.downsample = downsample;
        }
        if let Some(max_chunk_size) = self.max_chunk_size {
            options.max_chunk_size = max_chunk_size;
        }
        options.preamble |= self.preamble;
        options.row_index |= self.row_index;
        Ok(options)
    }
}

fn setup_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let options = cli.options()?;
    if cli.print_config {
        println!("{}", options.to_ron_string()?);
        return Ok(());
    }

    let sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path)
                .wrap_err_with(|| format!("Could not create output {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    convert(&cli.input, BufWriter::new(sink), &options, cli.progress)
}

fn convert(input: &Path, sink: impl Write, options: &Options, progress: bool) -> Result<()> {
    let file = File::open(input)
        .wrap_err_with(|| format!("Could not open recording {}", input.display()))?;
    let len = file.metadata().wrap_err("Could not read input metadata")?.len();
    let mut converter = Converter::new(file, sink, options);

    let bar = if progress {
        let bar = ProgressBar::new(len);
        bar.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {bytes:>9}/{total_bytes:9} [{eta}]",
            )
            .wrap_err("Invalid progress bar template")?
            .progress_chars("##-"),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    while converter
        .step()
        .wrap_err_with(|| format!("Could not convert {}", input.display()))?
    {
        bar.set_position(converter.position());
    }
    bar.finish_and_clear();

    let summary = converter.summary();
    info!(
        "wrote {} rows from {} sample lines in {} chunks",
        summary.rows_written,
        summary.sample_lines,
        summary.chunks.values().sum::<u64>()
    );
    Ok(())
}
