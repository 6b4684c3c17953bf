#![allow(dead_code)]
use std::io::Cursor;

use hpf::{Converter, Error, Options, Summary};
use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt = tracing_subscriber::fmt::layer()
        .with_test_writer()
        .with_line_number(true);

    let _ignore_err = tracing_subscriber::registry()
        .with(filter)
        .with(fmt)
        .with(ErrorLayer::default())
        .try_init();
}

pub fn convert(file: &[u8], options: &Options) -> Result<(String, Summary), Error> {
    let mut converter = Converter::new(Cursor::new(file), Vec::new(), options);
    let summary = converter.run()?;
    let table = String::from_utf8(converter.into_sink()).expect("table is utf8");
    Ok((table, summary))
}

pub fn downsample(factor: u64) -> Options {
    Options {
        downsample: factor.try_into().expect("factor is not zero"),
        ..Options::default()
    }
}

/// Everything after the header row
pub fn data_rows(table: &str) -> Vec<&str> {
    table.lines().skip(1).collect()
}
