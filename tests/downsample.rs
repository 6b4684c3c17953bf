use hpf::Options;
use hpf_test_support::{int16_channel, random_samples, HpfBuilder};
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro128StarStar;
use rstest::rstest;

mod shared;
use shared::{convert, setup_tracing};

const LINES: usize = 1_000;

/// One channel with scale 1 so every row shows the raw sample, split
/// into data chunks of random length.
fn recording(samples: &[i16], seed: u64) -> Vec<u8> {
    let mut rng = Xoshiro128StarStar::seed_from_u64(seed);
    let mut builder = HpfBuilder::new()
        .header(b"datx", 1, "0")
        .channel_info(1, &[int16_channel("raw", 0, 1.0, 0.0)]);

    let mut start = 0;
    while start < samples.len() {
        let len = rng.random_range(1..=97).min(samples.len() - start);
        builder = builder.data(1, start as i64, &[&samples[start..start + len]]);
        start += len;
    }
    builder.build()
}

#[rstest]
fn kept_lines_do_not_depend_on_chunking(
    #[values(1, 2, 7, 100, 1000, 5000)] factor: u64,
    #[values(0, 1, 2)] split_seed: u64,
) {
    setup_tracing();
    let samples = random_samples(42, LINES);
    let file = recording(&samples, split_seed);
    let options = Options {
        row_index: true,
        ..shared::downsample(factor)
    };

    let (table, summary) = convert(&file, &options).unwrap();
    let expected: Vec<String> = samples
        .iter()
        .enumerate()
        .filter(|(index, _)| *index as u64 % factor == 0)
        .map(|(index, sample)| format!("{}\t{sample}", index + 1))
        .collect();
    let rows: Vec<&str> = table.lines().skip(1).collect();

    assert_eq!(rows, expected);
    assert_eq!(summary.sample_lines, LINES as u64);
    assert_eq!(summary.rows_written, expected.len() as u64);
}

#[test]
fn first_sample_is_always_kept() {
    setup_tracing();
    let samples = random_samples(7, 10);
    let file = recording(&samples, 3);

    let (table, summary) = convert(&file, &shared::downsample(u64::MAX)).unwrap();
    assert_eq!(table.lines().nth(1), Some(samples[0].to_string().as_str()));
    assert_eq!(summary.rows_written, 1);
}
