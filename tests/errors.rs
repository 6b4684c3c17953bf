use std::io::Cursor;

use hpf::chunk::{ChunkKind, ReadError};
use hpf::interpret::{self, channel_info, data, event_definition, header};
use hpf::record;
use hpf::{Converter, Error, Options};
use hpf_test_support::{int16_channel, point_event, two_channel_recording, HpfBuilder};
use rstest::rstest;

mod shared;
use shared::{convert, setup_tracing};

const RAW: &[i16] = &[1, 2, 3];

fn convert_err(file: &[u8]) -> Error {
    convert(file, &Options::default()).unwrap_err()
}

fn recording_start() -> HpfBuilder {
    HpfBuilder::new().header(b"datx", 1, "2021-03-04T05:06:07.123456")
}

/// The interpreter error of a chunk, panics on any other error
fn chunk_err(err: Error) -> (ChunkKind, interpret::Error) {
    match err {
        Error::Chunk { kind, error, .. } => (kind, error),
        other => panic!("expected a chunk error, got: {other}"),
    }
}

#[test]
fn truncated_chunk() {
    setup_tracing();
    let file = two_channel_recording(&[[RAW, RAW]]).build();
    let file = &file[..file.len() - 3];

    let err = convert_err(file);
    assert!(
        matches!(err, Error::Read(ReadError::TruncatedChunk { .. })),
        "{err}"
    );
}

#[test]
fn truncated_second_data_chunk() {
    setup_tracing();
    let full = two_channel_recording(&[[RAW, RAW], [RAW, RAW]]).build();
    let one_chunk = two_channel_recording(&[[RAW, RAW]]).build();
    // cut the second data chunk just after its prefix
    let file = &full[..one_chunk.len() + 20];

    let err = convert_err(file);
    assert!(matches!(
        err,
        Error::Read(ReadError::TruncatedChunk { available: 20, .. })
    ));
}

#[test]
fn chunk_too_large() {
    setup_tracing();
    let file = two_channel_recording(&[[RAW, RAW]]).build();
    let options = Options {
        max_chunk_size: 64,
        ..Options::default()
    };

    let err = convert(&file, &options).unwrap_err();
    assert!(matches!(
        err,
        Error::Read(ReadError::ChunkTooLarge { offset: 0, max: 64, .. })
    ));
    assert!(
        err.to_string().ends_with("more than the maximum chunk size of 64 bytes"),
        "{err}"
    );
}

#[test]
fn chunk_too_small() {
    setup_tracing();
    let mut file = 0x1000u64.to_le_bytes().to_vec();
    file.extend_from_slice(&8u64.to_le_bytes());

    let err = convert_err(&file);
    assert!(matches!(
        err,
        Error::Read(ReadError::ChunkTooSmall { declared: 8, .. })
    ));
    assert_eq!(
        err.to_string(),
        "Chunk at byte 0 declares 8 bytes, that is less than its own 16 byte prefix"
    );
}

#[test]
fn unknown_chunk_kind() {
    setup_tracing();
    let file = recording_start().raw_chunk(0x7000, &[0; 8]).build();

    let err = convert_err(&file);
    assert!(matches!(
        err,
        Error::Read(ReadError::UnknownChunkKind { tag: 0x7000, .. })
    ));
}

#[rstest]
#[case::header(recording_start().header(b"datx", 1, "0"), ChunkKind::Header)]
#[case::channel_info(
    two_channel_recording(&[]).channel_info(7, &[int16_channel("x", 0, 1.0, 0.0)]),
    ChunkKind::ChannelInfo
)]
#[case::event_definition(
    recording_start()
        .event_definitions(&[point_event("trigger", 1)])
        .event_definitions(&[point_event("trigger", 1)]),
    ChunkKind::EventDefinition
)]
fn duplicate_chunks(#[case] file: HpfBuilder, #[case] duplicated: ChunkKind) {
    setup_tracing();
    let (kind, err) = chunk_err(convert_err(&file.build()));
    assert_eq!(kind, duplicated);
    assert!(matches!(err, interpret::Error::UnexpectedDuplicateChunk(k) if k == duplicated));
}

#[test]
fn error_names_kind_and_offset() {
    setup_tracing();
    let file = recording_start().header(b"datx", 1, "0");
    let offset = recording_start().len();

    let err = convert_err(&file.build());
    assert_eq!(
        err.to_string(),
        format!(
            "Invalid header chunk at byte {offset}: \
            A file may contain only one header chunk, found a second"
        )
    );
}

#[test]
fn group_mismatch() {
    setup_tracing();
    let file = two_channel_recording(&[]).data(8, 0, &[RAW, RAW]).build();

    let (kind, err) = chunk_err(convert_err(&file));
    assert_eq!(kind, ChunkKind::Data);
    assert!(matches!(
        err,
        interpret::Error::Data(data::Error::GroupMismatch {
            expected: 7,
            found: 8
        })
    ));
}

#[test]
fn channel_count_mismatch() {
    setup_tracing();
    let file = two_channel_recording(&[]).data(7, 0, &[RAW]).build();

    let (_, err) = chunk_err(convert_err(&file));
    assert!(matches!(
        err,
        interpret::Error::Data(data::Error::ChannelCountMismatch {
            expected: 2,
            found: 1
        })
    ));
}

#[test]
fn data_before_channel_info() {
    setup_tracing();
    let file = recording_start().data(7, 0, &[RAW]).build();

    let (_, err) = chunk_err(convert_err(&file));
    assert!(matches!(
        err,
        interpret::Error::Data(data::Error::ChannelInfoMissing)
    ));
}

#[test]
fn channels_with_different_sample_counts() {
    setup_tracing();
    let file = two_channel_recording(&[]).data(7, 0, &[RAW, &[1, 2]]).build();

    let (_, err) = chunk_err(convert_err(&file));
    assert!(matches!(
        err,
        interpret::Error::Data(data::Error::Reassemble(
            hpf::reassemble::Error::SampleCountMismatch {
                channel: 1,
                expected: 3,
                found: 2
            }
        ))
    ));
}

#[test]
fn channel_slice_outside_chunk() {
    setup_tracing();
    let file = two_channel_recording(&[])
        .data_with_layout(7, 0, 2, &[(48, 6), (48, 6000)], &[0; 6])
        .build();

    let (_, err) = chunk_err(convert_err(&file));
    assert!(matches!(
        err,
        interpret::Error::Data(data::Error::Reassemble(
            hpf::reassemble::Error::Field { channel: 1, .. }
        ))
    ));
}

#[test]
fn odd_channel_length_is_truncated() {
    setup_tracing();
    // 7 bytes per channel: three samples and one stray byte
    let mut tail = Vec::new();
    for sample in [10i16, 20, 30] {
        tail.extend_from_slice(&sample.to_le_bytes());
    }
    tail.push(0xFF);
    let file = two_channel_recording(&[])
        .data_with_layout(7, 0, 2, &[(48, 7), (48, 7)], &tail)
        .build();

    let (table, _) = convert(&file, &Options::default()).unwrap();
    assert_eq!(table, "Voltage\tCurrent\n21\t5\n41\t10\n61\t15\n");
}

#[rstest]
#[case("UInt16")]
#[case("Double")]
#[case("Int64")]
fn unsupported_data_type(#[case] data_type: &str) {
    setup_tracing();
    let channel = int16_channel("x", 0, 1.0, 0.0).field("DataType", data_type);
    let file = recording_start().channel_info(1, &[channel]).build();

    let (kind, err) = chunk_err(convert_err(&file));
    assert_eq!(kind, ChunkKind::ChannelInfo);
    let interpret::Error::ChannelInfo(channel_info::Error::Channel { error, .. }) = err else {
        panic!("expected a channel record error, got: {err}");
    };
    assert!(matches!(
        error,
        record::Error::UnsupportedFieldValue { field: "DataType", value } if value == data_type
    ));
}

#[test]
fn unsupported_channel_type() {
    setup_tracing();
    let channel = int16_channel("x", 0, 1.0, 0.0).field("ChannelType", "MonotonicDataChannel");
    let file = recording_start().channel_info(1, &[channel]).build();

    let err = convert_err(&file);
    assert!(err.to_string().contains("ChannelType"), "{err}");
    assert!(err.to_string().contains("MonotonicDataChannel"), "{err}");
}

#[test]
fn enumerations_ignore_case() {
    setup_tracing();
    let channel = int16_channel("x", 0, 1.0, 0.0)
        .field("ChannelType", "randomdatachannel")
        .field("DataType", "INT16");
    let file = recording_start()
        .channel_info(1, &[channel])
        .data(1, 0, &[RAW])
        .build();

    assert!(convert(&file, &Options::default()).is_ok());
}

#[rstest]
#[case::wrong_root(
    "<ChannelInformationData></ChannelInformationData>",
    "Expected root element <RecordingDate> but found <ChannelInformationData>"
)]
#[case::missing_root("", "Descriptive record is empty, expected root element <RecordingDate>")]
fn header_root_element(#[case] xml: &str, #[case] message: &str) {
    setup_tracing();
    let mut payload = Vec::new();
    payload.extend_from_slice(b"datx");
    payload.extend_from_slice(&[0; 16]);
    payload.extend_from_slice(xml.as_bytes());
    let file = HpfBuilder::new().raw_chunk(0x1000, &payload).build();

    let (_, err) = chunk_err(convert_err(&file));
    assert!(matches!(
        err,
        interpret::Error::Header(header::Error::Record(_))
    ));
    assert_eq!(err.to_string(), message);
}

#[test]
fn channel_record_count_must_match() {
    setup_tracing();
    let xml = format!(
        "<ChannelInformationData>{}</ChannelInformationData>",
        int16_channel("x", 0, 1.0, 0.0).to_xml()
    );
    let file = recording_start().channel_info_xml(1, 2, &xml).build();

    let (_, err) = chunk_err(convert_err(&file));
    assert!(matches!(
        err,
        interpret::Error::ChannelInfo(channel_info::Error::RecordCountMismatch {
            declared: 2,
            found: 1
        })
    ));
}

#[test]
fn repeated_data_index_message() {
    setup_tracing();
    let channels = [
        int16_channel("a", 0, 1.0, 0.0),
        int16_channel("b", 0, 1.0, 0.0),
    ];
    let file = recording_start().channel_info(1, &channels).build();

    let (_, err) = chunk_err(convert_err(&file));
    assert_eq!(
        err.to_string(),
        "Data index 0 is used by more than one channel"
    );
}

#[rstest]
#[case::out_of_range(&[2, 0])]
#[case::repeated(&[0, 0])]
#[case::negative(&[-1, 0])]
fn bad_data_index(#[case] indices: &[i64]) {
    setup_tracing();
    let channels: Vec<_> = indices
        .iter()
        .map(|i| int16_channel("x", 0, 1.0, 0.0).field("DataIndex", i))
        .collect();
    let file = recording_start().channel_info(1, &channels).build();

    let (_, err) = chunk_err(convert_err(&file));
    assert!(
        matches!(
            err,
            interpret::Error::ChannelInfo(
                channel_info::Error::BadChannelIndex { .. }
                    | channel_info::Error::DuplicateChannelIndex(0)
            )
        ),
        "{err}"
    );
}

#[rstest]
#[case::missing_scale(int16_channel("x", 0, 1.0, 0.0).without("DataScale"))]
#[case::bad_number(int16_channel("x", 0, 1.0, 0.0).field("DataOffset", "1,5"))]
#[case::lowercase_bool(int16_channel("x", 0, 1.0, 0.0).field("UsesSensorValues", "true"))]
fn invalid_channel_record(#[case] channel: hpf_test_support::XmlRecord) {
    setup_tracing();
    let file = recording_start().channel_info(1, &[channel]).build();

    let (_, err) = chunk_err(convert_err(&file));
    assert!(matches!(
        err,
        interpret::Error::ChannelInfo(channel_info::Error::Channel { position: 0, .. })
    ));
}

#[rstest]
#[case::class(point_event("x", 1).field("Class", 2), "Class")]
#[case::zero_id(point_event("x", 0), "ID")]
#[case::ranged(point_event("x", 1).field("Type", "Range"), "Type")]
fn unsupported_event_definition(#[case] definition: hpf_test_support::XmlRecord, #[case] field: &str) {
    setup_tracing();
    let file = recording_start().event_definitions(&[definition]).build();

    let (kind, err) = chunk_err(convert_err(&file));
    assert_eq!(kind, ChunkKind::EventDefinition);
    let interpret::Error::EventDefinition(event_definition::Error::Definition { error, .. }) = err
    else {
        panic!("expected a definition error, got: {err}");
    };
    assert!(matches!(
        error,
        record::Error::UnsupportedFieldValue { field: f, .. } if f == field
    ));
}

#[test]
fn malformed_recording_date() {
    setup_tracing();
    let file = HpfBuilder::new()
        .header(b"datx", 1, "2021-13-04T05:06:07.123456")
        .build();

    let (_, err) = chunk_err(convert_err(&file));
    assert!(matches!(
        err,
        interpret::Error::Header(header::Error::RecordingDate(_))
    ));
}

#[test]
fn conversion_stops_at_first_fatal_error() {
    setup_tracing();
    let file = two_channel_recording(&[[&[10, 20, 30], &[100, 200, 300]]])
        .data(8, 3, &[&[40], &[400]])
        .data(7, 3, &[&[40], &[400]])
        .build();
    let bad_chunk = two_channel_recording(&[[&[10, 20, 30], &[100, 200, 300]]]).len() as u64;

    let mut converter = Converter::new(Cursor::new(&file), Vec::new(), &Options::default());
    let err = converter.run().unwrap_err();
    assert!(matches!(
        err,
        Error::Chunk {
            kind: ChunkKind::Data,
            offset,
            ..
        } if offset == bad_chunk
    ));

    let err = converter.run().unwrap_err();
    assert!(
        matches!(err, Error::AfterFatal { offset } if offset == bad_chunk),
        "{err}"
    );
    assert!(matches!(converter.step(), Err(Error::AfterFatal { .. })));

    let table = String::from_utf8(converter.into_sink()).unwrap();
    assert_eq!(table, "Voltage\tCurrent\n21\t50\n41\t100\n61\t150\n");
}
