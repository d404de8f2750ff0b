// ffdrive-core/tests/parser_tests.rs

mod common;

use std::sync::Arc;

use common::{COUNTDOWN_TRANSCRIPT, MISSING_FILE_TRANSCRIPT, MP3_TRANSCRIPT};
use ffdrive_core::probe::{CONTINUATION_JOINER, HeaderRules};
use ffdrive_core::{CoreError, LogParser, StreamKind};

#[test]
fn test_video_stream_attributes() {
    let meta = LogParser::new().parse(COUNTDOWN_TRANSCRIPT).unwrap();
    let video = meta.video_streams().next().expect("video stream");

    assert_eq!(video.index.as_deref(), Some("0:0"));
    for (key, value) in [
        ("codec", "h264"),
        ("dimensions", "640x360"),
        ("SAR", "1:1"),
        ("DAR", "16:9"),
        ("data_rate", "223 kb/s"),
        ("fps", "29.97"),
        ("tbn", "30k"),
        ("tbr", "29.97"),
        ("handler_name", "VideoHandler"),
    ] {
        assert_eq!(video.get(key), Some(value), "video attribute {key}");
    }
    assert_eq!(video.get("tbc"), None);
}

#[test]
fn test_container_getters() {
    let meta = LogParser::new().parse(COUNTDOWN_TRANSCRIPT).unwrap();

    assert_eq!(meta.duration(), Some("00:00:04.37"));
    assert_eq!(meta.bitrate(), Some("322 kb/s"));
    assert_eq!(meta.start(), Some("0.000000"));
    assert_eq!(meta.fps(), Some("29.97"));
    assert_eq!(meta.media_type(), Some("mp4"));
    assert_eq!(meta.duration_seconds(), Some(4.37));
    assert_eq!(meta.container()["major_brand"], "mp42");
    assert_eq!(meta.container()["compatible_brands"], "isommp42");
}

#[test]
fn test_flat_tags_last_stream_wins() {
    let meta = LogParser::new().parse(COUNTDOWN_TRANSCRIPT).unwrap();
    let tags = meta.tags();

    assert_eq!(tags["codec"], "aac");
    assert_eq!(tags["handler_name"], "IsoMedia File Produced by Google, 5-11-2011");
    assert_eq!(tags["dimensions"], "640x360");
    assert_eq!(tags["sample_rate"], "44100 Hz");
    assert_eq!(tags["channels"], "stereo");
    assert_eq!(tags["bitrate"], "96 kb/s");

    // the per-stream view keeps what the flat map overwrote
    let kinds: Vec<StreamKind> = meta.streams().iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![StreamKind::Video, StreamKind::Audio]);
    assert_eq!(meta.streams()[0].get("codec"), Some("h264"));
}

#[test]
fn test_container_bitrate_beats_stream_bitrate() {
    let meta = LogParser::new().parse(MP3_TRANSCRIPT).unwrap();
    assert_eq!(meta.bitrate(), Some("321 kb/s"));
    assert_eq!(meta.tags()["bitrate"], "320 kb/s");
    assert_eq!(meta.media_type(), Some("mp3"));
    assert_eq!(meta.fps(), None);
}

#[test]
fn test_continuation_line_is_folded() {
    let meta = LogParser::new().parse(MP3_TRANSCRIPT).unwrap();
    assert_eq!(
        meta.container()["comment"],
        format!("Royalty free{CONTINUATION_JOINER}Kevin MacLeod")
    );
    assert_eq!(meta.container()["title"], "Easy Lemon 30 Second");
    assert!(!meta.container().contains_key(""));
}

#[test]
fn test_missing_input_section_is_unprobeable() {
    let err = LogParser::new().parse(MISSING_FILE_TRANSCRIPT).unwrap_err();
    match err {
        CoreError::Unprobeable(msg) => assert_eq!(msg, "missing.mp4: No such file or directory"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_empty_transcript() {
    assert!(matches!(
        LogParser::new().parse("  \n"),
        Err(CoreError::EmptyTranscript)
    ));
}

#[test]
fn test_misdetection_is_reported_as_corrupt() {
    let transcript = format!(
        "[mp3 @ 0x55d0] Format mp3 detected only with low score of 1, misdetection possible!\n{COUNTDOWN_TRANSCRIPT}"
    );
    assert!(matches!(
        LogParser::new().parse(&transcript),
        Err(CoreError::CorruptMedia(_))
    ));
}

#[test]
fn test_only_first_input_is_probed() {
    let second = COUNTDOWN_TRANSCRIPT
        .split_once("Input #0")
        .map(|(_, rest)| rest.split_once("Stream mapping").unwrap().0)
        .unwrap()
        .replace("h264", "vp9");
    let transcript = COUNTDOWN_TRANSCRIPT.replacen(
        "Stream mapping",
        &format!("Input #1{second}Stream mapping"),
        1,
    );
    let meta = LogParser::new().parse(&transcript).unwrap();
    assert_eq!(meta.streams()[0].get("codec"), Some("h264"));
    assert_eq!(meta.streams().len(), 2);
}

struct UppercaseCodecRules;

impl HeaderRules for UppercaseCodecRules {
    fn version(&self) -> &str {
        "test"
    }

    fn parse_stream_header(&self, line: &str) -> Vec<String> {
        if line.contains("Video:") {
            vec!["codec: H264".to_string()]
        } else {
            Vec::new()
        }
    }
}

#[test]
fn test_rules_can_be_swapped() {
    let parser = LogParser::with_rules(Arc::new(UppercaseCodecRules));
    assert_eq!(parser.rules_version(), "test");
    let meta = parser.parse(COUNTDOWN_TRANSCRIPT).unwrap();
    assert_eq!(meta.streams()[0].get("codec"), Some("H264"));
    assert_eq!(meta.streams()[0].get("fps"), None);
}

#[test]
fn test_metadata_serialises_to_json() {
    let meta = LogParser::new().parse(COUNTDOWN_TRANSCRIPT).unwrap();
    let json = serde_json::to_value(&meta).unwrap();

    assert_eq!(json["media_type"], "mp4");
    assert_eq!(json["container"]["Duration"], "00:00:04.37");
    assert_eq!(json["streams"][1]["kind"], "audio");
    assert_eq!(json["streams"][1]["index"], "0:1");
    assert_eq!(json["tags"]["codec"], "aac");
}

/// The countdown transcript with its input and output paths replaced.
fn countdown_with_paths(input: &str, output: &str) -> String {
    COUNTDOWN_TRANSCRIPT
        .replace("from 'countdown.mp4'", &format!("from '{input}'"))
        .replace("to '/dev/null'", &format!("to '{output}'"))
}

#[test]
fn test_paths_containing_section_words() {
    for (input, output) in [
        ("/home/u/Streams/countdown.mp4", "/home/u/Streams/out.mp4"),
        ("/home/u/Inputs/countdown.mp4", "/home/u/Inputs/out.mp4"),
        ("/srv/Input #2/Stream #0:1.mp4", "/srv/Output #1/Stream mapping.mp4"),
    ] {
        let transcript = countdown_with_paths(input, output);
        let meta = LogParser::new().parse(&transcript).unwrap();

        assert_eq!(meta.duration(), Some("00:00:04.37"), "duration for {input}");
        assert_eq!(meta.fps(), Some("29.97"), "fps for {input}");
        assert_eq!(meta.media_type(), Some("mp4"));
        assert_eq!(meta.streams().len(), 2, "streams for {input}");
        assert_eq!(meta.streams()[1].get("sample_rate"), Some("44100 Hz"));
    }
}

#[test]
fn test_tag_values_containing_section_words() {
    let transcript = COUNTDOWN_TRANSCRIPT
        .replace(
            "    minor_version   : 0",
            "    title           : Stream mapping: Input #1 to Output #2",
        )
        .replace(
            "handler_name    : VideoHandler",
            "handler_name    : Stream #7 from Output #2",
        );
    let meta = LogParser::new().parse(&transcript).unwrap();

    assert_eq!(meta.duration(), Some("00:00:04.37"));
    assert_eq!(meta.container()["title"], "Stream mapping: Input #1 to Output #2");
    assert_eq!(meta.streams().len(), 2);
    assert_eq!(
        meta.streams()[0].get("handler_name"),
        Some("Stream #7 from Output #2")
    );
}

#[test]
fn test_output_section_stays_out_of_tags() {
    let meta = LogParser::new().parse(COUNTDOWN_TRANSCRIPT).unwrap();
    assert!(!meta.trailer().contains_key("encoder"));
    assert!(!meta.tags().contains_key("encoder"));
}
