// ffdrive-core/tests/command_tests.rs
//
// Command assembly: flag injection, chain composition and option parsing.

use ffdrive_core::command::builder::OVERWRITE_FLAG;
use ffdrive_core::command::resolve_loglevel;
use ffdrive_core::{
    ChainBuilder, CommandBuilder, CoreError, InputSpec, LogLevel, OptionInput, OutputSpec,
    Platform, StreamType,
};

fn count(tokens: &[String], flags: &[&str]) -> usize {
    tokens.iter().filter(|t| flags.contains(&t.as_str())).count()
}

fn linux_builder() -> CommandBuilder {
    CommandBuilder::new("ffmpeg").with_platform(Platform::Linux)
}

#[test]
fn test_every_build_has_one_overwrite_and_one_loglevel() {
    let builder = linux_builder();
    let cases: Vec<Vec<String>> = vec![
        vec![],
        vec!["-i".into(), "in.mp4".into(), "out.mkv".into()],
        vec!["-n".into(), "-i".into(), "in.mp4".into(), "-y".into(), "out.mkv".into()],
        vec![
            "-v".into(),
            "error".into(),
            "-loglevel".into(),
            "debug".into(),
            "-i".into(),
            "a.wav".into(),
            "b.mp3".into(),
        ],
    ];

    for options in cases {
        let cmd = builder.finalize(options.clone());
        let args = cmd.args();
        assert_eq!(count(args, &["-y", "-n"]), 1, "overwrite flags in {args:?}");
        assert_eq!(count(args, &["-loglevel", "-v"]), 1, "loglevel flags in {args:?}");
        assert_eq!(args[0], "-loglevel");
    }
}

#[test]
fn test_existing_flags_are_honoured_and_duplicates_dropped() {
    let cmd = linux_builder().finalize(
        ["-n", "-v", "error", "-i", "in.mp4", "-y", "-loglevel", "debug", "out.mkv"]
            .map(String::from)
            .to_vec(),
    );
    assert_eq!(
        cmd.args(),
        ["-loglevel", "error", "-n", "-i", "in.mp4", "out.mkv"]
    );
    assert_eq!(cmd.loglevel(), LogLevel::Error);
    let dropped = cmd
        .notices()
        .iter()
        .filter(|n| n.starts_with("Dropping"))
        .count();
    assert_eq!(dropped, 2);
}

#[test]
fn test_invalid_loglevel_becomes_fatal_with_notice() {
    let cmd = linux_builder()
        .with_loglevel("chatty")
        .build(&[], &[InputSpec::new("in.mp4")], &[OutputSpec::new("out.mp4")], &[]);
    assert_eq!(cmd.loglevel(), LogLevel::Fatal);
    assert_eq!(&cmd.args()[..2], ["-loglevel", "fatal"]);
    assert!(cmd.notices().iter().any(|n| n.contains("chatty")));

    let resolved = resolve_loglevel("verbose");
    assert_eq!(resolved.level, LogLevel::Verbose);
    assert!(resolved.notice.is_none());
}

#[test]
fn test_build_orders_parts() {
    let cmd = linux_builder().with_overwrite(false).build(
        &["-hide_banner".to_string()],
        &[InputSpec::new("in.mp4").with_rate(25).with_map("0:v")],
        &[OutputSpec::new("out.mkv").with_option("-c:v", "libx264").with_flag("-an")],
        &["-t".to_string(), "10".to_string()],
    );
    assert_eq!(
        cmd.args(),
        [
            "-loglevel", "fatal", "-n", "-hide_banner", "-r", "25", "-i", "in.mp4", "-map",
            "0:v", "-t", "10", "-c:v", "libx264", "-an", "out.mkv"
        ]
    );
    assert_eq!(cmd.program(), "ffmpeg");
    assert!(!cmd.expects_output_marker());
}

#[test]
fn test_chain_clip_lands_before_input() {
    let dir = tempfile::tempdir().unwrap();
    let mut chain = ChainBuilder::new(dir.path(), true, Platform::Linux);
    chain
        .input(["in.mp4"], &["0:a"], None)
        .clip("00:00:01", "00:00:05")
        .codec("aac", Some(StreamType::Audio))
        .disable("v")
        .output(["clips/part.m4a"]);

    let out = dir.path().join("clips").join("part.m4a");
    assert_eq!(
        chain.tokens(),
        [
            "-ss".to_string(),
            "00:00:01".into(),
            "-to".into(),
            "00:00:05".into(),
            "-i".into(),
            "in.mp4".into(),
            "-map".into(),
            "0:a".into(),
            "-c:a".into(),
            "aac".into(),
            "-vn".into(),
            out.to_string_lossy().into_owned(),
        ]
    );
    assert!(dir.path().join("clips").is_dir());
    assert_eq!(chain.outputs(), [out]);

    let cmd = linux_builder().finalize(chain.take_tokens());
    assert_eq!(count(cmd.args(), &["-y", "-n"]), 1);
    assert!(chain.is_empty());
    assert!(chain.inputs().is_empty());
}

#[test]
fn test_chain_stream_specific_options() {
    let mut chain = ChainBuilder::new("/out", false, Platform::Linux);
    chain
        .rate(44100, Some(StreamType::Audio))
        .rate(30, Some(StreamType::Video))
        .channels(2, Some(StreamType::Audio))
        .channels(6, Some(StreamType::Video))
        .filter("scale=640:-1", Some(StreamType::Video))
        .filter("subtitles=x.srt", Some(StreamType::Subtitle))
        .bitrate("128k", Some(StreamType::Audio))
        .aspect_ratio("16:9", Some("v:0"))
        .format("null")
        .disable("x");

    assert_eq!(
        chain.tokens().join(" "),
        "-ar 44100 -r 30 -ac 2 -filter:v scale=640:-1 -filter subtitles=x.srt \
         -b:a 128k -aspect:v:0 16:9 -f null"
    );
}

#[test]
fn test_stream_type_parsing() {
    assert_eq!("a".parse::<StreamType>().unwrap(), StreamType::Audio);
    assert_eq!("video".parse::<StreamType>().unwrap(), StreamType::Video);
    assert!(matches!(
        "data".parse::<StreamType>(),
        Err(CoreError::InvalidInput(_))
    ));
}

#[test]
fn test_raw_option_string_is_tokenised() {
    let cmd = linux_builder()
        .passthrough(OptionInput::from_raw_string(
            "-i 'my movie.mp4' -vf \"scale=1280:-2\" out.mp4",
        ))
        .unwrap();
    assert_eq!(
        cmd.args(),
        ["-loglevel", "fatal", OVERWRITE_FLAG, "-i", "my movie.mp4", "-vf", "scale=1280:-2", "out.mp4"]
    );

    let err = linux_builder()
        .passthrough(OptionInput::from_raw_string("-i 'unterminated"))
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_)));
}

#[test]
fn test_windows_paths_are_normalised() {
    let builder = CommandBuilder::new("ffmpeg.exe").with_platform(Platform::Windows);
    let cmd = builder
        .passthrough(OptionInput::from_tokens([
            "-i",
            "C:/media/in.mp4",
            "-vf",
            "movie=C:/logo.png [wm]; [in][wm] overlay",
            "D:/out/result.mp4",
        ]))
        .unwrap();
    let args = cmd.args();
    assert!(args.contains(&r"C:\media\in.mp4".to_string()));
    assert!(args.contains(&"movie=C:/logo.png [wm]; [in][wm] overlay".to_string()));
    assert_eq!(args.last().unwrap(), r"D:\out\result.mp4");
    assert!(cmd.uses_shell());
}

#[test]
fn test_probe_command_keeps_info_output() {
    let cmd = linux_builder().probe_command("in.mp4");
    assert_eq!(cmd.args(), ["-y", "-i", "in.mp4", "-f", "null", "/dev/null"]);
    assert_eq!(cmd.loglevel(), LogLevel::Info);
    assert!(cmd.expects_output_marker());
}
