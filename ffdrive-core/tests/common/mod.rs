//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use ffdrive_core::ProcessControl;

/// What ffmpeg 4.4 prints when probing the `countdown.mp4` sample.
pub const COUNTDOWN_TRANSCRIPT: &str = r#"ffmpeg version 4.4 Copyright (c) 2000-2021 the FFmpeg developers
  built with gcc 10.2.1 (GCC) 20210110
  libavutil      56. 70.100 / 56. 70.100
  libavcodec     58.134.100 / 58.134.100
  libavformat    58. 76.100 / 58. 76.100
  libswresample   3.  9.100 /  3.  9.100
  libpostproc    55.  9.100 / 55.  9.100
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'countdown.mp4':
  Metadata:
    major_brand     : mp42
    minor_version   : 0
    compatible_brands: isommp42
    creation_time   : 2016-07-05T17:50:46.000000Z
  Duration: 00:00:04.37, start: 0.000000, bitrate: 322 kb/s
  Stream #0:0(und): Video: h264 (High) (avc1 / 0x31637661), yuv420p, 640x360 [SAR 1:1 DAR 16:9], 223 kb/s, 29.97 fps, 30k tbn, 29.97 tbr (default)
    Metadata:
      handler_name    : VideoHandler
      vendor_id       : [0][0][0][0]
  Stream #0:1(und): Audio: aac (LC) (mp4a / 0x6134706D), 44100 Hz, stereo, fltp, 96 kb/s (default)
    Metadata:
      creation_time   : 2016-07-05T17:50:46.000000Z
      handler_name    : IsoMedia File Produced by Google, 5-11-2011
      vendor_id       : [0][0][0][0]
Stream mapping:
  Stream #0:0 -> #0:0 (h264 (native) -> wrapped_avframe (native))
  Stream #0:1 -> #0:1 (aac (native) -> pcm_s16le (native))
Press [q] to stop, [?] for help
Output #0, null, to '/dev/null':
  Metadata:
    encoder         : Lavf58.76.100
"#;

/// An mp3 with a multi-line comment tag.
pub const MP3_TRANSCRIPT: &str = r#"ffmpeg version 4.4 Copyright (c) 2000-2021 the FFmpeg developers
  libpostproc    55.  9.100 / 55.  9.100
Input #0, mp3, from 'Easy_Lemon_30_Second.mp3':
  Metadata:
    title           : Easy Lemon 30 Second
    comment         : Royalty free
                    : Kevin MacLeod
  Duration: 00:00:31.27, start: 0.025057, bitrate: 321 kb/s
  Stream #0:0: Audio: mp3, 44100 Hz, stereo, fltp, 320 kb/s
Stream mapping:
  Stream #0:0 -> #0:0 (mp3 (mp3float) -> pcm_s16le (native))
"#;

pub const MISSING_FILE_TRANSCRIPT: &str = "ffmpeg version 4.4 Copyright (c) 2000-2021 the FFmpeg developers
  libavutil      56. 70.100 / 56. 70.100
  libpostproc    55.  9.100 / 55.  9.100
missing.mp4: No such file or directory
";

/// Writes an executable `/bin/sh` script that imitates ffmpeg.
///
/// - `-version`: prints a version line
/// - `-f null` (probe): prints `transcript` to stderr, then waits for `q`
/// - anything else: prints the output marker, writes `art` to the last
///   argument and exits with `exit_code`
#[cfg(unix)]
pub fn fake_ffmpeg(dir: &Path, transcript: &str, exit_code: i32) -> PathBuf {
    write_script(
        dir,
        &format!(
            r#"#!/bin/sh
for last; do :; done
case " $* " in
  *" -version "*)
    echo "ffmpeg version 9.9-fake"
    exit 0 ;;
  *" -f null "*)
    cat >&2 <<'TRANSCRIPT'
{transcript}
TRANSCRIPT
    read -r _ || true
    exit 0 ;;
esac
echo "Output #0, mp4, to '$last':" >&2
printf 'art' > "$last"
exit {exit_code}
"#
        ),
    )
}

/// Like [`fake_ffmpeg`], but a conversion keeps running for `seconds` after
/// creating its output, and probes of anything under an `out/` directory
/// print `output_transcript` instead of `input_transcript`.
#[cfg(unix)]
pub fn slow_fake_ffmpeg(
    dir: &Path,
    input_transcript: &str,
    output_transcript: &str,
    seconds: &str,
) -> PathBuf {
    write_script(
        dir,
        &format!(
            r#"#!/bin/sh
for last; do :; done
case " $* " in
  *" -version "*)
    echo "ffmpeg version 9.9-fake"
    exit 0 ;;
  *"/out/"*" -f null "*)
    cat >&2 <<'TRANSCRIPT'
{output_transcript}
TRANSCRIPT
    read -r _ || true
    exit 0 ;;
  *" -f null "*)
    cat >&2 <<'TRANSCRIPT'
{input_transcript}
TRANSCRIPT
    read -r _ || true
    exit 0 ;;
esac
echo "Output #0, mp4, to '$last':" >&2
printf 'art' > "$last"
sleep {seconds}
"#
        ),
    )
}

#[cfg(unix)]
fn write_script(dir: &Path, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("ffmpeg");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// ProcessControl double that records the order of control calls.
pub struct RecordingProcess {
    running: AtomicBool,
    exits_on_quit: bool,
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingProcess {
    pub fn new(exits_on_quit: bool) -> Self {
        Self {
            running: AtomicBool::new(true),
            exits_on_quit,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl ProcessControl for RecordingProcess {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn request_quit(&self) -> io::Result<()> {
        self.calls.lock().unwrap().push("quit");
        if self.exits_on_quit {
            self.finish();
        }
        Ok(())
    }

    fn kill(&self) -> io::Result<()> {
        self.calls.lock().unwrap().push("kill");
        self.finish();
        Ok(())
    }
}
