use ffdrive_core::{StreamType, Transcoder, TranscoderConfig};
use std::env;

/// Cuts a five second audio clip out of a media file and probes the result.
///
/// Usage: cargo run -p ffdrive-core --example chained_clip -- <input> [output]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let input = args.next().ok_or("usage: chained_clip <input> [output]")?;
    let output = args.next().unwrap_or_else(|| "clip.m4a".to_string());

    let config = TranscoderConfig::builder()
        .save_dir(env::temp_dir().join("ffdrive-example"))
        .loglevel("error")
        .build()
        .apply_env_overrides();
    let mut transcoder = Transcoder::new(config)?;

    println!("Using {}", transcoder.check()?);

    let meta = transcoder.probe(&input)?;
    println!("Input duration: {:?}, type: {:?}", meta.duration(), meta.media_type());

    transcoder
        .chain()
        .input([input.as_str()], &["0:a"], None)
        .clip("00:00:00", "00:00:05")
        .codec("aac", Some(StreamType::Audio))
        .disable("v")
        .output([output.as_str()]);
    let result = transcoder.run()?;
    println!("ffmpeg finished in {:.2}s", result.elapsed.as_secs_f64());

    let clip_path = transcoder.config().save_dir.join(&output);
    let clip = transcoder.probe(&clip_path.to_string_lossy())?;
    println!("Clip duration: {:?}", clip.duration());
    Ok(())
}
