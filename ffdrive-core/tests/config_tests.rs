// ffdrive-core/tests/config_tests.rs
//
// Configuration loading from TOML files and environment overrides.

use std::env;
use std::fs;
use std::path::PathBuf;

use ffdrive_core::config::{ENV_FFMPEG, ENV_LOGLEVEL, ENV_OVERWRITE, ENV_REPORT_PROGRESS, ENV_SAVE_DIR};
use ffdrive_core::{CommandBuilder, CoreError, LogLevel, ShellMode, TranscoderConfig};
use tempfile::tempdir;

#[test]
fn test_config_file_with_partial_keys() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("ffdrive.toml");
    fs::write(
        &path,
        r#"
executable = "/opt/ffmpeg/bin/ffmpeg"
save_dir = "/srv/media/out"
overwrite = false
loglevel = "error"
shell = "never"
execute_timeout_secs = 600
"#,
    )?;

    let config = TranscoderConfig::from_file(&path)?;
    assert_eq!(config.executable, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
    assert_eq!(config.save_dir, PathBuf::from("/srv/media/out"));
    assert!(!config.overwrite);
    assert_eq!(config.shell, ShellMode::Never);
    assert_eq!(config.execute_timeout_secs, Some(600));
    // untouched keys keep their defaults
    assert!(config.create_folders);
    assert_eq!(config.probe_timeout_secs, Some(30));
    assert_eq!(config.monitor_interval_ms, 1000);

    let cmd = CommandBuilder::from_config(&config).finalize(vec!["out.mp4".to_string()]);
    assert_eq!(cmd.program(), "/opt/ffmpeg/bin/ffmpeg");
    assert_eq!(cmd.loglevel(), LogLevel::Error);
    assert!(cmd.args().contains(&"-n".to_string()));
    assert!(!cmd.uses_shell());
    Ok(())
}

#[test]
fn test_config_file_errors() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    let missing = TranscoderConfig::from_file(dir.path().join("absent.toml"));
    assert!(matches!(missing, Err(CoreError::Io(_))));

    let path = dir.path().join("broken.toml");
    fs::write(&path, "overwrite = \"sometimes\"\n")?;
    let broken = TranscoderConfig::from_file(&path);
    assert!(matches!(broken, Err(CoreError::TomlParse(_))));
    Ok(())
}

#[test]
fn test_validation_rejects_unusable_settings() {
    let empty = TranscoderConfig::builder().executable("").build();
    assert!(matches!(empty.validate(), Err(CoreError::Config(_))));

    let zero_interval = TranscoderConfig::builder().monitor_interval_ms(0).build();
    assert!(zero_interval.validate().is_err());

    let zero_timeout = TranscoderConfig::builder().execute_timeout_secs(Some(0)).build();
    assert!(zero_timeout.validate().is_err());

    // corrected later, at build time
    let odd_level = TranscoderConfig::builder().loglevel("loud").build();
    assert!(odd_level.validate().is_ok());
}

#[test]
fn test_env_var_overrides() {
    let vars = [ENV_FFMPEG, ENV_LOGLEVEL, ENV_SAVE_DIR, ENV_OVERWRITE, ENV_REPORT_PROGRESS];
    // SAFETY: no other test in this binary touches these variables.
    unsafe {
        for var in vars {
            env::remove_var(var);
        }
        env::set_var(ENV_FFMPEG, "/usr/local/bin/ffmpeg");
        env::set_var(ENV_LOGLEVEL, "warning");
        env::set_var(ENV_SAVE_DIR, "/tmp/ffdrive-env");
        env::set_var(ENV_OVERWRITE, "no");
        env::set_var(ENV_REPORT_PROGRESS, "maybe");
    }

    let config = TranscoderConfig::default().apply_env_overrides();
    assert_eq!(config.executable, PathBuf::from("/usr/local/bin/ffmpeg"));
    assert_eq!(config.loglevel, "warning");
    assert_eq!(config.save_dir, PathBuf::from("/tmp/ffdrive-env"));
    assert!(!config.overwrite);
    // unrecognised booleans keep the previous value
    assert!(!config.report_progress);

    unsafe {
        for var in vars {
            env::remove_var(var);
        }
    }

    let untouched = TranscoderConfig::default().apply_env_overrides();
    assert_eq!(untouched, TranscoderConfig::default());
}
