use dtk_logger::{LevelFilter, Logger, Rotation};
use std::fs;
use std::time::Duration;

#[test]
fn json_lines_are_written_to_the_log_directory() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().join("logs");

    let logger = Logger::builder()
        .name("dtk-cicd")
        .console(false)
        .path(&log_dir)
        .rotation(Rotation::NEVER)
        .max_files(1)
        .json()
        .level(LevelFilter::INFO)
        .init()
        .unwrap();

    tracing::info!(step = "reformat", "step finished");
    tracing::debug!("filtered out");

    std::thread::sleep(Duration::from_millis(50));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)
        .unwrap()
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().is_some_and(|ext| ext == "log"))
        .expect("log file should be created");
    let contents = fs::read_to_string(log_file).unwrap();

    assert!(contents.contains("\"step\":\"reformat\""), "{contents}");
    assert!(!contents.contains("filtered out"));
}
