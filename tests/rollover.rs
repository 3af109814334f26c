//! Day rollover and archival through the public logger API.

use std::io::Read;
use std::sync::Arc;

use chrono::{Duration, Local, TimeZone};
use flate2::read::GzDecoder;

use api_telemetry::observability::{Channel, ManualClock};

mod common;
use common::{entries, TestLogger};

#[tokio::test]
async fn test_rollover_archives_previous_day_once() {
    let clock = Arc::new(ManualClock::new(
        Local.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap(),
    ));
    let logger = TestLogger::start_with_clock("EFA.RF", clock.clone()).await;
    let errors = logger.channel_dir(Channel::Error);

    logger.router.route(Channel::Error, "before midnight");
    logger.router.flush().await;
    let day_one = errors.join("2024-03-09.log");
    let original = std::fs::read(&day_one).unwrap();
    assert!(String::from_utf8_lossy(&original).starts_with("#===# 2024-03-09 #===#\n"));

    clock.advance(Duration::minutes(2));
    logger.router.route(Channel::Error, "after midnight");
    logger.router.route(Channel::Error, "still after midnight");
    logger.router.flush().await;

    assert!(!day_one.exists());
    let archived = errors.join("2024-03-09.log.gz");
    let mut decoded = Vec::new();
    GzDecoder::new(std::fs::File::open(&archived).unwrap())
        .read_to_end(&mut decoded)
        .unwrap();
    assert_eq!(decoded, original);

    let today = std::fs::read_to_string(errors.join("2024-03-10.log")).unwrap();
    assert!(today.starts_with("#===# 2024-03-10 #===#\n"));
    assert_eq!(today.matches("#===#").count(), 2);
    assert_eq!(entries(&today), vec!["after midnight", "still after midnight"]);

    let gz_count = std::fs::read_dir(&errors)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".gz"))
        .count();
    assert_eq!(gz_count, 1);
}

#[tokio::test]
async fn test_channel_without_archive_flag_keeps_old_files() {
    let clock = Arc::new(ManualClock::new(
        Local.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap(),
    ));
    let logger = TestLogger::start_with_clock("EFA.RF", clock.clone()).await;

    logger.router.route(Channel::Request, "ID: one");
    logger.router.flush().await;

    clock.advance(Duration::days(1));
    logger.router.route(Channel::Request, "ID: two");
    logger.router.flush().await;

    let requests = logger.channel_dir(Channel::Request);
    assert!(requests.join("2024-03-09.yaml").exists());
    assert!(requests.join("2024-03-10.yaml").exists());
    assert!(!requests.join("2024-03-09.yaml.gz").exists());
}

#[tokio::test]
async fn test_rollover_leaves_other_channels_to_their_writers() {
    let clock = Arc::new(ManualClock::new(
        Local.with_ymd_and_hms(2024, 3, 9, 18, 0, 0).unwrap(),
    ));
    let logger = TestLogger::start_with_clock("BFA.EFA", clock.clone()).await;
    let brief = logger.channel_dir(Channel::Brief);
    let errors = logger.channel_dir(Channel::Error);

    logger.router.route(Channel::Brief, "GET / 200 - - - 1.00ms");
    logger.router.route(Channel::Error, "evening failure");
    logger.router.flush().await;

    clock.advance(Duration::days(1));
    logger.router.route(Channel::Brief, "GET / 200 - - - 2.00ms");
    logger.router.flush().await;

    assert!(brief.join("2024-03-09.log.gz").exists());
    assert!(errors.join("2024-03-09.log").exists());
    assert!(!errors.join("2024-03-09.log.gz").exists());

    logger.router.route(Channel::Error, "morning failure");
    logger.router.flush().await;
    assert!(!errors.join("2024-03-09.log").exists());
    assert!(errors.join("2024-03-09.log.gz").exists());
}
