mod common;

use common::*;
use parking_lot::Mutex;
use penarm_communication::{
    encode_program, ArmChannel, CancelToken, ExecutorConfig, MarlinArm, MarlinArmConfig,
    MotionExecutor,
};
use penarm_core::{
    ArmControl, ConcurrencyError, Error, EventBus, HardwareError, JobStatus, MotionCommand,
    Point3, ProgressEvent, ValidationError,
};
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> ExecutorConfig {
    ExecutorConfig {
        command_timeout: Duration::from_millis(20),
        max_retries: 2,
        retry_backoff: Duration::from_millis(1),
        progress_interval: None,
        max_history: 4,
    }
}

fn executor(transport: ScriptedTransport) -> (MotionExecutor, ArmChannel, Arc<EventBus>) {
    let channel = ArmChannel::new(transport);
    let bus = Arc::new(EventBus::new());
    (
        MotionExecutor::new(channel.clone(), bus.clone(), fast_config()),
        channel,
        bus,
    )
}

async fn collect(handle: &mut penarm_communication::JobHandle) -> Vec<ProgressEvent> {
    let mut stream = handle.take_progress().expect("progress stream");
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_job_streams_every_line_then_parks() {
    let (transport, log) = always_ok();
    let (executor, _, _) = executor(transport);

    let mut handle = executor.submit(program(), RESTING).unwrap();
    let events = collect(&mut handle).await;
    let id = handle.id();
    assert_eq!(handle.wait().await.unwrap(), JobStatus::Completed);

    let mut expected = encode_program(&program());
    expected.push(PEN_UP_LINE.to_string());
    expected.push(PARK_LINE.to_string());
    assert_eq!(log.written(), expected);

    assert_eq!(events.iter().filter(|e| e.is_final()).count(), 1);
    let last = events.last().unwrap();
    assert_eq!(last.status, JobStatus::Completed);
    assert_eq!((last.completed, last.total), (6, 6));
    assert!(events.windows(2).all(|w| w[0].completed <= w[1].completed));

    let job = executor.job(id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.finished_at.is_some());
    assert!(executor.active_job().is_none());
}

#[tokio::test]
async fn test_second_submission_is_rejected_while_busy() {
    let (transport, _) = always_ok();
    let (executor, channel, _) = executor(transport);
    let arm = MarlinArm::new(channel, MarlinArmConfig::default());

    let first = executor.submit(program(), RESTING).unwrap();
    let err = executor.submit(program(), RESTING).unwrap_err();
    match err {
        Error::Concurrency(ConcurrencyError::JobAlreadyRunning { job_id }) => {
            assert_eq!(job_id, first.id().to_string());
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        arm.home().await,
        Err(Error::Concurrency(ConcurrencyError::ChannelBusy))
    ));

    assert_eq!(first.wait().await.unwrap(), JobStatus::Completed);
    let second = executor.submit(program(), RESTING).unwrap();
    assert_eq!(second.wait().await.unwrap(), JobStatus::Completed);
}

#[tokio::test]
async fn test_timeout_is_retried() {
    let mut silences = 2;
    let (transport, log) = scripted(move |_, line| {
        if line == PEN_DOWN_LINE && silences > 0 {
            silences -= 1;
            Reply::Silent
        } else {
            Reply::Ok
        }
    });
    let (executor, _, _) = executor(transport);
    let handle = executor.submit(program(), RESTING).unwrap();
    assert_eq!(handle.wait().await.unwrap(), JobStatus::Completed);
    assert_eq!(log.count(PEN_DOWN_LINE), 3);
}

#[tokio::test]
async fn test_late_ack_is_not_resent() {
    let mut delayed = true;
    let (transport, log) = scripted(move |_, line| {
        if line == PEN_DOWN_LINE && delayed {
            delayed = false;
            Reply::Late(vec!["ok"])
        } else {
            Reply::Ok
        }
    });
    let (executor, _, _) = executor(transport);
    let handle = executor.submit(program(), RESTING).unwrap();
    assert_eq!(handle.wait().await.unwrap(), JobStatus::Completed);

    // One write per line keeps every later ack paired with its own command.
    assert_eq!(log.count(PEN_DOWN_LINE), 1);
    let mut expected = encode_program(&program());
    expected.push(PEN_UP_LINE.to_string());
    expected.push(PARK_LINE.to_string());
    assert_eq!(log.written(), expected);
}

#[tokio::test]
async fn test_late_error_reply_fails_job() {
    let (transport, log) = scripted(|_, line| {
        if line == PEN_DOWN_LINE {
            Reply::Late(vec!["Error:Printer halted"])
        } else {
            Reply::Ok
        }
    });
    let (executor, _, _) = executor(transport);
    let handle = executor.submit(program(), RESTING).unwrap();
    match handle.wait().await.unwrap() {
        JobStatus::Failed(HardwareError::Rejected { command, .. }) => {
            assert_eq!(command, PEN_DOWN_LINE)
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(log.count(PEN_DOWN_LINE), 1);
}

#[tokio::test]
async fn test_timeout_exhaustion_fails_and_still_parks() {
    let (transport, log) = scripted(|_, line| {
        if line == PEN_DOWN_LINE {
            Reply::Silent
        } else {
            Reply::Ok
        }
    });
    let (executor, _, bus) = executor(transport);
    let finals = Arc::new(Mutex::new(Vec::new()));

    let mut handle = executor.submit(program(), RESTING).unwrap();
    let sink = finals.clone();
    bus.subscribe_job(handle.id(), move |event| {
        if event.is_final() {
            sink.lock().push(event);
        }
    });
    let events = collect(&mut handle).await;
    let status = handle.wait().await.unwrap();

    match &status {
        JobStatus::Failed(HardwareError::Timeout { command, attempts, .. }) => {
            assert_eq!(command, PEN_DOWN_LINE);
            assert_eq!(*attempts, 3);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(log.count(PEN_DOWN_LINE), 3);
    let written = log.written();
    assert_eq!(&written[written.len() - 2..], [PEN_UP_LINE, PARK_LINE]);
    assert_eq!(events.last().unwrap().completed, 2);
    assert_eq!(finals.lock().len(), 1);
}

#[tokio::test]
async fn test_error_reply_fails_without_retry() {
    let (transport, log) = scripted(|index, _| {
        if index == 0 {
            Reply::Lines(vec!["Error:Unknown command"])
        } else {
            Reply::Ok
        }
    });
    let (executor, _, _) = executor(transport);
    let handle = executor.submit(program(), RESTING).unwrap();
    assert!(matches!(
        handle.wait().await.unwrap(),
        JobStatus::Failed(HardwareError::Rejected { .. })
    ));
    assert_eq!(log.count("G1 F2000"), 1);
}

#[tokio::test]
async fn test_garbled_ack_fails() {
    let (transport, _) = scripted(|index, _| {
        if index == 3 {
            Reply::Lines(vec!["o\u{fffd}"])
        } else {
            Reply::Ok
        }
    });
    let (executor, _, _) = executor(transport);
    let handle = executor.submit(program(), RESTING).unwrap();
    assert!(matches!(
        handle.wait().await.unwrap(),
        JobStatus::Failed(HardwareError::MalformedAck { .. })
    ));
}

#[tokio::test]
async fn test_busy_keepalive_then_ok() {
    let (transport, _) = scripted(|index, _| {
        if index == 1 {
            Reply::Lines(vec!["echo:busy: processing", "echo:busy: processing", "ok"])
        } else {
            Reply::Ok
        }
    });
    let (executor, _, _) = executor(transport);
    let handle = executor.submit(program(), RESTING).unwrap();
    assert_eq!(handle.wait().await.unwrap(), JobStatus::Completed);
}

#[tokio::test]
async fn test_cancel_between_commands() {
    let token = CancelToken::new();
    let trigger = token.clone();
    let (transport, log) = scripted(move |index, _| {
        if index == 1 {
            trigger.cancel();
        }
        Reply::Ok
    });
    let (executor, _, _) = executor(transport);

    let mut handle = executor.submit_with(program(), RESTING, token).unwrap();
    let events = collect(&mut handle).await;
    assert_eq!(handle.wait().await.unwrap(), JobStatus::Cancelled);

    let last = events.last().unwrap();
    assert_eq!(last.status, JobStatus::Cancelled);
    assert_eq!(last.completed, 2);
    assert_eq!(log.written().len(), 4);
    assert_eq!(log.written()[2..], [PEN_UP_LINE, PARK_LINE]);
}

#[tokio::test]
async fn test_disconnect_marks_channel() {
    let (transport, _) = scripted(|index, _| {
        if index == 2 {
            Reply::Disconnect
        } else {
            Reply::Ok
        }
    });
    let (executor, channel, _) = executor(transport);
    let handle = executor.submit(program(), RESTING).unwrap();
    assert!(matches!(
        handle.wait().await.unwrap(),
        JobStatus::Failed(HardwareError::Disconnected { .. })
    ));
    assert!(!channel.is_connected());
    assert!(matches!(
        executor.submit(program(), RESTING),
        Err(Error::Hardware(HardwareError::NotConnected))
    ));
}

#[tokio::test]
async fn test_invalid_program_rejected_before_hardware() {
    let (transport, log) = always_ok();
    let (executor, _, _) = executor(transport);
    let mut bad = program();
    bad.commands.insert(1, MotionCommand::DrawTo(penarm_core::Point::new(1.0, 1.0)));
    let err = executor.submit(bad, RESTING).unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::InvalidSequence { .. })
    ));
    assert!(err.is_pre_hardware());
    assert!(log.written().is_empty());
}

#[tokio::test]
async fn test_history_is_bounded() {
    let (transport, _) = always_ok();
    let (executor, _, _) = executor(transport);
    for _ in 0..6 {
        let handle = executor.submit(program(), RESTING).unwrap();
        handle.wait().await.unwrap();
    }
    assert_eq!(executor.jobs().len(), 4);
}

#[tokio::test]
async fn test_manual_arm_commands() {
    let (transport, log) = scripted(|_, line| {
        if line == "M114" {
            Reply::Lines(vec!["X:120.50 Y:-4.00 Z:2.25 E:0.00 Count X:1 Y:2 Z:3", "ok"])
        } else {
            Reply::Ok
        }
    });
    let arm = MarlinArm::new(ArmChannel::new(transport), MarlinArmConfig::default());
    arm.initialize().await.unwrap();
    arm.home().await.unwrap();
    arm.unlock_motors().await.unwrap();
    arm.lock_motors().await.unwrap();
    assert_eq!(
        arm.current_position().await.unwrap(),
        Point3::new(120.5, -4.0, 2.25)
    );
    arm.move_to(RESTING, 3000.0).await.unwrap();
    assert_eq!(
        log.written(),
        ["G90", "G28", "M84", "M17", "M114", PARK_LINE]
    );
}
