//! End-to-end two-process integration test for the framed ring.
//!
//! # Overview
//!
//! Validates cross-process shared-memory communication by spawning two
//! independent OS processes (writer and reader) that communicate through
//! the same named segments **concurrently**, plus a third process that
//! proves singleton-writer enforcement holds across process boundaries.
//!
//! # Test Architecture
//!
//! Self-spawning pattern: the same test executable is invoked multiple
//! times with an environment variable selecting the role of each process.
//!
//! ```text
//! [Writer]  ----[create]----[write frames...]----------------[done]
//!                  |              |    |    |
//!                  v              v    v    v
//!              [shared mem]    (concurrent reads)
//!                  |              ^    ^    ^
//!                  v              |    |    |
//! [Reader]  ------[open]---------[read frames...]------------[done]
//! ```
//!
//! # Running
//!
//! ```bash
//! cargo test -p framed-ring-core --test e2e_two_process -- --nocapture
//! ```

use std::env;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

macro_rules! log {
    ($($arg:tt)*) => {{
        let _ = writeln!(std::io::stderr(), $($arg)*);
        let _ = std::io::stderr().flush();
    }};
}

const ENV_ROLE: &str = "FRAMED_RING_E2E_ROLE";
const ENV_INDEX_NAME: &str = "FRAMED_RING_E2E_INDEX";
const ENV_DATA_NAME: &str = "FRAMED_RING_E2E_DATA";

const ROLE_WRITER: &str = "writer";
const ROLE_READER: &str = "reader";
const ROLE_SECOND_WRITER: &str = "second-writer";

const FRAME_COUNT: u64 = 20_000;
const FRAME_PAYLOAD_LEN: usize = 256;
const RING_CAPACITY: usize = 1 << 20;

fn names() -> (String, String) {
    let pid = std::process::id();
    (
        format!("/fr-e2e-idx-{pid}"),
        format!("/fr-e2e-data-{pid}"),
    )
}

fn run_writer(index_name: &str, data_name: &str) {
    use framed_ring_core::{Spec, Writer};

    log!("[WRITER] creating ring, capacity={RING_CAPACITY}");
    let spec = Spec::new(index_name, data_name, RING_CAPACITY);
    let mut writer = Writer::new(&spec).expect("writer: failed to bind ring");

    let payload = vec![0x5au8; FRAME_PAYLOAD_LEN];
    for i in 0..FRAME_COUNT {
        writer.write(&payload).expect("writer: write failed");
        if (i + 1) % 1_000 == 0 {
            std::thread::sleep(Duration::from_micros(100));
        }
    }
    log!("[WRITER] done, sequence={}", writer.sequence());
}

fn run_reader(index_name: &str, data_name: &str) {
    use framed_ring_core::{ReadStatus, Spec, Reader};

    log!("[READER] attaching to ring");
    let spec = Spec::new(index_name, data_name, RING_CAPACITY);

    let open_deadline = Instant::now() + Duration::from_secs(5);
    let mut reader = loop {
        match Reader::open(&spec) {
            Ok(r) => break r,
            Err(_) if Instant::now() < open_deadline => {
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(e) => panic!("[READER] failed to attach: {e}"),
        }
    };

    let read_deadline = Instant::now() + Duration::from_secs(10);
    let mut buf = vec![0u8; FRAME_PAYLOAD_LEN];
    let mut frames_read: u64 = 0;
    let mut consecutive_empty = 0u32;

    while Instant::now() < read_deadline {
        match reader.read(&mut buf) {
            Ok(n) => {
                assert_eq!(n, FRAME_PAYLOAD_LEN);
                frames_read += 1;
                consecutive_empty = 0;
            }
            Err(ReadStatus::Empty) => {
                consecutive_empty += 1;
                if consecutive_empty > 100_000 && frames_read > 0 {
                    break;
                }
                std::hint::spin_loop();
            }
            Err(ReadStatus::Overwritten) => {
                log!("[READER] lapped by writer, resuming from current tail");
                reader = Reader::join(&spec).expect("rejoin after overwrite");
            }
            Err(other) => panic!("[READER] unexpected read status: {other:?}"),
        }
    }

    log!("[READER] frames read: {frames_read}/{FRAME_COUNT}");
    assert!(frames_read > 0, "reader observed no frames");
}

fn run_second_writer(index_name: &str, data_name: &str) {
    use framed_ring_core::{Error, Spec, Writer};

    let spec = Spec::new(index_name, data_name, RING_CAPACITY);
    // Give the first writer a moment to win the race for the semaphore.
    std::thread::sleep(Duration::from_millis(50));
    match Writer::new(&spec) {
        Err(Error::SingletonViolation { .. }) => {
            log!("[SECOND-WRITER] correctly rejected");
        }
        other => panic!("[SECOND-WRITER] expected SingletonViolation, got {other:?}"),
    }
}

#[test]
fn e2e_two_process_writer_reader_and_singleton_enforcement() {
    if let Ok(role) = env::var(ENV_ROLE) {
        let index_name = env::var(ENV_INDEX_NAME).expect("index name not set");
        let data_name = env::var(ENV_DATA_NAME).expect("data name not set");
        match role.as_str() {
            ROLE_WRITER => run_writer(&index_name, &data_name),
            ROLE_READER => run_reader(&index_name, &data_name),
            ROLE_SECOND_WRITER => run_second_writer(&index_name, &data_name),
            other => panic!("unknown role: {other}"),
        }
        return;
    }

    let (index_name, data_name) = names();
    let exe = env::current_exe().expect("failed to get current executable path");

    let spawn = |role: &str| {
        Command::new(&exe)
            .arg("--exact")
            .arg("e2e_two_process_writer_reader_and_singleton_enforcement")
            .env(ENV_ROLE, role)
            .env(ENV_INDEX_NAME, &index_name)
            .env(ENV_DATA_NAME, &data_name)
            .stderr(Stdio::inherit())
            .spawn()
            .unwrap_or_else(|e| panic!("failed to spawn {role}: {e}"))
    };

    log!("[ORCHESTRATOR] spawning writer");
    let mut writer_proc = spawn(ROLE_WRITER);

    std::thread::sleep(Duration::from_millis(5));

    log!("[ORCHESTRATOR] spawning reader and a competing second writer");
    let mut reader_proc = spawn(ROLE_READER);
    let mut second_writer_proc = spawn(ROLE_SECOND_WRITER);

    let writer_status = writer_proc.wait().expect("failed to wait for writer");
    let reader_status = reader_proc.wait().expect("failed to wait for reader");
    let second_writer_status = second_writer_proc
        .wait()
        .expect("failed to wait for second writer");

    assert!(writer_status.success(), "writer process failed: {writer_status}");
    assert!(reader_status.success(), "reader process failed: {reader_status}");
    assert!(
        second_writer_status.success(),
        "second writer process failed: {second_writer_status}"
    );

    log!("[ORCHESTRATOR] concurrent test passed");
}
