//! End-to-end session behavior over the in-memory transport.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use xesremote::frame::{Language, RunRequest};
use xesremote::session::{Session, SessionConfig, SessionError, SessionEvent, SessionState};
use xesremote::transport::{memory_pair, CloseReason, RemoteEnd, UpgradeInfo};

async fn next_event(events: &mut mpsc::Receiver<SessionEvent>) -> SessionEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event should arrive")
        .expect("event channel should stay open")
}

async fn expect_handshake(remote: &mut RemoteEnd) -> String {
    assert_eq!(remote.recv().await.as_deref(), Some("{}"));
    remote.recv().await.expect("run request should follow the primer")
}

fn b64_frame(tag: char, data: &str) -> String {
    format!("{tag}{}", STANDARD.encode(data))
}

#[tokio::test]
async fn interactive_program_round_trip() {
    let (transport, mut remote) = memory_pair();
    let (tx, mut events) = mpsc::channel(16);
    let request = RunRequest::new(Language::Cpp, "int main(){}");
    let session = Session::with_transport(request, transport, tx, SessionConfig::default());

    remote.open(UpgradeInfo::new().with_header("x-host", "worker-3"));
    let run = expect_handshake(&mut remote).await;
    assert_eq!(
        run,
        r#"7{"xml":"int main(){}","type":"run","lang":"cpp","original_id":1,"args":[]}"#
    );

    remote.send_text(b64_frame('7', "compiling"));
    assert!(matches!(
        next_event(&mut events).await,
        SessionEvent::SystemMessage(msg) if msg == "compiling"
    ));

    remote.send_text("3");
    assert!(matches!(next_event(&mut events).await, SessionEvent::Open));
    assert_eq!(session.state(), SessionState::Open);
    assert_eq!(session.host().await.unwrap(), "worker-3");

    session.send("ls\n").await.unwrap();
    assert_eq!(remote.recv().await.as_deref(), Some("1ls\n"));
    remote.send_text(b64_frame('1', "ls\n"));
    remote.send_text(b64_frame('1', "file.txt\n"));
    assert!(matches!(
        next_event(&mut events).await,
        SessionEvent::Output(out) if out == "file.txt\n"
    ));

    remote.send_text("2");
    remote.send_text("1@@@");
    assert!(matches!(
        next_event(&mut events).await,
        SessionEvent::Error(SessionError::Protocol(_))
    ));

    remote.close(CloseReason::normal());
    assert!(matches!(
        next_event(&mut events).await,
        SessionEvent::Close(reason) if reason.is_normal()
    ));
    session.wait_closed().await;
    assert_eq!(session.state(), SessionState::Closed);
    assert!(matches!(session.send("more\n").await, Err(SessionError::Closed)));
}

#[tokio::test]
async fn python_program_with_arguments_and_echo() {
    let (transport, mut remote) = memory_pair();
    let (tx, mut events) = mpsc::channel(16);
    let request = RunRequest::new(Language::Python, "print(input())")
        .with_args(["--fast"])
        .with_echo(true);
    let session = Session::with_transport(request, transport, tx, SessionConfig::default());

    remote.open_default();
    let run = expect_handshake(&mut remote).await;
    assert!(run.contains(r#""lang":"python""#));
    assert!(run.contains(r#""args":["--fast"]"#));

    remote.send_text("3");
    assert!(matches!(next_event(&mut events).await, SessionEvent::Open));
    assert_eq!(session.host().await.unwrap(), "unknown");

    session.send("hi\n").await.unwrap();
    assert_eq!(remote.recv().await.as_deref(), Some("1hi\n"));
    remote.send_text(b64_frame('1', "hi\n"));
    remote.send_text(b64_frame('1', "hi\n"));
    for _ in 0..2 {
        assert!(matches!(
            next_event(&mut events).await,
            SessionEvent::Output(out) if out == "hi\n"
        ));
    }

    session.close().await;
    assert!(matches!(next_event(&mut events).await, SessionEvent::Close(_)));
    assert!(remote.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn liveness_frames_follow_the_ready_signal() {
    let (transport, mut remote) = memory_pair();
    let (tx, mut events) = mpsc::channel(16);
    let session = Session::with_transport(
        RunRequest::new(Language::Cpp, "int main(){}"),
        transport,
        tx,
        SessionConfig::default(),
    );

    remote.open_default();
    expect_handshake(&mut remote).await;
    assert!(timeout(Duration::from_secs(25), remote.recv()).await.is_err());

    remote.send_text("3");
    assert!(matches!(next_event(&mut events).await, SessionEvent::Open));
    let deadline = Instant::now() + Duration::from_secs(35);
    let mut pings = 0;
    while let Ok(Some(frame)) = timeout_at(deadline, remote.recv()).await {
        assert_eq!(frame, "2");
        pings += 1;
    }
    assert_eq!(pings, 3);

    session.close().await;
    assert!(matches!(next_event(&mut events).await, SessionEvent::Close(_)));
    assert!(remote.recv().await.is_none());
}
