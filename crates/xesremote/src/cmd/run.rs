use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use xesremote_frame::{Language, RunRequest};
use xesremote_session::{Session, SessionConfig, SessionError, SessionEvent};
use xesremote_transport::{CloseReason, CLOSE_ABNORMAL};

use crate::cmd::RunArgs;
use crate::exit::{io_error, session_error, CliError, CliResult, SUCCESS, TRANSPORT_ERROR, USAGE};

const EVENT_CAPACITY: usize = 256;

pub fn run(args: RunArgs) -> CliResult<i32> {
    let source = std::fs::read_to_string(&args.file)
        .map_err(|err| io_error(&format!("failed reading {}", args.file.display()), err))?;
    let language = resolve_language(args.lang, &args.file)?;
    let config = SessionConfig {
        endpoint: args.endpoint.clone(),
        liveness_interval: parse_duration(&args.liveness_interval)?,
        ..SessionConfig::default()
    };
    let request = RunRequest::new(language, source)
        .with_args(args.args.iter().cloned())
        .with_echo(args.echo);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))?;
    runtime.block_on(attach(request, config, args.show_unknown))
}

fn resolve_language(explicit: Option<Language>, path: &Path) -> CliResult<Language> {
    explicit.or_else(|| Language::from_path(path)).ok_or_else(|| {
        CliError::new(
            USAGE,
            format!(
                "cannot guess the language of {}; pass --lang cpp or --lang python",
                path.display()
            ),
        )
    })
}

async fn attach(request: RunRequest, config: SessionConfig, show_unknown: bool) -> CliResult<i32> {
    info!(endpoint = %config.endpoint, lang = %request.language, "connecting");
    let (tx, mut events) = mpsc::channel(EVENT_CAPACITY);
    let session = Arc::new(Session::connect_with_config(request, tx, config));
    let mut failure: Option<CliError> = None;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut closing = false;

    let close = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Open) => {
                    match session.host().await {
                        Ok(host) => info!(%host, "program started"),
                        Err(err) => debug!(error = %err, "host unavailable"),
                    }
                    tokio::spawn(forward_stdin(Arc::clone(&session)));
                }
                Some(SessionEvent::Output(data)) => {
                    if let Err(err) = write_stdout(&data) {
                        if !closing {
                            closing = true;
                            warn!(error = %err, "stdout closed; ending session");
                            close_in_background(&session);
                        }
                    }
                }
                Some(SessionEvent::SystemMessage(data)) => {
                    eprintln!("system: {}", String::from_utf8_lossy(&data).trim_end());
                }
                Some(SessionEvent::Unknown(raw)) => {
                    if show_unknown {
                        eprintln!("unknown: {}", String::from_utf8_lossy(&raw));
                    } else {
                        debug!(len = raw.len(), "unrecognized frame");
                    }
                }
                Some(SessionEvent::Error(SessionError::Protocol(err))) => {
                    warn!(error = %err, "skipping malformed frame");
                }
                Some(SessionEvent::Error(err)) => {
                    if failure.is_none() {
                        failure = Some(session_error("session failed", err));
                    }
                }
                Some(SessionEvent::Close(reason)) => break Some(reason),
                None => break None,
            },
            _ = &mut ctrl_c, if !closing => {
                closing = true;
                info!("interrupted; closing session");
                close_in_background(&session);
            }
        }
    };

    outcome(close, failure)
}

fn outcome(close: Option<CloseReason>, failure: Option<CliError>) -> CliResult<i32> {
    if let Some(err) = failure {
        return Err(err);
    }
    match close {
        Some(reason) if reason.code == CLOSE_ABNORMAL => Err(CliError::new(
            TRANSPORT_ERROR,
            format!("connection lost ({reason})"),
        )),
        Some(reason) => {
            debug!(%reason, "session closed");
            Ok(SUCCESS)
        }
        None => Err(CliError::new(
            TRANSPORT_ERROR,
            "session ended without a close notification",
        )),
    }
}

/// The loop above must keep draining events while the close is carried out.
fn close_in_background(session: &Arc<Session>) {
    let session = Arc::clone(session);
    tokio::spawn(async move { session.close().await });
}

/// Forward stdin to the remote program, one line per send, until stdin
/// ends or the session stops accepting input.
async fn forward_stdin(session: Arc<Session>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(mut line)) => {
                line.push('\n');
                if let Err(err) = session.send(&line).await {
                    debug!(error = %err, "input not sent; stopping stdin forwarding");
                    return;
                }
            }
            Ok(None) => {
                debug!("stdin closed");
                return;
            }
            Err(err) => {
                warn!(error = %err, "failed reading stdin");
                return;
            }
        }
    }
}

fn write_stdout(data: &[u8]) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(data)?;
    out.flush()
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::exit::DATA_INVALID;
    use xesremote_transport::TransportError;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration(" 3 ").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert_eq!(parse_duration("0s").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("soon").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }

    #[test]
    fn language_is_guessed_from_extension() {
        assert_eq!(
            resolve_language(None, &PathBuf::from("solve.cc")).unwrap(),
            Language::Cpp
        );
        assert_eq!(
            resolve_language(None, &PathBuf::from("dir/main.PY")).unwrap(),
            Language::Python
        );
    }

    #[test]
    fn explicit_language_wins() {
        assert_eq!(
            resolve_language(Some(Language::Python), &PathBuf::from("main.cpp")).unwrap(),
            Language::Python
        );
    }

    #[test]
    fn unguessable_language_is_usage_error() {
        let err = resolve_language(None, &PathBuf::from("script.rb")).unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.contains("--lang"));
    }

    #[test]
    fn normal_close_is_success() {
        assert_eq!(outcome(Some(CloseReason::normal()), None).unwrap(), SUCCESS);
        assert_eq!(
            outcome(Some(CloseReason::new(1005, "")), None).unwrap(),
            SUCCESS
        );
    }

    #[test]
    fn abnormal_close_is_transport_error() {
        let err = outcome(Some(CloseReason::abnormal("stream ended")), None).unwrap_err();
        assert_eq!(err.code, TRANSPORT_ERROR);
        assert!(err.message.contains("stream ended"));
    }

    #[test]
    fn recorded_failure_takes_precedence() {
        let failure = session_error(
            "session failed",
            SessionError::Transport(TransportError::Closed),
        );
        let err = outcome(Some(CloseReason::normal()), Some(failure)).unwrap_err();
        assert_eq!(err.code, TRANSPORT_ERROR);

        let failure = CliError::new(DATA_INVALID, "bad");
        assert_eq!(outcome(None, Some(failure)).unwrap_err().code, DATA_INVALID);
        assert_eq!(outcome(None, None).unwrap_err().code, TRANSPORT_ERROR);
    }
}
