use xesremote_frame::Language;
use xesremote_session::{DEFAULT_ENDPOINT, DEFAULT_HOST_HEADER, DEFAULT_LIVENESS_INTERVAL};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("xesremote {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    for (key, value) in extended_report() {
        println!("{key}: {value}");
    }
    Ok(SUCCESS)
}

/// Build provenance plus the session defaults a bug report needs.
fn extended_report() -> Vec<(&'static str, String)> {
    vec![
        ("name", "xesremote".to_string()),
        ("version", env!("CARGO_PKG_VERSION").to_string()),
        (
            "build_target",
            option_env!("XESREMOTE_BUILD_TARGET")
                .unwrap_or("unknown")
                .to_string(),
        ),
        ("git_hash", option_env!("GIT_HASH").unwrap_or("unknown").to_string()),
        ("default_endpoint", DEFAULT_ENDPOINT.to_string()),
        ("host_header", DEFAULT_HOST_HEADER.to_string()),
        (
            "liveness_interval",
            format!("{}s", DEFAULT_LIVENESS_INTERVAL.as_secs()),
        ),
        (
            "languages",
            [Language::Cpp, Language::Python]
                .iter()
                .map(|lang| lang.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        ("features", format!("ws={}, cli=true", cfg!(feature = "ws"))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(key: &str) -> String {
        extended_report()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
            .unwrap_or_else(|| panic!("missing {key}"))
    }

    #[test]
    fn report_carries_session_defaults() {
        assert_eq!(value("default_endpoint"), DEFAULT_ENDPOINT);
        assert_eq!(value("host_header"), "x-host");
        assert_eq!(value("liveness_interval"), "10s");
    }

    #[test]
    fn report_lists_both_languages() {
        assert_eq!(
            value("languages"),
            format!("{}, {}", Language::Cpp, Language::Python)
        );
    }
}
