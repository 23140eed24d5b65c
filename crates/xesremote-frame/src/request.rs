use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{FrameError, Result};

/// Value of the `type` field in the run payload.
const RUN_TYPE: &str = "run";
/// Value of the `original_id` field in the run payload.
const ORIGINAL_ID: u32 = 1;

/// Language the remote backend should compile or interpret the source as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Cpp,
    Python,
}

impl Language {
    /// Wire name of the language.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::Python => "python",
        }
    }

    /// Guess the language from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "cpp" | "cc" | "cxx" | "c++" | "hpp" | "h" => Some(Language::Cpp),
            "py" => Some(Language::Python),
            _ => None,
        }
    }

    /// Guess the language from a source file path.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpp" | "c++" => Ok(Language::Cpp),
            "python" | "py" => Ok(Language::Python),
            other => Err(FrameError::UnknownLanguage(other.to_string())),
        }
    }
}

/// The one-time description of the program to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Language of `source`.
    pub language: Language,
    /// Program source text.
    pub source: String,
    /// Command-line arguments passed to the program.
    pub args: Vec<String>,
    /// Deliver the backend's echo of our own input instead of suppressing it.
    pub echo: bool,
}

impl RunRequest {
    /// Create a request with no arguments and echo suppression on.
    pub fn new(language: Language, source: impl Into<String>) -> Self {
        Self {
            language,
            source: source.into(),
            args: Vec::new(),
            echo: false,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// JSON body of the run frame.
    ///
    /// The backend expects the source under `xml`; the field order is fixed.
    pub fn to_json(&self) -> Result<String> {
        let payload = RunPayload {
            xml: &self.source,
            kind: RUN_TYPE,
            lang: self.language,
            original_id: ORIGINAL_ID,
            args: &self.args,
        };
        Ok(serde_json::to_string(&payload)?)
    }
}

#[derive(Serialize)]
struct RunPayload<'a> {
    xml: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    lang: Language,
    original_id: u32,
    args: &'a [String],
}
