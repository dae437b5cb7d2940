//! Remote collaborators: compile service, parse service and link shortener.
//!
//! Each collaborator is a trait so the controller can be driven by test
//! doubles. The HTTP implementations talk to:
//!
//! | Service    | Request                                           | Response                    |
//! |------------|---------------------------------------------------|-----------------------------|
//! | compile    | `POST {compile_url}/{compiler}/compile` JSON      | `{code, stderr: [{text}]}`  |
//! | parse      | `POST {parse_url}` `{include_offset, log, verbose}` | `[DiagnosticEntry]`       |
//! | shortener  | `POST {shortener_url}` with the URL as plain text | short URL as plain text     |

use async_trait::async_trait;
use ctp_diagnostics::{parse_log, DiagnosticEntry, LineOffset};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PlaygroundConfig;
use crate::error::{PlaygroundError, PlaygroundResult};

/// Flags appended to every compile so the log is plain text and nothing is linked.
pub const EXTRA_COMPILER_ARGUMENTS: &str = "-fno-diagnostics-color -fsyntax-only";

/// Text shown in place of a short link when the shortener rejects the request.
pub const SHORTEN_FAILED_MESSAGE: &str = "Failed to load.";

/// Build the shared HTTP client for all services.
pub fn http_client(config: &PlaygroundConfig) -> PlaygroundResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| PlaygroundError::Configuration(e.to_string()))
}

// ── Compile ──────────────────────────────────────────────────────────────────

/// One compilation of already header-inlined source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub compiler: String,
    pub source: String,
    pub user_arguments: String,
}

impl CompileRequest {
    pub fn new(compiler: &str, compiler_flags: &str, source: String) -> Self {
        let user_arguments = format!("{compiler_flags} {EXTRA_COMPILER_ARGUMENTS}")
            .trim_start()
            .to_string();
        Self {
            compiler: compiler.to_string(),
            source,
            user_arguments,
        }
    }
}

/// Exit code and stderr lines of a compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutput {
    pub code: i32,
    pub stderr: Vec<String>,
}

impl CompileOutput {
    pub fn succeeded(&self) -> bool {
        self.code == 0
    }
}

#[async_trait]
pub trait CompileService: Send + Sync {
    async fn compile(&self, request: &CompileRequest) -> PlaygroundResult<CompileOutput>;
}

#[derive(Debug, Serialize)]
struct CompileBody<'a> {
    source: &'a str,
    options: CompileOptions<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompileOptions<'a> {
    user_arguments: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompileResponse {
    code: i32,
    #[serde(default)]
    stderr: Vec<OutputLine>,
}

#[derive(Debug, Deserialize)]
struct OutputLine {
    text: String,
}

impl From<CompileResponse> for CompileOutput {
    fn from(response: CompileResponse) -> Self {
        Self {
            code: response.code,
            stderr: response.stderr.into_iter().map(|l| l.text).collect(),
        }
    }
}

/// Compiler Explorer compile API.
pub struct CompilerExplorer {
    http: reqwest::Client,
    base_url: String,
}

impl CompilerExplorer {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn endpoint(&self, compiler: &str) -> String {
        format!("{}/{}/compile", self.base_url.trim_end_matches('/'), compiler)
    }
}

#[async_trait]
impl CompileService for CompilerExplorer {
    async fn compile(&self, request: &CompileRequest) -> PlaygroundResult<CompileOutput> {
        let url = self.endpoint(&request.compiler);
        let body = CompileBody {
            source: &request.source,
            options: CompileOptions {
                user_arguments: &request.user_arguments,
            },
        };

        debug!(%url, bytes = request.source.len(), "sending compile request");
        let response = self
            .http
            .post(&url)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PlaygroundError::request("compiler", e))?;

        if !response.status().is_success() {
            return Err(PlaygroundError::Status {
                service: "compiler",
                status: response.status().as_u16(),
            });
        }

        let parsed: CompileResponse = response
            .json()
            .await
            .map_err(|e| PlaygroundError::decode("compiler", e))?;
        let output = CompileOutput::from(parsed);
        info!(
            compiler = %request.compiler,
            code = output.code,
            lines = output.stderr.len(),
            "compile finished"
        );
        Ok(output)
    }
}

// ── Parse ────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait ParseService: Send + Sync {
    async fn parse(
        &self,
        offset: LineOffset,
        log: Vec<String>,
        verbose: bool,
    ) -> PlaygroundResult<Vec<DiagnosticEntry>>;
}

/// Runs the diagnostic parser in-process.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalParser;

#[async_trait]
impl ParseService for LocalParser {
    async fn parse(
        &self,
        offset: LineOffset,
        log: Vec<String>,
        verbose: bool,
    ) -> PlaygroundResult<Vec<DiagnosticEntry>> {
        Ok(parse_log(offset, log, verbose).collect())
    }
}

#[derive(Debug, Serialize)]
struct ParseBody<'a> {
    include_offset: LineOffset,
    log: &'a [String],
    verbose: bool,
}

/// A parse service reachable over HTTP.
pub struct RemoteParser {
    http: reqwest::Client,
    url: String,
}

impl RemoteParser {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ParseService for RemoteParser {
    async fn parse(
        &self,
        offset: LineOffset,
        log: Vec<String>,
        verbose: bool,
    ) -> PlaygroundResult<Vec<DiagnosticEntry>> {
        let body = ParseBody {
            include_offset: offset,
            log: &log,
            verbose,
        };
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlaygroundError::request("parser", e))?;

        if !response.status().is_success() {
            return Err(PlaygroundError::Status {
                service: "parser",
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| PlaygroundError::decode("parser", e))
    }
}

/// Pick the parse service from configuration.
pub fn parse_service(
    config: &PlaygroundConfig,
    http: &reqwest::Client,
) -> Box<dyn ParseService> {
    match &config.parse_url {
        Some(url) => Box::new(RemoteParser::new(http.clone(), url.clone())),
        None => Box::new(LocalParser),
    }
}

// ── Shortener ────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LinkShortener: Send + Sync {
    /// Shorten `url`. A rejected request yields [`SHORTEN_FAILED_MESSAGE`];
    /// only transport failures are errors.
    async fn shorten(&self, url: &str) -> PlaygroundResult<String>;
}

pub struct HttpShortener {
    http: reqwest::Client,
    url: String,
}

impl HttpShortener {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl LinkShortener for HttpShortener {
    async fn shorten(&self, url: &str) -> PlaygroundResult<String> {
        let response = self
            .http
            .post(&self.url)
            .body(url.to_string())
            .send()
            .await
            .map_err(|e| PlaygroundError::request("shortener", e))?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "shortener rejected link");
            return Ok(SHORTEN_FAILED_MESSAGE.to_string());
        }

        let text = response
            .text()
            .await
            .map_err(|e| PlaygroundError::request("shortener", e))?;
        Ok(text.trim().to_string())
    }
}
