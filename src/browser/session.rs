use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::driver::page::{ClickOptions, ElementHandle, FormPage, WaitState};
use crate::error::{BrowserError, PipelineError};

// ============================================================================
// Configuration
// ============================================================================

/// `browser:` section of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Node.js helper that owns the Playwright browser.
    #[serde(default = "default_script")]
    pub script: PathBuf,

    #[serde(default)]
    pub headless: bool,

    /// Cookie banner "accept" button, clicked if visible.
    #[serde(default)]
    pub cookie_selector: Option<String>,

    /// "Apply" button that reveals the form, clicked if visible.
    #[serde(default)]
    pub apply_selector: Option<String>,

    /// Container whose markup is sent to the extractor.
    #[serde(default = "default_form_selector")]
    pub form_selector: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            script: default_script(),
            headless: false,
            cookie_selector: None,
            apply_selector: None,
            form_selector: default_form_selector(),
        }
    }
}

/// Playwright's own wait timeout, used when a wait names none.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

fn default_script() -> PathBuf { PathBuf::from("node/form_server.js") }
fn default_form_selector() -> String { "form".to_string() }

// ============================================================================
// Wire protocol
// ============================================================================

/// Request sent to form_server.js over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum BrowserRequest<'a> {
    Navigate {
        url: &'a str,
    },
    Locate {
        selector: &'a str,
    },
    Fill {
        selector: &'a str,
        value: &'a str,
    },
    Click {
        selector: &'a str,
        force: bool,
    },
    Press {
        selector: &'a str,
        key: &'a str,
    },
    WaitFor {
        selector: &'a str,
        state: WaitState,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    SetFiles {
        selector: &'a str,
        paths: Vec<String>,
    },
    IsVisible {
        selector: &'a str,
    },
    InnerHtml {
        selector: &'a str,
    },
    Quit,
}

impl BrowserRequest<'_> {
    fn command(&self) -> &'static str {
        match self {
            BrowserRequest::Navigate { .. } => "navigate",
            BrowserRequest::Locate { .. } => "locate",
            BrowserRequest::Fill { .. } => "fill",
            BrowserRequest::Click { .. } => "click",
            BrowserRequest::Press { .. } => "press",
            BrowserRequest::WaitFor { .. } => "wait_for",
            BrowserRequest::SetFiles { .. } => "set_files",
            BrowserRequest::IsVisible { .. } => "is_visible",
            BrowserRequest::InnerHtml { .. } => "inner_html",
            BrowserRequest::Quit => "quit",
        }
    }
}

/// Response received from form_server.js over stdout (one JSON line).
#[derive(Debug, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub html: Option<String>,
    /// Set when a failed command ran out of time.
    #[serde(default)]
    pub timeout: Option<bool>,
}

// ============================================================================
// Session
// ============================================================================

/// A persistent browser session backed by form_server.js.
///
/// Launches a long-lived Node.js process that keeps a Chromium page open.
/// Commands are sent as NDJSON over stdin, responses read from stdout.
pub struct BrowserSession {
    child: Child,
    stdin: std::process::ChildStdin,
    reader: BufReader<std::process::ChildStdout>,
    closed: bool,
}

impl BrowserSession {
    /// Spawn the helper and wait for its ready line.
    pub fn launch(config: &BrowserConfig) -> Result<Self, BrowserError> {
        let script = config.script.display().to_string();
        let mut command = Command::new("node");
        command.arg(&config.script);
        if config.headless {
            command.arg("--headless");
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| BrowserError::Spawn {
                script: script.clone(),
                source: e,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BrowserError::Io(format!("failed to capture stdin of {}", script)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BrowserError::Io(format!("failed to capture stdout of {}", script)))?;

        let mut reader = BufReader::new(stdout);

        let mut line = String::new();
        reader
            .read_line(&mut line)
            .map_err(|e| BrowserError::Io(format!("failed to read ready signal: {}", e)))?;

        let response: BrowserResponse =
            serde_json::from_str(line.trim()).map_err(|e| BrowserError::JsonParse {
                context: format!("{} ready signal", script),
                source: e,
            })?;

        if !response.ok || response.ready != Some(true) {
            return Err(BrowserError::Protocol {
                command: "launch".into(),
                error: response
                    .error
                    .unwrap_or_else(|| "did not receive ready signal".into()),
            });
        }

        tracing::info!(script = %script, headless = config.headless, "browser session ready");
        Ok(BrowserSession {
            child,
            stdin,
            reader,
            closed: false,
        })
    }

    fn send(&mut self, request: &BrowserRequest<'_>) -> Result<BrowserResponse, BrowserError> {
        let json = serde_json::to_string(request).map_err(|e| BrowserError::JsonSerialize {
            context: "BrowserRequest".into(),
            source: e,
        })?;

        writeln!(self.stdin, "{}", json)
            .and_then(|()| self.stdin.flush())
            .map_err(|e| BrowserError::Io(format!("failed to write to helper stdin: {}", e)))?;

        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| BrowserError::Io(format!("failed to read helper stdout: {}", e)))?;

        if line.trim().is_empty() {
            return Err(BrowserError::Io(
                "empty response from helper (process may have died)".into(),
            ));
        }

        serde_json::from_str(line.trim()).map_err(|e| BrowserError::JsonParse {
            context: "helper response".into(),
            source: e,
        })
    }

    /// Send a request and verify it succeeded.
    fn send_ok(&mut self, request: &BrowserRequest<'_>) -> Result<BrowserResponse, BrowserError> {
        let response = self.send(request)?;
        if !response.ok {
            return Err(BrowserError::Protocol {
                command: request.command().into(),
                error: response.error.unwrap_or_else(|| "unknown error".into()),
            });
        }
        Ok(response)
    }
}

impl FormPage for BrowserSession {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.send_ok(&BrowserRequest::Navigate { url })?;
        Ok(())
    }

    fn locate(&mut self, selector: &str) -> Result<Option<ElementHandle>, BrowserError> {
        let response = self.send_ok(&BrowserRequest::Locate { selector })?;
        Ok(match response.count.unwrap_or(0) {
            0 => None,
            count => Some(ElementHandle {
                selector: selector.to_string(),
                count,
            }),
        })
    }

    fn fill(&mut self, selector: &str, text: &str) -> Result<(), BrowserError> {
        self.send_ok(&BrowserRequest::Fill {
            selector,
            value: text,
        })?;
        Ok(())
    }

    fn click(&mut self, selector: &str, options: ClickOptions) -> Result<(), BrowserError> {
        self.send_ok(&BrowserRequest::Click {
            selector,
            force: options.force,
        })?;
        Ok(())
    }

    fn press(&mut self, selector: &str, key: &str) -> Result<(), BrowserError> {
        self.send_ok(&BrowserRequest::Press { selector, key })?;
        Ok(())
    }

    fn wait_for(
        &mut self,
        selector: &str,
        state: WaitState,
        timeout_ms: Option<u64>,
    ) -> Result<(), BrowserError> {
        let request = BrowserRequest::WaitFor {
            selector,
            state,
            timeout_ms,
        };
        let response = self.send(&request)?;
        if response.ok {
            return Ok(());
        }
        if response.timeout == Some(true) {
            return Err(BrowserError::Timeout {
                selector: selector.to_string(),
                timeout_ms: timeout_ms.unwrap_or(DEFAULT_WAIT_TIMEOUT_MS),
            });
        }
        Err(BrowserError::Protocol {
            command: request.command().into(),
            error: response.error.unwrap_or_else(|| "unknown error".into()),
        })
    }

    fn set_upload_files(&mut self, selector: &str, paths: &[PathBuf]) -> Result<(), BrowserError> {
        let paths = paths.iter().map(|p| p.display().to_string()).collect();
        self.send_ok(&BrowserRequest::SetFiles { selector, paths })?;
        Ok(())
    }

    fn is_visible(&mut self, selector: &str) -> Result<bool, BrowserError> {
        let response = self.send_ok(&BrowserRequest::IsVisible { selector })?;
        Ok(response.visible.unwrap_or(false))
    }

    fn inner_html(&mut self, selector: &str) -> Result<String, BrowserError> {
        let response = self.send_ok(&BrowserRequest::InnerHtml { selector })?;
        response.html.ok_or_else(|| BrowserError::Protocol {
            command: "inner_html".into(),
            error: "no html in response".into(),
        })
    }

    fn close(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // Best-effort: the helper may already be gone.
        let _ = self.send(&BrowserRequest::Quit);
        let _ = self.child.wait();
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

// ============================================================================
// Page preparation
// ============================================================================

/// Open `url`, dismiss the cookie banner, follow the apply button, and return
/// the form container's markup.
///
/// The optional clicks log and continue on failure; missing form markup is fatal.
pub fn open_application(
    page: &mut dyn FormPage,
    url: &str,
    config: &BrowserConfig,
) -> Result<String, PipelineError> {
    tracing::info!(url, "opening application page");
    page.navigate(url)?;

    for (what, selector) in [
        ("cookie banner", config.cookie_selector.as_deref()),
        ("apply button", config.apply_selector.as_deref()),
    ] {
        let Some(selector) = selector else { continue };
        let clicked = page
            .is_visible(selector)
            .and_then(|visible| {
                if visible {
                    page.click(selector, ClickOptions::default()).map(|()| true)
                } else {
                    Ok(false)
                }
            });
        match clicked {
            Ok(true) => tracing::info!(selector, "clicked {}", what),
            Ok(false) => tracing::debug!(selector, "{} not visible", what),
            Err(e) => tracing::warn!(selector, error = %e, "could not click {}", what),
        }
    }

    let markup = page
        .inner_html(&config.form_selector)
        .map_err(|e| PipelineError::FormNotFound(format!("{}: {}", config.form_selector, e)))?;
    if markup.trim().is_empty() {
        return Err(PipelineError::FormNotFound(format!(
            "{} is empty",
            config.form_selector
        )));
    }
    Ok(markup)
}
