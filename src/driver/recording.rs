use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use crate::browser::session::DEFAULT_WAIT_TIMEOUT_MS;
use crate::driver::page::{ClickOptions, ElementHandle, FormPage, WaitState};
use crate::error::BrowserError;

/// One call made against a `RecordingPage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCall {
    Navigate(String),
    Locate(String),
    Fill { selector: String, text: String },
    Click { selector: String, force: bool },
    Press { selector: String, key: String },
    WaitFor { selector: String, state: WaitState, timeout_ms: Option<u64> },
    SetUploadFiles { selector: String, paths: Vec<PathBuf> },
    IsVisible(String),
    InnerHtml(String),
    Close,
}

impl fmt::Display for PageCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageCall::Navigate(url) => write!(f, "navigate {}", url),
            PageCall::Locate(sel) => write!(f, "locate   {}", sel),
            PageCall::Fill { selector, text } => write!(f, "fill     {} <- {:?}", selector, text),
            PageCall::Click { selector, force: true } => write!(f, "click    {} (forced)", selector),
            PageCall::Click { selector, .. } => write!(f, "click    {}", selector),
            PageCall::Press { selector, key } => write!(f, "press    {} {:?}", selector, key),
            PageCall::WaitFor { selector, state, timeout_ms } => match timeout_ms {
                Some(ms) => write!(f, "wait     {} {:?} ({}ms)", selector, state, ms),
                None => write!(f, "wait     {} {:?}", selector, state),
            },
            PageCall::SetUploadFiles { selector, paths } => {
                let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "upload   {} <- {}", selector, names.join(", "))
            }
            PageCall::IsVisible(sel) => write!(f, "visible? {}", sel),
            PageCall::InnerHtml(sel) => write!(f, "html     {}", sel),
            PageCall::Close => write!(f, "close"),
        }
    }
}

/// In-memory `FormPage` that records every call.
///
/// Every selector resolves unless marked missing; operations on selectors
/// marked failing return a protocol error.
#[derive(Debug, Default)]
pub struct RecordingPage {
    calls: Vec<PageCall>,
    missing: HashSet<String>,
    failing: HashSet<String>,
    late: HashSet<String>,
    html: HashMap<String, String>,
}

impl RecordingPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// `locate` returns `None` and waits time out for this selector.
    pub fn with_missing(mut self, selector: &str) -> Self {
        self.missing.insert(selector.to_string());
        self
    }

    /// `locate` finds nothing until the selector has been waited for.
    pub fn appearing_on_wait(mut self, selector: &str) -> Self {
        self.late.insert(selector.to_string());
        self
    }

    /// Actions on this selector fail.
    pub fn failing_on(mut self, selector: &str) -> Self {
        self.failing.insert(selector.to_string());
        self
    }

    pub fn with_html(mut self, selector: &str, html: &str) -> Self {
        self.html.insert(selector.to_string(), html.to_string());
        self
    }

    pub fn calls(&self) -> &[PageCall] {
        &self.calls
    }

    pub fn fills(&self) -> Vec<(&str, &str)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                PageCall::Fill { selector, text } => Some((selector.as_str(), text.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn clicks(&self) -> Vec<(&str, bool)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                PageCall::Click { selector, force } => Some((selector.as_str(), *force)),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> Vec<(&str, &[PathBuf])> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                PageCall::SetUploadFiles { selector, paths } => {
                    Some((selector.as_str(), paths.as_slice()))
                }
                _ => None,
            })
            .collect()
    }

    fn act(&mut self, command: &str, selector: &str, call: PageCall) -> Result<(), BrowserError> {
        self.calls.push(call);
        if self.missing.contains(selector) || self.failing.contains(selector) {
            return Err(BrowserError::Protocol {
                command: command.to_string(),
                error: format!("scripted failure on {}", selector),
            });
        }
        Ok(())
    }
}

impl FormPage for RecordingPage {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.calls.push(PageCall::Navigate(url.to_string()));
        Ok(())
    }

    fn locate(&mut self, selector: &str) -> Result<Option<ElementHandle>, BrowserError> {
        self.calls.push(PageCall::Locate(selector.to_string()));
        if self.missing.contains(selector) || self.late.contains(selector) {
            return Ok(None);
        }
        Ok(Some(ElementHandle {
            selector: selector.to_string(),
            count: 1,
        }))
    }

    fn fill(&mut self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let call = PageCall::Fill {
            selector: selector.to_string(),
            text: text.to_string(),
        };
        self.act("fill", selector, call)
    }

    fn click(&mut self, selector: &str, options: ClickOptions) -> Result<(), BrowserError> {
        let call = PageCall::Click {
            selector: selector.to_string(),
            force: options.force,
        };
        self.act("click", selector, call)
    }

    fn press(&mut self, selector: &str, key: &str) -> Result<(), BrowserError> {
        let call = PageCall::Press {
            selector: selector.to_string(),
            key: key.to_string(),
        };
        self.act("press", selector, call)
    }

    fn wait_for(
        &mut self,
        selector: &str,
        state: WaitState,
        timeout_ms: Option<u64>,
    ) -> Result<(), BrowserError> {
        self.calls.push(PageCall::WaitFor {
            selector: selector.to_string(),
            state,
            timeout_ms,
        });
        if self.missing.contains(selector) {
            return Err(BrowserError::Timeout {
                selector: selector.to_string(),
                timeout_ms: timeout_ms.unwrap_or(DEFAULT_WAIT_TIMEOUT_MS),
            });
        }
        self.late.remove(selector);
        Ok(())
    }

    fn set_upload_files(&mut self, selector: &str, paths: &[PathBuf]) -> Result<(), BrowserError> {
        let call = PageCall::SetUploadFiles {
            selector: selector.to_string(),
            paths: paths.to_vec(),
        };
        self.act("set_files", selector, call)
    }

    fn is_visible(&mut self, selector: &str) -> Result<bool, BrowserError> {
        self.calls.push(PageCall::IsVisible(selector.to_string()));
        Ok(!self.missing.contains(selector))
    }

    fn inner_html(&mut self, selector: &str) -> Result<String, BrowserError> {
        self.calls.push(PageCall::InnerHtml(selector.to_string()));
        self.html
            .get(selector)
            .cloned()
            .ok_or_else(|| BrowserError::Protocol {
                command: "inner_html".into(),
                error: format!("no element matches {}", selector),
            })
    }

    fn close(&mut self) -> Result<(), BrowserError> {
        self.calls.push(PageCall::Close);
        Ok(())
    }
}
