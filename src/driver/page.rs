use std::path::PathBuf;

use serde::Serialize;

use crate::error::BrowserError;

/// A located element: the selector that matched and how many nodes it hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub selector: String,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickOptions {
    /// Click even when the element is obscured or not actionable.
    pub force: bool,
}

impl ClickOptions {
    pub fn forced() -> Self {
        Self { force: true }
    }
}

/// Element state to wait for, as understood by the browser helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
    Attached,
    Visible,
}

/// The live browser page the driver operates on.
///
/// The pipeline never creates or closes the page; it is lent for one run.
pub trait FormPage {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// `None` when nothing matches the selector.
    fn locate(&mut self, selector: &str) -> Result<Option<ElementHandle>, BrowserError>;

    fn fill(&mut self, selector: &str, text: &str) -> Result<(), BrowserError>;

    fn click(&mut self, selector: &str, options: ClickOptions) -> Result<(), BrowserError>;

    /// Send one key press (e.g. "Enter", " ") to the element.
    fn press(&mut self, selector: &str, key: &str) -> Result<(), BrowserError>;

    /// Block until the element reaches `state`; `None` uses the helper's default timeout.
    fn wait_for(
        &mut self,
        selector: &str,
        state: WaitState,
        timeout_ms: Option<u64>,
    ) -> Result<(), BrowserError>;

    fn set_upload_files(&mut self, selector: &str, paths: &[PathBuf]) -> Result<(), BrowserError>;

    fn is_visible(&mut self, selector: &str) -> Result<bool, BrowserError>;

    fn inner_html(&mut self, selector: &str) -> Result<String, BrowserError>;

    fn close(&mut self) -> Result<(), BrowserError>;
}
