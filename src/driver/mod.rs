pub mod chromium;
#[cfg(test)]
pub mod fake;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

pub type DriverResult<T> = Result<T, DriverError>;

/// Failure taxonomy for driver operations. Only `Fatal` terminates a
/// worker; everything else is recoverable at the row or record level.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("timed out after {timeout:?} waiting for `{selector}`")]
    WaitTimeout { selector: String, timeout: Duration },
    #[error("page operation failed: {0}")]
    Page(String),
    #[error("driver session lost: {0}")]
    Fatal(String),
}

impl DriverError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Fatal(_))
    }
}

/// Opaque handle for a navigation context (a tab). The base context — the
/// one the leaderboard lives in — is always `ContextHandle::BASE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextHandle(pub(crate) usize);

impl ContextHandle {
    pub const BASE: ContextHandle = ContextHandle(0);
}

/// The narrow capability contract the pipeline needs from a browser.
///
/// One driver instance is owned exclusively by one worker; methods take
/// `&mut self` to make that explicit. All futures are `Send` so workers
/// generic over the driver can run as tokio tasks.
///
/// Selector-taking methods operate on the currently focused context.
/// `find_all_within` scopes a query to the subtree of an element handle,
/// which is how span values are grouped per sub-row.
pub trait PageDriver: Send {
    type Elem: Clone + Send + Sync;

    fn navigate(&mut self, url: &str) -> impl Future<Output = DriverResult<()>> + Send;

    /// Poll for the first element matching `selector`, up to `timeout`.
    fn wait_for(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> impl Future<Output = DriverResult<Self::Elem>> + Send;

    fn find_all(&mut self, selector: &str)
        -> impl Future<Output = DriverResult<Vec<Self::Elem>>> + Send;

    fn find_all_within(
        &mut self,
        root: &Self::Elem,
        selector: &str,
    ) -> impl Future<Output = DriverResult<Vec<Self::Elem>>> + Send;

    fn read_text(&mut self, el: &Self::Elem) -> impl Future<Output = DriverResult<String>> + Send;

    /// Read an attribute; `innerHTML` is honored as a pseudo-attribute.
    fn read_attribute(
        &mut self,
        el: &Self::Elem,
        name: &str,
    ) -> impl Future<Output = DriverResult<Option<String>>> + Send;

    /// Scroll the element into view and click it.
    fn click(&mut self, el: &Self::Elem) -> impl Future<Output = DriverResult<()>> + Send;

    /// Open `url` in a new context and focus it.
    fn open_in_new_context(
        &mut self,
        url: &str,
    ) -> impl Future<Output = DriverResult<ContextHandle>> + Send;

    /// Close the focused context. Closing the base context is an error.
    fn close_current_context(&mut self) -> impl Future<Output = DriverResult<()>> + Send;

    fn switch_to_context(
        &mut self,
        handle: ContextHandle,
    ) -> impl Future<Output = DriverResult<()>> + Send;

    /// Tear the whole session down. Best effort; must be called on every
    /// exit path of a worker run.
    fn shutdown(&mut self) -> impl Future<Output = ()> + Send;
}
