use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{ContextHandle, DriverError, DriverResult, PageDriver};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Shared handle to a DOM element. `Element` itself is not `Clone`, so
/// handles are reference-counted.
#[derive(Clone)]
pub struct ChromeElem(Arc<Element>);

/// Production driver: one headless Chrome session per worker, driven over
/// CDP. The base context (index 0) hosts the leaderboard; at most one
/// detail context is open at a time on top of it.
pub struct ChromiumDriver {
    browser: Browser,
    handler_task: JoinHandle<()>,
    pages: Vec<Page>,
    current: usize,
}

impl ChromiumDriver {
    pub async fn launch(headful: bool) -> DriverResult<Self> {
        let mut builder = BrowserConfig::builder().no_sandbox();
        if headful {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(DriverError::Fatal)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(cdp_fatal)?;
        // The handler stream must be pumped for the session to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let base = browser
            .new_page("about:blank")
            .await
            .map_err(cdp_fatal)?;

        Ok(Self {
            browser,
            handler_task,
            pages: vec![base],
            current: 0,
        })
    }

    fn page(&self) -> &Page {
        &self.pages[self.current]
    }
}

impl PageDriver for ChromiumDriver {
    type Elem = ChromeElem;

    fn navigate(&mut self, url: &str) -> impl Future<Output = DriverResult<()>> + Send {
        async move {
            let page = self.page();
            page.goto(url).await.map_err(cdp_err)?;
            page.wait_for_navigation().await.map_err(cdp_err)?;
            Ok(())
        }
    }

    fn wait_for(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> impl Future<Output = DriverResult<Self::Elem>> + Send {
        async move {
            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                match self.page().find_element(selector).await {
                    Ok(el) => return Ok(ChromeElem(Arc::new(el))),
                    Err(e) => {
                        let e = cdp_err(e);
                        if e.is_fatal() {
                            return Err(e);
                        }
                    }
                }
                if tokio::time::Instant::now() >= deadline {
                    return Err(DriverError::WaitTimeout {
                        selector: selector.to_string(),
                        timeout,
                    });
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    }

    fn find_all(
        &mut self,
        selector: &str,
    ) -> impl Future<Output = DriverResult<Vec<Self::Elem>>> + Send {
        async move {
            let els = self.page().find_elements(selector).await.map_err(cdp_err)?;
            Ok(els.into_iter().map(|e| ChromeElem(Arc::new(e))).collect())
        }
    }

    fn find_all_within(
        &mut self,
        root: &Self::Elem,
        selector: &str,
    ) -> impl Future<Output = DriverResult<Vec<Self::Elem>>> + Send {
        async move {
            let els = root.0.find_elements(selector).await.map_err(cdp_err)?;
            Ok(els.into_iter().map(|e| ChromeElem(Arc::new(e))).collect())
        }
    }

    fn read_text(&mut self, el: &Self::Elem) -> impl Future<Output = DriverResult<String>> + Send {
        async move {
            let text = el.0.inner_text().await.map_err(cdp_err)?;
            Ok(text.unwrap_or_default().trim().to_string())
        }
    }

    fn read_attribute(
        &mut self,
        el: &Self::Elem,
        name: &str,
    ) -> impl Future<Output = DriverResult<Option<String>>> + Send {
        async move {
            if name == "innerHTML" {
                return el.0.inner_html().await.map_err(cdp_err);
            }
            el.0.attribute(name).await.map_err(cdp_err)
        }
    }

    fn click(&mut self, el: &Self::Elem) -> impl Future<Output = DriverResult<()>> + Send {
        async move {
            el.0.scroll_into_view().await.map_err(cdp_err)?;
            el.0.click().await.map_err(cdp_err)?;
            Ok(())
        }
    }

    fn open_in_new_context(
        &mut self,
        url: &str,
    ) -> impl Future<Output = DriverResult<ContextHandle>> + Send {
        async move {
            let page = self.browser.new_page(url).await.map_err(cdp_err)?;
            self.pages.push(page);
            self.current = self.pages.len() - 1;
            Ok(ContextHandle(self.current))
        }
    }

    fn close_current_context(&mut self) -> impl Future<Output = DriverResult<()>> + Send {
        async move {
            if self.current == 0 {
                return Err(DriverError::Page("cannot close the base context".into()));
            }
            let page = self.pages.remove(self.current);
            self.current = 0;
            page.close().await.map_err(cdp_err)?;
            Ok(())
        }
    }

    fn switch_to_context(
        &mut self,
        handle: ContextHandle,
    ) -> impl Future<Output = DriverResult<()>> + Send {
        async move {
            if handle.0 >= self.pages.len() {
                return Err(DriverError::Page(format!(
                    "no such context: {}",
                    handle.0
                )));
            }
            self.current = handle.0;
            Ok(())
        }
    }

    fn shutdown(&mut self) -> impl Future<Output = ()> + Send {
        async move {
            for page in self.pages.split_off(1) {
                let _ = page.close().await;
            }
            if let Err(e) = self.browser.close().await {
                debug!("browser close: {}", e);
            }
            let _ = self.browser.wait().await;
            self.handler_task.abort();
        }
    }
}

/// Transport-level failures mean the session is gone; anything else is a
/// per-item page error.
fn cdp_err(e: CdpError) -> DriverError {
    match e {
        CdpError::Ws(_) | CdpError::Io(_) | CdpError::ChannelSendError(_) => {
            DriverError::Fatal(e.to_string())
        }
        other => DriverError::Page(other.to_string()),
    }
}

fn cdp_fatal(e: CdpError) -> DriverError {
    DriverError::Fatal(e.to_string())
}
