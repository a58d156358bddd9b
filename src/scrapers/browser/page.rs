//! [`PageDriver`] over a chromiumoxide page.
//!
//! Elements are addressed by XPath and resolved inside the page on every
//! call, so a re-rendered form never leaves us holding a stale handle.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use tracing::debug;

use crate::scrapers::driver::{ClickMode, ElementInfo, PageDriver, SelectMethod};
use crate::scrapers::error::{DriverError, ErrorKind};
use crate::scrapers::locator::{xpath_literal, Locator};

/// Automation fingerprints hidden after each navigation.
const STEALTH_SCRIPTS: &[&str] = &[
    r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    "#,
    r#"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true
    });
    "#,
    r#"
    window.chrome = window.chrome || { runtime: {} };
    "#,
];

pub struct CdpPage {
    page: Page,
    stealth: bool,
}

impl CdpPage {
    pub fn new(page: Page, stealth: bool) -> Self {
        Self { page, stealth }
    }

    async fn eval_string(&self, script: String) -> Result<String, DriverError> {
        self.page
            .evaluate(script)
            .await
            .map_err(cdp_error)?
            .into_value::<String>()
            .map_err(|e| DriverError::Script(e.to_string()))
    }

    /// Run a script that reports its outcome as a short status word.
    async fn eval_status(&self, locator: &Locator, script: String) -> Result<(), DriverError> {
        match self.eval_string(script).await?.as_str() {
            "ok" => Ok(()),
            "missing" => Err(DriverError::ElementNotFound(locator.to_string())),
            "no-option" => Err(DriverError::ElementNotFound(format!(
                "matching option in {}",
                locator
            ))),
            "disabled" => Err(DriverError::NotInteractable(locator.to_string())),
            other => Err(DriverError::Script(format!(
                "unexpected result '{}' for {}",
                other, locator
            ))),
        }
    }

    async fn apply_stealth(&self) {
        for script in STEALTH_SCRIPTS {
            if let Err(e) = self.page.evaluate(script.to_string()).await {
                debug!("Stealth script injection skipped: {}", e);
            }
        }
    }

    async fn dispatch_key(&self, params: Result<DispatchKeyEventParams, String>) -> Result<(), DriverError> {
        let params = params.map_err(DriverError::Protocol)?;
        self.page.execute(params).await.map_err(cdp_error)?;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.page.goto(url).await.map_err(cdp_error)?;
        if self.stealth {
            self.apply_stealth().await;
        }
        Ok(())
    }

    async fn ready_state(&self) -> Result<String, DriverError> {
        self.eval_string("document.readyState".to_string()).await
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.page.url().await.map_err(cdp_error)?.unwrap_or_default())
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok(self
            .page
            .get_title()
            .await
            .map_err(cdp_error)?
            .unwrap_or_default())
    }

    async fn content(&self) -> Result<String, DriverError> {
        self.page.content().await.map_err(cdp_error)
    }

    async fn probe(&self, locator: &Locator) -> Result<Option<ElementInfo>, DriverError> {
        let script = format!(
            r#"(() => {{
                const el = {resolve};
                if (!el) return JSON.stringify(null);
                const style = window.getComputedStyle(el);
                const rect = el.getBoundingClientRect();
                const visible = style.display !== 'none'
                    && style.visibility !== 'hidden'
                    && (rect.width > 0 || rect.height > 0);
                const tag = el.tagName.toLowerCase();
                const options = tag === 'select'
                    ? Array.from(el.options).map(o => ({{ value: o.value, text: o.text.trim() }}))
                    : [];
                const text = (tag === 'input' || tag === 'textarea')
                    ? String(el.value || '')
                    : (el.innerText || el.textContent || '');
                return JSON.stringify({{ tag, visible, enabled: !el.disabled, text: text.trim(), options }});
            }})()"#,
            resolve = resolve_js(locator)
        );

        let json = self.eval_string(script).await?;
        serde_json::from_str(&json).map_err(|e| DriverError::Script(e.to_string()))
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let prepare = format!(
            r#"(() => {{
                const el = {resolve};
                if (!el) return 'missing';
                if (el.disabled || el.readOnly) return 'disabled';
                el.scrollIntoView({{ block: 'center' }});
                el.focus();
                el.value = '';
                return 'ok';
            }})()"#,
            resolve = resolve_js(locator)
        );
        self.eval_status(locator, prepare).await?;

        for ch in text.chars() {
            self.dispatch_key(
                DispatchKeyEventParams::builder()
                    .r#type(DispatchKeyEventType::Char)
                    .text(ch.to_string())
                    .build(),
            )
            .await?;
        }

        let notify = format!(
            r#"(() => {{
                const el = {resolve};
                if (!el) return 'missing';
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return 'ok';
            }})()"#,
            resolve = resolve_js(locator)
        );
        self.eval_status(locator, notify).await
    }

    async fn select(&self, locator: &Locator, method: &SelectMethod) -> Result<(), DriverError> {
        let (mode, wanted) = match method {
            SelectMethod::ByValue(v) => ("value", v),
            SelectMethod::ByText(v) => ("text", v),
            SelectMethod::ByPartialText(v) => ("partial", v),
            SelectMethod::ScriptAssign(v) => ("assign", v),
            SelectMethod::ClickOption(v) => {
                let option = format!(
                    "{}/option[@value={lit} or normalize-space(.)={lit}]",
                    locator.to_xpath(),
                    lit = xpath_literal(v)
                );
                let element = self.page.find_xpath(option).await.map_err(cdp_error)?;
                element.click().await.map_err(cdp_error)?;
                return Ok(());
            }
        };

        let script = format!(
            r#"(() => {{
                const el = {resolve};
                if (!el || el.tagName.toLowerCase() !== 'select') return 'missing';
                const wanted = {wanted};
                const mode = '{mode}';
                if (mode === 'assign') {{
                    el.value = wanted;
                    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    return el.value === wanted ? 'ok' : 'no-option';
                }}
                const opts = Array.from(el.options);
                let opt = null;
                if (mode === 'value') opt = opts.find(o => o.value === wanted);
                if (mode === 'text') opt = opts.find(o => o.text.trim() === wanted);
                if (mode === 'partial') opt = opts.find(o => o.text.toUpperCase().includes(wanted.toUpperCase()));
                if (!opt) return 'no-option';
                opt.selected = true;
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return 'ok';
            }})()"#,
            resolve = resolve_js(locator),
            wanted = js_string(wanted),
            mode = mode
        );
        self.eval_status(locator, script).await
    }

    async fn click(&self, locator: &Locator, mode: ClickMode) -> Result<(), DriverError> {
        match mode {
            ClickMode::Native => {
                let element = self
                    .page
                    .find_xpath(locator.to_xpath())
                    .await
                    .map_err(cdp_error)?;
                element.scroll_into_view().await.map_err(cdp_error)?;
                element.click().await.map_err(cdp_error)?;
                Ok(())
            }
            ClickMode::Script => {
                let script = format!(
                    r#"(() => {{
                        const el = {resolve};
                        if (!el) return 'missing';
                        el.scrollIntoView({{ block: 'center' }});
                        el.click();
                        return 'ok';
                    }})()"#,
                    resolve = resolve_js(locator)
                );
                self.eval_status(locator, script).await
            }
        }
    }

    async fn submit_form(&self) -> Result<(), DriverError> {
        let script = r#"(() => {
            const form = document.querySelector('form');
            if (!form) return 'missing';
            form.submit();
            return 'ok';
        })()"#;
        self.eval_status(&Locator::xpath("//form"), script.to_string())
            .await
    }

    async fn press_enter(&self) -> Result<(), DriverError> {
        self.dispatch_key(
            DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyDown)
                .key("Enter")
                .code("Enter")
                .text("\r")
                .windows_virtual_key_code(13)
                .build(),
        )
        .await?;
        self.dispatch_key(
            DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyUp)
                .key("Enter")
                .code("Enter")
                .windows_virtual_key_code(13)
                .build(),
        )
        .await
    }
}

/// JS expression evaluating to the first node the locator matches.
fn resolve_js(locator: &Locator) -> String {
    format!(
        "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
        js_string(&locator.to_xpath())
    )
}

/// Quote a string as a JS string literal.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn cdp_error(e: CdpError) -> DriverError {
    let message = e.to_string();
    match ErrorKind::classify(&message) {
        ErrorKind::Timeout => DriverError::Timeout(message),
        ErrorKind::ElementNotFound => DriverError::ElementNotFound(message),
        _ => DriverError::Protocol(message),
    }
}
