use crate::browser::{browser_error, navigate, snapshot};
use crate::config::CrawlSpeed;
use crate::crawler::{AnalyzedPage, FormHandler};
use crate::model::Form;
use crate::{Result, RippleError};
use async_trait::async_trait;
use fantoccini::{Client, Locator};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Fills in and submits forms in the browser
pub struct WebDriverFormHandler {
    client: Client,
    page_timeout: Duration,
    settle: Duration,
}

impl WebDriverFormHandler {
    pub fn new(client: Client, speed: CrawlSpeed) -> Self {
        Self {
            client,
            page_timeout: speed.page_timeout(),
            settle: speed.settle_time(),
        }
    }
}

#[async_trait]
impl FormHandler for WebDriverFormHandler {
    async fn submit(
        &mut self,
        form: &Form,
        page_url: &str,
        credentials: &BTreeMap<String, String>,
    ) -> Result<AnalyzedPage> {
        let fields: Vec<(&String, &String)> = credentials
            .iter()
            .filter(|(name, _)| form.inputs.iter().any(|input| &input.name == *name))
            .collect();
        if fields.is_empty() {
            return Err(RippleError::FormSubmission(format!(
                "form {} has none of the credential fields",
                form.dom_address
            )));
        }

        navigate(&self.client, page_url, self.page_timeout).await?;
        let element = self
            .client
            .form(Locator::XPath(&form.dom_address))
            .await
            .map_err(|e| {
                RippleError::FormSubmission(format!("form {} not found: {}", form.dom_address, e))
            })?;

        for (name, value) in fields {
            debug!("Filling field {}", name);
            element
                .set_by_name(name, value)
                .await
                .map_err(|e| browser_error("filling form field", e))?;
        }
        element
            .submit()
            .await
            .map_err(|e| browser_error("submitting form", e))?;
        tokio::time::sleep(self.settle).await;

        let (landing_url, html, content) = snapshot(&self.client).await?;
        Ok(AnalyzedPage {
            status_code: 200,
            landing_url,
            html,
            content,
            timing_requests: Vec::new(),
        })
    }
}
