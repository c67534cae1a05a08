//! Session guard
//!
//! Logs the crawler in before the crawl starts and re-authenticates when a
//! burst of failed replays suggests the session was silently invalidated.

use crate::config::{CrawlSpeed, LoginConfig, SimilarityConfig};
use crate::crawler::similarity::{page_similarity, SimilarityWeights};
use crate::crawler::traits::{Analyzer, FormHandler};
use crate::model::{Form, PageContent};
use crate::{Result, RippleError};
use tracing::{debug, info, warn};

/// Credentials plus the thresholds needed to judge a login attempt
#[derive(Debug, Clone)]
pub struct SessionGuard {
    login: Option<LoginConfig>,
    weights: SimilarityWeights,
    change_threshold: f64,
    speed: CrawlSpeed,
}

impl SessionGuard {
    pub fn new(login: Option<LoginConfig>, similarity: &SimilarityConfig, speed: CrawlSpeed) -> Self {
        Self {
            login,
            weights: SimilarityWeights::from(similarity),
            change_threshold: similarity.login_change_threshold,
            speed,
        }
    }

    /// A guard without credentials never finds a login form
    pub fn is_configured(&self) -> bool {
        self.login.is_some()
    }

    /// Logs in before the crawl starts
    ///
    /// Any failure here is fatal for the run and surfaces as `RippleError::Login`.
    pub async fn initial_login(
        &self,
        analyzer: &mut dyn Analyzer,
        forms: &mut dyn FormHandler,
    ) -> Result<()> {
        let Some(login) = &self.login else {
            return Ok(());
        };

        info!("Logging in as {} via {}", login.username, login.url_with_login_form);
        let login_page = analyzer
            .analyze(&login.url_with_login_form, 0, self.speed.page_timeout())
            .await
            .map_err(|e| RippleError::Login(format!("cannot load login page: {}", e)))?;

        let form = find_login_form(&login_page.content.forms, login).ok_or_else(|| {
            RippleError::Login(format!(
                "no login form found on {}",
                login.url_with_login_form
            ))
        })?;

        if self.submit_and_judge(forms, form, &login_page.content, login).await? {
            info!("Login as {} succeeded", login.username);
            Ok(())
        } else {
            Err(RippleError::Login(format!(
                "landing page after logging in as {} still looks like the login page",
                login.username
            )))
        }
    }

    /// Checks whether the session was lost and logs in again if so
    ///
    /// Returns true only when a login form was found and resubmitting the
    /// credentials moved the browser away from it. A missing login form
    /// means the session is intact, so the failures have another cause and
    /// the guard reports false.
    pub async fn recheck(
        &self,
        analyzer: &mut dyn Analyzer,
        forms: &mut dyn FormHandler,
    ) -> Result<bool> {
        let Some(login) = &self.login else {
            debug!("Session check skipped: crawl runs without login");
            return Ok(false);
        };

        let login_page = match analyzer
            .analyze(&login.url_with_login_form, 0, self.speed.page_timeout())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                warn!("Session check could not load {}: {}", login.url_with_login_form, e);
                return Ok(false);
            }
        };

        let Some(form) = find_login_form(&login_page.content.forms, login) else {
            debug!("No login form visible, session looks intact");
            return Ok(false);
        };

        info!("Login form reappeared, logging in again as {}", login.username);
        match self.submit_and_judge(forms, form, &login_page.content, login).await {
            Ok(success) => Ok(success),
            Err(e) => {
                warn!("Re-login failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn submit_and_judge(
        &self,
        forms: &mut dyn FormHandler,
        form: &Form,
        logged_out: &PageContent,
        login: &LoginConfig,
    ) -> Result<bool> {
        let landing = forms
            .submit(form, &login.url_with_login_form, &login.data)
            .await?;
        let score = page_similarity(logged_out, &landing.content, self.weights);
        debug!(
            "Landing page after login scores {:.3} against the login page (threshold {})",
            score, self.change_threshold
        );
        Ok(score < self.change_threshold)
    }
}

/// First form whose serialized fields mention the first two credential keys
pub fn find_login_form<'a>(forms: &'a [Form], login: &LoginConfig) -> Option<&'a Form> {
    let markers: Vec<&str> = login.data.keys().take(2).map(String::as_str).collect();
    if markers.len() < 2 {
        return None;
    }

    forms.iter().find(|form| {
        let signature = form.signature();
        markers.iter().all(|marker| signature.contains(marker))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::traits::AnalyzedPage;
    use crate::model::{Clickable, FormInput, Link};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn login_config() -> LoginConfig {
        let mut data = BTreeMap::new();
        data.insert("pass".to_string(), "secret".to_string());
        data.insert("user".to_string(), "admin".to_string());
        LoginConfig {
            url_with_login_form: "http://localhost/login".to_string(),
            username: "admin".to_string(),
            data,
        }
    }

    fn form(names: &[&str]) -> Form {
        Form {
            action: "http://localhost/login".to_string(),
            method: "POST".to_string(),
            dom_address: "/html[1]/body[1]/form[1]".to_string(),
            inputs: names
                .iter()
                .map(|n| FormInput {
                    name: n.to_string(),
                    input_type: "text".to_string(),
                    value: None,
                })
                .collect(),
        }
    }

    fn login_page() -> AnalyzedPage {
        AnalyzedPage {
            status_code: 200,
            landing_url: "http://localhost/login".to_string(),
            content: PageContent {
                forms: vec![form(&["user", "pass"])],
                ..PageContent::default()
            },
            ..AnalyzedPage::default()
        }
    }

    fn dashboard() -> AnalyzedPage {
        AnalyzedPage {
            status_code: 200,
            landing_url: "http://localhost/home".to_string(),
            content: PageContent {
                clickables: vec![Clickable::new("onclick", "button", "/html[1]/body[1]/button[1]")],
                links: vec![Link::new("http://localhost/profile", "/html[1]/body[1]/a[1]")],
                ..PageContent::default()
            },
            ..AnalyzedPage::default()
        }
    }

    struct FixedAnalyzer(AnalyzedPage);

    #[async_trait]
    impl Analyzer for FixedAnalyzer {
        async fn analyze(&mut self, _url: &str, _depth: u32, _timeout: Duration) -> Result<AnalyzedPage> {
            Ok(self.0.clone())
        }
    }

    struct FixedForms {
        landing: AnalyzedPage,
        submissions: usize,
    }

    #[async_trait]
    impl FormHandler for FixedForms {
        async fn submit(
            &mut self,
            _form: &Form,
            _page_url: &str,
            credentials: &BTreeMap<String, String>,
        ) -> Result<AnalyzedPage> {
            assert_eq!(credentials.get("user").map(String::as_str), Some("admin"));
            self.submissions += 1;
            Ok(self.landing.clone())
        }
    }

    fn guard(login: Option<LoginConfig>) -> SessionGuard {
        SessionGuard::new(login, &SimilarityConfig::default(), CrawlSpeed::SpeedOfLight)
    }

    #[test]
    fn test_find_login_form_uses_credential_keys() {
        let login = login_config();
        let forms = vec![form(&["q"]), form(&["user", "pass", "remember"])];
        let found = find_login_form(&forms, &login).unwrap();
        assert_eq!(found.inputs.len(), 3);

        assert!(find_login_form(&[form(&["user"])], &login).is_none());
    }

    #[tokio::test]
    async fn test_initial_login_succeeds_when_landing_page_differs() {
        let mut analyzer = FixedAnalyzer(login_page());
        let mut forms = FixedForms { landing: dashboard(), submissions: 0 };

        guard(Some(login_config()))
            .initial_login(&mut analyzer, &mut forms)
            .await
            .unwrap();
        assert_eq!(forms.submissions, 1);
    }

    #[tokio::test]
    async fn test_initial_login_fails_when_still_on_login_page() {
        let mut analyzer = FixedAnalyzer(login_page());
        let mut forms = FixedForms { landing: login_page(), submissions: 0 };

        let result = guard(Some(login_config()))
            .initial_login(&mut analyzer, &mut forms)
            .await;
        assert!(matches!(result, Err(RippleError::Login(_))));
    }

    #[tokio::test]
    async fn test_initial_login_fails_without_form() {
        let mut analyzer = FixedAnalyzer(dashboard());
        let mut forms = FixedForms { landing: dashboard(), submissions: 0 };

        let result = guard(Some(login_config()))
            .initial_login(&mut analyzer, &mut forms)
            .await;
        assert!(matches!(result, Err(RippleError::Login(_))));
        assert_eq!(forms.submissions, 0);
    }

    #[tokio::test]
    async fn test_recheck_without_login_form_reports_failure() {
        let mut analyzer = FixedAnalyzer(dashboard());
        let mut forms = FixedForms { landing: dashboard(), submissions: 0 };

        let ok = guard(Some(login_config()))
            .recheck(&mut analyzer, &mut forms)
            .await
            .unwrap();
        assert!(!ok);
        assert_eq!(forms.submissions, 0);
    }

    #[tokio::test]
    async fn test_recheck_logs_in_again_when_form_reappears() {
        let mut analyzer = FixedAnalyzer(login_page());
        let mut forms = FixedForms { landing: dashboard(), submissions: 0 };

        let ok = guard(Some(login_config()))
            .recheck(&mut analyzer, &mut forms)
            .await
            .unwrap();
        assert!(ok);
        assert_eq!(forms.submissions, 1);
    }

    #[tokio::test]
    async fn test_recheck_without_credentials_is_false() {
        let mut analyzer = FixedAnalyzer(login_page());
        let mut forms = FixedForms { landing: dashboard(), submissions: 0 };

        assert!(!guard(None).recheck(&mut analyzer, &mut forms).await.unwrap());
        assert!(!guard(None).is_configured());
    }
}
