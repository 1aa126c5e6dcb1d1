use std::collections::{HashMap, HashSet};

use koohii_common::{
    err,
    utils::{Browser, Form, Page},
    Report, Url,
};
use tokio::time::Instant;

pub const SITE: &str = "http://kanji.koohii.com";

pub const LOGIN: &str = include_str!("../fixtures/login.html");
pub const HOME: &str = include_str!("../fixtures/home.html");
pub const STUDY: &str = include_str!("../fixtures/study.html");

/// In-memory [`Browser`] serving fixture pages and recording every request
pub struct FixtureBrowser {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    landing: String,
    submit_fails: bool,
    pub requests: Vec<(String, Instant)>,
    pub submitted: Vec<Form>,
}

impl FixtureBrowser {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            failing: HashSet::new(),
            landing: HOME.to_string(),
            submit_fails: false,
            requests: Vec::new(),
            submitted: Vec::new(),
        }
        .with_page(&format!("{}/login", SITE), LOGIN)
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub fn with_study(self, lookup: &str) -> Self {
        let url = format!("{}/study/kanji/{}", SITE, lookup);
        self.with_page(&url, STUDY)
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// Answers the login submission with the sign in page again
    pub fn rejecting_login(self) -> Self {
        self.landing_on(LOGIN)
    }

    /// Answers the login submission with `body`
    pub fn landing_on(mut self, body: &str) -> Self {
        self.landing = body.to_string();
        self
    }

    pub fn failing_submit(mut self) -> Self {
        self.submit_fails = true;
        self
    }

    pub fn fetched(&self) -> Vec<&str> {
        self.requests.iter().map(|(url, _)| url.as_str()).collect()
    }
}

#[async_trait::async_trait(?Send)]
impl Browser for FixtureBrowser {
    async fn fetch(&mut self, url: &Url) -> Result<Page, Report> {
        self.requests.push((url.to_string(), Instant::now()));

        if self.failing.contains(url.as_str()) {
            return Err(err!("connection reset while fetching `{}`", url));
        }

        let body = self
            .pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| err!("`{}` responded with status 404 Not Found", url))?;

        Ok(Page {
            url: url.clone(),
            body,
        })
    }

    async fn submit(&mut self, form: &Form) -> Result<Page, Report> {
        self.submitted.push(form.clone());

        if self.submit_fails {
            return Err(err!("connection reset while posting to `{}`", form.action));
        }

        Ok(Page {
            url: form.action.clone(),
            body: self.landing.clone(),
        })
    }
}
