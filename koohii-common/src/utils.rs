use isahc::{
    config::{Configurable as _, RedirectPolicy},
    AsyncReadResponseExt as _, HttpClient, Request, ResponseExt as _,
};

use crate::{err, Context as _, Report, Url};

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";
#[cfg(all(target_os = "linux", not(target_arch = "x86_64")))]
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux i686; rv:109.0) Gecko/20100101 Firefox/115.0";

#[cfg(all(target_os = "windows", target_arch = "x86_64"))]
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/115.0";
#[cfg(all(target_os = "windows", not(target_arch = "x86_64")))]
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; rv:109.0) Gecko/20100101 Firefox/115.0";

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
// Neither Linux nor Windows, so maybe OS X, and if not then OS X is an okay fallback.
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:109.0) Gecko/20100101 Firefox/115.0";

/// A fetched HTML page and the URL it was finally served from
#[derive(Clone, Debug)]
pub struct Page {
    pub url: Url,
    pub body: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A HTML form ready to be submitted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Form {
    pub action: Url,
    pub method: Method,
    pub fields: Vec<(String, String)>,
}

impl Form {
    /// Sets the value of an existing field, returning `false` when the form has no such field.
    pub fn input(&mut self, name: &str, value: &str) -> bool {
        match self.fields.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => {
                *slot = value.to_string();

                true
            }
            None => false,
        }
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Stateful page fetching, the session lives inside the implementor
#[async_trait::async_trait(?Send)]
pub trait Browser {
    async fn fetch(&mut self, url: &Url) -> Result<Page, Report>;

    async fn submit(&mut self, form: &Form) -> Result<Page, Report>;
}

/// [`Browser`] backed by isahc with a cookie jar
pub struct HttpBrowser {
    client: HttpClient,
}

impl HttpBrowser {
    pub fn new() -> Result<Self, Report> {
        let client = HttpClient::builder()
            .default_header("User-Agent", USER_AGENT)
            .default_header("Accept", "text/html")
            .default_header("Accept-Charset", "utf8")
            .redirect_policy(RedirectPolicy::Follow)
            .cookies()
            .build()
            .context("unable to build http client")?;

        Ok(Self { client })
    }

    async fn send(&self, url: &Url, req: Request<Vec<u8>>) -> Result<Page, Report> {
        let mut res = self
            .client
            .send_async(req)
            .await
            .with_context(|| format!("request to `{}` failed", url))?;

        let status = res.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(err!("`{}` responded with status {}", url, status));
        }

        let final_url = res
            .effective_uri()
            .and_then(|uri| Url::parse(&uri.to_string()).ok())
            .unwrap_or_else(|| url.clone());

        let body = res
            .text()
            .await
            .with_context(|| format!("unable to read body of `{}`", url))?;

        Ok(Page {
            url: final_url,
            body,
        })
    }
}

#[async_trait::async_trait(?Send)]
impl Browser for HttpBrowser {
    #[tracing::instrument(err, skip(self, url), fields(url = %url))]
    async fn fetch(&mut self, url: &Url) -> Result<Page, Report> {
        tracing::debug!("fetching");

        let req = Request::get(url.as_str()).body(Vec::new())?;

        self.send(url, req).await
    }

    #[tracing::instrument(err, skip(self, form), fields(action = %form.action))]
    async fn submit(&mut self, form: &Form) -> Result<Page, Report> {
        tracing::debug!("submitting form");

        match form.method {
            Method::Get => {
                let mut url = form.action.clone();
                url.query_pairs_mut().extend_pairs(form.fields.iter());

                let req = Request::get(url.as_str()).body(Vec::new())?;

                self.send(&url, req).await
            }
            Method::Post => {
                let body = serde_urlencoded::to_string(&form.fields)
                    .context("unable to encode form fields")?;

                let req = Request::post(form.action.as_str())
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(body.into_bytes())?;

                self.send(&form.action, req).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_form() -> Form {
        Form {
            action: Url::parse("http://kanji.koohii.com/login").unwrap(),
            method: Method::Post,
            fields: vec![
                ("referer".to_string(), "@homepage".to_string()),
                ("username".to_string(), String::new()),
                ("password".to_string(), String::new()),
            ],
        }
    }

    #[test]
    fn input_sets_existing_field() {
        let mut form = login_form();

        assert!(form.input("username", "kanji"));
        assert_eq!(form.value("username"), Some("kanji"));
        assert_eq!(form.value("referer"), Some("@homepage"));
    }

    #[test]
    fn input_rejects_unknown_field() {
        let mut form = login_form();

        assert!(!form.input("email", "kanji@example.com"));
        assert_eq!(form.fields.len(), 3);
    }
}
