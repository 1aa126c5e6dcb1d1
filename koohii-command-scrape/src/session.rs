use std::fmt;

use koohii_common::{
    utils::{Browser, Form, Method, Page},
    Context as _, Report, Url,
};

use crate::{
    query::{Document, Element},
    utils,
};

/// Title of the page served to anyone who is not signed in
pub const SIGNED_OUT_TITLE: &str = "Sign In - Kanji Koohii";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The login page has no form, the layout changed
    FormNotFound,
    /// The login form is missing a field we need to fill in
    FieldNotFound(&'static str),
    /// The site answered the submission with its sign in page again
    Rejected,
    /// The login page could not be fetched
    Unreachable,
    /// The filled in form could not be submitted
    SubmitFailed,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::FormNotFound => write!(f, "login form not found"),
            AuthError::FieldNotFound(name) => write!(f, "login form has no `{}` field", name),
            AuthError::Rejected => write!(f, "failed to sign in"),
            AuthError::Unreachable => write!(f, "unable to reach the login page"),
            AuthError::SubmitFailed => write!(f, "unable to submit the login form"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Signs in, leaving the session cookies inside `browser`.
#[tracing::instrument(skip(browser, site, password), fields(site = %site), err)]
pub async fn login<B: Browser>(
    browser: &mut B,
    site: &Url,
    username: &str,
    password: &str,
) -> Result<(), Report> {
    let login_url = utils::page_url(site, &["login"])?;

    let page = browser
        .fetch(&login_url)
        .await
        .wrap_err(AuthError::Unreachable)?;

    let mut form = login_form(&page)?.ok_or_else(|| Report::new(AuthError::FormNotFound))?;

    for (name, value) in [("username", username), ("password", password)] {
        if !form.input(name, value) {
            return Err(Report::new(AuthError::FieldNotFound(name)));
        }
    }

    tracing::debug!(action = %form.action, "submitting login form");

    let landing = browser
        .submit(&form)
        .await
        .wrap_err(AuthError::SubmitFailed)?;

    let doc = Document::try_from(landing.body.as_str())?;
    if doc.title() == SIGNED_OUT_TITLE {
        return Err(Report::new(AuthError::Rejected));
    }

    tracing::info!("signed in");

    Ok(())
}

/// Reads the first form on `page`, `None` when the page has none.
pub fn login_form(page: &Page) -> Result<Option<Form>, Report> {
    let doc = Document::try_from(page.body.as_str())?;

    let element = match doc.select("form").into_iter().next() {
        Some(element) => element,
        None => return Ok(None),
    };

    let action = match element.attr("action").filter(|action| !action.trim().is_empty()) {
        Some(action) => page
            .url
            .join(action.trim())
            .with_context(|| format!("invalid form action `{}` on `{}`", action, page.url))?,
        None => page.url.clone(),
    };

    let method = match element.attr("method") {
        Some(method) if method.eq_ignore_ascii_case("post") => Method::Post,
        _ => Method::Get,
    };

    // Named controls, in the order the page lists them.
    let fields = element
        .select("[name]")
        .iter()
        .filter_map(control_value)
        .collect();

    Ok(Some(Form {
        action,
        method,
        fields,
    }))
}

/// The name and value a control submits, `None` for controls that send nothing.
fn control_value(control: &Element) -> Option<(String, String)> {
    static SKIPPED_INPUTS: [&str; 5] = ["submit", "button", "image", "reset", "file"];

    let name = control.attr("name")?;

    match control.tag()?.as_str() {
        "input" => {
            let kind = control.attr("type").unwrap_or_default().to_ascii_lowercase();
            if SKIPPED_INPUTS.contains(&kind.as_str()) {
                return None;
            }

            let checkable = kind == "checkbox" || kind == "radio";
            if checkable && !control.has_attr("checked") {
                return None;
            }

            let value = match control.attr("value") {
                Some(value) => value,
                None if checkable => "on".to_string(),
                None => String::new(),
            };

            Some((name, value))
        }
        "select" => {
            let option = control
                .select("option[selected]")
                .into_iter()
                .next()
                .or_else(|| control.select("option").into_iter().next())?;

            let value = option
                .attr("value")
                .unwrap_or_else(|| option.text().trim().to_string());

            Some((name, value))
        }
        "textarea" => Some((name, control.text())),
        _ => None,
    }
}
