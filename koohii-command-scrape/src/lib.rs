mod extract;
mod query;
mod session;
mod utils;

#[cfg(test)]
mod fixture;

use std::{path::PathBuf, time::Duration};

use koohii_common::{
    models::Entry,
    utils::{Browser, HttpBrowser},
    Context as _, Report, Url,
};

pub use extract::{extract, rank, scrape};
pub use query::Document;
pub use session::{login, AuthError, SIGNED_OUT_TITLE};

/// Where the lookup keys come from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookups {
    /// Every frame from `first` to `last`, both included
    Frames { first: u32, last: u32 },
    /// One key per non-empty line
    File(PathBuf),
}

impl Lookups {
    pub fn resolve(&self) -> Result<Vec<String>, Report> {
        match self {
            Lookups::Frames { first, last } => Ok(frames(*first, *last)),
            Lookups::File(path) => {
                tracing::info!(path = %path.display(), "loading lookups");

                koohii_store::load_lookups(path)
            }
        }
    }
}

pub fn frames(first: u32, last: u32) -> Vec<String> {
    (first..=last).map(|frame| frame.to_string()).collect()
}

/// Everything a single scrape run needs
#[derive(Clone, Debug)]
pub struct Job {
    pub site: Url,
    pub username: String,
    pub password: String,
    pub lookups: Lookups,
    pub output: PathBuf,
    /// Pause between two consecutive study page requests
    pub delay: Duration,
    /// Skip lookups whose page cannot be fetched instead of aborting
    pub keep_going: bool,
}

#[tracing::instrument(skip(job), fields(output = %job.output.display()), err)]
pub async fn run(job: &Job) -> Result<(), Report> {
    let mut browser = HttpBrowser::new()?;

    run_with(&mut browser, job).await
}

/// Signs in, scrapes every lookup and writes the result once at the end.
pub async fn run_with<B: Browser>(browser: &mut B, job: &Job) -> Result<(), Report> {
    tracing::info!(username = %job.username, "logging in");

    session::login(browser, &job.site, &job.username, &job.password).await?;

    let lookups = job.lookups.resolve()?;

    tracing::info!(count = lookups.len(), "starting scrape");

    let entries = scrape_all(browser, job, &lookups).await?;

    tracing::info!(path = %job.output.display(), entries = entries.len(), "saving");

    koohii_store::save(&job.output, &entries)?;

    Ok(())
}

async fn scrape_all<B: Browser>(
    browser: &mut B,
    job: &Job,
    lookups: &[String],
) -> Result<Vec<Entry>, Report> {
    let mut entries = Vec::with_capacity(lookups.len());

    for (index, lookup) in lookups.iter().enumerate() {
        if index > 0 {
            utils::pause(job.delay).await;
        }

        tracing::info!(lookup = %lookup, "scraping");

        match extract::scrape(browser, &job.site, lookup).await {
            Ok(entry) => entries.push(entry),
            Err(err) if job.keep_going => {
                tracing::warn!(lookup = %lookup, err = ?err, "skipping lookup");
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("scrape aborted at lookup `{}`", lookup));
            }
        }
    }

    Ok(entries)
}
