pub mod models;
pub mod utils;

pub use color_eyre::{
    eyre::{bail, eyre as err, Context, Report},
    install,
};
pub use url::Url;

/// Site root used when no `site` is configured
pub const DEFAULT_SITE: &str = "http://kanji.koohii.com";

#[twelf::config]
pub struct Conf {
    /// Your Kanji Koohii username
    pub username: Option<String>,

    /// Your Kanji Koohii password
    pub password: Option<String>,

    /// Root URL of the Kanji Koohii site
    pub site: Option<String>,
}

impl Conf {
    pub fn site_url(&self) -> Result<Url, Report> {
        let site = self.site.as_deref().unwrap_or(DEFAULT_SITE);

        Url::parse(site).with_context(|| format!("invalid site url: `{}`", site))
    }
}
