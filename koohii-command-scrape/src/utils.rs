use std::time::Duration;

use koohii_common::{err, Report, Url};

/// Appends `segments` to the site root, percent-encoding each one.
pub(crate) fn page_url(site: &Url, segments: &[&str]) -> Result<Url, Report> {
    let mut url = site.clone();

    url.path_segments_mut()
        .map_err(|_| err!("site url `{}` cannot be used as a base", site))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

pub(crate) async fn pause(delay: Duration) {
    if delay.is_zero() {
        return;
    }

    tracing::info!("sleeping for {:?}", delay);

    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_appends_segments() {
        let site = Url::parse("http://kanji.koohii.com").unwrap();

        let url = page_url(&site, &["study", "kanji", "12"]).unwrap();

        assert_eq!(url.as_str(), "http://kanji.koohii.com/study/kanji/12");
    }

    #[test]
    fn page_url_encodes_glyphs_and_keeps_site_prefix() {
        let site = Url::parse("https://mirror.example/koohii/").unwrap();

        let url = page_url(&site, &["study", "kanji", "朋 "]).unwrap();

        assert_eq!(
            url.as_str(),
            "https://mirror.example/koohii/study/kanji/%E6%9C%8B%20"
        );
    }

    #[test]
    fn page_url_rejects_opaque_site() {
        let site = Url::parse("mailto:someone@example.com").unwrap();

        assert!(page_url(&site, &["login"]).is_err());
    }
}
