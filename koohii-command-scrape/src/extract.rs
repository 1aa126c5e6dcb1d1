use std::sync::OnceLock;

use koohii_common::{
    models::{Entry, Story},
    utils::Browser,
    Context as _, Report, Url,
};
use regex::Regex;

use crate::{
    query::{Document, Element},
    utils,
};

/// What the story editor shows when the user never wrote a story
pub const STORY_PLACEHOLDER: &str = "[ click here to enter your story ]";

fn stroke_correction() -> &'static Regex {
    static STROKE_CORRECTION: OnceLock<Regex> = OnceLock::new();

    STROKE_CORRECTION
        .get_or_init(|| Regex::new(r"\[(\d+)\]").expect("stroke count pattern is valid"))
}

#[tracing::instrument(skip(browser, site), fields(site = %site), err)]
pub async fn scrape<B: Browser>(
    browser: &mut B,
    site: &Url,
    lookup: &str,
) -> Result<Entry, Report> {
    let url = utils::page_url(site, &["study", "kanji", lookup])?;

    let page = browser
        .fetch(&url)
        .await
        .with_context(|| format!("unable to fetch study page `{}`", url))?;

    let doc = Document::try_from(page.body.as_str())?;

    let entry = extract(&doc);

    tracing::debug!(
        character = %entry.character,
        frame_number = entry.frame_number,
        stories = entry.stories.len(),
        "extracted entry"
    );

    Ok(entry)
}

/// Builds an entry from a study page. Missing or malformed fields become empty or zero.
pub fn extract(doc: &Document) -> Entry {
    static CHARACTER: &str = "div.kanji span.cj-k";
    static READING: &str = "div.strokecount span.cj-k";
    static FRAME_NUMBER: &str = "div.framenum";
    static STROKE_COUNT: &str = "div.strokecount";
    static STORY: &str = "div#sv-textarea";
    static SHARED_STORY: &str = "div.sharedstory";

    let mut stories: Vec<Story> = doc.select(SHARED_STORY).iter().map(shared_story).collect();
    rank(&mut stories);

    Entry {
        character: doc.text(CHARACTER).trim().to_string(),
        reading: doc.text(READING).trim().to_string(),
        frame_number: parse_count(&doc.text(FRAME_NUMBER)),
        stroke_count: stroke_count(&doc.text(STROKE_COUNT)),
        story: own_story(&doc.text(STORY)),
        stories,
    }
}

fn shared_story(element: &Element) -> Story {
    static AUTHOR: &str = "div.sharedstory_author a";
    static CONTENT: &str = "div.story";
    static MODIFIED_DATE: &str = "div.lastmodified";
    static STARRED: &str = "a.JsStar";
    static REPORTED: &str = "a.JsReport";

    Story {
        author: element.select_text(AUTHOR).trim().to_string(),
        content: element.select_text(CONTENT).trim().to_string(),
        modified_date: element.select_text(MODIFIED_DATE).trim().to_string(),
        starred_count: parse_count(&element.select_text(STARRED)),
        reported_count: parse_count(&element.select_text(REPORTED)),
    }
}

/// Most starred first, stories with equal stars keep their page order.
pub fn rank(stories: &mut [Story]) {
    stories.sort_by(|a, b| b.starred_count.cmp(&a.starred_count));
}

fn parse_count(text: &str) -> u32 {
    text.trim().parse().unwrap_or(0)
}

/// Leading number of the stroke count text, unless a bracketed correction
/// such as `[10]` is present.
pub fn stroke_count(text: &str) -> u32 {
    let leading = text
        .split_whitespace()
        .next()
        .and_then(|token| token.parse().ok())
        .unwrap_or(0);

    stroke_correction()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|corrected| corrected.as_str().parse().ok())
        .unwrap_or(leading)
}

pub fn own_story(text: &str) -> String {
    match text.trim() {
        STORY_PLACEHOLDER => String::new(),
        story => story.to_string(),
    }
}
