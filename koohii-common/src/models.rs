/// One scraped study page
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub character: String,
    pub reading: String,
    pub frame_number: u32,
    pub stroke_count: u32,
    /// The signed in user's own story, empty when none was written
    pub story: String,
    /// Shared stories, most starred first
    pub stories: Vec<Story>,
}

/// A mnemonic shared by another member
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub author: String,
    pub content: String,
    pub modified_date: String,
    pub starred_count: u32,
    pub reported_count: u32,
}
