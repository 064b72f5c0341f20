//! GitHub REST wire types, limited to the fields the bot reads.

use serde::Deserialize;

use crate::policy::types::ReviewState;

/// An issue from the authenticated-user issue listing. PRs show up here too;
/// the gate label filter means everything we receive is a PR.
#[derive(Debug, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub repository: Repository,
}

#[derive(Debug, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: Owner,
}

#[derive(Debug, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct PullResponse {
    pub merged: bool,
    /// `null` while GitHub's background mergeability check is running.
    pub mergeable: Option<bool>,
    pub head: Head,
}

#[derive(Debug, Deserialize)]
pub struct Head {
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// `null` when the head fork has been deleted.
    pub repo: Option<HeadRepo>,
}

#[derive(Debug, Deserialize)]
pub struct HeadRepo {
    pub name: String,
    pub owner: Owner,
}

#[derive(Debug, Deserialize)]
pub struct Review {
    pub state: ReviewState,
}

#[derive(Debug, Deserialize)]
pub struct CommitStatus {
    pub state: String,
}
