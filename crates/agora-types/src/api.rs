use serde::{Deserialize, Serialize};

use crate::models::{ActionId, ActionKind, MemberId, ProjectId};

// -- Result envelope --

/// Outcome of a single named operation. Mutations return `{"status": "OK"}`
/// or `{"status": "ERROR"}`; queries attach their rows under `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Envelope {
    pub fn success() -> Self {
        Self {
            status: Status::Success,
            data: None,
        }
    }

    pub fn success_with(data: serde_json::Value) -> Self {
        Self {
            status: Status::Success,
            data: Some(data),
        }
    }

    pub fn failure() -> Self {
        Self {
            status: Status::Failure,
            data: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Success,
    #[serde(rename = "ERROR")]
    Failure,
}

// -- Requests --

/// One named request, as read by the batch runner. The wire shape is a
/// single externally-tagged object per request: `{"upvote": {...}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Request {
    Leader(LeaderRequest),
    Support(ActionRequest),
    Protest(ActionRequest),
    Upvote(VoteRequest),
    Downvote(VoteRequest),
    Actions(ActionsQuery),
    Projects(ProjectsQuery),
    Votes(VotesQuery),
    Trolls(TrollsQuery),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeaderRequest {
    pub timestamp: i64,
    pub password: String,
    pub member: MemberId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionRequest {
    pub timestamp: i64,
    pub member: MemberId,
    pub password: String,
    pub action: ActionId,
    pub project: ProjectId,
    #[serde(default)]
    pub authority: Option<MemberId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    pub timestamp: i64,
    pub member: MemberId,
    pub password: String,
    pub action: ActionId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionsQuery {
    pub member: MemberId,
    pub password: String,
    #[serde(default)]
    pub action_type: Option<ActionKind>,
    #[serde(default)]
    pub project: Option<ProjectId>,
    #[serde(default)]
    pub authority: Option<MemberId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectsQuery {
    pub member: MemberId,
    pub password: String,
    #[serde(default)]
    pub authority: Option<MemberId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VotesQuery {
    pub member: MemberId,
    pub password: String,
    #[serde(default)]
    pub action: Option<ActionId>,
    #[serde(default)]
    pub project: Option<ProjectId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrollsQuery {
    pub timestamp: i64,
}

// -- Query rows --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSummary {
    pub action: ActionId,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub project: ProjectId,
    pub leader: MemberId,
    pub upvotes: i64,
    pub downvotes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub project: ProjectId,
    pub leader: MemberId,
}

/// One row per member, voters or not; counts default to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub member: MemberId,
    pub upvotes: i64,
    pub downvotes: i64,
}

/// A net-disapproved member. `active` is true when the account's activity
/// year is not older than the year of the query timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrollSummary {
    pub member: MemberId,
    pub upvotes: i64,
    pub downvotes: i64,
    pub active: bool,
}
