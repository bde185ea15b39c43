use chrono::Utc;
use serde::Serialize;
use tracing::{error, warn};

use agora_db::{Database, queries};
use agora_types::api::{
    ActionRequest, ActionsQuery, Envelope, LeaderRequest, ProjectsQuery, Request, TrollsQuery,
    VoteRequest, VotesQuery,
};
use agora_types::models::{ActionKind, Rank, VoteDirection};

use crate::error::{PolicyError, PolicyResult};
use crate::{from_unix, member, record};

/// The named-operation surface. One instance wraps the store; every
/// operation is stateless beyond it and returns the result envelope.
pub struct Ledger {
    pub db: Database,
}

impl Ledger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// `leader`: define a leader account, or re-assert an existing one.
    /// Succeeds without touching the row when the id already exists and
    /// the password verifies.
    pub fn leader(&self, req: &LeaderRequest) -> Envelope {
        finish(
            "leader",
            self.db.with_tx(|tx| {
                let at = from_unix(req.timestamp)?;
                member::ensure(tx, req.member, &req.password, at, Rank::Leader)
            }),
        )
    }

    /// `support`: file a support action against a project.
    pub fn support(&self, req: &ActionRequest) -> Envelope {
        finish(
            "support",
            self.db
                .with_tx(|tx| record::action(tx, req, ActionKind::Support)),
        )
    }

    /// `protest`: file a protest action against a project.
    pub fn protest(&self, req: &ActionRequest) -> Envelope {
        finish(
            "protest",
            self.db
                .with_tx(|tx| record::action(tx, req, ActionKind::Protest)),
        )
    }

    /// `upvote`: approve an action. One vote per member per action.
    pub fn upvote(&self, req: &VoteRequest) -> Envelope {
        finish(
            "upvote",
            self.db
                .with_tx(|tx| record::vote(tx, req, VoteDirection::Up)),
        )
    }

    /// `downvote`: disapprove an action. One vote per member per action.
    pub fn downvote(&self, req: &VoteRequest) -> Envelope {
        finish(
            "downvote",
            self.db
                .with_tx(|tx| record::vote(tx, req, VoteDirection::Down)),
        )
    }

    /// `actions`: leader-only listing of actions with vote counts.
    pub fn actions(&self, req: &ActionsQuery) -> Envelope {
        finish_rows(
            "actions",
            self.db.with_conn(|conn| {
                member::verify_leader(conn, req.member, &req.password, Utc::now())?;
                let filter = queries::ActionFilter {
                    kind: req.action_type,
                    project: req.project,
                    authority: req.authority,
                };
                Ok(queries::list_actions(conn, &filter)?)
            }),
        )
    }

    /// `projects`: leader-only listing of projects.
    pub fn projects(&self, req: &ProjectsQuery) -> Envelope {
        finish_rows(
            "projects",
            self.db.with_conn(|conn| {
                member::verify_leader(conn, req.member, &req.password, Utc::now())?;
                Ok(queries::list_projects(conn, req.authority)?)
            }),
        )
    }

    /// `votes`: leader-only per-member vote tallies.
    pub fn votes(&self, req: &VotesQuery) -> Envelope {
        finish_rows(
            "votes",
            self.db.with_conn(|conn| {
                member::verify_leader(conn, req.member, &req.password, Utc::now())?;
                let filter = queries::VoteFilter {
                    action: req.action,
                    project: req.project,
                };
                Ok(queries::list_votes(conn, &filter)?)
            }),
        )
    }

    /// `trolls`: unauthenticated aggregation of net-disapproved members.
    pub fn trolls(&self, req: &TrollsQuery) -> Envelope {
        finish_rows(
            "trolls",
            self.db.with_conn(|conn| {
                let at = from_unix(req.timestamp)?;
                Ok(queries::list_trolls(conn, at)?)
            }),
        )
    }

    /// Dispatch one parsed batch request to its operation.
    pub fn dispatch(&self, req: &Request) -> Envelope {
        match req {
            Request::Leader(r) => self.leader(r),
            Request::Support(r) => self.support(r),
            Request::Protest(r) => self.protest(r),
            Request::Upvote(r) => self.upvote(r),
            Request::Downvote(r) => self.downvote(r),
            Request::Actions(r) => self.actions(r),
            Request::Projects(r) => self.projects(r),
            Request::Votes(r) => self.votes(r),
            Request::Trolls(r) => self.trolls(r),
        }
    }
}

fn finish(op: &str, outcome: PolicyResult<()>) -> Envelope {
    match outcome {
        Ok(()) => Envelope::success(),
        Err(err) => refuse(op, err),
    }
}

fn finish_rows<T: Serialize>(op: &str, outcome: PolicyResult<Vec<T>>) -> Envelope {
    let outcome = outcome.and_then(|rows| {
        serde_json::to_value(rows).map_err(|e| PolicyError::Store(anyhow::anyhow!(e)))
    });
    match outcome {
        Ok(data) => Envelope::success_with(data),
        Err(err) => refuse(op, err),
    }
}

/// Flatten to the coarse failure envelope. The error class stays visible in
/// the logs only; no detail reaches the caller.
fn refuse(op: &str, err: PolicyError) -> Envelope {
    match &err {
        PolicyError::InvalidMember(reason) => warn!(op, %reason, "authorization refused"),
        PolicyError::InvalidRowCount(reason) => warn!(op, %reason, "integrity violation"),
        PolicyError::Store(source) => error!(op, %source, "store failure"),
    }
    Envelope::failure()
}
