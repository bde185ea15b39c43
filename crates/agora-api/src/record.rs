use rusqlite::Connection;

use agora_db::queries;
use agora_types::api::{ActionRequest, VoteRequest};
use agora_types::models::{ActionKind, Rank, VoteDirection};

use crate::error::{PolicyError, PolicyResult};
use crate::{from_unix, member, project};

/// Record a support or protest action: provision the proposer, resolve the
/// project (lazily creating it under the request's authority), insert the
/// action row. The caller runs this inside one transaction.
pub fn action(conn: &Connection, req: &ActionRequest, kind: ActionKind) -> PolicyResult<()> {
    let at = from_unix(req.timestamp)?;
    member::ensure(conn, req.member, &req.password, at, Rank::Regular)?;
    project::resolve(conn, req.project, req.authority, at)?;
    queries::insert_action(conn, req.action, req.project, req.member, kind, at)?;
    Ok(())
}

/// Record an up or down vote. The target action must exist, and a member
/// votes on a given action at most once.
pub fn vote(conn: &Connection, req: &VoteRequest, direction: VoteDirection) -> PolicyResult<()> {
    let at = from_unix(req.timestamp)?;
    member::ensure(conn, req.member, &req.password, at, Rank::Regular)?;

    if !queries::action_exists(conn, req.action)? {
        return Err(PolicyError::InvalidRowCount(format!(
            "action {} does not exist",
            req.action
        )));
    }
    if queries::vote_exists(conn, req.member, req.action)? {
        return Err(PolicyError::InvalidRowCount(format!(
            "member {} has already voted on action {}",
            req.member, req.action
        )));
    }

    queries::insert_vote(conn, req.member, req.action, direction, at)?;
    Ok(())
}
