use chrono::{DateTime, Utc};
use rusqlite::Connection;

use agora_db::queries;
use agora_types::models::{MemberId, ProjectId};

use crate::error::{PolicyError, PolicyResult};

/// Resolve a referenced project. An existing project is left untouched; an
/// unknown one is created under the supplied authority, which must itself
/// be an existing leader.
pub fn resolve(
    conn: &Connection,
    project: ProjectId,
    authority: Option<MemberId>,
    at: DateTime<Utc>,
) -> PolicyResult<()> {
    if queries::project_exists(conn, project)? {
        return Ok(());
    }

    let authority = authority.ok_or_else(|| {
        PolicyError::InvalidMember(format!(
            "project {project} is unknown and no authority was supplied"
        ))
    })?;
    if !queries::leader_exists(conn, authority)? {
        return Err(PolicyError::InvalidMember(format!(
            "authority {authority} is not a leader"
        )));
    }

    queries::insert_project(conn, project, authority, at)?;
    Ok(())
}
