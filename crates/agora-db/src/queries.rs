use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Datelike, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use agora_types::api::{ActionSummary, ProjectSummary, TrollSummary, VoteTally};
use agora_types::models::{ActionKind, Rank, VoteDirection};

use crate::condition::Condition;
use crate::models::MemberRow;
use crate::{decode_datetime, encode_datetime};

// -- Existence checks --

pub fn member_exists(conn: &Connection, member: i64) -> Result<bool> {
    let found = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM member WHERE id = ?1)",
        [member],
        |row| row.get(0),
    )?;
    Ok(found)
}

pub fn leader_exists(conn: &Connection, member: i64) -> Result<bool> {
    let found = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM member WHERE id = ?1 AND rank = ?2)",
        params![member, Rank::Leader.as_str()],
        |row| row.get(0),
    )?;
    Ok(found)
}

pub fn project_exists(conn: &Connection, project: i64) -> Result<bool> {
    let found = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM project WHERE id = ?1)",
        [project],
        |row| row.get(0),
    )?;
    Ok(found)
}

pub fn action_exists(conn: &Connection, action: i64) -> Result<bool> {
    let found = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM action WHERE id = ?1)",
        [action],
        |row| row.get(0),
    )?;
    Ok(found)
}

pub fn vote_exists(conn: &Connection, member: i64, action: i64) -> Result<bool> {
    let found = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM vote WHERE id_member = ?1 AND id_action = ?2)",
        params![member, action],
        |row| row.get(0),
    )?;
    Ok(found)
}

// -- Members --

pub fn get_member(conn: &Connection, member: i64) -> Result<Option<MemberRow>> {
    let mut stmt =
        conn.prepare("SELECT id, password_hash, rank, activity_date FROM member WHERE id = ?1")?;

    let row = stmt
        .query_row([member], |row| {
            Ok(MemberRow {
                id: row.get(0)?,
                password_hash: row.get(1)?,
                rank: row.get(2)?,
                activity_date: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

pub fn insert_member(
    conn: &Connection,
    member: i64,
    password_hash: &str,
    rank: Rank,
    at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO member (id, password_hash, rank, activity_date) VALUES (?1, ?2, ?3, ?4)",
        params![member, password_hash, rank.as_str(), encode_datetime(at)],
    )?;
    Ok(())
}

// -- Projects --

pub fn insert_project(conn: &Connection, project: i64, leader: i64, at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT INTO project (id, id_leader, creation_date) VALUES (?1, ?2, ?3)",
        params![project, leader, encode_datetime(at)],
    )?;
    Ok(())
}

// -- Actions and votes --

pub fn insert_action(
    conn: &Connection,
    action: i64,
    project: i64,
    member: i64,
    kind: ActionKind,
    at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO action (id, id_project, id_member, type, creation_date)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![action, project, member, kind.as_str(), encode_datetime(at)],
    )?;
    Ok(())
}

pub fn insert_vote(
    conn: &Connection,
    member: i64,
    action: i64,
    direction: VoteDirection,
    at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO vote (id_member, id_action, direction, creation_date)
         VALUES (?1, ?2, ?3, ?4)",
        params![member, action, direction.as_str(), encode_datetime(at)],
    )?;
    Ok(())
}

// -- Listings --

pub struct ActionFilter {
    pub kind: Option<ActionKind>,
    pub project: Option<i64>,
    pub authority: Option<i64>,
}

pub fn list_actions(conn: &Connection, filter: &ActionFilter) -> Result<Vec<ActionSummary>> {
    let cond = Condition::new()
        .eq("action.type", filter.kind.map(ActionKind::as_str))
        .eq("project.id", filter.project)
        .eq("project.id_leader", filter.authority);

    let sql = format!(
        "SELECT action.id, action.type, action.id_project, project.id_leader, \
         COALESCE(SUM(CASE WHEN vote.direction = 'up' THEN 1 ELSE 0 END), 0), \
         COALESCE(SUM(CASE WHEN vote.direction = 'down' THEN 1 ELSE 0 END), 0) \
         FROM action \
         JOIN project ON action.id_project = project.id \
         LEFT JOIN vote ON vote.id_action = action.id\
         {} \
         GROUP BY action.id, action.type, action.id_project, project.id_leader \
         ORDER BY action.id",
        cond.where_clause()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(cond.params()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(action, kind, project, leader, upvotes, downvotes)| {
            let kind = kind
                .parse::<ActionKind>()
                .map_err(|e| anyhow!(e))
                .with_context(|| format!("action {action}"))?;
            Ok(ActionSummary {
                action,
                kind,
                project,
                leader,
                upvotes,
                downvotes,
            })
        })
        .collect()
}

pub fn list_projects(conn: &Connection, authority: Option<i64>) -> Result<Vec<ProjectSummary>> {
    let cond = Condition::new().eq("id_leader", authority);
    let sql = format!(
        "SELECT id, id_leader FROM project{} ORDER BY id",
        cond.where_clause()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(cond.params()), |row| {
            Ok(ProjectSummary {
                project: row.get(0)?,
                leader: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub struct VoteFilter {
    pub action: Option<i64>,
    pub project: Option<i64>,
}

/// Tally votes per member. Every member appears, including those who never
/// voted; the optional filters narrow which votes are counted, not which
/// members are listed.
pub fn list_votes(conn: &Connection, filter: &VoteFilter) -> Result<Vec<VoteTally>> {
    let cond = Condition::new()
        .eq("vote.id_action", filter.action)
        .eq("action.id_project", filter.project);

    let sql = format!(
        "SELECT member.id, COALESCE(tally.upvotes, 0), COALESCE(tally.downvotes, 0) \
         FROM member \
         LEFT JOIN ( \
             SELECT vote.id_member AS id_member, \
                    SUM(CASE WHEN vote.direction = 'up' THEN 1 ELSE 0 END) AS upvotes, \
                    SUM(CASE WHEN vote.direction = 'down' THEN 1 ELSE 0 END) AS downvotes \
             FROM vote \
             JOIN action ON vote.id_action = action.id\
             {} \
             GROUP BY vote.id_member \
         ) AS tally ON member.id = tally.id_member \
         ORDER BY member.id",
        cond.where_clause()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(cond.params()), |row| {
            Ok(VoteTally {
                member: row.get(0)?,
                upvotes: row.get(1)?,
                downvotes: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Members whose authored actions collected more downvotes than upvotes,
/// totalled across all of their actions. Worst offenders first.
pub fn list_trolls(conn: &Connection, as_of: DateTime<Utc>) -> Result<Vec<TrollSummary>> {
    let sql = "SELECT member.id, member.activity_date, \
               COALESCE(SUM(CASE WHEN vote.direction = 'up' THEN 1 ELSE 0 END), 0) AS upvotes, \
               COALESCE(SUM(CASE WHEN vote.direction = 'down' THEN 1 ELSE 0 END), 0) AS downvotes \
               FROM member \
               JOIN action ON action.id_member = member.id \
               LEFT JOIN vote ON vote.id_action = action.id \
               GROUP BY member.id, member.activity_date \
               HAVING downvotes > upvotes \
               ORDER BY downvotes - upvotes DESC, member.id ASC";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(member, activity_date, upvotes, downvotes)| {
            let created = decode_datetime(&activity_date)
                .with_context(|| format!("member {member} activity_date"))?;
            Ok(TrollSummary {
                member,
                upvotes,
                downvotes,
                active: created.year() >= as_of.year(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;
    use chrono::TimeZone;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        migrations::run(&conn).unwrap();
        conn
    }

    fn at(year: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 6, 1, 12, 0, 0).unwrap()
    }

    /// Leader 1 owns projects 10 and 11; members 2 and 3 file actions.
    fn seed(conn: &Connection) {
        insert_member(conn, 1, "h1", Rank::Leader, at(2024)).unwrap();
        insert_member(conn, 2, "h2", Rank::Regular, at(2024)).unwrap();
        insert_member(conn, 3, "h3", Rank::Regular, at(2023)).unwrap();
        insert_project(conn, 10, 1, at(2024)).unwrap();
        insert_project(conn, 11, 1, at(2024)).unwrap();
        insert_action(conn, 100, 10, 2, ActionKind::Support, at(2024)).unwrap();
        insert_action(conn, 101, 11, 3, ActionKind::Protest, at(2024)).unwrap();
    }

    #[test]
    fn existence_checks() {
        let conn = conn();
        seed(&conn);

        assert!(member_exists(&conn, 2).unwrap());
        assert!(!member_exists(&conn, 9).unwrap());
        assert!(leader_exists(&conn, 1).unwrap());
        assert!(!leader_exists(&conn, 2).unwrap());
        assert!(project_exists(&conn, 10).unwrap());
        assert!(action_exists(&conn, 101).unwrap());
        assert!(!action_exists(&conn, 999).unwrap());

        insert_vote(&conn, 2, 101, VoteDirection::Up, at(2024)).unwrap();
        assert!(vote_exists(&conn, 2, 101).unwrap());
        assert!(!vote_exists(&conn, 3, 101).unwrap());
    }

    #[test]
    fn duplicate_ids_are_rejected_by_the_store() {
        let conn = conn();
        seed(&conn);

        assert!(insert_member(&conn, 2, "again", Rank::Regular, at(2024)).is_err());
        assert!(insert_action(&conn, 100, 10, 2, ActionKind::Protest, at(2024)).is_err());

        insert_vote(&conn, 2, 100, VoteDirection::Down, at(2024)).unwrap();
        assert!(insert_vote(&conn, 2, 100, VoteDirection::Up, at(2024)).is_err());
    }

    #[test]
    fn actions_listing_counts_votes_and_filters() {
        let conn = conn();
        seed(&conn);
        insert_vote(&conn, 1, 100, VoteDirection::Up, at(2024)).unwrap();
        insert_vote(&conn, 3, 100, VoteDirection::Down, at(2024)).unwrap();
        insert_vote(&conn, 2, 101, VoteDirection::Down, at(2024)).unwrap();

        let all = list_actions(
            &conn,
            &ActionFilter {
                kind: None,
                project: None,
                authority: None,
            },
        )
        .unwrap();
        assert_eq!(
            all,
            vec![
                ActionSummary {
                    action: 100,
                    kind: ActionKind::Support,
                    project: 10,
                    leader: 1,
                    upvotes: 1,
                    downvotes: 1,
                },
                ActionSummary {
                    action: 101,
                    kind: ActionKind::Protest,
                    project: 11,
                    leader: 1,
                    upvotes: 0,
                    downvotes: 1,
                },
            ]
        );

        let protests = list_actions(
            &conn,
            &ActionFilter {
                kind: Some(ActionKind::Protest),
                project: None,
                authority: None,
            },
        )
        .unwrap();
        assert_eq!(protests.len(), 1);
        assert_eq!(protests[0].action, 101);

        let on_project = list_actions(
            &conn,
            &ActionFilter {
                kind: None,
                project: Some(10),
                authority: None,
            },
        )
        .unwrap();
        assert_eq!(on_project.len(), 1);
        assert_eq!(on_project[0].action, 100);
    }

    #[test]
    fn projects_listing_filters_by_leader() {
        let conn = conn();
        seed(&conn);
        insert_member(&conn, 4, "h4", Rank::Leader, at(2024)).unwrap();
        insert_project(&conn, 12, 4, at(2024)).unwrap();

        let all = list_projects(&conn, None).unwrap();
        assert_eq!(
            all.iter().map(|p| p.project).collect::<Vec<_>>(),
            vec![10, 11, 12]
        );

        let owned = list_projects(&conn, Some(1)).unwrap();
        assert_eq!(owned.len(), 2);
        assert!(owned.iter().all(|p| p.leader == 1));
    }

    #[test]
    fn votes_listing_includes_members_who_never_voted() {
        let conn = conn();
        seed(&conn);
        insert_vote(&conn, 2, 101, VoteDirection::Up, at(2024)).unwrap();
        insert_vote(&conn, 3, 100, VoteDirection::Down, at(2024)).unwrap();

        let all = list_votes(
            &conn,
            &VoteFilter {
                action: None,
                project: None,
            },
        )
        .unwrap();
        assert_eq!(
            all,
            vec![
                VoteTally { member: 1, upvotes: 0, downvotes: 0 },
                VoteTally { member: 2, upvotes: 1, downvotes: 0 },
                VoteTally { member: 3, upvotes: 0, downvotes: 1 },
            ]
        );

        let on_action = list_votes(
            &conn,
            &VoteFilter {
                action: Some(100),
                project: None,
            },
        )
        .unwrap();
        assert_eq!(
            on_action,
            vec![
                VoteTally { member: 1, upvotes: 0, downvotes: 0 },
                VoteTally { member: 2, upvotes: 0, downvotes: 0 },
                VoteTally { member: 3, upvotes: 0, downvotes: 1 },
            ]
        );
    }

    #[test]
    fn trolls_are_ordered_by_deficit_then_id() {
        let conn = conn();
        insert_member(&conn, 1, "h1", Rank::Leader, at(2024)).unwrap();
        insert_project(&conn, 10, 1, at(2024)).unwrap();

        // A (id 5): two actions totalling 1 up / 5 down.
        // B (id 6): one action with 3 down.
        // C (id 7): 2 up / 2 down — not a troll.
        insert_member(&conn, 5, "a", Rank::Regular, at(2024)).unwrap();
        insert_member(&conn, 6, "b", Rank::Regular, at(2022)).unwrap();
        insert_member(&conn, 7, "c", Rank::Regular, at(2024)).unwrap();
        for voter in 20..=27 {
            insert_member(&conn, voter, "v", Rank::Regular, at(2024)).unwrap();
        }

        insert_action(&conn, 100, 10, 5, ActionKind::Support, at(2024)).unwrap();
        insert_action(&conn, 101, 10, 5, ActionKind::Protest, at(2024)).unwrap();
        insert_action(&conn, 102, 10, 6, ActionKind::Support, at(2024)).unwrap();
        insert_action(&conn, 103, 10, 7, ActionKind::Support, at(2024)).unwrap();

        insert_vote(&conn, 20, 100, VoteDirection::Up, at(2024)).unwrap();
        insert_vote(&conn, 21, 100, VoteDirection::Down, at(2024)).unwrap();
        insert_vote(&conn, 22, 100, VoteDirection::Down, at(2024)).unwrap();
        insert_vote(&conn, 20, 101, VoteDirection::Down, at(2024)).unwrap();
        insert_vote(&conn, 21, 101, VoteDirection::Down, at(2024)).unwrap();
        insert_vote(&conn, 22, 101, VoteDirection::Down, at(2024)).unwrap();

        insert_vote(&conn, 20, 102, VoteDirection::Down, at(2024)).unwrap();
        insert_vote(&conn, 21, 102, VoteDirection::Down, at(2024)).unwrap();
        insert_vote(&conn, 22, 102, VoteDirection::Down, at(2024)).unwrap();

        insert_vote(&conn, 20, 103, VoteDirection::Up, at(2024)).unwrap();
        insert_vote(&conn, 21, 103, VoteDirection::Up, at(2024)).unwrap();
        insert_vote(&conn, 22, 103, VoteDirection::Down, at(2024)).unwrap();
        insert_vote(&conn, 23, 103, VoteDirection::Down, at(2024)).unwrap();

        let trolls = list_trolls(&conn, at(2024)).unwrap();
        assert_eq!(
            trolls,
            vec![
                TrollSummary { member: 5, upvotes: 1, downvotes: 5, active: true },
                TrollSummary { member: 6, upvotes: 0, downvotes: 3, active: false },
            ]
        );
    }

    #[test]
    fn members_without_actions_are_never_trolls() {
        let conn = conn();
        seed(&conn);
        // Member 2 has an action with no votes; members without actions or
        // with balanced votes stay out.
        let trolls = list_trolls(&conn, at(2024)).unwrap();
        assert!(trolls.is_empty());
    }
}
