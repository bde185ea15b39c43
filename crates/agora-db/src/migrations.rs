use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE member (
                id            INTEGER PRIMARY KEY,
                password_hash TEXT NOT NULL,
                rank          TEXT NOT NULL CHECK (rank IN ('regular', 'leader')),
                activity_date TEXT NOT NULL
            );

            CREATE TABLE project (
                id            INTEGER PRIMARY KEY,
                id_leader     INTEGER NOT NULL REFERENCES member(id),
                creation_date TEXT NOT NULL
            );

            CREATE TABLE action (
                id            INTEGER PRIMARY KEY,
                id_project    INTEGER NOT NULL REFERENCES project(id),
                id_member     INTEGER NOT NULL REFERENCES member(id),
                type          TEXT NOT NULL CHECK (type IN ('support', 'protest')),
                creation_date TEXT NOT NULL
            );

            CREATE INDEX idx_action_project ON action(id_project);
            CREATE INDEX idx_action_member  ON action(id_member);

            CREATE TABLE vote (
                id_member     INTEGER NOT NULL REFERENCES member(id),
                id_action     INTEGER NOT NULL REFERENCES action(id),
                direction     TEXT NOT NULL CHECK (direction IN ('up', 'down')),
                creation_date TEXT NOT NULL,
                PRIMARY KEY (id_member, id_action)
            );

            CREATE INDEX idx_vote_action ON vote(id_action);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    Ok(())
}
