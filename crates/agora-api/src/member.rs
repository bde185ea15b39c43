use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Datelike, Utc};
use rusqlite::Connection;

use agora_db::queries;
use agora_types::models::{MemberId, Rank};

use crate::error::{PolicyError, PolicyResult};

/// Validate a claimed identity/password pair against the stored credentials.
/// An account whose activity year differs from the year of `as_of` is
/// frozen and refused even with the correct password.
pub fn authenticate(
    conn: &Connection,
    member: MemberId,
    password: &str,
    as_of: DateTime<Utc>,
) -> PolicyResult<()> {
    let row = queries::get_member(conn, member)?
        .ok_or_else(|| PolicyError::InvalidMember(format!("unknown member {member}")))?;

    let parsed = PasswordHash::new(&row.password_hash).map_err(|e| {
        PolicyError::Store(anyhow::anyhow!(
            "stored hash for member {member} is unreadable: {e}"
        ))
    })?;
    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_err()
    {
        return Err(PolicyError::InvalidMember(format!(
            "wrong password for member {member}"
        )));
    }

    let created = agora_db::decode_datetime(&row.activity_date)?;
    if created.year() != as_of.year() {
        return Err(PolicyError::InvalidMember(format!(
            "member {member} is frozen"
        )));
    }

    Ok(())
}

/// Ensure the member row exists. An unknown id is created with
/// `rank_if_new` and the given timestamp; a known id must authenticate.
/// A failed authentication is reported as-is — the row is never
/// re-created.
pub fn ensure(
    conn: &Connection,
    member: MemberId,
    password: &str,
    at: DateTime<Utc>,
    rank_if_new: Rank,
) -> PolicyResult<()> {
    if queries::member_exists(conn, member)? {
        return authenticate(conn, member, password, at);
    }

    let hash = hash_password(password)?;
    queries::insert_member(conn, member, &hash, rank_if_new, at)?;
    Ok(())
}

/// Authenticate and require leader rank.
pub fn verify_leader(
    conn: &Connection,
    member: MemberId,
    password: &str,
    as_of: DateTime<Utc>,
) -> PolicyResult<()> {
    authenticate(conn, member, password, as_of)?;
    if !queries::leader_exists(conn, member)? {
        return Err(PolicyError::InvalidMember(format!(
            "member {member} is not a leader"
        )));
    }
    Ok(())
}

fn hash_password(password: &str) -> PolicyResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PolicyError::Store(anyhow::anyhow!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_db::migrations;
    use chrono::TimeZone;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run(&conn).unwrap();
        conn
    }

    fn at(year: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 2, 10, 8, 0, 0).unwrap()
    }

    #[test]
    fn first_contact_creates_then_authenticates() {
        let conn = conn();

        ensure(&conn, 1, "hunter2", at(2024), Rank::Regular).unwrap();
        let row = queries::get_member(&conn, 1).unwrap().unwrap();
        assert_eq!(row.rank, "regular");
        assert_ne!(row.password_hash, "hunter2");

        ensure(&conn, 1, "hunter2", at(2024), Rank::Regular).unwrap();
        authenticate(&conn, 1, "hunter2", at(2024)).unwrap();
    }

    #[test]
    fn wrong_password_is_refused_without_recreation() {
        let conn = conn();
        ensure(&conn, 1, "hunter2", at(2024), Rank::Regular).unwrap();
        let original = queries::get_member(&conn, 1).unwrap().unwrap();

        let err = ensure(&conn, 1, "nope", at(2024), Rank::Regular).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidMember(_)));

        let row = queries::get_member(&conn, 1).unwrap().unwrap();
        assert_eq!(row.password_hash, original.password_hash);
        assert_eq!(row.activity_date, original.activity_date);
    }

    #[test]
    fn stale_activity_year_freezes_the_account() {
        let conn = conn();
        ensure(&conn, 1, "hunter2", at(2023), Rank::Regular).unwrap();

        let err = authenticate(&conn, 1, "hunter2", at(2024)).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidMember(_)));

        // A frozen account is rejected by the provisioner too, not recreated.
        let err = ensure(&conn, 1, "hunter2", at(2024), Rank::Regular).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidMember(_)));
    }

    #[test]
    fn leader_verification_requires_rank() {
        let conn = conn();
        ensure(&conn, 1, "pw", at(2024), Rank::Leader).unwrap();
        ensure(&conn, 2, "pw", at(2024), Rank::Regular).unwrap();

        verify_leader(&conn, 1, "pw", at(2024)).unwrap();
        let err = verify_leader(&conn, 2, "pw", at(2024)).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidMember(_)));
    }
}
