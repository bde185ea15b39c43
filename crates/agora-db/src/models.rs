/// Database row types — these map directly to SQLite rows.
/// Distinct from the agora-types API models to keep the store layer
/// independent; rank and activity_date stay raw until the policy layer
/// interprets them.
pub struct MemberRow {
    pub id: i64,
    pub password_hash: String,
    pub rank: String,
    pub activity_date: String,
}
