/// Database row types. These map directly to SQLite rows and stay
/// independent of the wire types in denuncias-types.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    /// Argon2 PHC string. Never serialized to clients.
    pub password: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplaintRow {
    pub id: i64,
    pub email: String,
    pub description: String,
    pub location: Option<String>,
    pub photo: String,
    pub created_at: String,
}

/// Fields supplied by the caller when filing a complaint; id and
/// created_at are assigned by the store.
#[derive(Debug, Clone, Copy)]
pub struct NewComplaint<'a> {
    pub email: &'a str,
    pub description: &'a str,
    pub location: Option<&'a str>,
    pub photo: &'a str,
}
