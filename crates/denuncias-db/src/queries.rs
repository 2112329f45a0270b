use crate::models::{ComplaintRow, NewComplaint, UserRow};
use crate::{Database, StoreError, StoreResult};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::info;

const COMPLAINT_COLUMNS: &str = "id, email, description, location, photo, created_at";

impl Database {
    // -- Users --

    /// Insert a user. `password_hash` must already be hashed; the store
    /// never sees plaintext.
    pub fn create_user(&self, id: &str, email: &str, password_hash: &str) -> StoreResult<UserRow> {
        if email.trim().is_empty() {
            return Err(StoreError::Validation("email is required"));
        }
        if password_hash.is_empty() {
            return Err(StoreError::Validation("password is required"));
        }

        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)
                     RETURNING id, email, password, created_at",
                    (id, email, password_hash),
                    map_user,
                )
                .map_err(|e| match e {
                    rusqlite::Error::SqliteFailure(err, _)
                        if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                    {
                        StoreError::DuplicateEmail
                    }
                    e => e.into(),
                })?;
            info!("Created user {}", row.id);
            Ok(row)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, email, password, created_at FROM users WHERE email = ?1",
                    [email],
                    map_user,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, email, password, created_at FROM users WHERE id = ?1",
                    [id],
                    map_user,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn list_users(&self) -> StoreResult<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, email, password, created_at FROM users ORDER BY email")?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Complaints --

    pub fn create_complaint(&self, new: &NewComplaint<'_>) -> StoreResult<ComplaintRow> {
        if new.email.trim().is_empty() {
            return Err(StoreError::Validation("email is required"));
        }
        if new.description.trim().is_empty() {
            return Err(StoreError::Validation("description is required"));
        }
        if new.photo.trim().is_empty() {
            return Err(StoreError::Validation("photo is required"));
        }
        let location = new.location.filter(|l| !l.trim().is_empty());

        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO complaints (email, description, location, photo)
                     VALUES (?1, ?2, ?3, ?4)
                     RETURNING {COMPLAINT_COLUMNS}"
                ),
                rusqlite::params![new.email, new.description, location, new.photo],
                map_complaint,
            )?;
            info!("Created complaint {} (photo {})", row.id, row.photo);
            Ok(row)
        })
    }

    /// Every complaint, newest first. Unbounded: there is no pagination.
    pub fn list_complaints(&self) -> StoreResult<Vec<ComplaintRow>> {
        self.with_conn(query_complaints)
    }

    pub fn get_complaint(&self, id: i64) -> StoreResult<ComplaintRow> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = ?1"),
                [id],
                map_complaint,
            )
            .optional()?
            .ok_or(StoreError::NotFound)
        })
    }

    /// Remove a complaint and hand back the deleted row so the caller can
    /// clean up the photo it referenced.
    pub fn delete_complaint(&self, id: i64) -> StoreResult<ComplaintRow> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("DELETE FROM complaints WHERE id = ?1 RETURNING {COMPLAINT_COLUMNS}"),
                    [id],
                    map_complaint,
                )
                .optional()?
                .ok_or(StoreError::NotFound)?;
            info!("Deleted complaint {}", row.id);
            Ok(row)
        })
    }
}

fn query_complaints(conn: &Connection) -> StoreResult<Vec<ComplaintRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMPLAINT_COLUMNS} FROM complaints ORDER BY id DESC"
    ))?;

    let rows = stmt
        .query_map([], map_complaint)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_complaint(row: &Row<'_>) -> rusqlite::Result<ComplaintRow> {
    Ok(ComplaintRow {
        id: row.get(0)?,
        email: row.get(1)?,
        description: row.get(2)?,
        location: row.get(3)?,
        photo: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn pothole(photo: &str) -> NewComplaint<'_> {
        NewComplaint {
            email: "a@x.com",
            description: "pothole",
            location: Some("5th Ave"),
            photo,
        }
    }

    #[test]
    fn duplicate_email_is_rejected_and_first_user_survives() {
        let db = db();
        db.create_user("u1", "a@x.com", "hash-1").unwrap();

        let err = db.create_user("u2", "a@x.com", "hash-2").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));

        let user = db.get_user_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.password, "hash-1");
    }

    #[test]
    fn empty_credentials_are_rejected() {
        let db = db();
        assert!(matches!(
            db.create_user("u1", "  ", "hash").unwrap_err(),
            StoreError::Validation(_)
        ));
        assert!(matches!(
            db.create_user("u1", "a@x.com", "").unwrap_err(),
            StoreError::Validation(_)
        ));
        assert!(db.list_users().unwrap().is_empty());
    }

    #[test]
    fn unknown_user_lookups_return_none() {
        let db = db();
        assert!(db.get_user_by_email("nobody@x.com").unwrap().is_none());
        assert!(db.get_user_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn list_users_is_ordered_by_email() {
        let db = db();
        db.create_user("u1", "zoe@x.com", "h").unwrap();
        db.create_user("u2", "ana@x.com", "h").unwrap();

        let emails: Vec<_> = db.list_users().unwrap().into_iter().map(|u| u.email).collect();
        assert_eq!(emails, vec!["ana@x.com", "zoe@x.com"]);
    }

    #[test]
    fn create_assigns_sequential_ids_and_timestamp() {
        let db = db();
        let first = db.create_complaint(&pothole("a.jpg")).unwrap();
        let second = db.create_complaint(&pothole("b.jpg")).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.location.as_deref(), Some("5th Ave"));
        chrono::NaiveDateTime::parse_from_str(&first.created_at, "%Y-%m-%d %H:%M:%S").unwrap();
    }

    #[test]
    fn blank_location_is_stored_as_null() {
        let db = db();
        let row = db
            .create_complaint(&NewComplaint { location: Some("   "), ..pothole("a.jpg") })
            .unwrap();
        assert_eq!(row.location, None);

        let row = db
            .create_complaint(&NewComplaint { location: None, ..pothole("b.jpg") })
            .unwrap();
        assert_eq!(db.get_complaint(row.id).unwrap().location, None);
    }

    #[test]
    fn missing_required_fields_fail_validation() {
        let db = db();
        for new in [
            NewComplaint { email: "", ..pothole("a.jpg") },
            NewComplaint { description: " ", ..pothole("a.jpg") },
            pothole(""),
        ] {
            assert!(matches!(
                db.create_complaint(&new).unwrap_err(),
                StoreError::Validation(_)
            ));
        }
        assert!(db.list_complaints().unwrap().is_empty());
    }

    #[test]
    fn list_returns_newest_first() {
        let db = db();
        db.create_complaint(&pothole("a.jpg")).unwrap();
        db.create_complaint(&pothole("b.jpg")).unwrap();
        let newest = db.create_complaint(&pothole("c.jpg")).unwrap();

        let list = db.list_complaints().unwrap();
        assert_eq!(list[0], newest);
        let ids: Vec<_> = list.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let db = db();
        let row = db.create_complaint(&pothole("a.jpg")).unwrap();

        let deleted = db.delete_complaint(row.id).unwrap();
        assert_eq!(deleted.photo, "a.jpg");

        assert!(matches!(db.get_complaint(row.id).unwrap_err(), StoreError::NotFound));
        assert!(matches!(db.delete_complaint(row.id).unwrap_err(), StoreError::NotFound));
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let db = db();
        let row = db.create_complaint(&pothole("a.jpg")).unwrap();
        db.delete_complaint(row.id).unwrap();

        let next = db.create_complaint(&pothole("b.jpg")).unwrap();
        assert_eq!(next.id, row.id + 1);
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let db = db();
        assert!(matches!(db.get_complaint(999).unwrap_err(), StoreError::NotFound));
    }
}
