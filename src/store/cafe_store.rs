//! SQLite-backed cafe storage

use rand::Rng;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::types::{Cafe, NewCafe, CAFE_COLUMNS};

/// Persistent cafe catalog.
///
/// Every operation runs inside a single transaction on the shared connection.
pub struct CafeStore {
    conn: Mutex<Connection>,
}

impl CafeStore {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create the cafe table if it does not exist yet
    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cafe (
                id INTEGER PRIMARY KEY,
                name VARCHAR(250) NOT NULL UNIQUE,
                map_url VARCHAR(500) NOT NULL,
                img_url VARCHAR(500) NOT NULL,
                location VARCHAR(250) NOT NULL,
                seats VARCHAR(250) NOT NULL,
                has_toilet BOOLEAN NOT NULL,
                has_wifi BOOLEAN NOT NULL,
                has_sockets BOOLEAN NOT NULL,
                can_take_calls BOOLEAN NOT NULL,
                coffee_price VARCHAR(250)
            );

            CREATE INDEX IF NOT EXISTS idx_cafe_location ON cafe(location);
            "#,
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("cafe store connection lock poisoned".into()))
    }

    /// Insert a new cafe and return it with its assigned id
    pub fn create(&self, new: NewCafe) -> Result<Cafe> {
        new.validate()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            r#"
            INSERT INTO cafe (name, map_url, img_url, location, seats, has_toilet, has_wifi, has_sockets, can_take_calls, coffee_price)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                new.name,
                new.map_url,
                new.img_url,
                new.location,
                new.seats,
                new.has_toilet,
                new.has_wifi,
                new.has_sockets,
                new.can_take_calls,
                new.coffee_price,
            ],
        );

        if let Err(err) = inserted {
            return Err(if is_unique_violation(&err) {
                Error::DuplicateName(new.name)
            } else {
                err.into()
            });
        }

        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!("Created cafe {} ({})", id, new.name);
        Ok(Cafe::from_new(id, new))
    }

    /// Get a cafe by id
    pub fn get(&self, id: i64) -> Result<Cafe> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let cafe = fetch(&tx, id)?.ok_or_else(Error::cafe_not_found)?;
        tx.commit()?;
        Ok(cafe)
    }

    /// All cafes, ordered by id
    pub fn list_all(&self) -> Result<Vec<Cafe>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cafe ORDER BY id",
            CAFE_COLUMNS.join(", ")
        ))?;

        let cafes = stmt
            .query_map([], cafe_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(cafes)
    }

    /// Cafes whose location equals `location` exactly
    pub fn list_by_location(&self, location: &str) -> Result<Vec<Cafe>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cafe WHERE location = ?1 ORDER BY id",
            CAFE_COLUMNS.join(", ")
        ))?;

        let cafes = stmt
            .query_map(params![location], cafe_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(cafes)
    }

    /// Pick one cafe uniformly at random
    pub fn random(&self) -> Result<Cafe> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let count: i64 = tx.query_row("SELECT COUNT(*) FROM cafe", [], |row| row.get(0))?;
        if count == 0 {
            return Err(Error::NotFound("Sorry, there are no cafes in the database yet.".into()));
        }

        let offset = rand::thread_rng().gen_range(0..count);
        let cafe = tx.query_row(
            &format!(
                "SELECT {} FROM cafe ORDER BY id LIMIT 1 OFFSET ?1",
                CAFE_COLUMNS.join(", ")
            ),
            params![offset],
            cafe_from_row,
        )?;
        tx.commit()?;

        Ok(cafe)
    }

    /// Overwrite the coffee price of a cafe, leaving every other field untouched
    pub fn update_price(&self, id: i64, price: Option<String>) -> Result<Cafe> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE cafe SET coffee_price = ?1 WHERE id = ?2",
            params![price, id],
        )?;
        if updated == 0 {
            return Err(Error::cafe_not_found());
        }

        let cafe = fetch(&tx, id)?.ok_or_else(Error::cafe_not_found)?;
        tx.commit()?;

        tracing::debug!("Updated price of cafe {} to {:?}", id, cafe.coffee_price);
        Ok(cafe)
    }

    /// Permanently remove a cafe
    pub fn delete(&self, id: i64) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let deleted = tx.execute("DELETE FROM cafe WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::cafe_not_found());
        }
        tx.commit()?;

        tracing::debug!("Deleted cafe {}", id);
        Ok(())
    }

    /// Number of cafes in the catalog
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cafe", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn fetch(tx: &Transaction<'_>, id: i64) -> Result<Option<Cafe>> {
    let cafe = tx
        .query_row(
            &format!("SELECT {} FROM cafe WHERE id = ?1", CAFE_COLUMNS.join(", ")),
            params![id],
            cafe_from_row,
        )
        .optional()?;
    Ok(cafe)
}

/// Map a row selected with `CAFE_COLUMNS` onto a cafe
fn cafe_from_row(row: &Row<'_>) -> rusqlite::Result<Cafe> {
    Ok(Cafe {
        id: row.get(0)?,
        name: row.get(1)?,
        map_url: row.get(2)?,
        img_url: row.get(3)?,
        location: row.get(4)?,
        seats: row.get(5)?,
        has_toilet: row.get(6)?,
        has_wifi: row.get(7)?,
        has_sockets: row.get(8)?,
        can_take_calls: row.get(9)?,
        coffee_price: row.get(10)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_cafe(name: &str, location: &str) -> NewCafe {
        NewCafe {
            name: name.to_string(),
            map_url: format!("https://maps.example/{}", name),
            img_url: format!("https://img.example/{}.jpg", name),
            location: location.to_string(),
            seats: "20-30".to_string(),
            has_toilet: true,
            has_wifi: true,
            has_sockets: false,
            can_take_calls: false,
            coffee_price: Some("£2.40".to_string()),
        }
    }

    #[test]
    fn test_create_then_get_round_trips() {
        let store = CafeStore::open_in_memory().unwrap();
        let input = new_cafe("Blue Bottle", "Downtown");

        let created = store.create(input.clone()).unwrap();
        let fetched = store.get(created.id).unwrap();

        assert_eq!(fetched, Cafe::from_new(created.id, input));
    }

    #[test]
    fn test_absent_price_is_distinct_from_empty() {
        let store = CafeStore::open_in_memory().unwrap();

        let mut unpriced = new_cafe("Unpriced", "Soho");
        unpriced.coffee_price = None;
        let mut empty = new_cafe("Empty", "Soho");
        empty.coffee_price = Some(String::new());

        let a = store.create(unpriced).unwrap();
        let b = store.create(empty).unwrap();

        assert_eq!(store.get(a.id).unwrap().coffee_price, None);
        assert_eq!(store.get(b.id).unwrap().coffee_price, Some(String::new()));
    }

    #[test]
    fn test_duplicate_name_rejected_without_partial_row() {
        let store = CafeStore::open_in_memory().unwrap();
        store.create(new_cafe("Blue Bottle", "Downtown")).unwrap();

        let err = store.create(new_cafe("Blue Bottle", "Uptown")).unwrap_err();

        assert!(matches!(err, Error::DuplicateName(ref name) if name == "Blue Bottle"));
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.list_by_location("Uptown").unwrap().is_empty());
    }

    #[test]
    fn test_create_rejects_missing_fields() {
        let store = CafeStore::open_in_memory().unwrap();
        let mut input = new_cafe("Blue Bottle", "Downtown");
        input.seats = String::new();

        assert!(matches!(store.create(input), Err(Error::Validation(_))));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_list_by_location_is_filter_of_list_all() {
        let store = CafeStore::open_in_memory().unwrap();
        store.create(new_cafe("A", "Downtown")).unwrap();
        store.create(new_cafe("B", "Shoreditch")).unwrap();
        store.create(new_cafe("C", "Downtown")).unwrap();

        let all = store.list_all().unwrap();
        for loc in ["Downtown", "Shoreditch", "downtown", "Nowhere"] {
            let expected: Vec<Cafe> = all.iter().filter(|c| c.location == loc).cloned().collect();
            assert_eq!(store.list_by_location(loc).unwrap(), expected, "location {}", loc);
        }
        assert!(store.list_by_location("Nowhere").unwrap().is_empty());
    }

    #[test]
    fn test_update_price_touches_only_price() {
        let store = CafeStore::open_in_memory().unwrap();
        let before = store.create(new_cafe("Blue Bottle", "Downtown")).unwrap();

        let after = store.update_price(before.id, Some("$5".into())).unwrap();

        assert_eq!(after.coffee_price.as_deref(), Some("$5"));
        assert_eq!(
            Cafe {
                coffee_price: before.coffee_price.clone(),
                ..after.clone()
            },
            before
        );
        assert_eq!(store.get(before.id).unwrap(), after);
    }

    #[test]
    fn test_update_price_unknown_id() {
        let store = CafeStore::open_in_memory().unwrap();
        let existing = store.create(new_cafe("Blue Bottle", "Downtown")).unwrap();

        let err = store.update_price(existing.id + 100, Some("$1".into())).unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.list_all().unwrap(), vec![existing]);
    }

    #[test]
    fn test_delete_twice() {
        let store = CafeStore::open_in_memory().unwrap();
        let cafe = store.create(new_cafe("Blue Bottle", "Downtown")).unwrap();

        store.delete(cafe.id).unwrap();

        assert!(matches!(store.get(cafe.id), Err(Error::NotFound(_))));
        assert!(matches!(store.delete(cafe.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_random() {
        let store = CafeStore::open_in_memory().unwrap();
        assert!(matches!(store.random(), Err(Error::NotFound(_))));

        let a = store.create(new_cafe("A", "Downtown")).unwrap();
        let b = store.create(new_cafe("B", "Uptown")).unwrap();

        for _ in 0..20 {
            let picked = store.random().unwrap();
            assert!(picked == a || picked == b);
        }
    }

    #[test]
    fn test_poisoned_lock_is_storage_error() {
        let store = std::sync::Arc::new(CafeStore::open_in_memory().unwrap());

        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.conn.lock().unwrap();
            panic!("poison the connection lock");
        })
        .join();

        assert!(matches!(store.list_all(), Err(Error::Storage(_))));
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("data").join("cafes.db");

        let id = {
            let store = CafeStore::open(&db_path).unwrap();
            store.create(new_cafe("Blue Bottle", "Downtown")).unwrap().id
        };

        let store = CafeStore::open(&db_path).unwrap();
        assert_eq!(store.get(id).unwrap().name, "Blue Bottle");
    }
}
