//! SQLite storage backend.
//!
//! Four tables mirror the logical model: `restaurants`, `inspections`,
//! `links` and `tweet_matches`. Normalized name keys and name initials are
//! computed on insert and indexed so tweet matching and block reads stay
//! index lookups.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row, Transaction};

use crate::inspection::{Inspection, InspectionId};
use crate::link::LinkRecord;
use crate::restaurant::{name_initial, GeoBounds, NewRestaurant, Restaurant, RestaurantId};
use crate::storage::traits::{
    GroupCommit, IngestBatch, InitialSelector, InspectionStore, LinkStore, RecordStore,
    RestaurantStore, StorageError, TweetMatchStore,
};
use crate::tweet::{MatchReason, TweetKey, TweetMatch};

// Stay well under SQLITE_MAX_VARIABLE_NUMBER.
const MAX_IN_PARAMS: usize = 500;

const DATE_FORMAT: &str = "%Y-%m-%d";

const RESTAURANT_COLUMNS: &str = "id, name, facility_type, address, city, state, zip, \
                                  latitude, longitude, resolved";

const INSPECTION_COLUMNS: &str =
    "id, risk, inspection_date, inspection_type, results, violations_json, restaurant_id";

const SCHEMA: &str = r"
    PRAGMA journal_mode=WAL;
    PRAGMA synchronous=NORMAL;
    PRAGMA foreign_keys=ON;

    CREATE TABLE IF NOT EXISTS restaurants (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      name TEXT NOT NULL,
      name_key TEXT NOT NULL,
      initial TEXT,
      facility_type TEXT,
      address TEXT,
      city TEXT,
      state TEXT,
      zip TEXT,
      latitude REAL,
      longitude REAL,
      resolved INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_restaurants_name_address ON restaurants(name, address);
    CREATE INDEX IF NOT EXISTS idx_restaurants_name_key ON restaurants(name_key);
    CREATE INDEX IF NOT EXISTS idx_restaurants_initial ON restaurants(initial);
    CREATE INDEX IF NOT EXISTS idx_restaurants_resolved ON restaurants(resolved);
    CREATE INDEX IF NOT EXISTS idx_restaurants_geo ON restaurants(latitude, longitude);

    CREATE TABLE IF NOT EXISTS inspections (
      id TEXT PRIMARY KEY,
      risk TEXT,
      inspection_date TEXT,
      inspection_type TEXT,
      results TEXT,
      violations_json TEXT NOT NULL DEFAULT '[]',
      restaurant_id INTEGER NOT NULL REFERENCES restaurants(id)
    );
    CREATE INDEX IF NOT EXISTS idx_inspections_restaurant ON inspections(restaurant_id);

    CREATE TABLE IF NOT EXISTS links (
      original_id INTEGER PRIMARY KEY REFERENCES restaurants(id),
      primary_id INTEGER NOT NULL REFERENCES restaurants(id)
    );
    CREATE INDEX IF NOT EXISTS idx_links_primary ON links(primary_id);

    CREATE TABLE IF NOT EXISTS tweet_matches (
      tweet_key TEXT NOT NULL,
      restaurant_id INTEGER NOT NULL REFERENCES restaurants(id),
      reason TEXT NOT NULL,
      PRIMARY KEY (tweet_key, restaurant_id)
    );
    CREATE INDEX IF NOT EXISTS idx_tweet_matches_restaurant ON tweet_matches(restaurant_id);
";

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
                ErrorCode::ConstraintViolation => Self::ConstraintViolation(err.to_string()),
                ErrorCode::CannotOpen | ErrorCode::NotADatabase => {
                    Self::ConnectionError(err.to_string())
                }
                _ => Self::BackendError(err.to_string()),
            },
            _ => Self::BackendError(err.to_string()),
        }
    }
}

/// Connection settings for [`SqliteStores`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    /// Database file. Parent directories are created on open.
    pub path: PathBuf,
    /// How long a writer waits on a locked database.
    pub busy_timeout: Duration,
}

impl SqliteConfig {
    /// Settings for `path` with a 5 second busy timeout.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// SQLite implementation of every storage trait.
#[derive(Debug)]
pub struct SqliteStores {
    conn: Mutex<Connection>,
}

impl SqliteStores {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with(&SqliteConfig::new(path.as_ref()))
    }

    /// Opens the database described by `config`.
    pub fn open_with(config: &SqliteConfig) -> Result<Self, StorageError> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| {
                StorageError::ConnectionError(format!("{}: {err}", parent.display()))
            })?;
        }
        let conn = Connection::open(&config.path)?;
        conn.busy_timeout(config.busy_timeout)?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self, context: &'static str) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::BackendError(format!("poisoned lock: {context}")))
    }

    fn query_restaurants(
        conn: &Connection,
        where_clause: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Restaurant>, StorageError> {
        let sql = format!("SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE {where_clause} ORDER BY id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, restaurant_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn conversion_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn restaurant_from_row(row: &Row<'_>) -> rusqlite::Result<Restaurant> {
    Ok(Restaurant {
        id: RestaurantId::new(row.get(0)?),
        name: row.get(1)?,
        facility_type: row.get(2)?,
        address: row.get(3)?,
        city: row.get(4)?,
        state: row.get(5)?,
        zip: row.get(6)?,
        latitude: row.get(7)?,
        longitude: row.get(8)?,
        resolved: row.get(9)?,
    })
}

fn inspection_from_row(row: &Row<'_>) -> rusqlite::Result<Inspection> {
    let date: Option<String> = row.get(2)?;
    let date = date
        .map(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT))
        .transpose()
        .map_err(|err| conversion_err(2, err))?;
    let violations: String = row.get(5)?;
    let violations = serde_json::from_str(&violations).map_err(|err| conversion_err(5, err))?;
    Ok(Inspection {
        id: InspectionId::new(row.get::<_, String>(0)?),
        risk: row.get(1)?,
        date,
        inspection_type: row.get(3)?,
        results: row.get(4)?,
        violations,
        restaurant_id: RestaurantId::new(row.get(6)?),
    })
}

fn insert_restaurant_tx(tx: &Transaction<'_>, restaurant: &NewRestaurant) -> Result<RestaurantId, StorageError> {
    tx.execute(
        "INSERT INTO restaurants (name, name_key, initial, facility_type, address, city, state, zip, \
         latitude, longitude, resolved) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            restaurant.name,
            restaurant.name_key(),
            name_initial(&restaurant.name).map(String::from),
            restaurant.facility_type,
            restaurant.address,
            restaurant.city,
            restaurant.state,
            restaurant.zip,
            restaurant.latitude,
            restaurant.longitude,
            restaurant.resolved,
        ],
    )?;
    Ok(RestaurantId::new(tx.last_insert_rowid()))
}

fn insert_inspection_tx(tx: &Transaction<'_>, inspection: &Inspection) -> Result<(), StorageError> {
    let violations = serde_json::to_string(&inspection.violations)
        .map_err(|err| StorageError::SerializationError(err.to_string()))?;
    let exists = tx
        .query_row(
            "SELECT 1 FROM inspections WHERE id = ?1",
            params![inspection.id.as_str()],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if exists {
        return Err(StorageError::DuplicateKey(format!("inspection {}", inspection.id)));
    }
    if !restaurant_exists(tx, inspection.restaurant_id)? {
        return Err(StorageError::RestaurantNotFound(inspection.restaurant_id));
    }
    tx.execute(
        "INSERT INTO inspections (id, risk, inspection_date, inspection_type, results, \
         violations_json, restaurant_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            inspection.id.as_str(),
            inspection.risk,
            inspection.date.map(|d| d.format(DATE_FORMAT).to_string()),
            inspection.inspection_type,
            inspection.results,
            violations,
            inspection.restaurant_id.get(),
        ],
    )?;
    Ok(())
}

fn restaurant_exists(conn: &Connection, id: RestaurantId) -> Result<bool, StorageError> {
    Ok(conn
        .query_row("SELECT 1 FROM restaurants WHERE id = ?1", params![id.get()], |_| Ok(()))
        .optional()?
        .is_some())
}

fn count(conn: &Connection, table: &'static str) -> Result<usize, StorageError> {
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
    usize::try_from(n).map_err(|err| StorageError::BackendError(format!("{table} count: {err}")))
}

impl RestaurantStore for SqliteStores {
    fn insert_restaurant(&self, restaurant: NewRestaurant) -> Result<RestaurantId, StorageError> {
        let mut conn = self.conn("insert_restaurant")?;
        let tx = conn.transaction()?;
        let id = insert_restaurant_tx(&tx, &restaurant)?;
        tx.commit()?;
        Ok(id)
    }

    fn get_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>, StorageError> {
        let conn = self.conn("get_restaurant")?;
        Ok(conn
            .query_row(
                &format!("SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE id = ?1"),
                params![id.get()],
                restaurant_from_row,
            )
            .optional()?)
    }

    fn find_by_name_address(
        &self,
        name: &str,
        address: Option<&str>,
    ) -> Result<Option<Restaurant>, StorageError> {
        let conn = self.conn("find_by_name_address")?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {RESTAURANT_COLUMNS} FROM restaurants \
                     WHERE name = ?1 AND address IS ?2 ORDER BY id LIMIT 1"
                ),
                params![name, address],
                restaurant_from_row,
            )
            .optional()?)
    }

    fn find_unresolved(&self) -> Result<Vec<Restaurant>, StorageError> {
        let conn = self.conn("find_unresolved")?;
        Self::query_restaurants(&conn, "resolved = 0", [])
    }

    fn find_by_initials(&self, selector: InitialSelector<'_>) -> Result<Vec<Restaurant>, StorageError> {
        let conn = self.conn("find_by_initials")?;
        let (clause, symbols) = match selector {
            InitialSelector::AnyOf(symbols) => {
                (format!("initial IN ({})", placeholders(symbols.len())), symbols)
            }
            InitialSelector::NoneOf(symbols) => (
                format!("initial IS NULL OR initial NOT IN ({})", placeholders(symbols.len())),
                symbols,
            ),
        };
        if symbols.is_empty() {
            return match selector {
                InitialSelector::AnyOf(_) => Ok(Vec::new()),
                InitialSelector::NoneOf(_) => Self::query_restaurants(&conn, "1 = 1", []),
            };
        }
        let values = symbols.iter().map(char::to_string);
        Self::query_restaurants(&conn, &clause, params_from_iter(values))
    }

    fn find_by_name_keys(&self, keys: &[String]) -> Result<Vec<Restaurant>, StorageError> {
        let conn = self.conn("find_by_name_keys")?;
        let mut rows = Vec::new();
        for chunk in keys.chunks(MAX_IN_PARAMS) {
            let clause = format!("name_key IN ({})", placeholders(chunk.len()));
            rows.extend(Self::query_restaurants(&conn, &clause, params_from_iter(chunk))?);
        }
        rows.sort_by_key(|r| r.id);
        rows.dedup_by_key(|r| r.id);
        Ok(rows)
    }

    fn find_within(&self, bounds: GeoBounds) -> Result<Vec<Restaurant>, StorageError> {
        let conn = self.conn("find_within")?;
        Self::query_restaurants(
            &conn,
            "latitude BETWEEN ?1 AND ?2 AND longitude BETWEEN ?3 AND ?4",
            params![bounds.min_lat, bounds.max_lat, bounds.min_lon, bounds.max_lon],
        )
    }

    fn mark_resolved(&self, id: RestaurantId) -> Result<(), StorageError> {
        let conn = self.conn("mark_resolved")?;
        let changed = conn.execute("UPDATE restaurants SET resolved = 1 WHERE id = ?1", params![id.get()])?;
        if changed == 0 {
            return Err(StorageError::RestaurantNotFound(id));
        }
        Ok(())
    }

    fn count_restaurants(&self) -> Result<usize, StorageError> {
        let conn = self.conn("count_restaurants")?;
        count(&conn, "restaurants")
    }
}

impl InspectionStore for SqliteStores {
    fn insert_inspection(&self, inspection: Inspection) -> Result<(), StorageError> {
        let mut conn = self.conn("insert_inspection")?;
        let tx = conn.transaction()?;
        insert_inspection_tx(&tx, &inspection)?;
        tx.commit()?;
        Ok(())
    }

    fn get_inspection(&self, id: &InspectionId) -> Result<Option<Inspection>, StorageError> {
        let conn = self.conn("get_inspection")?;
        Ok(conn
            .query_row(
                &format!("SELECT {INSPECTION_COLUMNS} FROM inspections WHERE id = ?1"),
                params![id.as_str()],
                inspection_from_row,
            )
            .optional()?)
    }

    fn find_inspections_by_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Inspection>, StorageError> {
        let conn = self.conn("find_inspections_by_restaurant")?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {INSPECTION_COLUMNS} FROM inspections WHERE restaurant_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![restaurant_id.get()], inspection_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn count_inspections(&self) -> Result<usize, StorageError> {
        let conn = self.conn("count_inspections")?;
        count(&conn, "inspections")
    }
}

impl LinkStore for SqliteStores {
    fn find_primary(&self, original: RestaurantId) -> Result<Option<RestaurantId>, StorageError> {
        let conn = self.conn("find_primary")?;
        Ok(conn
            .query_row(
                "SELECT primary_id FROM links WHERE original_id = ?1",
                params![original.get()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .map(RestaurantId::new))
    }

    fn find_originals(&self, primary: RestaurantId) -> Result<Vec<RestaurantId>, StorageError> {
        let conn = self.conn("find_originals")?;
        let mut stmt =
            conn.prepare("SELECT original_id FROM links WHERE primary_id = ?1 ORDER BY original_id")?;
        let rows = stmt.query_map(params![primary.get()], |row| row.get::<_, i64>(0))?;
        let ids = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(ids.into_iter().map(RestaurantId::new).collect())
    }

    fn find_links(&self) -> Result<Vec<LinkRecord>, StorageError> {
        let conn = self.conn("find_links")?;
        let mut stmt = conn.prepare("SELECT primary_id, original_id FROM links ORDER BY original_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(LinkRecord::new(
                RestaurantId::new(row.get(0)?),
                RestaurantId::new(row.get(1)?),
            ))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl TweetMatchStore for SqliteStores {
    fn upsert_tweet_matches(&self, matches: &[TweetMatch]) -> Result<(), StorageError> {
        let mut conn = self.conn("upsert_tweet_matches")?;
        let tx = conn.transaction()?;
        for m in matches {
            if !restaurant_exists(&tx, m.restaurant_id)? {
                return Err(StorageError::RestaurantNotFound(m.restaurant_id));
            }
            tx.execute(
                "INSERT INTO tweet_matches (tweet_key, restaurant_id, reason) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(tweet_key, restaurant_id) DO UPDATE SET reason = excluded.reason",
                params![m.tweet_key.as_str(), m.restaurant_id.get(), m.reason.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn find_tweet_matches_by_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<TweetMatch>, StorageError> {
        let conn = self.conn("find_tweet_matches_by_restaurant")?;
        let mut stmt = conn.prepare(
            "SELECT tweet_key, reason FROM tweet_matches WHERE restaurant_id = ?1 ORDER BY tweet_key",
        )?;
        let rows = stmt.query_map(params![restaurant_id.get()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (key, reason) = row?;
            let reason = MatchReason::parse(&reason).ok_or_else(|| {
                StorageError::SerializationError(format!("unknown match reason '{reason}'"))
            })?;
            out.push(TweetMatch {
                tweet_key: TweetKey::new(key),
                restaurant_id,
                reason,
            });
        }
        Ok(out)
    }
}

impl RecordStore for SqliteStores {
    fn commit_group(&self, commit: GroupCommit) -> Result<RestaurantId, StorageError> {
        if commit.members.is_empty() {
            return Err(StorageError::ConstraintViolation("group has no members".to_string()));
        }
        let mut conn = self.conn("commit_group")?;
        let tx = conn.transaction()?;

        let mut seen = BTreeSet::new();
        for &member in &commit.members {
            if !seen.insert(member) {
                return Err(StorageError::ConstraintViolation(format!(
                    "restaurant {member} listed twice in group"
                )));
            }
            let resolved: Option<bool> = tx
                .query_row(
                    "SELECT resolved FROM restaurants WHERE id = ?1",
                    params![member.get()],
                    |row| row.get(0),
                )
                .optional()?;
            match resolved {
                None => return Err(StorageError::RestaurantNotFound(member)),
                Some(true) => {
                    return Err(StorageError::ConstraintViolation(format!(
                        "restaurant {member} is already resolved"
                    )))
                }
                Some(false) => {}
            }
        }

        let mut composite = commit.composite;
        composite.resolved = true;
        let primary = insert_restaurant_tx(&tx, &composite)?;

        for member in &commit.members {
            tx.execute("UPDATE restaurants SET resolved = 1 WHERE id = ?1", params![member.get()])?;
            tx.execute(
                "INSERT INTO links (original_id, primary_id) VALUES (?1, ?2)",
                params![member.get(), primary.get()],
            )?;
            tx.execute(
                "UPDATE inspections SET restaurant_id = ?1 WHERE restaurant_id = ?2",
                params![primary.get(), member.get()],
            )?;
        }
        tx.commit()?;
        Ok(primary)
    }

    fn commit_ingest(&self, batch: IngestBatch) -> Result<Vec<RestaurantId>, StorageError> {
        let mut conn = self.conn("commit_ingest")?;
        let tx = conn.transaction()?;

        let mut staged = Vec::with_capacity(batch.restaurants.len());
        for restaurant in &batch.restaurants {
            staged.push(insert_restaurant_tx(&tx, restaurant)?);
        }
        for item in batch.inspections {
            let mut inspection = item.inspection;
            inspection.restaurant_id = item.restaurant.resolve(&staged).ok_or_else(|| {
                StorageError::ConstraintViolation(format!(
                    "staged restaurant {:?} is not in the batch",
                    item.restaurant
                ))
            })?;
            insert_inspection_tx(&tx, &inspection)?;
        }
        // Dropping `tx` on any early return rolls the batch back.
        tx.commit()?;
        Ok(staged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant(name: &str, address: Option<&str>) -> NewRestaurant {
        NewRestaurant {
            address: address.map(str::to_string),
            city: Some("Chicago".to_string()),
            state: Some("IL".to_string()),
            zip: Some("60601".to_string()),
            ..NewRestaurant::named(name)
        }
    }

    #[test]
    fn test_name_address_lookup_matches_null_address() {
        let store = SqliteStores::open_in_memory().unwrap();
        let id = store.insert_restaurant(restaurant("Cafe", None)).unwrap();
        let found = store.find_by_name_address("Cafe", None).unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(store.find_by_name_address("Cafe", Some("1 Main")).unwrap().is_none());
    }

    #[test]
    fn test_residual_selector_picks_null_and_symbol_initials() {
        let store = SqliteStores::open_in_memory().unwrap();
        let empty = store.insert_restaurant(restaurant("", None)).unwrap();
        let quoted = store.insert_restaurant(restaurant("'Sup Dogs", None)).unwrap();
        store.insert_restaurant(restaurant("Alinea", None)).unwrap();

        let alphabet = ['a', 'b'];
        let rows = store.find_by_initials(InitialSelector::NoneOf(&alphabet)).unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![empty, quoted]);
    }

    #[test]
    fn test_inspection_round_trip_keeps_date_and_violations() {
        let store = SqliteStores::open_in_memory().unwrap();
        let id = store.insert_restaurant(restaurant("Cafe", None)).unwrap();
        let inspection = Inspection {
            id: InspectionId::new("2320831"),
            risk: Some("Risk 1 (High)".to_string()),
            date: NaiveDate::from_ymd_opt(2019, 10, 17),
            inspection_type: Some("Canvass".to_string()),
            results: Some("Pass".to_string()),
            violations: vec!["38. INSECTS".to_string()],
            restaurant_id: id,
        };
        store.insert_inspection(inspection.clone()).unwrap();
        assert_eq!(store.get_inspection(&inspection.id).unwrap(), Some(inspection));
    }

    fn visit(id: &str) -> Inspection {
        Inspection {
            id: InspectionId::new(id),
            risk: None,
            date: None,
            inspection_type: None,
            results: Some("Pass".to_string()),
            violations: Vec::new(),
            restaurant_id: RestaurantId::new(0),
        }
    }

    #[test]
    fn test_failed_ingest_rolls_back_the_whole_batch() {
        use crate::storage::traits::{RestaurantRef, StagedInspection};

        let store = SqliteStores::open_in_memory().unwrap();
        let cafe = store.insert_restaurant(restaurant("Cafe", None)).unwrap();
        store
            .insert_inspection(Inspection {
                restaurant_id: cafe,
                ..visit("2")
            })
            .unwrap();

        let err = store
            .commit_ingest(IngestBatch {
                restaurants: vec![restaurant("Diner", Some("2 Main"))],
                inspections: vec![
                    StagedInspection {
                        restaurant: RestaurantRef::Staged(0),
                        inspection: visit("1"),
                    },
                    StagedInspection {
                        restaurant: RestaurantRef::Existing(cafe),
                        inspection: visit("2"),
                    },
                ],
            })
            .unwrap_err();

        assert!(matches!(err, StorageError::DuplicateKey(_)));
        assert_eq!(store.count_restaurants().unwrap(), 1);
        assert_eq!(store.count_inspections().unwrap(), 1);
        assert!(store.find_by_name_address("Diner", Some("2 Main")).unwrap().is_none());

        let staged = store
            .commit_ingest(IngestBatch {
                restaurants: vec![restaurant("Diner", Some("2 Main"))],
                inspections: vec![StagedInspection {
                    restaurant: RestaurantRef::Staged(0),
                    inspection: visit("1"),
                }],
            })
            .unwrap();
        let row = store.get_inspection(&InspectionId::new("1")).unwrap().unwrap();
        assert_eq!(row.restaurant_id, staged[0]);
    }
}
