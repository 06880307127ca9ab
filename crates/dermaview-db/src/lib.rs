// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod error;

pub use error::{StoreError, StoreResult};

use anyhow::{Context, anyhow};
use dermaview_app::{
    CredentialsInput, Image, ImageField, NewUserInput, Role, UploadOutcome, User, UserId,
};
use error::{SqlResultExt, is_constraint_violation, is_missing_table};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const APP_NAME: &str = "dermaview";
pub const DATABASE_FILE_NAME: &str = "database.db";

const DEFAULT_ADMIN_NAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin";

const IMAGE_COLUMNS: &str = "digest, patientId, patientName, uploadedAt, disease, department";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("users", &["id", "name", "password", "role"]),
    (
        "images",
        &[
            "digest",
            "patientId",
            "patientName",
            "uploadedAt",
            "disease",
            "department",
        ],
    ),
    ("image_bookmarks", &["userId", "digest"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_users_name",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_name ON users (name);",
    },
    RequiredIndex {
        name: "idx_images_digest",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_images_digest ON images (digest);",
    },
    RequiredIndex {
        name: "idx_users",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_users ON image_bookmarks (userId, digest);",
    },
];

pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn close(self) -> StoreResult<()> {
        let label = self
            .path
            .as_ref()
            .map_or_else(|| ":memory:".to_owned(), |path| path.display().to_string());
        self.conn
            .close()
            .map_err(|(_, source)| StoreError::Sqlite {
                context: format!("close database {label}"),
                source,
            })?;
        debug!(database = %label, "database closed");
        Ok(())
    }

    /// Creates missing tables and indexes. The default `admin/admin` account is
    /// seeded only when this call is the one that creates the `users` table.
    pub fn ensure_schema(&self) -> StoreResult<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .sql_context("begin schema transaction")?;

        let users_existed = table_exists(&tx, "users")?;
        tx.execute_batch(include_str!("sql/schema.sql"))
            .sql_context("create schema")?;
        ensure_required_indexes(&tx)?;

        if !users_existed {
            tx.execute(
                "INSERT INTO users (name, password, role) VALUES (?1, ?2, ?3)",
                params![
                    DEFAULT_ADMIN_NAME,
                    DEFAULT_ADMIN_PASSWORD,
                    Role::Admin.as_str()
                ],
            )
            .sql_context("seed default admin account")?;
            info!("created users table and seeded default admin account");
        }

        validate_schema(&tx)?;
        tx.commit().sql_context("commit schema transaction")
    }

    pub fn table_names(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT name
                FROM sqlite_master
                WHERE type = 'table'
                  AND name NOT LIKE 'sqlite_%'
                ORDER BY name ASC
                ",
            )
            .sql_context("prepare table names query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .sql_context("query table names")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .sql_context("collect table names")
    }

    pub fn admin_exists(&self) -> StoreResult<bool> {
        let exists: i64 = self
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE role = ?1)",
                params![Role::Admin.as_str()],
                |row| row.get(0),
            )
            .sql_context("check for admin account")?;
        Ok(exists == 1)
    }

    pub fn create_user(&self, role: Role, name: &str, password: &str) -> StoreResult<UserId> {
        let input = NewUserInput {
            role,
            credentials: CredentialsInput::new(name, password),
        };
        input
            .validate()
            .map_err(|error| StoreError::Validation(error.to_string()))?;

        if role == Role::Admin && self.admin_exists()? {
            return Err(StoreError::Conflict(
                "admin already exists -- only one admin account is allowed".to_owned(),
            ));
        }

        self.insert_user(&input.credentials, role)
    }

    pub fn sign_up(&self, name: &str, password: &str) -> StoreResult<UserId> {
        let credentials = CredentialsInput::new(name, password);
        credentials
            .validate()
            .map_err(|error| StoreError::Validation(error.to_string()))?;
        self.insert_user(&credentials, Role::default())
    }

    /// Exact match on name and password. A missing `users` table is repaired by
    /// re-running [`Store::ensure_schema`], after which the lookup runs once more.
    pub fn sign_in(&self, name: &str, password: &str) -> StoreResult<Option<User>> {
        match self.find_user(name, password) {
            Err(error) if is_missing_table(&error) => {
                warn!(%error, "sign-in hit a missing table; recreating schema");
                self.ensure_schema()?;
                self.find_user(name, password).sql_context("look up user")
            }
            result => result.sql_context("look up user"),
        }
    }

    pub fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, password, role FROM users ORDER BY id ASC")
            .sql_context("prepare users query")?;
        let rows = stmt
            .query_map([], user_from_row)
            .sql_context("query users")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .sql_context("collect users")
    }

    /// Inserts each image independently. A failed row is reported in its
    /// outcome and does not affect rows before or after it.
    pub fn upload_images(&self, images: &[Image]) -> StoreResult<Vec<UploadOutcome>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "INSERT INTO images ({IMAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ))
            .sql_context("prepare image insert")?;

        let mut outcomes = Vec::with_capacity(images.len());
        for image in images {
            if let Err(error) = image.validate() {
                warn!(digest = %image.digest, %error, "rejected image upload");
                outcomes.push(UploadOutcome::failed(&image.digest, error.to_string()));
                continue;
            }

            let result = stmt.execute(params![
                image.digest,
                image.patient_id,
                image.patient_name,
                image.uploaded_at,
                image.disease,
                image.department,
            ]);
            match result {
                Ok(_) => outcomes.push(UploadOutcome::inserted(&image.digest)),
                Err(error) if is_constraint_violation(&error) => {
                    warn!(digest = %image.digest, "duplicate image digest");
                    outcomes.push(UploadOutcome::failed(
                        &image.digest,
                        format!("image {:?} already exists", image.digest),
                    ));
                }
                Err(error) => {
                    warn!(digest = %image.digest, %error, "image insert failed");
                    outcomes.push(UploadOutcome::failed(&image.digest, error.to_string()));
                }
            }
        }

        let inserted = outcomes.iter().filter(|outcome| outcome.inserted).count();
        info!(inserted, total = images.len(), "image upload batch stored");
        Ok(outcomes)
    }

    pub fn list_images(&self) -> StoreResult<Vec<Image>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {IMAGE_COLUMNS} FROM images ORDER BY uploadedAt ASC, digest ASC"
            ))
            .sql_context("prepare images query")?;
        let rows = stmt
            .query_map([], image_from_row)
            .sql_context("query images")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .sql_context("collect images")
    }

    /// Substring search on a single [`ImageField`]. An empty query or field
    /// lists every image; an unknown field yields no rows.
    pub fn search_images(&self, query: &str, field: &str) -> StoreResult<Vec<Image>> {
        if query.is_empty() || field.is_empty() {
            return self.list_images();
        }

        let Some(field) = ImageField::parse(field) else {
            warn!(field, "invalid image search field");
            return Ok(Vec::new());
        };

        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {IMAGE_COLUMNS} FROM images WHERE {} LIKE ?1 ESCAPE '\\' ORDER BY uploadedAt ASC, digest ASC",
                field.as_str()
            ))
            .sql_context("prepare image search")?;
        let pattern = format!("%{}%", escape_like(query));
        let rows = stmt
            .query_map(params![pattern], image_from_row)
            .sql_context("search images")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .sql_context("collect image search results")
    }

    fn insert_user(&self, credentials: &CredentialsInput, role: Role) -> StoreResult<UserId> {
        let result = self.conn.execute(
            "INSERT INTO users (name, password, role) VALUES (?1, ?2, ?3)",
            params![credentials.name, credentials.password, role.as_str()],
        );
        match result {
            Ok(_) => {
                let id = UserId::new(self.conn.last_insert_rowid());
                info!(user = %credentials.name, role = role.as_str(), "user created");
                Ok(id)
            }
            Err(error) if is_constraint_violation(&error) => Err(StoreError::Conflict(format!(
                "user {:?} already exists -- choose another name",
                credentials.name
            ))),
            Err(error) => Err(error).sql_context("insert user"),
        }
    }

    fn find_user(&self, name: &str, password: &str) -> rusqlite::Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, name, password, role FROM users WHERE name = ?1 AND password = ?2",
                params![name, password],
                user_from_row,
            )
            .optional()
    }
}

/// Owns the process-wide store handle. Replacing the handle always closes the
/// previous one first.
#[derive(Default)]
pub struct Session {
    store: Option<Store>,
}

impl Session {
    pub fn health_check(&self) -> bool {
        self.store.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.store.as_ref().and_then(Store::path)
    }

    pub fn store(&self) -> StoreResult<&Store> {
        self.store.as_ref().ok_or(StoreError::NotConnected)
    }

    /// Connects to `path` unless the open handle already points there.
    pub fn connect(&mut self, path: &Path) -> StoreResult<()> {
        if self.path() == Some(path) {
            debug!(path = %path.display(), "database connection reused");
            return Ok(());
        }
        self.reopen(path)
    }

    pub fn reopen(&mut self, path: &Path) -> StoreResult<()> {
        self.close()?;
        let store = Store::open(path)?;
        info!(path = %path.display(), "database connected");
        self.store = Some(store);
        Ok(())
    }

    pub fn attach(&mut self, store: Store) -> StoreResult<()> {
        self.close()?;
        self.store = Some(store);
        Ok(())
    }

    pub fn close(&mut self) -> StoreResult<()> {
        match self.store.take() {
            Some(store) => store.close(),
            None => Ok(()),
        }
    }

    /// Creates `root` when missing and connects to `<root>/database.db`.
    /// Returns whether the database file was absent before this call.
    pub fn fetch_database_root(&mut self, root: &Path) -> StoreResult<(bool, PathBuf)> {
        fs::create_dir_all(root)
            .with_context(|| format!("create root directory {}", root.display()))?;
        let db_path = database_path(root);
        let is_new = !db_path.exists();
        self.connect(&db_path)?;
        Ok((is_new, db_path))
    }
}

pub fn database_path(root: &Path) -> PathBuf {
    root.join(DATABASE_FILE_NAME)
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    Ok(User {
        id: UserId::new(row.get(0)?),
        name: row.get(1)?,
        password: row.get(2)?,
        role: Role::parse(&role)
            .ok_or_else(|| to_sql_error(anyhow!("unknown role {role:?} in users table")))?,
    })
}

fn image_from_row(row: &Row<'_>) -> rusqlite::Result<Image> {
    Ok(Image {
        digest: row.get(0)?,
        patient_id: row.get(1)?,
        patient_name: row.get(2)?,
        uploaded_at: row.get(3)?,
        disease: row.get(4)?,
        department: row.get(5)?,
    })
}

fn validate_schema(conn: &Connection) -> StoreResult<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            return Err(StoreError::Schema(format!(
                "table `{table}` is missing required columns: {}; point the root directory at a dermaview database",
                missing.join(", ")
            )));
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> StoreResult<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .sql_context(&format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(StoreError::Schema(format!(
            "database is missing required indexes: {}",
            missing.join(", ")
        )));
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .sql_context(&format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> StoreResult<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .sql_context(&format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .sql_context(&format!("query column info for {table}"))?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .sql_context(&format!("collect columns for {table}"))
}

fn index_names(conn: &Connection) -> StoreResult<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .sql_context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .sql_context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .sql_context("collect index names")
}

fn configure_connection(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            error.to_string(),
        )),
    )
}
