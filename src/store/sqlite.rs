use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database. Mostly useful in tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn constraint_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            Some(e.extended_code)
        }
        _ => None,
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        constraint_code(err),
        Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    constraint_code(err) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}

fn parse_role(s: &str) -> Role {
    Role::parse(s).unwrap_or_else(|| {
        tracing::error!("Unknown role in database: '{}', treating as user", s);
        Role::User
    })
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        username: row.get(1)?,
        role: parse_role(&row.get::<_, String>(2)?),
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        user_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        expires_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
    })
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_datetime(&row.get::<_, String>(2)?),
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<Page> {
    Ok(Page {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        description: row.get(3)?,
        category_id: row.get(4)?,
        is_common: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn page_with_category_from_row(row: &Row<'_>) -> rusqlite::Result<PageWithCategory> {
    Ok(PageWithCategory {
        page: page_from_row(row)?,
        category_name: row.get(8)?,
    })
}

const PAGE_COLUMNS: &str =
    "p.id, p.title, p.url, p.description, p.category_id, p.is_common, p.created_at, p.updated_at";

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Account operations

    fn create_account_with_profile(&self, account: &Account, profile: &Profile) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let result = tx
            .execute(
                "INSERT INTO accounts (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    account.id,
                    account.email,
                    account.password_hash,
                    format_datetime(&account.created_at),
                ],
            )
            .and_then(|_| {
                tx.execute(
                    "INSERT INTO profiles (id, username, role, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        profile.id,
                        profile.username,
                        profile.role.as_str(),
                        format_datetime(&profile.created_at),
                    ],
                )
            });

        match result {
            Ok(_) => {
                tx.commit()?;
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(Error::AlreadyExists),
            Err(e) if is_foreign_key_violation(&e) => Err(Error::NotFound),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.conn()
            .query_row(
                "SELECT id, email, password_hash, created_at FROM accounts WHERE email = ?1",
                params![email],
                account_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    // Profile operations

    fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        self.conn()
            .query_row(
                "SELECT id, username, role, created_at FROM profiles WHERE id = ?1",
                params![id],
                profile_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_profiles(&self) -> Result<Vec<Profile>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, username, role, created_at FROM profiles ORDER BY username ASC",
        )?;

        let rows = stmt.query_map([], profile_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_profile_role(&self, id: &str, role: Role) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE profiles SET role = ?1 WHERE id = ?2",
            params![role.as_str(), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn has_admin(&self) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM profiles WHERE role = 'admin'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        self.conn()
            .query_row(
                "SELECT id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at
                 FROM tokens WHERE token_lookup = ?1",
                params![lookup],
                token_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn delete_user_tokens(&self, user_id: &str) -> Result<usize> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE user_id = ?1", params![user_id])?;
        Ok(rows)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Category operations

    fn create_category(&self, category: &Category) -> Result<()> {
        self.conn().execute(
            "INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![
                category.id,
                category.name,
                format_datetime(&category.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_category(&self, id: &str) -> Result<Option<Category>> {
        self.conn()
            .query_row(
                "SELECT id, name, created_at FROM categories WHERE id = ?1",
                params![id],
                category_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name, created_at FROM categories ORDER BY name")?;

        let rows = stmt.query_map([], category_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_category(&self, category: &Category) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE categories SET name = ?1 WHERE id = ?2",
            params![category.name, category.id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_category(&self, id: &str) -> Result<bool> {
        let result = self
            .conn()
            .execute("DELETE FROM categories WHERE id = ?1", params![id]);

        match result {
            Ok(rows) => Ok(rows > 0),
            Err(e) if is_foreign_key_violation(&e) => Err(Error::conflict(
                "category is still referenced by pages",
            )),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn count_common_pages_in_category(&self, id: &str) -> Result<i64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM pages WHERE category_id = ?1 AND is_common = 1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn count_owned_pages_in_category(&self, id: &str) -> Result<i64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM user_pages up
             JOIN pages p ON p.id = up.page_id
             WHERE p.category_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // Page operations

    fn create_page(&self, page: &Page) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO pages (id, title, url, description, category_id, is_common, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                page.id,
                page.title,
                page.url,
                page.description,
                page.category_id,
                page.is_common,
                format_datetime(&page.created_at),
                format_datetime(&page.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => {
                Err(Error::validation("category does not exist"))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_page(&self, id: &str) -> Result<Option<Page>> {
        let sql = format!("SELECT {PAGE_COLUMNS} FROM pages p WHERE p.id = ?1");
        self.conn()
            .query_row(&sql, params![id], page_from_row)
            .optional()
            .map_err(Error::from)
    }

    fn list_common_pages(&self) -> Result<Vec<PageWithCategory>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {PAGE_COLUMNS}, c.name
             FROM pages p
             LEFT JOIN categories c ON c.id = p.category_id
             WHERE p.is_common = 1
             ORDER BY p.title"
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map([], page_with_category_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_owned_pages(&self, user_id: &str) -> Result<Vec<PageWithCategory>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {PAGE_COLUMNS}, c.name
             FROM user_pages up
             JOIN pages p ON p.id = up.page_id
             LEFT JOIN categories c ON c.id = p.category_id
             WHERE up.user_id = ?1
             ORDER BY p.title"
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map(params![user_id], page_with_category_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_page(&self, page: &Page) -> Result<()> {
        let result = self.conn().execute(
            "UPDATE pages
             SET title = ?1, url = ?2, description = ?3, category_id = ?4, is_common = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                page.title,
                page.url,
                page.description,
                page.category_id,
                page.is_common,
                format_datetime(&page.updated_at),
                page.id,
            ],
        );

        match result {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => {
                Err(Error::validation("category does not exist"))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn delete_page(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM pages WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Ownership operations

    fn create_user_page(&self, link: &UserPage) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO user_pages (user_id, page_id, created_at) VALUES (?1, ?2, ?3)",
            params![link.user_id, link.page_id, format_datetime(&link.created_at)],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::AlreadyExists),
            Err(e) if is_foreign_key_violation(&e) => Err(Error::NotFound),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_page_owner(&self, page_id: &str) -> Result<Option<String>> {
        self.conn()
            .query_row(
                "SELECT user_id FROM user_pages WHERE page_id = ?1",
                params![page_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Error::from)
    }

    fn delete_user_page(&self, user_id: &str, page_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM user_pages WHERE user_id = ?1 AND page_id = ?2",
            params![user_id, page_id],
        )?;
        Ok(rows > 0)
    }

    fn delete_page_owners(&self, page_id: &str) -> Result<usize> {
        let rows = self
            .conn()
            .execute("DELETE FROM user_pages WHERE page_id = ?1", params![page_id])?;
        Ok(rows)
    }

    /// Folds the write-ahead log back into the main database file.
    fn close(&self) -> Result<()> {
        self.conn()
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        Ok(())
    }
}
