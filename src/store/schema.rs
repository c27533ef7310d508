pub const SCHEMA: &str = r#"
-- Sign-in identities; the auth capability owns this table
CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,      -- argon2id hash with embedded salt
    created_at TEXT DEFAULT (datetime('now'))
);

-- One profile per account, carries the role used for authorization
CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY REFERENCES accounts(id) ON DELETE CASCADE,
    username TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
    created_at TEXT DEFAULT (datetime('now'))
);

-- Session tokens issued at sign-in
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- first 8 chars of a UUID for fast lookup
    user_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                   -- NULL = never
    last_used_at TEXT
);

-- Categories; name uniqueness is a convention, not a constraint
CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Bookmarked pages
CREATE TABLE IF NOT EXISTS pages (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    description TEXT,

    -- Deleting a referenced category fails instead of orphaning pages
    category_id TEXT REFERENCES categories(id),

    -- If 1, visible to every viewer and managed by admins only
    is_common INTEGER NOT NULL DEFAULT 0,

    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Ownership of private pages; a page has at most one owner
CREATE TABLE IF NOT EXISTS user_pages (
    page_id TEXT PRIMARY KEY REFERENCES pages(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_pages_category ON pages(category_id);
CREATE INDEX IF NOT EXISTS idx_pages_common ON pages(is_common);
CREATE INDEX IF NOT EXISTS idx_user_pages_user ON user_pages(user_id);
CREATE INDEX IF NOT EXISTS idx_profiles_username ON profiles(username);
"#;
