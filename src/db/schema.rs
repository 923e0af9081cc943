pub const CREATE_STRINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS strings (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  string TEXT NOT NULL CHECK (length(string) > 0),
  favorite INTEGER NOT NULL DEFAULT 0 CHECK (favorite IN (0, 1)),
  hash TEXT NOT NULL
);
"#;

pub const CREATE_SETTINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  sounds INTEGER NOT NULL DEFAULT 1 CHECK (sounds IN (0, 1)),
  max_elements INTEGER NOT NULL DEFAULT 100 CHECK (max_elements >= 0),
  number INTEGER NOT NULL DEFAULT 0 CHECK (number IN (0, 1))
);
"#;

pub const CREATE_INDEX_HASH: &str = "CREATE INDEX IF NOT EXISTS idx_strings_hash ON strings(hash);";
pub const CREATE_INDEX_FAVORITE: &str =
    "CREATE INDEX IF NOT EXISTS idx_strings_favorite ON strings(favorite, id DESC);";

pub const CREATE_SETTINGS_TABLE_V2: &str = r#"
CREATE TABLE IF NOT EXISTS settings_v2 (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  sounds INTEGER NOT NULL DEFAULT 1 CHECK (sounds IN (0, 1)),
  max_elements INTEGER NOT NULL DEFAULT 100 CHECK (max_elements >= 0),
  number INTEGER NOT NULL DEFAULT 0 CHECK (number IN (0, 1))
);
"#;
