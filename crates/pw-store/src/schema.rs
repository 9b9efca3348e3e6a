use rusqlite::Connection;

use crate::error::Result;

/// Pragmas and tables. Safe to run on every start.
pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    // The index is rebuilt from live panes; losing it on a crash is fine.
    conn.pragma_update(None, "synchronous", "OFF")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    // Searches match on X_NORM(X_LOWER(word)), which no plain index can
    // serve, so they scan. The pane index keeps refresh deletes cheap.
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS words (
            pane_id TEXT NOT NULL,
            word    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_words_pane_word ON words(pane_id, word);
        ",
    )?;

    Ok(())
}
