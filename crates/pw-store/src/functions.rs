//! Binds the pure text functions from `pw_core::text` into SQLite.

use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::{Connection, Error};

use pw_core::{collate, like_escape, lower, normalize};

pub const COLLATION: &str = "X_COLL";
pub const LOWER: &str = "X_LOWER";
pub const NORM: &str = "X_NORM";
pub const LIKE_ESC: &str = "X_LIKE_ESC";

/// Register the collation and scalar functions on `conn`. Must run before any
/// query that names them.
pub fn register(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_collation(COLLATION, collate)?;
    conn.create_scalar_function(LOWER, 1, flags, |ctx| with_text(ctx, lower))?;
    conn.create_scalar_function(NORM, 1, flags, |ctx| with_text(ctx, normalize))?;
    conn.create_scalar_function(LIKE_ESC, 1, flags, |ctx| with_text(ctx, like_escape))?;
    Ok(())
}

fn with_text(ctx: &Context<'_>, f: fn(&str) -> String) -> rusqlite::Result<String> {
    let text = ctx
        .get_raw(0)
        .as_str()
        .map_err(|e| Error::UserFunctionError(Box::new(e)))?;
    Ok(f(text))
}
