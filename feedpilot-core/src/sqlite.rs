use std::time::Duration;

use rusqlite::Connection;

/// Read-only connections only get the busy timeout; journal mode is a write.
pub fn configure_connection(
    conn: &Connection,
    busy_timeout: Duration,
    writable: bool,
) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    if writable {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;\n\
             PRAGMA synchronous = NORMAL;\n",
        )?;
    }
    Ok(())
}
