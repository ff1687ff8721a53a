//! Persistent stores for forms and submissions.
//!
//! Each store receives an explicit [`crate::provider::SqliteProvider`] handle
//! at construction; cascade and nullify rules are enforced here, inside one
//! transaction per mutating operation.

use std::time::Duration;

use turso::Connection;

use crate::errors::StoreError;

pub mod forms;
pub mod submissions;

pub use forms::FormStore;
pub use submissions::SubmissionStore;

/// Opens a write transaction, waiting out a concurrent writer.
///
/// SQLite rejects a second `BEGIN IMMEDIATE` while another write transaction
/// holds the lock instead of queueing it, so concurrent submissions need a
/// bounded retry here.
pub(crate) async fn begin_immediate(conn: &Connection) -> Result<(), StoreError> {
    let mut delay = Duration::from_millis(5);
    for _ in 0..10 {
        match conn.execute("BEGIN IMMEDIATE", ()).await {
            Ok(_) => return Ok(()),
            Err(e) => {
                let message = e.to_string();
                if !message.contains("locked") && !message.contains("busy") {
                    return Err(e.into());
                }
            }
        }
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(Duration::from_millis(80));
    }
    conn.execute("BEGIN IMMEDIATE", ()).await?;
    Ok(())
}
