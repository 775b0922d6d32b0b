//! Run the embedded server migrations.
//!
//! ```bash
//! stride-cli migrate
//! ```
//!
//! Reads `DATABASE_URL`. Migration files live in `crates/server/migrations/`.

use super::{CommandError, connect};

pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    stride_server::MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
