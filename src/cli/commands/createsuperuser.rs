use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use model::provisioning;
use sea_orm::Database;
use tracing::{debug, info, trace};

use crate::auth::hash_password;

pub async fn create_superuser(
    database_url: &str,
    email: String,
    password: &str,
    first_name: String,
    last_name: String,
) -> Result<()> {
    trace!("Entering create_superuser function");
    info!("Creating superuser account");
    debug!("Database URL: {}", database_url);

    let db = Database::connect(database_url).await?;
    Migrator::up(&db, None).await?;

    let password_hash = hash_password(password)?;
    let created =
        provisioning::create_superuser(&db, email, password_hash, first_name, last_name).await?;

    info!("Superuser {} created with id {}", created.email, created.id);
    Ok(())
}
