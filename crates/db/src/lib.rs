use sqlx_migrator::{Info, Migrator};

pub mod encryption;
mod migrations;
pub mod model;
pub mod repository;
pub mod table;

pub fn migrator<DB: sqlx::Database>() -> Result<Migrator<DB>, sqlx_migrator::Error>
where
    evento::sql_migrator::InitMigration: sqlx_migrator::Migration<DB>,
    evento::sql_migrator::M0002: sqlx_migrator::Migration<DB>,
    migrations::Migration: sqlx_migrator::Migration<DB>,
{
    let mut migrator = evento::sql_migrator::new::<DB>()?;
    migrator.add_migrations(vec![Box::new(migrations::Migration)])?;

    Ok(migrator)
}
