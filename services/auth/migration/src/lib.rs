pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_profiles;
mod m20260301_000002_create_auth_codes;
mod m20260301_000003_create_refresh_tokens;
mod m20260301_000004_create_outbox_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_profiles::Migration),
            Box::new(m20260301_000002_create_auth_codes::Migration),
            Box::new(m20260301_000003_create_refresh_tokens::Migration),
            Box::new(m20260301_000004_create_outbox_events::Migration),
        ]
    }
}
