pub use sea_orm_migration::prelude::*;

mod m20260301_000001_subscription;
mod m20260301_000002_user;
mod m20260301_000003_account;
mod m20260301_000004_device;
mod m20260301_000005_campaign;
mod m20260301_000006_payment;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_subscription::Migration),
            Box::new(m20260301_000002_user::Migration),
            Box::new(m20260301_000003_account::Migration),
            Box::new(m20260301_000004_device::Migration),
            Box::new(m20260301_000005_campaign::Migration),
            Box::new(m20260301_000006_payment::Migration),
        ]
    }
}
