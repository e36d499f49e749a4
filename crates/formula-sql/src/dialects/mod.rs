//! Per-family dialect implementations.
//!
//! Each family contributes two things: the [`GeneratorConfig`] its SQL is
//! rendered with, and registry overrides placed in front of the generic
//! definitions. Overrides are registered after every generic definition, so
//! a family only has to describe where it differs.

mod bigquery;
mod clickhouse;
mod dummy;
mod mssql;
mod mysql;
mod oracle;
mod postgres;
mod snowflake;
mod sqlite;
mod trino;
mod ydb;

pub use bigquery::BigQueryDialect;
pub use clickhouse::ClickHouseDialect;
pub use dummy::DummyDialect;
pub use mssql::MsSqlDialect;
pub use mysql::MySqlDialect;
pub use oracle::OracleDialect;
pub use postgres::{GreenplumDialect, PostgresDialect};
pub use snowflake::SnowflakeDialect;
pub use sqlite::SqliteDialect;
pub use trino::TrinoDialect;
pub use ydb::YdbDialect;

use tracing::trace;

use crate::definitions::RegistryBuilder;
use crate::dialect::{Dialect, DialectFamily};
use crate::generator::GeneratorConfig;

/// Behaviour shared by every version of one dialect family.
pub trait DialectImpl: Send + Sync {
    fn family(&self) -> DialectFamily;

    /// Rendering settings for this family.
    fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig::default()
    }

    /// Place family-specific variants in front of the generic ones.
    fn register_overrides(&self, _builder: &mut RegistryBuilder) {}
}

static FAMILIES: [&dyn DialectImpl; 12] = [
    &DummyDialect,
    &SqliteDialect,
    &ClickHouseDialect,
    &PostgresDialect,
    &GreenplumDialect,
    &MySqlDialect,
    &MsSqlDialect,
    &OracleDialect,
    &BigQueryDialect,
    &TrinoDialect,
    &YdbDialect,
    &SnowflakeDialect,
];

/// The implementation for `family`.
pub fn family_impl(family: DialectFamily) -> &'static dyn DialectImpl {
    match family {
        DialectFamily::Dummy => &DummyDialect,
        DialectFamily::Sqlite => &SqliteDialect,
        DialectFamily::ClickHouse => &ClickHouseDialect,
        DialectFamily::PostgreSql => &PostgresDialect,
        DialectFamily::Greenplum => &GreenplumDialect,
        DialectFamily::MySql => &MySqlDialect,
        DialectFamily::MsSql => &MsSqlDialect,
        DialectFamily::Oracle => &OracleDialect,
        DialectFamily::BigQuery => &BigQueryDialect,
        DialectFamily::Trino => &TrinoDialect,
        DialectFamily::Ydb => &YdbDialect,
        DialectFamily::Snowflake => &SnowflakeDialect,
    }
}

/// Rendering settings for a concrete dialect.
pub fn generator_config(dialect: Dialect) -> GeneratorConfig {
    family_impl(dialect.family()).generator_config()
}

/// Register every family's overrides.
pub fn register_overrides(builder: &mut RegistryBuilder) {
    for family in FAMILIES {
        trace!(family = family.family().name(), "registering dialect overrides");
        family.register_overrides(builder);
    }
}
