//! Target dialects and the dialect capability lattice.
//!
//! A [`Dialect`] is one concrete engine at one version. A [`DialectCombo`] is a
//! bitset over the closed universe of concrete dialects: `|` is union, `&` is
//! intersection and `!` is complement within the known universe. Translation
//! variants declare the combo they support and a request *satisfies* a variant
//! when the two combos intersect.
//!
//! Version-qualified requirements are expressed with [`Dialect::and_above`],
//! which expands to every version of the same family at or above the given one.
//! Both the family unions and the `and_above` expansions are `const`, so the
//! registry tables bake them in at build time.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A database product, independent of version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectFamily {
    Dummy,
    Sqlite,
    ClickHouse,
    PostgreSql,
    Greenplum,
    MySql,
    MsSql,
    Oracle,
    BigQuery,
    Trino,
    Ydb,
    Snowflake,
}

impl DialectFamily {
    pub const fn name(self) -> &'static str {
        match self {
            DialectFamily::Dummy => "DUMMY",
            DialectFamily::Sqlite => "SQLITE",
            DialectFamily::ClickHouse => "CLICKHOUSE",
            DialectFamily::PostgreSql => "POSTGRESQL",
            DialectFamily::Greenplum => "GREENPLUM",
            DialectFamily::MySql => "MYSQL",
            DialectFamily::MsSql => "MSSQLSRV",
            DialectFamily::Oracle => "ORACLE",
            DialectFamily::BigQuery => "BIGQUERY",
            DialectFamily::Trino => "TRINO",
            DialectFamily::Ydb => "YDB",
            DialectFamily::Snowflake => "SNOWFLAKE",
        }
    }

    /// Every version of this family.
    pub const fn all(self) -> DialectCombo {
        let mut bits = 0u64;
        let mut i = 0;
        while i < Dialect::ALL.len() {
            let d = Dialect::ALL[i];
            if d.family() as u8 == self as u8 {
                bits |= d.combo().bits();
            }
            i += 1;
        }
        DialectCombo::from_bits_retain(bits)
    }

    pub const ALL: [DialectFamily; 12] = [
        DialectFamily::Dummy,
        DialectFamily::Sqlite,
        DialectFamily::ClickHouse,
        DialectFamily::PostgreSql,
        DialectFamily::Greenplum,
        DialectFamily::MySql,
        DialectFamily::MsSql,
        DialectFamily::Oracle,
        DialectFamily::BigQuery,
        DialectFamily::Trino,
        DialectFamily::Ydb,
        DialectFamily::Snowflake,
    ];
}

/// An ordered engine version within a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DialectVersion(pub u16, pub u16, pub u16);

impl DialectVersion {
    const fn ge(self, other: DialectVersion) -> bool {
        if self.0 != other.0 {
            return self.0 > other.0;
        }
        if self.1 != other.1 {
            return self.1 > other.1;
        }
        self.2 >= other.2
    }
}

/// One concrete target engine at one version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(u8)]
pub enum Dialect {
    Dummy,
    Sqlite,
    ClickHouse19_13,
    ClickHouse21_8,
    ClickHouse22_10,
    ClickHouse23_8,
    PostgreSql9_3,
    PostgreSql9_4,
    Greenplum6,
    MySql5_6,
    MySql5_7,
    MySql8_0_12,
    MsSqlSrv2017,
    Oracle12_1,
    BigQuery,
    Trino,
    Ydb,
    Snowflake,
}

impl Dialect {
    pub const ALL: [Dialect; 18] = [
        Dialect::Dummy,
        Dialect::Sqlite,
        Dialect::ClickHouse19_13,
        Dialect::ClickHouse21_8,
        Dialect::ClickHouse22_10,
        Dialect::ClickHouse23_8,
        Dialect::PostgreSql9_3,
        Dialect::PostgreSql9_4,
        Dialect::Greenplum6,
        Dialect::MySql5_6,
        Dialect::MySql5_7,
        Dialect::MySql8_0_12,
        Dialect::MsSqlSrv2017,
        Dialect::Oracle12_1,
        Dialect::BigQuery,
        Dialect::Trino,
        Dialect::Ydb,
        Dialect::Snowflake,
    ];

    pub const fn family(self) -> DialectFamily {
        match self {
            Dialect::Dummy => DialectFamily::Dummy,
            Dialect::Sqlite => DialectFamily::Sqlite,
            Dialect::ClickHouse19_13
            | Dialect::ClickHouse21_8
            | Dialect::ClickHouse22_10
            | Dialect::ClickHouse23_8 => DialectFamily::ClickHouse,
            Dialect::PostgreSql9_3 | Dialect::PostgreSql9_4 => DialectFamily::PostgreSql,
            Dialect::Greenplum6 => DialectFamily::Greenplum,
            Dialect::MySql5_6 | Dialect::MySql5_7 | Dialect::MySql8_0_12 => DialectFamily::MySql,
            Dialect::MsSqlSrv2017 => DialectFamily::MsSql,
            Dialect::Oracle12_1 => DialectFamily::Oracle,
            Dialect::BigQuery => DialectFamily::BigQuery,
            Dialect::Trino => DialectFamily::Trino,
            Dialect::Ydb => DialectFamily::Ydb,
            Dialect::Snowflake => DialectFamily::Snowflake,
        }
    }

    /// Version within the family; unversioned engines report `0.0.0`.
    pub const fn version(self) -> DialectVersion {
        match self {
            Dialect::ClickHouse19_13 => DialectVersion(19, 13, 0),
            Dialect::ClickHouse21_8 => DialectVersion(21, 8, 0),
            Dialect::ClickHouse22_10 => DialectVersion(22, 10, 0),
            Dialect::ClickHouse23_8 => DialectVersion(23, 8, 0),
            Dialect::PostgreSql9_3 => DialectVersion(9, 3, 0),
            Dialect::PostgreSql9_4 => DialectVersion(9, 4, 0),
            Dialect::Greenplum6 => DialectVersion(6, 0, 0),
            Dialect::MySql5_6 => DialectVersion(5, 6, 0),
            Dialect::MySql5_7 => DialectVersion(5, 7, 0),
            Dialect::MySql8_0_12 => DialectVersion(8, 0, 12),
            Dialect::MsSqlSrv2017 => DialectVersion(14, 0, 0),
            Dialect::Oracle12_1 => DialectVersion(12, 1, 0),
            _ => DialectVersion(0, 0, 0),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Dialect::Dummy => "DUMMY",
            Dialect::Sqlite => "SQLITE",
            Dialect::ClickHouse19_13 => "CLICKHOUSE_19_13",
            Dialect::ClickHouse21_8 => "CLICKHOUSE_21_8",
            Dialect::ClickHouse22_10 => "CLICKHOUSE_22_10",
            Dialect::ClickHouse23_8 => "CLICKHOUSE_23_8",
            Dialect::PostgreSql9_3 => "POSTGRESQL_9_3",
            Dialect::PostgreSql9_4 => "POSTGRESQL_9_4",
            Dialect::Greenplum6 => "GREENPLUM_6",
            Dialect::MySql5_6 => "MYSQL_5_6",
            Dialect::MySql5_7 => "MYSQL_5_7",
            Dialect::MySql8_0_12 => "MYSQL_8_0_12",
            Dialect::MsSqlSrv2017 => "MSSQLSRV_14_0",
            Dialect::Oracle12_1 => "ORACLE_12_1",
            Dialect::BigQuery => "BIGQUERY",
            Dialect::Trino => "TRINO",
            Dialect::Ydb => "YDB",
            Dialect::Snowflake => "SNOWFLAKE",
        }
    }

    /// Single-bit combo for this dialect.
    pub const fn combo(self) -> DialectCombo {
        DialectCombo::from_bits_retain(1u64 << (self as u8))
    }

    /// All versions of this dialect's family at or above its version.
    pub const fn and_above(self) -> DialectCombo {
        let family = self.family() as u8;
        let floor = self.version();
        let mut bits = 0u64;
        let mut i = 0;
        while i < Dialect::ALL.len() {
            let d = Dialect::ALL[i];
            if d.family() as u8 == family && d.version().ge(floor) {
                bits |= d.combo().bits();
            }
            i += 1;
        }
        DialectCombo::from_bits_retain(bits)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Dialect> for String {
    fn from(d: Dialect) -> Self {
        d.name().to_string()
    }
}

impl TryFrom<String> for Dialect {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Dialect::ALL
            .into_iter()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| Error::unsupported_dialect(s))
    }
}

bitflags! {
    /// A set of concrete dialects.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct DialectCombo: u64 {
        const DUMMY = Dialect::Dummy.combo().bits();
        const SQLITE = Dialect::Sqlite.combo().bits();
        const CLICKHOUSE_19_13 = Dialect::ClickHouse19_13.combo().bits();
        const CLICKHOUSE_21_8 = Dialect::ClickHouse21_8.combo().bits();
        const CLICKHOUSE_22_10 = Dialect::ClickHouse22_10.combo().bits();
        const CLICKHOUSE_23_8 = Dialect::ClickHouse23_8.combo().bits();
        const POSTGRESQL_9_3 = Dialect::PostgreSql9_3.combo().bits();
        const POSTGRESQL_9_4 = Dialect::PostgreSql9_4.combo().bits();
        const GREENPLUM_6 = Dialect::Greenplum6.combo().bits();
        const MYSQL_5_6 = Dialect::MySql5_6.combo().bits();
        const MYSQL_5_7 = Dialect::MySql5_7.combo().bits();
        const MYSQL_8_0_12 = Dialect::MySql8_0_12.combo().bits();
        const MSSQLSRV_14_0 = Dialect::MsSqlSrv2017.combo().bits();
        const ORACLE_12_1 = Dialect::Oracle12_1.combo().bits();
        const BIGQUERY = Dialect::BigQuery.combo().bits();
        const TRINO = Dialect::Trino.combo().bits();
        const YDB = Dialect::Ydb.combo().bits();
        const SNOWFLAKE = Dialect::Snowflake.combo().bits();

        const CLICKHOUSE = DialectFamily::ClickHouse.all().bits();
        const POSTGRESQL = DialectFamily::PostgreSql.all().bits();
        const GREENPLUM = DialectFamily::Greenplum.all().bits();
        const MYSQL = DialectFamily::MySql.all().bits();
        const MSSQLSRV = DialectFamily::MsSql.all().bits();
        const ORACLE = DialectFamily::Oracle.all().bits();
        /// PostgreSQL-compatible engines sharing most function spellings.
        const COMPENG = Self::POSTGRESQL.bits() | Self::GREENPLUM.bits();
        /// Engines without a boolean value type.
        const NO_BOOLEAN = Self::MSSQLSRV.bits() | Self::ORACLE.bits();

        const ANY = (1u64 << Dialect::ALL.len()) - 1;
    }
}

impl DialectCombo {
    /// Whether a request for `self` can be served by a variant requiring `required`.
    pub const fn satisfies(self, required: DialectCombo) -> bool {
        satisfies(self, required)
    }

    /// The concrete dialects in this combo, in declaration order.
    pub fn dialects(self) -> impl Iterator<Item = Dialect> {
        Dialect::ALL
            .into_iter()
            .filter(move |d| self.intersects(d.combo()))
    }

    /// The only dialect in this combo, if it holds exactly one.
    pub fn single(self) -> Option<Dialect> {
        if self.bits().count_ones() != 1 {
            return None;
        }
        self.dialects().next()
    }
}

/// `requested` satisfies `required` iff the two combos intersect.
pub const fn satisfies(requested: DialectCombo, required: DialectCombo) -> bool {
    !requested.intersection(required).is_empty()
}

impl From<Dialect> for DialectCombo {
    fn from(d: Dialect) -> Self {
        d.combo()
    }
}

impl FromIterator<Dialect> for DialectCombo {
    fn from_iter<I: IntoIterator<Item = Dialect>>(iter: I) -> Self {
        iter.into_iter()
            .fold(DialectCombo::empty(), |acc, d| acc | d.combo())
    }
}

impl fmt::Display for DialectCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("EMPTY");
        }
        let mut first = true;
        let mut remaining = *self;
        for family in DialectFamily::ALL {
            let whole = family.all();
            let names: Vec<&str> = if remaining.contains(whole) && whole.bits().count_ones() > 1 {
                remaining.remove(whole);
                vec![family.name()]
            } else {
                let hit = remaining & whole;
                remaining.remove(hit);
                hit.dialects().map(Dialect::name).collect()
            };
            for name in names {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl FromStr for DialectCombo {
    type Err = Error;

    /// Parse `|`-separated dialect or family names, e.g. `CLICKHOUSE_22_10|POSTGRESQL`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut combo = DialectCombo::empty();
        for part in s.split('|') {
            let name = part.trim().to_ascii_uppercase();
            if name == "ANY" {
                combo |= DialectCombo::ANY;
                continue;
            }
            if let Some(family) = DialectFamily::ALL.into_iter().find(|f| f.name() == name) {
                combo |= family.all();
                continue;
            }
            combo |= name.parse::<Dialect>()?.combo();
        }
        Ok(combo)
    }
}
