#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    #[default]
    Generic,
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    /// Postgres numbers its placeholders, the others use `?`.
    pub fn numbered_placeholders(self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

pub trait HasDialect {
    const DIALECT: Dialect;
}

pub struct Generic;

impl HasDialect for Generic {
    const DIALECT: Dialect = Dialect::Generic;
}

pub struct Postgres;

impl HasDialect for Postgres {
    const DIALECT: Dialect = Dialect::Postgres;
}

pub struct MySql;

impl HasDialect for MySql {
    const DIALECT: Dialect = Dialect::MySql;
}

pub struct Sqlite;

impl HasDialect for Sqlite {
    const DIALECT: Dialect = Dialect::Sqlite;
}

#[cfg(feature = "postgres")]
impl HasDialect for sqlx::Postgres {
    const DIALECT: Dialect = Dialect::Postgres;
}

#[cfg(feature = "mysql")]
impl HasDialect for sqlx::MySql {
    const DIALECT: Dialect = Dialect::MySql;
}

#[cfg(feature = "sqlite")]
impl HasDialect for sqlx::Sqlite {
    const DIALECT: Dialect = Dialect::Sqlite;
}
