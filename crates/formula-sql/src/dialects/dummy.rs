//! Dummy Dialect
//!
//! A neutral target used in tests and for dialect-independent rendering. It
//! takes every generic definition as is.

use super::DialectImpl;
use crate::dialect::DialectFamily;

/// Dummy dialect
pub struct DummyDialect;

impl DialectImpl for DummyDialect {
    fn family(&self) -> DialectFamily {
        DialectFamily::Dummy
    }
}
