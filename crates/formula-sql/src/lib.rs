//! Formula SQL - BI formula to SQL expression compiler
//!
//! This library compiles already-parsed formula trees (calculated fields of
//! a BI tool) into SQL expressions for a range of database dialects.
//!
//! # Architecture
//!
//! The library follows a pipeline architecture:
//! 1. **Node model** - [`FormulaItem`] trees, addressed and rewritten through [`FormulaWalk`]
//! 2. **Translation** - post-order typing and variant selection against the
//!    [`OperationRegistry`](definitions::OperationRegistry)
//! 3. **Generator** - renders the resulting [`SqlExpr`] as SQL text
//!
//! Each dialect family contributes generator settings and registry
//! overrides; see [`dialects`].
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use formula_sql::{compile, DataType, DialectCombo, FormulaItem};
//!
//! let ast = FormulaItem::func("upper", vec![FormulaItem::field("city")]);
//! let fields = HashMap::from([("city".to_string(), DataType::String)]);
//! let compiled = compile(&ast, DialectCombo::MYSQL_8_0_12, &fields).unwrap();
//! assert_eq!(compiled.sql(), "UPPER(`city`)");
//! ```

pub mod datatype;
pub mod definitions;
pub mod dialect;
pub mod dialects;
pub mod dot;
pub mod error;
pub mod generator;
pub mod markup;
pub mod nodes;
pub mod sql;
pub mod translation;
pub mod traversal;

pub use datatype::{DataType, DataTypeParams, TypeSet};
pub use dialect::{Dialect, DialectCombo, DialectFamily};
pub use dot::{visualize, Graph};
pub use error::{Error, Result};
pub use generator::{Generator, GeneratorConfig};
pub use nodes::{FormulaItem, LiteralValue, NodeMeta, NodeRef, Position};
pub use sql::SqlExpr;
pub use translation::{compile, compile_with, CompileOptions, CompiledFormula};
pub use traversal::{FormulaWalk, NodeHierarchyIndex};
