//! Formula-to-SQL translation.
//!
//! [`compile`] turns one formula tree into one [`SqlExpr`] for one concrete
//! dialect. Translation is post-order: children are compiled into
//! [`TranslationCtx`] values before their parent picks a definition from the
//! [`OperationRegistry`](crate::definitions::OperationRegistry) and runs the
//! matching variant. Window configuration children are compiled separately
//! into a [`WindowClause`].

mod normalize;
mod translator;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use normalize::normalize_window_calls;
pub use translator::{CompileStage, Translator};

use crate::datatype::{DataType, DataTypeParams};
use crate::definitions::{ContextFlags, OperationRegistry};
use crate::dialect::{Dialect, DialectCombo};
use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::nodes::NodeRef;
use crate::sql::{OrderByItem, SqlExpr};

/// Compilation settings supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Reject fields missing from the type environment
    pub restrict_fields: bool,
    /// Reject calls to unregistered functions
    pub restrict_functions: bool,
    /// Qualified column path per formula field name
    pub field_names: BTreeMap<String, Vec<String>>,
    /// Dimension fields of the surrounding query, used by `AMONG`
    pub dimensions: Vec<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            restrict_fields: true,
            restrict_functions: true,
            field_names: BTreeMap::new(),
            dimensions: Vec::new(),
        }
    }
}

/// Read-only state handed to every variant body.
#[derive(Debug, Clone)]
pub struct TranslationEnvironment {
    pub dialect: Dialect,
    pub options: CompileOptions,
}

impl TranslationEnvironment {
    pub fn new(dialect: Dialect, options: CompileOptions) -> Self {
        Self { dialect, options }
    }

    /// Whether the target dialect lacks a boolean value type.
    pub fn lacks_boolean(&self) -> bool {
        self.dialect.combo().intersects(DialectCombo::NO_BOOLEAN)
    }
}

/// A compiled argument: SQL fragment plus its resolved type.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationCtx {
    pub expression: SqlExpr,
    pub data_type: DataType,
    pub data_type_params: DataTypeParams,
    pub flags: ContextFlags,
    /// The formula node this fragment was compiled from
    pub node: Option<NodeRef>,
}

impl TranslationCtx {
    pub fn new(expression: SqlExpr, data_type: DataType) -> Self {
        Self {
            expression,
            data_type,
            data_type_params: DataTypeParams::default(),
            flags: ContextFlags::empty(),
            node: None,
        }
    }

    pub fn with_params(mut self, params: DataTypeParams) -> Self {
        self.data_type_params = params;
        self
    }

    pub fn with_flags(mut self, flags: ContextFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_node(mut self, node: NodeRef) -> Self {
        self.node = Some(node);
        self
    }

    pub fn is_condition(&self) -> bool {
        self.flags.contains(ContextFlags::IS_CONDITION)
    }
}

/// Partitioning and ordering compiled from a window call's configuration nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowClause {
    pub partition_by: Vec<SqlExpr>,
    pub order_by: Vec<OrderByItem>,
}

/// The result of compiling one formula.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFormula {
    pub expression: SqlExpr,
    pub data_type: DataType,
    pub data_type_params: DataTypeParams,
    pub dialect: Dialect,
}

impl CompiledFormula {
    /// Render the expression as SQL text for its dialect.
    pub fn sql(&self) -> String {
        Generator::new(crate::dialects::generator_config(self.dialect)).generate(&self.expression)
    }
}

/// Compile `ast` for `dialect` with default options.
///
/// `dialect` must name exactly one concrete dialect.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use formula_sql::{compile, DataType, DialectCombo, FormulaItem};
///
/// let ast = FormulaItem::binary("+", FormulaItem::field("price"), FormulaItem::integer(1));
/// let fields = HashMap::from([("price".to_string(), DataType::Integer)]);
/// let compiled = compile(&ast, DialectCombo::POSTGRESQL_9_4, &fields).unwrap();
/// assert_eq!(compiled.sql(), "\"price\" + 1");
/// assert_eq!(compiled.data_type, DataType::Integer);
/// ```
pub fn compile(
    ast: &NodeRef,
    dialect: DialectCombo,
    field_types: &HashMap<String, DataType>,
) -> Result<CompiledFormula> {
    compile_with(ast, dialect, field_types, &CompileOptions::default())
}

/// Compile `ast` for `dialect` with explicit [`CompileOptions`].
pub fn compile_with(
    ast: &NodeRef,
    dialect: DialectCombo,
    field_types: &HashMap<String, DataType>,
    options: &CompileOptions,
) -> Result<CompiledFormula> {
    let concrete = dialect
        .single()
        .ok_or_else(|| Error::unsupported_dialect(dialect))?;
    debug!(dialect = %concrete, fields = field_types.len(), "compiling formula");

    let registry = OperationRegistry::global();
    let env = TranslationEnvironment::new(concrete, options.clone());
    let mut translator = Translator::new(registry, env, field_types);
    let ctx = translator.run(ast)?;

    debug!(dialect = %concrete, data_type = %ctx.data_type, "compiled formula");
    Ok(CompiledFormula {
        expression: ctx.expression,
        data_type: ctx.data_type,
        data_type_params: ctx.data_type_params,
        dialect: concrete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::FormulaItem;

    fn fields() -> HashMap<String, DataType> {
        HashMap::from([
            ("price".to_string(), DataType::Float),
            ("qty".to_string(), DataType::Integer),
        ])
    }

    #[test]
    fn test_compile_requires_single_dialect() {
        let ast = FormulaItem::field("price");
        let err = compile(&ast, DialectCombo::CLICKHOUSE, &fields()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedDialect { .. }));
        let err = compile(&ast, DialectCombo::empty(), &fields()).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported dialect: EMPTY");
    }

    #[test]
    fn test_compile_field_with_qualified_name() {
        let options = CompileOptions {
            field_names: BTreeMap::from([(
                "price".to_string(),
                vec!["t0".to_string(), "price_usd".to_string()],
            )]),
            ..Default::default()
        };
        let ast = FormulaItem::field("price");
        let compiled =
            compile_with(&ast, DialectCombo::POSTGRESQL_9_3, &fields(), &options).unwrap();
        assert_eq!(compiled.sql(), "\"t0\".\"price_usd\"");
        assert_eq!(compiled.data_type, DataType::Float);
        assert_eq!(compiled.dialect, Dialect::PostgreSql9_3);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: CompileOptions =
            serde_json::from_str(r#"{"dimensions": ["city"]}"#).unwrap();
        assert!(options.restrict_fields);
        assert!(options.restrict_functions);
        assert_eq!(options.dimensions, vec!["city".to_string()]);
    }
}
