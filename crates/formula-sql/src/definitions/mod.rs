//! Function and operator definitions.
//!
//! A [`Definition`] couples a name with argument-type signatures, a return
//! type strategy and an ordered list of dialect-scoped
//! [`TranslationVariant`]s. Definitions are collected once into the
//! process-wide [`OperationRegistry`] and never mutated afterwards.
//!
//! Lookup is order-sensitive: for a given name the first definition whose
//! signature accepts the argument types *and* which has a variant for the
//! requested dialect wins, and within a definition the first satisfied
//! variant wins. Generic definitions are registered first; dialect modules
//! then place their overrides in front of them.

mod aggregation;
mod array;
mod conversion;
mod datetime;
mod logical;
mod markup;
mod math;
mod operators;
mod string;
mod window;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use bitflags::bitflags;
use tracing::trace;

pub use conversion::{cast_to_datetime, cast_to_generic_datetime};
pub use operators::{DatePromotion, Denullify, NullSentinels};

pub(crate) use aggregation::{percentile_median, when_then};
pub(crate) use conversion::unary_fn;
pub(crate) use datetime::{unit_arg, DATEADD_UNITS};
pub(crate) use operators::{comparisons, denullified_equality, NULL_COMPARISON};

use crate::datatype::{DataType, DataTypeParams, TypeSet};
use crate::dialect::{Dialect, DialectCombo};
use crate::error::{Error, Result};
use crate::sql::SqlExpr;
use crate::translation::{TranslationCtx, TranslationEnvironment, WindowClause};

bitflags! {
    /// Non-type metadata attached to arguments and results.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ContextFlags: u32 {
        /// The fragment is a predicate rather than a value
        const IS_CONDITION = 1 << 0;
        /// The argument position expects a predicate
        const REQ_CONDITION = 1 << 1;
    }
}

// ----------------------------------------------------------------------
// Type sets used by signatures
// ----------------------------------------------------------------------

pub const BOOLEAN: TypeSet = TypeSet::of(&[DataType::Boolean]);
pub const INTEGER: TypeSet = TypeSet::of(&[DataType::Integer]);
pub const NUMBER: TypeSet = TypeSet::of(&[DataType::Integer, DataType::Float]);
pub const STRING: TypeSet = TypeSet::of(&[DataType::String]);
pub const DATE: TypeSet = TypeSet::of(&[DataType::Date]);
pub const DATETIME: TypeSet = TypeSet::of(&[DataType::Datetime]);
pub const GENERIC_DATETIME: TypeSet = TypeSet::of(&[DataType::GenericDatetime]);
pub const DATELIKE: TypeSet =
    TypeSet::of(&[DataType::Date, DataType::Datetime, DataType::GenericDatetime]);
pub const UUID: TypeSet = TypeSet::of(&[DataType::Uuid]);
pub const GEO: TypeSet = TypeSet::of(&[DataType::Geopoint, DataType::Geopolygon]);
pub const MARKUP: TypeSet = TypeSet::of(&[DataType::Markup]);
pub const MARKUP_OR_STRING: TypeSet = TypeSet::of(&[DataType::Markup, DataType::String]);
pub const ARRAY: TypeSet =
    TypeSet::of(&[DataType::ArrayInt, DataType::ArrayFloat, DataType::ArrayStr]);
pub const ARRAY_INT: TypeSet = TypeSet::of(&[DataType::ArrayInt]);
pub const ARRAY_FLOAT: TypeSet = TypeSet::of(&[DataType::ArrayFloat]);
pub const ARRAY_STR: TypeSet = TypeSet::of(&[DataType::ArrayStr]);
/// Kinds with a total order
pub const ORDERED: TypeSet = TypeSet::of(&[
    DataType::Boolean,
    DataType::Integer,
    DataType::Float,
    DataType::String,
    DataType::Date,
    DataType::Datetime,
    DataType::GenericDatetime,
    DataType::Uuid,
]);
pub const ANY: TypeSet = TypeSet::every();

/// Whether a value of kind `t` satisfies a position requiring `required`.
pub fn accepts(t: DataType, required: TypeSet) -> bool {
    t.autocast_types().intersects(required)
}

// ----------------------------------------------------------------------
// Signatures and return types
// ----------------------------------------------------------------------

/// Argument-type requirement of one signature.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgTypes {
    /// Fixed arity, one requirement per position
    Sequence(Vec<TypeSet>),
    /// Any arity, the same requirement everywhere
    ForAll(TypeSet),
    /// Like `ForAll`, but at least one argument's exact kind must be in `required`
    ForAllRequiringOne { types: TypeSet, required: TypeSet },
}

impl ArgTypes {
    pub fn arity(&self) -> Option<usize> {
        match self {
            ArgTypes::Sequence(types) => Some(types.len()),
            _ => None,
        }
    }

    pub fn matches(&self, arg_types: &[DataType]) -> bool {
        match self {
            ArgTypes::Sequence(required) => {
                required.len() == arg_types.len()
                    && required
                        .iter()
                        .zip(arg_types)
                        .all(|(req, t)| accepts(*t, *req))
            }
            ArgTypes::ForAll(required) => arg_types.iter().all(|t| accepts(*t, *required)),
            ArgTypes::ForAllRequiringOne { types, required } => {
                arg_types.iter().all(|t| accepts(*t, *types))
                    && arg_types.iter().any(|t| required.has(*t))
            }
        }
    }
}

/// How a call's result type is derived from its argument types.
#[derive(Clone, Copy)]
pub enum TypeStrategy {
    Fixed(DataType),
    /// Common type of the listed argument positions; an empty list means all
    FromArgs(&'static [usize]),
    Custom(fn(&[DataType]) -> Option<DataType>),
}

impl fmt::Debug for TypeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeStrategy::Fixed(t) => write!(f, "Fixed({t})"),
            TypeStrategy::FromArgs(positions) => write!(f, "FromArgs({positions:?})"),
            TypeStrategy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl TypeStrategy {
    pub fn resolve(&self, name: &str, arg_types: &[DataType]) -> Result<DataType> {
        match self {
            TypeStrategy::Fixed(t) => Ok(*t),
            TypeStrategy::FromArgs(positions) => {
                let picked = if positions.is_empty() {
                    arg_types.to_vec()
                } else {
                    positions
                        .iter()
                        .map(|&i| {
                            arg_types.get(i).copied().ok_or_else(|| {
                                Error::return_type(name, format!("no argument at position {i}"))
                            })
                        })
                        .collect::<Result<Vec<_>>>()?
                };
                DataType::common_type(&picked).ok_or_else(|| {
                    let names: Vec<&str> = picked.iter().map(|t| t.name()).collect();
                    Error::return_type(
                        name,
                        format!("arguments ({}) have no common type", names.join("|")),
                    )
                })
            }
            TypeStrategy::Custom(f) => f(arg_types)
                .ok_or_else(|| Error::return_type(name, "unsupported argument types")),
        }
    }
}

/// How a call's type parameters (e.g. timezone) are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamsStrategy {
    Empty,
    FromArg(usize),
}

impl ParamsStrategy {
    pub fn resolve(&self, args: &[TranslationCtx]) -> DataTypeParams {
        match self {
            ParamsStrategy::Empty => DataTypeParams::default(),
            ParamsStrategy::FromArg(i) => args
                .get(*i)
                .map(|a| a.data_type_params.clone())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Signature {
    pub arg_types: ArgTypes,
    /// Overrides the definition-level strategy when set
    pub return_type: Option<TypeStrategy>,
}

// ----------------------------------------------------------------------
// Variants
// ----------------------------------------------------------------------

pub type DirectFn = dyn Fn(&[SqlExpr], &TranslationEnvironment) -> Result<SqlExpr> + Send + Sync;
pub type WrappedFn =
    dyn Fn(&[TranslationCtx], &TranslationEnvironment) -> Result<SqlExpr> + Send + Sync;
pub type WindowFn =
    dyn Fn(&[SqlExpr], &WindowClause, &TranslationEnvironment) -> Result<SqlExpr> + Send + Sync;

/// The code that emits SQL for one variant.
#[derive(Clone)]
pub enum VariantBody {
    /// Receives translated argument fragments
    Direct(Arc<DirectFn>),
    /// Receives full argument contexts, including types and source nodes
    Wrapped(Arc<WrappedFn>),
    /// Receives translated arguments plus the compiled window clause
    Window(Arc<WindowFn>),
}

impl fmt::Debug for VariantBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantBody::Direct(_) => f.write_str("Direct(..)"),
            VariantBody::Wrapped(_) => f.write_str("Wrapped(..)"),
            VariantBody::Window(_) => f.write_str("Window(..)"),
        }
    }
}

pub fn direct<F>(f: F) -> VariantBody
where
    F: Fn(&[SqlExpr], &TranslationEnvironment) -> Result<SqlExpr> + Send + Sync + 'static,
{
    VariantBody::Direct(Arc::new(f))
}

pub fn wrapped<F>(f: F) -> VariantBody
where
    F: Fn(&[TranslationCtx], &TranslationEnvironment) -> Result<SqlExpr> + Send + Sync + 'static,
{
    VariantBody::Wrapped(Arc::new(f))
}

pub fn windowed<F>(f: F) -> VariantBody
where
    F: Fn(&[SqlExpr], &WindowClause, &TranslationEnvironment) -> Result<SqlExpr>
        + Send
        + Sync
        + 'static,
{
    VariantBody::Window(Arc::new(f))
}

/// `NAME(args...)`
pub fn call(name: &'static str) -> VariantBody {
    direct(move |args, _| Ok(SqlExpr::func(name, args.to_vec())))
}

/// Borrow exactly `N` arguments, or fail with an arity error.
pub fn expect_args<const N: usize>(args: &[SqlExpr]) -> Result<&[SqlExpr; N]> {
    args.try_into()
        .map_err(|_| Error::arity("call", N, args.len()))
}

/// Rewrites already-typed arguments before a variant body runs.
pub trait ArgTransformer: Send + Sync {
    fn transform(
        &self,
        args: Vec<TranslationCtx>,
        env: &TranslationEnvironment,
    ) -> Result<Vec<TranslationCtx>>;
}

impl<F> ArgTransformer for F
where
    F: Fn(Vec<TranslationCtx>, &TranslationEnvironment) -> Result<Vec<TranslationCtx>>
        + Send
        + Sync,
{
    fn transform(
        &self,
        args: Vec<TranslationCtx>,
        env: &TranslationEnvironment,
    ) -> Result<Vec<TranslationCtx>> {
        self(args, env)
    }
}

/// One dialect-scoped implementation of a definition.
#[derive(Clone)]
pub struct TranslationVariant {
    pub dialects: DialectCombo,
    pub body: VariantBody,
    pub arg_transformer: Option<Arc<dyn ArgTransformer>>,
}

impl fmt::Debug for TranslationVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationVariant")
            .field("dialects", &self.dialects)
            .field("body", &self.body)
            .field("arg_transformer", &self.arg_transformer.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------
// Definitions
// ----------------------------------------------------------------------

/// A function or operator with its signatures and variants.
#[derive(Debug, Clone)]
pub struct Definition {
    pub name: String,
    pub is_window: bool,
    pub is_aggregate: bool,
    pub signatures: Vec<Signature>,
    /// Per-position flags; missing positions carry no flags
    pub arg_flags: Vec<ContextFlags>,
    pub return_type: TypeStrategy,
    pub return_params: ParamsStrategy,
    pub return_flags: ContextFlags,
    /// Reject NULL-typed arguments with a hint to use `IS [NOT] NULL`
    pub forbid_null: bool,
    pub variants: Vec<TranslationVariant>,
}

impl Definition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            is_window: false,
            is_aggregate: false,
            signatures: Vec::new(),
            arg_flags: Vec::new(),
            return_type: TypeStrategy::FromArgs(&[]),
            return_params: ParamsStrategy::Empty,
            return_flags: ContextFlags::empty(),
            forbid_null: false,
            variants: Vec::new(),
        }
    }

    pub fn window(name: impl Into<String>) -> Self {
        Self {
            is_window: true,
            ..Self::new(name)
        }
    }

    pub fn aggregate(mut self) -> Self {
        self.is_aggregate = true;
        self
    }

    pub fn signature(mut self, arg_types: ArgTypes, return_type: Option<TypeStrategy>) -> Self {
        self.signatures.push(Signature {
            arg_types,
            return_type,
        });
        self
    }

    /// Add a fixed-arity signature.
    pub fn args(self, types: &[TypeSet]) -> Self {
        self.signature(ArgTypes::Sequence(types.to_vec()), None)
    }

    /// Add a fixed-arity signature with its own return type.
    pub fn args_returning(self, types: &[TypeSet], return_type: TypeStrategy) -> Self {
        self.signature(ArgTypes::Sequence(types.to_vec()), Some(return_type))
    }

    pub fn variadic(self, types: TypeSet) -> Self {
        self.signature(ArgTypes::ForAll(types), None)
    }

    pub fn variadic_requiring(self, types: TypeSet, required: TypeSet) -> Self {
        self.signature(ArgTypes::ForAllRequiringOne { types, required }, None)
    }

    pub fn returns(mut self, strategy: TypeStrategy) -> Self {
        self.return_type = strategy;
        self
    }

    pub fn returns_type(self, t: DataType) -> Self {
        self.returns(TypeStrategy::Fixed(t))
    }

    pub fn params_from(mut self, position: usize) -> Self {
        self.return_params = ParamsStrategy::FromArg(position);
        self
    }

    pub fn arg_flags(mut self, flags: &[ContextFlags]) -> Self {
        self.arg_flags = flags.to_vec();
        self
    }

    /// Mark the result as a predicate.
    pub fn condition(mut self) -> Self {
        self.return_flags |= ContextFlags::IS_CONDITION;
        self
    }

    pub fn forbid_null(mut self) -> Self {
        self.forbid_null = true;
        self
    }

    pub fn variant(mut self, dialects: DialectCombo, body: VariantBody) -> Self {
        self.variants.push(TranslationVariant {
            dialects,
            body,
            arg_transformer: None,
        });
        self
    }

    pub fn variant_with<T>(mut self, dialects: DialectCombo, body: VariantBody, transformer: T) -> Self
    where
        T: ArgTransformer + 'static,
    {
        self.variants.push(TranslationVariant {
            dialects,
            body,
            arg_transformer: Some(Arc::new(transformer)),
        });
        self
    }

    pub fn arg_flag(&self, position: usize) -> ContextFlags {
        self.arg_flags
            .get(position)
            .copied()
            .unwrap_or(ContextFlags::empty())
    }

    /// First signature accepting `arg_types`.
    pub fn match_signature(&self, arg_types: &[DataType]) -> Option<&Signature> {
        self.signatures
            .iter()
            .find(|sig| sig.arg_types.matches(arg_types))
    }

    /// First variant whose combo the requested dialect satisfies.
    pub fn match_variant(&self, dialect: Dialect) -> Option<&TranslationVariant> {
        self.variants
            .iter()
            .find(|v| dialect.combo().satisfies(v.dialects))
    }

    pub fn return_type_for(&self, signature: &Signature, arg_types: &[DataType]) -> Result<DataType> {
        signature
            .return_type
            .as_ref()
            .unwrap_or(&self.return_type)
            .resolve(&self.name, arg_types)
    }
}

// ----------------------------------------------------------------------
// Registry
// ----------------------------------------------------------------------

type RegistryKey = (String, bool);

/// Collects definitions in registration order.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    definitions: HashMap<RegistryKey, Vec<Definition>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, definition: Definition) -> &mut Self {
        self.definitions
            .entry((definition.name.clone(), definition.is_window))
            .or_default()
            .push(definition);
        self
    }

    /// Register a definition that shadows every existing one of the same name.
    pub fn add_first(&mut self, definition: Definition) -> &mut Self {
        self.definitions
            .entry((definition.name.clone(), definition.is_window))
            .or_default()
            .insert(0, definition);
        self
    }

    /// Give every non-window definition of `name` a leading variant for `dialects`.
    pub fn override_variant(
        &mut self,
        name: &str,
        dialects: DialectCombo,
        body: VariantBody,
    ) -> &mut Self {
        self.override_where(name, false, None, dialects, body)
    }

    /// Like [`override_variant`](Self::override_variant), restricted to the
    /// definitions accepting `sample` argument types.
    pub fn override_for(
        &mut self,
        name: &str,
        sample: &[DataType],
        dialects: DialectCombo,
        body: VariantBody,
    ) -> &mut Self {
        self.override_where(name, false, Some(sample), dialects, body)
    }

    /// Leading variant for the window definitions of `name`.
    pub fn override_window(
        &mut self,
        name: &str,
        dialects: DialectCombo,
        body: VariantBody,
    ) -> &mut Self {
        self.override_where(name, true, None, dialects, body)
    }

    fn override_where(
        &mut self,
        name: &str,
        is_window: bool,
        sample: Option<&[DataType]>,
        dialects: DialectCombo,
        body: VariantBody,
    ) -> &mut Self {
        let Some(definitions) = self.definitions.get_mut(&(name.to_lowercase(), is_window)) else {
            trace!(function = name, "override for unregistered definition ignored");
            return self;
        };
        for definition in definitions
            .iter_mut()
            .filter(|d| sample.map_or(true, |types| d.match_signature(types).is_some()))
        {
            definition.variants.insert(
                0,
                TranslationVariant {
                    dialects,
                    body: body.clone(),
                    arg_transformer: None,
                },
            );
        }
        self
    }

    pub fn build(self) -> OperationRegistry {
        OperationRegistry {
            definitions: self.definitions,
        }
    }
}

/// The result of looking up a call site.
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'r> {
    pub definition: &'r Definition,
    pub signature: &'r Signature,
    pub variant: &'r TranslationVariant,
    pub return_type: DataType,
}

/// Process-wide, read-only catalogue of definitions.
#[derive(Debug)]
pub struct OperationRegistry {
    definitions: HashMap<RegistryKey, Vec<Definition>>,
}

static GLOBAL_REGISTRY: LazyLock<OperationRegistry> = LazyLock::new(OperationRegistry::standard);

impl OperationRegistry {
    /// The shared registry with every built-in definition.
    pub fn global() -> &'static OperationRegistry {
        &GLOBAL_REGISTRY
    }

    /// Build a registry holding every built-in definition.
    pub fn standard() -> OperationRegistry {
        let mut builder = RegistryBuilder::new();
        operators::register(&mut builder);
        logical::register(&mut builder);
        string::register(&mut builder);
        math::register(&mut builder);
        conversion::register(&mut builder);
        datetime::register(&mut builder);
        aggregation::register(&mut builder);
        window::register(&mut builder);
        array::register(&mut builder);
        markup::register(&mut builder);
        crate::dialects::register_overrides(&mut builder);
        let registry = builder.build();
        trace!(definitions = registry.len(), "built operation registry");
        registry
    }

    /// Definitions registered under `name`, in registration order.
    pub fn definitions(&self, name: &str, is_window: bool) -> &[Definition] {
        self.definitions
            .get(&(name.to_lowercase(), is_window))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str, is_window: bool) -> bool {
        !self.definitions(name, is_window).is_empty()
    }

    /// Names only usable as window functions (e.g. `rsum`, `rank`).
    pub fn is_window_only(&self, name: &str) -> bool {
        self.contains(name, true) && !self.contains(name, false)
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.definitions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Pick the definition, signature and variant serving a call site.
    ///
    /// The first definition that accepts the argument types and has a variant
    /// for `dialect` wins. A call whose arguments are all NULL is ambiguous
    /// when the candidates disagree on the result type.
    pub fn resolve(
        &self,
        name: &str,
        is_window: bool,
        arg_types: &[DataType],
        dialect: Dialect,
    ) -> Result<Resolution<'_>> {
        let definitions = self.definitions(name, is_window);
        if definitions.is_empty() {
            return Err(Error::unknown_function(name));
        }

        let mut candidates = definitions.iter().filter_map(|definition| {
            let signature = definition.match_signature(arg_types)?;
            let variant = definition.match_variant(dialect)?;
            Some((definition, signature, variant))
        });

        let Some((definition, signature, variant)) = candidates.next() else {
            return Err(Error::no_matching_variant(name, arg_types, dialect.combo()));
        };
        let return_type = definition.return_type_for(signature, arg_types)?;

        let all_null = !arg_types.is_empty() && arg_types.iter().all(|t| *t == DataType::Null);
        if all_null {
            for (other, other_sig, _) in candidates {
                if other.return_type_for(other_sig, arg_types).ok() != Some(return_type) {
                    return Err(Error::AmbiguousName {
                        name: name.to_string(),
                        arg_types: arg_types.to_vec(),
                    });
                }
            }
        }

        trace!(
            function = name,
            dialect = %dialect,
            variant = %variant.dialects,
            %return_type,
            "resolved variant"
        );
        Ok(Resolution {
            definition,
            signature,
            variant,
            return_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(tag: &'static str) -> VariantBody {
        direct(move |_, _| Ok(SqlExpr::raw(tag)))
    }

    fn emitted(resolution: &Resolution<'_>) -> SqlExpr {
        let env = TranslationEnvironment::new(Dialect::Dummy, Default::default());
        match &resolution.variant.body {
            VariantBody::Direct(f) => f(&[], &env).unwrap(),
            _ => panic!("expected a direct body"),
        }
    }

    #[test]
    fn test_version_qualified_variant_wins() {
        let mut builder = RegistryBuilder::new();
        builder.add(
            Definition::new("f")
                .args(&[NUMBER])
                .variant(Dialect::ClickHouse21_8.and_above(), marker("body1"))
                .variant(DialectCombo::CLICKHOUSE, marker("body2")),
        );
        let registry = builder.build();

        let newer = registry
            .resolve("f", false, &[DataType::Integer], Dialect::ClickHouse22_10)
            .unwrap();
        assert_eq!(emitted(&newer), SqlExpr::raw("body1"));

        let older = registry
            .resolve("f", false, &[DataType::Integer], Dialect::ClickHouse19_13)
            .unwrap();
        assert_eq!(emitted(&older), SqlExpr::raw("body2"));
    }

    #[test]
    fn test_first_declared_signature_wins() {
        let mut builder = RegistryBuilder::new();
        builder
            .add(
                Definition::new("g")
                    .args(&[NUMBER])
                    .returns_type(DataType::Float)
                    .variant(DialectCombo::ANY, marker("numeric")),
            )
            .add(
                Definition::new("g")
                    .args(&[INTEGER])
                    .returns_type(DataType::Integer)
                    .variant(DialectCombo::ANY, marker("integer")),
            );
        let registry = builder.build();
        let res = registry
            .resolve("G", false, &[DataType::Integer], Dialect::Sqlite)
            .unwrap();
        assert_eq!(res.return_type, DataType::Float);
        assert_eq!(emitted(&res), SqlExpr::raw("numeric"));
    }

    #[test]
    fn test_resolution_errors() {
        let mut builder = RegistryBuilder::new();
        builder.add(
            Definition::new("h")
                .args(&[STRING])
                .variant(DialectCombo::POSTGRESQL, call("H")),
        );
        let registry = builder.build();

        let err = registry
            .resolve("nope", false, &[], Dialect::PostgreSql9_3)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownFunction { .. }));

        let err = registry
            .resolve("h", false, &[DataType::Integer], Dialect::PostgreSql9_3)
            .unwrap_err();
        assert!(matches!(err, Error::NoMatchingVariant { .. }));

        let err = registry
            .resolve("h", false, &[DataType::String], Dialect::MySql8_0_12)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Function \"h\" is not implemented for MYSQL_8_0_12 dialect and given arguments (STRING)"
        );
    }

    #[test]
    fn test_all_null_arguments_are_ambiguous_when_types_disagree() {
        let mut builder = RegistryBuilder::new();
        builder
            .add(
                Definition::new("k")
                    .args(&[STRING])
                    .returns_type(DataType::String)
                    .variant(DialectCombo::ANY, marker("s")),
            )
            .add(
                Definition::new("k")
                    .args(&[NUMBER])
                    .returns_type(DataType::Float)
                    .variant(DialectCombo::ANY, marker("n")),
            );
        let registry = builder.build();
        let err = registry
            .resolve("k", false, &[DataType::Null], Dialect::Dummy)
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousName { .. }));

        let ok = registry
            .resolve("k", false, &[DataType::ConstString], Dialect::Dummy)
            .unwrap();
        assert_eq!(ok.return_type, DataType::String);
    }

    #[test]
    fn test_requiring_one_uses_exact_kind() {
        let sig = ArgTypes::ForAllRequiringOne {
            types: MARKUP_OR_STRING,
            required: MARKUP.with_const_pairs(),
        };
        assert!(sig.matches(&[DataType::ConstString, DataType::Markup]));
        assert!(!sig.matches(&[DataType::String, DataType::ConstString]));
        assert!(!sig.matches(&[DataType::Integer, DataType::Markup]));
    }

    #[test]
    fn test_from_args_strategy() {
        let strategy = TypeStrategy::FromArgs(&[]);
        assert_eq!(
            strategy
                .resolve("x", &[DataType::ConstInteger, DataType::ConstFloat])
                .unwrap(),
            DataType::ConstFloat
        );
        let err = strategy
            .resolve("x", &[DataType::String, DataType::Integer])
            .unwrap_err();
        assert!(matches!(err, Error::ReturnTypeUndetermined { .. }));
        let err = TypeStrategy::FromArgs(&[3])
            .resolve("x", &[DataType::String])
            .unwrap_err();
        assert!(matches!(err, Error::ReturnTypeUndetermined { .. }));
    }

    #[test]
    fn test_global_registry_is_populated() {
        let registry = OperationRegistry::global();
        assert!(registry.contains("+", false));
        assert!(registry.contains("sum", false));
        assert!(registry.contains("sum", true));
        assert!(registry.is_window_only("rsum"));
        assert!(!registry.is_window_only("sum"));
    }
}
