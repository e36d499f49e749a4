//! Binary, unary and ternary operators.

use super::{
    direct, expect_args, wrapped, ArgTransformer, ArgTypes, ContextFlags, Definition,
    RegistryBuilder, TypeStrategy, VariantBody, ANY, ARRAY_FLOAT, ARRAY_INT, ARRAY_STR, BOOLEAN,
    DATE, DATELIKE, DATETIME, GENERIC_DATETIME, GEO, INTEGER, NUMBER, STRING, UUID,
};
use crate::datatype::DataType;
use crate::definitions::conversion::{cast_to_datetime, cast_to_generic_datetime};
use crate::dialect::DialectCombo;
use crate::error::{Error, Result};
use crate::sql::{BinaryOp, SqlExpr, SqlType};
use crate::translation::{TranslationCtx, TranslationEnvironment};

/// Comparison operators: formula name, SQL operator, and whether the operands need an order.
pub(crate) const COMPARISONS: [(&str, BinaryOp, bool); 6] = [
    ("==", BinaryOp::Eq, false),
    ("!=", BinaryOp::NotEq, false),
    ("<", BinaryOp::Lt, true),
    ("<=", BinaryOp::LtEq, true),
    (">", BinaryOp::Gt, true),
    (">=", BinaryOp::GtEq, true),
];

pub(crate) const NULL_COMPARISON: &str = "Invalid comparison with NULL (use `<expr> IS [NOT] NULL`)";

/// `left <op> right`
pub(crate) fn binop(op: BinaryOp) -> VariantBody {
    direct(move |args, _| {
        let [left, right] = expect_args::<2>(args)?;
        Ok(SqlExpr::binary(op, left.clone(), right.clone()))
    })
}

/// `CONST_FLOAT` when every argument is constant, else `FLOAT`.
pub(crate) fn float_result(args: &[DataType]) -> Option<DataType> {
    if !args.is_empty() && args.iter().all(|t| t.is_const()) {
        Some(DataType::ConstFloat)
    } else {
        Some(DataType::Float)
    }
}

/// Pairs of operand kinds that can be tested for equality.
fn equality_pairs() -> Vec<ArgTypes> {
    [NUMBER, STRING, DATELIKE, UUID, GEO, ARRAY_INT, ARRAY_FLOAT, ARRAY_STR]
        .into_iter()
        .map(|set| ArgTypes::Sequence(vec![set, set]))
        .collect()
}

/// Pairs of operand kinds with a total order.
fn ordering_pairs() -> Vec<ArgTypes> {
    [NUMBER, STRING, DATELIKE, UUID]
        .into_iter()
        .map(|set| ArgTypes::Sequence(vec![set, set]))
        .collect()
}

fn with_signatures(mut definition: Definition, signatures: Vec<ArgTypes>) -> Definition {
    for sig in signatures {
        definition = definition.signature(sig, None);
    }
    definition
}

/// The comparison operators for `dialects`, promoting mixed date operands with `promotion`.
pub(crate) fn comparisons(dialects: DialectCombo, promotion: DatePromotion) -> Vec<Definition> {
    COMPARISONS
        .iter()
        .map(|&(name, op, ordered)| {
            let pairs = if ordered {
                ordering_pairs()
            } else {
                equality_pairs()
            };
            with_signatures(Definition::new(name), pairs)
                .returns_type(DataType::Boolean)
                .condition()
                .forbid_null()
                .variant_with(dialects, binop(op), promotion)
        })
        .collect()
}

/// Null-safe equality `_dneq` for `dialects`, rewritten through `denullify`.
pub(crate) fn denullified_equality(dialects: DialectCombo, denullify: Denullify) -> Definition {
    with_signatures(Definition::new("_dneq"), equality_pairs())
        .returns_type(DataType::Boolean)
        .condition()
        .variant_with(
            dialects,
            direct(|args, _| match args {
                [a, b, a_null, b_null] => Ok(SqlExpr::and(
                    SqlExpr::eq(a.clone(), b.clone()),
                    SqlExpr::eq(a_null.clone(), b_null.clone()),
                )),
                [a, b] => Ok(SqlExpr::eq(a.clone(), b.clone())),
                _ => Err(Error::arity("_dneq", 4, args.len())),
            }),
            denullify,
        )
}

// ----------------------------------------------------------------------
// Argument transformers
// ----------------------------------------------------------------------

/// Promotes `DATE` operands when they meet a `DATETIME` or `GENERICDATETIME` operand.
#[derive(Clone, Copy)]
pub struct DatePromotion {
    pub to_datetime: fn(SqlExpr) -> SqlExpr,
    pub to_generic_datetime: fn(SqlExpr) -> SqlExpr,
}

impl DatePromotion {
    pub const STANDARD: DatePromotion = DatePromotion {
        to_datetime: cast_to_datetime,
        to_generic_datetime: cast_to_generic_datetime,
    };
}

impl ArgTransformer for DatePromotion {
    fn transform(
        &self,
        args: Vec<TranslationCtx>,
        _env: &TranslationEnvironment,
    ) -> Result<Vec<TranslationCtx>> {
        let kinds: Vec<DataType> = args.iter().map(|a| a.data_type.non_const()).collect();
        if !kinds.contains(&DataType::Date) {
            return Ok(args);
        }
        let (target, promote) = if kinds
            .iter()
            .any(|k| matches!(k, DataType::Datetime | DataType::DatetimeTz))
        {
            (DataType::Datetime, self.to_datetime)
        } else if kinds.contains(&DataType::GenericDatetime) {
            (DataType::GenericDatetime, self.to_generic_datetime)
        } else {
            return Ok(args);
        };

        Ok(args
            .into_iter()
            .map(|mut arg| {
                if arg.data_type.non_const() == DataType::Date {
                    arg.expression = promote(arg.expression);
                    arg.data_type = target;
                }
                arg
            })
            .collect())
    }
}

/// Per-kind placeholders standing in for NULL in null-safe equality.
#[derive(Clone, Copy)]
pub struct NullSentinels {
    /// Placeholder for operands of a kind, or `None` when the kind has none
    pub value: fn(DataType) -> Option<SqlExpr>,
    /// Converts an operand into the kind its placeholder lives in
    pub prepare: fn(SqlExpr, DataType) -> SqlExpr,
}

impl NullSentinels {
    pub const STANDARD: NullSentinels = NullSentinels {
        value: standard_sentinel,
        prepare: standard_prepare,
    };
}

fn standard_sentinel(kind: DataType) -> Option<SqlExpr> {
    match kind {
        DataType::String
        | DataType::Geopoint
        | DataType::Geopolygon
        | DataType::Markup
        | DataType::Uuid => Some(SqlExpr::string("-")),
        t if t.is_temporal() => Some(SqlExpr::string("-")),
        DataType::Boolean | DataType::Integer | DataType::Float => Some(SqlExpr::integer(0)),
        DataType::ArrayInt | DataType::ArrayFloat => Some(SqlExpr::Array {
            items: vec![SqlExpr::integer(0)],
        }),
        DataType::ArrayStr => Some(SqlExpr::Array {
            items: vec![SqlExpr::string("__null_value__")],
        }),
        _ => None,
    }
}

fn standard_prepare(expr: SqlExpr, kind: DataType) -> SqlExpr {
    if kind.is_temporal() || kind == DataType::Uuid {
        SqlExpr::cast(expr, SqlType::Text)
    } else {
        expr
    }
}

/// Expands `a, b` into `coalesce(a, S), coalesce(b, S), isnull(a), isnull(b)`.
///
/// Kinds without a sentinel keep their two operands, which degrades to plain `=`.
#[derive(Clone, Copy)]
pub struct Denullify {
    pub sentinels: NullSentinels,
    pub coalesce: fn(SqlExpr, SqlExpr) -> SqlExpr,
    pub is_null: fn(SqlExpr) -> SqlExpr,
}

impl Denullify {
    pub const STANDARD: Denullify = Denullify {
        sentinels: NullSentinels::STANDARD,
        coalesce: standard_coalesce,
        is_null: SqlExpr::is_null,
    };
}

fn standard_coalesce(value: SqlExpr, fallback: SqlExpr) -> SqlExpr {
    SqlExpr::func("COALESCE", vec![value, fallback])
}

impl ArgTransformer for Denullify {
    fn transform(
        &self,
        args: Vec<TranslationCtx>,
        _env: &TranslationEnvironment,
    ) -> Result<Vec<TranslationCtx>> {
        let [a, b]: [TranslationCtx; 2] = args
            .try_into()
            .map_err(|args: Vec<TranslationCtx>| Error::arity("_dneq", 2, args.len()))?;
        let kind = DataType::common_type(&[a.data_type, b.data_type])
            .unwrap_or(DataType::Unsupported)
            .non_const();
        let kind = if kind == DataType::Null {
            DataType::Integer
        } else {
            kind
        };
        let Some(sentinel) = (self.sentinels.value)(kind) else {
            return Ok(vec![a, b]);
        };

        let prepare = self.sentinels.prepare;
        let coalesced = |ctx: &TranslationCtx| {
            TranslationCtx::new(
                (self.coalesce)(prepare(ctx.expression.clone(), kind), sentinel.clone()),
                kind,
            )
        };
        let null_flag = |ctx: &TranslationCtx| {
            TranslationCtx::new((self.is_null)(ctx.expression.clone()), DataType::Boolean)
        };
        Ok(vec![coalesced(&a), coalesced(&b), null_flag(&a), null_flag(&b)])
    }
}

// ----------------------------------------------------------------------
// Operator bodies
// ----------------------------------------------------------------------

fn in_list(negated: bool) -> VariantBody {
    direct(move |args, _| {
        let [expr, list] = expect_args::<2>(args)?;
        let items = match list {
            SqlExpr::List { items } => items.clone(),
            other => vec![other.clone()],
        };
        let (nulls, values): (Vec<SqlExpr>, Vec<SqlExpr>) =
            items.into_iter().partition(SqlExpr::is_null_literal);

        let membership = (!values.is_empty()).then(|| SqlExpr::InList {
            expr: Box::new(expr.clone()),
            list: values,
            negated,
        });
        let null_check = (!nulls.is_empty()).then(|| {
            if negated {
                SqlExpr::is_not_null(expr.clone())
            } else {
                SqlExpr::is_null(expr.clone())
            }
        });
        Ok(match (membership, null_check) {
            (Some(m), Some(n)) if negated => SqlExpr::and(m, n),
            (Some(m), Some(n)) => SqlExpr::or(m, n),
            (Some(m), None) => m,
            (None, Some(n)) => n,
            (None, None) => SqlExpr::boolean(negated),
        })
    })
}

fn like(negated: bool) -> VariantBody {
    direct(move |args, _| {
        let [expr, pattern] = expect_args::<2>(args)?;
        Ok(SqlExpr::Like {
            expr: Box::new(expr.clone()),
            pattern: Box::new(pattern.clone()),
            negated,
        })
    })
}

fn between(negated: bool) -> VariantBody {
    direct(move |args, _| {
        let [expr, low, high] = expect_args::<3>(args)?;
        Ok(SqlExpr::Between {
            expr: Box::new(expr.clone()),
            low: Box::new(low.clone()),
            high: Box::new(high.clone()),
            negated,
        })
    })
}

fn is_null(negated: bool) -> VariantBody {
    direct(move |args, _| {
        let [expr] = expect_args::<1>(args)?;
        Ok(if negated {
            SqlExpr::is_not_null(expr.clone())
        } else {
            SqlExpr::is_null(expr.clone())
        })
    })
}

/// `/` always yields a float; integer operands are widened first.
fn divide() -> VariantBody {
    wrapped(|args, _| {
        let [left, right] = args else {
            return Err(Error::arity("/", 2, args.len()));
        };
        let integral = |ctx: &TranslationCtx| {
            matches!(ctx.data_type.non_const(), DataType::Integer | DataType::Boolean)
        };
        let numerator = if integral(left) && integral(right) {
            SqlExpr::cast(left.expression.clone(), SqlType::Float)
        } else {
            left.expression.clone()
        };
        Ok(SqlExpr::binary(BinaryOp::Div, numerator, right.expression.clone()))
    })
}

fn interval_days(amount: SqlExpr) -> SqlExpr {
    SqlExpr::binary(BinaryOp::Mul, amount, SqlExpr::raw("INTERVAL '1 day'"))
}

pub(crate) fn register(builder: &mut RegistryBuilder) {
    let any = DialectCombo::ANY;

    // Arithmetic
    builder
        .add(
            Definition::new("+")
                .args(&[NUMBER, NUMBER])
                .variant(any, binop(BinaryOp::Add)),
        )
        .add(
            Definition::new("+")
                .args(&[STRING, STRING])
                .variant(
                    any,
                    direct(|args, _| Ok(SqlExpr::concat(args.to_vec()))),
                ),
        )
        .add(
            Definition::new("+")
                .args_returning(&[DATE, NUMBER], TypeStrategy::FromArgs(&[0]))
                .args_returning(&[GENERIC_DATETIME, NUMBER], TypeStrategy::FromArgs(&[0]))
                .args_returning(&[DATETIME, NUMBER], TypeStrategy::FromArgs(&[0]))
                .params_from(0)
                .variant(
                    any,
                    direct(|args, _| {
                        let [date, days] = expect_args::<2>(args)?;
                        Ok(SqlExpr::binary(
                            BinaryOp::Add,
                            date.clone(),
                            interval_days(days.clone()),
                        ))
                    }),
                ),
        )
        .add(
            Definition::new("+")
                .args(&[ARRAY_INT, ARRAY_INT])
                .args(&[ARRAY_FLOAT, ARRAY_FLOAT])
                .args(&[ARRAY_STR, ARRAY_STR])
                .variant(any, super::call("ARRAY_CAT")),
        );

    builder
        .add(
            Definition::new("-")
                .args(&[NUMBER, NUMBER])
                .variant(any, binop(BinaryOp::Sub)),
        )
        .add(
            Definition::new("-")
                .args_returning(&[DATE, NUMBER], TypeStrategy::FromArgs(&[0]))
                .args_returning(&[GENERIC_DATETIME, NUMBER], TypeStrategy::FromArgs(&[0]))
                .args_returning(&[DATETIME, NUMBER], TypeStrategy::FromArgs(&[0]))
                .params_from(0)
                .variant(
                    any,
                    direct(|args, _| {
                        let [date, days] = expect_args::<2>(args)?;
                        Ok(SqlExpr::binary(
                            BinaryOp::Sub,
                            date.clone(),
                            interval_days(days.clone()),
                        ))
                    }),
                ),
        )
        .add(
            Definition::new("-")
                .args(&[DATE, DATE])
                .returns_type(DataType::Integer)
                .variant(any, binop(BinaryOp::Sub)),
        )
        .add(
            Definition::new("-")
                .args(&[DATETIME, DATETIME])
                .args(&[GENERIC_DATETIME, GENERIC_DATETIME])
                .returns_type(DataType::Float)
                .variant(
                    any,
                    direct(|args, _| {
                        let [left, right] = expect_args::<2>(args)?;
                        let seconds = SqlExpr::extract(
                            "EPOCH",
                            SqlExpr::binary(BinaryOp::Sub, left.clone(), right.clone()),
                        );
                        Ok(SqlExpr::binary(BinaryOp::Div, seconds, SqlExpr::integer(86400)))
                    }),
                ),
        );

    builder
        .add(
            Definition::new("*")
                .args(&[NUMBER, NUMBER])
                .variant(any, binop(BinaryOp::Mul)),
        )
        .add(
            Definition::new("*")
                .args_returning(&[STRING, INTEGER], TypeStrategy::FromArgs(&[0]))
                .variant(any, super::call("REPEAT")),
        )
        .add(
            Definition::new("*")
                .args_returning(&[INTEGER, STRING], TypeStrategy::FromArgs(&[1]))
                .variant(
                    any,
                    direct(|args, _| {
                        let [count, text] = expect_args::<2>(args)?;
                        Ok(SqlExpr::func("REPEAT", vec![text.clone(), count.clone()]))
                    }),
                ),
        )
        .add(
            Definition::new("/")
                .args(&[NUMBER, NUMBER])
                .returns(TypeStrategy::Custom(float_result))
                .variant(any, divide()),
        )
        .add(
            Definition::new("%")
                .args(&[INTEGER, INTEGER])
                .variant(any, binop(BinaryOp::Mod)),
        )
        .add(
            Definition::new("%")
                .args(&[NUMBER, NUMBER])
                .returns(TypeStrategy::Custom(float_result))
                .variant(any, super::call("MOD")),
        )
        .add(
            Definition::new("^")
                .args(&[NUMBER, NUMBER])
                .returns(TypeStrategy::Custom(float_result))
                .variant(any, super::call("POWER")),
        );

    // Comparison
    for definition in comparisons(any, DatePromotion::STANDARD) {
        builder.add(definition);
    }
    for (name, op) in [("_==", BinaryOp::Eq), ("_!=", BinaryOp::NotEq)] {
        builder.add(
            with_signatures(Definition::new(name), equality_pairs())
                .returns_type(DataType::Boolean)
                .condition()
                .variant(any, binop(op)),
        );
    }
    builder.add(
        with_signatures(Definition::new("_dneq"), equality_pairs())
            .returns_type(DataType::Boolean)
            .condition()
            .variant(
                DialectCombo::DUMMY | DialectCombo::SQLITE | DialectCombo::NO_BOOLEAN,
                direct(|args, _| {
                    let [a, b] = expect_args::<2>(args)?;
                    Ok(SqlExpr::or(
                        SqlExpr::eq(a.clone(), b.clone()),
                        SqlExpr::and(SqlExpr::is_null(a.clone()), SqlExpr::is_null(b.clone())),
                    ))
                }),
            ),
    );
    builder.add(denullified_equality(any, Denullify::STANDARD));

    builder
        .add(
            Definition::new("like")
                .args(&[STRING, STRING])
                .returns_type(DataType::Boolean)
                .condition()
                .variant(any, like(false)),
        )
        .add(
            Definition::new("notlike")
                .args(&[STRING, STRING])
                .returns_type(DataType::Boolean)
                .condition()
                .variant(any, like(true)),
        );

    // Logic
    for (name, op) in [("and", BinaryOp::And), ("or", BinaryOp::Or)] {
        builder.add(
            Definition::new(name)
                .args(&[BOOLEAN, BOOLEAN])
                .returns_type(DataType::Boolean)
                .arg_flags(&[ContextFlags::REQ_CONDITION, ContextFlags::REQ_CONDITION])
                .condition()
                .variant(any, binop(op)),
        );
    }
    builder
        .add(
            Definition::new("in")
                .args(&[ANY, ANY])
                .returns_type(DataType::Boolean)
                .condition()
                .variant(any, in_list(false)),
        )
        .add(
            Definition::new("notin")
                .args(&[ANY, ANY])
                .returns_type(DataType::Boolean)
                .condition()
                .variant(any, in_list(true)),
        );

    // Unary
    builder
        .add(
            Definition::new("not")
                .args(&[BOOLEAN])
                .returns_type(DataType::Boolean)
                .arg_flags(&[ContextFlags::REQ_CONDITION])
                .condition()
                .variant(
                    any,
                    direct(|args, _| {
                        let [operand] = expect_args::<1>(args)?;
                        Ok(SqlExpr::not(operand.clone()))
                    }),
                ),
        )
        .add(
            Definition::new("neg")
                .args(&[NUMBER])
                .variant(
                    any,
                    direct(|args, _| {
                        let [operand] = expect_args::<1>(args)?;
                        Ok(SqlExpr::neg(operand.clone()))
                    }),
                ),
        )
        .add(
            Definition::new("isnull")
                .args(&[ANY])
                .returns_type(DataType::Boolean)
                .condition()
                .variant(any, is_null(false)),
        )
        .add(
            Definition::new("isnotnull")
                .args(&[ANY])
                .returns_type(DataType::Boolean)
                .condition()
                .variant(any, is_null(true)),
        );

    // Ternary
    for (name, negated) in [("between", false), ("notbetween", true)] {
        let mut definition = Definition::new(name)
            .returns_type(DataType::Boolean)
            .condition()
            .forbid_null();
        for set in [NUMBER, STRING, DATELIKE] {
            definition = definition.args(&[set, set, set]);
        }
        builder.add(definition.variant(any, between(negated)));
    }
}
