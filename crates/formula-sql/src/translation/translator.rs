use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::trace;

use super::{normalize_window_calls, TranslationCtx, TranslationEnvironment, WindowClause};
use crate::datatype::{DataType, DataTypeParams};
use crate::definitions::{ContextFlags, OperationRegistry, VariantBody, NULL_COMPARISON};
use crate::error::{Error, Result};
use crate::nodes::{FormulaItem, LiteralValue, NodeRef, WindowFuncCall};
use crate::sql::{OrderByItem, SqlExpr, SqlLiteral};

/// Progress of one compilation, kept for diagnostics when it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStage {
    ResolvingTypes,
    SelectingVariants,
    Emitting,
    Done,
}

/// Compiles one formula tree for one dialect.
pub struct Translator<'a> {
    registry: &'a OperationRegistry,
    env: TranslationEnvironment,
    field_types: &'a HashMap<String, DataType>,
    stage: CompileStage,
}

impl<'a> Translator<'a> {
    pub fn new(
        registry: &'a OperationRegistry,
        env: TranslationEnvironment,
        field_types: &'a HashMap<String, DataType>,
    ) -> Self {
        Self {
            registry,
            env,
            field_types,
            stage: CompileStage::ResolvingTypes,
        }
    }

    /// The stage reached; after an error, the stage that failed.
    pub fn stage(&self) -> CompileStage {
        self.stage
    }

    pub fn run(&mut self, ast: &NodeRef) -> Result<TranslationCtx> {
        self.enter(CompileStage::ResolvingTypes);
        let ast = normalize_window_calls(ast, self.registry)?;
        let ctx = self.translate(&ast)?;
        self.enter(CompileStage::Done);
        Ok(ctx)
    }

    fn enter(&mut self, stage: CompileStage) {
        if self.stage != stage {
            trace!(from = ?self.stage, to = ?stage, "compile stage");
            self.stage = stage;
        }
    }

    fn translate(&mut self, node: &NodeRef) -> Result<TranslationCtx> {
        match node.as_ref() {
            FormulaItem::Formula(f) => self.translate(&f.expr),
            FormulaItem::ParenthesizedExpr(w) => self.translate(&w.expr),
            FormulaItem::Field(field) => self.field(&field.name, node),
            FormulaItem::Literal(lit) => Ok(literal(&lit.value)?.with_node(Arc::clone(node))),
            FormulaItem::Null(_) => {
                Ok(TranslationCtx::new(SqlExpr::Null, DataType::Null).with_node(Arc::clone(node)))
            }
            FormulaItem::ExpressionList(list) => {
                let items = list
                    .items
                    .iter()
                    .map(|item| self.translate(item).map(|ctx| self.as_value(ctx)))
                    .collect::<Result<Vec<_>>>()?;
                let types: Vec<DataType> = items.iter().map(|c| c.data_type).collect();
                let data_type = DataType::common_type(&types).unwrap_or(DataType::Unsupported);
                let expression = SqlExpr::List {
                    items: items.into_iter().map(|c| c.expression).collect(),
                };
                Ok(TranslationCtx::new(expression, data_type).with_node(Arc::clone(node)))
            }
            FormulaItem::FuncCall(call) => self.operation(&call.name, false, &call.args, node, None),
            FormulaItem::Unary(op) | FormulaItem::Binary(op) | FormulaItem::Ternary(op) => {
                self.operation(&op.name, false, &op.operands, node, None)
            }
            FormulaItem::WindowFuncCall(call) => {
                let clause = self.window_clause(call)?;
                self.operation(&call.name, true, &call.args, node, Some(&clause))
            }
            FormulaItem::IfBlock(block) => self.if_block(&block.if_list, &block.else_expr, node),
            FormulaItem::CaseBlock(block) => {
                self.case_block(&block.case_expr, &block.when_list, &block.else_expr, node)
            }
            other => Err(Error::NotAnExpression {
                kind: other.kind_name(),
            }),
        }
    }

    fn field(&self, name: &str, node: &NodeRef) -> Result<TranslationCtx> {
        let Some(data_type) = self.field_types.get(name).copied() else {
            if self.env.options.restrict_fields {
                return Err(Error::unknown_field(name));
            }
            trace!(field = name, "unknown field compiled as NULL");
            return Ok(TranslationCtx::new(SqlExpr::Null, DataType::Unsupported)
                .with_node(Arc::clone(node)));
        };
        let path = self
            .env
            .options
            .field_names
            .get(name)
            .cloned()
            .unwrap_or_else(|| vec![name.to_string()]);
        Ok(TranslationCtx::new(SqlExpr::column(path), data_type).with_node(Arc::clone(node)))
    }

    /// Compile a call through the registry.
    fn operation(
        &mut self,
        name: &str,
        is_window: bool,
        arg_nodes: &[NodeRef],
        node: &NodeRef,
        clause: Option<&WindowClause>,
    ) -> Result<TranslationCtx> {
        let args = arg_nodes
            .iter()
            .map(|arg| self.translate(arg))
            .collect::<Result<Vec<_>>>()?;
        let arg_types: Vec<DataType> = args.iter().map(|a| a.data_type).collect();

        self.enter(CompileStage::SelectingVariants);
        let registry = self.registry;
        let resolution = match registry.resolve(name, is_window, &arg_types, self.env.dialect) {
            Ok(resolution) => resolution,
            Err(Error::UnknownFunction { .. }) if !self.env.options.restrict_functions => {
                trace!(function = name, "unknown function passed through");
                let args = args.into_iter().map(|a| self.as_value(a).expression).collect();
                self.enter(CompileStage::ResolvingTypes);
                return Ok(
                    TranslationCtx::new(SqlExpr::func(name.to_uppercase(), args), DataType::Unsupported)
                        .with_node(Arc::clone(node)),
                );
            }
            Err(err) => return Err(err),
        };
        let definition = resolution.definition;
        if definition.forbid_null && arg_types.contains(&DataType::Null) {
            return Err(Error::invalid_argument(name, NULL_COMPARISON));
        }

        let params = definition.return_params.resolve(&args);
        let mut args = match &resolution.variant.arg_transformer {
            Some(transformer) => {
                trace!(function = name, "running argument transformer");
                transformer.transform(args, &self.env)?
            }
            None => args,
        };
        if self.env.lacks_boolean() {
            args = args
                .into_iter()
                .enumerate()
                .map(|(i, arg)| {
                    if definition.arg_flag(i).contains(ContextFlags::REQ_CONDITION) {
                        self.as_condition(arg)
                    } else {
                        self.as_value(arg)
                    }
                })
                .collect();
        }

        self.enter(CompileStage::Emitting);
        let expression = match &resolution.variant.body {
            VariantBody::Direct(body) => body(&expressions(&args), &self.env)?,
            VariantBody::Wrapped(body) => body(&args, &self.env)?,
            VariantBody::Window(body) => {
                let default_clause = WindowClause::default();
                let clause = clause.unwrap_or(&default_clause);
                body(&expressions(&args), clause, &self.env)?
            }
        };
        self.enter(CompileStage::ResolvingTypes);

        Ok(TranslationCtx::new(expression, resolution.return_type)
            .with_params(params)
            .with_flags(definition.return_flags)
            .with_node(Arc::clone(node)))
    }

    /// Compile the grouping, ignored dimensions and ordering of a window call.
    fn window_clause(&mut self, call: &WindowFuncCall) -> Result<WindowClause> {
        let ignored: BTreeSet<&str> = match call.ignore_dimensions.as_ref() {
            FormulaItem::IgnoreDimensions(ignore) => field_names(&call.name, &ignore.dims)?,
            _ => BTreeSet::new(),
        };

        let dims: Vec<NodeRef> = match call.grouping.as_ref() {
            FormulaItem::WindowGroupingTotal(_) => Vec::new(),
            FormulaItem::WindowGroupingWithin(grouping) => grouping
                .dims
                .iter()
                .filter(|dim| !matches!(dim.as_ref(), FormulaItem::Field(f) if ignored.contains(f.name.as_str())))
                .cloned()
                .collect(),
            FormulaItem::WindowGroupingAmong(grouping) => {
                let among = field_names(&call.name, &grouping.dims)?;
                self.env
                    .options
                    .dimensions
                    .iter()
                    .filter(|dim| !among.contains(dim.as_str()) && !ignored.contains(dim.as_str()))
                    .map(FormulaItem::field)
                    .collect()
            }
            other => {
                return Err(Error::invalid_argument(
                    call.name.as_str(),
                    format!("{} is not a window grouping", other.kind_name()),
                ))
            }
        };
        let partition_by = dims
            .iter()
            .map(|dim| self.translate(dim).map(|ctx| self.as_value(ctx).expression))
            .collect::<Result<Vec<_>>>()?;

        let mut order_by = Vec::new();
        if let Some(ordering) = &call.ordering {
            let FormulaItem::Ordering(ordering) = ordering.as_ref() else {
                return Err(Error::invalid_argument(
                    call.name.as_str(),
                    format!("{} is not an ordering", ordering.kind_name()),
                ));
            };
            for item in &ordering.items {
                let (expr, desc) = match item.as_ref() {
                    FormulaItem::OrderAscending(w) => (&w.expr, false),
                    FormulaItem::OrderDescending(w) => (&w.expr, true),
                    _ => (item, false),
                };
                let ctx = self.translate(expr)?;
                order_by.push(OrderByItem {
                    expr: self.as_value(ctx).expression,
                    desc,
                });
            }
        }

        Ok(WindowClause {
            partition_by,
            order_by,
        })
    }

    fn if_block(
        &mut self,
        parts: &[NodeRef],
        else_expr: &NodeRef,
        node: &NodeRef,
    ) -> Result<TranslationCtx> {
        let mut whens = Vec::with_capacity(parts.len());
        let mut types = Vec::with_capacity(parts.len() + 1);
        for part in parts {
            let FormulaItem::IfPart(part) = part.as_ref() else {
                return Err(Error::invalid_argument("if", format!("unexpected {}", part.kind_name())));
            };
            let cond = self.translate(&part.cond)?;
            if !cond.data_type.casts_to(DataType::Boolean) {
                return Err(Error::invalid_argument(
                    "if",
                    format!("condition must be BOOLEAN, got {}", cond.data_type),
                ));
            }
            let value = self.translate(&part.expr)?;
            types.push(value.data_type);
            whens.push((self.as_condition(cond).expression, self.as_value(value).expression));
        }

        let otherwise = self.translate(else_expr)?;
        types.push(otherwise.data_type);
        let data_type =
            DataType::common_type(&types).ok_or_else(|| Error::BranchTypeMismatch { types })?;
        let else_expr = (otherwise.data_type != DataType::Null)
            .then(|| Box::new(self.as_value(otherwise).expression));

        Ok(TranslationCtx::new(
            SqlExpr::Case {
                operand: None,
                whens,
                else_expr,
            },
            data_type,
        )
        .with_node(Arc::clone(node)))
    }

    fn case_block(
        &mut self,
        case_expr: &NodeRef,
        parts: &[NodeRef],
        else_expr: &NodeRef,
        node: &NodeRef,
    ) -> Result<TranslationCtx> {
        let subject = self.translate(case_expr)?;
        let mut compared = vec![subject.data_type];
        let mut types = Vec::with_capacity(parts.len() + 1);
        let mut whens = Vec::with_capacity(parts.len());
        for part in parts {
            let FormulaItem::WhenPart(part) = part.as_ref() else {
                return Err(Error::invalid_argument("case", format!("unexpected {}", part.kind_name())));
            };
            let value = self.translate(&part.value)?;
            let result = self.translate(&part.expr)?;
            compared.push(value.data_type);
            types.push(result.data_type);
            whens.push((self.as_value(value).expression, self.as_value(result).expression));
        }
        if DataType::common_type(&compared).is_none() {
            return Err(Error::BranchTypeMismatch { types: compared });
        }

        let otherwise = self.translate(else_expr)?;
        types.push(otherwise.data_type);
        let data_type =
            DataType::common_type(&types).ok_or_else(|| Error::BranchTypeMismatch { types })?;
        let else_expr = (otherwise.data_type != DataType::Null)
            .then(|| Box::new(self.as_value(otherwise).expression));

        Ok(TranslationCtx::new(
            SqlExpr::Case {
                operand: Some(Box::new(self.as_value(subject).expression)),
                whens,
                else_expr,
            },
            data_type,
        )
        .with_node(Arc::clone(node)))
    }

    /// In a dialect without booleans, turn a plain value into `value = 1`.
    fn as_condition(&self, mut ctx: TranslationCtx) -> TranslationCtx {
        if self.env.lacks_boolean() && !ctx.is_condition() {
            ctx.expression = SqlExpr::eq(ctx.expression, SqlExpr::integer(1));
            ctx.flags |= ContextFlags::IS_CONDITION;
        }
        ctx
    }

    /// In a dialect without booleans, turn a predicate into `CASE WHEN .. THEN 1 ELSE 0 END`.
    fn as_value(&self, mut ctx: TranslationCtx) -> TranslationCtx {
        if self.env.lacks_boolean() && ctx.is_condition() {
            ctx.expression =
                SqlExpr::case_when(ctx.expression, SqlExpr::integer(1), SqlExpr::integer(0));
            ctx.flags.remove(ContextFlags::IS_CONDITION);
        }
        ctx
    }
}

fn expressions(args: &[TranslationCtx]) -> Vec<SqlExpr> {
    args.iter().map(|a| a.expression.clone()).collect()
}

/// Names of the field nodes among `dims`; other node kinds are rejected.
fn field_names<'n>(function: &str, dims: &'n [NodeRef]) -> Result<BTreeSet<&'n str>> {
    dims.iter()
        .map(|dim| match dim.as_ref() {
            FormulaItem::Field(field) => Ok(field.name.as_str()),
            other => Err(Error::invalid_argument(
                function,
                format!("window dimensions must be fields, got {}", other.kind_name()),
            )),
        })
        .collect()
}

fn finite(value: f64) -> Result<SqlExpr> {
    if value.is_finite() {
        Ok(SqlExpr::float(value))
    } else {
        Err(Error::invalid_argument(
            "literal",
            format!("float literal must be finite, got {value}"),
        ))
    }
}

fn literal(value: &LiteralValue) -> Result<TranslationCtx> {
    let (expression, data_type) = match value {
        LiteralValue::Integer(v) => (SqlExpr::integer(*v), DataType::ConstInteger),
        LiteralValue::Float(v) => (finite(*v)?, DataType::ConstFloat),
        LiteralValue::Boolean(v) => (SqlExpr::boolean(*v), DataType::ConstBoolean),
        LiteralValue::String(v) => (SqlExpr::string(v.clone()), DataType::ConstString),
        LiteralValue::Date(v) => (SqlExpr::literal(SqlLiteral::Date(*v)), DataType::ConstDate),
        LiteralValue::Datetime(v) => {
            (SqlExpr::literal(SqlLiteral::Datetime(*v)), DataType::ConstDatetime)
        }
        LiteralValue::DatetimeTz { value, timezone } => {
            return Ok(TranslationCtx::new(
                SqlExpr::literal(SqlLiteral::Datetime(*value)),
                DataType::ConstDatetimeTz,
            )
            .with_params(DataTypeParams::with_timezone(timezone.clone())));
        }
        LiteralValue::GenericDatetime(v) => (
            SqlExpr::literal(SqlLiteral::GenericDatetime(*v)),
            DataType::ConstGenericDatetime,
        ),
        LiteralValue::Geopoint(v) => (SqlExpr::string(v.clone()), DataType::ConstGeopoint),
        LiteralValue::Geopolygon(v) => (SqlExpr::string(v.clone()), DataType::ConstGeopolygon),
        LiteralValue::Uuid(v) => (SqlExpr::literal(SqlLiteral::Uuid(*v)), DataType::ConstUuid),
        LiteralValue::ArrayInt(items) => (
            SqlExpr::Array {
                items: items.iter().map(|v| SqlExpr::integer(*v)).collect(),
            },
            DataType::ConstArrayInt,
        ),
        LiteralValue::ArrayFloat(items) => (
            SqlExpr::Array {
                items: items.iter().map(|v| finite(*v)).collect::<Result<_>>()?,
            },
            DataType::ConstArrayFloat,
        ),
        LiteralValue::ArrayStr(items) => (
            SqlExpr::Array {
                items: items.iter().map(|v| SqlExpr::string(v.clone())).collect(),
            },
            DataType::ConstArrayStr,
        ),
        LiteralValue::TreeStr(items) => (
            SqlExpr::Array {
                items: items.iter().map(|v| SqlExpr::string(v.clone())).collect(),
            },
            DataType::ConstTreeStr,
        ),
    };
    Ok(TranslationCtx::new(expression, data_type))
}
