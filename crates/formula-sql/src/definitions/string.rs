//! String functions.

use super::{
    call, direct, expect_args, wrapped, Definition, RegistryBuilder, TypeStrategy, VariantBody,
    ANY, INTEGER, STRING,
};
use crate::datatype::DataType;
use crate::dialect::DialectCombo;
use crate::error::Error;
use crate::sql::{SqlExpr, SqlType};

/// Escape `LIKE` wildcards in a literal pattern fragment.
pub(crate) fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `value LIKE <prefix> needle <suffix>`, folded into one pattern when `needle` is a literal.
fn like_pattern(prefix: &'static str, suffix: &'static str) -> VariantBody {
    direct(move |args, _| {
        let [value, needle] = expect_args::<2>(args)?;
        let pattern = match needle.as_str_literal() {
            Some(text) => SqlExpr::string(format!("{prefix}{}{suffix}", escape_like(text))),
            None => {
                let mut parts = Vec::with_capacity(3);
                if !prefix.is_empty() {
                    parts.push(SqlExpr::string(prefix));
                }
                parts.push(needle.clone());
                if !suffix.is_empty() {
                    parts.push(SqlExpr::string(suffix));
                }
                SqlExpr::concat(parts)
            }
        };
        Ok(SqlExpr::Like {
            expr: Box::new(value.clone()),
            pattern: Box::new(pattern),
            negated: false,
        })
    })
}

/// String-typed result that stays constant when every argument is.
fn string_result(args: &[DataType]) -> Option<DataType> {
    if !args.is_empty() && args.iter().all(|t| t.is_const()) {
        Some(DataType::ConstString)
    } else {
        Some(DataType::String)
    }
}

pub(crate) fn register(builder: &mut RegistryBuilder) {
    let any = DialectCombo::ANY;

    builder.add(
        Definition::new("len")
            .args(&[STRING])
            .returns_type(DataType::Integer)
            .variant(any, call("LENGTH")),
    );

    for (name, sql) in [
        ("lower", "LOWER"),
        ("upper", "UPPER"),
        ("trim", "TRIM"),
        ("ltrim", "LTRIM"),
        ("rtrim", "RTRIM"),
    ] {
        builder.add(
            Definition::new(name)
                .args(&[STRING])
                .returns(TypeStrategy::FromArgs(&[0]))
                .variant(any, call(sql)),
        );
    }

    builder.add(
        Definition::new("concat")
            .variadic(ANY)
            .returns(TypeStrategy::Custom(string_result))
            .variant(
                any,
                wrapped(|args, _| {
                    if args.is_empty() {
                        return Err(Error::arity("concat", 1, 0));
                    }
                    let parts = args
                        .iter()
                        .map(|arg| match arg.data_type.non_const() {
                            DataType::String | DataType::Null => arg.expression.clone(),
                            _ => SqlExpr::cast(arg.expression.clone(), SqlType::Text),
                        })
                        .collect();
                    Ok(SqlExpr::concat(parts))
                }),
            ),
    );

    for (name, prefix, suffix) in [
        ("contains", "%", "%"),
        ("startswith", "", "%"),
        ("endswith", "%", ""),
    ] {
        builder.add(
            Definition::new(name)
                .args(&[STRING, STRING])
                .returns_type(DataType::Boolean)
                .condition()
                .variant(any, like_pattern(prefix, suffix)),
        );
    }

    builder
        .add(
            Definition::new("left")
                .args(&[STRING, INTEGER])
                .returns(TypeStrategy::FromArgs(&[0]))
                .variant(any, call("LEFT")),
        )
        .add(
            Definition::new("right")
                .args(&[STRING, INTEGER])
                .returns(TypeStrategy::FromArgs(&[0]))
                .variant(any, call("RIGHT")),
        )
        .add(
            Definition::new("substr")
                .args(&[STRING, INTEGER])
                .args(&[STRING, INTEGER, INTEGER])
                .returns(TypeStrategy::FromArgs(&[0]))
                .variant(any, call("SUBSTRING")),
        )
        .add(
            Definition::new("replace")
                .args(&[STRING, STRING, STRING])
                .returns(TypeStrategy::FromArgs(&[0]))
                .variant(any, call("REPLACE")),
        )
        .add(
            Definition::new("find")
                .args(&[STRING, STRING])
                .returns_type(DataType::Integer)
                .variant(any, call("STRPOS")),
        );

    builder.add(
        Definition::new("space")
            .args(&[INTEGER])
            .returns_type(DataType::String)
            .variant(
                any,
                direct(|args, _| {
                    let [count] = expect_args::<1>(args)?;
                    Ok(SqlExpr::func(
                        "REPEAT",
                        vec![SqlExpr::string(" "), count.clone()],
                    ))
                }),
            ),
    );

    builder.add(
        Definition::new("ascii")
            .args(&[STRING])
            .returns_type(DataType::Integer)
            .variant(any, call("ASCII")),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
