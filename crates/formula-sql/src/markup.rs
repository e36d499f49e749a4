//! Rich-text markup encoding.
//!
//! Markup values travel through SQL as plain strings in a small
//! s-expression syntax: `(b "bold text")`, `(c (i "a") (b "b"))`. Quotes
//! inside text are doubled. A [`MarkupCall`] is built from compiled
//! arguments, folded so that adjacent constant text becomes a single
//! literal, and only then lowered to SQL concatenation.

use crate::datatype::DataType;
use crate::error::{Error, Result};
use crate::sql::{SqlExpr, SqlType};
use crate::translation::TranslationCtx;

const LPAR: &str = "(";
const RPAR: &str = ")";
const SEP: &str = " ";
const QUOTE: &str = "\"";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkupTag {
    Bold,
    Italic,
    Url,
    Color,
    Size,
    Break,
    Image,
    Concat,
}

impl MarkupTag {
    /// Tag spelling inside the encoding.
    pub const fn code(self) -> &'static str {
        match self {
            MarkupTag::Bold => "b",
            MarkupTag::Italic => "i",
            MarkupTag::Url => "a",
            MarkupTag::Color => "cl",
            MarkupTag::Size => "sz",
            MarkupTag::Break => "br",
            MarkupTag::Image => "img",
            MarkupTag::Concat => "c",
        }
    }

    /// The formula function producing this tag.
    pub const fn function_name(self) -> &'static str {
        match self {
            MarkupTag::Bold => "bold",
            MarkupTag::Italic => "italic",
            MarkupTag::Url => "url",
            MarkupTag::Color => "color",
            MarkupTag::Size => "size",
            MarkupTag::Break => "br",
            MarkupTag::Image => "image",
            MarkupTag::Concat => "markup",
        }
    }
}

/// One argument of a markup call, classified by how it is encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupArg {
    /// Already-encoded markup
    Markup(SqlExpr),
    /// Text known at compile time
    Text(String),
    /// Runtime string, quoted with `REPLACE`
    String(SqlExpr),
    /// Runtime integer, rendered as quoted text
    Integer(SqlExpr),
    /// Absent optional attribute, encoded as `""`
    Empty,
    /// A NULL argument; poisons the whole value
    Null(SqlExpr),
}

impl MarkupArg {
    /// Classify a compiled argument of a `tag` call.
    pub fn from_ctx(tag: MarkupTag, ctx: &TranslationCtx) -> Result<MarkupArg> {
        let expr = &ctx.expression;
        Ok(match ctx.data_type {
            DataType::Markup | DataType::ConstMarkup => MarkupArg::Markup(expr.clone()),
            DataType::ConstString => match constant_text(expr) {
                Some(text) => MarkupArg::Text(text),
                None => MarkupArg::String(expr.clone()),
            },
            DataType::String => MarkupArg::String(expr.clone()),
            DataType::ConstInteger => match expr.as_int_literal() {
                Some(value) => MarkupArg::Text(value.to_string()),
                None => MarkupArg::Integer(expr.clone()),
            },
            DataType::Integer => MarkupArg::Integer(expr.clone()),
            DataType::Null if tag == MarkupTag::Image => MarkupArg::Empty,
            DataType::Null => MarkupArg::Null(expr.clone()),
            other => {
                return Err(Error::invalid_argument(
                    tag.function_name(),
                    format!("unexpected markup argument of type {other}"),
                ))
            }
        })
    }
}

/// The text of a string literal or of a concatenation of string literals.
fn constant_text(expr: &SqlExpr) -> Option<String> {
    match expr {
        SqlExpr::Concat { parts } => parts.iter().map(constant_text).collect(),
        other => other.as_str_literal().map(str::to_string),
    }
}

fn quote(text: &str) -> String {
    format!("{QUOTE}{}{QUOTE}", text.replace(QUOTE, "\"\""))
}

/// A fragment of the encoded output.
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Text(String),
    Expr(SqlExpr),
}

#[derive(Debug, Default)]
struct Pieces(Vec<Piece>);

impl Pieces {
    fn text(&mut self, text: &str) {
        if let Some(Piece::Text(last)) = self.0.last_mut() {
            last.push_str(text);
        } else {
            self.0.push(Piece::Text(text.to_string()));
        }
    }

    /// Append encoded output, splicing its literal parts into the text buffer.
    fn encoded(&mut self, expr: &SqlExpr) {
        match expr {
            SqlExpr::Concat { parts } => parts.iter().for_each(|part| self.encoded(part)),
            other => match other.as_str_literal() {
                Some(text) => self.text(text),
                None => self.0.push(Piece::Expr(other.clone())),
            },
        }
    }
}

/// A tagged markup node over classified arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupCall {
    pub tag: MarkupTag,
    pub args: Vec<MarkupArg>,
}

impl MarkupCall {
    pub fn new(tag: MarkupTag, args: Vec<MarkupArg>) -> Self {
        Self { tag, args }
    }

    /// Build from compiled arguments. `image` is padded to all four attributes.
    pub fn from_args(tag: MarkupTag, args: &[TranslationCtx]) -> Result<Self> {
        let mut classified = args
            .iter()
            .map(|arg| MarkupArg::from_ctx(tag, arg))
            .collect::<Result<Vec<_>>>()?;
        if tag == MarkupTag::Image {
            if classified.len() > 4 {
                return Err(Error::arity("image", 4, classified.len()));
            }
            classified.resize(4, MarkupArg::Empty);
        }
        Ok(Self::new(tag, classified))
    }

    /// The encoding as text and expression fragments, adjacent text merged.
    pub fn pieces(&self) -> Vec<Piece> {
        let mut out = Pieces::default();
        out.text(LPAR);
        out.text(self.tag.code());
        for arg in &self.args {
            out.text(SEP);
            match arg {
                MarkupArg::Markup(expr) => out.encoded(expr),
                MarkupArg::Text(text) => out.text(&quote(text)),
                MarkupArg::String(expr) => {
                    out.text(QUOTE);
                    out.0.push(Piece::Expr(SqlExpr::func(
                        "REPLACE",
                        vec![
                            expr.clone(),
                            SqlExpr::string(QUOTE),
                            SqlExpr::string("\"\""),
                        ],
                    )));
                    out.text(QUOTE);
                }
                MarkupArg::Integer(expr) => {
                    out.text(QUOTE);
                    out.0.push(Piece::Expr(SqlExpr::cast(expr.clone(), SqlType::Text)));
                    out.text(QUOTE);
                }
                MarkupArg::Empty => out.text("\"\""),
                MarkupArg::Null(expr) => out.0.push(Piece::Expr(expr.clone())),
            }
        }
        out.text(RPAR);
        out.0
    }

    /// Lower to a single literal, or to a concatenation when runtime values are involved.
    pub fn to_sql(&self) -> SqlExpr {
        let mut parts: Vec<SqlExpr> = self
            .pieces()
            .into_iter()
            .map(|piece| match piece {
                Piece::Text(text) => SqlExpr::string(text),
                Piece::Expr(expr) => expr,
            })
            .collect();
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            SqlExpr::concat(parts)
        }
    }
}

/// Encode a `tag` call over compiled arguments.
pub fn render_markup_call(tag: MarkupTag, args: &[TranslationCtx]) -> Result<SqlExpr> {
    Ok(MarkupCall::from_args(tag, args)?.to_sql())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(expr: SqlExpr, t: DataType) -> TranslationCtx {
        TranslationCtx::new(expr, t)
    }

    fn col(name: &str) -> SqlExpr {
        SqlExpr::column(vec![name.to_string()])
    }

    #[test]
    fn test_constant_arguments_fold_to_one_literal() {
        let expr = render_markup_call(
            MarkupTag::Bold,
            &[ctx(SqlExpr::string("say \"hi\""), DataType::ConstString)],
        )
        .unwrap();
        assert_eq!(expr, SqlExpr::string("(b \"say \"\"hi\"\"\")"));
    }

    #[test]
    fn test_nested_constant_markup_folds() {
        let a = render_markup_call(MarkupTag::Bold, &[ctx(SqlExpr::string("a"), DataType::ConstString)])
            .unwrap();
        let b = render_markup_call(MarkupTag::Italic, &[ctx(SqlExpr::string("b"), DataType::ConstString)])
            .unwrap();
        let expr = render_markup_call(
            MarkupTag::Concat,
            &[ctx(a, DataType::ConstMarkup), ctx(b, DataType::ConstMarkup)],
        )
        .unwrap();
        assert_eq!(expr, SqlExpr::string("(c (b \"a\") (i \"b\"))"));
    }

    #[test]
    fn test_runtime_string_is_escaped_in_sql() {
        let expr = render_markup_call(MarkupTag::Italic, &[ctx(col("name"), DataType::String)]).unwrap();
        assert_eq!(
            expr,
            SqlExpr::concat(vec![
                SqlExpr::string("(i \""),
                SqlExpr::func(
                    "REPLACE",
                    vec![col("name"), SqlExpr::string("\""), SqlExpr::string("\"\"")]
                ),
                SqlExpr::string("\")"),
            ])
        );
    }

    #[test]
    fn test_runtime_markup_is_spliced() {
        let inner = render_markup_call(MarkupTag::Bold, &[ctx(col("x"), DataType::String)]).unwrap();
        let outer = MarkupCall::from_args(
            MarkupTag::Url,
            &[
                ctx(SqlExpr::string("http://a"), DataType::ConstString),
                ctx(inner, DataType::Markup),
            ],
        )
        .unwrap();
        let pieces = outer.pieces();
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0], Piece::Text("(a \"http://a\" (b \"".to_string()));
        assert_eq!(pieces[2], Piece::Text("\"))".to_string()));
    }

    #[test]
    fn test_image_pads_missing_attributes() {
        let expr = render_markup_call(
            MarkupTag::Image,
            &[
                ctx(SqlExpr::string("pic.png"), DataType::ConstString),
                ctx(SqlExpr::integer(20), DataType::ConstInteger),
            ],
        )
        .unwrap();
        assert_eq!(expr, SqlExpr::string("(img \"pic.png\" \"20\" \"\" \"\")"));

        let expr = render_markup_call(
            MarkupTag::Image,
            &[
                ctx(SqlExpr::string("pic.png"), DataType::ConstString),
                ctx(SqlExpr::Null, DataType::Null),
            ],
        )
        .unwrap();
        assert_eq!(expr, SqlExpr::string("(img \"pic.png\" \"\" \"\" \"\")"));
    }

    #[test]
    fn test_break_has_no_arguments() {
        assert_eq!(
            render_markup_call(MarkupTag::Break, &[]).unwrap(),
            SqlExpr::string("(br)")
        );
    }

    #[test]
    fn test_null_passes_through_outside_image() {
        let expr = render_markup_call(MarkupTag::Bold, &[ctx(SqlExpr::Null, DataType::Null)]).unwrap();
        assert_eq!(
            expr,
            SqlExpr::concat(vec![
                SqlExpr::string("(b "),
                SqlExpr::Null,
                SqlExpr::string(")"),
            ])
        );
    }

    #[test]
    fn test_unexpected_argument_type() {
        let err = render_markup_call(MarkupTag::Bold, &[ctx(col("f"), DataType::Float)]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }
}
