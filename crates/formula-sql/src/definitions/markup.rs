//! Markup functions.

use super::{
    wrapped, Definition, RegistryBuilder, TypeStrategy, VariantBody, INTEGER, MARKUP,
    MARKUP_OR_STRING, STRING,
};
use crate::datatype::DataType;
use crate::dialect::DialectCombo;
use crate::markup::{render_markup_call, MarkupTag};

/// `CONST_MARKUP` when every argument is constant text, markup or NULL, else `MARKUP`.
pub(crate) fn markup_type(args: &[DataType]) -> Option<DataType> {
    // Runtime kinds also cast to their const twins, so constness is checked first
    let constant = args.iter().all(|&t| {
        (t.is_const() || t == DataType::Null)
            && (t.casts_to(DataType::ConstMarkup) || t.casts_to(DataType::ConstString))
    });
    Some(if constant {
        DataType::ConstMarkup
    } else {
        DataType::Markup
    })
}

fn tagged(tag: MarkupTag) -> VariantBody {
    wrapped(move |args, _| render_markup_call(tag, args))
}

fn markup_definition(name: &str) -> Definition {
    Definition::new(name).returns(TypeStrategy::Custom(markup_type))
}

pub(crate) fn register(builder: &mut RegistryBuilder) {
    let any = DialectCombo::ANY;

    builder.add(
        markup_definition("+")
            .variadic_requiring(MARKUP_OR_STRING, MARKUP.with_const_pairs())
            .variant(any, tagged(MarkupTag::Concat)),
    );

    for (name, tag) in [("bold", MarkupTag::Bold), ("italic", MarkupTag::Italic)] {
        builder.add(
            markup_definition(name)
                .args(&[MARKUP_OR_STRING])
                .variant(any, tagged(tag)),
        );
    }

    builder
        .add(
            markup_definition("url")
                .args(&[STRING, MARKUP_OR_STRING])
                .variant(any, tagged(MarkupTag::Url)),
        )
        .add(
            markup_definition("color")
                .args(&[MARKUP_OR_STRING, STRING])
                .variant(any, tagged(MarkupTag::Color)),
        )
        .add(
            markup_definition("size")
                .args(&[MARKUP_OR_STRING, STRING])
                .variant(any, tagged(MarkupTag::Size)),
        )
        .add(
            markup_definition("br")
                .args(&[])
                .variant(any, tagged(MarkupTag::Break)),
        )
        .add(
            markup_definition("image")
                .args(&[STRING])
                .args(&[STRING, INTEGER])
                .args(&[STRING, INTEGER, INTEGER])
                .args(&[STRING, INTEGER, INTEGER, STRING])
                .variant(any, tagged(MarkupTag::Image)),
        )
        .add(
            markup_definition("markup")
                .variadic(MARKUP_OR_STRING)
                .variant(any, tagged(MarkupTag::Concat)),
        );
}
