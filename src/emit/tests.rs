use prost_types::field_descriptor_proto::Type;
use similar_asserts::assert_eq;

use super::{bool_literal, paren, Emitter};
use crate::cycle::BoxingAnalysis;
use crate::index::DescriptorIndex;
use crate::lower::lower_file;
use crate::module::{build_modules, Decl};
use crate::name::NameTable;
use crate::support::{enum_, field, file, message, message_field, repeated, request};

#[test]
fn paren_wraps_compound_expressions_once() {
    assert_eq!(paren("Int"), "Int");
    assert_eq!(paren("Proto.Foo.Bar"), "Proto.Foo.Bar");
    assert_eq!(paren("Maybe Foo"), "(Maybe Foo)");
    assert_eq!(paren("(BE.encode (BE.sequence []))"), "(BE.encode (BE.sequence []))");
}

#[test]
fn bool_literals() {
    assert_eq!(bool_literal(true), "True");
    assert_eq!(bool_literal(false), "False");
}

#[test]
fn message_encoders_cover_each_cardinality() {
    let mut foo = file("foo.proto", "");
    foo.message_type.push(message(
        "Foo",
        vec![
            field("name", 1, Type::String),
            message_field("sub", 2, ".Sub"),
            repeated(field("nums", 3, Type::Int32)),
        ],
    ));
    foo.message_type.push(message("Sub", vec![]));

    let request = request(vec![foo]);
    let index = DescriptorIndex::build(&request).unwrap();
    let boxing = BoxingAnalysis::run(&index);
    let wrappers = boxing.wrapper_targets(&index);
    let names = NameTable::build(&index, &wrappers).unwrap();
    let lowered = lower_file(&index, &boxing, index.file("foo.proto").unwrap()).unwrap();
    let modules = build_modules(&names, &lowered);
    let emitter = Emitter::new(&index, &names);

    let decl = modules[0]
        .decls
        .iter()
        .find(|decl| matches!(decl, Decl::MessageEncode(message) if message.fqn == "Foo"))
        .unwrap();

    assert_eq!(
        emitter.render_decl(&modules[0].path, decl),
        "\
encodeFoo : Foo -> E.Encoder
encodeFoo value =
    E.message
        [ ( 1, E.string value.name )
        , ( 2, value.sub |> Maybe.map encodeSub |> Maybe.withDefault E.none )
        , ( 3, E.list E.int32 value.nums )
        ]
"
    );
}

#[test]
fn enum_decoders_collapse_aliased_numbers() {
    let mut foo = file("foo.proto", "");
    foo.enum_type.push(enum_(
        "Status",
        &[
            ("STATUS_UNSPECIFIED", 0),
            ("STATUS_ACTIVE", 1),
            ("STATUS_ENABLED", 1),
        ],
    ));

    let request = request(vec![foo]);
    let index = DescriptorIndex::build(&request).unwrap();
    let boxing = BoxingAnalysis::run(&index);
    let wrappers = boxing.wrapper_targets(&index);
    let names = NameTable::build(&index, &wrappers).unwrap();
    let lowered = lower_file(&index, &boxing, index.file("foo.proto").unwrap()).unwrap();
    let modules = build_modules(&names, &lowered);
    let emitter = Emitter::new(&index, &names);

    let decl = modules[0]
        .decls
        .iter()
        .find(|decl| matches!(decl, Decl::EnumDecode(_)))
        .unwrap();

    assert_eq!(
        emitter.render_decl(&modules[0].path, decl),
        "\
decodeStatus : D.Decoder Status
decodeStatus =
    D.int32
        |> D.map
            (\\value ->
                case value of
                    0 ->
                        StatusUnspecified

                    1 ->
                        StatusActive

                    number ->
                        StatusUnrecognized_ number
            )
"
    );
}

#[test]
fn boxed_fields_wrap_and_defer() {
    let mut foo = file("foo.proto", "");
    foo.message_type
        .push(message("Rec", vec![message_field("next", 1, ".Rec")]));

    let request = request(vec![foo]);
    let index = DescriptorIndex::build(&request).unwrap();
    let boxing = BoxingAnalysis::run(&index);
    let wrappers = boxing.wrapper_targets(&index);
    let names = NameTable::build(&index, &wrappers).unwrap();
    let lowered = lower_file(&index, &boxing, index.file("foo.proto").unwrap()).unwrap();
    let modules = build_modules(&names, &lowered);
    let emitter = Emitter::new(&index, &names);

    let encode = modules[0]
        .decls
        .iter()
        .find(|decl| matches!(decl, Decl::MessageEncode(_)))
        .unwrap();
    assert_eq!(
        emitter.render_decl(&modules[0].path, encode),
        "\
encodeRec : Rec -> E.Encoder
encodeRec value =
    E.message
        [ ( 1, value.next |> Maybe.map (unwrapRec >> encodeRec) |> Maybe.withDefault E.none )
        ]
"
    );

    let decode = modules[0]
        .decls
        .iter()
        .find(|decl| matches!(decl, Decl::MessageDecode(_)))
        .unwrap();
    assert_eq!(
        emitter.render_decl(&modules[0].path, decode),
        "\
decodeRec : D.Decoder Rec
decodeRec =
    D.message defaultRec
        [ D.optional 1 (D.map (Just << wrapRec) (D.lazy (\\_ -> decodeRec))) (\\value model -> { model | next = value })
        ]
"
    );
}
