use prost_types::compiler::CodeGeneratorRequest;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MessageOptions, MethodDescriptorProto, OneofDescriptorProto,
    ServiceDescriptorProto,
};
use similar_asserts::assert_eq;

#[test]
fn generates_a_basic_message_module() {
    let mut stuff = file("some/stuff.proto", "some");
    stuff.message_type.push(message(
        "Stuff",
        vec![field("name", 1, Type::String), field("count", 2, Type::Int32)],
    ));

    let files = generate(&request(vec![stuff]));
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].0, "Proto/Some/Stuff.elm");
    assert_eq!(
        files[0].1,
        r#"module Proto.Some.Stuff exposing (Stuff, defaultStuff, encodeStuff, decodeStuff)

import Protobuf.Decode as D
import Protobuf.Encode as E


type alias Stuff =
    { name : String
    , count : Int
    }


defaultStuff : Stuff
defaultStuff =
    { name = ""
    , count = 0
    }


encodeStuff : Stuff -> E.Encoder
encodeStuff value =
    E.message
        [ ( 1, E.string value.name )
        , ( 2, E.int32 value.count )
        ]


decodeStuff : D.Decoder Stuff
decodeStuff =
    D.message defaultStuff
        [ D.optional 1 D.string (\value model -> { model | name = value })
        , D.optional 2 D.int32 (\value model -> { model | count = value })
        ]
"#
    );
}

#[test]
fn generates_oneof_modules() {
    let mut oneof_file = file("oneof.proto", "");
    let mut msg = message(
        "Msg",
        vec![
            oneof_member(field("a_string", 1, Type::String), 0),
            oneof_member(message_field("sub", 2, ".Sub"), 0),
        ],
    );
    msg.oneof_decl.push(oneof("kind"));
    oneof_file.message_type.push(msg);
    oneof_file.message_type.push(message("Sub", vec![]));

    let files = generate(&request(vec![oneof_file]));
    let names: Vec<_> = files.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["Proto/Oneof.elm", "Proto/Oneof/Msg/Kind.elm"]);

    assert_eq!(
        files[0].1,
        r#"module Proto.Oneof exposing (Sub, Msg_Kind(..), Msg, defaultMsg, defaultSub, encodeMsg, encodeSub, decodeMsg, decodeSub)

import Protobuf.Decode as D
import Protobuf.Encode as E


type alias Sub =
    {}


type Msg_Kind
    = Msg_Kind_AString String
    | Msg_Kind_Sub Sub


type alias Msg =
    { kind : Maybe Msg_Kind
    }


defaultMsg : Msg
defaultMsg =
    { kind = Nothing
    }


defaultSub : Sub
defaultSub =
    {}


encodeMsg : Msg -> E.Encoder
encodeMsg value =
    E.message
        [ encodeMsg_Kind value.kind
        ]


encodeMsg_Kind : Maybe Msg_Kind -> ( Int, E.Encoder )
encodeMsg_Kind value =
    case value of
        Just (Msg_Kind_AString inner) ->
            ( 1, E.string inner )

        Just (Msg_Kind_Sub inner) ->
            ( 2, encodeSub inner )

        Nothing ->
            ( 0, E.none )


encodeSub : Sub -> E.Encoder
encodeSub value =
    E.message []


decodeMsg : D.Decoder Msg
decodeMsg =
    D.message defaultMsg
        [ D.oneOf [ ( 1, D.map Msg_Kind_AString D.string ), ( 2, D.map Msg_Kind_Sub decodeSub ) ] (\value model -> { model | kind = value })
        ]


decodeSub : D.Decoder Sub
decodeSub =
    D.message defaultSub []
"#
    );

    assert_eq!(
        files[1].1,
        r#"module Proto.Oneof.Msg.Kind exposing (Kind(..), fromInternalKind, toInternalKind)

import Proto.Oneof


type Kind
    = AString String
    | Sub Proto.Oneof.Sub


toInternalKind : Kind -> Proto.Oneof.Msg_Kind
toInternalKind value =
    case value of
        AString inner ->
            Proto.Oneof.Msg_Kind_AString inner

        Sub inner ->
            Proto.Oneof.Msg_Kind_Sub inner


fromInternalKind : Proto.Oneof.Msg_Kind -> Kind
fromInternalKind value =
    case value of
        Proto.Oneof.Msg_Kind_AString inner ->
            AString inner

        Proto.Oneof.Msg_Kind_Sub inner ->
            Sub inner
"#
    );
}

#[test]
fn generates_boxed_wrappers_for_recursive_messages() {
    let mut tree = file("tree.proto", "");
    tree.message_type
        .push(message("Rec", vec![message_field("next", 1, ".Rec")]));

    let files = generate(&request(vec![tree]));
    assert_eq!(
        files[0].1,
        r#"module Proto.Tree exposing (RecBoxed(..), wrapRec, unwrapRec, Rec, defaultRec, encodeRec, decodeRec)

import Protobuf.Decode as D
import Protobuf.Encode as E


type RecBoxed
    = RecBoxed Rec


wrapRec : Rec -> RecBoxed
wrapRec =
    RecBoxed


unwrapRec : RecBoxed -> Rec
unwrapRec (RecBoxed inner) =
    inner


type alias Rec =
    { next : Maybe RecBoxed
    }


defaultRec : Rec
defaultRec =
    { next = Nothing
    }


encodeRec : Rec -> E.Encoder
encodeRec value =
    E.message
        [ ( 1, value.next |> Maybe.map (unwrapRec >> encodeRec) |> Maybe.withDefault E.none )
        ]


decodeRec : D.Decoder Rec
decodeRec =
    D.message defaultRec
        [ D.optional 1 (D.map (Just << wrapRec) (D.lazy (\_ -> decodeRec))) (\value model -> { model | next = value })
        ]
"#
    );
}

#[test]
fn generates_enum_modules() {
    let mut status = file("status.proto", "");
    status.enum_type.push(enum_(
        "Status",
        &[("STATUS_UNSPECIFIED", 0), ("STATUS_ACTIVE", 1)],
    ));

    let files = generate(&request(vec![status]));
    assert_eq!(
        files[0].1,
        r#"module Proto.Status exposing (Status(..), encodeStatus, decodeStatus)

import Protobuf.Decode as D
import Protobuf.Encode as E


type Status
    = StatusUnspecified
    | StatusActive
    | StatusUnrecognized_ Int


encodeStatus : Status -> E.Encoder
encodeStatus value =
    E.int32 <|
        case value of
            StatusUnspecified ->
                0

            StatusActive ->
                1

            StatusUnrecognized_ number ->
                number


decodeStatus : D.Decoder Status
decodeStatus =
    D.int32
        |> D.map
            (\value ->
                case value of
                    0 ->
                        StatusUnspecified

                    1 ->
                        StatusActive

                    number ->
                        StatusUnrecognized_ number
            )
"#
    );
}

#[test]
fn generates_service_bindings() {
    let mut orders = file("some/order_service.proto", "some.grpc");
    orders.message_type.push(message("GetOrdersRequest", vec![]));
    orders
        .message_type
        .push(message("GetOrdersResponse", vec![]));
    orders.service.push(service(
        "GrpcService",
        vec![method(
            "GetOrders",
            ".some.grpc.GetOrdersRequest",
            ".some.grpc.GetOrdersResponse",
        )],
    ));

    let files = generate(&request(vec![orders]));
    let names: Vec<_> = files.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        [
            "Proto/Some/Grpc/OrderService.elm",
            "Proto/Some/Grpc/OrderService/GrpcService.elm",
        ]
    );

    assert_eq!(
        files[1].1,
        r#"module Proto.Some.Grpc.OrderService.GrpcService exposing (getOrders)

import Grpc
import Proto.Some.Grpc.OrderService


getOrders : Grpc.Rpc Proto.Some.Grpc.OrderService.GetOrdersRequest Proto.Some.Grpc.OrderService.GetOrdersResponse
getOrders =
    Grpc.rpc
        { service = "some.grpc.GrpcService"
        , method = "GetOrders"
        , requestStreaming = False
        , responseStreaming = False
        , encoder = Proto.Some.Grpc.OrderService.encodeGetOrdersRequest
        , decoder = Proto.Some.Grpc.OrderService.decodeGetOrdersResponse
        }
"#
    );
}

#[test]
fn maps_lower_to_dicts() {
    let mut inventory_file = file("inventory.proto", "");
    let mut inventory = message(
        "Inventory",
        vec![repeated(message_field(
            "counts",
            1,
            ".Inventory.CountsEntry",
        ))],
    );
    inventory.nested_type.push(map_entry(
        "CountsEntry",
        field("key", 1, Type::String),
        field("value", 2, Type::Int32),
    ));
    inventory_file.message_type.push(inventory);

    let files = generate(&request(vec![inventory_file]));
    let content = &files[0].1;
    assert!(content.contains("import Dict"));
    assert!(content.contains("counts : Dict.Dict String Int"));
    assert!(content.contains("counts = Dict.empty"));
    assert!(content.contains("( 1, E.dict E.string E.int32 value.counts )"));
    assert!(content.contains(
        "D.mapped 1 ( \"\", 0 ) D.string D.int32 .counts (\\value model -> { model | counts = value })"
    ));
}

#[test]
fn proto3_optional_fields_are_maybes() {
    let mut foo = file("foo.proto", "");
    let mut msg = message("Foo", vec![]);
    let mut name = field("name", 1, Type::String);
    name.oneof_index = Some(0);
    name.proto3_optional = Some(true);
    msg.field.push(name);
    msg.oneof_decl.push(oneof("_name"));
    foo.message_type.push(msg);

    let files = generate(&request(vec![foo]));
    let content = &files[0].1;
    assert!(content.contains("name : Maybe String"));
    assert!(content.contains("( 1, value.name |> Maybe.map E.string |> Maybe.withDefault E.none )"));
    assert!(content.contains("D.optional 1 (D.map Just D.string)"));
}

#[test]
fn proto2_required_fields_are_plain() {
    let mut foo = file("foo.proto", "");
    foo.syntax = Some("proto2".to_owned());
    let mut id = field("id", 1, Type::Int32);
    id.label = Some(Label::Required as i32);
    foo.message_type.push(message("Foo", vec![id]));

    let files = generate(&request(vec![foo]));
    let content = &files[0].1;
    assert!(content.contains("id : Int"));
    assert!(!content.contains("id : Maybe Int"));
    assert!(content.contains("D.required 1 D.int32"));
}

#[test]
fn wide_scalars_pull_their_runtime_imports() {
    let mut foo = file("foo.proto", "");
    foo.message_type.push(message(
        "Foo",
        vec![field("id", 1, Type::Int64), field("blob", 2, Type::Bytes)],
    ));

    let files = generate(&request(vec![foo]));
    let content = &files[0].1;
    assert!(content.contains("import Protobuf.Types.Int64 as Int64 exposing (Int64)"));
    assert!(content.contains("import Bytes exposing (Bytes)"));
    assert!(content.contains("import Bytes.Encode as BE"));
    assert!(content.contains("id = (Int64.fromInts 0 0)"));
    assert!(content.contains("blob = (BE.encode (BE.sequence []))"));
}

#[test]
fn cross_file_references_qualify_and_import() {
    let mut a = file("a.proto", "pkg");
    a.message_type.push(message("Shared", vec![]));
    let mut b = file("b.proto", "pkg");
    b.dependency.push("a.proto".to_owned());
    b.message_type.push(message(
        "User",
        vec![message_field("shared", 1, ".pkg.Shared")],
    ));

    let mut request = request(vec![a, b]);
    request.file_to_generate = vec!["b.proto".to_owned()];

    let files = generate(&request);
    assert_eq!(files.len(), 1);
    let content = &files[0].1;
    assert!(content.contains("import Proto.Pkg.A"));
    assert!(content.contains("shared : Maybe Proto.Pkg.A.Shared"));
    assert!(content.contains("Maybe.map Proto.Pkg.A.encodeShared"));
    assert!(content.contains("D.map Just Proto.Pkg.A.decodeShared"));
}

#[test]
fn generation_is_deterministic() {
    let mut foo = file("foo.proto", "pkg");
    foo.enum_type
        .push(enum_("Status", &[("STATUS_UNSPECIFIED", 0)]));
    let mut msg = message(
        "Msg",
        vec![
            field("name", 1, Type::String),
            oneof_member(field("num", 2, Type::Int32), 0),
            oneof_member(message_field("rec", 3, ".pkg.Msg"), 0),
        ],
    );
    msg.oneof_decl.push(oneof("kind"));
    foo.message_type.push(msg);

    let request = request(vec![foo]);
    assert_eq!(
        protoc_gen_elm::generate(&request),
        protoc_gen_elm::generate(&request)
    );
}

#[test]
fn errors_are_reported_through_the_response() {
    let mut foo = file("foo.proto", "");
    foo.message_type.push(message(
        "Foo",
        vec![message_field("bar", 1, ".missing.Bar")],
    ));

    let response = protoc_gen_elm::generate(&request(vec![foo]));
    assert!(response.file.is_empty());
    assert!(response.error().contains("is not defined"));
    // proto3 optional support is always advertised.
    assert_eq!(response.supported_features, Some(1));
}

fn generate(request: &CodeGeneratorRequest) -> Vec<(String, String)> {
    protoc_gen_elm::generate_files(request)
        .unwrap()
        .into_iter()
        .map(|file| (file.name().to_owned(), file.content().to_owned()))
        .collect()
}

fn request(files: Vec<FileDescriptorProto>) -> CodeGeneratorRequest {
    CodeGeneratorRequest {
        file_to_generate: files.iter().map(|file| file.name().to_owned()).collect(),
        proto_file: files,
        ..Default::default()
    }
}

fn file(name: &str, package: &str) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_owned()),
        package: if package.is_empty() {
            None
        } else {
            Some(package.to_owned())
        },
        syntax: Some("proto3".to_owned()),
        ..Default::default()
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_owned()),
        field: fields,
        ..Default::default()
    }
}

fn field(name: &str, number: i32, r#type: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        r#type: Some(r#type as i32),
        label: Some(Label::Optional as i32),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_owned()),
        ..field(name, number, Type::Message)
    }
}

fn repeated(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.label = Some(Label::Repeated as i32);
    field
}

fn oneof_member(mut field: FieldDescriptorProto, index: i32) -> FieldDescriptorProto {
    field.oneof_index = Some(index);
    field
}

fn oneof(name: &str) -> OneofDescriptorProto {
    OneofDescriptorProto {
        name: Some(name.to_owned()),
        ..Default::default()
    }
}

fn enum_(name: &str, values: &[(&str, i32)]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_owned()),
        value: values
            .iter()
            .map(|&(value_name, number)| EnumValueDescriptorProto {
                name: Some(value_name.to_owned()),
                number: Some(number),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn map_entry(
    name: &str,
    key: FieldDescriptorProto,
    value: FieldDescriptorProto,
) -> DescriptorProto {
    DescriptorProto {
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..message(name, vec![key, value])
    }
}

fn service(name: &str, methods: Vec<MethodDescriptorProto>) -> ServiceDescriptorProto {
    ServiceDescriptorProto {
        name: Some(name.to_owned()),
        method: methods,
        ..Default::default()
    }
}

fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_owned()),
        input_type: Some(input.to_owned()),
        output_type: Some(output.to_owned()),
        ..Default::default()
    }
}
