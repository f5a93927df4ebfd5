//! Lowering of protobuf field types to Elm types and codec calls.
//!
//! Each field is attached a [`ResolvedType`]: the shape of the Elm value plus
//! enough information to emit the `Protobuf.Encode`/`Protobuf.Decode` call
//! pair implementing its wire format. The lowered IR is immutable once built.

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    OneofDescriptorProto,
};

use crate::cycle::BoxingAnalysis;
use crate::error::{Error, ErrorKind};
use crate::index::{DescriptorIndex, ModulePath, TypeEntry, TypeKind};
use crate::service::{self, LoweredService};

/// Scalar wire kinds with their fixed Elm type and codec call mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScalarKind {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Float,
    Double,
    Bool,
    String,
    Bytes,
}

impl ScalarKind {
    pub(crate) fn from_type(ty: Type) -> Option<Self> {
        match ty {
            Type::Int32 => Some(ScalarKind::Int32),
            Type::Int64 => Some(ScalarKind::Int64),
            Type::Uint32 => Some(ScalarKind::Uint32),
            Type::Uint64 => Some(ScalarKind::Uint64),
            Type::Sint32 => Some(ScalarKind::Sint32),
            Type::Sint64 => Some(ScalarKind::Sint64),
            Type::Fixed32 => Some(ScalarKind::Fixed32),
            Type::Fixed64 => Some(ScalarKind::Fixed64),
            Type::Sfixed32 => Some(ScalarKind::Sfixed32),
            Type::Sfixed64 => Some(ScalarKind::Sfixed64),
            Type::Float => Some(ScalarKind::Float),
            Type::Double => Some(ScalarKind::Double),
            Type::Bool => Some(ScalarKind::Bool),
            Type::String => Some(ScalarKind::String),
            Type::Bytes => Some(ScalarKind::Bytes),
            Type::Group | Type::Message | Type::Enum => None,
        }
    }

    /// The Elm surface type, assuming the imports emitted by the module
    /// builder (`Int64` from the runtime library, `Bytes` from elm/bytes).
    pub(crate) fn elm_type(&self) -> &'static str {
        match self {
            ScalarKind::Int32
            | ScalarKind::Uint32
            | ScalarKind::Sint32
            | ScalarKind::Fixed32
            | ScalarKind::Sfixed32 => "Int",
            ScalarKind::Int64
            | ScalarKind::Uint64
            | ScalarKind::Sint64
            | ScalarKind::Fixed64
            | ScalarKind::Sfixed64 => "Int64",
            ScalarKind::Float | ScalarKind::Double => "Float",
            ScalarKind::Bool => "Bool",
            ScalarKind::String => "String",
            ScalarKind::Bytes => "Bytes",
        }
    }

    pub(crate) fn encode_call(&self) -> &'static str {
        match self {
            ScalarKind::Int32 => "E.int32",
            ScalarKind::Int64 => "E.int64",
            ScalarKind::Uint32 => "E.uint32",
            ScalarKind::Uint64 => "E.uint64",
            ScalarKind::Sint32 => "E.sint32",
            ScalarKind::Sint64 => "E.sint64",
            ScalarKind::Fixed32 => "E.fixed32",
            ScalarKind::Fixed64 => "E.fixed64",
            ScalarKind::Sfixed32 => "E.sfixed32",
            ScalarKind::Sfixed64 => "E.sfixed64",
            ScalarKind::Float => "E.float",
            ScalarKind::Double => "E.double",
            ScalarKind::Bool => "E.bool",
            ScalarKind::String => "E.string",
            ScalarKind::Bytes => "E.bytes",
        }
    }

    pub(crate) fn decode_call(&self) -> &'static str {
        match self {
            ScalarKind::Int32 => "D.int32",
            ScalarKind::Int64 => "D.int64",
            ScalarKind::Uint32 => "D.uint32",
            ScalarKind::Uint64 => "D.uint64",
            ScalarKind::Sint32 => "D.sint32",
            ScalarKind::Sint64 => "D.sint64",
            ScalarKind::Fixed32 => "D.fixed32",
            ScalarKind::Fixed64 => "D.fixed64",
            ScalarKind::Sfixed32 => "D.sfixed32",
            ScalarKind::Sfixed64 => "D.sfixed64",
            ScalarKind::Float => "D.float",
            ScalarKind::Double => "D.double",
            ScalarKind::Bool => "D.bool",
            ScalarKind::String => "D.string",
            ScalarKind::Bytes => "D.bytes",
        }
    }

    /// The Elm expression for the proto3 zero value of this kind.
    pub(crate) fn zero(&self) -> &'static str {
        match self {
            ScalarKind::Int32
            | ScalarKind::Uint32
            | ScalarKind::Sint32
            | ScalarKind::Fixed32
            | ScalarKind::Sfixed32 => "0",
            ScalarKind::Int64
            | ScalarKind::Uint64
            | ScalarKind::Sint64
            | ScalarKind::Fixed64
            | ScalarKind::Sfixed64 => "(Int64.fromInts 0 0)",
            ScalarKind::Float | ScalarKind::Double => "0",
            ScalarKind::Bool => "False",
            ScalarKind::String => "\"\"",
            ScalarKind::Bytes => "(BE.encode (BE.sequence []))",
        }
    }

    pub(crate) fn uses_int64(&self) -> bool {
        matches!(
            self,
            ScalarKind::Int64
                | ScalarKind::Uint64
                | ScalarKind::Sint64
                | ScalarKind::Fixed64
                | ScalarKind::Sfixed64
        )
    }

    /// Whether this kind is a valid protobuf map key.
    pub(crate) fn is_map_key(&self) -> bool {
        !matches!(
            self,
            ScalarKind::Float | ScalarKind::Double | ScalarKind::Bytes
        )
    }
}

/// The element type of a field, before cardinality is applied.
#[derive(Debug, Clone)]
pub(crate) enum Elem {
    Scalar(ScalarKind),
    /// Reference to an enum type, by fully-qualified name.
    Enum(String),
    /// Reference to a message (or proto2 group) type.
    Message { fqn: String, boxed: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Presence {
    /// proto3 implicit presence: missing on wire decodes to the zero value.
    Implicit,
    /// proto3 `optional` and proto2 optional: absence is observable.
    Optional,
    /// proto2 `required`: never wrapped, missing on wire is a decode failure.
    Required,
}

#[derive(Debug, Clone)]
pub(crate) enum Cardinality {
    Singular(Presence),
    Repeated,
    Map { key: ScalarKind, value: Elem },
}

/// The output of lowering one field: Elm type shape plus codec selection.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedType {
    pub elem: Elem,
    pub card: Cardinality,
}

#[derive(Debug)]
pub(crate) struct LoweredField<'a> {
    pub descriptor: &'a FieldDescriptorProto,
    pub number: i32,
    pub resolved: ResolvedType,
}

#[derive(Debug)]
pub(crate) struct LoweredOneof<'a> {
    pub descriptor: &'a OneofDescriptorProto,
    /// Index into the owning message's `oneof_decl`.
    pub index: usize,
    pub members: Vec<LoweredField<'a>>,
}

/// Record entries of a message, in declaration order. A oneof appears once,
/// at the position of its first member.
#[derive(Debug)]
pub(crate) enum MessageItem<'a> {
    Field(LoweredField<'a>),
    Oneof(LoweredOneof<'a>),
}

#[derive(Debug)]
pub(crate) struct LoweredMessage<'a> {
    pub fqn: String,
    pub descriptor: &'a DescriptorProto,
    pub items: Vec<MessageItem<'a>>,
}

#[derive(Debug)]
pub(crate) struct LoweredEnum<'a> {
    pub fqn: String,
    pub descriptor: &'a EnumDescriptorProto,
}

/// The per-file intermediate representation consumed by the module builder.
#[derive(Debug)]
pub(crate) struct LoweredFile<'a> {
    pub file: &'a FileDescriptorProto,
    pub module: ModulePath,
    pub messages: Vec<LoweredMessage<'a>>,
    pub enums: Vec<LoweredEnum<'a>>,
    pub services: Vec<LoweredService<'a>>,
}

pub(crate) fn is_proto3(file: &FileDescriptorProto) -> bool {
    file.syntax() == "proto3"
}

/// Whether a field is a member of a declared oneof, as opposed to a plain
/// field or the synthetic oneof protoc generates for proto3 `optional`.
pub(crate) fn is_oneof_member(field: &FieldDescriptorProto) -> bool {
    field.oneof_index.is_some() && !field.proto3_optional()
}

pub(crate) fn lower_file<'a>(
    index: &DescriptorIndex<'a>,
    boxing: &BoxingAnalysis,
    file: &'a FileDescriptorProto,
) -> Result<LoweredFile<'a>, Error> {
    let mut lowered = LoweredFile {
        file,
        module: ModulePath::for_file(file),
        messages: Vec::new(),
        enums: Vec::new(),
        services: Vec::new(),
    };

    let package = file.package();
    for message in &file.message_type {
        lower_message(index, boxing, file, package, message, &mut lowered)?;
    }
    for enum_ in &file.enum_type {
        lowered.enums.push(LoweredEnum {
            fqn: join_fqn(package, enum_.name()),
            descriptor: enum_,
        });
    }
    for svc in &file.service {
        lowered
            .services
            .push(service::lower_service(index, file, svc)?);
    }

    Ok(lowered)
}

fn lower_message<'a>(
    index: &DescriptorIndex<'a>,
    boxing: &BoxingAnalysis,
    file: &'a FileDescriptorProto,
    scope: &str,
    message: &'a DescriptorProto,
    out: &mut LoweredFile<'a>,
) -> Result<(), Error> {
    let fqn = join_fqn(scope, message.name());
    let proto3 = is_proto3(file);

    let mut items = Vec::new();
    let mut oneof_seen = vec![false; message.oneof_decl.len()];
    for field in &message.field {
        if is_oneof_member(field) {
            let oneof_index = field.oneof_index() as usize;
            let oneof = message.oneof_decl.get(oneof_index).ok_or_else(|| {
                Error::malformed(format!(
                    "field '{}' of message '{}' references oneof {} which does not exist",
                    field.name(),
                    fqn,
                    oneof_index
                ))
            })?;
            if oneof_seen[oneof_index] {
                continue;
            }
            oneof_seen[oneof_index] = true;

            let mut members = Vec::new();
            for member in &message.field {
                if is_oneof_member(member) && member.oneof_index() as usize == oneof_index {
                    members.push(lower_member(index, boxing, file, &fqn, member)?);
                }
            }
            items.push(MessageItem::Oneof(LoweredOneof {
                descriptor: oneof,
                index: oneof_index,
                members,
            }));
        } else {
            items.push(MessageItem::Field(lower_field(
                index, boxing, file, proto3, &fqn, field,
            )?));
        }
    }

    out.messages.push(LoweredMessage {
        fqn: fqn.clone(),
        descriptor: message,
        items,
    });

    for nested in &message.nested_type {
        let is_map_entry = nested
            .options
            .as_ref()
            .map_or(false, |options| options.map_entry());
        if !is_map_entry {
            lower_message(index, boxing, file, &fqn, nested, out)?;
        }
    }
    for enum_ in &message.enum_type {
        out.enums.push(LoweredEnum {
            fqn: join_fqn(&fqn, enum_.name()),
            descriptor: enum_,
        });
    }

    Ok(())
}

fn lower_field<'a>(
    index: &DescriptorIndex<'a>,
    boxing: &BoxingAnalysis,
    file: &'a FileDescriptorProto,
    proto3: bool,
    owner: &str,
    field: &'a FieldDescriptorProto,
) -> Result<LoweredField<'a>, Error> {
    // Map fields reach the index as repeated references to a synthetic entry
    // message; re-expand them here.
    if let Some((key, value)) = lower_map(index, boxing, file, owner, field)? {
        return Ok(LoweredField {
            descriptor: field,
            number: field.number(),
            resolved: ResolvedType {
                elem: value.clone(),
                card: Cardinality::Map { key, value },
            },
        });
    }

    let elem = lower_elem(index, boxing, file, owner, field)?;
    let card = if field.label() == Label::Repeated {
        Cardinality::Repeated
    } else {
        Cardinality::Singular(presence(proto3, field, &elem))
    };

    Ok(LoweredField {
        descriptor: field,
        number: field.number(),
        resolved: ResolvedType { elem, card },
    })
}

fn lower_member<'a>(
    index: &DescriptorIndex<'a>,
    boxing: &BoxingAnalysis,
    file: &'a FileDescriptorProto,
    owner: &str,
    field: &'a FieldDescriptorProto,
) -> Result<LoweredField<'a>, Error> {
    let elem = lower_elem(index, boxing, file, owner, field)?;
    Ok(LoweredField {
        descriptor: field,
        number: field.number(),
        resolved: ResolvedType {
            elem,
            card: Cardinality::Singular(Presence::Optional),
        },
    })
}

fn presence(proto3: bool, field: &FieldDescriptorProto, elem: &Elem) -> Presence {
    if field.label() == Label::Required {
        Presence::Required
    } else if !proto3 || field.proto3_optional() {
        Presence::Optional
    } else if matches!(elem, Elem::Message { .. }) {
        // proto3 singular message fields always track presence.
        Presence::Optional
    } else {
        Presence::Implicit
    }
}

fn lower_elem<'a>(
    index: &DescriptorIndex<'a>,
    boxing: &BoxingAnalysis,
    file: &'a FileDescriptorProto,
    owner: &str,
    field: &'a FieldDescriptorProto,
) -> Result<Elem, Error> {
    match field.r#type() {
        Type::Message | Type::Group => {
            let target = resolve_reference(index, file, owner, field)?;
            match target.kind {
                TypeKind::Message(_) => Ok(Elem::Message {
                    boxed: boxing.is_boxed(owner, &target.fqn),
                    fqn: target.fqn.clone(),
                }),
                TypeKind::Enum(_) => Err(unresolved(file, field)),
            }
        }
        Type::Enum => {
            let target = resolve_reference(index, file, owner, field)?;
            match target.kind {
                TypeKind::Enum(_) => Ok(Elem::Enum(target.fqn.clone())),
                TypeKind::Message(_) => Err(unresolved(file, field)),
            }
        }
        ty => match ScalarKind::from_type(ty) {
            Some(kind) => Ok(Elem::Scalar(kind)),
            None => Err(Error::from_kind(ErrorKind::UnsupportedConstruct {
                construct: format!("field '{}' of type {:?}", field.name(), ty),
                file: file.name().to_owned(),
            })),
        },
    }
}

fn lower_map<'a>(
    index: &DescriptorIndex<'a>,
    boxing: &BoxingAnalysis,
    file: &'a FileDescriptorProto,
    owner: &str,
    field: &'a FieldDescriptorProto,
) -> Result<Option<(ScalarKind, Elem)>, Error> {
    if field.r#type() != Type::Message || field.label() != Label::Repeated {
        return Ok(None);
    }
    let entry = match index.resolve(owner, field.type_name()) {
        Some(entry) if entry.is_map_entry() => entry,
        _ => return Ok(None),
    };
    let entry_message = entry.message().expect("map entries are messages");

    let key_field = map_entry_field(entry_message, entry, 1, file, field)?;
    let value_field = map_entry_field(entry_message, entry, 2, file, field)?;

    // 64-bit keys are valid protobuf but Int64 is opaque in the runtime
    // library and cannot key a Dict.
    let key = ScalarKind::from_type(key_field.r#type())
        .filter(|kind| kind.is_map_key() && !kind.uses_int64())
        .ok_or_else(|| {
            Error::from_kind(ErrorKind::UnsupportedConstruct {
                construct: format!(
                    "map field '{}' with key type {:?}",
                    field.name(),
                    key_field.r#type()
                ),
                file: file.name().to_owned(),
            })
        })?;

    let value = lower_elem(index, boxing, file, &entry.fqn, value_field)?;
    Ok(Some((key, value)))
}

fn map_entry_field<'a>(
    entry_message: &'a DescriptorProto,
    entry: &TypeEntry<'a>,
    number: i32,
    file: &FileDescriptorProto,
    field: &FieldDescriptorProto,
) -> Result<&'a FieldDescriptorProto, Error> {
    entry_message
        .field
        .iter()
        .find(|f| f.number() == number)
        .ok_or_else(|| {
            Error::malformed(format!(
                "map entry '{}' of field '{}' in '{}' is missing field {}",
                entry.fqn,
                field.name(),
                file.name(),
                number
            ))
        })
}

fn resolve_reference<'a, 'i>(
    index: &'i DescriptorIndex<'a>,
    file: &FileDescriptorProto,
    owner: &str,
    field: &FieldDescriptorProto,
) -> Result<&'i TypeEntry<'a>, Error> {
    index
        .resolve(owner, field.type_name())
        .ok_or_else(|| unresolved(file, field))
}

fn unresolved(file: &FileDescriptorProto, field: &FieldDescriptorProto) -> Error {
    Error::from_kind(ErrorKind::UnresolvedReference {
        field: field.name().to_owned(),
        type_name: field.type_name().to_owned(),
        file: file.name().to_owned(),
    })
}

fn join_fqn(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_owned()
    } else {
        format!("{}.{}", scope, name)
    }
}
