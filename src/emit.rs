//! Rendering of scheduled declarations to Elm source text.
//!
//! Everything here is mechanical string assembly. Ordering, naming and type
//! resolution are settled by the earlier passes, so rendering the same
//! request twice produces byte-identical output.

use std::collections::HashSet;

use crate::index::{DescriptorIndex, ModulePath, TypeKind};
use crate::lower::{
    Cardinality, Elem, LoweredEnum, LoweredField, LoweredMessage, LoweredOneof, MessageItem,
    Presence, ResolvedType,
};
use crate::module::{Decl, ElmModule};
use crate::name::{LocalNames, NameTable};
use crate::service::LoweredService;

pub(crate) struct Emitter<'a> {
    index: &'a DescriptorIndex<'a>,
    names: &'a NameTable,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(index: &'a DescriptorIndex<'a>, names: &'a NameTable) -> Self {
        Emitter { index, names }
    }

    pub(crate) fn render_module(&self, module: &ElmModule<'_>) -> String {
        let mut out = String::new();
        if module.exposing.is_empty() {
            out.push_str(&format!("module {} exposing (..)\n", module.path));
        } else {
            out.push_str(&format!(
                "module {} exposing ({})\n",
                module.path,
                module.exposing.join(", ")
            ));
        }

        if !module.imports.is_empty() {
            out.push('\n');
            for import in &module.imports {
                out.push_str(import);
                out.push('\n');
            }
        }

        for decl in &module.decls {
            out.push_str("\n\n");
            out.push_str(&self.render_decl(&module.path, decl));
        }
        out
    }

    fn render_decl(&self, current: &ModulePath, decl: &Decl<'_>) -> String {
        match decl {
            Decl::MessageAlias(message) => self.message_alias(current, message),
            Decl::OneofInternal { message, oneof } => self.oneof_internal(current, message, oneof),
            Decl::BoxWrapper { fqn } => self.box_wrapper(fqn),
            Decl::EnumUnion(enum_) => self.enum_union(enum_),
            Decl::MessageDefault(message) => self.message_default(current, message),
            Decl::MessageEncode(message) => self.message_encode(current, message),
            Decl::OneofEncode { message, oneof } => self.oneof_encode(current, message, oneof),
            Decl::EnumEncode(enum_) => self.enum_encode(enum_),
            Decl::MessageDecode(message) => self.message_decode(current, message),
            Decl::EnumDecode(enum_) => self.enum_decode(enum_),
            Decl::OneofPublic { message, oneof } => self.oneof_public(current, message, oneof),
            Decl::OneofToInternal { message, oneof } => {
                self.oneof_to_internal(current, message, oneof)
            }
            Decl::OneofFromInternal { message, oneof } => {
                self.oneof_from_internal(current, message, oneof)
            }
            Decl::ServiceMethod { service, index } => {
                self.service_method(current, service, *index)
            }
        }
    }

    fn message_alias(&self, current: &ModulePath, message: &LoweredMessage<'_>) -> String {
        let ty = self.names.ty(&message.fqn);

        let mut fields = Vec::new();
        for item in &message.items {
            match item {
                MessageItem::Field(field) => {
                    let label = self.names.field(&message.fqn, field.number);
                    fields.push(format!(
                        "{} : {}",
                        label,
                        self.field_type(current, &field.resolved)
                    ));
                }
                MessageItem::Oneof(oneof) => {
                    let oneof_names = self.names.oneof(&message.fqn, oneof.index);
                    fields.push(format!(
                        "{} : Maybe {}",
                        oneof_names.field, oneof_names.internal
                    ));
                }
            }
        }

        let mut out = format!("type alias {} =\n", ty.name);
        if fields.is_empty() {
            out.push_str("    {}\n");
        } else {
            for (position, field) in fields.iter().enumerate() {
                let lead = if position == 0 { '{' } else { ',' };
                out.push_str(&format!("    {} {}\n", lead, field));
            }
            out.push_str("    }\n");
        }
        out
    }

    fn oneof_internal(
        &self,
        current: &ModulePath,
        message: &LoweredMessage<'_>,
        oneof: &LoweredOneof<'_>,
    ) -> String {
        let oneof_names = self.names.oneof(&message.fqn, oneof.index);

        let mut out = format!("type {}\n", oneof_names.internal);
        for (position, member) in oneof.members.iter().enumerate() {
            let lead = if position == 0 { '=' } else { '|' };
            out.push_str(&format!(
                "    {} {} {}\n",
                lead,
                oneof_names.ctors[position],
                paren(&self.member_type(current, &member.resolved.elem))
            ));
        }
        out
    }

    fn box_wrapper(&self, fqn: &str) -> String {
        let ty = self.names.ty(fqn);
        let wrapper = ty
            .wrapper
            .as_ref()
            .expect("wrapper declarations have wrapper names");
        let mut locals = LocalNames::new();
        let inner = locals.fresh("inner");

        format!(
            "type {}\n    = {} {}\n\n\n{} : {} -> {}\n{} =\n    {}\n\n\n{} : {} -> {}\n{} ({} {}) =\n    {}\n",
            wrapper.name,
            wrapper.ctor,
            ty.name,
            wrapper.wrap,
            ty.name,
            wrapper.name,
            wrapper.wrap,
            wrapper.ctor,
            wrapper.unwrap,
            wrapper.name,
            ty.name,
            wrapper.unwrap,
            wrapper.ctor,
            inner,
            inner
        )
    }

    fn enum_union(&self, enum_: &LoweredEnum<'_>) -> String {
        let ty = self.names.ty(&enum_.fqn);
        let variants = self.names.variants(&enum_.fqn);
        let unrecognized = ty
            .unrecognized
            .as_ref()
            .expect("enums carry a fallback constructor");

        let mut out = format!("type {}\n", ty.name);
        for (position, variant) in variants.iter().enumerate() {
            let lead = if position == 0 { '=' } else { '|' };
            out.push_str(&format!("    {} {}\n", lead, variant));
        }
        let lead = if variants.is_empty() { '=' } else { '|' };
        out.push_str(&format!("    {} {} Int\n", lead, unrecognized));
        out
    }

    fn message_default(&self, current: &ModulePath, message: &LoweredMessage<'_>) -> String {
        let ty = self.names.ty(&message.fqn);
        let default_ = ty
            .default_
            .as_ref()
            .expect("messages always have a default value name");

        let mut fields = Vec::new();
        for item in &message.items {
            match item {
                MessageItem::Field(field) => {
                    let label = self.names.field(&message.fqn, field.number);
                    fields.push(format!(
                        "{} = {}",
                        label,
                        self.default_value(current, &field.resolved)
                    ));
                }
                MessageItem::Oneof(oneof) => {
                    let oneof_names = self.names.oneof(&message.fqn, oneof.index);
                    fields.push(format!("{} = Nothing", oneof_names.field));
                }
            }
        }

        let mut out = format!("{} : {}\n{} =\n", default_, ty.name, default_);
        if fields.is_empty() {
            out.push_str("    {}\n");
        } else {
            for (position, field) in fields.iter().enumerate() {
                let lead = if position == 0 { '{' } else { ',' };
                out.push_str(&format!("    {} {}\n", lead, field));
            }
            out.push_str("    }\n");
        }
        out
    }

    fn message_encode(&self, current: &ModulePath, message: &LoweredMessage<'_>) -> String {
        let ty = self.names.ty(&message.fqn);
        let mut locals = LocalNames::new();
        let value = locals.fresh("value");

        let mut items = Vec::new();
        for item in &message.items {
            match item {
                MessageItem::Field(field) => {
                    items.push(self.field_encode_item(current, &message.fqn, &value, field))
                }
                MessageItem::Oneof(oneof) => {
                    let oneof_names = self.names.oneof(&message.fqn, oneof.index);
                    items.push(format!(
                        "{} {}.{}",
                        oneof_names.encode, value, oneof_names.field
                    ));
                }
            }
        }

        let mut out = format!(
            "{} : {} -> E.Encoder\n{} {} =\n",
            ty.encode, ty.name, ty.encode, value
        );
        if items.is_empty() {
            out.push_str("    E.message []\n");
        } else {
            out.push_str("    E.message\n");
            for (position, item) in items.iter().enumerate() {
                let lead = if position == 0 { '[' } else { ',' };
                out.push_str(&format!("        {} {}\n", lead, item));
            }
            out.push_str("        ]\n");
        }
        out
    }

    fn field_encode_item(
        &self,
        current: &ModulePath,
        owner: &str,
        value: &str,
        field: &LoweredField<'_>,
    ) -> String {
        let label = self.names.field(owner, field.number);
        let access = format!("{}.{}", value, label);
        match &field.resolved.card {
            Cardinality::Singular(Presence::Implicit | Presence::Required) => format!(
                "( {}, {} {} )",
                field.number,
                self.elem_encoder(current, &field.resolved.elem),
                access
            ),
            Cardinality::Singular(Presence::Optional) => format!(
                "( {}, {} |> Maybe.map {} |> Maybe.withDefault E.none )",
                field.number,
                access,
                self.elem_encoder(current, &field.resolved.elem)
            ),
            Cardinality::Repeated => format!(
                "( {}, E.list {} {} )",
                field.number,
                self.elem_encoder(current, &field.resolved.elem),
                access
            ),
            Cardinality::Map { key, value: val } => format!(
                "( {}, E.dict {} {} {} )",
                field.number,
                key.encode_call(),
                self.map_value_encoder(current, val),
                access
            ),
        }
    }

    fn oneof_encode(
        &self,
        current: &ModulePath,
        message: &LoweredMessage<'_>,
        oneof: &LoweredOneof<'_>,
    ) -> String {
        let oneof_names = self.names.oneof(&message.fqn, oneof.index);
        let mut locals = LocalNames::new();
        let value = locals.fresh("value");
        let inner = locals.fresh("inner");

        let mut out = format!(
            "{} : Maybe {} -> ( Int, E.Encoder )\n{} {} =\n    case {} of\n",
            oneof_names.encode, oneof_names.internal, oneof_names.encode, value, value
        );
        for (position, member) in oneof.members.iter().enumerate() {
            out.push_str(&format!(
                "        Just ({} {}) ->\n            ( {}, {} {} )\n\n",
                oneof_names.ctors[position],
                inner,
                member.number,
                self.member_encoder(current, &member.resolved.elem),
                inner
            ));
        }
        out.push_str("        Nothing ->\n            ( 0, E.none )\n");
        out
    }

    fn enum_encode(&self, enum_: &LoweredEnum<'_>) -> String {
        let ty = self.names.ty(&enum_.fqn);
        let variants = self.names.variants(&enum_.fqn);
        let unrecognized = ty
            .unrecognized
            .as_ref()
            .expect("enums carry a fallback constructor");
        let mut locals = LocalNames::new();
        let value = locals.fresh("value");
        let number = locals.fresh("number");

        let mut out = format!(
            "{} : {} -> E.Encoder\n{} {} =\n    E.int32 <|\n        case {} of\n",
            ty.encode, ty.name, ty.encode, value, value
        );
        for (position, declared) in enum_.descriptor.value.iter().enumerate() {
            out.push_str(&format!(
                "            {} ->\n                {}\n\n",
                variants[position],
                declared.number()
            ));
        }
        out.push_str(&format!(
            "            {} {} ->\n                {}\n",
            unrecognized, number, number
        ));
        out
    }

    fn message_decode(&self, current: &ModulePath, message: &LoweredMessage<'_>) -> String {
        let ty = self.names.ty(&message.fqn);
        let default_ = ty
            .default_
            .as_ref()
            .expect("messages always have a default value name");

        let mut items = Vec::new();
        for item in &message.items {
            match item {
                MessageItem::Field(field) => {
                    items.push(self.field_decode_item(current, &message.fqn, field))
                }
                MessageItem::Oneof(oneof) => {
                    items.push(self.oneof_decode_item(current, &message.fqn, oneof))
                }
            }
        }

        let mut out = format!("{} : D.Decoder {}\n{} =\n", ty.decode, ty.name, ty.decode);
        if items.is_empty() {
            out.push_str(&format!("    D.message {} []\n", default_));
        } else {
            out.push_str(&format!("    D.message {}\n", default_));
            for (position, item) in items.iter().enumerate() {
                let lead = if position == 0 { '[' } else { ',' };
                out.push_str(&format!("        {} {}\n", lead, item));
            }
            out.push_str("        ]\n");
        }
        out
    }

    fn field_decode_item(
        &self,
        current: &ModulePath,
        owner: &str,
        field: &LoweredField<'_>,
    ) -> String {
        let label = self.names.field(owner, field.number);
        let setter = format!("(\\value model -> {{ model | {} = value }})", label);
        match &field.resolved.card {
            Cardinality::Singular(Presence::Implicit) => format!(
                "D.optional {} {} {}",
                field.number,
                self.elem_decoder(current, &field.resolved.elem),
                setter
            ),
            Cardinality::Singular(Presence::Optional) => {
                let decoder = match &field.resolved.elem {
                    Elem::Message { fqn, boxed: true } => format!(
                        "(D.map (Just << {}) {})",
                        self.wrap_ref(current, fqn),
                        self.lazy_decoder(current, fqn)
                    ),
                    elem => format!("(D.map Just {})", self.elem_decoder(current, elem)),
                };
                format!("D.optional {} {} {}", field.number, decoder, setter)
            }
            Cardinality::Singular(Presence::Required) => {
                let decoder = match &field.resolved.elem {
                    Elem::Message { fqn, boxed: true } => format!(
                        "(D.map {} {})",
                        self.wrap_ref(current, fqn),
                        self.lazy_decoder(current, fqn)
                    ),
                    elem => self.elem_decoder(current, elem),
                };
                format!("D.required {} {} {}", field.number, decoder, setter)
            }
            Cardinality::Repeated => {
                let decoder = match &field.resolved.elem {
                    Elem::Message { fqn, boxed: true } => format!(
                        "(D.map {} {})",
                        self.wrap_ref(current, fqn),
                        self.lazy_decoder(current, fqn)
                    ),
                    elem => self.elem_decoder(current, elem),
                };
                format!(
                    "D.repeated {} {} .{} {}",
                    field.number, decoder, label, setter
                )
            }
            Cardinality::Map { key, value } => {
                let value_zero = match value {
                    Elem::Message { .. } => "Nothing".to_owned(),
                    Elem::Scalar(kind) => kind.zero().to_owned(),
                    Elem::Enum(fqn) => self.zero_variant_ref(current, fqn),
                };
                let value_decoder = match value {
                    Elem::Message { fqn, boxed: true } => format!(
                        "(D.map (Just << {}) {})",
                        self.wrap_ref(current, fqn),
                        self.lazy_decoder(current, fqn)
                    ),
                    Elem::Message { boxed: false, .. } => {
                        format!("(D.map Just {})", self.elem_decoder(current, value))
                    }
                    _ => self.elem_decoder(current, value),
                };
                format!(
                    "D.mapped {} ( {}, {} ) {} {} .{} {}",
                    field.number,
                    key.zero(),
                    value_zero,
                    key.decode_call(),
                    value_decoder,
                    label,
                    setter
                )
            }
        }
    }

    fn oneof_decode_item(
        &self,
        current: &ModulePath,
        owner: &str,
        oneof: &LoweredOneof<'_>,
    ) -> String {
        let oneof_names = self.names.oneof(owner, oneof.index);

        let mut arms = Vec::new();
        for (position, member) in oneof.members.iter().enumerate() {
            let decoder = match &member.resolved.elem {
                Elem::Message { fqn, boxed: true } => self.lazy_decoder(current, fqn),
                elem => self.elem_decoder(current, elem),
            };
            arms.push(format!(
                "( {}, D.map {} {} )",
                member.number, oneof_names.ctors[position], decoder
            ));
        }

        format!(
            "D.oneOf [ {} ] (\\value model -> {{ model | {} = value }})",
            arms.join(", "),
            oneof_names.field
        )
    }

    fn enum_decode(&self, enum_: &LoweredEnum<'_>) -> String {
        let ty = self.names.ty(&enum_.fqn);
        let variants = self.names.variants(&enum_.fqn);
        let unrecognized = ty
            .unrecognized
            .as_ref()
            .expect("enums carry a fallback constructor");
        let mut locals = LocalNames::new();
        let value = locals.fresh("value");
        let number = locals.fresh("number");

        let mut out = format!(
            "{} : D.Decoder {}\n{} =\n    D.int32\n        |> D.map\n            (\\{} ->\n                case {} of\n",
            ty.decode, ty.name, ty.decode, value, value
        );
        // Aliased numbers decode to the first declared label.
        let mut seen = HashSet::new();
        for (position, declared) in enum_.descriptor.value.iter().enumerate() {
            if !seen.insert(declared.number()) {
                continue;
            }
            out.push_str(&format!(
                "                    {} ->\n                        {}\n\n",
                declared.number(),
                variants[position]
            ));
        }
        out.push_str(&format!(
            "                    {} ->\n                        {} {}\n            )\n",
            number, unrecognized, number
        ));
        out
    }

    fn oneof_public(
        &self,
        current: &ModulePath,
        message: &LoweredMessage<'_>,
        oneof: &LoweredOneof<'_>,
    ) -> String {
        let oneof_names = self.names.oneof(&message.fqn, oneof.index);

        let mut out = format!("type {}\n", oneof_names.public);
        for (position, member) in oneof.members.iter().enumerate() {
            let lead = if position == 0 { '=' } else { '|' };
            out.push_str(&format!(
                "    {} {} {}\n",
                lead,
                oneof_names.public_ctors[position],
                paren(&self.member_type(current, &member.resolved.elem))
            ));
        }
        out
    }

    fn oneof_to_internal(
        &self,
        current: &ModulePath,
        message: &LoweredMessage<'_>,
        oneof: &LoweredOneof<'_>,
    ) -> String {
        let oneof_names = self.names.oneof(&message.fqn, oneof.index);
        let parent = &self.names.ty(&message.fqn).module;
        let mut locals = LocalNames::new();
        let value = locals.fresh("value");
        let inner = locals.fresh("inner");

        let mut out = format!(
            "{} : {} -> {}\n{} {} =\n    case {} of\n",
            oneof_names.to_internal,
            oneof_names.public,
            self.qualify(current, parent, &oneof_names.internal),
            oneof_names.to_internal,
            value,
            value
        );
        for (position, _) in oneof.members.iter().enumerate() {
            if position > 0 {
                out.push('\n');
            }
            out.push_str(&format!(
                "        {} {} ->\n            {} {}\n",
                oneof_names.public_ctors[position],
                inner,
                self.qualify(current, parent, &oneof_names.ctors[position]),
                inner
            ));
        }
        out
    }

    fn oneof_from_internal(
        &self,
        current: &ModulePath,
        message: &LoweredMessage<'_>,
        oneof: &LoweredOneof<'_>,
    ) -> String {
        let oneof_names = self.names.oneof(&message.fqn, oneof.index);
        let parent = &self.names.ty(&message.fqn).module;
        let mut locals = LocalNames::new();
        let value = locals.fresh("value");
        let inner = locals.fresh("inner");

        let mut out = format!(
            "{} : {} -> {}\n{} {} =\n    case {} of\n",
            oneof_names.from_internal,
            self.qualify(current, parent, &oneof_names.internal),
            oneof_names.public,
            oneof_names.from_internal,
            value,
            value
        );
        for (position, _) in oneof.members.iter().enumerate() {
            if position > 0 {
                out.push('\n');
            }
            out.push_str(&format!(
                "        {} {} ->\n            {} {}\n",
                self.qualify(current, parent, &oneof_names.ctors[position]),
                inner,
                oneof_names.public_ctors[position],
                inner
            ));
        }
        out
    }

    fn service_method(
        &self,
        current: &ModulePath,
        service: &LoweredService<'_>,
        index: usize,
    ) -> String {
        let service_names = self.names.service(&service.fqn);
        let binding = &service_names.methods[index];
        let method = &service.methods[index];
        let input = self.names.ty(&method.input);
        let output = self.names.ty(&method.output);

        format!(
            "{} : Grpc.Rpc {} {}\n{} =\n    Grpc.rpc\n        {{ service = \"{}\"\n        , method = \"{}\"\n        , requestStreaming = {}\n        , responseStreaming = {}\n        , encoder = {}\n        , decoder = {}\n        }}\n",
            binding,
            self.qualify(current, &input.module, &input.name),
            self.qualify(current, &output.module, &output.name),
            binding,
            service.fqn,
            method.descriptor.name(),
            bool_literal(method.descriptor.client_streaming()),
            bool_literal(method.descriptor.server_streaming()),
            self.qualify(current, &input.module, &input.encode),
            self.qualify(current, &output.module, &output.decode),
        )
    }

    fn qualify(&self, current: &ModulePath, target: &ModulePath, name: &str) -> String {
        if target == current {
            name.to_owned()
        } else {
            format!("{}.{}", target, name)
        }
    }

    /// The surface type of a record field, wrapper substituted on boxed
    /// message references.
    fn field_type(&self, current: &ModulePath, resolved: &ResolvedType) -> String {
        match &resolved.card {
            Cardinality::Singular(Presence::Implicit | Presence::Required) => {
                self.elem_type(current, &resolved.elem)
            }
            Cardinality::Singular(Presence::Optional) => {
                format!("Maybe {}", paren(&self.elem_type(current, &resolved.elem)))
            }
            Cardinality::Repeated => {
                format!("List {}", paren(&self.elem_type(current, &resolved.elem)))
            }
            Cardinality::Map { key, value } => {
                let value_type = match value {
                    Elem::Message { .. } => {
                        format!("Maybe {}", paren(&self.elem_type(current, value)))
                    }
                    _ => self.elem_type(current, value),
                };
                format!("Dict.Dict {} {}", key.elm_type(), paren(&value_type))
            }
        }
    }

    fn elem_type(&self, current: &ModulePath, elem: &Elem) -> String {
        match elem {
            Elem::Scalar(kind) => kind.elm_type().to_owned(),
            Elem::Enum(fqn) => {
                let ty = self.names.ty(fqn);
                self.qualify(current, &ty.module, &ty.name)
            }
            Elem::Message { fqn, boxed } => {
                let ty = self.names.ty(fqn);
                match (&ty.wrapper, boxed) {
                    (Some(wrapper), true) => self.qualify(current, &ty.module, &wrapper.name),
                    _ => self.qualify(current, &ty.module, &ty.name),
                }
            }
        }
    }

    /// The payload type of a oneof member. Boxed members take their
    /// indirection from the variant constructor and keep the plain type.
    fn member_type(&self, current: &ModulePath, elem: &Elem) -> String {
        match elem {
            Elem::Scalar(kind) => kind.elm_type().to_owned(),
            Elem::Enum(fqn) | Elem::Message { fqn, .. } => {
                let ty = self.names.ty(fqn);
                self.qualify(current, &ty.module, &ty.name)
            }
        }
    }

    fn elem_encoder(&self, current: &ModulePath, elem: &Elem) -> String {
        match elem {
            Elem::Scalar(kind) => kind.encode_call().to_owned(),
            Elem::Enum(fqn) | Elem::Message { fqn, boxed: false } => {
                let ty = self.names.ty(fqn);
                self.qualify(current, &ty.module, &ty.encode)
            }
            Elem::Message { fqn, boxed: true } => {
                let ty = self.names.ty(fqn);
                let wrapper = ty
                    .wrapper
                    .as_ref()
                    .expect("boxed references target wrapped messages");
                format!(
                    "({} >> {})",
                    self.qualify(current, &ty.module, &wrapper.unwrap),
                    self.qualify(current, &ty.module, &ty.encode)
                )
            }
        }
    }

    fn member_encoder(&self, current: &ModulePath, elem: &Elem) -> String {
        match elem {
            Elem::Scalar(kind) => kind.encode_call().to_owned(),
            Elem::Enum(fqn) | Elem::Message { fqn, .. } => {
                let ty = self.names.ty(fqn);
                self.qualify(current, &ty.module, &ty.encode)
            }
        }
    }

    fn map_value_encoder(&self, current: &ModulePath, value: &Elem) -> String {
        match value {
            Elem::Message { .. } => format!(
                "(Maybe.map {} >> Maybe.withDefault E.none)",
                self.elem_encoder(current, value)
            ),
            _ => self.elem_encoder(current, value),
        }
    }

    fn elem_decoder(&self, current: &ModulePath, elem: &Elem) -> String {
        match elem {
            Elem::Scalar(kind) => kind.decode_call().to_owned(),
            Elem::Enum(fqn) | Elem::Message { fqn, .. } => {
                let ty = self.names.ty(fqn);
                self.qualify(current, &ty.module, &ty.decode)
            }
        }
    }

    /// A decoder reference deferred behind `D.lazy`, for edges inside a
    /// reference cycle.
    fn lazy_decoder(&self, current: &ModulePath, fqn: &str) -> String {
        let ty = self.names.ty(fqn);
        format!(
            "(D.lazy (\\_ -> {}))",
            self.qualify(current, &ty.module, &ty.decode)
        )
    }

    fn wrap_ref(&self, current: &ModulePath, fqn: &str) -> String {
        let ty = self.names.ty(fqn);
        let wrapper = ty
            .wrapper
            .as_ref()
            .expect("boxed references target wrapped messages");
        self.qualify(current, &ty.module, &wrapper.wrap)
    }

    fn default_value(&self, current: &ModulePath, resolved: &ResolvedType) -> String {
        match &resolved.card {
            Cardinality::Singular(Presence::Optional) => "Nothing".to_owned(),
            Cardinality::Repeated => "[]".to_owned(),
            Cardinality::Map { .. } => "Dict.empty".to_owned(),
            Cardinality::Singular(Presence::Implicit | Presence::Required) => {
                self.elem_default(current, &resolved.elem)
            }
        }
    }

    fn elem_default(&self, current: &ModulePath, elem: &Elem) -> String {
        match elem {
            Elem::Scalar(kind) => kind.zero().to_owned(),
            Elem::Enum(fqn) => self.zero_variant_ref(current, fqn),
            Elem::Message { fqn, boxed } => {
                let ty = self.names.ty(fqn);
                let default_ = ty
                    .default_
                    .as_ref()
                    .expect("messages always have a default value name");
                let expr = self.qualify(current, &ty.module, default_);
                if *boxed {
                    format!("({} {})", self.wrap_ref(current, fqn), expr)
                } else {
                    expr
                }
            }
        }
    }

    fn zero_variant_ref(&self, current: &ModulePath, fqn: &str) -> String {
        let ty = self.names.ty(fqn);
        let entry = self
            .index
            .get(fqn)
            .expect("enum references are resolved during lowering");
        let variant = match entry.kind {
            TypeKind::Enum(enum_) => self.names.zero_variant(fqn, enum_),
            TypeKind::Message(_) => unreachable!("zero variants only exist for enums"),
        };
        self.qualify(current, &ty.module, variant)
    }
}

fn paren(expr: &str) -> String {
    if !expr.contains(' ') || (expr.starts_with('(') && expr.ends_with(')')) {
        expr.to_owned()
    } else {
        format!("({})", expr)
    }
}

fn bool_literal(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

#[cfg(test)]
mod tests;
