//! Grouping of lowered declarations into output modules.
//!
//! Each input file produces one primary module, plus one auxiliary module per
//! oneof carrying the public wrapper union. The auxiliary module imports the
//! primary module, never the reverse, so a message and its own oneof helpers
//! cannot form an Elm import cycle. Import lists are minimal and derived from
//! the references each module actually makes.

use std::collections::{BTreeSet, HashMap};

use crate::index::ModulePath;
use crate::lower::{
    Cardinality, Elem, LoweredEnum, LoweredFile, LoweredMessage, LoweredOneof, MessageItem,
    Presence, ResolvedType, ScalarKind,
};
use crate::name::NameTable;
use crate::service::LoweredService;

/// A declaration scheduled for emission. Rendering these is purely
/// mechanical; all ordering and naming decisions happen before emission.
#[derive(Debug)]
pub(crate) enum Decl<'a> {
    MessageAlias(&'a LoweredMessage<'a>),
    OneofInternal {
        message: &'a LoweredMessage<'a>,
        oneof: &'a LoweredOneof<'a>,
    },
    BoxWrapper {
        fqn: &'a str,
    },
    EnumUnion(&'a LoweredEnum<'a>),
    MessageDefault(&'a LoweredMessage<'a>),
    MessageEncode(&'a LoweredMessage<'a>),
    OneofEncode {
        message: &'a LoweredMessage<'a>,
        oneof: &'a LoweredOneof<'a>,
    },
    EnumEncode(&'a LoweredEnum<'a>),
    MessageDecode(&'a LoweredMessage<'a>),
    EnumDecode(&'a LoweredEnum<'a>),
    OneofPublic {
        message: &'a LoweredMessage<'a>,
        oneof: &'a LoweredOneof<'a>,
    },
    OneofToInternal {
        message: &'a LoweredMessage<'a>,
        oneof: &'a LoweredOneof<'a>,
    },
    OneofFromInternal {
        message: &'a LoweredMessage<'a>,
        oneof: &'a LoweredOneof<'a>,
    },
    ServiceMethod {
        service: &'a LoweredService<'a>,
        index: usize,
    },
}

#[derive(Debug)]
pub(crate) struct ElmModule<'a> {
    pub path: ModulePath,
    pub imports: BTreeSet<String>,
    pub exposing: Vec<String>,
    pub decls: Vec<Decl<'a>>,
}

/// Builds the primary module and the oneof auxiliary modules of one file.
/// Service modules are built separately by the service binding generator.
pub(crate) fn build_modules<'a>(
    names: &NameTable,
    lowered: &'a LoweredFile<'a>,
) -> Vec<ElmModule<'a>> {
    let mut modules = Vec::new();
    modules.push(build_primary(names, lowered));

    for message in &lowered.messages {
        for item in &message.items {
            if let MessageItem::Oneof(oneof) = item {
                modules.push(build_aux(names, lowered, message, oneof));
            }
        }
    }

    modules
}

fn build_primary<'a>(names: &NameTable, lowered: &'a LoweredFile<'a>) -> ElmModule<'a> {
    let mut types = Vec::new();
    for message in &lowered.messages {
        types.push(Decl::MessageAlias(message));
        for item in &message.items {
            if let MessageItem::Oneof(oneof) = item {
                types.push(Decl::OneofInternal { message, oneof });
            }
        }
        if names.ty(&message.fqn).wrapper.is_some() {
            types.push(Decl::BoxWrapper { fqn: &message.fqn });
        }
    }
    for enum_ in &lowered.enums {
        types.push(Decl::EnumUnion(enum_));
    }

    let types = sort_types(types);

    let mut decls = types;
    for message in &lowered.messages {
        decls.push(Decl::MessageDefault(message));
    }
    for message in &lowered.messages {
        decls.push(Decl::MessageEncode(message));
        for item in &message.items {
            if let MessageItem::Oneof(oneof) = item {
                decls.push(Decl::OneofEncode { message, oneof });
            }
        }
    }
    for enum_ in &lowered.enums {
        decls.push(Decl::EnumEncode(enum_));
    }
    for message in &lowered.messages {
        decls.push(Decl::MessageDecode(message));
    }
    for enum_ in &lowered.enums {
        decls.push(Decl::EnumDecode(enum_));
    }

    let imports = primary_imports(names, lowered);
    let exposing = exposing_list(names, &decls);

    ElmModule {
        path: lowered.module.clone(),
        imports,
        exposing,
        decls,
    }
}

fn build_aux<'a>(
    names: &NameTable,
    lowered: &'a LoweredFile<'a>,
    message: &'a LoweredMessage<'a>,
    oneof: &'a LoweredOneof<'a>,
) -> ElmModule<'a> {
    let oneof_names = names.oneof(&message.fqn, oneof.index);

    let mut imports = BTreeSet::new();
    imports.insert(format!("import {}", lowered.module));
    for member in &oneof.members {
        match &member.resolved.elem {
            Elem::Scalar(kind) => scalar_type_import(*kind, &mut imports),
            Elem::Enum(fqn) | Elem::Message { fqn, .. } => {
                let target = names.ty(fqn);
                if target.module != oneof_names.aux_module {
                    imports.insert(format!("import {}", target.module));
                }
            }
        }
    }

    let exposing = vec![
        format!("{}(..)", oneof_names.public),
        oneof_names.from_internal.clone(),
        oneof_names.to_internal.clone(),
    ];

    ElmModule {
        path: oneof_names.aux_module.clone(),
        imports,
        exposing,
        decls: vec![
            Decl::OneofPublic { message, oneof },
            Decl::OneofToInternal { message, oneof },
            Decl::OneofFromInternal { message, oneof },
        ],
    }
}

/// Keys identifying the type declarations of one module, for dependency
/// ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DeclKey<'a> {
    Type(&'a str),
    Oneof(&'a str, usize),
    Wrapper(&'a str),
}

fn decl_key<'a>(decl: &Decl<'a>) -> DeclKey<'a> {
    match decl {
        Decl::MessageAlias(message) => DeclKey::Type(&message.fqn),
        Decl::OneofInternal { message, oneof } => DeclKey::Oneof(&message.fqn, oneof.index),
        Decl::BoxWrapper { fqn } => DeclKey::Wrapper(fqn),
        Decl::EnumUnion(enum_) => DeclKey::Type(&enum_.fqn),
        _ => unreachable!("only type declarations are sorted"),
    }
}

fn decl_deps<'a>(decl: &Decl<'a>) -> Vec<DeclKey<'a>> {
    let mut deps = Vec::new();
    match decl {
        Decl::MessageAlias(message) => {
            for item in &message.items {
                match item {
                    MessageItem::Field(field) => resolved_deps(&field.resolved, &mut deps),
                    MessageItem::Oneof(oneof) => {
                        deps.push(DeclKey::Oneof(&message.fqn, oneof.index))
                    }
                }
            }
        }
        Decl::OneofInternal { oneof, .. } => {
            for member in &oneof.members {
                // Boxed members get their indirection from the variant
                // constructor; that edge is the deferred one.
                match &member.resolved.elem {
                    Elem::Message { fqn, boxed: false } => deps.push(DeclKey::Type(fqn)),
                    Elem::Enum(fqn) => deps.push(DeclKey::Type(fqn)),
                    Elem::Message { boxed: true, .. } | Elem::Scalar(_) => {}
                }
            }
        }
        // The wrapper's reference to the wrapped type is the cycle-breaking
        // edge and is excluded from ordering.
        Decl::BoxWrapper { .. } | Decl::EnumUnion(_) => {}
        _ => unreachable!("only type declarations are sorted"),
    }
    deps
}

fn resolved_deps<'a>(resolved: &'a ResolvedType, deps: &mut Vec<DeclKey<'a>>) {
    let mut elem_dep = |elem: &'a Elem| match elem {
        Elem::Message { fqn, boxed: true } => deps.push(DeclKey::Wrapper(fqn)),
        Elem::Message { fqn, boxed: false } => deps.push(DeclKey::Type(fqn)),
        Elem::Enum(fqn) => deps.push(DeclKey::Type(fqn)),
        Elem::Scalar(_) => {}
    };
    match &resolved.card {
        Cardinality::Map { value, .. } => elem_dep(value),
        Cardinality::Singular(_) | Cardinality::Repeated => elem_dep(&resolved.elem),
    }
}

/// Orders type declarations so every type is declared after the types it
/// structurally contains, with declaration order as a stable tie-break.
/// Boxed edges are excluded, so the graph is acyclic by construction.
fn sort_types<'a>(decls: Vec<Decl<'a>>) -> Vec<Decl<'a>> {
    let positions: HashMap<DeclKey, usize> = decls
        .iter()
        .enumerate()
        .map(|(position, decl)| (decl_key(decl), position))
        .collect();

    let mut indegree = vec![0usize; decls.len()];
    let mut dependents = vec![Vec::new(); decls.len()];
    for (position, decl) in decls.iter().enumerate() {
        for dep in decl_deps(decl) {
            // References to other modules do not constrain local ordering.
            if let Some(&dep_position) = positions.get(&dep) {
                if dep_position != position {
                    indegree[position] += 1;
                    dependents[dep_position].push(position);
                }
            }
        }
    }

    let mut order = Vec::with_capacity(decls.len());
    let mut emitted = vec![false; decls.len()];
    loop {
        let next = (0..decls.len()).find(|&i| !emitted[i] && indegree[i] == 0);
        let next = match next {
            Some(next) => next,
            None => break,
        };
        emitted[next] = true;
        order.push(next);
        for &dependent in &dependents[next] {
            indegree[dependent] -= 1;
        }
    }
    // Anything left would be an unboxed cycle; keep declaration order.
    for i in 0..decls.len() {
        if !emitted[i] {
            order.push(i);
        }
    }

    let mut slots: Vec<Option<Decl>> = decls.into_iter().map(Some).collect();
    order
        .into_iter()
        .map(|i| slots[i].take().expect("each declaration is emitted once"))
        .collect()
}

fn exposing_list(names: &NameTable, decls: &[Decl<'_>]) -> Vec<String> {
    let mut exposing = Vec::new();
    for decl in decls {
        match decl {
            Decl::MessageAlias(message) => exposing.push(names.ty(&message.fqn).name.clone()),
            Decl::OneofInternal { message, oneof } => exposing.push(format!(
                "{}(..)",
                names.oneof(&message.fqn, oneof.index).internal
            )),
            Decl::BoxWrapper { fqn } => {
                let wrapper = names
                    .ty(fqn)
                    .wrapper
                    .as_ref()
                    .expect("wrapper declarations have wrapper names");
                exposing.push(format!("{}(..)", wrapper.name));
                exposing.push(wrapper.wrap.clone());
                exposing.push(wrapper.unwrap.clone());
            }
            Decl::EnumUnion(enum_) => {
                exposing.push(format!("{}(..)", names.ty(&enum_.fqn).name))
            }
            Decl::MessageDefault(message) => {
                let ty = names.ty(&message.fqn);
                exposing.push(
                    ty.default_
                        .clone()
                        .expect("messages always have a default value name"),
                );
            }
            Decl::MessageEncode(message) => {
                exposing.push(names.ty(&message.fqn).encode.clone())
            }
            Decl::MessageDecode(message) => {
                exposing.push(names.ty(&message.fqn).decode.clone())
            }
            Decl::EnumEncode(enum_) => exposing.push(names.ty(&enum_.fqn).encode.clone()),
            Decl::EnumDecode(enum_) => exposing.push(names.ty(&enum_.fqn).decode.clone()),
            // Oneof encode helpers are module-internal.
            Decl::OneofEncode { .. } => {}
            Decl::OneofPublic { .. }
            | Decl::OneofToInternal { .. }
            | Decl::OneofFromInternal { .. }
            | Decl::ServiceMethod { .. } => {}
        }
    }
    exposing
}

fn primary_imports(names: &NameTable, lowered: &LoweredFile<'_>) -> BTreeSet<String> {
    let mut imports = BTreeSet::new();
    if !lowered.messages.is_empty() || !lowered.enums.is_empty() {
        imports.insert("import Protobuf.Decode as D".to_owned());
        imports.insert("import Protobuf.Encode as E".to_owned());
    }

    for message in &lowered.messages {
        for item in &message.items {
            match item {
                MessageItem::Field(field) => {
                    scan_resolved(&field.resolved, &lowered.module, names, &mut imports)
                }
                MessageItem::Oneof(oneof) => {
                    for member in &oneof.members {
                        scan_resolved(&member.resolved, &lowered.module, names, &mut imports);
                    }
                }
            }
        }
    }

    imports
}

fn scan_resolved(
    resolved: &ResolvedType,
    current: &ModulePath,
    names: &NameTable,
    imports: &mut BTreeSet<String>,
) {
    if matches!(&resolved.card, Cardinality::Map { .. }) {
        imports.insert("import Dict".to_owned());
    }

    let mut scan_elem = |elem: &Elem, needs_zero: bool| match elem {
        Elem::Scalar(kind) => {
            scalar_type_import(*kind, imports);
            if needs_zero && *kind == ScalarKind::Bytes {
                imports.insert("import Bytes.Encode as BE".to_owned());
            }
        }
        Elem::Enum(fqn) | Elem::Message { fqn, .. } => {
            let target = names.ty(fqn);
            if &target.module != current {
                imports.insert(format!("import {}", target.module));
            }
        }
    };

    match &resolved.card {
        Cardinality::Singular(presence) => {
            let needs_zero = matches!(presence, Presence::Implicit | Presence::Required);
            scan_elem(&resolved.elem, needs_zero);
        }
        Cardinality::Repeated => scan_elem(&resolved.elem, false),
        Cardinality::Map { key, value } => {
            // The decoder needs a default entry pair.
            scan_elem(&Elem::Scalar(*key), true);
            scan_elem(value, !matches!(value, Elem::Message { .. }));
        }
    }
}

fn scalar_type_import(kind: ScalarKind, imports: &mut BTreeSet<String>) {
    if kind.uses_int64() {
        imports.insert("import Protobuf.Types.Int64 as Int64 exposing (Int64)".to_owned());
    }
    if kind == ScalarKind::Bytes {
        imports.insert("import Bytes exposing (Bytes)".to_owned());
    }
}
