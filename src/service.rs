//! Lowering of service declarations into rpc binding modules.
//!
//! Each service becomes one module next to its file's primary module,
//! carrying one `Grpc.rpc` binding per method. The bindings only reference
//! the request and response codecs, so a service module never needs its
//! file's primary module unless a method type lives there.

use std::collections::BTreeSet;

use prost_types::{FileDescriptorProto, MethodDescriptorProto, ServiceDescriptorProto};

use crate::error::{Error, ErrorKind};
use crate::index::{DescriptorIndex, TypeKind};
use crate::lower::LoweredFile;
use crate::module::{Decl, ElmModule};
use crate::name::NameTable;

#[derive(Debug)]
pub(crate) struct LoweredService<'a> {
    pub descriptor: &'a ServiceDescriptorProto,
    /// Fully-qualified service name, used verbatim in the rpc route.
    pub fqn: String,
    pub methods: Vec<LoweredMethod<'a>>,
}

#[derive(Debug)]
pub(crate) struct LoweredMethod<'a> {
    pub descriptor: &'a MethodDescriptorProto,
    /// Fully-qualified name of the request message.
    pub input: String,
    /// Fully-qualified name of the response message.
    pub output: String,
}

pub(crate) fn lower_service<'a>(
    index: &DescriptorIndex<'a>,
    file: &'a FileDescriptorProto,
    service: &'a ServiceDescriptorProto,
) -> Result<LoweredService<'a>, Error> {
    let fqn = if file.package().is_empty() {
        service.name().to_owned()
    } else {
        format!("{}.{}", file.package(), service.name())
    };

    let mut methods = Vec::with_capacity(service.method.len());
    for method in &service.method {
        methods.push(LoweredMethod {
            descriptor: method,
            input: resolve_message(index, file, method, method.input_type())?,
            output: resolve_message(index, file, method, method.output_type())?,
        });
    }

    Ok(LoweredService {
        descriptor: service,
        fqn,
        methods,
    })
}

fn resolve_message(
    index: &DescriptorIndex<'_>,
    file: &FileDescriptorProto,
    method: &MethodDescriptorProto,
    type_name: &str,
) -> Result<String, Error> {
    match index.resolve(file.package(), type_name) {
        Some(entry) if matches!(entry.kind, TypeKind::Message(_)) && !entry.is_map_entry() => {
            Ok(entry.fqn.clone())
        }
        _ => Err(Error::from_kind(ErrorKind::UnresolvedReference {
            field: format!("method '{}'", method.name()),
            type_name: type_name.to_owned(),
            file: file.name().to_owned(),
        })),
    }
}

/// Builds the rpc binding modules of one file, one per service.
pub(crate) fn build_modules<'a>(
    names: &NameTable,
    lowered: &'a LoweredFile<'a>,
) -> Vec<ElmModule<'a>> {
    let mut modules = Vec::new();
    for service in &lowered.services {
        let service_names = names.service(&service.fqn);

        let mut imports = BTreeSet::new();
        imports.insert("import Grpc".to_owned());
        for method in &service.methods {
            imports.insert(format!("import {}", names.ty(&method.input).module));
            imports.insert(format!("import {}", names.ty(&method.output).module));
        }

        let decls = (0..service.methods.len())
            .map(|index| Decl::ServiceMethod { service, index })
            .collect();

        modules.push(ElmModule {
            path: service_names.module.clone(),
            imports,
            exposing: service_names.methods.clone(),
            decls,
        });
    }
    modules
}
