//! Assignment of unique Elm identifiers to every generated declaration.
//!
//! Names are assigned for the whole descriptor closure up front, one scope
//! per generated module, so that cross-module references always agree on the
//! identifier a declaration ends up with. Collisions (case normalization
//! collapsing two source names, sibling nested types sharing a helper name)
//! are resolved by stable numeric suffixing in declaration order; exhausting
//! the suffix space is a fatal error, never silently dropped.

use std::collections::{BTreeSet, HashMap, HashSet};

use once_cell::sync::Lazy;
use prost_types::{DescriptorProto, EnumDescriptorProto};

use crate::case::{is_valid_ident, to_lower_camel_case, to_pascal_case};
use crate::error::{Error, ErrorKind};
use crate::index::{DescriptorIndex, ModulePath};
use crate::lower::is_oneof_member;

static ELM_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "if", "then", "else", "case", "of", "let", "in", "type", "module", "where", "import",
        "exposing", "as", "port",
    ])
});

/// Names assigned to one message or enum declaration.
#[derive(Debug)]
pub(crate) struct TypeNames {
    pub module: ModulePath,
    pub name: String,
    pub encode: String,
    pub decode: String,
    /// The all-defaults value emitted for messages, used as the decoder seed.
    pub default_: Option<String>,
    /// Present when the type is the target of a cyclic reference outside a
    /// oneof and needs a boxed wrapper.
    pub wrapper: Option<WrapperNames>,
    /// The fallback constructor preserving unknown numeric values; enums only.
    pub unrecognized: Option<String>,
}

#[derive(Debug)]
pub(crate) struct WrapperNames {
    pub name: String,
    pub ctor: String,
    pub wrap: String,
    pub unwrap: String,
}

/// Names assigned to one oneof declaration and its auxiliary module.
#[derive(Debug)]
pub(crate) struct OneofNames {
    /// Record label of the oneof in the owning message.
    pub field: String,
    /// Wire-matching union declared in the owning message's module.
    pub internal: String,
    /// Internal constructors, one per member in declaration order.
    pub ctors: Vec<String>,
    /// Encode helper mapping the active member to its tagged encoder.
    pub encode: String,
    pub aux_module: ModulePath,
    /// Public union declared in the auxiliary module.
    pub public: String,
    pub public_ctors: Vec<String>,
    pub to_internal: String,
    pub from_internal: String,
}

#[derive(Debug)]
pub(crate) struct ServiceNames {
    pub module: ModulePath,
    /// One binding name per method, in declaration order.
    pub methods: Vec<String>,
}

/// Final identifiers for every declaration in the closure.
#[derive(Debug)]
pub(crate) struct NameTable {
    types: HashMap<String, TypeNames>,
    fields: HashMap<(String, i32), String>,
    oneofs: HashMap<(String, usize), OneofNames>,
    variants: HashMap<String, Vec<String>>,
    services: HashMap<String, ServiceNames>,
}

impl NameTable {
    pub(crate) fn build(
        index: &DescriptorIndex<'_>,
        wrappers: &BTreeSet<String>,
    ) -> Result<Self, Error> {
        let mut table = NameTable {
            types: HashMap::new(),
            fields: HashMap::new(),
            oneofs: HashMap::new(),
            variants: HashMap::new(),
            services: HashMap::new(),
        };

        // Primary modules are claimed up front; oneof auxiliary and service
        // modules are claimed as they are named, so a path clash anywhere in
        // the generated tree is a hard error rather than a silent overwrite.
        let mut modules: HashSet<String> = index
            .files()
            .map(|file| ModulePath::for_file(file).to_string())
            .collect();

        for file in index.files() {
            let module = ModulePath::for_file(file);
            let mut scope = Scope::new(format!("module {}", module));

            let package = file.package().to_owned();
            for message in &file.message_type {
                table.name_message(
                    index,
                    wrappers,
                    &mut modules,
                    &module,
                    &mut scope,
                    &package,
                    message,
                )?;
            }
            for enum_ in &file.enum_type {
                table.name_enum(&module, &mut scope, &package, None, enum_)?;
            }
            for service in &file.service {
                table.name_service(&mut modules, &module, &package, service)?;
            }
        }

        Ok(table)
    }

    fn name_message(
        &mut self,
        index: &DescriptorIndex<'_>,
        wrappers: &BTreeSet<String>,
        modules: &mut HashSet<String>,
        module: &ModulePath,
        scope: &mut Scope,
        parent: &str,
        message: &DescriptorProto,
    ) -> Result<(), Error> {
        let fqn = join_fqn(parent, message.name());
        let entry = index.get(&fqn);
        if entry.map_or(false, |entry| entry.is_map_entry()) {
            return Ok(());
        }

        let base = entry.map_or_else(
            || to_pascal_case(message.name()),
            |entry| {
                entry
                    .nesting
                    .iter()
                    .map(|name| to_pascal_case(name))
                    .collect::<Vec<_>>()
                    .join("_")
            },
        );
        let name = scope.fresh_type(&base)?;
        let encode = scope.fresh_value(&format!("encode{}", name))?;
        let decode = scope.fresh_value(&format!("decode{}", name))?;
        let default_ = scope.fresh_value(&format!("default{}", name))?;

        let wrapper = if wrappers.contains(&fqn) {
            let wrapper_name = scope.fresh_type(&format!("{}Boxed", name))?;
            Some(WrapperNames {
                ctor: scope.fresh_ctor(&wrapper_name)?,
                wrap: scope.fresh_value(&format!("wrap{}", name))?,
                unwrap: scope.fresh_value(&format!("unwrap{}", name))?,
                name: wrapper_name,
            })
        } else {
            None
        };

        self.name_record_fields(modules, module, scope, &fqn, &name, message)?;

        let message_name = name.clone();
        self.types.insert(
            fqn.clone(),
            TypeNames {
                module: module.clone(),
                name,
                encode,
                decode,
                default_: Some(default_),
                wrapper,
                unrecognized: None,
            },
        );

        for nested in &message.nested_type {
            self.name_message(index, wrappers, modules, module, scope, &fqn, nested)?;
        }
        for enum_ in &message.enum_type {
            self.name_enum(module, scope, &fqn, Some(&message_name), enum_)?;
        }

        Ok(())
    }

    fn name_record_fields(
        &mut self,
        modules: &mut HashSet<String>,
        module: &ModulePath,
        scope: &mut Scope,
        fqn: &str,
        message_name: &str,
        message: &DescriptorProto,
    ) -> Result<(), Error> {
        let mut labels = Scope::new(format!("record {}", message_name));
        let mut oneof_seen = vec![false; message.oneof_decl.len()];

        for field in &message.field {
            if is_oneof_member(field) {
                let oneof_index = field.oneof_index() as usize;
                if oneof_seen
                    .get(oneof_index)
                    .copied()
                    .unwrap_or(true)
                {
                    continue;
                }
                oneof_seen[oneof_index] = true;

                let oneof = &message.oneof_decl[oneof_index];
                let label = labels.fresh_value(&to_lower_camel_case(oneof.name()))?;
                let internal =
                    scope.fresh_type(&format!("{}_{}", message_name, to_pascal_case(oneof.name())))?;
                let encode = scope.fresh_value(&format!("encode{}", internal))?;

                let members: Vec<_> = message
                    .field
                    .iter()
                    .filter(|f| is_oneof_member(f) && f.oneof_index() as usize == oneof_index)
                    .collect();
                let mut ctors = Vec::with_capacity(members.len());
                for member in &members {
                    ctors.push(
                        scope
                            .fresh_ctor(&format!("{}_{}", internal, to_pascal_case(member.name())))?,
                    );
                }

                let aux_module = module
                    .join(message_name.to_owned())
                    .join(to_pascal_case(oneof.name()));
                claim_module(modules, &aux_module)?;
                let mut aux_scope = Scope::new(format!("module {}", aux_module));
                let public = aux_scope.fresh_type(&to_pascal_case(oneof.name()))?;
                let mut public_ctors = Vec::with_capacity(members.len());
                for member in &members {
                    public_ctors.push(aux_scope.fresh_ctor(&to_pascal_case(member.name()))?);
                }
                let to_internal = aux_scope.fresh_value(&format!("toInternal{}", public))?;
                let from_internal = aux_scope.fresh_value(&format!("fromInternal{}", public))?;

                self.oneofs.insert(
                    (fqn.to_owned(), oneof_index),
                    OneofNames {
                        field: label,
                        internal,
                        ctors,
                        encode,
                        aux_module,
                        public,
                        public_ctors,
                        to_internal,
                        from_internal,
                    },
                );
            } else {
                let label = labels.fresh_value(&to_lower_camel_case(field.name()))?;
                self.fields.insert((fqn.to_owned(), field.number()), label);
            }
        }

        Ok(())
    }

    fn name_enum(
        &mut self,
        module: &ModulePath,
        scope: &mut Scope,
        parent: &str,
        enclosing: Option<&str>,
        enum_: &EnumDescriptorProto,
    ) -> Result<(), Error> {
        let fqn = join_fqn(parent, enum_.name());
        // Nested enums carry their enclosing message chain, matching the
        // message naming scheme.
        let base = match enclosing {
            Some(message_name) => format!("{}_{}", message_name, to_pascal_case(enum_.name())),
            None => to_pascal_case(enum_.name()),
        };
        let name = scope.fresh_type(&base)?;
        let encode = scope.fresh_value(&format!("encode{}", name))?;
        let decode = scope.fresh_value(&format!("decode{}", name))?;
        let unrecognized = scope.fresh_ctor(&format!("{}Unrecognized_", name))?;

        let mut variants = Vec::with_capacity(enum_.value.len());
        for value in &enum_.value {
            variants.push(scope.fresh_ctor(&to_pascal_case(value.name()))?);
        }

        self.variants.insert(fqn.clone(), variants);
        self.types.insert(
            fqn,
            TypeNames {
                module: module.clone(),
                name,
                encode,
                decode,
                default_: None,
                wrapper: None,
                unrecognized: Some(unrecognized),
            },
        );
        Ok(())
    }

    fn name_service(
        &mut self,
        modules: &mut HashSet<String>,
        module: &ModulePath,
        package: &str,
        service: &prost_types::ServiceDescriptorProto,
    ) -> Result<(), Error> {
        let fqn = join_fqn(package, service.name());
        let service_module = module.join(to_pascal_case(service.name()));
        claim_module(modules, &service_module)?;
        let mut scope = Scope::new(format!("module {}", service_module));

        let mut methods = Vec::with_capacity(service.method.len());
        for method in &service.method {
            methods.push(scope.fresh_value(&to_lower_camel_case(method.name()))?);
        }

        self.services.insert(
            fqn,
            ServiceNames {
                module: service_module,
                methods,
            },
        );
        Ok(())
    }

    pub(crate) fn ty(&self, fqn: &str) -> &TypeNames {
        &self.types[fqn]
    }

    pub(crate) fn field(&self, fqn: &str, number: i32) -> &str {
        &self.fields[&(fqn.to_owned(), number)]
    }

    pub(crate) fn oneof(&self, fqn: &str, index: usize) -> &OneofNames {
        &self.oneofs[&(fqn.to_owned(), index)]
    }

    pub(crate) fn variants(&self, fqn: &str) -> &[String] {
        &self.variants[fqn]
    }

    /// The variant used when a field of this enum type is missing on the
    /// wire: the canonical label of numeric value zero, or the first
    /// declared label.
    pub(crate) fn zero_variant(&self, fqn: &str, enum_: &EnumDescriptorProto) -> &str {
        let variants = self.variants(fqn);
        let position = enum_
            .value
            .iter()
            .position(|value| value.number() == 0)
            .unwrap_or(0);
        &variants[position]
    }

    pub(crate) fn service(&self, fqn: &str) -> &ServiceNames {
        &self.services[fqn]
    }
}

/// One emission scope: Elm separates type names, constructor names and value
/// names into distinct namespaces, each tracked independently.
#[derive(Debug)]
struct Scope {
    description: String,
    types: HashSet<String>,
    ctors: HashSet<String>,
    values: HashSet<String>,
}

impl Scope {
    fn new(description: String) -> Self {
        Scope {
            description,
            types: HashSet::new(),
            ctors: HashSet::new(),
            values: HashSet::new(),
        }
    }

    fn fresh_type(&mut self, base: &str) -> Result<String, Error> {
        let base = sanitize_upper(base);
        fresh(&mut self.types, &self.description, &base)
    }

    fn fresh_ctor(&mut self, base: &str) -> Result<String, Error> {
        let base = sanitize_upper(base);
        fresh(&mut self.ctors, &self.description, &base)
    }

    fn fresh_value(&mut self, base: &str) -> Result<String, Error> {
        let base = sanitize_lower(base);
        fresh(&mut self.values, &self.description, &base)
    }
}

fn fresh(taken: &mut HashSet<String>, scope: &str, base: &str) -> Result<String, Error> {
    if taken.insert(base.to_owned()) {
        return Ok(base.to_owned());
    }
    for suffix in 1..1000 {
        let candidate = format!("{}{}", base, suffix);
        if taken.insert(candidate.clone()) {
            return Ok(candidate);
        }
    }
    Err(Error::from_kind(ErrorKind::NameCollision {
        scope: scope.to_owned(),
        name: base.to_owned(),
    }))
}

/// Claims a generated module path, failing when another module already owns
/// it.
fn claim_module(modules: &mut HashSet<String>, path: &ModulePath) -> Result<(), Error> {
    if modules.insert(path.to_string()) {
        Ok(())
    } else {
        Err(Error::from_kind(ErrorKind::NameCollision {
            scope: "the generated module tree".to_owned(),
            name: path.to_string(),
        }))
    }
}

fn sanitize_upper(base: &str) -> String {
    let base = base.trim_start_matches('_');
    if is_valid_ident(base) {
        base.to_owned()
    } else {
        format!("X{}", base)
    }
}

fn sanitize_lower(base: &str) -> String {
    if ELM_KEYWORDS.contains(base) {
        format!("{}_", base)
    } else if is_valid_ident(base) {
        base.to_owned()
    } else {
        format!("x{}", base)
    }
}

/// Fresh local binding names for codec lambdas, guaranteed not to collide
/// with Elm keywords or each other within one declaration.
#[derive(Debug)]
pub(crate) struct LocalNames {
    used: HashSet<String>,
}

impl LocalNames {
    pub(crate) fn new() -> Self {
        LocalNames {
            used: HashSet::new(),
        }
    }

    pub(crate) fn fresh(&mut self, base: &str) -> String {
        let base = sanitize_lower(base);
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut suffix = 1u32;
        loop {
            let candidate = format!("{}{}", base, suffix);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

fn join_fqn(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_owned()
    } else {
        format!("{}.{}", scope, name)
    }
}
