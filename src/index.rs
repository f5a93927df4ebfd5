//! A resolved view of every file, message and enum in a `CodeGeneratorRequest`.
//!
//! The index is built once per invocation and is read-only afterwards. It is
//! passed explicitly through every later pass, so repeated invocations cannot
//! interfere with each other.

use std::collections::HashMap;
use std::fmt;

use prost_types::compiler::CodeGeneratorRequest;
use prost_types::{DescriptorProto, EnumDescriptorProto, FileDescriptorProto};

use crate::case::to_pascal_case;
use crate::error::{Error, ErrorKind};

/// The dot-separated path of a generated Elm module, e.g. `Proto.Some.Nested`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct ModulePath {
    segments: Vec<String>,
}

impl ModulePath {
    pub(crate) fn new(segments: Vec<String>) -> Self {
        ModulePath { segments }
    }

    /// Derives the module path for a schema file from its package and path.
    ///
    /// The path is `Proto`, followed by the pascal-cased package segments,
    /// followed by the pascal-cased file stem. Files sharing a package come
    /// out as sibling modules; files in different packages end up in disjoint
    /// module trees.
    pub(crate) fn for_file(file: &FileDescriptorProto) -> Self {
        let mut segments = vec!["Proto".to_owned()];
        for segment in file.package().split('.') {
            if !segment.is_empty() {
                segments.push(to_pascal_case(segment));
            }
        }

        let name = file.name();
        let stem = name
            .rsplit('/')
            .next()
            .unwrap_or(name)
            .trim_end_matches(".proto");
        segments.push(to_pascal_case(stem));

        ModulePath { segments }
    }

    pub(crate) fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        ModulePath { segments }
    }

    /// The file name the module is written to, e.g. `Proto/Some/Nested.elm`.
    pub(crate) fn to_file_path(&self) -> String {
        format!("{}.elm", self.segments.join("/"))
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

#[derive(Debug)]
pub(crate) enum TypeKind<'a> {
    Message(&'a DescriptorProto),
    Enum(&'a EnumDescriptorProto),
}

/// A message or enum declaration somewhere in the descriptor closure.
#[derive(Debug)]
pub(crate) struct TypeEntry<'a> {
    /// Name of the file declaring this type.
    pub file: &'a str,
    /// The module the type will be emitted into.
    pub module: ModulePath,
    /// Fully-qualified proto name, without the leading dot.
    pub fqn: String,
    /// Chain of declaration names, outermost enclosing message first.
    pub nesting: Vec<String>,
    pub kind: TypeKind<'a>,
}

impl<'a> TypeEntry<'a> {
    pub(crate) fn message(&self) -> Option<&'a DescriptorProto> {
        match self.kind {
            TypeKind::Message(message) => Some(message),
            TypeKind::Enum(_) => None,
        }
    }

    /// Whether this is the synthetic two-field entry message of a map field.
    pub(crate) fn is_map_entry(&self) -> bool {
        match self.kind {
            TypeKind::Message(message) => message
                .options
                .as_ref()
                .map_or(false, |options| options.map_entry()),
            TypeKind::Enum(_) => false,
        }
    }
}

/// Queryable view of the full descriptor closure of one invocation.
pub(crate) struct DescriptorIndex<'a> {
    files: Vec<&'a FileDescriptorProto>,
    files_by_name: HashMap<&'a str, usize>,
    types: HashMap<String, TypeEntry<'a>>,
    /// Fully-qualified names in registration order, for deterministic walks.
    type_order: Vec<String>,
    targets: Vec<&'a str>,
}

impl<'a> DescriptorIndex<'a> {
    /// Builds the index, running the structural checks on the request:
    /// duplicate type names, duplicate field numbers, unknown generation
    /// targets, missing imports and import cycles are all fatal.
    pub(crate) fn build(request: &'a CodeGeneratorRequest) -> Result<Self, Error> {
        let mut index = DescriptorIndex {
            files: Vec::new(),
            files_by_name: HashMap::new(),
            types: HashMap::new(),
            type_order: Vec::new(),
            targets: Vec::new(),
        };

        let mut modules: HashMap<ModulePath, &str> = HashMap::new();
        for file in &request.proto_file {
            let name = file.name();
            if name.is_empty() {
                return Err(Error::malformed("file descriptor without a name"));
            }
            if index.files_by_name.contains_key(name) {
                return Err(Error::malformed(format!(
                    "file '{}' appears twice in the request",
                    name
                )));
            }

            let module = ModulePath::for_file(file);
            if let Some(other) = modules.insert(module.clone(), name) {
                return Err(Error::from_kind(ErrorKind::NameCollision {
                    scope: "the generated module tree".to_owned(),
                    name: format!("{} (from '{}' and '{}')", module, other, name),
                }));
            }

            index.files_by_name.insert(name, index.files.len());
            index.files.push(file);

            let package = file.package().to_owned();
            for message in &file.message_type {
                index.register_message(name, &module, &package, &[], message)?;
            }
            for enum_ in &file.enum_type {
                index.register_enum(name, &module, &package, &[], enum_)?;
            }
        }

        for target in &request.file_to_generate {
            match index.files_by_name.get(target.as_str()) {
                Some(&idx) => index.targets.push(index.files[idx].name()),
                None => {
                    return Err(Error::malformed(format!(
                        "file to generate '{}' is not in the request",
                        target
                    )))
                }
            }
        }

        index.check_imports()?;

        Ok(index)
    }

    fn register_message(
        &mut self,
        file: &'a str,
        module: &ModulePath,
        scope: &str,
        parents: &[String],
        message: &'a DescriptorProto,
    ) -> Result<(), Error> {
        let fqn = join_fqn(scope, message.name());
        let mut nesting = parents.to_vec();
        nesting.push(message.name().to_owned());

        let mut numbers = HashMap::new();
        for field in &message.field {
            if let Some(previous) = numbers.insert(field.number(), field.name()) {
                return Err(Error::malformed(format!(
                    "fields '{}' and '{}' of message '{}' share field number {}",
                    previous,
                    field.name(),
                    fqn,
                    field.number()
                )));
            }
        }

        for nested in &message.nested_type {
            self.register_message(file, module, &fqn, &nesting, nested)?;
        }
        for enum_ in &message.enum_type {
            self.register_enum(file, module, &fqn, &nesting, enum_)?;
        }

        self.insert_type(TypeEntry {
            file,
            module: module.clone(),
            fqn,
            nesting,
            kind: TypeKind::Message(message),
        })
    }

    fn register_enum(
        &mut self,
        file: &'a str,
        module: &ModulePath,
        scope: &str,
        parents: &[String],
        enum_: &'a EnumDescriptorProto,
    ) -> Result<(), Error> {
        let fqn = join_fqn(scope, enum_.name());
        let mut nesting = parents.to_vec();
        nesting.push(enum_.name().to_owned());

        self.insert_type(TypeEntry {
            file,
            module: module.clone(),
            fqn,
            nesting,
            kind: TypeKind::Enum(enum_),
        })
    }

    fn insert_type(&mut self, entry: TypeEntry<'a>) -> Result<(), Error> {
        let fqn = entry.fqn.clone();
        if self.types.insert(fqn.clone(), entry).is_some() {
            return Err(Error::malformed(format!(
                "type '{}' is declared more than once",
                fqn
            )));
        }
        self.type_order.push(fqn);
        Ok(())
    }

    fn check_imports(&self) -> Result<(), Error> {
        // Colors: 0 unvisited, 1 on stack, 2 done.
        fn visit(
            index: &DescriptorIndex<'_>,
            name: &str,
            colors: &mut HashMap<String, u8>,
        ) -> Result<(), Error> {
            match colors.get(name) {
                Some(1) => {
                    return Err(Error::malformed(format!(
                        "import cycle through '{}'",
                        name
                    )))
                }
                Some(2) => return Ok(()),
                _ => {}
            }
            colors.insert(name.to_owned(), 1);
            let file = index.file(name).ok_or_else(|| {
                Error::malformed(format!("imported file '{}' is not in the request", name))
            })?;
            for dependency in &file.dependency {
                visit(index, dependency, colors)?;
            }
            colors.insert(name.to_owned(), 2);
            Ok(())
        }

        let mut colors = HashMap::new();
        for file in &self.files {
            visit(self, file.name(), &mut colors)?;
        }
        Ok(())
    }

    /// All files in the closure, in request order.
    pub(crate) fn files(&self) -> impl Iterator<Item = &'a FileDescriptorProto> + '_ {
        self.files.iter().copied()
    }

    pub(crate) fn file(&self, name: &str) -> Option<&'a FileDescriptorProto> {
        self.files_by_name.get(name).map(|&idx| self.files[idx])
    }

    /// The files targeted for generation, in request order.
    pub(crate) fn targets(&self) -> impl Iterator<Item = &'a FileDescriptorProto> + '_ {
        self.targets.iter().map(move |name| {
            self.file(name)
                .expect("targets are checked during index construction")
        })
    }

    pub(crate) fn get(&self, fqn: &str) -> Option<&TypeEntry<'a>> {
        self.types.get(fqn)
    }

    /// All message and enum entries in deterministic registration order.
    pub(crate) fn entries(&self) -> impl Iterator<Item = &TypeEntry<'a>> {
        self.type_order.iter().map(move |fqn| &self.types[fqn])
    }

    /// Resolves a type name as written in a field descriptor.
    ///
    /// A leading dot marks the name as fully qualified. Relative names are
    /// looked up by walking the enclosing scopes outwards, innermost first,
    /// matching protobuf resolution rules.
    pub(crate) fn resolve(&self, scope: &str, name: &str) -> Option<&TypeEntry<'a>> {
        if let Some(absolute) = name.strip_prefix('.') {
            return self.types.get(absolute);
        }

        let mut scope = scope;
        loop {
            let candidate = join_fqn(scope, name);
            if let Some(entry) = self.types.get(&candidate) {
                return Some(entry);
            }
            match scope.rfind('.') {
                Some(idx) => scope = &scope[..idx],
                None if !scope.is_empty() => scope = "",
                None => return None,
            }
        }
    }
}

impl fmt::Debug for DescriptorIndex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorIndex")
            .field("files", &self.files.len())
            .field("types", &self.type_order)
            .field("targets", &self.targets)
            .finish()
    }
}

fn join_fqn(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_owned()
    } else {
        format!("{}.{}", scope, name)
    }
}
