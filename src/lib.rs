//! A `protoc` plugin generating Elm sources from protobuf schemas.
//!
//! For every file named in the [`CodeGeneratorRequest`], the generator emits
//! one Elm module containing a record alias, an encoder, a decoder and an
//! all-defaults value per message, a custom type with codecs per enum, one
//! auxiliary module per oneof carrying its public wrapper union, and one
//! module per service carrying rpc bindings. The generated code targets the
//! `eriktim/elm-protocol-buffers` runtime, with `anmolitor/elm-grpc` for
//! service bindings.
//!
//! Generation is deterministic: the same request always produces
//! byte-identical output.
//!
//! # Example
//!
//! ```no_run
//! use prost::Message;
//! use prost_types::compiler::CodeGeneratorRequest;
//!
//! let bytes = std::fs::read("request.bin").unwrap();
//! let request = CodeGeneratorRequest::decode(bytes.as_slice()).unwrap();
//! let response = protoc_gen_elm::generate(&request);
//! for file in &response.file {
//!     println!("{}", file.name());
//! }
//! ```

#![warn(missing_debug_implementations, missing_docs)]
#![deny(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/protoc-gen-elm/0.3.0/")]

mod case;
mod cycle;
mod emit;
mod error;
mod index;
mod lower;
mod module;
mod name;
mod service;

#[cfg(test)]
mod support;

use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};

pub use crate::error::Error;

use crate::cycle::BoxingAnalysis;
use crate::emit::Emitter;
use crate::index::DescriptorIndex;
use crate::name::NameTable;

/// Runs the generator over a request, producing the response to write back
/// to `protoc`.
///
/// Errors are reported through the `error` field of the response, as the
/// plugin protocol requires; a response carrying an error has no files.
pub fn generate(request: &CodeGeneratorRequest) -> CodeGeneratorResponse {
    let mut response = CodeGeneratorResponse {
        supported_features: Some(Feature::Proto3Optional as u64),
        ..Default::default()
    };
    match generate_files(request) {
        Ok(files) => response.file = files,
        Err(err) => response.error = Some(err.to_string()),
    }
    response
}

/// Runs the generator over a request, returning the generated files or the
/// first error encountered.
///
/// Files are returned in a deterministic order: for each file to generate in
/// request order, its primary module, then one auxiliary module per oneof in
/// declaration order, then one module per service.
pub fn generate_files(request: &CodeGeneratorRequest) -> Result<Vec<File>, Error> {
    let index = DescriptorIndex::build(request)?;
    let boxing = BoxingAnalysis::run(&index);
    let wrappers = boxing.wrapper_targets(&index);
    let names = NameTable::build(&index, &wrappers)?;
    let emitter = Emitter::new(&index, &names);

    let mut files = Vec::new();
    for file in index.targets() {
        let lowered = lower::lower_file(&index, &boxing, file)?;
        let mut modules = module::build_modules(&names, &lowered);
        modules.extend(service::build_modules(&names, &lowered));
        for elm_module in &modules {
            files.push(File {
                name: Some(elm_module.path.to_file_path()),
                content: Some(emitter.render_module(elm_module)),
                ..Default::default()
            });
        }
    }
    Ok(files)
}
