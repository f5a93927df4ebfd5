use std::io::{self, Read, Write};

use miette::{IntoDiagnostic, Result};
use prost::Message;
use prost_types::compiler::CodeGeneratorRequest;

pub fn main() -> Result<()> {
    miette::set_panic_hook();

    let mut input = Vec::new();
    io::stdin().read_to_end(&mut input).into_diagnostic()?;

    let request = CodeGeneratorRequest::decode(input.as_slice()).into_diagnostic()?;
    let response = protoc_gen_elm::generate(&request);

    let mut output = Vec::with_capacity(response.encoded_len());
    response.encode(&mut output).into_diagnostic()?;
    io::stdout().write_all(&output).into_diagnostic()?;
    Ok(())
}
