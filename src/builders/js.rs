//! Script minification with oxc.

use super::TransformError;
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;

/// Compress a script without renaming its bindings.
///
/// The result always ends with `;` so independently minified scripts can be
/// concatenated safely.
pub fn minify(source: &str, filename: &str) -> Result<String, TransformError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();

    if ret.panicked || !ret.errors.is_empty() {
        let messages: Vec<String> = ret.errors.iter().map(|e| e.to_string()).collect();
        return Err(TransformError::Js(format!("{}: {}", filename, messages.join(", "))));
    }

    let mut program = ret.program;
    let minified = Minifier::new(MinifierOptions {
        mangle: None,
        compress: Some(CompressOptions::default()),
    })
    .minify(&allocator, &mut program);

    let code = Codegen::new()
        .with_options(CodegenOptions::minify())
        .with_scoping(minified.scoping)
        .build(&program)
        .code;

    Ok(code + ";")
}
