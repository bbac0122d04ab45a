//! Format builders.
//!
//! Every format shares the same flow: resolve the target's items, load each
//! item through the content store, transform it, then combine the results
//! according to the format's [`BuildMode`]. Nothing is written until every
//! item has been transformed.

pub mod css;
pub mod js;
pub mod markdown;
pub mod sass;

use crate::build::{
    discovery, output, BuildContext, BuildError, BuildMode, BuildOutput, ContentItem, Format,
    ItemKind, Target,
};
use crate::toolchain::ToolchainError;
use sass::SassCompiler;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Error produced by a format transform.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransformError {
    /// Style sheet parse, minify or print failure
    #[error("CSS error: {0}")]
    Css(String),
    /// Script parse failure
    #[error("JS error: {0}")]
    Js(String),
    /// Markdown rendering failure
    #[error("markdown error: {0}")]
    Markdown(String),
    /// External compiler reported an error
    #[error("{0}")]
    Compiler(String),
    /// External compiler could not be located or run
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),
    /// Scratch directory handling failed
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

/// Loaded input handed to a transform.
#[derive(Debug, Clone)]
pub enum ItemSource {
    /// Text of a file or remote link
    Text(Arc<str>),
    /// Unexpanded directory for directory-mode compilers
    Directory(PathBuf),
}

impl ItemSource {
    fn len(&self) -> usize {
        match self {
            ItemSource::Text(text) => text.len(),
            ItemSource::Directory(_) => 0,
        }
    }
}

/// Builder for one format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builder {
    /// lightningcss
    Css,
    /// oxc
    Js,
    /// External sass compiler; `indented` selects the Sass syntax
    Sass {
        /// Compile the indented syntax
        indented: bool,
    },
    /// markdown to HTML
    Markdown,
}

/// Per-build transform state.
struct Session<'a> {
    ctx: &'a BuildContext,
    target: &'a Target,
    sass: Option<SassCompiler>,
}

impl Builder {
    /// The builder handling a format.
    pub fn for_format(format: Format) -> Self {
        match format {
            Format::Css => Builder::Css,
            Format::Js => Builder::Js,
            Format::Scss => Builder::Sass { indented: false },
            Format::Sass => Builder::Sass { indented: true },
            Format::Md => Builder::Markdown,
        }
    }

    /// Display name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Builder::Css => "CSS",
            Builder::Js => "JS",
            Builder::Sass { indented: false } => "SCSS",
            Builder::Sass { indented: true } => "SASS",
            Builder::Markdown => "MD",
        }
    }

    /// The format this builder handles.
    pub fn format(&self) -> Format {
        match self {
            Builder::Css => Format::Css,
            Builder::Js => Format::Js,
            Builder::Sass { indented: false } => Format::Scss,
            Builder::Sass { indented: true } => Format::Sass,
            Builder::Markdown => Format::Md,
        }
    }

    /// How results are combined into outputs.
    pub fn mode(&self) -> BuildMode {
        self.format().build_mode()
    }

    /// Whether included directories are expanded into files.
    ///
    /// Directory-mode compilers receive the directory itself.
    pub fn expands_directories(&self) -> bool {
        !matches!(self, Builder::Sass { .. })
    }

    /// Build a target and write its outputs.
    ///
    /// # Returns
    /// The written outputs and byte counts. A failing item aborts the target
    /// before anything is written.
    pub fn build(&self, ctx: &BuildContext, target: &Target) -> Result<BuildOutput, BuildError> {
        info!(builder = self.name(), target = %target.name(), "building");

        let items = discovery::resolve(target, ctx.base_dir(), self.expands_directories())?;
        debug!(target = %target.name(), items = items.len(), "resolved inputs");

        let mut session = Session { ctx, target, sass: None };
        let mut bytes_in = 0;
        let mut results = Vec::with_capacity(items.len());
        for item in &items {
            let source = load(ctx, item)?;
            bytes_in += source.len();
            let text = self.transform(&mut session, item, &source).map_err(|source| {
                BuildError::Transform {
                    target: target.name(),
                    item: item.value.clone(),
                    source,
                }
            })?;
            results.push((item, text));
        }

        let mut built = match self.mode() {
            BuildMode::ManyToOne => write_combined(ctx.base_dir(), target, &results)?,
            BuildMode::OneToOne => write_each(ctx.base_dir(), target, &results)?,
        };
        built.bytes_in = bytes_in;

        for path in &built.outputs {
            info!(builder = self.name(), output = %file_label(path), "+");
        }
        Ok(built)
    }

    fn transform(
        &self,
        session: &mut Session<'_>,
        item: &ContentItem,
        source: &ItemSource,
    ) -> Result<String, TransformError> {
        let filename = item.file_name();
        match (self, source) {
            (Builder::Css, ItemSource::Text(text)) => {
                css::minify(text, &filename, session.target.option_bool("extended"))
            }
            (Builder::Js, ItemSource::Text(text)) => js::minify(text, &filename),
            (Builder::Markdown, ItemSource::Text(text)) => markdown::render(text),
            (Builder::Sass { indented }, source) => {
                let compiler = match session.sass.take() {
                    Some(compiler) => compiler,
                    None => SassCompiler::locate(
                        session.ctx.toolchain_root(),
                        *indented,
                        session.ctx.process_timeout(),
                    )?,
                };
                let result = match source {
                    ItemSource::Text(text) => {
                        let load_path = match item.kind {
                            ItemKind::File => item.path().parent(),
                            _ => None,
                        };
                        compiler.compile_source(text, load_path)
                    }
                    ItemSource::Directory(dir) => compiler.compile_directory(dir),
                };
                session.sass = Some(compiler);
                result
            }
            (_, ItemSource::Directory(dir)) => Err(TransformError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} cannot compile a directory: {}", self.name(), dir.display()),
            ))),
        }
    }
}

/// Load an item's content.
fn load(ctx: &BuildContext, item: &ContentItem) -> Result<ItemSource, BuildError> {
    match item.kind {
        ItemKind::File => ctx
            .content()
            .get_file(&item.value)
            .map(ItemSource::Text)
            .map_err(|source| BuildError::Read { path: item.path().to_path_buf(), source }),
        ItemKind::RemoteLink => Ok(ItemSource::Text(ctx.content().get_remote(&item.value)?)),
        ItemKind::Directory => Ok(ItemSource::Directory(item.path().to_path_buf())),
    }
}

fn write_output(path: &Path, contents: &str) -> Result<(), BuildError> {
    fs::write(path, contents).map_err(|source| BuildError::Write { path: path.to_path_buf(), source })
}

/// Concatenate all results in item order and write them to every output.
fn write_combined(
    base_dir: &Path,
    target: &Target,
    results: &[(&ContentItem, String)],
) -> Result<BuildOutput, BuildError> {
    let combined: String = results.iter().map(|(_, text)| text.as_str()).collect();

    let outputs = output::resolve_outputs(target, base_dir).map_err(|source| BuildError::Write {
        path: base_dir.to_path_buf(),
        source,
    })?;
    for path in &outputs {
        write_output(path, &combined)?;
    }

    Ok(BuildOutput { outputs, bytes_in: 0, bytes_out: combined.len() })
}

/// Write each result once per output template, expanded against its item.
fn write_each(
    base_dir: &Path,
    target: &Target,
    results: &[(&ContentItem, String)],
) -> Result<BuildOutput, BuildError> {
    let mut built = BuildOutput::default();
    for (item, text) in results {
        for template in &target.outputs {
            let path = output::route(template, &item.value, base_dir)
                .map_err(|source| BuildError::Write { path: PathBuf::from(template), source })?;
            write_output(&path, text)?;
            built.outputs.push(path);
        }
        built.bytes_out += text.len();
    }
    Ok(built)
}

fn file_label(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}
