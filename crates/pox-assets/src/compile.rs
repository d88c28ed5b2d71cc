//! Hand-off of a finished file set to a code generator.

use std::path::PathBuf;

use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::source::Source;
use crate::vfs::VirtualFileSet;

/// Options passed through to a [`Generator`]
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Output file the generator writes
    pub file_path: PathBuf,
    /// Package or module name of the generated source
    pub module_name: String,
    /// Name of the exported variable holding the filesystem
    pub variable_name: String,
    pub build_tags: Option<String>,
    pub variable_comment: Option<String>,
}

impl CompileOptions {
    pub fn new(
        file_path: impl Into<PathBuf>,
        module_name: impl Into<String>,
        variable_name: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            module_name: module_name.into(),
            variable_name: variable_name.into(),
            build_tags: None,
            variable_comment: None,
        }
    }

    pub fn with_build_tags(mut self, build_tags: impl Into<String>) -> Self {
        self.build_tags = Some(build_tags.into());
        self
    }

    pub fn with_variable_comment(mut self, comment: impl Into<String>) -> Self {
        self.variable_comment = Some(comment.into());
        self
    }

    /// Doc comment for the exported variable
    pub fn variable_comment(&self) -> String {
        match &self.variable_comment {
            Some(comment) => comment.clone(),
            None => format!(
                "{} implements a read-only virtual filesystem.",
                self.variable_name
            ),
        }
    }
}

/// Serializes a file set into embeddable source
pub trait Generator {
    fn generate(&self, fs: &VirtualFileSet, options: &CompileOptions) -> Result<()>;
}

/// Run the sources through a pipeline and hand the result to a generator.
///
/// Nothing is generated when any source fails.
pub fn compile_with(
    pipeline: &Pipeline,
    sources: &[Source],
    generator: &dyn Generator,
    options: &CompileOptions,
) -> Result<()> {
    let fs = pipeline.run(sources)?;

    log::info!(
        "Generating {} from {} assets",
        options.file_path.display(),
        fs.len()
    );
    generator.generate(&fs, options)
}

/// [`compile_with`] using a default pipeline
pub fn compile(
    sources: &[Source],
    generator: &dyn Generator,
    options: &CompileOptions,
) -> Result<()> {
    compile_with(&Pipeline::new()?, sources, generator, options)
}
