use anyhow::Result;
use tracing::debug;

use super::assemble::{FileOutput, FileOverrides, assemble_file};
use super::codec::NumericCodec;
use super::document::{is_excel_placeholder, locate_document};
use super::error::ExtractError;
use super::resolver::resolve_tasks;
use super::walker::{TreeWalker, settle_tasks};

/// One report file as handed over by the file source.
#[derive(Debug, Clone, Copy)]
pub struct SourceFile<'a> {
    /// Full location of the file, checked for placeholder markers.
    pub location: &'a str,
    pub file_name: &'a str,
    pub text: &'a str,
}

/// Runs walk, codec join, resolution and assembly for single files.
pub struct Extractor<'c> {
    walker: TreeWalker,
    codec: &'c dyn NumericCodec,
}

impl<'c> Extractor<'c> {
    pub fn new(codec: &'c dyn NumericCodec) -> Result<Self> {
        Ok(Self {
            walker: TreeWalker::new()?,
            codec,
        })
    }

    pub fn extract_file(
        &self,
        source: &SourceFile<'_>,
        overrides: &FileOverrides,
    ) -> Result<FileOutput, ExtractError> {
        if is_excel_placeholder(source.location, source.text) {
            return Err(ExtractError::ExcelPlaceholder(source.file_name.to_string()));
        }

        let root = locate_document(source.text)?;
        let pending = self.walker.walk(&root);
        if pending.is_empty() {
            return Err(ExtractError::NoResults);
        }

        debug!(
            file = source.file_name,
            tasks = pending.len(),
            encoded = pending.iter().filter(|task| task.is_encoded()).count(),
            codec = self.codec.name(),
            "dispatching extraction tasks"
        );

        let tasks = settle_tasks(pending, self.codec)?;
        let resolved = resolve_tasks(tasks)?;
        assemble_file(resolved, source.file_name, overrides)
    }
}
