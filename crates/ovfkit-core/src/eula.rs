//! End-user license agreements.

use std::io;

use tracing::{error, trace};

use crate::compress::Compressor;
use crate::xml::Document;

/// One `<EulaSection>`, with its license text stored compressed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EulaSection {
    /// Text of the `Info` child.
    pub info: Option<String>,
    /// Compressed text of the `License` child.
    pub license: Vec<u8>,
}

impl EulaSection {
    /// Decompress the license text with the compressor that produced it.
    pub fn license_text<C: Compressor>(&self, compressor: &C) -> io::Result<String> {
        compressor.decompress(&self.license)
    }
}

/// Collect every `EulaSection`, compressing each license with `compressor`.
///
/// A section whose license fails to compress is logged and left out; the
/// remaining sections are still returned.
pub fn extract_eula_sections<C: Compressor>(doc: &Document, compressor: &C) -> Vec<EulaSection> {
    let mut sections = Vec::new();

    for (index, section) in doc.elements_by_name("EulaSection").into_iter().enumerate() {
        let info = section.child_text("Info");
        let license_text = section.child_text("License").unwrap_or_default();

        match compressor.compress(&license_text) {
            Ok(license) => sections.push(EulaSection { info, license }),
            Err(e) => {
                error!(index, error = %e, "could not compress the license for eula");
            }
        }
    }

    trace!("found {} eula sections", sections.len());
    sections
}
