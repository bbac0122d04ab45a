//! Style sheet minification with lightningcss.

use super::TransformError;
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserFlags, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

/// Browser baseline the extended dialect is lowered for.
fn extended_targets() -> Targets {
    Targets::from(Browsers {
        chrome: Some(95 << 16),
        edge: Some(95 << 16),
        firefox: Some(90 << 16),
        safari: Some(14 << 16),
        ios_saf: Some(14 << 16),
        ..Browsers::default()
    })
}

/// Parse, minify and print a style sheet.
///
/// With `extended` set, nesting and custom media are accepted and compiled
/// down to plain CSS.
pub fn minify(source: &str, filename: &str, extended: bool) -> Result<String, TransformError> {
    let flags = if extended {
        ParserFlags::NESTING | ParserFlags::CUSTOM_MEDIA
    } else {
        ParserFlags::empty()
    };
    let targets = if extended { extended_targets() } else { Targets::default() };

    let mut stylesheet = StyleSheet::parse(
        source,
        ParserOptions { filename: filename.to_string(), flags, ..Default::default() },
    )
    .map_err(|e| TransformError::Css(e.to_string()))?;

    stylesheet
        .minify(MinifyOptions { targets, ..Default::default() })
        .map_err(|e| TransformError::Css(e.to_string()))?;

    let result = stylesheet
        .to_css(PrinterOptions { minify: true, targets, ..Default::default() })
        .map_err(|e| TransformError::Css(e.to_string()))?;

    Ok(result.code)
}
