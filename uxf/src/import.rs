//! Resolving `!import` directives: system names, URLs, and files.
//!
//! Resolution order: a bare name is a system import; `http://`/`https://`
//! sources are fetched with a single synchronous GET; everything else is a
//! filesystem path, resolved relative to the importing file. A per-run
//! cache keyed by normalized source makes duplicate imports free, and the
//! loading stack detects self-imports and cycles.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::event::{Error, Events};
use crate::parser;
use crate::tclass::TClass;
use crate::Options;

/// The ttype definitions embedded for the bare system import names.
const SYSTEM_IMPORTS: [(&str, &str); 2] = [
    ("complex", "uxf 1\n=Complex Real:real Imag:real\n"),
    ("fraction", "uxf 1\n=Fraction numerator:int denominator:int\n"),
];

/// Per-run import state: the active loading stack (cycle detection only)
/// and the arena of already-resolved sources.
pub(crate) struct ImportContext {
    pub loading: Vec<String>,
    cache: HashMap<String, Vec<TClass>>,
}

impl ImportContext {
    pub fn new() -> Self {
        ImportContext {
            loading: Vec::new(),
            cache: HashMap::new(),
        }
    }
}

/// Normalizes a source so identical files and URLs get identical keys.
///
/// Relative paths resolve against the importing file's directory when
/// there is one; URLs and pseudo-filenames pass through unchanged.
pub(crate) fn normalize_source(source: &str, relative_to: Option<&String>) -> String {
    if source.starts_with("http://") || source.starts_with("https://") {
        return source.to_string();
    }
    let path = Path::new(source);
    let joined = match relative_to {
        Some(base)
            if !path.is_absolute()
                && !base.starts_with("http://")
                && !base.starts_with("https://") =>
        {
            match Path::new(base).parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.join(path),
                _ => path.to_path_buf(),
            }
        }
        _ => path.to_path_buf(),
    };
    match joined.canonicalize() {
        Ok(canonical) => canonical.display().to_string(),
        Err(_) => joined.display().to_string(),
    }
}

/// Resolves one import directive into the ttypes it contributes.
///
/// `Ok(None)` means the import failed non-fatally (already reported as
/// 530/550/560/586); the caller carries on. Self-imports (176) and
/// circular imports (580) are fatal.
pub(crate) fn resolve(
    source: &str,
    lineno: usize,
    options: &Options,
    events: &mut Events<'_>,
    ctx: &mut ImportContext,
) -> Result<Option<Vec<TClass>>, Error> {
    if !source.contains(['.', '/', '\\']) {
        if let Some((_, text)) = SYSTEM_IMPORTS.iter().find(|(name, _)| *name == source) {
            return parse_imported(source, text, source, lineno, options, events, ctx);
        }
        events.error(560, lineno, format!("there is no system import {source:?}"));
        return Ok(None);
    }
    let is_url = source.starts_with("http://") || source.starts_with("https://");
    let norm = normalize_source(source, ctx.loading.last());
    if ctx.loading.last() == Some(&norm) {
        return Err(events.fatal(176, lineno, "a UXF file cannot import itself"));
    }
    if ctx.loading.contains(&norm) {
        return Err(events.fatal(580, lineno, format!("cannot do circular imports {norm:?}")));
    }
    if let Some(tclasses) = ctx.cache.get(&norm) {
        debug!("import cache hit for {norm}");
        return Ok(Some(tclasses.clone()));
    }
    let text = if is_url {
        match fetch_url(source, options.timeout) {
            Ok(text) => text,
            Err(message) => {
                events.error(550, lineno, format!("failed to import {source:?}: {message}"));
                return Ok(None);
            }
        }
    } else {
        match crate::read_source_text(Path::new(&norm)) {
            Ok(text) => text,
            Err(err) => {
                events.error(586, lineno, format!("failed to import {source:?}: {err}"));
                return Ok(None);
            }
        }
    };
    parse_imported(&norm, &text, source, lineno, options, events, ctx)
}

fn parse_imported(
    norm: &str,
    text: &str,
    source: &str,
    lineno: usize,
    options: &Options,
    events: &mut Events<'_>,
    ctx: &mut ImportContext,
) -> Result<Option<Vec<TClass>>, Error> {
    match parser::parse(text, norm, options, events, ctx, true) {
        Ok(imported) => {
            let tclasses: Vec<TClass> = imported.tclasses().values().cloned().collect();
            ctx.cache.insert(norm.to_string(), tclasses.clone());
            Ok(Some(tclasses))
        }
        // Self-import, cycle, and conflict failures in the imported chain
        // poison the whole load.
        Err(err) if matches!(err.code, 176 | 580 | 528 | 544) => Err(err),
        Err(err) => {
            events.error(
                530,
                lineno,
                format!("failed to import {source:?}: not a valid UXF source: {err}"),
            );
            Ok(None)
        }
    }
}

fn fetch_url(url: &str, timeout: Duration) -> Result<String, String> {
    let agent = ureq::AgentBuilder::new().timeout(timeout).build();
    match agent.get(url).call() {
        Ok(response) => response.into_string().map_err(|err| err.to_string()),
        Err(err) => Err(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_pass_through_normalization() {
        let url = "http://www.qtrac.eu/ttype-eg.uxf";
        assert_eq!(normalize_source(url, None), url);
    }

    #[test]
    fn relative_paths_join_the_importer() {
        let norm = normalize_source("b.uxi", Some(&"/tmp/data/a.uxf".to_string()));
        assert!(norm.ends_with("b.uxi"));
        assert!(norm.starts_with("/tmp/data"));
    }
}
