//! SWC-backed [`CompilerBackend`].
//!
//! Typed sources are stripped, markup is lowered with the classic runtime
//! (`React.createElement` by default), and the result is always emitted as
//! an ES module. JSON modules become a single `export default`.
//!
//! ## Feature Flags
//!
//! - `swc`: full SWC integration (on by default)
//!
//! Without the `swc` feature, a stub implementation performs basic
//! regex-based transformations for smoke tests only.

#![allow(clippy::default_trait_access)]
#![allow(clippy::needless_raw_string_hashes)]

use super::spec::{Diagnostic, SourceMapKind};
use super::{CompilerBackend, CompilerError, TranspileOutput, TranspileSpec};
use crate::loader::Dialect;

#[cfg(feature = "swc")]
use super::spec::EsTarget;

/// `SwcBackend` is `Send + Sync`. Each call to `transpile` owns its own
/// source map and globals, so calls are independent.
#[derive(Debug, Clone, Default)]
pub struct SwcBackend {
    _private: (),
}

impl SwcBackend {
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl CompilerBackend for SwcBackend {
    fn name(&self) -> &'static str {
        "swc"
    }

    fn transpile(
        &self,
        spec: &TranspileSpec,
        source: &str,
    ) -> Result<TranspileOutput, CompilerError> {
        if spec.dialect == Dialect::Json {
            return json_module(spec, source);
        }

        if source.trim().is_empty() {
            return Ok(TranspileOutput::new(""));
        }

        #[cfg(not(feature = "swc"))]
        {
            let mut code = source.to_string();
            if spec.dialect.is_typed() {
                code = strip_simple_types(&code);
            }
            if spec.dialect.has_markup() {
                code = transform_simple_jsx(&code, &spec.jsx_factory);
            }

            let mut output = TranspileOutput::new(code);
            if matches!(spec.sourcemaps, SourceMapKind::Inline) {
                output = output
                    .with_source_map(generate_placeholder_sourcemap(spec.file_name()))
                    .inline_source_map();
            }
            Ok(output)
        }

        #[cfg(feature = "swc")]
        {
            compile_with_swc(spec, source)
        }
    }
}

/// Wrap a JSON document as an ES module with a single default export.
fn json_module(spec: &TranspileSpec, source: &str) -> Result<TranspileOutput, CompilerError> {
    if let Err(e) = serde_json::from_str::<serde_json::Value>(source) {
        let line = u32::try_from(e.line()).unwrap_or(u32::MAX);
        let column = u32::try_from(e.column()).unwrap_or(u32::MAX);
        return Err(
            CompilerError::invalid_data(format!("Invalid JSON module: {e}")).with_diagnostics(
                vec![Diagnostic::error(e.to_string()).with_location(
                    spec.input_path.clone(),
                    line,
                    column,
                )],
            ),
        );
    }

    Ok(TranspileOutput::new(format!(
        "export default {};\n",
        source.trim()
    )))
}

/// Regex type stripping for builds without `swc`. Annotations only.
#[cfg(not(feature = "swc"))]
fn strip_simple_types(source: &str) -> String {
    let mut result = source.to_string();

    let rules: [(&str, &str); 7] = [
        // interface Foo { ... }
        (r"(?m)^\s*(export\s+)?interface\s+\w+\s*\{[^}]*\}\s*", ""),
        // type Foo = ...;
        (r"(?m)^\s*(export\s+)?type\s+\w+\s*=\s*[^;]+;\s*", ""),
        // ): type { -> ) {
        (r"\)\s*:\s*\w+(\s*\[\s*\])?\s*\{", ") {"),
        // (a: type, -> (a,
        (r"(\w+)\s*:\s*\w+(\s*\[\s*\])?\s*,", "$1,"),
        // (a: type) -> (a)
        (r"(\w+)\s*:\s*\w+(\s*\[\s*\])?\s*\)", "$1)"),
        // const x: type = -> const x =
        (
            r"(const|let|var)\s+(\w+)\s*:\s*\w+(\s*\[\s*\])?\s*=",
            "$1 $2 =",
        ),
        // x as Foo -> x
        (r"\s+as\s+[A-Z]\w*", ""),
    ];

    for (pattern, replacement) in rules {
        if let Ok(re) = regex_lite::Regex::new(pattern) {
            result = re.replace_all(&result, replacement).to_string();
        }
    }

    result
}

/// Lower simple markup to classic factory calls (stub implementation).
///
/// Handles `<tag>text</tag>` and `<tag />` only.
#[cfg(not(feature = "swc"))]
fn transform_simple_jsx(source: &str, factory: &str) -> String {
    let mut result = source.to_string();

    if let Ok(re) = regex_lite::Regex::new(r"<(\w+)>([^<]*)</(\w+)>") {
        result = re
            .replace_all(&result, |caps: &regex_lite::Captures| {
                let tag = &caps[1];
                let content = &caps[2];
                if tag == &caps[3] {
                    format!("{factory}(\"{tag}\", null, \"{content}\")")
                } else {
                    caps[0].to_string()
                }
            })
            .to_string();
    }

    if let Ok(re) = regex_lite::Regex::new(r"<(\w+)\s*/>") {
        result = re
            .replace_all(&result, |caps: &regex_lite::Captures| {
                format!("{factory}(\"{}\", null)", &caps[1])
            })
            .to_string();
    }

    result
}

#[cfg(not(feature = "swc"))]
fn generate_placeholder_sourcemap(filename: &str) -> String {
    format!(r#"{{"version":3,"sources":["{filename}"],"names":[],"mappings":"AAAA"}}"#)
}

#[cfg(feature = "swc")]
fn es_version(target: EsTarget) -> swc_ecma_ast::EsVersion {
    use swc_ecma_ast::EsVersion;
    match target {
        EsTarget::ES2015 => EsVersion::Es2015,
        EsTarget::ES2016 => EsVersion::Es2016,
        EsTarget::ES2017 => EsVersion::Es2017,
        EsTarget::ES2018 => EsVersion::Es2018,
        EsTarget::ES2019 => EsVersion::Es2019,
        EsTarget::ES2020 => EsVersion::Es2020,
        EsTarget::ES2021 => EsVersion::Es2021,
        EsTarget::ES2022 => EsVersion::Es2022,
        EsTarget::ESNext => EsVersion::EsNext,
    }
}

#[cfg(feature = "swc")]
fn compile_with_swc(spec: &TranspileSpec, source: &str) -> Result<TranspileOutput, CompilerError> {
    use swc_common::{
        comments::SingleThreadedComments, sync::Lrc, FileName, Globals, Mark, SourceMap, Spanned, GLOBALS,
    };
    use swc_ecma_ast::Program;
    use swc_ecma_codegen::{text_writer::JsWriter, Emitter};
    use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};
    use swc_ecma_transforms_base::{fixer::fixer, hygiene::hygiene, resolver};
    use swc_ecma_transforms_react::{react, Options as ReactOptions, Runtime};
    use swc_ecma_transforms_typescript::{strip, tsx, Config as TsConfig, TsxConfig};
    use swc_ecma_visit::FoldWith;

    let is_ts = spec.dialect.is_typed();
    let is_jsx = spec.dialect.has_markup();

    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        Lrc::new(FileName::Custom(spec.file_name().to_string())),
        source.to_string(),
    );

    let syntax = if is_ts {
        Syntax::Typescript(TsSyntax {
            tsx: is_jsx,
            decorators: true,
            ..Default::default()
        })
    } else {
        Syntax::Es(EsSyntax {
            jsx: is_jsx,
            decorators: true,
            ..Default::default()
        })
    };

    let target = es_version(spec.target);

    // Syntax errors carry the 1-indexed line and column of their span.
    let to_diagnostic = |e: &swc_ecma_parser::error::Error| {
        let message = format!("{:?}", e.kind());
        let span = e.span();
        if span.is_dummy() {
            return Diagnostic::error(message);
        }
        let loc = cm.lookup_char_pos(span.lo);
        Diagnostic::error(message).with_location(
            spec.input_path.clone(),
            u32::try_from(loc.line).unwrap_or(u32::MAX),
            u32::try_from(loc.col.0 + 1).unwrap_or(u32::MAX),
        )
    };

    let comments = SingleThreadedComments::default();
    let lexer = Lexer::new(syntax, target, StringInput::from(&*fm), Some(&comments));
    let mut parser = Parser::new_from(lexer);

    let module = parser.parse_module().map_err(|e| {
        let diagnostic = to_diagnostic(&e);
        CompilerError::parse_error(format!(
            "Failed to parse {}: {}",
            spec.input_path.display(),
            diagnostic.message
        ))
        .with_diagnostics(vec![diagnostic])
    })?;

    let recovered: Vec<Diagnostic> = parser.take_errors().iter().map(to_diagnostic).collect();
    if !recovered.is_empty() {
        let summary = recovered
            .iter()
            .map(|d| d.message.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(CompilerError::parse_error(format!(
            "Failed to parse {}: {summary}",
            spec.input_path.display()
        ))
        .with_diagnostics(recovered));
    }

    let output = GLOBALS.set(&Globals::default(), || {
        let unresolved_mark = Mark::new();
        let top_level_mark = Mark::new();

        let mut program = Program::Module(module);
        program = program.fold_with(&mut resolver(unresolved_mark, top_level_mark, is_ts));

        // The tsx pass counts the factory as a use, so its import survives stripping.
        if is_ts && is_jsx {
            let tsx_config = TsxConfig {
                pragma: Some(spec.jsx_factory.clone()),
                pragma_frag: Some(spec.jsx_fragment.clone()),
            };
            program = program.fold_with(&mut tsx(
                cm.clone(),
                TsConfig::default(),
                tsx_config,
                &comments,
                unresolved_mark,
                top_level_mark,
            ));
        } else if is_ts {
            program = program.fold_with(&mut strip(unresolved_mark, top_level_mark));
        }

        let mut module = match program {
            Program::Module(m) => m,
            Program::Script(s) => swc_ecma_ast::Module {
                span: s.span,
                body: s
                    .body
                    .into_iter()
                    .map(swc_ecma_ast::ModuleItem::Stmt)
                    .collect(),
                shebang: s.shebang,
            },
        };

        if is_jsx {
            let react_options = ReactOptions {
                runtime: Some(Runtime::Classic),
                pragma: Some(spec.jsx_factory.clone()),
                pragma_frag: Some(spec.jsx_fragment.clone()),
                ..Default::default()
            };

            module = module.fold_with(&mut react(
                cm.clone(),
                Some(&comments),
                react_options,
                top_level_mark,
                unresolved_mark,
            ));
        }

        module = module.fold_with(&mut hygiene());
        module = module.fold_with(&mut fixer(Some(&comments)));

        module
    });

    let mut buf = Vec::new();
    let mut src_map_buf = Vec::new();

    {
        let writer = JsWriter::new(cm.clone(), "\n", &mut buf, Some(&mut src_map_buf));

        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default().with_target(target),
            cm: cm.clone(),
            comments: Some(&comments),
            wr: writer,
        };

        emitter
            .emit_module(&output)
            .map_err(|e| CompilerError::transform_error(format!("Failed to emit: {e}")))?;
    }

    let code = String::from_utf8(buf)
        .map_err(|e| CompilerError::transform_error(format!("Invalid UTF-8 output: {e}")))?;

    let mut output = TranspileOutput::new(code);
    if matches!(spec.sourcemaps, SourceMapKind::Inline) {
        let srcmap = cm.build_source_map(&src_map_buf);
        let mut map_buf = Vec::new();
        srcmap.to_writer(&mut map_buf).map_err(|e| {
            CompilerError::transform_error(format!("Failed to write source map: {e}"))
        })?;
        let map = String::from_utf8(map_buf)
            .map_err(|e| CompilerError::transform_error(format!("Invalid source map: {e}")))?;
        output = output.with_source_map(map).inline_source_map();
    }

    Ok(output)
}
