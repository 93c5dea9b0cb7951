//! Synthetic modules that forward the UI runtime and renderer to a shared
//! global instance.
//!
//! Every import of the runtime anywhere in the graph is redirected to one of
//! these modules, so all components observe the same instance no matter how
//! many copies of the package exist on disk.

use super::lock::FrameworkLock;
use base64::Engine as _;
use std::fmt::Write;
use std::path::Path;

/// Runtime exports that are functions. Wrapped so an empty slot is reported
/// at call time rather than at import time.
const RUNTIME_FUNCTIONS: &[&str] = &[
    "createElement",
    "cloneElement",
    "createContext",
    "createRef",
    "forwardRef",
    "isValidElement",
    "lazy",
    "memo",
    "startTransition",
    "use",
    "useActionState",
    "useCallback",
    "useContext",
    "useDebugValue",
    "useDeferredValue",
    "useEffect",
    "useId",
    "useImperativeHandle",
    "useInsertionEffect",
    "useLayoutEffect",
    "useMemo",
    "useOptimistic",
    "useReducer",
    "useRef",
    "useState",
    "useSyncExternalStore",
    "useTransition",
];

/// Runtime exports that are values, read once when the shim is evaluated.
const RUNTIME_VALUES: &[&str] = &[
    "Children",
    "Component",
    "Fragment",
    "Profiler",
    "PureComponent",
    "StrictMode",
    "Suspense",
    "version",
];

const RENDERER_FUNCTIONS: &[&str] = &[
    "createPortal",
    "createRoot",
    "findDOMNode",
    "flushSync",
    "hydrate",
    "hydrateRoot",
    "render",
    "renderToPipeableStream",
    "renderToStaticMarkup",
    "renderToString",
    "unmountComponentAtNode",
];

const RENDERER_VALUES: &[&str] = &["version"];

/// Sub-paths that additionally expose the automatic JSX entry points.
const JSX_RUNTIME_SUBPATHS: &[&str] = &["jsx-runtime", "jsx-dev-runtime"];

/// Which shared instance a shim forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShimKind {
    /// The UI runtime (`react`, `react/*`).
    Runtime,
    /// The DOM renderer (`react-dom`, `react-dom/*`).
    Renderer,
}

/// Builds shim modules for one loader.
#[derive(Debug, Clone, Copy)]
pub struct ShimBuilder<'a> {
    pub runtime_slot: &'a str,
    pub renderer_slot: &'a str,
    pub lock: &'a FrameworkLock,
}

impl ShimBuilder<'_> {
    /// Shim as a `data:` URL.
    #[must_use]
    pub fn data_url(&self, kind: ShimKind, subpath: Option<&str>) -> String {
        to_data_url(&self.source(kind, subpath))
    }

    /// JavaScript source of the shim.
    #[must_use]
    pub fn source(&self, kind: ShimKind, subpath: Option<&str>) -> String {
        let mut out = String::new();

        let (functions, values, locked, label) = match kind {
            ShimKind::Runtime => (
                RUNTIME_FUNCTIONS,
                RUNTIME_VALUES,
                self.lock.ui_runtime_path.as_deref(),
                "UI runtime",
            ),
            ShimKind::Renderer => (
                RENDERER_FUNCTIONS,
                RENDERER_VALUES,
                self.lock.renderer_path.as_deref(),
                "renderer",
            ),
        };
        let slot = match kind {
            ShimKind::Runtime => self.runtime_slot,
            ShimKind::Renderer => self.renderer_slot,
        };

        if let Some(path) = locked {
            write_seed(&mut out, slot, path);
        }

        match kind {
            ShimKind::Runtime => {
                let _ = writeln!(out, "const __slot = () => globalThis[{}];", js_str(slot));
            }
            ShimKind::Renderer => {
                let _ = writeln!(
                    out,
                    "const __slot = () => globalThis[{}] ?? globalThis[{}];",
                    js_str(slot),
                    js_str(self.runtime_slot)
                );
            }
        }

        let _ = writeln!(
            out,
            "const __missing = (name) => console.error({} + name + {});",
            js_str(&format!("[ondemand] shared {label} is not available when calling ")),
            js_str(&format!("; expected it in globalThis.{slot}")),
        );

        for name in functions {
            let _ = writeln!(
                out,
                "export const {name} = (...args) => {{ const r = __slot(); if (!r) {{ __missing({q}); return undefined; }} return r.{name}(...args); }};",
                q = js_str(name),
            );
        }

        for name in values {
            let _ = writeln!(out, "export const {name} = __slot()?.{name};");
        }

        if kind == ShimKind::Runtime && subpath.is_some_and(|s| JSX_RUNTIME_SUBPATHS.contains(&s)) {
            write_jsx_entry_points(&mut out);
        }

        out.push_str(
            "export default new Proxy({}, {\n  get: (_, key) => __slot()?.[key],\n  has: (_, key) => key in (__slot() ?? {}),\n});\n",
        );

        out
    }
}

/// Import the locked entry file and publish it when the slot is still empty.
fn write_seed(out: &mut String, slot: &str, path: &Path) {
    let Ok(url) = url::Url::from_file_path(path) else {
        return;
    };
    let _ = writeln!(
        out,
        "if (!globalThis[{slot}]) {{ const m = await import({url}); globalThis[{slot}] ??= m.default ?? m; }}",
        slot = js_str(slot),
        url = js_str(url.as_str()),
    );
}

/// `jsx`/`jsxs`/`jsxDEV` lowered onto `createElement`.
fn write_jsx_entry_points(out: &mut String) {
    out.push_str(concat!(
        "export const jsx = (type, props, key) => {\n",
        "  const r = __slot();\n",
        "  if (!r) { __missing(\"jsx\"); return undefined; }\n",
        "  const { children, ...rest } = props ?? {};\n",
        "  if (key !== undefined) rest.key = key;\n",
        "  if (children === undefined) return r.createElement(type, rest);\n",
        "  return Array.isArray(children)\n",
        "    ? r.createElement(type, rest, ...children)\n",
        "    : r.createElement(type, rest, children);\n",
        "};\n",
        "export const jsxs = jsx;\n",
        "export const jsxDEV = jsx;\n",
    ));
}

/// Encode a module source as a base64 `data:` URL.
#[must_use]
pub fn to_data_url(source: &str) -> String {
    format!(
        "data:text/javascript;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(source.as_bytes())
    )
}

/// Quote a string as a JavaScript string literal.
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}
