//! Module loader / importer (section 4.J): recursively resolves
//! `import` statements into a single flattened [`Module`] plus the set
//! of namespaced imports the type checker needs to populate its
//! namespace table.
//!
//! Filesystem access is an external collaborator (section 1), so this
//! module is generic over a [`SourceProvider`] trait rather than
//! calling `std::fs` directly: an injectable seam so the core's own
//! tests load modules from memory (`MapProvider`) with no filesystem at
//! all. [`FsProvider`] is the thin pass-through an embedder wires up in
//! production.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;

use crate::ast::{Import, Module, Statement};
use crate::diagnostics::Context as DiagContext;
use crate::lexer::Span;
use crate::parser::ParseError;
use crate::symbols::Scope;
use crate::typecheck::error::TypeCheckError;

/// Resolves an import path to source text. The core never touches
/// `std::fs` itself (section 1, 4.J) — only [`FsProvider`] does, and
/// only because an embedder has to plug something in eventually.
pub trait SourceProvider {
    fn read(&self, path: &str) -> io::Result<String>;
}

/// In-memory provider used by this crate's own tests and by any
/// embedder that already has source text in hand (e.g. a language
/// server with unsaved buffers).
#[derive(Debug, Clone, Default)]
pub struct MapProvider {
    files: HashMap<String, String>,
}

impl MapProvider {
    pub fn new() -> Self {
        MapProvider::default()
    }

    pub fn with(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.files.insert(path.into(), source.into());
        self
    }
}

impl SourceProvider for MapProvider {
    fn read(&self, path: &str) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such module: {path}")))
    }
}

/// Thin forwarder to `std::fs::read_to_string`, provided for
/// completeness (section 4.J). It has no behavior of its own beyond
/// what `std::fs` already guarantees, so it isn't exercised by this
/// crate's own tests — only [`MapProvider`] is.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProvider;

impl SourceProvider for FsProvider {
    fn read(&self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Section 7: "cyclic import" resolution error.
    CyclicImport { path: String, span: Span },
    Unreadable { path: String, message: String, span: Span },
    Parse { path: String, errors: Vec<ParseError> },
}

impl LoadError {
    pub fn span(&self) -> Span {
        match self {
            LoadError::CyclicImport { span, .. } => span.clone(),
            LoadError::Unreadable { span, .. } => span.clone(),
            LoadError::Parse { errors, .. } => errors.first().and_then(|e| e.span.clone()).unwrap_or_default(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::CyclicImport { path, .. } => write!(f, "cyclic import: '{path}' imports itself, directly or transitively"),
            LoadError::Unreadable { path, message, .. } => write!(f, "could not load module '{path}': {message}"),
            LoadError::Parse { path, errors } => {
                write!(f, "failed to parse module '{path}': ")?;
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Every namespaced import this project pulled in, as `(namespace,
/// resolved module)` pairs (section 4.J step 4) — the type checker
/// turns each into `Scope::declare_namespace` + `add_to_namespace`
/// calls via [`populate_namespaces`].
pub type NamespacedImports = Vec<(String, Module)>;

struct Loader<'p> {
    provider: &'p dyn SourceProvider,
    loaded: HashMap<String, Module>,
    in_progress: HashSet<String>,
    namespaced: NamespacedImports,
    errors: Vec<LoadError>,
}

/// Recursively load `entry_path` and everything it imports (section
/// 4.J). Returns the single flattened module (non-namespaced imports'
/// functions and variable declarations spliced in before the module's
/// own top-level statements) plus the namespaced imports collected
/// along the way.
pub fn load_module(entry_path: &str, provider: &dyn SourceProvider, diag: &mut DiagContext) -> Result<(Module, NamespacedImports), Vec<LoadError>> {
    let mut loader = Loader {
        provider,
        loaded: HashMap::new(),
        in_progress: HashSet::new(),
        namespaced: vec![],
        errors: vec![],
    };

    let result = loader.load(entry_path, None);

    for e in &loader.errors {
        diag.error(e.to_string(), e.span());
    }

    match result {
        Some(module) if loader.errors.is_empty() => Ok((module, loader.namespaced)),
        _ => Err(loader.errors),
    }
}

impl Loader<'_> {
    /// `requested_at` is the span of the `import` statement that asked
    /// for `path`, if any — `None` only for the entry module itself.
    fn load(&mut self, path: &str, requested_at: Option<Span>) -> Option<Module> {
        if let Some(cached) = self.loaded.get(path) {
            return Some(cached.clone());
        }
        if self.in_progress.contains(path) {
            self.errors.push(LoadError::CyclicImport {
                path: path.to_string(),
                span: requested_at.unwrap_or_default(),
            });
            return None;
        }
        self.in_progress.insert(path.to_string());

        let source = match self.provider.read(path) {
            Ok(s) => s,
            Err(e) => {
                self.errors.push(LoadError::Unreadable {
                    path: path.to_string(),
                    message: e.to_string(),
                    span: requested_at.unwrap_or_default(),
                });
                self.in_progress.remove(path);
                return None;
            }
        };

        let (module, parse_errors) = crate::parser::parse_source(&source, path);
        if !parse_errors.is_empty() {
            self.errors.push(LoadError::Parse { path: path.to_string(), errors: parse_errors });
            self.in_progress.remove(path);
            return None;
        }

        let module = self.resolve_imports(module);

        self.in_progress.remove(path);
        self.loaded.insert(path.to_string(), module.clone());
        Some(module)
    }

    /// Step 2-4 of section 4.J: recursively load every `import` in
    /// `module`, splice non-namespaced ones in before the module's own
    /// statements (in import order), and record namespaced ones.
    fn resolve_imports(&mut self, mut module: Module) -> Module {
        let mut prefix = vec![];
        let mut own = vec![];

        for stmt in std::mem::take(&mut module.statements) {
            match stmt {
                Statement::Import(Import { path, namespace, span }) => {
                    let Some(imported) = self.load(&path, Some(span)) else {
                        continue;
                    };
                    module.imports.insert(path.clone());
                    module.imports.extend(imported.imports.iter().cloned());

                    match namespace {
                        Some(ns) => {
                            module.namespaced_imports.push((ns.clone(), path));
                            self.namespaced.push((ns, imported));
                        }
                        None => {
                            for imported_stmt in imported.statements {
                                if matches!(imported_stmt, Statement::Function(_) | Statement::VarDecl(_)) {
                                    prefix.push(imported_stmt);
                                }
                            }
                        }
                    }
                }
                other => own.push(other),
            }
        }

        prefix.extend(own);
        module.statements = prefix;
        module
    }
}

/// Section 4.J step 4's other half: walk every namespaced import's
/// exported functions and register them under their namespace so
/// `ns.fn(args)` resolves during type checking (section 4.F).
pub fn populate_namespaces(scope: &mut Scope, namespaced: &NamespacedImports) -> Vec<TypeCheckError> {
    let mut errors = vec![];
    for (namespace, module) in namespaced {
        scope.declare_namespace(namespace);
        for stmt in &module.statements {
            if let Statement::Function(function) = stmt {
                match crate::typecheck::stmt::function_type(function) {
                    Ok(ty) => scope.add_to_namespace(namespace, &function.name, ty, function.modifier),
                    Err(e) => errors.push(e),
                }
            }
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_namespaced_import_splices_functions_before_own_statements() {
        let provider = MapProvider::new()
            .with("math.sdl", "fn square(n: int): int =>\n  return n * n\n")
            .with(
                "main.sdl",
                "import \"math.sdl\"\nfn main(): int =>\n  return square(3)\n",
            );
        let mut diag = DiagContext::new(false);
        let (module, namespaced) = load_module("main.sdl", &provider, &mut diag).expect("should load");

        assert!(namespaced.is_empty());
        assert_eq!(module.imports.len(), 1);
        assert!(module.imports.contains("math.sdl"));
        assert_eq!(module.statements.len(), 2);
        assert!(matches!(&module.statements[0], Statement::Function(f) if f.name == "square"));
        assert!(matches!(&module.statements[1], Statement::Function(f) if f.name == "main"));
    }

    #[test]
    fn namespaced_import_is_recorded_but_not_spliced() {
        let provider = MapProvider::new()
            .with("math.sdl", "fn square(n: int): int =>\n  return n * n\n")
            .with(
                "main.sdl",
                "import \"math.sdl\" as math\nfn main(): int =>\n  return math.square(3)\n",
            );
        let mut diag = DiagContext::new(false);
        let (module, namespaced) = load_module("main.sdl", &provider, &mut diag).expect("should load");

        assert_eq!(namespaced.len(), 1);
        assert_eq!(namespaced[0].0, "math");
        assert_eq!(module.statements.len(), 1);
        assert!(matches!(&module.statements[0], Statement::Function(f) if f.name == "main"));
        assert_eq!(module.namespaced_imports, vec![("math".to_string(), "math.sdl".to_string())]);
    }

    #[test]
    fn direct_self_import_is_a_cyclic_import_error() {
        let provider = MapProvider::new().with("a.sdl", "import \"a.sdl\"\nfn f(): void =>\n  return\n");
        let mut diag = DiagContext::new(false);
        let errors = load_module("a.sdl", &provider, &mut diag).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, LoadError::CyclicImport { .. })));
    }

    #[test]
    fn mutual_import_cycle_is_detected() {
        let provider = MapProvider::new()
            .with("a.sdl", "import \"b.sdl\"\nfn f(): void =>\n  return\n")
            .with("b.sdl", "import \"a.sdl\"\nfn g(): void =>\n  return\n");
        let mut diag = DiagContext::new(false);
        let errors = load_module("a.sdl", &provider, &mut diag).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, LoadError::CyclicImport { .. })));
    }

    #[test]
    fn diamond_import_loads_the_shared_module_once() {
        let provider = MapProvider::new()
            .with("leaf.sdl", "fn leaf(): int =>\n  return 1\n")
            .with("mid_a.sdl", "import \"leaf.sdl\"\nfn mid_a(): int =>\n  return leaf()\n")
            .with("mid_b.sdl", "import \"leaf.sdl\"\nfn mid_b(): int =>\n  return leaf()\n")
            .with(
                "main.sdl",
                "import \"mid_a.sdl\"\nimport \"mid_b.sdl\"\nfn main(): int =>\n  return mid_a() + mid_b()\n",
            );
        let mut diag = DiagContext::new(false);
        let (module, _) = load_module("main.sdl", &provider, &mut diag).expect("should load");

        let fn_names: Vec<&str> = module
            .statements
            .iter()
            .filter_map(|s| match s {
                Statement::Function(f) => Some(f.name.as_str()),
                _ => None,
            })
            .collect();
        // `leaf` is spliced once per importer (mid_a and mid_b each get
        // their own copy), plus mid_a, mid_b, and main themselves.
        assert_eq!(fn_names, vec!["leaf", "mid_a", "leaf", "mid_b", "main"]);
    }

    #[test]
    fn missing_module_is_reported_without_panicking() {
        let provider = MapProvider::new().with("main.sdl", "import \"missing.sdl\"\n");
        let mut diag = DiagContext::new(false);
        let errors = load_module("main.sdl", &provider, &mut diag).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, LoadError::Unreadable { .. })));
    }
}
