//! dartc - parser and resolver front end
//!
//! Turns source text of a class-based, optionally typed language into an AST
//! with exact source positions, then resolves every name, type and constant
//! across the libraries of a compilation session.
//!
//! ## Architecture
//!
//! - **parser**: tokenizer and recursive descent parser with error recovery
//! - **ast**: owned syntax tree, visitor, pretty printer, position validator
//! - **element**: element arena and the type model
//! - **scope**: lexical scope chain and library namespaces
//! - **resolver**: Enter → Supertypes → Members → Names → Constants
//! - **diagnostics**: error codes, severities and the listener channel
//! - **bin**: command-line interface
//!
//! ## Compilation Flow
//!
//! ```text
//! Source → Lexer → Parser → AST ─┐
//! Source → Lexer → Parser → AST ─┼→ Resolver → ResolvedProgram
//! Source → Lexer → Parser → AST ─┘
//!          (one worker per unit)
//! ```

pub mod ast;
pub mod config;
pub mod consts;
pub mod diagnostics;
pub mod element;
pub mod error;
pub mod parser;
pub mod resolver;
pub mod scope;
pub mod source;

use std::collections::{HashMap, VecDeque};

pub use config::Config;
pub use diagnostics::{CollectingListener, Diagnostic, DiagnosticListener, ErrorCode, Reporter, Severity};
pub use error::{Error, Result};
pub use resolver::{Library, ParsedUnit, ResolvedProgram, Resolver};
pub use source::{FileSources, MemorySources, Source, SourceProvider};

use ast::CompilationUnit;
use parser::{LibraryUnit, ParseOutput, Parser};
use resolver::Import;

/// Libraries named `dart:...` are built in and never loaded from a provider
const BUILT_IN_SCHEME: &str = "dart:";

/// Parse one unit, reporting its syntax errors to `listener`.
///
/// `unit` namespaces the node ids of the tree; units resolved together must
/// use distinct ids.
pub fn parse_unit(source: &Source, unit: u32, config: &Config, listener: &mut dyn DiagnosticListener) -> CompilationUnit {
    let output = Parser::new(source, unit, config).parse_compilation_unit();
    let mut reporter = Reporter::new(listener, config);
    let unit = finish_parse(source, output, config, &mut reporter);
    reporter.unit_completed(source.name());
    unit
}

/// Directive summary of `source` from a directives-only parse
pub fn parse_library_directives(source: &Source, config: &Config) -> LibraryUnit {
    let output = parser::parse_directives(source, config);
    LibraryUnit::from_directives(&output.directives)
}

fn finish_parse(source: &Source, output: ParseOutput, config: &Config, reporter: &mut Reporter<'_>) -> CompilationUnit {
    for error in &output.errors {
        reporter.report(source, error.span(), error.code());
    }
    if output.dropped > 0 {
        log::debug!("{}: {} errors over budget dropped", source.name(), output.dropped);
    }
    if config.validate_positions {
        let checked = ast::validate_positions(&output.unit, source.len());
        debug_assert!(checked.is_ok(), "{}: {:?}", source.name(), checked);
        if let Err(e) = checked {
            log::error!("{}: {}", source.name(), e);
        }
    }
    output.unit
}

/// Result of compiling a root library and everything it imports
#[derive(Debug)]
pub struct Compilation {
    /// Libraries in discovery order; the root library comes first
    pub libraries: Vec<Library>,
    pub program: ResolvedProgram,
}

impl Compilation {
    /// Index of the library loaded from `name`
    pub fn library_index(&self, name: &str) -> Option<usize> {
        self.libraries.iter().position(|l| l.name == name)
    }

    pub fn units(&self) -> impl Iterator<Item = &ParsedUnit> {
        self.libraries.iter().flat_map(|l| l.units.iter())
    }
}

/// A library before parsing: its sources and import edges
struct PendingLibrary {
    name: String,
    sources: Vec<Source>,
    imports: Vec<Import>,
}

/// Compilation session driver
pub struct Compiler<'p> {
    config: Config,
    provider: &'p dyn SourceProvider,
}

impl<'p> Compiler<'p> {
    pub fn new(config: Config, provider: &'p dyn SourceProvider) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compile the library at `root` together with its parts and imports.
    ///
    /// Problems in the compiled program go to `listener`; the result is an
    /// error only if a source cannot be loaded.
    pub fn compile(&self, root: &str, listener: &mut dyn DiagnosticListener) -> Result<Compilation> {
        log::debug!("compile start: {}", root);
        let pending = self.discover(root)?;
        let sources: Vec<Source> = pending.iter().flat_map(|l| l.sources.iter().cloned()).collect();
        let outputs = self.parse_all(&sources)?;

        let mut reporter = Reporter::new(listener, &self.config);
        let mut outputs = outputs.into_iter();
        let mut libraries = Vec::with_capacity(pending.len());
        for library in pending {
            let mut resolved = Library::new(library.name);
            resolved.imports = library.imports;
            for source in library.sources {
                let output = outputs
                    .next()
                    .ok_or_else(|| Error::internal(format!("missing parse output for {}", source.name())))?;
                let unit = finish_parse(&source, output, &self.config, &mut reporter);
                resolved.units.push(ParsedUnit { source, unit });
            }
            libraries.push(resolved);
        }

        let program = Resolver::new().resolve(&libraries, &mut reporter);
        for parsed in libraries.iter().flat_map(|l| l.units.iter()) {
            reporter.unit_completed(parsed.source.name());
        }
        log::debug!(
            "compile done: {} libraries, {} errors, {} warnings",
            libraries.len(),
            reporter.error_count(),
            reporter.warning_count()
        );
        Ok(Compilation { libraries, program })
    }

    /// Breadth-first walk over `#source` parts and `#import`s
    fn discover(&self, root: &str) -> Result<Vec<PendingLibrary>> {
        let mut indices: HashMap<String, usize> = HashMap::new();
        let mut libraries: Vec<PendingLibrary> = Vec::new();
        let mut queue = VecDeque::new();

        let root = self.provider.resolve_uri(None, root);
        indices.insert(root.clone(), 0);
        libraries.push(PendingLibrary { name: root.clone(), sources: Vec::new(), imports: Vec::new() });
        queue.push_back(0);

        while let Some(index) = queue.pop_front() {
            let name = libraries[index].name.clone();
            let defining = self.provider.load(&name)?;
            let directives = parse_library_directives(&defining, &self.config);
            let mut sources = vec![defining];
            for part in &directives.sources {
                let uri = self.provider.resolve_uri(Some(&name), part);
                sources.push(self.provider.load(&uri)?);
            }

            let mut imports = Vec::new();
            for import in &directives.imports {
                if import.path.starts_with(BUILT_IN_SCHEME) {
                    log::trace!("{}: built-in import {}", name, import.path);
                    continue;
                }
                let uri = self.provider.resolve_uri(Some(&name), &import.path);
                let target = match indices.get(&uri) {
                    Some(target) => *target,
                    None => {
                        let target = libraries.len();
                        indices.insert(uri.clone(), target);
                        libraries.push(PendingLibrary { name: uri, sources: Vec::new(), imports: Vec::new() });
                        queue.push_back(target);
                        target
                    }
                };
                imports.push(Import { library: target, prefix: import.prefix.clone() });
            }

            let library = &mut libraries[index];
            library.sources = sources;
            library.imports = imports;
        }
        log::debug!("discovered {} libraries", libraries.len());
        Ok(libraries)
    }

    /// Parse units on at most `available_parallelism` workers at a time; unit ids follow `sources` order
    fn parse_all(&self, sources: &[Source]) -> Result<Vec<ParseOutput>> {
        let config = &self.config;
        let width = std::thread::available_parallelism().map_or(1, |n| n.get());
        let mut outputs = Vec::with_capacity(sources.len());
        for (batch, chunk) in sources.chunks(width).enumerate() {
            let base = batch * width;
            let parsed: Vec<ParseOutput> = std::thread::scope(|scope| {
                let workers: Vec<_> = chunk
                    .iter()
                    .enumerate()
                    .map(|(i, source)| {
                        let unit = (base + i) as u32;
                        scope.spawn(move || Parser::new(source, unit, config).parse_compilation_unit())
                    })
                    .collect();
                workers
                    .into_iter()
                    .map(|worker| worker.join().map_err(|_| Error::internal("parser worker panicked")))
                    .collect::<Result<_>>()
            })?;
            outputs.extend(parsed);
        }
        Ok(outputs)
    }
}

/// Compile a single in-memory unit as its own library
pub fn compile_source(
    name: &str,
    text: &str,
    config: &Config,
    listener: &mut dyn DiagnosticListener,
) -> Result<Compilation> {
    let sources = MemorySources::new().with(name, text);
    Compiler::new(config.clone(), &sources).compile(name, listener)
}
