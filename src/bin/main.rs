use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dartc::ast::{print_unit, TopLevelDecl};
use dartc::consts::SOURCE_EXTENSION;
use dartc::{CollectingListener, Compiler, Config, FileSources, Source};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "dartc")]
#[command(about = "Parser and resolver front end")]
#[command(version)]
struct Cli {
    /// Debug logging (otherwise RUST_LOG applies)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream of a file
    Lex {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Parse a file and report syntax errors
    Parse {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Skip function bodies
        #[arg(long)]
        diet: bool,

        /// Dump the whole tree
        #[arg(long)]
        tree: bool,
    },

    /// Parse a file and pretty-print it
    Print {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show the library directives of a file
    Directives {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Parse and resolve a library, or every library under a directory
    Check {
        #[arg(value_name = "FILE|DIR")]
        input: PathBuf,

        /// Treat warnings as errors
        #[arg(long)]
        warnings_as_errors: bool,

        /// Drop warnings
        #[arg(long)]
        no_warnings: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::builder();
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let config = Config::from_env()?;
    match &cli.command {
        Commands::Lex { input } => lex_file(input),
        Commands::Parse { input, diet, tree } => parse_file(input, config.diet(*diet), *tree),
        Commands::Print { input } => print_file(input, config),
        Commands::Directives { input } => show_directives(input, &config),
        Commands::Check { input, warnings_as_errors, no_warnings } => {
            let config = config.warnings_as_errors(*warnings_as_errors).suppress_warnings(*no_warnings);
            check(input, config)
        }
    }
}

fn load(input: &Path) -> Result<Source> {
    let text = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    Ok(Source::new(input.display().to_string(), text))
}

/// Print collected diagnostics; returns the number of errors
fn report(listener: &CollectingListener) -> usize {
    for diagnostic in &listener.diagnostics {
        eprintln!("{}", diagnostic);
    }
    listener.error_count()
}

fn lex_file(input: &Path) -> Result<()> {
    let source = load(input)?;
    let (tokens, comments) = dartc::parser::Lexer::new(source.text()).tokenize();
    for token in &tokens {
        let loc = source.location(token.span.offset);
        match token.error {
            Some(error) => println!("{}:{} {:?} {:?} ({:?})", loc.line, loc.column, token.token, token.lexeme, error),
            None => println!("{}:{} {:?} {:?}", loc.line, loc.column, token.token, token.lexeme),
        }
    }
    println!("{} tokens, {} comments", tokens.len(), comments.len());
    Ok(())
}

fn parse_file(input: &Path, config: Config, tree: bool) -> Result<()> {
    let source = load(input)?;
    let mut listener = CollectingListener::new();
    let unit = dartc::parse_unit(&source, 0, &config, &mut listener);
    if tree {
        println!("{:#?}", unit);
    } else {
        for decl in &unit.declarations {
            let (kind, name) = match decl {
                TopLevelDecl::Class(c) if c.is_interface => ("interface", c.name.name.as_str()),
                TopLevelDecl::Class(c) => ("class", c.name.name.as_str()),
                TopLevelDecl::TypeAlias(t) => ("typedef", t.name.name.as_str()),
                TopLevelDecl::Function(m) => ("function", m.name.name.as_str()),
                TopLevelDecl::Variables(f) => ("variables", f.variables.first().map_or("", |v| v.name.name.as_str())),
            };
            println!("{} {}", kind, name);
        }
    }
    let errors = report(&listener);
    if errors > 0 {
        bail!("{}: {} syntax error(s)", input.display(), errors);
    }
    Ok(())
}

fn print_file(input: &Path, config: Config) -> Result<()> {
    let source = load(input)?;
    let mut listener = CollectingListener::new();
    let unit = dartc::parse_unit(&source, 0, &config, &mut listener);
    report(&listener);
    print!("{}", print_unit(&unit));
    Ok(())
}

fn show_directives(input: &Path, config: &Config) -> Result<()> {
    let source = load(input)?;
    let library = dartc::parse_library_directives(&source, config);
    match &library.name {
        Some(name) => println!("library {}", name),
        None => println!("(not a library)"),
    }
    for import in &library.imports {
        match &import.prefix {
            Some(prefix) => println!("import {} as {}", import.path, prefix),
            None => println!("import {}", import.path),
        }
    }
    for part in &library.sources {
        println!("source {}", part);
    }
    for native in &library.natives {
        println!("native {}", native);
    }
    for resource in &library.resources {
        println!("resource {}", resource);
    }
    Ok(())
}

fn check(input: &Path, config: Config) -> Result<()> {
    let files: Vec<PathBuf> = if input.is_dir() {
        WalkDir::new(input)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().map_or(false, |ext| ext == SOURCE_EXTENSION))
            .collect()
    } else {
        vec![input.to_path_buf()]
    };

    let mut errors = 0;
    for file in &files {
        let dir = file.parent().unwrap_or_else(|| Path::new("."));
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("not a file: {}", file.display()))?;
        let provider = FileSources::new(dir);
        let mut listener = CollectingListener::new();
        let compilation = Compiler::new(config.clone(), &provider)
            .compile(&name, &mut listener)
            .with_context(|| format!("compiling {}", file.display()))?;
        log::debug!(
            "{}: {} libraries, {} elements",
            file.display(),
            compilation.libraries.len(),
            compilation.program.elements.len()
        );
        errors += report(&listener);
    }

    println!("checked {} file(s), {} error(s)", files.len(), errors);
    if errors > 0 {
        bail!("{} error(s)", errors);
    }
    Ok(())
}
