// Global safety caps to prevent pathological or runaway work

// Parser: global gas limit (upper bound on parser steps per token of input)
pub const PARSER_GAS_PER_TOKEN: usize = 64;
// Parser: gas floor so tiny inputs still get a useful budget
pub const PARSER_MIN_GAS: usize = 10_000;
// Parser: maximum nesting depth of expressions/statements before bailing out
pub const PARSER_MAX_DEPTH: usize = 128;

// Diagnostics: default per-unit error budget
pub const DEFAULT_MAX_ERRORS: usize = 100;

// Resolver: hierarchy walks (supertype chains, redirect chains)
pub const RESOLVER_MAX_HIERARCHY_STEPS: usize = 10_000;

// Constant evaluation: nesting depth of const constructor invocations
pub const CONST_MAX_DEPTH: usize = 256;

// File extension recognized by the CLI when walking directories
pub const SOURCE_EXTENSION: &str = "dart";

// Pseudo-keywords: legal identifiers everywhere except as type names
pub const BUILT_IN_IDENTIFIERS: &[&str] = &[
    "abstract", "factory", "get", "implements", "import", "interface",
    "library", "native", "negate", "operator", "set", "source", "static", "typedef",
];
