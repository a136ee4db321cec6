#[allow(
    clippy::indexing_slicing,
    clippy::wildcard_imports,
    clippy::module_name_repetitions,
)]
pub mod ast;
#[allow(
    clippy::indexing_slicing,
    clippy::module_name_repetitions,
)]
pub mod error;
pub mod preprocess;
#[allow(
    clippy::indexing_slicing,
    clippy::cast_possible_truncation,
    clippy::single_match_else,
)]
pub mod lexer;
#[allow(
    clippy::indexing_slicing,
    clippy::wildcard_imports,
    clippy::single_match_else,
    clippy::needless_pass_by_value,
)]
pub mod parser;
#[allow(
    clippy::indexing_slicing,
    clippy::wildcard_imports,
    clippy::single_match_else,
)]
pub mod expr;
#[allow(
    clippy::indexing_slicing,
    clippy::wildcard_imports,
)]
pub mod desugar;
#[allow(
    clippy::indexing_slicing,
    clippy::wildcard_imports,
    clippy::module_name_repetitions,
)]
pub mod synth;
#[allow(
    clippy::indexing_slicing,
    clippy::wildcard_imports,
    clippy::match_same_arms,
)]
pub mod builtins;
#[allow(
    clippy::indexing_slicing,
    clippy::wildcard_imports,
    clippy::needless_pass_by_value,
)]
pub mod resolve;

use error::DslError;
use synth::ProgramUnit;

/// Translate one RyxScript source unit into a resolved `ProgramUnit`.
///
/// This is the primary public entry point for the DSL pipeline:
/// source → strip comments → lex → parse blocks → synthesize + desugar → resolve
pub fn translate(unit_name: &str, source: &str) -> Result<ProgramUnit, DslError> {
    let text = preprocess::strip_comments(source);
    let tokens = lexer::lex(&text)?;
    let nodes = parser::parse(tokens)?;
    let mut unit = synth::synthesize_unit(unit_name, &nodes)?;
    resolve::resolve_unit(&mut unit)?;
    Ok(unit)
}
