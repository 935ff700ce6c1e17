//! The pipeline which takes a resolved program unit to assembly: register
//! and check the unit's types, lower every function to MIR, then generate
//! code.  Each stage reports problems to an [`ErrorHandler`] and the
//! pipeline stops before code generation if any error was reported.

use std::{str::FromStr, time::Instant};

use log::{debug, info};
use serde::Serialize;
use thiserror::Error;

use crate::{
    compiler::{
        ast::ProgramUnit,
        mir::{build_mir, Mir},
        types::{TypeSummary, TypeTable, WidthProfile},
        x86::{assembly::AssemblyCode, generate_assembly_with, CodegenOptions},
    },
    diagnostics::ErrorHandler,
    result::Result,
};

/// The serialization format of the input unit and of the dumps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Format> {
        match s {
            "json" => Ok(Format::Json),
            "yaml" => Ok(Format::Yaml),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// The stage whose result the pipeline returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emit {
    Types,
    Mir,
    Asm,
}

impl FromStr for Emit {
    type Err = String;

    fn from_str(s: &str) -> Result<Emit> {
        match s {
            "types" => Ok(Emit::Types),
            "mir" => Ok(Emit::Mir),
            "asm" => Ok(Emit::Asm),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Options {
    pub emit: Emit,
    pub profile: WidthProfile,
    pub verbose_asm: bool,
    /// Name of the source file, for the `.file` directive.
    pub file_name: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            emit: Emit::Asm,
            profile: WidthProfile::ILP32,
            verbose_asm: false,
            file_name: None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("{0} error(s) in type definitions")]
    TypeCheck(usize),
    #[error("{0} error(s) in the program")]
    Semantic(usize),
    #[error("the x86 target does not support the {0} profile")]
    UnsupportedProfile(String),
}

/// What the pipeline produced, depending on [`Options::emit`].
#[derive(Debug)]
pub enum Output {
    Types(Vec<TypeSummary>),
    Mir(Mir),
    Asm(AssemblyCode),
}

impl Output {
    /// Renders the output as text: assembly as GNU `as` source, dumps in
    /// `format`.
    pub fn render(&self, format: Format) -> Result<String> {
        match self {
            Output::Types(types) => dump(types, format),
            Output::Mir(mir) => dump(mir, format),
            Output::Asm(code) => Ok(code.to_string()),
        }
    }
}

fn dump<T: Serialize>(value: &T, format: Format) -> Result<String> {
    match format {
        Format::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
    }
}

/// Reads a program unit.
pub fn parse_unit(text: &str, format: Format) -> Result<ProgramUnit> {
    match format {
        Format::Json => serde_json::from_str(text).map_err(|e| format!("Invalid program unit: {}", e)),
        Format::Yaml => serde_yaml::from_str(text).map_err(|e| format!("Invalid program unit: {}", e)),
    }
}

/// Runs the pipeline up to the stage `options.emit` names.  Diagnostics are
/// left in `handler`; an error is returned if any stage reported an error.
pub fn compile(
    unit: ProgramUnit,
    options: &Options,
    handler: &mut ErrorHandler,
) -> std::result::Result<Output, PipelineError> {
    if options.emit == Emit::Asm && options.profile.pointer_size != WidthProfile::ILP32.pointer_size {
        return Err(PipelineError::UnsupportedProfile(options.profile.name.into()));
    }

    let ProgramUnit {
        types: definitions,
        mut program,
    } = unit;

    let start = Instant::now();
    let mut types = TypeTable::new(options.profile);
    for def in &definitions {
        types.define(def);
    }
    types.resolve_definitions();
    types.semantic_check(handler);
    info!(
        "Types: {} types checked in {:.3}s",
        types.len(),
        start.elapsed().as_secs_f32()
    );
    if handler.error_occurred() {
        return Err(PipelineError::TypeCheck(handler.num_errors()));
    }
    if options.emit == Emit::Types {
        return Ok(Output::Types(types.dump()));
    }

    let start = Instant::now();
    program.entities.resolve_types(&mut types);
    program.mark_references();
    let mir = build_mir(program, &mut types, handler);
    for func in &mir.functions {
        func.scope.check_references(&mir.entities, handler);
    }
    info!(
        "MIR: {} functions built in {:.3}s",
        mir.functions.len(),
        start.elapsed().as_secs_f32()
    );
    if handler.error_occurred() {
        return Err(PipelineError::Semantic(handler.num_errors()));
    }
    if options.emit == Emit::Mir {
        return Ok(Output::Mir(mir));
    }

    let start = Instant::now();
    let codegen = CodegenOptions {
        file_name: options.file_name.clone(),
        verbose_asm: options.verbose_asm,
    };
    let code = generate_assembly_with(mir, &types, &codegen);
    info!(
        "x86: {} instructions generated in {:.3}s",
        code.instruction_count(),
        start.elapsed().as_secs_f32()
    );
    debug!("{} warning(s)", handler.num_warnings());
    Ok(Output::Asm(code))
}
