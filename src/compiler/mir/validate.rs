use std::collections::HashSet;

use super::ir::{Function, Label, StmtKind};

/// Checks that every label `func` jumps to is placed by exactly one label
/// statement of `func`.  A failure is a bug in the MIR builder.
pub fn check_labels(func: &Function) -> Result<(), String> {
    let mut placed: HashSet<Label> = HashSet::new();
    for stmt in &func.body {
        if let StmtKind::LabelStmt(label) = stmt.kind {
            if !placed.insert(label) {
                return Err(format!("Label {} is placed more than once in {}", label, func.entity));
            }
        }
    }

    for stmt in &func.body {
        for target in stmt.targets() {
            if !placed.contains(&target) {
                return Err(format!("Jump to undefined label {} in {}", target, func.entity));
            }
        }
    }

    Ok(())
}
