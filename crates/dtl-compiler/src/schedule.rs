//! Scheduler: flatten the reachable IR into the evaluator's command stream.
//!
//! Evaluation commands come out in reverse-postorder over the roots, so
//! every shape and array is computed before anything that reads it - in
//! particular a shape is always evaluated before any array of that shape.
//! Trace and export commands follow. Finally, a `CollectArray` is woven in
//! after each array's last consumer so the evaluator's cache only holds
//! live arrays.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use dtl_ir::{Arena, ArrayId, Command, ExprId, traverse_depth_first};

pub fn compile_ir_to_commands(
    arena: &Arena,
    roots: &[ExprId],
    traces: &[(ArrayId, Uuid)],
    exports: &[(String, Vec<(String, ArrayId)>)],
) -> Vec<Command> {
    let mut commands: Vec<Command> = traverse_depth_first(arena, roots)
        .into_iter()
        .map(|id| match id {
            ExprId::Shape(expression) => Command::EvaluateShape { expression },
            ExprId::Array(expression) => Command::EvaluateArray { expression },
        })
        .collect();

    for (expression, uuid) in traces {
        commands.push(Command::TraceArray {
            expression: *expression,
            uuid: *uuid,
        });
    }

    for (name, columns) in exports {
        commands.push(Command::ExportTable {
            name: name.clone(),
            columns: columns.clone(),
        });
    }

    insert_collects(arena, commands)
}

/// Insert a `CollectArray` for every evaluated array directly after the
/// last command that reads it.
fn insert_collects(arena: &Arena, commands: Vec<Command>) -> Vec<Command> {
    let mut evaluated = HashSet::new();
    let mut last_use: HashMap<ArrayId, usize> = HashMap::new();

    for (index, command) in commands.iter().enumerate() {
        if let Command::EvaluateArray { expression } = command {
            evaluated.insert(*expression);
            // An array nothing ever reads is collectable right away.
            last_use.insert(*expression, index);
        }
        for dependency in command.array_dependencies(arena) {
            last_use.insert(dependency, index);
        }
    }

    let mut collect_at: HashMap<usize, Vec<ArrayId>> = HashMap::new();
    for (&array, &index) in &last_use {
        if evaluated.contains(&array) {
            collect_at.entry(index).or_default().push(array);
        }
    }

    let mut out = Vec::with_capacity(commands.len() + evaluated.len());
    for (index, command) in commands.into_iter().enumerate() {
        out.push(command);
        if let Some(mut arrays) = collect_at.remove(&index) {
            arrays.sort();
            for expression in arrays {
                out.push(Command::CollectArray { expression });
            }
        }
    }
    out
}
