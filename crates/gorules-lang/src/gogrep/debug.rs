use std::fmt::Write;

use super::operation::{
    BINARY_OPS, BRANCH_KINDS, Operation, UNARY_OPS, ValueKind, decode_assign_op,
};
use super::program::{Instruction, Program};

/// Renders `prog` one instruction per line, indenting arguments under the
/// instruction that owns them.
pub fn dump_program(prog: &Program) -> String {
    let mut out = String::new();
    let mut pc = 0;
    while pc < prog.insts.len() {
        pc = dump_inst(prog, pc, 0, &mut out);
    }
    out
}

fn dump_inst(prog: &Program, pc: usize, depth: usize, out: &mut String) -> usize {
    let inst = prog.insts[pc];
    let _ = writeln!(out, "{}{}", " ".repeat(depth * 2), describe(prog, inst));

    let info = inst.op.info();
    let mut pc = pc + 1;
    for i in 0..info.num_args {
        if info.is_variadic_arg(i) {
            while pc < prog.insts.len() && prog.insts[pc].op != Operation::End {
                pc = dump_inst(prog, pc, depth + 1, out);
            }
            if pc < prog.insts.len() {
                pc = dump_inst(prog, pc, depth + 1, out);
            }
        } else if pc < prog.insts.len() {
            pc = dump_inst(prog, pc, depth + 1, out);
        }
    }
    pc
}

fn describe(prog: &Program, inst: Instruction) -> String {
    let info = inst.op.info();
    let mut values = Vec::new();

    match info.value_kind {
        ValueKind::Empty => {}
        ValueKind::String => values.push(format!("{:?}", prog.string(inst.value_index).as_str())),
        ValueKind::ChanDir => values.push(
            match inst.value {
                0 => "both",
                1 => "send",
                _ => "recv",
            }
            .to_string(),
        ),
        ValueKind::Token => values.push(token_name(inst)),
    }
    if info.extra_value_kind == ValueKind::String {
        values.push(format!("{:?}", prog.string(inst.value_index).as_str()));
    }

    if values.is_empty() {
        inst.op.name().to_string()
    } else {
        format!("{} {}", inst.op.name(), values.join(" "))
    }
}

fn token_name(inst: Instruction) -> String {
    let index = usize::from(inst.value);
    let name = match inst.op {
        Operation::UnaryExpr => UNARY_OPS.get(index).map(|op| op.as_str().to_string()),
        Operation::BinaryExpr => BINARY_OPS.get(index).map(|op| op.as_str().to_string()),
        Operation::BranchStmt | Operation::LabeledBranchStmt => {
            BRANCH_KINDS.get(index).map(|kind| kind.as_str().to_string())
        }
        Operation::AssignStmt | Operation::MultiAssignStmt => {
            decode_assign_op(inst.value).map(|op| op.to_string())
        }
        Operation::IncDecStmt => Some(if inst.value == 0 { "++" } else { "--" }.to_string()),
        Operation::RangeKeyStmt | Operation::RangeKeyValueStmt => {
            Some(if inst.value == 1 { ":=" } else { "=" }.to_string())
        }
        _ => None,
    };
    name.unwrap_or_else(|| format!("?{}", inst.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gogrep::compile::compile;

    #[test]
    fn test_dump_nested() {
        let prog = compile("f($x, 1) == $x").unwrap();
        assert_eq!(
            dump_program(&prog),
            "BinaryExpr ==\n  NonVariadicCallExpr\n    Ident \"f\"\n    NamedNode \"x\"\n    StrictIntLit \"1\"\n    End\n  NamedNode \"x\"\n"
        );
    }

    #[test]
    fn test_dump_assign() {
        let prog = compile("$x += 1").unwrap();
        assert_eq!(
            dump_program(&prog),
            "AssignStmt +=\n  NamedNode \"x\"\n  StrictIntLit \"1\"\n"
        );
    }
}
