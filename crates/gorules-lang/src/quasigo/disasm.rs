use std::fmt::Write;

use super::env::{Env, Func};
use super::opcode::Opcode;

/// Renders the bytecode of `func`, one instruction per line.
///
/// Operands are resolved where possible: constants are printed by value,
/// jumps by absolute target and calls by function name.
pub fn disasm(env: &Env, func: &Func) -> String {
    let mut out = String::new();
    let code = &func.code[..];
    let mut pc = 0;

    while pc < code.len() {
        let Some(op) = Opcode::from_u8(code[pc]) else {
            let _ = writeln!(out, "{:>4}  <bad opcode {:#04x}>", pc, code[pc]);
            pc += 1;
            continue;
        };
        if pc + op.width() > code.len() {
            let _ = writeln!(out, "{:>4}  <truncated {}>", pc, op.name());
            break;
        }

        let _ = write!(out, "{:>4}  {}", pc, op.name());
        match op {
            Opcode::PushParam | Opcode::PushLocal | Opcode::SetLocal | Opcode::IncLocal | Opcode::DecLocal => {
                let _ = write!(out, " {}", code[pc + 1]);
            }
            Opcode::PushConst => {
                let index = usize::from(code[pc + 1]);
                match func.constants.get(index) {
                    Some(value) => {
                        let _ = write!(out, " {}", value);
                    }
                    None => {
                        let _ = write!(out, " #{}", index);
                    }
                }
            }
            Opcode::Jump | Opcode::JumpFalse | Opcode::JumpTrue => {
                let offset = i16::from_le_bytes([code[pc + 1], code[pc + 2]]);
                let _ = write!(out, " {}", pc.wrapping_add_signed(isize::from(offset)));
            }
            Opcode::Call => {
                let id = u16::from_le_bytes([code[pc + 1], code[pc + 2]]);
                match env.func(id) {
                    Some(callee) => {
                        let _ = write!(out, " {}", callee.name);
                    }
                    None => {
                        let _ = write!(out, " #{}", id);
                    }
                }
            }
            Opcode::CallRecur => {
                let _ = write!(out, " {}", func.name);
            }
            Opcode::CallNative => {
                let id = u16::from_le_bytes([code[pc + 1], code[pc + 2]]);
                match env.native(id) {
                    Some(native) => {
                        let _ = write!(out, " {}", native.name);
                    }
                    None => {
                        let _ = write!(out, " #{}", id);
                    }
                }
            }
            _ => {}
        }
        out.push('\n');
        pc += op.width();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_funcs;
    use crate::quasigo::compile::compile_package;
    use crate::quasigo::types::{Signature, Type};
    use rstest::rstest;

    #[test]
    fn test_disasm() {
        let mut env = Env::new();
        env.add_native_func(
            "strings",
            "HasPrefix",
            Signature::new([Type::String, Type::String], [Type::Bool]),
            |_| {},
        );
        let decls = parse_funcs(
            r#"func f(s string, n int) bool { if n > 3 { return strings.HasPrefix(s, "x") }; return false }"#,
        )
        .unwrap();
        compile_package(&mut env, "main", &decls).unwrap();
        let (_, func) = env.lookup_func("main", "f").unwrap();

        assert_eq!(
            disasm(&env, func),
            [
                "   0  PushParam 1",
                "   2  PushConst 3",
                "   4  GtInt",
                "   5  JumpFalse 16",
                "   8  PushParam 0",
                "  10  PushConst \"x\"",
                "  12  CallNative strings.HasPrefix",
                "  15  ReturnTop",
                "  16  ReturnFalse",
                "",
            ]
            .join("\n")
        );
    }

    #[rstest]
    #[case::lt("<", "LtString")]
    #[case::leq("<=", "LtEqString")]
    #[case::gt(">", "GtString")]
    #[case::geq(">=", "GtEqString")]
    fn test_disasm_string_ordering(#[case] op: &str, #[case] expected: &str) {
        let mut env = Env::new();
        let decls = parse_funcs(&format!("func f(a string, b string) bool {{ return a {} b }}", op)).unwrap();
        compile_package(&mut env, "main", &decls).unwrap();
        let (_, func) = env.lookup_func("main", "f").unwrap();

        assert_eq!(
            disasm(&env, func),
            format!("   0  PushParam 0\n   2  PushParam 1\n   4  {}\n   5  ReturnTop\n", expected)
        );
    }

    #[test]
    fn test_disasm_bad_opcode() {
        let func = Func {
            name: "bad".into(),
            code: vec![0xff, Opcode::ReturnTrue as u8],
            constants: Vec::new(),
            num_params: 0,
            num_locals: 0,
            sig: Signature::default(),
        };
        assert_eq!(disasm(&Env::new(), &func), "   0  <bad opcode 0xff>\n   1  ReturnTrue\n");
    }
}
