use std::sync::Arc;

use smol_str::SmolStr;

use super::compile::MAX_LOCALS;
use super::env::{EvalEnv, Func};
use super::opcode::Opcode;
use super::value::Value;

#[inline(always)]
fn read_index(code: &[u8], pc: usize) -> usize {
    usize::from(code[pc + 1])
}

#[inline(always)]
fn read_id(code: &[u8], pc: usize) -> u16 {
    u16::from_le_bytes([code[pc + 1], code[pc + 2]])
}

#[inline(always)]
fn jump_target(code: &[u8], pc: usize) -> usize {
    let offset = i16::from_le_bytes([code[pc + 1], code[pc + 2]]);
    pc.wrapping_add_signed(isize::from(offset))
}

/// `s[low:high]` over bytes. Out of range bounds and bounds that split a
/// UTF-8 sequence yield an empty string.
fn slice_str(s: &str, low: Option<i64>, high: Option<i64>) -> SmolStr {
    let bound = |n: Option<i64>, default: usize| match n {
        Some(n) => usize::try_from(n).ok(),
        None => Some(default),
    };
    match (bound(low, 0), bound(high, s.len())) {
        (Some(low), Some(high)) if low <= high => {
            s.get(low..high).map(SmolStr::new).unwrap_or_default()
        }
        _ => SmolStr::default(),
    }
}

/// Runs `func` with `args` on the stack of `env` and returns its result.
///
/// Integer arithmetic wraps around and division by zero yields 0.
///
/// # Panics
///
/// Panics on bytecode that was not produced by the compiler for the
/// functions registered in `env`.
pub fn eval(env: &mut EvalEnv, func: &Func, args: &[Value]) -> Value {
    let code = &func.code[..];
    let mut locals: [Value; MAX_LOCALS] = Default::default();
    let mut pc = 0;

    macro_rules! int_op {
        (|$x:ident, $y:ident| $result:expr) => {{
            let $y = env.stack.pop_int();
            let $x = env.stack.pop_int();
            env.stack.push($result);
        }};
    }

    macro_rules! str_op {
        (|$x:ident, $y:ident| $result:expr) => {{
            let $y = env.stack.pop_str();
            let $x = env.stack.pop_str();
            env.stack.push($result);
        }};
    }

    loop {
        let Some(op) = code.get(pc).copied().and_then(Opcode::from_u8) else {
            panic!("malformed bytecode in {} at {}", func.name, pc);
        };

        match op {
            Opcode::Pop => {
                env.stack.pop();
            }
            Opcode::Dup => {
                let top = env.stack.top().cloned().unwrap_or_default();
                env.stack.push(top);
            }
            Opcode::PushParam => env.stack.push(args[read_index(code, pc)].clone()),
            Opcode::PushLocal => env.stack.push(locals[read_index(code, pc)].clone()),
            Opcode::PushConst => env.stack.push(func.constants[read_index(code, pc)].clone()),
            Opcode::PushTrue => env.stack.push(true),
            Opcode::PushFalse => env.stack.push(false),
            Opcode::PushNil => env.stack.push(Value::Nil),
            Opcode::SetLocal => locals[read_index(code, pc)] = env.stack.pop(),
            Opcode::IncLocal => {
                let local = &mut locals[read_index(code, pc)];
                *local = Value::Int(local.as_int().wrapping_add(1));
            }
            Opcode::DecLocal => {
                let local = &mut locals[read_index(code, pc)];
                *local = Value::Int(local.as_int().wrapping_sub(1));
            }
            Opcode::Jump => {
                pc = jump_target(code, pc);
                continue;
            }
            Opcode::JumpFalse => {
                if !env.stack.pop_bool() {
                    pc = jump_target(code, pc);
                    continue;
                }
            }
            Opcode::JumpTrue => {
                if env.stack.pop_bool() {
                    pc = jump_target(code, pc);
                    continue;
                }
            }
            Opcode::ReturnTop => return env.stack.pop(),
            Opcode::ReturnTrue => return Value::Bool(true),
            Opcode::ReturnFalse => return Value::Bool(false),
            Opcode::Call => {
                let id = read_id(code, pc);
                let Some(callee) = env.env.func(id).map(Arc::clone) else {
                    panic!("malformed bytecode in {}: unknown function #{}", func.name, id);
                };
                let call_args = env.stack.pop_n(callee.num_params);
                let result = eval(env, &callee, &call_args);
                env.stack.push(result);
            }
            Opcode::CallRecur => {
                let call_args = env.stack.pop_n(func.num_params);
                let result = eval(env, func, &call_args);
                env.stack.push(result);
            }
            Opcode::CallNative => {
                let id = read_id(code, pc);
                let Some(native) = env.env.native(id).map(|native| Arc::clone(&native.func)) else {
                    panic!("malformed bytecode in {}: unknown native #{}", func.name, id);
                };
                native(&mut env.stack);
            }
            Opcode::IsNil => {
                let value = env.stack.pop();
                env.stack.push(value.is_nil());
            }
            Opcode::IsNotNil => {
                let value = env.stack.pop();
                env.stack.push(!value.is_nil());
            }
            Opcode::Not => {
                let b = env.stack.pop_bool();
                env.stack.push(!b);
            }
            Opcode::Neg => {
                let n = env.stack.pop_int();
                env.stack.push(n.wrapping_neg());
            }
            Opcode::EqInt => int_op!(|x, y| x == y),
            Opcode::NotEqInt => int_op!(|x, y| x != y),
            Opcode::GtInt => int_op!(|x, y| x > y),
            Opcode::GtEqInt => int_op!(|x, y| x >= y),
            Opcode::LtInt => int_op!(|x, y| x < y),
            Opcode::LtEqInt => int_op!(|x, y| x <= y),
            Opcode::Add => int_op!(|x, y| x.wrapping_add(y)),
            Opcode::Sub => int_op!(|x, y| x.wrapping_sub(y)),
            Opcode::Mul => int_op!(|x, y| x.wrapping_mul(y)),
            Opcode::Div => int_op!(|x, y| if y == 0 { 0 } else { x.wrapping_div(y) }),
            Opcode::Mod => int_op!(|x, y| if y == 0 { 0 } else { x.wrapping_rem(y) }),
            Opcode::EqBool => {
                let y = env.stack.pop_bool();
                let x = env.stack.pop_bool();
                env.stack.push(x == y);
            }
            Opcode::NotEqBool => {
                let y = env.stack.pop_bool();
                let x = env.stack.pop_bool();
                env.stack.push(x != y);
            }
            Opcode::EqString => str_op!(|x, y| x == y),
            Opcode::NotEqString => str_op!(|x, y| x != y),
            Opcode::Concat => str_op!(|x, y| format!("{}{}", x, y)),
            Opcode::LtString => str_op!(|x, y| x < y),
            Opcode::LtEqString => str_op!(|x, y| x <= y),
            Opcode::GtString => str_op!(|x, y| x > y),
            Opcode::GtEqString => str_op!(|x, y| x >= y),
            Opcode::StringLen => {
                let s = env.stack.pop_str();
                env.stack.push(s.len());
            }
            Opcode::StringSlice => {
                let high = env.stack.pop_int();
                let low = env.stack.pop_int();
                let s = env.stack.pop_str();
                env.stack.push(slice_str(&s, Some(low), Some(high)));
            }
            Opcode::StringSliceFrom => {
                let low = env.stack.pop_int();
                let s = env.stack.pop_str();
                env.stack.push(slice_str(&s, Some(low), None));
            }
            Opcode::StringSliceTo => {
                let high = env.stack.pop_int();
                let s = env.stack.pop_str();
                env.stack.push(slice_str(&s, None, Some(high)));
            }
        }

        pc += op.width();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quasigo::env::Env;
    use crate::quasigo::types::{Signature, Type};
    use rstest::rstest;

    fn func(code: Vec<u8>, constants: Vec<Value>, num_params: usize) -> Func {
        Func {
            name: "test".into(),
            code,
            constants,
            num_params,
            num_locals: 0,
            sig: Signature::default(),
        }
    }

    fn run(f: &Func, args: &[Value]) -> Value {
        let mut env = EvalEnv::new(Arc::new(Env::new()));
        let result = eval(&mut env, f, args);
        assert!(env.stack.is_empty());
        result
    }

    #[rstest]
    #[case::div(Opcode::Div, 7, 2, 3)]
    #[case::div_by_zero(Opcode::Div, 7, 0, 0)]
    #[case::mod_by_zero(Opcode::Mod, 7, 0, 0)]
    #[case::rem(Opcode::Mod, -7, 2, -1)]
    #[case::overflow(Opcode::Add, i64::MAX, 1, i64::MIN)]
    #[case::div_overflow(Opcode::Div, i64::MIN, -1, i64::MIN)]
    fn test_int_ops(#[case] op: Opcode, #[case] x: i64, #[case] y: i64, #[case] expected: i64) {
        let f = func(
            vec![
                Opcode::PushParam as u8,
                0,
                Opcode::PushParam as u8,
                1,
                op as u8,
                Opcode::ReturnTop as u8,
            ],
            Vec::new(),
            2,
        );
        assert_eq!(run(&f, &[Value::Int(x), Value::Int(y)]), Value::Int(expected));
    }

    #[rstest]
    #[case::full("hello", Some(1), Some(3), "el")]
    #[case::from("hello", Some(3), None, "lo")]
    #[case::to("hello", None, Some(2), "he")]
    #[case::out_of_range("hello", Some(2), Some(10), "")]
    #[case::negative("hello", Some(-1), None, "")]
    #[case::inverted("hello", Some(3), Some(1), "")]
    #[case::split_char("é", Some(1), None, "")]
    fn test_slice_str(
        #[case] s: &str,
        #[case] low: Option<i64>,
        #[case] high: Option<i64>,
        #[case] expected: &str,
    ) {
        assert_eq!(slice_str(s, low, high), expected);
    }

    #[test]
    fn test_backward_jump() {
        // for i := 0; i < n; i++ {}; return i
        let f = func(
            vec![
                Opcode::PushConst as u8,
                0,
                Opcode::SetLocal as u8,
                0,
                Opcode::PushLocal as u8,
                0,
                Opcode::PushParam as u8,
                0,
                Opcode::LtInt as u8,
                Opcode::JumpFalse as u8,
                8,
                0,
                Opcode::IncLocal as u8,
                0,
                Opcode::Jump as u8,
                (-10i16).to_le_bytes()[0],
                (-10i16).to_le_bytes()[1],
                Opcode::PushLocal as u8,
                0,
                Opcode::ReturnTop as u8,
            ],
            vec![Value::Int(0)],
            1,
        );
        assert_eq!(run(&f, &[Value::Int(5)]), Value::Int(5));
    }

    #[test]
    fn test_native_call_uses_stack() {
        let mut env = Env::new();
        let id = env.add_native_func(
            "strings",
            "ToUpper",
            Signature::new([Type::String], [Type::String]),
            |stack| {
                let s = stack.pop_str();
                stack.push(s.to_uppercase());
            },
        )
        .unwrap();
        let [lo, hi] = id.to_le_bytes();
        let f = func(
            vec![
                Opcode::PushParam as u8,
                0,
                Opcode::CallNative as u8,
                lo,
                hi,
                Opcode::ReturnTop as u8,
            ],
            Vec::new(),
            1,
        );
        let mut eval_env = EvalEnv::new(Arc::new(env));
        assert_eq!(eval(&mut eval_env, &f, &[Value::from("go")]), Value::from("GO"));
    }

    #[test]
    #[should_panic(expected = "malformed bytecode")]
    fn test_malformed_bytecode() {
        run(&func(vec![0xff], Vec::new(), 0), &[]);
    }
}
