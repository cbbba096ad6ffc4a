use indoc::indoc;

use crate::ir::{
    CmpOp, FunctionBuilder, IrConst, IrType, Module, format_func, format_module, parse_func,
};

#[test]
fn test_format_built_function() {
    let i32_ty = IrType::int(32, true);
    let mut builder = FunctionBuilder::new("diff", i32_ty.clone());
    let entry = builder.add_block();
    let x = builder.add_block_param(entry, i32_ty.clone());
    let y = builder.add_block_param(entry, i32_ty.clone());
    let d = builder.sub(entry, x, y, i32_ty);
    let pos = builder.add_block();
    let rest = builder.add_block();
    builder.cond_br(entry, CmpOp::Gt, d, IrConst::int(0, 32, true), pos, rest);
    builder.ret(pos, Some(IrConst::int(1, 32, true).into()));
    builder.ret(rest, Some(d.into()));
    let func = builder.finish();

    let expected = indoc! {"
        fn diff(i32, i32) -> i32 {
          bb0(%v0: i32, %v1: i32):
            %v2: i32 = sub %v0, %v1

            cbr.gt %v2, 0:i32, bb1, bb2

          bb1():
            ret 1:i32

          bb2():
            ret %v2
        }
    "};
    assert_eq!(format_func(&func), expected);
}

#[test]
fn test_format_round_trips_every_form() {
    let text = indoc! {"
        fn misc(ptr<i64>, i64, f64) -> () {
          bb0(%v0: ptr<i64>, %v1: i64, %v2: f64):
            %v3: i64 = load %v0
            %v4: i64 = neg %v3
            %v5: i64 = copy %v4
            store %v0, %v5
            %v6: bool = cmp.ne %v5, -1:i64
            call @log(%v6, 1.5:f64)
            %v7: f64 = call @scale(%v2)

            cbr.le %v1, %v5, bb1(%v1), bb2

          bb1(%v8: i64):
            br bb2

          bb2():
            unreachable
        }
    "};
    let func = parse_func(text).expect("parse");
    assert_eq!(format_func(&func), text);
}

#[test]
fn test_format_module_separates_functions() {
    let first = parse_func("fn a() -> () { bb0(): ret }").expect("parse");
    let second = parse_func("fn b(u8) -> u8 { bb0(%v0: u8): ret %v0 }").expect("parse");
    let module = Module {
        funcs: vec![first, second],
    };

    let expected = indoc! {"
        fn a() -> () {
          bb0():
            ret
        }

        fn b(u8) -> u8 {
          bb0(%v0: u8):
            ret %v0
        }
    "};
    assert_eq!(format_module(&module), expected);
}

#[test]
fn test_format_constants() {
    assert_eq!(IrConst::int(-7, 16, true).to_string(), "-7:i16");
    assert_eq!(IrConst::int(0, 8, false).to_string(), "0:u8");
    assert_eq!(IrConst::float(2.0, 64).to_string(), "2.0:f64");
    assert_eq!(IrConst::Bool(true).to_string(), "true");
    assert_eq!(IrType::ptr(IrType::int(32, true)).to_string(), "ptr<i32>");
    assert_eq!(IrType::Unit.to_string(), "()");
}
