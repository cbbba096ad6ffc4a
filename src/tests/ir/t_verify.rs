use indoc::indoc;

use crate::ir::{
    BlockId, FunctionBuilder, InstKind, Instruction, IrType, Module, ValueId, VerifyError,
    parse_func, verify_function, verify_module,
};

fn verify_text(text: &str) -> Result<(), VerifyError> {
    verify_function(&parse_func(text).expect("parse"))
}

#[test]
fn test_verify_accepts_well_formed_function() {
    verify_text(indoc! {"
        fn f(i32, i32) -> i32 {
          bb0(%v0: i32, %v1: i32):
            %v2: i32 = sub %v0, %v1
            %v3: bool = cmp.ne %v2, 0:i32
            cbr.ge %v2, 0:i32, bb1(%v2), bb2

          bb1(%v4: i32):
            ret %v4

          bb2():
            %v5: i32 = neg %v2
            ret %v5
        }
    "})
    .expect("verify");
}

#[test]
fn test_verify_accepts_use_before_def_in_layout() {
    verify_text(indoc! {"
        fn f(i32) -> i32 {
          bb0(%v0: i32):
            br bb2

          bb1():
            ret %v1

          bb2():
            %v1: i32 = copy %v0
            br bb1
        }
    "})
    .expect("verify");
}

#[test]
fn test_verify_undefined_value() {
    let err = verify_text(indoc! {"
        fn f() -> i32 {
          bb0():
            ret %v9
        }
    "})
    .unwrap_err();
    assert_eq!(
        err,
        VerifyError::UndefinedValue {
            func: "f".to_string(),
            block: BlockId(0),
            value: ValueId(9),
        }
    );
    assert_eq!(err.to_string(), "ssa verify: f bb0: use of undefined value %v9");
}

#[test]
fn test_verify_redefinition_across_blocks() {
    let i32_ty = IrType::int(32, true);
    let mut builder = FunctionBuilder::new("f", IrType::Unit);
    let entry = builder.add_block();
    let x = builder.add_block_param(entry, i32_ty);
    let next = builder.add_block();
    builder.push_block_param(next, x);
    builder.br(entry, next, vec![x.into()]);
    builder.ret(next, None);

    let err = verify_function(&builder.finish()).unwrap_err();
    assert_eq!(
        err,
        VerifyError::Redefined {
            func: "f".to_string(),
            block: next,
            value: x,
        }
    );
}

#[test]
fn test_verify_untyped_value() {
    let mut builder = FunctionBuilder::new("f", IrType::Unit);
    let entry = builder.add_block();
    builder.push_inst(
        entry,
        Instruction {
            result: Some(ValueId(42)),
            kind: InstKind::Call {
                name: "g".to_string(),
                args: Vec::new(),
            },
        },
    );
    builder.ret(entry, None);

    let err = verify_function(&builder.finish()).unwrap_err();
    assert_eq!(
        err,
        VerifyError::UntypedValue {
            func: "f".to_string(),
            block: entry,
            value: ValueId(42),
        }
    );
}

#[test]
fn test_verify_branch_errors() {
    let err = verify_text(indoc! {"
        fn f() -> () {
          bb0():
            br bb7
        }
    "})
    .unwrap_err();
    assert_eq!(
        err,
        VerifyError::MissingBlock {
            func: "f".to_string(),
            block: BlockId(0),
            target: BlockId(7),
        }
    );

    let err = verify_text(indoc! {"
        fn f() -> () {
          bb0():
            br bb1

          bb1(%v0: i32):
            ret
        }
    "})
    .unwrap_err();
    assert_eq!(
        err,
        VerifyError::ArgCount {
            func: "f".to_string(),
            block: BlockId(0),
            target: BlockId(1),
            expected: 1,
            found: 0,
        }
    );

    let err = verify_text(indoc! {"
        fn f() -> () {
          bb0():
            br bb1(1:u32)

          bb1(%v0: i32):
            ret
        }
    "})
    .unwrap_err();
    assert_eq!(
        err,
        VerifyError::ArgType {
            func: "f".to_string(),
            block: BlockId(0),
            target: BlockId(1),
            index: 0,
        }
    );
}

#[test]
fn test_verify_type_mismatches() {
    let cases = [
        (
            indoc! {"
                fn f(i32, u32) -> () {
                  bb0(%v0: i32, %v1: u32):
                    %v2: i32 = sub %v0, %v1
                    ret
                }
            "},
            "sub operands have different types",
        ),
        (
            indoc! {"
                fn f(i32) -> () {
                  bb0(%v0: i32):
                    cbr.lt %v0, 0:i64, bb1, bb1

                  bb1():
                    ret
                }
            "},
            "cbr operands have different types",
        ),
        (
            indoc! {"
                fn f(i32) -> () {
                  bb0(%v0: i32):
                    %v1: i32 = cmp.lt %v0, 0:i32
                    ret
                }
            "},
            "cmp result is not bool",
        ),
        (
            indoc! {"
                fn f(i32) -> i64 {
                  bb0(%v0: i32):
                    ret %v0
                }
            "},
            "return type mismatch",
        ),
        (
            indoc! {"
                fn f(i32) -> () {
                  bb0(%v0: i32):
                    %v1: i32 = load %v0
                    ret
                }
            "},
            "memory access through a non-pointer",
        ),
    ];

    for (text, message) in cases {
        match verify_text(text) {
            Err(VerifyError::TypeMismatch { message: found, .. }) => assert_eq!(found, message),
            other => panic!("expected '{message}', got {other:?}"),
        }
    }
}

#[test]
fn test_verify_module_reports_first_failure() {
    let good = parse_func("fn a() -> () { bb0(): ret }").expect("parse");
    let bad = parse_func("fn b() -> () { bb0(): ret 1:i32 }").expect("parse");
    let module = Module {
        funcs: vec![good.clone(), bad],
    };

    let err = verify_module(&module).unwrap_err();
    assert!(matches!(err, VerifyError::TypeMismatch { ref func, .. } if func == "b"));
    verify_module(&Module { funcs: vec![good] }).expect("verify");
}
