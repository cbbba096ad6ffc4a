use indoc::indoc;

use crate::analysis::def_use::{DefSite, DefUse, UseSite};
use crate::ir::{BinOp, BlockId, InstKind, IrConst, Operand, ValueId, parse_func};

const SOURCE: &str = indoc! {"
    fn f(i32, i32) -> i32 {
      bb0(%v0: i32, %v1: i32):
        %v2: i32 = sub %v0, %v1
        %v3: i32 = add %v2, %v2
        cbr.lt %v2, 0:i32, bb1, bb2(%v3)

      bb1():
        ret %v0

      bb2(%v4: i32):
        ret %v4
    }
"};

#[test]
fn test_def_use_defs() {
    let func = parse_func(SOURCE).expect("parse");
    let def_use = DefUse::compute(&func);

    assert_eq!(
        def_use.def_site(ValueId(1)),
        Some(DefSite::Param {
            block: BlockId(0),
            index: 1,
        })
    );
    assert_eq!(
        def_use.def_site(ValueId(3)),
        Some(DefSite::Inst {
            block: BlockId(0),
            index: 1,
        })
    );
    assert_eq!(
        def_use.def_site(ValueId(4)),
        Some(DefSite::Param {
            block: BlockId(2),
            index: 0,
        })
    );
    assert_eq!(def_use.def_site(ValueId(99)), None);

    assert!(def_use.def_inst(&func, ValueId(0)).is_none());
    let inst = def_use.def_inst(&func, ValueId(2)).expect("sub");
    assert!(matches!(inst.kind, InstKind::BinOp { op: BinOp::Sub, .. }));
}

#[test]
fn test_def_use_uses() {
    let func = parse_func(SOURCE).expect("parse");
    let def_use = DefUse::compute(&func);

    let add_site = UseSite::Inst {
        block: BlockId(0),
        index: 1,
    };
    let cbr_site = UseSite::Term { block: BlockId(0) };
    assert_eq!(def_use.uses(ValueId(2)), &[add_site, add_site, cbr_site]);
    assert_eq!(def_use.uses(ValueId(3)), &[cbr_site]);
    assert_eq!(def_use.use_count(ValueId(0)), 2);
    assert!(def_use.has_uses(ValueId(4)));
    assert!(!def_use.has_uses(ValueId(99)));
}

#[test]
fn test_def_use_replace_uses_at() {
    let func = parse_func(SOURCE).expect("parse");
    let mut def_use = DefUse::compute(&func);

    let site = UseSite::Term { block: BlockId(0) };
    let zero = Operand::Const(IrConst::int(0, 32, true));
    def_use.replace_uses_at(
        site,
        &[Operand::Value(ValueId(2)), zero],
        &[Operand::Value(ValueId(0)), Operand::Value(ValueId(1))],
    );

    assert_eq!(def_use.use_count(ValueId(2)), 2);
    assert!(!def_use.uses(ValueId(2)).contains(&site));
    assert!(def_use.uses(ValueId(0)).contains(&site));
    assert_eq!(def_use.uses(ValueId(1)).len(), 2);
}
