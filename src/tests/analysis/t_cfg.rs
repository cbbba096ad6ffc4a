use indoc::indoc;

use crate::analysis::cfg::Cfg;
use crate::ir::{BlockId, parse_func};

const DIAMOND: &str = indoc! {"
    fn diamond(i32) -> () {
      bb0(%v0: i32):
        cbr.lt %v0, 0:i32, bb1, bb2

      bb1():
        br bb3

      bb2():
        br bb3

      bb3():
        ret
    }
"};

#[test]
fn test_cfg_edges() {
    let func = parse_func(DIAMOND).expect("parse");
    let cfg = Cfg::new(&func);

    assert_eq!(cfg.entry(), BlockId(0));
    assert_eq!(cfg.num_blocks(), 4);
    assert_eq!(cfg.succs(BlockId(0)), &[BlockId(1), BlockId(2)]);
    assert_eq!(cfg.preds(BlockId(3)), &[BlockId(1), BlockId(2)]);
    assert!(cfg.preds(BlockId(0)).is_empty());
    assert_eq!(cfg.index(BlockId(2)), 2);
}

#[test]
fn test_cfg_orders() {
    let func = parse_func(DIAMOND).expect("parse");
    let cfg = Cfg::new(&func);

    assert_eq!(
        cfg.postorder(),
        vec![BlockId(3), BlockId(1), BlockId(2), BlockId(0)]
    );
    assert_eq!(cfg.rpo(), vec![BlockId(0), BlockId(2), BlockId(1), BlockId(3)]);
}

#[test]
fn test_cfg_same_target_twice_is_one_edge() {
    let func = parse_func(indoc! {"
        fn f(i32) -> () {
          bb0(%v0: i32):
            cbr.gt %v0, 1:i32, bb1, bb1

          bb1():
            ret
        }
    "})
    .expect("parse");
    let cfg = Cfg::new(&func);

    assert_eq!(cfg.succs(BlockId(0)), &[BlockId(1)]);
    assert_eq!(cfg.preds(BlockId(1)), &[BlockId(0)]);
}

#[test]
fn test_cfg_skips_unreachable_and_missing_targets() {
    let func = parse_func(indoc! {"
        fn f() -> () {
          bb0():
            br bb1

          bb1():
            ret

          bb2():
            br bb9
        }
    "})
    .expect("parse");
    let cfg = Cfg::new(&func);

    assert!(cfg.succs(BlockId(2)).is_empty());
    assert_eq!(cfg.rpo(), vec![BlockId(0), BlockId(1)]);
}
