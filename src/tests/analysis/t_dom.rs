use indoc::indoc;

use crate::analysis::Analyses;
use crate::analysis::cfg::Cfg;
use crate::analysis::dom::DominatorTree;
use crate::ir::{BlockId, parse_func};

fn dom_tree(text: &str) -> DominatorTree {
    let func = parse_func(text).expect("parse");
    DominatorTree::compute(&Cfg::new(&func))
}

#[test]
fn test_dom_diamond() {
    let dom = dom_tree(indoc! {"
        fn f(i32) -> () {
          bb0(%v0: i32):
            cbr.lt %v0, 0:i32, bb1, bb2

          bb1():
            br bb3

          bb2():
            br bb3

          bb3():
            ret
        }
    "});

    assert_eq!(dom.entry(), Some(BlockId(0)));
    assert_eq!(dom.idom(BlockId(0)), None);
    assert_eq!(dom.idom(BlockId(1)), Some(BlockId(0)));
    assert_eq!(dom.idom(BlockId(3)), Some(BlockId(0)));
    assert_eq!(
        dom.children(BlockId(0)),
        &[BlockId(1), BlockId(2), BlockId(3)]
    );
    assert!(dom.dominates(BlockId(0), BlockId(3)));
    assert!(!dom.dominates(BlockId(1), BlockId(3)));
    assert!(dom.dominates(BlockId(2), BlockId(2)));

    let mut order = Vec::new();
    dom.walk_post_order(|block| order.push(block));
    assert_eq!(order, vec![BlockId(1), BlockId(2), BlockId(3), BlockId(0)]);
}

#[test]
fn test_dom_loop() {
    let dom = dom_tree(indoc! {"
        fn f(i32) -> () {
          bb0(%v0: i32):
            br bb1(%v0)

          bb1(%v1: i32):
            cbr.gt %v1, 0:i32, bb2, bb3

          bb2():
            %v2: i32 = sub %v1, 1:i32
            br bb1(%v2)

          bb3():
            ret
        }
    "});

    assert_eq!(dom.idom(BlockId(1)), Some(BlockId(0)));
    assert_eq!(dom.idom(BlockId(2)), Some(BlockId(1)));
    assert_eq!(dom.idom(BlockId(3)), Some(BlockId(1)));
    assert!(dom.dominates(BlockId(1), BlockId(2)));
    assert!(!dom.dominates(BlockId(2), BlockId(1)));

    let mut order = Vec::new();
    dom.walk_post_order(|block| order.push(block));
    assert_eq!(order, vec![BlockId(2), BlockId(3), BlockId(1), BlockId(0)]);
}

#[test]
fn test_dom_unreachable_blocks() {
    let dom = dom_tree(indoc! {"
        fn f() -> () {
          bb0():
            br bb1

          bb1():
            br bb2

          bb3():
            br bb2

          bb2():
            ret
        }
    "});

    assert_eq!(dom.idom(BlockId(2)), Some(BlockId(1)));
    assert!(!dom.is_reachable(BlockId(3)));
    assert_eq!(dom.idom(BlockId(3)), None);
    assert!(!dom.dominates(BlockId(3), BlockId(3)));
    assert_eq!(dom.unreachable_blocks(), vec![BlockId(3)]);

    let mut order = Vec::new();
    dom.walk_post_order(|block| order.push(block));
    assert_eq!(order, vec![BlockId(2), BlockId(1), BlockId(0)]);

    let expected = indoc! {"
        bb0: entry -> [bb1]
        bb1: idom bb0 -> [bb2]
        bb3: unreachable
        bb2: idom bb1
    "};
    assert_eq!(dom.to_string(), expected);
}

#[test]
fn test_analyses_cache_dominators() {
    let func = parse_func(indoc! {"
        fn f() -> () {
          bb0():
            br bb1

          bb1():
            ret
        }
    "})
    .expect("parse");

    let mut analyses = Analyses::new();
    assert!(!analyses.has_dominators());
    assert_eq!(analyses.dominators(&func).idom(BlockId(1)), Some(BlockId(0)));
    assert!(analyses.has_dominators());

    analyses.invalidate_cfg();
    assert!(!analyses.has_dominators());
}
