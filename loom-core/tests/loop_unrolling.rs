use loom_ast::GraphBuilder;
use loom_core::{SemanticError, check_program};
use loom_graph::{LocalId, StmtId};

fn consume(b: &mut GraphBuilder, local: LocalId) -> StmtId {
    let read = b.var_read(local);
    b.expr_stmt(read)
}

#[test]
fn loop_body_that_balances_its_own_values_is_accepted() {
    // while c { var y = mk(); use(y); }: every unrolled iteration creates
    // and consumes y, so all simulated exits agree.
    let mut b = GraphBuilder::new();
    let string = b.builtin("String", true);
    let mk = b.declare_func("mk", vec![], Some(string));

    let y = b.local("y", string);
    let callee = b.func_ref(mk);
    let init = b.call(callee, vec![]);
    let decl = b.var_stmt(y, init);
    let use_y = consume(&mut b, y);
    let body = b.block(vec![decl, use_y]);
    let cond = b.lit_bool(true);
    let loop_stmt = b.while_stmt(cond, body);
    let outer = b.block(vec![loop_stmt]);
    b.func("f", vec![], None, outer);
    let g = b.finish();
    check_program(&g).expect("balanced loop body");
}

#[test]
fn consuming_an_outer_value_inside_the_loop_is_rejected() {
    // while c { print(x) }: iteration two reads an already-consumed x.
    let mut b = GraphBuilder::new();
    let string = b.builtin("String", true);
    let x = b.local("x", string);
    let use_x = consume(&mut b, x);
    let body = b.block(vec![use_x]);
    let cond = b.lit_bool(true);
    let loop_stmt = b.while_stmt(cond, body);
    let outer = b.block(vec![loop_stmt]);
    b.func("f", vec![x], None, outer);
    let g = b.finish();
    let err = check_program(&g).expect_err("expected ownership error");
    assert!(matches!(err, SemanticError::UseAfterConsume { var, .. } if var == "x"));
}

#[test]
fn loop_local_value_leaking_across_iterations_is_rejected() {
    // while c { var y = mk(); }: iteration two rebinds y while iteration
    // one's value is still owned.
    let mut b = GraphBuilder::new();
    let string = b.builtin("String", true);
    let mk = b.declare_func("mk", vec![], Some(string));

    let y = b.local("y", string);
    let callee = b.func_ref(mk);
    let init = b.call(callee, vec![]);
    let decl = b.var_stmt(y, init);
    let body = b.block(vec![decl]);
    let cond = b.lit_bool(true);
    let loop_stmt = b.while_stmt(cond, body);
    let outer = b.block(vec![loop_stmt]);
    b.func("f", vec![], None, outer);
    let g = b.finish();
    let err = check_program(&g).expect_err("expected ownership error");
    assert!(matches!(err, SemanticError::RebindOverLiveLinear { var, .. } if var == "y"));
}

#[test]
fn break_that_disagrees_with_the_normal_exit_is_rejected() {
    // while c { if d { print(x); break; } }: the break escape has consumed
    // x, the zero-iteration exit has not.
    let mut b = GraphBuilder::new();
    let string = b.builtin("String", true);
    let x = b.local("x", string);
    let use_x = consume(&mut b, x);
    let brk = b.brk();
    let escape = b.block(vec![use_x, brk]);
    let inner_cond = b.lit_bool(false);
    let inner = b.if_stmt(inner_cond, escape, None);
    let body = b.block(vec![inner]);
    let cond = b.lit_bool(true);
    let loop_stmt = b.while_stmt(cond, body);
    let outer = b.block(vec![loop_stmt]);
    b.func("f", vec![x], None, outer);
    let g = b.finish();
    let err = check_program(&g).expect_err("expected merge error");
    assert!(matches!(err, SemanticError::InconsistentOwnership { var, .. } if var == "x"));
}

#[test]
fn break_that_agrees_with_every_exit_is_accepted() {
    // while c { break; } print(x): no path touches x inside the loop.
    let mut b = GraphBuilder::new();
    let string = b.builtin("String", true);
    let x = b.local("x", string);
    let brk = b.brk();
    let body = b.block(vec![brk]);
    let cond = b.lit_bool(true);
    let loop_stmt = b.while_stmt(cond, body);
    let after = consume(&mut b, x);
    let outer = b.block(vec![loop_stmt, after]);
    b.func("f", vec![x], None, outer);
    let g = b.finish();
    check_program(&g).expect("untouched x survives the loop");
}

#[test]
fn borrows_are_recleared_around_each_condition() {
    // while check(&x) { }: the condition borrows x afresh each time the
    // loop re-checks it; the borrow never leaks into the next iteration.
    let mut b = GraphBuilder::new();
    let string = b.builtin("String", true);
    let bool_ty = b.builtin("Bool", false);
    let ref_string = b.ref_ty(string);
    let p = b.local("s", ref_string);
    let check = b.declare_func("check", vec![p], Some(bool_ty));

    let x = b.local("x", string);
    let callee = b.func_ref(check);
    let borrow = b.borrow(x, false);
    let cond = b.call(callee, vec![borrow]);
    let body = b.block(vec![]);
    let loop_stmt = b.while_stmt(cond, body);
    let after = consume(&mut b, x);
    let outer = b.block(vec![loop_stmt, after]);
    b.func("f", vec![x], None, outer);
    let g = b.finish();
    check_program(&g).expect("condition borrows expire at the boundary");
}

#[test]
fn continue_is_not_supported() {
    let mut b = GraphBuilder::new();
    let cont = b.cont();
    let body = b.block(vec![cont]);
    let cond = b.lit_bool(true);
    let loop_stmt = b.while_stmt(cond, body);
    let outer = b.block(vec![loop_stmt]);
    b.func("f", vec![], None, outer);
    let g = b.finish();
    let err = check_program(&g).expect_err("expected unsupported-continue error");
    assert!(matches!(err, SemanticError::UnsupportedContinue { .. }));
}

#[test]
fn nested_loops_keep_breaks_with_their_own_loop() {
    // while a { while c { break; } }: the inner break must not escape to
    // the outer loop's merge.
    let mut b = GraphBuilder::new();
    let inner_brk = b.brk();
    let inner_body = b.block(vec![inner_brk]);
    let inner_cond = b.lit_bool(true);
    let inner_loop = b.while_stmt(inner_cond, inner_body);
    let outer_body = b.block(vec![inner_loop]);
    let outer_cond = b.lit_bool(false);
    let outer_loop = b.while_stmt(outer_cond, outer_body);
    let body = b.block(vec![outer_loop]);
    b.func("f", vec![], None, body);
    let g = b.finish();
    check_program(&g).expect("inner break is swallowed by the inner loop");
}
