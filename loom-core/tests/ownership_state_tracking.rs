use loom_ast::GraphBuilder;
use loom_core::{SemanticError, check_program};
use loom_graph::{LocalId, StmtId};

fn consume(b: &mut GraphBuilder, local: LocalId) -> StmtId {
    let read = b.var_read(local);
    b.expr_stmt(read)
}

#[test]
fn linear_parameter_consumed_once_is_accepted() {
    let mut b = GraphBuilder::new();
    let string = b.builtin("String", true);
    let x = b.local("x", string);
    let use_x = consume(&mut b, x);
    let body = b.block(vec![use_x]);
    b.func("f", vec![x], None, body);
    let g = b.finish();
    check_program(&g).expect("single consume should pass");
}

#[test]
fn second_use_of_consumed_value_is_rejected() {
    // func f(x: String) { print(x); print(x); }
    let mut b = GraphBuilder::new();
    let string = b.builtin("String", true);
    let x = b.local("x", string);
    let first = consume(&mut b, x);
    let second = consume(&mut b, x);
    let body = b.block(vec![first, second]);
    b.func("f", vec![x], None, body);
    let g = b.finish();
    let err = check_program(&g).expect_err("expected ownership error");
    assert!(matches!(err, SemanticError::UseAfterConsume { var, .. } if var == "x"));
}

#[test]
fn unconsumed_linear_parameter_is_rejected_at_fall_through() {
    let mut b = GraphBuilder::new();
    let string = b.builtin("String", true);
    let x = b.local("x", string);
    let body = b.block(vec![]);
    b.func("f", vec![x], None, body);
    let g = b.finish();
    let err = check_program(&g).expect_err("expected ownership error");
    assert!(matches!(err, SemanticError::NotConsumedBeforeReturn { vars, .. } if vars == vec!["x"]));
}

#[test]
fn non_linear_values_may_be_read_repeatedly() {
    let mut b = GraphBuilder::new();
    let int = b.builtin("Int", false);
    let n = b.local("n", int);
    let first = consume(&mut b, n);
    let second = consume(&mut b, n);
    let body = b.block(vec![first, second]);
    b.func("f", vec![n], None, body);
    let g = b.finish();
    check_program(&g).expect("copyable reads are unrestricted");
}

#[test]
fn moving_while_borrowed_in_the_same_expression_is_rejected() {
    // f(&x, x): the borrow is still live when the second argument moves x.
    let mut b = GraphBuilder::new();
    let string = b.builtin("String", true);
    let ref_string = b.ref_ty(string);
    let a = b.local("a", ref_string);
    let c = b.local("c", string);
    let callee_fn = b.declare_func("use2", vec![a, c], None);

    let x = b.local("x", string);
    let callee = b.func_ref(callee_fn);
    let borrow = b.borrow(x, false);
    let moved = b.var_read(x);
    let call = b.call(callee, vec![borrow, moved]);
    let stmt = b.expr_stmt(call);
    let body = b.block(vec![stmt]);
    b.func("f", vec![x], None, body);
    let g = b.finish();
    let err = check_program(&g).expect_err("expected ownership error");
    assert!(matches!(err, SemanticError::UseWhileBorrowed { var, .. } if var == "x"));
}

#[test]
fn borrow_expires_at_the_statement_boundary() {
    // var r = &x; print(x): the borrow is cleared between statements, so
    // the move is legal.
    let mut b = GraphBuilder::new();
    let string = b.builtin("String", true);
    let ref_string = b.ref_ty(string);
    let x = b.local("x", string);
    let r = b.local("r", ref_string);
    let borrow = b.borrow(x, false);
    let bind = b.var_stmt(r, borrow);
    let use_x = consume(&mut b, x);
    let body = b.block(vec![bind, use_x]);
    b.func("f", vec![x], None, body);
    let g = b.finish();
    check_program(&g).expect("borrow ends at statement boundary");
}

#[test]
fn borrowing_a_consumed_value_is_rejected() {
    let mut b = GraphBuilder::new();
    let string = b.builtin("String", true);
    let x = b.local("x", string);
    let use_x = consume(&mut b, x);
    let borrow = b.borrow(x, false);
    let borrow_stmt = b.expr_stmt(borrow);
    let body = b.block(vec![use_x, borrow_stmt]);
    b.func("f", vec![x], None, body);
    let g = b.finish();
    let err = check_program(&g).expect_err("expected ownership error");
    assert!(matches!(err, SemanticError::ReborrowOfConsumed { var, .. } if var == "x"));
}

#[test]
fn rebinding_a_live_linear_value_is_rejected() {
    // var x = mk(); x = mk(): the first value would be silently dropped.
    let mut b = GraphBuilder::new();
    let string = b.builtin("String", true);
    let mk = b.declare_func("mk", vec![], Some(string));

    let x = b.local("x", string);
    let c1 = b.func_ref(mk);
    let init = b.call(c1, vec![]);
    let decl = b.var_stmt(x, init);
    let c2 = b.func_ref(mk);
    let again = b.call(c2, vec![]);
    let reassign = b.assign(x, again);
    let body = b.block(vec![decl, reassign]);
    b.func("f", vec![], None, body);
    let g = b.finish();
    let err = check_program(&g).expect_err("expected ownership error");
    assert!(matches!(err, SemanticError::RebindOverLiveLinear { var, .. } if var == "x"));
}

#[test]
fn reassignment_after_consumption_refills_the_binding() {
    // var x = mk(); use(x); x = mk(); use(x)
    let mut b = GraphBuilder::new();
    let string = b.builtin("String", true);
    let mk = b.declare_func("mk", vec![], Some(string));

    let x = b.local("x", string);
    let c1 = b.func_ref(mk);
    let init = b.call(c1, vec![]);
    let decl = b.var_stmt(x, init);
    let use1 = consume(&mut b, x);
    let c2 = b.func_ref(mk);
    let again = b.call(c2, vec![]);
    let refill = b.assign(x, again);
    let use2 = consume(&mut b, x);
    let body = b.block(vec![decl, use1, refill, use2]);
    b.func("f", vec![], None, body);
    let g = b.finish();
    check_program(&g).expect("consume-refill-consume should pass");
}

#[test]
fn statement_after_return_is_unreachable() {
    let mut b = GraphBuilder::new();
    let string = b.builtin("String", true);
    let x = b.local("x", string);
    let ret_val = b.var_read(x);
    let ret = b.ret(Some(ret_val));
    let dead = consume(&mut b, x);
    let body = b.block(vec![ret, dead]);
    b.func("f", vec![x], Some(string), body);
    let g = b.finish();
    let err = check_program(&g).expect_err("expected reachability error");
    assert!(matches!(err, SemanticError::UnreachableStatement { .. }));
}

#[test]
fn break_outside_a_loop_is_rejected() {
    let mut b = GraphBuilder::new();
    let brk = b.brk();
    let body = b.block(vec![brk]);
    b.func("f", vec![], None, body);
    let g = b.finish();
    let err = check_program(&g).expect_err("expected shape error");
    assert!(matches!(err, SemanticError::BreakOutsideLoop { .. }));
}
