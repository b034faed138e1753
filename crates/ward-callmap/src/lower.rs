//! Lowering of C function bodies to call sequences.
//!
//! The lowering keeps exactly two things: call sites in left-to-right
//! evaluation order, and branch structure (`if`/`?:` become a `Choice`;
//! loops become "body or nothing"; `switch` is flattened sequentially,
//! which over-approximates execution order but never misses a call).
//! Every construct outside the modelled grammar contributes no calls.

use std::collections::HashSet;

use lang_c::ast::{
    BlockItem, Declaration, Expression, ForInitializer, Initializer, Label, Statement,
};
use lang_c::span::{Node, Span};

use ward_core::Entry;

use crate::ident::FunId;
use crate::source_map::SourceMap;
use crate::tree::{CallSeq, CallTree};

/// Per-unit lowering context: resolves spans to positions, renames
/// file-local callees, and records structural warnings.
pub struct Lowerer<'a> {
    path: &'a str,
    source_map: &'a SourceMap,
    statics: &'a HashSet<String>,
    warnings: &'a mut Vec<Entry>,
}

impl<'a> Lowerer<'a> {
    pub fn new(
        path: &'a str,
        source_map: &'a SourceMap,
        statics: &'a HashSet<String>,
        warnings: &'a mut Vec<Entry>,
    ) -> Self {
        Self {
            path,
            source_map,
            statics,
            warnings,
        }
    }

    /// Lower a function body and simplify the result.
    pub fn lower_body(&mut self, body: &Node<Statement>) -> CallSeq {
        let mut seq = CallSeq::new();
        self.statement(body, &mut seq);
        seq.simplify()
    }

    /// Identifier for a reference to `name` from this unit, applying the
    /// static-name rename when the unit defines `name` as file-local.
    pub fn fun_id(&self, name: &str, span: Span) -> FunId {
        let pos = self.source_map.resolve(span.start);
        if self.statics.contains(name) {
            FunId::file_local(self.path, name, pos)
        } else {
            FunId::new(name, pos)
        }
    }

    fn statement(&mut self, stmt: &Node<Statement>, out: &mut CallSeq) {
        match &stmt.node {
            Statement::Labeled(labeled) => {
                if let Label::Case(expr) = &labeled.node.label.node {
                    self.expression(expr, out);
                }
                self.statement(&labeled.node.statement, out);
            }
            Statement::Compound(items) => {
                for item in items {
                    self.block_item(item, out);
                }
            }
            Statement::Expression(expr) => {
                if let Some(expr) = expr {
                    self.expression(expr, out);
                }
            }
            Statement::If(if_stmt) => {
                let if_stmt = &if_stmt.node;
                self.expression(&if_stmt.condition, out);
                let mut then_arm = CallSeq::new();
                self.statement(&if_stmt.then_statement, &mut then_arm);
                let mut else_arm = CallSeq::new();
                if let Some(else_stmt) = &if_stmt.else_statement {
                    self.statement(else_stmt, &mut else_arm);
                }
                out.push(CallTree::Choice(then_arm, else_arm));
            }
            Statement::Switch(switch) => {
                // Conservative: cases flatten into the linear sequence.
                self.expression(&switch.node.expression, out);
                self.statement(&switch.node.statement, out);
            }
            Statement::While(while_stmt) => {
                self.expression(&while_stmt.node.expression, out);
                let mut body = CallSeq::new();
                self.statement(&while_stmt.node.statement, &mut body);
                out.push(CallTree::Choice(body, CallSeq::new()));
            }
            Statement::DoWhile(do_while) => {
                // The body runs at least once, then the condition.
                self.statement(&do_while.node.statement, out);
                self.expression(&do_while.node.expression, out);
            }
            Statement::For(for_stmt) => {
                let for_stmt = &for_stmt.node;
                self.for_initializer(&for_stmt.initializer, out);
                if let Some(condition) = &for_stmt.condition {
                    self.expression(condition, out);
                }
                let mut body = CallSeq::new();
                self.statement(&for_stmt.statement, &mut body);
                if let Some(step) = &for_stmt.step {
                    self.expression(step, &mut body);
                }
                out.push(CallTree::Choice(body, CallSeq::new()));
            }
            Statement::Return(expr) => {
                if let Some(expr) = expr {
                    self.expression(expr, out);
                }
            }
            // goto, continue, break, asm: no calls.
            _ => {}
        }
    }

    fn for_initializer(&mut self, initializer: &Node<ForInitializer>, out: &mut CallSeq) {
        match &initializer.node {
            ForInitializer::Expression(expr) => self.expression(expr, out),
            ForInitializer::Declaration(decl) => self.declaration(&decl.node, out),
            _ => {}
        }
    }

    fn block_item(&mut self, item: &Node<BlockItem>, out: &mut CallSeq) {
        match &item.node {
            BlockItem::Declaration(decl) => self.declaration(&decl.node, out),
            BlockItem::Statement(stmt) => self.statement(stmt, out),
            _ => {}
        }
    }

    fn declaration(&mut self, decl: &Declaration, out: &mut CallSeq) {
        for init_declarator in &decl.declarators {
            if let Some(initializer) = &init_declarator.node.initializer {
                self.initializer(initializer, out);
            }
        }
    }

    fn initializer(&mut self, initializer: &Node<Initializer>, out: &mut CallSeq) {
        match &initializer.node {
            Initializer::Expression(expr) => self.expression(expr, out),
            Initializer::List(items) => {
                for item in items {
                    self.initializer(&item.node.initializer, out);
                }
            }
        }
    }

    fn expression(&mut self, expr: &Node<Expression>, out: &mut CallSeq) {
        match &expr.node {
            Expression::Call(call) => {
                let call_expr = &call.node;
                for argument in &call_expr.arguments {
                    self.expression(argument, out);
                }
                match &call_expr.callee.node {
                    Expression::Identifier(id) => {
                        out.push(CallTree::Call(self.fun_id(&id.node.name, call.span)));
                    }
                    _ => {
                        self.expression(&call_expr.callee, out);
                        let pos = self.source_map.resolve(call.span.start);
                        self.warnings.push(Entry::Warning(
                            pos,
                            "indirect call is not analyzed".into(),
                        ));
                    }
                }
            }
            Expression::Member(member) => {
                self.expression(&member.node.expression, out);
            }
            Expression::BinaryOperator(binary) => {
                self.expression(&binary.node.lhs, out);
                self.expression(&binary.node.rhs, out);
            }
            Expression::UnaryOperator(unary) => {
                self.expression(&unary.node.operand, out);
            }
            Expression::Cast(cast) => {
                self.expression(&cast.node.expression, out);
            }
            Expression::Conditional(conditional) => {
                let conditional = &conditional.node;
                self.expression(&conditional.condition, out);
                let mut then_arm = CallSeq::new();
                self.expression(&conditional.then_expression, &mut then_arm);
                let mut else_arm = CallSeq::new();
                self.expression(&conditional.else_expression, &mut else_arm);
                out.push(CallTree::Choice(then_arm, else_arm));
            }
            Expression::Comma(exprs) => {
                for expr in exprs.iter() {
                    self.expression(expr, out);
                }
            }
            Expression::CompoundLiteral(literal) => {
                for item in &literal.node.initializer_list {
                    self.initializer(&item.node.initializer, out);
                }
            }
            Expression::Statement(stmt) => {
                self.statement(stmt, out);
            }
            // Identifiers, constants, string literals, sizeof/alignof,
            // offsetof, label addresses: no calls.
            _ => {}
        }
    }
}
