use super::{children, field, named_children, named_field, unwrap_node, Lowerer};
use solmove_core::source::{Expr, LocalDecl, Stmt};
use tree_sitter::Node;

impl<'s> Lowerer<'s> {
    pub(super) fn block(&self, node: Node) -> Vec<Stmt> {
        named_children(node)
            .into_iter()
            .map(|s| self.statement(s))
            .collect()
    }

    fn boxed_statement(&self, node: Option<Node>) -> Box<Stmt> {
        Box::new(node.map(|n| self.statement(n)).unwrap_or(Stmt::Block(Vec::new())))
    }

    pub(super) fn statement(&self, node: Node) -> Stmt {
        let node = unwrap_node(node);
        let text = self.text(node).trim();
        if text == "_;" || text == "_" {
            return Stmt::Placeholder;
        }
        match node.kind() {
            "block_statement" | "function_body" => {
                let body = self.block(node);
                if text.starts_with("unchecked") {
                    Stmt::Unchecked(body)
                } else {
                    Stmt::Block(body)
                }
            }
            "expression_statement" => match named_children(node).into_iter().next() {
                Some(inner) => self.expression_statement(self.expression(inner)),
                None => Stmt::Block(Vec::new()),
            },
            "variable_declaration_statement" => self.variable_declaration(node),
            "if_statement" => {
                let parts = named_children(node);
                let cond = field(node, &["condition"])
                    .or_else(|| parts.first().copied())
                    .map(|c| self.expression(c))
                    .unwrap_or(Expr::Bool(false));
                let then = field(node, &["body", "consequence"]).or_else(|| parts.get(1).copied());
                let otherwise = named_field(node, &["alternative", "else"])
                    .or_else(|| parts.get(2).copied())
                    .map(|o| {
                        if o.kind() == "else_clause" {
                            named_children(o).into_iter().next().unwrap_or(o)
                        } else {
                            o
                        }
                    });
                Stmt::If {
                    cond,
                    then: self.boxed_statement(then),
                    otherwise: otherwise.map(|o| Box::new(self.statement(o))),
                }
            }
            "while_statement" => {
                let cond = field(node, &["condition"])
                    .map(|c| self.expression(c))
                    .unwrap_or(Expr::Bool(false));
                Stmt::While {
                    cond,
                    body: self.boxed_statement(field(node, &["body"])),
                }
            }
            "do_while_statement" => {
                let cond = field(node, &["condition"])
                    .map(|c| self.expression(c))
                    .unwrap_or(Expr::Bool(false));
                Stmt::DoWhile {
                    body: self.boxed_statement(field(node, &["body"])),
                    cond,
                }
            }
            "for_statement" => self.for_statement(node),
            "return_statement" => {
                Stmt::Return(named_children(node).into_iter().next().map(|e| self.expression(e)))
            }
            "emit_statement" => {
                let event = field(node, &["name"])
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default();
                let event = event.rsplit('.').next().unwrap_or(&event).trim().to_string();
                Stmt::Emit {
                    event,
                    args: self.call_arguments(node).0,
                }
            }
            "revert_statement" => {
                let error = field(node, &["error"]).map(|e| {
                    let name = self.text(e).trim();
                    name.rsplit('.').next().unwrap_or(name).to_string()
                });
                Stmt::Revert {
                    error,
                    args: self.call_arguments(node).0,
                }
            }
            "break_statement" => Stmt::Break,
            "continue_statement" => Stmt::Continue,
            "assembly_statement" => Stmt::Assembly(text.to_string()),
            "try_statement" => Stmt::Unsupported {
                construct: "try/catch".to_string(),
                text: first_line(text),
            },
            other => Stmt::Unsupported {
                construct: other.to_string(),
                text: first_line(text),
            },
        }
    }

    /// `revert("msg")` parses as an ordinary call; give it its statement form.
    fn expression_statement(&self, expr: Expr) -> Stmt {
        if let Expr::Call { callee, args, .. } = &expr {
            if matches!(callee.as_ref(), Expr::Ident(name) if name == "revert") {
                return Stmt::Revert {
                    error: None,
                    args: args.clone(),
                };
            }
        }
        Stmt::Expr(expr)
    }

    fn local_decl(&self, node: Node) -> LocalDecl {
        let name = field(node, &["name"])
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let ty = field(node, &["type"]).map(|t| self.type_name(t));
        let storage = field(node, &["location"])
            .map(|l| self.text(l) == "storage")
            .unwrap_or_else(|| children(node).iter().any(|c| self.text(*c) == "storage"));
        LocalDecl { name, ty, storage }
    }

    fn variable_declaration(&self, node: Node) -> Stmt {
        let value = field(node, &["value"]).map(|v| self.expression(v));
        let declarations: Vec<Node> = named_children(node)
            .into_iter()
            .filter(|c| matches!(c.kind(), "variable_declaration" | "variable_declaration_tuple"))
            .collect();
        let decls = match declarations.first() {
            Some(tuple) if tuple.kind() == "variable_declaration_tuple" => {
                let mut slots: Vec<Option<LocalDecl>> = vec![None];
                for child in children(*tuple) {
                    match child.kind() {
                        "," => slots.push(None),
                        "variable_declaration" => {
                            if let Some(last) = slots.last_mut() {
                                *last = Some(self.local_decl(child));
                            }
                        }
                        _ => {}
                    }
                }
                slots
            }
            Some(single) => vec![Some(self.local_decl(*single))],
            None => Vec::new(),
        };
        Stmt::VarDecl { decls, value }
    }

    fn for_statement(&self, node: Node) -> Stmt {
        let init = field(node, &["initial", "init"]).and_then(|i| match i.kind() {
            "variable_declaration_statement" | "expression_statement" => {
                Some(Box::new(self.statement(i)))
            }
            _ => None,
        });
        let cond = field(node, &["condition"]).and_then(|c| match c.kind() {
            "expression_statement" => named_children(c)
                .into_iter()
                .next()
                .map(|e| self.expression(e)),
            ";" => None,
            _ => Some(self.expression(c)),
        });
        let update = field(node, &["update"]).map(|u| self.expression(u));
        Stmt::For {
            init,
            cond,
            update,
            body: self.boxed_statement(field(node, &["body"])),
        }
    }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or("").trim().to_string()
}
