use super::structural::squash;
use super::{children, field, named_children, unwrap_node, Lowerer};
use solmove_core::source::{BinaryOp, Expr, SourceType, UnaryOp};
use tree_sitter::Node;

impl<'s> Lowerer<'s> {
    pub(super) fn expression(&self, node: Node) -> Expr {
        let node = unwrap_node(node);
        match node.kind() {
            "parenthesized_expression" => match named_children(node).into_iter().next() {
                Some(inner) => self.expression(inner),
                None => self.unsupported(node),
            },
            "identifier" => Expr::Ident(self.text(node).to_string()),
            "number_literal" => Expr::Number(squash(self.text(node))),
            "boolean_literal" => Expr::Bool(self.text(node).trim() == "true"),
            "string_literal" | "unicode_string_literal" => Expr::Str(self.string_value(node)),
            "hex_string_literal" => Expr::HexStr(hex_digits(self.text(node))),
            "binary_expression" => self.binary(node),
            "unary_expression" => self.unary(node),
            "update_expression" => self.update(node),
            "assignment_expression" => {
                let (target, value) = self.sides(node);
                Expr::assign(target, value)
            }
            "augmented_assignment_expression" => {
                let (target, value) = self.sides(node);
                let symbol = self.operator(node);
                match BinaryOp::from_symbol(symbol.trim_end_matches('=')) {
                    Some(op) => Expr::compound(op, target, value),
                    None => self.unsupported(node),
                }
            }
            "call_expression" => self.call(node),
            "payable_conversion_expression" => {
                let (args, _) = self.call_arguments(node);
                Expr::call(Expr::ident("payable"), args)
            }
            "type_cast_expression" => {
                let ty = named_children(node)
                    .into_iter()
                    .find(|c| matches!(c.kind(), "primitive_type" | "type_name"))
                    .map(|t| self.type_name(t))
                    .unwrap_or_else(|| SourceType::elementary("uint256"));
                let arg = named_children(node)
                    .into_iter()
                    .filter(|c| !matches!(c.kind(), "primitive_type" | "type_name"))
                    .last()
                    .map(|a| self.expression(a));
                Expr::call(Expr::ElementaryType(ty), arg.into_iter().collect())
            }
            "meta_type_expression" => {
                let ty = named_children(node)
                    .into_iter()
                    .next()
                    .map(|t| self.type_name(t))
                    .unwrap_or_else(|| SourceType::elementary("uint256"));
                Expr::TypeInfo(ty)
            }
            "primitive_type" | "type_name" => Expr::ElementaryType(self.type_name(node)),
            "user_defined_type" => {
                let text = squash(self.text(node));
                let mut parts = text.split('.');
                let first = Expr::Ident(parts.next().unwrap_or_default().to_string());
                parts.fold(first, |object, member| Expr::member(object, member))
            }
            "member_expression" => {
                let member = field(node, &["property", "member"])
                    .map(|p| self.text(p).to_string())
                    .unwrap_or_default();
                match field(node, &["object"]) {
                    Some(object) => self.postfix(object, |object| Expr::member(object, &member)),
                    None => self.unsupported(node),
                }
            }
            "array_access" => {
                let index = field(node, &["index"]).map(|i| Box::new(self.expression(i)));
                match field(node, &["base"]) {
                    Some(base) => self.postfix(base, |base| Expr::Index {
                        base: Box::new(base),
                        index,
                    }),
                    None => self.unsupported(node),
                }
            }
            "ternary_expression" => {
                let parts = named_children(node);
                let pick = |names: &[&str], at: usize| {
                    field(node, names)
                        .or_else(|| parts.get(at).copied())
                        .map(|n| self.expression(n))
                        .unwrap_or(Expr::Bool(false))
                };
                Expr::Ternary {
                    cond: Box::new(pick(&["condition"], 0)),
                    then: Box::new(pick(&["consequence"], 1)),
                    otherwise: Box::new(pick(&["alternative"], 2)),
                }
            }
            "new_expression" => {
                let ty = field(node, &["name"])
                    .or_else(|| named_children(node).into_iter().next())
                    .map(|t| self.type_name(t))
                    .unwrap_or_else(|| SourceType::UserDefined(String::new()));
                Expr::New(ty)
            }
            "tuple_expression" => self.tuple(node),
            "inline_array_expression" => Expr::InlineArray(
                named_children(node)
                    .into_iter()
                    .map(|e| self.expression(e))
                    .collect(),
            ),
            "slice_access" => Expr::Unsupported {
                construct: "array slice".to_string(),
                text: self.text(node).to_string(),
            },
            _ => self.unsupported(node),
        }
    }

    fn unsupported(&self, node: Node) -> Expr {
        Expr::Unsupported {
            construct: node.kind().to_string(),
            text: squash(self.text(node)),
        }
    }

    /// Lowers the operand of `[i]`, `.member` or `(args)` and applies the suffix to it.
    ///
    /// The grammar can hand back a whole binary or prefix expression as that operand:
    /// `a + m[i]` arrives as `(a + m)[i]`. The suffix then belongs to the rightmost operand.
    /// A parenthesized operand stops the descent.
    fn postfix(&self, operand: Node, apply: impl FnOnce(Expr) -> Expr) -> Expr {
        let operand = unwrap_node(operand);
        match operand.kind() {
            "binary_expression" => {
                let parts = named_children(operand);
                let left = field(operand, &["left"]).or_else(|| parts.first().copied());
                let right = field(operand, &["right"]).or_else(|| parts.last().copied());
                let op = BinaryOp::from_symbol(self.operator(operand).trim());
                match (left, right, op) {
                    (Some(left), Some(right), Some(op)) => {
                        Expr::binary(op, self.expression(left), self.postfix(right, apply))
                    }
                    _ => apply(self.unsupported(operand)),
                }
            }
            "unary_expression" => {
                let op = match self.operator(operand).trim() {
                    "!" => UnaryOp::Not,
                    "-" => UnaryOp::Neg,
                    "~" => UnaryOp::BitNot,
                    "delete" => UnaryOp::Delete,
                    _ => return apply(self.expression(operand)),
                };
                let argument = field(operand, &["argument", "operand"])
                    .or_else(|| named_children(operand).into_iter().last());
                match argument {
                    Some(argument) => Expr::unary(op, self.postfix(argument, apply)),
                    None => apply(self.unsupported(operand)),
                }
            }
            "ternary_expression" => {
                let parts = named_children(operand);
                let lower = |names: &[&str], at: usize| {
                    field(operand, names).or_else(|| parts.get(at).copied())
                };
                match (
                    lower(&["condition"], 0),
                    lower(&["consequence"], 1),
                    lower(&["alternative"], 2),
                ) {
                    (Some(cond), Some(then), Some(otherwise)) => Expr::Ternary {
                        cond: Box::new(self.expression(cond)),
                        then: Box::new(self.expression(then)),
                        otherwise: Box::new(self.postfix(otherwise, apply)),
                    },
                    _ => apply(self.unsupported(operand)),
                }
            }
            _ => apply(self.expression(operand)),
        }
    }

    fn sides(&self, node: Node) -> (Expr, Expr) {
        let parts = named_children(node);
        let left = field(node, &["left"]).or_else(|| parts.first().copied());
        let right = field(node, &["right"]).or_else(|| parts.last().copied());
        let lower = |n: Option<Node>| {
            n.map(|n| self.expression(n))
                .unwrap_or_else(|| self.unsupported(node))
        };
        (lower(left), lower(right))
    }

    /// Operator token text; falls back to the first anonymous child.
    fn operator(&self, node: Node) -> &'s str {
        if let Some(op) = field(node, &["operator"]) {
            return self.text(op);
        }
        children(node)
            .into_iter()
            .find(|c| !c.is_named())
            .map(|c| self.text(c))
            .unwrap_or("")
    }

    fn binary(&self, node: Node) -> Expr {
        let (lhs, rhs) = self.sides(node);
        match BinaryOp::from_symbol(self.operator(node).trim()) {
            Some(op) => Expr::binary(op, lhs, rhs),
            None => self.unsupported(node),
        }
    }

    fn operand(&self, node: Node) -> Expr {
        field(node, &["argument", "operand"])
            .or_else(|| named_children(node).into_iter().last())
            .map(|a| self.expression(a))
            .unwrap_or_else(|| self.unsupported(node))
    }

    fn unary(&self, node: Node) -> Expr {
        let op = match self.operator(node).trim() {
            "!" => UnaryOp::Not,
            "-" => UnaryOp::Neg,
            "~" => UnaryOp::BitNot,
            "delete" => UnaryOp::Delete,
            "++" => UnaryOp::PreInc,
            "--" => UnaryOp::PreDec,
            "+" => return self.operand(node),
            _ => return self.unsupported(node),
        };
        Expr::unary(op, self.operand(node))
    }

    /// `++x` and `x++` share a node kind; the operator's position decides.
    fn update(&self, node: Node) -> Expr {
        let operand = self.operand(node);
        let op_node = field(node, &["operator"])
            .or_else(|| children(node).into_iter().find(|c| !c.is_named()));
        let Some(op_node) = op_node else {
            return self.unsupported(node);
        };
        let prefix = op_node.start_byte() == node.start_byte();
        let op = match (self.text(op_node), prefix) {
            ("++", true) => UnaryOp::PreInc,
            ("++", false) => UnaryOp::PostInc,
            ("--", true) => UnaryOp::PreDec,
            ("--", false) => UnaryOp::PostDec,
            _ => return self.unsupported(node),
        };
        Expr::unary(op, operand)
    }

    fn call(&self, node: Node) -> Expr {
        let callee_node = field(node, &["function"])
            .or_else(|| named_children(node).into_iter().next())
            .map(unwrap_node);
        let Some(callee_node) = callee_node else {
            return self.unsupported(node);
        };
        let (args, named) = self.call_arguments(node);

        // `f{value: v, gas: g}(args)`
        if callee_node.kind() == "struct_expression" {
            let target = field(callee_node, &["type"])
                .or_else(|| named_children(callee_node).into_iter().next())
                .map(|t| self.expression(t))
                .unwrap_or_else(|| self.unsupported(callee_node));
            return Expr::Call {
                callee: Box::new(target),
                args,
                options: self.struct_fields(callee_node),
                named,
            };
        }
        self.postfix(callee_node, |callee| Expr::Call {
            callee: Box::new(callee),
            args,
            options: Vec::new(),
            named,
        })
    }

    fn struct_fields(&self, node: Node) -> Vec<(String, Expr)> {
        let mut fields = Vec::new();
        for child in named_children(node) {
            let name = field(child, &["name"]);
            let value = field(child, &["value"]);
            if let (Some(name), Some(value)) = (name, value) {
                fields.push((self.text(name).to_string(), self.expression(value)));
            }
        }
        fields
    }

    /// `(a, , b)` keeps its holes; a single parenthesized element is just that element.
    fn tuple(&self, node: Node) -> Expr {
        let mut slots: Vec<Option<Expr>> = vec![None];
        for child in children(node) {
            match child.kind() {
                "," => slots.push(None),
                "(" | ")" | "comment" => {}
                _ if child.is_named() => {
                    if let Some(last) = slots.last_mut() {
                        *last = Some(self.expression(child));
                    }
                }
                _ => {}
            }
        }
        if slots.len() == 1 {
            if let Some(Some(single)) = slots.pop() {
                return single;
            }
            return Expr::Tuple(Vec::new());
        }
        Expr::Tuple(slots)
    }

    /// Concatenates adjacent literal segments (`"a" "b"`) and resolves escapes.
    fn string_value(&self, node: Node) -> String {
        let segments: Vec<Node> = named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "string")
            .collect();
        if segments.is_empty() {
            return unescape(strip_quotes(self.text(node)));
        }
        segments
            .into_iter()
            .map(|s| unescape(strip_quotes(self.text(s))))
            .collect()
    }
}

fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("unicode").unwrap_or(text);
    let bytes = text.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    out.push(byte as char);
                }
            }
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(ch);
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// `hex"00ff" hex'aa'` → `00ffaa`
fn hex_digits(text: &str) -> String {
    text.split("hex")
        .flat_map(|part| part.chars())
        .filter(|c| c.is_ascii_hexdigit())
        .collect()
}
