//! Move source printer.
//!
//! Ordering inside a module is fixed: `use` declarations, constants, structs, functions, each in
//! the order the assembler produced them. Parentheses come from operator precedence alone.

use crate::config::EmitterConfig;
use crate::emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
use anyhow::Result;
use solmove_core::move_ast::{
    ExprKind, FunVisibility, MoveBlock, MoveConstant, MoveExpr, MoveFunction, MoveModule,
    MoveStmt, MoveStruct, MoveUnOp, UseDecl,
};
use std::io::Write;

const PREC_LOWEST: u8 = 0;
const PREC_PREFIX: u8 = 10;
const PREC_ATOM: u8 = 11;

pub struct MoveEmitter {
    config: EmitterConfig,
}

impl MoveEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self { config }
    }

    pub fn emit_module(&self, module: &MoveModule) -> Result<String> {
        let mut buffer = Vec::new();
        let mut context = EmitContext::from_config(&self.config);
        self.emit(module, &mut buffer, &mut context)?;
        Ok(String::from_utf8(buffer)?)
    }

    fn write_use<W: Write>(&self, w: &mut W, ctx: &EmitContext, decl: &UseDecl) -> EmitResult {
        let line = match decl.members.as_slice() {
            [] => format!("use {};", decl.path),
            [single] if single != "Self" => format!("use {}::{};", decl.path, single),
            members => format!("use {}::{{{}}};", decl.path, members.join(", ")),
        };
        EmitHelper::write_line(w, ctx, &line)
    }

    fn write_constant<W: Write>(
        &self,
        w: &mut W,
        ctx: &EmitContext,
        constant: &MoveConstant,
    ) -> EmitResult {
        if let Some(doc) = &constant.doc {
            EmitHelper::write_doc(w, ctx, doc)?;
        }
        EmitHelper::write_line(
            w,
            ctx,
            &format!(
                "const {}: {} = {};",
                constant.name,
                constant.ty,
                format_expr(&constant.value)
            ),
        )
    }

    fn write_struct<W: Write>(
        &self,
        w: &mut W,
        ctx: &mut EmitContext,
        def: &MoveStruct,
    ) -> EmitResult {
        if let Some(doc) = &def.doc {
            EmitHelper::write_doc(w, ctx, doc)?;
        }
        for attr in &def.attributes {
            EmitHelper::write_line(w, ctx, &format!("#[{}]", attr))?;
        }
        let mut header = format!("struct {}", def.name);
        if !def.abilities.is_empty() {
            let abilities: Vec<&str> = def.abilities.iter().map(|a| a.as_str()).collect();
            header.push_str(&format!(" has {}", abilities.join(", ")));
        }
        if def.fields.is_empty() {
            return EmitHelper::write_line(w, ctx, &format!("{} {{}}", header));
        }
        EmitHelper::write_block(w, ctx, &header, "", |w, ctx| {
            for field in &def.fields {
                EmitHelper::write_line(w, ctx, &format!("{}: {},", field.name, field.ty))?;
            }
            Ok(())
        })
    }

    fn write_function<W: Write>(
        &self,
        w: &mut W,
        ctx: &mut EmitContext,
        func: &MoveFunction,
    ) -> EmitResult {
        for line in &func.doc {
            EmitHelper::write_doc(w, ctx, line)?;
        }
        for attr in &func.attributes {
            EmitHelper::write_line(w, ctx, &format!("#[{}]", attr))?;
        }
        let header = function_header(func);
        if func.body.is_empty() {
            return EmitHelper::write_line(w, ctx, &format!("{} {{}}", header));
        }
        EmitHelper::write_block(w, ctx, &header, "", |w, ctx| {
            self.write_block_body(w, ctx, &func.body)
        })
    }

    fn write_block_body<W: Write>(
        &self,
        w: &mut W,
        ctx: &mut EmitContext,
        block: &MoveBlock,
    ) -> EmitResult {
        for stmt in &block.stmts {
            self.write_stmt(w, ctx, stmt)?;
        }
        if let Some(result) = &block.result {
            EmitHelper::write_line(w, ctx, &format_expr(result))?;
        }
        Ok(())
    }

    fn write_stmt<W: Write>(&self, w: &mut W, ctx: &mut EmitContext, stmt: &MoveStmt) -> EmitResult {
        match stmt {
            MoveStmt::Let { pattern, ty, value } => {
                let mut line = if pattern.len() == 1 {
                    format!("let {}", pattern[0])
                } else {
                    format!("let ({})", pattern.join(", "))
                };
                if let Some(ty) = ty {
                    line.push_str(&format!(": {}", ty));
                }
                if let Some(value) = value {
                    line.push_str(&format!(" = {}", format_expr(value)));
                }
                line.push(';');
                EmitHelper::write_line(w, ctx, &line)
            }
            MoveStmt::Assign { target, value } => EmitHelper::write_line(
                w,
                ctx,
                &format!("{} = {};", format_expr(target), format_expr(value)),
            ),
            MoveStmt::Expr(expr) => {
                EmitHelper::write_line(w, ctx, &format!("{};", format_expr(expr)))
            }
            MoveStmt::If {
                cond,
                then,
                otherwise,
            } => self.write_if(w, ctx, "", cond, then, otherwise.as_ref()),
            MoveStmt::While { cond, body } => {
                let header = format!("while ({})", format_expr(cond));
                EmitHelper::write_block(w, ctx, &header, ";", |w, ctx| {
                    self.write_block_body(w, ctx, body)
                })
            }
            MoveStmt::Loop(body) => EmitHelper::write_block(w, ctx, "loop", ";", |w, ctx| {
                self.write_block_body(w, ctx, body)
            }),
            MoveStmt::Block(body) => EmitHelper::write_block(w, ctx, "", ";", |w, ctx| {
                self.write_block_body(w, ctx, body)
            }),
            MoveStmt::Return(None) => EmitHelper::write_line(w, ctx, "return;"),
            MoveStmt::Return(Some(value)) => {
                EmitHelper::write_line(w, ctx, &format!("return {};", format_expr(value)))
            }
            MoveStmt::Abort(code) => {
                EmitHelper::write_line(w, ctx, &format!("abort {};", format_expr(code)))
            }
            MoveStmt::Assert { cond, code } => EmitHelper::write_line(
                w,
                ctx,
                &format!("assert!({}, {});", format_expr(cond), format_expr(code)),
            ),
            MoveStmt::Break => EmitHelper::write_line(w, ctx, "break;"),
            MoveStmt::Continue => EmitHelper::write_line(w, ctx, "continue;"),
            MoveStmt::Comment(text) => {
                for line in text.lines() {
                    EmitHelper::write_line(w, ctx, format!("// {}", line).trim_end())?;
                }
                Ok(())
            }
        }
    }

    /// `else if` chains stay flat instead of nesting a block per branch.
    fn write_if<W: Write>(
        &self,
        w: &mut W,
        ctx: &mut EmitContext,
        prefix: &str,
        cond: &MoveExpr,
        then: &MoveBlock,
        otherwise: Option<&MoveBlock>,
    ) -> EmitResult {
        EmitHelper::write_line(
            w,
            ctx,
            &format!("{}if ({}) {{", prefix, format_expr(cond)),
        )?;
        ctx.indent();
        self.write_block_body(w, ctx, then)?;
        ctx.dedent();
        match otherwise {
            None => EmitHelper::write_line(w, ctx, "};"),
            Some(block) => match (block.stmts.as_slice(), &block.result) {
                (
                    [MoveStmt::If {
                        cond,
                        then,
                        otherwise,
                    }],
                    None,
                ) => self.write_if(w, ctx, "} else ", cond, then, otherwise.as_ref()),
                _ => {
                    EmitHelper::write_line(w, ctx, "} else {")?;
                    ctx.indent();
                    self.write_block_body(w, ctx, block)?;
                    ctx.dedent();
                    EmitHelper::write_line(w, ctx, "};")
                }
            },
        }
    }
}

impl Default for MoveEmitter {
    fn default() -> Self {
        Self::new(EmitterConfig::default())
    }
}

impl Emitter for MoveEmitter {
    type Item = MoveModule;

    fn emit<W: Write>(
        &self,
        module: &MoveModule,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        for line in &module.doc {
            EmitHelper::write_doc(writer, context, line)?;
        }
        let header = format!("module {}::{}", module.address, module.name);
        EmitHelper::write_block(writer, context, &header, "", |w, ctx| {
            let mut first = true;
            let mut section = |w: &mut W| -> EmitResult {
                if !first {
                    EmitHelper::blank_line(w)?;
                }
                first = false;
                Ok(())
            };

            if !module.uses.is_empty() {
                section(w)?;
                for decl in &module.uses {
                    self.write_use(w, ctx, decl)?;
                }
            }
            if !module.constants.is_empty() {
                section(w)?;
                for constant in &module.constants {
                    self.write_constant(w, ctx, constant)?;
                }
            }
            for def in &module.structs {
                section(w)?;
                self.write_struct(w, ctx, def)?;
            }
            for func in &module.functions {
                section(w)?;
                self.write_function(w, ctx, func)?;
            }
            Ok(())
        })
    }
}

fn function_header(func: &MoveFunction) -> String {
    let mut header = String::new();
    match func.visibility {
        FunVisibility::Public => header.push_str("public "),
        FunVisibility::Friend => header.push_str("public(friend) "),
        FunVisibility::Private => {}
    }
    if func.is_entry {
        header.push_str("entry ");
    }
    if func.is_inline {
        header.push_str("inline ");
    }
    let params: Vec<String> = func
        .params
        .iter()
        .map(|p| format!("{}: {}", p.name, p.ty))
        .collect();
    header.push_str(&format!("fun {}({})", func.name, params.join(", ")));
    match func.returns.as_slice() {
        [] => {}
        [single] => header.push_str(&format!(": {}", single)),
        many => {
            let types: Vec<String> = many.iter().map(|t| t.to_string()).collect();
            header.push_str(&format!(": ({})", types.join(", ")));
        }
    }
    if !func.acquires.is_empty() {
        header.push_str(&format!(" acquires {}", func.acquires.join(", ")));
    }
    header
}

fn precedence(expr: &MoveExpr) -> u8 {
    match &expr.kind {
        ExprKind::Binary { op, .. } => op.precedence(),
        ExprKind::IfElse { .. } | ExprKind::Abort(_) => PREC_LOWEST,
        ExprKind::Unary { .. } | ExprKind::Borrow { .. } | ExprKind::Deref(_) => PREC_PREFIX,
        _ => PREC_ATOM,
    }
}

fn wrap(expr: &MoveExpr, needs_parens: bool) -> String {
    if needs_parens {
        format!("({})", format_expr(expr))
    } else {
        format_expr(expr)
    }
}

/// Renders one expression on a single line.
pub fn format_expr(expr: &MoveExpr) -> String {
    match &expr.kind {
        ExprKind::Int { value, suffix } => match suffix {
            Some(ty) => format!("{}{}", value, ty),
            None => value.to_string(),
        },
        ExprKind::Bool(b) => b.to_string(),
        ExprKind::Address(addr) => format!("@{}", addr),
        ExprKind::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            format!("x\"{}\"", hex)
        }
        ExprKind::ByteString(text) => format!("b\"{}\"", escape_byte_string(text)),
        ExprKind::Var(name) => name.clone(),
        ExprKind::Binary { op, lhs, rhs } => {
            let p = op.precedence();
            let chained_comparison = |e: &MoveExpr| {
                op.is_comparison()
                    && matches!(&e.kind, ExprKind::Binary { op: inner, .. } if inner.is_comparison())
            };
            let left = wrap(lhs, precedence(lhs) < p || chained_comparison(lhs));
            let right = wrap(rhs, precedence(rhs) <= p);
            format!("{} {} {}", left, op.symbol(), right)
        }
        ExprKind::Unary { op, operand } => {
            let symbol = match op {
                MoveUnOp::Not => "!",
                MoveUnOp::Neg => "-",
            };
            format!("{}{}", symbol, wrap(operand, precedence(operand) < PREC_PREFIX))
        }
        ExprKind::Cast { expr: inner, ty } => {
            format!("({} as {})", wrap(inner, precedence(inner) < PREC_PREFIX), ty)
        }
        ExprKind::Call {
            module,
            name,
            type_args,
            args,
        } => {
            let mut out = String::new();
            if let Some(module) = module {
                out.push_str(module);
                out.push_str("::");
            }
            out.push_str(name);
            if !type_args.is_empty() {
                let types: Vec<String> = type_args.iter().map(|t| t.to_string()).collect();
                out.push_str(&format!("<{}>", types.join(", ")));
            }
            let args: Vec<String> = args.iter().map(format_expr).collect();
            out.push_str(&format!("({})", args.join(", ")));
            out
        }
        ExprKind::BorrowGlobal {
            mutable,
            resource,
            address,
        } => {
            let name = if *mutable {
                "borrow_global_mut"
            } else {
                "borrow_global"
            };
            format!("{}<{}>({})", name, resource, format_expr(address))
        }
        ExprKind::Field { base, field } => {
            format!("{}.{}", wrap(base, precedence(base) < PREC_ATOM), field)
        }
        ExprKind::Borrow {
            mutable,
            expr: inner,
        } => {
            let prefix = if *mutable { "&mut " } else { "&" };
            format!("{}{}", prefix, wrap(inner, precedence(inner) < PREC_PREFIX))
        }
        ExprKind::Deref(inner) => format!("*{}", wrap(inner, precedence(inner) < PREC_PREFIX)),
        ExprKind::Pack { name, fields } => {
            if fields.is_empty() {
                return format!("{} {{}}", name);
            }
            let fields: Vec<String> = fields
                .iter()
                .map(|(f, v)| format!("{}: {}", f, format_expr(v)))
                .collect();
            format!("{} {{ {} }}", name, fields.join(", "))
        }
        ExprKind::Vector { elem_ty, items } => {
            let items: Vec<String> = items.iter().map(format_expr).collect();
            match elem_ty {
                Some(ty) => format!("vector<{}>[{}]", ty, items.join(", ")),
                None => format!("vector[{}]", items.join(", ")),
            }
        }
        ExprKind::Tuple(items) => {
            let items: Vec<String> = items.iter().map(format_expr).collect();
            format!("({})", items.join(", "))
        }
        ExprKind::IfElse {
            cond,
            then,
            otherwise,
        } => format!(
            "if ({}) {} else {}",
            format_expr(cond),
            wrap(then, precedence(then) == PREC_LOWEST),
            format_expr(otherwise)
        ),
        ExprKind::Abort(code) => format!("abort {}", format_expr(code)),
        ExprKind::Stub { marker } => format!(
            "(abort E_UNSUPPORTED /* unsupported: {} */)",
            marker.replace("*/", "* /")
        ),
    }
}

fn escape_byte_string(text: &str) -> String {
    let mut out = String::new();
    for byte in text.bytes() {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\x{:02x}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use solmove_core::move_ast::MoveBinOp;
    use solmove_core::types::MoveType;

    #[test]
    fn test_precedence_parentheses() {
        let sum = MoveExpr::binary(MoveBinOp::Add, MoveExpr::var("a"), MoveExpr::var("b"));
        let product = MoveExpr::binary(MoveBinOp::Mul, sum.clone(), MoveExpr::var("c"));
        assert_eq!(format_expr(&product), "(a + b) * c");

        let nested = MoveExpr::binary(
            MoveBinOp::Sub,
            MoveExpr::var("a"),
            MoveExpr::binary(MoveBinOp::Sub, MoveExpr::var("b"), MoveExpr::var("c")),
        );
        assert_eq!(format_expr(&nested), "a - (b - c)");

        let plain = MoveExpr::binary(
            MoveBinOp::Add,
            MoveExpr::binary(MoveBinOp::Mul, MoveExpr::var("a"), MoveExpr::var("b")),
            MoveExpr::var("c"),
        );
        assert_eq!(format_expr(&plain), "a * b + c");
    }

    #[test]
    fn test_cast_and_not() {
        let cast = MoveExpr::cast(
            MoveExpr::binary(MoveBinOp::Add, MoveExpr::var("a"), MoveExpr::var("b")),
            MoveType::u256(),
        );
        assert_eq!(format_expr(&cast), "((a + b) as u256)");
        let not = MoveExpr::not(MoveExpr::binary(
            MoveBinOp::Eq,
            MoveExpr::var("a"),
            MoveExpr::var("b"),
        ));
        assert_eq!(format_expr(&not), "!(a == b)");
    }

    #[test]
    fn test_literals() {
        assert_eq!(format_expr(&MoveExpr::int_suffixed(7u32, MoveType::u8())), "7u8");
        assert_eq!(format_expr(&MoveExpr::address("0x1")), "@0x1");
        assert_eq!(format_expr(&MoveExpr::bytes(vec![0xde, 0xad])), "x\"dead\"");
        assert_eq!(
            format_expr(&MoveExpr::byte_string("say \"hi\"")),
            "b\"say \\\"hi\\\"\""
        );
    }

    #[test]
    fn test_field_of_deref_is_parenthesized() {
        let e = MoveExpr::field(MoveExpr::deref(MoveExpr::var("s")), "count");
        assert_eq!(format_expr(&e), "(*s).count");
        let direct = MoveExpr::field(
            MoveExpr::borrow_global("CounterState", MoveExpr::address("solmove"), false),
            "count",
        );
        assert_eq!(
            format_expr(&direct),
            "borrow_global<CounterState>(@solmove).count"
        );
    }

    #[test]
    fn test_stub_marker_cannot_close_comment() {
        let stub = MoveExpr::stub("assembly { x */ }");
        assert_eq!(
            format_expr(&stub),
            "(abort E_UNSUPPORTED /* unsupported: assembly { x * / } */)"
        );
    }
}
