use super::{children, field, named_children, unwrap_node, Lowerer};
use solmove_core::source::{
    BaseSpec, ContractKind, EnumDecl, ErrorDecl, EventDecl, EventParam, FunctionDecl,
    FunctionKind, ModifierDecl, ModifierInvocation, Mutability, Param, SourceContract,
    SourceType, SourceUnit, StateVarDecl, StructDecl, UsingFor, Visibility,
};
use tree_sitter::Node;

impl<'s> Lowerer<'s> {
    pub(super) fn source_file(&self, root: Node, unit: &mut SourceUnit) {
        for child in named_children(root) {
            match child.kind() {
                "import_directive" => {
                    if let Some(path) = self.import_path(child) {
                        unit.imports.push(path);
                    }
                }
                "contract_declaration" | "interface_declaration" | "library_declaration" => {
                    unit.contracts.push(self.contract(child));
                }
                "struct_declaration" => unit.structs.push(self.struct_decl(child)),
                "enum_declaration" => unit.enums.push(self.enum_decl(child)),
                "error_declaration" => unit.errors.push(self.error_decl(child)),
                "constant_variable_declaration" => {
                    let mut decl = self.state_var(child);
                    decl.constant = true;
                    unit.constants.push(decl);
                }
                "ERROR" => {
                    if let Some(broken) = self.broken_contract(child) {
                        unit.contracts.push(broken);
                    }
                }
                _ => {}
            }
        }
    }

    fn import_path(&self, node: Node) -> Option<String> {
        let source = field(node, &["source"]).or_else(|| {
            let mut found = None;
            let mut stack = vec![node];
            while let Some(n) = stack.pop() {
                if matches!(n.kind(), "string" | "string_literal") {
                    found = Some(n);
                    break;
                }
                stack.extend(named_children(n).into_iter().rev());
            }
            found
        })?;
        let text = self.text(source).trim();
        Some(text.trim_matches(|c| c == '"' || c == '\'').to_string())
    }

    /// A top-level error node that still reads like a contract header. Recorded as a failed
    /// contract so the failure is attributed to it rather than to the whole file.
    fn broken_contract(&self, node: Node) -> Option<SourceContract> {
        let text = self.text(node);
        let mut words = text.split(|c: char| c.is_whitespace() || c == '{');
        let (kind, name) = loop {
            let word = words.next()?;
            let kind = match word {
                "contract" => ContractKind::Contract,
                "library" => ContractKind::Library,
                "interface" => ContractKind::Interface,
                _ => continue,
            };
            let name = words.find(|w| !w.is_empty())?;
            break (kind, name);
        };
        let mut contract = SourceContract::new(name, kind);
        let (line, column, message) = self.error_location(node);
        contract.parse_error = Some(format!("line {}, column {}: {}", line, column, message));
        contract.line = self.line(node);
        Some(contract)
    }

    fn contract(&self, node: Node) -> SourceContract {
        let kind = match node.kind() {
            "library_declaration" => ContractKind::Library,
            "interface_declaration" => ContractKind::Interface,
            _ => ContractKind::Contract,
        };
        let name = field(node, &["name"])
            .map(|n| self.text(n).to_string())
            .unwrap_or_else(|| "Unnamed".to_string());
        let mut contract = SourceContract::new(name, kind);
        contract.is_abstract = self.text(node).trim_start().starts_with("abstract");
        contract.line = self.line(node);

        for child in named_children(node) {
            if child.kind() == "inheritance_specifier" {
                contract.bases.push(self.base_spec(child));
            }
        }

        if let Some(body) = field(node, &["body"]) {
            for member in named_children(body) {
                self.contract_member(member, &mut contract);
            }
        }

        if node.has_error() {
            let (line, column, message) = self.error_location(node);
            contract.parse_error = Some(format!("line {}, column {}: {}", line, column, message));
        }
        contract
    }

    fn contract_member(&self, member: Node, contract: &mut SourceContract) {
        let interface = contract.kind == ContractKind::Interface;
        match member.kind() {
            "state_variable_declaration" => contract.state_vars.push(self.state_var(member)),
            "function_definition" => contract.functions.push(self.function(member, interface)),
            "constructor_definition" => contract.functions.push(self.constructor(member)),
            "fallback_receive_definition" => {
                contract.functions.push(self.fallback_receive(member))
            }
            "modifier_definition" => contract.modifiers.push(self.modifier(member)),
            "event_definition" => contract.events.push(self.event(member)),
            "error_declaration" => contract.errors.push(self.error_decl(member)),
            "struct_declaration" => contract.structs.push(self.struct_decl(member)),
            "enum_declaration" => contract.enums.push(self.enum_decl(member)),
            "using_directive" => {
                if let Some(using) = self.using(member) {
                    contract.using_for.push(using);
                }
            }
            _ => {}
        }
    }

    fn base_spec(&self, node: Node) -> BaseSpec {
        let name = field(node, &["ancestor"])
            .or_else(|| named_children(node).into_iter().next())
            .map(|n| squash(self.text(n)))
            .unwrap_or_default();
        let args = self.call_arguments(node).0;
        BaseSpec { name, args }
    }

    pub(super) fn type_name(&self, node: Node) -> SourceType {
        let text = squash(self.text(node));
        solmove_parser::parse_type_name(&text).unwrap_or(SourceType::Elementary(text))
    }

    fn state_var(&self, node: Node) -> StateVarDecl {
        let ty = field(node, &["type"])
            .map(|t| self.type_name(t))
            .unwrap_or_else(|| SourceType::elementary("uint256"));
        let name = field(node, &["name"])
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let mut decl = StateVarDecl::new(&name, ty);
        decl.line = self.line(node);
        decl.value = field(node, &["value"]).map(|v| self.expression(v));
        for child in children(node) {
            match self.text(child) {
                "public" => decl.visibility = Visibility::Public,
                "private" => decl.visibility = Visibility::Private,
                "internal" => decl.visibility = Visibility::Internal,
                "constant" => decl.constant = true,
                "immutable" => decl.immutable = true,
                _ => {}
            }
        }
        decl
    }

    pub(super) fn param(&self, node: Node) -> Param {
        let ty = field(node, &["type"])
            .map(|t| self.type_name(t))
            .unwrap_or_else(|| SourceType::elementary("uint256"));
        let name = field(node, &["name"]).map(|n| self.text(n).to_string());
        Param { name, ty }
    }

    fn params(&self, node: Node) -> Vec<Param> {
        let direct: Vec<Node> = named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "parameter")
            .collect();
        if !direct.is_empty() {
            return direct.into_iter().map(|p| self.param(p)).collect();
        }
        named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "parameter_list")
            .flat_map(named_children)
            .filter(|c| c.kind() == "parameter")
            .map(|p| self.param(p))
            .collect()
    }

    fn modifier_invocation(&self, node: Node) -> ModifierInvocation {
        let name = named_children(node)
            .into_iter()
            .take_while(|c| c.kind() == "identifier")
            .map(|c| self.text(c))
            .collect::<Vec<_>>()
            .join(".");
        let name = if name.is_empty() {
            squash(self.text(node).split('(').next().unwrap_or(""))
        } else {
            name
        };
        ModifierInvocation {
            name,
            args: self.call_arguments(node).0,
        }
    }

    fn function_body(&self, node: Node) -> Option<Vec<solmove_core::source::Stmt>> {
        field(node, &["body"]).map(|b| self.block(b))
    }

    /// Visibility, mutability, `virtual` and modifier invocations shared by every callable.
    fn apply_attributes(&self, node: Node, decl: &mut FunctionDecl) {
        for child in children(node) {
            match child.kind() {
                "modifier_invocation" => {
                    let invocation = self.modifier_invocation(child);
                    if !matches!(invocation.name.as_str(), "override" | "virtual") {
                        decl.modifiers.push(invocation);
                    }
                    continue;
                }
                "override_specifier" => continue,
                _ => {}
            }
            match self.text(child) {
                "public" => decl.visibility = Visibility::Public,
                "external" => decl.visibility = Visibility::External,
                "internal" => decl.visibility = Visibility::Internal,
                "private" => decl.visibility = Visibility::Private,
                "pure" => decl.mutability = Mutability::Pure,
                "view" => decl.mutability = Mutability::View,
                "payable" => decl.mutability = Mutability::Payable,
                "virtual" => decl.is_virtual = true,
                _ => {}
            }
        }
    }

    fn function(&self, node: Node, in_interface: bool) -> FunctionDecl {
        let name = field(node, &["name"])
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let default_visibility = if in_interface {
            Visibility::External
        } else {
            Visibility::Public
        };
        let mut decl = FunctionDecl::new(&name, default_visibility, Mutability::NonPayable);
        decl.kind = match name.as_str() {
            "receive" => FunctionKind::Receive,
            "fallback" => FunctionKind::Fallback,
            _ => FunctionKind::Function,
        };
        decl.line = self.line(node);
        decl.params = self.params(node);
        decl.returns = field(node, &["return_type"])
            .map(|r| self.params(r))
            .unwrap_or_default();
        self.apply_attributes(node, &mut decl);
        decl.body = self.function_body(node);
        decl
    }

    fn constructor(&self, node: Node) -> FunctionDecl {
        let mut decl = FunctionDecl::constructor();
        decl.line = self.line(node);
        decl.params = self.params(node);
        self.apply_attributes(node, &mut decl);
        decl.body = self.function_body(node).or(Some(Vec::new()));
        decl
    }

    fn fallback_receive(&self, node: Node) -> FunctionDecl {
        let text = self.text(node).trim_start();
        let text = text.strip_prefix("function").unwrap_or(text).trim_start();
        let (name, kind) = if text.starts_with("receive") {
            ("receive", FunctionKind::Receive)
        } else {
            ("fallback", FunctionKind::Fallback)
        };
        let mut decl = FunctionDecl::new(name, Visibility::External, Mutability::NonPayable);
        decl.kind = kind;
        decl.line = self.line(node);
        decl.params = self.params(node);
        self.apply_attributes(node, &mut decl);
        decl.body = self.function_body(node);
        decl
    }

    fn modifier(&self, node: Node) -> ModifierDecl {
        let name = field(node, &["name"])
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        ModifierDecl {
            name,
            params: self.params(node),
            body: self.function_body(node).unwrap_or_default(),
            line: self.line(node),
        }
    }

    fn event(&self, node: Node) -> EventDecl {
        let name = field(node, &["name"])
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let params = descendants_of_kind(node, "event_parameter")
            .into_iter()
            .map(|p| {
                let indexed = children(p).iter().any(|c| self.text(*c) == "indexed");
                let Param { name, ty } = self.param(p);
                EventParam { name, ty, indexed }
            })
            .collect();
        EventDecl { name, params }
    }

    fn error_decl(&self, node: Node) -> ErrorDecl {
        let name = field(node, &["name"])
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let params = descendants_of_kind(node, "error_parameter")
            .into_iter()
            .map(|p| self.param(p))
            .collect();
        ErrorDecl { name, params }
    }

    fn struct_decl(&self, node: Node) -> StructDecl {
        let name = field(node, &["name"])
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let fields = descendants_of_kind(node, "struct_member")
            .into_iter()
            .map(|m| self.param(m))
            .collect();
        StructDecl { name, fields }
    }

    fn enum_decl(&self, node: Node) -> EnumDecl {
        let name = field(node, &["name"])
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let variants = descendants_of_kind(node, "enum_value")
            .into_iter()
            .map(|v| self.text(v).to_string())
            .collect();
        EnumDecl { name, variants }
    }

    fn using(&self, node: Node) -> Option<UsingFor> {
        let library = field(node, &["alias"])
            .or_else(|| {
                named_children(node)
                    .into_iter()
                    .find(|c| c.kind() == "user_defined_type")
            })
            .map(|n| squash(self.text(n)))?;
        let target = field(node, &["source"]).and_then(|s| {
            let text = self.text(s).trim();
            if text == "*" {
                None
            } else {
                Some(self.type_name(s))
            }
        });
        Some(UsingFor { library, target })
    }

    /// Positional and `{name: value}` arguments of a call-like node.
    pub(super) fn call_arguments(
        &self,
        node: Node,
    ) -> (
        Vec<solmove_core::source::Expr>,
        Vec<(String, solmove_core::source::Expr)>,
    ) {
        let mut positional = Vec::new();
        let mut named = Vec::new();
        let mut args: Vec<Node> = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "call_argument" => args.push(child),
                "call_arguments" | "revert_arguments" => {
                    args.extend(
                        named_children(child)
                            .into_iter()
                            .filter(|c| c.kind() == "call_argument"),
                    );
                }
                _ => {}
            }
        }
        for arg in args {
            let struct_args: Vec<Node> = named_children(arg)
                .into_iter()
                .filter(|c| c.kind() == "call_struct_argument")
                .collect();
            if struct_args.is_empty() {
                positional.push(self.expression(unwrap_node(arg)));
                continue;
            }
            for pair in struct_args {
                let name = field(pair, &["name"]).map(|n| self.text(n).to_string());
                let value = field(pair, &["value"]).map(|v| self.expression(v));
                if let (Some(name), Some(value)) = (name, value) {
                    named.push((name, value));
                }
            }
        }
        (positional, named)
    }
}

fn descendants_of_kind<'t>(node: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    let mut found = Vec::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        for child in named_children(n).into_iter().rev() {
            if child.kind() == kind {
                found.push(child);
            } else {
                stack.push(child);
            }
        }
    }
    found.sort_by_key(|n| n.start_byte());
    found
}

/// Collapses runs of whitespace so type text such as `address  payable` parses uniformly.
pub(super) fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
