//! Swift target.
//!
//! Emits value types with throwing `fromJSON`, optional `fromJSONOrNil` and
//! `toJSON`, `String`-backed enums, enums with payloads for unions, resolver
//! protocols and handler type aliases.

use crate::context::GenerationContext;
use crate::error::CodegenResult;
use crate::plugin::{render_type, Plugin};
use crate::plugins::{error_code_labels, quote, request_branches};
use crate::writer::CodeWriter;
use crate::CodegenOptions;
use iapgen_core::keywords::{escape_identifier, SWIFT_KEYWORDS};
use iapgen_core::scalars::{lookup_scalar, ScalarCategory, GRAPHQL_TO_SWIFT};
use iapgen_core::tables::{PURCHASE_REQUEST_DISCRIMINATOR, TYPENAME_KEY};
use iapgen_core::{to_lower_camel_case, to_pascal_case, KeywordEscape};
use iapgen_ir::{
    CustomInputKind, DecodeMode, IrEnum, IrField, IrInput, IrInterface, IrObject, IrOperation,
    IrOperationField, IrSchema, IrType, IrUnion, ReturnShape, TypeKind,
};

const PRELUDE: &str = r"fileprivate func iapInt(_ value: Any?) -> Int? {
    guard let value = value else {
        return nil
    }
    switch value {
    case let number as Int:
        return number
    case let number as Double:
        return Int(number)
    case let number as NSNumber:
        return number.intValue
    default:
        return nil
    }
}

fileprivate func iapDouble(_ value: Any?) -> Double? {
    guard let value = value else {
        return nil
    }
    switch value {
    case let number as Double:
        return number
    case let number as Int:
        return Double(number)
    case let number as NSNumber:
        return number.doubleValue
    default:
        return nil
    }
}

fileprivate func iapFlexibleInt(_ value: Any?) -> Int? {
    if let text = value as? String {
        return Double(text).map { Int($0) }
    }
    return iapInt(value)
}

fileprivate func iapFlexibleDouble(_ value: Any?) -> Double? {
    if let text = value as? String {
        return Double(text)
    }
    return iapDouble(value)
}

fileprivate func iapIsPresent(_ value: Any?) -> Bool {
    guard let value = value else {
        return false
    }
    return !(value is NSNull)
}
";

/// Generates a single Swift source file.
pub struct SwiftPlugin {
    header: String,
    access: String,
    imports: Vec<String>,
    indent: String,
}

impl SwiftPlugin {
    #[must_use]
    pub fn new(options: &CodegenOptions) -> Self {
        Self {
            header: options.header.clone(),
            access: options.swift_access.clone(),
            imports: options.swift_imports.clone(),
            indent: options.indent_or("    "),
        }
    }

    /// Prefixes a declaration with the configured access modifier.
    fn public(&self, decl: &str) -> String {
        if self.access.is_empty() {
            decl.to_string()
        } else {
            format!("{} {decl}", self.access)
        }
    }
}

impl Plugin for SwiftPlugin {
    fn name(&self) -> &str {
        "swift"
    }

    fn file_extension(&self) -> &str {
        "swift"
    }

    fn map_scalar(&self, name: &str) -> String {
        lookup_scalar(GRAPHQL_TO_SWIFT, name, "String").to_string()
    }

    fn map_type(&self, ty: &IrType) -> String {
        render_type(self, ty, |element| format!("[{element}]"), |base| format!("{base}?"))
    }

    fn escape_keyword(&self, ident: &str) -> String {
        escape_identifier(ident, SWIFT_KEYWORDS, KeywordEscape::Backticks)
    }

    fn enum_value_case(&self, name: &str) -> String {
        self.escape_keyword(&to_lower_camel_case(name))
    }

    fn generate(&self, schema: &IrSchema) -> CodegenResult<String> {
        let ctx = GenerationContext::new(schema)?;
        let emitter = Emitter { plugin: self, ctx: &ctx };
        let mut w = CodeWriter::new(self.indent.clone());

        emitter.emit_header(&mut w);
        tracing::debug!(count = schema.enums.len(), "swift: enums");
        for e in &schema.enums {
            emitter.emit_enum(&mut w, e);
        }
        tracing::debug!(count = schema.interfaces.len(), "swift: interfaces");
        for interface in &schema.interfaces {
            emitter.emit_interface(&mut w, interface);
        }
        tracing::debug!(count = schema.objects.len(), "swift: objects");
        for object in &schema.objects {
            emitter.emit_object(&mut w, object);
        }
        tracing::debug!(count = schema.inputs.len(), "swift: inputs");
        for input in &schema.inputs {
            emitter.emit_input(&mut w, input);
        }
        tracing::debug!(count = schema.unions.len(), "swift: unions");
        for union in &schema.unions {
            emitter.emit_union(&mut w, union);
        }
        tracing::debug!(count = schema.operations.len(), "swift: operations");
        for operation in &schema.operations {
            emitter.emit_resolver(&mut w, operation);
        }
        for operation in &schema.operations {
            emitter.emit_handlers(&mut w, operation);
        }

        Ok(w.finish())
    }
}

struct Emitter<'p, 'a> {
    plugin: &'p SwiftPlugin,
    ctx: &'p GenerationContext<'a>,
}

impl Emitter<'_, '_> {
    fn public(&self, decl: &str) -> String {
        self.plugin.public(decl)
    }

    fn ty(&self, ty: &IrType) -> String {
        self.plugin.map_type(ty)
    }

    fn ident(&self, name: &str) -> String {
        self.plugin.field_name_case(name)
    }

    fn case_ident(&self, name: &str) -> String {
        self.plugin.enum_value_case(name)
    }

    /// Type exposing `fromJSON` for a composite reference.
    fn decoder(kind: &TypeKind, name: &str) -> String {
        if matches!(kind, TypeKind::Interface { .. }) {
            format!("{name}Decoder")
        } else {
            name.to_string()
        }
    }

    fn return_type(&self, field: &IrOperationField) -> String {
        match field.return_shape() {
            ReturnShape::Void { nullable: false } => "Void".to_string(),
            ReturnShape::Void { nullable: true } => "Void?".to_string(),
            ReturnShape::Value(ty) => self.ty(ty),
        }
    }

    fn emit_header(&self, w: &mut CodeWriter) {
        for line in self.plugin.header.lines() {
            w.line(format!("// {line}").trim_end());
        }
        w.blank();
        for import in &self.plugin.imports {
            w.line(format!("import {import}"));
        }
        w.blank();
        w.block(
            self.public("struct IapDecodingError: Error, CustomStringConvertible {"),
            "}",
            |w| {
                w.line(self.public("let message: String"));
                w.blank();
                w.block(self.public("init(_ message: String) {"), "}", |w| {
                    w.line("self.message = message");
                });
                w.blank();
                w.line(self.public("var description: String { message }"));
            },
        );
        w.blank();
        w.snippet(PRELUDE);
        w.blank();
    }

    fn emit_enum(&self, w: &mut CodeWriter, e: &IrEnum) {
        let name = &e.name;
        w.doc("///", e.description.as_deref());
        w.block(
            self.public(&format!("enum {name}: String, Codable, CaseIterable {{")),
            "}",
            |w| {
                for value in &e.values {
                    w.doc("///", value.description.as_deref());
                    w.line(format!(
                        "case {} = {}",
                        self.case_ident(&value.name),
                        quote(&value.raw_value, false)
                    ));
                }
                if e.is_error_code {
                    w.blank();
                    self.emit_error_code_init(w, e);
                }
                w.blank();
                w.block(
                    self.public(&format!(
                        "static func fromJSON(_ value: Any?) throws -> {name} {{"
                    )),
                    "}",
                    |w| {
                        w.block("guard let raw = value as? String else {", "}", |w| {
                            w.line(format!(
                                "throw IapDecodingError(\"Invalid {name} value: \\(value.map {{ \"\\($0)\" }} ?? \"null\")\")"
                            ));
                        });
                        w.block(
                            format!("guard let result = {name}(rawValue: raw) else {{"),
                            "}",
                            |w| {
                                w.line(format!(
                                    "throw IapDecodingError(\"Invalid {name} value: \\(raw)\")"
                                ));
                            },
                        );
                        w.line("return result");
                    },
                );
                w.blank();
                w.block(
                    self.public(&format!("static func fromJSONOrNil(_ value: Any?) -> {name}? {{")),
                    "}",
                    |w| w.line(format!("(value as? String).flatMap({name}.init(rawValue:))")),
                );
                w.blank();
                w.block(self.public("func toJSON() -> String {"), "}", |w| w.line("rawValue"));
            },
        );
        w.blank();
    }

    /// Error codes also accept their case names and legacy wire strings.
    fn emit_error_code_init(&self, w: &mut CodeWriter, e: &IrEnum) {
        w.block(self.public("init?(rawValue: String) {"), "}", |w| {
            w.line("switch rawValue {");
            for (value, labels) in error_code_labels(e) {
                let labels: Vec<_> = labels.iter().map(|l| quote(l, false)).collect();
                w.line(format!("case {}:", labels.join(", ")));
                w.indent();
                w.line(format!("self = .{}", self.case_ident(&value.name)));
                w.dedent();
            }
            w.line("default:");
            w.indent();
            w.line("return nil");
            w.dedent();
            w.line("}");
        });
    }

    fn emit_interface(&self, w: &mut CodeWriter, interface: &IrInterface) {
        let inherits = if interface.interfaces.is_empty() {
            String::new()
        } else {
            format!(": {}", interface.interfaces.join(", "))
        };
        w.doc("///", interface.description.as_deref());
        w.block(
            self.public(&format!("protocol {}{inherits} {{", interface.name)),
            "}",
            |w| {
                for field in &interface.fields {
                    w.doc("///", field.description.as_deref());
                    w.line(format!(
                        "var {}: {} {{ get }}",
                        self.ident(&field.name),
                        self.ty(&field.ty)
                    ));
                }
                w.line("func toJSON() -> [String: Any]");
            },
        );
        w.blank();

        if self.ctx.is_interface_referenced(&interface.name) {
            let arms: Vec<(String, String)> = self
                .ctx
                .index
                .implementors(&interface.name)
                .into_iter()
                .map(|o| (o.name.clone(), o.name.clone()))
                .collect();
            let name = &interface.name;
            w.block(self.public(&format!("enum {name}Decoder {{")), "}", |w| {
                self.emit_dispatch(
                    w,
                    name,
                    name,
                    &arms,
                    |decl| format!("try {decl}.fromJSON(json)"),
                    |decl| format!("{decl}.fromJSONOrNil(json)"),
                );
            });
            w.blank();
        }
    }

    /// `fromJSON`/`fromJSONOrNil` pair switching on `__typename`.
    fn emit_dispatch(
        &self,
        w: &mut CodeWriter,
        owner: &str,
        result: &str,
        arms: &[(String, String)],
        throwing: impl Fn(&str) -> String,
        optional: impl Fn(&str) -> String,
    ) {
        let typename = format!(
            "let typename = json[{}] as? String ?? \"\"",
            quote(TYPENAME_KEY, false)
        );
        w.block(
            self.public(&format!(
                "static func fromJSON(_ json: [String: Any]) throws -> {result} {{"
            )),
            "}",
            |w| {
                w.line(&typename);
                w.line("switch typename {");
                for (typename, decl) in arms {
                    w.line(format!("case {}:", quote(typename, false)));
                    w.indent();
                    w.line(format!("return {}", throwing(decl)));
                    w.dedent();
                }
                w.line("default:");
                w.indent();
                w.line(format!(
                    "throw IapDecodingError(\"Unknown __typename for {owner}: \\(typename)\")"
                ));
                w.dedent();
                w.line("}");
            },
        );
        w.blank();
        w.block(
            self.public(&format!(
                "static func fromJSONOrNil(_ json: [String: Any]) -> {result}? {{"
            )),
            "}",
            |w| {
                w.line(&typename);
                w.line("switch typename {");
                for (typename, decl) in arms {
                    w.line(format!("case {}:", quote(typename, false)));
                    w.indent();
                    w.line(format!("return {}", optional(decl)));
                    w.dedent();
                }
                w.line("default:");
                w.indent();
                w.line("return nil");
                w.dedent();
                w.line("}");
            },
        );
    }

    fn emit_object(&self, w: &mut CodeWriter, object: &IrObject) {
        if object.is_result_union {
            self.emit_result_union(w, object);
        } else {
            self.emit_struct(
                w,
                &object.name,
                object.description.as_deref(),
                &object.interfaces,
                &object.fields,
                Shape::Object,
            );
        }
    }

    fn emit_input(&self, w: &mut CodeWriter, input: &IrInput) {
        let shape = match input.custom_kind() {
            Some(CustomInputKind::PurchaseRequest) => return self.emit_purchase_request(w, input),
            Some(CustomInputKind::DiscountOffer) => Shape::FlexibleInput,
            None => Shape::Input,
        };
        self.emit_struct(w, &input.name, input.description.as_deref(), &[], &input.fields, shape);
    }

    fn emit_struct(
        &self,
        w: &mut CodeWriter,
        name: &str,
        description: Option<&str>,
        conformances: &[String],
        fields: &[IrField],
        shape: Shape,
    ) {
        let head = if conformances.is_empty() {
            format!("struct {name} {{")
        } else {
            format!("struct {name}: {} {{", conformances.join(", "))
        };
        let params: Vec<String> = fields
            .iter()
            .map(|f| {
                let default = if f.ty.nullable { " = nil" } else { "" };
                format!("{}: {}{default}", self.ident(&f.name), self.ty(&f.ty))
            })
            .collect();
        let args: Vec<String> = fields
            .iter()
            .map(|f| format!("{}: {}", self.ident(&f.name), local_name(&self.ident(&f.name))))
            .collect();

        w.doc("///", description);
        w.block(self.public(&head), "}", |w| {
            for field in fields {
                w.doc("///", field.description.as_deref());
                w.line(self.public(&format!(
                    "let {}: {}",
                    self.ident(&field.name),
                    self.ty(&field.ty)
                )));
            }
            w.blank();
            call_like(w, &self.public("init("), &params, ") {");
            w.indent();
            for field in fields {
                let ident = self.ident(&field.name);
                w.line(format!("self.{ident} = {ident}"));
            }
            w.dedent();
            w.line("}");

            for mode in [DecodeMode::Lenient, DecodeMode::Strict] {
                w.blank();
                let signature = match mode {
                    DecodeMode::Lenient => {
                        format!("static func fromJSON(_ json: [String: Any]) throws -> {name} {{")
                    }
                    DecodeMode::Strict => {
                        format!("static func fromJSONOrNil(_ json: [String: Any]) -> {name}? {{")
                    }
                };
                w.block(self.public(&signature), "}", |w| {
                    for field in fields {
                        let local = local_name(&self.ident(&field.name));
                        let source = format!("json[{}]", quote(&field.name, false));
                        self.decode_binding(
                            w,
                            name,
                            &field.name,
                            &local,
                            &field.ty,
                            &source,
                            mode,
                            shape.flexible(),
                        );
                    }
                    call_like(w, &format!("return {name}("), &args, ")");
                });
            }

            w.blank();
            w.block(self.public("func toJSON() -> [String: Any] {"), "}", |w| {
                if shape == Shape::Object {
                    w.line(format!(
                        "var json: [String: Any] = [{}: {}]",
                        quote(TYPENAME_KEY, false),
                        quote(name, false)
                    ));
                } else {
                    w.line("var json: [String: Any] = [:]");
                }
                for field in fields {
                    w.line(format!(
                        "json[{}] = {}",
                        quote(&field.name, false),
                        self.encode(&self.ident(&field.name), &field.ty, 0)
                    ));
                }
                w.line("return json");
            });
        });
        w.blank();
    }

    /// Binds `local` to the decoded value of `source`.
    #[allow(clippy::too_many_arguments)]
    fn decode_binding(
        &self,
        w: &mut CodeWriter,
        owner: &str,
        wire: &str,
        local: &str,
        ty: &IrType,
        source: &str,
        mode: DecodeMode,
        flexible: bool,
    ) {
        match &ty.kind {
            TypeKind::Scalar { name } => {
                let category = ScalarCategory::of(name);
                if category == ScalarCategory::Void {
                    let value = if ty.nullable { "nil" } else { "()" };
                    w.line(format!("let {local}: {} = {value}", self.ty(ty)));
                    return;
                }
                let read = scalar_read(category, source, flexible);
                match (ty.nullable, mode) {
                    (true, _) => w.line(format!("let {local} = {read}")),
                    (false, DecodeMode::Lenient) => {
                        w.line(format!("let {local} = {read} ?? {}", zero_value(category)));
                    }
                    (false, DecodeMode::Strict) => {
                        w.line(format!("guard let {local} = {read} else {{ return nil }}"));
                    }
                }
            }
            TypeKind::Enum { name } => {
                let read = format!("{name}.fromJSONOrNil({source})");
                if ty.nullable {
                    w.line(format!("let {local} = {read}"));
                } else if let Some(default) = self.ctx.enum_default(owner, wire, name) {
                    w.line(format!("let {local} = {read} ?? .{}", self.case_ident(&default.name)));
                } else if mode == DecodeMode::Lenient {
                    w.line(format!("let {local} = try {name}.fromJSON({source})"));
                } else {
                    w.line(format!("guard let {local} = {read} else {{ return nil }}"));
                }
            }
            TypeKind::List { element_type } => {
                let element = self.decode_element(element_type, "item0", 0);
                let read = if ty.nullable {
                    format!("({source} as? [Any])?")
                } else {
                    format!("({source} as? [Any] ?? [])")
                };
                w.line(format!("let {local} = {read}.compactMap {{ item0 in {element} }}"));
            }
            TypeKind::Object { name }
            | TypeKind::Input { name }
            | TypeKind::Interface { name }
            | TypeKind::Union { name } => {
                let decoder = Self::decoder(&ty.kind, name);
                let map = format!("({source} as? [String: Any])");
                let defaults = matches!(ty.kind, TypeKind::Input { .. })
                    && !self.ctx.index.is_required_input(name);
                match (ty.nullable, defaults, mode) {
                    (true, _, _) => {
                        w.line(format!("let {local} = {map}.flatMap({decoder}.fromJSONOrNil)"));
                    }
                    (false, true, DecodeMode::Lenient) => w.line(format!(
                        "let {local} = try {map}.map({decoder}.fromJSON) ?? {decoder}.fromJSON([:])"
                    )),
                    // Only an absent map falls back to defaults; an undecodable one is nil.
                    (false, true, DecodeMode::Strict) => w.line(format!(
                        "guard let {local} = {map}.map({decoder}.fromJSONOrNil) ?? {decoder}.fromJSONOrNil([:]) else {{ return nil }}"
                    )),
                    (false, false, DecodeMode::Lenient) => {
                        let json = format!("{}JSON", local.trim_matches('`'));
                        w.block(
                            format!("guard let {json} = {source} as? [String: Any] else {{"),
                            "}",
                            |w| {
                                w.line(format!(
                                    "throw IapDecodingError(\"Missing required field `{wire}` on {owner}\")"
                                ));
                            },
                        );
                        w.line(format!("let {local} = try {decoder}.fromJSON({json})"));
                    }
                    (false, false, DecodeMode::Strict) => w.line(format!(
                        "guard let {local} = {map}.flatMap({decoder}.fromJSONOrNil) else {{ return nil }}"
                    )),
                }
            }
        }
    }

    /// Optional-valued expression decoding one list element; failures yield nil.
    fn decode_element(&self, ty: &IrType, item: &str, depth: usize) -> String {
        match &ty.kind {
            TypeKind::Scalar { name } => match ScalarCategory::of(name) {
                ScalarCategory::Void => "Optional<Void>.none".to_string(),
                category => scalar_read(category, item, false),
            },
            TypeKind::Enum { name } => format!("{name}.fromJSONOrNil({item})"),
            TypeKind::Object { name }
            | TypeKind::Input { name }
            | TypeKind::Interface { name }
            | TypeKind::Union { name } => format!(
                "({item} as? [String: Any]).flatMap({}.fromJSONOrNil)",
                Self::decoder(&ty.kind, name)
            ),
            TypeKind::List { element_type } => {
                let next = format!("item{}", depth + 1);
                let inner = self.decode_element(element_type, &next, depth + 1);
                format!("({item} as? [Any])?.compactMap {{ {next} in {inner} }}")
            }
        }
    }

    /// JSON-compatible expression for a property value.
    fn encode(&self, expr: &str, ty: &IrType, depth: usize) -> String {
        let chain = if ty.nullable { "?" } else { "" };
        match &ty.kind {
            TypeKind::Scalar { .. } => expr.to_string(),
            TypeKind::Enum { .. } => format!("{expr}{chain}.rawValue"),
            TypeKind::Object { .. }
            | TypeKind::Input { .. }
            | TypeKind::Interface { .. }
            | TypeKind::Union { .. } => format!("{expr}{chain}.toJSON()"),
            TypeKind::List { element_type } => {
                if matches!(element_type.innermost().kind, TypeKind::Scalar { .. }) {
                    return expr.to_string();
                }
                let item = format!("item{depth}");
                let inner = self.encode(&item, element_type, depth + 1);
                format!("{expr}{chain}.map {{ {item} in {inner} }}")
            }
        }
    }

    fn emit_result_union(&self, w: &mut CodeWriter, object: &IrObject) {
        let name = &object.name;
        let keys: Vec<_> = object
            .result_union_entries
            .iter()
            .map(|e| format!("`{}`", e.field_name))
            .collect();
        let cases: Vec<(String, IrType)> = object
            .result_union_entries
            .iter()
            .map(|e| {
                let required = IrType {
                    nullable: false,
                    ..e.ty.clone()
                };
                (self.case_ident(&e.field_name), required)
            })
            .collect();

        w.doc("///", object.description.as_deref());
        w.block(self.public(&format!("enum {name} {{")), "}", |w| {
            for (case, ty) in &cases {
                w.line(format!("case {case}({})", self.ty(ty)));
            }

            for mode in [DecodeMode::Lenient, DecodeMode::Strict] {
                w.blank();
                let signature = match mode {
                    DecodeMode::Lenient => {
                        format!("static func fromJSON(_ json: [String: Any]) throws -> {name} {{")
                    }
                    DecodeMode::Strict => {
                        format!("static func fromJSONOrNil(_ json: [String: Any]) -> {name}? {{")
                    }
                };
                w.block(self.public(&signature), "}", |w| {
                    for (entry, (case, ty)) in object.result_union_entries.iter().zip(&cases) {
                        let source = format!("json[{}]", quote(&entry.field_name, false));
                        w.block(format!("if iapIsPresent({source}) {{"), "}", |w| {
                            self.decode_binding(
                                w,
                                name,
                                &entry.field_name,
                                "value",
                                ty,
                                &source,
                                mode,
                                false,
                            );
                            w.line(format!("return .{case}(value)"));
                        });
                    }
                    match mode {
                        DecodeMode::Lenient => w.line(format!(
                            "throw IapDecodingError(\"{name} has none of its result fields set (expected one of {})\")",
                            keys.join(", ")
                        )),
                        DecodeMode::Strict => w.line("return nil"),
                    }
                });
            }

            w.blank();
            w.block(self.public("func toJSON() -> [String: Any] {"), "}", |w| {
                w.line("switch self {");
                for (entry, (case, ty)) in object.result_union_entries.iter().zip(&cases) {
                    w.line(format!("case .{case}(let value):"));
                    w.indent();
                    w.line(format!(
                        "return [{}: {}]",
                        quote(&entry.field_name, false),
                        self.encode("value", ty, 0)
                    ));
                    w.dedent();
                }
                w.line("}");
            });
        });
        w.blank();
    }

    fn emit_purchase_request(&self, w: &mut CodeWriter, input: &IrInput) {
        let Some((enum_name, branches)) = request_branches(&self.ctx.index, input) else {
            return;
        };
        let name = &input.name;
        let discriminator = self.ident(PURCHASE_REQUEST_DISCRIMINATOR);
        let discriminator_key = quote(PURCHASE_REQUEST_DISCRIMINATOR, false);

        w.doc("///", input.description.as_deref());
        w.block(self.public(&format!("struct {name} {{")), "}", |w| {
            for branch in &branches {
                w.line(self.public(&format!(
                    "let {}: {}?",
                    self.ident(branch.key),
                    branch.payload_type
                )));
            }
            w.line(self.public(&format!("let {discriminator}: {enum_name}")));

            for branch in &branches {
                let key = self.ident(branch.key);
                let case = self.case_ident(&branch.discriminator.name);
                w.blank();
                w.block(
                    self.public(&format!(
                        "init({key}: {}, {discriminator}: {enum_name} = .{case}) throws {{",
                        branch.payload_type
                    )),
                    "}",
                    |w| {
                        w.block(format!("guard {discriminator} == .{case} else {{"), "}", |w| {
                            w.line(format!(
                                "throw IapDecodingError(\"{name}.type is `\\({discriminator}.rawValue)` but `{}` requires `{}`\")",
                                branch.key, branch.discriminator.raw_value
                            ));
                        });
                        for other in &branches {
                            let other_key = self.ident(other.key);
                            if other.key == branch.key {
                                w.line(format!("self.{other_key} = {other_key}"));
                            } else {
                                w.line(format!("self.{other_key} = nil"));
                            }
                        }
                        w.line(format!("self.{discriminator} = {discriminator}"));
                    },
                );
            }

            w.blank();
            w.block(
                self.public(&format!(
                    "static func fromJSON(_ json: [String: Any]) throws -> {name} {{"
                )),
                "}",
                |w| {
                    w.line(format!("let rawType = json[{discriminator_key}] as? String"));
                    for branch in &branches {
                        let raw = quote(&branch.discriminator.raw_value, false);
                        w.block(
                            format!(
                                "if let payload = json[{}] as? [String: Any] {{",
                                quote(branch.key, false)
                            ),
                            "}",
                            |w| {
                                w.block(
                                    format!("if let rawType = rawType, rawType != {raw} {{"),
                                    "}",
                                    |w| {
                                        w.line(format!(
                                            "throw IapDecodingError(\"{name}.type is `\\(rawType)` but `{}` requires `{}`\")",
                                            branch.key, branch.discriminator.raw_value
                                        ));
                                    },
                                );
                                w.line(format!(
                                    "return try {name}({}: {}.fromJSON(payload))",
                                    self.ident(branch.key),
                                    branch.payload_type
                                ));
                            },
                        );
                    }
                    if let [first, second] = branches.as_slice() {
                        w.line(format!(
                            "throw IapDecodingError(\"{name} requires either `{}` or `{}`\")",
                            first.key, second.key
                        ));
                    }
                },
            );

            w.blank();
            w.block(
                self.public(&format!(
                    "static func fromJSONOrNil(_ json: [String: Any]) -> {name}? {{"
                )),
                "}",
                |w| {
                    w.line(format!("let rawType = json[{discriminator_key}] as? String"));
                    for branch in &branches {
                        let raw = quote(&branch.discriminator.raw_value, false);
                        w.block(
                            format!(
                                "if let payload = json[{}] as? [String: Any] {{",
                                quote(branch.key, false)
                            ),
                            "}",
                            |w| {
                                w.block(
                                    format!(
                                        "guard rawType == nil || rawType == {raw}, let value = {}.fromJSONOrNil(payload) else {{",
                                        branch.payload_type
                                    ),
                                    "}",
                                    |w| w.line("return nil"),
                                );
                                w.line(format!(
                                    "return try? {name}({}: value)",
                                    self.ident(branch.key)
                                ));
                            },
                        );
                    }
                    w.line("return nil");
                },
            );

            w.blank();
            w.block(self.public("func toJSON() -> [String: Any] {"), "}", |w| {
                w.line(format!(
                    "var json: [String: Any] = [{discriminator_key}: {discriminator}.rawValue]"
                ));
                for branch in &branches {
                    w.line(format!(
                        "json[{}] = {}?.toJSON()",
                        quote(branch.key, false),
                        self.ident(branch.key)
                    ));
                }
                w.line("return json");
            });
        });
        w.blank();
    }

    fn emit_union(&self, w: &mut CodeWriter, union: &IrUnion) {
        let name = &union.name;
        let head = if union.shared_interfaces.is_empty() {
            format!("enum {name} {{")
        } else {
            format!("enum {name}: {} {{", union.shared_interfaces.join(", "))
        };
        let member_case = |member: &str, nested: bool| {
            let base = to_lower_camel_case(member);
            self.plugin.escape_keyword(&if nested { format!("{base}Item") } else { base })
        };
        let arms: Vec<(String, String)> = self
            .ctx
            .index
            .flatten_union(name)
            .into_iter()
            .map(|leaf| {
                let decl = leaf.via.unwrap_or(leaf.typename);
                (leaf.typename.to_string(), decl.to_string())
            })
            .collect();
        let case_of = |decl: &str| member_case(decl, self.ctx.index.union(decl).is_some());

        w.doc("///", union.description.as_deref());
        w.block(self.public(&head), "}", |w| {
            for member in &union.members {
                w.line(format!(
                    "case {}({})",
                    member_case(&member.name, member.is_nested_union),
                    member.name
                ));
            }
            w.blank();
            self.emit_dispatch(
                w,
                name,
                name,
                &arms,
                |decl| format!(".{}(try {decl}.fromJSON(json))", case_of(decl)),
                |decl| format!("{decl}.fromJSONOrNil(json).map({name}.{})", case_of(decl)),
            );

            w.blank();
            w.block(self.public("func toJSON() -> [String: Any] {"), "}", |w| {
                self.emit_member_switch(w, union, &member_case, "value.toJSON()");
            });

            for field in self.ctx.index.shared_interface_fields(name) {
                let ident = self.ident(&field.name);
                w.blank();
                w.block(
                    self.public(&format!("var {ident}: {} {{", self.ty(&field.ty))),
                    "}",
                    |w| self.emit_member_switch(w, union, &member_case, &format!("value.{ident}")),
                );
            }
        });
        w.blank();
    }

    fn emit_member_switch(
        &self,
        w: &mut CodeWriter,
        union: &IrUnion,
        member_case: &dyn Fn(&str, bool) -> String,
        body: &str,
    ) {
        w.line("switch self {");
        for member in &union.members {
            w.line(format!(
                "case .{}(let value):",
                member_case(&member.name, member.is_nested_union)
            ));
            w.indent();
            w.line(format!("return {body}"));
            w.dedent();
        }
        w.line("}");
    }

    fn arguments(&self, field: &IrOperationField, label: &str) -> String {
        field
            .args
            .iter()
            .map(|a| format!("{label}{}: {}", self.ident(&a.name), self.ty(&a.ty)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn emit_resolver(&self, w: &mut CodeWriter, operation: &IrOperation) {
        w.doc("///", operation.description.as_deref());
        w.block(
            self.public(&format!("protocol {}Resolver {{", operation.name)),
            "}",
            |w| {
                for field in operation.generated_fields() {
                    w.doc("///", field.description.as_deref());
                    w.line(format!(
                        "func {}({}) async throws -> {}",
                        self.ident(&field.name),
                        self.arguments(field, ""),
                        self.return_type(field)
                    ));
                }
            },
        );
        w.blank();
    }

    fn emit_handlers(&self, w: &mut CodeWriter, operation: &IrOperation) {
        let op = &operation.name;
        let fields: Vec<_> = operation.generated_fields().collect();
        for field in &fields {
            w.line(self.public(&format!(
                "typealias {op}{}Handler = ({}) async throws -> {}",
                to_pascal_case(&field.name),
                self.arguments(field, "_ "),
                self.return_type(field)
            )));
        }
        w.blank();

        let params: Vec<String> = fields
            .iter()
            .map(|f| {
                format!(
                    "{}: {op}{}Handler? = nil",
                    self.ident(&f.name),
                    to_pascal_case(&f.name)
                )
            })
            .collect();
        w.block(self.public(&format!("struct {op}Handlers {{")), "}", |w| {
            for field in &fields {
                w.line(self.public(&format!(
                    "var {}: {op}{}Handler?",
                    self.ident(&field.name),
                    to_pascal_case(&field.name)
                )));
            }
            w.blank();
            call_like(w, &self.public("init("), &params, ") {");
            w.indent();
            for field in &fields {
                let ident = self.ident(&field.name);
                w.line(format!("self.{ident} = {ident}"));
            }
            w.dedent();
            w.line("}");
        });
        w.blank();
    }
}

/// How a struct is decoded and encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Object,
    Input,
    /// Numeric fields also accept numeric strings.
    FlexibleInput,
}

impl Shape {
    fn flexible(self) -> bool {
        self == Shape::FlexibleInput
    }
}

/// Writes `head` + items + `tail`, one item per line past two items.
fn call_like(w: &mut CodeWriter, head: &str, items: &[String], tail: &str) {
    if items.len() <= 2 {
        w.line(format!("{head}{}{tail}", items.join(", ")));
        return;
    }
    w.line(head);
    w.indent();
    for (i, item) in items.iter().enumerate() {
        let comma = if i + 1 < items.len() { "," } else { "" };
        w.line(format!("{item}{comma}"));
    }
    w.dedent();
    w.line(tail);
}

/// Locals in decoders must not shadow the `json` parameter.
fn local_name(ident: &str) -> String {
    match ident {
        "json" | "typename" => format!("{ident}Value"),
        _ => ident.to_string(),
    }
}

fn scalar_read(category: ScalarCategory, source: &str, flexible: bool) -> String {
    match (category, flexible) {
        (ScalarCategory::Int, false) => format!("iapInt({source})"),
        (ScalarCategory::Int, true) => format!("iapFlexibleInt({source})"),
        (ScalarCategory::Float, false) => format!("iapDouble({source})"),
        (ScalarCategory::Float, true) => format!("iapFlexibleDouble({source})"),
        (ScalarCategory::Boolean, _) => format!("{source} as? Bool"),
        (ScalarCategory::Json, _) => format!("{source} as? [String: Any]"),
        (ScalarCategory::String | ScalarCategory::Void, _) => format!("{source} as? String"),
    }
}

fn zero_value(category: ScalarCategory) -> &'static str {
    match category {
        ScalarCategory::String => "\"\"",
        ScalarCategory::Int => "0",
        ScalarCategory::Float => "0.0",
        ScalarCategory::Boolean => "false",
        ScalarCategory::Json => "[:]",
        ScalarCategory::Void => "()",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iapgen_ir::{IrEnumValue, UnionMember};

    fn plugin() -> SwiftPlugin {
        SwiftPlugin::new(&CodegenOptions::default())
    }

    fn schema_with_enum(e: IrEnum) -> IrSchema {
        IrSchema {
            enums: vec![e],
            ..IrSchema::default()
        }
    }

    #[test]
    fn test_map_type() {
        let p = plugin();
        assert_eq!(p.map_type(&IrType::scalar("Float")), "Double");
        assert_eq!(p.map_type(&IrType::scalar("JSON").nullable()), "[String: Any]?");
        assert_eq!(
            p.map_type(&IrType::list(IrType::object("PurchaseIOS")).nullable()),
            "[PurchaseIOS]?"
        );
        assert_eq!(p.map_type(&IrType::scalar("DateTime")), "String");
    }

    #[test]
    fn test_keyword_escape() {
        let p = plugin();
        assert_eq!(p.field_name_case("default"), "`default`");
        assert_eq!(p.enum_value_case("Default"), "`default`");
        assert_eq!(p.enum_value_case("InApp"), "inApp");
    }

    #[test]
    fn test_enum_cases() {
        let schema = schema_with_enum(IrEnum {
            name: "Store".into(),
            description: None,
            values: vec![
                IrEnumValue {
                    name: "Apple".into(),
                    raw_value: "apple".into(),
                    description: None,
                },
                IrEnumValue {
                    name: "Google".into(),
                    raw_value: "google".into(),
                    description: None,
                },
            ],
            is_error_code: false,
        });
        let output = plugin().generate(&schema).unwrap();
        assert!(output.contains("public enum Store: String, Codable, CaseIterable {"));
        assert!(output.contains("    case apple = \"apple\"\n    case google = \"google\"\n"));
        assert!(output.contains("(value as? String).flatMap(Store.init(rawValue:))"));
    }

    #[test]
    fn test_error_code_init() {
        let schema = schema_with_enum(IrEnum {
            name: "ErrorCode".into(),
            description: None,
            values: vec![IrEnumValue {
                name: "UserCancelled".into(),
                raw_value: "user-cancelled".into(),
                description: None,
            }],
            is_error_code: true,
        });
        let output = plugin().generate(&schema).unwrap();
        assert!(output.contains(
            "case \"user-cancelled\", \"UserCancelled\", \"userCancelled\", \"E_USER_CANCELLED\":"
        ));
        assert!(output.contains("public init?(rawValue: String) {"));
    }

    #[test]
    fn test_nested_union_case_names() {
        let schema = IrSchema {
            objects: vec![
                IrObject {
                    name: "A".into(),
                    description: None,
                    fields: vec![],
                    interfaces: vec![],
                    unions: vec![],
                    is_result_union: false,
                    result_union_entries: vec![],
                },
            ],
            unions: vec![
                IrUnion {
                    name: "Inner".into(),
                    description: None,
                    members: vec![UnionMember::object("A")],
                    shared_interfaces: vec![],
                },
                IrUnion {
                    name: "Outer".into(),
                    description: None,
                    members: vec![UnionMember::nested("Inner")],
                    shared_interfaces: vec![],
                },
            ],
            ..IrSchema::default()
        };
        let output = plugin().generate(&schema).unwrap();
        assert!(output.contains("    case innerItem(Inner)\n"));
        assert!(output.contains("return .innerItem(try Inner.fromJSON(json))"));
        assert!(output.contains(
            "throw IapDecodingError(\"Unknown __typename for Outer: \\(typename)\")"
        ));
    }

    #[test]
    fn test_optional_input_strict_fallback() {
        let schema = IrSchema {
            inputs: vec![
                IrInput {
                    name: "Options".into(),
                    description: None,
                    fields: vec![IrField::new("note", IrType::scalar("String").nullable())],
                    is_custom_type: false,
                    custom_type_kind: None,
                },
                IrInput {
                    name: "Request".into(),
                    description: None,
                    fields: vec![IrField::new("options", IrType::input("Options"))],
                    is_custom_type: false,
                    custom_type_kind: None,
                },
            ],
            ..IrSchema::default()
        };
        let output = plugin().generate(&schema).unwrap();
        assert!(output.contains(
            "guard let options = (json[\"options\"] as? [String: Any]).map(Options.fromJSONOrNil) ?? Options.fromJSONOrNil([:]) else { return nil }"
        ));
        assert!(output.contains(
            "let options = try (json[\"options\"] as? [String: Any]).map(Options.fromJSON) ?? Options.fromJSON([:])"
        ));
    }

    #[test]
    fn test_call_like_wraps() {
        let mut w = CodeWriter::new("    ");
        call_like(&mut w, "init(", &["a: Int".into(), "b: Int".into()], ") {");
        call_like(
            &mut w,
            "f(",
            &["a".into(), "b".into(), "c".into()],
            ")",
        );
        insta::assert_snapshot!(w.finish(), @r"
        init(a: Int, b: Int) {
        f(
            a,
            b,
            c
        )
        ");
    }
}
