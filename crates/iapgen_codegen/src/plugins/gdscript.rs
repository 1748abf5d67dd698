//! GDScript (Godot 4) target.
//!
//! Everything lives in one `class_name` script: enums with lookup tables,
//! inner classes with `from_dict`/`to_dict`, resolver stubs and handler
//! classes holding `Callable`s. GDScript has no exceptions, so decoders take
//! a `strict` flag and report lenient failures through `push_error`.

use crate::context::GenerationContext;
use crate::error::CodegenResult;
use crate::plugin::Plugin;
use crate::plugins::{error_code_labels, quote, request_branches};
use crate::writer::CodeWriter;
use crate::CodegenOptions;
use iapgen_core::keywords::{escape_identifier, GDSCRIPT_KEYWORDS};
use iapgen_core::scalars::{lookup_scalar, ScalarCategory, GRAPHQL_TO_GDSCRIPT};
use iapgen_core::tables::{PURCHASE_REQUEST_DISCRIMINATOR, TYPENAME_KEY};
use iapgen_core::{to_constant_case, to_snake_case, KeywordEscape};
use iapgen_ir::{
    CustomInputKind, IrEnum, IrField, IrInput, IrInterface, IrObject, IrOperation,
    IrOperationField, IrSchema, IrType, IrUnion, ReturnShape, TypeKind,
};

const PRELUDE: &str = r"static func _as_string(value: Variant) -> Variant:
    return value if value is String else null

static func _as_int(value: Variant) -> Variant:
    if value is int or value is float:
        return int(value)
    return null

static func _as_float(value: Variant) -> Variant:
    if value is int or value is float:
        return float(value)
    return null

static func _as_flexible_int(value: Variant) -> Variant:
    if value is String and value.is_valid_float():
        return int(float(value))
    return _as_int(value)

static func _as_flexible_float(value: Variant) -> Variant:
    if value is String and value.is_valid_float():
        return float(value)
    return _as_float(value)

static func _as_bool(value: Variant) -> Variant:
    return value if value is bool else null

static func _as_dict(value: Variant) -> Variant:
    return value if value is Dictionary else null

static func _compact(values: Variant, decode: Callable) -> Variant:
    if not values is Array:
        return null
    var out := []
    for value in values:
        var decoded = decode.call(value)
        if decoded != null:
            out.append(decoded)
    return out
";

/// Generates a single GDScript file.
pub struct GdscriptPlugin {
    header: String,
    class_name: String,
    indent: String,
}

impl GdscriptPlugin {
    #[must_use]
    pub fn new(options: &CodegenOptions) -> Self {
        Self {
            header: options.header.clone(),
            class_name: options.gdscript_class_name.clone(),
            indent: options.indent_or("\t"),
        }
    }
}

impl Plugin for GdscriptPlugin {
    fn name(&self) -> &str {
        "gdscript"
    }

    fn file_extension(&self) -> &str {
        "gd"
    }

    fn map_scalar(&self, name: &str) -> String {
        lookup_scalar(GRAPHQL_TO_GDSCRIPT, name, "String").to_string()
    }

    /// Nullable scalars, enums and lists become `Variant`; object types are
    /// nullable already. Enums are typed `int`.
    fn map_type(&self, ty: &IrType) -> String {
        match &ty.kind {
            TypeKind::Object { name } | TypeKind::Input { name } | TypeKind::Union { name } => {
                name.clone()
            }
            _ if ty.nullable => "Variant".to_string(),
            TypeKind::Scalar { name } if ScalarCategory::of(name) != ScalarCategory::Void => {
                self.map_scalar(name)
            }
            TypeKind::Enum { .. } => "int".to_string(),
            TypeKind::List { .. } => "Array".to_string(),
            TypeKind::Scalar { .. } | TypeKind::Interface { .. } => "Variant".to_string(),
        }
    }

    fn escape_keyword(&self, ident: &str) -> String {
        escape_identifier(ident, GDSCRIPT_KEYWORDS, KeywordEscape::UnderscorePrefix)
    }

    fn enum_value_case(&self, name: &str) -> String {
        self.escape_keyword(&to_constant_case(name))
    }

    fn field_name_case(&self, name: &str) -> String {
        self.escape_keyword(&to_snake_case(name))
    }

    fn generate(&self, schema: &IrSchema) -> CodegenResult<String> {
        let ctx = GenerationContext::new(schema)?;
        let emitter = Emitter { plugin: self, ctx: &ctx };
        let mut w = CodeWriter::new(self.indent.clone());

        emitter.emit_header(&mut w);
        tracing::debug!(count = schema.enums.len(), "gdscript: enums");
        for e in &schema.enums {
            emitter.emit_enum(&mut w, e);
        }
        tracing::debug!(count = schema.interfaces.len(), "gdscript: interfaces");
        for interface in &schema.interfaces {
            emitter.emit_interface(&mut w, interface);
        }
        tracing::debug!(count = schema.objects.len(), "gdscript: objects");
        for object in &schema.objects {
            emitter.emit_object(&mut w, object);
        }
        tracing::debug!(count = schema.inputs.len(), "gdscript: inputs");
        for input in &schema.inputs {
            emitter.emit_input(&mut w, input);
        }
        tracing::debug!(count = schema.unions.len(), "gdscript: unions");
        for union in &schema.unions {
            emitter.emit_union(&mut w, union);
        }
        tracing::debug!(count = schema.operations.len(), "gdscript: operations");
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
    plugin: &'p GdscriptPlugin,
    ctx: &'p GenerationContext<'a>,
}

impl Emitter<'_, '_> {
    fn ty(&self, ty: &IrType) -> String {
        self.plugin.map_type(ty)
    }

    fn ident(&self, name: &str) -> String {
        self.plugin.field_name_case(name)
    }

    /// Qualifies an outer-script member for use inside inner classes.
    fn outer(&self, member: &str) -> String {
        format!("{}.{member}", self.plugin.class_name)
    }

    fn enum_fn(&self, enum_name: &str, suffix: &str) -> String {
        self.outer(&format!("{}_{suffix}", to_snake_case(enum_name)))
    }

    fn enum_const(&self, enum_name: &str, value_name: &str) -> String {
        self.outer(&format!("{enum_name}.{}", self.plugin.enum_value_case(value_name)))
    }

    /// Initial value of a property or resolver stub result.
    fn default_literal(&self, ty: &IrType, owner_field: Option<(&str, &str)>) -> String {
        if ty.nullable {
            return "null".to_string();
        }
        match &ty.kind {
            TypeKind::Scalar { name } => match ScalarCategory::of(name) {
                ScalarCategory::String => "\"\"".to_string(),
                ScalarCategory::Int => "0".to_string(),
                ScalarCategory::Float => "0.0".to_string(),
                ScalarCategory::Boolean => "false".to_string(),
                ScalarCategory::Json => "{}".to_string(),
                ScalarCategory::Void => "null".to_string(),
            },
            TypeKind::Enum { name } => {
                let default = owner_field
                    .and_then(|(owner, field)| self.ctx.enum_default(owner, field, name))
                    .or_else(|| self.ctx.index.enum_def(name).and_then(|e| e.values.first()));
                default.map_or_else(|| "0".to_string(), |v| self.enum_const(name, &v.name))
            }
            TypeKind::List { .. } => "[]".to_string(),
            TypeKind::Object { .. }
            | TypeKind::Input { .. }
            | TypeKind::Interface { .. }
            | TypeKind::Union { .. } => "null".to_string(),
        }
    }

    fn emit_header(&self, w: &mut CodeWriter) {
        for line in self.plugin.header.lines() {
            w.line(format!("# {line}").trim_end());
        }
        w.blank();
        w.line(format!("class_name {}", self.plugin.class_name));
        w.line("extends RefCounted");
        w.blank();
        w.snippet(PRELUDE);
        w.blank();
    }

    fn emit_enum(&self, w: &mut CodeWriter, e: &IrEnum) {
        let name = &e.name;
        let prefix = to_constant_case(name);
        let constants: Vec<String> = e
            .values
            .iter()
            .map(|v| self.plugin.enum_value_case(&v.name))
            .collect();

        w.doc("##", e.description.as_deref());
        w.line(format!("enum {name} {{ {} }}", constants.join(", ")));
        w.blank();
        w.block(format!("const {prefix}_VALUES := {{"), "}", |w| {
            for (value, constant) in e.values.iter().zip(&constants) {
                w.line(format!("{name}.{constant}: {},", quote(&value.raw_value, false)));
            }
        });
        w.blank();
        w.block(format!("const {prefix}_FROM_STRING := {{"), "}", |w| {
            if e.is_error_code {
                for (value, labels) in error_code_labels(e) {
                    let constant = self.plugin.enum_value_case(&value.name);
                    for label in labels {
                        w.line(format!("{}: {name}.{constant},", quote(&label, false)));
                    }
                }
            } else {
                for (value, constant) in e.values.iter().zip(&constants) {
                    w.line(format!("{}: {name}.{constant},", quote(&value.raw_value, false)));
                }
            }
        });
        w.blank();

        let snake = to_snake_case(name);
        w.suite(format!("static func {snake}_to_string(value: int) -> String:"), |w| {
            w.line(format!("return {prefix}_VALUES.get(value, \"\")"));
        });
        w.blank();
        w.suite(format!("static func {snake}_parse(value: Variant) -> Variant:"), |w| {
            w.suite(format!("if value is String and {prefix}_FROM_STRING.has(value):"), |w| {
                w.line(format!("return {prefix}_FROM_STRING[value]"));
            });
            w.line("return null");
        });
        w.blank();
        w.suite(format!("static func {snake}_from_string(value: String) -> int:"), |w| {
            w.line(format!("var parsed = {snake}_parse(value)"));
            w.suite("if parsed == null:", |w| {
                w.line(format!("push_error(\"Invalid {name} value: %s\" % value)"));
                w.line("return -1");
            });
            w.line("return parsed");
        });
        w.blank();
    }

    /// Interfaces have no GDScript counterpart; referenced ones get a
    /// dispatching decoder function.
    fn emit_interface(&self, w: &mut CodeWriter, interface: &IrInterface) {
        if !self.ctx.is_interface_referenced(&interface.name) {
            return;
        }
        let name = &interface.name;
        w.doc("##", interface.description.as_deref());
        w.suite(
            format!(
                "static func {}_from_dict(data: Dictionary, strict: bool = false) -> Variant:",
                to_snake_case(name)
            ),
            |w| {
                w.line(format!(
                    "var typename := str(data.get({}, \"\"))",
                    quote(TYPENAME_KEY, false)
                ));
                let implementors = self.ctx.index.implementors(name);
                if !implementors.is_empty() {
                    w.suite("match typename:", |w| {
                        for object in implementors {
                            w.suite(format!("{}:", quote(&object.name, false)), |w| {
                                w.line(format!("return {}.from_dict(data, strict)", object.name));
                            });
                        }
                    });
                }
                w.suite("if not strict:", |w| {
                    w.line(format!("push_error(\"Unknown __typename for {name}: %s\" % typename)"));
                });
                w.line("return null");
            },
        );
        w.blank();
    }

    fn emit_object(&self, w: &mut CodeWriter, object: &IrObject) {
        if object.is_result_union {
            self.emit_result_union(w, object);
        } else {
            self.emit_class(
                w,
                &object.name,
                object.description.as_deref(),
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
        self.emit_class(w, &input.name, input.description.as_deref(), &input.fields, shape);
    }

    fn emit_properties(&self, w: &mut CodeWriter, owner: &str, fields: &[IrField]) {
        for field in fields {
            w.doc("##", field.description.as_deref());
            w.line(format!(
                "var {}: {} = {}",
                self.ident(&field.name),
                self.ty(&field.ty),
                self.default_literal(&field.ty, Some((owner, &field.name)))
            ));
        }
    }

    fn emit_class(
        &self,
        w: &mut CodeWriter,
        name: &str,
        description: Option<&str>,
        fields: &[IrField],
        shape: Shape,
    ) {
        w.doc("##", description);
        w.suite(format!("class {name}:"), |w| {
            self.emit_properties(w, name, fields);
            w.blank();
            w.suite(
                format!("static func from_dict(data: Dictionary, strict: bool = false) -> {name}:"),
                |w| {
                    w.line(format!("var result := {name}.new()"));
                    for field in fields {
                        let target = format!("result.{}", self.ident(&field.name));
                        let source = format!("data.get({})", quote(&field.name, false));
                        self.decode_into(
                            w,
                            name,
                            &field.name,
                            &target,
                            &field.ty,
                            &source,
                            shape.flexible(),
                        );
                    }
                    w.line("return result");
                },
            );
            w.blank();
            w.suite("func to_dict() -> Dictionary:", |w| {
                if shape == Shape::Object {
                    w.line(format!(
                        "var data := {{{}: {}}}",
                        quote(TYPENAME_KEY, false),
                        quote(name, false)
                    ));
                } else {
                    w.line("var data := {}");
                }
                for field in fields {
                    let ident = self.ident(&field.name);
                    let assign = format!(
                        "data[{}] = {}",
                        quote(&field.name, false),
                        self.encode(&ident, &field.ty)
                    );
                    if field.ty.nullable || field.ty.is_composite() {
                        w.suite(format!("if {ident} != null:"), |w| w.line(&assign));
                    } else {
                        w.line(assign);
                    }
                }
                w.line("return data");
            });
        });
        w.blank();
    }

    /// Decodes `source` into `target`, returning null from the enclosing
    /// `from_dict` when the value cannot be produced.
    #[allow(clippy::too_many_arguments)]
    fn decode_into(
        &self,
        w: &mut CodeWriter,
        owner: &str,
        wire: &str,
        target: &str,
        ty: &IrType,
        source: &str,
        flexible: bool,
    ) {
        let local = format!("{}_value", to_snake_case(wire));
        match &ty.kind {
            TypeKind::Scalar { name } => {
                let category = ScalarCategory::of(name);
                if category == ScalarCategory::Void {
                    return;
                }
                w.line(format!("var {local} = {}", self.scalar_read(category, source, flexible)));
                w.suite(format!("if {local} != null:"), |w| w.line(format!("{target} = {local}")));
                if !ty.nullable {
                    w.suite("elif strict:", |w| w.line("return null"));
                }
            }
            TypeKind::Enum { name } => {
                w.line(format!("var {local} = {}({source})", self.enum_fn(name, "parse")));
                w.suite(format!("if {local} != null:"), |w| w.line(format!("{target} = {local}")));
                if !ty.nullable && self.ctx.enum_default(owner, wire, name).is_none() {
                    w.suite("elif strict:", |w| w.line("return null"));
                    w.suite("else:", |w| {
                        w.line(format!("push_error(\"Invalid {name} value: %s\" % str({source}))"));
                        w.line("return null");
                    });
                }
            }
            TypeKind::List { element_type } => {
                let element = self.decode_element(element_type, "item0", 0);
                w.line(format!(
                    "var {local} = {}({source}, func(item0): return {element})",
                    self.outer("_compact")
                ));
                if ty.nullable {
                    w.line(format!("{target} = {local}"));
                } else {
                    w.line(format!("{target} = {local} if {local} != null else []"));
                }
            }
            TypeKind::Object { name }
            | TypeKind::Input { name }
            | TypeKind::Interface { name }
            | TypeKind::Union { name } => {
                let decoder = self.decoder(&ty.kind, name);
                w.line(format!("var {local} = {source}"));
                if ty.nullable {
                    w.suite(format!("if {local} is Dictionary:"), |w| {
                        w.line(format!("{target} = {decoder}({local}, true)"));
                    });
                    return;
                }
                w.suite(format!("if {local} is Dictionary:"), |w| {
                    w.line(format!("{target} = {decoder}({local}, strict)"));
                    w.suite(format!("if {target} == null:"), |w| w.line("return null"));
                });
                if matches!(ty.kind, TypeKind::Input { .. })
                    && !self.ctx.index.is_required_input(name)
                {
                    w.suite("else:", |w| w.line(format!("{target} = {decoder}({{}})")));
                } else {
                    w.suite("elif strict:", |w| w.line("return null"));
                    w.suite("else:", |w| {
                        w.line(format!(
                            "push_error(\"Missing required field `{wire}` on {owner}\")"
                        ));
                        w.line("return null");
                    });
                }
            }
        }
    }

    fn decoder(&self, kind: &TypeKind, name: &str) -> String {
        if matches!(kind, TypeKind::Interface { .. }) {
            self.outer(&format!("{}_from_dict", to_snake_case(name)))
        } else {
            format!("{name}.from_dict")
        }
    }

    fn scalar_read(&self, category: ScalarCategory, source: &str, flexible: bool) -> String {
        let helper = match (category, flexible) {
            (ScalarCategory::Int, false) => "_as_int",
            (ScalarCategory::Int, true) => "_as_flexible_int",
            (ScalarCategory::Float, false) => "_as_float",
            (ScalarCategory::Float, true) => "_as_flexible_float",
            (ScalarCategory::Boolean, _) => "_as_bool",
            (ScalarCategory::Json, _) => "_as_dict",
            (ScalarCategory::String | ScalarCategory::Void, _) => "_as_string",
        };
        format!("{}({source})", self.outer(helper))
    }

    /// Expression yielding the decoded element or null.
    fn decode_element(&self, ty: &IrType, item: &str, depth: usize) -> String {
        match &ty.kind {
            TypeKind::Scalar { name } => match ScalarCategory::of(name) {
                ScalarCategory::Void => "null".to_string(),
                category => self.scalar_read(category, item, false),
            },
            TypeKind::Enum { name } => format!("{}({item})", self.enum_fn(name, "parse")),
            TypeKind::Object { name }
            | TypeKind::Input { name }
            | TypeKind::Interface { name }
            | TypeKind::Union { name } => format!(
                "{}({item}, true) if {item} is Dictionary else null",
                self.decoder(&ty.kind, name)
            ),
            TypeKind::List { element_type } => {
                let next = format!("item{}", depth + 1);
                let inner = self.decode_element(element_type, &next, depth + 1);
                format!("{}({item}, func({next}): return {inner})", self.outer("_compact"))
            }
        }
    }

    fn encode(&self, expr: &str, ty: &IrType) -> String {
        match &ty.kind {
            TypeKind::Scalar { .. } => expr.to_string(),
            TypeKind::Enum { name } => format!("{}({expr})", self.enum_fn(name, "to_string")),
            TypeKind::Object { .. }
            | TypeKind::Input { .. }
            | TypeKind::Interface { .. }
            | TypeKind::Union { .. } => format!("{expr}.to_dict()"),
            TypeKind::List { element_type } => {
                if matches!(element_type.innermost().kind, TypeKind::Scalar { .. }) {
                    return expr.to_string();
                }
                format!("{expr}.map(func(item): return {})", self.encode("item", element_type))
            }
        }
    }

    fn emit_result_union(&self, w: &mut CodeWriter, object: &IrObject) {
        let name = &object.name;
        let entries: Vec<(&str, IrType)> = object
            .result_union_entries
            .iter()
            .map(|e| (e.field_name.as_str(), e.ty.clone()))
            .collect();
        let keys: Vec<_> = entries.iter().map(|(key, _)| format!("`{key}`")).collect();

        w.doc("##", object.description.as_deref());
        w.suite(format!("class {name}:"), |w| {
            for (key, ty) in &entries {
                let nullable = IrType {
                    nullable: true,
                    ..ty.clone()
                };
                w.line(format!("var {}: {} = null", self.ident(key), self.ty(&nullable)));
            }
            w.blank();
            w.suite(
                format!("static func from_dict(data: Dictionary, strict: bool = false) -> {name}:"),
                |w| {
                    w.line(format!("var result := {name}.new()"));
                    for (key, ty) in &entries {
                        let required = IrType {
                            nullable: false,
                            ..ty.clone()
                        };
                        let source = format!("data.get({})", quote(key, false));
                        w.suite(format!("if {source} != null:"), |w| {
                            let target = format!("result.{}", self.ident(key));
                            self.decode_into(w, name, key, &target, &required, &source, false);
                            w.line("return result");
                        });
                    }
                    w.suite("if not strict:", |w| {
                        w.line(format!(
                            "push_error(\"{name} has none of its result fields set (expected one of {})\")",
                            keys.join(", ")
                        ));
                    });
                    w.line("return null");
                },
            );
            w.blank();
            w.suite("func to_dict() -> Dictionary:", |w| {
                for (key, ty) in &entries {
                    let ident = self.ident(key);
                    w.suite(format!("if {ident} != null:"), |w| {
                        w.line(format!(
                            "return {{{}: {}}}",
                            quote(key, false),
                            self.encode(&ident, ty)
                        ));
                    });
                }
                w.line("return {}");
            });
        });
        w.blank();
    }

    fn emit_purchase_request(&self, w: &mut CodeWriter, input: &IrInput) {
        let Some((enum_name, branches)) = request_branches(&self.ctx.index, input) else {
            return;
        };
        let [first, second] = branches.as_slice() else {
            return;
        };
        let name = &input.name;
        let discriminator = self.ident(PURCHASE_REQUEST_DISCRIMINATOR);
        let params: Vec<String> = branches
            .iter()
            .map(|b| format!("{}: {} = null", self.ident(b.key), b.payload_type))
            .chain(std::iter::once(format!("{discriminator}: Variant = null")))
            .collect();

        w.doc("##", input.description.as_deref());
        w.suite(format!("class {name}:"), |w| {
            for branch in &branches {
                w.line(format!("var {}: {} = null", self.ident(branch.key), branch.payload_type));
            }
            w.line(format!(
                "var {discriminator}: int = {}",
                self.enum_const(enum_name, &first.discriminator.name)
            ));
            w.blank();

            w.suite(format!("static func create({}) -> {name}:", params.join(", ")), |w| {
                let (a, b) = (self.ident(first.key), self.ident(second.key));
                w.suite(format!("if ({a} == null) == ({b} == null):"), |w| {
                    w.line(format!(
                        "push_error(\"{name} requires exactly one of `{}` or `{}`\")",
                        first.key, second.key
                    ));
                    w.line("return null");
                });
                w.line(format!("var result := {name}.new()"));
                for branch in &branches {
                    let key = self.ident(branch.key);
                    let expected = self.enum_const(enum_name, &branch.discriminator.name);
                    w.suite(format!("if {key} != null:"), |w| {
                        w.suite(
                            format!(
                                "if {discriminator} != null and {discriminator} != {expected}:"
                            ),
                            |w| {
                                w.line(format!(
                                    "push_error(\"{name}.type is `%s` but `{}` requires `{}`\" % {}({discriminator}))",
                                    branch.key,
                                    branch.discriminator.raw_value,
                                    self.enum_fn(enum_name, "to_string")
                                ));
                                w.line("return null");
                            },
                        );
                        w.line(format!("result.{key} = {key}"));
                        w.line(format!("result.{discriminator} = {expected}"));
                    });
                }
                w.line("return result");
            });
            w.blank();

            w.suite(
                format!("static func from_dict(data: Dictionary, strict: bool = false) -> {name}:"),
                |w| {
                    w.line(format!(
                        "var raw_type = data.get({})",
                        quote(PURCHASE_REQUEST_DISCRIMINATOR, false)
                    ));
                    for (i, branch) in branches.iter().enumerate() {
                        let raw = quote(&branch.discriminator.raw_value, false);
                        let declare = if i == 0 { "var " } else { "" };
                        w.line(format!(
                            "{declare}payload = data.get({})",
                            quote(branch.key, false)
                        ));
                        w.suite("if payload is Dictionary:", |w| {
                            w.suite(format!("if raw_type is String and raw_type != {raw}:"), |w| {
                                w.suite("if not strict:", |w| {
                                    w.line(format!(
                                        "push_error(\"{name}.type is `%s` but `{}` requires `{}`\" % raw_type)",
                                        branch.key, branch.discriminator.raw_value
                                    ));
                                });
                                w.line("return null");
                            });
                            w.line(format!(
                                "var value = {}.from_dict(payload, strict)",
                                branch.payload_type
                            ));
                            w.suite("if value == null:", |w| w.line("return null"));
                            let args = if i == 0 { "value" } else { "null, value" };
                            w.line(format!("return {name}.create({args})"));
                        });
                    }
                    w.suite("if not strict:", |w| {
                        w.line(format!(
                            "push_error(\"{name} requires either `{}` or `{}`\")",
                            first.key, second.key
                        ));
                    });
                    w.line("return null");
                },
            );
            w.blank();

            w.suite("func to_dict() -> Dictionary:", |w| {
                w.line(format!(
                    "var data := {{{}: {}({discriminator})}}",
                    quote(PURCHASE_REQUEST_DISCRIMINATOR, false),
                    self.enum_fn(enum_name, "to_string")
                ));
                for branch in &branches {
                    let key = self.ident(branch.key);
                    w.suite(format!("if {key} != null:"), |w| {
                        w.line(format!("data[{}] = {key}.to_dict()", quote(branch.key, false)));
                    });
                }
                w.line("return data");
            });
        });
        w.blank();
    }

    fn emit_union(&self, w: &mut CodeWriter, union: &IrUnion) {
        let name = &union.name;
        let nested = self.ctx.index.nested_unions(name);
        w.doc("##", union.description.as_deref());
        w.suite(format!("class {name}:"), |w| {
            w.line("var typename: String = \"\"");
            w.line("var value: Variant = null");
            w.blank();
            w.suite(
                format!("static func from_dict(data: Dictionary, strict: bool = false) -> {name}:"),
                |w| {
                    w.line(format!("var result := {name}.new()"));
                    w.line(format!(
                        "result.typename = str(data.get({}, \"\"))",
                        quote(TYPENAME_KEY, false)
                    ));
                    w.suite("match result.typename:", |w| {
                        for leaf in self.ctx.index.flatten_union(name) {
                            let decl = leaf.via.unwrap_or(leaf.typename);
                            w.suite(format!("{}:", quote(leaf.typename, false)), |w| {
                                w.line(format!("result.value = {decl}.from_dict(data, strict)"));
                            });
                        }
                        w.suite("_:", |w| {
                            w.suite("if not strict:", |w| {
                                w.line(format!(
                                    "push_error(\"Unknown __typename for {name}: %s\" % result.typename)"
                                ));
                            });
                            w.line("return null");
                        });
                    });
                    w.suite("if result.value == null:", |w| w.line("return null"));
                    w.line("return result");
                },
            );
            w.blank();
            w.suite("func to_dict() -> Dictionary:", |w| {
                w.line("return value.to_dict() if value != null else {}");
            });

            for field in self.ctx.index.shared_interface_fields(name) {
                let ident = self.ident(&field.name);
                w.blank();
                w.suite(format!("func get_{ident}() -> {}:", self.ty(&field.ty)), |w| {
                    for member in &nested {
                        w.suite(format!("if value is {member}:"), |w| {
                            w.line(format!("return value.get_{ident}()"));
                        });
                    }
                    w.line(format!("return value.{ident}"));
                });
            }
        });
        w.blank();
    }

    fn arguments(&self, field: &IrOperationField) -> String {
        field
            .args
            .iter()
            .map(|a| format!("{}: {}", self.ident(&a.name), self.ty(&a.ty)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn return_type(field: &IrOperationField, map: impl Fn(&IrType) -> String) -> String {
        match field.return_shape() {
            ReturnShape::Void { nullable: false } => "void".to_string(),
            ReturnShape::Void { nullable: true } => "Variant".to_string(),
            ReturnShape::Value(ty) => map(ty),
        }
    }

    fn emit_resolver(&self, w: &mut CodeWriter, operation: &IrOperation) {
        let class = format!("{}Resolver", operation.name);
        w.doc("##", operation.description.as_deref());
        w.suite(format!("class {class}:"), |w| {
            let mut empty = true;
            for field in operation.generated_fields() {
                empty = false;
                let ident = self.ident(&field.name);
                w.doc("##", field.description.as_deref());
                w.suite(
                    format!(
                        "func {ident}({}) -> {}:",
                        self.arguments(field),
                        Self::return_type(field, |ty| self.ty(ty))
                    ),
                    |w| {
                        w.line(format!("push_error(\"{class}.{ident} is not implemented\")"));
                        if let ReturnShape::Value(ty) = field.return_shape() {
                            w.line(format!("return {}", self.default_literal(ty, None)));
                        } else if matches!(
                            field.return_shape(),
                            ReturnShape::Void { nullable: true }
                        ) {
                            w.line("return null");
                        }
                    },
                );
                w.blank();
            }
            if empty {
                w.line("pass");
            }
        });
        w.blank();
    }

    fn emit_handlers(&self, w: &mut CodeWriter, operation: &IrOperation) {
        let class = format!("{}Handlers", operation.name);
        w.suite(format!("class {class}:"), |w| {
            let mut empty = true;
            for field in operation.generated_fields() {
                empty = false;
                w.line(format!(
                    "## func({}) -> {}",
                    self.arguments(field),
                    Self::return_type(field, |ty| self.ty(ty))
                ));
                w.line(format!("var {}: Callable", self.ident(&field.name)));
            }
            if empty {
                w.line("pass");
            }
        });
        w.blank();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Object,
    Input,
    FlexibleInput,
}

impl Shape {
    fn flexible(self) -> bool {
        self == Shape::FlexibleInput
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iapgen_ir::IrEnumValue;

    fn plugin() -> GdscriptPlugin {
        GdscriptPlugin::new(&CodegenOptions::default())
    }

    #[test]
    fn test_map_type() {
        let p = plugin();
        assert_eq!(p.map_type(&IrType::scalar("Int")), "int");
        assert_eq!(p.map_type(&IrType::scalar("Int").nullable()), "Variant");
        assert_eq!(p.map_type(&IrType::enum_ref("Store")), "int");
        assert_eq!(p.map_type(&IrType::list(IrType::scalar("String"))), "Array");
        assert_eq!(p.map_type(&IrType::object("PurchaseIOS").nullable()), "PurchaseIOS");
        assert_eq!(p.map_type(&IrType::interface("ProductCommon")), "Variant");
    }

    #[test]
    fn test_identifier_cases() {
        let p = plugin();
        assert_eq!(p.field_name_case("purchaseToken"), "purchase_token");
        assert_eq!(p.field_name_case("class"), "_class");
        assert_eq!(p.enum_value_case("InApp"), "IN_APP");
    }

    #[test]
    fn test_enum_tables() {
        let schema = IrSchema {
            enums: vec![IrEnum {
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
            }],
            ..IrSchema::default()
        };
        let output = plugin().generate(&schema).unwrap();
        assert!(output.contains("enum Store { APPLE, GOOGLE }\n"));
        assert!(output.contains(
            "const STORE_VALUES := {\n\tStore.APPLE: \"apple\",\n\tStore.GOOGLE: \"google\",\n}\n"
        ));
        assert!(output.contains("const STORE_FROM_STRING := {\n\t\"apple\": Store.APPLE,\n"));
        assert!(output.contains("static func store_from_string(value: String) -> int:\n"));
        assert!(output.starts_with(
            "# Generated by iapgen. Do not edit.\n\nclass_name IapTypes\nextends RefCounted\n"
        ));
    }
}
