//! Kotlin target.
//!
//! Data classes with companion `fromJson`/`fromJsonOrNull`, enum classes
//! carrying their raw value, sealed interfaces for unions, suspend resolver
//! interfaces and handler type aliases.

use crate::context::GenerationContext;
use crate::error::CodegenResult;
use crate::plugin::{render_type, Plugin};
use crate::plugins::{error_code_labels, quote, request_branches};
use crate::writer::CodeWriter;
use crate::CodegenOptions;
use iapgen_core::keywords::{escape_identifier, KOTLIN_KEYWORDS};
use iapgen_core::scalars::{lookup_scalar, ScalarCategory, GRAPHQL_TO_KOTLIN};
use iapgen_core::tables::{PURCHASE_REQUEST_DISCRIMINATOR, TYPENAME_KEY};
use iapgen_core::{to_pascal_case, KeywordEscape};
use iapgen_ir::{
    CustomInputKind, DecodeMode, IrEnum, IrField, IrInput, IrInterface, IrObject, IrOperation,
    IrOperationField, IrSchema, IrType, IrUnion, ReturnShape, TypeKind,
};
use rustc_hash::FxHashSet;

const PRELUDE: &str = r#"class IapDecodingException(message: String) : IllegalArgumentException(message)

private fun Any?.asIapInt(): Int? = when (this) {
    is Int -> this
    is Number -> toInt()
    else -> null
}

private fun Any?.asIapDouble(): Double? = (this as? Number)?.toDouble()

private fun Any?.asIapFlexibleInt(): Int? = when (this) {
    is String -> toDoubleOrNull()?.toInt()
    else -> asIapInt()
}

private fun Any?.asIapFlexibleDouble(): Double? = when (this) {
    is String -> toDoubleOrNull()
    else -> asIapDouble()
}

@Suppress("UNCHECKED_CAST")
private fun Any?.asIapMap(): Map<String, Any?>? = this as? Map<String, Any?>

private fun Any?.asIapList(): List<Any?>? = this as? List<Any?>
"#;

/// Generates a single Kotlin source file.
pub struct KotlinPlugin {
    header: String,
    package_name: String,
    indent: String,
}

impl KotlinPlugin {
    #[must_use]
    pub fn new(options: &CodegenOptions) -> Self {
        Self {
            header: options.header.clone(),
            package_name: options.package_name.clone(),
            indent: options.indent_or("    "),
        }
    }
}

impl Plugin for KotlinPlugin {
    fn name(&self) -> &str {
        "kotlin"
    }

    fn file_extension(&self) -> &str {
        "kt"
    }

    fn map_scalar(&self, name: &str) -> String {
        lookup_scalar(GRAPHQL_TO_KOTLIN, name, "String").to_string()
    }

    fn map_type(&self, ty: &IrType) -> String {
        render_type(self, ty, |element| format!("List<{element}>"), |base| format!("{base}?"))
    }

    fn escape_keyword(&self, ident: &str) -> String {
        escape_identifier(ident, KOTLIN_KEYWORDS, KeywordEscape::Backticks)
    }

    fn enum_value_case(&self, name: &str) -> String {
        self.escape_keyword(&to_pascal_case(name))
    }

    fn generate(&self, schema: &IrSchema) -> CodegenResult<String> {
        let ctx = GenerationContext::new(schema)?;
        let emitter = Emitter { plugin: self, ctx: &ctx };
        let mut w = CodeWriter::new(self.indent.clone());

        emitter.emit_header(&mut w);
        tracing::debug!(count = schema.enums.len(), "kotlin: enums");
        for e in &schema.enums {
            emitter.emit_enum(&mut w, e);
        }
        tracing::debug!(count = schema.interfaces.len(), "kotlin: interfaces");
        for interface in &schema.interfaces {
            emitter.emit_interface(&mut w, interface);
        }
        tracing::debug!(count = schema.objects.len(), "kotlin: objects");
        for object in &schema.objects {
            emitter.emit_object(&mut w, object);
        }
        tracing::debug!(count = schema.inputs.len(), "kotlin: inputs");
        for input in &schema.inputs {
            emitter.emit_input(&mut w, input);
        }
        tracing::debug!(count = schema.unions.len(), "kotlin: unions");
        for union in &schema.unions {
            emitter.emit_union(&mut w, union);
        }
        tracing::debug!(count = schema.operations.len(), "kotlin: operations");
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
    plugin: &'p KotlinPlugin,
    ctx: &'p GenerationContext<'a>,
}

impl Emitter<'_, '_> {
    fn ty(&self, ty: &IrType) -> String {
        self.plugin.map_type(ty)
    }

    fn ident(&self, name: &str) -> String {
        self.plugin.field_name_case(name)
    }

    fn return_type(&self, field: &IrOperationField) -> String {
        match field.return_shape() {
            ReturnShape::Void { nullable: false } => "Unit".to_string(),
            ReturnShape::Void { nullable: true } => "Unit?".to_string(),
            ReturnShape::Value(ty) => self.ty(ty),
        }
    }

    fn emit_header(&self, w: &mut CodeWriter) {
        for line in self.plugin.header.lines() {
            w.line(format!("// {line}").trim_end());
        }
        w.blank();
        w.line(format!("package {}", self.plugin.package_name));
        w.blank();
        w.snippet(PRELUDE);
        w.blank();
    }

    fn emit_enum(&self, w: &mut CodeWriter, e: &IrEnum) {
        let name = &e.name;
        kdoc(w, e.description.as_deref());
        w.block(format!("enum class {name}(val rawValue: String) {{"), "}", |w| {
            for (i, value) in e.values.iter().enumerate() {
                kdoc(w, value.description.as_deref());
                let end = if i + 1 == e.values.len() { ";" } else { "," };
                w.line(format!(
                    "{}({}){end}",
                    self.plugin.enum_value_case(&value.name),
                    quote(&value.raw_value, true)
                ));
            }
            if e.values.is_empty() {
                w.line(";");
            }
            w.blank();
            w.line("fun toJson(): String = rawValue");
            w.blank();
            w.block("companion object {", "}", |w| {
                w.line(format!("fun fromJson(value: Any?): {name} ="));
                w.indent();
                w.line(format!(
                    "fromJsonOrNull(value) ?: throw IapDecodingException(\"Invalid {name} value: ${{value ?: \"null\"}}\")"
                ));
                w.dedent();
                w.blank();
                if e.is_error_code {
                    w.block(
                        format!(
                            "fun fromJsonOrNull(value: Any?): {name}? = when (value as? String) {{"
                        ),
                        "}",
                        |w| {
                            for (value, labels) in error_code_labels(e) {
                                let labels: Vec<_> =
                                    labels.iter().map(|l| quote(l, true)).collect();
                                w.line(format!(
                                    "{} -> {}",
                                    labels.join(", "),
                                    self.plugin.enum_value_case(&value.name)
                                ));
                            }
                            w.line("else -> null");
                        },
                    );
                } else {
                    w.line(format!(
                        "fun fromJsonOrNull(value: Any?): {name}? = (value as? String)?.let {{ raw -> values().firstOrNull {{ it.rawValue == raw }} }}"
                    ));
                }
            });
        });
        w.blank();
    }

    fn emit_interface(&self, w: &mut CodeWriter, interface: &IrInterface) {
        let name = &interface.name;
        let head = if interface.interfaces.is_empty() {
            format!("interface {name} {{")
        } else {
            format!("interface {name} : {} {{", interface.interfaces.join(", "))
        };
        kdoc(w, interface.description.as_deref());
        w.block(head, "}", |w| {
            for field in &interface.fields {
                kdoc(w, field.description.as_deref());
                w.line(format!("val {}: {}", self.ident(&field.name), self.ty(&field.ty)));
            }
            if interface.interfaces.is_empty() {
                w.line("fun toJson(): Map<String, Any?>");
            }
            if self.ctx.is_interface_referenced(name) {
                let arms: Vec<(String, String)> = self
                    .ctx
                    .index
                    .implementors(name)
                    .into_iter()
                    .map(|o| (o.name.clone(), format!("{}.fromJson(json)", o.name)))
                    .collect();
                let optional: Vec<(String, String)> = arms
                    .iter()
                    .map(|(typename, _)| {
                        (typename.clone(), format!("{typename}.fromJsonOrNull(json)"))
                    })
                    .collect();
                w.blank();
                w.block("companion object {", "}", |w| {
                    Self::emit_dispatch(w, name, &arms, &optional);
                });
            }
        });
        w.blank();
    }

    /// `fromJson`/`fromJsonOrNull` pair switching on `__typename`.
    fn emit_dispatch(
        w: &mut CodeWriter,
        owner: &str,
        arms: &[(String, String)],
        optional: &[(String, String)],
    ) {
        let key = quote(TYPENAME_KEY, true);
        w.block(
            format!(
                "fun fromJson(json: Map<String, Any?>): {owner} = when (val typename = json[{key}] as? String ?: \"\") {{"
            ),
            "}",
            |w| {
                for (typename, expr) in arms {
                    w.line(format!("{} -> {expr}", quote(typename, true)));
                }
                w.line(format!(
                    "else -> throw IapDecodingException(\"Unknown __typename for {owner}: $typename\")"
                ));
            },
        );
        w.blank();
        w.block(
            format!(
                "fun fromJsonOrNull(json: Map<String, Any?>): {owner}? = when (json[{key}] as? String) {{"
            ),
            "}",
            |w| {
                for (typename, expr) in optional {
                    w.line(format!("{} -> {expr}", quote(typename, true)));
                }
                w.line("else -> null");
            },
        );
    }

    fn emit_object(&self, w: &mut CodeWriter, object: &IrObject) {
        if object.is_result_union {
            self.emit_result_union(w, object);
            return;
        }
        let supertypes: Vec<String> = object
            .interfaces
            .iter()
            .cloned()
            .chain(self.ctx.unions_of(&object.name).iter().map(|u| (*u).to_string()))
            .collect();
        let inherited = self.ctx.interface_field_names(object);
        self.emit_class(
            w,
            &object.name,
            object.description.as_deref(),
            &supertypes,
            &object.fields,
            &inherited,
            Shape::Object,
        );
    }

    fn emit_input(&self, w: &mut CodeWriter, input: &IrInput) {
        let shape = match input.custom_kind() {
            Some(CustomInputKind::PurchaseRequest) => return self.emit_purchase_request(w, input),
            Some(CustomInputKind::DiscountOffer) => Shape::FlexibleInput,
            None => Shape::Input,
        };
        self.emit_class(
            w,
            &input.name,
            input.description.as_deref(),
            &[],
            &input.fields,
            &FxHashSet::default(),
            shape,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_class(
        &self,
        w: &mut CodeWriter,
        name: &str,
        description: Option<&str>,
        supertypes: &[String],
        fields: &[IrField],
        inherited: &FxHashSet<&str>,
        shape: Shape,
    ) {
        let supers = if supertypes.is_empty() {
            String::new()
        } else {
            format!(" : {}", supertypes.join(", "))
        };
        let override_fun = if supertypes.is_empty() { "" } else { "override " };

        kdoc(w, description);
        if fields.is_empty() {
            w.line(format!("class {name}{supers} {{"));
        } else {
            w.line(format!("data class {name}("));
            w.indent();
            for field in fields {
                kdoc(w, field.description.as_deref());
                let modifier = if inherited.contains(field.name.as_str()) {
                    "override "
                } else {
                    ""
                };
                let default = if field.ty.nullable { " = null" } else { "" };
                w.line(format!(
                    "{modifier}val {}: {}{default},",
                    self.ident(&field.name),
                    self.ty(&field.ty)
                ));
            }
            w.dedent();
            w.line(format!("){supers} {{"));
        }
        w.indent();

        w.block(
            format!("{override_fun}fun toJson(): Map<String, Any?> = buildMap<String, Any?> {{"),
            "}",
            |w| {
                if shape == Shape::Object {
                    w.line(format!("put({}, {})", quote(TYPENAME_KEY, true), quote(name, true)));
                }
                for field in fields {
                    let key = quote(&field.name, true);
                    let ident = self.ident(&field.name);
                    if field.ty.nullable {
                        let required = IrType {
                            nullable: false,
                            ..field.ty.clone()
                        };
                        w.line(format!(
                            "{ident}?.let {{ put({key}, {}) }}",
                            self.encode("it", &required, 0)
                        ));
                    } else {
                        w.line(format!("put({key}, {})", self.encode(&ident, &field.ty, 0)));
                    }
                }
            },
        );
        w.blank();

        w.block("companion object {", "}", |w| {
            for mode in [DecodeMode::Lenient, DecodeMode::Strict] {
                let signature = match mode {
                    DecodeMode::Lenient => {
                        format!("fun fromJson(json: Map<String, Any?>): {name} {{")
                    }
                    DecodeMode::Strict => {
                        format!("fun fromJsonOrNull(json: Map<String, Any?>): {name}? {{")
                    }
                };
                w.block(signature, "}", |w| {
                    for field in fields {
                        let local = local_name(&self.ident(&field.name));
                        let source = format!("json[{}]", quote(&field.name, true));
                        let value = self.decode_value(
                            name,
                            &field.name,
                            &field.ty,
                            &source,
                            mode,
                            shape.flexible(),
                        );
                        w.line(format!("val {local} = {value}"));
                    }
                    if fields.is_empty() {
                        w.line(format!("return {name}()"));
                    } else {
                        w.line(format!("return {name}("));
                        w.indent();
                        for field in fields {
                            let ident = self.ident(&field.name);
                            w.line(format!("{ident} = {},", local_name(&ident)));
                        }
                        w.dedent();
                        w.line(")");
                    }
                });
                w.blank();
            }
        });

        w.dedent();
        w.line("}");
        w.blank();
    }

    /// Expression decoding `source`; strict decoders bail out with `return null`.
    fn decode_value(
        &self,
        owner: &str,
        wire: &str,
        ty: &IrType,
        source: &str,
        mode: DecodeMode,
        flexible: bool,
    ) -> String {
        match &ty.kind {
            TypeKind::Scalar { name } => {
                let category = ScalarCategory::of(name);
                if category == ScalarCategory::Void {
                    return if ty.nullable { "null".to_string() } else { "Unit".to_string() };
                }
                let read = scalar_read(category, source, flexible);
                match (ty.nullable, mode) {
                    (true, _) => read,
                    (false, DecodeMode::Lenient) => format!("{read} ?: {}", zero_value(category)),
                    (false, DecodeMode::Strict) => format!("{read} ?: return null"),
                }
            }
            TypeKind::Enum { name } => {
                let read = format!("{name}.fromJsonOrNull({source})");
                if ty.nullable {
                    read
                } else if let Some(default) = self.ctx.enum_default(owner, wire, name) {
                    format!("{read} ?: {name}.{}", self.plugin.enum_value_case(&default.name))
                } else if mode == DecodeMode::Lenient {
                    format!("{name}.fromJson({source})")
                } else {
                    format!("{read} ?: return null")
                }
            }
            TypeKind::List { element_type } => {
                let element = self.decode_element(element_type, "item0", 0);
                if ty.nullable {
                    format!("{source}.asIapList()?.mapNotNull {{ item0 -> {element} }}")
                } else {
                    format!(
                        "({source}.asIapList() ?: emptyList()).mapNotNull {{ item0 -> {element} }}"
                    )
                }
            }
            TypeKind::Object { name }
            | TypeKind::Input { name }
            | TypeKind::Interface { name }
            | TypeKind::Union { name } => {
                let optional = format!("{source}.asIapMap()?.let {{ {name}.fromJsonOrNull(it) }}");
                let defaults = matches!(ty.kind, TypeKind::Input { .. })
                    && !self.ctx.index.is_required_input(name);
                match (ty.nullable, defaults, mode) {
                    (true, _, _) => optional,
                    (false, true, DecodeMode::Lenient) => {
                        format!("{name}.fromJson({source}.asIapMap() ?: emptyMap())")
                    }
                    (false, true, DecodeMode::Strict) => format!(
                        "{name}.fromJsonOrNull({source}.asIapMap() ?: emptyMap()) ?: return null"
                    ),
                    (false, false, DecodeMode::Lenient) => format!(
                        "{name}.fromJson({source}.asIapMap() ?: throw IapDecodingException(\"Missing required field `{wire}` on {owner}\"))"
                    ),
                    (false, false, DecodeMode::Strict) => format!("{optional} ?: return null"),
                }
            }
        }
    }

    /// Nullable expression decoding one list element; failures yield null.
    fn decode_element(&self, ty: &IrType, item: &str, depth: usize) -> String {
        match &ty.kind {
            TypeKind::Scalar { name } => match ScalarCategory::of(name) {
                ScalarCategory::Void => "null".to_string(),
                category => scalar_read(category, item, false),
            },
            TypeKind::Enum { name } => format!("{name}.fromJsonOrNull({item})"),
            TypeKind::Object { name }
            | TypeKind::Input { name }
            | TypeKind::Interface { name }
            | TypeKind::Union { name } => {
                format!("{item}.asIapMap()?.let {{ {name}.fromJsonOrNull(it) }}")
            }
            TypeKind::List { element_type } => {
                let next = format!("item{}", depth + 1);
                let inner = self.decode_element(element_type, &next, depth + 1);
                format!("{item}.asIapList()?.mapNotNull {{ {next} -> {inner} }}")
            }
        }
    }

    /// JSON-compatible expression for a property value.
    fn encode(&self, expr: &str, ty: &IrType, depth: usize) -> String {
        let chain = if ty.nullable { "?" } else { "" };
        match &ty.kind {
            TypeKind::Scalar { .. } => expr.to_string(),
            TypeKind::Enum { .. }
            | TypeKind::Object { .. }
            | TypeKind::Input { .. }
            | TypeKind::Interface { .. }
            | TypeKind::Union { .. } => format!("{expr}{chain}.toJson()"),
            TypeKind::List { element_type } => {
                if matches!(element_type.innermost().kind, TypeKind::Scalar { .. }) {
                    return expr.to_string();
                }
                let item = format!("item{depth}");
                let inner = self.encode(&item, element_type, depth + 1);
                format!("{expr}{chain}.map {{ {item} -> {inner} }}")
            }
        }
    }

    fn emit_result_union(&self, w: &mut CodeWriter, object: &IrObject) {
        let name = &object.name;
        let entries: Vec<(String, &str, IrType)> = object
            .result_union_entries
            .iter()
            .map(|e| {
                let required = IrType {
                    nullable: false,
                    ..e.ty.clone()
                };
                (
                    format!("{}Result", to_pascal_case(&e.field_name)),
                    e.field_name.as_str(),
                    required,
                )
            })
            .collect();
        let keys: Vec<_> = entries.iter().map(|(_, key, _)| format!("`{key}`")).collect();

        kdoc(w, object.description.as_deref());
        w.block(format!("sealed interface {name} {{"), "}", |w| {
            w.line("fun toJson(): Map<String, Any?>");
            for (class, key, ty) in &entries {
                w.blank();
                w.block(
                    format!("data class {class}(val value: {}) : {name} {{", self.ty(ty)),
                    "}",
                    |w| {
                        w.line(format!(
                            "override fun toJson(): Map<String, Any?> = mapOf({} to {})",
                            quote(key, true),
                            self.encode("value", ty, 0)
                        ));
                    },
                );
            }
            w.blank();
            w.block("companion object {", "}", |w| {
                for mode in [DecodeMode::Lenient, DecodeMode::Strict] {
                    let signature = match mode {
                        DecodeMode::Lenient => {
                            format!("fun fromJson(json: Map<String, Any?>): {name} {{")
                        }
                        DecodeMode::Strict => {
                            format!("fun fromJsonOrNull(json: Map<String, Any?>): {name}? {{")
                        }
                    };
                    w.block(signature, "}", |w| {
                        for (class, key, ty) in &entries {
                            w.block(format!("json[{}]?.let {{ raw ->", quote(key, true)), "}", |w| {
                                let value = self.decode_value(name, key, ty, "raw", mode, false);
                                w.line(format!("val value = {value}"));
                                w.line(format!("return {class}(value)"));
                            });
                        }
                        match mode {
                            DecodeMode::Lenient => w.line(format!(
                                "throw IapDecodingException(\"{name} has none of its result fields set (expected one of {})\")",
                                keys.join(", ")
                            )),
                            DecodeMode::Strict => w.line("return null"),
                        }
                    });
                    w.blank();
                }
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
        let discriminator_key = quote(PURCHASE_REQUEST_DISCRIMINATOR, true);
        let [first, second] = branches.as_slice() else {
            return;
        };
        let (first_key, second_key) = (self.ident(first.key), self.ident(second.key));

        kdoc(w, input.description.as_deref());
        w.line(format!("data class {name}("));
        w.indent();
        for branch in &branches {
            w.line(format!("val {}: {}? = null,", self.ident(branch.key), branch.payload_type));
        }
        w.line(format!(
            "val {discriminator}: {enum_name} = if ({first_key} != null) {enum_name}.{} else {enum_name}.{},",
            self.plugin.enum_value_case(&first.discriminator.name),
            self.plugin.enum_value_case(&second.discriminator.name)
        ));
        w.dedent();
        w.line(") {");
        w.indent();

        w.block("init {", "}", |w| {
            w.block(format!("if ({first_key} == null && {second_key} == null) {{"), "}", |w| {
                w.line(format!(
                    "throw IapDecodingException(\"{name} requires either `{}` or `{}`\")",
                    first.key, second.key
                ));
            });
            w.block(format!("if ({first_key} != null && {second_key} != null) {{"), "}", |w| {
                w.line(format!(
                    "throw IapDecodingException(\"{name} accepts only one of `{}` or `{}`\")",
                    first.key, second.key
                ));
            });
            for branch in &branches {
                let case = self.plugin.enum_value_case(&branch.discriminator.name);
                w.block(
                    format!(
                        "if ({} != null && {discriminator} != {enum_name}.{case}) {{",
                        self.ident(branch.key)
                    ),
                    "}",
                    |w| {
                        w.line(format!(
                            "throw IapDecodingException(\"{name}.type is `${{{discriminator}.rawValue}}` but `{}` requires `{}`\")",
                            branch.key, branch.discriminator.raw_value
                        ));
                    },
                );
            }
        });
        w.blank();

        w.block("fun toJson(): Map<String, Any?> = buildMap<String, Any?> {", "}", |w| {
            w.line(format!("put({discriminator_key}, {discriminator}.toJson())"));
            for branch in &branches {
                w.line(format!(
                    "{}?.let {{ put({}, it.toJson()) }}",
                    self.ident(branch.key),
                    quote(branch.key, true)
                ));
            }
        });
        w.blank();

        w.block("companion object {", "}", |w| {
            w.block(format!("fun fromJson(json: Map<String, Any?>): {name} {{"), "}", |w| {
                w.line(format!("val rawType = json[{discriminator_key}] as? String"));
                for branch in &branches {
                    let raw = quote(&branch.discriminator.raw_value, true);
                    let open = format!(
                        "json[{}].asIapMap()?.let {{ payload ->",
                        quote(branch.key, true)
                    );
                    w.block(open, "}", |w| {
                        w.block(format!("if (rawType != null && rawType != {raw}) {{"), "}", |w| {
                            w.line(format!(
                                "throw IapDecodingException(\"{name}.type is `$rawType` but `{}` requires `{}`\")",
                                branch.key, branch.discriminator.raw_value
                            ));
                        });
                        w.line(format!(
                            "return {name}({} = {}.fromJson(payload))",
                            self.ident(branch.key),
                            branch.payload_type
                        ));
                    });
                }
                w.line(format!(
                    "throw IapDecodingException(\"{name} requires either `{}` or `{}`\")",
                    first.key, second.key
                ));
            });
            w.blank();
            w.block(format!("fun fromJsonOrNull(json: Map<String, Any?>): {name}? {{"), "}", |w| {
                w.line(format!("val rawType = json[{discriminator_key}] as? String"));
                for branch in &branches {
                    let raw = quote(&branch.discriminator.raw_value, true);
                    let open = format!(
                        "json[{}].asIapMap()?.let {{ payload ->",
                        quote(branch.key, true)
                    );
                    w.block(open, "}", |w| {
                        w.line(format!("if (rawType != null && rawType != {raw}) return null"));
                        w.line(format!(
                            "val value = {}.fromJsonOrNull(payload) ?: return null",
                            branch.payload_type
                        ));
                        w.line(format!("return {name}({} = value)", self.ident(branch.key)));
                    });
                }
                w.line("return null");
            });
        });

        w.dedent();
        w.line("}");
        w.blank();
    }

    fn emit_union(&self, w: &mut CodeWriter, union: &IrUnion) {
        let name = &union.name;
        let head = if union.shared_interfaces.is_empty() {
            format!("sealed interface {name} {{")
        } else {
            format!("sealed interface {name} : {} {{", union.shared_interfaces.join(", "))
        };
        let shared = self.ctx.index.shared_interface_fields(name);
        let nested = self.ctx.index.nested_unions(name);

        let mut arms = Vec::new();
        let mut optional = Vec::new();
        for leaf in self.ctx.index.flatten_union(name) {
            let typename = leaf.typename.to_string();
            match leaf.via {
                None => {
                    arms.push((typename.clone(), format!("{}.fromJson(json)", leaf.typename)));
                    optional.push((typename, format!("{}.fromJsonOrNull(json)", leaf.typename)));
                }
                Some(via) => {
                    arms.push((typename.clone(), format!("{via}Item({via}.fromJson(json))")));
                    optional.push((
                        typename,
                        format!("{via}.fromJsonOrNull(json)?.let {{ {via}Item(it) }}"),
                    ));
                }
            }
        }

        kdoc(w, union.description.as_deref());
        w.block(head, "}", |w| {
            if union.shared_interfaces.is_empty() {
                w.line("fun toJson(): Map<String, Any?>");
            }
            for member in &nested {
                w.blank();
                let open = format!("data class {member}Item(val value: {member}) : {name} {{");
                w.block(open, "}", |w| {
                    for field in &shared {
                        w.line(format!(
                            "override val {ident}: {} get() = value.{ident}",
                            self.ty(&field.ty),
                            ident = self.ident(&field.name)
                        ));
                    }
                    w.line("override fun toJson(): Map<String, Any?> = value.toJson()");
                });
            }
            w.blank();
            w.block("companion object {", "}", |w| {
                Self::emit_dispatch(w, name, &arms, &optional);
            });
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

    fn emit_resolver(&self, w: &mut CodeWriter, operation: &IrOperation) {
        kdoc(w, operation.description.as_deref());
        w.block(format!("interface {}Resolver {{", operation.name), "}", |w| {
            for field in operation.generated_fields() {
                kdoc(w, field.description.as_deref());
                w.line(format!(
                    "suspend fun {}({}): {}",
                    self.ident(&field.name),
                    self.arguments(field),
                    self.return_type(field)
                ));
            }
        });
        w.blank();
    }

    fn emit_handlers(&self, w: &mut CodeWriter, operation: &IrOperation) {
        let op = &operation.name;
        let fields: Vec<_> = operation.generated_fields().collect();
        for field in &fields {
            w.line(format!(
                "typealias {op}{}Handler = suspend ({}) -> {}",
                to_pascal_case(&field.name),
                self.arguments(field),
                self.return_type(field)
            ));
        }
        w.blank();
        if fields.is_empty() {
            w.line(format!("class {op}Handlers"));
        } else {
            w.line(format!("data class {op}Handlers("));
            w.indent();
            for field in &fields {
                w.line(format!(
                    "val {}: {op}{}Handler? = null,",
                    self.ident(&field.name),
                    to_pascal_case(&field.name)
                ));
            }
            w.dedent();
            w.line(")");
        }
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

fn kdoc(w: &mut CodeWriter, text: Option<&str>) {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return;
    };
    if text.lines().count() == 1 {
        w.line(format!("/** {text} */"));
    } else {
        w.line("/**");
        w.doc(" *", Some(text));
        w.line(" */");
    }
}

fn local_name(ident: &str) -> String {
    match ident {
        "json" | "rawType" | "payload" => format!("{ident}Value"),
        _ => ident.to_string(),
    }
}

fn scalar_read(category: ScalarCategory, source: &str, flexible: bool) -> String {
    match (category, flexible) {
        (ScalarCategory::Int, false) => format!("{source}.asIapInt()"),
        (ScalarCategory::Int, true) => format!("{source}.asIapFlexibleInt()"),
        (ScalarCategory::Float, false) => format!("{source}.asIapDouble()"),
        (ScalarCategory::Float, true) => format!("{source}.asIapFlexibleDouble()"),
        (ScalarCategory::Boolean, _) => format!("{source} as? Boolean"),
        (ScalarCategory::Json, _) => format!("{source}.asIapMap()"),
        (ScalarCategory::String | ScalarCategory::Void, _) => format!("{source} as? String"),
    }
}

fn zero_value(category: ScalarCategory) -> &'static str {
    match category {
        ScalarCategory::String => "\"\"",
        ScalarCategory::Int => "0",
        ScalarCategory::Float => "0.0",
        ScalarCategory::Boolean => "false",
        ScalarCategory::Json => "emptyMap()",
        ScalarCategory::Void => "Unit",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iapgen_ir::IrEnumValue;

    fn plugin() -> KotlinPlugin {
        KotlinPlugin::new(&CodegenOptions::default())
    }

    #[test]
    fn test_map_type() {
        let p = plugin();
        assert_eq!(p.map_type(&IrType::list(IrType::scalar("Int"))), "List<Int>");
        assert_eq!(p.map_type(&IrType::scalar("Void").nullable()), "Unit?");
        assert_eq!(p.map_type(&IrType::scalar("JSON")), "Map<String, Any?>");
    }

    #[test]
    fn test_enum_case_and_escape() {
        let p = plugin();
        assert_eq!(p.enum_value_case("in-app"), "InApp");
        assert_eq!(p.field_name_case("object"), "`object`");
        assert_eq!(p.field_name_case("type"), "type");
    }

    #[test]
    fn test_kdoc() {
        let mut w = CodeWriter::new("    ");
        kdoc(&mut w, Some("One line"));
        kdoc(&mut w, Some("First\nSecond"));
        kdoc(&mut w, None);
        insta::assert_snapshot!(w.finish(), @r"
        /** One line */
        /**
         * First
         * Second
         */
        ");
    }

    #[test]
    fn test_enum_entries() {
        let schema = IrSchema {
            enums: vec![IrEnum {
                name: "ProductType".into(),
                description: None,
                values: vec![
                    IrEnumValue {
                        name: "InApp".into(),
                        raw_value: "in-app".into(),
                        description: None,
                    },
                    IrEnumValue {
                        name: "Subs".into(),
                        raw_value: "subs".into(),
                        description: None,
                    },
                ],
                is_error_code: false,
            }],
            ..IrSchema::default()
        };
        let output = plugin().generate(&schema).unwrap();
        assert!(output.contains(
            "enum class ProductType(val rawValue: String) {\n    InApp(\"in-app\"),\n    Subs(\"subs\");\n"
        ));
        assert!(output.contains("package dev.iapgen.generated\n"));
    }
}
