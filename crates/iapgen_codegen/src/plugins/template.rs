//! Data-driven target.
//!
//! A [`TemplateProfile`] describes a language as data: scalar mappings,
//! reserved words, naming conventions and ordered rule lists. Each rule pairs
//! a [`Condition`] with a template using `{{placeholder}}` interpolation; the
//! first rule whose condition holds renders the construct.
//!
//! A placeholder that is the only thing on its line inserts a multi-line value
//! at that line's indentation and removes the line when the value is empty.
//! A line holding a single placeholder next to other text is repeated once per
//! line of a multi-line value, which is how doc comments get their prefix.
//!
//! Placeholders render on first use. A template that never mentions
//! `{{values}}` needs no `enumValue` rules, and so on for every list.

use crate::context::GenerationContext;
use crate::error::{CodegenError, CodegenResult};
use crate::plugin::Plugin;
use crate::plugins::{error_code_labels, quote, request_branches};
use crate::writer::CodeWriter;
use crate::CodegenOptions;
use iapgen_core::keywords::TYPESCRIPT_KEYWORDS;
use iapgen_core::scalars::{ScalarCategory, GRAPHQL_TO_TYPESCRIPT, VOID_SCALAR};
use iapgen_core::tables::{PURCHASE_REQUEST_BRANCHES, PURCHASE_REQUEST_DISCRIMINATOR};
use iapgen_core::{
    to_constant_case, to_kebab_case, to_lower_camel_case, to_pascal_case, to_snake_case,
    KeywordEscape,
};
use iapgen_ir::{
    CustomInputKind, IrArgument, IrEnum, IrEnumValue, IrField, IrInput, IrInterface, IrObject,
    IrOperation, IrOperationField, IrSchema, IrType, IrUnion, ResultUnionEntry, ReturnShape,
    TypeKind,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;

/// Identifier case convention applied before keyword escaping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaseStyle {
    #[default]
    Preserve,
    Pascal,
    Camel,
    Snake,
    Constant,
    Kebab,
}

impl CaseStyle {
    #[must_use]
    pub fn apply(self, s: &str) -> String {
        match self {
            Self::Preserve => s.to_string(),
            Self::Pascal => to_pascal_case(s),
            Self::Camel => to_lower_camel_case(s),
            Self::Snake => to_snake_case(s),
            Self::Constant => to_constant_case(s),
            Self::Kebab => to_kebab_case(s),
        }
    }
}

/// Kind of a type reference, as tested by [`Condition::Kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeCategory {
    Scalar,
    Enum,
    Object,
    Input,
    Interface,
    Union,
    List,
}

impl TypeCategory {
    fn of(kind: &TypeKind) -> Self {
        match kind {
            TypeKind::Scalar { .. } => Self::Scalar,
            TypeKind::Enum { .. } => Self::Enum,
            TypeKind::Object { .. } => Self::Object,
            TypeKind::Input { .. } => Self::Input,
            TypeKind::Interface { .. } => Self::Interface,
            TypeKind::Union { .. } => Self::Union,
            TypeKind::List { .. } => Self::List,
        }
    }
}

/// Guard of a [`Rule`].
///
/// Type conditions (`nullable`, `nonNull`, `list`, `kind`, `numeric`) only
/// hold where the construct has a type: type references, value expressions,
/// fields, arguments, result entries and operation fields (their return
/// type). `customInput` and `custom` hold for a custom input and for the
/// fields and value expressions rendered inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    #[default]
    Always,
    Nullable,
    NonNull,
    List,
    Kind(TypeCategory),
    /// An `Int` or `Float` scalar.
    Numeric,
    /// The type, or an operation's return, is `Void`.
    Void,
    IsErrorCode,
    HasDescription,
    HasInterfaces,
    ResultUnion,
    CustomInput,
    Custom(CustomInputKind),
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    fn matches(&self, facts: &Facts<'_>) -> bool {
        match self {
            Self::Always => true,
            Self::Nullable => facts.ty.is_some() && facts.nullable,
            Self::NonNull => facts.ty.is_some() && !facts.nullable,
            Self::List => facts
                .ty
                .is_some_and(|ty| matches!(ty.kind, TypeKind::List { .. })),
            Self::Kind(category) => facts
                .ty
                .is_some_and(|ty| TypeCategory::of(&ty.kind) == *category),
            Self::Numeric => facts.ty.is_some_and(|ty| match &ty.kind {
                TypeKind::Scalar { name } => ScalarCategory::of(name).is_numeric(),
                _ => false,
            }),
            Self::Void => facts.void || facts.ty.is_some_and(IrType::is_void),
            Self::IsErrorCode => facts.is_error_code,
            Self::HasDescription => facts.has_description,
            Self::HasInterfaces => facts.has_interfaces,
            Self::ResultUnion => facts.result_union,
            Self::CustomInput => facts.custom.is_some(),
            Self::Custom(kind) => facts.custom == Some(*kind),
            Self::All(conditions) => conditions.iter().all(|c| c.matches(facts)),
            Self::Any(conditions) => conditions.iter().any(|c| c.matches(facts)),
            Self::Not(condition) => !condition.matches(facts),
        }
    }
}

/// A guarded template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub when: Condition,
    pub template: String,
}

impl Rule {
    #[must_use]
    pub fn always(template: impl Into<String>) -> Self {
        Self {
            when: Condition::Always,
            template: template.into(),
        }
    }

    #[must_use]
    pub fn when(when: Condition, template: impl Into<String>) -> Self {
        Self {
            when,
            template: template.into(),
        }
    }
}

fn line_break() -> String {
    "\n".to_string()
}

fn wire_source() -> String {
    "{{wire}}".to_string()
}

/// Rule lists per construct.
///
/// An empty list for a declaration (`enumDecl`, `objectDecl`, ...) skips that
/// section. Lists for the parts declarations are built from (`typeRef`,
/// `field`, `enumValue`, ...) must hold a matching rule once used.
///
/// `decode` and `encode` render value expressions: `{{value}}` is the source
/// expression, `{{element}}` renders a list element read from `item`, and
/// `{{inner}}` renders the same value as non-null. Fields and result entries
/// read their value through `decodeSource` / `encodeSource`, which see
/// `{{wire}}` and `{{name}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Templates {
    /// `{{banner}}`
    #[serde(default)]
    pub header: Vec<Rule>,
    /// `{{text}}`; renders the `{{doc}}` placeholder everywhere else.
    #[serde(default)]
    pub doc: Vec<Rule>,
    /// `{{name}}` (mapped scalar or declared name), `{{element}}`, `{{inner}}`
    #[serde(default)]
    pub type_ref: Vec<Rule>,
    /// `{{value}}`, `{{name}}`, `{{element}}`, `{{inner}}`
    #[serde(default)]
    pub decode: Vec<Rule>,
    /// `{{value}}`, `{{name}}`, `{{element}}`, `{{inner}}`
    #[serde(default)]
    pub encode: Vec<Rule>,
    #[serde(default = "wire_source")]
    pub decode_source: String,
    #[serde(default = "wire_source")]
    pub encode_source: String,
    /// `{{name}}`, `{{doc}}`, `{{values}}`, `{{labels}}`
    #[serde(default)]
    pub enum_decl: Vec<Rule>,
    /// `{{name}}`, `{{raw}}`, `{{raw_literal}}`, `{{enum}}`, `{{doc}}`
    #[serde(default)]
    pub enum_value: Vec<Rule>,
    /// One wire string accepted for a value: `{{label}}`, `{{label_literal}}`,
    /// `{{name}}`, `{{raw}}`, `{{enum}}`. Error-code enums list their aliases.
    #[serde(default)]
    pub enum_label: Vec<Rule>,
    /// `{{name}}`, `{{doc}}`, `{{interfaces}}`, `{{fields}}`
    #[serde(default)]
    pub interface_decl: Vec<Rule>,
    /// `{{name}}`, `{{doc}}`, `{{interfaces}}`, `{{unions}}`, `{{fields}}`,
    /// `{{decoders}}`, `{{encoders}}`, `{{entries}}`, `{{entry_decoders}}`,
    /// `{{entry_encoders}}`, `{{keys}}`
    #[serde(default)]
    pub object_decl: Vec<Rule>,
    /// `{{name}}`, `{{doc}}`, `{{fields}}`, `{{decoders}}`, `{{encoders}}`,
    /// `{{custom_kind}}`, `{{branches}}`, `{{first}}`, `{{second}}`
    #[serde(default)]
    pub input_decl: Vec<Rule>,
    /// `{{name}}`, `{{wire}}`, `{{type}}`, `{{inner}}`, `{{owner}}`, `{{doc}}`,
    /// `{{decode}}`, `{{encode}}`; the same set for the two lists below.
    #[serde(default)]
    pub field: Vec<Rule>,
    #[serde(default)]
    pub field_decode: Vec<Rule>,
    #[serde(default)]
    pub field_encode: Vec<Rule>,
    /// `{{key}}`, `{{type}}`, `{{owner}}`, `{{decode}}`, `{{encode}}`; the
    /// same set for `resultDecode` and `resultEncode`.
    #[serde(default)]
    pub result_entry: Vec<Rule>,
    #[serde(default = "line_break")]
    pub result_entry_separator: String,
    #[serde(default)]
    pub result_decode: Vec<Rule>,
    #[serde(default)]
    pub result_encode: Vec<Rule>,
    /// One purchase-request branch: `{{owner}}`, `{{key}}`, `{{payload}}`,
    /// `{{discriminator}}`, `{{enum}}`, `{{value}}`, `{{raw}}`, `{{raw_literal}}`
    #[serde(default)]
    pub request_branch: Vec<Rule>,
    /// `{{name}}`, `{{doc}}`, `{{members}}`, `{{leaves}}`, `{{interfaces}}`,
    /// `{{decode_cases}}`, `{{encode_cases}}`
    #[serde(default)]
    pub union_decl: Vec<Rule>,
    /// `{{name}}`, `{{union}}`
    #[serde(default)]
    pub union_member: Vec<Rule>,
    #[serde(default = "line_break")]
    pub union_member_separator: String,
    /// One flattened leaf: `{{typename}}`, `{{via}}` (nested union or empty),
    /// `{{union}}`; the same set for `unionEncodeCase`.
    #[serde(default)]
    pub union_decode_case: Vec<Rule>,
    #[serde(default)]
    pub union_encode_case: Vec<Rule>,
    /// `{{name}}`, `{{doc}}`, `{{fields}}`
    #[serde(default)]
    pub operation_decl: Vec<Rule>,
    /// `{{name}}`, `{{wire}}`, `{{operation}}`, `{{args}}`, `{{return}}`, `{{doc}}`
    #[serde(default)]
    pub operation_field: Vec<Rule>,
    /// `{{name}}`, `{{wire}}`, `{{type}}`, `{{doc}}`
    #[serde(default)]
    pub argument: Vec<Rule>,
    #[serde(default = "argument_separator")]
    pub argument_separator: String,
    /// `{{alias}}`, `{{operation}}`, `{{field}}`, `{{args}}`, `{{return}}`
    #[serde(default)]
    pub handler_alias: Vec<Rule>,
    /// `{{name}}`, `{{operation}}`, `{{entries}}`
    #[serde(default)]
    pub handlers_decl: Vec<Rule>,
    /// `{{field}}`, `{{wire}}`, `{{alias}}`, `{{operation}}`
    #[serde(default)]
    pub handler_entry: Vec<Rule>,
}

fn argument_separator() -> String {
    ", ".to_string()
}

fn default_escape() -> KeywordEscape {
    KeywordEscape::UnderscoreSuffix
}

/// A language described as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateProfile {
    pub name: String,
    pub file_extension: String,
    #[serde(default)]
    pub scalars: IndexMap<String, String>,
    pub default_scalar: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_escape")]
    pub keyword_escape: KeywordEscape,
    #[serde(default)]
    pub enum_value_case: CaseStyle,
    #[serde(default)]
    pub field_name_case: CaseStyle,
    pub templates: Templates,
}

fn block(lines: &[&str]) -> String {
    lines.join("\n")
}

/// `decode<Name>` / `encode<Name>` over the field lists of an object or input.
fn record_codec(typename: bool) -> String {
    let tag = if typename { "    __typename: '{{name}}'," } else { "" };
    let mut lines = vec![
        "export function decode{{name}}(json: Record<string, unknown>): {{name}} {",
        "  return {",
    ];
    if typename {
        lines.push(tag);
    }
    lines.extend([
        "    {{decoders}}",
        "  };",
        "}",
        "",
        "export function encode{{name}}(value: {{name}}): Record<string, unknown> {",
        "  return {",
    ]);
    if typename {
        lines.push(tag);
    }
    lines.extend(["    {{encoders}}", "  };", "}"]);
    block(&lines)
}

impl TemplateProfile {
    /// Parses a profile from its JSON form.
    pub fn from_json(text: &str) -> CodegenResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// TypeScript declarations describing the wire shape, `decode*`/`encode*`
    /// functions for every enum, object, input and union, plus resolver and
    /// handler signatures.
    #[must_use]
    pub fn typescript() -> Self {
        let typed = |template: &str| {
            vec![
                Rule::when(
                    Condition::Nullable,
                    template.replace("{{sep}}", "?: "),
                ),
                Rule::always(template.replace("{{sep}}", ": ")),
            ]
        };
        let records = Condition::Any(vec![
            Condition::Kind(TypeCategory::Object),
            Condition::Kind(TypeCategory::Input),
            Condition::Kind(TypeCategory::Union),
        ]);
        let enum_decl = block(&[
            "{{doc}}",
            "export enum {{name}} {",
            "  {{values}}",
            "}",
            "",
            "const {{name}}Labels = new Map<string, {{name}}>([",
            "  {{labels}}",
            "]);",
            "",
            "export function decode{{name}}(raw: unknown): {{name}} {",
            "  const text = String(raw);",
            "  const exact = {{name}}Labels.get(text);",
            "  if (exact !== undefined) {",
            "    return exact;",
            "  }",
            "  const folded = text.toLowerCase();",
            "  for (const value of Object.values({{name}})) {",
            "    if (value.toLowerCase() === folded) {",
            "      return value;",
            "    }",
            "  }",
            "  throw new Error('Invalid {{name}} value: ' + text);",
            "}",
            "",
            "export function encode{{name}}(value: {{name}}): string {",
            "  return value;",
            "}",
        ]);
        let object_codec = record_codec(true);
        let object_with = |head: &str| {
            block(&[
                "{{doc}}",
                head,
                "  __typename?: '{{name}}';",
                "  {{fields}}",
                "}",
                "",
                object_codec.as_str(),
            ])
        };
        let result_union = block(&[
            "{{doc}}",
            "export type {{name}} = {{entries}};",
            "",
            "export function decode{{name}}(json: Record<string, unknown>): {{name}} {",
            "  {{entry_decoders}}",
            "  throw new Error('{{name}} has none of its result fields set (expected one of {{keys}})');",
            "}",
            "",
            "export function encode{{name}}(value: {{name}}): Record<string, unknown> {",
            "  {{entry_encoders}}",
            "  throw new Error('{{name}} has none of its result fields set (expected one of {{keys}})');",
            "}",
        ]);
        let purchase_request = block(&[
            "{{doc}}",
            "export interface {{name}} {",
            "  {{fields}}",
            "}",
            "",
            "export function decode{{name}}(json: Record<string, unknown>): {{name}} {",
            "  {{branches}}",
            "  throw new Error('{{name}} requires either `{{first}}` or `{{second}}`');",
            "}",
            "",
            "export function encode{{name}}(value: {{name}}): Record<string, unknown> {",
            "  return {",
            "    {{encoders}}",
            "  };",
            "}",
        ]);
        let input_codec = record_codec(false);
        let input = block(&[
            "{{doc}}",
            "export interface {{name}} {",
            "  {{fields}}",
            "}",
            "",
            input_codec.as_str(),
        ]);
        let union = block(&[
            "{{doc}}",
            "export type {{name}} = {{members}};",
            "",
            "export function decode{{name}}(json: Record<string, unknown>): {{name}} {",
            "  switch (json.__typename) {",
            "    {{decode_cases}}",
            "    default:",
            "      throw new Error('Unknown __typename for {{name}}: ' + String(json.__typename));",
            "  }",
            "}",
            "",
            "export function encode{{name}}(value: {{name}}): Record<string, unknown> {",
            "  switch (value.__typename) {",
            "    {{encode_cases}}",
            "    default:",
            "      throw new Error('Unknown __typename for {{name}}: ' + String(value.__typename));",
            "  }",
            "}",
        ]);
        let request_branch = block(&[
            "if (json.{{key}} != null && typeof json.{{key}} === 'object') {",
            "  if (json.{{discriminator}} != null && json.{{discriminator}} !== {{raw_literal}}) {",
            "    throw new Error('{{owner}}.{{discriminator}} is `' + String(json.{{discriminator}}) + '` but `{{key}}` requires `{{raw}}`');",
            "  }",
            "  return { {{discriminator}}: {{enum}}.{{value}}, {{key}}: decode{{payload}}(json.{{key}} as Record<string, unknown>) };",
            "}",
        ]);

        Self {
            name: "typescript".to_string(),
            file_extension: "ts".to_string(),
            scalars: GRAPHQL_TO_TYPESCRIPT
                .iter()
                .map(|(graphql, ts)| ((*graphql).to_string(), (*ts).to_string()))
                .collect(),
            default_scalar: "string".to_string(),
            keywords: TYPESCRIPT_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
            keyword_escape: KeywordEscape::UnderscoreSuffix,
            enum_value_case: CaseStyle::Pascal,
            field_name_case: CaseStyle::Preserve,
            templates: Templates {
                header: vec![Rule::always("// {{banner}}")],
                doc: vec![Rule::always("/**\n * {{text}}\n */")],
                type_ref: vec![
                    Rule::when(Condition::Nullable, "{{inner}} | null"),
                    Rule::when(Condition::List, "Array<{{element}}>"),
                    Rule::always("{{name}}"),
                ],
                decode: vec![
                    Rule::when(Condition::Nullable, "{{value}} == null ? null : {{inner}}"),
                    Rule::when(
                        Condition::List,
                        "(({{value}} ?? []) as unknown[]).map((item) => {{element}})",
                    ),
                    Rule::when(
                        Condition::All(vec![
                            Condition::Numeric,
                            Condition::Custom(CustomInputKind::DiscountOffer),
                        ]),
                        "Number({{value}})",
                    ),
                    Rule::when(Condition::Kind(TypeCategory::Enum), "decode{{name}}({{value}})"),
                    Rule::when(
                        records.clone(),
                        "decode{{name}}({{value}} as Record<string, unknown>)",
                    ),
                    Rule::always("{{value}} as {{name}}"),
                ],
                encode: vec![
                    Rule::when(Condition::Nullable, "{{value}} == null ? undefined : {{inner}}"),
                    Rule::when(Condition::List, "{{value}}.map((item) => {{element}})"),
                    Rule::when(
                        Condition::Any(vec![Condition::Kind(TypeCategory::Enum), records]),
                        "encode{{name}}({{value}})",
                    ),
                    Rule::always("{{value}}"),
                ],
                decode_source: "json.{{wire}}".to_string(),
                encode_source: "value.{{wire}}".to_string(),
                enum_decl: vec![Rule::always(enum_decl)],
                enum_value: vec![Rule::always("{{doc}}\n{{name}} = {{raw_literal}},")],
                enum_label: vec![Rule::always("[{{label_literal}}, {{enum}}.{{name}}],")],
                interface_decl: vec![
                    Rule::when(
                        Condition::HasInterfaces,
                        "{{doc}}\nexport interface {{name}} extends {{interfaces}} {\n  {{fields}}\n}",
                    ),
                    Rule::always("{{doc}}\nexport interface {{name}} {\n  {{fields}}\n}"),
                ],
                object_decl: vec![
                    Rule::when(Condition::ResultUnion, result_union),
                    Rule::when(
                        Condition::HasInterfaces,
                        object_with("export interface {{name}} extends {{interfaces}} {"),
                    ),
                    Rule::always(object_with("export interface {{name}} {")),
                ],
                input_decl: vec![
                    Rule::when(
                        Condition::Custom(CustomInputKind::PurchaseRequest),
                        purchase_request,
                    ),
                    Rule::always(input),
                ],
                field: typed("{{doc}}\n{{wire}}{{sep}}{{type}};"),
                field_decode: vec![Rule::always("{{wire}}: {{decode}},")],
                field_encode: vec![Rule::always("{{wire}}: {{encode}},")],
                result_entry: vec![Rule::always("{ {{key}}: {{type}} }")],
                result_entry_separator: " | ".to_string(),
                result_decode: vec![Rule::always(
                    "if (json.{{key}} != null) {\n  return { {{key}}: {{decode}} };\n}",
                )],
                result_encode: vec![Rule::always(
                    "if ('{{key}}' in value) {\n  return { {{key}}: {{encode}} };\n}",
                )],
                request_branch: vec![Rule::always(request_branch)],
                union_decl: vec![Rule::always(union)],
                union_member: vec![Rule::always("{{name}}")],
                union_member_separator: " | ".to_string(),
                union_decode_case: vec![Rule::always(
                    "case '{{typename}}':\n  return decode{{typename}}(json);",
                )],
                union_encode_case: vec![Rule::always(
                    "case '{{typename}}':\n  return encode{{typename}}(value);",
                )],
                operation_decl: vec![Rule::always(
                    "{{doc}}\nexport interface {{name}}Resolver {\n  {{fields}}\n}",
                )],
                operation_field: vec![Rule::always(
                    "{{doc}}\n{{name}}({{args}}): Promise<{{return}}>;",
                )],
                argument: vec![Rule::always("{{name}}: {{type}}")],
                argument_separator: ", ".to_string(),
                handler_alias: vec![Rule::always(
                    "export type {{alias}} = ({{args}}) => Promise<{{return}}>;",
                )],
                handlers_decl: vec![Rule::always(
                    "export interface {{name}} {\n  {{entries}}\n}",
                )],
                handler_entry: vec![Rule::always("{{field}}?: {{alias}};")],
            },
        }
    }
}

/// Renders a schema through a [`TemplateProfile`].
pub struct TemplatePlugin {
    profile: TemplateProfile,
    header: String,
}

impl TemplatePlugin {
    #[must_use]
    pub fn new(profile: TemplateProfile, options: &CodegenOptions) -> Self {
        Self {
            profile,
            header: options.header.clone(),
        }
    }

    /// The built-in TypeScript profile.
    #[must_use]
    pub fn typescript(options: &CodegenOptions) -> Self {
        Self::new(TemplateProfile::typescript(), options)
    }

    /// Loads a custom profile from JSON.
    pub fn from_json(text: &str, options: &CodegenOptions) -> CodegenResult<Self> {
        Ok(Self::new(TemplateProfile::from_json(text)?, options))
    }

    #[must_use]
    pub fn profile(&self) -> &TemplateProfile {
        &self.profile
    }

    fn escape(&self, ident: String) -> String {
        if self.profile.keywords.iter().any(|k| *k == ident) {
            self.profile.keyword_escape.apply(&ident)
        } else {
            ident
        }
    }

    fn pick(
        &self,
        rules: &[Rule],
        facts: &Facts<'_>,
        vars: &Vars<'_>,
        context: &str,
    ) -> CodegenResult<Option<String>> {
        if rules.is_empty() {
            return Ok(None);
        }
        let rule = rules
            .iter()
            .find(|rule| rule.when.matches(facts))
            .ok_or_else(|| self.no_rule(context))?;
        interpolate(&rule.template, vars, context).map(Some)
    }

    fn require(
        &self,
        rules: &[Rule],
        facts: &Facts<'_>,
        vars: &Vars<'_>,
        context: &str,
    ) -> CodegenResult<String> {
        self.pick(rules, facts, vars, context)?
            .ok_or_else(|| self.no_rule(context))
    }

    fn no_rule(&self, context: &str) -> CodegenError {
        CodegenError::NoMatchingRule {
            profile: self.profile.name.clone(),
            context: context.to_string(),
        }
    }

    /// Mapped scalar or declared name; empty for lists.
    fn type_name(&self, ty: &IrType) -> String {
        match &ty.kind {
            TypeKind::List { .. } => String::new(),
            TypeKind::Scalar { name } => self.map_scalar(name),
            TypeKind::Enum { name }
            | TypeKind::Object { name }
            | TypeKind::Input { name }
            | TypeKind::Interface { name }
            | TypeKind::Union { name } => name.clone(),
        }
    }

    /// Renders a type reference, treating it as non-null when `nullable` is false.
    fn type_ref(&self, ty: &IrType, nullable: bool) -> CodegenResult<String> {
        let context = match ty.innermost().name() {
            Some(innermost) => format!("type reference to `{innermost}`"),
            None => "a type reference".to_string(),
        };
        let vars = Vars::default()
            .set("name", self.type_name(ty))
            .defer("element", || match ty.element() {
                Some(element) => self.type_ref(element, element.nullable),
                None => Ok(String::new()),
            })
            .defer("inner", || {
                if nullable {
                    self.type_ref(ty, false)
                } else {
                    Ok(String::new())
                }
            });
        self.require(
            &self.profile.templates.type_ref,
            &Facts::typed(ty, nullable),
            &vars,
            &context,
        )
    }
}

impl Plugin for TemplatePlugin {
    fn name(&self) -> &str {
        &self.profile.name
    }

    fn file_extension(&self) -> &str {
        &self.profile.file_extension
    }

    fn map_scalar(&self, name: &str) -> String {
        self.profile
            .scalars
            .get(name)
            .unwrap_or(&self.profile.default_scalar)
            .clone()
    }

    /// Falls back to the bare name when the profile cannot render `ty`;
    /// `generate` reports the same failure as an error.
    fn map_type(&self, ty: &IrType) -> String {
        self.type_ref(ty, ty.nullable).unwrap_or_else(|err| {
            tracing::warn!(profile = %self.profile.name, "{err}");
            ty.innermost().name().unwrap_or_default().to_string()
        })
    }

    fn escape_keyword(&self, ident: &str) -> String {
        self.escape(ident.to_string())
    }

    fn enum_value_case(&self, name: &str) -> String {
        self.escape(self.profile.enum_value_case.apply(name))
    }

    fn field_name_case(&self, name: &str) -> String {
        self.escape(self.profile.field_name_case.apply(name))
    }

    fn generate(&self, schema: &IrSchema) -> CodegenResult<String> {
        let ctx = GenerationContext::new(schema)?;
        let r = Renderer { plugin: self, ctx: &ctx };
        let mut w = CodeWriter::new("");
        let profile = self.profile.name.as_str();

        emit(&mut w, r.header()?);
        tracing::debug!(profile, count = schema.enums.len(), "template: enums");
        for e in &schema.enums {
            emit(&mut w, r.enum_decl(e)?);
        }
        tracing::debug!(profile, count = schema.interfaces.len(), "template: interfaces");
        for interface in &schema.interfaces {
            emit(&mut w, r.interface_decl(interface)?);
        }
        tracing::debug!(profile, count = schema.objects.len(), "template: objects");
        for object in &schema.objects {
            emit(&mut w, r.object_decl(object)?);
        }
        tracing::debug!(profile, count = schema.inputs.len(), "template: inputs");
        for input in &schema.inputs {
            emit(&mut w, r.input_decl(input)?);
        }
        tracing::debug!(profile, count = schema.unions.len(), "template: unions");
        for union in &schema.unions {
            emit(&mut w, r.union_decl(union)?);
        }
        tracing::debug!(profile, count = schema.operations.len(), "template: operations");
        for operation in &schema.operations {
            emit(&mut w, r.operation_decl(operation)?);
        }
        for operation in &schema.operations {
            for field in operation.generated_fields() {
                emit(&mut w, r.handler_alias(operation, field)?);
            }
            emit(&mut w, r.handlers_decl(operation)?);
        }

        Ok(w.finish())
    }
}

fn emit(w: &mut CodeWriter, text: Option<String>) {
    if let Some(text) = text {
        w.lines(&text);
        w.blank();
    }
}

/// What conditions can observe about the construct being rendered.
#[derive(Debug, Clone, Copy, Default)]
struct Facts<'t> {
    ty: Option<&'t IrType>,
    nullable: bool,
    void: bool,
    is_error_code: bool,
    has_description: bool,
    has_interfaces: bool,
    result_union: bool,
    custom: Option<CustomInputKind>,
}

impl<'t> Facts<'t> {
    fn typed(ty: &'t IrType, nullable: bool) -> Self {
        Self {
            ty: Some(ty),
            nullable,
            ..Self::default()
        }
    }

    fn described(description: Option<&str>) -> Self {
        Self {
            has_description: description.is_some(),
            ..Self::default()
        }
    }
}

type Render<'v> = Box<dyn Fn() -> CodegenResult<String> + 'v>;

enum Value<'v> {
    Ready(String),
    Deferred(Render<'v>, OnceCell<String>),
}

/// Placeholder values for one rendering. Deferred values render on first use.
#[derive(Default)]
struct Vars<'v>(Vec<(&'static str, Value<'v>)>);

impl<'v> Vars<'v> {
    fn set(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.0.push((name, Value::Ready(value.into())));
        self
    }

    fn defer(
        mut self,
        name: &'static str,
        render: impl Fn() -> CodegenResult<String> + 'v,
    ) -> Self {
        self.0
            .push((name, Value::Deferred(Box::new(render), OnceCell::new())));
        self
    }

    fn get(&self, name: &str, context: &str) -> CodegenResult<&str> {
        let Some((_, value)) = self.0.iter().find(|(key, _)| *key == name) else {
            return Err(CodegenError::UnknownPlaceholder {
                context: context.to_string(),
                placeholder: name.to_string(),
                available: self
                    .0
                    .iter()
                    .map(|(key, _)| *key)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        };
        match value {
            Value::Ready(text) => Ok(text.as_str()),
            Value::Deferred(render, cell) => {
                if let Some(text) = cell.get() {
                    return Ok(text.as_str());
                }
                let text = render()?;
                Ok(cell.get_or_init(|| text).as_str())
            }
        }
    }
}

/// A `{{name}}` occurrence: byte range in the line plus the trimmed name.
struct Slot<'l> {
    start: usize,
    end: usize,
    name: &'l str,
}

fn is_placeholder_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Finds placeholders left to right. `{{` not followed by a valid name and
/// `}}` is literal text.
fn find_slots(line: &str) -> Vec<Slot<'_>> {
    let mut slots = Vec::new();
    let mut from = 0;
    while let Some(offset) = line[from..].find("{{") {
        let start = from + offset;
        let body = &line[start + 2..];
        match body.find("}}") {
            Some(close) if is_placeholder_name(body[..close].trim()) => {
                let end = start + 2 + close + 2;
                slots.push(Slot {
                    start,
                    end,
                    name: body[..close].trim(),
                });
                from = end;
            }
            Some(_) => from = start + 1,
            None => break,
        }
    }
    slots
}

fn interpolate(template: &str, vars: &Vars<'_>, context: &str) -> CodegenResult<String> {
    let mut out: Vec<String> = Vec::new();
    for line in template.lines() {
        let slots = find_slots(line);
        if let [slot] = slots.as_slice() {
            let value = vars.get(slot.name, context)?;
            let prefix = &line[..slot.start];
            let suffix = &line[slot.end..];
            let alone = prefix.trim().is_empty() && suffix.trim().is_empty();
            if alone && value.is_empty() {
                continue;
            }
            if value.contains('\n') {
                for part in value.lines() {
                    if alone && part.is_empty() {
                        out.push(String::new());
                    } else {
                        out.push(format!("{prefix}{part}{suffix}").trim_end().to_string());
                    }
                }
                continue;
            }
        }
        let mut rendered = String::with_capacity(line.len());
        let mut cursor = 0;
        for slot in &slots {
            rendered.push_str(&line[cursor..slot.start]);
            rendered.push_str(vars.get(slot.name, context)?);
            cursor = slot.end;
        }
        rendered.push_str(&line[cursor..]);
        out.push(rendered.trim_end().to_string());
    }
    Ok(out.join("\n"))
}

/// Which value-expression list to render.
#[derive(Debug, Clone, Copy)]
enum Direction {
    Decode,
    Encode,
}

struct Renderer<'p, 'a> {
    plugin: &'p TemplatePlugin,
    ctx: &'p GenerationContext<'a>,
}

impl Renderer<'_, '_> {
    fn templates(&self) -> &Templates {
        &self.plugin.profile.templates
    }

    fn doc(&self, description: Option<&str>, context: &str) -> CodegenResult<String> {
        let Some(text) = description else {
            return Ok(String::new());
        };
        let vars = Vars::default().set("text", text.trim());
        Ok(self
            .plugin
            .pick(&self.templates().doc, &Facts::default(), &vars, context)?
            .unwrap_or_default())
    }

    fn join<T>(
        items: impl IntoIterator<Item = T>,
        separator: &str,
        render: impl Fn(T) -> CodegenResult<String>,
    ) -> CodegenResult<String> {
        Ok(items
            .into_iter()
            .map(render)
            .collect::<CodegenResult<Vec<_>>>()?
            .join(separator))
    }

    fn header(&self) -> CodegenResult<Option<String>> {
        let vars = Vars::default().set("banner", self.plugin.header.as_str());
        self.plugin
            .pick(&self.templates().header, &Facts::default(), &vars, "the file header")
    }

    /// Renders a decode or encode expression for `value` of type `ty`.
    fn value_expr(
        &self,
        direction: Direction,
        ty: &IrType,
        nullable: bool,
        value: &str,
        custom: Option<CustomInputKind>,
    ) -> CodegenResult<String> {
        let (rules, verb) = match direction {
            Direction::Decode => (&self.templates().decode, "decoding"),
            Direction::Encode => (&self.templates().encode, "encoding"),
        };
        let context = format!("{verb} `{value}`");
        let vars = Vars::default()
            .set("value", value)
            .set("name", self.plugin.type_name(ty))
            .defer("element", || match ty.element() {
                Some(element) => {
                    self.value_expr(direction, element, element.nullable, "item", custom)
                }
                None => Ok(String::new()),
            })
            .defer("inner", || {
                if nullable {
                    self.value_expr(direction, ty, false, value, custom)
                } else {
                    Ok(String::new())
                }
            });
        let facts = Facts {
            custom,
            ..Facts::typed(ty, nullable)
        };
        self.plugin.require(rules, &facts, &vars, &context)
    }

    /// The expression a field or result entry is read from (or written to).
    fn source(&self, direction: Direction, wire: &str) -> CodegenResult<String> {
        let template = match direction {
            Direction::Decode => &self.templates().decode_source,
            Direction::Encode => &self.templates().encode_source,
        };
        let vars = Vars::default()
            .set("wire", wire)
            .set("name", self.plugin.field_name_case(wire));
        interpolate(template, &vars, "a value source")
    }

    fn enum_decl(&self, e: &IrEnum) -> CodegenResult<Option<String>> {
        if self.templates().enum_decl.is_empty() {
            return Ok(None);
        }
        let context = format!("enum `{}`", e.name);
        let vars = Vars::default()
            .set("name", e.name.as_str())
            .defer("doc", || self.doc(e.description.as_deref(), &context))
            .defer("values", || {
                Self::join(&e.values, "\n", |value| self.enum_value(e, value))
            })
            .defer("labels", || self.enum_labels(e));
        let facts = Facts {
            is_error_code: e.is_error_code,
            ..Facts::described(e.description.as_deref())
        };
        self.plugin
            .pick(&self.templates().enum_decl, &facts, &vars, &context)
    }

    fn enum_value(&self, e: &IrEnum, value: &IrEnumValue) -> CodegenResult<String> {
        let context = format!("enum value `{}.{}`", e.name, value.name);
        let vars = Vars::default()
            .set("name", self.plugin.enum_value_case(&value.name))
            .set("raw", value.raw_value.as_str())
            .set("raw_literal", quote(&value.raw_value, false))
            .set("enum", e.name.as_str())
            .defer("doc", || self.doc(value.description.as_deref(), &context));
        let facts = Facts {
            is_error_code: e.is_error_code,
            ..Facts::described(value.description.as_deref())
        };
        self.plugin
            .require(&self.templates().enum_value, &facts, &vars, &context)
    }

    /// One line per accepted wire string; aliases only for error codes.
    fn enum_labels(&self, e: &IrEnum) -> CodegenResult<String> {
        let labels: Vec<(&IrEnumValue, Vec<String>)> = if e.is_error_code {
            error_code_labels(e)
        } else {
            e.values
                .iter()
                .map(|value| (value, vec![value.raw_value.clone()]))
                .collect()
        };
        let pairs = labels
            .iter()
            .flat_map(|(value, labels)| labels.iter().map(move |label| (*value, label)));
        Self::join(pairs, "\n", |(value, label)| {
            let context = format!("label `{label}` of `{}.{}`", e.name, value.name);
            let vars = Vars::default()
                .set("label", label.as_str())
                .set("label_literal", quote(label, false))
                .set("name", self.plugin.enum_value_case(&value.name))
                .set("raw", value.raw_value.as_str())
                .set("enum", e.name.as_str());
            let facts = Facts {
                is_error_code: e.is_error_code,
                ..Facts::default()
            };
            self.plugin
                .require(&self.templates().enum_label, &facts, &vars, &context)
        })
    }

    /// Renders `rules` once per field, one per line.
    fn field_list(
        &self,
        rules: &[Rule],
        owner: &str,
        fields: &[IrField],
        custom: Option<CustomInputKind>,
    ) -> CodegenResult<String> {
        Self::join(fields, "\n", |field| {
            let context = format!("field `{owner}.{}`", field.name);
            let vars = Vars::default()
                .set("name", self.plugin.field_name_case(&field.name))
                .set("wire", field.name.as_str())
                .set("owner", owner)
                .defer("type", || self.plugin.type_ref(&field.ty, field.ty.nullable))
                .defer("inner", || self.plugin.type_ref(&field.ty, false))
                .defer("doc", || self.doc(field.description.as_deref(), &context))
                .defer("decode", || {
                    let source = self.source(Direction::Decode, &field.name)?;
                    self.value_expr(
                        Direction::Decode,
                        &field.ty,
                        field.ty.nullable,
                        &source,
                        custom,
                    )
                })
                .defer("encode", || {
                    let source = self.source(Direction::Encode, &field.name)?;
                    self.value_expr(
                        Direction::Encode,
                        &field.ty,
                        field.ty.nullable,
                        &source,
                        custom,
                    )
                });
            let facts = Facts {
                has_description: field.description.is_some(),
                custom,
                ..Facts::typed(&field.ty, field.ty.nullable)
            };
            self.plugin.require(rules, &facts, &vars, &context)
        })
    }

    fn interface_decl(&self, interface: &IrInterface) -> CodegenResult<Option<String>> {
        if self.templates().interface_decl.is_empty() {
            return Ok(None);
        }
        let context = format!("interface `{}`", interface.name);
        let name = interface.name.as_str();
        let vars = Vars::default()
            .set("name", name)
            .set("interfaces", interface.interfaces.join(", "))
            .defer("doc", || self.doc(interface.description.as_deref(), &context))
            .defer("fields", || {
                self.field_list(&self.templates().field, name, &interface.fields, None)
            });
        let facts = Facts {
            has_interfaces: !interface.interfaces.is_empty(),
            ..Facts::described(interface.description.as_deref())
        };
        self.plugin
            .pick(&self.templates().interface_decl, &facts, &vars, &context)
    }

    fn object_decl(&self, object: &IrObject) -> CodegenResult<Option<String>> {
        if self.templates().object_decl.is_empty() {
            return Ok(None);
        }
        let context = format!("object `{}`", object.name);
        let name = object.name.as_str();
        let entries = &object.result_union_entries;
        let vars = Vars::default()
            .set("name", name)
            .set("interfaces", object.interfaces.join(", "))
            .set("unions", self.ctx.unions_of(name).join(", "))
            .set(
                "keys",
                entries
                    .iter()
                    .map(|entry| format!("`{}`", entry.field_name))
                    .collect::<Vec<_>>()
                    .join(", "),
            )
            .defer("doc", || self.doc(object.description.as_deref(), &context))
            .defer("fields", || {
                self.field_list(&self.templates().field, name, &object.fields, None)
            })
            .defer("decoders", || {
                self.field_list(&self.templates().field_decode, name, &object.fields, None)
            })
            .defer("encoders", || {
                self.field_list(&self.templates().field_encode, name, &object.fields, None)
            })
            .defer("entries", || {
                Self::join(entries, &self.templates().result_entry_separator, |entry| {
                    self.result_entry(&self.templates().result_entry, name, entry)
                })
            })
            .defer("entry_decoders", || {
                Self::join(entries, "\n", |entry| {
                    self.result_entry(&self.templates().result_decode, name, entry)
                })
            })
            .defer("entry_encoders", || {
                Self::join(entries, "\n", |entry| {
                    self.result_entry(&self.templates().result_encode, name, entry)
                })
            });
        let facts = Facts {
            has_interfaces: !object.interfaces.is_empty(),
            result_union: object.is_result_union,
            ..Facts::described(object.description.as_deref())
        };
        self.plugin
            .pick(&self.templates().object_decl, &facts, &vars, &context)
    }

    fn result_entry(
        &self,
        rules: &[Rule],
        owner: &str,
        entry: &ResultUnionEntry,
    ) -> CodegenResult<String> {
        let context = format!("result entry `{owner}.{}`", entry.field_name);
        let key = entry.field_name.as_str();
        let vars = Vars::default()
            .set("key", key)
            .set("owner", owner)
            .defer("type", || self.plugin.type_ref(&entry.ty, false))
            .defer("decode", || {
                let source = self.source(Direction::Decode, key)?;
                self.value_expr(Direction::Decode, &entry.ty, false, &source, None)
            })
            .defer("encode", || {
                let source = self.source(Direction::Encode, key)?;
                self.value_expr(Direction::Encode, &entry.ty, false, &source, None)
            });
        self.plugin
            .require(rules, &Facts::typed(&entry.ty, false), &vars, &context)
    }

    fn input_decl(&self, input: &IrInput) -> CodegenResult<Option<String>> {
        if self.templates().input_decl.is_empty() {
            return Ok(None);
        }
        let context = format!("input `{}`", input.name);
        let name = input.name.as_str();
        let custom = input.custom_kind();
        let custom_kind = match custom {
            Some(CustomInputKind::PurchaseRequest) => "purchase-request",
            Some(CustomInputKind::DiscountOffer) => "discount-offer",
            None => "",
        };
        let [first, second] = PURCHASE_REQUEST_BRANCHES;
        let vars = Vars::default()
            .set("name", name)
            .set("custom_kind", custom_kind)
            .set("first", first.key)
            .set("second", second.key)
            .defer("doc", || self.doc(input.description.as_deref(), &context))
            .defer("fields", || {
                self.field_list(&self.templates().field, name, &input.fields, custom)
            })
            .defer("decoders", || {
                self.field_list(&self.templates().field_decode, name, &input.fields, custom)
            })
            .defer("encoders", || {
                self.field_list(&self.templates().field_encode, name, &input.fields, custom)
            })
            .defer("branches", || self.purchase_branches(input));
        let facts = Facts {
            custom,
            ..Facts::described(input.description.as_deref())
        };
        self.plugin
            .pick(&self.templates().input_decl, &facts, &vars, &context)
    }

    /// Empty unless `input` is a purchase request.
    fn purchase_branches(&self, input: &IrInput) -> CodegenResult<String> {
        if input.custom_kind() != Some(CustomInputKind::PurchaseRequest) {
            return Ok(String::new());
        }
        let Some((enum_name, branches)) = request_branches(&self.ctx.index, input) else {
            return Ok(String::new());
        };
        Self::join(&branches, "\n", |branch| {
            let context = format!("branch `{}` of `{}`", branch.key, input.name);
            let vars = Vars::default()
                .set("owner", input.name.as_str())
                .set("key", branch.key)
                .set("payload", branch.payload_type)
                .set("discriminator", PURCHASE_REQUEST_DISCRIMINATOR)
                .set("enum", enum_name)
                .set("value", self.plugin.enum_value_case(&branch.discriminator.name))
                .set("raw", branch.discriminator.raw_value.as_str())
                .set("raw_literal", quote(&branch.discriminator.raw_value, false));
            let facts = Facts {
                custom: Some(CustomInputKind::PurchaseRequest),
                ..Facts::default()
            };
            self.plugin
                .require(&self.templates().request_branch, &facts, &vars, &context)
        })
    }

    fn union_decl(&self, union: &IrUnion) -> CodegenResult<Option<String>> {
        if self.templates().union_decl.is_empty() {
            return Ok(None);
        }
        let context = format!("union `{}`", union.name);
        let name = union.name.as_str();
        let separator = self.templates().union_member_separator.as_str();
        let leaves = self.ctx.index.flatten_union(name);
        let cases = |rules: &[Rule]| {
            Self::join(&leaves, "\n", |leaf| {
                let vars = Vars::default()
                    .set("typename", leaf.typename)
                    .set("via", leaf.via.unwrap_or_default())
                    .set("union", name);
                self.plugin.require(
                    rules,
                    &Facts::default(),
                    &vars,
                    &format!("case `{}` of union `{name}`", leaf.typename),
                )
            })
        };
        let vars = Vars::default()
            .set("name", name)
            .set("interfaces", union.shared_interfaces.join(", "))
            .set(
                "leaves",
                leaves
                    .iter()
                    .map(|leaf| leaf.typename)
                    .collect::<Vec<_>>()
                    .join(separator),
            )
            .defer("doc", || self.doc(union.description.as_deref(), &context))
            .defer("members", || {
                Self::join(&union.members, separator, |member| {
                    let vars = Vars::default()
                        .set("name", member.name.as_str())
                        .set("union", name);
                    self.plugin.require(
                        &self.templates().union_member,
                        &Facts::default(),
                        &vars,
                        &format!("member `{}` of union `{name}`", member.name),
                    )
                })
            })
            .defer("decode_cases", || cases(&self.templates().union_decode_case))
            .defer("encode_cases", || cases(&self.templates().union_encode_case));
        let facts = Facts {
            has_interfaces: !union.shared_interfaces.is_empty(),
            ..Facts::described(union.description.as_deref())
        };
        self.plugin
            .pick(&self.templates().union_decl, &facts, &vars, &context)
    }

    fn operation_decl(&self, operation: &IrOperation) -> CodegenResult<Option<String>> {
        if self.templates().operation_decl.is_empty() {
            return Ok(None);
        }
        let context = format!("operation `{}`", operation.name);
        let vars = Vars::default()
            .set("name", operation.name.as_str())
            .defer("doc", || self.doc(operation.description.as_deref(), &context))
            .defer("fields", || {
                Self::join(operation.generated_fields(), "\n", |field| {
                    self.operation_field(operation, field)
                })
            });
        self.plugin.pick(
            &self.templates().operation_decl,
            &Facts::described(operation.description.as_deref()),
            &vars,
            &context,
        )
    }

    fn args(&self, operation: &IrOperation, field: &IrOperationField) -> CodegenResult<String> {
        Self::join(&field.args, &self.templates().argument_separator, |arg| {
            self.argument(operation, field, arg)
        })
    }

    fn argument(
        &self,
        operation: &IrOperation,
        field: &IrOperationField,
        arg: &IrArgument,
    ) -> CodegenResult<String> {
        let context = format!(
            "argument `{}` of `{}.{}`",
            arg.name, operation.name, field.name
        );
        let vars = Vars::default()
            .set("name", self.plugin.field_name_case(&arg.name))
            .set("wire", arg.name.as_str())
            .defer("type", || self.plugin.type_ref(&arg.ty, arg.ty.nullable))
            .defer("doc", || self.doc(arg.description.as_deref(), &context));
        let facts = Facts {
            has_description: arg.description.is_some(),
            ..Facts::typed(&arg.ty, arg.ty.nullable)
        };
        self.plugin
            .require(&self.templates().argument, &facts, &vars, &context)
    }

    fn return_type(&self, field: &IrOperationField) -> CodegenResult<String> {
        match field.return_shape() {
            ReturnShape::Void { nullable } => {
                self.plugin.type_ref(&IrType::scalar(VOID_SCALAR), nullable)
            }
            ReturnShape::Value(ty) => self.plugin.type_ref(ty, ty.nullable),
        }
    }

    fn return_facts(field: &IrOperationField) -> Facts<'_> {
        let ty = field.resolved_return_type.as_ref().unwrap_or(&field.return_type);
        Facts {
            void: matches!(field.return_shape(), ReturnShape::Void { .. }),
            has_description: field.description.is_some(),
            ..Facts::typed(ty, ty.nullable)
        }
    }

    fn operation_field(
        &self,
        operation: &IrOperation,
        field: &IrOperationField,
    ) -> CodegenResult<String> {
        let context = format!("operation field `{}.{}`", operation.name, field.name);
        let vars = Vars::default()
            .set("name", self.plugin.field_name_case(&field.name))
            .set("wire", field.name.as_str())
            .set("operation", operation.name.as_str())
            .defer("args", || self.args(operation, field))
            .defer("return", || self.return_type(field))
            .defer("doc", || self.doc(field.description.as_deref(), &context));
        self.plugin.require(
            &self.templates().operation_field,
            &Self::return_facts(field),
            &vars,
            &context,
        )
    }

    fn handler_alias(
        &self,
        operation: &IrOperation,
        field: &IrOperationField,
    ) -> CodegenResult<Option<String>> {
        if self.templates().handler_alias.is_empty() {
            return Ok(None);
        }
        let context = format!("handler for `{}.{}`", operation.name, field.name);
        let vars = Vars::default()
            .set("alias", handler_alias_name(operation, field))
            .set("operation", operation.name.as_str())
            .set("field", self.plugin.field_name_case(&field.name))
            .defer("args", || self.args(operation, field))
            .defer("return", || self.return_type(field));
        self.plugin.pick(
            &self.templates().handler_alias,
            &Self::return_facts(field),
            &vars,
            &context,
        )
    }

    fn handlers_decl(&self, operation: &IrOperation) -> CodegenResult<Option<String>> {
        if self.templates().handlers_decl.is_empty() {
            return Ok(None);
        }
        let context = format!("handlers of `{}`", operation.name);
        let vars = Vars::default()
            .set("name", format!("{}Handlers", operation.name))
            .set("operation", operation.name.as_str())
            .defer("entries", || {
                Self::join(operation.generated_fields(), "\n", |field| {
                    let vars = Vars::default()
                        .set("field", self.plugin.field_name_case(&field.name))
                        .set("wire", field.name.as_str())
                        .set("alias", handler_alias_name(operation, field))
                        .set("operation", operation.name.as_str());
                    self.plugin.require(
                        &self.templates().handler_entry,
                        &Facts::default(),
                        &vars,
                        &format!("handler entry `{}.{}`", operation.name, field.name),
                    )
                })
            });
        self.plugin
            .pick(&self.templates().handlers_decl, &Facts::default(), &vars, &context)
    }
}

fn handler_alias_name(operation: &IrOperation, field: &IrOperationField) -> String {
    format!("{}{}Handler", operation.name, to_pascal_case(&field.name))
}
