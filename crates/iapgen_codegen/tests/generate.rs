//! Integration tests for code generation over the shared fixture.

use iapgen_codegen::{
    CodeGenerator, CodegenError, CodegenOptions, Language, Plugin, TemplatePlugin,
};
use iapgen_ir::{IrSchema, IrType, UnionMember};

const FIXTURE: &str = include_str!("../../../fixtures/iap.ir.json");

fn fixture() -> IrSchema {
    IrSchema::from_json(FIXTURE).unwrap()
}

fn generate(language: Language) -> String {
    let schema = fixture();
    CodeGenerator::new(&schema).generate(language).unwrap()
}

/// Asserts every needle occurs, in the given order.
fn assert_in_order(haystack: &str, needles: &[&str]) {
    let mut from = 0;
    for needle in needles {
        match haystack[from..].find(needle) {
            Some(offset) => from += offset + needle.len(),
            None => panic!("`{needle}` missing or out of order in:\n{haystack}"),
        }
    }
}

/// Test repeated generation is byte-identical for every language.
#[test]
fn test_deterministic_output() {
    let schema = fixture();
    let generator = CodeGenerator::new(&schema);
    for language in Language::ALL {
        let first = generator.generate(language).unwrap();
        let second = generator.generate(language).unwrap();
        assert_eq!(first, second, "{}", language.name());
    }
}

/// Test `generate_all` keeps the requested order and names files by stem.
#[test]
fn test_generate_all() {
    let schema = fixture();
    let options = CodegenOptions {
        file_stem: "Types".to_string(),
        ..CodegenOptions::default()
    };
    let generator = CodeGenerator::with_options(&schema, options);
    let files = generator.generate_all(&Language::ALL).unwrap();

    let names: Vec<_> = files.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, vec!["Types.swift", "Types.kt", "Types.gd", "Types.ts"]);
    for file in &files {
        assert_eq!(file.contents, generator.generate(file.language).unwrap());
    }
}

/// Test the Store enum in each native target.
#[test]
fn test_store_enum() {
    assert_in_order(
        &generate(Language::Swift),
        &[
            "/// Storefront that processed the purchase",
            "public enum Store: String, Codable, CaseIterable {",
            "case apple = \"apple\"",
            "case google = \"google\"",
            "throw IapDecodingError(\"Invalid Store value: ",
        ],
    );
    assert_in_order(
        &generate(Language::Kotlin),
        &[
            "enum class Store(val rawValue: String) {",
            "Apple(\"apple\"),",
            "Google(\"google\");",
        ],
    );
    assert_in_order(
        &generate(Language::GDScript),
        &["enum Store { APPLE, GOOGLE }"],
    );
    assert_in_order(
        &generate(Language::TypeScript),
        &["export enum Store {", "Apple = \"apple\",", "Google = \"google\","],
    );
}

/// Test error codes accept legacy wire strings without duplicate labels.
#[test]
fn test_error_code_legacy_aliases() {
    let swift = generate(Language::Swift);
    assert!(swift.contains(
        "case \"purchase-verification-failed\", \"PurchaseVerificationFailed\", \"purchaseVerificationFailed\", \"receipt-failed\", \"E_RECEIPT_FAILED\":"
    ));
    assert!(swift.contains("case \"unknown\", \"Unknown\":"));
    assert_eq!(swift.matches("\"E_RECEIPT_FAILED\"").count(), 1);

    let kotlin = generate(Language::Kotlin);
    assert_eq!(kotlin.matches("\"E_USER_CANCELLED\"").count(), 1);
}

/// Test the placeholder operation field produces no code.
#[test]
fn test_placeholder_skipped() {
    for language in Language::ALL {
        let output = generate(language);
        assert!(!output.contains("_placeholder"), "{}", language.name());
        assert!(!output.contains("Placeholder"), "{}", language.name());
    }
}

/// Test `Void` returns keep their nullability in each target.
#[test]
fn test_void_returns() {
    let swift = generate(Language::Swift);
    assert!(swift.contains("func endConnection() async throws -> Void"));
    assert!(swift.contains(
        "func finishTransaction(purchaseId: String, isConsumable: Bool?) async throws -> Void?"
    ));

    let kotlin = generate(Language::Kotlin);
    assert!(kotlin.contains("suspend fun endConnection(): Unit"));
    assert!(kotlin.contains("typealias MutationEndConnectionHandler = suspend () -> Unit"));

    let gdscript = generate(Language::GDScript);
    assert!(gdscript.contains("func end_connection() -> void:"));

    let typescript = generate(Language::TypeScript);
    assert!(typescript.contains("endConnection(): Promise<void>;"));
    assert!(typescript.contains("Promise<void | null>;"));
}

/// Test union dispatch lists flattened leaves sorted by `__typename`.
#[test]
fn test_union_dispatch_sorted() {
    assert_in_order(
        &generate(Language::Swift),
        &[
            "public enum ProductOrSubscription: ProductCommon {",
            "case productSubscriptionItem(ProductSubscription)",
            "case productItem(Product)",
            "case \"ProductAndroid\":",
            "return .productItem(try Product.fromJSON(json))",
            "case \"ProductIOS\":",
            "case \"ProductSubscriptionAndroid\":",
            "return .productSubscriptionItem(try ProductSubscription.fromJSON(json))",
            "case \"ProductSubscriptionIOS\":",
            "throw IapDecodingError(\"Unknown __typename for ProductOrSubscription: \\(typename)\")",
        ],
    );
    assert_in_order(
        &generate(Language::Kotlin),
        &[
            "sealed interface ProductOrSubscription : ProductCommon {",
            "\"ProductAndroid\" -> ProductItem(Product.fromJson(json))",
            "\"ProductIOS\" -> ProductItem(Product.fromJson(json))",
            "\"ProductSubscriptionAndroid\" -> ProductSubscriptionItem(ProductSubscription.fromJson(json))",
            "else -> throw IapDecodingException(\"Unknown __typename for ProductOrSubscription: $typename\")",
        ],
    );
    assert_in_order(
        &generate(Language::GDScript),
        &[
            "class ProductOrSubscription:",
            "\"ProductAndroid\":",
            "result.value = Product.from_dict(data, strict)",
            "\"ProductSubscriptionIOS\":",
            "push_error(\"Unknown __typename for ProductOrSubscription: %s\" % result.typename)",
        ],
    );
}

/// Test the purchase request enforces exactly one branch.
#[test]
fn test_purchase_request_messages() {
    let swift = generate(Language::Swift);
    assert!(swift.contains(
        "RequestPurchaseProps requires either `requestPurchase` or `requestSubscription`"
    ));

    let kotlin = generate(Language::Kotlin);
    assert!(kotlin.contains(
        "RequestPurchaseProps accepts only one of `requestPurchase` or `requestSubscription`"
    ));

    let gdscript = generate(Language::GDScript);
    assert!(gdscript.contains(
        "RequestPurchaseProps.type is `%s` but `requestSubscription` requires `subs`"
    ));
}

/// Test sections appear in the fixed order: enums, interfaces, objects,
/// inputs, unions, resolvers, handlers.
#[test]
fn test_section_order() {
    assert_in_order(
        &generate(Language::Swift),
        &[
            "enum Store",
            "protocol ProductCommon",
            "struct ProductIOS",
            "struct RequestPurchaseIosProps",
            "enum Purchase:",
            "protocol QueryResolver",
            "typealias QueryFetchProductsHandler",
            "struct QueryHandlers",
        ],
    );
    assert_in_order(
        &generate(Language::TypeScript),
        &[
            "export enum Store",
            "export interface ProductCommon",
            "export interface ProductIOS extends ProductCommon",
            "export type RequestPurchaseResult = { purchase: Purchase } | { purchases: Array<Purchase> };",
            "export interface RequestPurchaseIosProps",
            "export type ProductOrSubscription = ProductSubscription | Product;",
            "export interface QueryResolver",
            "export type QueryFetchProductsHandler = (params: ProductRequest) => Promise<Array<ProductOrSubscription>>;",
            "export interface QueryHandlers {",
            "fetchProducts?: QueryFetchProductsHandler;",
        ],
    );
}

/// Test the Kotlin package and the GDScript class name come from options.
#[test]
fn test_options_applied() {
    let schema = fixture();
    let options = CodegenOptions {
        header: "Custom banner".to_string(),
        package_name: "com.example.iap".to_string(),
        gdscript_class_name: "Iap".to_string(),
        ..CodegenOptions::default()
    };
    let generator = CodeGenerator::with_options(&schema, options);

    let kotlin = generator.generate(Language::Kotlin).unwrap();
    assert!(kotlin.starts_with("// Custom banner\n\npackage com.example.iap\n"));

    let gdscript = generator.generate(Language::GDScript).unwrap();
    assert!(gdscript.contains("class_name Iap"));
}

/// Test an invalid schema fails before any output is produced.
#[test]
fn test_invalid_schema() {
    let mut schema = fixture();
    schema.unions[0].members.push(UnionMember::object("Missing"));
    let generator = CodeGenerator::new(&schema);
    for language in Language::ALL {
        let err = generator.generate(language).unwrap_err();
        assert!(matches!(err, CodegenError::Ir(_)), "{}", language.name());
    }
    assert!(generator.generate_all(&Language::ALL).is_err());
}

/// Test a custom profile loaded from JSON renders the fixture.
#[test]
fn test_custom_template_profile() {
    let profile = r#"{
        "name": "names",
        "fileExtension": "txt",
        "defaultScalar": "any",
        "templates": {
            "enumDecl": [{ "template": "enum {{name}}:\n  {{values}}" }],
            "enumValue": [{ "template": "{{raw}}" }],
            "unionDecl": [
                { "when": "hasInterfaces", "template": "union {{name}} = {{leaves}}" }
            ],
            "unionMemberSeparator": " ",
            "unionMember": [{ "template": "{{name}}" }]
        }
    }"#;
    let schema = fixture();
    let plugin = TemplatePlugin::from_json(profile, &CodegenOptions::default()).unwrap();
    assert_eq!(plugin.name(), "names");
    let output = CodeGenerator::new(&schema).generate_with(&plugin).unwrap();
    assert!(output.contains("enum Store:\n  apple\n  google\n"));
    assert!(output.contains(
        "union ProductOrSubscription = ProductAndroid ProductIOS ProductSubscriptionAndroid ProductSubscriptionIOS"
    ));
}

/// Test the TypeScript plugin maps types the same way it renders fields.
#[test]
fn test_typescript_type_mapping() {
    let plugin = Language::TypeScript.plugin(&CodegenOptions::default());
    let ty = IrType::list(IrType::enum_ref("Store")).nullable();
    assert_eq!(plugin.map_type(&ty), "Array<Store> | null");
    assert_eq!(plugin.map_type(&IrType::scalar("JSON")), "Record<string, unknown>");
}

/// Test the TypeScript codec dispatches every flattened union leaf in order.
#[test]
fn test_typescript_union_codec() {
    let typescript = generate(Language::TypeScript);
    assert_in_order(
        &typescript,
        &[
            "export function decodeProductOrSubscription(json: Record<string, unknown>): ProductOrSubscription {",
            "switch (json.__typename) {",
            "case 'ProductAndroid':",
            "return decodeProductAndroid(json);",
            "case 'ProductIOS':",
            "case 'ProductSubscriptionAndroid':",
            "case 'ProductSubscriptionIOS':",
            "throw new Error('Unknown __typename for ProductOrSubscription: ' + String(json.__typename));",
            "export function encodeProductOrSubscription(value: ProductOrSubscription): Record<string, unknown> {",
            "case 'ProductAndroid':",
            "return encodeProductAndroid(value);",
            "case 'ProductSubscriptionIOS':",
        ],
    );
}

/// Test the TypeScript purchase request and result union carry the codec messages.
#[test]
fn test_typescript_custom_codecs() {
    let typescript = generate(Language::TypeScript);
    assert_in_order(
        &typescript,
        &[
            "export function decodeRequestPurchaseProps(json: Record<string, unknown>): RequestPurchaseProps {",
            "if (json.requestPurchase != null && typeof json.requestPurchase === 'object') {",
            "if (json.type != null && json.type !== \"in-app\") {",
            "return { type: ProductType.InApp, requestPurchase: decodeRequestPurchasePropsByPlatforms(json.requestPurchase as Record<string, unknown>) };",
            "throw new Error('RequestPurchaseProps.type is `' + String(json.type) + '` but `requestSubscription` requires `subs`');",
            "return { type: ProductType.Subs, requestSubscription: decodeRequestSubscriptionPropsByPlatforms(json.requestSubscription as Record<string, unknown>) };",
            "throw new Error('RequestPurchaseProps requires either `requestPurchase` or `requestSubscription`');",
        ],
    );
    assert_in_order(
        &typescript,
        &[
            "export function decodeRequestPurchaseResult(json: Record<string, unknown>): RequestPurchaseResult {",
            "return { purchase: decodePurchase(json.purchase as Record<string, unknown>) };",
            "return { purchases: ((json.purchases ?? []) as unknown[]).map((item) => decodePurchase(item as Record<string, unknown>)) };",
            "throw new Error('RequestPurchaseResult has none of its result fields set (expected one of `purchase`, `purchases`)');",
        ],
    );
    assert!(typescript.contains("timestamp: Number(json.timestamp),"));
}

/// Test TypeScript enums get label maps, with error-code aliases listed once.
#[test]
fn test_typescript_enum_codec() {
    let typescript = generate(Language::TypeScript);
    assert_in_order(
        &typescript,
        &[
            "const StoreLabels = new Map<string, Store>([",
            "[\"apple\", Store.Apple],",
            "export function decodeStore(raw: unknown): Store {",
            "throw new Error('Invalid Store value: ' + text);",
            "export function encodeStore(value: Store): string {",
        ],
    );
    assert!(typescript.contains("[\"E_RECEIPT_FAILED\", ErrorCode.PurchaseVerificationFailed],"));
    assert_eq!(typescript.matches("\"E_RECEIPT_FAILED\"").count(), 1);
}
