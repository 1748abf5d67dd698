//! Integration tests for the reference wire codec.

use iapgen_ir::{validate, IrSchema, WireCodec, WireError};
use serde_json::json;

const FIXTURE: &str = include_str!("../../../fixtures/iap.ir.json");

fn fixture() -> IrSchema {
    IrSchema::from_json(FIXTURE).unwrap()
}

/// Test the fixture is a valid schema with computed metadata.
#[test]
fn test_fixture_validates() {
    let schema = fixture();
    let result = validate(&schema);
    assert!(result.is_ok(), "{:?}", result.diagnostics);

    let required = schema.required_input_types();
    assert!(required.contains("ProductRequest"));
    assert!(required.contains("AvailablePurchasesRequest"));
    assert!(!required.contains("PurchaseOptions"));
}

/// Test the Store enum scenario.
#[test]
fn test_store_enum() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);

    assert_eq!(codec.decode("Store", &json!("apple")).unwrap(), json!("apple"));
    assert_eq!(codec.decode("Store", &json!("google")).unwrap(), json!("google"));

    let err = codec.decode("Store", &json!("horizon2")).unwrap_err();
    assert_eq!(
        err,
        WireError::InvalidEnumValue {
            enum_name: "Store".into(),
            value: "horizon2".into(),
        }
    );
    assert_eq!(codec.decode_or_null("Store", &json!("horizon2")), None);
}

/// Test every enum value decodes from its raw value.
#[test]
fn test_enum_round_trip() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);
    for e in &schema.enums {
        for value in &e.values {
            let decoded = codec.decode(&e.name, &json!(value.raw_value)).unwrap();
            assert_eq!(decoded, json!(value.raw_value), "{}.{}", e.name, value.name);
        }
    }
}

/// Test legacy error-code strings decode to the current case.
#[test]
fn test_legacy_alias() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);

    let legacy = codec.decode("ErrorCode", &json!("receipt-failed")).unwrap();
    let camel = codec
        .decode("ErrorCode", &json!("purchaseVerificationFailed"))
        .unwrap();
    let pascal = codec
        .decode("ErrorCode", &json!("PurchaseVerificationFailed"))
        .unwrap();

    assert_eq!(legacy, json!("purchase-verification-failed"));
    assert_eq!(legacy, camel);
    assert_eq!(legacy, pascal);
    assert_eq!(
        codec.decode("ErrorCode", &json!("E_USER_CANCELLED")).unwrap(),
        json!("user-cancelled")
    );
}

/// Test aliases are not accepted by ordinary enums.
#[test]
fn test_aliases_only_for_error_codes() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);
    assert!(codec.decode("Store", &json!("Apple")).is_err());
}

/// Test a complete object survives decode unchanged.
#[test]
fn test_object_round_trip() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);
    let payload = json!({
        "__typename": "PurchaseIOS",
        "id": "1000000123",
        "productId": "dev.hyo.premium",
        "platform": "ios",
        "purchaseState": "purchased",
        "quantity": 2,
        "transactionDate": 1_700_000_000_000.0,
        "store": "apple"
    });

    let decoded = codec.decode("PurchaseIOS", &payload).unwrap();
    assert_eq!(decoded, payload);
    assert_eq!(codec.decode("PurchaseIOS", &decoded).unwrap(), decoded);
}

/// Test missing required scalars default in lenient mode and null the value in strict mode.
#[test]
fn test_required_scalars() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);
    let payload = json!({
        "id": "1",
        "productId": "p",
        "platform": "ios",
        "purchaseState": "pending"
    });

    let decoded = codec.decode("PurchaseIOS", &payload).unwrap();
    assert_eq!(decoded["quantity"], json!(0));
    assert_eq!(decoded["transactionDate"], json!(0.0));
    assert!(decoded.get("store").is_none());

    assert_eq!(codec.decode_or_null("PurchaseIOS", &payload), None);
}

/// Test numbers widen to the declared numeric type.
#[test]
fn test_numeric_widening() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);
    let payload = json!({
        "id": "1", "productId": "p", "platform": "ios", "purchaseState": "purchased",
        "quantity": 3.0, "transactionDate": 17
    });
    let decoded = codec.decode("PurchaseIOS", &payload).unwrap();
    assert_eq!(decoded["quantity"], json!(3));
    assert_eq!(decoded["transactionDate"], json!(17.0));
}

/// Test required enum fields use platform defaults, then the fallback value.
#[test]
fn test_required_enum_defaults() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);

    let product = codec
        .decode("ProductIOS", &json!({ "id": "p", "title": "Premium" }))
        .unwrap();
    assert_eq!(product["platform"], json!("ios"));
    assert_eq!(product["type"], json!("in-app"));

    let subscription = codec
        .decode("ProductSubscriptionAndroid", &json!({ "id": "s" }))
        .unwrap();
    assert_eq!(subscription["platform"], json!("android"));
    assert_eq!(subscription["type"], json!("subs"));

    let purchase = codec
        .decode("PurchaseAndroid", &json!({ "purchaseState": "refunded" }))
        .unwrap();
    assert_eq!(purchase["purchaseState"], json!("unknown"));
    assert_eq!(purchase["platform"], json!("android"));
}

/// Test lists are lenient and drop undecodable elements.
#[test]
fn test_lenient_lists() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);

    let absent = codec
        .decode("ProductSubscriptionAndroid", &json!({ "id": "s" }))
        .unwrap();
    assert_eq!(absent["subscriptionOfferDetails"], json!([]));

    let mixed = codec
        .decode(
            "ProductSubscriptionAndroid",
            &json!({
                "id": "s",
                "subscriptionOfferDetails": [
                    { "offerToken": "t", "basePlanId": "monthly", "pricingPhases": ["P1M", 3] },
                    "not a map",
                    { "offerToken": "missing plan" }
                ]
            }),
        )
        .unwrap();
    assert_eq!(
        mixed["subscriptionOfferDetails"],
        json!([{
            "__typename": "SubscriptionOffer",
            "offerToken": "t",
            "basePlanId": "monthly",
            "pricingPhases": ["P1M"]
        }])
    );
}

/// Test every reachable union member dispatches by typename.
#[test]
fn test_union_dispatch_completeness() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);

    for typename in [
        "ProductIOS",
        "ProductAndroid",
        "ProductSubscriptionIOS",
        "ProductSubscriptionAndroid",
    ] {
        let payload = json!({ "__typename": typename, "id": "x", "title": "X" });
        let decoded = codec.decode("ProductOrSubscription", &payload).unwrap();
        assert_eq!(decoded["__typename"], json!(typename));
        assert_eq!(codec.decode("ProductOrSubscription", &decoded).unwrap(), decoded);
    }
}

/// Test an unknown typename names the union and the value.
#[test]
fn test_union_unknown_typename() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);

    let err = codec
        .decode("ProductOrSubscription", &json!({ "__typename": "ProductWeb" }))
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("ProductOrSubscription"));
    assert!(message.contains("ProductWeb"));
}

/// Test result unions take the first populated entry.
#[test]
fn test_result_union() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);

    let decoded = codec
        .decode(
            "RequestPurchaseResult",
            &json!({
                "purchase": null,
                "purchases": [{ "__typename": "PurchaseAndroid", "id": "a", "productId": "p",
                                "platform": "android", "purchaseState": "purchased",
                                "isAcknowledged": true }]
            }),
        )
        .unwrap();
    assert_eq!(decoded["purchases"][0]["isAcknowledged"], json!(true));
    assert!(decoded.get("purchase").is_none());

    let err = codec.decode("RequestPurchaseResult", &json!({})).unwrap_err();
    assert!(matches!(err, WireError::EmptyResultUnion { .. }));
    assert_eq!(codec.decode_or_null("RequestPurchaseResult", &json!({})), None);
}

/// Test purchase-request inputs validate their discriminator.
#[test]
fn test_purchase_request() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);

    let purchase = codec
        .decode(
            "RequestPurchaseProps",
            &json!({ "requestPurchase": { "ios": { "sku": "dev.hyo.premium" } } }),
        )
        .unwrap();
    assert_eq!(purchase["type"], json!("in-app"));
    assert_eq!(purchase["requestPurchase"]["ios"]["sku"], json!("dev.hyo.premium"));
    assert_eq!(codec.decode("RequestPurchaseProps", &purchase).unwrap(), purchase);

    let subscription = codec
        .decode(
            "RequestPurchaseProps",
            &json!({
                "type": "subs",
                "requestSubscription": { "android": { "skus": ["monthly"] } }
            }),
        )
        .unwrap();
    assert_eq!(subscription["type"], json!("subs"));

    let mismatch = codec
        .decode(
            "RequestPurchaseProps",
            &json!({ "type": "subs", "requestPurchase": { "ios": { "sku": "x" } } }),
        )
        .unwrap_err();
    assert!(matches!(mismatch, WireError::DiscriminatorMismatch { .. }));

    let neither = codec
        .decode("RequestPurchaseProps", &json!({ "type": "in-app" }))
        .unwrap_err();
    let message = neither.to_string();
    assert!(message.contains("requestPurchase"));
    assert!(message.contains("requestSubscription"));
}

/// Test discount offers accept numeric strings.
#[test]
fn test_discount_offer_flexible_numbers() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);
    let decoded = codec
        .decode(
            "DiscountOfferInputIOS",
            &json!({
                "identifier": "intro", "keyIdentifier": "k", "nonce": "n",
                "signature": "s", "timestamp": "1700000000000"
            }),
        )
        .unwrap();
    assert_eq!(decoded["timestamp"], json!(1_700_000_000_000.0));
}

/// Test nullable nested values propagate null instead of failing.
#[test]
fn test_nullable_nested_propagates_null() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);
    let decoded = codec
        .decode(
            "RequestPurchaseIosProps",
            &json!({ "sku": "x", "withOffer": { "identifier": "intro" } }),
        )
        .unwrap();
    assert!(decoded.get("withOffer").is_none());
}

/// Test required inputs without required fields decode to defaults.
#[test]
fn test_optional_only_input_defaults() {
    let schema = fixture();
    let codec = WireCodec::new(&schema);
    let decoded = codec
        .decode("AvailablePurchasesRequest", &json!({}))
        .unwrap();
    assert_eq!(decoded, json!({ "options": {} }));

    let present = codec
        .decode_or_null(
            "AvailablePurchasesRequest",
            &json!({ "options": { "alsoPublishToEventListenerIOS": true } }),
        )
        .unwrap();
    assert_eq!(present["options"]["alsoPublishToEventListenerIOS"], json!(true));
}

/// Test a missing required object names its owner.
#[test]
fn test_missing_required_object() {
    let schema: IrSchema = serde_json::from_value(json!({
        "objects": [
            { "name": "Receipt", "fields": [
                { "name": "owner",
                    "type": { "kind": "object", "name": "Owner", "nullable": false } },
                { "name": "tags", "type": { "kind": "list", "nullable": true,
                    "elementType": { "kind": "scalar", "name": "String", "nullable": false } } }
            ] },
            { "name": "Owner", "fields": [
                { "name": "id", "type": { "kind": "scalar", "name": "ID", "nullable": false } }
            ] }
        ]
    }))
    .unwrap();
    let codec = WireCodec::new(&schema);

    let err = codec.decode("Receipt", &json!({ "tags": [] })).unwrap_err();
    assert_eq!(
        err,
        WireError::MissingField {
            owner: "Receipt".into(),
            field: "owner".into(),
        }
    );

    let decoded = codec
        .decode("Receipt", &json!({ "owner": { "id": "o" } }))
        .unwrap();
    assert!(decoded.get("tags").is_none());
}
