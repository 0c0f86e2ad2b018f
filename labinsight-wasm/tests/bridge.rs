#![cfg(target_arch = "wasm32")]

use labinsight_wasm::{analyze, categorize, check_critical};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::wasm_bindgen_test;

fn js(json: &str) -> JsValue {
    js_sys::JSON::parse(json).unwrap()
}

fn stringify(value: &JsValue) -> String {
    js_sys::JSON::stringify(value).unwrap().into()
}

#[wasm_bindgen_test]
fn categories_are_plain_objects() {
    let categorized = categorize(js(r#"{"Hemoglobin": 9.5, "MCV": 72, "eGFR": 40}"#)).unwrap();

    assert!(!categorized.is_instance_of::<js_sys::Map>());
    assert_eq!(
        stringify(&categorized),
        r#"{"Hematology":{"Hemoglobin":9.5,"MCV":72},"Kidney_Function":{"eGFR":40}}"#
    );
}

#[wasm_bindgen_test]
fn analysis_categories_survive_stringify() {
    let categorized = categorize(js(r#"{"Hemoglobin": 9.5, "MCV": 72}"#)).unwrap();
    let analysis = analyze(categorized, "female", 40, None).unwrap();

    let json = stringify(&analysis);
    assert!(json.contains(r#""categories":{"Hematology":{"#));
    assert!(json.contains("Microcytic anemia"));
}

#[wasm_bindgen_test]
fn critical_alerts_are_an_array() {
    let alerts = check_critical(js(r#"{"Potassium": 7.1}"#)).unwrap();

    assert!(js_sys::Array::is_array(&alerts));
    assert!(stringify(&alerts).contains(r#""test":"Potassium""#));
}
