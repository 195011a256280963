pub mod geo;
pub mod load;
pub mod tiles;

pub(crate) fn print_json(payload: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).expect("json serialization")
    );
}
