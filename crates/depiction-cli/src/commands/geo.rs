use depiction_math::{GeoCoordinate3Double, Vector3Double};
use serde_json::json;

fn triple(v: Vector3Double) -> [f64; 3] {
    [v.x, v.y, v.z]
}

pub fn run(lat: f64, lon: f64, alt: f64, radius: f64, json_output: bool) {
    let geo = GeoCoordinate3Double::new(lat, lon, alt);
    let up = geo.up_vector();
    let position = geo.to_cartesian(radius);

    if json_output {
        super::print_json(&json!({
            "latitude": geo.latitude(),
            "longitude": geo.longitude(),
            "altitude": geo.altitude(),
            "radius": radius,
            "up": triple(up),
            "cartesian": triple(position),
        }));
    } else {
        println!("depiction geo");
        println!("  latitude: {}", geo.latitude());
        println!("  longitude: {}", geo.longitude());
        println!("  altitude: {}", geo.altitude());
        println!("  up: ({:.6}, {:.6}, {:.6})", up.x, up.y, up.z);
        println!(
            "  cartesian: ({:.3}, {:.3}, {:.3})",
            position.x, position.y, position.z
        );
    }
}
