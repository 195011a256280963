use depiction_math::{GeoCoordinate2Double, TileIndex};
use serde_json::json;

pub fn run(lat: f64, lon: f64, zoom: u8, radius: u32, json_output: bool) {
    let geo = GeoCoordinate2Double::new(lat, lon);
    let center = TileIndex::from_geo(&geo, zoom);
    let tiles = center.neighbours(radius);
    let (south_west, north_east) = center.bounds();

    if json_output {
        super::print_json(&json!({
            "center": center.to_string(),
            "bounds": {
                "south": south_west.latitude(),
                "west": south_west.longitude(),
                "north": north_east.latitude(),
                "east": north_east.longitude(),
            },
            "tiles": tiles.iter().map(ToString::to_string).collect::<Vec<_>>(),
        }));
    } else {
        println!("depiction tiles");
        println!("  center: {center}");
        println!(
            "  bounds: ({:.6}, {:.6}) .. ({:.6}, {:.6})",
            south_west.latitude(),
            south_west.longitude(),
            north_east.latitude(),
            north_east.longitude()
        );
        println!("  tiles: {}", tiles.len());
        for tile in &tiles {
            println!("    {tile}");
        }
    }
}
