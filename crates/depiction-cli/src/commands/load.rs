use depiction_datasource::{
    Datasource, DatasourceConfig, DatasourceError, JsonlStore, LedgerSummary, NamedLoader,
    ReloadState, Scene,
};
use serde_json::json;
use tracing::info;

/// Ticks allowed for a reload to settle. The JSONL store completes
/// synchronously, so one is normally enough.
const MAX_TICKS: usize = 16;

pub fn load_store(
    store_path: &str,
    config_path: Option<&str>,
) -> Result<(LedgerSummary, usize), DatasourceError> {
    let config = match config_path {
        Some(path) => DatasourceConfig::load(path)?,
        None => DatasourceConfig::default(),
    };
    let store = JsonlStore::open(store_path)?;
    info!(store = store_path, records = store.len(), "store opened");

    let mut scene = Scene::new();
    let mut datasource = Datasource::from_config(&config, Box::new(store));
    if datasource.loaders().is_empty() {
        datasource.add_loader(Box::new(NamedLoader::new("all", "all", json!({}))));
    }

    datasource.refresh_loaders(&mut scene);
    datasource.update(&mut scene);
    datasource.reload_all(&mut scene);
    for _ in 0..MAX_TICKS {
        datasource.update(&mut scene);
        if datasource.reload_state() == ReloadState::Idle {
            break;
        }
    }
    if datasource.reload_state() != ReloadState::Idle {
        return Err(DatasourceError::Config(format!(
            "reload did not settle after {MAX_TICKS} ticks"
        )));
    }

    Ok((datasource.summary(), scene.len()))
}

pub fn run(store: String, config: Option<String>, json_output: bool) {
    let (summary, resident) = load_store(&store, config.as_deref()).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    if json_output {
        super::print_json(&json!({
            "store": store,
            "resident": resident,
            "ledger": summary,
        }));
    } else {
        println!("depiction load {store}");
        println!();
        println!("  datasource: {}", summary.name);
        println!("  resident entities: {resident}");
        println!("  tracked entities: {}", summary.entities.len());
        for loader in &summary.loaders {
            println!("  loader {}: {} scope(s)", loader.id, loader.scopes.len());
            for scope in &loader.scopes {
                println!(
                    "    {} {:?} ({} entities)",
                    scope.key, scope.state, scope.entities
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "depiction-cli-load-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should exist");
        path
    }

    #[test]
    fn index2d_config_keeps_only_nearby_entities() {
        let dir = temp_dir("index2d");
        let store = dir.join("entities.jsonl");
        fs::write(
            &store,
            concat!(
                "{\"id\":\"00000000-0000-0000-0000-000000000001\",\"transform\":{\"geoCoordinate\":{\"latitude\":45.5017,\"longitude\":-73.5673}}}\n",
                "{\"id\":\"00000000-0000-0000-0000-000000000002\",\"transform\":{\"geoCoordinate\":{\"latitude\":-33.86,\"longitude\":151.2}}}\n",
            ),
        )
        .expect("store should write");
        let config = dir.join("datasource.toml");
        fs::write(
            &config,
            "name = \"montreal\"\n[index2d]\nzoom = 10\nradius = 0\nlatitude = 45.5017\nlongitude = -73.5673\n",
        )
        .expect("config should write");

        let (summary, resident) = load_store(
            store.to_str().expect("utf-8 path"),
            Some(config.to_str().expect("utf-8 path")),
        )
        .expect("load should succeed");
        assert_eq!(summary.name, "montreal");
        assert_eq!(resident, 1);
        assert_eq!(summary.loaders[0].scopes[0].key, "tile:10/302/366");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_store_is_an_error() {
        let dir = temp_dir("corrupt");
        let store = dir.join("entities.jsonl");
        fs::write(&store, "not json\n").expect("store should write");
        assert!(matches!(
            load_store(store.to_str().expect("utf-8 path"), None),
            Err(DatasourceError::Jsonl(_))
        ));
        let _ = fs::remove_dir_all(dir);
    }
}
