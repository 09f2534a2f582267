//! Integration tests for catalog administration and config commands

use catalog_enricher::cli::{CatalogCommands, Commands, ConfigCommands, RunContext};
use std::path::Path;
use tempfile::TempDir;

fn context(workspace: &Path) -> RunContext {
    let config_path = workspace.join("enricher.toml");
    std::fs::write(
        &config_path,
        format!(
            "[provider]\napi_key = \"sk-never-shown\"\n\n[catalog]\nstore_path = \"{}\"\n",
            workspace.join("catalog").display()
        ),
    )
    .unwrap();
    RunContext::new(workspace.to_path_buf(), Some(config_path)).unwrap()
}

#[test]
fn test_import_set_prompt_and_list() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(temp_dir.path());

    let items_path = temp_dir.path().join("items.json");
    std::fs::write(
        &items_path,
        r#"[
            {"id": 1, "name": "Bremsbelag", "ean": "123", "sku": "BB-1", "price": 20.0, "quantity": 2, "listed_at": "2026-01-02T00:00:00Z"},
            {"id": 2, "name": "Ohne Nummer", "sku": "ON-2", "price": 5.0, "quantity": 1, "listed_at": "2026-01-01T00:00:00Z"}
        ]"#,
    )
    .unwrap();
    let output = ctx
        .execute(&Commands::Catalog {
            command: CatalogCommands::Import {
                path: items_path.clone(),
            },
        })
        .unwrap();
    assert!(output.starts_with("Imported 2 item(s)"));

    let prompt_path = temp_dir.path().join("prompt.txt");
    std::fs::write(&prompt_path, "Beschreibe {name}").unwrap();
    let output = ctx
        .execute(&Commands::Catalog {
            command: CatalogCommands::SetPrompt {
                key: None,
                path: prompt_path,
            },
        })
        .unwrap();
    assert!(output.contains("Stored prompt template 1"));

    let output = ctx
        .execute(&Commands::Catalog {
            command: CatalogCommands::List {
                pending: true,
                format: "json".to_string(),
            },
        })
        .unwrap();
    let listed: Vec<serde_json::Value> = serde_json::from_str(&output).unwrap();
    assert_eq!(listed.len(), 1, "item without EAN/UPC is not pending");
    assert_eq!(listed[0]["id"], 1);

    let table = ctx
        .execute(&Commands::Catalog {
            command: CatalogCommands::List {
                pending: false,
                format: "text".to_string(),
            },
        })
        .unwrap();
    assert!(table.contains("Bremsbelag"));
    assert!(table.ends_with("Total: 2 item(s)"));
}

#[test]
fn test_empty_prompt_file_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(temp_dir.path());
    let prompt_path = temp_dir.path().join("empty.txt");
    std::fs::write(&prompt_path, "  \n").unwrap();

    let result = ctx.execute(&Commands::Catalog {
        command: CatalogCommands::SetPrompt {
            key: Some(2),
            path: prompt_path,
        },
    });
    assert!(result.is_err());
}

#[test]
fn test_invalid_import_file() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(temp_dir.path());
    let items_path = temp_dir.path().join("items.json");
    std::fs::write(&items_path, "{\"not\": \"an array\"}").unwrap();

    let err = ctx
        .execute(&Commands::Catalog {
            command: CatalogCommands::Import { path: items_path },
        })
        .unwrap_err();
    assert!(err.to_string().contains("not a JSON array"));
}

#[test]
fn test_config_show_masks_api_key() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(temp_dir.path());

    let output = ctx
        .execute(&Commands::Config {
            command: ConfigCommands::Show,
        })
        .unwrap();
    assert!(!output.contains("sk-never-shown"));
    assert!(output.contains("[batch]"));
    assert!(ctx.config().batch.artifact_dir.starts_with(temp_dir.path()));
}
