mod support;

use predicates::str::contains;
use serde_json::json;

use support::DataDir;

#[test]
fn export_then_import_restores_state() -> Result<(), Box<dyn std::error::Error>> {
    let data = DataDir::new()?;
    data.json(&["add", "keep me"])?;
    data.json(&["done", "1"])?;
    data.json(&["settings", "set", "theme", "pink"])?;

    let out = data.path().join("snapshot.json");
    let out_arg = out.to_string_lossy().to_string();
    let exported = data.json(&["backup", "export", &out_arg])?;
    assert_eq!(exported["data"]["version"], "1.0.0");
    assert_eq!(exported["data"]["todos"], 1);

    let file: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out)?)?;
    assert_eq!(file["version"], "1.0.0");
    assert_eq!(file["todos"][0]["text"], "keep me");
    assert_eq!(file["settings"]["theme"], "pink");

    data.json(&["add", "throwaway"])?;
    data.json(&["settings", "set", "theme", "green"])?;

    let restored = data.json(&["backup", "import", &out_arg])?;
    assert_eq!(restored["data"]["todos"], 1);

    let list = data.json(&["list"])?;
    assert_eq!(list["data"]["total"], 1);
    assert_eq!(list["data"]["tasks"][0]["text"], "keep me");
    assert_eq!(data.json(&["settings", "get", "theme"])?["data"]["value"], "pink");
    assert_eq!(data.json(&["profile"])?["data"]["totalCompleted"], 1);
    Ok(())
}

#[test]
fn export_to_directory_uses_dated_name() -> Result<(), Box<dyn std::error::Error>> {
    let data = DataDir::new()?;
    let target = tempfile::tempdir()?;
    let target_arg = target.path().to_string_lossy().to_string();

    let exported = data.json(&["backup", "export", &target_arg])?;
    let path = exported["data"]["path"].as_str().ok_or("missing path")?;
    assert!(path.contains("sticker-backup-"));
    assert!(path.ends_with(".json"));
    assert!(std::path::Path::new(path).exists());
    Ok(())
}

#[test]
fn invalid_backup_leaves_data_alone() -> Result<(), Box<dyn std::error::Error>> {
    let data = DataDir::new()?;
    data.json(&["add", "precious"])?;

    let bad = data.write_file("bad.json", r#"{ "version": "1.0.0" }"#)?;
    data.cmd()
        .args(["backup", "import"])
        .arg(&bad)
        .assert()
        .code(2)
        .stderr(contains("Invalid backup"));

    let garbage = data.write_file("garbage.json", "not json at all")?;
    data.cmd().args(["backup", "import"]).arg(&garbage).assert().code(2);

    let list = data.json(&["list"])?;
    assert_eq!(list["data"]["tasks"][0]["text"], "precious");
    Ok(())
}

#[test]
fn legacy_backup_imports() -> Result<(), Box<dyn std::error::Error>> {
    let data = DataDir::new()?;
    let legacy = json!({
        "version": "1.0.0",
        "timestamp": "2026-09-30T12:00:00.000Z",
        "todos": [
            { "id": 1727697600000u64, "text": "from an older install", "completed": false,
              "createdAt": "2026-09-30T11:00:00.000Z", "pinned": true }
        ],
        "profile": { "level": 3, "xp": 40, "totalXP": 390, "streak": 2, "maxStreak": 5,
                     "lastCompletedDate": "Tue Sep 29 2026", "totalCompleted": 30,
                     "achievements": ["first_todo", "ten_todos"] },
        "settings": { "theme": "purple", "opacity": 90 }
    });
    let file = data.write_file("legacy.json", &serde_json::to_string(&legacy)?)?;
    let file_arg = file.to_string_lossy().to_string();

    data.json(&["backup", "import", &file_arg])?;

    let list = data.json(&["list"])?;
    assert_eq!(list["data"]["tasks"][0]["id"], "1727697600000");
    assert_eq!(list["data"]["tasks"][0]["pinned"], true);

    let profile = data.json(&["profile"])?;
    assert_eq!(profile["data"]["level"], 3);
    assert_eq!(profile["data"]["totalCompleted"], 30);
    assert_eq!(data.json(&["settings", "get", "opacity"])?["data"]["value"], 90);
    Ok(())
}

#[test]
fn automatic_backup_on_startup() -> Result<(), Box<dyn std::error::Error>> {
    let data = DataDir::new()?;
    data.json(&["add", "first"])?;

    assert!(data.doc_path("auto-backup").exists());
    assert!(data.doc_path("last-auto-backup").exists());

    // Not due again within the interval.
    let auto = data.json(&["backup", "auto"])?;
    assert_eq!(auto["data"]["created"], false);

    let forced = data.json(&["backup", "auto", "--force"])?;
    assert_eq!(forced["data"]["created"], true);
    assert_eq!(forced["data"]["backup"]["todos"], 1);

    data.json(&["rm", "1"])?;
    data.json(&["backup", "import", "--auto"])?;
    let list = data.json(&["list"])?;
    assert_eq!(list["data"]["tasks"][0]["text"], "first");
    Ok(())
}

#[test]
fn automatic_backup_can_be_disabled() -> Result<(), Box<dyn std::error::Error>> {
    let data = DataDir::new()?;
    data.write_file(".sticker.toml", "[backup]\nauto_interval_days = 0\n")?;

    data.json(&["add", "no backup"])?;
    assert!(!data.doc_path("auto-backup").exists());

    data.cmd()
        .args(["backup", "import", "--auto"])
        .assert()
        .code(2)
        .stderr(contains("no automatic backup"));
    Ok(())
}
