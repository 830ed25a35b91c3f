mod support;

use predicates::str::contains;

use support::DataDir;

#[test]
fn settings_default_then_set() -> Result<(), Box<dyn std::error::Error>> {
    let data = DataDir::new()?;

    let all = data.json(&["settings", "get"])?;
    assert_eq!(all["data"]["theme"], "default");
    assert_eq!(all["data"]["opacity"], 100);
    assert_eq!(all["data"]["soundEnabled"], true);

    data.json(&["settings", "set", "theme", "Mint"])?;
    data.json(&["settings", "set", "soundEnabled", "false"])?;

    let theme = data.json(&["settings", "get", "theme"])?;
    assert_eq!(theme["data"]["key"], "theme");
    assert_eq!(theme["data"]["value"], "mint");

    let stored = data.read_doc("todo-settings")?;
    assert_eq!(stored["theme"], "mint");
    assert_eq!(stored["soundEnabled"], false);
    Ok(())
}

#[test]
fn settings_reject_unknown_values() -> Result<(), Box<dyn std::error::Error>> {
    let data = DataDir::new()?;

    data.cmd()
        .args(["settings", "set", "theme", "neon"])
        .assert()
        .code(2)
        .stderr(contains("unknown theme"));
    data.cmd()
        .args(["settings", "set", "volume", "11"])
        .assert()
        .code(2);
    data.cmd()
        .args(["settings", "get", "volume"])
        .assert()
        .code(2);
    Ok(())
}

#[test]
fn out_of_range_stored_settings_are_sanitized() -> Result<(), Box<dyn std::error::Error>> {
    let data = DataDir::new()?;
    data.write_doc(
        "todo-settings",
        &serde_json::json!({ "theme": "neon", "opacity": 250 }),
    )?;

    let all = data.json(&["settings", "get"])?;
    assert_eq!(all["data"]["theme"], "default");
    assert_eq!(all["data"]["opacity"], 100);
    Ok(())
}

#[test]
fn focus_session_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let data = DataDir::new()?;

    let idle = data.json(&["focus", "status"])?;
    assert_eq!(idle["data"]["active"], false);

    let started = data.json(&["focus", "on"])?;
    assert_eq!(started["data"]["active"], true);
    assert_eq!(started["data"]["elapsed_minutes"], 0);
    assert_eq!(started["data"]["activity"], "active");
    assert!(data.doc_path("focus-session").exists());

    let again = data.json(&["focus", "on"])?;
    assert_eq!(again["data"]["started_at"], started["data"]["started_at"]);

    let ended = data.json(&["focus", "off"])?;
    assert_eq!(ended["data"]["active"], false);
    assert!(ended["data"]["started_at"].is_string());
    assert!(!data.doc_path("focus-session").exists());

    let nothing = data.json(&["focus", "off"])?;
    assert!(nothing["data"].get("started_at").is_none());
    Ok(())
}

#[test]
fn focus_status_reports_long_sessions() -> Result<(), Box<dyn std::error::Error>> {
    let data = DataDir::new()?;
    data.write_doc(
        "focus-session",
        &serde_json::json!({
            "startedAt": "2020-01-01T00:00:00Z",
            "lastActivityAt": "2020-01-01T00:00:00Z"
        }),
    )?;

    let status = data.json(&["focus", "status"])?;
    assert_eq!(status["data"]["active"], true);
    assert_eq!(status["data"]["activity"], "sleeping");
    assert!(status["data"]["elapsed_minutes"].as_i64().unwrap_or(0) > 120);
    Ok(())
}
