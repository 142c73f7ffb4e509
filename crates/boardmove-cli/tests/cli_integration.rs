use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const KANBAN_EXPORT: &str = r#"{
    "version": "2.0.0",
    "exportDate": "2024-03-01T10:00:00Z",
    "platform": "taskcards",
    "board": {
        "title": "Sprint",
        "type": "kanban",
        "columns": [
            {"title": "To Do", "cards": [
                {"title": "Write tests", "content": "cover the importer"},
                {"title": "Review", "content": ""}
            ]},
            {"title": "Done", "cards": [
                {"title": "Ship", "content": "release notes\nand changelog"}
            ]}
        ]
    }
}"#;

const WHITEBOARD_EXPORT: &str = r#"{
    "version": "2.0.0",
    "board": {
        "title": "Canvas",
        "type": "chalkboard",
        "cards": [
            {"title": "Low", "content": "", "position": {"x": 10, "y": 500, "width": 100, "height": 80}},
            {"title": "High", "content": "", "position": {"x": 400, "y": 20, "width": 100, "height": 80}}
        ],
        "connections": [{"label": "leads to"}]
    }
}"#;

const KANBAN_PAGE: &str = r#"
<html><head><title>Retro - TaskCards</title></head><body>
<div class="kanban-list-container">
  <div class="draggableList">
    <div class="board-list-header"><div class="contenteditable">Gut</div></div>
    <div class="draggableCard"><div class="board-card">
      <div class="board-card-header"><div class="contenteditable">Pairing</div></div>
      <div class="board-card-content"><div class="contenteditable">hat geholfen</div></div>
    </div></div>
  </div>
</div></body></html>
"#;

fn boardmove() -> Command {
    let mut cmd = Command::cargo_bin("boardmove").unwrap();
    cmd.env_remove("BOARDMOVE_CONFIG")
        .env_remove("BOARDMOVE_CONNECT")
        .env_remove("BOARDMOVE_DEBUG_LOG");
    cmd
}

fn parse_json_output(output: &str) -> Value {
    serde_json::from_str(output).expect("Failed to parse JSON output")
}

fn write_file(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

fn run_json(args: &[&str]) -> Value {
    let output = boardmove()
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    parse_json_output(&String::from_utf8_lossy(&output))
}

mod inspect_tests {
    use super::*;

    #[test]
    fn test_inspect_kanban_export() {
        let dir = tempdir().unwrap();
        let file = write_file(dir.path(), "board.json", KANBAN_EXPORT);

        let json = run_json(&["inspect", &file]);

        assert!(json["success"].as_bool().unwrap());
        assert_eq!(json["data"]["title"], "Sprint");
        assert_eq!(json["data"]["type"], "kanban");
        assert_eq!(json["data"]["platform"], "taskcards");
        assert_eq!(json["data"]["stats"]["totalColumns"], 2);
        assert_eq!(json["data"]["stats"]["totalCards"], 3);
    }

    #[test]
    fn test_inspect_chalkboard_is_whiteboard() {
        let dir = tempdir().unwrap();
        let file = write_file(dir.path(), "board.json", WHITEBOARD_EXPORT);

        let json = run_json(&["inspect", &file]);

        assert_eq!(json["data"]["type"], "whiteboard");
        assert_eq!(json["data"]["stats"]["totalConnections"], 1);
    }

    #[test]
    fn test_inspect_malformed_export_fails() {
        let dir = tempdir().unwrap();
        let file = write_file(dir.path(), "broken.json", r#"{"version": "2.0.0"}"#);

        boardmove()
            .args(["inspect", &file])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("\"success\":false"))
            .stderr(predicate::str::contains("no board found"));
    }

    #[test]
    fn test_inspect_missing_file_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.json");

        boardmove()
            .args(["inspect", missing.to_str().unwrap()])
            .assert()
            .failure()
            .stderr(predicate::str::contains("\"success\":false"));
    }
}

mod plan_tests {
    use super::*;

    #[test]
    fn test_plan_lists_columns_in_order() {
        let dir = tempdir().unwrap();
        let file = write_file(dir.path(), "board.json", KANBAN_EXPORT);

        let json = run_json(&["plan", &file]);

        let columns = json["data"]["columns"].as_array().unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0]["title"], "To Do");
        assert_eq!(columns[0]["cards"][1], "Review");
        assert_eq!(json["data"]["totalCards"], 3);
        assert!(json["data"].get("warnings").is_none());
    }

    #[test]
    fn test_plan_whiteboard_orders_top_to_bottom() {
        let dir = tempdir().unwrap();
        let file = write_file(dir.path(), "board.json", WHITEBOARD_EXPORT);

        let json = run_json(&["plan", &file]);

        let columns = json["data"]["columns"].as_array().unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0]["title"], "Canvas");
        assert_eq!(columns[0]["cards"][0], "High");
        assert_eq!(columns[0]["cards"][1], "Low");
        assert!(json["data"]["warnings"][0]
            .as_str()
            .unwrap()
            .contains("1 connections"));
    }
}

mod migrate_tests {
    use super::*;

    #[test]
    fn test_dry_run_migrates_into_simulated_board() {
        let dir = tempdir().unwrap();
        let file = write_file(dir.path(), "board.json", KANBAN_EXPORT);

        let output = boardmove()
            .args(["migrate", &file, "--dry-run"])
            .assert()
            .success()
            .stderr(predicate::str::contains("[column 1/2] To Do"))
            .stderr(predicate::str::contains("Migration complete: 2 columns, 3 cards"))
            .get_output()
            .stdout
            .clone();
        let json = parse_json_output(&String::from_utf8_lossy(&output));

        let report = &json["data"]["report"];
        assert_eq!(report["columnsCreated"], 2);
        assert_eq!(report["cardsCreated"], 3);
        assert_eq!(report["perItemErrors"].as_array().unwrap().len(), 0);

        let columns = json["data"]["simulatedColumns"].as_array().unwrap();
        assert_eq!(columns[0]["title"], "To Do");
        assert_eq!(columns[0]["cards"][0]["body"], "cover the importer");
        assert_eq!(columns[1]["cards"][0]["body"], "release notes\nand changelog");
    }

    #[test]
    fn test_quiet_dry_run_prints_no_progress() {
        let dir = tempdir().unwrap();
        let file = write_file(dir.path(), "board.json", KANBAN_EXPORT);

        boardmove()
            .args(["migrate", &file, "--dry-run", "--quiet"])
            .assert()
            .success()
            .stderr(predicate::str::contains("[column").not());
    }

    #[test]
    fn test_trace_actions_prints_actions() {
        let dir = tempdir().unwrap();
        let file = write_file(dir.path(), "board.json", KANBAN_EXPORT);

        boardmove()
            .args(["migrate", &file, "--dry-run", "--trace-actions"])
            .assert()
            .success()
            .stderr(predicate::str::contains("    > click"));
    }

    #[test]
    fn test_migrate_requires_url_without_dry_run() {
        let dir = tempdir().unwrap();
        let file = write_file(dir.path(), "board.json", KANBAN_EXPORT);

        boardmove()
            .args(["migrate", &file])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--url"));
    }

    #[test]
    fn test_malformed_board_is_rejected_before_migrating() {
        let dir = tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "board.json",
            r#"{"board": {"title": "X", "type": "kanban", "cards": []}}"#,
        );

        boardmove()
            .args(["migrate", &file, "--dry-run"])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("\"success\":false"));
    }
}

mod extract_tests {
    use super::*;

    #[test]
    fn test_extract_saved_page_to_file() {
        let dir = tempdir().unwrap();
        let page = write_file(dir.path(), "page.html", KANBAN_PAGE);
        let out = dir.path().join("export.json");

        let json = run_json(&["extract", "--html", &page, "--output", out.to_str().unwrap()]);
        assert_eq!(json["data"]["file"], out.to_str().unwrap());

        let written = parse_json_output(&fs::read_to_string(&out).unwrap());
        assert_eq!(written["board"]["type"], "kanban");
        assert_eq!(written["board"]["columns"][0]["title"], "Gut");
        assert_eq!(written["board"]["columns"][0]["cards"][0]["title"], "Pairing");

        // The written file is itself a valid migration input.
        let inspected = run_json(&["inspect", out.to_str().unwrap()]);
        assert_eq!(inspected["data"]["stats"]["totalCards"], 1);
    }

    #[test]
    fn test_extract_prints_export_without_output() {
        let dir = tempdir().unwrap();
        let page = write_file(dir.path(), "page.html", KANBAN_PAGE);

        let json = run_json(&["extract", "--html", &page]);

        assert_eq!(json["data"]["export"]["board"]["columns"][0]["title"], "Gut");
        assert!(json["data"].get("file").is_none());
    }

    #[test]
    fn test_extract_needs_a_source() {
        boardmove().args(["extract"]).assert().failure();
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn test_config_init_then_show() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path_str = path.to_str().unwrap();

        run_json(&["--config", path_str, "config", "init"]);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("[timing]"));
        assert!(content.contains("[selectors]"));

        let json = run_json(&["--config", path_str, "config", "show"]);
        assert_eq!(json["data"]["source"], path_str);
        assert_eq!(json["data"]["retry"]["max_attempts"], 2);
        assert_eq!(json["data"]["selectors"]["add_card_text"], "Karte hinzufügen");
    }

    #[test]
    fn test_config_init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "config.toml", "[retry]\nmax_attempts = 5\n");

        boardmove()
            .args(["--config", &path, "config", "init"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));

        run_json(&["--config", &path, "config", "init", "--force"]);
        assert!(fs::read_to_string(&path).unwrap().contains("max_attempts = 2"));
    }

    #[test]
    fn test_config_show_reads_overrides() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "config.toml",
            "[timing]\ninter_card_delay_ms = 50\n\n[selectors]\nadd_card_text = \"Add card\"\n",
        );

        let json = run_json(&["--config", &path, "config", "show"]);

        assert_eq!(json["data"]["timing"]["inter_card_delay_ms"], 50);
        assert_eq!(json["data"]["timing"]["close_delay_ms"], 400);
        assert_eq!(json["data"]["selectors"]["add_card_text"], "Add card");
    }

    #[test]
    fn test_explicit_config_must_parse() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "config.toml", "[timing\n");

        boardmove()
            .args(["--config", &path, "config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to load config"));
    }
}

mod completions_tests {
    use super::*;

    #[test]
    fn test_bash_completions() {
        boardmove()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("boardmove"));
    }
}
