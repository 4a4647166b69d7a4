//! Integration tests for the leadboard CLI.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const LEADS: &str = r#"[
  {
    "id": "L1",
    "name": "Ana Torres",
    "contact": { "phone": "+54 9 11 5555-0101", "email": "ana@example.com" },
    "property_id": "P1",
    "status": "new",
    "source": "zonaprop",
    "priority": "high",
    "created_at": "2024-03-01T10:00:00Z",
    "updated_at": "2024-03-01T10:00:00Z"
  },
  {
    "id": "L2",
    "name": "Bruno Diaz",
    "contact": {},
    "property_id": "P2",
    "status": "new",
    "source": "referral",
    "created_at": "2024-03-02T10:00:00Z",
    "updated_at": "2024-03-02T10:00:00Z"
  },
  {
    "id": "L3",
    "name": "Carla Gomez",
    "status": "contacted",
    "created_at": "2024-03-03T10:00:00Z",
    "updated_at": "2024-03-03T10:00:00Z"
  }
]"#;

/// Helper to create a leadboard Command isolated from the caller's env
fn leadboard(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("leadboard");
    cmd.current_dir(dir.path())
        .env_remove("LEADBOARD_LEADS_FILE")
        .env_remove("LEADBOARD_MUTATION_TIMEOUT_MS")
        .env_remove("LEADBOARD_ACTIVATION_DISTANCE")
        .env_remove("LEADBOARD_LOG")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to initialize a project seeded with three leads
fn seeded_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    leadboard(&dir).arg("init").assert().success();
    fs::write(dir.path().join(".leadboard/leads.json"), LEADS).unwrap();
    dir
}

fn stored_status(dir: &TempDir, id: &str) -> String {
    let content = fs::read_to_string(dir.path().join(".leadboard/leads.json")).unwrap();
    let leads: serde_json::Value = serde_json::from_str(&content).unwrap();
    leads
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["id"] == id)
        .map(|l| l["status"].as_str().unwrap().to_string())
        .unwrap()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        cargo_bin_cmd!("leadboard").arg("--help").assert().success();
    }

    #[test]
    fn test_version() {
        cargo_bin_cmd!("leadboard")
            .arg("--version")
            .assert()
            .success();
    }

    #[test]
    fn test_init_creates_structure() {
        let dir = TempDir::new().unwrap();

        leadboard(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized lead board"));

        assert!(dir.path().join(".leadboard/leadboard.toml").exists());
        assert!(dir.path().join(".leadboard/leads.json").exists());
    }

    #[test]
    fn test_init_idempotent() {
        let dir = seeded_project();

        leadboard(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already initialized"));

        // Existing leads are kept
        let content = fs::read_to_string(dir.path().join(".leadboard/leads.json")).unwrap();
        assert!(content.contains("Ana Torres"));
    }
}

// =============================================================================
// Board Tests
// =============================================================================

mod board {
    use super::*;

    #[test]
    fn test_board_lists_columns() {
        let dir = seeded_project();

        leadboard(&dir)
            .arg("board")
            .assert()
            .success()
            .stdout(predicate::str::contains("NEW"))
            .stdout(predicate::str::contains("Ana Torres"))
            .stdout(predicate::str::contains("CONTACTED"))
            .stdout(predicate::str::contains("LOST"));
    }

    #[test]
    fn test_board_json_filters_by_source() {
        let dir = seeded_project();

        let output = leadboard(&dir)
            .args(["board", "--json", "--source", "referral"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let columns: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let columns = columns.as_array().unwrap();
        assert_eq!(columns.len(), 6);
        assert_eq!(columns[0]["status"], "new");
        let new_leads = columns[0]["leads"].as_array().unwrap();
        assert_eq!(new_leads.len(), 1);
        assert_eq!(new_leads[0]["id"], "L2");
    }

    #[test]
    fn test_add_puts_lead_in_new_column() {
        let dir = seeded_project();

        leadboard(&dir)
            .args(["add", "Dora Paz", "--phone", "555-0199", "--source", "website"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Added"));

        leadboard(&dir)
            .args(["board", "--search", "dora"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Dora Paz"));
    }

    #[test]
    fn test_add_rejects_unknown_source() {
        let dir = seeded_project();

        leadboard(&dir)
            .args(["add", "Eve", "--source", "billboard"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid lead source"));
    }
}

// =============================================================================
// Move / Activity Tests
// =============================================================================

mod moves {
    use super::*;

    #[test]
    fn test_move_persists_and_records_activity() {
        let dir = seeded_project();

        leadboard(&dir)
            .args(["move", "L1", "contacted"])
            .assert()
            .success()
            .stdout(predicate::str::contains("new -> contacted"));

        assert_eq!(stored_status(&dir, "L1"), "contacted");

        leadboard(&dir)
            .args(["activity", "L1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("status_change"))
            .stdout(predicate::str::contains(
                "Status changed from \"new\" to \"contacted\"",
            ));

        let audit = fs::read_to_string(dir.path().join(".leadboard/activity.jsonl")).unwrap();
        assert_eq!(audit.lines().count(), 1);
    }

    #[test]
    fn test_move_to_same_status_is_noop() {
        let dir = seeded_project();

        leadboard(&dir)
            .args(["move", "L3", "contacted"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already in contacted"));

        assert!(!dir.path().join(".leadboard/activity.jsonl").exists());
    }

    #[test]
    fn test_move_rejects_unknown_status() {
        let dir = seeded_project();

        leadboard(&dir)
            .args(["move", "L1", "archived"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid status"));

        assert_eq!(stored_status(&dir, "L1"), "new");
    }

    #[test]
    fn test_move_unknown_lead_fails() {
        let dir = seeded_project();

        leadboard(&dir)
            .args(["move", "L99", "lost"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("L99"));
    }

    #[test]
    fn test_reorder_within_column_is_not_saved() {
        let dir = seeded_project();

        leadboard(&dir)
            .args(["reorder", "L1", "--onto", "L2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("1. L2"))
            .stdout(predicate::str::contains("2. L1"));

        assert_eq!(stored_status(&dir, "L1"), "new");
        assert!(!dir.path().join(".leadboard/activity.jsonl").exists());
    }

    #[test]
    fn test_reorder_across_columns_is_refused() {
        let dir = seeded_project();

        leadboard(&dir)
            .args(["reorder", "L1", "--onto", "L3"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("different columns"));
    }
}

// =============================================================================
// Quick Action Tests
// =============================================================================

mod contact {
    use super::*;

    #[test]
    fn test_contact_prints_uris() {
        let dir = seeded_project();

        leadboard(&dir)
            .args(["contact", "L1", "call"])
            .assert()
            .success()
            .stdout(predicate::str::contains("tel:+54 9 11 5555-0101"));

        leadboard(&dir)
            .args(["contact", "L1", "whatsapp"])
            .assert()
            .success()
            .stdout(predicate::str::contains("https://wa.me/5491155550101"));

        leadboard(&dir)
            .args(["contact", "L1", "email"])
            .assert()
            .success()
            .stdout(predicate::str::contains("mailto:ana@example.com"));
    }

    #[test]
    fn test_contact_without_details_is_noop() {
        let dir = seeded_project();

        leadboard(&dir)
            .args(["contact", "L2", "call"])
            .assert()
            .success()
            .stdout(predicate::str::contains("no contact details"));
    }

    #[test]
    fn test_contact_unknown_action_fails() {
        let dir = seeded_project();

        leadboard(&dir)
            .args(["contact", "L1", "fax"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid quick action"));
    }
}

// =============================================================================
// UI / Config Tests
// =============================================================================

mod settings {
    use super::*;

    #[test]
    fn test_ui_theme_and_sidebar_persist() {
        let dir = seeded_project();

        leadboard(&dir)
            .args(["ui", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("theme = \"system\""));

        leadboard(&dir).args(["ui", "theme", "dark"]).assert().success();
        leadboard(&dir)
            .args(["ui", "toggle-sidebar"])
            .assert()
            .success()
            .stdout(predicate::str::contains("collapsed"));

        leadboard(&dir)
            .args(["ui", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("theme = \"dark\""))
            .stdout(predicate::str::contains("sidebar_collapsed = true"));
    }

    #[test]
    fn test_ui_rejects_unknown_theme() {
        let dir = seeded_project();

        leadboard(&dir)
            .args(["ui", "theme", "sepia"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid theme"));
    }

    #[test]
    fn test_config_show_reflects_env_override() {
        let dir = seeded_project();

        leadboard(&dir)
            .env("LEADBOARD_MUTATION_TIMEOUT_MS", "1500")
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains("mutation_timeout_ms = 10000"))
            .stdout(predicate::str::contains("mutation_timeout_ms = 1500"));
    }

    #[test]
    fn test_config_validate_warns_on_zero_timeout() {
        let dir = seeded_project();
        fs::write(
            dir.path().join(".leadboard/leadboard.toml"),
            "[board]\nmutation_timeout_ms = 0\n",
        )
        .unwrap();

        leadboard(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("mutation_timeout_ms is 0"));
    }

    #[test]
    fn test_leads_file_flag_overrides_config() {
        let dir = seeded_project();
        let other = dir.path().join("other.json");
        fs::write(&other, "[]").unwrap();

        leadboard(&dir)
            .args(["board", "--json", "--leads-file"])
            .arg(&other)
            .assert()
            .success()
            .stdout(predicate::str::contains("Ana Torres").not());
    }
}
