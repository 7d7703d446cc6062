use bskt::core::config::AppConfig;
use bskt::core::{
    AllocationRowDraft, IssueCode, WeightAction, compute_weight_mode_allocation, equalize_unlocked,
};
use std::fs;
use tracing::info;

mod test_utils {
    use std::fs;

    pub fn write_config(content: &str) -> tempfile::NamedTempFile {
        let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        fs::write(config_file.path(), content).expect("Failed to write config file");
        config_file
    }
}

const CONFIG: &str = r#"
baskets:
  - name: "Core"
    funds: 1000
    members:
      - symbol: "AAA"
        weight: 50
        price: 90
      - symbol: "BBB"
        weight: 50
        price: 110
  - name: "Unpriced"
    funds: 500
    members:
      - symbol: "CCC"
        weight: 100
allocation:
  min_qty_per_row: 0
"#;

#[test_log::test]
fn test_full_allocate_flow() {
    let config_file = test_utils::write_config(CONFIG);

    let result = bskt::run_command(
        bskt::AppCommand::Allocate {
            basket: None,
            json: false,
        },
        Some(config_file.path().to_str().unwrap()),
    );
    assert!(
        result.is_ok(),
        "Allocate command failed with: {:?}",
        result.err()
    );
}

#[test_log::test]
fn test_allocate_json_for_single_basket() {
    let config_file = test_utils::write_config(CONFIG);

    let result = bskt::run_command(
        bskt::AppCommand::Allocate {
            basket: Some("core".to_string()),
            json: true,
        },
        Some(config_file.path().to_str().unwrap()),
    );
    assert!(result.is_ok(), "{:?}", result.err());
}

#[test_log::test]
fn test_weights_flow() {
    let config_file = test_utils::write_config(CONFIG);

    for action in [
        WeightAction::Equalize,
        WeightAction::Normalize,
        WeightAction::Clear,
    ] {
        let result = bskt::run_command(
            bskt::AppCommand::Weights {
                action,
                basket: None,
            },
            Some(config_file.path().to_str().unwrap()),
        );
        assert!(result.is_ok(), "{action} failed with: {:?}", result.err());
    }
}

#[test_log::test]
fn test_unknown_basket_fails() {
    let config_file = test_utils::write_config(CONFIG);

    let result = bskt::run_command(
        bskt::AppCommand::Allocate {
            basket: Some("Nope".to_string()),
            json: false,
        },
        Some(config_file.path().to_str().unwrap()),
    );
    let err = result.expect_err("Unknown basket should fail");
    assert!(err.to_string().contains("No basket named 'Nope'"));
}

#[test_log::test]
fn test_missing_config_fails() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.yaml");

    let result = bskt::run_command(
        bskt::AppCommand::Allocate {
            basket: None,
            json: false,
        },
        Some(missing.to_str().unwrap()),
    );
    let err = result.expect_err("Missing config should fail");
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test_log::test]
fn test_setup_config_drives_allocation() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    bskt::cli::setup::setup_at_path(&config_path).unwrap();

    let config = AppConfig::load_from_path(&config_path).unwrap();
    let options = config.allocation.to_options();
    for basket in &config.baskets {
        let result =
            compute_weight_mode_allocation(basket.funds, &basket.drafts(), &basket.prices(), &options);
        info!(basket = %basket.name, total_cost = result.totals.total_cost, "Planned example basket");
        assert!(!result.has_errors(), "{:?}", result.issues);
        assert!(result.totals.total_cost <= basket.funds + 1e-6);
        assert!(result.totals.remaining >= -1e-6);
    }

    assert!(fs::read_to_string(&config_path).unwrap().contains("baskets:"));
}

#[test_log::test]
fn test_normalized_weights_feed_calculator() {
    let drafts = equalize_unlocked(&[
        AllocationRowDraft::new("a", "AAA", Some(40.0)).locked(),
        AllocationRowDraft::new("b", "BBB", Some(5.0)),
        AllocationRowDraft::new("c", "CCC", None),
        AllocationRowDraft::new("d", "DDD", Some(90.0)),
    ]);
    let prices = [("a", 12.5), ("b", 7.0), ("c", 31.0), ("d", 3.3)]
        .into_iter()
        .map(|(id, p)| (id.to_string(), Some(p)))
        .collect();

    let result =
        compute_weight_mode_allocation(5000.0, &drafts, &prices, &Default::default());
    assert!(!result.has_issue(IssueCode::WeightsNot100));
    assert!(!result.has_errors());
    assert!(result.totals.total_cost <= 5000.0 + 1e-6);
    assert!(result.rows.iter().all(|r| r.qty > 0));
}
