use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use rust_decimal::Decimal;
use serde_json::Value;
use staffquote_cli::commands::{approver, check_rules, config, price};
use staffquote_core::DiscountType;
use tempfile::TempDir;

const CATALOG: &str = r#"
[[job_profiles]]
id = "job-driver"
name = "Heavy Vehicle Driver"
base_cost = 100
category = "logistics"

[[cost_components]]
id = "accommodation"
name = "Accommodation"
value = 20
calculation_method = "fixed"
periodicity = "monthly"

[[pricing_rules]]
id = "accommodation"
name = "Accommodation"
priority = 30

[[pricing_rules.actions]]
type = "add_cost_component"
params = { component_id = "accommodation" }

[[pricing_rules]]
id = "markup"
name = "Standard markup"
priority = 20

[[pricing_rules.actions]]
type = "apply_markup_percentage"
params = { value = 10 }

[[pricing_rules]]
id = "volume"
name = "Volume discount"
priority = 10

[pricing_rules.conditions]
all = [{ fact = "line_item.quantity", operator = "greater_than_or_equal", value = 2 }]

[[pricing_rules.actions]]
type = "apply_discount_percentage"
params = { value = 5 }

[[discount_approvals]]
discount_type = "line_item"
min_percentage = 0
max_percentage = 10
approver_role_id = "sales-manager"

[[discount_approvals]]
discount_type = "line_item"
min_percentage = 10
max_percentage = 25
approver_role_id = "sales-director"

[[approver_roles]]
id = "sales-manager"
name = "Sales Manager"

[[approver_roles]]
id = "sales-director"
name = "Sales Director"

[[approver_roles]]
id = "ceo"
name = "Chief Executive"
"#;

const REQUEST: &str = r#"{
  "lines": [
    {"job_profile_id": "job-driver", "nationality": "PK", "duration_months": 6, "quantity": 2, "requested_discount_pct": 12}
  ]
}"#;

struct Workspace {
    _dir: TempDir,
    catalog: PathBuf,
    request: PathBuf,
}

fn workspace(catalog: &str, request: &str) -> Workspace {
    let dir = TempDir::new().expect("temp dir");
    let catalog_path = dir.path().join("catalog.toml");
    let request_path = dir.path().join("request.json");
    fs::write(&catalog_path, catalog).expect("write catalog");
    fs::write(&request_path, request).expect("write request");
    Workspace { _dir: dir, catalog: catalog_path, request: request_path }
}

#[test]
fn price_reports_reference_figures_and_line_approval() {
    let files = workspace(CATALOG, REQUEST);

    with_env(&[("STAFFQUOTE_PRICING_CURRENCY", "SAR")], || {
        let result = price::run(&files.catalog, &files.request, "2026-10-19".parse().ok());
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "price");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["currency"], "SAR");

        let line = &payload["data"]["lines"][0]["breakdown"];
        assert_eq!(line["monthly_per_unit"], "125.40");
        assert_eq!(line["total_monthly_cost"], "250.80");
        assert_eq!(line["subtotal"], "1504.80");

        let approvals = payload["data"]["approvals"].as_array().expect("approvals array");
        assert_eq!(approvals.len(), 1);
        assert_eq!(approvals[0]["route"]["kind"], "required");
        assert_eq!(approvals[0]["route"]["role_id"], "sales-director");
    });
}

#[test]
fn price_rejects_unknown_job_profile() {
    let files = workspace(
        CATALOG,
        r#"{"lines": [{"job_profile_id": "job-pilot", "duration_months": 1, "quantity": 1}]}"#,
    );

    with_env(&[], || {
        let result = price::run(&files.catalog, &files.request, None);
        assert_eq!(result.exit_code, 5);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "bad_request");
    });
}

#[test]
fn price_rejects_out_of_range_quantity_before_pricing() {
    let files = workspace(
        CATALOG,
        r#"{"lines": [{"job_profile_id": "job-driver", "duration_months": 12, "quantity": 9223372036854775807}]}"#,
    );

    with_env(&[], || {
        let result = price::run(&files.catalog, &files.request, None);
        assert_eq!(result.exit_code, 5);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "bad_request");
        assert!(payload["message"].as_str().unwrap_or_default().contains("quantity"));
    });
}

#[test]
fn price_returns_config_failure_for_bad_env() {
    let files = workspace(CATALOG, REQUEST);

    with_env(&[("STAFFQUOTE_PRICING_CURRENCY", "riyal")], || {
        let result = price::run(&files.catalog, &files.request, None);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn strict_ingestion_rejects_unknown_action_and_lenient_prices_anyway() {
    let catalog = CATALOG.replace("apply_markup_percentage", "apply_surcharge");
    let files = workspace(&catalog, REQUEST);

    with_env(&[], || {
        let result = price::run(&files.catalog, &files.request, None);
        assert_eq!(result.exit_code, 3);
        assert_eq!(parse_payload(&result.output)["error_class"], "rule_validation");
    });

    with_env(&[("STAFFQUOTE_PRICING_INGESTION_MODE", "lenient")], || {
        let result = price::run(&files.catalog, &files.request, None);
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["lines"][0]["breakdown"]["markup_pct"], "0");
    });
}

#[test]
fn approver_resolves_role_name_from_catalog() {
    let files = workspace(CATALOG, REQUEST);

    with_env(&[], || {
        let result = approver::run(&files.catalog, Decimal::new(10, 0), DiscountType::LineItem);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["route"]["role_id"], "sales-manager");
        assert_eq!(payload["data"]["approver"]["name"], "Sales Manager");
    });
}

#[test]
fn approver_escalates_uncovered_discount_when_configured() {
    let files = workspace(CATALOG, REQUEST);

    with_env(
        &[
            ("STAFFQUOTE_APPROVALS_UNCOVERED_POLICY", "escalate"),
            ("STAFFQUOTE_APPROVALS_ESCALATION_ROLE", "ceo"),
        ],
        || {
            let result = approver::run(&files.catalog, Decimal::new(40, 0), DiscountType::LineItem);
            assert_eq!(result.exit_code, 0);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["data"]["route"]["kind"], "uncovered");
            assert_eq!(payload["data"]["route"]["escalate_to"], "ceo");
            assert_eq!(payload["data"]["approver"]["name"], "Chief Executive");
        },
    );
}

#[test]
fn approver_needs_nothing_for_a_zero_discount() {
    let files = workspace(CATALOG, REQUEST);

    with_env(&[], || {
        let result = approver::run(&files.catalog, Decimal::ZERO, DiscountType::OverallQuote);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["route"]["kind"], "not_required");
        assert!(payload["data"]["approver"].is_null());
    });
}

#[test]
fn check_rules_lists_problems() {
    let catalog = CATALOG
        .replace("greater_than_or_equal", "matches_regex")
        .replace("max_percentage = 25", "max_percentage = 10");
    let files = workspace(&catalog, REQUEST);

    with_env(&[], || {
        let result = check_rules::run(&files.catalog);
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "rule_validation");
        let problems = payload["data"]["problems"].as_array().expect("problems array");
        assert_eq!(problems.len(), 2);
    });
}

#[test]
fn check_rules_passes_clean_catalog() {
    let files = workspace(CATALOG, REQUEST);

    with_env(&[], || {
        let result = check_rules::run(&files.catalog);
        assert_eq!(result.exit_code, 0);
        assert_eq!(parse_payload(&result.output)["status"], "ok");
    });
}

#[test]
fn check_rules_reports_missing_catalog() {
    with_env(&[], || {
        let result = check_rules::run(&PathBuf::from("does-not-exist.toml"));
        assert_eq!(result.exit_code, 4);
        assert_eq!(parse_payload(&result.output)["error_class"], "catalog_load");
    });
}

#[test]
fn config_attributes_env_sources() {
    with_env(
        &[("STAFFQUOTE_PRICING_CURRENCY", "AED"), ("STAFFQUOTE_LOG_LEVEL", "debug")],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0);
            let output = result.output;

            assert!(output.contains(
                "- pricing.currency = AED (source: env (STAFFQUOTE_PRICING_CURRENCY))"
            ));
            assert!(output.contains("- logging.level = debug (source: env (STAFFQUOTE_LOG_LEVEL))"));
            assert!(output.contains("- approvals.escalation_role = <unset> (source: default)"));
        },
    );
}

#[test]
fn config_ignores_blank_env_values_for_attribution() {
    with_env(&[("STAFFQUOTE_PRICING_CURRENCY", "  "), ("STAFFQUOTE_LOGGING_LEVEL", "")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);

        assert!(result.output.contains("- pricing.currency = USD (source: default)"));
        assert!(result.output.contains("- logging.level = info (source: default)"));
    });
}

#[test]
fn config_reports_validation_failure_as_json() {
    with_env(&[("STAFFQUOTE_PRICING_DISPLAY_SCALE", "9")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "STAFFQUOTE_PRICING_CURRENCY",
        "STAFFQUOTE_PRICING_DISPLAY_SCALE",
        "STAFFQUOTE_PRICING_INGESTION_MODE",
        "STAFFQUOTE_APPROVALS_UNCOVERED_POLICY",
        "STAFFQUOTE_APPROVALS_ESCALATION_ROLE",
        "STAFFQUOTE_LOGGING_LEVEL",
        "STAFFQUOTE_LOGGING_FORMAT",
        "STAFFQUOTE_LOG_LEVEL",
        "STAFFQUOTE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
