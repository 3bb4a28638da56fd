use std::fs;
use std::path::Path;
use tracing::info;
use yieldfolio::core::portfolio::{HoldingDraft, Portfolio};
use yieldfolio::store::PortfolioStore;
use yieldfolio::store::disk::DiskStore;
use yieldfolio::{AppCommand, HoldingAction, PortfolioAction};

mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn mock_twelvedata(server: &MockServer, endpoint: &str, symbol: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/{endpoint}")))
            .and(query_param("symbol", symbol))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    pub async fn create_twelvedata_server() -> MockServer {
        let server = MockServer::start().await;
        mock_twelvedata(
            &server,
            "quote",
            "KO",
            r#"{"symbol":"KO","name":"Coca-Cola Co","currency":"USD","close":"62.50","percent_change":"0.80"}"#,
        )
        .await;
        mock_twelvedata(
            &server,
            "quote",
            "AAPL",
            r#"{"symbol":"AAPL","name":"Apple Inc","currency":"USD","close":"190.00","percent_change":"-1.10"}"#,
        )
        .await;
        mock_twelvedata(
            &server,
            "dividends",
            "KO",
            r#"{"meta":{"symbol":"KO"},"dividends":[
                {"ex_date":"2023-03-14","payment_date":"2023-04-03","amount":0.46},
                {"ex_date":"2023-06-15","payment_date":"2023-07-03","amount":0.46}
            ]}"#,
        )
        .await;
        server
    }
}

fn write_config(dir: &Path, base_url: &str, remote_url: Option<&str>) -> String {
    let config_path = dir.join("config.yaml");
    let remote = remote_url.map_or("null".to_string(), |url| format!("\"{url}\""));
    let config_content = format!(
        r#"
        providers:
          twelvedata:
            base_url: "{}"
            api_key: "test-key"
        storage:
          remote_url: {}
        data_path: "{}"
        refresh_interval_secs: 5
    "#,
        base_url,
        remote,
        dir.join("data").display()
    );
    fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path.to_str().unwrap().to_string()
}

async fn stored_portfolios(dir: &Path) -> Vec<Portfolio> {
    let store = DiskStore::open(&dir.join("data")).expect("Failed to open disk store");
    store.load().await.expect("Failed to load portfolios")
}

async fn run(command: AppCommand, config_path: &str) {
    let result = yieldfolio::run_command(command, Some(config_path)).await;
    assert!(result.is_ok(), "Command failed with: {:?}", result.err());
}

fn add_holding(portfolio: &str, symbol: &str, shares: &str, price: &str) -> AppCommand {
    AppCommand::Holding(HoldingAction::Add {
        portfolio: portfolio.to_string(),
        draft: HoldingDraft {
            symbol: symbol.to_string(),
            isin: None,
            date: "2023-01-10".to_string(),
            shares: shares.to_string(),
            price: price.to_string(),
            fees: Some("1.5".to_string()),
        },
        amount: None,
    })
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let server = test_utils::create_twelvedata_server().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(dir.path(), &server.uri(), None);

    run(
        AppCommand::Portfolio(PortfolioAction::Create {
            name: "Dividends".to_string(),
            color: None,
        }),
        &config_path,
    )
    .await;
    run(add_holding("dividends", "ko", "10", "55"), &config_path).await;

    let portfolios = stored_portfolios(dir.path()).await;
    assert_eq!(portfolios.len(), 1);
    assert_eq!(portfolios[0].name, "Dividends");
    assert_eq!(portfolios[0].color, "#3B82F6");
    let holding = portfolios[0].holdings[0].clone();
    assert_eq!(holding.symbol, "KO");
    assert_eq!(holding.cost_basis(), 551.5);
    info!(holding_id = %holding.id, "Stored holding");

    run(
        AppCommand::Summary {
            portfolio: Some("Dividends".to_string()),
            watch: false,
        },
        &config_path,
    )
    .await;
    run(AppCommand::Income { portfolio: None }, &config_path).await;

    // Watch adds a zero-share entry at the live price
    let watch = || AppCommand::Watch {
        portfolio: "Dividends".to_string(),
        symbol: "aapl".to_string(),
    };
    run(watch(), &config_path).await;
    let portfolios = stored_portfolios(dir.path()).await;
    let watched = portfolios[0]
        .holdings
        .iter()
        .find(|h| h.symbol == "AAPL")
        .expect("AAPL should be watched");
    assert!(watched.is_watch_only());
    assert_eq!(watched.price, 190.0);

    // A second toggle removes it again
    run(watch(), &config_path).await;
    let portfolios = stored_portfolios(dir.path()).await;
    assert!(portfolios[0].holdings.iter().all(|h| h.symbol != "AAPL"));

    run(
        AppCommand::Holding(HoldingAction::Edit {
            portfolio: "Dividends".to_string(),
            holding_id: holding.id.clone(),
            draft: HoldingDraft {
                shares: "20".to_string(),
                ..Default::default()
            },
        }),
        &config_path,
    )
    .await;
    let edited = stored_portfolios(dir.path()).await[0].holdings[0].clone();
    assert_eq!(edited.id, holding.id);
    assert_eq!(edited.shares, 20.0);
    assert_eq!(edited.price, 55.0);
    assert_eq!(edited.fees, 1.5);
    assert_eq!(edited.purchase_date, holding.purchase_date);

    run(
        AppCommand::Holding(HoldingAction::Remove {
            portfolio: "Dividends".to_string(),
            holding_id: holding.id.clone(),
        }),
        &config_path,
    )
    .await;
    assert!(stored_portfolios(dir.path()).await[0].holdings.is_empty());

    run(
        AppCommand::Portfolio(PortfolioAction::Delete {
            portfolio: "Dividends".to_string(),
        }),
        &config_path,
    )
    .await;
    assert!(stored_portfolios(dir.path()).await.is_empty());
}

#[test_log::test(tokio::test)]
async fn test_summary_without_market_data() {
    // Every request fails, so values fall back to purchase prices
    let server = wiremock::MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(dir.path(), &server.uri(), None);

    run(
        AppCommand::Portfolio(PortfolioAction::Create {
            name: "Offline".to_string(),
            color: Some("#000000".to_string()),
        }),
        &config_path,
    )
    .await;
    run(add_holding("Offline", "XYZ", "3", "10"), &config_path).await;
    run(
        AppCommand::Summary {
            portfolio: None,
            watch: false,
        },
        &config_path,
    )
    .await;
    run(AppCommand::Income { portfolio: None }, &config_path).await;
}

#[test_log::test(tokio::test)]
async fn test_invalid_input_is_rejected() {
    let server = wiremock::MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(dir.path(), &server.uri(), None);

    let result = yieldfolio::run_command(
        AppCommand::Portfolio(PortfolioAction::Create {
            name: "   ".to_string(),
            color: None,
        }),
        Some(&config_path),
    )
    .await;
    assert!(result.is_err());

    run(
        AppCommand::Portfolio(PortfolioAction::Create {
            name: "Main".to_string(),
            color: None,
        }),
        &config_path,
    )
    .await;
    let result =
        yieldfolio::run_command(add_holding("Main", "KO", "-1", "50"), Some(&config_path)).await;
    assert!(result.is_err());

    let result =
        yieldfolio::run_command(add_holding("Missing", "KO", "1", "50"), Some(&config_path)).await;
    assert_eq!(
        result.unwrap_err().to_string(),
        "Portfolio not found: Missing"
    );

    assert!(stored_portfolios(dir.path()).await[0].holdings.is_empty());
}

#[test_log::test(tokio::test)]
async fn test_local_data_migrates_to_empty_remote() {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    // Start with local-only storage
    let local_config = write_config(dir.path(), &server.uri(), None);
    run(
        AppCommand::Portfolio(PortfolioAction::Create {
            name: "Local".to_string(),
            color: None,
        }),
        &local_config,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/portfolios"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/portfolios"))
        .and(body_partial_json(serde_json::json!({
            "portfolios": [{"name": "Local"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"success"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let remote_url = format!("{}/portfolios", server.uri());
    let remote_config = write_config(dir.path(), &server.uri(), Some(&remote_url));
    run(AppCommand::Portfolio(PortfolioAction::List), &remote_config).await;

    // The remote still answers empty, but the copy is not repeated
    run(AppCommand::Portfolio(PortfolioAction::List), &remote_config).await;
    assert_eq!(stored_portfolios(dir.path()).await[0].name, "Local");
}

#[test_log::test(tokio::test)]
async fn test_remote_save_failure_is_not_fatal() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/portfolios"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/portfolios"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let remote_url = format!("{}/portfolios", server.uri());
    let config_path = write_config(dir.path(), &server.uri(), Some(&remote_url));

    run(
        AppCommand::Portfolio(PortfolioAction::Create {
            name: "Resilient".to_string(),
            color: None,
        }),
        &config_path,
    )
    .await;

    // The local copy is written even though the remote rejected the save
    assert_eq!(stored_portfolios(dir.path()).await[0].name, "Resilient");
}

#[test_log::test(tokio::test)]
async fn test_add_holding_priced_from_purchase_date_close() {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    let server = test_utils::create_twelvedata_server().await;
    Mock::given(method("GET"))
        .and(path("/time_series"))
        .and(query_param("symbol", "KO"))
        .and(query_param("start_date", "2023-01-10"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"values":[{"datetime":"2023-01-11","close":"61.80"},{"datetime":"2023-01-10","close":"61.02"}],"status":"ok"}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/time_series"))
        .and(query_param("symbol", "KO"))
        .and(query_param("start_date", "2023-01-14"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"values":[{"datetime":"2023-01-17","close":"62.10"}],"status":"ok"}"#,
        ))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(dir.path(), &server.uri(), None);

    run(
        AppCommand::Portfolio(PortfolioAction::Create {
            name: "Budget".to_string(),
            color: None,
        }),
        &config_path,
    )
    .await;

    let by_amount = |symbol: &str, date: &str| {
        AppCommand::Holding(HoldingAction::Add {
            portfolio: "Budget".to_string(),
            draft: HoldingDraft {
                symbol: symbol.to_string(),
                date: date.to_string(),
                ..Default::default()
            },
            amount: Some("1000".to_string()),
        })
    };
    run(by_amount("ko", "2023-01-10"), &config_path).await;

    let holding = stored_portfolios(dir.path()).await[0].holdings[0].clone();
    assert_eq!(holding.price, 61.02);
    assert_eq!(holding.shares, 16.0);
    assert_eq!(holding.fees, 0.0);

    // No bar for that day, so nothing is added
    let result =
        yieldfolio::run_command(by_amount("KO", "2023-01-14"), Some(&config_path)).await;
    assert!(
        result
            .unwrap_err()
            .to_string()
            .starts_with("No closing price for KO on 2023-01-14")
    );
    assert_eq!(stored_portfolios(dir.path()).await[0].holdings.len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_blank_watch_symbol_makes_no_request() {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(0)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(dir.path(), &server.uri(), None);

    run(
        AppCommand::Portfolio(PortfolioAction::Create {
            name: "Main".to_string(),
            color: None,
        }),
        &config_path,
    )
    .await;
    let result = yieldfolio::run_command(
        AppCommand::Watch {
            portfolio: "Main".to_string(),
            symbol: "   ".to_string(),
        },
        Some(&config_path),
    )
    .await;
    assert_eq!(result.unwrap_err().to_string(), "Symbol must not be empty");
}
