//! The crawl itself (spec.md §4.10): iterate companies × years × report
//! codes, skip what `seed_progress` already marks done, checkpoint as it
//! goes, and stop at a company boundary on interrupt.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Datelike;
use krfin_core::config::ConfigDir;
use krfin_core::env::{get_env_flag, get_env_var};
use krfin_core::{Provider, Secret};
use krfin_dart::DartClient;
use krfin_kis::{Environment, KisClient};
use krfin_resolver::CorpMapping;
use krfin_tools::NoopConceptMapper;

use crate::opt::IngestArgs;
use crate::store::Store;

const DART_BASE_URL: &str = "https://opendart.fss.or.kr";
const DART_API_KEY_VAR: &str = "DART_API_KEY";
const KIS_APP_KEY_VAR: &str = "KIS_APP_KEY";
const KIS_APP_SECRET_VAR: &str = "KIS_APP_SECRET";
const KIS_SANDBOX_VAR: &str = "KIS_SANDBOX";

/// The annual report code is the only one every listed company is
/// guaranteed to file every year (spec.md §4.9 "Period derivation":
/// `11012`/`11013`/`11014` exist only for companies that report
/// semi-annually or quarterly beyond Q1).
const REPORT_CODES: &[&str] = &["11011"];

/// A small, stable seed list used when no `corp-codes.json` master list
/// has been downloaded yet (spec.md's corp-code bulk archive is a ZIP;
/// unzipping it is explicitly left to the caller by
/// `DartClient::fetch_corp_code_archive`, and no archive crate is part
/// of this workspace's dependency stack — see `DESIGN.md`).
fn fallback_companies() -> Vec<CorpMapping> {
    [
        ("00126380", "삼성전자", Some("005930")),
        ("00164779", "SK하이닉스", Some("000660")),
        ("00401731", "카카오", Some("035720")),
        ("00164788", "NAVER", Some("035420")),
        ("00126362", "현대자동차", Some("005380")),
    ]
    .into_iter()
    .map(|(code, name, ticker)| CorpMapping {
        corp_code: code.to_string(),
        corp_name: name.to_string(),
        stock_code: ticker.map(str::to_string),
        modify_date: "20260101".to_string(),
    })
    .collect()
}

fn load_companies(config: &ConfigDir) -> Vec<CorpMapping> {
    krfin_resolver::persistence::load_from_cache(config.corp_codes_file()).unwrap_or_else(|_| fallback_companies())
}

fn response_key(corp_code: &str, report_code: &str, year: i32) -> String {
    format!("dart:fs:{corp_code}:{year}:{report_code}")
}

/// Runs the crawl and returns the process exit code (spec.md §6: `0`
/// success including clean interrupt, `1` unrecoverable failure).
///
/// # Errors
///
/// Returns an error only for failures that aren't modeled as an exit
/// code by the caller (store open failure, DART client construction).
pub async fn run(args: IngestArgs) -> anyhow::Result<i32> {
    let config = ConfigDir::resolve();
    config.ensure()?;
    let output = args.output.clone().unwrap_or_else(|| config.ingest_db_file());
    let store = Store::open(&output).await?;

    if args.reset {
        store.reset().await?;
        tracing::info!(path = %output.display(), "ingest database reset");
        return Ok(0);
    }

    if args.status {
        let progress = store.progress().await?;
        println!(
            "companies seeded: {}\nresponses written: {}",
            progress.companies_seen, progress.responses_written
        );
        return Ok(0);
    }

    let dart_key = match get_env_var(DART_API_KEY_VAR) {
        Ok(key) => key,
        Err(err) => {
            tracing::error!(%err, "missing required DART credential");
            return Ok(1);
        }
    };

    let dart_client = DartClient::new(
        Secret::new(dart_key),
        DART_BASE_URL,
        config.disk_cache_file(Provider::Dart),
        config.rate_limit_file(Provider::Dart),
    )
    .await?;

    let kis_client = build_kis_client(&config).await?;
    if kis_client.is_none() {
        tracing::info!("KIS credentials not set; price tool functions excluded from this run");
    }

    let companies: Vec<CorpMapping> = load_companies(&config).into_iter().take(args.companies).collect();
    for mapping in &companies {
        store.upsert_corp_mapping(mapping).await?;
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&interrupted);
    // Written directly from the graceful-interrupt contract (spec.md
    // §4.10): a flag set on signal, checked at the company boundary.
    if let Err(err) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst)) {
        tracing::warn!(%err, "failed to install interrupt handler; SIGINT will terminate immediately");
    }

    let concept_mapper = NoopConceptMapper;
    let current_year = chrono::Utc::now().year();
    let years: Vec<i32> = ((current_year - args.years + 1)..=current_year).collect();
    let market_open = krfin_core::time::is_market_open(chrono::Utc::now());

    'companies: for mapping in &companies {
        if let (Some(kis), Some(ticker)) = (&kis_client, &mapping.stock_code) {
            match krfin_tools::get_price_snapshot(kis, ticker, market_open).await {
                Ok(outcome) => {
                    let now_millis = chrono::Utc::now().timestamp_millis();
                    let payload = serde_json::to_value(&outcome.data).unwrap_or(serde_json::Value::Null);
                    let key = format!("kis:price:{ticker}");
                    store.save_response(&key, &payload, Provider::Kis.slug(), now_millis).await?;
                }
                Err(err) => {
                    tracing::warn!(%ticker, %err, "price snapshot fetch failed");
                }
            }
        }

        for &year in &years {
            for &report_code in REPORT_CODES {
                if store.is_done(&mapping.corp_code, report_code, year).await? {
                    continue;
                }

                let result = krfin_tools::get_financial_statements(
                    &dart_client,
                    &concept_mapper,
                    &mapping.corp_code,
                    &year.to_string(),
                    report_code,
                    None,
                    false,
                )
                .await;

                let now_millis = chrono::Utc::now().timestamp_millis();
                match result {
                    Ok(outcome) => {
                        let payload = serde_json::to_value(&outcome.data).unwrap_or(serde_json::Value::Null);
                        let key = response_key(&mapping.corp_code, report_code, year);
                        store.save_response(&key, &payload, Provider::Dart.slug(), now_millis).await?;
                        store.mark_done(&mapping.corp_code, report_code, year, now_millis).await?;
                    }
                    Err(err) => {
                        tracing::warn!(
                            corp_code = %mapping.corp_code, %year, report_code, %err,
                            "financial statement fetch failed; leaving unmarked for retry",
                        );
                    }
                }
            }
        }

        if interrupted.load(Ordering::SeqCst) {
            tracing::info!("interrupt received; stopping after current company");
            break 'companies;
        }
    }

    store.set_meta("last_run_completed_at", &chrono::Utc::now().to_rfc3339()).await?;
    Ok(0)
}

async fn build_kis_client(config: &ConfigDir) -> anyhow::Result<Option<KisClient>> {
    let (Ok(appkey), Ok(appsecret)) = (get_env_var(KIS_APP_KEY_VAR), get_env_var(KIS_APP_SECRET_VAR)) else {
        return Ok(None);
    };
    let environment = if get_env_flag(KIS_SANDBOX_VAR) { Environment::Sandbox } else { Environment::Production };
    let client = KisClient::new(
        Secret::new(appkey),
        Secret::new(appsecret),
        environment,
        config.kis_token_file(),
        config.disk_cache_file(Provider::Kis),
        config.rate_limit_file(Provider::Kis),
    )
    .await?;
    Ok(Some(client))
}
