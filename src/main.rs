use clap::Parser;
use epias_energy::config::{ApiCommand, Command, PriceSeries};
use epias_energy::core::export::{export_bundle, render_table};
use epias_energy::core::processors;
use epias_energy::domain::ports::Storage;
use epias_energy::domain::request::DateRange;
use epias_energy::domain::table::Table;
use epias_energy::manifest;
use epias_energy::utils::error::{EpiasError, ErrorSeverity, Result};
use epias_energy::utils::{logger, validation::Validate};
use epias_energy::{
    CliConfig, DataFetcher, DatasetPipeline, DatasetQuery, EpiasClient, EtlEngine, LocalStorage,
    Settings,
};

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn print_table(table: &Table) -> Result<()> {
    let text = String::from_utf8_lossy(&render_table(table, "tsv")?).into_owned();
    print!("{}", text);
    Ok(())
}

fn load_settings(config: &CliConfig) -> Result<Settings> {
    let mut settings = Settings::load(config.config.as_deref())?;
    config.apply_to(&mut settings);
    settings.validate()?;
    tracing::debug!("Settings: {:?}", settings);
    Ok(settings)
}

fn fetcher(settings: &Settings) -> Result<DataFetcher> {
    Ok(DataFetcher::new(EpiasClient::from_settings(settings)?))
}

/// Returns whether the manifest was clean.
fn check_manifest(path: &std::path::Path, as_json: bool) -> Result<bool> {
    let report = manifest::lint_file(path)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report.issues)?);
    } else {
        for issue in &report.issues {
            println!("{}: {}", path.display(), issue);
        }
        println!(
            "{} dependencies, {} issues",
            report.entries.len(),
            report.issues.len()
        );
    }
    Ok(report.is_clean())
}

async fn run(config: CliConfig) -> Result<bool> {
    match &config.command {
        Command::CheckManifest { path, json } => check_manifest(path, *json),
        Command::Api(command) => {
            let settings = load_settings(&config)?;
            run_api_command(command.clone(), &settings).await?;
            Ok(true)
        }
    }
}

async fn run_api_command(command: ApiCommand, settings: &Settings) -> Result<()> {
    let storage = LocalStorage::new(&settings.output.path);
    let fetcher = fetcher(settings)?;

    match command {
        ApiCommand::Organizations { dates } => {
            let range = dates.resolve(today())?;
            let organizations = fetcher.fetch_organizations(&range).await?;
            print_table(&Table::from_rows("organizations", &organizations))?;
        }
        ApiCommand::PowerPlants => {
            let plants = fetcher.fetch_power_plants().await?;
            print_table(&Table::from_rows("power_plants", &plants))?;
        }
        ApiCommand::Uevcb { org } => {
            let units = fetcher.fetch_uevcb_list(org).await?;
            print_table(&Table::from_rows("uevcb", &units))?;
        }
        ApiCommand::Fetch {
            dataset,
            org,
            power_plant,
            province,
            period,
            dates,
            ..
        } => {
            let mut query = DatasetQuery::new(dates.resolve(today())?);
            query.organization_id = org;
            query.power_plant_id = power_plant;
            query.province_id = province;
            query.period = period;
            query.validate_for(dataset)?;

            let pipeline = DatasetPipeline::new(
                fetcher,
                storage,
                dataset,
                query,
                settings.output.formats.clone(),
            );
            let output_path = EtlEngine::new(pipeline).run().await?;
            println!("✅ {} exported to {}", dataset, output_path);
        }
        ApiCommand::Dashboard => {
            for (name, metrics) in fetcher.fetch_dashboard().await {
                println!("== {} ==", name);
                print_table(&Table::from_rows(name, &metrics))?;
            }
        }
        ApiCommand::Overview { org, dates } => {
            let range = dates.resolve(today())?;
            let overview = fetcher.fetch_organization_overview(org, &range).await;

            let tables = vec![
                Table::from_rows("uevcb", &overview.uevcb_list),
                Table::from_rows("generation", &overview.generation),
                Table::from_rows(
                    "generation_by_type",
                    &processors::aggregate_generation_by_type(&overview.generation),
                ),
                Table::from_rows("kgup", &overview.kgup),
                Table::from_rows("ptf", &overview.ptf),
                Table::from_rows("smf", &overview.smf),
            ];
            for table in &tables {
                println!("{:<20} {:>8} rows", table.name, table.len());
            }

            let archive = overview_archive_name(org, &range);
            storage
                .write_file(&archive, &export_bundle(&tables, &settings.output.formats)?)
                .await?;
            println!("✅ Overview exported to {}", storage.describe(&archive));
        }
        ApiCommand::Stats { market, dates } => {
            let range = dates.resolve(today())?;
            let traded = market.market();
            tracing::info!(
                "{} ({}) statistics for {}",
                traded.code(),
                traded.description(),
                range
            );
            let prices: Vec<f64> = match market {
                PriceSeries::Ptf => fetcher.fetch_ptf(&range).await?.iter().map(|r| r.price).collect(),
                PriceSeries::Smf => fetcher
                    .fetch_smf(&range)
                    .await?
                    .iter()
                    .map(|r| r.up_price)
                    .collect(),
            };

            match processors::price_statistics(&prices) {
                Some(stats) => println!("{}", serde_json::to_string_pretty(&stats)?),
                None => {
                    return Err(EpiasError::ValidationError {
                        message: format!("no prices returned for {}", range),
                    })
                }
            }
        }
    }

    Ok(())
}

fn overview_archive_name(org: u64, range: &DateRange) -> String {
    format!(
        "overview_{}_{}_{}.zip",
        org,
        range.start().format("%Y%m%d"),
        range.end().format("%Y%m%d")
    )
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting epias CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match run(config).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!(
                "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 1,      // 輸入錯誤
                ErrorSeverity::Medium => 2,   // 可重試
                ErrorSeverity::High => 1,     // 處理錯誤
                ErrorSeverity::Critical => 3, // 系統錯誤
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}
