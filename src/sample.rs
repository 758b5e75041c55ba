//! Built-in sample datasets for exploring an empty store.

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use log::info;
use serde_json::json;

use crate::{
    cli::SeedArgs,
    store::{DatasetStore, JsonStore, NewDataset, STATUS_PROCESSED},
};

struct SampleSpec {
    filename: &'static str,
    dataset_name: &'static str,
    description: &'static str,
    company_name: &'static str,
    report_period: &'static str,
    fiscal_year: i64,
    is_premium: bool,
    file_size: u64,
    upload_date: (i32, u32, u32),
    rows: serde_json::Value,
}

fn sample_specs() -> Vec<SampleSpec> {
    vec![
        SampleSpec {
            filename: "tech-startup-q1-2024.xlsx",
            dataset_name: "TechCorp Q1 2024 Financial Report",
            description:
                "Quarterly financial report for TechCorp including revenue, expenses, and growth metrics",
            company_name: "TechCorp Inc.",
            report_period: "Q1 2024",
            fiscal_year: 2024,
            is_premium: true,
            file_size: 156_780,
            upload_date: (2024, 4, 15),
            rows: json!([{
                "Year": 2024,
                "Quarter": "Q1",
                "Company": "TechCorp Inc.",
                "Industry": "Technology",
                "Revenue": 12_500_000_000u64,
                "Net_Income": 2_100_000_000u64,
                "Assets": 45_000_000_000u64,
                "Equity": 38_000_000_000u64,
                "Total_Investment": 25_000_000_000_000u64,
                "Enterprise_Value": 18_500_000_000_000u64,
                "Profit_Margin": 16.8,
                "Growth_Rate": 25.3,
                "Sales_Growth_Per_Year": 25.3,
                "Employees": 450
            }]),
        },
        SampleSpec {
            filename: "manufacturing-corp-annual-2023.xlsx",
            dataset_name: "ManufaCorp 2023 Annual Report",
            description: "Annual financial report for ManufaCorp with detailed operational metrics",
            company_name: "ManufaCorp Ltd.",
            report_period: "Annual 2023",
            fiscal_year: 2023,
            is_premium: false,
            file_size: 298_456,
            upload_date: (2024, 3, 20),
            rows: json!([{
                "Year": 2023,
                "Company": "ManufaCorp Ltd.",
                "Industry": "Manufacturing",
                "Revenue": 89_500_000_000u64,
                "Net_Income": 8_950_000_000u64,
                "Assets": 1_250_000_000_000u64,
                "Equity": 89_000_000_000u64,
                "Total_Capital": 15_600_000_000_000u64,
                "Profit_Margin": 10.0,
                "Growth_Rate": 12.7,
                "Sales_Growth_Per_Year": 12.7,
                "Employees": 1250
            }]),
        },
        SampleSpec {
            filename: "retail-chain-2023-performance.xlsx",
            dataset_name: "RetailPlus Chain 2023 Performance Analysis",
            description:
                "Comprehensive financial and operational analysis for RetailPlus chain stores",
            company_name: "RetailPlus Stores",
            report_period: "Annual 2023",
            fiscal_year: 2023,
            is_premium: true,
            file_size: 445_123,
            upload_date: (2024, 2, 28),
            rows: json!([{
                "Year": 2023,
                "Company": "RetailPlus Stores",
                "Industry": "Retail",
                "Revenue": 156_200_000u64,
                "Net_Income": 7_810_000u64,
                "Assets": 89_500_000u64,
                "Equity": 62_300_000u64,
                "Profit_Margin": 5.0,
                "Growth_Rate": 8.4,
                "Sales_Growth_Per_Year": 8.4,
                "Store_Count": 248,
                "Employees": 3200
            }]),
        },
    ]
}

/// Inserts the sample datasets. A store that already holds records is left
/// untouched so real uploads never mix with demo data unintentionally.
pub fn execute(args: &SeedArgs) -> Result<()> {
    let mut store = JsonStore::open(&args.store)
        .with_context(|| format!("Opening dataset store {:?}", args.store))?;
    if !store.is_empty() {
        println!("Store already holds datasets; skipping sample data.");
        return Ok(());
    }

    let mut inserted = 0usize;
    for spec in sample_specs() {
        let (year, month, day) = spec.upload_date;
        let record = NewDataset {
            filename: spec.filename.to_string(),
            dataset_name: spec.dataset_name.to_string(),
            description: spec.description.to_string(),
            is_premium: spec.is_premium,
            upload_date: Utc
                .with_ymd_and_hms(year, month, day, 0, 0, 0)
                .single()
                .context("Sample upload date")?,
            file_size: spec.file_size,
            file_data: serde_json::to_string(&spec.rows).context("Serializing sample rows")?,
            uploaded_by: 1,
            status: STATUS_PROCESSED.to_string(),
            company_name: Some(spec.company_name.to_string()),
            report_period: Some(spec.report_period.to_string()),
            fiscal_year: Some(spec.fiscal_year),
        };
        store
            .create(record)
            .with_context(|| format!("Inserting sample dataset '{}'", spec.dataset_name))?;
        inserted += 1;
    }

    info!("Seeded {inserted} sample dataset(s)");
    println!("Loaded {inserted} sample dataset(s).");
    Ok(())
}
