use std::error::Error;
use std::sync::Arc;

use prettytable::{row, Table};
use requirements_estimation::memory::base_memory_gb;
use requirements_estimation::{
    ArchitectureCache, CalculationKey, Calculator, DataType, HuggingFaceDirectory, KvEstimate, ModelDirectory,
    ModelSummary, ResultCache, Settings,
};

use crate::utils::{format_thousands, per_user};

type BoxError = Box<dyn Error + Send + Sync>;

pub struct EstimateRequest<'a> {
    pub model: &'a str,
    /// `None` reports every supported type.
    pub dtype: Option<DataType>,
    pub users: u32,
    pub context_length: u32,
    pub verbose: bool,
}

struct Row {
    dtype: DataType,
    base: f64,
    kv: KvEstimate,
}

impl Row {
    fn total(&self) -> f64 {
        self.base + self.kv.gigabytes
    }
}

pub async fn run_estimate(settings: &Settings, request: &EstimateRequest<'_>) -> Result<(), BoxError> {
    let directory: Arc<dyn ModelDirectory> =
        Arc::new(HuggingFaceDirectory::new(&settings.api_url, settings.request_timeout)?);
    let summary = directory.fetch_model_summary(request.model).await?;

    let calculator = Calculator::new(
        Arc::clone(&directory),
        Arc::new(ArchitectureCache::new()),
        Arc::new(ResultCache::new(settings.cache_ttl)),
    )
    .with_forced_estimate(settings.force_estimate);

    let dtypes = request.dtype.map_or_else(|| DataType::ALL.to_vec(), |dtype| vec![dtype]);
    let mut rows = Vec::with_capacity(dtypes.len());
    for dtype in dtypes {
        let key = CalculationKey::new(summary.model_id.clone(), request.users, request.context_length, dtype);
        let kv = calculator.resolve(&key, summary.parameters_b).await;
        rows.push(Row {
            dtype,
            base: base_memory_gb(summary.parameters_b, dtype),
            kv,
        });
    }

    if request.verbose {
        print_model_information(&summary);
    }
    match rows.as_slice() {
        [row] if request.verbose => print_breakdown(row, request),
        [row] => {
            println!("Estimated GPU memory requirement for {}:", summary.model_id);
            println!("- Total: {:.2} GB ({})", row.total(), row.dtype);
            println!("- Per User: {:.2} GB", per_user(row.kv.gigabytes, request.users));
        }
        rows => {
            if !request.verbose {
                println!("Estimated GPU memory requirement for {}:", summary.model_id);
            }
            print_table(rows, request);
        }
    }
    Ok(())
}

pub async fn run_list(settings: &Settings, search: Option<&str>) -> Result<(), BoxError> {
    let directory = HuggingFaceDirectory::new(&settings.api_url, settings.request_timeout)?;
    let model_ids = match search {
        Some(query) => directory.search_models(query).await?,
        None => directory.list_models().await?,
    };
    if model_ids.is_empty() {
        eprintln!("No models found.");
    }
    for model_id in model_ids {
        println!("{model_id}");
    }
    Ok(())
}

fn print_model_information(summary: &ModelSummary) {
    println!("\nModel Information:");
    println!("- Model ID: {}", summary.model_id);
    println!("- Author: {}", summary.author);
    println!("- Parameters: {:.2}B", summary.parameters_b);
    println!("- Downloads: {}", format_thousands(summary.downloads));
    println!("- Likes: {}", format_thousands(summary.likes));
}

fn print_breakdown(row: &Row, request: &EstimateRequest<'_>) {
    println!("\nMemory Requirements:");
    println!("- Data Type: {}", row.dtype);
    println!("- Base Model Memory: {:.2} GB", row.base);
    println!("- KV Cache Memory: {:.2} GB ({})", row.kv.gigabytes, row.kv.method.label());
    println!("- KV Cache Per User: {:.2} GB", per_user(row.kv.gigabytes, request.users));
    println!("- Total GPU Memory: {:.2} GB", row.total());
    println!("- Users: {}", request.users);
    println!("- Context Length: {} tokens", request.context_length);
}

fn print_table(rows: &[Row], request: &EstimateRequest<'_>) {
    if request.verbose {
        println!("\nMemory Requirements ({} users, {} tokens):", request.users, request.context_length);
    }
    let mut table = Table::new();
    table.add_row(row!["Data Type", "Base", "KV Cache", "Total", "Per User", "KV Method"]);
    for row in rows {
        table.add_row(row![
            row.dtype,
            format!("{:.2} GB", row.base),
            format!("{:.2} GB", row.kv.gigabytes),
            format!("{:.2} GB", row.total()),
            format!("{:.2} GB", per_user(row.kv.gigabytes, request.users)),
            row.kv.method.label()
        ]);
    }
    table.printstd();
}
