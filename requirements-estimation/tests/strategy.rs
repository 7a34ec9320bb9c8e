mod common;

use common::{calculator, llama_7b, Behavior, FakeDirectory};
use requirements_estimation::{ArchitectureConfig, CalculationKey, DataType, Method};

fn key(dtype: DataType) -> CalculationKey {
    CalculationKey::new("meta-llama/Llama-2-7b-hf", 1, 4096, dtype)
}

#[tokio::test]
async fn precise_path_uses_architecture() {
    let directory = FakeDirectory::new(Behavior::Returns(llama_7b()));
    let calculator = calculator(directory.clone());

    let result = calculator.resolve(&key(DataType::Float16), 7.0).await;
    assert_eq!(result.method, Method::Precise);
    assert_eq!(result.gigabytes, 4.0);
    assert_eq!(calculator.configs().get("meta-llama/Llama-2-7b-hf"), Some(llama_7b()));
}

#[tokio::test]
async fn repeated_resolve_hits_cache() {
    let directory = FakeDirectory::new(Behavior::Returns(llama_7b()));
    let calculator = calculator(directory.clone());

    let first = calculator.resolve(&key(DataType::Int8), 7.0).await;
    let second = calculator.resolve(&key(DataType::Int8), 7.0).await;
    assert_eq!(first, second);
    assert_eq!(directory.calls(), 1);
}

#[tokio::test]
async fn architecture_fetched_once_per_model() {
    let directory = FakeDirectory::new(Behavior::Returns(llama_7b()));
    let calculator = calculator(directory.clone());

    for dtype in DataType::ALL {
        calculator.resolve(&key(dtype), 7.0).await;
    }
    let longer = CalculationKey::new("meta-llama/Llama-2-7b-hf", 4, 8192, DataType::Int4);
    assert_eq!(calculator.resolve(&longer, 7.0).await.gigabytes, 8.0);
    assert_eq!(directory.calls(), 1);
    assert_eq!(calculator.results().len(), 4);
}

#[tokio::test]
async fn failed_fetch_falls_back_to_estimate() {
    let directory = FakeDirectory::new(Behavior::Fails);
    let calculator = calculator(directory.clone());

    let key = CalculationKey::new("private/gated-3b", 1, 4096, DataType::Float16);
    let result = calculator.resolve(&key, 3.0).await;
    assert_eq!(result.method, Method::Estimated);
    assert_eq!(result.gigabytes, 2.05);
    assert!(calculator.configs().is_empty());

    // The fallback value is cached too; no retry.
    assert_eq!(calculator.resolve(&key, 3.0).await, result);
    assert_eq!(directory.calls(), 1);
}

#[tokio::test]
async fn zero_attention_heads_falls_back_to_estimate() {
    let degenerate = ArchitectureConfig {
        hidden_size: 4096,
        num_attention_heads: 0,
        num_hidden_layers: 32,
        num_key_value_heads: 0,
    };
    let directory = FakeDirectory::new(Behavior::Returns(degenerate));
    let calculator = calculator(directory);

    let result = calculator.resolve(&key(DataType::Float16), 7.0).await;
    assert_eq!(result.method, Method::Estimated);
    assert_eq!(result.gigabytes, 4.1);
}

#[tokio::test]
async fn forced_estimate_skips_directory() {
    let directory = FakeDirectory::new(Behavior::Returns(llama_7b()));
    let calculator = calculator(directory.clone()).with_forced_estimate(true);

    let result = calculator.resolve(&key(DataType::Int4), 25.0).await;
    assert_eq!(result.method, Method::Estimated);
    // 2.0 * 4.096 * 0.25
    assert_eq!(result.gigabytes, 2.05);
    assert_eq!(directory.calls(), 0);
}

#[tokio::test]
async fn alias_spellings_share_a_cache_entry() {
    let directory = FakeDirectory::new(Behavior::Returns(llama_7b()));
    let calculator = calculator(directory.clone());

    let via_q4 = CalculationKey::new("m", 2, 2048, DataType::normalize("q4").unwrap());
    let via_int4 = CalculationKey::new("m", 2, 2048, DataType::normalize("INT4").unwrap());
    let first = calculator.resolve(&via_q4, 7.0).await;
    let second = calculator.resolve(&via_int4, 7.0).await;
    assert_eq!(first, second);
    assert_eq!(calculator.results().len(), 1);
}

fn oversized() -> ArchitectureConfig {
    ArchitectureConfig {
        num_hidden_layers: u64::MAX / 1024,
        ..llama_7b()
    }
}

#[tokio::test]
async fn overflowing_architecture_falls_back_to_estimate() {
    let directory = FakeDirectory::new(Behavior::Returns(oversized()));
    let calculator = calculator(directory);

    let result = calculator.resolve(&key(DataType::Float16), 7.0).await;
    assert_eq!(result.method, Method::Estimated);
    assert_eq!(result.gigabytes, 4.1);
    assert_eq!(calculator.results().get(&key(DataType::Float16)), Some(result));
}
