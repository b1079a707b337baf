//! Operation metrics for the `SQLite` store.

use std::time::Instant;

/// Records a count and a latency sample for one store operation.
///
/// `status` is `"success"` or `"error"`.
pub fn record_operation_metrics(operation: &'static str, start: Instant, status: &'static str) {
    metrics::counter!(
        "store_operations_total",
        "backend" => "sqlite",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "store_operation_duration_ms",
        "backend" => "sqlite",
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Records metrics for `result` and passes it through.
pub fn observe<T, E>(
    operation: &'static str,
    start: Instant,
    result: Result<T, E>,
) -> Result<T, E> {
    let status = if result.is_ok() { "success" } else { "error" };
    record_operation_metrics(operation, start, status);
    result
}
