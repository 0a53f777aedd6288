use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Level;
use tracing_subscriber::{prelude::*, EnvFilter};
use tracing_timing::{Builder, Histogram};

const HISTOGRAM_MAX_NS: u64 = 60_000_000_000;
const HISTOGRAM_SIGFIG: u8 = 3;

// Categories for timed operations
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum OperationCategory {
    Simulation,
    WeightsUpdate { subcategory: WeightsUpdateType },
    FileIO { subcategory: FileIOType },
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum WeightsUpdateType {
    ActionUpdate,
    ActionSelection,
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum FileIOType {
    CheckpointSave,
    CheckpointLoad,
    ResultsSave,
}

impl OperationCategory {
    pub fn as_str(&self) -> String {
        match self {
            OperationCategory::Simulation => "Simulation".to_string(),
            OperationCategory::WeightsUpdate { subcategory } => {
                format!("Value Table - {}", match subcategory {
                    WeightsUpdateType::ActionUpdate => "Action Update",
                    WeightsUpdateType::ActionSelection => "Action Selection",
                })
            },
            OperationCategory::FileIO { subcategory } => {
                format!("File I/O - {}", match subcategory {
                    FileIOType::CheckpointSave => "Model Save",
                    FileIOType::CheckpointLoad => "Model Load",
                    FileIOType::ResultsSave => "Results Save",
                })
            },
        }
    }
}

thread_local! {
    static TIMING_STACK: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

lazy_static! {
    static ref TIMING_ENABLED: AtomicBool = AtomicBool::new(false);
    static ref FUNCTION_TIMINGS: Arc<RwLock<HashMap<String, Histogram<u64>>>> = Arc::new(RwLock::new(HashMap::new()));
    static ref CATEGORY_TIMINGS: Arc<RwLock<HashMap<OperationCategory, Histogram<u64>>>> = Arc::new(RwLock::new(HashMap::new()));
    static ref HIERARCHICAL_TIMINGS: Arc<RwLock<HashMap<String, (Duration, usize, Vec<String>)>>> = Arc::new(RwLock::new(HashMap::new()));
}

/// Records the enclosing scope's duration when dropped.
pub struct TimingGuard {
    function_name: &'static str,
    category: OperationCategory,
    start: Instant,
    active: bool,
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if self.active {
            record_timing_end(self.function_name, self.start.elapsed(), &self.category);
        }
    }
}

pub fn start_timing(function_name: &'static str, category: OperationCategory) -> TimingGuard {
    let active = is_timing_enabled();
    if active {
        TIMING_STACK.with(|stack| stack.borrow_mut().push(function_name.to_string()));
    }
    TimingGuard {
        function_name,
        category,
        start: Instant::now(),
        active,
    }
}

fn new_histogram() -> Option<Histogram<u64>> {
    Histogram::<u64>::new_with_bounds(1, HISTOGRAM_MAX_NS, HISTOGRAM_SIGFIG).ok()
}

fn record_into<K>(map: &RwLock<HashMap<K, Histogram<u64>>>, key: K, duration_ns: u64)
where
    K: std::hash::Hash + Eq,
{
    let mut map = map.write();
    let histogram = match map.entry(key) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => match new_histogram() {
            Some(histogram) => entry.insert(histogram),
            None => return,
        },
    };
    let _ = histogram.record(duration_ns);
}

fn record_timing_end(function_name: &str, duration: Duration, category: &OperationCategory) {
    let duration_ns = duration.as_nanos().min(HISTOGRAM_MAX_NS as u128) as u64;

    TIMING_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        stack.pop();
        let mut hierarchical = HIERARCHICAL_TIMINGS.write();
        let entry = hierarchical
            .entry(function_name.to_string())
            .or_insert((Duration::from_nanos(0), 0, Vec::new()));
        entry.0 += duration;
        entry.1 += 1;
        if let Some(parent) = stack.last() {
            if !entry.2.contains(parent) {
                entry.2.push(parent.clone());
            }
        }
    });

    record_into(&**FUNCTION_TIMINGS, function_name.to_string(), duration_ns);
    record_into(&**CATEGORY_TIMINGS, category.clone(), duration_ns);
}

/// Installs the global subscriber. Safe to call more than once; later calls
/// only report that a subscriber already exists.
pub fn init_logging(enable_timing: bool, debug_logging: bool) {
    TIMING_ENABLED.store(enable_timing, Ordering::SeqCst);

    let crate_level = if debug_logging { "ludo_sim=debug" } else { "ludo_sim=info" };
    let mut env_filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());
    if let Ok(directive) = crate_level.parse() {
        env_filter = env_filter.add_directive(directive);
    }

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

    let result = match new_histogram().filter(|_| enable_timing) {
        Some(prototype) => {
            let timing_layer = Builder::default().layer(move || prototype.clone());
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .with(timing_layer.boxed());
            tracing::subscriber::set_global_default(subscriber)
        }
        None => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer);
            tracing::subscriber::set_global_default(subscriber)
        }
    };

    if let Err(e) = result {
        eprintln!("Logging already initialised: {}", e);
    }
}

pub fn is_timing_enabled() -> bool {
    TIMING_ENABLED.load(Ordering::SeqCst)
}

pub fn print_timing_report() {
    if !is_timing_enabled() {
        return;
    }

    println!("\nPerformance Report");
    println!("==================");

    println!("\nBy function:");
    let hierarchical = HIERARCHICAL_TIMINGS.read();
    let mut entries: Vec<_> = hierarchical.iter().collect();
    entries.sort_by(|a, b| b.1 .0.cmp(&a.1 .0));
    for (function_name, (total, count, parents)) in entries {
        let avg = total.div_f64(*count as f64);
        println!(
            "{}: total={:.2}s, count={}, avg={:.3}ms{}",
            function_name,
            total.as_secs_f64(),
            count,
            avg.as_secs_f64() * 1000.0,
            if parents.is_empty() {
                String::new()
            } else {
                format!("\n  Called by: {}", parents.join(", "))
            }
        );
    }

    println!("\nBy category:");
    let category_timings = CATEGORY_TIMINGS.read();
    let mut categories: Vec<_> = category_timings.iter().collect();
    categories.sort_by(|a, b| {
        let a_total = a.1.mean() * a.1.len() as f64;
        let b_total = b.1.mean() * b.1.len() as f64;
        b_total.partial_cmp(&a_total).unwrap_or(std::cmp::Ordering::Equal)
    });
    for (category, histogram) in categories {
        println!(
            "{}: mean={:.3}ms, p95={:.3}ms, p99={:.3}ms, count={}",
            category.as_str(),
            histogram.mean() / 1_000_000.0,
            histogram.value_at_quantile(0.95) as f64 / 1_000_000.0,
            histogram.value_at_quantile(0.99) as f64 / 1_000_000.0,
            histogram.len(),
        );
    }
    println!("==================\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_report_label() {
        let categories = [
            OperationCategory::Simulation,
            OperationCategory::WeightsUpdate { subcategory: WeightsUpdateType::ActionUpdate },
            OperationCategory::WeightsUpdate { subcategory: WeightsUpdateType::ActionSelection },
            OperationCategory::FileIO { subcategory: FileIOType::CheckpointSave },
            OperationCategory::FileIO { subcategory: FileIOType::CheckpointLoad },
            OperationCategory::FileIO { subcategory: FileIOType::ResultsSave },
        ];
        let labels: std::collections::HashSet<String> = categories.iter().map(|c| c.as_str()).collect();
        assert_eq!(labels.len(), categories.len());
        assert!(labels.contains("Value Table - Action Update"));
    }
}
