//! Scroll command implementation.
//!
//! Plays the rendering side: walks the display slots of each snapshot, reports
//! each access to the pager, and runs the loads it asks for on the blocking
//! pool while rendering continues.

use pagefill_core::{
    slot_key, BackfillMediator, ItemKey, LoadOutcome, LoadType, Pager, PagingConfig, PagingData,
    PagingResult, SyntheticFetcher, UiItem,
};
use pagefill_storage::{FileRecordStore, InMemoryRecordStore, Key, RecordStore};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

type LoadTask = (LoadType, PagingResult<LoadOutcome>);

/// Scroll settings.
#[derive(Debug, Clone)]
pub struct ScrollOptions {
    /// Number of records to scroll past.
    pub count: usize,
    /// Simulated fetch latency.
    pub latency: Duration,
    /// Exclusive upper bound of the remote source.
    pub limit: Option<Key>,
    /// Keep existing records instead of clearing the store.
    pub keep: bool,
    /// Paging configuration.
    pub config: PagingConfig,
}

/// Summary of a scroll session.
#[derive(Debug, Default, Serialize)]
pub struct ScrollReport {
    /// Store description.
    pub store: String,
    /// Records rendered.
    pub records_shown: usize,
    /// Separators rendered.
    pub separators_shown: usize,
    /// Times the consumer waited on an unloaded slot.
    pub placeholders_shown: usize,
    /// Loads dispatched to the blocking pool.
    pub loads_dispatched: usize,
    /// Loads that found their direction busy.
    pub loads_coalesced: usize,
    /// Loads that failed.
    pub loads_failed: usize,
    /// Windows fetched from the remote source.
    pub windows_fetched: u64,
    /// Records inserted into the store.
    pub records_inserted: u64,
    /// Paged sources created, including replacements after invalidation.
    pub sources_created: u64,
    /// Records in the store at the end.
    pub stored: usize,
    /// Whether the remote source ran out.
    pub end_of_pagination_reached: bool,
}

/// Runs the scroll command.
pub fn run(
    path: Option<&Path>,
    options: &ScrollOptions,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    options.config.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let echo = format != "json";

    let report = match path {
        Some(path) => {
            let store = Arc::new(FileRecordStore::open(path)?);
            runtime.block_on(scroll(store, path.display().to_string(), options, echo))?
        }
        None => {
            let store = Arc::new(InMemoryRecordStore::new());
            runtime.block_on(scroll(store, "memory".to_string(), options, echo))?
        }
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(&report);
        }
    }

    Ok(())
}

async fn scroll<S: RecordStore + 'static>(
    store: Arc<S>,
    label: String,
    options: &ScrollOptions,
    echo: bool,
) -> Result<ScrollReport, Box<dyn std::error::Error>> {
    if !options.keep {
        store.clear()?;
    }

    let mut fetcher = SyntheticFetcher::new().with_latency(options.latency);
    if let Some(limit) = options.limit {
        fetcher = fetcher.with_limit(limit);
    }
    let mediator = BackfillMediator::new(Arc::clone(&store), fetcher);
    let pager = Arc::new(Pager::new(options.config, store, mediator)?);

    let mut report = ScrollReport {
        store: label,
        ..ScrollReport::default()
    };
    let mut pending: JoinSet<LoadTask> = JoinSet::new();
    let mut dispatched = [false; 3];
    let mut last_shown: Option<Key> = None;
    let mut waiting_on: Option<ItemKey> = None;
    let mut retried = false;

    info!(count = options.count, "scrolling");

    while report.records_shown < options.count {
        collect_finished(&mut pending, &mut dispatched, &mut report).await?;

        let snapshot = pager.snapshot();
        let next = next_slot(&snapshot, last_shown);
        let position = next.position();
        for load_type in pager.access(position) {
            if !dispatched[load_type.index()] {
                dispatch(&mut pending, &pager, load_type);
                dispatched[load_type.index()] = true;
                report.loads_dispatched += 1;
            }
        }

        let placeholder = match next {
            NextSlot::Item {
                separators, item, ..
            } => {
                for separator in separators {
                    if echo {
                        println!("  {}", separator);
                    }
                    report.separators_shown += 1;
                }
                if echo {
                    println!("  {}", item);
                }
                last_shown = item.value();
                waiting_on = None;
                report.records_shown += 1;
                retried = false;
                continue;
            }
            NextSlot::Placeholder { key, .. } => Some(key),
            NextSlot::End { .. } => None,
        };

        if pending.is_empty() {
            let states = pager.load_states();
            if states.append.end_of_pagination_reached() {
                report.end_of_pagination_reached = true;
                break;
            }
            if states.append.is_error() {
                if retried {
                    return Err(format!("load failed twice: {:?}", states.append).into());
                }
                retried = true;
            }
            dispatch(&mut pending, &pager, LoadType::Append);
            dispatched[LoadType::Append.index()] = true;
            report.loads_dispatched += 1;
        }

        let key = placeholder.unwrap_or(ItemKey::Placeholder(position));
        if waiting_on.as_ref() != Some(&key) {
            if echo {
                println!("  ... (loading)");
            }
            debug!(?key, "waiting on slot");
            report.placeholders_shown += 1;
            waiting_on = Some(key);
        }

        if let Some(joined) = pending.join_next().await {
            record_finished(joined?, &mut dispatched, &mut report);
        }
    }

    while let Some(joined) = pending.join_next().await {
        record_finished(joined?, &mut dispatched, &mut report);
    }

    let stats = pager.mediator().stats();
    report.windows_fetched = stats.windows_fetched;
    report.records_inserted = stats.records_inserted;
    report.sources_created = pager.sources_created();
    report.stored = pager.store().len()?;
    Ok(report)
}

/// The slot the consumer renders next.
#[derive(Debug, PartialEq, Eq)]
enum NextSlot {
    /// A loaded record, preceded by the separators leading up to it.
    Item {
        position: usize,
        separators: Vec<UiItem>,
        item: UiItem,
    },
    /// An unloaded slot inside the stored range.
    Placeholder { position: usize, key: ItemKey },
    /// Nothing past the loaded window.
    End { position: usize },
}

impl NextSlot {
    /// Record-space position, counting leading placeholders.
    fn position(&self) -> usize {
        match self {
            NextSlot::Item { position, .. }
            | NextSlot::Placeholder { position, .. }
            | NextSlot::End { position } => *position,
        }
    }
}

/// Walks the display slots of `snapshot` to the first one past the record
/// `after`. Separators do not count toward the record position.
fn next_slot(snapshot: &PagingData, after: Option<Key>) -> NextSlot {
    let mut position = 0;
    let mut passed = after.is_none();
    let mut separators = Vec::new();

    for (display, slot) in snapshot.slots().enumerate() {
        match slot {
            Some(item) if item.is_separator() => {
                if passed {
                    separators.push(item);
                }
            }
            Some(item) => {
                let fresh = match (item.value(), after) {
                    (Some(value), Some(after)) => value > after,
                    _ => true,
                };
                if fresh {
                    return NextSlot::Item {
                        position,
                        separators,
                        item,
                    };
                }
                passed = true;
                separators.clear();
                position += 1;
            }
            None if passed => {
                return NextSlot::Placeholder {
                    position,
                    key: slot_key(display, None),
                };
            }
            None => position += 1,
        }
    }
    NextSlot::End { position }
}

fn dispatch<S, M>(pending: &mut JoinSet<LoadTask>, pager: &Arc<Pager<S, M>>, load_type: LoadType)
where
    S: RecordStore + 'static,
    M: pagefill_core::RemoteMediator + 'static,
{
    debug!(load = %load_type, "dispatching load");
    let pager = Arc::clone(pager);
    pending.spawn_blocking(move || (load_type, pager.load(load_type)));
}

/// Reaps loads that already finished without waiting for the rest.
async fn collect_finished(
    pending: &mut JoinSet<LoadTask>,
    dispatched: &mut [bool; 3],
    report: &mut ScrollReport,
) -> Result<(), tokio::task::JoinError> {
    loop {
        tokio::select! {
            biased;
            Some(joined) = pending.join_next() => {
                record_finished(joined?, dispatched, report);
            }
            () = std::future::ready(()) => return Ok(()),
        }
    }
}

fn record_finished(task: LoadTask, dispatched: &mut [bool; 3], report: &mut ScrollReport) {
    let (load_type, result) = task;
    dispatched[load_type.index()] = false;
    match result {
        Ok(LoadOutcome::Coalesced) => report.loads_coalesced += 1,
        Ok(outcome) => debug!(load = %load_type, ?outcome, "load finished"),
        Err(err) => {
            warn!(load = %load_type, error = %err, "load failed");
            report.loads_failed += 1;
        }
    }
}

fn print_text_output(report: &ScrollReport) {
    println!();
    println!("PageFill Scroll Summary");
    println!("=======================");
    println!();
    println!("Store: {}", report.store);
    println!();
    println!("Rendered:");
    println!("  Records:      {}", report.records_shown);
    println!("  Separators:   {}", report.separators_shown);
    println!("  Placeholders: {}", report.placeholders_shown);
    println!();
    println!("Loads:");
    println!("  Dispatched:   {}", report.loads_dispatched);
    println!("  Coalesced:    {}", report.loads_coalesced);
    println!("  Failed:       {}", report.loads_failed);
    println!();
    println!("Backfill:");
    println!("  Windows:      {}", report.windows_fetched);
    println!("  Inserted:     {}", report.records_inserted);
    println!("  Sources:      {}", report.sources_created);
    println!("  Stored:       {}", report.stored);
    if report.end_of_pagination_reached {
        println!();
        println!("Reached the end of the remote source.");
    }
}
