use crate::domain::payment::PaymentRow;
use crate::domain::session::DispatchSession;

/// What a run over a dataset should actually do, given any prior session.
///
/// Distinguishes "nothing to do because the dataset is empty" from "nothing
/// to do because every row already has an outcome".
#[derive(Debug, Clone, PartialEq)]
pub enum RunPlan {
    EmptyDataset,
    AlreadyComplete,
    Dispatch { rows: Vec<PaymentRow> },
}

/// Resume protocol: dispatch only rows whose `original_index` is not yet in
/// the session's processed set.
pub fn plan_run(rows: &[PaymentRow], session: Option<&DispatchSession>) -> RunPlan {
    if rows.is_empty() {
        return RunPlan::EmptyDataset;
    }
    let remaining: Vec<PaymentRow> = match session {
        Some(session) => rows
            .iter()
            .filter(|r| !session.processed_indices.contains(&r.original_index))
            .cloned()
            .collect(),
        None => rows.to_vec(),
    };
    if remaining.is_empty() {
        RunPlan::AlreadyComplete
    } else {
        RunPlan::Dispatch { rows: remaining }
    }
}

/// Retry-failed protocol: removes every failed outcome from the session log,
/// drops their indices from the processed set, zeroes the failure count, and
/// returns the freed indices in ascending order.
///
/// This is the only sanctioned way a row is processed more than once.
pub fn extract_failed(session: &mut DispatchSession) -> Vec<usize> {
    let failed: Vec<usize> = session
        .outcomes
        .iter()
        .filter(|o| !o.succeeded)
        .map(|o| o.original_index)
        .collect();
    session.outcomes.retain(|o| o.succeeded);
    for index in &failed {
        session.processed_indices.remove(index);
    }
    session.failure_count = 0;
    debug_assert!(session.is_consistent());

    let mut indices = failed;
    indices.sort_unstable();
    indices
}

/// Selects the dataset rows carrying the given original indices, preserving
/// dataset order. Indices are stable, so a retry run is planned from the
/// re-ingested dataset rather than from persisted row copies.
pub fn select_rows(rows: &[PaymentRow], indices: &[usize]) -> Vec<PaymentRow> {
    debug_assert!(indices.is_sorted());
    rows.iter()
        .filter(|r| indices.binary_search(&r.original_index).is_ok())
        .cloned()
        .collect()
}
