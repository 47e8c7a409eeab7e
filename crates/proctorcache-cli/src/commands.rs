//! Command implementations.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use proctorcache_core::api::DataSource;
use proctorcache_core::cache::{
    scope_to_assessment, submissions_key, subscribe, MutationCoordinator, Queries, QueryCache,
};
use proctorcache_core::models::{Assessment, Record, Submission};
use proctorcache_core::table::{
    actions, ActionHandler, ColumnSpec, DataTable, FilterSpec, RowAction,
};
use proctorcache_core::utils::{
    format_date, format_date_only, format_relative_time, format_time_only,
};
use proctorcache_core::{Config, MemoryStore};

use crate::cli::{Command, TableArgs};
use crate::output::{render_filter_options, render_table};

/// Everything a command needs, built once from the config.
struct Context {
    config: Config,
    store: Arc<MemoryStore>,
    cache: Arc<QueryCache>,
    queries: Queries<MemoryStore>,
    mutations: MutationCoordinator<MemoryStore>,
}

impl Context {
    fn new(config: Config) -> Result<Self> {
        let store = MemoryStore::from_path(&config.data_path)
            .with_context(|| format!("Failed to open data source: {}", config.data_path.display()))?
            .with_latency(config.latency());
        let store = Arc::new(store);
        let cache = Arc::new(QueryCache::new());
        let queries = Queries::new(Arc::clone(&store), Arc::clone(&cache))
            .with_stale_time(config.stale_time());
        let mutations = MutationCoordinator::new(Arc::clone(&store), Arc::clone(&cache));
        Ok(Self {
            config,
            store,
            cache,
            queries,
            mutations,
        })
    }

    async fn assessment(&self, id: &str) -> Result<Assessment> {
        self.queries
            .assessment(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("An assessment id is required"))
    }

    /// Submissions listed by the assessment, fetched through the cache.
    async fn scoped_submissions(&self, assessment: &Assessment) -> Result<Vec<Submission>> {
        let submissions = self
            .queries
            .submissions(Some(&assessment.id))
            .await?
            .unwrap_or_default();
        Ok(scope_to_assessment(submissions, assessment))
    }
}

pub async fn run(command: Command, config: Config) -> Result<()> {
    let ctx = Context::new(config)?;
    let result = match command {
        Command::Assessments(args) => list_assessments(&ctx, &args).await,
        Command::Submissions {
            assessment_id,
            table,
        } => list_submissions(&ctx, &assessment_id, &table).await,
        Command::Action {
            assessment_id,
            submission_id,
            action,
        } => perform_action(&ctx, &assessment_id, &submission_id, &action).await,
        Command::Watch {
            assessment_id,
            ticks,
            interval_secs,
        } => {
            let interval = interval_secs
                .map(|s| Duration::from_secs(s.max(1)))
                .unwrap_or_else(|| ctx.config.poll_interval());
            watch(&ctx, &assessment_id, ticks, interval).await
        }
    };
    ctx.cache.dispose();
    result
}

// ============================================================================
// Tables
// ============================================================================

fn assessment_table() -> DataTable<Assessment> {
    DataTable::new(vec![
        ColumnSpec::new("assessmentName", "Assessment").sortable(),
        ColumnSpec::new("course", "Course").sortable(),
        ColumnSpec::new("program", "Program").sortable(),
        ColumnSpec::new("areaName", "Area").sortable(),
        ColumnSpec::new("examStatus", "Status")
            .sortable()
            .with_render(|_, a: &Assessment| a.exam_status.display_name().to_string()),
        ColumnSpec::new("startDate", "Start")
            .sortable()
            .with_render(|_, a: &Assessment| format_date_only(&a.start_date)),
        ColumnSpec::new("endDate", "Ends")
            .sortable()
            .with_render(|_, a: &Assessment| format_date(&a.end_date)),
        ColumnSpec::new("submissionIds", "Submissions")
            .with_render(|_, a: &Assessment| a.submission_count().to_string()),
        ColumnSpec::new("id", "ID"),
    ])
}

fn submission_table() -> DataTable<Submission> {
    DataTable::new(vec![
        ColumnSpec::new("id", "ID").sortable(),
        ColumnSpec::new("user", "Full Name").sortable(),
        ColumnSpec::new("loginTime", "Login")
            .sortable()
            .with_render(|_, s: &Submission| format_time_only(&s.login_time)),
        ColumnSpec::new("started", "Started")
            .with_render(|_, s: &Submission| if s.started { "Yes" } else { "No" }.to_string()),
        ColumnSpec::new("questionSynced", "Synced").sortable(),
        ColumnSpec::new("timeElapsed", "Elapsed").sortable(),
        ColumnSpec::new("status", "Status").sortable(),
        ColumnSpec::new("overallSessionHealth", "Health").sortable(),
        ColumnSpec::new("browser", "Browser"),
    ])
    .with_row_actions(actions::resolve)
}

fn apply_table_args<R: Record>(table: &mut DataTable<R>, args: &TableArgs, default_page_size: usize) {
    for (key, value) in &args.filters {
        table.set_filter(key, value);
    }
    if let Some(key) = &args.sort {
        table.toggle_sort(key);
        if args.desc {
            table.toggle_sort(key);
        }
    }
    table.set_page_size(args.page_size.unwrap_or(default_page_size));
    table.set_page(args.page);
}

async fn list_assessments(ctx: &Context, args: &TableArgs) -> Result<()> {
    let assessments = ctx.queries.assessments().await?;
    let filters = vec![
        FilterSpec::from_records("areaName", "Area", &assessments),
        FilterSpec::from_records("program", "Program", &assessments),
        FilterSpec::from_records("examStatus", "Exam Status", &assessments),
    ];
    print!("{}", render_filter_options(&filters));
    println!();

    let mut table = assessment_table().with_filters(filters);
    apply_table_args(&mut table, args, ctx.config.page_size);
    print!("{}", render_table(&table.render(&assessments)));
    Ok(())
}

async fn list_submissions(ctx: &Context, assessment_id: &str, args: &TableArgs) -> Result<()> {
    let assessment = ctx.assessment(assessment_id).await?;
    let submissions = ctx.scoped_submissions(&assessment).await?;
    info!(
        assessment_id,
        count = submissions.len(),
        "Loaded submissions"
    );

    let filters = vec![
        FilterSpec::from_records("status", "Status", &submissions),
        FilterSpec::from_records("groupName", "Group", &submissions),
        FilterSpec::from_records("areaName", "Area", &submissions),
        FilterSpec::from_records("examinee", "Examinee", &submissions),
    ];
    println!("{} ({})", assessment.assessment_name, assessment.course);
    println!(
        "{}",
        schedule_line(&assessment.start_date, &assessment.end_date, Utc::now())
    );
    print!("{}", render_filter_options(&filters));
    println!();

    let mut table = submission_table().with_filters(filters);
    apply_table_args(&mut table, args, ctx.config.page_size);
    print!("{}", render_table(&table.render(&submissions)));

    let state = ctx
        .queries
        .submissions_state(Some(&assessment.id));
    if let Some(age) = state.age_display() {
        println!("Updated {}", age);
    }
    Ok(())
}

/// "Started 3 hours ago, ends May 1, 2024, 11:00 AM"
fn schedule_line(start: &str, end: &str, now: DateTime<Utc>) -> String {
    format!(
        "Started {}, ends {}",
        format_relative_time(start, now),
        format_date(end)
    )
}

// ============================================================================
// Actions
// ============================================================================

/// Collects notifications and the unlock request raised while dispatching.
#[derive(Default)]
struct CliActionHandler {
    unlock_requested: Option<String>,
    notifications: Vec<String>,
}

impl ActionHandler<Submission> for CliActionHandler {
    fn unlock(&mut self, record: &Submission) {
        self.unlock_requested = Some(record.id.clone());
    }

    fn notify(&mut self, message: String) {
        self.notifications.push(message);
    }
}

async fn perform_action(
    ctx: &Context,
    assessment_id: &str,
    submission_id: &str,
    action: &str,
) -> Result<()> {
    let assessment = ctx.assessment(assessment_id).await?;
    let submissions = ctx.scoped_submissions(&assessment).await?;
    let Some(submission) = submissions.iter().find(|s| s.id == submission_id) else {
        bail!(
            "Submission {} is not part of assessment {}",
            submission_id,
            assessment_id
        );
    };

    let permitted = actions::resolve(submission);
    if RowAction::parse(action).is_some() && !permitted.iter().any(|a| a.value == action) {
        let available: Vec<&str> = permitted.iter().map(|a| a.value.as_str()).collect();
        bail!(
            "Action '{}' is not available for submission {} (status {}); available: {}",
            action,
            submission_id,
            submission.status,
            available.join(", ")
        );
    }

    let mut handler = CliActionHandler::default();
    actions::dispatch(action, submission, &mut handler);

    for message in &handler.notifications {
        println!("{}", message);
    }

    if let Some(id) = handler.unlock_requested {
        match ctx.mutations.unlock(&id).await {
            Ok(updated) => println!("Unlocked {}: status is now {}", updated.id, updated.status),
            Err(e) => {
                // Prior cache state is intact; report and fail
                let state = ctx.mutations.state();
                debug!(?state, "Mutation state after failure");
                bail!("Failed to unlock submission {}: {}", id, e);
            }
        }
        let cached = ctx
            .cache
            .read::<Vec<Submission>>(&submissions_key(&assessment.id))
            .unwrap_or_default();
        if let Some(s) = cached.iter().find(|s| s.id == id) {
            println!("Cached status: {}", s.status);
        }
    }
    Ok(())
}

// ============================================================================
// Polling
// ============================================================================

/// Count submissions per status, in status name order.
fn status_summary(submissions: &[Submission]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for s in submissions {
        *counts.entry(s.status.as_str()).or_default() += 1;
    }
    counts
        .iter()
        .map(|(status, n)| format!("{}: {}", status, n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Poll the assessment's submissions, write every snapshot into the cache
/// and print a summary per tick. Cancels after `ticks` deliveries.
async fn watch(ctx: &Context, assessment_id: &str, ticks: usize, interval: Duration) -> Result<()> {
    let assessment = ctx.assessment(assessment_id).await?;
    let key = submissions_key(&assessment.id);

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Submission>>();
    let store = Arc::clone(&ctx.store);
    let cache = Arc::clone(&ctx.cache);
    let cache_key = key.clone();
    let polled_id = assessment.id.clone();

    let subscription = subscribe(
        key,
        interval,
        move || {
            let store = Arc::clone(&store);
            let id = polled_id.clone();
            async move { store.list_submissions(&id).await }
        },
        move |snapshot: Vec<Submission>| {
            if let Err(e) = cache.set_data(&cache_key, snapshot.clone()) {
                warn!(key = %cache_key, error = %e, "Dropping polled snapshot");
            }
            let _ = tx.send(snapshot);
        },
    );
    println!(
        "Watching {} every {}s for {} ticks",
        assessment.assessment_name,
        interval.as_secs(),
        ticks
    );

    let mut seen = 0;
    while seen < ticks {
        let Some(snapshot) = rx.recv().await else {
            warn!(key = %subscription.key(), "Polling stopped unexpectedly");
            break;
        };
        seen += 1;
        let scoped = scope_to_assessment(snapshot, &assessment);
        println!(
            "[tick {}] {} submissions | {}",
            seen,
            scoped.len(),
            status_summary(&scoped)
        );
    }

    subscription.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctorcache_core::models::SubmissionStatus;

    fn submission(id: &str, status: SubmissionStatus) -> Submission {
        Submission {
            id: id.to_string(),
            status,
            ..Submission::default()
        }
    }

    #[test]
    fn test_status_summary_counts_by_status() {
        let subs = vec![
            submission("s1", SubmissionStatus::InProgress),
            submission("s2", SubmissionStatus::Completed),
            submission("s3", SubmissionStatus::InProgress),
        ];
        assert_eq!(status_summary(&subs), "Completed: 1, In Progress: 2");
        assert_eq!(status_summary(&[]), "");
    }

    #[test]
    fn test_schedule_line() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            schedule_line("2024-05-01T09:00:00Z", "2024-05-01T11:00:00Z", now),
            "Started 3 hours ago, ends May 1, 2024, 11:00 AM"
        );
        assert_eq!(schedule_line("", "", now), format!("Started N/A, ends {}", format_date("")));
    }

    #[test]
    fn test_submission_filters_include_examinee() {
        let mut subs = vec![submission("s1", SubmissionStatus::InProgress)];
        subs[0].examinee = "Cohort A".to_string();
        let spec = FilterSpec::from_records("examinee", "Examinee", &subs);
        let mut table = submission_table().with_filters(vec![spec]);
        table.set_filter("examinee", "Cohort B");
        assert_eq!(table.render(&subs).filtered_count, 0);
        table.set_filter("examinee", "Cohort A");
        assert_eq!(table.render(&subs).filtered_count, 1);
    }

    #[test]
    fn test_apply_table_args() {
        let mut table = submission_table();
        let args = TableArgs {
            filters: vec![("status".to_string(), "Absent".to_string())],
            sort: Some("user".to_string()),
            desc: true,
            page: 2,
            page_size: Some(5),
        };
        apply_table_args(&mut table, &args, 10);
        assert_eq!(table.active_filters().active_value("status"), Some("Absent"));
        assert_eq!(table.sort_state().order, proctorcache_core::SortOrder::Desc);
        assert_eq!(table.page_state().page_size, 5);
        assert_eq!(table.page_state().page_index, 2);
    }

    #[test]
    fn test_handler_records_unlock_and_notifications() {
        let locked = submission("s1", SubmissionStatus::ManualLocked);
        let mut handler = CliActionHandler::default();
        actions::dispatch("unlock", &locked, &mut handler);
        actions::dispatch("sync", &locked, &mut handler);
        actions::dispatch("flag", &locked, &mut handler);
        assert_eq!(handler.unlock_requested.as_deref(), Some("s1"));
        assert_eq!(
            handler.notifications,
            vec!["Syncing logs", "Performing action: flag"]
        );
    }
}
