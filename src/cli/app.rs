//! Entry-point orchestration, grounded on `src/cli/app.rs::run()`'s
//! load -> init -> dispatch shape: load local env overrides, parse
//! args, init logging, spawn the metrics server, load configuration,
//! build collaborators, run the benchmark, report results.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use bench_browser::{BrowserDriver, ChromeDriver, ScriptedDriver};
use bench_cache::{BaselineCache, SolutionCache};
use bench_evaluator::Evaluator;
use bench_feedback::{FeedbackAggregator, FeedbackConfig};
use bench_observe::{spawn_metrics_server, NullSink, PrometheusSink, ProgressSink};
use bench_orchestrator::Orchestrator;
use bench_predicates::{HttpJudge, Judge, NullJudge, TestRunner};
use bench_types::ProjectId;

use crate::agents::build_agents;
use crate::cli::args::CliArgs;
use crate::cli::runtime::{bootstrap_skipped, init_logging, load_local_env_overrides};
use crate::config::AppConfig;
use crate::project_backends::ProjectBackendRegistry;
use crate::results::{build_and_save, print_summary};
use crate::task_source::HttpTaskSource;

pub async fn run() -> Result<()> {
    load_local_env_overrides();
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        build_date = env!("BUILD_DATE", "unknown"),
        git_hash = env!("GIT_HASH", "unknown"),
        git_branch = env!("GIT_BRANCH", "unknown"),
        "starting agent-bench"
    );

    let (mut config, config_path) =
        AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    info!(path = %config_path.display(), "loaded configuration");

    if let Some(port) = cli.metrics_port {
        config.metrics_port = port;
    }
    if let Some(output) = cli.output.clone() {
        config.output_dir = output;
    }

    let _metrics_server = if bootstrap_skipped() {
        None
    } else {
        spawn_metrics_server(config.metrics_port)
    };

    match execute(&config, &cli).await {
        Ok(_) => {
            info!("benchmark run completed");
            Ok(())
        }
        Err(err) => {
            error!("benchmark run failed: {}", err);
            Err(err)
        }
    }
}

async fn execute(config: &AppConfig, cli: &CliArgs) -> Result<Vec<bench_orchestrator::ProjectReport>> {
    let base_config = config.benchmark_config().context("invalid benchmark configuration")?;
    base_config.validate().context("benchmark configuration failed validation")?;

    let agent_call_timeout = Duration::from_secs(config.agent_call_timeout_secs);
    let agents = build_agents(&config.agents, agent_call_timeout);

    let project_backends = Arc::new(ProjectBackendRegistry::new(&config.projects));

    let mut project_urls = BTreeMap::new();
    for project in &config.projects {
        project_urls.insert(ProjectId::from(project.id.as_str()), project.backend_url.clone());
    }
    let task_source = Arc::new(HttpTaskSource::new(config.cache_dir.clone(), project_urls));

    let solution_cache = Arc::new(SolutionCache::open(&config.cache_dir).await);

    let judge: Arc<dyn Judge> = match &config.judge_url {
        Some(url) => Arc::new(HttpJudge::new(url.clone(), Duration::from_secs(30))),
        None => Arc::new(NullJudge),
    };

    let progress_sink: Arc<dyn ProgressSink> = if bootstrap_skipped() {
        Arc::new(NullSink)
    } else {
        Arc::new(PrometheusSink::new())
    };

    let driver: Arc<dyn BrowserDriver> = if cli.dry_run {
        Arc::new(ScriptedDriver::new(""))
    } else {
        Arc::new(
            ChromeDriver::launch(config.headless, Duration::from_secs(30))
                .await
                .context("failed to launch headless browser")?,
        )
    };

    let mut executor_config = bench_browser::ExecutorConfig::default();
    executor_config.capture_screenshots = config.record_gif;
    executor_config.monitor_navigation = config.monitor_navigation;

    let mut evaluator_config = bench_evaluator::EvaluatorConfig::default();
    evaluator_config.chunk_size = config.chunk_size;
    evaluator_config.executor_config = executor_config;
    evaluator_config.feedback_config = FeedbackConfig::default();

    let start = Instant::now();
    let mut reports = Vec::with_capacity(config.projects.len());

    // One Evaluator (and hence one BrowserDriver-bound backend) per
    // project: `Evaluator`'s `BackendService` is fixed at construction,
    // so a single shared instance across projects would replay every
    // project's actions against whichever project's backend built it
    // first. Running one single-project Orchestrator per configured
    // project keeps each project's reset/replay pair pointed at its own
    // backend while still sharing agents, task source, caches, and the
    // progress sink across the whole sweep.
    for project in &config.projects {
        let project_id = ProjectId::from(project.id.as_str());
        let backend = project_backends
            .backend_for(&project_id)
            .with_context(|| format!("no backend registered for project '{}'", project_id))?;

        let baseline_cache = Arc::new(BaselineCache::new());
        let test_runner = Arc::new(TestRunner::new(judge.clone()));
        let feedback = Arc::new(FeedbackAggregator::new(evaluator_config.feedback_config.clone()));

        let evaluator = Arc::new(Evaluator::new(
            driver.clone(),
            backend,
            baseline_cache,
            test_runner,
            feedback,
            evaluator_config.clone(),
        ));

        let mut project_config = base_config.clone();
        project_config.projects = vec![project_id];

        let orchestrator = Orchestrator::new(
            project_config,
            agents.clone(),
            task_source.clone(),
            project_backends.clone(),
            evaluator,
            solution_cache.clone(),
            progress_sink.clone(),
        );

        reports.extend(orchestrator.run().await);
    }

    let total_execution_time = start.elapsed();
    print_summary(&reports, total_execution_time);
    if config.save_results_json {
        let path = build_and_save(&reports, total_execution_time, &config.output_dir)
            .context("failed to persist benchmark results")?;
        info!(path = %path.display(), "wrote benchmark results");
    }

    Ok(reports)
}
