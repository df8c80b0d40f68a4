use anyhow::{bail, Context};
use clap::Parser;
use docflow_common::UploadState;
use docflow_dashboard::api::HttpApi;
use docflow_dashboard::cli::{Cli, Commands};
use docflow_dashboard::config::Config;
use docflow_dashboard::dashboard::{Dashboard, RetryOutcome};
use docflow_dashboard::notify::{ConsoleNotifier, Notifier, ToastDurations};
use docflow_dashboard::render::{format_results, format_stats, ConsoleRenderer};
use docflow_dashboard::scheduler::{RefreshScheduler, UNEXPECTED_ERROR};
use docflow_dashboard::upload::{FollowUp, UploadController};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "docflow_dashboard=debug"
    } else {
        "docflow_dashboard=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load()?;
    if let Some(url) = cli.base_url.clone() {
        config.base_url = url;
    }
    let notifier = Arc::new(ConsoleNotifier::new(ToastDurations::from_config(&config)));

    // 想定外のパニックもセッションを落とさず通知に変換する
    let task = tokio::spawn(run(cli, config, Arc::clone(&notifier)));
    match task.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            notifier.error(UNEXPECTED_ERROR);
            bail!("{}: {}", UNEXPECTED_ERROR, e)
        }
        Err(e) => Err(e.into()),
    }
}

async fn run(cli: Cli, config: Config, notifier: Arc<ConsoleNotifier>) -> anyhow::Result<()> {
    let command = match cli.command {
        Commands::Config { set_base_url, show } => return run_config(config, set_base_url, show),
        command => command,
    };

    let api = HttpApi::new(&config.base_url, config.timeout())?;
    let catalog = config
        .action_catalog()
        .context("アクション定義の読み込みに失敗")?;
    let dashboard = Dashboard::new(
        Arc::new(api),
        notifier,
        Arc::new(ConsoleRenderer),
        catalog,
    );

    match command {
        Commands::Watch { filter } => {
            println!("📊 docflow - ダッシュボード ({})\n", config.base_url);
            dashboard.set_filter(filter.criteria()).await;

            let scheduler = RefreshScheduler::new(
                dashboard.clone(),
                config.refresh_interval(),
                config.probe_interval(),
            );
            let handle = scheduler.spawn();

            tokio::signal::ctrl_c().await?;
            handle.abort();
            println!("\n終了します");
        }

        Commands::Upload { file, no_details } => {
            println!("📤 docflow - アップロード\n");
            let controller =
                UploadController::new(dashboard.clone(), config.reset_delay(), config.detail_delay());

            let bar = ProgressBar::new(100);
            bar.set_style(
                ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            let mut rx = controller.subscribe();
            let progress_bar = bar.clone();
            let progress = tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let state = rx.borrow_and_update().clone();
                    match state {
                        UploadState::Uploading { progress } => {
                            progress_bar.set_position(progress as u64);
                            progress_bar.set_message(milestone_label(progress));
                        }
                        UploadState::Processing => {
                            progress_bar.set_position(70);
                            progress_bar.set_message("Processing with agents...");
                        }
                        UploadState::Succeeded { .. } | UploadState::Failed { .. } => {
                            progress_bar.set_position(100);
                            break;
                        }
                        _ => {}
                    }
                }
            });

            let mut report = controller.submit_path(&file).await?;
            let _ = progress.await;
            match &report.state {
                UploadState::Succeeded { .. } => bar.finish_with_message("Processing complete!"),
                _ => bar.abandon(),
            }

            if no_details {
                report
                    .follow_ups
                    .retain(|f| !matches!(f, FollowUp::OpenDetails { .. }));
            }
            for handle in controller.schedule(&report) {
                let _ = handle.await;
            }

            if report.result_id().is_none() {
                bail!("アップロードに失敗しました: {}", report.file_name);
            }
        }

        Commands::Results { filter } => {
            dashboard.set_filter(filter.criteria()).await;
            dashboard.refresh_results().await?;
            print!("{}", format_results(&dashboard.view().await));
        }

        Commands::Stats => {
            dashboard.refresh_statistics().await?;
            print!("{}", format_stats(&dashboard.view().await.stats));
        }

        Commands::Trace { id } => {
            dashboard.show_details(id).await?;
        }

        Commands::Retry { id, action } => {
            if dashboard.retry_action(id, &action).await != RetryOutcome::Retried {
                bail!("アクションの再実行に失敗しました: {}", action);
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

fn run_config(mut config: Config, set_base_url: Option<String>, show: bool) -> anyhow::Result<()> {
    if let Some(url) = set_base_url {
        config.set_base_url(url)?;
        println!("✔ 接続先を設定しました: {}", config.base_url);
    }

    if show {
        println!("設定:");
        println!("  接続先: {}", config.base_url);
        println!("  更新間隔: {}秒", config.refresh_interval_secs);
        println!("  疎通確認間隔: {}秒", config.probe_interval_secs);
        println!("  タイムアウト: {}秒", config.timeout_seconds);
        println!(
            "  アクション定義: {}",
            config
                .action_catalog
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "組み込みのみ".into())
        );
    }
    Ok(())
}

fn milestone_label(progress: u8) -> &'static str {
    use docflow_common::ProgressMilestone;
    [
        ProgressMilestone::Complete,
        ProgressMilestone::ResponseReceived,
        ProgressMilestone::Requesting,
        ProgressMilestone::Started,
    ]
    .into_iter()
    .find(|m| progress >= m.percent())
    .map(|m| m.label())
    .unwrap_or("")
}
