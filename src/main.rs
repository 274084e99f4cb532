use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;

use cartwright::advisor::{AdvisoryProvider, LlmAdvisor, NoopAdvisor};
use cartwright::config::Config;
use cartwright::data::TestData;
use cartwright::driver::{BrowserKind, PlaywrightSessionFactory, WebSessionConfig};
use cartwright::events::{ConsoleEventListener, EventEmitter};
use cartwright::locator::ElementLocator;
use cartwright::retry::RetryExecutor;
use cartwright::runner::{
    build_suite, render_plan, CancelFlag, Flow, ScenarioRunner, SuiteOrchestrator,
};
use cartwright::{notify, report};

#[derive(Parser)]
#[command(name = "cartwright")]
#[command(version)]
#[command(about = "Resilient e-commerce storefront test orchestration", long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a test suite against a configured site
    Run {
        /// Site name from the config's targetSites
        #[arg(short, long)]
        site: String,

        /// Which suite to run
        #[arg(short, long, value_enum, default_value_t = Flow::Full)]
        flow: Flow,

        /// Path to the JSON config file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Override configured browsers (comma-separated: chromium, firefox, webkit)
        #[arg(short, long, value_delimiter = ',')]
        browsers: Option<Vec<String>>,

        /// Override headless mode from the config
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        headless: Option<bool>,

        /// Disable the LLM advisory channel for this run
        #[arg(long, default_value = "false")]
        no_advisor: bool,

        /// Print the resolved test plan without opening a browser
        #[arg(long, default_value = "false")]
        dry_run: bool,

        /// Output directory for reports and artifacts
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a report from saved suite results
    Report {
        /// Path to a saved suite result JSON
        results: PathBuf,

        /// Output format (json, html, junit)
        #[arg(short, long, default_value = "html")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List configured target sites
    Sites {
        /// Path to the JSON config file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
}

struct RunArgs {
    site: String,
    flow: Flow,
    config_path: PathBuf,
    browsers: Option<Vec<String>>,
    headless: Option<bool>,
    no_advisor: bool,
    dry_run: bool,
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Run {
            site,
            flow,
            config,
            browsers,
            headless,
            no_advisor,
            dry_run,
            output,
        } => {
            let code = execute_run(RunArgs {
                site,
                flow,
                config_path: config,
                browsers,
                headless,
                no_advisor,
                dry_run,
                output,
            })
            .await?;
            std::process::exit(code);
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref())?;
        }

        Commands::Sites { config } => {
            let config = Config::load_or_default(&config)?;
            if config.testing.target_sites.is_empty() {
                println!("{} No sites configured.", "ℹ".blue());
            } else {
                println!("{} Configured sites:", "ℹ".blue());
                for site in &config.testing.target_sites {
                    println!(
                        "  {} {}",
                        site.name.white().bold(),
                        site.base_url.dimmed()
                    );
                }
            }
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    env_logger::Builder::from_env(env).init();
}

async fn execute_run(args: RunArgs) -> anyhow::Result<i32> {
    let mut config = Config::load_or_default(&args.config_path)?;

    if let Some(names) = &args.browsers {
        let mut browsers = Vec::new();
        for name in names {
            browsers.push(name.parse::<BrowserKind>()?);
        }
        config.testing.browsers = browsers;
    }
    if let Some(headless) = args.headless {
        config.testing.headless = headless;
    }
    if let Some(output) = &args.output {
        config.reporting.output_dir = output.clone();
    }
    if args.no_advisor {
        config.advisor.enabled = false;
    }
    config.validate()?;

    let site = config.site(&args.site)?;
    let data = TestData::load(
        config.data.addresses_csv.as_deref(),
        config.data.address_count,
    )?;
    let suite = build_suite(args.flow, &site, &config.testing, &data)?;

    if args.dry_run {
        println!("{}", render_plan(&suite));
        return Ok(0);
    }

    println!(
        "{} Running {} suite against: {}",
        "▶".green().bold(),
        suite.name.cyan(),
        site.name.cyan()
    );
    println!(
        "  Browsers: {}",
        config
            .testing
            .browsers
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(", ")
            .cyan()
    );
    if !config.testing.headless {
        println!("  Headless: {}", "Disabled".yellow());
    }
    if config.advisor.enabled {
        println!("  Advisor: {}", config.advisor.model.cyan());
    }
    if config.testing.submit_orders {
        println!("  Submit orders: {}", "Enabled".red().bold());
    }
    println!(
        "  Output: {}",
        config.reporting.output_dir.display().to_string().cyan()
    );

    let screenshots_dir = config.reporting.screenshots_dir();
    std::fs::create_dir_all(&screenshots_dir)
        .with_context(|| format!("failed to create {}", screenshots_dir.display()))?;

    let cancel = CancelFlag::new();
    let cancel_handler = cancel.clone();
    ctrlc::set_handler(move || {
        println!("\n{} Cancelling after the current step...", "⏹".yellow());
        cancel_handler.cancel();
    })?;

    let (emitter, receiver) = EventEmitter::new();
    let listener = tokio::spawn(ConsoleEventListener::listen(receiver));

    let factory = Arc::new(PlaywrightSessionFactory::new(WebSessionConfig {
        headless: config.testing.headless,
        settle_ms: config.testing.settle_ms,
    }));
    let advisor: Arc<dyn AdvisoryProvider> = if config.advisor.enabled {
        Arc::new(LlmAdvisor::new(&config.advisor))
    } else {
        Arc::new(NoopAdvisor)
    };

    let retry = RetryExecutor::new();
    let runner = ScenarioRunner::new(
        ElementLocator::new(config.testing.locator_timeout()),
        retry.clone(),
        config.testing.retry_policy(),
        screenshots_dir,
        config.testing.screenshot_on_failure,
        emitter.clone(),
        cancel.clone(),
    );
    let orchestrator = SuiteOrchestrator::new(
        factory,
        advisor,
        runner,
        retry,
        emitter.clone(),
        cancel.clone(),
    );

    let result = orchestrator.run(&suite).await?;

    // Close the event channel so the listener drains and exits.
    drop(orchestrator);
    drop(emitter);
    let _ = listener.await;

    println!("  Success rate: {:.1}%", result.success_rate());
    if !result.performance.failed_scenarios.is_empty() {
        println!("\n{} Failed scenarios:", "✗".red().bold());
        for name in &result.performance.failed_scenarios {
            println!("  {}", name.red());
        }
    }

    let paths = report::write_reports(&result, &config.reporting.output_dir)?;
    println!(
        "\n{} JSON report saved to: {}",
        "📄".to_string().blue(),
        paths.json.display().to_string().cyan()
    );
    println!(
        "{} HTML report saved to: {}",
        "📊".to_string().blue(),
        paths.html.display().to_string().cyan()
    );
    println!(
        "{} JUnit report saved to: {}",
        "🧪".to_string().blue(),
        paths.junit.display().to_string().cyan()
    );

    notify::send_notifications(&config.notifications, &result).await;

    if result.cancelled {
        println!("\n{} Run cancelled.", "⏹".yellow().bold());
        return Ok(130);
    }
    if result.failed > 0 {
        return Ok(1);
    }
    println!("\n{} All scenarios passed!", "✅".green().bold());
    Ok(0)
}
