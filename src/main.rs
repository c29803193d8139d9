use edgeprobe::cli::{Cli, TtlTier};
use edgeprobe::config::Config;
use edgeprobe::core::edge::campaign::CampaignRunner;
use edgeprobe::core::edge::clock::{Clock, SystemClock};
use edgeprobe::core::edge::filters;
use edgeprobe::core::edge::probe::{EdgeProbe, IsahcProbeClient};
use edgeprobe::core::edge::retry::{retry_check, CheckFailure};
use edgeprobe::core::model::{EdgeCacheSettings, ResourceOptions, TargetResource};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();

    let config = Config::load(&cli.config)?;
    if cli.check {
        println!("✓ Configuration valid");
        return Ok(());
    }

    let ttl_seconds = match cli.ttl {
        TtlTier::Short => config.ttl_settings.short_ttl,
        TtlTier::Long => config.ttl_settings.long_ttl,
    };
    let params = config.policy_parameters(ttl_seconds);

    // Snapshots of the configured resources as scenario setup leaves them:
    // active, edge cache enabled at the selected TTL tier
    let resources: Vec<TargetResource> = config
        .resources
        .iter()
        .map(|entry| TargetResource {
            id: entry.id.clone(),
            cname: entry.cname.clone(),
            active: true,
            folder_id: None,
            origin_group_id: None,
            options: Some(ResourceOptions {
                edge_cache_settings: Some(EdgeCacheSettings::with_ttl(ttl_seconds)),
                ..ResourceOptions::default()
            }),
        })
        .collect();

    let ttl_filter = filters::has_default_ttl(ttl_seconds);
    let predicates: [&dyn Fn(&TargetResource) -> bool; 3] =
        [&filters::is_active, &filters::no_ip_acl, &ttl_filter];
    let selected: Vec<TargetResource> =
        filters::select_resources(&resources, filters::all_of(&predicates))?
            .into_iter()
            .cloned()
            .collect();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let client = Arc::new(IsahcProbeClient::new()?);
    let probe = EdgeProbe::new(
        client,
        clock.clone(),
        config.probe_settings.protocol,
        config.probe_settings.timeout_ms,
    );
    let runner = CampaignRunner::new(probe, clock.clone()).with_edge_nodes(config.edge_nodes.clone());

    println!(
        "Probing {} resource(s) for up to {}s (ttl {}s, {:?} strategy)...",
        selected.len(),
        params.time_budget().as_secs(),
        ttl_seconds,
        params.strategy,
    );

    let runner_ref = &runner;
    let selected_ref = &selected;
    let params_ref = &params;
    let outcome = retry_check(
        "edge cache revalidates within ttl",
        config.probe_settings.retry_attempts,
        Duration::from_secs(config.probe_settings.retry_delay_seconds),
        clock.as_ref(),
        move || async move {
            let report = runner_ref
                .run(selected_ref, params_ref)
                .await
                .map_err(CheckFailure::from)?;
            if report.passed {
                Ok(report)
            } else {
                Err(CheckFailure::Assertion(
                    "not all (resource, node) histories were accepted".to_string(),
                ))
            }
        },
    )
    .await;

    match outcome {
        Ok(report) => {
            for (resource_id, nodes) in &report.results {
                for (node, accepted) in nodes {
                    println!(
                        "  [{}] on [{}]: {}",
                        resource_id,
                        node,
                        if *accepted { "accepted" } else { "inconclusive" }
                    );
                }
            }
            println!("✓ Edge cache behavior verified");
            Ok(())
        }
        Err(error) => {
            eprintln!("✗ {}", error);
            std::process::exit(1);
        }
    }
}
