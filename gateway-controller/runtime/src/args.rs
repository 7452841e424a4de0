use crate::{
    client::KubertClient,
    core::{ControllerNames, Settings},
    index::{metrics::IndexMetrics, plugin::kubernetes, CommonCollections, Options},
};
use anyhow::{bail, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use tokio::time::{self, Duration};
use tracing::{info, info_span, Instrument};

const READINESS_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
#[clap(name = "gateway", about = "A Gateway API resource controller")]
pub struct Args {
    #[clap(
        long,
        default_value = "gateway=info,warn",
        env = "GATEWAY_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// The controller name claimed by gateway classes programmed into Envoy.
    #[clap(long, default_value = "kgateway.dev/kgateway")]
    controller_name: String,

    /// The controller name claimed by agent gateway classes.
    #[clap(long, default_value = "kgateway.dev/agentgateway")]
    agent_controller_name: String,

    /// A JSON list of label selectors. Only namespaces matching one of them are discovered.
    #[clap(long, default_value = "[]")]
    discovery_namespace_selectors: String,

    #[clap(long, default_value = "true", action = clap::ArgAction::Set)]
    enable_envoy: bool,

    #[clap(long)]
    enable_experimental_gateway_api_features: bool,

    #[clap(long, default_value = "cluster.local")]
    cluster_domain: String,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            controller_name,
            agent_controller_name,
            discovery_namespace_selectors,
            enable_envoy,
            enable_experimental_gateway_api_features,
            cluster_domain,
        } = self;

        let settings = Settings {
            discovery_namespace_selectors,
            enable_envoy,
            enable_experimental_gateway_api_features,
        };
        let controller_names = ControllerNames {
            controller: controller_name,
            agent_controller: agent_controller_name,
        };

        let mut prom = <Registry>::default();
        let index_metrics = IndexMetrics::register(prom.sub_registry_with_prefix("index"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let common = {
            let mut client = KubertClient::new(&mut runtime, index_metrics).await;
            let mut common =
                CommonCollections::new(&mut client, settings, controller_names, Options::default())?;
            let plugin = kubernetes::plugin(&common, &cluster_domain);
            common.init_plugins(&mut client, &plugin)?;
            common
        };

        tokio::spawn(await_ready(common).instrument(info_span!("readiness")));

        // Runs the watches and the admin server until the shutdown signal fires. The readiness task
        // is detached and is dropped with the runtime.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}

async fn await_ready(common: CommonCollections) {
    let mut interval = time::interval(READINESS_POLL_INTERVAL);
    loop {
        interval.tick().await;
        let unsynced = common.unsynced();
        if unsynced.is_empty() {
            break;
        }
        tracing::debug!(?unsynced, "Waiting for collections to sync");
    }
    info!("Collections synced");

    if let Some(gateways) = common.gateways() {
        info!(
            gateways = gateways.gateways().len(),
            deployed = gateways.gateways_for_deployer().len(),
            "Indexed gateways"
        );
    }
}
