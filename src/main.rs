use std::sync::Arc;

use prometheus::Registry;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use topocore::cluster::ClusterCommunicator;
use topocore::cluster::ClusterService;
use topocore::cluster::LocalClusterHub;
use topocore::cluster::StaticClusterService;
use topocore::encode_text;
use topocore::event::Event;
use topocore::event::EventDeliveryDelegate;
use topocore::event::EventDispatcher;
use topocore::event::EventListener;
use topocore::event::ListenerRegistry;
use topocore::net::ProviderId;
use topocore::store::DhcpRelayEvent;
use topocore::store::DhcpRelayStore;
use topocore::store::MastershipEvent;
use topocore::store::MastershipStore;
use topocore::store::McastEvent;
use topocore::store::McastStore;
use topocore::store::RegionEvent;
use topocore::store::RegionStore;
use topocore::topology::NetworkInventory;
use topocore::topology::TopologyManager;
use topocore::ClusterConfig;
use topocore::Error;
use topocore::NodeConfig;
use topocore::Result;
use topocore::SystemError;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = NodeConfig::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&settings.cluster)?;
    info!(node_id = %settings.cluster.node_id, "Loaded configuration: {:?}", settings);

    // Event delivery
    let dispatcher = EventDispatcher::new(settings.dispatch.clone());
    let registry = Registry::new();
    dispatcher.register_metrics(&registry)?;

    let topology = TopologyManager::new(settings.topology.clone(), dispatcher.clone());
    topology.metrics().register(&registry)?;
    topology.add_listener(Arc::new(EventLogger));

    register_logging_sink::<MastershipEvent>(&dispatcher);
    register_logging_sink::<RegionEvent>(&dispatcher);
    register_logging_sink::<McastEvent>(&dispatcher);
    register_logging_sink::<DhcpRelayEvent>(&dispatcher);
    dispatcher.start()?;

    let inventory = NetworkInventory::new(ProviderId::core());
    inventory.load_static(&settings.topology.static_network)?;
    topology.update_topology(
        inventory.provider_id().clone(),
        &inventory.describe(),
        vec!["static network loaded".into()],
    )?;

    // Stores
    let hub = LocalClusterHub::new();
    let communicator: Arc<dyn ClusterCommunicator> = Arc::new(hub.communicator(settings.cluster.local_node_id()));
    let cluster: Arc<dyn ClusterService> = Arc::new(StaticClusterService::from_config(&settings.cluster));

    let mastership = MastershipStore::new(settings.cluster.local_node_id());
    mastership.set_delegate(Arc::new(EventDeliveryDelegate::<MastershipEvent>::new(dispatcher.clone())));

    let regions = RegionStore::build(communicator.clone(), cluster.clone(), settings.ecmap.clone())?;
    regions.set_delegate(Arc::new(EventDeliveryDelegate::<RegionEvent>::new(dispatcher.clone())));

    let mcast = McastStore::build(communicator.clone(), cluster.clone(), settings.ecmap.clone())?;
    mcast.set_delegate(Arc::new(EventDeliveryDelegate::<McastEvent>::new(dispatcher.clone())));

    let dhcp_relay = DhcpRelayStore::build(communicator, cluster, settings.ecmap.clone())?;
    dhcp_relay.set_delegate(Arc::new(EventDeliveryDelegate::<DhcpRelayEvent>::new(dispatcher.clone())));

    info!("Application started. Waiting for CTRL+C signal...");
    if let Err(e) = graceful_shutdown().await {
        error!("Failed to listen for shutdown signal: {:?}", e);
    }

    // Stop producers before the dispatcher
    dhcp_relay.destroy();
    regions.destroy();
    mcast.destroy();
    mastership.unset_delegate();
    dispatcher.stop();

    debug!("Final metrics:\n{}", encode_text(&registry));
    info!(stats = ?dispatcher.stats(), "Shutdown completed");
    Ok(())
}

async fn graceful_shutdown() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| SystemError::SignalHandler(e.to_string()))?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| SystemError::SignalHandler(e.to_string()))?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }
    info!("Shutdown server..");
    Ok(())
}

/// Logs every event it sees at debug level.
struct EventLogger;

impl<E: Event> EventListener<E> for EventLogger {
    fn event(
        &self,
        event: &E,
    ) {
        debug!(event_type = ?event.event_type(), time = event.time(), "{:?}", event.subject());
    }
}

fn register_logging_sink<E: Event>(dispatcher: &EventDispatcher) {
    let sink = Arc::new(ListenerRegistry::<E>::new());
    sink.add_listener(Arc::new(EventLogger));
    dispatcher.add_sink::<E, _>(sink);
}

pub fn init_observability(config: &ClusterConfig) -> Result<WorkerGuard> {
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("topocore.log")
        .build(config.log_dir.join(&config.node_id))
        .map_err(|e| Error::Fatal(format!("Failed to open log file: {e}")))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
