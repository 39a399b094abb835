//! Instance-scoped prometheus metrics.
//!
//! Every dispatcher and topology manager owns its own collectors; callers that
//! want them scraped register them into a [`Registry`] of their choosing.

#[cfg(test)]
mod metrics_test;

use prometheus::Encoder;
use prometheus::IntCounter;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tracing::warn;

use crate::Result;

const NAMESPACE: &str = "topocore";

fn counter(
    name: &str,
    help: &str,
) -> IntCounter {
    IntCounter::with_opts(Opts::new(name, help).namespace(NAMESPACE)).expect("metric can not be created")
}

fn gauge(
    name: &str,
    help: &str,
) -> IntGauge {
    IntGauge::with_opts(Opts::new(name, help).namespace(NAMESPACE)).expect("metric can not be created")
}

/// Counters maintained by the event dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchMetrics {
    pub posted: IntCounter,
    pub delivered: IntCounter,
    pub unhandled: IntCounter,
    pub failed: IntCounter,
    pub rejected: IntCounter,
    pub respawns: IntCounter,
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self {
            posted: counter("dispatch_posted_total", "Events accepted into the queue"),
            delivered: counter("dispatch_delivered_total", "Events processed by a sink"),
            unhandled: counter("dispatch_unhandled_total", "Events dropped for lack of a sink"),
            failed: counter("dispatch_failed_total", "Sink invocations that errored or panicked"),
            rejected: counter("dispatch_rejected_total", "Events refused at post time"),
            respawns: counter("dispatch_loop_respawns_total", "Dispatch loops replaced by the watchdog"),
        }
    }

    pub fn register(
        &self,
        registry: &Registry,
    ) -> Result<()> {
        registry.register(Box::new(self.posted.clone()))?;
        registry.register(Box::new(self.delivered.clone()))?;
        registry.register(Box::new(self.unhandled.clone()))?;
        registry.register(Box::new(self.failed.clone()))?;
        registry.register(Box::new(self.rejected.clone()))?;
        registry.register(Box::new(self.respawns.clone()))?;
        Ok(())
    }
}

/// Topology event metrics, read by the `topology-events-metrics` consumer.
#[derive(Debug, Clone)]
pub struct TopologyMetrics {
    pub events: IntCounter,
    pub last_event_time_ms: IntGauge,
    pub last_compute_cost_ns: IntGauge,
    pub devices: IntGauge,
    pub links: IntGauge,
    pub clusters: IntGauge,
}

impl Default for TopologyMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyMetrics {
    pub fn new() -> Self {
        Self {
            events: counter("topology_events_total", "Topology change events emitted"),
            last_event_time_ms: gauge("topology_last_event_time_ms", "Time of the last topology event"),
            last_compute_cost_ns: gauge(
                "topology_last_compute_cost_ns",
                "Time spent computing the latest topology",
            ),
            devices: gauge("topology_devices", "Devices in the current topology"),
            links: gauge("topology_links", "Links in the current topology"),
            clusters: gauge("topology_clusters", "Clusters in the current topology"),
        }
    }

    pub fn register(
        &self,
        registry: &Registry,
    ) -> Result<()> {
        registry.register(Box::new(self.events.clone()))?;
        registry.register(Box::new(self.last_event_time_ms.clone()))?;
        registry.register(Box::new(self.last_compute_cost_ns.clone()))?;
        registry.register(Box::new(self.devices.clone()))?;
        registry.register(Box::new(self.links.clone()))?;
        registry.register(Box::new(self.clusters.clone()))?;
        Ok(())
    }
}

/// Renders every collector in `registry` in the prometheus text format.
pub fn encode_text(registry: &Registry) -> String {
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        warn!("could not encode metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            warn!("metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
