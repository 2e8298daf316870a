use prometheus::Registry;
use std::sync::Arc;

use crate::config::ForwarderCfg;
use crate::readiness::Readiness;
use crate::store::MetricStore;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<ForwarderCfg>,
    pub ready: Arc<Readiness>,
    pub store: Arc<dyn MetricStore>,
    pub registry: Registry,
}
