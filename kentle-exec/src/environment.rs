use std::sync::Arc;

use chrono::Local;
use kentle_core::display_chain;
use tracing::{error, info};

use crate::engine::{BootstrapError, Engine, EngineInfo};
use crate::log::{kettle_line, LogStore, LogWriter};

/// Proof that the engine has been bootstrapped.
///
/// Obtained only through [`Environment::init`]; every [`Job`](crate::Job)
/// needs one, so nothing can run before the engine is set up.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<Inner>,
}

struct Inner {
    engine: Arc<dyn Engine>,
    log_store: Arc<LogStore>,
    info: EngineInfo,
}

impl Environment {
    pub async fn init(
        engine: Arc<dyn Engine>,
        log_store: Arc<LogStore>,
    ) -> Result<Self, BootstrapError> {
        let general = LogWriter::general(log_store.clone());
        let info = match engine.bootstrap().await {
            Ok(info) => info,
            Err(e) => {
                let chain = display_chain(&e);
                error!(engine = engine.name(), error = %chain, "engine bootstrap failed");
                general
                    .error(kettle_line(
                        Local::now(),
                        "kentle",
                        &format!("engine bootstrap failed: {chain}"),
                    ))
                    .await;
                return Err(e);
            }
        };

        info!(engine = %info.engine, plugins = info.plugin_count, "engine ready");
        general
            .basic(kettle_line(
                Local::now(),
                "kentle",
                &format!(
                    "{} engine initialised ({} plugins)",
                    info.engine, info.plugin_count
                ),
            ))
            .await;

        Ok(Self {
            inner: Arc::new(Inner {
                engine,
                log_store,
                info,
            }),
        })
    }

    /// Bootstraps `engine` against the process-wide log store.
    pub async fn init_global(engine: Arc<dyn Engine>) -> Result<Self, BootstrapError> {
        Self::init(engine, LogStore::global()).await
    }

    pub fn engine_info(&self) -> &EngineInfo {
        &self.inner.info
    }

    pub fn log_store(&self) -> &Arc<LogStore> {
        &self.inner.log_store
    }

    pub(crate) fn engine(&self) -> &Arc<dyn Engine> {
        &self.inner.engine
    }
}
