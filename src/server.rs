use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::cli::Config;
use crate::ncds::{self, DatastoreId, DatastoreType, InitFlags, NetconfLibrary, TransApi};
use crate::netconf_server::{ServerTransApi, MODULE};
use crate::signal::Shutdown;

/// Features of ietf-netconf-server the server supports.
const FEATURES: [&str; 2] = ["ssh", "inbound-ssh"];

/// Files the server reads from its configuration directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Paths {
    pub(crate) cert_to_name_model: PathBuf,
    pub(crate) server_model: PathBuf,
    pub(crate) datastore: PathBuf,
}

impl Paths {
    pub(crate) fn new(confdir: &Path) -> Self {
        let dir = confdir.join(MODULE);
        Paths {
            cert_to_name_model: dir.join("ietf-x509-cert-to-name.yin"),
            server_model: dir.join(format!("{}.yin", MODULE)),
            datastore: dir.join("datastore.xml"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Init,
    AddModel,
    NewDatastore,
    SetPath,
    EnableFeature,
    InitDatastore,
    Consolidate,
    DeviceInit,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::Init => "Library initialization",
            Step::AddModel => "Registering ietf-x509-cert-to-name model",
            Step::NewDatastore => "Creating ietf-netconf-server datastore",
            Step::SetPath => "Setting ietf-netconf-server datastore file",
            Step::EnableFeature => "Enabling ietf-netconf-server features",
            Step::InitDatastore => "Initiating ietf-netconf-server datastore",
            Step::Consolidate => "Consolidating data models",
            Step::DeviceInit => "Initiating ietf-netconf-server module",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{step} failed")]
pub(crate) struct BootstrapError {
    pub(crate) step: Step,
    #[source]
    source: ncds::Error,
}

trait StepExt<T> {
    fn step(self, step: Step) -> Result<T, BootstrapError>;
}

impl<T> StepExt<T> for ncds::Result<T> {
    fn step(self, step: Step) -> Result<T, BootstrapError> {
        self.map_err(|source| BootstrapError { step, source })
    }
}

/// The datastore brought up by [`bootstrap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DatastoreHandle {
    pub(crate) module: &'static str,
    pub(crate) id: DatastoreId,
}

/// Brings the ietf-netconf-server datastore online. Stops at the first
/// failing step; cleaning up is left to the caller.
pub(crate) fn bootstrap<L: NetconfLibrary>(
    lib: &mut L,
    paths: &Paths,
    transapi: Box<dyn TransApi>,
) -> Result<DatastoreHandle, BootstrapError> {
    let instances = lib
        .init(InitFlags::ALL | InitFlags::MULTILAYER)
        .step(Step::Init)?;
    log::debug!("{} other server instances running", instances);

    lib.add_model(&paths.cert_to_name_model).step(Step::AddModel)?;
    let mut ds = lib
        .new_transapi_static(DatastoreType::File, &paths.server_model, transapi)
        .step(Step::NewDatastore)?;
    lib.file_set_path(&mut ds, &paths.datastore).step(Step::SetPath)?;
    for feature in FEATURES {
        lib.feature_enable(MODULE, feature).step(Step::EnableFeature)?;
    }
    let id = lib.datastore_init(ds).step(Step::InitDatastore)?;
    lib.consolidate().step(Step::Consolidate)?;
    lib.device_init(Some(id), true).step(Step::DeviceInit)?;

    Ok(DatastoreHandle { module: MODULE, id })
}

/// Waits until shutdown is requested, waking up every `tick`.
pub(crate) async fn serve(shutdown: &Shutdown, tick: Duration) {
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    while !shutdown.is_requested() {
        tokio::select! {
            biased;
            _ = shutdown.requested() => (),
            _ = ticker.tick() => log::trace!("tick"),
        }
    }
    log::debug!("main loop finished");
}

/// Bootstraps the library, serves until shutdown and tears the library down
/// again. The teardown runs whichever way the bootstrap went.
pub(crate) async fn run<L: NetconfLibrary>(
    lib: &mut L,
    config: &Config,
    shutdown: &Shutdown,
) -> Result<(), BootstrapError> {
    let paths = Paths::new(&config.confdir);
    let result = bootstrap(lib, &paths, Box::new(ServerTransApi::default()));

    if let Ok(ds) = &result {
        log::info!("OF-CONFIG server successfully initialized.");
        match lib.status(ds.id) {
            Ok(Some(state)) => log::debug!("{} state: {}", ds.module, state),
            Ok(None) => (),
            Err(e) => log::warn!("Reading {} state failed: {}", ds.module, e),
        }
        serve(shutdown, config.tick).await;
    }

    lib.close();
    result.map(|_| ())
}
