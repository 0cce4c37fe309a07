use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::file::{FileStore, Section};
use super::{
    DatastoreId, DatastoreType, Error, InitFlags, Model, NetconfLibrary, Result, TransApi,
};

/// A datastore created by [`Library::new_transapi_static`], not registered yet.
pub(crate) struct Datastore {
    model: Model,
    path: Option<PathBuf>,
    transapi: Box<dyn TransApi>,
}

struct Registered {
    module: String,
    path: PathBuf,
    transapi: Box<dyn TransApi>,
    online: bool,
}

/// File-backed datastore library.
#[derive(Default)]
pub(crate) struct Library {
    flags: Option<InitFlags>,
    models: BTreeMap<String, Model>,
    features: BTreeMap<String, BTreeSet<String>>,
    datastores: BTreeMap<DatastoreId, Registered>,
    next_id: u32,
    consolidated: bool,
}

fn builtin_models(flags: InitFlags) -> Vec<Model> {
    let mut models = vec![
        Model::builtin("ietf-netconf", "nc"),
        Model::builtin("ietf-inet-types", "inet"),
        Model::builtin("ietf-yang-types", "yang"),
    ];
    if flags.contains(InitFlags::NACM) {
        models.push(Model::builtin("ietf-netconf-acm", "nacm"));
    }
    if flags.contains(InitFlags::MONITORING) {
        models.push(Model::builtin("ietf-netconf-monitoring", "ncm"));
    }
    if flags.contains(InitFlags::WD) {
        models.push(Model::builtin("ietf-netconf-with-defaults", "ncwd"));
    }
    if flags.contains(InitFlags::NOTIF) {
        models.push(Model::builtin("ietf-netconf-notifications", "ncn"));
        models.push(Model::builtin("nc-notifications", "manageEvent"));
        models.push(Model::builtin("notifications", "ncEvent"));
    }
    models
}

impl Library {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn ensure_init(&self) -> Result<()> {
        if self.flags.is_none() {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    fn register_model(&mut self, model: Model) {
        if self.models.contains_key(&model.name) {
            log::debug!("module {} is already registered", model.name);
            return;
        }
        match &model.path {
            Some(path) => log::debug!(
                "registering module {} ({}) from {}",
                model.name,
                model.namespace,
                path.display()
            ),
            None => log::debug!("registering module {} ({})", model.name, model.namespace),
        }
        self.models.insert(model.name.clone(), model);
        self.consolidated = false;
    }
}

impl NetconfLibrary for Library {
    type Datastore = Datastore;

    fn init(&mut self, flags: InitFlags) -> Result<u32> {
        if self.flags.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        if flags.contains(InitFlags::MULTILAYER) && flags.contains(InitFlags::SINGLELAYER) {
            return Err(Error::InvalidFlags(flags.bits()));
        }
        for model in builtin_models(flags) {
            self.models.insert(model.name.clone(), model);
        }
        self.flags = Some(flags);
        self.next_id = 1;
        log::debug!("library initialized (flags {:#06x})", flags.bits());

        // no other server instance shares this library
        Ok(0)
    }

    fn add_model(&mut self, path: &Path) -> Result<()> {
        self.ensure_init()?;
        let model = Model::load(path)?;
        self.register_model(model);
        Ok(())
    }

    fn new_transapi_static(
        &mut self,
        kind: DatastoreType,
        model: &Path,
        transapi: Box<dyn TransApi>,
    ) -> Result<Datastore> {
        self.ensure_init()?;
        if kind != DatastoreType::File {
            return Err(Error::Unsupported(kind));
        }
        let model = Model::load(model)?;
        if model.name != transapi.module() {
            return Err(Error::TransApi {
                module: model.name,
                reason: format!("callbacks belong to module {}", transapi.module()),
            });
        }
        Ok(Datastore {
            model,
            path: None,
            transapi,
        })
    }

    fn file_set_path(&mut self, ds: &mut Datastore, path: &Path) -> Result<()> {
        self.ensure_init()?;
        if FileStore::create_if_missing(path)? {
            log::info!("Created empty datastore {}", path.display());
        }
        ds.path = Some(path.to_path_buf());
        Ok(())
    }

    fn feature_enable(&mut self, module: &str, feature: &str) -> Result<()> {
        self.ensure_init()?;
        log::debug!("enabling feature {}:{}", module, feature);
        self.features
            .entry(module.to_string())
            .or_default()
            .insert(feature.to_string());
        self.consolidated = false;
        Ok(())
    }

    fn datastore_init(&mut self, ds: Datastore) -> Result<DatastoreId> {
        self.ensure_init()?;
        let path = ds
            .path
            .ok_or_else(|| Error::NoFilePath(ds.model.name.clone()))?;
        FileStore::open(&path)?;

        let id = DatastoreId(self.next_id);
        self.next_id += 1;
        let module = ds.model.name.clone();
        self.register_model(ds.model);
        self.datastores.insert(
            id,
            Registered {
                module,
                path,
                transapi: ds.transapi,
                online: false,
            },
        );
        Ok(id)
    }

    fn consolidate(&mut self) -> Result<()> {
        self.ensure_init()?;
        for model in self.models.values() {
            for import in &model.imports {
                if !self.models.contains_key(&import.module) {
                    return Err(Error::MissingImport {
                        module: model.name.clone(),
                        import: import.module.clone(),
                    });
                }
            }
            for prefix in &model.augment_prefixes {
                if model.resolve_prefix(prefix).is_none() {
                    return Err(Error::UnresolvedAugment {
                        module: model.name.clone(),
                        prefix: prefix.clone(),
                    });
                }
            }
        }
        for (module, features) in &self.features {
            let model = self
                .models
                .get(module)
                .ok_or_else(|| Error::UnknownModule(module.clone()))?;
            if let Some(feature) = features.iter().find(|f| !model.features.contains(*f)) {
                return Err(Error::UnknownFeature {
                    module: module.clone(),
                    feature: feature.clone(),
                });
            }
        }
        self.consolidated = true;
        log::debug!("consolidated {} data models", self.models.len());
        Ok(())
    }

    fn device_init(&mut self, id: Option<DatastoreId>, force: bool) -> Result<()> {
        self.ensure_init()?;
        if !self.consolidated {
            return Err(Error::NotConsolidated);
        }
        let ids: Vec<DatastoreId> = match id {
            Some(id) if self.datastores.contains_key(&id) => vec![id],
            Some(id) => return Err(Error::UnknownDatastore(id)),
            None => self.datastores.keys().copied().collect(),
        };

        for id in ids {
            let ds = self
                .datastores
                .get_mut(&id)
                .ok_or(Error::UnknownDatastore(id))?;
            if ds.online && !force {
                log::debug!("datastore {} is already online", id);
                continue;
            }

            let mut store = FileStore::open(&ds.path)?;
            if force || store.get(Section::Running).is_empty() {
                let startup = store.get(Section::Startup).to_string();
                store.set(Section::Running, &startup);
                store.save()?;
            }
            let running = store.get(Section::Running);
            ds.transapi.init(running).map_err(|e| Error::TransApi {
                module: ds.module.clone(),
                reason: format!("{:#}", e),
            })?;
            ds.online = true;
            log::info!("Datastore {} ({}) is online", id, ds.module);
        }
        Ok(())
    }

    fn status(&self, id: DatastoreId) -> Result<Option<String>> {
        self.ensure_init()?;
        let ds = self
            .datastores
            .get(&id)
            .ok_or(Error::UnknownDatastore(id))?;
        if !ds.online {
            return Ok(None);
        }
        let store = FileStore::open(&ds.path)?;
        Ok(ds.transapi.get_state(store.get(Section::Running)))
    }

    fn close(&mut self) {
        if self.flags.is_none() {
            return;
        }
        for ds in self.datastores.values_mut() {
            ds.transapi.close();
        }
        *self = Library::default();
        log::debug!("library closed");
    }
}
