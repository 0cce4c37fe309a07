use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use super::{Error, Result};

lazy_static! {
    static ref MODULE_RE: Regex = Regex::new(r#"<module\s+name="(?P<name>[^"]+)""#).unwrap();
    static ref NAMESPACE_RE: Regex = Regex::new(r#"<namespace\s+uri="(?P<uri>[^"]+)""#).unwrap();
    static ref PREFIX_RE: Regex = Regex::new(r#"<prefix\s+value="(?P<prefix>[^"]+)""#).unwrap();
    static ref IMPORT_RE: Regex = Regex::new(
        r#"(?s)<import\s+module="(?P<module>[^"]+)"\s*(?:/>|>(?P<body>.*?)</import>)"#
    )
    .unwrap();
    static ref FEATURE_RE: Regex = Regex::new(r#"<feature\s+name="(?P<name>[^"]+)""#).unwrap();
    static ref AUGMENT_RE: Regex =
        Regex::new(r#"<augment\s+target-node="(?P<target>[^"]+)""#).unwrap();
    static ref NODE_PREFIX_RE: Regex = Regex::new(r"/(?P<prefix>[-\w.]+):").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Import {
    pub(crate) module: String,
    pub(crate) prefix: Option<String>,
}

/// Header of a YIN data model: identity, linkage and declared features.
/// The schema body is left to the consumers of the model.
#[derive(Debug, Clone)]
pub(crate) struct Model {
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) prefix: String,
    pub(crate) imports: Vec<Import>,
    pub(crate) features: BTreeSet<String>,
    /// Prefixes used by `augment` target nodes.
    pub(crate) augment_prefixes: BTreeSet<String>,
    pub(crate) path: Option<PathBuf>,
}

impl Model {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut model = Self::parse(&text).map_err(|reason| Error::InvalidModel {
            path: path.to_path_buf(),
            reason,
        })?;
        model.path = Some(path.to_path_buf());
        Ok(model)
    }

    pub(crate) fn parse(text: &str) -> std::result::Result<Self, String> {
        let name = MODULE_RE
            .captures(text)
            .ok_or_else(|| "no module statement".to_string())?["name"]
            .to_string();
        let namespace = NAMESPACE_RE
            .captures(text)
            .ok_or_else(|| format!("module {} has no namespace", name))?["uri"]
            .to_string();

        let mut imports = vec![];
        for caps in IMPORT_RE.captures_iter(text) {
            let prefix = caps
                .name("body")
                .and_then(|body| PREFIX_RE.captures(body.as_str()))
                .map(|p| p["prefix"].to_string());
            imports.push(Import {
                module: caps["module"].to_string(),
                prefix,
            });
        }

        // import bodies carry their own prefix statements
        let header = IMPORT_RE.replace_all(text, "");
        let prefix = PREFIX_RE
            .captures(&header)
            .ok_or_else(|| format!("module {} has no prefix", name))?["prefix"]
            .to_string();

        let features = FEATURE_RE
            .captures_iter(text)
            .map(|c| c["name"].to_string())
            .collect();

        let mut augment_prefixes = BTreeSet::new();
        for caps in AUGMENT_RE.captures_iter(text) {
            for p in NODE_PREFIX_RE.captures_iter(&caps["target"]) {
                augment_prefixes.insert(p["prefix"].to_string());
            }
        }

        Ok(Model {
            name,
            namespace,
            prefix,
            imports,
            features,
            augment_prefixes,
            path: None,
        })
    }

    /// A model compiled into the library itself.
    pub(crate) fn builtin(name: &str, prefix: &str) -> Self {
        Model {
            name: name.to_string(),
            namespace: format!("urn:ietf:params:xml:ns:yang:{}", name),
            prefix: prefix.to_string(),
            imports: vec![],
            features: BTreeSet::new(),
            augment_prefixes: BTreeSet::new(),
            path: None,
        }
    }

    /// Module name bound to `prefix` inside this model.
    pub(crate) fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        if prefix == self.prefix {
            return Some(&self.name);
        }
        self.imports
            .iter()
            .find(|i| i.prefix.as_deref() == Some(prefix))
            .map(|i| i.module.as_str())
    }
}
