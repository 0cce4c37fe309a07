use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::{Error, Result};

/// Contents of a freshly created file datastore.
pub(crate) const SKELETON: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<datastores xmlns="urn:cesnet:tmc:datastores:file">
  <running lock=""/>
  <startup lock=""/>
  <candidate modified="false" lock=""/>
</datastores>
"#;

lazy_static! {
    static ref ROOT_RE: Regex = Regex::new(r"^\s*(?:<\?xml[^>]*\?>\s*)?<datastores[\s>]").unwrap();
    static ref RUNNING_RE: Regex = section_re("running");
    static ref STARTUP_RE: Regex = section_re("startup");
    static ref CANDIDATE_RE: Regex = section_re("candidate");
}

fn section_re(name: &str) -> Regex {
    Regex::new(&format!(
        r"(?s)<{name}(?P<attrs>(?:\s[^>]*?)?)(?:/>|>(?P<body>.*?)</{name}>)",
        name = name
    ))
    .unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    Running,
    Startup,
    Candidate,
}

impl Section {
    /// Document order of the sections.
    const ALL: [Section; 3] = [Section::Running, Section::Startup, Section::Candidate];

    fn name(self) -> &'static str {
        match self {
            Section::Running => "running",
            Section::Startup => "startup",
            Section::Candidate => "candidate",
        }
    }

    fn regex(self) -> &'static Regex {
        match self {
            Section::Running => &RUNNING_RE,
            Section::Startup => &STARTUP_RE,
            Section::Candidate => &CANDIDATE_RE,
        }
    }
}

/// A file datastore: running, startup and candidate configurations kept in
/// one XML document.
pub(crate) struct FileStore {
    path: PathBuf,
    text: String,
}

impl FileStore {
    /// Writes an empty datastore at `path` unless something is already there.
    pub(crate) fn create_if_missing(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        std::fs::write(path, SKELETON).map_err(|e| Error::io(path, e))?;
        Ok(true)
    }

    pub(crate) fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let store = FileStore {
            path: path.to_path_buf(),
            text,
        };
        if store.section(Section::Candidate).is_none() {
            return Err(Error::InvalidDatastore {
                path: path.to_path_buf(),
            });
        }
        Ok(store)
    }

    /// Finds `section` below the root element. Sections are matched one
    /// after the other, so configuration inside running never passes for
    /// the startup or candidate section.
    fn section(&self, section: Section) -> Option<Captures<'_>> {
        let mut start = ROOT_RE.find(&self.text)?.end();
        for s in Section::ALL {
            let caps = s.regex().captures_at(&self.text, start)?;
            if s == section {
                return Some(caps);
            }
            start = caps.get(0)?.end();
        }
        None
    }

    /// Configuration held in `section`, empty when the section is empty.
    pub(crate) fn get(&self, section: Section) -> &str {
        self.section(section)
            .and_then(|c| c.name("body"))
            .map(|m| m.as_str().trim())
            .unwrap_or("")
    }

    pub(crate) fn set(&mut self, section: Section, config: &str) {
        let name = section.name();
        let config = config.trim();
        let (range, replacement) = match self.section(section) {
            Some(caps) => {
                let attrs = &caps["attrs"];
                let replacement = if config.is_empty() {
                    format!("<{}{}/>", name, attrs)
                } else {
                    format!("<{}{}>{}</{}>", name, attrs, config, name)
                };
                (caps.get(0).map_or(0..0, |m| m.range()), replacement)
            }
            None => return,
        };
        self.text.replace_range(range, &replacement);
    }

    pub(crate) fn save(&self) -> Result<()> {
        std::fs::write(&self.path, &self.text).map_err(|e| Error::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datastore.xml");
        assert!(FileStore::create_if_missing(&path).unwrap());
        assert!(!FileStore::create_if_missing(&path).unwrap());

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get(Section::Running), "");
        assert_eq!(store.get(Section::Startup), "");
        assert_eq!(store.get(Section::Candidate), "");
    }

    #[test]
    fn test_set_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datastore.xml");
        FileStore::create_if_missing(&path).unwrap();

        let mut store = FileStore::open(&path).unwrap();
        store.set(Section::Running, "<netconf-server/>");
        store.save().unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get(Section::Running), "<netconf-server/>");
        assert_eq!(store.get(Section::Startup), "");

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(r#"<running lock=""><netconf-server/></running>"#));

        let mut store = store;
        store.set(Section::Running, "");
        assert_eq!(store.get(Section::Running), "");
        assert!(store.text.contains(r#"<running lock=""/>"#));
    }

    #[test]
    fn test_sections_in_document_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datastore.xml");
        std::fs::write(
            &path,
            r#"<datastores>
  <running lock=""><log><startup>boot</startup><candidate/></log></running>
  <startup lock=""><netconf-server/></startup>
  <candidate modified="false" lock=""/>
</datastores>"#,
        )
        .unwrap();

        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(
            store.get(Section::Running),
            "<log><startup>boot</startup><candidate/></log>"
        );
        assert_eq!(store.get(Section::Startup), "<netconf-server/>");
        assert_eq!(store.get(Section::Candidate), "");

        store.set(Section::Startup, "");
        store.set(Section::Candidate, "<x/>");
        assert_eq!(store.get(Section::Startup), "");
        assert_eq!(store.get(Section::Candidate), "<x/>");
        assert!(store.text.contains("<log><startup>boot</startup><candidate/></log>"));
        assert!(store.text.contains(r#"<startup lock=""/>"#));
    }

    #[test]
    fn test_open_rejects_other_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datastore.xml");
        std::fs::write(&path, "<config><running/></config>").unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(Error::InvalidDatastore { .. })
        ));

        std::fs::write(&path, "<datastores><running/></datastores>").unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(Error::InvalidDatastore { .. })
        ));
    }
}
