//! Data models and datastores shared by the tests.

use std::path::{Path, PathBuf};

pub(crate) const CERT_TO_NAME_YIN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<module name="ietf-x509-cert-to-name"
        xmlns="urn:ietf:params:xml:ns:yang:yin:1"
        xmlns:x509c2n="urn:ietf:params:xml:ns:yang:ietf-x509-cert-to-name"
        xmlns:yang="urn:ietf:params:xml:ns:yang:ietf-yang-types">
  <namespace uri="urn:ietf:params:xml:ns:yang:ietf-x509-cert-to-name"/>
  <prefix value="x509c2n"/>
  <import module="ietf-yang-types">
    <prefix value="yang"/>
  </import>
  <typedef name="tls-fingerprint">
    <type name="yang:hex-string"/>
  </typedef>
  <grouping name="cert-to-name"/>
</module>
"#;

pub(crate) const SERVER_YIN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<module name="ietf-netconf-server"
        xmlns="urn:ietf:params:xml:ns:yang:yin:1"
        xmlns:ncserver="urn:ietf:params:xml:ns:yang:ietf-netconf-server"
        xmlns:inet="urn:ietf:params:xml:ns:yang:ietf-inet-types"
        xmlns:x509c2n="urn:ietf:params:xml:ns:yang:ietf-x509-cert-to-name">
  <namespace uri="urn:ietf:params:xml:ns:yang:ietf-netconf-server"/>
  <prefix value="ncserver"/>
  <import module="ietf-inet-types">
    <prefix value="inet"/>
  </import>
  <import module="ietf-x509-cert-to-name">
    <prefix value="x509c2n"/>
  </import>
  <feature name="ssh"/>
  <feature name="inbound-ssh">
    <if-feature name="ssh"/>
  </feature>
  <feature name="tls"/>
  <container name="netconf-server">
    <container name="listen">
      <container name="ssh">
        <if-feature name="ssh"/>
        <leaf name="port">
          <type name="inet:port-number"/>
        </leaf>
      </container>
    </container>
  </container>
</module>
"#;

pub(crate) const STARTUP: &str = r#"<netconf-server xmlns="urn:ietf:params:xml:ns:yang:ietf-netconf-server"><listen><ssh><port>830</port></ssh></listen></netconf-server>"#;

pub(crate) fn datastore_with_startup(startup: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<datastores xmlns="urn:cesnet:tmc:datastores:file">
  <running lock=""/>
  <startup lock="">{}</startup>
  <candidate modified="false" lock=""/>
</datastores>
"#,
        startup
    )
}

pub(crate) struct Confdir {
    pub(crate) cert_to_name: PathBuf,
    pub(crate) server: PathBuf,
    pub(crate) datastore: PathBuf,
}

/// Lays out `<root>/ietf-netconf-server/` the way the daemon expects it.
/// The datastore file is only written when `startup` is given.
pub(crate) fn write_confdir(root: &Path, startup: Option<&str>) -> Confdir {
    let dir = root.join("ietf-netconf-server");
    std::fs::create_dir_all(&dir).unwrap();
    let confdir = Confdir {
        cert_to_name: dir.join("ietf-x509-cert-to-name.yin"),
        server: dir.join("ietf-netconf-server.yin"),
        datastore: dir.join("datastore.xml"),
    };
    std::fs::write(&confdir.cert_to_name, CERT_TO_NAME_YIN).unwrap();
    std::fs::write(&confdir.server, SERVER_YIN).unwrap();
    if let Some(startup) = startup {
        std::fs::write(&confdir.datastore, datastore_with_startup(startup)).unwrap();
    }
    confdir
}
