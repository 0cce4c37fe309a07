//! transAPI of the ietf-netconf-server module.

use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;

use crate::ncds::TransApi;

pub(crate) const MODULE: &str = "ietf-netconf-server";

lazy_static! {
    static ref SSH_RE: Regex = Regex::new(r"(?s)<ssh>(?P<body>.*?)</ssh>").unwrap();
    static ref PORT_RE: Regex = Regex::new(r"<port>\s*(?P<port>[^<]*?)\s*</port>").unwrap();
}

/// Tracks the SSH listen endpoints configured for the server.
#[derive(Debug, Default)]
pub(crate) struct ServerTransApi {
    ssh_ports: Vec<u16>,
}

impl ServerTransApi {
    fn ssh_ports(config: &str) -> anyhow::Result<Vec<u16>> {
        let mut ports = vec![];
        for ssh in SSH_RE.captures_iter(config) {
            for caps in PORT_RE.captures_iter(&ssh["body"]) {
                let port = &caps["port"];
                let port = port
                    .parse::<u16>()
                    .with_context(|| format!("invalid SSH port {:?}", port))?;
                ports.push(port);
            }
        }
        Ok(ports)
    }
}

impl TransApi for ServerTransApi {
    fn module(&self) -> &str {
        MODULE
    }

    fn init(&mut self, running: &str) -> anyhow::Result<()> {
        self.ssh_ports = Self::ssh_ports(running)?;
        if self.ssh_ports.is_empty() {
            log::warn!("No SSH listen port configured");
        }
        for port in &self.ssh_ports {
            log::info!("SSH listen port {}", port);
        }
        Ok(())
    }

    fn close(&mut self) {
        log::debug!("{} transAPI closed", MODULE);
        self.ssh_ports.clear();
    }

    fn get_state(&self, _config: &str) -> Option<String> {
        if self.ssh_ports.is_empty() {
            return None;
        }
        let ports: String = self
            .ssh_ports
            .iter()
            .map(|p| format!("<listening-port>{}</listening-port>", p))
            .collect();
        Some(format!(
            r#"<netconf-server-state xmlns="urn:ietf:params:xml:ns:yang:{}"><ssh>{}</ssh></netconf-server-state>"#,
            MODULE, ports
        ))
    }
}
