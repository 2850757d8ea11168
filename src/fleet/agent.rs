use super::{NodeHead, SERVER_NODE_ID};

/// Addresses an agent reports inside its version string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeAddresses {
    pub local: Vec<String>,
    pub zerotier: Vec<String>,
    pub tailscale: Vec<String>,
}

impl NodeAddresses {
    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.zerotier.is_empty() && self.tailscale.is_empty()
    }

    /// Short label such as `Local ZeroTier(2)`, `-` when nothing is known.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = [
            ("Local", &self.local),
            ("ZeroTier", &self.zerotier),
            ("Tailscale", &self.tailscale),
        ]
        .iter()
        .filter(|(_, ips)| !ips.is_empty())
        .map(|(label, ips)| match ips.len() {
            1 => label.to_string(),
            n => format!("{}({})", label, n),
        })
        .collect();
        if parts.is_empty() {
            "-".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// Packed agent version: `<version>-<arch>@<ip>+zt:<ip>+ts:<ip>`.
///
/// Everything after the version is optional. Address components without a
/// dot are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentVersion {
    pub version: String,
    pub arch: Option<String>,
    pub addresses: NodeAddresses,
}

impl AgentVersion {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        let mut main = raw.split('-');
        let version = main.next().unwrap_or_default().to_string();
        let rest = main.next().unwrap_or_default();

        let mut rest = rest.split('@');
        let arch = rest
            .next()
            .filter(|arch| !arch.is_empty())
            .map(str::to_string);

        let mut addresses = NodeAddresses::default();
        if let Some(ips) = rest.next() {
            for component in ips.split('+').filter(|c| c.contains('.')) {
                if let Some(ip) = component.strip_prefix("zt:") {
                    addresses.zerotier.push(ip.to_string());
                } else if let Some(ip) = component.strip_prefix("ts:") {
                    addresses.tailscale.push(ip.to_string());
                } else {
                    addresses.local.push(component.to_string());
                }
            }
        }

        Some(Self {
            version,
            arch,
            addresses,
        })
    }
}

/// Version column text: `Server v1.2 (amd64)` for the server node,
/// `v1.2 (amd64)` for agents and `-` when unknown.
pub fn display_version(node: &NodeHead) -> String {
    let parsed = match AgentVersion::parse(&node.agent_version) {
        Some(parsed) => parsed,
        None => return "-".to_string(),
    };
    let prefix = if node.id == SERVER_NODE_ID { "Server v" } else { "v" };
    match parsed.arch {
        Some(arch) => format!("{}{} ({})", prefix, parsed.version, arch),
        None => format!("{}{}", prefix, parsed.version),
    }
}
