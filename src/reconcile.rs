//! Cloud virtual-network reconciliation.
//!
//! Replays an external network description (one or more root address
//! prefixes plus a list of named subnets) into the registry as contexts and
//! exact reservations. Reconciliation is best-effort per entry: a subnet
//! that fails to reserve is skipped with a warning, and a root prefix whose
//! context cannot be created aborts only that prefix, never the others.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::engine::{reserve, ReservationRequest};
use crate::range::AddressRange;
use crate::registry::ContextRegistry;

/// One subnet as described by the cloud provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetDescriptor {
    pub name: String,
    pub address_range: String,
}

/// External description of a virtual network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkDescription {
    /// Root address prefixes, in CIDR notation
    pub address_prefixes: Vec<String>,
    pub subnets: Vec<SubnetDescriptor>,
}

/// Outcome of reconciling one root prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootSummary {
    pub context_name: String,
    pub root: AddressRange,
    pub reserved: usize,
    pub skipped: usize,
}

/// Replay a virtual-network description into the registry.
///
/// Each root prefix becomes a context named `base_name`, suffixed with the
/// prefix index when the description carries more than one prefix. Subnets
/// are routed to the first root that fully contains them; a subnet already
/// claimed under a previous root is not replayed again.
pub fn reconcile(
    registry: &mut ContextRegistry,
    base_name: &str,
    description: &VirtualNetworkDescription,
) -> Vec<RootSummary> {
    let mut summaries = Vec::new();
    let mut claimed = vec![false; description.subnets.len()];
    let multiple_roots = description.address_prefixes.len() > 1;

    for (index, prefix_text) in description.address_prefixes.iter().enumerate() {
        let context_name = if multiple_roots {
            format!("{}-{}", base_name, index)
        } else {
            base_name.to_string()
        };

        let root: AddressRange = match prefix_text.parse() {
            Ok(root) => root,
            Err(error) => {
                warn!(
                    "Skipping root prefix '{}': {}. Remaining prefixes will still be reconciled.",
                    prefix_text, error
                );
                continue;
            }
        };

        if let Err(error) = registry.set_context(&context_name, root, Vec::new()) {
            warn!(
                "Failed to create context '{}' for root {}: {}. Remaining prefixes will still be reconciled.",
                context_name, root, error
            );
            continue;
        }

        let mut summary = RootSummary {
            context_name: context_name.clone(),
            root,
            reserved: 0,
            skipped: 0,
        };

        for (subnet_index, subnet) in description.subnets.iter().enumerate() {
            if claimed[subnet_index] {
                debug!(
                    "Subnet '{}' already reconciled under a previous root",
                    subnet.name
                );
                continue;
            }

            let range: AddressRange = match subnet.address_range.parse() {
                Ok(range) => range,
                Err(error) => {
                    warn!("Skipping subnet '{}': {}", subnet.name, error);
                    summary.skipped += 1;
                    continue;
                }
            };

            if !root.contains(&range) {
                // belongs to a different root prefix
                continue;
            }

            // get_mut cannot miss: the context was created just above
            let context = match registry.get_mut(&context_name) {
                Ok(context) => context,
                Err(_) => break,
            };
            match reserve(context.consumed_mut(), ReservationRequest::Exact(range)) {
                Ok(_) => {
                    claimed[subnet_index] = true;
                    summary.reserved += 1;
                }
                Err(error) => {
                    warn!(
                        "Skipping subnet '{}' ({}): {}",
                        subnet.name, range, error
                    );
                    summary.skipped += 1;
                }
            }
        }

        summaries.push(summary);
    }

    summaries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(text: &str) -> AddressRange {
        text.parse().unwrap()
    }

    fn subnet(name: &str, cidr: &str) -> SubnetDescriptor {
        SubnetDescriptor {
            name: name.to_string(),
            address_range: cidr.to_string(),
        }
    }

    #[test]
    fn test_single_root_keeps_plain_context_name() {
        let mut registry = ContextRegistry::new();
        let description = VirtualNetworkDescription {
            address_prefixes: vec!["10.0.0.0/16".to_string()],
            subnets: vec![subnet("web", "10.0.0.0/24"), subnet("db", "10.0.1.0/24")],
        };

        let summaries = reconcile(&mut registry, "vnet", &description);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].context_name, "vnet");
        assert_eq!(summaries[0].reserved, 2);
        assert_eq!(summaries[0].skipped, 0);
        assert_eq!(
            registry.get("vnet").unwrap().consumed().ranges(),
            &[range("10.0.0.0/24"), range("10.0.1.0/24")]
        );
    }

    #[test]
    fn test_multiple_roots_get_indexed_names_and_route_subnets() {
        let mut registry = ContextRegistry::new();
        let description = VirtualNetworkDescription {
            address_prefixes: vec!["10.0.0.0/16".to_string(), "192.168.0.0/24".to_string()],
            subnets: vec![
                subnet("app", "10.0.5.0/24"),
                subnet("mgmt", "192.168.0.0/25"),
            ],
        };

        let summaries = reconcile(&mut registry, "vnet", &description);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].context_name, "vnet-0");
        assert_eq!(summaries[1].context_name, "vnet-1");
        assert_eq!(summaries[0].reserved, 1);
        assert_eq!(summaries[1].reserved, 1);
        assert_eq!(
            registry.get("vnet-1").unwrap().consumed().ranges(),
            &[range("192.168.0.0/25")]
        );
    }

    #[test]
    fn test_bad_subnets_are_skipped_without_aborting() {
        let mut registry = ContextRegistry::new();
        let description = VirtualNetworkDescription {
            address_prefixes: vec!["10.0.0.0/16".to_string()],
            subnets: vec![
                subnet("good", "10.0.0.0/24"),
                subnet("garbled", "not-a-cidr"),
                subnet("clash", "10.0.0.128/25"),
                subnet("tail", "10.0.9.0/24"),
            ],
        };

        let summaries = reconcile(&mut registry, "vnet", &description);
        assert_eq!(summaries[0].reserved, 2);
        assert_eq!(summaries[0].skipped, 2);
        assert_eq!(
            registry.get("vnet").unwrap().consumed().ranges(),
            &[range("10.0.0.0/24"), range("10.0.9.0/24")]
        );
    }

    #[test]
    fn test_bad_root_prefix_aborts_only_its_own_reconciliation() {
        let mut registry = ContextRegistry::new();
        let description = VirtualNetworkDescription {
            address_prefixes: vec!["10.0.0.1/16".to_string(), "192.168.0.0/24".to_string()],
            subnets: vec![subnet("mgmt", "192.168.0.0/25")],
        };

        let summaries = reconcile(&mut registry, "vnet", &description);
        // misaligned first prefix produced no context, second still ran
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].context_name, "vnet-1");
        assert!(!registry.exists("vnet-0"));
        assert_eq!(summaries[0].reserved, 1);
    }

    #[test]
    fn test_subnet_claimed_by_earlier_root_is_not_replayed() {
        let mut registry = ContextRegistry::new();
        // overlapping prefixes: the /16 claims the subnet first
        let description = VirtualNetworkDescription {
            address_prefixes: vec!["10.0.0.0/16".to_string(), "10.0.0.0/8".to_string()],
            subnets: vec![subnet("app", "10.0.3.0/24")],
        };

        let summaries = reconcile(&mut registry, "vnet", &description);
        assert_eq!(summaries[0].reserved, 1);
        assert_eq!(summaries[1].reserved, 0);
        assert_eq!(summaries[1].skipped, 0);
        assert!(registry.get("vnet-1").unwrap().consumed().is_empty());
    }

    #[test]
    fn test_description_parses_camel_case_json() {
        let json = r#"{
            "addressPrefixes": ["10.0.0.0/16"],
            "subnets": [{"name": "web", "addressRange": "10.0.0.0/24"}]
        }"#;
        let description: VirtualNetworkDescription = serde_json::from_str(json).unwrap();
        assert_eq!(description.address_prefixes, vec!["10.0.0.0/16"]);
        assert_eq!(description.subnets[0].address_range, "10.0.0.0/24");
    }
}
