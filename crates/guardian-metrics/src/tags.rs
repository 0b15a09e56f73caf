use std::collections::HashMap;

use guardian_core::StructureSubtype;

/// The tag key a structure's metrics are scoped under: containers are
/// tagged by their host, applications by their own name (mirrors the
/// source's `TAGS` table).
pub fn tag_key_for(subtype: StructureSubtype) -> &'static str {
    match subtype {
        StructureSubtype::Container => "host",
        StructureSubtype::Application => "structure",
    }
}

/// The derived-metric names produced for a structure subtype.
pub fn derived_metrics_for(subtype: StructureSubtype) -> Vec<String> {
    source_metrics_for(subtype).into_keys().collect()
}

/// Derived metric -> raw series it aggregates from (§4.2 fixed mappings).
pub fn source_metrics_for(subtype: StructureSubtype) -> HashMap<String, Vec<String>> {
    match subtype {
        StructureSubtype::Container => HashMap::from([
            ("structure.cpu.usage".to_string(), vec!["proc.cpu.user".to_string(), "proc.cpu.kernel".to_string()]),
            ("structure.mem.usage".to_string(), vec!["proc.mem.resident".to_string()]),
        ]),
        StructureSubtype::Application => HashMap::from([
            ("structure.cpu.usage".to_string(), vec!["structure.cpu.usage".to_string()]),
            ("structure.mem.usage".to_string(), vec!["structure.mem.usage".to_string()]),
            ("structure.energy.usage".to_string(), vec!["structure.energy.usage".to_string()]),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_tag_is_host() {
        assert_eq!(tag_key_for(StructureSubtype::Container), "host");
    }

    #[test]
    fn application_tag_is_structure() {
        assert_eq!(tag_key_for(StructureSubtype::Application), "structure");
    }

    #[test]
    fn container_mapping_has_no_energy() {
        let mapping = source_metrics_for(StructureSubtype::Container);
        assert!(!mapping.contains_key("structure.energy.usage"));
        assert_eq!(mapping["structure.cpu.usage"], vec!["proc.cpu.user", "proc.cpu.kernel"]);
    }

    #[test]
    fn application_mapping_passes_metrics_through_unchanged() {
        let mapping = source_metrics_for(StructureSubtype::Application);
        assert_eq!(mapping["structure.energy.usage"], vec!["structure.energy.usage"]);
    }
}
