//! Per-path default column tables.
//!
//! Each table lists `(column_id, visible_by_default)` in display order. The
//! positional legacy format is zipped against these tables, and
//! `PathContext::is_column_visible` falls back to them.

const EC2_COLUMNS: &[(&str, bool)] = &[
    ("pretty_name", true),
    ("instance_type", true),
    ("family", false),
    ("memory", true),
    ("ECU", false),
    ("vCPU", true),
    ("memory_per_vcpu", false),
    ("GPU", false),
    ("GPU_model", false),
    ("GPU_memory", false),
    ("compute_capability", false),
    ("FPGA", false),
    ("ECU_per_vcpu", false),
    ("physical_processor", false),
    ("clock_speed_ghz", false),
    ("intel_avx", false),
    ("intel_avx2", false),
    ("intel_avx512", false),
    ("intel_turbo", false),
    ("storage", true),
    ("warmed-up", false),
    ("trim-support", false),
    ("arch", false),
    ("network_performance", true),
    ("ebs_baseline_bandwidth", false),
    ("ebs_baseline_throughput", false),
    ("ebs_baseline_iops", false),
    ("ebs_max_bandwidth", false),
    ("ebs_throughput", false),
    ("ebs_iops", false),
    ("ebs_as_nvme", false),
    ("maxips", false),
    ("maxenis", false),
    ("enhanced_networking", false),
    ("vpc_only", false),
    ("ipv6_support", false),
    ("placement_group_support", false),
    ("linux_virtualization_types", false),
    ("emr", false),
    ("availability_zones", false),
    ("cost-ondemand", true),
    ("cost-reserved", true),
    ("cost-spot-min", true),
    ("cost-spot-max", false),
    ("cost-ondemand-rhel", false),
    ("cost-reserved-rhel", false),
    ("cost-spot-min-rhel", false),
    ("cost-spot-max-rhel", false),
    ("cost-ondemand-sles", false),
    ("cost-reserved-sles", false),
    ("cost-spot-min-sles", false),
    ("cost-spot-max-sles", false),
    ("cost-ondemand-mswin", true),
    ("cost-reserved-mswin", true),
    ("cost-spot-min-mswin", false),
    ("cost-spot-max-mswin", false),
    ("cost-ondemand-dedicated", false),
    ("cost-reserved-dedicated", false),
    ("cost-ondemand-mswinSQLWeb", false),
    ("cost-reserved-mswinSQLWeb", false),
    ("cost-ondemand-mswinSQL", false),
    ("cost-reserved-mswinSQL", false),
    ("cost-ondemand-mswinSQLEnterprise", false),
    ("cost-reserved-mswinSQLEnterprise", false),
    ("cost-ondemand-linuxSQLWeb", false),
    ("cost-reserved-linuxSQLWeb", false),
    ("cost-ondemand-linuxSQL", false),
    ("cost-reserved-linuxSQL", false),
    ("cost-ondemand-linuxSQLEnterprise", false),
    ("cost-reserved-linuxSQLEnterprise", false),
    ("spot-interrupt-rate", false),
    ("cost-emr", false),
    ("generation", false),
];

const CACHE_COLUMNS: &[(&str, bool)] = &[
    ("pretty_name", true),
    ("instance_type", true),
    ("memory", true),
    ("vcpus", true),
    ("networkperf", true),
    ("cost-ondemand-redis", true),
    ("cost-reserved-redis", true),
    ("cost-ondemand-memcached", true),
    ("cost-reserved-memcached", true),
    ("cost-ondemand-valkey", true),
    ("cost-reserved-valkey", true),
    ("generation", false),
];

const OPENSEARCH_COLUMNS: &[(&str, bool)] = &[
    ("pretty_name", true),
    ("instance_type", true),
    ("memory", true),
    ("vcpu", true),
    ("storage", true),
    ("ecu", false),
    ("cost-ondemand", true),
    ("cost-reserved", true),
    ("generation", false),
];

const RDS_COLUMNS: &[(&str, bool)] = &[
    ("name", true),
    ("apiname", true),
    ("memory", true),
    ("storage", true),
    ("ebs-throughput", false),
    ("physical_processor", false),
    ("vcpus", true),
    ("networkperf", true),
    ("architecture", false),
    ("cost-ondemand-14", true),
    ("cost-reserved-14t", true),
    ("cost-ondemand-2", true),
    ("cost-reserved-2", true),
    ("cost-ondemand-10", true),
    ("cost-reserved-10", true),
    ("cost-ondemand-11", true),
    ("cost-reserved-11", true),
    ("cost-ondemand-12", true),
    ("cost-reserved-12", true),
    ("cost-ondemand-15", true),
    ("cost-reserved-15", true),
    ("cost-ondemand-21", true),
    ("cost-reserved-21", true),
    ("cost-ondemand-211", true),
    ("cost-ondemand-18", true),
    ("cost-reserved-18", true),
    ("cost-ondemand-5", true),
    ("cost-reserved-5", true),
    ("ebs-baseline-bandwidth", false),
    ("ebs-baseline-throughput", false),
    ("ebs-baseline-iops", false),
    ("ebs-max-bandwidth", false),
    ("ebs-max-throughput", false),
    ("ebs-iops", false),
];

const REDSHIFT_COLUMNS: &[(&str, bool)] = &[
    ("pretty_name", true),
    ("instance_type", true),
    ("memory", true),
    ("vCPU", true),
    ("storage", true),
    ("io", true),
    ("ECU", false),
    ("generation", false),
    ("cost-ondemand", true),
    ("cost-reserved", true),
];

const AZURE_COLUMNS: &[(&str, bool)] = &[
    ("pretty_name_azure", true),
    ("instance_type", true),
    ("memory", true),
    ("vcpu", true),
    ("memory_per_vcpu", false),
    ("GPU", false),
    ("size", true),
    ("linux-ondemand", true),
    ("linux-savings", true),
    ("linux-reserved", true),
    ("linux-spot", true),
    ("windows-ondemand", true),
    ("windows-savings", true),
    ("windows-reserved", true),
    ("windows-spot", true),
];

/// Ordered default column table for `path`; empty for unknown paths.
pub fn default_columns(path: &str) -> &'static [(&'static str, bool)] {
    match path {
        "/" => EC2_COLUMNS,
        "/rds" => RDS_COLUMNS,
        "/cache" => CACHE_COLUMNS,
        "/redshift" => REDSHIFT_COLUMNS,
        "/opensearch" => OPENSEARCH_COLUMNS,
        "/azure" => AZURE_COLUMNS,
        _ => &[],
    }
}

/// Default visibility of `column` on `path`, if the column is known.
pub fn default_visibility(path: &str, column: &str) -> Option<bool> {
    default_columns(path)
        .iter()
        .find(|(id, _)| *id == column)
        .map(|(_, visible)| *visible)
}

/// Column id of the vCPU count on `path`.
pub fn vcpu_column(path: &str) -> &'static str {
    match path {
        "/" | "/redshift" => "vCPU",
        "/cache" | "/rds" => "vcpus",
        _ => "vcpu",
    }
}

/// Whether `path` renders the Azure catalog.
pub fn is_azure_path(path: &str) -> bool {
    path == "/azure" || path.starts_with("/azure/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vcpu_spellings() {
        assert_eq!(vcpu_column("/"), "vCPU");
        assert_eq!(vcpu_column("/redshift"), "vCPU");
        assert_eq!(vcpu_column("/cache"), "vcpus");
        assert_eq!(vcpu_column("/rds"), "vcpus");
        assert_eq!(vcpu_column("/azure"), "vcpu");
        assert_eq!(vcpu_column("/opensearch"), "vcpu");
    }

    #[test]
    fn test_default_tables_have_unique_ids() {
        for path in ["/", "/rds", "/cache", "/redshift", "/opensearch", "/azure"] {
            let table = default_columns(path);
            assert!(!table.is_empty(), "{} has no table", path);
            for (i, (id, _)) in table.iter().enumerate() {
                assert!(
                    !table[..i].iter().any(|(other, _)| other == id),
                    "{} repeats column {}",
                    path,
                    id
                );
            }
        }
        assert_eq!(default_columns("/").len(), 73);
    }

    #[test]
    fn test_vcpu_column_is_in_table() {
        for path in ["/", "/rds", "/cache", "/redshift", "/opensearch", "/azure"] {
            assert_eq!(default_visibility(path, vcpu_column(path)), Some(true), "{}", path);
        }
    }

    #[test]
    fn test_default_visibility_lookup() {
        assert_eq!(default_visibility("/", "GPU"), Some(false));
        assert_eq!(default_visibility("/azure", "linux-spot"), Some(true));
        assert_eq!(default_visibility("/azure", "ECU"), None);
        assert_eq!(default_visibility("/unknown", "memory"), None);
    }

    #[test]
    fn test_azure_path_detection() {
        assert!(is_azure_path("/azure"));
        assert!(is_azure_path("/azure/vm"));
        assert!(!is_azure_path("/"));
        assert!(!is_azure_path("/azureish"));
    }
}
