//! Per-node software and hardware histograms

use serde::Serialize;
use serde_json::Value;

use crate::histogram::Histogram;

const DISTRO_FIELDS: [&str; 4] = ["distro", "distro_version", "distro_codename", "distro_description"];

/// Histograms built from `osd metadata` answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SysInfo {
    pub os_info: Histogram,
    pub kernel_versions: Histogram,
    pub kernel_types: Histogram,
    pub distros: Histogram,
    pub cpus: Histogram,
    pub cpu_archs: Histogram,
    pub ceph_versions: Histogram,
}

impl Default for SysInfo {
    fn default() -> Self {
        Self {
            os_info: Histogram::new("os"),
            kernel_versions: Histogram::new("version"),
            kernel_types: Histogram::new("type"),
            distros: Histogram::new("distro"),
            cpus: Histogram::new("cpu"),
            cpu_archs: Histogram::new("arch"),
            ceph_versions: Histogram::new("version"),
        }
    }
}

impl SysInfo {
    /// Count one node's metadata. Fields the node did not report are left out.
    pub fn record(&mut self, meta: &Value) {
        if let Some(version) = text(meta, "ceph_version").and_then(ceph_version_key) {
            self.ceph_versions.increment(version);
        }

        let dimensions = [
            (&mut self.os_info, "os"),
            (&mut self.kernel_versions, "kernel_version"),
            (&mut self.kernel_types, "kernel_description"),
            (&mut self.cpus, "cpu"),
            (&mut self.cpu_archs, "arch"),
        ];
        for (histogram, field) in dimensions {
            if let Some(value) = text(meta, field) {
                histogram.increment(value);
            }
        }

        if let Some(distro) = distro_key(meta) {
            self.distros.increment(distro);
        }
    }
}

fn text<'a>(meta: &'a Value, field: &str) -> Option<&'a str> {
    meta.get(field).and_then(Value::as_str)
}

/// `"ceph version 0.80.1 (a38fe11)"` becomes `"0.80.1(a38fe11)"`.
pub(crate) fn ceph_version_key(raw: &str) -> Option<String> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    match tokens.as_slice() {
        [] => None,
        [_, _, version] => Some(version.to_string()),
        [_, _, version, build, ..] => Some(format!("{}{}", version, build)),
        _ => Some(tokens.join(" ")),
    }
}

/// `"<distro> <version> <codename> (<description>)"`, only when all four parts are present.
pub(crate) fn distro_key(meta: &Value) -> Option<String> {
    let [distro, version, codename, description] = DISTRO_FIELDS.map(|field| text(meta, field));
    Some(format!(
        "{} {} {} ({})",
        distro?, version?, codename?, description?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(os: &str) -> Value {
        json!({
            "arch": "x86_64",
            "ceph_version": "ceph version 0.80.1 (a38fe1169b6d2ac98b427334c12d7cf81f809b74)",
            "cpu": "Intel(R) Xeon(R) CPU E5-2620 0 @ 2.00GHz",
            "distro": "Ubuntu",
            "distro_codename": "trusty",
            "distro_description": "Ubuntu 14.04 LTS",
            "distro_version": "14.04",
            "kernel_description": "#42-Ubuntu SMP",
            "kernel_version": "3.13.0-24-generic",
            "os": os
        })
    }

    #[test]
    fn test_record_counts_every_dimension() {
        let mut sysinfo = SysInfo::default();
        sysinfo.record(&node("Linux"));
        sysinfo.record(&node("Linux"));

        assert_eq!(sysinfo.os_info.count("Linux"), 2);
        assert_eq!(sysinfo.kernel_versions.count("3.13.0-24-generic"), 2);
        assert_eq!(sysinfo.kernel_types.count("#42-Ubuntu SMP"), 2);
        assert_eq!(sysinfo.distros.count("Ubuntu 14.04 trusty (Ubuntu 14.04 LTS)"), 2);
        assert_eq!(sysinfo.cpu_archs.count("x86_64"), 2);
        assert_eq!(
            sysinfo.ceph_versions.count("0.80.1(a38fe1169b6d2ac98b427334c12d7cf81f809b74)"),
            2
        );
    }

    #[test]
    fn test_partial_distro_is_skipped() {
        let mut meta = node("Linux");
        meta.as_object_mut().unwrap().remove("distro_codename");

        let mut sysinfo = SysInfo::default();
        sysinfo.record(&meta);
        assert!(sysinfo.distros.is_empty());
        assert_eq!(sysinfo.os_info.count("Linux"), 1);
    }

    #[test]
    fn test_ceph_version_key() {
        assert_eq!(ceph_version_key("ceph version 0.80.1").as_deref(), Some("0.80.1"));
        assert_eq!(
            ceph_version_key("ceph version 17.2.6 (d7ff0d10) quincy (stable)").as_deref(),
            Some("17.2.6(d7ff0d10)")
        );
        assert_eq!(ceph_version_key("custom-build").as_deref(), Some("custom-build"));
        assert_eq!(ceph_version_key("  "), None);
    }

    #[test]
    fn test_serialized_names() {
        let mut sysinfo = SysInfo::default();
        sysinfo.record(&node("Linux"));
        let value = serde_json::to_value(&sysinfo).unwrap();
        assert_eq!(value["os_info"], json!([{"os": "Linux", "count": 1}]));
        assert_eq!(value["cpu_archs"], json!([{"arch": "x86_64", "count": 1}]));
        assert_eq!(value["kernel_types"][0]["type"], "#42-Ubuntu SMP");
        assert!(value["ceph_versions"][0]["version"].is_string());
    }
}
