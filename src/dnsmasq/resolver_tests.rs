//! Tests for config-set discovery.

use std::path::Path;

use tempfile::TempDir;

use super::resolver::{IncludeSource, ensure_managed_include, resolve_config_set};

const MANAGED: &str = "zz-admin.conf";

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

/// A main config with a conf-dir and a couple of members.
fn fixture() -> (TempDir, std::path::PathBuf) {
    let tmp = TempDir::new().unwrap();
    let confd = tmp.path().join("dnsmasq.d");
    std::fs::create_dir(&confd).unwrap();

    write(tmp.path(), "dnsmasq.conf", &format!("port=53\nconf-dir={}\n", confd.display()));
    write(&confd, "10-lan.conf", "interface=eth0\n");
    write(&confd, "20-guests.conf", "interface=wlan0\n");

    (tmp, confd)
}

mod discovery {
    use super::*;

    #[tokio::test]
    async fn main_file_comes_first_then_sorted_members() {
        let (tmp, _) = fixture();
        let set = resolve_config_set(&tmp.path().join("dnsmasq.conf"), MANAGED)
            .await
            .unwrap();

        let names: Vec<&str> = set.entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["dnsmasq.conf", "10-lan.conf", "20-guests.conf"]);
        assert_eq!(set.entries[0].source, IncludeSource::Main);
        assert_eq!(set.entries[1].source, IncludeSource::ConfDir);
    }

    #[tokio::test]
    async fn conf_file_directive_is_followed() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "extra.conf", "domain=lan\n");
        write(
            tmp.path(),
            "dnsmasq.conf",
            &format!("conf-file={}\n", tmp.path().join("extra.conf").display()),
        );

        let set = resolve_config_set(&tmp.path().join("dnsmasq.conf"), MANAGED)
            .await
            .unwrap();

        assert_eq!(set.entries.len(), 2);
        assert_eq!(set.entries[1].file_name, "extra.conf");
        assert_eq!(set.entries[1].source, IncludeSource::ConfFile);
    }

    #[tokio::test]
    async fn relative_conf_file_resolves_against_main_dir() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "extra.conf", "");
        write(tmp.path(), "dnsmasq.conf", "conf-file=extra.conf\n");

        let set = resolve_config_set(&tmp.path().join("dnsmasq.conf"), MANAGED)
            .await
            .unwrap();

        assert_eq!(set.entries[1].path, tmp.path().join("extra.conf"));
    }

    #[tokio::test]
    async fn missing_main_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = resolve_config_set(&tmp.path().join("nope.conf"), MANAGED).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_conf_dir_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "dnsmasq.conf", "conf-dir=/definitely/not/here\n");

        let set = resolve_config_set(&tmp.path().join("dnsmasq.conf"), MANAGED)
            .await
            .unwrap();

        assert_eq!(set.entries.len(), 1);
        assert!(set.managed_file_path.is_none());
    }
}

mod conf_dir_rules {
    use super::*;

    #[tokio::test]
    async fn backup_hidden_and_hash_wrapped_names_are_skipped() {
        let (tmp, confd) = fixture();
        write(&confd, "old.conf~", "");
        write(&confd, ".hidden.conf", "");
        write(&confd, "#editing.conf#", "");

        let set = resolve_config_set(&tmp.path().join("dnsmasq.conf"), MANAGED)
            .await
            .unwrap();

        let names: Vec<&str> = set.entries.iter().map(|e| e.file_name.as_str()).collect();
        assert!(!names.iter().any(|n| n.contains("old")));
        assert!(!names.iter().any(|n| n.contains("hidden")));
        assert!(!names.iter().any(|n| n.contains("editing")));
    }

    #[tokio::test]
    async fn plain_extension_filters_exclude() {
        let tmp = TempDir::new().unwrap();
        let confd = tmp.path().join("dnsmasq.d");
        std::fs::create_dir(&confd).unwrap();
        write(&confd, "keep.conf", "");
        write(&confd, "skip.bak", "");
        write(
            tmp.path(),
            "dnsmasq.conf",
            &format!("conf-dir={},.bak\n", confd.display()),
        );

        let set = resolve_config_set(&tmp.path().join("dnsmasq.conf"), MANAGED)
            .await
            .unwrap();

        let names: Vec<&str> = set.entries.iter().map(|e| e.file_name.as_str()).collect();
        assert!(names.contains(&"keep.conf"));
        assert!(!names.contains(&"skip.bak"));
    }

    #[tokio::test]
    async fn starred_extension_filters_are_a_whitelist() {
        let tmp = TempDir::new().unwrap();
        let confd = tmp.path().join("dnsmasq.d");
        std::fs::create_dir(&confd).unwrap();
        write(&confd, "keep.conf", "");
        write(&confd, "skip.txt", "");
        write(
            tmp.path(),
            "dnsmasq.conf",
            &format!("conf-dir={},*.conf\n", confd.display()),
        );

        let set = resolve_config_set(&tmp.path().join("dnsmasq.conf"), MANAGED)
            .await
            .unwrap();

        let names: Vec<&str> = set.entries.iter().map(|e| e.file_name.as_str()).collect();
        assert!(names.contains(&"keep.conf"));
        assert!(!names.contains(&"skip.txt"));
    }
}

mod managed_file {
    use super::*;

    #[tokio::test]
    async fn managed_path_points_into_the_first_conf_dir() {
        let (tmp, confd) = fixture();
        let set = resolve_config_set(&tmp.path().join("dnsmasq.conf"), MANAGED)
            .await
            .unwrap();

        assert_eq!(set.managed_file_path, Some(confd.join(MANAGED)));
        // Not yet on disk, so no entry is managed.
        assert!(set.managed_entry().is_none());
    }

    #[tokio::test]
    async fn existing_managed_member_is_flagged() {
        let (tmp, confd) = fixture();
        write(&confd, MANAGED, "domain=lan\n");

        let set = resolve_config_set(&tmp.path().join("dnsmasq.conf"), MANAGED)
            .await
            .unwrap();

        let managed = set.managed_entry().unwrap();
        assert_eq!(managed.file_name, MANAGED);
        assert_eq!(set.entries.iter().filter(|e| e.is_managed).count(), 1);
    }

    #[tokio::test]
    async fn duplicate_include_keeps_last_position_only() {
        let (tmp, confd) = fixture();
        write(&confd, MANAGED, "domain=lan\n");
        // Registered via conf-file as well, after the conf-dir.
        let main = tmp.path().join("dnsmasq.conf");
        let managed_path = confd.join(MANAGED);
        ensure_managed_include(&main, &managed_path).await.unwrap();

        let set = resolve_config_set(&main, MANAGED).await.unwrap();

        let managed_positions: Vec<usize> = set
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.path == managed_path)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(managed_positions.len(), 1);
        // The surviving occurrence is the trailing conf-file one.
        assert_eq!(managed_positions[0], set.entries.len() - 1);
        assert_eq!(set.entries.iter().filter(|e| e.is_managed).count(), 1);
    }
}

mod registration {
    use super::*;

    #[tokio::test]
    async fn appends_conf_file_line_once() {
        let (tmp, confd) = fixture();
        let main = tmp.path().join("dnsmasq.conf");
        let managed_path = confd.join(MANAGED);

        assert!(ensure_managed_include(&main, &managed_path).await.unwrap());
        assert!(!ensure_managed_include(&main, &managed_path).await.unwrap());

        let content = std::fs::read_to_string(&main).unwrap();
        let expected = format!("conf-file={}", managed_path.display());
        assert_eq!(content.matches(&expected).count(), 1);
        assert!(content.ends_with(&format!("{expected}\n")));
    }

    #[tokio::test]
    async fn adds_missing_trailing_newline_before_appending() {
        let tmp = TempDir::new().unwrap();
        let main = tmp.path().join("dnsmasq.conf");
        std::fs::write(&main, "port=53").unwrap();

        ensure_managed_include(&main, Path::new("/etc/dnsmasq.d/zz.conf"))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&main).unwrap();
        assert!(content.starts_with("port=53\nconf-file="));
    }
}
