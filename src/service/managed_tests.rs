//! Tests for the managed-config service.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use crate::cache::ConfigCache;
use crate::dnsmasq::{ConfigLine, LineKind};

use super::managed::{ChangeValue, ManagedConfigService, OptionChange};
use super::reload::ReloadOutcome;
use super::reload::mock::RecordingReload;
use super::ServiceError;

const MANAGED: &str = "zz-admin.conf";
const FOREIGN_MAC: &str = "de:ad:be:ef:00:01";

struct Fixture {
    _tmp: TempDir,
    main: PathBuf,
    confd: PathBuf,
    hosts: PathBuf,
    cache: Arc<ConfigCache>,
}

impl Fixture {
    fn managed_path(&self) -> PathBuf {
        self.confd.join(MANAGED)
    }

    fn managed_content(&self) -> String {
        std::fs::read_to_string(self.managed_path()).unwrap()
    }

    fn service(&self) -> ManagedConfigService {
        ManagedConfigService::new(Arc::clone(&self.cache), &self.hosts)
    }
}

fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let confd = tmp.path().join("dnsmasq.d");
    std::fs::create_dir(&confd).unwrap();

    let main = tmp.path().join("dnsmasq.conf");
    std::fs::write(&main, format!("port=53\nconf-dir={}\n", confd.display())).unwrap();

    std::fs::write(
        confd.join("30-static.conf"),
        format!("dhcp-host={FOREIGN_MAC},statichost\n"),
    )
    .unwrap();
    std::fs::write(
        confd.join(MANAGED),
        "# reservations\n\
         addn-hosts=/old/path\n\
         dhcp-host=aa:bb:cc:dd:ee:ff,192.168.1.50,printer\n",
    )
    .unwrap();

    let hosts = tmp.path().join("admin.hosts");
    let cache = Arc::new(ConfigCache::new(&main, MANAGED));

    Fixture {
        _tmp: tmp,
        main,
        confd,
        hosts,
        cache,
    }
}

/// A fixture whose main config has no conf-dir: nothing is manageable.
fn unconfigured_fixture() -> Fixture {
    let fx = fixture();
    std::fs::write(&fx.main, "port=53\n").unwrap();
    fx
}

mod read {
    use super::*;

    #[tokio::test]
    async fn managed_config_exposes_lines_and_addn_hosts_path() {
        let fx = fixture();
        let config = fx.service().read_managed_config().await.unwrap();

        assert_eq!(config.lines.len(), 3);
        assert_eq!(config.addn_hosts_path.as_deref(), Some("/old/path"));
    }

    #[tokio::test]
    async fn unconfigured_setup_reads_as_empty() {
        let fx = unconfigured_fixture();
        let config = fx.service().read_managed_config().await.unwrap();

        assert!(config.lines.is_empty());
        assert!(config.addn_hosts_path.is_none());
    }

    #[tokio::test]
    async fn dhcp_hosts_come_back_with_stable_ids() {
        let fx = fixture();
        let entries = fx.service().read_dhcp_hosts().await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "aa:bb:cc:dd:ee:ff|192.168.1.50|printer");
        assert!(entries[0].is_editable);
    }
}

mod write_managed_config {
    use super::*;

    #[tokio::test]
    async fn write_without_managed_path_fails_hard() {
        let fx = unconfigured_fixture();
        let err = fx
            .service()
            .write_managed_config(vec![ConfigLine::other("port=53")])
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::NotConfigured));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn missing_addn_hosts_line_is_inserted_first() {
        let fx = fixture();
        fx.service()
            .write_managed_config(vec![ConfigLine::other("domain=lan")])
            .await
            .unwrap();

        let expected = format!("addn-hosts={}\ndomain=lan\n", fx.hosts.display());
        assert_eq!(fx.managed_content(), expected);
    }

    #[tokio::test]
    async fn multiple_addn_hosts_lines_collapse_to_one() {
        let fx = fixture();
        fx.service()
            .write_managed_config(vec![
                ConfigLine::addn_hosts("/somewhere/else"),
                ConfigLine::other("domain=lan"),
                ConfigLine::addn_hosts("/another/one"),
            ])
            .await
            .unwrap();

        let content = fx.managed_content();
        assert_eq!(content.matches("addn-hosts=").count(), 1);
        assert!(content.starts_with(&format!("addn-hosts={}\n", fx.hosts.display())));
    }

    #[tokio::test]
    async fn write_creates_the_advertised_hosts_file() {
        let fx = fixture();
        assert!(!fx.hosts.exists());

        fx.service().write_managed_config(vec![]).await.unwrap();

        assert_eq!(std::fs::read_to_string(&fx.hosts).unwrap(), "");
    }

    #[tokio::test]
    async fn write_registers_the_managed_file_in_the_main_config() {
        let fx = fixture();
        fx.service().write_managed_config(vec![]).await.unwrap();

        let main = std::fs::read_to_string(&fx.main).unwrap();
        let expected = format!("conf-file={}\n", fx.managed_path().display());
        assert!(main.ends_with(&expected), "main config was {main:?}");
    }

    #[tokio::test]
    async fn write_leaves_no_temp_file() {
        let fx = fixture();
        fx.service().write_managed_config(vec![]).await.unwrap();

        assert!(!fx.confd.join(format!("{MANAGED}.tmp")).exists());
    }

    #[tokio::test]
    async fn write_patches_the_cache_without_invalidation() {
        let fx = fixture();
        let service = fx.service();

        service
            .write_managed_config(vec![ConfigLine::other("domain=home")])
            .await
            .unwrap();

        let config = service.read_managed_config().await.unwrap();
        assert!(config.lines.iter().any(
            |line| matches!(&line.kind, LineKind::Other { raw } if raw == "domain=home")
        ));
        assert!(!fx.cache.is_dirty().await);
    }
}

mod write_dhcp_hosts {
    use super::*;

    #[tokio::test]
    async fn new_entries_are_appended() {
        let fx = fixture();
        let service = fx.service();

        let new_entry = crate::dnsmasq::DhcpHostEntry {
            macs: vec!["11:22:33:44:55:66".to_string()],
            hostname: Some("scanner".to_string()),
            ..Default::default()
        };
        service.write_dhcp_hosts(vec![new_entry]).await.unwrap();

        let content = fx.managed_content();
        assert!(content.contains("dhcp-host=aa:bb:cc:dd:ee:ff,192.168.1.50,printer\n"));
        assert!(content.ends_with("dhcp-host=11:22:33:44:55:66,scanner\n"));
    }

    #[tokio::test]
    async fn matched_entries_are_replaced_in_place() {
        let fx = fixture();
        let service = fx.service();

        let mut entry = service.read_dhcp_hosts().await.unwrap().remove(0);
        entry.hostname = Some("plotter".to_string());
        service.write_dhcp_hosts(vec![entry]).await.unwrap();

        let content = fx.managed_content();
        let lines: Vec<&str> = content.lines().collect();
        // Same position as before (comment, addn-hosts, reservation).
        assert_eq!(lines[2], "dhcp-host=aa:bb:cc:dd:ee:ff,192.168.1.50,plotter");
        assert!(!content.contains("printer"));
    }

    #[tokio::test]
    async fn deleted_entries_are_dropped() {
        let fx = fixture();
        let service = fx.service();

        let mut entry = service.read_dhcp_hosts().await.unwrap().remove(0);
        entry.is_deleted = true;
        service.write_dhcp_hosts(vec![entry]).await.unwrap();

        assert!(!fx.managed_content().contains("dhcp-host="));
        assert!(service.read_dhcp_hosts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_mac_collision_is_rejected_and_names_the_file() {
        let fx = fixture();
        let service = fx.service();
        let before = fx.managed_content();

        let colliding = crate::dnsmasq::DhcpHostEntry {
            macs: vec![FOREIGN_MAC.to_uppercase()],
            hostname: Some("thief".to_string()),
            ..Default::default()
        };
        let err = service.write_dhcp_hosts(vec![colliding]).await.unwrap_err();

        let ServiceError::MacConflict { mac, file } = &err else {
            panic!("expected MacConflict, got {err:?}");
        };
        assert_eq!(mac, FOREIGN_MAC);
        assert_eq!(file, "30-static.conf");
        assert!(err.is_client_error());
        // The managed file must be untouched.
        assert_eq!(fx.managed_content(), before);
    }

    #[tokio::test]
    async fn deleted_and_disabled_entries_do_not_trigger_the_collision_check() {
        let fx = fixture();
        let service = fx.service();

        let mut deleted = crate::dnsmasq::DhcpHostEntry {
            macs: vec![FOREIGN_MAC.to_string()],
            ..Default::default()
        };
        deleted.is_deleted = true;
        let disabled = crate::dnsmasq::DhcpHostEntry {
            macs: vec![FOREIGN_MAC.to_string()],
            is_comment: true,
            hostname: Some("parked".to_string()),
            ..Default::default()
        };

        service
            .write_dhcp_hosts(vec![deleted, disabled])
            .await
            .unwrap();

        assert!(fx.managed_content().contains("#dhcp-host="));
    }

    #[tokio::test]
    async fn without_managed_path_the_write_fails() {
        let fx = unconfigured_fixture();
        let err = fx.service().write_dhcp_hosts(vec![]).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured));
    }
}

mod option_changes {
    use super::*;

    fn flag(key: &str, enabled: bool) -> OptionChange {
        OptionChange {
            key: key.to_string(),
            value: ChangeValue::Flag { enabled },
        }
    }

    fn scalar(key: &str, value: Option<&str>) -> OptionChange {
        OptionChange {
            key: key.to_string(),
            value: ChangeValue::Scalar {
                value: value.map(ToString::to_string),
            },
        }
    }

    fn list(key: &str, values: &[&str]) -> OptionChange {
        OptionChange {
            key: key.to_string(),
            value: ChangeValue::List {
                values: values.iter().map(ToString::to_string).collect(),
            },
        }
    }

    #[tokio::test]
    async fn enabling_a_flag_appends_one_bare_line() {
        let fx = fixture();
        let service = fx.service();

        service
            .apply_option_changes(vec![flag("no-resolv", true)])
            .await
            .unwrap();
        // A second enable is idempotent.
        service
            .apply_option_changes(vec![flag("no-resolv", true)])
            .await
            .unwrap();

        assert_eq!(fx.managed_content().matches("no-resolv").count(), 1);
    }

    #[tokio::test]
    async fn disabling_a_flag_removes_the_line() {
        let fx = fixture();
        let service = fx.service();

        service
            .apply_option_changes(vec![flag("no-resolv", true)])
            .await
            .unwrap();
        service
            .apply_option_changes(vec![flag("no-resolv", false)])
            .await
            .unwrap();

        assert!(!fx.managed_content().contains("no-resolv"));
    }

    #[tokio::test]
    async fn scalar_change_replaces_or_appends() {
        let fx = fixture();
        let service = fx.service();

        service
            .apply_option_changes(vec![scalar("cache-size", Some("150"))])
            .await
            .unwrap();
        service
            .apply_option_changes(vec![scalar("cache-size", Some("1000"))])
            .await
            .unwrap();

        let content = fx.managed_content();
        assert!(content.contains("cache-size=1000"));
        assert!(!content.contains("cache-size=150"));
    }

    #[tokio::test]
    async fn scalar_none_removes_the_setting() {
        let fx = fixture();
        let service = fx.service();

        service
            .apply_option_changes(vec![scalar("cache-size", Some("150"))])
            .await
            .unwrap();
        service
            .apply_option_changes(vec![scalar("cache-size", None)])
            .await
            .unwrap();

        assert!(!fx.managed_content().contains("cache-size"));
    }

    #[tokio::test]
    async fn list_change_reinserts_at_the_first_removed_position() {
        let fx = fixture();
        std::fs::write(
            fx.managed_path(),
            "server=1.1.1.1\n# marker\nserver=8.8.8.8\nport=5353\n",
        )
        .unwrap();
        fx.cache.invalidate().await;

        fx.service()
            .apply_option_changes(vec![list("server", &["9.9.9.9", "149.112.112.112"])])
            .await
            .unwrap();

        let content = fx.managed_content();
        let lines: Vec<&str> = content.lines().collect();
        // addn-hosts is enforced at the top by the write path.
        assert_eq!(lines[1], "server=9.9.9.9");
        assert_eq!(lines[2], "server=149.112.112.112");
        assert_eq!(lines[3], "# marker");
        assert_eq!(lines[4], "port=5353");
    }

    #[tokio::test]
    async fn empty_list_removes_every_line_for_the_key() {
        let fx = fixture();
        std::fs::write(fx.managed_path(), "server=1.1.1.1\nserver=8.8.8.8\n").unwrap();
        fx.cache.invalidate().await;

        fx.service()
            .apply_option_changes(vec![list("server", &[])])
            .await
            .unwrap();

        assert!(!fx.managed_content().contains("server="));
    }

    #[tokio::test]
    async fn unknown_key_is_a_validation_error() {
        let fx = fixture();
        let err = fx
            .service()
            .apply_option_changes(vec![flag("definitely-not-real", true)])
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn mismatched_value_shape_is_a_validation_error() {
        let fx = fixture();
        let err = fx
            .service()
            .apply_option_changes(vec![scalar("no-resolv", Some("yes"))])
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn options_with_dedicated_editors_are_refused() {
        let fx = fixture();
        let err = fx
            .service()
            .apply_option_changes(vec![list("addn-hosts", &["/x"])])
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
    }
}

mod reload {
    use super::*;

    #[tokio::test]
    async fn successful_write_fires_the_reload_once() {
        let fx = fixture();
        let recorder = RecordingReload::new();
        let service =
            ManagedConfigService::with_reload(Arc::clone(&fx.cache), &fx.hosts, &recorder);

        let outcome = service.write_managed_config(vec![]).await.unwrap();

        assert_eq!(outcome, ReloadOutcome::Completed);
        assert_eq!(recorder.calls(), 1);
    }

    #[tokio::test]
    async fn failed_reload_does_not_fail_the_write() {
        let fx = fixture();
        let recorder = RecordingReload::failing();
        let service =
            ManagedConfigService::with_reload(Arc::clone(&fx.cache), &fx.hosts, &recorder);

        let outcome = service
            .write_managed_config(vec![ConfigLine::other("domain=lan")])
            .await
            .unwrap();

        assert!(matches!(outcome, ReloadOutcome::Failed { .. }));
        assert!(fx.managed_content().contains("domain=lan"));
    }

    #[tokio::test]
    async fn rejected_write_fires_no_reload() {
        let fx = fixture();
        let recorder = RecordingReload::new();
        let service =
            ManagedConfigService::with_reload(Arc::clone(&fx.cache), &fx.hosts, &recorder);

        let colliding = crate::dnsmasq::DhcpHostEntry {
            macs: vec![FOREIGN_MAC.to_string()],
            ..Default::default()
        };
        service.write_dhcp_hosts(vec![colliding]).await.unwrap_err();

        assert_eq!(recorder.calls(), 0);
    }
}
