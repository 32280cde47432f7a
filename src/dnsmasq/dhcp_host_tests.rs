//! Tests for `dhcp-host=` parsing, formatting and stable ids.

use super::dhcp_host::{DhcpHostEntry, IdAllocator};

fn parsed(value: &str) -> DhcpHostEntry {
    DhcpHostEntry::parse_value(value, false)
}

mod token_classification {
    use super::*;

    #[test]
    fn multiple_macs_keep_written_order() {
        let entry = parsed("aa:bb:cc:dd:ee:ff,11:22:33:44:55:66,shared");
        assert_eq!(entry.macs, vec!["aa:bb:cc:dd:ee:ff", "11:22:33:44:55:66"]);
        assert_eq!(entry.hostname.as_deref(), Some("shared"));
    }

    #[test]
    fn address_hostname_and_lease_classify_in_any_order() {
        let entry = parsed("aa:bb:cc:dd:ee:ff,fred,192.168.0.60,45m");
        assert_eq!(entry.address.as_deref(), Some("192.168.0.60"));
        assert_eq!(entry.hostname.as_deref(), Some("fred"));
        assert_eq!(entry.lease.as_deref(), Some("45m"));
    }

    #[test]
    fn infinite_is_a_lease_token() {
        let entry = parsed("aa:bb:cc:dd:ee:ff,fred,infinite");
        assert_eq!(entry.lease.as_deref(), Some("infinite"));
    }

    #[test]
    fn set_and_id_constructs_are_passthrough() {
        let entry = parsed("id:01:aa:bb:cc:dd:ee:ff,set:red,host1");
        assert_eq!(entry.extras, vec!["id:01:aa:bb:cc:dd:ee:ff", "set:red"]);
        assert_eq!(entry.hostname.as_deref(), Some("host1"));
        assert!(entry.macs.is_empty());
    }

    #[test]
    fn ignore_keyword_sets_the_flag() {
        let entry = parsed("aa:bb:cc:dd:ee:ff,ignore");
        assert!(entry.ignore);
        assert!(entry.extras.is_empty());
    }

    #[test]
    fn bracketed_ipv6_is_the_address() {
        let entry = parsed("aa:bb:cc:dd:ee:ff,[fd00::5],host6");
        assert_eq!(entry.address.as_deref(), Some("[fd00::5]"));
    }

    #[test]
    fn inline_comment_is_captured() {
        let entry = parsed("aa:bb:cc:dd:ee:ff,printer # kitchen corner");
        assert_eq!(entry.comment.as_deref(), Some("kitchen corner"));
        assert_eq!(entry.hostname.as_deref(), Some("printer"));
    }

    #[test]
    fn raw_value_is_always_retained() {
        let entry = parsed("not,really,parsable,,");
        assert_eq!(entry.raw_value.as_deref(), Some("not,really,parsable,,"));
    }
}

mod formatting {
    use super::*;

    #[test]
    fn parsed_entry_reproduces_original_text() {
        let original = "AA:BB:CC:DD:EE:FF , set:red,fred,  192.168.0.60";
        assert_eq!(parsed(original).to_value(), original);
    }

    #[test]
    fn fresh_entry_formats_canonically() {
        let entry = DhcpHostEntry {
            macs: vec!["aa:bb:cc:dd:ee:ff".to_string()],
            extras: vec!["set:red".to_string()],
            address: Some("192.168.0.60".to_string()),
            hostname: Some("fred".to_string()),
            lease: Some("45m".to_string()),
            ignore: true,
            comment: Some("lab bench".to_string()),
            ..DhcpHostEntry::default()
        };
        assert_eq!(
            entry.to_value(),
            "aa:bb:cc:dd:ee:ff,set:red,192.168.0.60,fred,45m,ignore # lab bench"
        );
    }

    #[test]
    fn normalized_for_write_drops_stale_raw_text() {
        let mut entry = parsed("aa:bb:cc:dd:ee:ff,oldname");
        entry.hostname = Some("newname".to_string());

        let entry = entry.normalized_for_write();
        assert_eq!(entry.to_value(), "aa:bb:cc:dd:ee:ff,newname");
    }

    #[test]
    fn normalized_for_write_keeps_raw_when_nothing_is_structured() {
        let entry = DhcpHostEntry {
            raw_value: Some(",,strange".to_string()),
            ..DhcpHostEntry::default()
        };
        assert_eq!(entry.normalized_for_write().to_value(), ",,strange");
    }
}

mod stable_ids {
    use super::*;

    fn assign(entries: &mut [DhcpHostEntry]) {
        let mut ids = IdAllocator::new();
        for (i, entry) in entries.iter_mut().enumerate() {
            ids.assign(entry, i + 1);
        }
    }

    #[test]
    fn id_is_derived_from_content_not_position() {
        let mut a = [
            parsed("aa:bb:cc:dd:ee:ff,192.168.1.5,nas"),
            parsed("11:22:33:44:55:66,printer"),
        ];
        let mut b = [
            parsed("11:22:33:44:55:66,printer"),
            parsed("aa:bb:cc:dd:ee:ff,192.168.1.5,nas"),
        ];
        assign(&mut a);
        assign(&mut b);

        // Reordering unrelated entries does not change either id.
        assert_eq!(a[0].id, b[1].id);
        assert_eq!(a[1].id, b[0].id);
    }

    #[test]
    fn id_reads_as_macs_address_and_name() {
        let mut entries = [parsed("AA:bb:cc:dd:ee:ff,192.168.1.5,nas")];
        assign(&mut entries);
        assert_eq!(entries[0].id, "aa:bb:cc:dd:ee:ff|192.168.1.5|nas");
    }

    #[test]
    fn macs_are_sorted_inside_the_id() {
        let mut entries = [parsed("ff:ee:dd:cc:bb:aa,aa:bb:cc:dd:ee:ff,twin")];
        assign(&mut entries);
        assert_eq!(
            entries[0].id,
            "aa:bb:cc:dd:ee:ff,ff:ee:dd:cc:bb:aa||twin"
        );
    }

    #[test]
    fn colliding_content_keys_get_line_suffix() {
        let mut entries = [
            parsed("aa:bb:cc:dd:ee:ff,dup"),
            parsed("aa:bb:cc:dd:ee:ff,dup"),
        ];
        assign(&mut entries);
        assert_eq!(entries[0].id, "aa:bb:cc:dd:ee:ff||dup");
        assert_eq!(entries[1].id, "aa:bb:cc:dd:ee:ff||dup:2");
    }

    #[test]
    fn contentless_entries_fall_back_to_line_position() {
        let mut entries = [parsed("set:red,ignore")];
        assign(&mut entries);
        assert_eq!(entries[0].id, "line:1");
    }

    #[test]
    fn two_reads_of_identical_content_agree() {
        let raw = "aa:bb:cc:dd:ee:ff,192.168.1.5,nas";
        let mut first = [parsed(raw)];
        let mut second = [parsed(raw)];
        assign(&mut first);
        assign(&mut second);
        assert_eq!(first[0].id, second[0].id);
    }
}
