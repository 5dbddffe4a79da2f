//! Unit tests for the identifier types

use core_kernel::{HistoryEntryId, Identity, PolicyId, PoolId};
use std::collections::HashSet;
use uuid::Uuid;

mod creation {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let ids: HashSet<PoolId> = (0..100).map(|_| PoolId::new()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let first = PolicyId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = PolicyId::new_v7();
        assert!(first < second);
    }

    #[test]
    fn test_default_is_v7() {
        let id = HistoryEntryId::default();
        assert_eq!(id.as_uuid().get_version_num(), 7);
    }
}

mod display_and_parse {
    use super::*;

    #[test]
    fn test_prefixes() {
        assert_eq!(PoolId::prefix(), "POOL");
        assert_eq!(PolicyId::prefix(), "POL");
        assert_eq!(HistoryEntryId::prefix(), "HIST");
        assert_eq!(Identity::prefix(), "IDN");
    }

    #[test]
    fn test_identity_round_trips_through_display() {
        let identity = Identity::new();
        let rendered = identity.to_string();
        assert!(rendered.starts_with("IDN-"));
        assert_eq!(rendered.parse::<Identity>().unwrap(), identity);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("POOL-not-a-uuid".parse::<PoolId>().is_err());
        assert!("".parse::<PolicyId>().is_err());
    }
}

mod serde_format {
    use super::*;

    #[test]
    fn test_serializes_as_bare_uuid() {
        let uuid = Uuid::new_v4();
        let id = PoolId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));

        let back: PoolId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
